use std::error::Error;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use nano_http::handler::make_handler;
use nano_http::protocol::{Request, Response, StatusCode};
use nano_http::server::HttpServer;

#[tokio::main]
async fn main() {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let server = HttpServer::builder().port(8080).bind().await.expect("bind server error");

    let handler = Arc::new(make_handler(hello_world));
    server.run(handler).await;
}

async fn hello_world(request: Request) -> Result<Response, Box<dyn Error + Send + Sync>> {
    info!(uri = %request.uri(), "processed request");

    let body = concat!(
        "<html>\r\n",
        "<head><title>Hello World</title></head>\r\n",
        "<body><small>Hello World from nano-http</small></body>\r\n",
        "</html>\r\n",
    );

    let mut response = Response::new(StatusCode::OK);
    response.set_header("Cache-Control", "private");
    response.set_header("Content-Type", "text/html; charset=UTF-8");
    response.set_header("Server", "nano-http");
    response.set_header("Content-Length", body.len().to_string());
    response.attach_body(Bytes::from_static(body.as_bytes()));

    Ok(response)
}
