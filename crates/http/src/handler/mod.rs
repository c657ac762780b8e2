//! Request handler contract.
//!
//! A [`Handler`] turns a completed [`Request`] into a [`Response`]. Handlers
//! are shared across connections behind an `Arc`, so they must be `Send` and
//! `Sync`; any error they return is caught by the connection layer, reported
//! as a `500` response and followed by a connection drop.

use std::error::Error;
use std::future::Future;

use async_trait::async_trait;

use crate::protocol::{Request, Response};

#[async_trait]
pub trait Handler: Send + Sync {
    type Error: Into<Box<dyn Error + Send + Sync>>;

    async fn call(&self, request: Request) -> Result<Response, Self::Error>;
}

/// Adapts a plain async function into a [`Handler`].
#[derive(Debug)]
pub struct HandlerFn<F> {
    f: F,
}

#[async_trait]
impl<Err, F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response, Err>> + Send,
{
    type Error = Err;

    async fn call(&self, request: Request) -> Result<Response, Self::Error> {
        (self.f)(request).await
    }
}

pub fn make_handler<F, Err, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Err: Into<Box<dyn Error + Send + Sync>>,
    Fut: Future<Output = Result<Response, Err>> + Send,
{
    HandlerFn { f }
}
