//! HTTP status code catalog.
//!
//! Status codes are designed to be extensible: clients interpret unknown codes
//! by their numeric class (a code in the 200-299 range means success even if
//! the client has never seen it). [`StatusCode`] therefore accepts any value
//! in the valid `100..=599` range, while [`StatusCode::default_reason`] only
//! knows the registered codes.

use std::fmt;

use thiserror::Error;

/// A validated HTTP response status code.
///
/// Construct well-known codes through the associated constants, or arbitrary
/// codes through [`StatusCode::from_u16`], which enforces the valid numeric
/// range. Holding the range invariant here keeps the response serializer free
/// of client-facing validation: an out-of-range code is a programming error
/// and is rejected at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusCode(u16);

/// Error returned when constructing a [`StatusCode`] outside `100..=599`.
#[derive(Debug, Error)]
#[error("status code {0} is outside the valid range 100..=599")]
pub struct InvalidStatusCode(u16);

/// Numeric class of a status code, per the first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 1xx: request received, continuing process
    Informational,
    /// 2xx: the action was successfully received, understood and accepted
    Successful,
    /// 3xx: further action must be taken to complete the request
    Redirection,
    /// 4xx: the request contains bad syntax or cannot be fulfilled
    ClientError,
    /// 5xx: the server failed to fulfill an apparently valid request
    ServerError,
}

impl StatusCode {
    /// Creates a status code from its numeric value.
    pub fn from_u16(code: u16) -> Result<Self, InvalidStatusCode> {
        if (100..=599).contains(&code) { Ok(Self(code)) } else { Err(InvalidStatusCode(code)) }
    }

    /// Returns the numeric value of this status code.
    pub fn as_u16(self) -> u16 {
        self.0
    }

    /// Returns the class this status code belongs to.
    pub fn class(self) -> StatusClass {
        match self.0 {
            100..=199 => StatusClass::Informational,
            200..=299 => StatusClass::Successful,
            300..=399 => StatusClass::Redirection,
            400..=499 => StatusClass::ClientError,
            _ => StatusClass::ServerError,
        }
    }

    /// Returns the registered reason phrase for this code, if there is one.
    ///
    /// Clients commonly display the phrase to users, so the wording follows
    /// the registry verbatim.
    pub fn default_reason(self) -> Option<&'static str> {
        let reason = match self.0 {
            // 1xx
            100 => "Continue",
            101 => "Switching Protocols",

            // 2xx
            200 => "OK",
            201 => "Created",
            202 => "Accepted",
            203 => "Non-Authoritative Information",
            204 => "No Content",
            205 => "Reset Content",
            206 => "Partial Content",

            // 3xx
            300 => "Multiple Choices",
            301 => "Moved Permanently",
            302 => "Found",
            303 => "See Other",
            304 => "Not Modified",
            305 => "Use Proxy",
            307 => "Temporary Redirect",

            // 4xx
            400 => "Bad Request",
            401 => "Unauthorized",
            402 => "Payment Required",
            403 => "Forbidden",
            404 => "Not Found",
            405 => "Method Not Allowed",
            406 => "Not Acceptable",
            407 => "Proxy Authentication Required",
            408 => "Request Timeout",
            409 => "Conflict",
            410 => "Gone",
            411 => "Length Required",
            412 => "Precondition Failed",
            413 => "Request Entity Too Large",
            414 => "Request-URI Too Long",
            415 => "Unsupported Media Type",
            416 => "Requested Range Not Satisfiable",
            417 => "Expectation Failed",

            // 5xx
            500 => "Internal Server Error",
            501 => "Not Implemented",
            502 => "Bad Gateway",
            503 => "Service Unavailable",
            504 => "Gateway Timeout",
            505 => "HTTP Version Not Supported",

            _ => return None,
        };
        Some(reason)
    }
}

macro_rules! status_codes {
    ($($(#[$doc:meta])* $name:ident = $code:literal;)+) => {
        impl StatusCode {
            $(
                $(#[$doc])*
                pub const $name: StatusCode = StatusCode($code);
            )+
        }
    };
}

status_codes! {
    /// 100 Continue
    CONTINUE = 100;
    /// 101 Switching Protocols
    SWITCHING_PROTOCOLS = 101;

    /// 200 OK
    OK = 200;
    /// 201 Created
    CREATED = 201;
    /// 202 Accepted
    ACCEPTED = 202;
    /// 203 Non-Authoritative Information
    NON_AUTHORITATIVE_INFORMATION = 203;
    /// 204 No Content
    NO_CONTENT = 204;
    /// 205 Reset Content
    RESET_CONTENT = 205;
    /// 206 Partial Content
    PARTIAL_CONTENT = 206;

    /// 300 Multiple Choices
    MULTIPLE_CHOICES = 300;
    /// 301 Moved Permanently
    MOVED_PERMANENTLY = 301;
    /// 302 Found
    FOUND = 302;
    /// 303 See Other
    SEE_OTHER = 303;
    /// 304 Not Modified
    NOT_MODIFIED = 304;
    /// 305 Use Proxy
    USE_PROXY = 305;
    /// 307 Temporary Redirect
    TEMPORARY_REDIRECT = 307;

    /// 400 Bad Request
    BAD_REQUEST = 400;
    /// 401 Unauthorized
    UNAUTHORIZED = 401;
    /// 402 Payment Required
    PAYMENT_REQUIRED = 402;
    /// 403 Forbidden
    FORBIDDEN = 403;
    /// 404 Not Found
    NOT_FOUND = 404;
    /// 405 Method Not Allowed
    METHOD_NOT_ALLOWED = 405;
    /// 406 Not Acceptable
    NOT_ACCEPTABLE = 406;
    /// 407 Proxy Authentication Required
    PROXY_AUTHENTICATION_REQUIRED = 407;
    /// 408 Request Timeout
    REQUEST_TIMEOUT = 408;
    /// 409 Conflict
    CONFLICT = 409;
    /// 410 Gone
    GONE = 410;
    /// 411 Length Required
    LENGTH_REQUIRED = 411;
    /// 412 Precondition Failed
    PRECONDITION_FAILED = 412;
    /// 413 Request Entity Too Large
    REQUEST_ENTITY_TOO_LARGE = 413;
    /// 414 Request-URI Too Long
    REQUEST_URI_TOO_LONG = 414;
    /// 415 Unsupported Media Type
    UNSUPPORTED_MEDIA_TYPE = 415;
    /// 416 Requested Range Not Satisfiable
    REQUESTED_RANGE_NOT_SATISFIABLE = 416;
    /// 417 Expectation Failed
    EXPECTATION_FAILED = 417;

    /// 500 Internal Server Error
    INTERNAL_SERVER_ERROR = 500;
    /// 501 Not Implemented
    NOT_IMPLEMENTED = 501;
    /// 502 Bad Gateway
    BAD_GATEWAY = 502;
    /// 503 Service Unavailable
    SERVICE_UNAVAILABLE = 503;
    /// 504 Gateway Timeout
    GATEWAY_TIMEOUT = 504;
    /// 505 HTTP Version Not Supported
    HTTP_VERSION_NOT_SUPPORTED = 505;
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_codes() {
        assert!(StatusCode::from_u16(99).is_err());
        assert!(StatusCode::from_u16(600).is_err());
        assert!(StatusCode::from_u16(0).is_err());
        assert!(StatusCode::from_u16(100).is_ok());
        assert!(StatusCode::from_u16(599).is_ok());
    }

    #[test]
    fn custom_codes_have_no_default_reason() {
        let exotic = StatusCode::from_u16(299).unwrap();
        assert_eq!(exotic.default_reason(), None);
        assert_eq!(exotic.class(), StatusClass::Successful);
    }

    #[test]
    fn catalog_reasons_match_registry() {
        assert_eq!(StatusCode::NOT_FOUND.default_reason(), Some("Not Found"));
        assert_eq!(StatusCode::INTERNAL_SERVER_ERROR.default_reason(), Some("Internal Server Error"));
        assert_eq!(StatusCode::REQUEST_ENTITY_TOO_LARGE.default_reason(), Some("Request Entity Too Large"));
        assert_eq!(StatusCode::REQUESTED_RANGE_NOT_SATISFIABLE.default_reason(), Some("Requested Range Not Satisfiable"));
        assert_eq!(StatusCode::HTTP_VERSION_NOT_SUPPORTED.default_reason(), Some("HTTP Version Not Supported"));
    }

    #[test]
    fn classes_follow_the_first_digit() {
        assert_eq!(StatusCode::CONTINUE.class(), StatusClass::Informational);
        assert_eq!(StatusCode::OK.class(), StatusClass::Successful);
        assert_eq!(StatusCode::FOUND.class(), StatusClass::Redirection);
        assert_eq!(StatusCode::BAD_REQUEST.class(), StatusClass::ClientError);
        assert_eq!(StatusCode::BAD_GATEWAY.class(), StatusClass::ServerError);
    }
}
