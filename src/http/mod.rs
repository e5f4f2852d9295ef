//! HTTP layer on `may_minihttp`.
//!
//! `may_minihttp` hands each request to [`server::StorefrontService`] on a
//! coroutine. The service copies it into an owned [`HttpRequest`], lets the API
//! layer produce an [`HttpResponse`], and writes that back with CORS headers.

pub mod cors;
pub mod multipart;
pub mod request;
pub mod response;
pub mod router;
pub mod server;

pub use cors::CorsPolicy;
pub use request::HttpRequest;
pub use response::HttpResponse;
pub use router::{route, Route};
pub use server::{serve, StorefrontService};

/// Standard reason phrase for the status codes this service emits.
pub fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        413 => "Payload Too Large",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
