use super::request::BodyError;
use super::{HttpRequest, HttpResponse};
use crate::error::ApiError;
use crate::state::AppState;
use may_minihttp::{HttpServer, HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use std::time::Instant;

/// `may_minihttp` service; one clone per connection, all sharing the state.
#[derive(Clone)]
pub struct StorefrontService {
    state: Arc<AppState>,
}

impl StorefrontService {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Route an owned request and attach CORS headers.
    pub fn respond(&self, request: &HttpRequest) -> (HttpResponse, Vec<&'static str>) {
        let response = crate::api::handle(&self.state, request);
        let cors = self.state.cors.headers_for(request.header("origin"));
        (response, cors)
    }
}

impl HttpService for StorefrontService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let start = Instant::now();
        let method = req.method().to_string();
        let target = req.path().to_string();

        #[cfg(feature = "tracing")]
        let _span = crate::metrics::tracing_helpers::http_request_span(&method, &target).entered();

        let (response, cors) = match HttpRequest::from_minihttp(req) {
            Ok(request) => self.respond(&request),
            Err(e) => {
                log::warn!("{method} {target}: {e}");
                (body_error_response(&e), self.state.cors.headers_for(None))
            }
        };

        let status = response.status;
        let elapsed = start.elapsed();
        #[cfg(feature = "metrics")]
        crate::metrics::METRICS.record_http_request(&method, status, elapsed);
        log::info!("{method} {target} {status} {:.1}ms", elapsed.as_secs_f64() * 1000.0);

        response.write_to(res, &cors);
        Ok(())
    }
}

fn body_error_response(err: &BodyError) -> HttpResponse {
    let error = match err {
        BodyError::TooLarge { .. } => ApiError::PayloadTooLarge("Request body too large".to_string()),
        BodyError::Io(_) => ApiError::bad_request("Unreadable request body"),
    };
    HttpResponse::from(error)
}

/// Serve until the listener fails.
pub fn serve(state: AppState, addr: &str) -> io::Result<()> {
    let server = HttpServer(StorefrontService::new(Arc::new(state))).start(addr)?;
    log::info!("storefront listening on http://{addr}");
    server
        .join()
        .map_err(|e| io::Error::other(format!("server stopped: {e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_support::state;
    use crate::http::CorsPolicy;

    #[test]
    fn test_body_errors_map_to_413_and_400() {
        let too_large = body_error_response(&BodyError::TooLarge { limit: 10 });
        assert_eq!(too_large.status, 413);
        assert_eq!(too_large.json_body()["message"], "Request body too large");

        let unreadable = body_error_response(&BodyError::Io(io::Error::other("reset")));
        assert_eq!(unreadable.status, 400);
    }

    #[test]
    fn test_respond_adds_cors_headers() {
        let service = StorefrontService::new(Arc::new(state()));
        let (response, cors) = service.respond(&HttpRequest::new("OPTIONS", "/products"));
        assert_eq!(response.status, 204);
        assert!(cors.contains(&"Access-Control-Allow-Origin: *"));
        assert!(cors.contains(&crate::http::cors::ALLOW_HEADERS));
    }

    #[test]
    fn test_respond_withholds_origin_outside_allow_list() {
        let mut app = state();
        app.cors = CorsPolicy::from_setting(Some("https://shop.example"));
        let service = StorefrontService::new(Arc::new(app));

        let request = HttpRequest::new("GET", "/nope").with_header("Origin", "https://other.example");
        let (response, cors) = service.respond(&request);
        assert_eq!(response.status, 404);
        assert_eq!(cors, vec!["Vary: Origin"]);
    }
}
