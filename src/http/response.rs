use super::reason_phrase;
use crate::error::ApiError;
use may_minihttp::Response;
use serde::Serialize;

const JSON: &str = "Content-Type: application/json; charset=utf-8";
const PROMETHEUS_TEXT: &str = "Content-Type: text/plain; version=0.0.4; charset=utf-8";

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                content_type: Some(JSON),
                body,
            },
            Err(e) => {
                log::error!("failed to serialize response body: {e}");
                Self::error(&ApiError::internal())
            }
        }
    }

    pub fn ok<T: Serialize>(value: &T) -> Self {
        Self::json(200, value)
    }

    pub fn created<T: Serialize>(value: &T) -> Self {
        Self::json(201, value)
    }

    pub fn error(err: &ApiError) -> Self {
        let body = serde_json::to_vec(&err.body()).unwrap_or_default();
        Self {
            status: err.status(),
            content_type: Some(JSON),
            body,
        }
    }

    pub fn metrics(text: String) -> Self {
        Self {
            status: 200,
            content_type: Some(PROMETHEUS_TEXT),
            body: text.into_bytes(),
        }
    }

    pub fn no_content() -> Self {
        Self {
            status: 204,
            content_type: None,
            body: Vec::new(),
        }
    }

    /// Body parsed back as JSON; used by tests.
    pub fn json_body(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or(serde_json::Value::Null)
    }

    pub fn write_to(self, res: &mut Response, extra_headers: &[&'static str]) {
        res.status_code(usize::from(self.status), reason_phrase(self.status));
        if let Some(content_type) = self.content_type {
            res.header(content_type);
        }
        for &header in extra_headers {
            res.header(header);
        }
        res.body_vec(self.body);
    }
}

impl From<ApiError> for HttpResponse {
    fn from(err: ApiError) -> Self {
        HttpResponse::error(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_body() {
        let res = HttpResponse::from(ApiError::bad_request("Cart is empty"));
        assert_eq!(res.status, 400);
        let body = res.json_body();
        assert_eq!(body["message"], "Cart is empty");
        assert_eq!(body["error"], "Bad Request");
    }

    #[test]
    fn test_created_response() {
        let res = HttpResponse::created(&serde_json::json!({ "id": 1 }));
        assert_eq!(res.status, 201);
        assert_eq!(res.json_body()["id"], 1);
    }
}
