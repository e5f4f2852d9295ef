use std::io::{self, Read};
use thiserror::Error;

/// Largest request body read into memory: an upload at the size limit plus
/// room for multipart framing.
pub const MAX_BODY_SIZE: u64 = crate::upload::MAX_FILE_SIZE as u64 + 64 * 1024;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: u64 },
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Read at most `limit` bytes; a longer body is rejected rather than truncated.
pub fn read_body(reader: impl Read, declared_len: Option<u64>, limit: u64) -> Result<Vec<u8>, BodyError> {
    if declared_len.is_some_and(|len| len > limit) {
        return Err(BodyError::TooLarge { limit });
    }
    let mut body = Vec::new();
    reader.take(limit + 1).read_to_end(&mut body)?;
    if body.len() as u64 > limit {
        return Err(BodyError::TooLarge { limit });
    }
    Ok(body)
}

/// Owned copy of an incoming request.
#[derive(Debug, Clone, Default)]
pub struct HttpRequest {
    pub method: String,
    /// Path without the query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    /// Header names are lowercased.
    headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// Build from a method and a request target such as `/products?page=2`.
    pub fn new(method: &str, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, query),
            None => (target, ""),
        };
        Self {
            method: method.to_ascii_uppercase(),
            path: path.to_string(),
            query: url::form_urlencoded::parse(query.as_bytes())
                .into_owned()
                .collect(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Copy a `may_minihttp` request, reading at most [`MAX_BODY_SIZE`] body bytes.
    pub fn from_minihttp(req: may_minihttp::Request) -> Result<Self, BodyError> {
        let mut request = Self::new(req.method(), req.path());
        for header in req.headers() {
            request.headers.push((
                header.name.to_ascii_lowercase(),
                String::from_utf8_lossy(header.value).into_owned(),
            ));
        }
        let declared_len = request
            .header("content-length")
            .and_then(|v| v.trim().parse::<u64>().ok());
        request.body = read_body(req.body(), declared_len, MAX_BODY_SIZE)?;
        Ok(request)
    }

    /// First value of a header, by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// First value of a query parameter, percent-decoded.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}
