//! CORS policy from the `cors_origin` setting: empty or `*` allows any origin,
//! otherwise a comma-separated allow-list.

pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods: GET, POST, PATCH, DELETE, OPTIONS";
pub const ALLOW_HEADERS: &str = "Access-Control-Allow-Headers: Authorization, Content-Type";
const ANY_ORIGIN: &str = "Access-Control-Allow-Origin: *";
const VARY_ORIGIN: &str = "Vary: Origin";

#[derive(Debug, Clone)]
enum Allowed {
    Any,
    /// (origin, its pre-rendered `Access-Control-Allow-Origin` line)
    List(Vec<(String, &'static str)>),
}

#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed: Allowed,
}

impl CorsPolicy {
    pub fn from_setting(setting: Option<&str>) -> Self {
        let origins: Vec<String> = setting
            .unwrap_or("")
            .split(',')
            .map(|o| o.trim().trim_end_matches('/').to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            return Self { allowed: Allowed::Any };
        }
        // may_minihttp takes 'static header lines; these are rendered once at startup.
        let list = origins
            .into_iter()
            .map(|origin| {
                let line: &'static str =
                    Box::leak(format!("Access-Control-Allow-Origin: {origin}").into_boxed_str());
                (origin, line)
            })
            .collect();
        Self {
            allowed: Allowed::List(list),
        }
    }

    pub fn allows_any(&self) -> bool {
        matches!(self.allowed, Allowed::Any)
    }

    /// Headers to add to a response for a request from `origin`.
    pub fn headers_for(&self, origin: Option<&str>) -> Vec<&'static str> {
        let allow_origin = match &self.allowed {
            Allowed::Any => Some(ANY_ORIGIN),
            Allowed::List(list) => origin.and_then(|origin| {
                let origin = origin.trim_end_matches('/');
                list.iter().find(|(o, _)| o == origin).map(|(_, line)| *line)
            }),
        };
        let mut headers = Vec::with_capacity(4);
        if let Some(line) = allow_origin {
            headers.extend([line, ALLOW_METHODS, ALLOW_HEADERS]);
        }
        if !self.allows_any() {
            headers.push(VARY_ORIGIN);
        }
        headers
    }
}
