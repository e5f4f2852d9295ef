//! JSON body validation.
//!
//! Bodies must be JSON objects. Properties outside the endpoint's allow-list are
//! rejected, and every failing field contributes one message to a single 400
//! response. A `null` property counts as absent.

use crate::error::ApiError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)+$")
        .expect("email pattern is a valid regex")
});

/// Length and trimming rules for a string field.
#[derive(Debug, Clone, Copy, Default)]
pub struct Text {
    pub trim: bool,
    pub min: usize,
    pub max: Option<usize>,
    pub not_empty: bool,
}

impl Text {
    pub const ANY: Text = Text {
        trim: false,
        min: 0,
        max: None,
        not_empty: false,
    };

    pub fn min(min: usize) -> Self {
        Text { min, ..Text::ANY }
    }

    /// Trimmed, non-empty, at most `max` characters.
    pub fn trimmed(max: usize) -> Self {
        Text {
            trim: true,
            max: Some(max),
            not_empty: true,
            ..Text::ANY
        }
    }
}

pub struct Body {
    fields: Map<String, Value>,
    errors: Vec<String>,
}

impl Body {
    pub fn parse(raw: &[u8], allowed: &[&str]) -> Result<Self, ApiError> {
        let value: Value = if raw.iter().all(u8::is_ascii_whitespace) {
            Value::Object(Map::new())
        } else {
            serde_json::from_slice(raw)
                .map_err(|e| ApiError::bad_request(format!("Invalid JSON body: {e}")))?
        };
        let Value::Object(fields) = value else {
            return Err(ApiError::bad_request("Request body must be a JSON object"));
        };
        let errors = fields
            .keys()
            .filter(|key| !allowed.contains(&key.as_str()))
            .map(|key| format!("property {key} should not exist"))
            .collect();
        Ok(Self { fields, errors })
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name).filter(|v| !v.is_null())
    }

    fn fail(&mut self, message: String) {
        self.errors.push(message);
    }

    fn check_text(&mut self, name: &str, raw: &str, rules: Text) -> Option<String> {
        let value = if rules.trim { raw.trim() } else { raw };
        let len = value.chars().count();
        let before = self.errors.len();
        if rules.not_empty && value.is_empty() {
            self.fail(format!("{name} should not be empty"));
        }
        if len < rules.min {
            self.fail(format!(
                "{name} must be longer than or equal to {} characters",
                rules.min
            ));
        }
        if let Some(max) = rules.max.filter(|max| len > *max) {
            self.fail(format!(
                "{name} must be shorter than or equal to {max} characters"
            ));
        }
        (self.errors.len() == before).then(|| value.to_string())
    }

    pub fn optional_string(&mut self, name: &str, rules: Text) -> Option<String> {
        match self.get(name)? {
            Value::String(s) => {
                let s = s.clone();
                self.check_text(name, &s, rules)
            }
            _ => {
                self.fail(format!("{name} must be a string"));
                None
            }
        }
    }

    pub fn string(&mut self, name: &str, rules: Text) -> Option<String> {
        if self.get(name).is_none() {
            self.fail(format!("{name} must be a string"));
            return None;
        }
        self.optional_string(name, rules)
    }

    /// Required email, trimmed and lowercased.
    pub fn email(&mut self, name: &str) -> Option<String> {
        let raw = match self.get(name) {
            Some(Value::String(s)) => s.trim().to_lowercase(),
            _ => {
                self.fail(format!("{name} must be an email"));
                return None;
            }
        };
        if EMAIL.is_match(&raw) {
            Some(raw)
        } else {
            self.fail(format!("{name} must be an email"));
            None
        }
    }

    pub fn optional_int(&mut self, name: &str, min: i64) -> Option<i64> {
        let value = self.get(name)?;
        let Some(n) = value.as_i64() else {
            self.fail(format!("{name} must be an integer number"));
            return None;
        };
        if n < min {
            self.fail(format!("{name} must not be less than {min}"));
            return None;
        }
        Some(n)
    }

    pub fn int(&mut self, name: &str, min: i64) -> Option<i64> {
        if self.get(name).is_none() {
            self.fail(format!("{name} must be an integer number"));
            return None;
        }
        self.optional_int(name, min)
    }

    /// Integer that must also fit a 32-bit column.
    pub fn int32(&mut self, name: &str, min: i64) -> Option<i32> {
        let n = self.int(name, min)?;
        self.fit_i32(name, n)
    }

    pub fn optional_int32(&mut self, name: &str, min: i64) -> Option<i32> {
        let n = self.optional_int(name, min)?;
        self.fit_i32(name, n)
    }

    fn fit_i32(&mut self, name: &str, n: i64) -> Option<i32> {
        match i32::try_from(n) {
            Ok(n) => Some(n),
            Err(_) => {
                self.fail(format!("{name} must not be greater than {}", i32::MAX));
                None
            }
        }
    }

    pub fn optional_bool(&mut self, name: &str) -> Option<bool> {
        match self.get(name)? {
            Value::Bool(b) => Some(*b),
            _ => {
                self.fail(format!("{name} must be a boolean value"));
                None
            }
        }
    }

    /// One of `T`'s text values; `allowed` lists them for the error message.
    pub fn optional_enum<T: std::str::FromStr>(&mut self, name: &str, allowed: &[&str]) -> Option<T> {
        let parsed = match self.get(name)? {
            Value::String(s) => s.parse::<T>().ok(),
            _ => None,
        };
        if parsed.is_none() {
            self.fail(format!(
                "{name} must be one of the following values: {}",
                allowed.join(", ")
            ));
        }
        parsed
    }

    pub fn required_enum<T: std::str::FromStr>(&mut self, name: &str, allowed: &[&str]) -> Option<T> {
        if self.get(name).is_none() {
            self.fail(format!(
                "{name} must be one of the following values: {}",
                allowed.join(", ")
            ));
            return None;
        }
        self.optional_enum(name, allowed)
    }

    /// `Ok` only when no field failed.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }
}

/// Unwrap a field `finish` has vouched for.
pub fn checked<T>(value: Option<T>) -> Result<T, ApiError> {
    value.ok_or_else(|| ApiError::Validation(vec!["invalid request body".to_string()]))
}
