//! Endpoint expectation set: named request/response contracts
//!
//! Loaded once from YAML, validated, then treated as immutable data by the
//! checker and the fake server.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::config::ConfigError;

/// One contract under test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Endpoint {
    /// Human-readable identifier, used only for reporting
    pub name: String,
    pub request: RequestSpec,
    pub response: ResponseSpec,
}

/// What to send (checker) or what to accept (fake server)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RequestSpec {
    /// Path plus optional query, e.g. "/hello?name=world"
    pub uri: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

/// What the real service is expected to answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ResponseSpec {
    pub code: u16,
    #[serde(default)]
    pub body: String,
    /// Served by the fake server; not compared by the checker
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl RequestSpec {
    /// Operation label used in logs, e.g. "GET /hello0"
    #[must_use]
    pub fn label(&self) -> String {
        format!("{} {}", self.method.to_ascii_uppercase(), self.uri)
    }

    /// Check whether an incoming request satisfies this spec.
    ///
    /// Method is compared case-insensitively, the uri (path plus query)
    /// exactly. Every declared header must be present with an equal value;
    /// `header` looks names up case-insensitively. A declared body must
    /// equal the request body byte for byte.
    pub fn matches<F>(&self, method: &str, uri: &str, body: &str, header: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        if !self.method.eq_ignore_ascii_case(method) || self.uri != uri {
            return false;
        }
        let headers_ok = self
            .headers
            .iter()
            .all(|(name, expected)| header(name).is_some_and(|actual| &actual == expected));
        if !headers_ok {
            return false;
        }
        self.body.as_deref().is_none_or(|expected| expected == body)
    }
}

impl Endpoint {
    fn validate(&self, index: usize) -> Result<(), ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidEndpoint {
            index,
            name: self.name.clone(),
            reason,
        };

        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".into()));
        }
        if !is_method_token(&self.request.method) {
            return Err(invalid(format!(
                "'{}' is not a valid HTTP method",
                self.request.method
            )));
        }
        if !self.request.uri.starts_with('/') {
            return Err(invalid(format!(
                "uri '{}' must start with '/'",
                self.request.uri
            )));
        }
        if !(100..=599).contains(&self.response.code) {
            return Err(invalid(format!(
                "{} is not a valid HTTP status code",
                self.response.code
            )));
        }
        Ok(())
    }
}

/// HTTP method token per RFC 9110: non-empty, visible ASCII, no separators.
fn is_method_token(method: &str) -> bool {
    !method.is_empty()
        && method
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b"!#$%&'*+-.^_`|~".contains(&b))
}

/// Parse and validate an endpoint set from YAML.
///
/// # Errors
///
/// Returns error if the YAML is malformed, an endpoint is invalid, or two
/// endpoints share a name.
pub fn parse_endpoints(yaml: &str) -> Result<Vec<Endpoint>, ConfigError> {
    let endpoints: Vec<Endpoint> = if yaml.trim().is_empty() {
        Vec::new()
    } else {
        serde_yml::from_str(yaml).map_err(|e| ConfigError::Parse(format!("endpoints: {e}")))?
    };

    let mut seen = HashSet::new();
    for (index, endpoint) in endpoints.iter().enumerate() {
        endpoint.validate(index)?;
        if !seen.insert(endpoint.name.as_str()) {
            return Err(ConfigError::DuplicateEndpoint(endpoint.name.clone()));
        }
    }
    Ok(endpoints)
}

/// Load and validate an endpoint set from a YAML file.
///
/// # Errors
///
/// Returns error if the file cannot be read or fails [`parse_endpoints`].
pub fn load_endpoints(path: &Path) -> Result<Vec<Endpoint>, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(path.to_path_buf(), e.to_string()))?;
    parse_endpoints(&content)
}
