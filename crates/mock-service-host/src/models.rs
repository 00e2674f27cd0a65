//! Request, response and profile types shared by the server and the coordinator.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Query parameter value; repeated keys collapse into `Multi`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    /// First value for the key
    pub fn first(&self) -> &str {
        match self {
            QueryValue::Single(v) => v,
            QueryValue::Multi(values) => values.first().map(String::as_str).unwrap_or(""),
        }
    }

    fn push(&mut self, value: String) {
        match self {
            QueryValue::Single(existing) => {
                *self = QueryValue::Multi(vec![std::mem::take(existing), value]);
            }
            QueryValue::Multi(values) => values.push(value),
        }
    }
}

/// Parse a raw query string into a key -> value(s) map.
///
/// Keys and values are URL-decoded. A key without `=` maps to an empty value.
pub fn parse_query_string(query: &str) -> HashMap<String, QueryValue> {
    let mut parsed: HashMap<String, QueryValue> = HashMap::new();
    for pair in query.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = urlencoding::decode(key).unwrap_or_default().into_owned();
        let value = urlencoding::decode(value).unwrap_or_default().into_owned();
        match parsed.get_mut(&key) {
            Some(existing) => existing.push(value),
            None => {
                parsed.insert(key, QueryValue::Single(value));
            }
        }
    }
    parsed
}

/// Per-request test configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestProfile {
    /// Enforce resource lifecycle through the resource pool
    #[serde(default)]
    pub stateful: bool,
    /// Fail every request that would otherwise succeed
    #[serde(default)]
    pub always_error: bool,
}

impl TestProfile {
    pub const STATEFUL: TestProfile = TestProfile {
        stateful: true,
        always_error: false,
    };

    pub const ALWAYS_ERROR: TestProfile = TestProfile {
        stateful: false,
        always_error: true,
    };
}

/// Raw inbound request as seen by the host transport
#[derive(Debug, Clone)]
pub struct VirtualServerRequest {
    /// `http` or `https`
    pub protocol: String,
    /// Path plus raw query string, exactly as received
    pub url: String,
    pub method: String,
    /// Header names are lower-cased
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, QueryValue>,
    pub body: Option<Value>,
}

impl VirtualServerRequest {
    pub fn new(protocol: &str, method: &str, url: &str) -> Self {
        let query = url
            .split_once('?')
            .map(|(_, q)| parse_query_string(q))
            .unwrap_or_default();
        Self {
            protocol: protocol.to_string(),
            url: url.to_string(),
            method: method.to_string(),
            headers: HashMap::new(),
            query,
            body: None,
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .insert(name.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn host(&self) -> &str {
        self.header("host").unwrap_or("localhost")
    }

    /// `protocol://host` prefix used for absolute URLs
    pub fn origin(&self) -> String {
        format!("{}://{}", self.protocol, self.host())
    }

    pub fn full_url(&self) -> String {
        format!("{}{}", self.origin(), self.url)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query.get(key).map(QueryValue::first)
    }

    /// Normalized request handed to the validator
    pub fn to_live_request(&self) -> LiveRequest {
        LiveRequest {
            url: self.full_url(),
            method: self.method.clone(),
            headers: self.headers.clone(),
            query: self.query.clone(),
            body: self.body.clone(),
        }
    }
}

/// Normalized request: absolute URL plus parsed parts
#[derive(Debug, Clone)]
pub struct LiveRequest {
    pub url: String,
    pub method: String,
    pub headers: HashMap<String, String>,
    pub query: HashMap<String, QueryValue>,
    pub body: Option<Value>,
}

/// Response sink filled in by the coordinator
#[derive(Debug, Clone, Default)]
pub struct VirtualServerResponse {
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

impl VirtualServerResponse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) a response header
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value,
            None => self.headers.push((name.to_string(), value)),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Finalize with a status code and body
    pub fn set(&mut self, status: u16, body: Value) {
        self.status = Some(status);
        self.body = body;
    }

    pub fn is_finalized(&self) -> bool {
        self.status.is_some()
    }
}
