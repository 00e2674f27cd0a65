//! Swagger path templates compiled for matching.

use crate::models::QueryValue;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Compiled path template such as
/// `/subscriptions/{subscriptionId}/resourceGroups/{resourceGroupName}`.
///
/// Literal text matches case-insensitively, each `{param}` matches within one
/// non-empty segment, a trailing slash is tolerated. `x-ms-paths` style keys may
/// carry a `?key=value` suffix that the request query must satisfy.
#[derive(Debug, Clone)]
pub struct PathTemplate {
    raw: String,
    regex: Arc<Regex>,
    literal_segments: usize,
    query_constraints: Vec<(String, String)>,
}

impl PathTemplate {
    pub fn compile(template: &str) -> Result<Self, regex::Error> {
        let (path, query) = template.split_once('?').unwrap_or((template, ""));

        let mut pattern = String::from("(?i)^");
        let mut literal_segments = 0;
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            pattern.push('/');
            if !segment.contains('{') {
                literal_segments += 1;
            }
            pattern.push_str(&segment_pattern(segment));
        }
        pattern.push_str("/?$");

        let query_constraints = query
            .split('&')
            .filter(|s| !s.is_empty())
            .map(|pair| {
                let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
                (k.to_string(), v.to_string())
            })
            .collect();

        Ok(Self {
            raw: template.to_string(),
            regex: Arc::new(Regex::new(&pattern)?),
            literal_segments,
            query_constraints,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Number of segments without any parameter; higher is more specific
    pub fn specificity(&self) -> usize {
        self.literal_segments * 2 + self.query_constraints.len()
    }

    pub fn matches(&self, path: &str, query: &HashMap<String, QueryValue>) -> bool {
        if !self.regex.is_match(path) {
            return false;
        }
        self.query_constraints.iter().all(|(key, expected)| {
            query
                .get(key)
                .is_some_and(|v| expected.is_empty() || v.first().eq_ignore_ascii_case(expected))
        })
    }
}

fn segment_pattern(segment: &str) -> String {
    let mut out = String::new();
    let mut rest = segment;
    while let Some(open) = rest.find('{') {
        out.push_str(&regex::escape(&rest[..open]));
        match rest[open..].find('}') {
            Some(close) => {
                out.push_str("[^/]+");
                rest = &rest[open + close + 1..];
            }
            None => {
                // unbalanced brace, keep it literal
                out.push_str(&regex::escape(&rest[open..]));
                rest = "";
            }
        }
    }
    out.push_str(&regex::escape(rest));
    out
}
