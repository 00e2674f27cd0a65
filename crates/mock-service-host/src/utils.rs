//! URL and JSON helpers used across the pipeline.

use serde_json::Value;

/// Strip the query string (and fragment) from a URL or path.
pub fn get_pure_url(url: &str) -> &str {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    &url[..end]
}

/// Non-empty path segments of a pure URL path.
///
/// `/subscriptions/abc/` yields `["subscriptions", "abc"]`.
pub fn get_path(url: &str) -> Vec<&str> {
    get_pure_url(url)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Drop every `providers/{namespace}` pair from a segment list.
pub fn strip_provider_pairs<'a>(segments: &[&'a str]) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(segments.len());
    let mut i = 0;
    while i < segments.len() {
        if segments[i].eq_ignore_ascii_case("providers") && i + 1 < segments.len() {
            i += 2;
            continue;
        }
        out.push(segments[i]);
        i += 1;
    }
    out
}

/// Whether a path addresses a resource instance tracked by the resource pool.
///
/// `level` is the segment count of `url`. Once `providers/{namespace}` pairs are
/// removed, instance paths alternate type/name and end on a name; resource groups
/// and anything below them qualify, subscriptions and tenant-level paths do not.
pub fn is_management_url_level(level: usize, url: &str) -> bool {
    let segments = get_path(url);
    let pairs = (segments.len() - strip_provider_pairs(&segments).len()) / 2;
    let remaining = level.saturating_sub(pairs * 2);
    remaining >= 4 && remaining % 2 == 0
}

/// Recursively replace every field named `key` whose current value passes
/// `filter`. Replaced values are not descended into.
pub fn replace_property_value_if<F>(key: &str, new_value: &Value, target: &mut Value, filter: &F)
where
    F: Fn(&Value) -> bool,
{
    match target {
        Value::Object(map) => {
            for (k, v) in map.iter_mut() {
                if k == key && filter(v) {
                    *v = new_value.clone();
                } else {
                    replace_property_value_if(key, new_value, v, filter);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                replace_property_value_if(key, new_value, item, filter);
            }
        }
        _ => {}
    }
}

/// Recursively replace every field named `key`, whatever its current value.
pub fn replace_property_value(key: &str, new_value: &Value, target: &mut Value) {
    replace_property_value_if(key, new_value, target, &|_| true);
}

/// Replace `placeholder` inside every string value of a JSON document.
pub fn replace_string_value(placeholder: &str, replacement: &str, target: &mut Value) {
    match target {
        Value::String(s) if s.contains(placeholder) => {
            *s = s.replace(placeholder, replacement);
        }
        Value::Object(map) => {
            for v in map.values_mut() {
                replace_string_value(placeholder, replacement, v);
            }
        }
        Value::Array(items) => {
            for item in items {
                replace_string_value(placeholder, replacement, item);
            }
        }
        _ => {}
    }
}
