//! Response selection and body rewriting.

use crate::errors::MockError;
use crate::responder::ExampleResponses;
use crate::utils::{get_path, replace_property_value, replace_property_value_if};
use serde_json::{json, Map, Value};

/// Pick the example whose status code is numerically nearest to `status`.
///
/// Ties keep the first code seen, so with a sorted map the lower code wins.
/// Keys that are not numeric (`default`) are never picked.
pub fn find_response(
    responses: &ExampleResponses,
    status: u16,
) -> Result<(u16, &Value), MockError> {
    let mut nearest: Option<(u16, &Value)> = None;
    for (code, response) in responses {
        let Ok(code) = code.parse::<u16>() else {
            continue;
        };
        let closer = match nearest {
            None => true,
            Some((best, _)) => best.abs_diff(status) > code.abs_diff(status),
        };
        if closer {
            nearest = Some((code, &response.body));
        }
    }
    nearest.ok_or_else(|| MockError::NoResponse(status.to_string()))
}

/// Paging is collapsed to a single page and every operation has already
/// finished: drop the top-level `nextLink` and mark everything `Succeeded`.
pub fn prepare_body(body: &Value) -> Value {
    let mut ret = match body {
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove("nextLink");
            Value::Object(map)
        }
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    replace_property_value("provisioningState", &json!("Succeeded"), &mut ret);
    ret
}

/// Codes answered as asynchronous operations (201, 202, ...)
pub fn is_async_status(code: u16) -> bool {
    code != 200 && code != 204 && code < 300
}

/// Last touches applied after the async headers are decided.
///
/// Poll callbacks report `status: Succeeded`, and every string `name` field
/// becomes the final path segment of the request URL.
pub fn finalize_body(body: &mut Value, url: &str, lro_callback: bool) {
    if lro_callback {
        if let Value::Object(map) = body {
            map.insert("status".to_string(), json!("Succeeded"));
        }
    }

    if let Some(last) = get_path(url).last() {
        replace_property_value_if("name", &json!(last), body, &Value::is_string);
    }
}
