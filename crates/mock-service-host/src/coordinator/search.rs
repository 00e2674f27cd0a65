//! Operation resolution with api-version fallback.

use crate::errors::MockError;
use crate::spec::{OperationMatch, OperationSearcher, ValidationRequest, UNKNOWN_API_VERSION};
use tracing::debug;

/// Resolve the single operation a request should be answered by.
///
/// A search under the declared api-version that finds nothing is retried under
/// `UNKNOWN_API_VERSION`. If both come back empty the first search's reason is
/// reported, since it names the version the client actually asked for. The
/// last match wins: the searcher orders candidates most-specific last.
///
/// Returns the match together with the api-version the successful search ran
/// under.
pub fn search(
    searcher: &dyn OperationSearcher,
    info: &ValidationRequest,
) -> Result<(OperationMatch, String), MockError> {
    let mut request_info = info.clone();
    let mut potential = searcher.get_potential_operations(&request_info);
    let first_reason = potential.reason.take();

    if potential.matches.is_empty() {
        debug!(
            "No operation for {} {} at api-version {}, retrying with any version",
            info.request_method, info.path, info.api_version
        );
        request_info.api_version = UNKNOWN_API_VERSION.to_string();
        potential = searcher.get_potential_operations(&request_info);
    }

    match potential.matches.pop() {
        Some(operation_match) => Ok((operation_match, potential.api_version)),
        None => Err(first_reason
            .or(potential.reason)
            .map(MockError::from)
            .unwrap_or_else(|| MockError::ResolutionFailure {
                code: crate::spec::OPERATION_NOT_FOUND.to_string(),
                message: format!(
                    "No operation matched {} {}",
                    info.request_method, info.path
                ),
            })),
    }
}
