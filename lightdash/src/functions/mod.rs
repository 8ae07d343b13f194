//! Provider-defined functions

pub mod build_space_id;
pub mod parse_resource_id;

pub use build_space_id::BuildSpaceIdFunction;
pub use parse_resource_id::ParseResourceIdFunction;

use tfplug::function::{CallFunctionRequest, CallFunctionResponse};

/// A known, non-empty string argument, or the error response naming it
pub(crate) fn string_argument(
    request: &CallFunctionRequest,
    index: usize,
    name: &str,
) -> Result<String, CallFunctionResponse> {
    let position = Some(index as i64);
    let value = request
        .arguments
        .get(index)
        .and_then(|arg| arg.value.as_string())
        .ok_or_else(|| CallFunctionResponse::error(format!("{} must be a string", name), position))?;
    if value.trim().is_empty() {
        return Err(CallFunctionResponse::error(
            format!("{} must not be empty", name),
            position,
        ));
    }
    Ok(value.clone())
}
