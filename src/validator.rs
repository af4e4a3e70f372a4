use anyhow::anyhow;
use validator::{Validate, ValidationErrors};

use schoolrpc_core::AppError;

fn format_errors(errors: &ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|msg| msg.to_string())
                    .unwrap_or_else(|| format!("{field} is invalid"))
            })
        })
        .collect();
    // field_errors is a HashMap; keep the message stable for callers and tests.
    messages.sort();
    messages.join(", ")
}

/// Runs the `validator` rules of a decoded request message.
///
/// Failures map to `InvalidArgument` with every field message joined.
pub fn validate_request<T: Validate>(request: &T) -> Result<(), AppError> {
    request
        .validate()
        .map_err(|errors| AppError::invalid_argument(anyhow!("{}", format_errors(&errors))))
}
