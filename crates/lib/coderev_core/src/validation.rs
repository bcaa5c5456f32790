//! Helpers for turning `validator` failures into caller-facing messages.

use validator::{Validate, ValidationErrors};

/// Validate `input`, flattening any failures into a single message of the
/// form `field: message; field: message`, sorted by field name.
pub fn check<T: Validate>(input: &T) -> Result<(), String> {
    input.validate().map_err(|errors| describe(&errors))
}

fn describe(errors: &ValidationErrors) -> String {
    let mut parts: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            let field = field.to_string();
            errs.iter().map(move |e| {
                let msg = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| e.code.to_string());
                format!("{field}: {msg}")
            })
        })
        .collect();
    parts.sort();
    parts.join("; ")
}
