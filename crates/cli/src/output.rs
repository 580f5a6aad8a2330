//! Terminal output

use anyhow::Result;
use logistics_frontend_common::auth::user_friendly_error;
use logistics_frontend_common::{CompletionError, FlowError};
use logistics_http::{ClientError, ErrorInfo};
use serde::Serialize;

/// Pretty JSON on stdout
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print `error` for a person: the server's message, then one line per
/// rejected field.
pub fn report_error(error: &anyhow::Error) {
    let (message, info) = describe(error);
    eprintln!("Error: {message}");
    if let Some(info) = info {
        print_fields(&info);
    }
}

pub fn print_fields(info: &ErrorInfo) {
    for (field, message) in &info.fields {
        eprintln!("  {field}: {message}");
    }
}

fn describe(error: &anyhow::Error) -> (String, Option<ErrorInfo>) {
    if let Some(client) = error.downcast_ref::<ClientError>() {
        return (user_friendly_error(client), Some(ErrorInfo::from(client)));
    }
    if let Some(completion) = error.downcast_ref::<CompletionError>() {
        return match completion {
            CompletionError::Action(client) => {
                (user_friendly_error(client), Some(ErrorInfo::from(client)))
            }
            CompletionError::Verification(flow) => (flow.to_string(), flow.info().cloned()),
        };
    }
    if let Some(flow) = error.downcast_ref::<FlowError>() {
        return (flow.to_string(), flow.info().cloned());
    }
    (format!("{error:#}"), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use logistics_http::ApiError;

    #[test]
    fn client_errors_use_the_server_message() {
        let body = r#"{"error":"VALIDATION_FAILED","message":"Исправьте ошибки","fields":{"phone":"required"}}"#;
        let error = anyhow::Error::new(ClientError::Api(ApiError::from_response(400, Some(body))));

        let (message, info) = describe(&error);
        assert_eq!(message, "Исправьте ошибки");
        assert_eq!(info.unwrap().fields.get("phone").map(String::as_str), Some("required"));
    }

    #[test]
    fn other_errors_keep_their_context() {
        let error = anyhow::anyhow!("disk full").context("Failed to save");
        let (message, info) = describe(&error);
        assert_eq!(message, "Failed to save: disk full");
        assert!(info.is_none());
    }
}
