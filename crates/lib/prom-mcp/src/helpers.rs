use std::borrow::Cow;

use prom_core::service::ServiceError;
use rmcp::ErrorData;
use rmcp::model::ErrorCode;
use serde_json::json;

/// Translates a service failure into a protocol error payload.
///
/// The JSON-RPC `data` field carries the stable `error_code` and, for
/// validation failures, the offending parameter, so callers can branch on
/// machine-checkable codes instead of parsing the message.
pub(crate) fn map_err(err: ServiceError) -> ErrorData {
    let code = match &err {
        ServiceError::Validation { .. } => ErrorCode::INVALID_PARAMS,
        ServiceError::Connection(_) | ServiceError::Query(_) => ErrorCode::INTERNAL_ERROR,
    };
    let mut data = json!({ "error_code": err.code() });
    if let Some(parameter) = err.parameter() {
        data["offending_parameter"] = json!(parameter);
    }
    ErrorData {
        code,
        message: Cow::Owned(err.to_string()),
        data: Some(data),
    }
}

#[cfg(test)]
mod tests {
    use prom_core::service::ServiceError;
    use rmcp::model::ErrorCode;

    use super::map_err;

    #[test]
    fn validation_errors_carry_the_offending_parameter() {
        let err = map_err(ServiceError::Validation {
            parameter: "limit",
            message: "must be positive, got -1".to_string(),
        });
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        let data = err.data.expect("data payload expected");
        assert_eq!(data["error_code"], "ValidationError");
        assert_eq!(data["offending_parameter"], "limit");
        assert!(err.message.contains("limit"));
    }

    #[test]
    fn backend_errors_map_to_internal_codes() {
        let err = map_err(ServiceError::Connection("connection refused".to_string()));
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        let data = err.data.expect("data payload expected");
        assert_eq!(data["error_code"], "ConnectionError");
        assert!(data.get("offending_parameter").is_none());

        let err = map_err(ServiceError::Query("parse error".to_string()));
        let data = err.data.expect("data payload expected");
        assert_eq!(data["error_code"], "QueryError");
    }
}
