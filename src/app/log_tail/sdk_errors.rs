//! Backend error categorisation and logging.
//!
//! Workers never propagate backend failures to the session; they log them here
//! and then either retry on their next poll or stop. Categorising the error
//! lets the log line say whether the failure looked transient (throttling,
//! timeouts, network) or permanent (permissions, validation).

use tracing::error;

/// Categorised backend failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Request was throttled due to rate limiting
    Throttled { error_code: String },
    Timeout,
    /// Network connectivity issues
    NetworkError,
    /// Backend temporarily unavailable
    ServiceUnavailable,
    /// Non-retryable error (permissions, validation, missing resources)
    NonRetryable {
        code: String,
        is_permission_error: bool,
    },
}

impl ErrorCategory {
    /// Returns true if this error category is retryable
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ErrorCategory::NonRetryable { .. })
    }

    /// Error code recorded alongside the failure
    pub fn code(&self) -> &str {
        match self {
            ErrorCategory::Throttled { error_code } => error_code,
            ErrorCategory::Timeout => "Timeout",
            ErrorCategory::NetworkError => "NetworkError",
            ErrorCategory::ServiceUnavailable => "ServiceUnavailable",
            ErrorCategory::NonRetryable { code, .. } => code,
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            ErrorCategory::Throttled { .. } => "throttled",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::NetworkError => "network",
            ErrorCategory::ServiceUnavailable => "unavailable",
            ErrorCategory::NonRetryable { .. } => "error",
        }
    }
}

/// Categorise an error by its full context chain
pub fn categorize_error(error: &anyhow::Error) -> ErrorCategory {
    categorize_error_string(&format!("{:#}", error))
}

/// Categorise an error based on its string representation
pub fn categorize_error_string(error_str: &str) -> ErrorCategory {
    if error_str.contains("ThrottlingException")
        || error_str.contains("Throttling")
        || error_str.contains("TooManyRequestsException")
        || error_str.contains("RequestLimitExceeded")
        || error_str.contains("ProvisionedThroughputExceededException")
        || error_str.contains("LimitExceededException")
        || error_str.contains("RateExceeded")
    {
        let error_code = extract_error_code(error_str).unwrap_or_else(|| "Throttling".to_string());
        return ErrorCategory::Throttled { error_code };
    }

    if error_str.contains("TimeoutError")
        || error_str.contains("timeout")
        || error_str.contains("timed out")
        || error_str.contains("deadline exceeded")
    {
        return ErrorCategory::Timeout;
    }

    if error_str.contains("DispatchFailure")
        || error_str.contains("connection")
        || error_str.contains("Connection")
        || error_str.contains("network")
        || error_str.contains("DNS")
        || error_str.contains("socket")
    {
        return ErrorCategory::NetworkError;
    }

    if error_str.contains("ServiceUnavailable")
        || error_str.contains("InternalServerError")
        || error_str.contains("InternalFailure")
        || error_str.contains("InternalError")
        || error_str.contains("Service Unavailable")
    {
        return ErrorCategory::ServiceUnavailable;
    }

    let is_permission_error = error_str.contains("AccessDenied")
        || error_str.contains("UnauthorizedOperation")
        || error_str.contains("UnrecognizedClientException")
        || error_str.contains("InvalidClientTokenId")
        || error_str.contains("ExpiredToken")
        || error_str.contains("SignatureDoesNotMatch");

    let code = extract_error_code(error_str).unwrap_or_else(|| {
        if is_permission_error {
            "AccessDenied".to_string()
        } else {
            "Error".to_string()
        }
    });

    ErrorCategory::NonRetryable {
        code,
        is_permission_error,
    }
}

/// Log a failed backend call with its category, error code and full message
pub fn log_backend_error(service: &str, operation: &str, error: &anyhow::Error) -> ErrorCategory {
    let category = categorize_error(error);
    error!(
        service,
        operation,
        error_code = category.code(),
        category = category.short_label(),
        retryable = category.is_retryable(),
        detail = %truncate_message(&format!("{:#}", error), 300),
        "{}.{} failed",
        service,
        operation
    );
    category
}

/// Pull an AWS-style error code out of a message.
///
/// Recognises `SomeException: message` anywhere in a `: `-separated chain and
/// `code: "SomeException"` from debug output.
fn extract_error_code(error_str: &str) -> Option<String> {
    for segment in error_str.split(':') {
        let candidate = segment.trim();
        let name = candidate.rsplit("::").next().unwrap_or(candidate);
        if (name.ends_with("Exception") || name.ends_with("Exceeded") || name.ends_with("Fault"))
            && !name.is_empty()
            && name.len() < 60
            && name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Some(name.to_string());
        }
    }

    if let Some(start) = error_str.find("code:") {
        let after_code = &error_str[start + 5..];
        if let Some(quote_start) = after_code.find('"') {
            let after_quote = &after_code[quote_start + 1..];
            if let Some(quote_end) = after_quote.find('"') {
                let code = &after_quote[..quote_end];
                if !code.is_empty() && code.len() < 60 {
                    return Some(code.to_string());
                }
            }
        }
    }

    None
}

/// Truncate a message to at most `max_len` bytes on a char boundary
fn truncate_message(msg: &str, max_len: usize) -> String {
    if msg.len() <= max_len {
        return msg.to_string();
    }
    let mut end = max_len.saturating_sub(3);
    while !msg.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &msg[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_categorize_throttling() {
        let cat = categorize_error_string(
            "ThrottlingException: DescribeLogStreams failed for /app: Rate exceeded",
        );
        assert_eq!(
            cat,
            ErrorCategory::Throttled {
                error_code: "ThrottlingException".to_string()
            }
        );
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_categorize_provisioned_throughput() {
        let cat = categorize_error_string(
            "ProvisionedThroughputExceededException: GetRecords failed for it-1",
        );
        assert!(matches!(cat, ErrorCategory::Throttled { .. }));
    }

    #[test]
    fn test_categorize_timeout() {
        let cat = categorize_error_string("GetLogEvents failed: TimeoutError(TimeoutError { .. })");
        assert_eq!(cat, ErrorCategory::Timeout);
        assert!(cat.is_retryable());
    }

    #[test]
    fn test_categorize_dispatch_failure() {
        let cat = categorize_error_string("DispatchFailure(DispatchFailure { source: .. })");
        assert_eq!(cat, ErrorCategory::NetworkError);
    }

    #[test]
    fn test_categorize_access_denied() {
        let cat = categorize_error_string("AccessDeniedException: User is not authorized");
        assert_eq!(
            cat,
            ErrorCategory::NonRetryable {
                code: "AccessDeniedException".to_string(),
                is_permission_error: true,
            }
        );
        assert!(!cat.is_retryable());
    }

    #[test]
    fn test_categorize_missing_resource() {
        let cat = categorize_error_string(
            "ResourceNotFoundException: DescribeStream failed for app-events: Stream not found",
        );
        assert_eq!(cat.code(), "ResourceNotFoundException");
        assert_eq!(cat.short_label(), "error");
    }

    #[test]
    fn test_categorize_uses_context_chain() {
        let err = anyhow!("InternalFailure: backend exploded").context("GetRecords failed");
        assert_eq!(categorize_error(&err), ErrorCategory::ServiceUnavailable);
    }

    #[test]
    fn test_extract_error_code_from_debug_output() {
        assert_eq!(
            extract_error_code("Error { code: \"ValidationException\", message: .. }"),
            Some("ValidationException".to_string())
        );
        assert_eq!(extract_error_code("something went wrong"), None);
    }

    #[test]
    fn test_truncate_message_respects_char_boundaries() {
        let msg = "é".repeat(10);
        let truncated = truncate_message(&msg, 8);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= 8);
        assert_eq!(truncate_message("short", 8), "short");
    }
}
