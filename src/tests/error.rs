// Unit Tests for Pipeline Error Handling
//
// UNIT UNDER TEST: AnalyzerError
//
// BUSINESS RESPONSIBILITY:
//   - Categorizes failures for routing (client, external, transient)
//   - Determines retry eligibility for the invocation loop
//   - Annotates batch-scoped failures with their batch identity
//
// TEST COVERAGE:
//   - Category assignment per variant
//   - Retryability of the transient set and non-retryability of the rest
//   - Batch annotation preserving the inner cause

use crate::error::{AnalyzerError, ErrorCategory};

#[cfg(test)]
mod categorization_tests {
    use super::*;

    #[test]
    fn test_configuration_errors_are_client_errors() {
        let error = AnalyzerError::configuration_error("missing api key");
        assert_eq!(error.category(), ErrorCategory::Client);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_store_errors_are_external_and_final() {
        let error = AnalyzerError::store_error("partition missing");
        assert_eq!(error.category(), ErrorCategory::External);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_transient_set_is_retryable() {
        let transient: Vec<AnalyzerError> = vec![
            AnalyzerError::request_failed("connection reset", None),
            AnalyzerError::rate_limited(30),
            AnalyzerError::timeout(60),
            AnalyzerError::upstream_error(503),
        ];
        for error in transient {
            assert!(error.is_retryable(), "{} should be retryable", error);
        }
    }

    #[test]
    fn test_rejections_and_decode_failures_are_final() {
        assert!(!AnalyzerError::rejected(400, "bad request").is_retryable());
        assert!(!AnalyzerError::response_decode_error("no choices").is_retryable());
    }
}

#[cfg(test)]
mod batch_annotation_tests {
    use super::*;

    #[test]
    fn test_batch_failed_names_the_batch_and_keeps_the_cause() {
        let inner = AnalyzerError::upstream_error(502);
        let error = AnalyzerError::batch_failed("room1", 2, inner);

        let rendered = error.to_string();
        assert!(rendered.contains("room1"));
        assert!(rendered.contains('2'));
        assert!(rendered.contains("502"));
    }

    #[test]
    fn test_batch_failed_inherits_inner_category() {
        let error =
            AnalyzerError::batch_failed("room1", 0, AnalyzerError::rate_limited(10));
        assert_eq!(error.category(), ErrorCategory::Transient);
    }
}
