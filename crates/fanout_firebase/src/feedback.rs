//! Feeds delivery outcomes back into the registry.

use chrono::{DateTime, Utc};
use tracing::info;

use crate::models::{DeliveryResult, FeedbackSummary};
use crate::registry::Registry;

/// Apply the outcomes of one broadcast to `registry`.
///
/// Must run right after the broadcast that produced `result`, with the
/// registry lock held for the whole call so counter updates stay additive.
pub fn apply(registry: &mut Registry, result: &DeliveryResult, now: DateTime<Utc>) -> FeedbackSummary {
    let summary = registry.apply_outcomes(&result.successes, &result.failures, now);
    if summary.deactivated > 0 || summary.unknown_addresses > 0 {
        info!(
            "Feedback for broadcast {}: {} deactivated, {} addresses no longer registered",
            result.id, summary.deactivated, summary.unknown_addresses
        );
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        DeliveryFailure, DeliverySuccess, FailureReason, RegistrationMetadata, TargetMode,
    };

    #[test]
    fn test_apply_reduces_result_into_registry() {
        let now = Utc::now();
        let mut registry = Registry::new(10);
        for address in ["tok-A", "tok-B", "tok-C"] {
            registry
                .register(address, "u1", RegistrationMetadata::default(), now)
                .unwrap();
        }
        let result = DeliveryResult {
            id: "b-1".to_string(),
            mode: TargetMode::All,
            successes: vec![DeliverySuccess {
                address: "tok-A".to_string(),
                message_id: "m-1".to_string(),
            }],
            failures: vec![
                DeliveryFailure {
                    address: "tok-B".to_string(),
                    reason: FailureReason::InvalidToken,
                    message: "bad token".to_string(),
                },
                DeliveryFailure {
                    address: "tok-C".to_string(),
                    reason: FailureReason::BatchTransportFailure,
                    message: "connection reset".to_string(),
                },
            ],
            total: 3,
            batches: 1,
        };

        let summary = apply(&mut registry, &result, now);

        assert_eq!(summary.successes_applied, 1);
        assert_eq!(summary.failures_applied, 2);
        assert_eq!(summary.deactivated, 1);
        assert!(registry.get("tok-A").unwrap().is_active);
        assert!(!registry.get("tok-B").unwrap().is_active);
        assert!(registry.get("tok-C").unwrap().is_active);
        assert_eq!(registry.get("tok-C").unwrap().failed_deliveries, 1);
    }
}
