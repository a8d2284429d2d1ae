//! In-memory registry of device registrations
//!
//! The registry owns every [`Registration`], keyed by delivery address. It is a
//! plain synchronous state machine: callers pass the current time in and are
//! responsible for serializing mutations (the [`crate::service::PushService`]
//! keeps it behind a single lock).

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

use crate::error::PushError;
use crate::models::{
    DeliveryFailure, DeliverySuccess, FeedbackSummary, Registration, RegistrationMetadata,
    RegistrationSummary, StatsSnapshot, Target,
};
use fanout_common::address_preview;

/// Registrations not seen for this many days are removed by the cleanup sweep.
pub const VALIDITY_WINDOW_DAYS: i64 = 30;

/// Window used for the "recent registrations" statistic.
pub const RECENT_WINDOW_HOURS: i64 = 24;

pub const MIN_ADDRESS_LEN: usize = 3;
pub const MAX_ADDRESS_LEN: usize = 4096;
pub const MAX_IDENTITY_LEN: usize = 256;

/// Basic well-formedness check shared by the registry and the pipeline.
pub fn is_well_formed_address(address: &str) -> bool {
    let len = address.chars().count();
    (MIN_ADDRESS_LEN..=MAX_ADDRESS_LEN).contains(&len)
        && !address.chars().any(char::is_whitespace)
}

fn validate_address(address: &str) -> Result<&str, PushError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(PushError::InvalidInput("address must not be empty".to_string()));
    }
    if !is_well_formed_address(address) {
        return Err(PushError::InvalidInput(format!(
            "address must be {}-{} characters without whitespace",
            MIN_ADDRESS_LEN, MAX_ADDRESS_LEN
        )));
    }
    Ok(address)
}

fn validate_identity(identity: &str) -> Result<&str, PushError> {
    let identity = identity.trim();
    if identity.is_empty() {
        return Err(PushError::InvalidInput("identity must not be empty".to_string()));
    }
    if identity.chars().count() > MAX_IDENTITY_LEN {
        return Err(PushError::InvalidInput(format!(
            "identity must be at most {} characters",
            MAX_IDENTITY_LEN
        )));
    }
    Ok(identity)
}

#[derive(Debug)]
pub struct Registry {
    registrations: HashMap<String, Registration>,
    max_registrations: usize,
}

impl Registry {
    /// Create an empty registry with the given capacity ceiling.
    pub fn new(max_registrations: usize) -> Self {
        Self {
            registrations: HashMap::new(),
            max_registrations: max_registrations.max(1),
        }
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn get(&self, address: &str) -> Option<&Registration> {
        self.registrations.get(address.trim())
    }

    /// Register an address or refresh an existing registration.
    ///
    /// Returns whether the address was new together with the stored
    /// registration. Re-registering bumps `registration_count`, reactivates the
    /// address and refreshes `last_active_at`; delivery counters are kept.
    pub fn register(
        &mut self,
        address: &str,
        identity: &str,
        metadata: RegistrationMetadata,
        now: DateTime<Utc>,
    ) -> Result<(bool, Registration), PushError> {
        let address = validate_address(address)?;
        let identity = validate_identity(identity)?;

        if let Some(existing) = self.registrations.get_mut(address) {
            existing.identity = identity.to_string();
            existing.merge_metadata(metadata);
            existing.registration_count = existing.registration_count.saturating_add(1);
            existing.is_active = true;
            existing.last_active_at = now;
            info!(
                "Updated registration {} (count {})",
                address_preview(address),
                existing.registration_count
            );
            return Ok((false, existing.clone()));
        }

        if self.registrations.len() >= self.max_registrations {
            let removed = self.cleanup(now);
            if self.registrations.len() >= self.max_registrations {
                warn!(
                    "Registry over capacity ({} >= {}) after removing {} registrations",
                    self.registrations.len(),
                    self.max_registrations,
                    removed
                );
            }
        }

        let registration =
            Registration::new(address.to_string(), identity.to_string(), metadata, now);
        self.registrations
            .insert(address.to_string(), registration.clone());
        info!("Registered new address {}", address_preview(address));
        Ok((true, registration))
    }

    /// Remove a registration. Returns `false` if the address was unknown.
    pub fn unregister(&mut self, address: &str) -> bool {
        let address = address.trim();
        match self.registrations.remove(address) {
            Some(_) => {
                info!("Removed registration {}", address_preview(address));
                true
            }
            None => {
                info!(
                    "Attempted to remove unknown registration {}",
                    address_preview(address)
                );
                false
            }
        }
    }

    /// Active registrations, most recently active first.
    pub fn list_active(&self) -> Vec<Registration> {
        let mut active: Vec<Registration> = self
            .registrations
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect();
        sort_by_activity(&mut active);
        active
    }

    /// Summaries of the active registrations, most recently active first.
    pub fn summaries(&self) -> Vec<RegistrationSummary> {
        self.list_active().iter().map(Registration::summary).collect()
    }

    /// Active addresses of one identity.
    pub fn resolve_identity(&self, identity: &str) -> Vec<String> {
        self.resolve_targets(&Target::Identity(identity.trim().to_string()))
    }

    /// Case-insensitive search over identity, display name and contact of
    /// active registrations.
    pub fn search(&self, query: &str) -> Result<Vec<Registration>, PushError> {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return Err(PushError::InvalidInput("search query must not be empty".to_string()));
        }

        let matches = |field: Option<&str>| {
            field
                .map(|value| value.to_lowercase().contains(&query))
                .unwrap_or(false)
        };

        let mut found: Vec<Registration> = self
            .registrations
            .values()
            .filter(|r| r.is_active)
            .filter(|r| {
                matches(Some(&r.identity))
                    || matches(r.display_name.as_deref())
                    || matches(r.contact.as_deref())
            })
            .cloned()
            .collect();
        sort_by_activity(&mut found);
        Ok(found)
    }

    /// Resolve the delivery addresses for a target.
    ///
    /// Inactive registrations are never returned. An empty result is valid
    /// here; the caller decides whether that is an error.
    pub fn resolve_targets(&self, target: &Target) -> Vec<String> {
        let mut targets: Vec<&Registration> = self
            .registrations
            .values()
            .filter(|r| r.is_active)
            .filter(|r| match target {
                Target::All => true,
                Target::Selected => r.is_selected,
                Target::Identity(identity) => &r.identity == identity,
            })
            .collect();
        targets.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| a.address.cmp(&b.address))
        });
        targets.into_iter().map(|r| r.address.clone()).collect()
    }

    /// Set the selection flag of every active registration of the given
    /// identities. Returns the number of registrations touched.
    pub fn set_selection(&mut self, identities: &HashSet<String>, selected: bool) -> usize {
        let mut updated = 0;
        for registration in self
            .registrations
            .values_mut()
            .filter(|r| r.is_active && identities.contains(&r.identity))
        {
            registration.is_selected = selected;
            updated += 1;
        }
        debug!("Set selection={} on {} registrations", selected, updated);
        updated
    }

    /// Set the selection flag of every active registration.
    pub fn select_all(&mut self, selected: bool) -> usize {
        let mut updated = 0;
        for registration in self.registrations.values_mut().filter(|r| r.is_active) {
            registration.is_selected = selected;
            updated += 1;
        }
        debug!("Set selection={} on all {} active registrations", selected, updated);
        updated
    }

    /// Fold delivery outcomes into liveness state and counters.
    ///
    /// Successes increment `successful_deliveries`, refresh `last_active_at`
    /// and reactivate. Failures increment `failed_deliveries`; only the two
    /// permanent reasons deactivate. Outcomes for unknown addresses are counted
    /// and skipped.
    pub fn apply_outcomes(
        &mut self,
        successes: &[DeliverySuccess],
        failures: &[DeliveryFailure],
        now: DateTime<Utc>,
    ) -> FeedbackSummary {
        let mut summary = FeedbackSummary::default();

        for success in successes {
            match self.registrations.get_mut(&success.address) {
                Some(registration) => {
                    registration.successful_deliveries += 1;
                    registration.last_active_at = now;
                    registration.is_active = true;
                    summary.successes_applied += 1;
                }
                None => summary.unknown_addresses += 1,
            }
        }

        for failure in failures {
            match self.registrations.get_mut(&failure.address) {
                Some(registration) => {
                    registration.failed_deliveries += 1;
                    summary.failures_applied += 1;
                    if failure.reason.is_permanent() && registration.is_active {
                        registration.is_active = false;
                        summary.deactivated += 1;
                        warn!(
                            "Marked registration {} inactive ({})",
                            address_preview(&failure.address),
                            failure.reason
                        );
                    }
                }
                None => summary.unknown_addresses += 1,
            }
        }

        summary
    }

    /// Remove registrations that are inactive or were last active before the
    /// validity window. Returns the number removed.
    pub fn cleanup(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = now - Duration::days(VALIDITY_WINDOW_DAYS);
        let before = self.registrations.len();
        self.registrations
            .retain(|_, r| r.is_active && r.last_active_at >= cutoff);
        let removed = before - self.registrations.len();
        info!("Cleaned up {} stale or inactive registrations", removed);
        removed
    }

    pub fn stats(&self, now: DateTime<Utc>) -> StatsSnapshot {
        let recent_cutoff = now - Duration::hours(RECENT_WINDOW_HOURS);
        let mut stats = StatsSnapshot {
            total_registrations: self.registrations.len(),
            ..Default::default()
        };

        for registration in self.registrations.values() {
            if registration.is_active {
                stats.active_registrations += 1;
            }
            if registration.is_active && registration.is_selected {
                stats.selected_registrations += 1;
            }
            if registration.registered_at >= recent_cutoff {
                stats.recent_registrations += 1;
            }
            let platform = registration
                .platform
                .clone()
                .unwrap_or_else(|| "unknown".to_string());
            *stats.platforms.entry(platform).or_insert(0) += 1;
            stats.total_successful_deliveries += registration.successful_deliveries;
            stats.total_failed_deliveries += registration.failed_deliveries;
        }

        stats.inactive_registrations = stats.total_registrations - stats.active_registrations;
        stats
    }
}

fn sort_by_activity(registrations: &mut [Registration]) {
    registrations.sort_by(|a, b| {
        b.last_active_at
            .cmp(&a.last_active_at)
            .then_with(|| a.address.cmp(&b.address))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailureReason;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 5, 12, 0, 0).unwrap()
    }

    fn meta(platform: &str) -> RegistrationMetadata {
        RegistrationMetadata {
            platform: Some(platform.to_string()),
            ..Default::default()
        }
    }

    fn failure(address: &str, reason: FailureReason) -> DeliveryFailure {
        DeliveryFailure {
            address: address.to_string(),
            reason,
            message: reason.to_string(),
        }
    }

    fn success(address: &str) -> DeliverySuccess {
        DeliverySuccess {
            address: address.to_string(),
            message_id: format!("msg-{address}"),
        }
    }

    #[test]
    fn test_register_same_address_twice_updates_in_place() {
        let mut registry = Registry::new(10);
        let (is_new, first) = registry
            .register("tok-A", "u1", meta("android"), t0())
            .unwrap();
        assert!(is_new);
        assert_eq!(first.registration_count, 1);

        let later = t0() + Duration::minutes(5);
        let (is_new, second) = registry
            .register("tok-A", "u1", RegistrationMetadata::default(), later)
            .unwrap();

        assert!(!is_new);
        assert_eq!(registry.len(), 1);
        assert_eq!(second.registration_count, 2);
        assert_eq!(second.registered_at, t0());
        assert_eq!(second.last_active_at, later);
        assert_eq!(second.platform.as_deref(), Some("android"));
    }

    #[test]
    fn test_reregister_reactivates_and_keeps_counters() {
        let mut registry = Registry::new(10);
        registry.register("tok-A", "u1", meta("ios"), t0()).unwrap();
        registry.apply_outcomes(
            &[success("tok-A")],
            &[failure("tok-A", FailureReason::Unregistered)],
            t0(),
        );
        assert!(!registry.get("tok-A").unwrap().is_active);

        let (_, refreshed) = registry
            .register("tok-A", "u1", RegistrationMetadata::default(), t0())
            .unwrap();
        assert!(refreshed.is_active);
        assert_eq!(refreshed.successful_deliveries, 1);
        assert_eq!(refreshed.failed_deliveries, 1);
    }

    #[test]
    fn test_register_rejects_invalid_input_without_mutation() {
        let mut registry = Registry::new(10);
        for (address, identity) in [("", "u1"), ("   ", "u1"), ("ab", "u1"), ("tok A", "u1"), ("tok-A", "  ")] {
            let err = registry
                .register(address, identity, RegistrationMetadata::default(), t0())
                .unwrap_err();
            assert!(matches!(err, PushError::InvalidInput(_)), "{address:?}/{identity:?}");
        }
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_trims_address() {
        let mut registry = Registry::new(10);
        registry
            .register("  tok-A\n", "u1", RegistrationMetadata::default(), t0())
            .unwrap();
        assert!(registry.get("tok-A").is_some());
    }

    #[test]
    fn test_unregister_is_idempotent() {
        let mut registry = Registry::new(10);
        registry
            .register("tok-A", "u1", RegistrationMetadata::default(), t0())
            .unwrap();
        assert!(registry.unregister("tok-A"));
        assert!(!registry.unregister("tok-A"));
        assert!(!registry.unregister("never-seen"));
    }

    #[test]
    fn test_list_active_sorted_by_last_activity() {
        let mut registry = Registry::new(10);
        registry.register("tok-A", "u1", meta("android"), t0()).unwrap();
        registry
            .register("tok-B", "u2", meta("ios"), t0() + Duration::hours(1))
            .unwrap();
        registry
            .register("tok-C", "u3", meta("web"), t0() + Duration::hours(2))
            .unwrap();
        registry.apply_outcomes(&[], &[failure("tok-C", FailureReason::InvalidToken)], t0());

        let addresses: Vec<String> = registry
            .list_active()
            .into_iter()
            .map(|r| r.address)
            .collect();
        assert_eq!(addresses, vec!["tok-B", "tok-A"]);
    }

    #[test]
    fn test_resolve_targets_excludes_inactive_and_unselected() {
        let mut registry = Registry::new(10);
        registry.register("tok-A", "u1", meta("android"), t0()).unwrap();
        registry.register("tok-B", "u2", meta("ios"), t0()).unwrap();
        registry.register("tok-C", "u2", meta("ios"), t0()).unwrap();

        assert!(registry.resolve_targets(&Target::Selected).is_empty());

        let selected: HashSet<String> = ["u2".to_string()].into_iter().collect();
        assert_eq!(registry.set_selection(&selected, true), 2);
        registry.apply_outcomes(&[], &[failure("tok-C", FailureReason::Unregistered)], t0());

        assert_eq!(registry.resolve_targets(&Target::Selected), vec!["tok-B"]);
        assert_eq!(registry.resolve_targets(&Target::All), vec!["tok-A", "tok-B"]);
        assert_eq!(
            registry.resolve_targets(&Target::Identity("u2".to_string())),
            vec!["tok-B"]
        );
        assert_eq!(registry.resolve_identity(" u2 "), vec!["tok-B"]);
        assert!(registry.resolve_identity("u9").is_empty());
    }

    #[test]
    fn test_summaries_hide_full_address() {
        let mut registry = Registry::new(10);
        let address = "a".repeat(64);
        registry.register(&address, "u1", meta("web"), t0()).unwrap();

        let summaries = registry.summaries();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].identity, "u1");
        assert!(summaries[0].address_preview.len() < address.len());

        registry.register("tok-B", "u2", meta("web"), t0()).unwrap();
        assert!(registry
            .summaries()
            .iter()
            .all(|s| !s.address_preview.contains("tok-B")));
    }

    #[test]
    fn test_select_all_only_touches_active() {
        let mut registry = Registry::new(10);
        registry.register("tok-A", "u1", meta("android"), t0()).unwrap();
        registry.register("tok-B", "u2", meta("ios"), t0()).unwrap();
        registry.apply_outcomes(&[], &[failure("tok-B", FailureReason::Unregistered)], t0());

        assert_eq!(registry.select_all(true), 1);
        assert!(registry.get("tok-A").unwrap().is_selected);
        assert!(!registry.get("tok-B").unwrap().is_selected);
        assert_eq!(registry.select_all(false), 1);
        assert!(!registry.get("tok-A").unwrap().is_selected);
    }

    #[test]
    fn test_set_selection_skips_inactive() {
        let mut registry = Registry::new(10);
        registry.register("tok-A", "u1", meta("android"), t0()).unwrap();
        registry.register("tok-B", "u1", meta("ios"), t0()).unwrap();
        registry.apply_outcomes(&[], &[failure("tok-B", FailureReason::InvalidToken)], t0());

        let identities: HashSet<String> = ["u1".to_string()].into_iter().collect();
        assert_eq!(registry.set_selection(&identities, true), 1);
        assert!(registry.get("tok-A").unwrap().is_selected);
        assert!(!registry.get("tok-B").unwrap().is_selected);
        assert_eq!(registry.resolve_targets(&Target::Selected), vec!["tok-A"]);
    }

    #[test]
    fn test_apply_outcomes_deactivates_only_on_permanent_reasons() {
        let reasons = [
            FailureReason::Unregistered,
            FailureReason::InvalidToken,
            FailureReason::InvalidPayload,
            FailureReason::RateLimited,
            FailureReason::Unavailable,
            FailureReason::BatchTransportFailure,
            FailureReason::Unknown,
        ];
        let mut registry = Registry::new(100);
        let failures: Vec<DeliveryFailure> = reasons
            .iter()
            .enumerate()
            .map(|(i, reason)| {
                let address = format!("tok-{i}");
                registry
                    .register(&address, "u1", RegistrationMetadata::default(), t0())
                    .unwrap();
                failure(&address, *reason)
            })
            .collect();

        let summary = registry.apply_outcomes(&[], &failures, t0());

        assert_eq!(summary.failures_applied, reasons.len());
        assert_eq!(summary.deactivated, 2);
        for failure in &failures {
            let registration = registry.get(&failure.address).unwrap();
            assert_eq!(registration.failed_deliveries, 1);
            assert_eq!(registration.is_active, !failure.reason.is_permanent());
        }
    }

    #[test]
    fn test_apply_outcomes_success_refreshes_liveness() {
        let mut registry = Registry::new(10);
        registry
            .register("tok-A", "u1", RegistrationMetadata::default(), t0())
            .unwrap();
        let later = t0() + Duration::days(2);

        let summary = registry.apply_outcomes(&[success("tok-A"), success("gone-token")], &[], later);

        assert_eq!(summary.successes_applied, 1);
        assert_eq!(summary.unknown_addresses, 1);
        let registration = registry.get("tok-A").unwrap();
        assert_eq!(registration.successful_deliveries, 1);
        assert_eq!(registration.last_active_at, later);
    }

    #[test]
    fn test_cleanup_removes_exactly_inactive_and_stale() {
        let mut registry = Registry::new(100);
        let now = t0() + Duration::days(60);
        registry
            .register("fresh", "u1", RegistrationMetadata::default(), now - Duration::days(1))
            .unwrap();
        registry
            .register("edge", "u2", RegistrationMetadata::default(), now - Duration::days(VALIDITY_WINDOW_DAYS))
            .unwrap();
        registry
            .register("stale", "u3", RegistrationMetadata::default(), now - Duration::days(31))
            .unwrap();
        registry
            .register("dead", "u4", RegistrationMetadata::default(), now)
            .unwrap();
        registry.apply_outcomes(&[], &[failure("dead", FailureReason::Unregistered)], now);

        assert_eq!(registry.cleanup(now), 2);
        assert!(registry.get("fresh").is_some());
        assert!(registry.get("edge").is_some());
        assert!(registry.get("stale").is_none());
        assert!(registry.get("dead").is_none());
    }

    #[test]
    fn test_capacity_ceiling_triggers_cleanup() {
        let mut registry = Registry::new(2);
        registry.register("tok-A", "u1", RegistrationMetadata::default(), t0()).unwrap();
        registry.register("tok-B", "u2", RegistrationMetadata::default(), t0()).unwrap();
        registry.apply_outcomes(&[], &[failure("tok-B", FailureReason::Unregistered)], t0());

        let (is_new, _) = registry
            .register("tok-C", "u3", RegistrationMetadata::default(), t0())
            .unwrap();

        assert!(is_new);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("tok-B").is_none());

        // Nothing left to sweep: the insert still goes through.
        registry.register("tok-D", "u4", RegistrationMetadata::default(), t0()).unwrap();
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_search_is_case_insensitive_and_active_only() {
        let mut registry = Registry::new(10);
        registry
            .register(
                "tok-A",
                "user-Alice",
                RegistrationMetadata {
                    display_name: Some("Alice Doe".to_string()),
                    ..Default::default()
                },
                t0(),
            )
            .unwrap();
        registry
            .register(
                "tok-B",
                "u2",
                RegistrationMetadata {
                    contact: Some("BOB@example.com".to_string()),
                    ..Default::default()
                },
                t0(),
            )
            .unwrap();
        registry
            .register(
                "tok-C",
                "alice-old",
                RegistrationMetadata::default(),
                t0(),
            )
            .unwrap();
        registry.apply_outcomes(&[], &[failure("tok-C", FailureReason::InvalidToken)], t0());

        let found = registry.search("ALICE").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].address, "tok-A");
        assert_eq!(registry.search("bob@").unwrap()[0].address, "tok-B");
        assert!(registry.search("nobody").unwrap().is_empty());
        assert!(matches!(registry.search("  "), Err(PushError::InvalidInput(_))));
    }

    #[test]
    fn test_stats() {
        let mut registry = Registry::new(10);
        let now = t0() + Duration::days(3);
        registry.register("tok-A", "u1", meta("android"), t0()).unwrap();
        registry.register("tok-B", "u2", meta("android"), now).unwrap();
        registry
            .register("tok-C", "u3", RegistrationMetadata::default(), now)
            .unwrap();
        registry.select_all(true);
        registry.apply_outcomes(
            &[success("tok-A"), success("tok-B")],
            &[failure("tok-C", FailureReason::Unregistered)],
            now,
        );

        let stats = registry.stats(now);
        assert_eq!(stats.total_registrations, 3);
        assert_eq!(stats.active_registrations, 2);
        assert_eq!(stats.inactive_registrations, 1);
        // tok-C keeps its flag but is no longer a target
        assert_eq!(stats.selected_registrations, 2);
        assert_eq!(stats.recent_registrations, 2);
        assert_eq!(stats.platforms.get("android"), Some(&2));
        assert_eq!(stats.platforms.get("unknown"), Some(&1));
        assert_eq!(stats.total_successful_deliveries, 2);
        assert_eq!(stats.total_failed_deliveries, 1);
    }
}
