//! Access matrix for guest records
//!
//! Decisions depend only on the record, the requesting partition, the action,
//! and the current time:
//!
//! | access level         | manager | reception view | reception update/delete     |
//! |----------------------|---------|----------------|-----------------------------|
//! | `ReceptionOnly`      | yes     | yes            | `allow_reception_modify/delete` |
//! | `SharedAccess`       | yes     | yes            | `allow_reception_modify/delete` |
//! | `ReceptionTemporary` | yes     | yes            | yes                         |
//! | `ManagerOnly`        | yes     | no             | no                          |
//!
//! An expired window at the requesting partition overrides the matrix.

use chrono::{DateTime, Utc};
use guestvault_core::{AccessAction, AccessLevel, DenialReason, GuestRecord, Location};
use serde::{Deserialize, Serialize};

use crate::ExpirationCalculator;

/// Outcome of an access check with a human-readable reason
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
    /// Whether access is allowed
    pub allowed: bool,
    /// Why access was refused
    pub denial: Option<DenialReason>,
    /// Reason for the decision
    pub reason: String,
}

impl AccessDecision {
    /// Allow access
    pub fn allow() -> Self {
        Self {
            allowed: true,
            denial: None,
            reason: "access granted".to_string(),
        }
    }

    /// Deny access with reason
    pub fn deny(denial: DenialReason, reason: impl Into<String>) -> Self {
        Self {
            allowed: false,
            denial: Some(denial),
            reason: reason.into(),
        }
    }
}

/// Stateless evaluator of the access matrix
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessControlEvaluator;

impl AccessControlEvaluator {
    /// Create an evaluator
    pub fn new() -> Self {
        Self
    }

    /// Whether `location` may perform `action` on `record` at `now`
    pub fn check_access(
        &self,
        record: &GuestRecord,
        location: Location,
        action: AccessAction,
        now: DateTime<Utc>,
    ) -> bool {
        let decision = self.decide(record, location, action, now);
        if !decision.allowed {
            tracing::trace!(
                record_id = %record.id,
                %location,
                ?action,
                reason = %decision.reason,
                "access check failed"
            );
        }
        decision.allowed
    }

    /// Same as [`check_access`](Self::check_access) with the reason attached
    pub fn decide(
        &self,
        record: &GuestRecord,
        location: Location,
        action: AccessAction,
        now: DateTime<Utc>,
    ) -> AccessDecision {
        if ExpirationCalculator::is_expired(record, location, now) {
            return AccessDecision::deny(
                DenialReason::Expired,
                format!("access window at {location} has closed"),
            );
        }

        if location == Location::Manager {
            return AccessDecision::allow();
        }

        let permissions = &record.permissions;
        match (record.access_level, action) {
            (AccessLevel::ManagerOnly, _) => {
                AccessDecision::deny(DenialReason::Forbidden, "record is manager-only")
            }
            (AccessLevel::ReceptionTemporary, _) => AccessDecision::allow(),
            (AccessLevel::ReceptionOnly | AccessLevel::SharedAccess, AccessAction::View) => {
                AccessDecision::allow()
            }
            (AccessLevel::ReceptionOnly | AccessLevel::SharedAccess, AccessAction::Update) => {
                if permissions.allow_reception_modify {
                    AccessDecision::allow()
                } else {
                    AccessDecision::deny(DenialReason::Forbidden, "reception may not modify")
                }
            }
            (AccessLevel::ReceptionOnly | AccessLevel::SharedAccess, AccessAction::Delete) => {
                if permissions.allow_reception_delete {
                    AccessDecision::allow()
                } else {
                    AccessDecision::deny(DenialReason::Forbidden, "reception may not delete")
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use guestvault_core::Permissions;
    use guestvault_testkit::{test_start, RecordBuilder};

    const EVALUATOR: AccessControlEvaluator = AccessControlEvaluator;

    fn record(level: AccessLevel, permissions: Permissions) -> GuestRecord {
        RecordBuilder::new(test_start())
            .access_level(level)
            .permissions(permissions)
            .build()
    }

    #[test]
    fn manager_is_allowed_everything_while_unexpired() {
        for level in AccessLevel::ALL {
            let record = record(level, Permissions::manager_only());
            for action in AccessAction::ALL {
                assert!(
                    EVALUATOR.check_access(&record, Location::Manager, action, test_start()),
                    "{level:?} {action:?}"
                );
            }
        }
    }

    #[test]
    fn reception_truth_table() {
        let permissive = Permissions {
            allow_reception_modify: true,
            allow_reception_delete: true,
            ..Permissions::default()
        };
        let strict = Permissions {
            allow_reception_modify: false,
            allow_reception_delete: false,
            ..Permissions::default()
        };

        // (level, permissions, [view, update, delete])
        let table = [
            (AccessLevel::ReceptionOnly, &permissive, [true, true, true]),
            (AccessLevel::ReceptionOnly, &strict, [true, false, false]),
            (AccessLevel::SharedAccess, &permissive, [true, true, true]),
            (AccessLevel::SharedAccess, &strict, [true, false, false]),
            (AccessLevel::ReceptionTemporary, &permissive, [true, true, true]),
            (AccessLevel::ReceptionTemporary, &strict, [true, true, true]),
            (AccessLevel::ManagerOnly, &permissive, [false, false, false]),
            (AccessLevel::ManagerOnly, &strict, [false, false, false]),
        ];

        for (level, permissions, expected) in table {
            let record = record(level, permissions.clone());
            for (action, allowed) in AccessAction::ALL.into_iter().zip(expected) {
                assert_eq!(
                    EVALUATOR.check_access(&record, Location::Reception, action, test_start()),
                    allowed,
                    "{level:?} {action:?} {permissions:?}"
                );
            }
        }
    }

    #[test]
    fn expired_reception_window_denies_with_reason() {
        let record = RecordBuilder::new(test_start())
            .access_level(AccessLevel::ReceptionTemporary)
            .reception_expires_at(test_start() + Duration::hours(24))
            .build();

        let before = test_start() + Duration::hours(23);
        assert!(EVALUATOR.check_access(&record, Location::Reception, AccessAction::View, before));

        let at = test_start() + Duration::hours(24);
        let decision = EVALUATOR.decide(&record, Location::Reception, AccessAction::View, at);
        assert!(!decision.allowed);
        assert_eq!(decision.denial, Some(DenialReason::Expired));

        // manager window is independent
        assert!(EVALUATOR.check_access(&record, Location::Manager, AccessAction::View, at));
    }

    #[test]
    fn expired_manager_window_denies_manager() {
        let record = RecordBuilder::new(test_start())
            .access_level(AccessLevel::ManagerOnly)
            .expires_at(test_start() + Duration::days(1))
            .build();
        let later = test_start() + Duration::days(2);
        let decision = EVALUATOR.decide(&record, Location::Manager, AccessAction::Delete, later);
        assert_eq!(decision.denial, Some(DenialReason::Expired));
    }

    #[test]
    fn manager_only_denial_is_forbidden_not_expired() {
        let record = record(AccessLevel::ManagerOnly, Permissions::default());
        let decision =
            EVALUATOR.decide(&record, Location::Reception, AccessAction::View, test_start());
        assert_eq!(decision.denial, Some(DenialReason::Forbidden));
        assert_eq!(decision.reason, "record is manager-only");
    }
}
