//! Expiry derivation and checks

use chrono::{DateTime, Duration, Utc};
use guestvault_core::{
    AccessLevel, GuestRecord, Location, Permissions, RetentionPolicy, VaultError,
    MAX_ACCESS_WINDOW_HOURS,
};

/// Computes expiry timestamps from a [`RetentionPolicy`]
#[derive(Debug, Clone, Default)]
pub struct ExpirationCalculator {
    policy: RetentionPolicy,
}

impl ExpirationCalculator {
    /// Create a calculator for the given policy
    pub fn new(policy: RetentionPolicy) -> Self {
        Self { policy }
    }

    /// Policy in effect
    pub fn policy(&self) -> &RetentionPolicy {
        &self.policy
    }

    /// Global expiry for a newly classified record; `None` is permanent
    pub fn expiry_for(
        &self,
        access_level: AccessLevel,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, VaultError> {
        match access_level {
            AccessLevel::ReceptionTemporary => {
                offset(now, self.policy.reception_temp_access()).map(Some)
            }
            AccessLevel::ManagerOnly => offset(now, self.policy.manager_retention()).map(Some),
            AccessLevel::ReceptionOnly | AccessLevel::SharedAccess => Ok(None),
        }
    }

    /// End of reception-side visibility; `None` when reception has no access.
    ///
    /// A permission override longer than [`MAX_ACCESS_WINDOW_HOURS`] is rejected.
    pub fn reception_expiry_for(
        &self,
        permissions: &Permissions,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, VaultError> {
        if !permissions.allow_reception_access {
            return Ok(None);
        }
        let window = match permissions.temporary_access_duration_hours {
            Some(hours) if hours > MAX_ACCESS_WINDOW_HOURS => {
                return Err(VaultError::invalid(format!(
                    "temporary access of {hours}h exceeds the {MAX_ACCESS_WINDOW_HOURS}h limit"
                )))
            }
            Some(hours) => Duration::hours(i64::from(hours)),
            None => self.policy.reception_temp_access(),
        };
        offset(now, window).map(Some)
    }

    /// Reception visibility never outlives the record itself
    pub fn clamp_reception_expiry(
        reception: Option<DateTime<Utc>>,
        expires: Option<DateTime<Utc>>,
    ) -> Option<DateTime<Utc>> {
        match (reception, expires) {
            (Some(reception), Some(expires)) => Some(reception.min(expires)),
            (reception, _) => reception,
        }
    }

    /// Both expiries for a record, clamped
    pub fn expiries_for(
        &self,
        access_level: AccessLevel,
        permissions: &Permissions,
        now: DateTime<Utc>,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), VaultError> {
        let expires_at = self.expiry_for(access_level, now)?;
        let reception = Self::clamp_reception_expiry(
            self.reception_expiry_for(permissions, now)?,
            expires_at,
        );
        Ok((expires_at, reception))
    }

    /// Whether the record's window at `location` has closed.
    ///
    /// Reception checks `reception_access_expires_at`, the manager checks
    /// `expires_at`. A missing timestamp never expires; a timestamp equal to
    /// `now` already has.
    pub fn is_expired(record: &GuestRecord, location: Location, now: DateTime<Utc>) -> bool {
        let deadline = match location {
            Location::Reception => record.reception_access_expires_at,
            Location::Manager => record.expires_at,
        };
        deadline.is_some_and(|deadline| deadline <= now)
    }
}

fn offset(now: DateTime<Utc>, window: Duration) -> Result<DateTime<Utc>, VaultError> {
    now.checked_add_signed(window)
        .ok_or_else(|| VaultError::invalid("expiry falls outside the supported date range"))
}
