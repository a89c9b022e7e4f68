//! Lifecycle contract shared by every persisted aggregate.
//!
//! An entity carries a stable identity (assigned once, never replaced), a
//! creation timestamp written once, and an update timestamp that only moves
//! forward.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DomainResult;

/// Identity and audit-timestamp access for persisted entities.
pub trait DomainEntity: Clone + Send + Sync + 'static {
    /// Short kind name used in logs ("user", "prescription")
    const KIND: &'static str;

    /// Current identity, `None` until first persisted
    fn id(&self) -> Option<&str>;

    fn id_slot(&mut self) -> &mut Option<String>;

    fn created_date(&self) -> DateTime<Utc>;

    fn updated_date(&self) -> DateTime<Utc>;

    fn set_created_date(&mut self, at: DateTime<Utc>);

    fn set_updated_date(&mut self, at: DateTime<Utc>);

    /// Generate an identity if none is present.
    ///
    /// Returns `true` when a new identity was assigned. An existing identity
    /// is never replaced.
    fn ensure_id(&mut self) -> bool {
        let slot = self.id_slot();
        if slot.is_some() {
            return false;
        }
        *slot = Some(Uuid::new_v4().to_string());
        true
    }

    /// Stamp both audit timestamps for a first insert.
    fn stamp_created(&mut self, now: DateTime<Utc>) {
        self.set_created_date(now);
        self.set_updated_date(now);
    }

    /// Advance `updated_date`, never moving it backwards.
    fn touch(&mut self, now: DateTime<Utc>) {
        let next = now.max(self.updated_date());
        self.set_updated_date(next);
    }
}

/// Result of applying a patch onto an existing entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The patch carried a new credential value that still needs guarding
    pub credential_supplied: bool,
}

/// Whitelisted partial updates for an entity.
pub trait Mergeable: DomainEntity {
    /// Partial field set accepted by `merge`
    type Patch: Send + 'static;

    /// Check required fields before a create.
    fn validate(&self) -> DomainResult<()>;

    /// Apply the mutable fields of `patch`. Identity and `created_date` are
    /// never touched; `updated_date` is advanced to `now`.
    fn merge(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> DomainResult<MergeOutcome>;

    /// Secret field the credential guard must hash before persistence
    fn credential_mut(&mut self) -> Option<&mut String> {
        None
    }
}
