//! Soft-delete lifecycle: records are marked deleted, never removed.
//!
//! The transition is one-way. Every standard read path filters on
//! [`SoftDeletable::is_visible`], so an invisible record surfaces exactly
//! like a nonexistent one. Follow edges are exempt from this scheme; they
//! are removed outright.

use crate::model::user::User;
use time::UtcDateTime;

pub trait SoftDeletable {
    fn deleted_at(&self) -> Option<UtcDateTime>;

    /// Whether standard reads (and thus mutation target resolution) may
    /// observe this record.
    fn is_visible(&self) -> bool {
        self.deleted_at().is_none()
    }
}

impl SoftDeletable for User {
    fn deleted_at(&self) -> Option<UtcDateTime> {
        self.deleted_at
    }
}
