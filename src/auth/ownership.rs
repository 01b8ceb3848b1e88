//! Ownership checks for vendor and product creation
//!
//! The auth middleware only proves who the caller is. Whether the caller may
//! create a vendor, or a product under a given vendor, depends on what the
//! caller already owns, so these checks read storage.
//!
//! The vendor check is a read followed by a separate write. Two concurrent
//! requests can both pass it; the UNIQUE constraint on `vendors.user_id`
//! rejects the second insert and callers map that to
//! [`OwnershipError::VendorAlreadyExists`].

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use super::identity::Identity;
use crate::database::Database;
use crate::error::{DbError, OwnershipError};
use crate::models::Vendor;
use crate::otel::AuthMetrics;

/// Column named by SQLite when the one-vendor-per-user index rejects an insert
const VENDOR_OWNER_INDEX: &str = "vendors.user_id";

/// Storage-backed ownership authorization
pub struct OwnershipGuard<D: Database> {
    db: Arc<D>,
    metrics: Option<Arc<AuthMetrics>>,
}

impl<D: Database> OwnershipGuard<D> {
    /// Create a new guard
    pub fn new(db: Arc<D>) -> Self {
        Self { db, metrics: None }
    }

    /// Record denials on the given metrics
    pub fn with_metrics(mut self, metrics: Arc<AuthMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Check that the caller may create a vendor
    ///
    /// Fails with `UnknownUser` if the token subject no longer exists and
    /// with `VendorAlreadyExists` if the caller already owns a vendor.
    pub async fn ensure_can_create_vendor(&self, identity: &Identity) -> Result<(), OwnershipError> {
        if self.db.get_user(identity.user_id).await?.is_none() {
            self.deny(identity, "unknown_user");
            return Err(OwnershipError::UnknownUser);
        }

        if let Some(existing) = self.db.get_vendor_by_user(identity.user_id).await? {
            debug!(vendor_id = %existing.id, "Caller already owns a vendor");
            self.deny(identity, "vendor_exists");
            return Err(OwnershipError::VendorAlreadyExists);
        }

        Ok(())
    }

    /// Resolve the caller's vendor and check it is the product's target
    ///
    /// The target is compared by id only; it is never looked up, so a
    /// foreign vendor id and a nonexistent one are both `ForeignVendor`.
    pub async fn authorize_product_vendor(
        &self,
        identity: &Identity,
        target_vendor_id: Uuid,
    ) -> Result<Vendor, OwnershipError> {
        let Some(own_vendor) = self.db.get_vendor_by_user(identity.user_id).await? else {
            self.deny(identity, "no_vendor");
            return Err(OwnershipError::NoVendor);
        };

        if own_vendor.id != target_vendor_id {
            self.deny(identity, "foreign_vendor");
            return Err(OwnershipError::ForeignVendor);
        }

        Ok(own_vendor)
    }

    /// Translate an insert failure on `vendors` into an ownership error
    ///
    /// Only the one-vendor-per-user UNIQUE index means the caller already has
    /// a vendor. A foreign key failure means the account went away after the
    /// pre-check.
    pub fn vendor_insert_error(&self, identity: &Identity, err: DbError) -> OwnershipError {
        match err {
            DbError::ConstraintViolation(detail) if detail.contains(VENDOR_OWNER_INDEX) => {
                debug!(detail = %detail, "Vendor insert lost the uniqueness race");
                self.deny(identity, "vendor_exists");
                OwnershipError::VendorAlreadyExists
            }
            DbError::ConstraintViolation(detail) if detail.contains("FOREIGN KEY") => {
                debug!(detail = %detail, "Vendor owner deleted during insert");
                OwnershipError::UnknownUser
            }
            other => OwnershipError::Storage(other),
        }
    }

    fn deny(&self, identity: &Identity, rule: &'static str) {
        warn!(user_id = %identity.user_id, rule, "Ownership check denied");
        if let Some(metrics) = &self.metrics {
            metrics.record_ownership_denial(rule);
        }
    }
}
