//! Permission predicate consumed by the calculation workflow.
//!
//! Authentication itself happens elsewhere; the workflow only asks whether a
//! role may move records into the elevated statuses or delete them.

use crate::models::ActorRole;

/// Decides which roles hold elevated capabilities.
pub trait PermissionPolicy: Send + Sync {
    /// Whether `role` may verify, approve or reject a calculation.
    fn can_elevate_status(
        &self,
        role: ActorRole,
    ) -> bool;

    /// Whether `role` may delete a calculation. Defaults to the elevation
    /// predicate.
    fn can_delete(
        &self,
        role: ActorRole,
    ) -> bool {
        self.can_elevate_status(role)
    }
}

/// Tax officers and administrators are elevated; taxpayers are not.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleBasedPolicy;

impl PermissionPolicy for RoleBasedPolicy {
    fn can_elevate_status(
        &self,
        role: ActorRole,
    ) -> bool {
        matches!(role, ActorRole::TaxOfficer | ActorRole::Admin)
    }
}
