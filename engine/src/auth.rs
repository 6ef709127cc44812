//! Authorization seam.
//!
//! The engine treats "is this caller a member / internal / governance
//! principal" as boolean capability checks answered by an external
//! service. Implementors decide how those capabilities are granted.

use tidepool_types::Address;

/// Capability checks for the three principal classes.
pub trait RoleOracle {
    /// Whether the caller may stake, request deallocations, and withdraw.
    fn is_member(&self, caller: &Address) -> bool;

    /// Whether the caller may push burns and rewards.
    fn is_internal(&self, caller: &Address) -> bool;

    /// Whether the caller may update protocol parameters.
    fn is_governance(&self, caller: &Address) -> bool;
}
