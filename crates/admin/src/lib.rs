//! Admin directory service.
//!
//! Creates and manages admin-user records under the role hierarchy, handles
//! authentication and session issuance, and answers availability queries for
//! team assignment.

mod directory;
mod session;

pub use directory::{
    AdminDirectory, AdminPatch, AvailabilityFilter, AvailableAdmin, NewAdmin,
};
pub use session::{Session, SESSION_TTL_HOURS};
