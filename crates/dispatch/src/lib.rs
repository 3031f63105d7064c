//! External collaborators consumed by the LeadDesk core.
//!
//! The email dispatcher and the repository provisioner are remote services;
//! the core only depends on the traits here. HTTP-backed implementations and
//! null fakes are provided.

mod email;
mod repo;

pub use email::{DispatchOutcome, EmailDispatcher, HttpEmailDispatcher, NullDispatcher};
pub use repo::{
    CollaboratorInvite, CollaboratorResult, GithubProvisioner, NullProvisioner, ProvisionedRepo,
    RepoProvisioner, RepoRequest,
};
