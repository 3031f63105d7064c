//! LeadDesk core data models.
//!
//! This crate defines the entities and invariants of the consultation
//! lifecycle: consultations, admin users with a role hierarchy, projects
//! converted from consultations, and the audit-event log.

#![warn(missing_docs)]

// Core identities
mod id;

// Errors
mod error;

// Entities
mod admin;
mod audit;
mod consultation;
mod project;

// Cross-cutting
pub mod authz;
mod credential;
pub mod validate;

// Re-exports
pub use id::*;

pub use error::{Error, Result};

pub use admin::{AdminUser, Role};
pub use audit::{Actor, AuditAction, AuditEvent};
pub use consultation::{Consultation, ConsultationFilter, ConsultationStats, ConsultationStatus};
pub use credential::Credential;
pub use project::{
    Milestone, MilestoneStatus, Project, ProjectStatus, RepoPermission, RepositoryInfo,
    TeamMember,
};

/// Timestamp type
pub type Time = chrono::DateTime<chrono::Utc>;
