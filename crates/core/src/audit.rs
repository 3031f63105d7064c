//! Audit event model - an append-only trail of admin-facing actions.

use serde::{Deserialize, Serialize};

use crate::id::{AdminId, AuditEventId};
use crate::Time;

/// An audit event records one action against one target at one time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// Unique identifier
    pub id: AuditEventId,

    /// When it happened
    pub timestamp: Time,

    /// Who performed the action
    pub actor: Actor,

    /// What action was taken
    pub action: AuditAction,

    /// Id of the affected record, if any
    pub target: Option<String>,

    /// Action-specific details
    pub metadata: serde_json::Value,
}

impl AuditEvent {
    /// Create a new event stamped now.
    pub fn new(actor: Actor, action: AuditAction) -> Self {
        Self {
            id: AuditEventId::new(),
            timestamp: chrono::Utc::now(),
            actor,
            action,
            target: None,
            metadata: serde_json::Value::Null,
        }
    }

    /// Attach the affected record id.
    pub fn target(mut self, target: impl std::fmt::Display) -> Self {
        self.target = Some(target.to_string());
        self
    }

    /// Attach action-specific metadata.
    pub fn metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// Identifier for who performed an action.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor(pub String);

impl Actor {
    /// An authenticated admin.
    pub fn admin(id: AdminId) -> Self {
        Self(id.to_string())
    }

    /// The unauthenticated intake form.
    pub fn public() -> Self {
        Self("public".to_string())
    }

    /// The system itself (seeding, background dispatch).
    pub fn system() -> Self {
        Self("system".to_string())
    }
}

/// The closed set of audited actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// A consultation was submitted
    ConsultationSubmitted,
    /// A consultation changed status
    ConsultationTransitioned,
    /// A consultation's notes or follow-up changed
    ConsultationAnnotated,
    /// A consultation was permanently deleted
    ConsultationDeleted,
    /// A consultation was converted into a project
    ConsultationConverted,
    /// An admin record was created
    AdminCreated,
    /// An admin record was updated
    AdminUpdated,
    /// An admin record was deleted
    AdminDeleted,
    /// An admin's active flag was flipped
    AdminActiveToggled,
    /// An admin logged in
    LoginSucceeded,
    /// A team lead was assigned
    TeamLeadAssigned,
    /// A team lead was removed
    TeamLeadRemoved,
    /// A team member was added
    TeamMemberAdded,
    /// A team member was removed
    TeamMemberRemoved,
    /// A repository was linked
    RepositoryLinked,
    /// A repository was unlinked
    RepositoryUnlinked,
    /// A project changed status
    ProjectStatusChanged,
    /// A milestone was added or updated
    MilestoneUpdated,
}
