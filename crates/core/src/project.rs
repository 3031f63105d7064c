//! Project model - the record a completed consultation converts into.

use serde::{Deserialize, Serialize};

use crate::id::{AdminId, ConsultationId, MilestoneId, ProjectId};
use crate::Time;

/// A delivery project, created only by converting a completed consultation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Unique identifier
    pub id: ProjectId,

    /// The consultation this project was converted from
    pub consultation_id: ConsultationId,

    /// Project name
    pub name: String,

    /// Description (defaults to the consultation's project details)
    pub description: String,

    /// Client contact name, copied at conversion time
    pub client_name: String,

    /// Client email, copied at conversion time
    pub client_email: String,

    /// Client company, copied at conversion time
    pub client_company: Option<String>,

    /// Project type, copied at conversion time
    pub project_type: String,

    /// Current delivery status
    pub status: ProjectStatus,

    /// Creation timestamp
    pub created_at: Time,

    /// Planned start date
    pub start_date: Option<Time>,

    /// Estimated end date
    pub estimated_end_date: Option<Time>,

    /// Actual end date, stamped when the project completes
    pub actual_end_date: Option<Time>,

    /// Budget band
    pub budget: Option<String>,

    /// Technology tags
    pub technologies: Vec<String>,

    /// Team member seats
    pub team_members: Vec<TeamMember>,

    /// Team lead, if assigned
    pub team_lead: Option<AdminId>,

    /// Linked repository, if provisioned
    pub repository: Option<RepositoryInfo>,

    /// Milestones
    pub milestones: Vec<Milestone>,

    /// Free-text notes
    pub notes: Option<String>,

    /// The admin who performed the conversion
    pub created_by: AdminId,
}

impl Project {
    /// Whether the given admin already holds a seat (lead or member).
    pub fn has_seat(&self, admin_id: AdminId) -> bool {
        self.team_lead == Some(admin_id)
            || self.team_members.iter().any(|m| m.admin_id == admin_id)
    }
}

/// Delivery status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    /// Scoping and team assembly
    Planning,
    /// In delivery
    Active,
    /// Paused
    OnHold,
    /// Delivered (terminal)
    Completed,
    /// Abandoned (terminal)
    Cancelled,
}

impl ProjectStatus {
    /// Whether the state machine permits moving from `self` to `to`.
    ///
    /// Edges: planning -> {active, on-hold, cancelled}; active ->
    /// {completed, on-hold, cancelled}; on-hold -> {active, cancelled}.
    /// Completed and cancelled are terminal.
    pub fn can_transition(self, to: ProjectStatus) -> bool {
        use ProjectStatus::*;
        matches!(
            (self, to),
            (Planning, Active)
                | (Planning, OnHold)
                | (Planning, Cancelled)
                | (Active, Completed)
                | (Active, OnHold)
                | (Active, Cancelled)
                | (OnHold, Active)
                | (OnHold, Cancelled)
        )
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Stable string form used in serialized records and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planning => "planning",
            Self::Active => "active",
            Self::OnHold => "on-hold",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ProjectStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(Self::Planning),
            "active" => Ok(Self::Active),
            "on-hold" => Ok(Self::OnHold),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown project status: {other}")),
        }
    }
}

/// A team member seat on a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamMember {
    /// The admin holding the seat
    pub admin_id: AdminId,

    /// Repository permission granted with the seat
    pub permission: RepoPermission,
}

/// Repository collaborator permission levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepoPermission {
    /// Read-only
    Pull,
    /// Read/write
    Push,
    /// Full control
    Admin,
}

impl RepoPermission {
    /// Stable string form, matching the provisioner's wire values.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pull => "pull",
            Self::Push => "push",
            Self::Admin => "admin",
        }
    }
}

impl std::str::FromStr for RepoPermission {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pull" => Ok(Self::Pull),
            "push" => Ok(Self::Push),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown permission: {other}")),
        }
    }
}

/// Linked repository metadata, recorded from the provisioner's response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryInfo {
    /// Repository name
    pub name: String,

    /// Web URL
    pub url: String,

    /// Clone URL
    pub clone_url: String,

    /// When the repository was linked to the project
    pub linked_at: Time,
}

/// A project milestone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    /// Unique identifier within the project
    pub id: MilestoneId,

    /// What the milestone delivers
    pub description: String,

    /// Current status
    pub status: MilestoneStatus,

    /// Target date
    pub due_date: Option<Time>,

    /// Stamped when the milestone is marked done
    pub completed_at: Option<Time>,
}

/// Status of a milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneStatus {
    /// Not started
    Planned,
    /// Underway
    InProgress,
    /// Delivered
    Done,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowed_edges() {
        use ProjectStatus::*;
        assert!(Planning.can_transition(Active));
        assert!(Planning.can_transition(OnHold));
        assert!(Planning.can_transition(Cancelled));
        assert!(Active.can_transition(Completed));
        assert!(Active.can_transition(OnHold));
        assert!(Active.can_transition(Cancelled));
        assert!(OnHold.can_transition(Active));
        assert!(OnHold.can_transition(Cancelled));
    }

    #[test]
    fn disallowed_edges() {
        use ProjectStatus::*;
        assert!(!Planning.can_transition(Completed));
        assert!(!OnHold.can_transition(Completed));
        assert!(!Completed.can_transition(Active));
        assert!(!Cancelled.can_transition(Planning));
        assert!(!Active.can_transition(Planning));
    }

    #[test]
    fn seat_lookup_covers_lead_and_members() {
        let lead = AdminId::new();
        let member = AdminId::new();
        let outsider = AdminId::new();
        let project = Project {
            id: ProjectId::new(),
            consultation_id: ConsultationId::new(),
            name: "x".into(),
            description: "x".into(),
            client_name: "x".into(),
            client_email: "x@example.com".into(),
            client_company: None,
            project_type: "x".into(),
            status: ProjectStatus::Planning,
            created_at: chrono::Utc::now(),
            start_date: None,
            estimated_end_date: None,
            actual_end_date: None,
            budget: None,
            technologies: Vec::new(),
            team_members: vec![TeamMember {
                admin_id: member,
                permission: RepoPermission::Push,
            }],
            team_lead: Some(lead),
            repository: None,
            milestones: Vec::new(),
            notes: None,
            created_by: lead,
        };
        assert!(project.has_seat(lead));
        assert!(project.has_seat(member));
        assert!(!project.has_seat(outsider));
    }
}
