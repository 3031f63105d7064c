//! Admin user model and role hierarchy.

use serde::{Deserialize, Serialize};

use crate::credential::Credential;
use crate::id::AdminId;
use crate::Time;

/// An administrative user of the lead-management system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminUser {
    /// Unique identifier
    pub id: AdminId,

    /// Login name, unique across all admins (compared case-insensitively)
    pub username: String,

    /// Contact email, unique across all admins (compared case-insensitively)
    pub email: String,

    /// Salted argon2 hash of the password; the plaintext is never stored
    pub password: Credential,

    /// Display name
    pub display_name: String,

    /// Role in the privilege hierarchy
    pub role: Role,

    /// Department
    pub department: Option<String>,

    /// Skill tags
    pub skills: Vec<String>,

    /// Current assigned-project count (lead or member seats)
    pub workload: u32,

    /// Maximum concurrent assignments
    pub max_workload: u32,

    /// Whether the account may log in and be assigned work
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: Time,

    /// Last successful login
    pub last_login: Option<Time>,

    /// The admin who created this record (None for the seed record)
    pub created_by: Option<AdminId>,
}

impl AdminUser {
    /// Remaining assignment capacity.
    pub fn available_capacity(&self) -> u32 {
        self.max_workload.saturating_sub(self.workload)
    }

    /// Whether another assignment would fit.
    pub fn has_capacity(&self) -> bool {
        self.workload < self.max_workload
    }
}

/// Role hierarchy, declared in ascending privilege so that `Ord` reflects it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Read-only access
    Viewer,
    /// Individual contributor
    Developer,
    /// Business stakeholder
    Executive,
    /// May lead project teams
    TeamLead,
    /// Operational administrator
    Admin,
    /// Full control, including admin management
    SuperAdmin,
}

impl Role {
    /// Whether this role may be assigned as a project team lead.
    pub fn is_lead_eligible(self) -> bool {
        self >= Role::TeamLead
    }

    /// Stable string form used in serialized records and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Developer => "developer",
            Self::Executive => "executive",
            Self::TeamLead => "team_lead",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "viewer" => Ok(Self::Viewer),
            "developer" => Ok(Self::Developer),
            "executive" => Ok(Self::Executive),
            "team_lead" => Ok(Self::TeamLead),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            other => Err(format!("unknown role: {other}")),
        }
    }
}
