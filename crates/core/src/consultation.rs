//! Consultation model - the record a lead submits through the intake form.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::id::{ConsultationId, ProjectId};
use crate::Time;

/// A consultation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consultation {
    /// Unique identifier
    pub id: ConsultationId,

    /// Contact name
    pub name: String,

    /// Contact email
    pub email: String,

    /// Contact phone
    pub phone: Option<String>,

    /// Company name
    pub company: Option<String>,

    /// Industry sector
    pub industry: Option<String>,

    /// Requested project type (e.g. "AI Chatbot")
    pub project_type: String,

    /// Budget band as submitted
    pub budget: String,

    /// Desired timeline
    pub timeline: Option<String>,

    /// Free-text project description
    pub project_details: String,

    /// Additional notes from the submitter
    pub additional_notes: Option<String>,

    /// Names of files attached to the submission (contents are not persisted)
    pub uploaded_files: Vec<String>,

    /// Submission timestamp
    pub submitted_at: Time,

    /// Current lifecycle status
    pub status: ConsultationStatus,

    /// Internal admin notes
    pub notes: Option<String>,

    /// Scheduled follow-up date
    pub follow_up: Option<Time>,

    /// Last mutation timestamp
    pub last_updated: Time,

    /// Whether the confirmation email was sent (None until dispatch settles)
    pub email_sent: Option<bool>,

    /// Whether the admin notification was sent
    pub admin_notified: Option<bool>,

    /// The project this consultation was converted into, if any
    pub project_id: Option<ProjectId>,
}

/// Lifecycle status of a consultation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsultationStatus {
    /// Submitted, not yet reviewed
    Pending,
    /// An admin has reached out to the lead
    Contacted,
    /// Consultation finished; eligible for conversion
    Completed,
    /// Converted into a project (terminal)
    Converted,
    /// Cancelled (terminal)
    Cancelled,
}

impl ConsultationStatus {
    /// Whether the state machine permits moving from `self` to `to`.
    ///
    /// Edges: pending -> {contacted, cancelled}; contacted -> {completed,
    /// cancelled}; completed -> converted. Converted and cancelled are
    /// terminal.
    pub fn can_transition(self, to: ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        matches!(
            (self, to),
            (Pending, Contacted)
                | (Pending, Cancelled)
                | (Contacted, Completed)
                | (Contacted, Cancelled)
                | (Completed, Converted)
        )
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converted | Self::Cancelled)
    }

    /// Stable string form used in serialized records and the CLI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Contacted => "contacted",
            Self::Completed => "completed",
            Self::Converted => "converted",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConsultationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "contacted" => Ok(Self::Contacted),
            "completed" => Ok(Self::Completed),
            "converted" => Ok(Self::Converted),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(format!("unknown consultation status: {other}")),
        }
    }
}

/// Filter for querying consultations.
#[derive(Debug, Clone, Default)]
pub struct ConsultationFilter {
    /// Filter by status
    pub status: Option<ConsultationStatus>,

    /// Restrict to submissions within [from, to]
    pub submitted_between: Option<(Time, Time)>,
}

/// Aggregate counts over the consultation collection.
///
/// Computed in one pass on demand; never cached.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConsultationStats {
    /// Total record count
    pub total: usize,

    /// Pending count
    pub pending: usize,

    /// Contacted count
    pub contacted: usize,

    /// Completed count
    pub completed: usize,

    /// Converted count
    pub converted: usize,

    /// Cancelled count
    pub cancelled: usize,

    /// Submissions within the last 7 days
    pub last_7_days: usize,

    /// Submissions within the last 30 days
    pub last_30_days: usize,

    /// Group-by counts per project type
    pub by_project_type: HashMap<String, usize>,

    /// Group-by counts per budget band
    pub by_budget: HashMap<String, usize>,
}
