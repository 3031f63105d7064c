//! Storage trait abstraction.

use async_trait::async_trait;
use leaddesk_core::{
    AdminId, AdminUser, AuditEvent, Consultation, ConsultationId, Project, ProjectId,
};

/// Error type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Item not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl From<StorageError> for leaddesk_core::Error {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(what) => leaddesk_core::Error::NotFound(what),
            other => leaddesk_core::Error::Storage(other.to_string()),
        }
    }
}

/// Storage abstraction for LeadDesk data.
///
/// Every successful save or delete is durable before the call returns.
/// Deleting a missing id is an error, not a no-op; tests rely on that.
#[async_trait]
pub trait Storage: Send + Sync {
    // === Consultation operations ===

    /// Save a consultation (create or update).
    async fn save_consultation(&mut self, consultation: &Consultation) -> Result<()>;

    /// Load a consultation by ID.
    async fn load_consultation(&self, id: ConsultationId) -> Result<Option<Consultation>>;

    /// List all consultations in submission order.
    async fn list_consultations(&self) -> Result<Vec<Consultation>>;

    /// Delete a consultation. Fails with `NotFound` if the id is absent.
    async fn delete_consultation(&mut self, id: ConsultationId) -> Result<()>;

    // === Admin operations ===

    /// Save an admin user (create or update).
    async fn save_admin(&mut self, admin: &AdminUser) -> Result<()>;

    /// Load an admin user by ID.
    async fn load_admin(&self, id: AdminId) -> Result<Option<AdminUser>>;

    /// List all admin users in creation order.
    async fn list_admins(&self) -> Result<Vec<AdminUser>>;

    /// Delete an admin user. Fails with `NotFound` if the id is absent.
    async fn delete_admin(&mut self, id: AdminId) -> Result<()>;

    // === Project operations ===

    /// Save a project (create or update).
    async fn save_project(&mut self, project: &Project) -> Result<()>;

    /// Load a project by ID.
    async fn load_project(&self, id: ProjectId) -> Result<Option<Project>>;

    /// List all projects in creation order.
    async fn list_projects(&self) -> Result<Vec<Project>>;

    // === Conversion ===

    /// Persist a conversion pair: the new project together with the updated
    /// consultation. Both become visible or neither does.
    async fn save_conversion(
        &mut self,
        consultation: &Consultation,
        project: &Project,
    ) -> Result<()>;

    // === Audit log ===

    /// Append an audit event.
    async fn save_audit_event(&mut self, event: &AuditEvent) -> Result<()>;

    /// List all audit events, oldest first.
    async fn list_audit_events(&self) -> Result<Vec<AuditEvent>>;
}
