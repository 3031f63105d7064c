//! In-memory storage implementation.
//!
//! The injectable fake for tests and ephemeral sessions. Same contract as
//! the JSON backend, including the delete-missing-id error.

use std::collections::HashMap;

use leaddesk_core::{
    AdminId, AdminUser, AuditEvent, Consultation, ConsultationId, Project, ProjectId,
};

use super::{Result, Storage, StorageError};

/// In-process storage backend.
#[derive(Default)]
pub struct MemoryStorage {
    consultations: HashMap<ConsultationId, Consultation>,
    admins: HashMap<AdminId, AdminUser>,
    projects: HashMap<ProjectId, Project>,
    audit: Vec<AuditEvent>,
}

impl MemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl Storage for MemoryStorage {
    async fn save_consultation(&mut self, consultation: &Consultation) -> Result<()> {
        self.consultations
            .insert(consultation.id, consultation.clone());
        Ok(())
    }

    async fn load_consultation(&self, id: ConsultationId) -> Result<Option<Consultation>> {
        Ok(self.consultations.get(&id).cloned())
    }

    async fn list_consultations(&self) -> Result<Vec<Consultation>> {
        let mut all: Vec<Consultation> = self.consultations.values().cloned().collect();
        all.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(all)
    }

    async fn delete_consultation(&mut self, id: ConsultationId) -> Result<()> {
        self.consultations
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("consultation {id}")))
    }

    async fn save_admin(&mut self, admin: &AdminUser) -> Result<()> {
        self.admins.insert(admin.id, admin.clone());
        Ok(())
    }

    async fn load_admin(&self, id: AdminId) -> Result<Option<AdminUser>> {
        Ok(self.admins.get(&id).cloned())
    }

    async fn list_admins(&self) -> Result<Vec<AdminUser>> {
        let mut all: Vec<AdminUser> = self.admins.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn delete_admin(&mut self, id: AdminId) -> Result<()> {
        self.admins
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(format!("admin {id}")))
    }

    async fn save_project(&mut self, project: &Project) -> Result<()> {
        self.projects.insert(project.id, project.clone());
        Ok(())
    }

    async fn load_project(&self, id: ProjectId) -> Result<Option<Project>> {
        Ok(self.projects.get(&id).cloned())
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut all: Vec<Project> = self.projects.values().cloned().collect();
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn save_conversion(
        &mut self,
        consultation: &Consultation,
        project: &Project,
    ) -> Result<()> {
        // Two map inserts; atomic by construction.
        self.projects.insert(project.id, project.clone());
        self.consultations
            .insert(consultation.id, consultation.clone());
        Ok(())
    }

    async fn save_audit_event(&mut self, event: &AuditEvent) -> Result<()> {
        self.audit.push(event.clone());
        Ok(())
    }

    async fn list_audit_events(&self) -> Result<Vec<AuditEvent>> {
        let mut events = self.audit.clone();
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(events)
    }
}
