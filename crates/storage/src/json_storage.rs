//! JSON file storage implementation.
//!
//! Stores one JSON file per record under a root directory (one subdirectory
//! per collection). Writes go straight to disk so a successful save is
//! durable before the call returns.

use std::path::Path;

use leaddesk_core::{
    AdminId, AdminUser, AuditEvent, Consultation, ConsultationId, Project, ProjectId,
};
use tokio::fs;
use tracing::warn;

use super::{Result, Storage, StorageError};

/// File-based JSON storage backend.
pub struct JsonStorage {
    root: std::path::PathBuf,
}

impl JsonStorage {
    /// Create storage rooted at `root`, creating the collection directories.
    /// This is the store's explicit init step.
    pub async fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        fs::create_dir_all(root.join("consultations")).await?;
        fs::create_dir_all(root.join("admins")).await?;
        fs::create_dir_all(root.join("projects")).await?;
        fs::create_dir_all(root.join("audit")).await?;

        Ok(Self { root })
    }

    fn consultation_path(&self, id: ConsultationId) -> std::path::PathBuf {
        self.root.join("consultations").join(format!("{}.json", id))
    }
    fn admin_path(&self, id: AdminId) -> std::path::PathBuf {
        self.root.join("admins").join(format!("{}.json", id))
    }
    fn project_path(&self, id: ProjectId) -> std::path::PathBuf {
        self.root.join("projects").join(format!("{}.json", id))
    }
    fn audit_path(&self, event: &AuditEvent) -> std::path::PathBuf {
        self.root.join("audit").join(format!("{}.json", event.id))
    }

    async fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(value)?;
        fs::write(path, json.as_bytes()).await?;
        Ok(())
    }

    async fn remove_or_not_found(path: &Path, what: String) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(what))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait::async_trait]
impl Storage for JsonStorage {
    async fn save_consultation(&mut self, consultation: &Consultation) -> Result<()> {
        Self::write_json(&self.consultation_path(consultation.id), consultation).await
    }

    async fn load_consultation(&self, id: ConsultationId) -> Result<Option<Consultation>> {
        read_json(&self.consultation_path(id)).await
    }

    async fn list_consultations(&self) -> Result<Vec<Consultation>> {
        let mut all: Vec<Consultation> = list_dir(&self.root.join("consultations")).await?;
        all.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(all)
    }

    async fn delete_consultation(&mut self, id: ConsultationId) -> Result<()> {
        Self::remove_or_not_found(&self.consultation_path(id), format!("consultation {id}"))
            .await
    }

    async fn save_admin(&mut self, admin: &AdminUser) -> Result<()> {
        Self::write_json(&self.admin_path(admin.id), admin).await
    }

    async fn load_admin(&self, id: AdminId) -> Result<Option<AdminUser>> {
        read_json(&self.admin_path(id)).await
    }

    async fn list_admins(&self) -> Result<Vec<AdminUser>> {
        let mut all: Vec<AdminUser> = list_dir(&self.root.join("admins")).await?;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn delete_admin(&mut self, id: AdminId) -> Result<()> {
        Self::remove_or_not_found(&self.admin_path(id), format!("admin {id}")).await
    }

    async fn save_project(&mut self, project: &Project) -> Result<()> {
        Self::write_json(&self.project_path(project.id), project).await
    }

    async fn load_project(&self, id: ProjectId) -> Result<Option<Project>> {
        read_json(&self.project_path(id)).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        let mut all: Vec<Project> = list_dir(&self.root.join("projects")).await?;
        all.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(all)
    }

    async fn save_conversion(
        &mut self,
        consultation: &Consultation,
        project: &Project,
    ) -> Result<()> {
        // Project first; if the consultation write fails, compensate by
        // removing the project file so neither record is visible.
        let project_path = self.project_path(project.id);
        Self::write_json(&project_path, project).await?;

        if let Err(e) = Self::write_json(&self.consultation_path(consultation.id), consultation)
            .await
        {
            if let Err(cleanup) = fs::remove_file(&project_path).await {
                warn!(
                    project = %project.id,
                    error = %cleanup,
                    "failed to roll back project write after conversion failure"
                );
            }
            return Err(e);
        }
        Ok(())
    }

    async fn save_audit_event(&mut self, event: &AuditEvent) -> Result<()> {
        Self::write_json(&self.audit_path(event), event).await
    }

    async fn list_audit_events(&self) -> Result<Vec<AuditEvent>> {
        let mut events: Vec<AuditEvent> = list_dir(&self.root.join("audit")).await?;
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(events)
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &std::path::Path) -> Result<Option<T>> {
    match fs::read_to_string(path).await {
        Ok(json) => {
            let value = serde_json::from_str(&json)?;
            Ok(Some(value))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

async fn list_dir<T: serde::de::DeserializeOwned>(dir: &std::path::Path) -> Result<Vec<T>> {
    let mut items = Vec::new();
    let mut rd = fs::read_dir(dir).await?;
    while let Some(entry) = rd.next_entry().await? {
        if entry.path().extension().and_then(|s| s.to_str()) != Some("json") {
            continue;
        }
        if let Ok(Some(item)) = read_json(&entry.path()).await {
            items.push(item);
        }
    }
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaddesk_core::{ConsultationStatus, Credential, Role};

    fn consultation(name: &str) -> Consultation {
        let now = chrono::Utc::now();
        Consultation {
            id: ConsultationId::new(),
            name: name.into(),
            email: format!("{name}@example.com"),
            phone: Some("+44 20 7946 0000".into()),
            company: Some("Acme".into()),
            industry: None,
            project_type: "AI Chatbot".into(),
            budget: "£5,000-£15,000".into(),
            timeline: None,
            project_details: "A support chatbot for the Acme storefront.".into(),
            additional_notes: None,
            uploaded_files: vec!["brief.pdf".into()],
            submitted_at: now,
            status: ConsultationStatus::Pending,
            notes: None,
            follow_up: None,
            last_updated: now,
            email_sent: None,
            admin_notified: None,
            project_id: None,
        }
    }

    fn admin(username: &str) -> AdminUser {
        AdminUser {
            id: AdminId::new(),
            username: username.into(),
            email: format!("{username}@example.com"),
            password: Credential::from_hash("$argon2id$test".into()),
            display_name: username.into(),
            role: Role::Admin,
            department: None,
            skills: vec!["rust".into()],
            workload: 0,
            max_workload: 5,
            is_active: true,
            created_at: chrono::Utc::now(),
            last_login: None,
            created_by: None,
        }
    }

    #[tokio::test]
    async fn consultation_round_trip_is_deep_equal() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let c = consultation("jane");
        storage.save_consultation(&c).await.unwrap();
        let loaded = storage.load_consultation(c.id).await.unwrap().unwrap();

        assert_eq!(
            serde_json::to_value(&c).unwrap(),
            serde_json::to_value(&loaded).unwrap()
        );
    }

    #[tokio::test]
    async fn delete_missing_id_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let err = storage
            .delete_consultation(ConsultationId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let err = storage.delete_admin(AdminId::new()).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));
    }

    #[tokio::test]
    async fn delete_removes_the_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let c = consultation("jane");
        storage.save_consultation(&c).await.unwrap();
        storage.delete_consultation(c.id).await.unwrap();
        assert!(storage.load_consultation(c.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn admin_round_trip_preserves_hash() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let a = admin("root");
        storage.save_admin(&a).await.unwrap();
        let loaded = storage.load_admin(a.id).await.unwrap().unwrap();
        assert_eq!(loaded.password.as_str(), a.password.as_str());
        assert_eq!(loaded.username, a.username);
    }

    #[tokio::test]
    async fn lists_are_in_insertion_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut first = consultation("first");
        let mut second = consultation("second");
        // Force distinct, ordered timestamps.
        first.submitted_at = chrono::Utc::now() - chrono::Duration::minutes(2);
        second.submitted_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        storage.save_consultation(&second).await.unwrap();
        storage.save_consultation(&first).await.unwrap();

        let listed = storage.list_consultations().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].name, "first");
        assert_eq!(listed[1].name, "second");
    }

    #[tokio::test]
    async fn conversion_writes_both_records() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let creator = admin("root");
        let mut c = consultation("jane");
        let project = Project {
            id: ProjectId::new(),
            consultation_id: c.id,
            name: "Jane's Chatbot".into(),
            description: c.project_details.clone(),
            client_name: c.name.clone(),
            client_email: c.email.clone(),
            client_company: c.company.clone(),
            project_type: c.project_type.clone(),
            status: leaddesk_core::ProjectStatus::Planning,
            created_at: chrono::Utc::now(),
            start_date: None,
            estimated_end_date: None,
            actual_end_date: None,
            budget: Some(c.budget.clone()),
            technologies: Vec::new(),
            team_members: Vec::new(),
            team_lead: None,
            repository: None,
            milestones: Vec::new(),
            notes: None,
            created_by: creator.id,
        };
        c.status = ConsultationStatus::Converted;
        c.project_id = Some(project.id);

        storage.save_conversion(&c, &project).await.unwrap();

        let loaded_c = storage.load_consultation(c.id).await.unwrap().unwrap();
        let loaded_p = storage.load_project(project.id).await.unwrap().unwrap();
        assert_eq!(loaded_c.project_id, Some(project.id));
        assert_eq!(loaded_p.consultation_id, c.id);
    }

    #[tokio::test]
    async fn audit_events_come_back_oldest_first() {
        use leaddesk_core::{Actor, AuditAction};

        let dir = tempfile::tempdir().unwrap();
        let mut storage = JsonStorage::new(dir.path()).await.unwrap();

        let mut older = AuditEvent::new(Actor::system(), AuditAction::AdminCreated);
        older.timestamp = chrono::Utc::now() - chrono::Duration::hours(1);
        let newer = AuditEvent::new(Actor::system(), AuditAction::LoginSucceeded);

        storage.save_audit_event(&newer).await.unwrap();
        storage.save_audit_event(&older).await.unwrap();

        let events = storage.list_audit_events().await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].action, AuditAction::AdminCreated);
        assert_eq!(events[1].action, AuditAction::LoginSucceeded);
    }
}
