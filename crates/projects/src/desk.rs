//! Project desk - conversion, status, repository linkage and milestones.

use std::sync::Arc;

use leaddesk_core::{
    Actor, AdminId, AdminUser, AuditAction, AuditEvent, ConsultationId, ConsultationStatus,
    Error, Milestone, MilestoneId, MilestoneStatus, Project, ProjectId, ProjectStatus,
    RepositoryInfo, Result, Time,
};
use leaddesk_dispatch::ProvisionedRepo;
use leaddesk_storage::Storage;
use tokio::sync::Mutex;
use tracing::info;

/// Input for converting a consultation into a project.
#[derive(Debug, Clone)]
pub struct ProjectInput {
    /// Project name
    pub name: String,
    /// Description; defaults to the consultation's project details
    pub description: Option<String>,
    /// Planned start date
    pub start_date: Option<Time>,
    /// Estimated end date
    pub estimated_end_date: Option<Time>,
    /// Technology tags
    pub technologies: Vec<String>,
    /// Free-text notes
    pub notes: Option<String>,
}

/// The project conversion service.
pub struct ProjectDesk<S: Storage> {
    pub(crate) storage: Arc<Mutex<S>>,
}

impl<S: Storage> Clone for ProjectDesk<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage + 'static> ProjectDesk<S> {
    /// Create a desk over the given store.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }

    /// Convert a completed consultation into a project. At most one project
    /// may ever come from a consultation; a second call fails with
    /// `Conflict`. Both records are persisted atomically.
    pub async fn convert(
        &self,
        requester_id: AdminId,
        consultation_id: ConsultationId,
        input: ProjectInput,
    ) -> Result<Project> {
        if input.name.trim().is_empty() {
            return Err(Error::validation("name", "project name is required"));
        }

        let mut storage = self.storage.lock().await;
        let requester = storage
            .load_admin(requester_id)
            .await?
            .ok_or_else(|| Error::PermissionDenied("unknown requester".into()))?;
        if !requester.is_active {
            return Err(Error::PermissionDenied("requester is inactive".into()));
        }

        let mut consultation = storage
            .load_consultation(consultation_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("consultation {consultation_id}")))?;

        if let Some(existing) = consultation.project_id {
            return Err(Error::conflict(format!(
                "consultation already converted into project {existing}"
            )));
        }
        if consultation.status != ConsultationStatus::Completed {
            return Err(Error::InvalidState(format!(
                "consultation is {}, only completed consultations convert",
                consultation.status
            )));
        }

        let project = Project {
            id: ProjectId::new(),
            consultation_id,
            name: input.name,
            description: input
                .description
                .unwrap_or_else(|| consultation.project_details.clone()),
            client_name: consultation.name.clone(),
            client_email: consultation.email.clone(),
            client_company: consultation.company.clone(),
            project_type: consultation.project_type.clone(),
            status: ProjectStatus::Planning,
            created_at: chrono::Utc::now(),
            start_date: input.start_date,
            estimated_end_date: input.estimated_end_date,
            actual_end_date: None,
            budget: Some(consultation.budget.clone()),
            technologies: input.technologies,
            team_members: Vec::new(),
            team_lead: None,
            repository: None,
            milestones: Vec::new(),
            notes: input.notes,
            created_by: requester_id,
        };

        consultation.status = ConsultationStatus::Converted;
        consultation.project_id = Some(project.id);
        consultation.last_updated = chrono::Utc::now();

        storage.save_conversion(&consultation, &project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::ConsultationConverted)
                    .target(consultation_id)
                    .metadata(serde_json::json!({ "project_id": project.id.to_string() })),
            )
            .await?;

        info!(consultation = %consultation_id, project = %project.id, "consultation converted");
        Ok(project)
    }

    /// Load a project.
    pub async fn get(&self, id: ProjectId) -> Result<Project> {
        self.storage
            .lock()
            .await
            .load_project(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("project {id}")))
    }

    /// List all projects in creation order.
    pub async fn list(&self) -> Result<Vec<Project>> {
        Ok(self.storage.lock().await.list_projects().await?)
    }

    /// Move a project along the state machine. Completion stamps
    /// `actual_end_date`; disallowed edges fail with `InvalidState` and
    /// leave the record unchanged.
    pub async fn update_status(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
        new_status: ProjectStatus,
    ) -> Result<Project> {
        let mut storage = self.storage.lock().await;
        let mut project = storage
            .load_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))?;

        if !project.status.can_transition(new_status) {
            return Err(Error::InvalidState(format!(
                "cannot move project from {} to {}",
                project.status, new_status
            )));
        }

        let previous = project.status;
        project.status = new_status;
        if new_status == ProjectStatus::Completed {
            project.actual_end_date = Some(chrono::Utc::now());
        }
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::ProjectStatusChanged)
                    .target(project_id)
                    .metadata(serde_json::json!({
                        "from": previous.as_str(),
                        "to": new_status.as_str(),
                    })),
            )
            .await?;
        Ok(project)
    }

    /// Record a provisioned repository on the project. Relinking requires an
    /// explicit unlink first.
    pub async fn link_repository(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
        repo: ProvisionedRepo,
    ) -> Result<Project> {
        let mut storage = self.storage.lock().await;
        let mut project = storage
            .load_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))?;

        if let Some(existing) = &project.repository {
            return Err(Error::conflict(format!(
                "repository `{}` is already linked; unlink it first",
                existing.name
            )));
        }

        project.repository = Some(RepositoryInfo {
            name: repo.name,
            url: repo.url,
            clone_url: repo.clone_url,
            linked_at: chrono::Utc::now(),
        });
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::RepositoryLinked)
                    .target(project_id),
            )
            .await?;
        Ok(project)
    }

    /// Remove the repository linkage.
    pub async fn unlink_repository(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
    ) -> Result<Project> {
        let mut storage = self.storage.lock().await;
        let mut project = storage
            .load_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))?;

        if project.repository.is_none() {
            return Err(Error::InvalidOperation(
                "project has no linked repository".into(),
            ));
        }

        project.repository = None;
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::RepositoryUnlinked)
                    .target(project_id),
            )
            .await?;
        Ok(project)
    }

    /// Add a milestone in the `planned` state.
    pub async fn add_milestone(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
        description: String,
        due_date: Option<Time>,
    ) -> Result<Milestone> {
        let mut storage = self.storage.lock().await;
        let mut project = storage
            .load_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))?;

        let milestone = Milestone {
            id: MilestoneId::new(),
            description,
            status: MilestoneStatus::Planned,
            due_date,
            completed_at: None,
        };
        project.milestones.push(milestone.clone());
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::MilestoneUpdated)
                    .target(project_id),
            )
            .await?;
        Ok(milestone)
    }

    /// Update a milestone's status. Marking it done stamps `completed_at`.
    pub async fn set_milestone_status(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
        milestone_id: MilestoneId,
        status: MilestoneStatus,
    ) -> Result<Milestone> {
        let mut storage = self.storage.lock().await;
        let mut project = storage
            .load_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))?;

        let milestone = project
            .milestones
            .iter_mut()
            .find(|m| m.id == milestone_id)
            .ok_or_else(|| Error::not_found(format!("milestone {milestone_id}")))?;

        milestone.status = status;
        if status == MilestoneStatus::Done {
            milestone.completed_at = Some(chrono::Utc::now());
        }
        let updated = milestone.clone();

        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::MilestoneUpdated)
                    .target(project_id),
            )
            .await?;
        Ok(updated)
    }

    pub(crate) async fn load_project_locked(
        storage: &S,
        project_id: ProjectId,
    ) -> Result<Project> {
        storage
            .load_project(project_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("project {project_id}")))
    }

    pub(crate) async fn load_admin_locked(storage: &S, admin_id: AdminId) -> Result<AdminUser> {
        storage
            .load_admin(admin_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("admin {admin_id}")))
    }
}
