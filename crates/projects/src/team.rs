//! Team seat management with workload accounting.
//!
//! Every lead or member seat held by an admin counts one unit of workload;
//! assignment beyond `max_workload` fails with `CapacityExceeded`, and
//! removal always gives the unit back.

use leaddesk_core::{
    Actor, AdminId, AuditAction, AuditEvent, Error, Project, ProjectId, RepoPermission, Result,
    TeamMember,
};
use leaddesk_storage::Storage;

use crate::desk::ProjectDesk;

impl<S: Storage + 'static> ProjectDesk<S> {
    /// Assign a team lead. The project must not already have one, and the
    /// admin must be active, lead-eligible, under capacity, and not already
    /// seated on the project.
    pub async fn assign_team_lead(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
        admin_id: AdminId,
    ) -> Result<Project> {
        let mut storage = self.storage.lock().await;
        let mut project = Self::load_project_locked(&*storage, project_id).await?;
        let mut admin = Self::load_admin_locked(&*storage, admin_id).await?;

        if project.team_lead.is_some() {
            return Err(Error::InvalidState(
                "project already has a team lead; remove it first".into(),
            ));
        }
        if !admin.is_active {
            return Err(Error::InvalidOperation(format!(
                "admin {admin_id} is inactive"
            )));
        }
        if !admin.role.is_lead_eligible() {
            return Err(Error::InvalidOperation(format!(
                "role {} is not eligible to lead",
                admin.role
            )));
        }
        if project.has_seat(admin_id) {
            return Err(Error::conflict(format!(
                "admin {admin_id} already holds a seat on this project"
            )));
        }
        if !admin.has_capacity() {
            return Err(Error::CapacityExceeded {
                workload: admin.workload,
                max: admin.max_workload,
            });
        }

        admin.workload += 1;
        project.team_lead = Some(admin_id);
        storage.save_admin(&admin).await?;
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::TeamLeadAssigned)
                    .target(project_id)
                    .metadata(serde_json::json!({ "admin_id": admin_id.to_string() })),
            )
            .await?;
        Ok(project)
    }

    /// Remove the team lead, returning their workload unit.
    pub async fn remove_team_lead(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
    ) -> Result<Project> {
        let mut storage = self.storage.lock().await;
        let mut project = Self::load_project_locked(&*storage, project_id).await?;

        let Some(lead_id) = project.team_lead.take() else {
            return Err(Error::InvalidState("project has no team lead".into()));
        };

        // The lead may have been deleted since assignment; the seat still goes.
        if let Some(mut lead) = storage.load_admin(lead_id).await? {
            lead.workload = lead.workload.saturating_sub(1);
            storage.save_admin(&lead).await?;
        }
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::TeamLeadRemoved)
                    .target(project_id)
                    .metadata(serde_json::json!({ "admin_id": lead_id.to_string() })),
            )
            .await?;
        Ok(project)
    }

    /// Add a team member seat with the given repository permission.
    pub async fn assign_team_member(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
        admin_id: AdminId,
        permission: RepoPermission,
    ) -> Result<Project> {
        let mut storage = self.storage.lock().await;
        let mut project = Self::load_project_locked(&*storage, project_id).await?;
        let mut admin = Self::load_admin_locked(&*storage, admin_id).await?;

        if !admin.is_active {
            return Err(Error::InvalidOperation(format!(
                "admin {admin_id} is inactive"
            )));
        }
        if project.has_seat(admin_id) {
            return Err(Error::conflict(format!(
                "admin {admin_id} already holds a seat on this project"
            )));
        }
        if !admin.has_capacity() {
            return Err(Error::CapacityExceeded {
                workload: admin.workload,
                max: admin.max_workload,
            });
        }

        admin.workload += 1;
        project.team_members.push(TeamMember {
            admin_id,
            permission,
        });
        storage.save_admin(&admin).await?;
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::TeamMemberAdded)
                    .target(project_id)
                    .metadata(serde_json::json!({
                        "admin_id": admin_id.to_string(),
                        "permission": permission.as_str(),
                    })),
            )
            .await?;
        Ok(project)
    }

    /// Remove a team member seat, returning their workload unit.
    pub async fn remove_team_member(
        &self,
        requester_id: AdminId,
        project_id: ProjectId,
        admin_id: AdminId,
    ) -> Result<Project> {
        let mut storage = self.storage.lock().await;
        let mut project = Self::load_project_locked(&*storage, project_id).await?;

        let Some(index) = project
            .team_members
            .iter()
            .position(|m| m.admin_id == admin_id)
        else {
            return Err(Error::InvalidOperation(format!(
                "admin {admin_id} is not a member of this project"
            )));
        };
        project.team_members.remove(index);

        if let Some(mut member) = storage.load_admin(admin_id).await? {
            member.workload = member.workload.saturating_sub(1);
            storage.save_admin(&member).await?;
        }
        storage.save_project(&project).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::TeamMemberRemoved)
                    .target(project_id)
                    .metadata(serde_json::json!({ "admin_id": admin_id.to_string() })),
            )
            .await?;
        Ok(project)
    }
}
