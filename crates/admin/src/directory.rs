//! Admin directory - create, manage and authenticate admin users.

use std::sync::Arc;

use leaddesk_core::authz::{can_perform, AdminAction};
use leaddesk_core::validate::is_valid_email;
use leaddesk_core::{
    Actor, AdminId, AdminUser, AuditAction, AuditEvent, Credential, Error, Result, Role,
};
use leaddesk_storage::Storage;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::session::Session;

/// Input for creating an admin user.
#[derive(Debug, Clone)]
pub struct NewAdmin {
    /// Login name
    pub username: String,
    /// Plaintext password, hashed before anything is stored
    pub password: String,
    /// Contact email
    pub email: String,
    /// Display name
    pub display_name: String,
    /// Role to grant
    pub role: Role,
    /// Department
    pub department: Option<String>,
    /// Skill tags
    pub skills: Vec<String>,
    /// Maximum concurrent assignments
    pub max_workload: u32,
}

/// Partial update for an admin user. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct AdminPatch {
    /// New login name
    pub username: Option<String>,
    /// New email
    pub email: Option<String>,
    /// New display name
    pub display_name: Option<String>,
    /// New department
    pub department: Option<String>,
    /// New skill tags
    pub skills: Option<Vec<String>>,
    /// New capacity
    pub max_workload: Option<u32>,
    /// New role (super admin only)
    pub role: Option<Role>,
    /// New plaintext password, re-hashed on application
    pub password: Option<String>,
}

/// An admin with spare capacity, as returned by availability queries.
#[derive(Debug, Clone)]
pub struct AvailableAdmin {
    /// The admin record
    pub admin: AdminUser,
    /// `max_workload - workload` at query time
    pub available_capacity: u32,
}

/// Which admins an availability query should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityFilter {
    /// Any active admin
    Any,
    /// Only the given role
    Role(Role),
    /// Team-lead eligible roles (team_lead and above)
    LeadEligible,
}

/// The admin directory service.
pub struct AdminDirectory<S: Storage> {
    storage: Arc<Mutex<S>>,
}

impl<S: Storage> Clone for AdminDirectory<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage + 'static> AdminDirectory<S> {
    /// Create a directory over the given store.
    pub fn new(storage: Arc<Mutex<S>>) -> Self {
        Self { storage }
    }

    /// Create the initial super admin if the directory is empty. Idempotent;
    /// returns the seed record only when it was created by this call.
    pub async fn ensure_seed(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<Option<AdminUser>> {
        let mut storage = self.storage.lock().await;
        if !storage.list_admins().await?.is_empty() {
            return Ok(None);
        }

        let seed = AdminUser {
            id: AdminId::new(),
            username: username.to_string(),
            email: email.to_string(),
            password: Credential::new(password)?,
            display_name: username.to_string(),
            role: Role::SuperAdmin,
            department: None,
            skills: Vec::new(),
            workload: 0,
            max_workload: 10,
            is_active: true,
            created_at: chrono::Utc::now(),
            last_login: None,
            created_by: None,
        };
        storage.save_admin(&seed).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::system(), AuditAction::AdminCreated).target(seed.id),
            )
            .await?;
        info!(admin = %seed.id, "seeded initial super admin");
        Ok(Some(seed))
    }

    /// Authenticate by username and password. Inactive accounts are rejected
    /// even with correct credentials. Updates `last_login` and issues a
    /// 24-hour session.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(AdminUser, Session)> {
        let mut storage = self.storage.lock().await;
        let admins = storage.list_admins().await?;
        let Some(mut admin) = admins
            .into_iter()
            .find(|a| a.username.eq_ignore_ascii_case(username))
        else {
            return Err(Error::PermissionDenied("invalid credentials".into()));
        };

        if !admin.password.verify(password) {
            warn!(username, "failed login attempt");
            return Err(Error::PermissionDenied("invalid credentials".into()));
        }
        if !admin.is_active {
            return Err(Error::PermissionDenied("account is inactive".into()));
        }

        admin.last_login = Some(chrono::Utc::now());
        storage.save_admin(&admin).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(admin.id), AuditAction::LoginSucceeded)
                    .target(admin.id),
            )
            .await?;

        let session = Session::issue(admin.id);
        Ok((admin, session))
    }

    /// Create an admin user. Requires an active super admin as requester.
    pub async fn create(&self, requester_id: AdminId, input: NewAdmin) -> Result<AdminUser> {
        let mut storage = self.storage.lock().await;
        let requester = storage
            .load_admin(requester_id)
            .await?
            .ok_or_else(|| Error::PermissionDenied("unknown requester".into()))?;
        if !can_perform(&requester, AdminAction::CreateAdmin, None) {
            return Err(Error::PermissionDenied(
                "only an active super admin may create admins".into(),
            ));
        }

        if input.username.trim().is_empty() {
            return Err(Error::validation("username", "username is required"));
        }
        if input.display_name.trim().is_empty() {
            return Err(Error::validation("display_name", "display name is required"));
        }
        if !is_valid_email(&input.email) {
            return Err(Error::validation("email", "not a valid email address"));
        }
        let password = Credential::new(&input.password)?;

        let admins = storage.list_admins().await?;
        check_uniqueness(&admins, &input.username, &input.email, None)?;

        let admin = AdminUser {
            id: AdminId::new(),
            username: input.username,
            email: input.email,
            password,
            display_name: input.display_name,
            role: input.role,
            department: input.department,
            skills: input.skills,
            workload: 0,
            max_workload: input.max_workload,
            is_active: true,
            created_at: chrono::Utc::now(),
            last_login: None,
            created_by: Some(requester_id),
        };
        storage.save_admin(&admin).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::AdminCreated)
                    .target(admin.id)
                    .metadata(serde_json::json!({ "role": admin.role.as_str() })),
            )
            .await?;
        Ok(admin)
    }

    /// Update an admin. Super admins may update anyone; everyone else only
    /// their own non-role fields.
    pub async fn update(
        &self,
        requester_id: AdminId,
        target_id: AdminId,
        patch: AdminPatch,
    ) -> Result<AdminUser> {
        let mut storage = self.storage.lock().await;
        let requester = storage
            .load_admin(requester_id)
            .await?
            .ok_or_else(|| Error::PermissionDenied("unknown requester".into()))?;
        let mut target = storage
            .load_admin(target_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("admin {target_id}")))?;

        if !can_perform(&requester, AdminAction::EditProfile, Some(&target)) {
            return Err(Error::PermissionDenied(
                "may only edit your own profile".into(),
            ));
        }

        let admins = storage.list_admins().await?;

        if let Some(role) = patch.role {
            if role != target.role {
                if !can_perform(&requester, AdminAction::ChangeRole, Some(&target)) {
                    return Err(Error::PermissionDenied(
                        "only a super admin may change roles".into(),
                    ));
                }
                // Demoting the last active super admin would lock everyone out.
                if target.role == Role::SuperAdmin
                    && target.is_active
                    && count_active_super_admins(&admins) <= 1
                {
                    return Err(Error::InvalidOperation(
                        "cannot demote the last active super admin".into(),
                    ));
                }
                target.role = role;
            }
        }

        if let Some(username) = patch.username {
            if username.trim().is_empty() {
                return Err(Error::validation("username", "username is required"));
            }
            target.username = username;
        }
        if let Some(email) = patch.email {
            if !is_valid_email(&email) {
                return Err(Error::validation("email", "not a valid email address"));
            }
            target.email = email;
        }
        check_uniqueness(&admins, &target.username, &target.email, Some(target_id))?;

        if let Some(display_name) = patch.display_name {
            target.display_name = display_name;
        }
        if let Some(department) = patch.department {
            target.department = Some(department);
        }
        if let Some(skills) = patch.skills {
            target.skills = skills;
        }
        if let Some(max_workload) = patch.max_workload {
            target.max_workload = max_workload;
        }
        if let Some(password) = patch.password {
            target.password = Credential::new(&password)?;
        }

        storage.save_admin(&target).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::AdminUpdated)
                    .target(target_id),
            )
            .await?;
        Ok(target)
    }

    /// Permanently delete an admin. No self-delete; the last active super
    /// admin cannot be deleted.
    pub async fn delete(&self, requester_id: AdminId, target_id: AdminId) -> Result<()> {
        let mut storage = self.storage.lock().await;
        let requester = storage
            .load_admin(requester_id)
            .await?
            .ok_or_else(|| Error::PermissionDenied("unknown requester".into()))?;
        let target = storage
            .load_admin(target_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("admin {target_id}")))?;

        if !can_perform(&requester, AdminAction::DeleteAdmin, Some(&target)) {
            return Err(Error::PermissionDenied(
                "only an active super admin may delete admins".into(),
            ));
        }
        if requester_id == target_id {
            return Err(Error::InvalidOperation(
                "cannot delete your own account".into(),
            ));
        }
        if target.role == Role::SuperAdmin && target.is_active {
            let admins = storage.list_admins().await?;
            if count_active_super_admins(&admins) <= 1 {
                return Err(Error::InvalidOperation(
                    "cannot delete the last active super admin".into(),
                ));
            }
        }

        storage.delete_admin(target_id).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::AdminDeleted)
                    .target(target_id),
            )
            .await?;
        Ok(())
    }

    /// Flip an admin's active flag. No self-toggle; the last active super
    /// admin cannot be deactivated.
    pub async fn toggle_active(&self, requester_id: AdminId, target_id: AdminId) -> Result<AdminUser> {
        let mut storage = self.storage.lock().await;
        let requester = storage
            .load_admin(requester_id)
            .await?
            .ok_or_else(|| Error::PermissionDenied("unknown requester".into()))?;
        let mut target = storage
            .load_admin(target_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("admin {target_id}")))?;

        if !can_perform(&requester, AdminAction::ToggleActive, Some(&target)) {
            return Err(Error::PermissionDenied(
                "only an active super admin may change account status".into(),
            ));
        }
        if requester_id == target_id {
            return Err(Error::InvalidOperation(
                "cannot change your own account status".into(),
            ));
        }
        if target.is_active && target.role == Role::SuperAdmin {
            let admins = storage.list_admins().await?;
            if count_active_super_admins(&admins) <= 1 {
                return Err(Error::InvalidOperation(
                    "cannot deactivate the last active super admin".into(),
                ));
            }
        }

        target.is_active = !target.is_active;
        storage.save_admin(&target).await?;
        storage
            .save_audit_event(
                &AuditEvent::new(Actor::admin(requester_id), AuditAction::AdminActiveToggled)
                    .target(target_id)
                    .metadata(serde_json::json!({ "is_active": target.is_active })),
            )
            .await?;
        Ok(target)
    }

    /// Active admins with spare capacity, annotated with how much.
    pub async fn list_available(&self, filter: AvailabilityFilter) -> Result<Vec<AvailableAdmin>> {
        let admins = self.storage.lock().await.list_admins().await?;
        Ok(admins
            .into_iter()
            .filter(|a| a.is_active && a.has_capacity())
            .filter(|a| match filter {
                AvailabilityFilter::Any => true,
                AvailabilityFilter::Role(role) => a.role == role,
                AvailabilityFilter::LeadEligible => a.role.is_lead_eligible(),
            })
            .map(|admin| AvailableAdmin {
                available_capacity: admin.available_capacity(),
                admin,
            })
            .collect())
    }

    /// Load an admin.
    pub async fn get(&self, id: AdminId) -> Result<AdminUser> {
        self.storage
            .lock()
            .await
            .load_admin(id)
            .await?
            .ok_or_else(|| Error::not_found(format!("admin {id}")))
    }

    /// List all admins in creation order.
    pub async fn list(&self) -> Result<Vec<AdminUser>> {
        Ok(self.storage.lock().await.list_admins().await?)
    }
}

fn count_active_super_admins(admins: &[AdminUser]) -> usize {
    admins
        .iter()
        .filter(|a| a.is_active && a.role == Role::SuperAdmin)
        .count()
}

// Usernames and emails are unique across active and inactive records,
// compared case-insensitively.
fn check_uniqueness(
    admins: &[AdminUser],
    username: &str,
    email: &str,
    exclude: Option<AdminId>,
) -> Result<()> {
    for admin in admins {
        if Some(admin.id) == exclude {
            continue;
        }
        if admin.username.eq_ignore_ascii_case(username) {
            return Err(Error::conflict(format!("username `{username}` is taken")));
        }
        if admin.email.eq_ignore_ascii_case(email) {
            return Err(Error::conflict(format!("email `{email}` is taken")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaddesk_storage::MemoryStorage;

    async fn directory() -> (AdminDirectory<MemoryStorage>, AdminUser) {
        let directory = AdminDirectory::new(Arc::new(Mutex::new(MemoryStorage::new())));
        let seed = directory
            .ensure_seed("root", "root@example.com", "root-password")
            .await
            .unwrap()
            .unwrap();
        (directory, seed)
    }

    fn new_admin(username: &str, role: Role) -> NewAdmin {
        NewAdmin {
            username: username.into(),
            password: "a-long-password".into(),
            email: format!("{username}@example.com"),
            display_name: username.into(),
            role,
            department: None,
            skills: vec!["rust".into()],
            max_workload: 5,
        }
    }

    #[tokio::test]
    async fn seed_is_idempotent() {
        let (directory, seed) = directory().await;
        assert_eq!(seed.role, Role::SuperAdmin);
        assert!(seed.is_active);

        let again = directory
            .ensure_seed("other", "other@example.com", "other-password")
            .await
            .unwrap();
        assert!(again.is_none());
        assert_eq!(directory.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn authenticate_happy_path_issues_session() {
        let (directory, seed) = directory().await;
        let (admin, session) = directory
            .authenticate("root", "root-password")
            .await
            .unwrap();
        assert_eq!(admin.id, seed.id);
        assert!(admin.last_login.is_some());
        assert_eq!(session.admin_id, seed.id);
        assert!(session.is_valid_at(chrono::Utc::now()));
    }

    #[tokio::test]
    async fn authenticate_rejects_wrong_password() {
        let (directory, _) = directory().await;
        let err = directory
            .authenticate("root", "wrong-password")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn authenticate_rejects_inactive_account_with_correct_credentials() {
        let (directory, seed) = directory().await;
        let other = directory
            .create(seed.id, new_admin("dev", Role::Developer))
            .await
            .unwrap();
        directory.toggle_active(seed.id, other.id).await.unwrap();

        let err = directory
            .authenticate("dev", "a-long-password")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn create_requires_super_admin() {
        let (directory, seed) = directory().await;
        let viewer = directory
            .create(seed.id, new_admin("viewer", Role::Viewer))
            .await
            .unwrap();

        let err = directory
            .create(viewer.id, new_admin("sneaky", Role::Admin))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        // Storage unchanged: still just the seed and the viewer.
        assert_eq!(directory.list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_username_and_email() {
        let (directory, seed) = directory().await;
        directory
            .create(seed.id, new_admin("dev", Role::Developer))
            .await
            .unwrap();

        let mut dup = new_admin("DEV", Role::Developer);
        dup.email = "unique@example.com".into();
        assert!(matches!(
            directory.create(seed.id, dup).await,
            Err(Error::Conflict(_))
        ));

        let mut dup = new_admin("dev2", Role::Developer);
        dup.email = "DEV@example.com".into();
        assert!(matches!(
            directory.create(seed.id, dup).await,
            Err(Error::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn create_validates_input() {
        let (directory, seed) = directory().await;

        let mut bad = new_admin("dev", Role::Developer);
        bad.password = "short".into();
        assert!(matches!(
            directory.create(seed.id, bad).await,
            Err(Error::Validation { field: "password", .. })
        ));

        let mut bad = new_admin("dev", Role::Developer);
        bad.email = "not-an-email".into();
        assert!(matches!(
            directory.create(seed.id, bad).await,
            Err(Error::Validation { field: "email", .. })
        ));
    }

    #[tokio::test]
    async fn creating_a_second_super_admin_is_permitted() {
        let (directory, seed) = directory().await;
        let second = directory
            .create(seed.id, new_admin("root2", Role::SuperAdmin))
            .await
            .unwrap();
        assert_eq!(second.role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn self_edit_of_non_role_fields_is_allowed() {
        let (directory, seed) = directory().await;
        let dev = directory
            .create(seed.id, new_admin("dev", Role::Developer))
            .await
            .unwrap();

        let updated = directory
            .update(
                dev.id,
                dev.id,
                AdminPatch {
                    display_name: Some("Developer One".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.display_name, "Developer One");
    }

    #[tokio::test]
    async fn non_super_admin_cannot_change_roles() {
        let (directory, seed) = directory().await;
        let dev = directory
            .create(seed.id, new_admin("dev", Role::Developer))
            .await
            .unwrap();

        let err = directory
            .update(
                dev.id,
                dev.id,
                AdminPatch {
                    role: Some(Role::SuperAdmin),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
        assert_eq!(directory.get(dev.id).await.unwrap().role, Role::Developer);
    }

    #[tokio::test]
    async fn update_rejects_email_collision_with_another_record() {
        let (directory, seed) = directory().await;
        let dev = directory
            .create(seed.id, new_admin("dev", Role::Developer))
            .await
            .unwrap();

        let err = directory
            .update(
                seed.id,
                dev.id,
                AdminPatch {
                    email: Some("root@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[tokio::test]
    async fn cannot_demote_the_last_active_super_admin() {
        let (directory, seed) = directory().await;
        let err = directory
            .update(
                seed.id,
                seed.id,
                AdminPatch {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert_eq!(directory.get(seed.id).await.unwrap().role, Role::SuperAdmin);
    }

    #[tokio::test]
    async fn cannot_delete_self_or_last_super_admin() {
        let (directory, seed) = directory().await;
        let err = directory.delete(seed.id, seed.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));

        // A second super admin makes deleting the first legal.
        let second = directory
            .create(seed.id, new_admin("root2", Role::SuperAdmin))
            .await
            .unwrap();
        directory.delete(second.id, seed.id).await.unwrap();
        // ... but now the survivor is protected again.
        let third = directory
            .create(second.id, new_admin("dev", Role::Developer))
            .await
            .unwrap();
        assert!(matches!(
            directory.delete(second.id, second.id).await,
            Err(Error::InvalidOperation(_))
        ));
        let _ = third;
    }

    #[tokio::test]
    async fn deactivation_never_removes_the_last_active_super_admin() {
        let (directory, seed) = directory().await;
        let second = directory
            .create(seed.id, new_admin("root2", Role::SuperAdmin))
            .await
            .unwrap();

        // Deactivating one of two super admins is fine.
        directory.toggle_active(seed.id, second.id).await.unwrap();
        assert!(!directory.get(second.id).await.unwrap().is_active);

        // The seed is now the last active super admin. The only admin who
        // could target it is itself, and self-toggle is rejected.
        let err = directory.toggle_active(seed.id, seed.id).await.unwrap_err();
        assert!(matches!(err, Error::InvalidOperation(_)));
        assert!(directory.get(seed.id).await.unwrap().is_active);
    }

    #[tokio::test]
    async fn active_super_admin_count_never_reaches_zero() {
        let (directory, seed) = directory().await;
        let second = directory
            .create(seed.id, new_admin("root2", Role::SuperAdmin))
            .await
            .unwrap();

        directory.delete(seed.id, second.id).await.unwrap();
        assert!(matches!(
            directory.delete(seed.id, seed.id).await,
            Err(Error::InvalidOperation(_))
        ));
        assert!(matches!(
            directory
                .update(
                    seed.id,
                    seed.id,
                    AdminPatch {
                        role: Some(Role::Viewer),
                        ..Default::default()
                    }
                )
                .await,
            Err(Error::InvalidOperation(_))
        ));

        let actives = directory
            .list()
            .await
            .unwrap()
            .into_iter()
            .filter(|a| a.is_active && a.role == Role::SuperAdmin)
            .count();
        assert_eq!(actives, 1);
    }

    #[tokio::test]
    async fn list_available_annotates_capacity() {
        let (directory, seed) = directory().await;
        let lead = directory
            .create(seed.id, new_admin("lead", Role::TeamLead))
            .await
            .unwrap();
        directory
            .create(seed.id, new_admin("dev", Role::Developer))
            .await
            .unwrap();

        let leads = directory
            .list_available(AvailabilityFilter::LeadEligible)
            .await
            .unwrap();
        // Seed (super admin) and the team lead are eligible; the developer is not.
        assert_eq!(leads.len(), 2);
        let entry = leads.iter().find(|a| a.admin.id == lead.id).unwrap();
        assert_eq!(entry.available_capacity, 5);
    }
}
