//! Authorization checks.
//!
//! One function answers every "may this admin do that" question so the
//! services never compare role values inline.

use crate::admin::{AdminUser, Role};

/// Actions gated by the role model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    /// Create a new admin record
    CreateAdmin,
    /// Edit an admin's non-role fields
    EditProfile,
    /// Change an admin's role
    ChangeRole,
    /// Permanently delete an admin record
    DeleteAdmin,
    /// Flip an admin's active flag
    ToggleActive,
    /// Convert a consultation into a project
    ConvertConsultation,
    /// Assign or remove project team seats
    ManageTeam,
}

/// Whether `requester` may perform `action`, optionally against `target`.
///
/// An inactive requester may do nothing. Admin management is reserved to
/// super admins, except that any admin may edit their own profile.
pub fn can_perform(requester: &AdminUser, action: AdminAction, target: Option<&AdminUser>) -> bool {
    if !requester.is_active {
        return false;
    }
    match action {
        AdminAction::CreateAdmin
        | AdminAction::ChangeRole
        | AdminAction::DeleteAdmin
        | AdminAction::ToggleActive => requester.role == Role::SuperAdmin,
        AdminAction::EditProfile => {
            requester.role == Role::SuperAdmin
                || target.map(|t| t.id == requester.id).unwrap_or(false)
        }
        AdminAction::ConvertConsultation | AdminAction::ManageTeam => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credential::Credential;
    use crate::id::AdminId;

    fn admin(role: Role, is_active: bool) -> AdminUser {
        AdminUser {
            id: AdminId::new(),
            username: "u".into(),
            email: "u@example.com".into(),
            password: Credential::from_hash("$argon2id$test".into()),
            display_name: "U".into(),
            role,
            department: None,
            skills: Vec::new(),
            workload: 0,
            max_workload: 5,
            is_active,
            created_at: chrono::Utc::now(),
            last_login: None,
            created_by: None,
        }
    }

    #[test]
    fn super_admin_manages_admins() {
        let su = admin(Role::SuperAdmin, true);
        let target = admin(Role::Developer, true);
        assert!(can_perform(&su, AdminAction::CreateAdmin, None));
        assert!(can_perform(&su, AdminAction::DeleteAdmin, Some(&target)));
        assert!(can_perform(&su, AdminAction::ChangeRole, Some(&target)));
        assert!(can_perform(&su, AdminAction::ToggleActive, Some(&target)));
    }

    #[test]
    fn lesser_roles_cannot_manage_admins() {
        for role in [Role::Admin, Role::TeamLead, Role::Executive, Role::Developer, Role::Viewer] {
            let requester = admin(role, true);
            let target = admin(Role::Viewer, true);
            assert!(!can_perform(&requester, AdminAction::CreateAdmin, None));
            assert!(!can_perform(&requester, AdminAction::DeleteAdmin, Some(&target)));
            assert!(!can_perform(&requester, AdminAction::ChangeRole, Some(&target)));
        }
    }

    #[test]
    fn self_edit_is_allowed_for_any_role() {
        let viewer = admin(Role::Viewer, true);
        assert!(can_perform(&viewer, AdminAction::EditProfile, Some(&viewer)));
        let other = admin(Role::Viewer, true);
        assert!(!can_perform(&viewer, AdminAction::EditProfile, Some(&other)));
    }

    #[test]
    fn inactive_requester_may_do_nothing() {
        let su = admin(Role::SuperAdmin, false);
        assert!(!can_perform(&su, AdminAction::CreateAdmin, None));
        assert!(!can_perform(&su, AdminAction::ConvertConsultation, None));
    }
}
