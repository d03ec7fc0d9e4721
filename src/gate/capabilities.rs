//! Role-derived capability set.
//!
//! Every role-gated action checks a named capability computed once from the
//! profile role, rather than comparing role strings at each call site. A
//! profile whose role could not be loaded (`None`) simply has no capabilities,
//! which hides the gated actions without being an error.

use crate::api::models::Role;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_move_card: bool,
    pub can_create_card: bool,
    pub can_edit_card: bool,
    pub can_delete_card: bool,
    pub can_assign: bool,
    /// Force-completing a card is manager-only even for the assigned member.
    pub can_force_complete: bool,
    /// Progress updates for cards the user is not assigned to.
    pub can_update_any_progress: bool,
    pub can_create_team: bool,
    pub can_delete_team: bool,
    pub can_remove_member: bool,
}

impl Capabilities {
    pub fn for_role(role: Option<Role>) -> Self {
        match role {
            Some(Role::ProjectManager) => Self {
                can_move_card: true,
                can_create_card: true,
                can_edit_card: true,
                can_delete_card: true,
                can_assign: true,
                can_force_complete: true,
                can_update_any_progress: true,
                can_create_team: true,
                can_delete_team: true,
                can_remove_member: true,
            },
            Some(Role::TeamMember) | None => Self::default(),
        }
    }

    /// Progress updates are allowed for managers and for the member the card
    /// is assigned to.
    pub fn can_update_progress(
        &self,
        assigned_to: Option<i64>,
        profile_id: Option<i64>,
    ) -> bool {
        if self.can_update_any_progress {
            return true;
        }
        matches!((assigned_to, profile_id), (Some(a), Some(p)) if a == p)
    }
}
