//! Permission system for room operations

use crate::error::{Error, Result};
use crate::models::{MemberRole, UserId};

/// Actions that can be performed on a room
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomAction {
    // Room management
    StartRoom,
    FinishRoom,
    UpdateRoom,
    DeleteRoom,

    // Member management
    RemoveMember,
    GenerateInvitationCode,
    ListInvitationCodes,
    AcceptApplication,
    RejectApplication,

    // Rounds
    AddRound,
    DeleteRound,

    // Visibility
    ViewRoom,
    ListApplications,
}

impl RoomAction {
    /// Whether only the host may perform this action
    pub fn is_host_only(self) -> bool {
        !matches!(self, RoomAction::ViewRoom | RoomAction::ListApplications)
    }
}

/// Permission matrix for room roles
pub struct PermissionMatrix;

impl PermissionMatrix {
    /// Check if a role has permission to perform an action
    pub fn can_perform(role: MemberRole, action: RoomAction) -> bool {
        match role {
            MemberRole::Host => true,
            MemberRole::Member => !action.is_host_only(),
        }
    }

    /// Resolve a requester's role into a permission decision.
    ///
    /// `role` is `None` when the requester has no membership in the room.
    /// Host-only actions fail with `NotHost` for everyone but the host;
    /// member actions fail with `NotMember` for outsiders.
    pub fn require(role: Option<MemberRole>, action: RoomAction) -> Result<()> {
        match role {
            Some(role) if Self::can_perform(role, action) => Ok(()),
            _ if action.is_host_only() => Err(Error::NotHost),
            _ => Err(Error::NotMember),
        }
    }

    /// Payment status may be set by the host or by the member it belongs to
    pub fn can_update_payment(
        requester_role: Option<MemberRole>,
        requester_id: UserId,
        target_id: UserId,
    ) -> bool {
        requester_role.is_some_and(MemberRole::is_host) || requester_id == target_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_permissions() {
        assert!(PermissionMatrix::can_perform(MemberRole::Host, RoomAction::DeleteRoom));
        assert!(PermissionMatrix::can_perform(MemberRole::Host, RoomAction::AddRound));
        assert!(PermissionMatrix::can_perform(MemberRole::Host, RoomAction::ViewRoom));
    }

    #[test]
    fn test_member_permissions() {
        assert!(PermissionMatrix::can_perform(MemberRole::Member, RoomAction::ViewRoom));
        assert!(!PermissionMatrix::can_perform(MemberRole::Member, RoomAction::StartRoom));
        assert!(!PermissionMatrix::can_perform(
            MemberRole::Member,
            RoomAction::GenerateInvitationCode
        ));
    }

    #[test]
    fn test_require_maps_denials() {
        assert!(matches!(
            PermissionMatrix::require(Some(MemberRole::Member), RoomAction::DeleteRound),
            Err(Error::NotHost)
        ));
        assert!(matches!(
            PermissionMatrix::require(None, RoomAction::StartRoom),
            Err(Error::NotHost)
        ));
        assert!(matches!(
            PermissionMatrix::require(None, RoomAction::ViewRoom),
            Err(Error::NotMember)
        ));
        assert!(PermissionMatrix::require(Some(MemberRole::Member), RoomAction::ViewRoom).is_ok());
    }

    #[test]
    fn test_payment_updates() {
        assert!(PermissionMatrix::can_update_payment(Some(MemberRole::Host), 1, 2));
        assert!(PermissionMatrix::can_update_payment(Some(MemberRole::Member), 2, 2));
        assert!(!PermissionMatrix::can_update_payment(Some(MemberRole::Member), 2, 3));
        assert!(!PermissionMatrix::can_update_payment(None, 4, 3));
    }
}
