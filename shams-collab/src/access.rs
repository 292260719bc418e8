//! Role and scope checks shared by the managers.

use shams_core::Role;

use crate::{PrimaryKey, UserData, WorkflowError, WorkflowResult};

pub(crate) fn require_student(actor: &UserData) -> WorkflowResult<()> {
    match actor.role {
        Role::Student => Ok(()),
        _ => Err(WorkflowError::Forbidden(
            "only students can do this".to_string(),
        )),
    }
}

pub(crate) fn require_admin(actor: &UserData) -> WorkflowResult<()> {
    match actor.role {
        Role::Admin => Ok(()),
        _ => Err(WorkflowError::Forbidden("only admins can do this".to_string())),
    }
}

/// Wardens and admins
pub(crate) fn require_staff(actor: &UserData) -> WorkflowResult<()> {
    match actor.role {
        Role::Warden | Role::Admin => Ok(()),
        Role::Student => Err(WorkflowError::Forbidden(
            "students cannot decide requests".to_string(),
        )),
    }
}

/// Admins reach everything, wardens only their assigned hostel and floor.
/// Pass `floor: None` when the target has no floor of its own.
pub(crate) fn check_scope(
    actor: &UserData,
    hostel_id: PrimaryKey,
    floor: Option<i32>,
) -> WorkflowResult<()> {
    require_staff(actor)?;

    if actor.role == Role::Admin {
        return Ok(());
    }

    if actor.assigned_hostel_id != Some(hostel_id) {
        return Err(WorkflowError::Forbidden(format!(
            "warden {} is not assigned to hostel {}",
            actor.username, hostel_id
        )));
    }

    match (actor.assigned_floor, floor) {
        (Some(assigned), Some(floor)) if assigned != floor => {
            Err(WorkflowError::Forbidden(format!(
                "warden {} is not assigned to floor {}",
                actor.username, floor
            )))
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
pub(crate) mod test {
    use shams_core::{Gender, Role};

    use super::check_scope;
    use crate::{PrimaryKey, UserData, WorkflowError};

    pub fn user(id: PrimaryKey, role: Role) -> UserData {
        UserData {
            id,
            username: format!("user{id}"),
            password: String::new(),
            display_name: format!("User {id}"),
            role,
            gender: matches!(role, Role::Student).then_some(Gender::Male),
            hostel_identifier: None,
            room_id: None,
            mess_id: None,
            assigned_hostel_id: None,
            assigned_floor: None,
        }
    }

    #[test]
    fn admins_reach_every_hostel() {
        assert!(check_scope(&user(1, Role::Admin), 10, Some(3)).is_ok());
    }

    #[test]
    fn wardens_are_limited_to_their_hostel_and_floor() {
        let warden = UserData {
            assigned_hostel_id: Some(10),
            assigned_floor: Some(2),
            ..user(1, Role::Warden)
        };

        assert!(check_scope(&warden, 10, Some(2)).is_ok());
        assert!(check_scope(&warden, 10, None).is_ok());
        assert!(matches!(
            check_scope(&warden, 10, Some(1)),
            Err(WorkflowError::Forbidden(_))
        ));
        assert!(matches!(
            check_scope(&warden, 11, Some(2)),
            Err(WorkflowError::Forbidden(_))
        ));
    }

    #[test]
    fn students_are_never_in_scope() {
        assert!(check_scope(&user(1, Role::Student), 10, None).is_err());
    }
}
