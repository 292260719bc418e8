use log::info;
use shams_core::{Decision, FoodPreference, MessCapacityMode, RequestStatus, Role};

use crate::{
    access::{check_scope, require_staff, require_student},
    allocation::request_filter,
    error::check_optional_text,
    CollabContext, CollabEvent, Commit, MessApplicationData, Mismatch, NewMessApplication,
    PrimaryKey, UserData, Verdict, WorkflowError, WorkflowResult,
};

const REMARKS_LENGTH: usize = 512;

/// Mess applications and the decisions binding students to a mess
pub struct MessManager {
    context: CollabContext,
}

#[derive(Debug, Clone)]
pub struct MessPreferences {
    pub hostel_id: PrimaryKey,
    pub mess_id: PrimaryKey,
    pub food_preference: FoodPreference,
}

impl MessManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Files a pending application for a mess of the given hostel
    pub async fn submit_mess_application(
        &self,
        actor: &UserData,
        preferences: MessPreferences,
    ) -> WorkflowResult<MessApplicationData> {
        require_student(actor)?;

        let mess = self.context.database.mess_by_id(preferences.mess_id).await?;

        if mess.hostel_id != preferences.hostel_id {
            return Err(WorkflowError::ConstraintViolation(format!(
                "mess {} does not belong to hostel {}",
                mess.name, preferences.hostel_id
            )));
        }

        let application = self
            .context
            .database
            .create_mess_application(NewMessApplication {
                student_id: actor.id,
                hostel_id: preferences.hostel_id,
                mess_id: preferences.mess_id,
                food_preference: preferences.food_preference,
            })
            .await?;

        info!(
            "Student {} applied to mess {} ({})",
            actor.username, mess.name, application.food_preference
        );
        Ok(application)
    }

    pub async fn mess_application(
        &self,
        actor: &UserData,
        application_id: PrimaryKey,
    ) -> WorkflowResult<MessApplicationData> {
        let application = self
            .context
            .database
            .mess_application_by_id(application_id)
            .await?;

        match actor.role {
            Role::Student if application.student_id != actor.id => Err(WorkflowError::Forbidden(
                "students can only see their own applications".to_string(),
            )),
            Role::Warden => {
                check_scope(actor, application.hostel_id, None)?;
                Ok(application)
            }
            _ => Ok(application),
        }
    }

    /// Students see their own applications, wardens those of their hostel, admins all of them
    pub async fn list_mess_applications(
        &self,
        actor: &UserData,
        status: Option<RequestStatus>,
    ) -> WorkflowResult<Vec<MessApplicationData>> {
        let filter = request_filter(actor, status)?;
        Ok(self.context.database.list_mess_applications(filter).await?)
    }

    /// Approves or rejects a pending application.
    ///
    /// Approval needs an active mess whose menu serves the student's food
    /// preference. Capacity is only checked when the configuration enforces it.
    pub async fn decide_mess_application(
        &self,
        actor: &UserData,
        application_id: PrimaryKey,
        decision: Decision,
        remarks: Option<String>,
    ) -> WorkflowResult<MessApplicationData> {
        require_staff(actor)?;
        check_optional_text("remarks", remarks.as_deref(), REMARKS_LENGTH)?;

        let application = self
            .context
            .database
            .mess_application_by_id(application_id)
            .await?;

        if application.status.is_terminal() {
            return Err(already_decided(application_id, application.status));
        }

        let mess = self.context.database.mess_by_id(application.mess_id).await?;
        check_scope(actor, mess.hostel_id, None)?;

        let verdict = Verdict {
            id: application_id,
            approver_id: actor.id,
            remarks,
        };

        let commit = match decision {
            Decision::Approved => {
                let enforce = self.context.config.mess_capacity == MessCapacityMode::Enforced;
                self.context
                    .database
                    .enroll_student(verdict, enforce)
                    .await?
            }
            Decision::Rejected => {
                self.context
                    .database
                    .reject_mess_application(verdict)
                    .await?
            }
        };

        let application = match commit {
            Commit::Done(application) => application,
            Commit::AlreadyDecided(status) => {
                return Err(already_decided(application_id, status))
            }
            Commit::Full => {
                return Err(WorkflowError::CapacityExceeded {
                    resource: "mess",
                    id: mess.id,
                })
            }
            Commit::Mismatch(Mismatch::InactiveMess) => {
                return Err(WorkflowError::ConstraintViolation(format!(
                    "mess {} is not active",
                    mess.name
                )))
            }
            Commit::Mismatch(Mismatch::Menu) => {
                return Err(WorkflowError::ConstraintViolation(format!(
                    "mess {} does not serve a {} menu",
                    mess.name, application.food_preference
                )))
            }
            Commit::Mismatch(_) | Commit::AlreadyPlaced | Commit::BelowOccupancy { .. } => {
                return Err(WorkflowError::ConstraintViolation(
                    "the student cannot join this mess".to_string(),
                ))
            }
        };

        info!(
            "Mess application {} {} by {}",
            application.id, application.status, actor.username
        );

        self.context
            .notifier
            .emit(CollabEvent::MessApplicationDecided {
                student_id: application.student_id,
                application_id: application.id,
                status: application.status,
                mess_id: application.mess_id,
            });

        Ok(application)
    }
}

fn already_decided(id: PrimaryKey, status: RequestStatus) -> WorkflowError {
    WorkflowError::StateConflict {
        resource: "mess application",
        id,
        status,
    }
}

#[cfg(test)]
mod test {
    use shams_core::{
        Config, Decision, FoodPreference, Gender, HostelGender, MenuType, MessCapacityMode,
        RequestStatus, Role,
    };

    use super::{MessManager, MessPreferences};
    use crate::{
        access::test::user,
        hostels::test::{context, new_hostel},
        CollabContext, Commit, HostelData, HostelManager, MessData, Mismatch, NewMess, NewUser,
        UpdatedMess, UserData, Verdict, WorkflowError,
    };

    struct Canteen {
        context: CollabContext,
        manager: MessManager,
        admin: UserData,
        hostel: HostelData,
    }

    impl Canteen {
        async fn new(mode: MessCapacityMode) -> Self {
            let context = CollabContext {
                config: Config {
                    mess_capacity: mode,
                    ..Config::default()
                },
                ..context()
            };
            let admin = user(0, Role::Admin);
            let hostel = HostelManager::new(&context)
                .create_hostel(&admin, new_hostel("Aravali", HostelGender::Coed))
                .await
                .unwrap();

            Self {
                manager: MessManager::new(&context),
                context,
                admin,
                hostel,
            }
        }

        async fn mess(&self, name: &str, menu_type: MenuType, capacity: i32) -> MessData {
            HostelManager::new(&self.context)
                .create_mess(
                    &self.admin,
                    NewMess {
                        hostel_id: self.hostel.id,
                        name: name.to_string(),
                        capacity,
                        menu_type,
                        facilities: vec![],
                    },
                )
                .await
                .unwrap()
        }

        async fn student(&self, username: &str) -> UserData {
            self.context
                .database
                .create_user(NewUser {
                    username: username.to_string(),
                    password: String::new(),
                    display_name: username.to_string(),
                    role: Role::Student,
                    gender: Some(Gender::Female),
                    hostel_identifier: None,
                    assigned_hostel_id: None,
                    assigned_floor: None,
                })
                .await
                .unwrap()
        }

        async fn apply(
            &self,
            student: &UserData,
            mess: &MessData,
            food_preference: FoodPreference,
        ) -> crate::MessApplicationData {
            self.manager
                .submit_mess_application(
                    student,
                    MessPreferences {
                        hostel_id: self.hostel.id,
                        mess_id: mess.id,
                        food_preference,
                    },
                )
                .await
                .unwrap()
        }

        async fn approve(
            &self,
            application_id: i32,
        ) -> crate::WorkflowResult<crate::MessApplicationData> {
            self.manager
                .decide_mess_application(&self.admin, application_id, Decision::Approved, None)
                .await
        }
    }

    #[tokio::test]
    async fn approval_binds_the_student_to_the_mess() {
        let canteen = Canteen::new(MessCapacityMode::Advisory).await;
        let mess = canteen.mess("Green", MenuType::Both, 50).await;
        let student = canteen.student("asha").await;

        let application = canteen.apply(&student, &mess, FoodPreference::Veg).await;
        assert_eq!(application.status, RequestStatus::Pending);

        let decided = canteen.approve(application.id).await.unwrap();
        assert_eq!(decided.status, RequestStatus::Approved);

        let student = canteen
            .context
            .database
            .user_by_id(student.id)
            .await
            .unwrap();
        assert_eq!(student.mess_id, Some(mess.id));
    }

    #[tokio::test]
    async fn menu_must_serve_the_preference() {
        let canteen = Canteen::new(MessCapacityMode::Advisory).await;
        let mess = canteen.mess("Green", MenuType::Veg, 50).await;
        let student = canteen.student("asha").await;

        let application = canteen
            .apply(&student, &mess, FoodPreference::NonVeg)
            .await;
        let result = canteen.approve(application.id).await;

        assert!(matches!(
            result,
            Err(WorkflowError::ConstraintViolation(_))
        ));

        let application = canteen
            .context
            .database
            .mess_application_by_id(application.id)
            .await
            .unwrap();
        assert_eq!(application.status, RequestStatus::Pending);
    }

    #[tokio::test]
    async fn inactive_messes_take_no_one() {
        let canteen = Canteen::new(MessCapacityMode::Advisory).await;
        let mess = canteen.mess("Green", MenuType::Both, 50).await;
        let student = canteen.student("asha").await;
        let application = canteen.apply(&student, &mess, FoodPreference::Veg).await;

        HostelManager::new(&canteen.context)
            .update_mess(
                &canteen.admin,
                UpdatedMess {
                    id: mess.id,
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = canteen.approve(application.id).await;
        assert!(matches!(
            result,
            Err(WorkflowError::ConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn menu_changed_after_submission_blocks_approval() {
        let canteen = Canteen::new(MessCapacityMode::Advisory).await;
        let mess = canteen.mess("Green", MenuType::Both, 50).await;
        let student = canteen.student("asha").await;
        let application = canteen
            .apply(&student, &mess, FoodPreference::NonVeg)
            .await;

        HostelManager::new(&canteen.context)
            .update_mess(
                &canteen.admin,
                UpdatedMess {
                    id: mess.id,
                    menu_type: Some(MenuType::Veg),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let commit = canteen
            .context
            .database
            .enroll_student(
                Verdict {
                    id: application.id,
                    approver_id: canteen.admin.id,
                    remarks: None,
                },
                false,
            )
            .await
            .unwrap();
        assert!(matches!(commit, Commit::Mismatch(Mismatch::Menu)));

        let result = canteen.approve(application.id).await;
        assert!(matches!(
            result,
            Err(WorkflowError::ConstraintViolation(_))
        ));

        let student = canteen
            .context
            .database
            .user_by_id(student.id)
            .await
            .unwrap();
        assert_eq!(student.mess_id, None);
    }

    #[tokio::test]
    async fn advisory_capacity_lets_everyone_in() {
        let canteen = Canteen::new(MessCapacityMode::Advisory).await;
        let mess = canteen.mess("Tiny", MenuType::Both, 1).await;

        for name in ["a", "b"] {
            let student = canteen.student(name).await;
            let application = canteen.apply(&student, &mess, FoodPreference::Veg).await;
            assert!(canteen.approve(application.id).await.is_ok());
        }
    }

    #[tokio::test]
    async fn enforced_capacity_turns_students_away() {
        let canteen = Canteen::new(MessCapacityMode::Enforced).await;
        let mess = canteen.mess("Tiny", MenuType::Both, 1).await;

        let first = canteen.student("a").await;
        let application = canteen.apply(&first, &mess, FoodPreference::Veg).await;
        canteen.approve(application.id).await.unwrap();

        let second = canteen.student("b").await;
        let application = canteen.apply(&second, &mess, FoodPreference::Veg).await;
        let result = canteen.approve(application.id).await;

        assert!(matches!(
            result,
            Err(WorkflowError::CapacityExceeded { resource: "mess", .. })
        ));
    }

    #[tokio::test]
    async fn messes_of_other_hostels_are_refused() {
        let canteen = Canteen::new(MessCapacityMode::Advisory).await;
        let mess = canteen.mess("Green", MenuType::Both, 50).await;
        let student = canteen.student("asha").await;

        let result = canteen
            .manager
            .submit_mess_application(
                &student,
                MessPreferences {
                    hostel_id: canteen.hostel.id + 100,
                    mess_id: mess.id,
                    food_preference: FoodPreference::Veg,
                },
            )
            .await;

        assert!(matches!(
            result,
            Err(WorkflowError::ConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn rejected_applications_are_final() {
        let canteen = Canteen::new(MessCapacityMode::Advisory).await;
        let mess = canteen.mess("Green", MenuType::Both, 50).await;
        let student = canteen.student("asha").await;
        let application = canteen.apply(&student, &mess, FoodPreference::Veg).await;

        canteen
            .manager
            .decide_mess_application(
                &canteen.admin,
                application.id,
                Decision::Rejected,
                Some("apply next term".to_string()),
            )
            .await
            .unwrap();

        let result = canteen.approve(application.id).await;
        assert!(matches!(
            result,
            Err(WorkflowError::StateConflict {
                status: RequestStatus::Rejected,
                ..
            })
        ));
    }
}
