use log::info;
use shams_core::{AcPreference, Gender, RequestStatus, Role, RoomType, StudyYear};

use crate::{
    access::{check_scope, require_staff, require_student},
    error::check_optional_text,
    CollabContext, CollabEvent, Commit, HostelRequestData, Mismatch, NewHostelRequest, Placement,
    PrimaryKey, RequestFilter, RoomData, RoomFilter, UserData, Verdict, WorkflowError,
    WorkflowResult,
};

const REMARKS_LENGTH: usize = 512;

/// Hostel requests, room availability, and the decisions binding students to rooms
pub struct AllocationManager {
    context: CollabContext,
}

/// What a student asks for. The year is checked on submission.
#[derive(Debug, Clone)]
pub struct HostelPreferences {
    pub hostel_id: PrimaryKey,
    pub room_type: RoomType,
    pub ac_preference: AcPreference,
    pub gender: Gender,
    pub year: i32,
    pub floor_preference: Option<i32>,
}

/// Every field narrows the result, `None` leaves it open
#[derive(Debug, Clone, Default)]
pub struct AvailabilityQuery {
    pub hostel_id: Option<PrimaryKey>,
    pub room_type: Option<RoomType>,
    pub ac_preference: Option<AcPreference>,
    pub gender: Option<Gender>,
}

impl From<&HostelRequestData> for AvailabilityQuery {
    fn from(request: &HostelRequestData) -> Self {
        Self {
            hostel_id: Some(request.hostel_id),
            room_type: Some(request.room_type),
            ac_preference: Some(request.ac_preference),
            gender: Some(request.gender),
        }
    }
}

/// A warden's or admin's answer to a hostel request.
/// Approving always names the room the student goes to.
#[derive(Debug, Clone)]
pub enum HostelDecision {
    Approve {
        room_id: PrimaryKey,
        remarks: Option<String>,
    },
    Reject {
        remarks: Option<String>,
    },
}

impl HostelDecision {
    fn remarks(&self) -> Option<&str> {
        match self {
            Self::Approve { remarks, .. } | Self::Reject { remarks } => remarks.as_deref(),
        }
    }
}

impl AllocationManager {
    pub fn new(context: &CollabContext) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// Files a pending request. Availability is not checked until a decision is made.
    pub async fn submit_hostel_request(
        &self,
        actor: &UserData,
        preferences: HostelPreferences,
    ) -> WorkflowResult<HostelRequestData> {
        require_student(actor)?;

        let year = StudyYear::try_from(preferences.year)?;

        if actor.gender.is_some_and(|g| g != preferences.gender) {
            return Err(WorkflowError::Validation(
                "requested gender differs from the student's".to_string(),
            ));
        }

        let request = self
            .context
            .database
            .create_hostel_request(NewHostelRequest {
                student_id: actor.id,
                hostel_id: preferences.hostel_id,
                room_type: preferences.room_type,
                ac_preference: preferences.ac_preference,
                gender: preferences.gender,
                year,
                floor_preference: preferences.floor_preference,
            })
            .await?;

        info!(
            "Student {} requested a {} {} room in hostel {}",
            actor.username, request.ac_preference, request.room_type, request.hostel_id
        );
        Ok(request)
    }

    /// Rooms with a free bed, by floor then room number. Full rooms never appear.
    pub async fn list_available_rooms(
        &self,
        query: AvailabilityQuery,
    ) -> WorkflowResult<Vec<RoomData>> {
        let filter = RoomFilter {
            hostel_id: query.hostel_id,
            room_type: query.room_type,
            has_ac: query.ac_preference.map(|p| p.has_ac()),
            gender: query.gender,
        };

        Ok(self.context.database.available_rooms(filter).await?)
    }

    /// Rooms a pending request could be approved into
    pub async fn rooms_for_request(
        &self,
        actor: &UserData,
        request_id: PrimaryKey,
    ) -> WorkflowResult<Vec<RoomData>> {
        let request = self.context.database.hostel_request_by_id(request_id).await?;
        check_scope(actor, request.hostel_id, None)?;

        self.list_available_rooms(AvailabilityQuery::from(&request))
            .await
    }

    pub async fn hostel_request(
        &self,
        actor: &UserData,
        request_id: PrimaryKey,
    ) -> WorkflowResult<HostelRequestData> {
        let request = self.context.database.hostel_request_by_id(request_id).await?;

        if actor.role == Role::Student && request.student_id != actor.id {
            return Err(WorkflowError::Forbidden(
                "students can only see their own requests".to_string(),
            ));
        }

        if actor.role == Role::Warden {
            check_scope(actor, request.hostel_id, None)?;
        }

        Ok(request)
    }

    /// Students see their own requests, wardens those of their hostel, admins all of them
    pub async fn list_hostel_requests(
        &self,
        actor: &UserData,
        status: Option<RequestStatus>,
    ) -> WorkflowResult<Vec<HostelRequestData>> {
        let filter = request_filter(actor, status)?;
        Ok(self.context.database.list_hostel_requests(filter).await?)
    }

    /// Approves or rejects a pending request.
    ///
    /// Approval places the student in the room in one atomic step. The room's
    /// capacity, gender, type and air conditioning are checked against its state
    /// at the moment of the write, so concurrent approvals can never overfill it.
    pub async fn decide_hostel_request(
        &self,
        actor: &UserData,
        request_id: PrimaryKey,
        decision: HostelDecision,
    ) -> WorkflowResult<HostelRequestData> {
        require_staff(actor)?;
        check_optional_text("remarks", decision.remarks(), REMARKS_LENGTH)?;

        let request = self.context.database.hostel_request_by_id(request_id).await?;

        if request.status.is_terminal() {
            return Err(already_decided(request_id, request.status));
        }

        let room_id = match &decision {
            HostelDecision::Approve { room_id, .. } => *room_id,
            HostelDecision::Reject { .. } => 0,
        };

        let commit = match decision {
            HostelDecision::Approve { room_id, remarks } => {
                let room = self.context.database.room_by_id(room_id).await?;
                check_scope(actor, room.hostel_id, Some(room.floor))?;

                self.context
                    .database
                    .place_student(Placement {
                        request_id,
                        room_id,
                        approver_id: actor.id,
                        remarks,
                    })
                    .await?
            }
            HostelDecision::Reject { remarks } => {
                check_scope(actor, request.hostel_id, None)?;

                self.context
                    .database
                    .reject_hostel_request(Verdict {
                        id: request_id,
                        approver_id: actor.id,
                        remarks,
                    })
                    .await?
            }
        };

        let request = match commit {
            Commit::Done(request) => request,
            Commit::AlreadyDecided(status) => return Err(already_decided(request_id, status)),
            Commit::Full => {
                return Err(WorkflowError::CapacityExceeded {
                    resource: "room",
                    id: room_id,
                })
            }
            Commit::Mismatch(mismatch) => {
                let reason = match mismatch {
                    Mismatch::Gender => {
                        format!("the room does not take {} students", request.gender)
                    }
                    Mismatch::RoomType => {
                        format!("the student asked for a {} room", request.room_type)
                    }
                    Mismatch::AirConditioning => {
                        format!("the student asked for a {} room", request.ac_preference)
                    }
                    Mismatch::InactiveMess | Mismatch::Menu => {
                        "the room does not match the request".to_string()
                    }
                };

                return Err(WorkflowError::ConstraintViolation(reason));
            }
            Commit::AlreadyPlaced => {
                return Err(WorkflowError::ConstraintViolation(
                    "the student already has a room".to_string(),
                ))
            }
            Commit::BelowOccupancy { .. } => {
                return Err(WorkflowError::ConstraintViolation(
                    "the room cannot take this student".to_string(),
                ))
            }
        };

        info!(
            "Hostel request {} {} by {}",
            request.id, request.status, actor.username
        );

        self.context
            .notifier
            .emit(CollabEvent::HostelRequestDecided {
                student_id: request.student_id,
                request_id: request.id,
                status: request.status,
                room_id: request.assigned_room_id,
            });

        Ok(request)
    }

    /// Frees the student's bed, returning the room they left
    pub async fn release_student(
        &self,
        actor: &UserData,
        student_id: PrimaryKey,
    ) -> WorkflowResult<RoomData> {
        let student = self.context.database.user_by_id(student_id).await?;
        let room_id = student.room_id.ok_or(WorkflowError::NotFound {
            resource: "room",
            identifier: "student_id",
        })?;

        let room = self.context.database.room_by_id(room_id).await?;
        check_scope(actor, room.hostel_id, Some(room.floor))?;

        let room = self.context.database.release_student(student_id).await?;

        info!(
            "Student {} released from room {} by {}",
            student.username, room.room_number, actor.username
        );
        Ok(room)
    }
}

/// Narrows a listing to what the actor is allowed to see
pub(crate) fn request_filter(
    actor: &UserData,
    status: Option<RequestStatus>,
) -> WorkflowResult<RequestFilter> {
    let filter = RequestFilter {
        status,
        ..Default::default()
    };

    match actor.role {
        Role::Admin => Ok(filter),
        Role::Student => Ok(RequestFilter {
            student_id: Some(actor.id),
            ..filter
        }),
        Role::Warden => match actor.assigned_hostel_id {
            Some(hostel_id) => Ok(RequestFilter {
                hostel_id: Some(hostel_id),
                ..filter
            }),
            None => Err(WorkflowError::Forbidden(format!(
                "warden {} has no hostel assigned",
                actor.username
            ))),
        },
    }
}

fn already_decided(id: PrimaryKey, status: RequestStatus) -> WorkflowError {
    WorkflowError::StateConflict {
        resource: "hostel request",
        id,
        status,
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use shams_core::{AcPreference, Gender, HostelGender, RequestStatus, Role, RoomType};

    use super::{AllocationManager, AvailabilityQuery, HostelDecision, HostelPreferences};
    use crate::{
        access::test::user,
        hostels::test::{context, draft, new_hostel},
        CollabContext, CollabEvent, Commit, HostelData, HostelManager, NewUser, Notifier,
        RoomData, RoomDraft, UpdatedRoom, UserData, WorkflowError,
    };

    struct Campus {
        context: CollabContext,
        allocation: AllocationManager,
        admin: UserData,
        hostel: HostelData,
    }

    impl Campus {
        async fn new() -> Self {
            Self::with_context(context()).await
        }

        async fn with_context(context: CollabContext) -> Self {
            let admin = user(0, Role::Admin);
            let hostel = HostelManager::new(&context)
                .create_hostel(&admin, new_hostel("Aravali", HostelGender::Coed))
                .await
                .unwrap();

            Self {
                allocation: AllocationManager::new(&context),
                context,
                admin,
                hostel,
            }
        }

        async fn room(&self, room_draft: RoomDraft) -> RoomData {
            HostelManager::new(&self.context)
                .create_room(&self.admin, room_draft)
                .await
                .unwrap()
        }

        async fn double(&self, number: &str) -> RoomData {
            self.room(draft(&self.hostel, number, RoomType::Double))
                .await
        }

        async fn user(&self, username: &str, role: Role, gender: Option<Gender>) -> UserData {
            self.context
                .database
                .create_user(NewUser {
                    username: username.to_string(),
                    password: String::new(),
                    display_name: username.to_string(),
                    role,
                    gender,
                    hostel_identifier: None,
                    assigned_hostel_id: (role == Role::Warden).then_some(self.hostel.id),
                    assigned_floor: None,
                })
                .await
                .unwrap()
        }

        async fn student(&self, username: &str, gender: Gender) -> UserData {
            self.user(username, Role::Student, Some(gender)).await
        }

        fn preferences(&self, gender: Gender) -> HostelPreferences {
            HostelPreferences {
                hostel_id: self.hostel.id,
                room_type: RoomType::Double,
                ac_preference: AcPreference::NonAc,
                gender,
                year: 2,
                floor_preference: Some(1),
            }
        }

        async fn request(&self, student: &UserData) -> crate::HostelRequestData {
            let gender = student.gender.unwrap();
            self.allocation
                .submit_hostel_request(student, self.preferences(gender))
                .await
                .unwrap()
        }

        async fn single_request(&self, student: &UserData) -> crate::HostelRequestData {
            let preferences = HostelPreferences {
                room_type: RoomType::Single,
                ..self.preferences(student.gender.unwrap())
            };
            self.allocation
                .submit_hostel_request(student, preferences)
                .await
                .unwrap()
        }

        async fn approve(
            &self,
            request_id: i32,
            room_id: i32,
        ) -> crate::WorkflowResult<crate::HostelRequestData> {
            self.allocation
                .decide_hostel_request(
                    &self.admin,
                    request_id,
                    HostelDecision::Approve {
                        room_id,
                        remarks: None,
                    },
                )
                .await
        }
    }

    #[tokio::test]
    async fn submitted_requests_start_pending() {
        let campus = Campus::new().await;
        let student = campus.student("ravi", Gender::Male).await;

        let request = campus.request(&student).await;

        assert_eq!(request.status, RequestStatus::Pending);
        assert_eq!(request.student_id, student.id);
        assert_eq!(request.year.value(), 2);
        assert!(request.assigned_room_id.is_none());
    }

    #[tokio::test]
    async fn year_out_of_range_is_refused() {
        let campus = Campus::new().await;
        let student = campus.student("ravi", Gender::Male).await;

        let result = campus
            .allocation
            .submit_hostel_request(
                &student,
                HostelPreferences {
                    year: 6,
                    ..campus.preferences(Gender::Male)
                },
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Validation(_))));
    }

    #[tokio::test]
    async fn approval_places_the_student() {
        let (notifier, events) = Notifier::channel();
        let campus = Campus::with_context(CollabContext {
            notifier,
            ..context()
        })
        .await;

        let room = campus.double("A-101").await;
        let student = campus.student("ravi", Gender::Male).await;
        let request = campus.request(&student).await;

        let decided = campus.approve(request.id, room.id).await.unwrap();

        assert_eq!(decided.status, RequestStatus::Approved);
        assert_eq!(decided.assigned_room_id, Some(room.id));
        assert_eq!(decided.approver_id, Some(campus.admin.id));
        assert!(decided.decided_at.is_some());

        let room = campus.context.database.room_by_id(room.id).await.unwrap();
        assert_eq!(room.occupants, vec![student.id]);

        let student = campus.context.database.user_by_id(student.id).await.unwrap();
        assert_eq!(student.room_id, Some(room.id));

        match events.try_recv().unwrap() {
            CollabEvent::HostelRequestDecided {
                student_id, status, ..
            } => {
                assert_eq!(student_id, student.id);
                assert_eq!(status, RequestStatus::Approved);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[tokio::test]
    async fn the_last_bed_goes_to_one_student_only() {
        let campus = Campus::new().await;
        let room = campus.double("A-101").await;

        let x = campus.student("x", Gender::Male).await;
        let y = campus.student("y", Gender::Male).await;
        let z = campus.student("z", Gender::Male).await;

        let request_x = campus.request(&x).await;
        campus.approve(request_x.id, room.id).await.unwrap();

        let request_y = campus.request(&y).await;
        let request_z = campus.request(&z).await;

        campus.approve(request_y.id, room.id).await.unwrap();
        let result = campus.approve(request_z.id, room.id).await;

        assert!(matches!(
            result,
            Err(WorkflowError::CapacityExceeded { resource: "room", .. })
        ));

        let room = campus.context.database.room_by_id(room.id).await.unwrap();
        assert_eq!(room.occupants, vec![x.id, y.id]);

        let request_z = campus
            .context
            .database
            .hostel_request_by_id(request_z.id)
            .await
            .unwrap();
        assert_eq!(request_z.status, RequestStatus::Pending);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_approvals_never_overfill() {
        let campus = Arc::new(Campus::new().await);
        let room = campus.double("A-101").await;

        let mut requests = vec![];
        for i in 0..8 {
            let student = campus.student(&format!("s{i}"), Gender::Male).await;
            requests.push(campus.request(&student).await);
        }

        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let campus = campus.clone();
                let room_id = room.id;
                tokio::spawn(async move { campus.approve(request.id, room_id).await })
            })
            .collect();

        let mut approved = 0;
        let mut full = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => approved += 1,
                Err(WorkflowError::CapacityExceeded { .. }) => full += 1,
                Err(e) => panic!("unexpected error {e}"),
            }
        }

        assert_eq!(approved, 2);
        assert_eq!(full, 6);

        let room = campus.context.database.room_by_id(room.id).await.unwrap();
        assert_eq!(room.occupants.len(), 2);
    }

    #[tokio::test]
    async fn gender_mismatch_changes_nothing() {
        let campus = Campus::new().await;
        let room = campus.double("A-101").await;
        let student = campus.student("meera", Gender::Female).await;
        let request = campus.request(&student).await;

        let result = campus.approve(request.id, room.id).await;

        assert!(matches!(
            result,
            Err(WorkflowError::ConstraintViolation(_))
        ));

        let request = campus
            .context
            .database
            .hostel_request_by_id(request.id)
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let room = campus.context.database.room_by_id(room.id).await.unwrap();
        assert!(room.occupants.is_empty());
    }

    #[tokio::test]
    async fn rooms_must_match_the_requested_type_and_air_conditioning() {
        let campus = Campus::new().await;
        let quad = campus
            .room(draft(&campus.hostel, "A-104", RoomType::Quad))
            .await;
        let ac = campus
            .room(RoomDraft {
                has_ac: true,
                ..draft(&campus.hostel, "A-105", RoomType::Double)
            })
            .await;
        let student = campus.student("ravi", Gender::Male).await;
        let request = campus.request(&student).await;

        for room in [&quad, &ac] {
            let result = campus.approve(request.id, room.id).await;
            assert!(matches!(
                result,
                Err(WorkflowError::ConstraintViolation(_))
            ));

            let room = campus.context.database.room_by_id(room.id).await.unwrap();
            assert!(room.occupants.is_empty());
        }

        let request = campus
            .context
            .database
            .hostel_request_by_id(request.id)
            .await
            .unwrap();
        assert_eq!(request.status, RequestStatus::Pending);

        let student = campus.context.database.user_by_id(student.id).await.unwrap();
        assert_eq!(student.room_id, None);
    }

    #[tokio::test]
    async fn resize_refuses_placements_made_after_it_read_the_room() {
        let campus = Campus::new().await;
        let room = campus.double("A-101").await;
        let a = campus.student("a", Gender::Male).await;
        let b = campus.student("b", Gender::Male).await;

        let request_a = campus.request(&a).await;
        campus.approve(request_a.id, room.id).await.unwrap();

        // A resize that read one occupant would allow a single bed
        let seen = campus.context.database.room_by_id(room.id).await.unwrap();
        assert!(seen.occupancy().fits_within(1));

        let request_b = campus.request(&b).await;
        campus.approve(request_b.id, room.id).await.unwrap();

        let commit = campus
            .context
            .database
            .update_room(UpdatedRoom {
                id: room.id,
                capacity: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(matches!(commit, Commit::BelowOccupancy { occupied: 2 }));

        let room = campus.context.database.room_by_id(room.id).await.unwrap();
        assert_eq!(room.capacity, 2);
        assert_eq!(room.occupants, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn decided_requests_stay_decided() {
        let campus = Campus::new().await;
        let room = campus.double("A-101").await;
        let student = campus.student("ravi", Gender::Male).await;
        let request = campus.request(&student).await;

        let rejected = campus
            .allocation
            .decide_hostel_request(
                &campus.admin,
                request.id,
                HostelDecision::Reject {
                    remarks: Some("incomplete documents".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, RequestStatus::Rejected);
        assert_eq!(rejected.remarks.as_deref(), Some("incomplete documents"));

        let result = campus.approve(request.id, room.id).await;

        assert!(matches!(
            result,
            Err(WorkflowError::StateConflict {
                status: RequestStatus::Rejected,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn a_student_gets_only_one_room() {
        let campus = Campus::new().await;
        let first = campus.double("A-101").await;
        let second = campus.double("A-102").await;
        let student = campus.student("ravi", Gender::Male).await;

        let request = campus.request(&student).await;
        campus.approve(request.id, first.id).await.unwrap();

        let again = campus.request(&student).await;
        let result = campus.approve(again.id, second.id).await;

        assert!(matches!(
            result,
            Err(WorkflowError::ConstraintViolation(_))
        ));
    }

    #[tokio::test]
    async fn full_rooms_are_never_available() {
        let campus = Campus::new().await;
        let single = campus
            .room(draft(&campus.hostel, "A-100", RoomType::Single))
            .await;
        let double = campus.double("A-101").await;

        let student = campus.student("ravi", Gender::Male).await;
        let request = campus.single_request(&student).await;
        campus.approve(request.id, single.id).await.unwrap();

        let available = campus
            .allocation
            .list_available_rooms(AvailabilityQuery::default())
            .await
            .unwrap();

        let ids: Vec<_> = available.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![double.id]);
    }

    #[tokio::test]
    async fn availability_follows_the_preferences() {
        let campus = Campus::new().await;
        campus.double("A-101").await;
        let ac = campus
            .room(RoomDraft {
                has_ac: true,
                ..draft(&campus.hostel, "A-102", RoomType::Double)
            })
            .await;
        campus
            .room(RoomDraft {
                gender: Gender::Female,
                ..draft(&campus.hostel, "A-103", RoomType::Double)
            })
            .await;

        let available = campus
            .allocation
            .list_available_rooms(AvailabilityQuery {
                hostel_id: Some(campus.hostel.id),
                room_type: Some(RoomType::Double),
                ac_preference: Some(AcPreference::Ac),
                gender: Some(Gender::Male),
            })
            .await
            .unwrap();

        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, ac.id);
    }

    #[tokio::test]
    async fn students_cannot_decide() {
        let campus = Campus::new().await;
        let room = campus.double("A-101").await;
        let student = campus.student("ravi", Gender::Male).await;
        let request = campus.request(&student).await;

        let result = campus
            .allocation
            .decide_hostel_request(
                &student,
                request.id,
                HostelDecision::Approve {
                    room_id: room.id,
                    remarks: None,
                },
            )
            .await;

        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
    }

    #[tokio::test]
    async fn wardens_decide_within_their_hostel() {
        let campus = Campus::new().await;
        let room = campus.double("A-101").await;
        let warden = campus.user("warden", Role::Warden, None).await;
        let student = campus.student("ravi", Gender::Male).await;
        let request = campus.request(&student).await;

        let listed = campus
            .allocation
            .list_hostel_requests(&warden, Some(RequestStatus::Pending))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);

        let decided = campus
            .allocation
            .decide_hostel_request(
                &warden,
                request.id,
                HostelDecision::Approve {
                    room_id: room.id,
                    remarks: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(decided.approver_id, Some(warden.id));

        let outsider = UserData {
            assigned_hostel_id: Some(campus.hostel.id + 100),
            ..warden
        };
        let other = campus.student("dev", Gender::Male).await;
        let other_request = campus.request(&other).await;

        let result = campus
            .allocation
            .decide_hostel_request(
                &outsider,
                other_request.id,
                HostelDecision::Reject { remarks: None },
            )
            .await;
        assert!(matches!(result, Err(WorkflowError::Forbidden(_))));
    }

    #[tokio::test]
    async fn students_list_only_their_requests() {
        let campus = Campus::new().await;
        let ravi = campus.student("ravi", Gender::Male).await;
        let dev = campus.student("dev", Gender::Male).await;

        campus.request(&ravi).await;
        campus.request(&dev).await;

        let own = campus
            .allocation
            .list_hostel_requests(&ravi, None)
            .await
            .unwrap();

        assert_eq!(own.len(), 1);
        assert_eq!(own[0].student_id, ravi.id);
    }

    #[tokio::test]
    async fn released_beds_become_available_again() {
        let campus = Campus::new().await;
        let room = campus
            .room(draft(&campus.hostel, "A-100", RoomType::Single))
            .await;
        let student = campus.student("ravi", Gender::Male).await;
        let request = campus.single_request(&student).await;
        campus.approve(request.id, room.id).await.unwrap();

        let available = campus
            .allocation
            .rooms_for_request(&campus.admin, request.id)
            .await
            .unwrap();
        assert!(available.is_empty());

        let released = campus
            .allocation
            .release_student(&campus.admin, student.id)
            .await
            .unwrap();
        assert!(released.occupants.is_empty());

        let available = campus
            .allocation
            .rooms_for_request(&campus.admin, request.id)
            .await
            .unwrap();
        let ids: Vec<_> = available.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![room.id]);

        let all = campus
            .allocation
            .list_available_rooms(AvailabilityQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[tokio::test]
    async fn occupied_rooms_cannot_shrink_below_occupancy() {
        let campus = Campus::new().await;
        let room = campus.double("A-101").await;
        let hostels = HostelManager::new(&campus.context);

        for name in ["x", "y"] {
            let student = campus.student(name, Gender::Male).await;
            let request = campus.request(&student).await;
            campus.approve(request.id, room.id).await.unwrap();
        }

        let result = hostels
            .update_room(
                &campus.admin,
                room.id,
                crate::RoomChanges {
                    capacity: Some(1),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(WorkflowError::Validation(_))));

        let result = hostels.delete_room(&campus.admin, room.id).await;
        assert!(matches!(result, Err(WorkflowError::HasDependents { .. })));
    }
}
