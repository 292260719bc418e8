use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shams_core::{
    AcPreference, FoodPreference, Gender, HostelGender, MaintenanceStatus, MenuType, Rating,
    RequestStatus, Role, RoomType, StudyYear,
};
use thiserror::Error;

mod data;
pub use data::*;

mod memory;
pub use memory::*;

mod pg;
pub use pg::*;

pub type Result<T> = std::result::Result<T, DatabaseError>;
pub type SharedDatabase = Arc<dyn Database>;

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// An unknown or internal error happened with the database
    #[error(transparent)]
    Internal(Box<dyn std::error::Error + Send + Sync>),
    /// A resource already exists
    #[error("{resource} with {field} of value {value} already exists")]
    Conflict {
        /// The resource in question
        resource: &'static str,
        /// The field that is conflicting
        field: &'static str,
        /// The conflicting value
        value: String,
    },
    /// A resource in the database doesn't exist
    #[error("{resource}:{identifier} doesn't exist")]
    NotFound {
        resource: &'static str,
        identifier: &'static str,
    },
    /// A resource can't be removed while others still point at it
    #[error("{resource} is still referenced by {dependents}")]
    HasDependents {
        resource: &'static str,
        dependents: &'static str,
    },
}

/// Helper trait to reduce boilerplate
pub trait IntoDatabaseError {
    fn not_found_or(self, resource: &'static str, identifier: &'static str) -> DatabaseError;
    /// A unique constraint tripped by a concurrent insert becomes a [DatabaseError::Conflict]
    fn conflict_or(self, resource: &'static str, field: &'static str, value: &str)
        -> DatabaseError;
    fn any(self) -> DatabaseError;
}

/// Helper trait to reduce boilerplate
pub trait DatabaseResult {
    /// Turns the Result into a conflict error if it's Ok()
    fn conflict_or_ok(self, resource: &'static str, field: &'static str, value: &str)
        -> Result<()>;
}

impl<T> DatabaseResult for Result<T> {
    fn conflict_or_ok(
        self,
        resource: &'static str,
        field: &'static str,
        value: &str,
    ) -> Result<()> {
        match self {
            Ok(_) => Err(DatabaseError::Conflict {
                resource,
                field,
                value: value.to_string(),
            }),
            Err(DatabaseError::NotFound { .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// The result of a conditional write: deciding a request or application, or
/// resizing a room. Every variant but [Commit::Done] means nothing was written.
#[derive(Debug)]
pub enum Commit<T> {
    Done(T),
    /// The request was decided by someone else first
    AlreadyDecided(RequestStatus),
    /// No place was left at the time of the write
    Full,
    /// The room or mess does not fit what the student asked for
    Mismatch(Mismatch),
    /// The student already has a room
    AlreadyPlaced,
    /// The new capacity is below the number of students living in the room
    BelowOccupancy { occupied: i32 },
}

/// Why a room or mess was refused, as seen at the time of the write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mismatch {
    Gender,
    RoomType,
    AirConditioning,
    InactiveMess,
    Menu,
}

/// Represents a type that can store SHAMS data.
///
/// Methods returning [Commit] must check their conditions and write in one
/// atomic step, so two concurrent callers can never both take the last place.
#[async_trait]
pub trait Database: Send + Sync {
    async fn any_admin(&self) -> Result<bool>;
    async fn user_by_id(&self, user_id: PrimaryKey) -> Result<UserData>;
    async fn user_by_username(&self, username: &str) -> Result<UserData>;
    async fn create_user(&self, new_user: NewUser) -> Result<UserData>;

    async fn session_by_token(&self, token: &str) -> Result<SessionData>;
    async fn create_session(&self, new_session: NewSession) -> Result<SessionData>;
    async fn delete_session_by_token(&self, token: &str) -> Result<()>;
    async fn clear_expired_sessions(&self) -> Result<()>;

    async fn hostel_by_id(&self, hostel_id: PrimaryKey) -> Result<HostelData>;
    async fn list_hostels(&self) -> Result<Vec<HostelData>>;
    async fn create_hostel(&self, new_hostel: NewHostel) -> Result<HostelData>;
    async fn update_hostel(&self, updated_hostel: UpdatedHostel) -> Result<HostelData>;
    /// Fails with [DatabaseError::HasDependents] while rooms or messes belong to it
    async fn delete_hostel(&self, hostel_id: PrimaryKey) -> Result<()>;

    async fn room_by_id(&self, room_id: PrimaryKey) -> Result<RoomData>;
    /// Rooms of a hostel, by floor then room number
    async fn list_rooms(&self, hostel_id: PrimaryKey) -> Result<Vec<RoomData>>;
    /// Rooms with at least one free bed matching the filter, by floor then room number
    async fn available_rooms(&self, filter: RoomFilter) -> Result<Vec<RoomData>>;
    async fn create_room(&self, new_room: NewRoom) -> Result<RoomData>;
    /// Applies the changes unless a new capacity would drop below the occupancy
    /// at the time of the write, which yields [Commit::BelowOccupancy]
    async fn update_room(&self, updated_room: UpdatedRoom) -> Result<Commit<RoomData>>;
    /// Fails with [DatabaseError::HasDependents] while students live in it
    async fn delete_room(&self, room_id: PrimaryKey) -> Result<()>;
    /// Removes a student from their room, returning the room
    async fn release_student(&self, student_id: PrimaryKey) -> Result<RoomData>;

    async fn mess_by_id(&self, mess_id: PrimaryKey) -> Result<MessData>;
    async fn list_messes(&self, hostel_id: PrimaryKey) -> Result<Vec<MessData>>;
    async fn create_mess(&self, new_mess: NewMess) -> Result<MessData>;
    async fn update_mess(&self, updated_mess: UpdatedMess) -> Result<MessData>;
    /// Fails with [DatabaseError::HasDependents] while applications or students reference it
    async fn delete_mess(&self, mess_id: PrimaryKey) -> Result<()>;

    async fn hostel_request_by_id(&self, request_id: PrimaryKey) -> Result<HostelRequestData>;
    async fn list_hostel_requests(&self, filter: RequestFilter)
        -> Result<Vec<HostelRequestData>>;
    async fn create_hostel_request(
        &self,
        new_request: NewHostelRequest,
    ) -> Result<HostelRequestData>;
    /// Puts the requesting student in the room and approves the request.
    /// The room's gender, type and air conditioning must match the request.
    async fn place_student(&self, placement: Placement) -> Result<Commit<HostelRequestData>>;
    async fn reject_hostel_request(
        &self,
        verdict: Verdict,
    ) -> Result<Commit<HostelRequestData>>;

    async fn mess_application_by_id(
        &self,
        application_id: PrimaryKey,
    ) -> Result<MessApplicationData>;
    async fn list_mess_applications(
        &self,
        filter: RequestFilter,
    ) -> Result<Vec<MessApplicationData>>;
    async fn create_mess_application(
        &self,
        new_application: NewMessApplication,
    ) -> Result<MessApplicationData>;
    /// Approves the application and binds the student to the mess.
    /// The mess must be active and serve the student's food preference when the
    /// write happens. With `enforce_capacity` set, fails with [Commit::Full] once
    /// the mess is full.
    async fn enroll_student(
        &self,
        verdict: Verdict,
        enforce_capacity: bool,
    ) -> Result<Commit<MessApplicationData>>;
    async fn reject_mess_application(
        &self,
        verdict: Verdict,
    ) -> Result<Commit<MessApplicationData>>;

    async fn create_feedback(&self, new_feedback: NewFeedback) -> Result<MessFeedbackData>;
    async fn list_feedback(&self) -> Result<Vec<MessFeedbackData>>;
}

#[derive(Debug)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    pub gender: Option<Gender>,
    pub hostel_identifier: Option<String>,
    pub assigned_hostel_id: Option<PrimaryKey>,
    pub assigned_floor: Option<i32>,
}

#[derive(Debug)]
pub struct NewSession {
    pub token: String,
    pub user_id: PrimaryKey,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHostel {
    pub name: String,
    pub block: String,
    pub gender: HostelGender,
    pub total_rooms: i32,
    pub total_capacity: i32,
    pub facilities: Vec<String>,
    pub address: String,
}

#[derive(Debug, Default)]
pub struct UpdatedHostel {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub block: Option<String>,
    pub total_rooms: Option<i32>,
    pub total_capacity: Option<i32>,
    pub active: Option<bool>,
    pub facilities: Option<Vec<String>>,
    pub address: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRoom {
    pub hostel_id: PrimaryKey,
    pub floor: i32,
    pub room_number: String,
    pub room_type: RoomType,
    pub capacity: i32,
    pub gender: Gender,
    pub has_ac: bool,
    pub fee_per_year: i64,
    pub facilities: Vec<String>,
    pub warden_id: Option<PrimaryKey>,
}

#[derive(Debug, Default)]
pub struct UpdatedRoom {
    pub id: PrimaryKey,
    pub capacity: Option<i32>,
    pub has_ac: Option<bool>,
    pub fee_per_year: Option<i64>,
    pub facilities: Option<Vec<String>>,
    pub maintenance: Option<MaintenanceStatus>,
    pub warden_id: Option<PrimaryKey>,
}

/// Narrows [Database::available_rooms], `None` matches anything
#[derive(Debug, Default, Clone)]
pub struct RoomFilter {
    pub hostel_id: Option<PrimaryKey>,
    pub room_type: Option<RoomType>,
    pub has_ac: Option<bool>,
    pub gender: Option<Gender>,
}

impl RoomFilter {
    pub fn matches(&self, room: &RoomData) -> bool {
        self.hostel_id.map_or(true, |id| room.hostel_id == id)
            && self.room_type.map_or(true, |t| room.room_type == t)
            && self.has_ac.map_or(true, |ac| room.has_ac == ac)
            && self.gender.map_or(true, |g| room.gender == g)
            && room.occupancy().has_vacancy()
    }
}

#[derive(Debug, Clone)]
pub struct NewMess {
    pub hostel_id: PrimaryKey,
    pub name: String,
    pub capacity: i32,
    pub menu_type: MenuType,
    pub facilities: Vec<String>,
}

#[derive(Debug, Default)]
pub struct UpdatedMess {
    pub id: PrimaryKey,
    pub name: Option<String>,
    pub capacity: Option<i32>,
    pub menu_type: Option<MenuType>,
    pub facilities: Option<Vec<String>>,
    pub active: Option<bool>,
}

/// Narrows request and application listings, `None` matches anything
#[derive(Debug, Default, Clone)]
pub struct RequestFilter {
    pub student_id: Option<PrimaryKey>,
    pub hostel_id: Option<PrimaryKey>,
    pub status: Option<RequestStatus>,
}

#[derive(Debug, Clone)]
pub struct NewHostelRequest {
    pub student_id: PrimaryKey,
    pub hostel_id: PrimaryKey,
    pub room_type: RoomType,
    pub ac_preference: AcPreference,
    pub gender: Gender,
    pub year: StudyYear,
    pub floor_preference: Option<i32>,
}

/// Binds the student of a request to a concrete room
#[derive(Debug, Clone)]
pub struct Placement {
    pub request_id: PrimaryKey,
    pub room_id: PrimaryKey,
    pub approver_id: PrimaryKey,
    pub remarks: Option<String>,
}

/// Who decided a request or application, and why
#[derive(Debug, Clone)]
pub struct Verdict {
    pub id: PrimaryKey,
    pub approver_id: PrimaryKey,
    pub remarks: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewMessApplication {
    pub student_id: PrimaryKey,
    pub hostel_id: PrimaryKey,
    pub mess_id: PrimaryKey,
    pub food_preference: FoodPreference,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub student_id: PrimaryKey,
    pub menu_item: Option<String>,
    pub rating: Rating,
    pub comments: Option<String>,
}
