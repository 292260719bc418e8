use chrono::{DateTime, Utc};
use shams_core::{
    AcPreference, FoodPreference, Gender, HostelGender, MaintenanceStatus, MenuType, Occupancy,
    Rating, RequestStatus, Role, RoomType, StudyYear,
};

/// The type used for primary keys in the database.
pub type PrimaryKey = i32;

/// A SHAMS account
#[derive(Debug, Clone)]
pub struct UserData {
    pub id: PrimaryKey,
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub role: Role,
    /// Only students carry a gender, it is matched against rooms
    pub gender: Option<Gender>,
    /// The identifier printed on the student's hostel card
    pub hostel_identifier: Option<String>,
    /// The room a student is placed in
    pub room_id: Option<PrimaryKey>,
    /// The mess a student eats at
    pub mess_id: Option<PrimaryKey>,
    /// The hostel a warden is responsible for
    pub assigned_hostel_id: Option<PrimaryKey>,
    /// Narrows a warden down to one floor of their hostel
    pub assigned_floor: Option<i32>,
}

/// Login session data for authentication
#[derive(Debug, Clone)]
pub struct SessionData {
    pub id: PrimaryKey,
    /// The session token, or key if you will
    pub token: String,
    pub expires_at: DateTime<Utc>,
    /// The user that is logged in
    pub user: UserData,
}

/// A hostel block, the owner of rooms and messes
#[derive(Debug, Clone)]
pub struct HostelData {
    pub id: PrimaryKey,
    /// Unique across the system
    pub name: String,
    pub block: String,
    pub gender: HostelGender,
    pub total_rooms: i32,
    pub total_capacity: i32,
    pub active: bool,
    pub facilities: Vec<String>,
    pub address: String,
}

#[derive(Debug, Clone)]
pub struct RoomData {
    pub id: PrimaryKey,
    pub hostel_id: PrimaryKey,
    pub floor: i32,
    /// Unique within the hostel and floor
    pub room_number: String,
    pub room_type: RoomType,
    /// Beds, starts at the room type's capacity but may be edited
    pub capacity: i32,
    pub gender: Gender,
    pub has_ac: bool,
    pub fee_per_year: i64,
    pub facilities: Vec<String>,
    pub maintenance: MaintenanceStatus,
    /// Students in the room, in the order they were placed
    pub occupants: Vec<PrimaryKey>,
    pub warden_id: Option<PrimaryKey>,
}

impl RoomData {
    pub fn occupancy(&self) -> Occupancy {
        Occupancy::new(self.capacity, self.occupants.len())
    }
}

#[derive(Debug, Clone)]
pub struct MessData {
    pub id: PrimaryKey,
    pub hostel_id: PrimaryKey,
    pub name: String,
    /// Students the mess can serve
    pub capacity: i32,
    pub menu_type: MenuType,
    pub facilities: Vec<String>,
    pub active: bool,
}

/// A student's ask for a place in a hostel
#[derive(Debug, Clone)]
pub struct HostelRequestData {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub hostel_id: PrimaryKey,
    pub room_type: RoomType,
    pub ac_preference: AcPreference,
    pub gender: Gender,
    pub year: StudyYear,
    pub floor_preference: Option<i32>,
    pub status: RequestStatus,
    /// Set once the request is approved
    pub assigned_room_id: Option<PrimaryKey>,
    pub approver_id: Option<PrimaryKey>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct MessApplicationData {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub hostel_id: PrimaryKey,
    pub mess_id: PrimaryKey,
    pub food_preference: FoodPreference,
    pub status: RequestStatus,
    pub approver_id: Option<PrimaryKey>,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

/// A rating a student left for the mess. Never edited after creation.
#[derive(Debug, Clone)]
pub struct MessFeedbackData {
    pub id: PrimaryKey,
    pub student_id: PrimaryKey,
    pub menu_item: Option<String>,
    pub rating: Rating,
    pub comments: Option<String>,
    pub created_at: DateTime<Utc>,
}
