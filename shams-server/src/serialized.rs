//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, Utc};
use serde::Serialize;
use shams_collab::{
    FeedbackSummary as CollabFeedbackSummary, HostelData, HostelRequestData, MessApplicationData,
    MessData, MessFeedbackData, RoomData, SessionData, UserData,
};
use shams_core::{
    AcPreference, FoodPreference, Gender, HostelGender, MaintenanceStatus, MenuType,
    RequestStatus, Role, RoomType,
};
use utoipa::ToSchema;

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: i32,
    username: String,
    display_name: String,
    #[schema(value_type = String, example = "student")]
    role: Role,
    #[schema(value_type = Option<String>)]
    gender: Option<Gender>,
    hostel_identifier: Option<String>,
    room_id: Option<i32>,
    mess_id: Option<i32>,
    assigned_hostel_id: Option<i32>,
    assigned_floor: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LoginResult {
    token: String,
    expires_at: DateTime<Utc>,
    user: User,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Hostel {
    id: i32,
    name: String,
    block: String,
    #[schema(value_type = String, example = "coed")]
    gender: HostelGender,
    total_rooms: i32,
    total_capacity: i32,
    active: bool,
    facilities: Vec<String>,
    address: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    id: i32,
    hostel_id: i32,
    floor: i32,
    room_number: String,
    #[schema(value_type = String, example = "double")]
    room_type: RoomType,
    capacity: i32,
    occupied: i32,
    vacancy: i32,
    #[schema(value_type = String, example = "male")]
    gender: Gender,
    has_ac: bool,
    fee_per_year: i64,
    facilities: Vec<String>,
    #[schema(value_type = String, example = "good")]
    maintenance: MaintenanceStatus,
    occupants: Vec<i32>,
    warden_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Mess {
    id: i32,
    hostel_id: i32,
    name: String,
    capacity: i32,
    #[schema(value_type = String, example = "both")]
    menu_type: MenuType,
    facilities: Vec<String>,
    active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HostelRequest {
    id: i32,
    student_id: i32,
    hostel_id: i32,
    #[schema(value_type = String, example = "double")]
    room_type: RoomType,
    #[schema(value_type = String, example = "ac")]
    ac_preference: AcPreference,
    #[schema(value_type = String, example = "male")]
    gender: Gender,
    year: i32,
    floor_preference: Option<i32>,
    #[schema(value_type = String, example = "pending")]
    status: RequestStatus,
    assigned_room_id: Option<i32>,
    approver_id: Option<i32>,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MessApplication {
    id: i32,
    student_id: i32,
    hostel_id: i32,
    mess_id: i32,
    #[schema(value_type = String, example = "veg")]
    food_preference: FoodPreference,
    #[schema(value_type = String, example = "approved")]
    status: RequestStatus,
    approver_id: Option<i32>,
    remarks: Option<String>,
    created_at: DateTime<Utc>,
    decided_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    id: i32,
    student_id: i32,
    menu_item: Option<String>,
    rating: i32,
    comments: Option<String>,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSummary {
    count: usize,
    average: Option<f64>,
    /// Ratings per star, the first entry counts one star ratings
    distribution: Vec<u32>,
    items: Vec<ItemRating>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ItemRating {
    menu_item: String,
    count: usize,
    average: f64,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<User> for UserData {
    fn to_serialized(&self) -> User {
        User {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            role: self.role,
            gender: self.gender,
            hostel_identifier: self.hostel_identifier.clone(),
            room_id: self.room_id,
            mess_id: self.mess_id,
            assigned_hostel_id: self.assigned_hostel_id,
            assigned_floor: self.assigned_floor,
        }
    }
}

impl ToSerialized<LoginResult> for SessionData {
    fn to_serialized(&self) -> LoginResult {
        LoginResult {
            token: self.token.clone(),
            expires_at: self.expires_at,
            user: self.user.to_serialized(),
        }
    }
}

impl ToSerialized<Hostel> for HostelData {
    fn to_serialized(&self) -> Hostel {
        Hostel {
            id: self.id,
            name: self.name.clone(),
            block: self.block.clone(),
            gender: self.gender,
            total_rooms: self.total_rooms,
            total_capacity: self.total_capacity,
            active: self.active,
            facilities: self.facilities.clone(),
            address: self.address.clone(),
        }
    }
}

impl ToSerialized<Room> for RoomData {
    fn to_serialized(&self) -> Room {
        let occupancy = self.occupancy();

        Room {
            id: self.id,
            hostel_id: self.hostel_id,
            floor: self.floor,
            room_number: self.room_number.clone(),
            room_type: self.room_type,
            capacity: self.capacity,
            occupied: occupancy.occupied,
            vacancy: occupancy.vacancy(),
            gender: self.gender,
            has_ac: self.has_ac,
            fee_per_year: self.fee_per_year,
            facilities: self.facilities.clone(),
            maintenance: self.maintenance,
            occupants: self.occupants.clone(),
            warden_id: self.warden_id,
        }
    }
}

impl ToSerialized<Mess> for MessData {
    fn to_serialized(&self) -> Mess {
        Mess {
            id: self.id,
            hostel_id: self.hostel_id,
            name: self.name.clone(),
            capacity: self.capacity,
            menu_type: self.menu_type,
            facilities: self.facilities.clone(),
            active: self.active,
        }
    }
}

impl ToSerialized<HostelRequest> for HostelRequestData {
    fn to_serialized(&self) -> HostelRequest {
        HostelRequest {
            id: self.id,
            student_id: self.student_id,
            hostel_id: self.hostel_id,
            room_type: self.room_type,
            ac_preference: self.ac_preference,
            gender: self.gender,
            year: self.year.value(),
            floor_preference: self.floor_preference,
            status: self.status,
            assigned_room_id: self.assigned_room_id,
            approver_id: self.approver_id,
            remarks: self.remarks.clone(),
            created_at: self.created_at,
            decided_at: self.decided_at,
        }
    }
}

impl ToSerialized<MessApplication> for MessApplicationData {
    fn to_serialized(&self) -> MessApplication {
        MessApplication {
            id: self.id,
            student_id: self.student_id,
            hostel_id: self.hostel_id,
            mess_id: self.mess_id,
            food_preference: self.food_preference,
            status: self.status,
            approver_id: self.approver_id,
            remarks: self.remarks.clone(),
            created_at: self.created_at,
            decided_at: self.decided_at,
        }
    }
}

impl ToSerialized<Feedback> for MessFeedbackData {
    fn to_serialized(&self) -> Feedback {
        Feedback {
            id: self.id,
            student_id: self.student_id,
            menu_item: self.menu_item.clone(),
            rating: self.rating.value(),
            comments: self.comments.clone(),
            created_at: self.created_at,
        }
    }
}

impl ToSerialized<FeedbackSummary> for CollabFeedbackSummary {
    fn to_serialized(&self) -> FeedbackSummary {
        FeedbackSummary {
            count: self.count,
            average: self.average,
            distribution: self.distribution.to_vec(),
            items: self
                .items
                .iter()
                .map(|item| ItemRating {
                    menu_item: item.menu_item.clone(),
                    count: item.count,
                    average: item.average,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use shams_collab::RoomData;
    use shams_core::{Gender, MaintenanceStatus, RoomType};

    use super::ToSerialized;

    #[test]
    fn rooms_expose_their_vacancy() {
        let room = RoomData {
            id: 4,
            hostel_id: 1,
            floor: 1,
            room_number: "A-101".to_string(),
            room_type: RoomType::Triple,
            capacity: 3,
            gender: Gender::Male,
            has_ac: false,
            fee_per_year: 45_000,
            facilities: vec![],
            maintenance: MaintenanceStatus::Good,
            occupants: vec![10, 11],
            warden_id: None,
        };

        let json = serde_json::to_value(room.to_serialized()).unwrap();

        assert_eq!(json["occupied"], 2);
        assert_eq!(json["vacancy"], 1);
        assert_eq!(json["roomType"], "triple");
        assert_eq!(json["maintenance"], "good");
    }
}
