//! Request bodies and query strings accepted by the endpoints

use axum::{
    async_trait,
    extract::{FromRequest, Request},
    Json,
};
use serde::{de::DeserializeOwned, Deserialize};
use shams_core::{
    AcPreference, Decision, FoodPreference, Gender, HostelGender, MaintenanceStatus, MenuType,
    RequestStatus, RoomType,
};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::errors::ServerError;

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct LoginSchema {
    #[validate(length(max = 128))]
    pub username: String,
    #[validate(length(max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AccountSchema {
    #[validate(length(min = 2, max = 128))]
    pub display_name: String,
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct RegisterSchema {
    #[validate(length(min = 2, max = 128))]
    pub display_name: String,
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    #[schema(value_type = String, example = "female")]
    pub gender: Gender,
    #[validate(length(min = 1, max = 64))]
    pub hostel_identifier: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewWardenSchema {
    #[validate(length(min = 2, max = 128))]
    pub display_name: String,
    #[validate(length(min = 2, max = 128))]
    pub username: String,
    #[validate(length(min = 8, max = 64))]
    pub password: String,
    pub assigned_hostel_id: i32,
    #[validate(range(min = 0, max = 200))]
    pub assigned_floor: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewHostelSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(length(min = 1, max = 128))]
    pub block: String,
    #[schema(value_type = String, example = "coed")]
    pub gender: HostelGender,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub total_rooms: i32,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub total_capacity: i32,
    #[serde(default)]
    pub facilities: Vec<String>,
    #[validate(length(min = 1, max = 512))]
    pub address: String,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateHostelSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 128))]
    pub block: Option<String>,
    #[validate(range(min = 0))]
    pub total_rooms: Option<i32>,
    #[validate(range(min = 0))]
    pub total_capacity: Option<i32>,
    pub active: Option<bool>,
    pub facilities: Option<Vec<String>>,
    #[validate(length(min = 1, max = 512))]
    pub address: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewRoomSchema {
    #[validate(range(min = 0, max = 200))]
    pub floor: i32,
    #[validate(length(min = 1, max = 16))]
    pub room_number: String,
    #[schema(value_type = String, example = "double")]
    pub room_type: RoomType,
    /// Defaults to the number of beds of the room type
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    #[schema(value_type = String, example = "male")]
    pub gender: Gender,
    #[serde(default)]
    pub has_ac: bool,
    #[validate(range(min = 0))]
    pub fee_per_year: i64,
    #[serde(default)]
    pub facilities: Vec<String>,
    pub warden_id: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateRoomSchema {
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    pub has_ac: Option<bool>,
    #[validate(range(min = 0))]
    pub fee_per_year: Option<i64>,
    pub facilities: Option<Vec<String>>,
    #[schema(value_type = Option<String>, example = "needs_repair")]
    pub maintenance: Option<MaintenanceStatus>,
    pub warden_id: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMessSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: String,
    #[validate(range(min = 1))]
    pub capacity: i32,
    #[schema(value_type = String, example = "both")]
    pub menu_type: MenuType,
    #[serde(default)]
    pub facilities: Vec<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateMessSchema {
    #[validate(length(min = 1, max = 128))]
    pub name: Option<String>,
    #[validate(range(min = 1))]
    pub capacity: Option<i32>,
    #[schema(value_type = Option<String>, example = "veg")]
    pub menu_type: Option<MenuType>,
    pub facilities: Option<Vec<String>>,
    pub active: Option<bool>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewHostelRequestSchema {
    pub hostel_id: i32,
    #[schema(value_type = String, example = "double")]
    pub room_type: RoomType,
    #[schema(value_type = String, example = "non-ac")]
    pub ac_preference: AcPreference,
    #[schema(value_type = String, example = "male")]
    pub gender: Gender,
    #[validate(range(min = 1, max = 5))]
    pub year: i32,
    #[validate(range(min = 0, max = 200))]
    pub floor_preference: Option<i32>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct HostelDecisionSchema {
    #[schema(value_type = String, example = "approved")]
    pub decision: Decision,
    /// Required when approving
    pub room_id: Option<i32>,
    #[validate(length(min = 1, max = 512))]
    pub remarks: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewMessApplicationSchema {
    pub hostel_id: i32,
    pub mess_id: i32,
    #[schema(value_type = String, example = "veg")]
    pub food_preference: FoodPreference,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct MessDecisionSchema {
    #[schema(value_type = String, example = "rejected")]
    pub decision: Decision,
    #[validate(length(min = 1, max = 512))]
    pub remarks: Option<String>,
}

#[derive(Debug, ToSchema, Validate, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NewFeedbackSchema {
    #[validate(length(min = 1, max = 128))]
    pub menu_item: Option<String>,
    #[validate(range(min = 1, max = 5))]
    pub rating: i32,
    #[validate(length(max = 1000))]
    pub comments: Option<String>,
}

/// Filters `GET /v1/rooms/available`
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct AvailabilityParams {
    pub hostel_id: Option<i32>,
    #[param(value_type = Option<String>, example = "double")]
    pub room_type: Option<RoomType>,
    #[param(value_type = Option<String>, example = "ac")]
    pub ac_preference: Option<AcPreference>,
    #[param(value_type = Option<String>, example = "female")]
    pub gender: Option<Gender>,
}

/// Filters request and application listings
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StatusParams {
    #[param(value_type = Option<String>, example = "pending")]
    pub status: Option<RequestStatus>,
}

/// Like [Json], but the body is validated before the handler runs
pub struct ValidatedJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ServerError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ServerError::Validation(e.body_text()))?;

        body.validate()
            .map_err(|e| ServerError::Validation(e.to_string()))?;

        Ok(Self(body))
    }
}

#[cfg(test)]
mod test {
    use validator::Validate;

    use super::{
        HostelDecisionSchema, MessDecisionSchema, NewFeedbackSchema, NewHostelRequestSchema,
    };

    #[test]
    fn ratings_are_bounded() {
        for (rating, valid) in [(0, false), (1, true), (5, true), (6, false)] {
            let body: NewFeedbackSchema =
                serde_json::from_str(&format!(r#"{{"rating": {rating}}}"#)).unwrap();

            assert_eq!(body.validate().is_ok(), valid, "rating {rating}");
        }
    }

    #[test]
    fn empty_remarks_are_refused() {
        let body: HostelDecisionSchema =
            serde_json::from_str(r#"{"decision": "rejected", "remarks": ""}"#).unwrap();
        assert!(body.validate().is_err());

        let body: MessDecisionSchema =
            serde_json::from_str(r#"{"decision": "rejected", "remarks": ""}"#).unwrap();
        assert!(body.validate().is_err());

        let body: MessDecisionSchema =
            serde_json::from_str(r#"{"decision": "approved"}"#).unwrap();
        assert!(body.validate().is_ok());

        let body: HostelDecisionSchema =
            serde_json::from_str(r#"{"decision": "approved", "roomId": 4, "remarks": "ok"}"#)
                .unwrap();
        assert!(body.validate().is_ok());
    }

    #[test]
    fn request_bodies_use_wire_spellings() {
        let body: NewHostelRequestSchema = serde_json::from_str(
            r#"{
                "hostelId": 1,
                "roomType": "triple",
                "acPreference": "non-ac",
                "gender": "female",
                "year": 3
            }"#,
        )
        .unwrap();

        assert!(body.validate().is_ok());
        assert_eq!(body.ac_preference.as_str(), "non-ac");
        assert_eq!(body.floor_preference, None);
    }

    #[test]
    fn unknown_kinds_are_refused() {
        let result = serde_json::from_str::<NewHostelRequestSchema>(
            r#"{"hostelId": 1, "roomType": "suite", "acPreference": "ac", "gender": "male", "year": 1}"#,
        );

        assert!(result.is_err());
    }
}
