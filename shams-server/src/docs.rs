use axum::{response::IntoResponse, Json};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};

use crate::{auth, errors, feedback, hostels, mess, requests, rooms, schemas, serialized, sse};

#[derive(OpenApi)]
#[openapi(
    paths(
        auth::login,
        auth::logout,
        auth::register,
        auth::register_admin,
        auth::create_warden,
        auth::user,
        hostels::list_hostels,
        hostels::hostel,
        hostels::create_hostel,
        hostels::update_hostel,
        hostels::delete_hostel,
        hostels::list_rooms,
        hostels::create_room,
        hostels::list_messes,
        hostels::create_mess,
        rooms::available_rooms,
        rooms::room,
        rooms::update_room,
        rooms::delete_room,
        rooms::release_student,
        requests::list_requests,
        requests::submit_request,
        requests::request,
        requests::rooms_for_request,
        requests::decide_request,
        mess::mess,
        mess::update_mess,
        mess::delete_mess,
        mess::list_applications,
        mess::submit_application,
        mess::application,
        mess::decide_application,
        feedback::submit_feedback,
        feedback::list_feedback,
        feedback::summary,
        sse::event_stream,
    ),
    components(schemas(
        errors::ErrorBody,
        schemas::LoginSchema,
        schemas::AccountSchema,
        schemas::RegisterSchema,
        schemas::NewWardenSchema,
        schemas::NewHostelSchema,
        schemas::UpdateHostelSchema,
        schemas::NewRoomSchema,
        schemas::UpdateRoomSchema,
        schemas::NewMessSchema,
        schemas::UpdateMessSchema,
        schemas::NewHostelRequestSchema,
        schemas::HostelDecisionSchema,
        schemas::NewMessApplicationSchema,
        schemas::MessDecisionSchema,
        schemas::NewFeedbackSchema,
        serialized::User,
        serialized::LoginResult,
        serialized::Hostel,
        serialized::Room,
        serialized::Mess,
        serialized::HostelRequest,
        serialized::MessApplication,
        serialized::Feedback,
        serialized::FeedbackSummary,
        serialized::ItemRating,
        sse::ServerEvent,
    )),
    modifiers(&Security),
    info(
        title = "SHAMS API",
        description = "shams-server exposes hostel allocation, mess, and feedback endpoints"
    )
)]
pub struct ApiDoc;

struct Security;

impl Modify for Security {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            let scheme = HttpBuilder::new()
                .scheme(HttpAuthScheme::Bearer)
                .bearer_format("Bearer <token>")
                .build();

            components.add_security_scheme("BearerAuth", SecurityScheme::Http(scheme))
        }
    }
}

pub async fn docs() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod test {
    use utoipa::OpenApi;

    use super::ApiDoc;

    #[test]
    fn every_route_is_documented() {
        let api = ApiDoc::openapi();

        for path in [
            "/v1/auth/login",
            "/v1/hostels/{id}/rooms",
            "/v1/rooms/available",
            "/v1/requests/{id}/decision",
            "/v1/mess-applications/{id}/decision",
            "/v1/feedback/summary",
            "/v1/events",
        ] {
            assert!(api.paths.paths.contains_key(path), "{path} is missing");
        }
    }

    #[test]
    fn bearer_auth_is_declared() {
        let api = ApiDoc::openapi();
        let components = api.components.expect("components are generated");

        assert!(components.security_schemes.contains_key("BearerAuth"));
    }
}
