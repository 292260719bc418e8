use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json,
};
use shams_collab::{HostelDecision, HostelPreferences};
use shams_core::Decision;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ErrorBody, ServerError, ServerResult},
    schemas::{HostelDecisionSchema, NewHostelRequestSchema, StatusParams, ValidatedJson},
    serialized::{HostelRequest, Room, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/requests",
    tag = "requests",
    params(StatusParams),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The requests visible to the user", body = Vec<HostelRequest>)
    )
)]
pub(crate) async fn list_requests(
    session: Session,
    State(context): State<ServerContext>,
    Query(params): Query<StatusParams>,
) -> ServerResult<Json<Vec<HostelRequest>>> {
    let requests = context
        .collab
        .allocation
        .list_hostel_requests(&session.user, params.status)
        .await?;

    Ok(Json(requests.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/requests",
    tag = "requests",
    request_body = NewHostelRequestSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The request is pending", body = HostelRequest),
        (status = 403, description = "Only students submit requests", body = ErrorBody)
    )
)]
pub(crate) async fn submit_request(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewHostelRequestSchema>,
) -> ServerResult<Json<HostelRequest>> {
    let request = context
        .collab
        .allocation
        .submit_hostel_request(
            &session.user,
            HostelPreferences {
                hostel_id: body.hostel_id,
                room_type: body.room_type,
                ac_preference: body.ac_preference,
                gender: body.gender,
                year: body.year,
                floor_preference: body.floor_preference,
            },
        )
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/requests/{id}",
    tag = "requests",
    params(("id" = i32, Path, description = "Request id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = HostelRequest),
        (status = 404, body = ErrorBody)
    )
)]
pub(crate) async fn request(
    session: Session,
    State(context): State<ServerContext>,
    Path(request_id): Path<i32>,
) -> ServerResult<Json<HostelRequest>> {
    let request = context
        .collab
        .allocation
        .hostel_request(&session.user, request_id)
        .await?;

    Ok(Json(request.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/requests/{id}/rooms",
    tag = "requests",
    params(("id" = i32, Path, description = "Request id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Rooms matching the request's preferences with a free bed", body = Vec<Room>)
    )
)]
pub(crate) async fn rooms_for_request(
    session: Session,
    State(context): State<ServerContext>,
    Path(request_id): Path<i32>,
) -> ServerResult<Json<Vec<Room>>> {
    let rooms = context
        .collab
        .allocation
        .rooms_for_request(&session.user, request_id)
        .await?;

    Ok(Json(rooms.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/requests/{id}/decision",
    tag = "requests",
    params(("id" = i32, Path, description = "Request id")),
    request_body = HostelDecisionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The decided request", body = HostelRequest),
        (status = 409, description = "The room filled up, does not fit the student, or the request was already decided", body = ErrorBody)
    )
)]
pub(crate) async fn decide_request(
    session: Session,
    State(context): State<ServerContext>,
    Path(request_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<HostelDecisionSchema>,
) -> ServerResult<Json<HostelRequest>> {
    let decision = hostel_decision(body)?;

    let request = context
        .collab
        .allocation
        .decide_hostel_request(&session.user, request_id, decision)
        .await?;

    Ok(Json(request.to_serialized()))
}

fn hostel_decision(body: HostelDecisionSchema) -> ServerResult<HostelDecision> {
    match body.decision {
        Decision::Approved => {
            let room_id = body.room_id.ok_or_else(|| {
                ServerError::Validation("approving a request requires a roomId".to_string())
            })?;

            Ok(HostelDecision::Approve {
                room_id,
                remarks: body.remarks,
            })
        }
        Decision::Rejected => Ok(HostelDecision::Reject {
            remarks: body.remarks,
        }),
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_requests).post(submit_request))
        .route("/:id", get(request))
        .route("/:id/rooms", get(rooms_for_request))
        .route("/:id/decision", post(decide_request))
}

#[cfg(test)]
mod test {
    use shams_collab::HostelDecision;
    use shams_core::Decision;

    use super::hostel_decision;
    use crate::{errors::ServerError, schemas::HostelDecisionSchema};

    #[test]
    fn approving_needs_a_room() {
        let body = HostelDecisionSchema {
            decision: Decision::Approved,
            room_id: None,
            remarks: None,
        };

        assert!(matches!(
            hostel_decision(body),
            Err(ServerError::Validation(_))
        ));
    }

    #[test]
    fn rejecting_ignores_the_room() {
        let body = HostelDecisionSchema {
            decision: Decision::Rejected,
            room_id: Some(4),
            remarks: Some("No vacancy on the requested floor".to_string()),
        };

        assert!(matches!(
            hostel_decision(body),
            Ok(HostelDecision::Reject { remarks: Some(_) })
        ));
    }
}
