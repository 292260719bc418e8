use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json,
};
use shams_collab::{AvailabilityQuery, RoomChanges};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ErrorBody, ServerResult},
    schemas::{AvailabilityParams, UpdateRoomSchema, ValidatedJson},
    serialized::{Room, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/rooms/available",
    tag = "rooms",
    params(AvailabilityParams),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Rooms with at least one free bed, by floor then room number", body = Vec<Room>)
    )
)]
pub(crate) async fn available_rooms(
    _session: Session,
    State(context): State<ServerContext>,
    Query(params): Query<AvailabilityParams>,
) -> ServerResult<Json<Vec<Room>>> {
    let rooms = context
        .collab
        .allocation
        .list_available_rooms(AvailabilityQuery {
            hostel_id: params.hostel_id,
            room_type: params.room_type,
            ac_preference: params.ac_preference,
            gender: params.gender,
        })
        .await?;

    Ok(Json(rooms.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/rooms/{id}",
    tag = "rooms",
    params(("id" = i32, Path, description = "Room id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room),
        (status = 404, body = ErrorBody)
    )
)]
pub(crate) async fn room(
    _session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
) -> ServerResult<Json<Room>> {
    let room = context.collab.hostels.room(room_id).await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/rooms/{id}",
    tag = "rooms",
    params(("id" = i32, Path, description = "Room id")),
    request_body = UpdateRoomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room),
        (status = 400, description = "Capacity below the current occupancy", body = ErrorBody)
    )
)]
pub(crate) async fn update_room(
    session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateRoomSchema>,
) -> ServerResult<Json<Room>> {
    let room = context
        .collab
        .hostels
        .update_room(
            &session.user,
            room_id,
            RoomChanges {
                capacity: body.capacity,
                has_ac: body.has_ac,
                fee_per_year: body.fee_per_year,
                facilities: body.facilities,
                maintenance: body.maintenance,
                warden_id: body.warden_id,
            },
        )
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/rooms/{id}",
    tag = "rooms",
    params(("id" = i32, Path, description = "Room id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The room was deleted"),
        (status = 409, description = "Students still live in the room", body = ErrorBody)
    )
)]
pub(crate) async fn delete_room(
    session: Session,
    State(context): State<ServerContext>,
    Path(room_id): Path<i32>,
) -> ServerResult<()> {
    context
        .collab
        .hostels
        .delete_room(&session.user, room_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/rooms/release/{student_id}",
    tag = "rooms",
    params(("student_id" = i32, Path, description = "The student leaving their room")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The room the student left", body = Room)
    )
)]
pub(crate) async fn release_student(
    session: Session,
    State(context): State<ServerContext>,
    Path(student_id): Path<i32>,
) -> ServerResult<Json<Room>> {
    let room = context
        .collab
        .allocation
        .release_student(&session.user, student_id)
        .await?;

    Ok(Json(room.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/available", get(available_rooms))
        .route("/release/:student_id", post(release_student))
        .route("/:id", get(room).patch(update_room).delete(delete_room))
}
