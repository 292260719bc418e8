use axum::{
    extract::{Path, State},
    routing::get,
    Json,
};
use shams_collab::{NewHostel, NewMess, RoomDraft, UpdatedHostel};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ErrorBody, ServerResult},
    schemas::{NewHostelSchema, NewMessSchema, NewRoomSchema, UpdateHostelSchema, ValidatedJson},
    serialized::{Hostel, Mess, Room, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/hostels",
    tag = "hostels",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Hostel>)
    )
)]
pub(crate) async fn list_hostels(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Hostel>>> {
    let hostels = context.collab.hostels.list_hostels().await?;

    Ok(Json(hostels.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/hostels/{id}",
    tag = "hostels",
    params(("id" = i32, Path, description = "Hostel id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Hostel),
        (status = 404, body = ErrorBody)
    )
)]
pub(crate) async fn hostel(
    _session: Session,
    State(context): State<ServerContext>,
    Path(hostel_id): Path<i32>,
) -> ServerResult<Json<Hostel>> {
    let hostel = context.collab.hostels.hostel(hostel_id).await?;

    Ok(Json(hostel.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/hostels",
    tag = "hostels",
    request_body = NewHostelSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Hostel),
        (status = 409, description = "The name is taken", body = ErrorBody)
    )
)]
pub(crate) async fn create_hostel(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewHostelSchema>,
) -> ServerResult<Json<Hostel>> {
    let hostel = context
        .collab
        .hostels
        .create_hostel(
            &session.user,
            NewHostel {
                name: body.name,
                block: body.block,
                gender: body.gender,
                total_rooms: body.total_rooms,
                total_capacity: body.total_capacity,
                facilities: body.facilities,
                address: body.address,
            },
        )
        .await?;

    Ok(Json(hostel.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/hostels/{id}",
    tag = "hostels",
    params(("id" = i32, Path, description = "Hostel id")),
    request_body = UpdateHostelSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Hostel)
    )
)]
pub(crate) async fn update_hostel(
    session: Session,
    State(context): State<ServerContext>,
    Path(hostel_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateHostelSchema>,
) -> ServerResult<Json<Hostel>> {
    let hostel = context
        .collab
        .hostels
        .update_hostel(
            &session.user,
            UpdatedHostel {
                id: hostel_id,
                name: body.name,
                block: body.block,
                total_rooms: body.total_rooms,
                total_capacity: body.total_capacity,
                active: body.active,
                facilities: body.facilities,
                address: body.address,
            },
        )
        .await?;

    Ok(Json(hostel.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/hostels/{id}",
    tag = "hostels",
    params(("id" = i32, Path, description = "Hostel id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The hostel was deleted"),
        (status = 409, description = "Rooms, messes, requests, or wardens still point at it", body = ErrorBody)
    )
)]
pub(crate) async fn delete_hostel(
    session: Session,
    State(context): State<ServerContext>,
    Path(hostel_id): Path<i32>,
) -> ServerResult<()> {
    context
        .collab
        .hostels
        .delete_hostel(&session.user, hostel_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/hostels/{id}/rooms",
    tag = "rooms",
    params(("id" = i32, Path, description = "Hostel id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "Rooms by floor, then room number", body = Vec<Room>)
    )
)]
pub(crate) async fn list_rooms(
    _session: Session,
    State(context): State<ServerContext>,
    Path(hostel_id): Path<i32>,
) -> ServerResult<Json<Vec<Room>>> {
    let rooms = context.collab.hostels.list_rooms(hostel_id).await?;

    Ok(Json(rooms.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/hostels/{id}/rooms",
    tag = "rooms",
    params(("id" = i32, Path, description = "Hostel id")),
    request_body = NewRoomSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Room),
        (status = 409, description = "Room number taken, or gender not admitted by the hostel", body = ErrorBody)
    )
)]
pub(crate) async fn create_room(
    session: Session,
    State(context): State<ServerContext>,
    Path(hostel_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<NewRoomSchema>,
) -> ServerResult<Json<Room>> {
    let room = context
        .collab
        .hostels
        .create_room(
            &session.user,
            RoomDraft {
                hostel_id,
                floor: body.floor,
                room_number: body.room_number,
                room_type: body.room_type,
                capacity: body.capacity,
                gender: body.gender,
                has_ac: body.has_ac,
                fee_per_year: body.fee_per_year,
                facilities: body.facilities,
                warden_id: body.warden_id,
            },
        )
        .await?;

    Ok(Json(room.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/hostels/{id}/messes",
    tag = "messes",
    params(("id" = i32, Path, description = "Hostel id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Vec<Mess>)
    )
)]
pub(crate) async fn list_messes(
    _session: Session,
    State(context): State<ServerContext>,
    Path(hostel_id): Path<i32>,
) -> ServerResult<Json<Vec<Mess>>> {
    let messes = context.collab.hostels.list_messes(hostel_id).await?;

    Ok(Json(messes.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/hostels/{id}/messes",
    tag = "messes",
    params(("id" = i32, Path, description = "Hostel id")),
    request_body = NewMessSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Mess)
    )
)]
pub(crate) async fn create_mess(
    session: Session,
    State(context): State<ServerContext>,
    Path(hostel_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<NewMessSchema>,
) -> ServerResult<Json<Mess>> {
    let mess = context
        .collab
        .hostels
        .create_mess(
            &session.user,
            NewMess {
                hostel_id,
                name: body.name,
                capacity: body.capacity,
                menu_type: body.menu_type,
                facilities: body.facilities,
            },
        )
        .await?;

    Ok(Json(mess.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_hostels).post(create_hostel))
        .route(
            "/:id",
            get(hostel).patch(update_hostel).delete(delete_hostel),
        )
        .route("/:id/rooms", get(list_rooms).post(create_room))
        .route("/:id/messes", get(list_messes).post(create_mess))
}
