use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json,
};
use shams_collab::{MessPreferences, UpdatedMess};

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ErrorBody, ServerResult},
    schemas::{
        MessDecisionSchema, NewMessApplicationSchema, StatusParams, UpdateMessSchema,
        ValidatedJson,
    },
    serialized::{Mess, MessApplication, ToSerialized},
    Router,
};

#[utoipa::path(
    get,
    path = "/v1/messes/{id}",
    tag = "messes",
    params(("id" = i32, Path, description = "Mess id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Mess),
        (status = 404, body = ErrorBody)
    )
)]
pub(crate) async fn mess(
    _session: Session,
    State(context): State<ServerContext>,
    Path(mess_id): Path<i32>,
) -> ServerResult<Json<Mess>> {
    let mess = context.collab.hostels.mess(mess_id).await?;

    Ok(Json(mess.to_serialized()))
}

#[utoipa::path(
    patch,
    path = "/v1/messes/{id}",
    tag = "messes",
    params(("id" = i32, Path, description = "Mess id")),
    request_body = UpdateMessSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Mess)
    )
)]
pub(crate) async fn update_mess(
    session: Session,
    State(context): State<ServerContext>,
    Path(mess_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<UpdateMessSchema>,
) -> ServerResult<Json<Mess>> {
    let mess = context
        .collab
        .hostels
        .update_mess(
            &session.user,
            UpdatedMess {
                id: mess_id,
                name: body.name,
                capacity: body.capacity,
                menu_type: body.menu_type,
                facilities: body.facilities,
                active: body.active,
            },
        )
        .await?;

    Ok(Json(mess.to_serialized()))
}

#[utoipa::path(
    delete,
    path = "/v1/messes/{id}",
    tag = "messes",
    params(("id" = i32, Path, description = "Mess id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The mess was deleted"),
        (status = 409, description = "Students or applications still point at it", body = ErrorBody)
    )
)]
pub(crate) async fn delete_mess(
    session: Session,
    State(context): State<ServerContext>,
    Path(mess_id): Path<i32>,
) -> ServerResult<()> {
    context
        .collab
        .hostels
        .delete_mess(&session.user, mess_id)
        .await?;

    Ok(())
}

#[utoipa::path(
    get,
    path = "/v1/mess-applications",
    tag = "mess applications",
    params(StatusParams),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The applications visible to the user", body = Vec<MessApplication>)
    )
)]
pub(crate) async fn list_applications(
    session: Session,
    State(context): State<ServerContext>,
    Query(params): Query<StatusParams>,
) -> ServerResult<Json<Vec<MessApplication>>> {
    let applications = context
        .collab
        .mess
        .list_mess_applications(&session.user, params.status)
        .await?;

    Ok(Json(applications.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/mess-applications",
    tag = "mess applications",
    request_body = NewMessApplicationSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The application is pending", body = MessApplication),
        (status = 409, description = "The mess does not serve the hostel", body = ErrorBody)
    )
)]
pub(crate) async fn submit_application(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewMessApplicationSchema>,
) -> ServerResult<Json<MessApplication>> {
    let application = context
        .collab
        .mess
        .submit_mess_application(
            &session.user,
            MessPreferences {
                hostel_id: body.hostel_id,
                mess_id: body.mess_id,
                food_preference: body.food_preference,
            },
        )
        .await?;

    Ok(Json(application.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/mess-applications/{id}",
    tag = "mess applications",
    params(("id" = i32, Path, description = "Application id")),
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = MessApplication),
        (status = 404, body = ErrorBody)
    )
)]
pub(crate) async fn application(
    session: Session,
    State(context): State<ServerContext>,
    Path(application_id): Path<i32>,
) -> ServerResult<Json<MessApplication>> {
    let application = context
        .collab
        .mess
        .mess_application(&session.user, application_id)
        .await?;

    Ok(Json(application.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/mess-applications/{id}/decision",
    tag = "mess applications",
    params(("id" = i32, Path, description = "Application id")),
    request_body = MessDecisionSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The decided application", body = MessApplication),
        (status = 409, description = "The mess cannot take the student, or the application was already decided", body = ErrorBody)
    )
)]
pub(crate) async fn decide_application(
    session: Session,
    State(context): State<ServerContext>,
    Path(application_id): Path<i32>,
    ValidatedJson(body): ValidatedJson<MessDecisionSchema>,
) -> ServerResult<Json<MessApplication>> {
    let application = context
        .collab
        .mess
        .decide_mess_application(&session.user, application_id, body.decision, body.remarks)
        .await?;

    Ok(Json(application.to_serialized()))
}

pub fn messes_router() -> Router {
    Router::new().route("/:id", get(mess).patch(update_mess).delete(delete_mess))
}

pub fn applications_router() -> Router {
    Router::new()
        .route("/", get(list_applications).post(submit_application))
        .route("/:id", get(application))
        .route("/:id/decision", post(decide_application))
}
