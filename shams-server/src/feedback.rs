use axum::{extract::State, routing::get, Json};
use shams_collab::FeedbackDraft;

use crate::{
    auth::Session,
    context::ServerContext,
    errors::{ErrorBody, ServerResult},
    schemas::{NewFeedbackSchema, ValidatedJson},
    serialized::{Feedback, FeedbackSummary, ToSerialized},
    Router,
};

#[utoipa::path(
    post,
    path = "/v1/feedback",
    tag = "feedback",
    request_body = NewFeedbackSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = Feedback),
        (status = 400, description = "The rating is not between 1 and 5", body = ErrorBody)
    )
)]
pub(crate) async fn submit_feedback(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewFeedbackSchema>,
) -> ServerResult<Json<Feedback>> {
    let feedback = context
        .collab
        .feedback
        .submit_feedback(
            &session.user,
            FeedbackDraft {
                menu_item: body.menu_item,
                rating: body.rating,
                comments: body.comments,
            },
        )
        .await?;

    Ok(Json(feedback.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/feedback",
    tag = "feedback",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "All feedback, oldest first", body = Vec<Feedback>),
        (status = 403, description = "Only wardens and admins read feedback", body = ErrorBody)
    )
)]
pub(crate) async fn list_feedback(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<Vec<Feedback>>> {
    let feedback = context.collab.feedback.list_feedback(&session.user).await?;

    Ok(Json(feedback.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/feedback/summary",
    tag = "feedback",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = FeedbackSummary)
    )
)]
pub(crate) async fn summary(
    _session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<Json<FeedbackSummary>> {
    let summary = context.collab.feedback.summary().await?;

    Ok(Json(summary.to_serialized()))
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_feedback).post(submit_feedback))
        .route("/summary", get(summary))
}
