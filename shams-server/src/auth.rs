use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, State},
    http::{header, request::Parts, StatusCode},
    routing::{get, post},
    Json,
};
use shams_collab::{Credentials, NewAccount, NewStudent, NewWarden, UserData};

use crate::{
    context::ServerContext,
    errors::{ErrorBody, ServerResult},
    schemas::{AccountSchema, LoginSchema, NewWardenSchema, RegisterSchema, ValidatedJson},
    serialized::{LoginResult, ToSerialized, User},
    Router,
};

/// The logged in user of a request, taken from the `Authorization: Bearer` header
pub struct Session {
    pub token: String,
    pub user: UserData,
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
    ServerContext: FromRef<S>,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let context = ServerContext::from_ref(state);

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|x| x.to_str().ok())
            .ok_or((StatusCode::UNAUTHORIZED, "Missing authorization"))?;

        let token = match header.split_once(' ') {
            Some(("Bearer", token)) => token.trim(),
            _ => return Err((StatusCode::BAD_REQUEST, "Authorization must be Bearer")),
        };

        let session = context
            .collab
            .auth
            .session(token)
            .await
            .map_err(|_| (StatusCode::UNAUTHORIZED, "Session does not exist"))?;

        Ok(Self {
            token: session.token,
            user: session.user,
        })
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    tag = "auth",
    request_body = LoginSchema,
    responses(
        (status = 200, body = LoginResult),
        (status = 400, description = "Username or password is wrong", body = ErrorBody)
    )
)]
pub(crate) async fn login(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<LoginSchema>,
) -> ServerResult<Json<LoginResult>> {
    let session = context
        .collab
        .auth
        .login(Credentials {
            username: body.username,
            password: body.password,
        })
        .await?;

    Ok(Json(session.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The session was deleted")
    )
)]
pub(crate) async fn logout(
    session: Session,
    State(context): State<ServerContext>,
) -> ServerResult<()> {
    context.collab.auth.logout(&session.token).await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/v1/auth/register",
    tag = "auth",
    request_body = RegisterSchema,
    responses(
        (status = 200, body = User),
        (status = 409, description = "The username is taken", body = ErrorBody)
    )
)]
pub(crate) async fn register(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<RegisterSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .auth
        .register_student(NewStudent {
            account: NewAccount {
                username: body.username,
                password: body.password,
                display_name: body.display_name,
            },
            gender: body.gender,
            hostel_identifier: body.hostel_identifier,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/admin",
    tag = "auth",
    request_body = AccountSchema,
    responses(
        (status = 200, description = "The first admin was created", body = User),
        (status = 409, description = "An admin already exists", body = ErrorBody)
    )
)]
pub(crate) async fn register_admin(
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<AccountSchema>,
) -> ServerResult<Json<User>> {
    let user = context
        .collab
        .auth
        .register_admin(NewAccount {
            username: body.username,
            password: body.password,
            display_name: body.display_name,
        })
        .await?;

    Ok(Json(user.to_serialized()))
}

#[utoipa::path(
    post,
    path = "/v1/auth/wardens",
    tag = "auth",
    request_body = NewWardenSchema,
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, body = User),
        (status = 403, description = "Only admins create wardens", body = ErrorBody)
    )
)]
pub(crate) async fn create_warden(
    session: Session,
    State(context): State<ServerContext>,
    ValidatedJson(body): ValidatedJson<NewWardenSchema>,
) -> ServerResult<Json<User>> {
    let warden = context
        .collab
        .auth
        .create_warden(
            &session.user,
            NewWarden {
                account: NewAccount {
                    username: body.username,
                    password: body.password,
                    display_name: body.display_name,
                },
                assigned_hostel_id: body.assigned_hostel_id,
                assigned_floor: body.assigned_floor,
            },
        )
        .await?;

    Ok(Json(warden.to_serialized()))
}

#[utoipa::path(
    get,
    path = "/v1/auth/user",
    tag = "auth",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (status = 200, description = "The user of the supplied session", body = User)
    )
)]
pub(crate) async fn user(session: Session) -> Json<User> {
    Json(session.user.to_serialized())
}

pub fn router() -> Router {
    Router::new()
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/admin", post(register_admin))
        .route("/wardens", post(create_warden))
        .route("/user", get(user))
}
