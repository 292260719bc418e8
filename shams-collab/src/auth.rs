use argon2::{
    password_hash::{Encoding, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use chrono::{Duration, Utc};
use log::{info, warn};
use rand::{distributions::Alphanumeric, rngs::OsRng, thread_rng, Rng};
use shams_core::{Gender, Role};
use thiserror::Error;

use crate::{
    DatabaseError, NewSession, NewUser, PrimaryKey, SessionData, SharedDatabase, UserData,
};

const TOKEN_LENGTH: usize = 32;

/// Issues and validates login sessions
pub struct Auth {
    db: SharedDatabase,
    argon: Argon2<'static>,
    session_duration: Duration,
}

#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password is incorrect
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("An admin already exists")]
    AdminExists,
    #[error("Only admins can create wardens")]
    NotAdmin,
    #[error("Invalid input: {0}")]
    Validation(String),
    /// Something else went wrong with the database
    #[error(transparent)]
    Db(DatabaseError),
    #[error("HashError: {0}")]
    HashError(String),
}

impl Auth {
    pub fn new(db: &SharedDatabase, session_duration_in_days: i64) -> Self {
        Self {
            db: db.clone(),
            argon: Argon2::default(),
            session_duration: Duration::days(session_duration_in_days),
        }
    }

    /// Logs in a user, returning a new session
    pub async fn login(&self, credentials: Credentials) -> Result<SessionData, AuthError> {
        self.clear_expired().await;

        let user = self
            .db
            .user_by_username(&credentials.username)
            .await
            .map_err(|e| match e {
                DatabaseError::NotFound { .. } => AuthError::InvalidCredentials,
                err => AuthError::Db(err),
            })?;

        let stored_password = PasswordHash::parse(&user.password, Encoding::default())
            .map_err(|e| AuthError::HashError(e.to_string()))?;

        self.argon
            .verify_password(credentials.password.as_bytes(), &stored_password)
            .map_err(|_| AuthError::InvalidCredentials)?;

        let new_session = NewSession {
            token: session_token(),
            user_id: user.id,
            expires_at: Utc::now() + self.session_duration,
        };

        let session = self
            .db
            .create_session(new_session)
            .await
            .map_err(AuthError::Db)?;

        info!("{} ({}) logged in", user.username, user.role);
        Ok(session)
    }

    /// Deletes the associated session, if it exists
    pub async fn logout(&self, token: &str) -> Result<(), DatabaseError> {
        self.db.delete_session_by_token(token).await
    }

    /// Returns a session if it exists and hasn't expired
    pub async fn session(&self, token: &str) -> Result<SessionData, DatabaseError> {
        let session = self.db.session_by_token(token).await?;

        if session.expires_at <= Utc::now() {
            return Err(DatabaseError::NotFound {
                resource: "session",
                identifier: "token",
            });
        }

        Ok(session)
    }

    /// Creates a student account
    pub async fn register_student(&self, new_student: NewStudent) -> Result<UserData, AuthError> {
        self.create_user(
            new_student.account,
            Role::Student,
            Some(new_student.gender),
            new_student.hostel_identifier,
            None,
            None,
        )
        .await
    }

    /// Creates the first admin, if none exists yet
    pub async fn register_admin(&self, account: NewAccount) -> Result<UserData, AuthError> {
        let has_admin = self.db.any_admin().await.map_err(AuthError::Db)?;

        if has_admin {
            return Err(AuthError::AdminExists);
        }

        self.create_user(account, Role::Admin, None, None, None, None)
            .await
    }

    /// Creates a warden responsible for one hostel, and optionally one floor of it
    pub async fn create_warden(
        &self,
        actor: &UserData,
        new_warden: NewWarden,
    ) -> Result<UserData, AuthError> {
        if actor.role != Role::Admin {
            return Err(AuthError::NotAdmin);
        }

        self.create_user(
            new_warden.account,
            Role::Warden,
            None,
            None,
            Some(new_warden.assigned_hostel_id),
            new_warden.assigned_floor,
        )
        .await
    }

    async fn create_user(
        &self,
        account: NewAccount,
        role: Role,
        gender: Option<Gender>,
        hostel_identifier: Option<String>,
        assigned_hostel_id: Option<PrimaryKey>,
        assigned_floor: Option<i32>,
    ) -> Result<UserData, AuthError> {
        account.check()?;

        let salt = SaltString::generate(&mut OsRng);
        let hashed_password = self
            .argon
            .hash_password(account.password.as_bytes(), &salt)
            .map_err(|e| AuthError::HashError(e.to_string()))?
            .to_string();

        let user = self
            .db
            .create_user(NewUser {
                username: account.username,
                password: hashed_password,
                display_name: account.display_name,
                role,
                gender,
                hostel_identifier,
                assigned_hostel_id,
                assigned_floor,
            })
            .await
            .map_err(AuthError::Db)?;

        info!("Registered {} {}", user.role, user.username);
        Ok(user)
    }

    async fn clear_expired(&self) {
        if let Err(e) = self.db.clear_expired_sessions().await {
            warn!("Could not clear expired sessions: {}", e)
        }
    }
}

fn session_token() -> String {
    thread_rng()
        .sample_iter(Alphanumeric)
        .take(TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

#[derive(Debug)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug)]
pub struct NewAccount {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

impl NewAccount {
    fn check(&self) -> Result<(), AuthError> {
        if self.username.trim().is_empty() || self.display_name.trim().is_empty() {
            return Err(AuthError::Validation(
                "username and display name are required".to_string(),
            ));
        }

        if self.password.chars().count() < 8 {
            return Err(AuthError::Validation(
                "password must be at least 8 characters".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug)]
pub struct NewStudent {
    pub account: NewAccount,
    pub gender: Gender,
    pub hostel_identifier: Option<String>,
}

#[derive(Debug)]
pub struct NewWarden {
    pub account: NewAccount,
    pub assigned_hostel_id: PrimaryKey,
    pub assigned_floor: Option<i32>,
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use shams_core::{Gender, Role};

    use super::{Auth, AuthError, Credentials, NewAccount, NewStudent};
    use crate::{MemoryDatabase, SharedDatabase};

    fn account(username: &str) -> NewAccount {
        NewAccount {
            username: username.to_string(),
            password: "correct horse".to_string(),
            display_name: username.to_uppercase(),
        }
    }

    fn auth() -> Auth {
        let db: SharedDatabase = Arc::new(MemoryDatabase::new());
        Auth::new(&db, 7)
    }

    #[tokio::test]
    async fn login_issues_a_session_for_the_user() {
        let auth = auth();

        let student = auth
            .register_student(NewStudent {
                account: account("asha"),
                gender: Gender::Female,
                hostel_identifier: Some("H-17".to_string()),
            })
            .await
            .unwrap();

        let session = auth
            .login(Credentials {
                username: "asha".to_string(),
                password: "correct horse".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.token.len(), 32);
        assert_eq!(session.user.id, student.id);
        assert_eq!(session.user.role, Role::Student);

        let found = auth.session(&session.token).await.unwrap();
        assert_eq!(found.user.username, "asha");

        auth.logout(&session.token).await.unwrap();
        assert!(auth.session(&session.token).await.is_err());
    }

    #[tokio::test]
    async fn wrong_password_is_rejected() {
        let auth = auth();
        auth.register_admin(account("root")).await.unwrap();

        let result = auth
            .login(Credentials {
                username: "root".to_string(),
                password: "wrong password".to_string(),
            })
            .await;

        assert!(matches!(result, Err(AuthError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn only_one_admin_can_bootstrap() {
        let auth = auth();

        auth.register_admin(account("root")).await.unwrap();
        let second = auth.register_admin(account("other")).await;

        assert!(matches!(second, Err(AuthError::AdminExists)));
    }

    #[tokio::test]
    async fn short_passwords_are_refused() {
        let auth = auth();

        let result = auth
            .register_admin(NewAccount {
                password: "short".to_string(),
                ..account("root")
            })
            .await;

        assert!(matches!(result, Err(AuthError::Validation(_))));
    }
}
