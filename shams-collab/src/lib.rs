mod access;
mod allocation;
mod auth;
mod db;
mod error;
mod events;
mod feedback;
mod hostels;
mod mess;

pub use allocation::*;
pub use auth::*;
pub use db::*;
pub use error::*;
pub use events::*;
pub use feedback::*;
pub use hostels::*;
pub use mess::*;

use shams_core::Config;

/// The SHAMS allocation system: accounts, hostels, requests, messes, and feedback.
pub struct Collab {
    pub config: Config,
    pub auth: Auth,
    pub hostels: HostelManager,
    pub allocation: AllocationManager,
    pub mess: MessManager,
    pub feedback: FeedbackManager,
}

/// A type passed to the managers of the collab system, to access state and emit events.
#[derive(Clone)]
pub struct CollabContext {
    pub database: SharedDatabase,
    pub config: Config,
    pub notifier: Notifier,
}

impl Collab {
    pub fn new(database: SharedDatabase, config: Config, notifier: Notifier) -> Self {
        let context = CollabContext {
            database: database.clone(),
            config: config.clone(),
            notifier,
        };

        Self {
            auth: Auth::new(&database, config.session_duration_in_days),
            hostels: HostelManager::new(&context),
            allocation: AllocationManager::new(&context),
            mess: MessManager::new(&context),
            feedback: FeedbackManager::new(&context),
            config,
        }
    }
}
