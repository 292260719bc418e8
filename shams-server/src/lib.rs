use axum::routing::get;
use context::ServerContext;
use log::info;
use shams_collab::{Collab, EventReceiver};
use std::{
    env, io,
    net::{Ipv6Addr, SocketAddr},
    num::ParseIntError,
    sync::Arc,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

mod auth;
mod context;
mod docs;
mod errors;
mod feedback;
mod hostels;
mod mess;
mod requests;
mod rooms;
mod schemas;
mod serialized;
mod sse;

/// The default port the server will listen on.
pub const DEFAULT_PORT: u16 = 9060;

pub type Router = axum::Router<ServerContext>;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("SHAMS_SERVER_PORT must be a port number: {0}")]
    InvalidPort(#[from] ParseIntError),
    #[error("Could not listen on {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("Server stopped unexpectedly: {0}")]
    Serve(io::Error),
}

/// Starts the SHAMS server, forwarding collab events to connected clients
pub async fn run_server(collab: Collab, events: EventReceiver) -> Result<(), StartError> {
    let port = match env::var("SHAMS_SERVER_PORT") {
        Ok(port) => port.parse::<u16>()?,
        Err(_) => DEFAULT_PORT,
    };

    let addr: SocketAddr = (Ipv6Addr::UNSPECIFIED, port).into();

    let sse = sse::ServerSentEvents::new();
    sse.pump(events);

    let context = ServerContext {
        collab: Arc::new(collab),
        sse,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let version_one_router = Router::new()
        .nest("/auth", auth::router())
        .nest("/hostels", hostels::router())
        .nest("/rooms", rooms::router())
        .nest("/requests", requests::router())
        .nest("/messes", mess::messes_router())
        .nest("/mess-applications", mess::applications_router())
        .nest("/feedback", feedback::router())
        .nest("/events", sse::router());

    let root_router = Router::new()
        .nest("/v1", version_one_router)
        .route("/api.json", get(docs::docs))
        .layer(cors)
        .with_state(context);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|source| StartError::Bind { addr, source })?;

    info!("Listening on {}", addr);

    axum::serve(listener, root_router.into_make_service())
        .await
        .map_err(StartError::Serve)
}
