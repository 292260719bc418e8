use axum::{
    extract::State,
    response::{
        sse::{Event, KeepAlive},
        Sse,
    },
    routing::get,
};
use futures_util::Stream;
use parking_lot::Mutex;
use serde::Serialize;
use shams_collab::{CollabEvent, EventReceiver, PrimaryKey};
use shams_core::RequestStatus;
use std::{
    collections::VecDeque,
    pin::Pin,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
    task::{Context, Poll, Waker},
    thread,
};
use utoipa::ToSchema;

use crate::{auth::Session, context::ServerContext, Router};

type ConnectionId = u64;

/// Status changes pushed to the student they concern
#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "kebab-case", tag = "type")]
pub enum ServerEvent {
    /// A hostel request was approved or rejected
    HostelRequestDecided {
        #[serde(rename = "requestId")]
        request_id: i32,
        #[schema(value_type = String)]
        status: RequestStatus,
        /// The room the student was placed in, if approved
        #[serde(rename = "roomId")]
        room_id: Option<i32>,
    },
    /// A mess application was approved or rejected
    MessApplicationDecided {
        #[serde(rename = "applicationId")]
        application_id: i32,
        #[schema(value_type = String)]
        status: RequestStatus,
        #[serde(rename = "messId")]
        mess_id: i32,
    },
}

impl From<CollabEvent> for ServerEvent {
    fn from(value: CollabEvent) -> Self {
        match value {
            CollabEvent::HostelRequestDecided {
                request_id,
                status,
                room_id,
                ..
            } => Self::HostelRequestDecided {
                request_id,
                status,
                room_id,
            },
            CollabEvent::MessApplicationDecided {
                application_id,
                status,
                mess_id,
                ..
            } => Self::MessApplicationDecided {
                application_id,
                status,
                mess_id,
            },
        }
    }
}

/// Manages server sent event connections, one or more per logged in user
pub struct ServerSentEvents {
    me: Weak<Self>,
    next_id: AtomicU64,
    connections: Mutex<Vec<Connection>>,
}

struct Connection {
    id: ConnectionId,
    user_id: PrimaryKey,
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    waker: Arc<Mutex<Option<Waker>>>,
}

pub struct ConnectionHandle {
    id: ConnectionId,
    /// A reference to [Connection]'s pending messages
    pending_messages: Arc<Mutex<VecDeque<ServerEvent>>>,
    /// A reference to [Connection]'s stored [Waker]
    waker: Arc<Mutex<Option<Waker>>>,
    /// Required to remove connection when dropped
    manager: Weak<ServerSentEvents>,
}

impl ServerSentEvents {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            me: me.clone(),
            next_id: AtomicU64::new(0),
            connections: Default::default(),
        })
    }

    /// Sends an event to every connection of a user. Users without one miss it.
    pub fn send_to(&self, user_id: PrimaryKey, event: ServerEvent) {
        let connections = self.connections.lock();

        for connection in connections.iter().filter(|c| c.user_id == user_id) {
            connection.send(event.clone())
        }
    }

    /// Forwards collab events to their recipients until the collab side closes
    pub fn pump(self: &Arc<Self>, receiver: EventReceiver) {
        let manager = self.clone();

        thread::spawn(move || {
            for event in receiver.iter() {
                manager.send_to(event.recipient(), event.into())
            }
        });
    }

    fn connect(&self, user_id: PrimaryKey) -> ConnectionHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let connection = Connection::new(id, user_id);
        let handle = connection.handle(self.me.clone());

        self.connections.lock().push(connection);
        handle
    }

    fn disconnect(&self, id: ConnectionId) {
        self.connections.lock().retain(|c| c.id != id)
    }

    #[cfg(test)]
    fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }
}

impl Connection {
    fn new(id: ConnectionId, user_id: PrimaryKey) -> Self {
        Self {
            id,
            user_id,
            pending_messages: Default::default(),
            waker: Default::default(),
        }
    }

    fn send(&self, message: ServerEvent) {
        self.pending_messages.lock().push_back(message);

        if let Some(waker) = self.waker.lock().take() {
            waker.wake()
        }
    }

    fn handle(&self, manager: Weak<ServerSentEvents>) -> ConnectionHandle {
        ConnectionHandle {
            id: self.id,
            pending_messages: self.pending_messages.clone(),
            waker: self.waker.clone(),
            manager,
        }
    }
}

impl Stream for ConnectionHandle {
    type Item = Result<Event, axum::Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut pending_messages = self.pending_messages.lock();

        if let Some(message) = pending_messages.pop_front() {
            return Poll::Ready(Some(Event::default().json_data(message)));
        }

        *self.waker.lock() = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.disconnect(self.id)
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/events",
    tag = "events",
    security(
        ("BearerAuth" = [])
    ),
    responses(
        (
            status = 200,
            content_type = "text/event-stream",
            description = "Decisions on the user's requests and applications",
            body = ServerEvent
        )
    )
)]
pub(crate) async fn event_stream(
    session: Session,
    State(context): State<ServerContext>,
) -> Sse<ConnectionHandle> {
    Sse::new(context.sse.connect(session.user.id)).keep_alive(KeepAlive::default())
}

pub fn router() -> Router {
    Router::new().route("/", get(event_stream))
}

#[cfg(test)]
mod test {
    use futures_util::StreamExt;
    use shams_collab::{CollabEvent, Notifier};
    use shams_core::RequestStatus;

    use super::{ServerEvent, ServerSentEvents};

    fn decided(request_id: i32) -> ServerEvent {
        ServerEvent::HostelRequestDecided {
            request_id,
            status: RequestStatus::Approved,
            room_id: Some(3),
        }
    }

    #[test]
    fn events_reach_only_their_user() {
        let sse = ServerSentEvents::new();
        let student = sse.connect(1);
        let other = sse.connect(2);

        sse.send_to(1, decided(10));
        sse.send_to(1, decided(11));

        let pending = student.pending_messages.lock();
        assert_eq!(pending.len(), 2);
        assert!(matches!(
            pending.front(),
            Some(ServerEvent::HostelRequestDecided { request_id: 10, .. })
        ));
        assert!(other.pending_messages.lock().is_empty());
    }

    #[test]
    fn dropped_handles_disconnect() {
        let sse = ServerSentEvents::new();
        let handle = sse.connect(1);
        assert_eq!(sse.connection_count(), 1);

        drop(handle);
        assert_eq!(sse.connection_count(), 0);
    }

    #[tokio::test]
    async fn pumped_events_are_streamed() {
        let sse = ServerSentEvents::new();
        let mut handle = sse.connect(7);
        let (notifier, receiver) = Notifier::channel();

        sse.pump(receiver);
        notifier.emit(CollabEvent::MessApplicationDecided {
            student_id: 7,
            application_id: 2,
            status: RequestStatus::Rejected,
            mess_id: 5,
        });

        let event = handle.next().await;
        assert!(matches!(event, Some(Ok(_))));
    }

    #[test]
    fn events_serialize_with_a_type_tag() {
        let json = serde_json::to_value(decided(4)).unwrap();

        assert_eq!(json["type"], "hostel-request-decided");
        assert_eq!(json["requestId"], 4);
        assert_eq!(json["status"], "approved");
    }
}
