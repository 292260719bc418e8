use crossbeam::channel::{unbounded, Receiver, Sender};
use log::warn;
use shams_core::RequestStatus;

use crate::PrimaryKey;

pub type EventSender = Sender<CollabEvent>;
pub type EventReceiver = Receiver<CollabEvent>;

/// Status changes pushed to the affected student
#[derive(Debug, Clone)]
pub enum CollabEvent {
    /// A warden or admin decided a hostel request
    HostelRequestDecided {
        student_id: PrimaryKey,
        request_id: PrimaryKey,
        status: RequestStatus,
        room_id: Option<PrimaryKey>,
    },
    /// A warden or admin decided a mess application
    MessApplicationDecided {
        student_id: PrimaryKey,
        application_id: PrimaryKey,
        status: RequestStatus,
        mess_id: PrimaryKey,
    },
}

impl CollabEvent {
    /// The user the event is meant for
    pub fn recipient(&self) -> PrimaryKey {
        match self {
            Self::HostelRequestDecided { student_id, .. } => *student_id,
            Self::MessApplicationDecided { student_id, .. } => *student_id,
        }
    }
}

/// Fire-and-forget side of the notification channel
#[derive(Clone)]
pub struct Notifier {
    sender: EventSender,
}

impl Notifier {
    pub fn channel() -> (Self, EventReceiver) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    /// Delivery failures are logged and otherwise ignored
    pub fn emit(&self, event: CollabEvent) {
        if let Err(e) = self.sender.send(event) {
            warn!("Dropped notification for user {}", e.0.recipient());
        }
    }
}

#[cfg(test)]
mod test {
    use shams_core::RequestStatus;

    use super::{CollabEvent, Notifier};

    #[test]
    fn emitting_without_listeners_does_not_fail() {
        let (notifier, receiver) = Notifier::channel();
        drop(receiver);

        notifier.emit(CollabEvent::MessApplicationDecided {
            student_id: 1,
            application_id: 2,
            status: RequestStatus::Rejected,
            mess_id: 3,
        });
    }

    #[test]
    fn events_reach_the_receiver() {
        let (notifier, receiver) = Notifier::channel();

        notifier.emit(CollabEvent::HostelRequestDecided {
            student_id: 7,
            request_id: 1,
            status: RequestStatus::Approved,
            room_id: Some(4),
        });

        let event = receiver.try_recv().unwrap();
        assert_eq!(event.recipient(), 7);
    }
}
