use log::debug;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::protocol::ServerMessage;
use super::types::ParticipantId;

/// A connected participant as seen by the core: an id and an outbox the
/// transport drains. Sending never blocks and never fails the caller.
#[derive(Debug, Clone)]
pub struct Participant {
    id: ParticipantId,
    outbox: UnboundedSender<ServerMessage>,
}

impl Participant {
    pub fn new(id: ParticipantId, outbox: UnboundedSender<ServerMessage>) -> Self {
        Self { id, outbox }
    }

    /// Fresh participant plus the receiving end of its outbox.
    pub fn channel() -> (Self, UnboundedReceiver<ServerMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(ParticipantId::new(), tx), rx)
    }

    #[must_use]
    pub fn id(&self) -> ParticipantId {
        self.id
    }

    pub fn send(&self, message: ServerMessage) {
        let kind = message.kind();
        if self.outbox.send(message).is_err() {
            debug!("Dropped {} for disconnected participant {}", kind, self.id);
        }
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        !self.outbox.is_closed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_after_disconnect_is_silent() {
        let (participant, rx) = Participant::channel();
        assert!(participant.is_connected());
        drop(rx);
        assert!(!participant.is_connected());
        participant.send(ServerMessage::waiting());
    }

    #[test]
    fn messages_arrive_in_order() {
        let (participant, mut rx) = Participant::channel();
        participant.send(ServerMessage::welcome());
        participant.send(ServerMessage::waiting());
        assert_eq!(rx.try_recv().unwrap().kind(), "welcome");
        assert_eq!(rx.try_recv().unwrap().kind(), "waiting_for_opponent");
        assert!(rx.try_recv().is_err());
    }
}
