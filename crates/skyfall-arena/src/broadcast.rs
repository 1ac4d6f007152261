//! Fan-out from the arena to connected sessions.
//!
//! Every session gets one outbound queue, drained in order by its
//! connection's writer task:
//!
//! ```text
//! Broadcaster ──(admit)──→ [ FIFO, unbounded ] ──→ connection writer task
//! ```
//!
//! Reliable messages are always admitted. Unreliable ones are admitted
//! only while fewer than `lossy_limit` of them are waiting; past that the
//! newest position update is discarded, since the next one supersedes it
//! anyway. Whatever is admitted leaves in the order it was queued, so a
//! position update queued before a `PlayerLeft` is never written after it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use skyfall_protocol::{PlayerId, Recipient, ServerMessage};
use tokio::sync::mpsc;

/// Creates a connected outbound sender/receiver pair.
///
/// `lossy_limit` caps how many unreliable messages may wait in the queue
/// at once (minimum 1).
pub fn outbound_channel(lossy_limit: usize) -> (OutboundSender, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    let budget = Arc::new(LossyBudget {
        queued: AtomicUsize::new(0),
        limit: lossy_limit.max(1),
    });
    (
        OutboundSender {
            tx,
            budget: Arc::clone(&budget),
        },
        OutboundReceiver { rx, budget },
    )
}

/// Count of unreliable messages sitting in one session's queue.
#[derive(Debug)]
struct LossyBudget {
    queued: AtomicUsize,
    limit: usize,
}

impl LossyBudget {
    fn try_acquire(&self) -> bool {
        self.queued
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.limit).then_some(n + 1)
            })
            .is_ok()
    }

    fn release(&self) {
        self.queued.fetch_sub(1, Ordering::AcqRel);
    }
}

/// The arena's end of one session's outbound queue.
#[derive(Debug, Clone)]
pub struct OutboundSender {
    tx: mpsc::UnboundedSender<ServerMessage>,
    budget: Arc<LossyBudget>,
}

impl OutboundSender {
    /// Queues a message behind everything already queued.
    ///
    /// Returns `false` if the message was dropped: either it is lossy and
    /// the session already has `lossy_limit` of those waiting, or the
    /// session is gone.
    pub fn deliver(&self, msg: ServerMessage) -> bool {
        if !msg.channel().is_lossy() {
            return self.tx.send(msg).is_ok();
        }
        if !self.budget.try_acquire() {
            return false;
        }
        if self.tx.send(msg).is_err() {
            self.budget.release();
            return false;
        }
        true
    }
}

/// The connection's end of its outbound queue.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::UnboundedReceiver<ServerMessage>,
    budget: Arc<LossyBudget>,
}

impl OutboundReceiver {
    /// Waits for the next message in queue order.
    ///
    /// Returns `None` once the arena has dropped the sender and the queue
    /// is drained.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        let msg = self.rx.recv().await?;
        Some(self.taken(msg))
    }

    /// Takes the next already-queued message without waiting.
    pub fn try_recv(&mut self) -> Option<ServerMessage> {
        let msg = self.rx.try_recv().ok()?;
        Some(self.taken(msg))
    }

    /// Takes every already-queued message, in queue order.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    fn taken(&self, msg: ServerMessage) -> ServerMessage {
        if msg.channel().is_lossy() {
            self.budget.release();
        }
        msg
    }
}

/// Addresses outbound messages to sessions.
///
/// The three [`Recipient`] modes are the only way the arena talks to
/// clients. The delivery channel comes from the message itself
/// ([`ServerMessage::channel`]).
#[derive(Debug, Default)]
pub struct Broadcaster {
    senders: HashMap<PlayerId, OutboundSender>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts delivering to `player_id`.
    pub fn attach(&mut self, player_id: PlayerId, sender: OutboundSender) {
        self.senders.insert(player_id, sender);
    }

    /// Stops delivering to `player_id`. Dropping the sender lets the
    /// connection's writer task finish.
    pub fn detach(&mut self, player_id: PlayerId) {
        self.senders.remove(&player_id);
    }

    /// Number of attached sessions.
    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }

    /// Sends `msg` to the given audience.
    pub fn send(&self, recipient: Recipient, msg: ServerMessage) {
        match recipient {
            Recipient::All => {
                for pid in self.senders.keys() {
                    self.send_to(*pid, msg.clone());
                }
            }
            Recipient::AllExcept(excluded) => {
                for pid in self.senders.keys() {
                    if *pid != excluded {
                        self.send_to(*pid, msg.clone());
                    }
                }
            }
            Recipient::Player(pid) => self.send_to(pid, msg),
        }
    }

    /// Shorthand for [`Recipient::All`].
    pub fn to_all(&self, msg: ServerMessage) {
        self.send(Recipient::All, msg);
    }

    /// Shorthand for [`Recipient::AllExcept`].
    pub fn to_all_except(&self, excluded: PlayerId, msg: ServerMessage) {
        self.send(Recipient::AllExcept(excluded), msg);
    }

    /// Shorthand for [`Recipient::Player`].
    pub fn to_player(&self, player_id: PlayerId, msg: ServerMessage) {
        self.send(Recipient::Player(player_id), msg);
    }

    /// Sends to one session. A missing or closed session is not an error.
    fn send_to(&self, player_id: PlayerId, msg: ServerMessage) {
        let Some(sender) = self.senders.get(&player_id) else {
            return;
        };
        let lossy = msg.channel().is_lossy();
        if !sender.deliver(msg) && lossy {
            tracing::trace!(%player_id, "lossy limit reached, dropping");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skyfall_protocol::Transform;

    fn left(id: u64) -> ServerMessage {
        ServerMessage::PlayerLeft {
            player_id: PlayerId(id),
            name: "Rex".into(),
        }
    }

    fn position(id: u64) -> ServerMessage {
        ServerMessage::PositionBroadcast {
            player_id: PlayerId(id),
            transform: Transform::default(),
        }
    }

    /// Three attached sessions, ids 1..=3.
    fn three() -> (Broadcaster, Vec<OutboundReceiver>) {
        let mut b = Broadcaster::new();
        let mut rxs = Vec::new();
        for id in 1..=3 {
            let (tx, rx) = outbound_channel(4);
            b.attach(PlayerId(id), tx);
            rxs.push(rx);
        }
        (b, rxs)
    }

    #[test]
    fn test_send_all_reaches_every_session() {
        let (b, mut rxs) = three();

        b.to_all(left(9));

        for rx in &mut rxs {
            assert_eq!(rx.drain(), vec![left(9)]);
        }
    }

    #[test]
    fn test_send_all_except_skips_excluded() {
        let (b, mut rxs) = three();

        b.to_all_except(PlayerId(2), left(9));

        assert_eq!(rxs[0].drain().len(), 1);
        assert!(rxs[1].drain().is_empty());
        assert_eq!(rxs[2].drain().len(), 1);
    }

    #[test]
    fn test_send_player_reaches_only_target() {
        let (b, mut rxs) = three();

        b.to_player(PlayerId(3), left(9));

        assert!(rxs[0].drain().is_empty());
        assert!(rxs[1].drain().is_empty());
        assert_eq!(rxs[2].drain(), vec![left(9)]);
    }

    #[test]
    fn test_send_to_detached_player_is_noop() {
        let (mut b, mut rxs) = three();
        b.detach(PlayerId(1));

        b.to_player(PlayerId(1), left(9));
        b.to_all(left(8));

        assert!(rxs[0].drain().is_empty());
        assert_eq!(b.len(), 2);
    }

    #[test]
    fn test_unreliable_queue_drops_when_full() {
        let (tx, mut rx) = outbound_channel(2);

        assert!(tx.deliver(position(1)));
        assert!(tx.deliver(position(2)));
        assert!(!tx.deliver(position(3)), "third update should be dropped");

        assert_eq!(rx.drain(), vec![position(1), position(2)]);
    }

    #[test]
    fn test_reliable_queue_never_drops() {
        let (tx, mut rx) = outbound_channel(1);

        for id in 0..100 {
            assert!(tx.deliver(left(id)));
        }

        assert_eq!(rx.drain().len(), 100);
    }

    #[test]
    fn test_deliver_after_receiver_dropped_returns_false() {
        let (tx, rx) = outbound_channel(1);
        drop(rx);

        assert!(!tx.deliver(left(1)));
        assert!(!tx.deliver(position(1)));
    }

    #[test]
    fn test_reliable_admitted_while_lossy_limit_reached() {
        let (tx, mut rx) = outbound_channel(1);

        assert!(tx.deliver(position(1)));
        assert!(!tx.deliver(position(2)));
        assert!(tx.deliver(left(1)), "reliable traffic ignores the lossy limit");

        assert_eq!(rx.drain(), vec![position(1), left(1)]);
    }

    #[test]
    fn test_draining_frees_lossy_capacity() {
        let (tx, mut rx) = outbound_channel(1);
        assert!(tx.deliver(position(1)));
        assert!(!tx.deliver(position(2)));

        assert_eq!(rx.try_recv(), Some(position(1)));

        assert!(tx.deliver(position(3)));
        assert_eq!(rx.drain(), vec![position(3)]);
    }

    #[tokio::test]
    async fn test_recv_keeps_queue_order_and_ends_when_sender_dropped() {
        let (tx, mut rx) = outbound_channel(4);
        tx.deliver(position(1));
        tx.deliver(left(1));
        tx.deliver(position(2));
        drop(tx);

        assert_eq!(rx.recv().await, Some(position(1)));
        assert_eq!(rx.recv().await, Some(left(1)));
        assert_eq!(rx.recv().await, Some(position(2)));
        assert_eq!(rx.recv().await, None);
    }
}
