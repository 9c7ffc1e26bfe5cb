//! Matchmaking for participants seeking a live partner.
//!
//! Waiting participants sit in strict-FIFO queues keyed by condition. A new
//! arrival either pops the earliest waiter — creating a room atomically and
//! delivering the waiter's end of it through a oneshot — or becomes a waiter
//! itself. Rooms are a pair of crosswise channels; either member leaving
//! closes the room for both.
//!
//! All queue and room state lives behind one lock, so two concurrent
//! `enqueue` calls can never pair with the same waiting entry. Nothing is
//! durable: a restart drops all pending entries and participants re-enqueue.

use chrono::{DateTime, Utc};
use parley_core::types::Condition;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// An event delivered to a session from its paired peer.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    /// An utterance relayed from the partner, stamped at relay time.
    Message {
        text: String,
        timestamp: DateTime<Utc>,
    },
    /// The partner left the room. Sent at most once; the channel closes
    /// right after, so no message can follow the notice.
    Disconnected,
}

/// One member's handle on an active room.
#[derive(Debug)]
pub struct PeerLink {
    pub room_id: Uuid,
    to_peer: mpsc::UnboundedSender<PeerEvent>,
    pub from_peer: mpsc::UnboundedReceiver<PeerEvent>,
}

impl PeerLink {
    /// Relays an utterance to the partner. A failed send means the partner
    /// is already gone; the caller will observe the closed channel instead.
    pub fn say(&self, text: impl Into<String>) {
        let _ = self.to_peer.send(PeerEvent::Message {
            text: text.into(),
            timestamp: Utc::now(),
        });
    }

    /// Notifies the partner that this side is leaving. Consumes the link, so
    /// nothing can be said after the notice.
    pub fn hang_up(self) {
        let _ = self.to_peer.send(PeerEvent::Disconnected);
    }
}

struct QueueEntry {
    handle: Uuid,
    enqueued_at: Instant,
    reply: oneshot::Sender<PeerLink>,
}

/// The result of asking for a partner.
pub enum Enqueued {
    /// A partner was already waiting; the room is live.
    Paired(PeerLink),
    /// No partner yet. The link arrives on this receiver if one shows up;
    /// the caller enforces its own wait ceiling and cancels on expiry.
    Waiting(oneshot::Receiver<PeerLink>),
}

#[derive(Default)]
struct MatchmakerState {
    queues: HashMap<Condition, VecDeque<QueueEntry>>,
    rooms: HashMap<Uuid, [Uuid; 2]>,
}

/// Pairs waiting participants in strict FIFO order and tracks live rooms.
#[derive(Default)]
pub struct Matchmaker {
    state: Mutex<MatchmakerState>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs the caller with the earliest waiter for `condition`, or parks
    /// the caller in the queue.
    pub async fn enqueue(&self, condition: Condition, handle: Uuid) -> Enqueued {
        let mut state = self.state.lock().await;
        loop {
            let queue = state.queues.entry(condition).or_default();
            let Some(entry) = queue.pop_front() else {
                let (tx, rx) = oneshot::channel();
                queue.push_back(QueueEntry {
                    handle,
                    enqueued_at: Instant::now(),
                    reply: tx,
                });
                return Enqueued::Waiting(rx);
            };
            if entry.reply.is_closed() {
                // The waiter vanished without cancelling; drop the entry.
                continue;
            }

            let room_id = Uuid::new_v4();
            let (to_waiter, waiter_inbox) = mpsc::unbounded_channel();
            let (to_caller, caller_inbox) = mpsc::unbounded_channel();
            let waiter_link = PeerLink {
                room_id,
                to_peer: to_caller,
                from_peer: waiter_inbox,
            };
            let caller_link = PeerLink {
                room_id,
                to_peer: to_waiter,
                from_peer: caller_inbox,
            };

            if entry.reply.send(waiter_link).is_err() {
                // Receiver dropped between the liveness check and the send.
                continue;
            }
            debug!(
                %room_id,
                waiter = %entry.handle,
                caller = %handle,
                waited_ms = entry.enqueued_at.elapsed().as_millis() as u64,
                "paired"
            );
            state.rooms.insert(room_id, [entry.handle, handle]);
            return Enqueued::Paired(caller_link);
        }
    }

    /// Removes a waiting entry. Returns `false` when the participant is
    /// absent or already paired — a no-op, not an error. A `false` return
    /// after a wait-ceiling expiry means pairing won the race and the link
    /// is already sitting in the oneshot.
    pub async fn cancel(&self, handle: Uuid) -> bool {
        let mut state = self.state.lock().await;
        for queue in state.queues.values_mut() {
            if let Some(position) = queue.iter().position(|entry| entry.handle == handle) {
                queue.remove(position);
                debug!(%handle, "left the queue");
                return true;
            }
        }
        false
    }

    /// Drops a room's bookkeeping once a member leaves.
    pub async fn close_room(&self, room_id: Uuid) {
        self.state.lock().await.rooms.remove(&room_id);
    }

    pub async fn room_count(&self) -> usize {
        self.state.lock().await.rooms.len()
    }

    pub async fn waiting_count(&self, condition: Condition) -> usize {
        self.state
            .lock()
            .await
            .queues
            .get(&condition)
            .map_or(0, VecDeque::len)
    }
}
