//! Event Dispatcher (C5): fans outbound [`ServerEvent`]s out to the sockets bound to a
//! room. Each connected socket owns an mpsc sender; the dispatcher keeps only the
//! room-membership index and the per-socket outbound channel.

use std::sync::Arc;

use dashmap::{DashMap, DashSet};
use tokio::sync::mpsc;
use tracing::trace;

use crate::engine::{BroadcastTarget, PendingBroadcast, Pin, ServerEvent, SocketId};
use crate::metrics::Metrics;

const OUTBOUND_BUFFER: usize = 64;

pub struct EventDispatcher {
    room_members: DashMap<Pin, DashSet<SocketId>>,
    senders: DashMap<SocketId, mpsc::Sender<Arc<ServerEvent>>>,
    metrics: Arc<Metrics>,
}

impl EventDispatcher {
    pub fn new(metrics: Arc<Metrics>) -> Self {
        Self {
            room_members: DashMap::new(),
            senders: DashMap::new(),
            metrics,
        }
    }

    /// Registers a freshly-connected socket and returns the receiving half it should
    /// forward to the transport.
    pub async fn register(&self, sid: SocketId, pin: Pin) -> mpsc::Receiver<Arc<ServerEvent>> {
        let (tx, rx) = mpsc::channel(OUTBOUND_BUFFER);
        self.senders.insert(sid, tx);
        self.room_members.entry(pin).or_default().insert(sid);
        rx
    }

    /// Moves a socket's room membership, used when the bound pin changes (rare: a
    /// socket only ever binds once per connection in this design, but the engine's
    /// `bind_socket` allows rebinding, so the dispatcher mirrors it defensively).
    pub async fn rebind(&self, sid: SocketId, old_pin: Option<Pin>, new_pin: Pin) {
        if let Some(old_pin) = old_pin {
            if let Some(members) = self.room_members.get(&old_pin) {
                members.remove(&sid);
            }
        }
        self.room_members.entry(new_pin).or_default().insert(sid);
    }

    pub async fn unregister(&self, sid: SocketId, pin: Option<Pin>) {
        self.senders.remove(&sid);
        if let Some(pin) = pin {
            let mut empty = false;
            if let Some(members) = self.room_members.get(&pin) {
                members.remove(&sid);
                empty = members.is_empty();
            }
            if empty {
                self.room_members.remove(&pin);
            }
        }
    }

    /// Delivers every pending broadcast. Best-effort: a socket with a full or closed
    /// channel is simply skipped via a fire-and-forget `try_send`.
    pub async fn dispatch(&self, broadcasts: Vec<PendingBroadcast>) {
        for broadcast in broadcasts {
            let event = Arc::new(broadcast.event);
            match broadcast.target {
                BroadcastTarget::Socket(sid) => {
                    self.send_to(sid, Arc::clone(&event));
                }
                BroadcastTarget::Room { pin, skip } => {
                    let Some(members) = self.room_members.get(&pin) else {
                        continue;
                    };
                    for sid in members.iter() {
                        let sid = *sid;
                        if Some(sid) == skip {
                            continue;
                        }
                        self.send_to(sid, Arc::clone(&event));
                    }
                }
            }
            self.metrics.messages_sent.increment();
        }
    }

    fn send_to(&self, sid: SocketId, event: Arc<ServerEvent>) {
        if let Some(sender) = self.senders.get(&sid) {
            if sender.try_send(event).is_err() {
                trace!(socket = %sid, "dropping broadcast: outbound channel full or closed");
            }
        }
    }
}
