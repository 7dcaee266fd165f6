//! Timer Supervisor (C4): one cancellable countdown task per active room.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::dispatch::EventDispatcher;
use crate::metrics::Metrics;

use super::registry::RoomRegistry;
use super::types::{Pin, RoomStatus};

struct TimerHandle {
    cancel: Arc<Notify>,
    task: JoinHandle<()>,
}

pub struct TimerSupervisor {
    registry: Arc<RoomRegistry>,
    dispatcher: Arc<EventDispatcher>,
    metrics: Arc<Metrics>,
    handles: Mutex<HashMap<Pin, TimerHandle>>,
}

impl TimerSupervisor {
    pub fn new(
        registry: Arc<RoomRegistry>,
        dispatcher: Arc<EventDispatcher>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            registry,
            dispatcher,
            metrics,
            handles: Mutex::new(HashMap::new()),
        }
    }

    /// Cancels any running task for `pin` (awaiting its termination) and starts a fresh one.
    pub async fn restart(&self, pin: Pin) {
        self.cancel(&pin).await;

        let cancel_signal = Arc::new(Notify::new());
        let task = tokio::spawn(run_countdown(
            pin.clone(),
            Arc::clone(&self.registry),
            Arc::clone(&self.dispatcher),
            Arc::clone(&self.metrics),
            Arc::clone(&cancel_signal),
        ));

        let mut handles = self.handles.lock().await;
        handles.insert(
            pin,
            TimerHandle {
                cancel: cancel_signal,
                task,
            },
        );
    }

    /// Cancels and removes the task for `pin`, if any, awaiting its termination.
    pub async fn cancel(&self, pin: &Pin) {
        let existing = self.handles.lock().await.remove(pin);
        if let Some(handle) = existing {
            handle.cancel.notify_waiters();
            if let Err(err) = handle.task.await {
                if !err.is_cancelled() {
                    warn!(pin = %pin, error = %err, "timer task panicked");
                }
            }
        }
    }

    /// Cancels every running timer task, used during graceful shutdown.
    pub async fn cancel_all(&self) {
        let pins: Vec<Pin> = self.handles.lock().await.keys().cloned().collect();
        for pin in pins {
            self.cancel(&pin).await;
        }
    }
}

async fn run_countdown(
    pin: Pin,
    registry: Arc<RoomRegistry>,
    dispatcher: Arc<EventDispatcher>,
    metrics: Arc<Metrics>,
    cancel: Arc<Notify>,
) {
    loop {
        let room = match registry.get_room(&pin).await {
            Ok(room) => room,
            Err(_) => return,
        };
        match &room.game_info {
            Some(info) if info.status == RoomStatus::Active => {}
            _ => return,
        }

        tokio::select! {
            _ = cancel.notified() => {
                debug!(pin = %pin, "timer task cancelled");
                return;
            }
            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
        }

        let (snapshot, counter) = match registry.tick_timer(&pin).await {
            Ok(result) => result,
            Err(_) => return,
        };
        if !matches!(snapshot.status, RoomStatus::Active) {
            return;
        }
        metrics.timer_ticks.increment();
        dispatcher
            .dispatch(vec![super::events::PendingBroadcast::to_room(
                pin.clone(),
                super::events::ServerEvent::TimerTick { counter },
            )])
            .await;

        if counter > 0 {
            continue;
        }

        {
            dispatcher
                .dispatch(vec![super::events::PendingBroadcast::to_room(
                    pin.clone(),
                    super::events::ServerEvent::TimerEnd { counter: 0 },
                )])
                .await;

            let (_, broadcasts, finished) = match registry.handle_timer_end(&pin).await {
                Ok(result) => result,
                Err(_) => return,
            };
            dispatcher.dispatch(broadcasts).await;
            if finished {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::registry::DraftQuestion;
    use crate::engine::types::ParticipantId;
    use crate::metrics::Metrics;

    fn draft_questions(n: usize) -> Vec<DraftQuestion> {
        (0..n)
            .map(|i| DraftQuestion {
                text: format!("q{i}"),
                options: ["a".into(), "b".into(), "c".into(), "d".into()],
                correct_option: 0,
            })
            .collect()
    }

    async fn active_room(timer_seconds: u32) -> (Arc<RoomRegistry>, Pin) {
        let registry = Arc::new(RoomRegistry::new());
        let (room, host_id) = registry
            .create_room("Alice".into(), "geography".into(), 5, 10, timer_seconds)
            .await
            .unwrap();
        let pin = Pin::normalize(&room.pin);
        let host_id = ParticipantId::from_raw(host_id);
        registry.join_room(&pin, "Bob".into()).await.unwrap();
        registry
            .apply_start_game(&pin, &host_id, draft_questions(10))
            .await
            .unwrap();
        (registry, pin)
    }

    #[tokio::test]
    async fn restart_twice_in_quick_succession_leaves_one_live_task() {
        let (registry, pin) = active_room(30).await;
        let metrics = Arc::new(Metrics::new());
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&metrics)));
        let timers = TimerSupervisor::new(Arc::clone(&registry), dispatcher, metrics);

        timers.restart(pin.clone()).await;
        timers.restart(pin.clone()).await;

        assert_eq!(timers.handles.lock().await.len(), 1);
        timers.cancel_all().await;
    }

    #[tokio::test]
    async fn unanswered_question_times_out_and_advances() {
        let (registry, pin) = active_room(1).await;
        let metrics = Arc::new(Metrics::new());
        let dispatcher = Arc::new(EventDispatcher::new(Arc::clone(&metrics)));
        let timers = TimerSupervisor::new(Arc::clone(&registry), dispatcher, metrics);

        timers.restart(pin.clone()).await;
        tokio::time::sleep(Duration::from_millis(1_300)).await;

        let room = registry.get_room(&pin).await.unwrap();
        let info = room.game_info.unwrap();
        assert_eq!(info.active_question_index, 1);
        assert_eq!(info.questions[0].answer_status, Some(super::super::types::AnswerStatus::Incorrect));
        assert_eq!(info.scores_red + info.scores_blue, 0);

        timers.cancel_all().await;
    }
}
