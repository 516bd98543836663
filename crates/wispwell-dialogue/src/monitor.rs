//! Background polling loop for a [`TurnParticipant`].

use std::sync::atomic::Ordering;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use wispwell_core::error::SceneError;

use crate::participant::{TurnParticipant, shutdown_signalled};

/// Handle to a running monitoring loop.
#[derive(Debug)]
pub struct ParticipantHandle {
    identity: String,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ParticipantHandle {
    /// The character whose loop this is.
    #[must_use]
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Signals shutdown and waits for the loop to exit. A line whose post-line
    /// wait is interrupted is not advanced, and the scene state is left as is.
    pub async fn stop(self) {
        // The loop may already have exited and dropped its receivers.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(participant = %self.identity, error = %e, "monitoring task failed");
        }
    }
}

impl TurnParticipant {
    /// Spawns the polling loop. Returns `None`, and logs a warning, if this
    /// participant's loop is already running.
    #[must_use]
    pub fn start_monitoring(&self) -> Option<ParticipantHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(participant = %self.identity, "scene monitoring already running");
            return None;
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let participant = self.clone();
        let task = tokio::spawn(async move {
            participant.poll_loop(shutdown_rx).await;
            participant.running.store(false, Ordering::Release);
        });
        info!(participant = %self.identity, "scene monitoring started");

        Some(ParticipantHandle {
            identity: self.identity.clone(),
            shutdown: shutdown_tx,
            task,
        })
    }

    async fn poll_loop(&self, mut shutdown: watch::Receiver<bool>) {
        let mut consecutive_failures = 0u32;

        while !*shutdown.borrow() {
            // Each tick is its own task so a panic ends the tick, not the loop.
            let participant = self.clone();
            let mut tick_shutdown = shutdown.clone();
            let tick = tokio::spawn(async move { participant.tick(&mut tick_shutdown).await });

            let delay = match tick.await {
                Ok(Ok(outcome)) => {
                    consecutive_failures = 0;
                    debug!(participant = %self.identity, ?outcome, "tick finished");
                    self.settings.poll_interval
                }
                Ok(Err(SceneError::Cancelled)) => break,
                Ok(Err(e)) => {
                    consecutive_failures += 1;
                    if consecutive_failures >= self.settings.failure_threshold {
                        warn!(
                            participant = %self.identity,
                            error = %e,
                            failures = consecutive_failures,
                            "scene state unreadable, backing off"
                        );
                        consecutive_failures = 0;
                        self.settings.error_backoff
                    } else {
                        warn!(participant = %self.identity, error = %e, "scene state poll failed");
                        self.settings.poll_interval
                    }
                }
                Err(e) => {
                    error!(participant = %self.identity, error = %e, "tick panicked");
                    self.settings.poll_interval
                }
            };

            tokio::select! {
                () = tokio::time::sleep(delay) => {}
                () = shutdown_signalled(&mut shutdown) => break,
            }
        }

        info!(participant = %self.identity, "scene monitoring stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicBool;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::json;
    use tokio::time::Instant;
    use wispwell_core::delivery::Delivery;
    use wispwell_core::error::DeliveryError;
    use wispwell_core::repository::SceneStateRepository;
    use wispwell_core::state::{SceneState, StoredState};
    use wispwell_scene::application::coordinator::SceneCoordinator;
    use wispwell_test_support::{
        FixedClock, InMemorySceneDefinitions, InMemorySceneStateRepository, RecordingDelivery,
    };

    use super::*;
    use crate::settings::PollSettings;

    /// Fails every load and records when each one happened.
    #[derive(Default)]
    struct UnreachableStore {
        loads: Mutex<Vec<Instant>>,
    }

    #[async_trait]
    impl SceneStateRepository for UnreachableStore {
        async fn load(&self) -> Result<Option<StoredState>, SceneError> {
            self.loads.lock().unwrap().push(Instant::now());
            Err(SceneError::Io("disk unplugged".into()))
        }

        async fn replace(&self, _: &SceneState, _: Option<u64>) -> Result<u64, SceneError> {
            Err(SceneError::Io("disk unplugged".into()))
        }
    }

    /// Panics on its first delivery, then records like `RecordingDelivery`.
    #[derive(Default)]
    struct FlakyDelivery {
        panicked: AtomicBool,
        inner: RecordingDelivery,
    }

    #[async_trait]
    impl Delivery for FlakyDelivery {
        async fn deliver(&self, speaker: &str, text: &str) -> Result<(), DeliveryError> {
            assert!(self.panicked.swap(true, Ordering::SeqCst), "transport exploded");
            self.inner.deliver(speaker, text).await
        }
    }

    fn coordinator(states: Arc<dyn SceneStateRepository>) -> Arc<SceneCoordinator> {
        coordinator_for(
            states,
            json!({
                "start": { "speaker": "A", "text": "hi", "next": "end" },
                "end": { "speaker": "B", "text": "bye" }
            }),
        )
    }

    fn coordinator_for(
        states: Arc<dyn SceneStateRepository>,
        scene: serde_json::Value,
    ) -> Arc<SceneCoordinator> {
        let defs = InMemorySceneDefinitions::new().with_scene("g.json", scene);
        Arc::new(SceneCoordinator::new(
            Arc::new(defs),
            states,
            Arc::new(FixedClock::morning()),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_participants_play_scene_to_the_end() {
        // Arrange
        let states = Arc::new(InMemorySceneStateRepository::new());
        let coordinator = coordinator(states.clone());
        let delivery = Arc::new(RecordingDelivery::new());
        let a = TurnParticipant::new("A", coordinator.clone(), delivery.clone(), PollSettings::default());
        let b = TurnParticipant::new("B", coordinator.clone(), delivery.clone(), PollSettings::default());
        coordinator.start("g.json", "start").await.unwrap();

        // Act
        let a_handle = a.start_monitoring().unwrap();
        let b_handle = b.start_monitoring().unwrap();
        tokio::time::sleep(Duration::from_secs(15)).await;
        a_handle.stop().await;
        b_handle.stop().await;

        // Assert
        assert_eq!(
            delivery.delivered(),
            vec![
                ("A".to_owned(), "hi".to_owned()),
                ("B".to_owned(), "bye".to_owned()),
            ]
        );
        let state = states.current().unwrap().state;
        assert!(!state.scene_active);
        assert!(state.ended_at.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_during_wait_leaves_scene_untouched() {
        // Arrange
        let states = Arc::new(InMemorySceneStateRepository::new());
        let coordinator = coordinator(states.clone());
        coordinator.start("g.json", "start").await.unwrap();
        let delivery = Arc::new(RecordingDelivery::new());
        let a = TurnParticipant::new("A", coordinator, delivery.clone(), PollSettings::default());

        // Act
        let handle = a.start_monitoring().unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;
        handle.stop().await;

        // Assert
        assert_eq!(delivery.delivered().len(), 1);
        let state = states.current().unwrap().state;
        assert!(state.scene_active);
        assert_eq!(state.current_node.as_deref(), Some("start"));
        assert_eq!(states.writes().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backs_off_after_two_consecutive_poll_failures() {
        // Arrange
        let store = Arc::new(UnreachableStore::default());
        let a = TurnParticipant::new(
            "A",
            coordinator(store.clone()),
            Arc::new(RecordingDelivery::new()),
            PollSettings::default(),
        );
        let started = Instant::now();

        // Act
        let handle = a.start_monitoring().unwrap();
        tokio::time::sleep(Duration::from_secs(17)).await;
        handle.stop().await;

        // Assert
        let offsets: Vec<u64> = store
            .loads
            .lock()
            .unwrap()
            .iter()
            .map(|at| at.duration_since(started).as_secs())
            .collect();
        assert_eq!(offsets, vec![0, 3, 8, 11, 16]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_tick_does_not_end_the_loop() {
        // Arrange
        let states = Arc::new(InMemorySceneStateRepository::new());
        let coordinator = coordinator(states.clone());
        coordinator.start("g.json", "start").await.unwrap();
        let delivery = Arc::new(FlakyDelivery::default());
        let a = TurnParticipant::new("A", coordinator, delivery.clone(), PollSettings::default());

        // Act
        let handle = a.start_monitoring().unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.stop().await;

        // Assert
        assert_eq!(delivery.inner.delivered(), vec![("A".to_owned(), "hi".to_owned())]);
        let state = states.current().unwrap().state;
        assert_eq!(state.next_speaker.as_deref(), Some("B"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_beyond_duration_range_speaks_once_and_holds_the_turn() {
        // Arrange
        let states = Arc::new(InMemorySceneStateRepository::new());
        let coordinator = coordinator_for(
            states.clone(),
            json!({
                "start": { "speaker": "A", "text": "hi", "wait": 1e20, "next": "end" },
                "end": { "speaker": "B", "text": "bye" }
            }),
        );
        coordinator.start("g.json", "start").await.unwrap();
        let delivery = Arc::new(RecordingDelivery::new());
        let a = TurnParticipant::new("A", coordinator, delivery.clone(), PollSettings::default());

        // Act
        let handle = a.start_monitoring().unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
        handle.stop().await;

        // Assert
        assert_eq!(delivery.delivered(), vec![("A".to_owned(), "hi".to_owned())]);
        let state = states.current().unwrap().state;
        assert!(state.scene_active);
        assert_eq!(state.current_node.as_deref(), Some("start"));
    }

    #[tokio::test]
    async fn test_second_start_is_refused_until_stopped() {
        let a = TurnParticipant::new(
            "A",
            coordinator(Arc::new(InMemorySceneStateRepository::new())),
            Arc::new(RecordingDelivery::new()),
            PollSettings::default(),
        );

        let first = a.start_monitoring().unwrap();
        assert!(a.clone().start_monitoring().is_none());
        first.stop().await;

        let again = a.start_monitoring();
        assert!(again.is_some());
        if let Some(handle) = again {
            handle.stop().await;
        }
    }
}
