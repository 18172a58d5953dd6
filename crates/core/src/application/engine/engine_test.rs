//! Unit tests for the queue engine against an in-memory fake store

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::domain::{Participant, Queue, StartOutcome, ToggleOutcome};
    use crate::port::QueueStore;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeStore {
        queues: Mutex<HashMap<String, Queue>>,
        advance_calls: AtomicUsize,
        delay: Option<Duration>,
    }

    impl FakeStore {
        fn slow(delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Default::default()
            }
        }

        fn corrupt(&self, queue_id: &str, members: Vec<Participant>) {
            let mut queues = self.queues.lock().unwrap();
            queues.get_mut(queue_id).unwrap().members = members;
        }

        async fn pause(&self) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
        }

        fn with_queue<T>(&self, queue_id: &str, f: impl FnOnce(&mut Queue) -> T) -> Result<T> {
            let mut queues = self.queues.lock().unwrap();
            queues
                .get_mut(queue_id)
                .map(f)
                .ok_or_else(|| AppError::queue_not_found(queue_id))
        }
    }

    #[async_trait]
    impl QueueStore for FakeStore {
        async fn create(&self, queue_id: &str, description: &str) -> Result<()> {
            self.pause().await;
            let mut queues = self.queues.lock().unwrap();
            if queues.contains_key(queue_id) {
                return Err(AppError::Conflict(format!("Queue {} exists", queue_id)));
            }
            queues.insert(queue_id.to_string(), Queue::new(queue_id, description));
            Ok(())
        }

        async fn toggle_membership(
            &self,
            queue_id: &str,
            participant: &Participant,
        ) -> Result<ToggleOutcome> {
            self.with_queue(queue_id, |queue| {
                if let Some(pos) = queue.members.iter().position(|m| m.id == participant.id) {
                    queue.members.remove(pos);
                    if pos < queue.cursor {
                        queue.cursor -= 1;
                    }
                    queue.cursor = queue.cursor.min(queue.members.len());
                    ToggleOutcome::Removed
                } else {
                    queue.members.push(participant.clone());
                    ToggleOutcome::Added
                }
            })
        }

        async fn snapshot(&self, queue_id: &str) -> Result<Queue> {
            self.with_queue(queue_id, |queue| queue.clone())
        }

        async fn start(&self, queue_id: &str, shuffle: bool) -> Result<StartOutcome> {
            self.with_queue(queue_id, |queue| {
                if queue.started {
                    return StartOutcome::AlreadyStarted;
                }
                if shuffle {
                    queue.members.reverse();
                }
                queue.started = true;
                queue.cursor = 0;
                StartOutcome::Started
            })
        }

        async fn advance(&self, queue_id: &str) -> Result<usize> {
            self.advance_calls.fetch_add(1, Ordering::SeqCst);
            self.with_queue(queue_id, |queue| {
                if queue.cursor < queue.members.len() {
                    queue.cursor += 1;
                }
                queue.cursor
            })
        }

        async fn reset(&self, queue_id: &str) -> Result<()> {
            self.with_queue(queue_id, |queue| {
                queue.cursor = 0;
                queue.started = false;
            })
        }

        async fn finish(&self, queue_id: &str) -> Result<()> {
            self.queues
                .lock()
                .unwrap()
                .remove(queue_id)
                .map(|_| ())
                .ok_or_else(|| AppError::queue_not_found(queue_id))
        }

        async fn close(&self) -> Result<()> {
            Ok(())
        }
    }

    fn engine_with(store: Arc<FakeStore>, config: EngineConfig) -> QueueEngine {
        QueueEngine::new(store, config)
    }

    fn engine() -> (QueueEngine, Arc<FakeStore>) {
        let store = Arc::new(FakeStore::default());
        (engine_with(store.clone(), EngineConfig::default()), store)
    }

    fn alice() -> Participant {
        Participant::new(1, "Alice")
    }

    fn bob() -> Participant {
        Participant::new(2, "Bob")
    }

    fn carol() -> Participant {
        Participant::new(3, "Carol")
    }

    async fn started_queue_of_three(engine: &QueueEngine) {
        engine.create("m1", "Lunch").await.unwrap();
        for p in [alice(), bob(), carol()] {
            engine.toggle("m1", &p).await.unwrap();
        }
        engine.start("m1", false).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_returns_empty_collecting_queue() {
        let (engine, _) = engine();
        let queue = engine.create("m1", "Lunch").await.unwrap();

        assert_eq!(queue.description, "Lunch");
        assert!(queue.members.is_empty());
        assert_eq!(queue.cursor, 0);
        assert!(!queue.started);
    }

    #[tokio::test]
    async fn test_create_twice_conflicts() {
        let (engine, _) = engine();
        engine.create("m1", "Lunch").await.unwrap();
        let err = engine.create("m1", "Dinner").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_create_truncates_long_description() {
        let (engine, _) = engine();
        let queue = engine.create("m1", &"a".repeat(250)).await.unwrap();
        assert_eq!(queue.description.chars().count(), 100);
    }

    #[tokio::test]
    async fn test_invalid_queue_id_rejected_before_store() {
        let (engine, store) = engine();
        let err = engine.create("", "Lunch").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(store.queues.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_toggle_join_join_leave() {
        let (engine, _) = engine();
        engine.create("m1", "Lunch").await.unwrap();

        let first = engine.toggle("m1", &alice()).await.unwrap().found().unwrap();
        assert_eq!(first.outcome, ToggleOutcome::Added);
        engine.toggle("m1", &bob()).await.unwrap();
        let last = engine.toggle("m1", &alice()).await.unwrap().found().unwrap();

        assert_eq!(last.outcome, ToggleOutcome::Removed);
        assert_eq!(last.queue.members, vec![bob()]);
    }

    #[tokio::test]
    async fn test_toggle_missing_queue_is_typed() {
        let (engine, _) = engine();
        let result = engine.toggle("gone", &alice()).await.unwrap();
        assert!(result.is_missing());
    }

    #[tokio::test]
    async fn test_start_in_order_then_iterate_to_exhaustion() {
        let (engine, _) = engine();
        started_queue_of_three(&engine).await;

        let snapshot = engine.snapshot("m1").await.unwrap().found().unwrap();
        assert_eq!(snapshot.cursor, 0);
        assert_eq!(snapshot.members, vec![alice(), bob(), carol()]);
        assert_eq!(snapshot.current(), Some(&alice()));

        let step1 = engine.next("m1").await.unwrap().found().unwrap();
        assert!(matches!(&step1, NextStep::Current { participant, .. } if *participant == bob()));

        let step2 = engine.next("m1").await.unwrap().found().unwrap();
        assert!(matches!(&step2, NextStep::Current { participant, .. } if *participant == carol()));

        let step3 = engine.next("m1").await.unwrap().found().unwrap();
        assert!(step3.is_exhausted());
        assert_eq!(step3.queue().cursor, 3);
    }

    #[tokio::test]
    async fn test_next_after_exhausted_does_not_advance() {
        let (engine, store) = engine();
        started_queue_of_three(&engine).await;

        for _ in 0..3 {
            engine.next("m1").await.unwrap();
        }
        assert_eq!(store.advance_calls.load(Ordering::SeqCst), 3);

        let again = engine.next("m1").await.unwrap().found().unwrap();
        assert!(again.is_exhausted());
        assert_eq!(again.queue().cursor, 3);
        assert_eq!(store.advance_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_next_while_collecting_is_invalid() {
        let (engine, store) = engine();
        engine.create("m1", "Lunch").await.unwrap();
        engine.toggle("m1", &alice()).await.unwrap();

        let err = engine.next("m1").await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Domain(DomainError::InvalidStateTransition { .. })
        ));
        assert_eq!(store.advance_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_start_twice_is_benign() {
        let (engine, _) = engine();
        engine.create("m1", "Lunch").await.unwrap();
        for p in [alice(), bob(), carol()] {
            engine.toggle("m1", &p).await.unwrap();
        }

        let first = engine.start("m1", true).await.unwrap().found().unwrap();
        assert_eq!(first.outcome, StartOutcome::Started);

        let second = engine.start("m1", true).await.unwrap().found().unwrap();
        assert_eq!(second.outcome, StartOutcome::AlreadyStarted);
        assert_eq!(second.queue.members, first.queue.members);
    }

    #[tokio::test]
    async fn test_concurrent_starts_have_one_winner() {
        let (engine, _) = engine();
        engine.create("m1", "Lunch").await.unwrap();
        engine.toggle("m1", &alice()).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine.start("m1", false).await.unwrap().found().unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            let report = handle.await.unwrap();
            assert!(report.queue.started);
            if report.outcome == StartOutcome::Started {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_go_to_menu_returns_to_collecting() {
        let (engine, _) = engine();
        started_queue_of_three(&engine).await;
        engine.next("m1").await.unwrap();

        let queue = engine.go_to_menu("m1").await.unwrap().found().unwrap();
        assert_eq!(queue.phase(), QueuePhase::Collecting);
        assert_eq!(queue.cursor, 0);
        assert_eq!(queue.len(), 3);

        let restarted = engine.start("m1", false).await.unwrap().found().unwrap();
        assert_eq!(restarted.outcome, StartOutcome::Started);
    }

    #[tokio::test]
    async fn test_finish_then_finish_again() {
        let (engine, _) = engine();
        engine.create("m1", "Lunch").await.unwrap();

        assert_eq!(engine.finish("m1").await.unwrap(), Lookup::Found(()));
        assert!(engine.finish("m1").await.unwrap().is_missing());
        assert!(engine.snapshot("m1").await.unwrap().is_missing());

        // id is free for an unrelated queue
        let reused = engine.create("m1", "Dinner").await.unwrap();
        assert_eq!(reused.description, "Dinner");
    }

    #[tokio::test]
    async fn test_late_join_appends_by_default() {
        let (engine, _) = engine();
        started_queue_of_three(&engine).await;

        let dave = Participant::new(4, "Dave");
        let change = engine.toggle("m1", &dave).await.unwrap().found().unwrap();
        assert_eq!(change.outcome, ToggleOutcome::Added);
        assert_eq!(change.queue.members.last(), Some(&dave));
    }

    #[tokio::test]
    async fn test_late_join_reject_policy() {
        let store = Arc::new(FakeStore::default());
        let engine = engine_with(
            store,
            EngineConfig {
                late_join: LateJoinPolicy::Reject,
                ..Default::default()
            },
        );
        started_queue_of_three(&engine).await;

        let err = engine
            .toggle("m1", &Participant::new(4, "Dave"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // leaving is always allowed
        let change = engine.toggle("m1", &bob()).await.unwrap().found().unwrap();
        assert_eq!(change.outcome, ToggleOutcome::Removed);
    }

    #[tokio::test]
    async fn test_slow_store_times_out() {
        let store = Arc::new(FakeStore::slow(Duration::from_millis(200)));
        let engine = engine_with(store, EngineConfig::default())
            .with_timeout(Duration::from_millis(20));

        let err = engine.create("m1", "Lunch").await.unwrap_err();
        assert!(matches!(err, AppError::Timeout(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_invariant_violation_surfaces() {
        let (engine, store) = engine();
        engine.create("m1", "Lunch").await.unwrap();
        store.corrupt("m1", vec![alice(), alice()]);

        let err = engine.snapshot("m1").await.unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation(_)));
        assert!(!err.is_retryable());
    }
}
