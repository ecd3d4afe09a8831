//! Pool protocol scenarios: admission control under contention and
//! parallel dispatch across engines.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use mlgrid_core::{Endpoint, EngineState};
use mlgrid_engine::{Engine, PythonLauncher};
use mlgrid_orchestrator::{Orchestrator, OrchestratorError};

fn idle_engine(port: u16) -> Arc<Engine> {
    let engine = Engine::new(
        Endpoint::new("127.0.0.1", port),
        Arc::new(PythonLauncher),
        PathBuf::from("/tmp"),
        PathBuf::from("/tmp"),
        Duration::from_secs(3),
    );
    engine.mark_idle();
    engine
}

async fn wait_for<F: Fn() -> bool>(condition: F, what: &str) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// Pool of 2, 3 concurrent one-shots: exactly 2 run, the 3rd is rejected,
/// and a 4th succeeds once an in-flight call finishes.
#[tokio::test]
async fn admission_control_over_a_pool_of_two() {
    let orchestrator = Arc::new(Orchestrator::new(vec![
        idle_engine(6766),
        idle_engine(6767),
    ]));
    let gate = Arc::new(Notify::new());

    let mut in_flight = Vec::new();
    for _ in 0..2 {
        let orchestrator = Arc::clone(&orchestrator);
        let gate = Arc::clone(&gate);
        in_flight.push(tokio::spawn(async move {
            orchestrator
                .run_on_engine(
                    move |_| async move {
                        gate.notified().await;
                        Ok(())
                    },
                    "time-series-forecast",
                )
                .await
        }));
    }

    // Both engines must be mid-call before the third attempt.
    wait_for(
        || {
            orchestrator
                .engines()
                .iter()
                .all(|engine| engine.state() == EngineState::Computing)
        },
        "both engines computing",
    )
    .await;

    let rejected = orchestrator
        .run_on_engine(|_| async { Ok(()) }, "time-series-predict")
        .await
        .unwrap_err();
    assert!(matches!(rejected, OrchestratorError::NoAvailableEngine(_)));
    assert!(rejected.to_string().contains("try again later"));

    // Let one call finish; capacity frees up for a fourth.
    gate.notify_one();
    gate.notify_one();
    for handle in in_flight {
        handle.await.unwrap().unwrap();
    }

    orchestrator
        .run_on_engine(|_| async { Ok(()) }, "time-series-predict")
        .await
        .unwrap();
    assert!(orchestrator.requests().is_empty());
}

/// A hanging call on one engine must not block booking, dispatch, or
/// release on another.
#[tokio::test]
async fn one_hanging_engine_does_not_block_the_other() {
    let orchestrator = Arc::new(Orchestrator::new(vec![
        idle_engine(6766),
        idle_engine(6767),
    ]));
    let hang = Arc::new(Notify::new());

    let hanging = {
        let orchestrator = Arc::clone(&orchestrator);
        let hang = Arc::clone(&hang);
        tokio::spawn(async move {
            orchestrator
                .run_on_engine(
                    move |_| async move {
                        hang.notified().await;
                        Ok(())
                    },
                    "time-series-forecast",
                )
                .await
        })
    };

    wait_for(
        || {
            orchestrator
                .engines()
                .iter()
                .any(|engine| engine.state() == EngineState::Computing)
        },
        "first engine computing",
    )
    .await;

    // A full session runs on the second engine while the first hangs.
    let id = orchestrator.book_engine("decision-tree-start").await.unwrap();
    orchestrator
        .run_on_booked_engine(id, |_| async { Ok(()) }, "decision-tree-start")
        .await
        .unwrap();
    orchestrator
        .run_on_booked_engine(id, |_| async { Ok(()) }, "decision-tree-data")
        .await
        .unwrap();
    orchestrator
        .release_engine(id, "decision-tree-predict")
        .await
        .unwrap();

    hang.notify_one();
    hanging.await.unwrap().unwrap();
    assert!(
        orchestrator
            .engines()
            .iter()
            .all(|engine| engine.state() == EngineState::Idle)
    );
}

/// Duplicate dispatches against one engine serialize instead of failing.
#[tokio::test]
async fn same_engine_calls_serialize() {
    let orchestrator = Arc::new(Orchestrator::new(vec![idle_engine(6766)]));
    let id = orchestrator.book_engine("decision-tree-data").await.unwrap();

    let first_entered = Arc::new(Notify::new());
    let first_release = Arc::new(Notify::new());

    let first = {
        let orchestrator = Arc::clone(&orchestrator);
        let entered = Arc::clone(&first_entered);
        let release = Arc::clone(&first_release);
        tokio::spawn(async move {
            orchestrator
                .run_on_booked_engine(
                    id,
                    move |_| async move {
                        entered.notify_one();
                        release.notified().await;
                        Ok(1)
                    },
                    "decision-tree-data",
                )
                .await
        })
    };

    first_entered.notified().await;

    // Second call against the same booked engine: must wait, not error.
    let second = {
        let orchestrator = Arc::clone(&orchestrator);
        tokio::spawn(async move {
            orchestrator
                .run_on_booked_engine(id, |_| async { Ok(2) }, "decision-tree-data")
                .await
        })
    };

    // The second dispatch cannot have run yet.
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!second.is_finished());

    first_release.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), 1);
    assert_eq!(second.await.unwrap().unwrap(), 2);
}
