// ABOUTME: Tests for the fan-out executor policies and worker behavior.
// ABOUTME: Covers isolation, full drain, ordering, limits and hung tasks.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{FanOutBatch, FanOutExecutor, FanOutPolicy};
use crate::config::FanOutConfig;
use crate::error::FanOutError;

fn batch_with_failure(completed: Arc<AtomicUsize>) -> FanOutBatch<String> {
    FanOutBatch::for_targets(["1a", "2b", "3c"], move |ant| {
        let completed = completed.clone();
        async move {
            if ant == "2b" {
                completed.fetch_add(1, Ordering::SeqCst);
                anyhow::bail!("atten {} returned: ERROR", ant);
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
            completed.fetch_add(1, Ordering::SeqCst);
            anyhow::Ok(format!("{} set", ant))
        }
    })
}

#[tokio::test]
async fn test_collect_all_isolates_failed_task() {
    let executor = FanOutExecutor::default();
    let completed = Arc::new(AtomicUsize::new(0));

    let report = executor
        .collect_all(batch_with_failure(completed.clone()))
        .await
        .unwrap();

    assert_eq!(report.len(), 3);
    assert_eq!(report.get("1a").unwrap().as_ref().unwrap(), "1a set");
    assert_eq!(report.get("3c").unwrap().as_ref().unwrap(), "3c set");

    let err = report.get("2b").unwrap().as_ref().unwrap_err();
    assert_eq!(err.target, "2b");
    assert!(err.to_string().contains("ERROR"));

    assert!(!report.is_all_ok());
    assert_eq!(report.successes().count(), 2);
    assert_eq!(report.failures().count(), 1);
    assert_eq!(completed.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_collect_all_keeps_submission_order() {
    let executor = FanOutExecutor::default();
    let batch = FanOutBatch::new()
        .task("3c", async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            anyhow::Ok(3)
        })
        .task("1a", async { anyhow::Ok(1) })
        .task("2b", async {
            tokio::time::sleep(Duration::from_millis(10)).await;
            anyhow::Ok(2)
        });

    let report = executor.collect_all(batch).await.unwrap();
    let targets: Vec<_> = report.outcomes().iter().map(|o| o.target.as_str()).collect();
    assert_eq!(targets, vec!["3c", "1a", "2b"]);
}

#[tokio::test]
async fn test_fail_fast_raises_only_after_all_tasks_finish() {
    let executor = FanOutExecutor::default();
    let completed = Arc::new(AtomicUsize::new(0));

    let err = executor
        .fail_fast(batch_with_failure(completed.clone()))
        .await
        .unwrap_err();

    // The slow siblings of the failing task still ran to completion.
    assert_eq!(completed.load(Ordering::SeqCst), 3);
    match err {
        FanOutError::Task(task_err) => assert_eq!(task_err.target, "2b"),
        other => panic!("Expected Task error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fail_fast_returns_values_when_all_succeed() {
    let executor = FanOutExecutor::default();
    let batch = FanOutBatch::for_targets(["1a", "2b"], |ant| async move { anyhow::Ok(ant.len()) });

    let values = executor.fail_fast(batch).await.unwrap();
    assert_eq!(values, vec![("1a".to_string(), 2), ("2b".to_string(), 2)]);
}

#[tokio::test]
async fn test_fail_fast_reports_first_error_in_submission_order() {
    let executor = FanOutExecutor::default();
    let batch: FanOutBatch<()> = FanOutBatch::new()
        .task("1a", async {
            tokio::time::sleep(Duration::from_millis(30)).await;
            anyhow::bail!("slow failure")
        })
        .task("2b", async { anyhow::bail!("fast failure") });

    let err = executor.fail_fast(batch).await.unwrap_err();
    assert!(err.to_string().contains("1a"));
    assert!(err.to_string().contains("slow failure"));
}

#[tokio::test]
async fn test_run_dispatches_on_policy() {
    let executor = FanOutExecutor::default();

    let report = executor
        .run(batch_with_failure(Arc::default()), FanOutPolicy::CollectAll)
        .await
        .unwrap();
    assert_eq!(report.len(), 3);

    let result = executor
        .run(batch_with_failure(Arc::default()), FanOutPolicy::FailFast)
        .await;
    assert!(matches!(result, Err(FanOutError::Task(_))));
}

#[tokio::test]
async fn test_empty_batch_spawns_no_workers() {
    let executor = FanOutExecutor::default();

    let report = executor
        .collect_all(FanOutBatch::<()>::new())
        .await
        .unwrap();
    assert!(report.is_empty());

    let values = executor.fail_fast(FanOutBatch::<()>::new()).await.unwrap();
    assert!(values.is_empty());

    assert_eq!(executor.spawned_workers(), 0);
}

#[tokio::test]
async fn test_one_worker_per_task() {
    let executor = FanOutExecutor::default();
    // Every task waits for all of its siblings, so this only completes if
    // all of them are running at once.
    let barrier = Arc::new(tokio::sync::Barrier::new(4));
    let batch = FanOutBatch::for_targets(["1a", "1c", "2h", "4j"], |_| {
        let barrier = barrier.clone();
        async move {
            barrier.wait().await;
            anyhow::Ok(())
        }
    });

    let values = executor.fail_fast(batch).await.unwrap();
    assert_eq!(values.len(), 4);
    assert_eq!(executor.spawned_workers(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_tasks_overlap_on_multi_thread_runtime() {
    let executor = FanOutExecutor::default();
    let batch = FanOutBatch::for_targets(["1a", "1c", "2h"], |_| async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        anyhow::Ok(())
    });

    let started = std::time::Instant::now();
    executor.fail_fast(batch).await.unwrap();
    assert!(started.elapsed() < Duration::from_millis(290));
}

#[tokio::test]
async fn test_panicking_task_is_captured_in_its_slot() {
    let executor = FanOutExecutor::default();
    let batch = FanOutBatch::for_targets(["1a", "2b"], |ant| async move {
        if ant == "2b" {
            panic!("driver crashed");
        }
        anyhow::Ok(ant)
    });

    let report = executor.collect_all(batch).await.unwrap();
    assert!(report.get("1a").unwrap().is_ok());
    assert!(report.get("2b").unwrap().is_err());
}

#[tokio::test]
async fn test_oversized_batch_is_rejected_before_spawning() {
    let executor = FanOutExecutor::new(&FanOutConfig { max_batch_size: 2 });
    let batch = FanOutBatch::for_targets(["1a", "2b", "3c"], |_| async { anyhow::Ok(()) });

    let err = executor.collect_all(batch).await.unwrap_err();
    assert!(matches!(err, FanOutError::BatchTooLarge { size: 3, limit: 2 }));
    assert_eq!(executor.spawned_workers(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hung_task_blocks_fail_fast_return() {
    let executor = FanOutExecutor::default();
    let batch: FanOutBatch<()> = FanOutBatch::new()
        .task("1a", async {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            anyhow::Ok(())
        })
        .task("2b", async { anyhow::bail!("rejected") });

    // No deadline is imposed by the executor: the failure of "2b" is not
    // reported while "1a" is still hanging.
    let waited = tokio::time::timeout(Duration::from_secs(60), executor.fail_fast(batch)).await;
    assert!(waited.is_err());
}
