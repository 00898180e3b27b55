//! Integration tests for the Retry Policy
//!
//! Backoff timing runs on tokio's paused clock, so delays are measured in
//! virtual time.

use atelier::error::GenerationError;
use atelier::retry::{RetryConfig, RetryPolicy};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_backoff_doubles_between_attempts() {
    let policy = RetryPolicy::from(&RetryConfig::default());
    let attempts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let recorded = attempts.clone();
    let value = policy
        .run("synthesize_image", move || {
            let recorded = recorded.clone();
            async move {
                let mut times = recorded.lock();
                times.push(Instant::now());
                if times.len() < 3 {
                    Err(GenerationError::Remote("503 Service Unavailable".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await
        .unwrap();

    assert_eq!(value, 42);
    let times = attempts.lock().clone();
    assert_eq!(times.len(), 3);
    assert!(times[1] - times[0] >= Duration::from_millis(1000));
    assert!(times[2] - times[1] >= Duration::from_millis(2000));
    assert!(times[2] - times[1] < Duration::from_millis(4000));
}

#[tokio::test(start_paused = true)]
async fn test_sleeps_follow_delay_for_retry() {
    let policy = RetryPolicy::new(3, Duration::from_millis(250));
    let attempts: Arc<Mutex<Vec<Instant>>> = Arc::new(Mutex::new(Vec::new()));

    let recorded = attempts.clone();
    let outcome: Result<(), GenerationError> = policy
        .run("synthesize_commentary", move || {
            let recorded = recorded.clone();
            async move {
                recorded.lock().push(Instant::now());
                Err(GenerationError::Remote("timeout".to_string()))
            }
        })
        .await;

    assert!(matches!(outcome, Err(GenerationError::TransientFailure { attempts: 4, .. })));
    let times = attempts.lock().clone();
    for retry in 1..times.len() {
        let gap = times[retry] - times[retry - 1];
        let expected = policy.delay_for_retry(retry);
        assert!(gap >= expected, "retry {} waited {:?}", retry, gap);
        assert!(gap < expected * 2, "retry {} waited {:?}", retry, gap);
    }
}

#[tokio::test(start_paused = true)]
async fn test_moderation_is_never_retried() {
    let policy = RetryPolicy::default();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let started = Instant::now();
    let err = policy
        .run("synthesize_commentary", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GenerationError::Remote(
                    "Candidate blocked: finishReason SAFETY".to_string(),
                ))
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, GenerationError::ModeratedContent(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(started.elapsed(), Duration::ZERO);
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_reports_attempts() {
    let policy = RetryPolicy::new(3, Duration::from_millis(1000));
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let started = Instant::now();
    let err = policy
        .run("synthesize_image", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GenerationError::Remote("connection reset".to_string()))
            }
        })
        .await
        .unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    match err {
        GenerationError::TransientFailure { attempts, message } => {
            assert_eq!(attempts, 4);
            assert!(message.contains("connection reset"));
        }
        other => panic!("expected TransientFailure, got {:?}", other),
    }
    // 1s + 2s + 4s of backoff
    assert!(started.elapsed() >= Duration::from_millis(7000));
}

#[tokio::test(start_paused = true)]
async fn test_client_errors_fail_immediately_except_rate_limits() {
    let policy = RetryPolicy::default();

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let err = policy
        .run("synthesize_image", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GenerationError::ClientError {
                    status: 401,
                    message: "API key not valid".to_string(),
                })
            }
        })
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::ClientError { status: 401, .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let value = policy
        .run("synthesize_image", move || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(GenerationError::ClientError {
                        status: 429,
                        message: "Resource exhausted".to_string(),
                    })
                } else {
                    Ok("ok")
                }
            }
        })
        .await
        .unwrap();
    assert_eq!(value, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_zero_retries_means_single_attempt() {
    let policy = RetryPolicy::new(0, Duration::from_millis(1000));
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let err = policy
        .run("synthesize_image", move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(GenerationError::Remote("timeout".to_string()))
            }
        })
        .await
        .unwrap_err();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(err, GenerationError::TransientFailure { attempts: 1, .. }));
}
