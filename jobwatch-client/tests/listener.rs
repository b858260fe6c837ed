//! End-to-end tests for the status listener.
//!
//! Each test mounts the mock job service in-process on an ephemeral port
//! and drives the client over real HTTP and a real status stream.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};

use jobwatch_client::{BackendMode, ClientError, JobWatcher, WatcherConfig};
use jobwatch_server::JobStore;

/// Upper bound for anything that is expected to finish.
const WAIT_BUDGET: Duration = Duration::from_secs(5);

async fn spawn_service(job_duration: Duration) -> (String, JoinHandle<()>) {
    let store = Arc::new(JobStore::new(job_duration));
    let app = jobwatch_server::create_router(store);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{addr}"), server)
}

fn poll_config(url: &str) -> WatcherConfig {
    WatcherConfig::new(url)
        .with_mode(BackendMode::Poll)
        .with_poll_interval(Duration::from_millis(50))
}

fn push_config(url: &str) -> WatcherConfig {
    WatcherConfig::new(url).with_mode(BackendMode::Push)
}

async fn sever_streams(url: &str) {
    let response = reqwest::Client::new()
        .post(format!("{url}/admin/disconnect"))
        .send()
        .await
        .unwrap();
    assert!(response.status().is_success());
}

#[tokio::test]
async fn created_job_is_pending_then_completed() {
    let (url, server) = spawn_service(Duration::from_millis(200)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    let id = watcher.create().await.unwrap();
    assert_eq!(watcher.client().fetch_status(id).await.unwrap(), "pending");

    sleep(Duration::from_millis(300)).await;
    assert_eq!(
        watcher.client().fetch_status(id).await.unwrap(),
        "completed"
    );

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn poll_wait_resolves_on_completion() {
    let (url, server) = spawn_service(Duration::from_millis(200)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    let id = watcher.create().await.unwrap();
    timeout(WAIT_BUDGET, watcher.wait_for_job(id))
        .await
        .expect("wait should finish within the budget")
        .unwrap();

    // The wait released its own subscription.
    assert!(watcher.jobs().await.unwrap().is_empty());

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn push_wait_resolves_on_completion() {
    let (url, server) = spawn_service(Duration::from_millis(500)).await;
    let watcher = JobWatcher::new(push_config(&url)).unwrap();
    assert_eq!(watcher.mode().await.unwrap(), BackendMode::Push);

    // Give the stream a moment to connect before the completion event is
    // scheduled; missed push events are not replayed.
    sleep(Duration::from_millis(150)).await;

    let id = watcher.create().await.unwrap();
    timeout(WAIT_BUDGET, watcher.wait_for_job(id))
        .await
        .expect("wait should finish within the budget")
        .unwrap();

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn auto_mode_resolves_to_push() {
    let (url, server) = spawn_service(Duration::from_millis(200)).await;
    let watcher = JobWatcher::new(WatcherConfig::new(&url)).unwrap();

    assert_eq!(watcher.mode().await.unwrap(), BackendMode::Push);

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn listen_then_stop_never_invokes_the_callback() {
    let (url, server) = spawn_service(Duration::from_millis(100)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    let id = watcher.create().await.unwrap();
    let invocations = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&invocations);

    watcher
        .listen(id, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .await
        .unwrap();
    watcher.stop(id).await.unwrap();

    // Well past completion; a leaked timer would have fired by now.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(invocations.load(Ordering::SeqCst), 0);

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn stopping_an_unknown_listener_fails() {
    let (url, server) = spawn_service(Duration::from_millis(200)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    let err = watcher.stop(42).await.unwrap_err();
    assert!(matches!(err, ClientError::ListenerNotFound(42)));

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn querying_an_unknown_job_fails() {
    let (url, server) = spawn_service(Duration::from_millis(200)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    let err = watcher.client().fetch_status(999).await.unwrap_err();
    assert!(matches!(err, ClientError::JobNotFound(999)));

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn jobs_are_scoped_by_correlation_token() {
    let (url, server) = spawn_service(Duration::from_millis(200)).await;
    let owner = JobWatcher::new(poll_config(&url)).unwrap();
    let stranger = JobWatcher::new(poll_config(&url)).unwrap();

    let id = owner.create().await.unwrap();

    // A foreign token observes the job as missing, not as unauthorized
    // detail it could probe.
    let err = stranger.client().fetch_status(id).await.unwrap_err();
    assert!(matches!(err, ClientError::JobNotFound(_)));

    owner.dispose().await.unwrap();
    stranger.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn change_backend_migrates_every_subscription() {
    let (url, server) = spawn_service(Duration::from_millis(400)).await;
    let watcher = JobWatcher::new(
        push_config(&url).with_poll_interval(Duration::from_millis(50)),
    )
    .unwrap();

    let first = watcher.create().await.unwrap();
    let second = watcher.create().await.unwrap();

    let deliveries = Arc::new(AtomicUsize::new(0));
    for id in [first, second] {
        let counter = Arc::clone(&deliveries);
        watcher
            .listen(id, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .await
            .unwrap();
    }

    let mut before = watcher.jobs().await.unwrap();
    before.sort_unstable();
    assert_eq!(before, vec![first, second]);

    watcher.change_backend(BackendMode::Poll).await.unwrap();
    assert_eq!(watcher.mode().await.unwrap(), BackendMode::Poll);

    let mut after = watcher.jobs().await.unwrap();
    after.sort_unstable();
    assert_eq!(after, before);

    // The migrated subscriptions keep delivering without re-registering.
    sleep(Duration::from_millis(600)).await;
    assert!(deliveries.load(Ordering::SeqCst) >= 2);

    watcher.stop(first).await.unwrap();
    watcher.stop(second).await.unwrap();
    assert!(matches!(
        watcher.stop(first).await.unwrap_err(),
        ClientError::ListenerNotFound(_)
    ));

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn stream_failure_falls_back_to_polling() {
    let (url, server) = spawn_service(Duration::from_millis(500)).await;
    let watcher = JobWatcher::new(
        push_config(&url)
            .with_fallback(true)
            .with_poll_interval(Duration::from_millis(50)),
    )
    .unwrap();

    let id = watcher.create().await.unwrap();
    let wait = {
        let watcher = watcher.clone();
        tokio::spawn(async move { watcher.wait_for_job(id).await })
    };

    // Kill the stream while the job is still pending; the watcher must
    // carry the subscription over to polling on its own.
    sleep(Duration::from_millis(100)).await;
    sever_streams(&url).await;

    timeout(WAIT_BUDGET, wait)
        .await
        .expect("wait should finish within the budget")
        .unwrap()
        .unwrap();

    assert_eq!(watcher.mode().await.unwrap(), BackendMode::Poll);

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn stream_failure_without_fallback_is_fatal() {
    let (url, server) = spawn_service(Duration::from_secs(30)).await;
    let watcher = JobWatcher::new(push_config(&url)).unwrap();

    let id = watcher.create().await.unwrap();
    let wait = {
        let watcher = watcher.clone();
        tokio::spawn(async move { watcher.wait_for_job(id).await })
    };

    sleep(Duration::from_millis(100)).await;
    sever_streams(&url).await;

    let err = timeout(WAIT_BUDGET, wait)
        .await
        .expect("wait should fail within the budget")
        .unwrap()
        .unwrap_err();
    assert!(matches!(err, ClientError::Stream(_)));

    // The failure is sticky: later operations surface it too.
    assert!(matches!(
        watcher.create().await.unwrap_err(),
        ClientError::Stream(_)
    ));

    server.abort();
}

#[tokio::test]
async fn wait_does_not_resolve_before_completion() {
    let (url, server) = spawn_service(Duration::from_secs(30)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    let id = watcher.create().await.unwrap();
    let premature = timeout(Duration::from_millis(300), watcher.wait_for_job(id)).await;
    assert!(premature.is_err(), "wait must not resolve while pending");

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn partial_completions_resolve_independently() {
    let (url, server) = spawn_service(Duration::from_millis(300)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(watcher.create().await.unwrap());
    }
    assert_eq!(ids, vec![1, 2, 3]);

    let waits: Vec<_> = ids
        .iter()
        .map(|&id| {
            let watcher = watcher.clone();
            tokio::spawn(async move { watcher.wait_for_job(id).await })
        })
        .collect();

    for wait in waits {
        timeout(WAIT_BUDGET, wait)
            .await
            .expect("wait should finish within the budget")
            .unwrap()
            .unwrap();
    }

    // Jobs created afterwards are still pending and stay unresolved.
    let late_one = watcher.create().await.unwrap();
    let late_two = watcher.create().await.unwrap();
    assert_eq!((late_one, late_two), (4, 5));
    assert_eq!(
        watcher.client().fetch_status(late_one).await.unwrap(),
        "pending"
    );
    assert_eq!(
        watcher.client().fetch_status(late_two).await.unwrap(),
        "pending"
    );

    watcher.dispose().await.unwrap();
    server.abort();
}

#[tokio::test]
async fn operations_after_dispose_fail() {
    let (url, server) = spawn_service(Duration::from_millis(200)).await;
    let watcher = JobWatcher::new(poll_config(&url)).unwrap();

    watcher.dispose().await.unwrap();

    assert!(matches!(
        watcher.create().await.unwrap_err(),
        ClientError::Disposed
    ));
    assert!(matches!(
        watcher.stop(1).await.unwrap_err(),
        ClientError::Disposed
    ));
    assert!(matches!(
        watcher.dispose().await.unwrap_err(),
        ClientError::Disposed
    ));

    server.abort();
}
