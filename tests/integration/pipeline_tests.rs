//! Integration tests for the submit -> crawl -> aggregate pipeline
//!
//! These tests use wiremock to serve pages and drive a real worker pool over
//! an on-disk SQLite database.

use proptest::prelude::*;
use sentinel::config::Config;
use sentinel::crawler::{content_hash, FixedRetry, NoRetry, RetryPolicy};
use sentinel::storage::{JobStore, SharedStorage, SqliteStorage, WEB_JOB_TYPE};
use sentinel::{BatchStatus, JobStatus, Owner, Sentinel, SentinelError};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PAGE: &str = r#"<html>
<head>
  <title>Example</title>
  <meta name="description" content="An example page">
</head>
<body>
  <h1>Welcome</h1>
  <a href="/one">One</a>
  <a href="https://other.example/two">Two</a>
  <a href="/one">One again</a>
</body>
</html>"#;

/// Creates a test configuration rooted in `dir`
fn create_test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.pool.workers = 4;
    config.pool.queue_capacity = 16;
    config.fetch.request_timeout_ms = 300;
    config.storage.database_path = dir.path().join("test.db").to_string_lossy().into_owned();
    config.storage.uploads_dir = dir.path().join("uploads").to_string_lossy().into_owned();
    config
}

fn start(config: Config) -> (Sentinel, SharedStorage) {
    let sentinel = Sentinel::open(config).expect("Failed to start sentinel");
    let storage = sentinel.storage().clone();
    (sentinel, storage)
}

/// Submits `doc`, waits for dispatch, drains the pool, and returns the batch key
async fn run_batch(sentinel: Sentinel, doc: &[u8], file_name: &str, owner: Owner) -> String {
    let submission = sentinel
        .submit_document(doc, file_name, owner)
        .expect("Failed to submit document");
    let batch_key = submission.batch_key.clone();
    submission.wait().await.expect("Dispatch task failed");
    sentinel.shutdown().await;
    batch_key
}

async fn mount_page(server: &MockServer, route: &str, template: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(template)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_text_upload_creates_job_per_valid_line() {
    let dir = tempfile::tempdir().unwrap();
    let (sentinel, storage) = start(create_test_config(&dir));

    let doc = b"https://a.example\nnot-a-url\nhttp://b.example";
    let submission = sentinel
        .submit_document(doc, "urls.txt", Owner::User(1))
        .unwrap();
    assert_eq!(submission.candidates_found, 3);

    let batch_key = submission.batch_key.clone();
    let report = submission.wait().await.unwrap();
    assert_eq!(report.candidates, 3);
    assert_eq!(report.valid, 2);
    assert_eq!(report.enqueued, 2);
    sentinel.shutdown().await;

    let storage = storage.lock().unwrap();
    let mut urls: Vec<String> = storage
        .get_jobs_for_batch(&batch_key)
        .unwrap()
        .into_iter()
        .map(|job| job.url)
        .collect();
    urls.sort();
    assert_eq!(urls, vec!["http://b.example", "https://a.example"]);
}

#[tokio::test]
async fn test_timeout_fails_job_without_result() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/slow",
        ResponseTemplate::new(200)
            .set_body_string(PAGE)
            .set_delay(Duration::from_secs(3)),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (sentinel, storage) = start(create_test_config(&dir));
    let doc = format!("{}/slow\n", server.uri());
    let batch_key = run_batch(sentinel, doc.as_bytes(), "slow.txt", Owner::Guest).await;

    let storage = storage.lock().unwrap();
    let jobs = storage.get_jobs_for_batch(&batch_key).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(storage.get_result_for_job(jobs[0].id).unwrap().is_none());
    assert!(storage.get_job_results(&batch_key).unwrap().is_empty());
}

#[tokio::test]
async fn test_not_found_page_is_completed_with_status() {
    let server = MockServer::start().await;
    mount_page(&server, "/missing", ResponseTemplate::new(404).set_body_string(PAGE)).await;

    let dir = tempfile::tempdir().unwrap();
    let (sentinel, storage) = start(create_test_config(&dir));
    let url = format!("{}/missing", server.uri());
    let doc = serde_json::to_vec(&vec![url.clone()]).unwrap();
    let batch_key = run_batch(sentinel, &doc, "urls.json", Owner::User(2)).await;

    let storage = storage.lock().unwrap();
    let jobs = storage.get_jobs_for_batch(&batch_key).unwrap();
    assert_eq!(jobs[0].status, JobStatus::Completed);

    let results = storage.get_job_results(&batch_key).unwrap();
    assert_eq!(results.len(), 1);
    let data = &results[0];
    assert_eq!(data.url, url);
    assert_eq!(data.status_code, 404);
    assert_eq!(data.title, "Example");
    assert_eq!(data.h1, "Welcome");
    assert_eq!(data.meta_description, "An example page");
    assert_eq!(data.links, vec!["/one", "https://other.example/two", "/one"]);
    assert_eq!(data.content_hash, content_hash(PAGE.as_bytes()));
}

#[tokio::test]
async fn test_progress_and_metrics_after_all_jobs_finish() {
    let server = MockServer::start().await;
    mount_page(&server, "/ok", ResponseTemplate::new(200).set_body_string(PAGE)).await;
    mount_page(&server, "/gone", ResponseTemplate::new(404).set_body_string("<p>gone</p>")).await;
    mount_page(
        &server,
        "/slow",
        ResponseTemplate::new(200).set_delay(Duration::from_secs(3)),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let (sentinel, storage) = start(create_test_config(&dir));
    let base = server.uri();
    let doc = format!(
        "{base}/ok,first\n{base}/ok,second\n{base}/gone,third\n{base}/slow,fourth\nnot-a-url,fifth\n",
        base = base
    );
    let batch_key = run_batch(sentinel, doc.as_bytes(), "urls.csv", Owner::User(3)).await;

    let storage = storage.lock().unwrap();
    let (total, completed, failed) = storage.get_job_progress(&batch_key).unwrap();
    assert_eq!((total, completed, failed), (4, 3, 1));

    let progress = sentinel::batch::load_progress(&*storage, &batch_key).unwrap();
    assert_eq!(progress.status, BatchStatus::Completed);
    assert_eq!(progress.completed + progress.failed, progress.total);

    let metrics = storage.get_job_metrics(&batch_key).unwrap();
    assert_eq!(metrics.total_requests, 3);
    assert_eq!(metrics.status_codes.get("200"), Some(&2));
    assert_eq!(metrics.status_codes.get("404"), Some(&1));
    assert_eq!(
        metrics.status_codes.values().sum::<u64>(),
        metrics.total_requests
    );
    assert!(metrics.total_data_size > 0);
}

#[tokio::test]
async fn test_body_is_capped_before_hashing() {
    let server = MockServer::start().await;
    let body = format!("<title>big</title>{}", "x".repeat(5000));
    mount_page(&server, "/big", ResponseTemplate::new(200).set_body_string(body.clone())).await;

    let dir = tempfile::tempdir().unwrap();
    let mut config = create_test_config(&dir);
    config.fetch.max_body_bytes = 1000;
    let (sentinel, storage) = start(config);
    let doc = format!("{}/big", server.uri());
    let batch_key = run_batch(sentinel, doc.as_bytes(), "big.txt", Owner::Guest).await;

    let storage = storage.lock().unwrap();
    let results = storage.get_job_results(&batch_key).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content_hash, content_hash(&body.as_bytes()[..1000]));
    assert_eq!(results[0].title, "big");
}

/// Serves `/flaky` slowly for the first request only, then promptly
async fn flaky_server() -> MockServer {
    let server = MockServer::start().await;
    // Mounted first so it answers the first request; expires after one match
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(PAGE)
                .set_delay(Duration::from_secs(3)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, "/flaky", ResponseTemplate::new(200).set_body_string(PAGE)).await;
    server
}

fn start_with_retry(dir: &TempDir, retry: Arc<dyn RetryPolicy>) -> (Sentinel, SharedStorage) {
    let config = create_test_config(dir);
    let storage = SqliteStorage::new(std::path::Path::new(&config.storage.database_path))
        .unwrap()
        .into_shared();
    let sentinel = Sentinel::with_retry_policy(config, storage.clone(), retry).unwrap();
    (sentinel, storage)
}

#[tokio::test]
async fn test_fixed_retry_recovers_from_first_timeout() {
    let server = flaky_server().await;
    let dir = tempfile::tempdir().unwrap();
    let retry = FixedRetry {
        max_attempts: 2,
        delay: Duration::from_millis(10),
    };
    let (sentinel, storage) = start_with_retry(&dir, Arc::new(retry));

    let doc = format!("{}/flaky", server.uri());
    let batch_key = run_batch(sentinel, doc.as_bytes(), "flaky.txt", Owner::Guest).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);

    let storage = storage.lock().unwrap();
    let jobs = storage.get_jobs_for_batch(&batch_key).unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].status, JobStatus::Completed);

    let results = storage.get_job_results(&batch_key).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].status_code, 200);
    assert_eq!(results[0].title, "Example");
}

#[tokio::test]
async fn test_no_retry_fails_on_first_timeout() {
    let server = flaky_server().await;
    let dir = tempfile::tempdir().unwrap();
    let (sentinel, storage) = start_with_retry(&dir, Arc::new(NoRetry));

    let doc = format!("{}/flaky", server.uri());
    let batch_key = run_batch(sentinel, doc.as_bytes(), "flaky.txt", Owner::Guest).await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);

    let storage = storage.lock().unwrap();
    let jobs = storage.get_jobs_for_batch(&batch_key).unwrap();
    assert_eq!(jobs[0].status, JobStatus::Failed);
    assert!(storage.get_job_results(&batch_key).unwrap().is_empty());
}

#[test]
fn test_delete_is_scoped_to_owner() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("scoped.db");
    let mut storage = SqliteStorage::new(&db_path).unwrap();

    // Same key string under two owners
    for owner in [Owner::User(1), Owner::User(2)] {
        for url in ["http://a.example", "http://b.example"] {
            storage
                .create_job("1700000000_shared.txt", owner, url, WEB_JOB_TYPE)
                .unwrap();
        }
    }

    assert_eq!(
        storage
            .delete_batch("1700000000_shared.txt", Owner::User(1))
            .unwrap(),
        2
    );

    let remaining = storage.get_jobs_for_batch("1700000000_shared.txt").unwrap();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.iter().all(|job| job.owner == Owner::User(2)));
    assert!(storage.list_batches(Owner::User(1)).unwrap().is_empty());
    assert_eq!(
        storage.list_batches(Owner::User(2)).unwrap(),
        vec!["1700000000_shared.txt"]
    );
}

#[tokio::test]
async fn test_delete_cascades_results() {
    let server = MockServer::start().await;
    mount_page(&server, "/ok", ResponseTemplate::new(200).set_body_string(PAGE)).await;

    let dir = tempfile::tempdir().unwrap();
    let config = create_test_config(&dir);
    let uploads = std::path::PathBuf::from(&config.storage.uploads_dir);
    let (sentinel, storage) = start(config);
    let owner = Owner::User(5);

    let submission = sentinel
        .submit_document(format!("{}/ok", server.uri()).as_bytes(), "one.txt", owner)
        .unwrap();
    let batch_key = submission.batch_key.clone();
    submission.wait().await.unwrap();

    // Let the single job finish before deleting
    for _ in 0..50 {
        if sentinel.get_job_progress(&batch_key).unwrap().is_complete() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(sentinel.get_job_results(&batch_key).unwrap().len(), 1);

    assert!(matches!(
        sentinel.delete_batch(&batch_key, Owner::Guest),
        Err(SentinelError::GuestForbidden)
    ));
    assert_eq!(sentinel.delete_batch(&batch_key, owner).unwrap(), 1);
    assert!(sentinel.get_job_results(&batch_key).unwrap().is_empty());
    assert_eq!(sentinel.get_job_metrics(&batch_key).unwrap().total_requests, 0);
    assert!(!uploads.join(&batch_key).exists());

    sentinel.shutdown().await;
    assert_eq!(storage.lock().unwrap().get_job_progress(&batch_key).unwrap(), (0, 0, 0));
}

fn any_status() -> impl Strategy<Value = JobStatus> {
    prop_oneof![
        Just(JobStatus::Pending),
        Just(JobStatus::Processing),
        Just(JobStatus::Completed),
        Just(JobStatus::Failed),
    ]
}

proptest! {
    #[test]
    fn job_status_never_regresses(updates in prop::collection::vec(any_status(), 0..12)) {
        let mut storage = SqliteStorage::new_in_memory().unwrap();
        let id = storage
            .create_job("batch", Owner::Guest, "http://a.example", WEB_JOB_TYPE)
            .unwrap();

        let mut observed = vec![JobStatus::Pending];
        for next in updates {
            let before = storage.get_job(id).unwrap().status;
            let applied = storage.update_job_status(id, next).is_ok();
            let after = storage.get_job(id).unwrap().status;

            prop_assert_eq!(applied, before.can_transition_to(next));
            prop_assert_eq!(after, if applied { next } else { before });
            observed.push(after);
        }

        // Once processing, never pending again; once terminal, frozen
        for window in observed.windows(2) {
            let (prev, next) = (window[0], window[1]);
            if prev != JobStatus::Pending {
                prop_assert_ne!(next, JobStatus::Pending);
            }
            if prev.is_terminal() {
                prop_assert_eq!(next, prev);
            }
        }
    }
}
