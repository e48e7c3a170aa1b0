//! Integration tests for the bulk operations: delete-all and reset.
//!
//! Faults are injected with axum middleware wrapped around the real router,
//! so individual sub-requests can be made to fail while the rest succeed.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use tasklist::service::{BulkOperation, ServiceError, TaskService};
use tasklist_proto::task::{NewTask, SortOrder, TaskId, seed_tasks};
use tasklist_server::api::{self, ServerState};
use url::Url;

// ---------------------------------------------------------------------------
// Helper functions
// ---------------------------------------------------------------------------

fn service_for(addr: std::net::SocketAddr) -> TaskService {
    TaskService::new(Url::parse(&format!("http://{addr}")).unwrap()).unwrap()
}

/// Answers 500 to `DELETE /tasks/2` and passes everything else through.
async fn fail_delete_of_two(request: Request, next: Next) -> Response {
    if request.method() == Method::DELETE && request.uri().path() == "/tasks/2" {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    next.run(request).await
}

/// Answers 500 to the second `POST /tasks` it sees.
async fn fail_second_post(
    State(posts): State<Arc<AtomicUsize>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::POST && posts.fetch_add(1, Ordering::SeqCst) == 1 {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    }
    next.run(request).await
}

/// Counts every `POST` reaching the endpoint.
async fn count_posts(
    State(posts): State<Arc<AtomicUsize>>,
    request: Request,
    next: Next,
) -> Response {
    if request.method() == Method::POST {
        posts.fetch_add(1, Ordering::SeqCst);
    }
    next.run(request).await
}

async fn populate(state: &ServerState, titles: &[&str]) {
    for title in titles {
        state.store.create(NewTask::new(*title)).await.unwrap();
    }
}

fn sorted_titles(tasks: &[tasklist_proto::task::Task]) -> Vec<(String, bool)> {
    let mut titles: Vec<_> = tasks
        .iter()
        .map(|t| (t.title.clone(), t.completed))
        .collect();
    titles.sort();
    titles
}

// ---------------------------------------------------------------------------
// deleteAll
// ---------------------------------------------------------------------------

#[tokio::test]
async fn delete_all_removes_every_task() {
    let state = Arc::new(ServerState::default());
    populate(&state, &["a", "b", "c"]).await;
    let (addr, _handle) = api::start_server_with_state("127.0.0.1:0", state.clone())
        .await
        .unwrap();

    let deleted = service_for(addr).delete_all().await.unwrap();
    assert_eq!(deleted.len(), 3);
    assert!(deleted.iter().all(|d| d.status == StatusCode::OK));
    assert!(state.store.is_empty().await);
}

#[tokio::test]
async fn delete_all_on_empty_collection_succeeds() {
    let (addr, _handle) = api::start_server("127.0.0.1:0").await.unwrap();
    let deleted = service_for(addr).delete_all().await.unwrap();
    assert!(deleted.is_empty());
}

#[tokio::test]
async fn delete_all_reports_each_failed_delete() {
    let state = Arc::new(ServerState::default());
    populate(&state, &["a", "b", "c"]).await;
    let app = api::router(state.clone()).layer(middleware::from_fn(fail_delete_of_two));
    let (addr, _handle) = api::serve("127.0.0.1:0", app).await.unwrap();
    let svc = service_for(addr);

    let err = svc.delete_all().await.unwrap_err();
    let ServiceError::Bulk(bulk) = err else {
        panic!("expected bulk failure, got {err:?}");
    };
    assert_eq!(bulk.operation, BulkOperation::DeleteAll);
    assert_eq!(bulk.succeeded, 2);
    assert_eq!(bulk.failures.len(), 1);
    assert_eq!(bulk.failures[0].target, "2");
    assert_eq!(
        bulk.failures[0].error.status(),
        Some(StatusCode::INTERNAL_SERVER_ERROR)
    );
    assert_eq!(bulk.to_string(), "delete all: 1 of 3 requests failed");

    // Sibling deletes are not rolled back.
    let remaining = svc.list(SortOrder::Ascending).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, TaskId::new(2).unwrap());
}

// ---------------------------------------------------------------------------
// reset
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reset_replaces_collection_with_seed() {
    let state = Arc::new(ServerState::default());
    populate(&state, &["old one", "old two"]).await;
    let (addr, _handle) = api::start_server_with_state("127.0.0.1:0", state)
        .await
        .unwrap();
    let svc = service_for(addr);

    let created = svc.reset().await.unwrap();
    let listed = svc.list(SortOrder::Ascending).await.unwrap();

    let expected: Vec<_> = {
        let mut seed: Vec<_> = seed_tasks()
            .into_iter()
            .map(|n| (n.title, n.completed))
            .collect();
        seed.sort();
        seed
    };
    assert_eq!(sorted_titles(&created), expected);
    assert_eq!(sorted_titles(&listed), expected);
    assert!(listed.iter().all(|t| t.id.get() > 2));
}

#[tokio::test]
async fn reset_with_custom_seed() {
    let (addr, _handle) = api::start_server("127.0.0.1:0").await.unwrap();
    let svc = service_for(addr).with_seed(vec![
        NewTask::new("A"),
        NewTask::new("B").completed(true),
    ]);

    svc.reset().await.unwrap();
    let listed = svc.list(SortOrder::Ascending).await.unwrap();
    assert_eq!(
        sorted_titles(&listed),
        vec![("A".to_string(), false), ("B".to_string(), true)]
    );
}

#[tokio::test]
async fn reset_stops_when_delete_phase_fails() {
    let state = Arc::new(ServerState::default());
    populate(&state, &["a", "b", "c"]).await;
    let posts = Arc::new(AtomicUsize::new(0));
    let app = api::router(state)
        .layer(middleware::from_fn(fail_delete_of_two))
        .layer(middleware::from_fn_with_state(posts.clone(), count_posts));
    let (addr, _handle) = api::serve("127.0.0.1:0", app).await.unwrap();

    let err = service_for(addr).reset().await.unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Bulk(ref bulk) if bulk.operation == BulkOperation::DeleteAll
    ));
    assert_eq!(posts.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn reset_reports_failed_creates() {
    let posts = Arc::new(AtomicUsize::new(0));
    let app = api::router(Arc::new(ServerState::default()))
        .layer(middleware::from_fn_with_state(posts, fail_second_post));
    let (addr, _handle) = api::serve("127.0.0.1:0", app).await.unwrap();
    let svc = service_for(addr);

    let err = svc.reset().await.unwrap_err();
    let ServiceError::Bulk(bulk) = err else {
        panic!("expected bulk failure, got {err:?}");
    };
    let seed_len = seed_tasks().len();
    assert_eq!(bulk.operation, BulkOperation::Reseed);
    assert_eq!(bulk.failures.len(), 1);
    assert_eq!(bulk.succeeded, seed_len - 1);
    assert!(
        seed_tasks()
            .iter()
            .any(|n| n.title == bulk.failures[0].target)
    );
    assert_eq!(
        svc.list(SortOrder::Ascending).await.unwrap().len(),
        seed_len - 1
    );
}

// ---------------------------------------------------------------------------
// nextId race
// ---------------------------------------------------------------------------

#[tokio::test]
async fn concurrent_next_id_callers_collide_on_create() {
    let (addr, _handle) = api::start_server("127.0.0.1:0").await.unwrap();
    let svc = service_for(addr);
    svc.create(&NewTask::new("existing")).await.unwrap();

    let (first, second) = tokio::join!(svc.next_id(), svc.next_id());
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first, second);

    svc.create(&NewTask::new("one").with_id(first)).await.unwrap();
    let err = svc
        .create(&NewTask::new("two").with_id(second))
        .await
        .unwrap_err();
    assert_eq!(err.status(), Some(StatusCode::CONFLICT));
}
