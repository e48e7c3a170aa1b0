//! End-to-end tests: client controller against a file-backed server,
//! including a server restart from the same database file.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::path::Path;
use std::sync::Arc;

use tasklist::app::App;
use tasklist::service::TaskService;
use tasklist_proto::task::{NewTask, SortOrder, TaskId};
use tasklist_server::api::{self, ServerState};
use tasklist_server::store::TaskStore;
use url::Url;

async fn start_from(path: &Path) -> (TaskService, tokio::task::JoinHandle<()>) {
    let store = TaskStore::open(path).await.unwrap();
    let state = Arc::new(ServerState::new(store));
    let (addr, handle) = api::start_server_with_state("127.0.0.1:0", state)
        .await
        .unwrap();
    let url = Url::parse(&format!("http://{addr}/api")).unwrap();
    (TaskService::new(url).unwrap(), handle)
}

#[tokio::test]
async fn reset_then_list_against_fresh_database() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.json");
    let (svc, _handle) = start_from(&db).await;
    let svc = svc.with_seed(vec![NewTask::new("A"), NewTask::new("B").completed(true)]);

    let mut app = App::new(SortOrder::Ascending);
    app.reset(&svc).await.unwrap();
    app.load(&svc).await.unwrap();

    let shown: Vec<_> = app
        .tasks()
        .iter()
        .map(|t| (t.title.as_str(), t.completed))
        .collect();
    let mut sorted = shown.clone();
    sorted.sort_unstable();
    assert_eq!(sorted, vec![("A", false), ("B", true)]);
    assert!(db.exists());
}

#[tokio::test]
async fn changes_survive_server_restart() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("db.json");

    let (svc, handle) = start_from(&db).await;
    let mut app = App::new(SortOrder::Descending);
    app.load(&svc).await.unwrap();
    assert!(app.tasks().is_empty());

    for title in ["Write report", "Call plumber", "Pay rent"] {
        app.form.title = title.to_string();
        app.submit_form(&svc).await.unwrap();
    }
    app.toggle(&svc, TaskId::new(2).unwrap()).await.unwrap();
    app.remove(&svc, TaskId::new(1).unwrap()).await.unwrap();
    handle.abort();

    let (svc, _handle) = start_from(&db).await;
    let mut app = App::new(SortOrder::Descending);
    app.load(&svc).await.unwrap();

    let shown: Vec<_> = app
        .tasks()
        .iter()
        .map(|t| (t.id.get(), t.title.as_str(), t.completed))
        .collect();
    assert_eq!(
        shown,
        vec![(3, "Pay rent", false), (2, "Call plumber", true)]
    );
    assert_eq!(svc.next_id().await.unwrap().get(), 4);
}
