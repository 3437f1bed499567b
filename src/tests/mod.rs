use std::sync::Arc;

use crate::client::ApiClient;
use crate::export::ExportScope;
use crate::records::{EditField, Record, RecordSet};
use crate::state::{AppState, OrphanPolicy, TagPolicy};
use crate::store::StateStore;

fn sample_records() -> Vec<Record> {
    vec![
        Record {
            id: 1,
            name: "Ana".to_string(),
            address: "Calle 1".to_string(),
        },
        Record {
            id: 2,
            name: "Bob".to_string(),
            address: "Calle 2".to_string(),
        },
    ]
}

#[test]
fn invariants_hold_across_a_full_session() {
    let mut state = AppState::new(TagPolicy::MultiTag, OrphanPolicy::Retag);
    assert!(state.invariants_hold());

    state.toggle_selection(1);
    assert!(state.invariants_hold());
    state.create_group("Clients").unwrap();
    assert!(state.invariants_hold());
    state.toggle_selection(2);
    assert!(state.invariants_hold());
    state.rename_group("Clients", "Customers").unwrap();
    assert!(state.invariants_hold());
    state.reorder_groups("Customers", "Group 1");
    assert!(state.invariants_hold());
    state.delete_group("Customers").unwrap();
    assert!(state.invariants_hold());
    state.toggle_selection(1);
    assert!(state.invariants_hold());
}

#[test]
fn divergent_toggle_policies_from_the_same_history() {
    for (policy, expect_selected) in [(TagPolicy::MultiTag, true), (TagPolicy::SingleTag, false)] {
        let mut state = AppState::new(policy, OrphanPolicy::Retag);
        state.toggle_selection(5);
        state.set_active_group("Group 2").unwrap();
        state.toggle_selection(5);
        assert_eq!(state.is_selected(5), expect_selected, "{policy:?}");
        if expect_selected {
            assert_eq!(
                state.tags_for(5),
                vec!["Group 1".to_string(), "Group 2".to_string()]
            );
        } else {
            assert!(state.membership.is_empty());
        }
        assert!(state.invariants_hold());
    }
}

#[test]
fn state_survives_persistence_round_trip_mid_session() {
    let dir = tempfile::tempdir().unwrap();
    let store = StateStore::new(dir.path().join("state.json"));

    let mut state = AppState::default();
    state.create_group("Clients").unwrap();
    state.toggle_selection(1);
    state.toggle_selection(2);
    store.try_save(&state).unwrap();

    // A later session picks up exactly where the previous one stopped.
    let mut resumed = store.load(TagPolicy::MultiTag, OrphanPolicy::Retag);
    assert_eq!(resumed, state);
    resumed.toggle_selection(2);
    assert!(!resumed.is_selected(2));
    assert!(resumed.is_selected(1));
}

#[test]
fn export_scenario_from_two_groups() {
    let mut state = AppState::new(TagPolicy::MultiTag, OrphanPolicy::Retag);
    state.groups = vec!["A".to_string(), "B".to_string()];
    state.active_group = "A".to_string();
    state.toggle_selection(1);
    state.toggle_selection(2);
    state.set_active_group("B").unwrap();
    state.toggle_selection(2);

    let records = RecordSet::new(sample_records());
    let text = crate::export::build_text(&state, &records, ExportScope::AllGroups).unwrap();

    let a_at = text.find("--- A ---").unwrap();
    let b_at = text.find("--- B ---").unwrap();
    assert!(a_at < b_at);
    assert!(text[a_at..b_at].contains("Ana - Calle 1"));
    assert!(text[a_at..b_at].contains("Bob - Calle 2"));
    assert!(text[b_at..].contains("Bob - Calle 2"));
    assert_eq!(text.matches("Bob - Calle 2").count(), 2);
    assert_eq!(text.matches("Ana - Calle 1").count(), 1);
}

async fn spawn_server(dir: &tempfile::TempDir) -> (std::net::SocketAddr, Arc<crate::server::FileStore>) {
    let path = dir.path().join("records.json");
    std::fs::write(&path, serde_json::to_string(&sample_records()).unwrap()).unwrap();
    let store = Arc::new(crate::server::FileStore::new(path));
    let app = crate::server::router(store.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, store)
}

#[tokio::test]
async fn fetch_all_returns_the_backing_records() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _store) = spawn_server(&dir).await;

    let client = ApiClient::new(&format!("http://{addr}"), 10).unwrap();
    let records = client.fetch_all().await.unwrap();
    assert_eq!(records, sample_records());
}

#[tokio::test]
async fn submit_edit_rewrites_the_backing_file() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, store) = spawn_server(&dir).await;

    let client = ApiClient::new(&format!("http://{addr}"), 10).unwrap();
    client
        .submit_edit(2, EditField::Address, "Calle 9")
        .await
        .unwrap();

    let records = store.read_records().unwrap();
    assert_eq!(records[1].address, "Calle 9");
    assert_eq!(records[0].address, "Calle 1");
}

#[tokio::test]
async fn submit_edit_surfaces_not_found_and_bad_field() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _store) = spawn_server(&dir).await;

    let client = ApiClient::new(&format!("http://{addr}"), 10).unwrap();
    let err = client
        .submit_edit(42, EditField::Name, "Zoe")
        .await
        .unwrap_err();
    assert!(err.to_string().contains("404"));

    let raw = reqwest::Client::new()
        .put(format!("http://{addr}/records/1"))
        .json(&serde_json::json!({ "field": "id", "value": "9" }))
        .send()
        .await
        .unwrap();
    assert_eq!(raw.status(), reqwest::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn preflight_and_cors_headers_are_permissive() {
    let dir = tempfile::tempdir().unwrap();
    let (addr, _store) = spawn_server(&dir).await;

    let http = reqwest::Client::new();
    let preflight = http
        .request(reqwest::Method::OPTIONS, format!("http://{addr}/records/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(preflight.status(), reqwest::StatusCode::OK);
    assert_eq!(
        preflight
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("*")
    );

    let get = http
        .get(format!("http://{addr}/records"))
        .send()
        .await
        .unwrap();
    assert_eq!(
        get.headers()
            .get("access-control-allow-methods")
            .and_then(|v| v.to_str().ok()),
        Some("GET, PUT, OPTIONS")
    );
}

#[tokio::test]
async fn fetch_all_errors_when_nothing_listens() {
    // Bind then drop to get a port with no listener.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = ApiClient::new(&format!("http://{addr}"), 1).unwrap();
    assert!(client.fetch_all().await.is_err());
}
