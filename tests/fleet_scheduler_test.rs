//! fleet HTTP API adapter against a mock HTTP server

use fleetboot::domain::models::{ActiveState, SubState, UnitGroup, UnitSpec};
use fleetboot::domain::ports::{Scheduler, SchedulerError, SubmitOutcome};
use fleetboot::infrastructure::fleet::{FleetClientConfig, FleetScheduler};
use mockito::{Matcher, Server};

fn scheduler(url: String) -> FleetScheduler {
    FleetScheduler::new(FleetClientConfig {
        endpoint: url,
        api_prefix: "v1-alpha".to_string(),
        timeout_secs: 5,
    })
    .expect("Failed to create scheduler client")
}

fn proxy_unit() -> UnitSpec {
    UnitSpec::new(
        "minion-proxy@a1.service",
        UnitGroup::Role,
        b"[Unit]\nDescription=Kubernetes Proxy\n\n[Service]\nExecStart=/opt/bin/kube-proxy \\\n  --master=10.0.0.1:8080\n\n[X-Fleet]\nMachineID=a1\n"
            .to_vec(),
    )
}

#[tokio::test]
async fn test_submit_sends_launched_unit_with_options() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("PUT", "/v1-alpha/units/minion-proxy@a1.service")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(serde_json::json!({
            "name": "minion-proxy@a1.service",
            "desiredState": "launched",
            "options": [
                {"section": "Unit", "name": "Description", "value": "Kubernetes Proxy"},
                {"section": "Service", "name": "ExecStart", "value": "/opt/bin/kube-proxy --master=10.0.0.1:8080"},
                {"section": "X-Fleet", "name": "MachineID", "value": "a1"}
            ]
        })))
        .with_status(204)
        .create_async()
        .await;

    let outcome = scheduler(server.url()).submit_unit(&proxy_unit()).await.unwrap();

    assert_eq!(outcome, SubmitOutcome::Accepted);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_conflict_is_already_exists() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/v1-alpha/units/minion-proxy@a1.service")
        .with_status(409)
        .with_body(r#"{"error":{"code":409,"message":"unit already exists"}}"#)
        .create_async()
        .await;

    let outcome = scheduler(server.url()).submit_unit(&proxy_unit()).await.unwrap();
    assert_eq!(outcome, SubmitOutcome::AlreadyExists);
}

#[tokio::test]
async fn test_other_status_is_not_accepted() {
    let mut server = Server::new_async().await;
    server
        .mock("PUT", "/v1-alpha/units/minion-proxy@a1.service")
        .with_status(500)
        .with_body("registry unavailable")
        .create_async()
        .await;

    let outcome = scheduler(server.url()).submit_unit(&proxy_unit()).await.unwrap();
    assert_eq!(
        outcome,
        SubmitOutcome::NotAccepted {
            status: 500,
            body: "registry unavailable".to_string()
        }
    );
}

#[tokio::test]
async fn test_unparseable_unit_is_rejected_locally() {
    let server = Server::new_async().await;
    let unit = UnitSpec::new("bad@a1.service", UnitGroup::Role, b"Description=orphan\n".to_vec());

    let err = scheduler(server.url()).submit_unit(&unit).await.unwrap_err();
    assert!(matches!(err, SchedulerError::InvalidUnit { .. }));
}

#[tokio::test]
async fn test_unit_states_parses_report() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1-alpha/state")
        .with_status(200)
        .with_body(
            serde_json::json!({
                "states": [
                    {"name": "minion-proxy@a1.service", "machineID": "a1", "systemdActiveState": "active", "systemdSubState": "running", "systemdLoadState": "loaded", "hash": "abc"},
                    {"name": "minion-download-kubernetes@a1.service", "machineID": "a1", "systemdActiveState": "activating", "systemdSubState": "start", "systemdLoadState": "loaded", "hash": "def"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let states = scheduler(server.url()).unit_states().await.unwrap();

    assert_eq!(states.len(), 2);
    assert_eq!(states[0].active_state, ActiveState::Active);
    assert_eq!(states[0].sub_state, SubState::Running);
    assert_eq!(states[1].sub_state, SubState::Start);
    assert_eq!(states[1].load_state.as_deref(), Some("loaded"));
}

#[tokio::test]
async fn test_unit_states_follows_page_tokens() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1-alpha/state")
        .match_query(Matcher::Regex("^$".into()))
        .with_status(200)
        .with_body(r#"{"states":[{"name":"a.service","machineID":"m","systemdActiveState":"active","systemdSubState":"running"}],"nextPageToken":"p2"}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/v1-alpha/state")
        .match_query(Matcher::UrlEncoded("nextPageToken".into(), "p2".into()))
        .with_status(200)
        .with_body(r#"{"states":[{"name":"b.service","machineID":"m","systemdActiveState":"active","systemdSubState":"exited"}]}"#)
        .create_async()
        .await;

    let states = scheduler(server.url()).unit_states().await.unwrap();
    let names: Vec<&str> = states.iter().map(|s| s.unit_name.as_str()).collect();
    assert_eq!(names, vec!["a.service", "b.service"]);
}

#[tokio::test]
async fn test_empty_state_report() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1-alpha/state")
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await;

    assert!(scheduler(server.url()).unit_states().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_state_server_error_is_transient() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/v1-alpha/state")
        .with_status(502)
        .create_async()
        .await;

    let err = scheduler(server.url()).unit_states().await.unwrap_err();
    assert!(err.is_transient());
}
