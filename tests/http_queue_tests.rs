use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tebex_sync::{
    HttpQueueClient, IdentitySnapshot, OnlineIdentity, PendingEntry, QueueClient,
    RecordingExecutor, Reconciler, RetentionPolicy, StaticOccupant, SyncConfig, SyncError,
};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SECRET: &str = "test-secret";

fn client_for(server: &MockServer) -> HttpQueueClient {
    let config = SyncConfig::new(SECRET)
        .base_url(&server.uri())
        .request_timeout(Duration::from_secs(2));
    HttpQueueClient::new(&config).unwrap()
}

async fn mount_due_queue(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/queue"))
        .and(header("X-Tebex-Secret", SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "meta": {"execute_offline": false, "next_check": 60, "more": false},
            "players": [
                {"id": 1, "name": "Alice", "uuid": "A"},
                {"id": 2, "name": "Bob", "uuid": "B"}
            ]
        })))
        .mount(server)
        .await;
}

async fn mount_commands(server: &MockServer, entry_id: i64, commands: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path(format!("/queue/onlineCommands/{}", entry_id)))
        .and(header("X-Tebex-Secret", SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "commands": commands })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn fetch_due_sends_secret_and_parses_players() {
    let server = MockServer::start().await;
    mount_due_queue(&server).await;

    let queue = client_for(&server).fetch_due().await.unwrap();

    assert_eq!(queue.meta.next_check, 60);
    assert_eq!(
        queue.entries,
        vec![
            PendingEntry::new(1, "A").with_display_name("Alice"),
            PendingEntry::new(2, "B").with_display_name("Bob"),
        ]
    );
}

#[tokio::test]
async fn fetch_due_reports_non_success_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_due().await.unwrap_err();
    assert!(matches!(err, SyncError::Status { status: 403, .. }));
}

#[tokio::test]
async fn fetch_due_rejects_malformed_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/queue"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "players": [{"id": "not-a-number", "uuid": "A"}]
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_due().await.unwrap_err();
    assert!(matches!(err, SyncError::Decode(_)));
}

#[tokio::test]
async fn fetch_commands_parses_conditions() {
    let server = MockServer::start().await;
    mount_commands(
        &server,
        7,
        json!([
            {"id": 10, "command": "give {username} apple", "package": 1, "payment": 2,
             "conditions": {"delay": 0, "slots": 0}},
            {"id": 11, "command": "kit {id}", "package": 1, "payment": 2,
             "conditions": {"delay": 30, "slots": 5}}
        ]),
    )
    .await;

    let commands = client_for(&server).fetch_commands_for(7).await.unwrap();

    assert_eq!(commands.len(), 2);
    assert_eq!(commands[1].conditions.min_empty_slots, 5);
    assert_eq!(commands[1].conditions.delay_seconds, 30);
    assert_eq!(commands[0].payment_id, 2);
}

#[tokio::test]
async fn acknowledge_deletes_with_id_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/queue"))
        .and(header("X-Tebex-Secret", SECRET))
        .and(body_json(json!({"ids": [10, 12]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).acknowledge(&[10, 12]).await.unwrap();
}

#[tokio::test]
async fn acknowledge_empty_batch_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&server)
        .await;

    client_for(&server).acknowledge(&[]).await.unwrap();
}

#[tokio::test]
async fn full_cycle_against_remote_acknowledges_completed_commands() {
    let server = MockServer::start().await;
    mount_due_queue(&server).await;
    mount_commands(
        &server,
        1,
        json!([
            {"id": 10, "command": "give {username} apple", "conditions": {"slots": 0}},
            {"id": 11, "command": "give {username} chest", "conditions": {"slots": 5}}
        ]),
    )
    .await;
    Mock::given(method("DELETE"))
        .and(path("/queue"))
        .and(body_json(json!({"ids": [10]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let alice = Arc::new(StaticOccupant::new("A", "Alice").with_free_slots(2));
    let identity = OnlineIdentity::from_occupant(alice.clone());
    let identities: IdentitySnapshot = [(identity.subject_key.clone(), identity)]
        .into_iter()
        .collect();
    let client = client_for(&server);
    let executor = RecordingExecutor::new();
    let mut reconciler = Reconciler::new(RetentionPolicy::DropAfterAttempt);

    let report = reconciler.run_cycle(&client, &executor, &identities).await;

    assert_eq!(report.fetched, Some(2));
    assert_eq!(report.acknowledged, vec![10]);
    assert!(report.ack_error.is_none());
    assert_eq!(alice.notices().len(), 1);
    // Bob is offline and stays pending.
    assert!(reconciler.pending().contains("B"));
    assert!(!reconciler.pending().contains("A"));
}

#[tokio::test]
async fn acknowledge_failure_is_reported_not_raised() {
    let server = MockServer::start().await;
    mount_due_queue(&server).await;
    mount_commands(&server, 1, json!([{"id": 10, "command": "say hi"}])).await;
    Mock::given(method("DELETE"))
        .and(path("/queue"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let identity = OnlineIdentity::from_occupant(Arc::new(StaticOccupant::new("A", "Alice")));
    let identities: IdentitySnapshot = [(identity.subject_key.clone(), identity)]
        .into_iter()
        .collect();
    let client = client_for(&server);
    let executor = RecordingExecutor::new();
    let mut reconciler = Reconciler::new(RetentionPolicy::DropAfterAttempt);

    let report = reconciler.run_cycle(&client, &executor, &identities).await;
    assert_eq!(report.acknowledged, vec![10]);
    assert!(report.ack_error.is_some());

    // The next cycle proceeds normally.
    let next = reconciler.run_cycle(&client, &executor, &identities).await;
    assert_eq!(next.fetched, Some(2));
}
