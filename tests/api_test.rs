use std::time::Duration;

use axum::http::StatusCode;
use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use serde_json::{json, Value};

use event_desk_api::handlers;
use event_desk_api::models::{Event, MessageRef};
use event_desk_api::notifier::MessagePatch;

use test_helpers::*;

fn event_form(date: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("userId", "123456")
        .add_text("title", "Sunset cruise")
        .add_text("description", "Meet at the docks")
        .add_text("date", date)
}

fn component(custom_id: &str, user: &str) -> Value {
    json!({
        "type": 3,
        "channel_id": "requests",
        "member": { "user": { "id": user } },
        "message": { "id": "m-1" },
        "application_id": "app-1",
        "token": format!("token-{}", custom_id),
        "data": { "custom_id": custom_id, "component_type": 2 }
    })
}

async fn create_event(server: &TestServer, date: &str) -> String {
    let created: Value = server.post("/api/event").multipart(event_form(date)).await.json();
    created["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state)).unwrap();

    let response = server.get("/health").await;

    assert_eq!(response.status_code(), StatusCode::OK);
    assert_eq!(response.text(), "OK");
}

#[tokio::test]
async fn test_create_event_with_flyer() {
    let notifier = RecordingNotifier::new();
    let (state, dir) = setup_state(notifier.clone()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let form = event_form("2030-01-01T20:00").add_part(
        "flyer",
        Part::bytes(b"fake png".to_vec())
            .file_name("poster.png")
            .mime_type("image/png"),
    );

    let response = server.post("/api/event").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::OK);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    let id = body["id"].as_str().unwrap().to_string();
    let stored = state.store.get(&id).await.unwrap();
    assert_eq!(stored.title, "Sunset cruise");
    assert_eq!(stored.flyer_asset.as_deref(), Some(format!("flyers/{}.png", id).as_str()));
    assert!(dir.path().join(format!("uploads/flyers/{}.png", id)).exists());
    assert_eq!(notifier.calls(), vec![Call::ModerationRequest(id.clone())]);

    let served = server.get(&format!("/uploads/flyers/{}.png", id)).await;
    assert_eq!(served.status_code(), StatusCode::OK);
    assert_eq!(served.as_bytes().as_ref(), b"fake png");
}

#[tokio::test]
async fn test_create_event_rejects_unquantized_time() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let form = event_form("2030-01-01T20:15").add_part(
        "flyer",
        Part::bytes(b"x".to_vec()).file_name("poster.png"),
    );

    let response = server.post("/api/event").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert!(body["error"].as_str().unwrap().contains(":30"));
    assert!(state.store.all().await.is_empty());
    assert_eq!(incoming_count(&state.uploads).await, 0);
}

#[tokio::test]
async fn test_create_event_conflict_and_missing_fields() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state)).unwrap();

    let first = server.post("/api/event").multipart(event_form("2030-02-01T18:30")).await;
    let second = server.post("/api/event").multipart(event_form("2030-02-01T18:30")).await;
    let untitled = server
        .post("/api/event")
        .multipart(MultipartForm::new().add_text("userId", "1").add_text("date", "2030-02-01T19:00"))
        .await;

    assert_eq!(first.status_code(), StatusCode::OK);
    assert_eq!(second.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(second.json::<Value>()["error"], "That time slot is already taken.");
    assert_eq!(untitled.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(untitled.json::<Value>()["error"], "Title is required");
}

#[tokio::test]
async fn test_list_events() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state)).unwrap();
    server
        .post("/api/event")
        .multipart(event_form("2030-03-01T10:00").add_text("needsCars", "true"))
        .await;

    let events: Vec<Event> = server.get("/api/events").await.json();

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].support_needs.vehicles.as_deref(), Some("No"));
    assert!(events[0].requires_support());
}

#[tokio::test]
async fn test_interaction_ping() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state)).unwrap();

    let response = post_signed(&server, &json!({ "type": 1 })).await;

    assert_eq!(response.json::<Value>(), json!({ "type": 1 }));
}

#[tokio::test]
async fn test_unsigned_or_forged_interactions_are_refused() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let id = create_event(&server, "2030-06-01T20:00").await;
    let press = component(&format!("accept_{}", id), "mod-1");

    let unsigned = server.post("/api/interactions").json(&press).await;
    let forged = server
        .post("/api/interactions")
        .add_header("x-signature-ed25519", "ab".repeat(64))
        .add_header("x-signature-timestamp", "1717000000")
        .json(&press)
        .await;

    assert_eq!(unsigned.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(forged.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(forged.json::<Value>()["error"], "invalid request signature");
    assert!(!state.store.get(&id).await.unwrap().is_accepted());
}

#[tokio::test]
async fn test_accept_button_then_interest_button() {
    let notifier = RecordingNotifier::new();
    let (state, _dir) = setup_state(notifier.clone()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let id = create_event(&server, "2030-04-01T21:00").await;

    let accepted: Value = post_signed(&server, &component(&format!("accept_{}", id), "mod-1"))
        .await
        .json();
    notifier
        .wait_until(|calls| calls.iter().any(|c| matches!(c, Call::ReplyEdit { .. })))
        .await;
    let interested: Value = post_signed(&server, &component(&format!("interested_{}", id), "fan-1"))
        .await
        .json();
    let repeated: Value = post_signed(&server, &component(&format!("interested_{}", id), "fan-1"))
        .await
        .json();

    assert_eq!(accepted, json!({ "type": 5, "data": { "flags": 64 } }));
    assert!(notifier.reply_edits()[0].contains("published"));
    assert!(interested["data"]["content"].as_str().unwrap().contains("Sunset cruise"));
    assert_eq!(repeated["data"]["content"], "You were already registered.");
    assert_eq!(state.store.get(&id).await.unwrap().subscribers().len(), 1);
}

#[tokio::test]
async fn test_reject_button_opens_reason_prompt_and_modal_rejects() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let id = create_event(&server, "2030-05-01T08:00").await;

    let prompt: Value = post_signed(&server, &component(&format!("reject_{}", id), "mod-1"))
        .await
        .json();
    assert_eq!(prompt["type"], 9);
    assert_eq!(prompt["data"]["custom_id"], format!("modalReject_{}", id));

    let submitted: Value = post_signed(
        &server,
        &json!({
            "type": 5,
            "channel_id": "requests",
            "member": { "user": { "id": "mod-1" } },
            "message": { "id": "m-1" },
            "data": {
                "custom_id": format!("modalReject_{}", id),
                "components": [{ "type": 1, "components": [
                    { "type": 4, "custom_id": "reason", "value": "No marshals available" }
                ]}]
            }
        }),
    )
    .await
    .json();

    assert_eq!(submitted["data"]["content"], "❌ Rejected.");
    let stored = state.store.get(&id).await.unwrap();
    assert_eq!(stored.rejection_reason(), Some("No marshals available"));
}

#[tokio::test]
async fn test_unknown_event_button_reports_not_found() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state)).unwrap();

    let response: Value = post_signed(&server, &component("accept_999", "mod-1"))
        .await
        .json();

    assert_eq!(response["data"]["content"], "❌ Event not found or expired.");
    assert_eq!(response["data"]["flags"], 64);
}

#[tokio::test]
async fn test_accept_replies_before_slow_publishing_finishes() {
    let notifier = RecordingNotifier::new();
    notifier.delay_announcement(Duration::from_millis(500));
    let (state, _dir) = setup_state(notifier.clone()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let id = create_event(&server, "2030-07-01T19:30").await;
    let press = component(&format!("accept_{}", id), "mod-1");

    let reply = tokio::time::timeout(Duration::from_millis(250), post_signed(&server, &press))
        .await
        .expect("accept reply waited for publishing");

    assert_eq!(reply.json::<Value>()["type"], 5);
    assert!(state.store.get(&id).await.unwrap().is_accepted());
    assert!(notifier.reply_edits().is_empty());

    notifier
        .wait_until(|calls| calls.iter().any(|c| matches!(c, Call::ReplyEdit { .. })))
        .await;
    assert_eq!(
        notifier.calls().last(),
        Some(&Call::ReplyEdit {
            token: format!("token-accept_{}", id),
            text: "✅ Event published in announcements.\n🎫 Ticket: No ticket required.".into(),
        })
    );
    assert!(notifier
        .calls()
        .contains(&Call::Edit(MessageRef::new("requests", "m-1"), MessagePatch::StripControls)));
}

#[tokio::test]
async fn test_interest_before_acceptance_says_not_open_yet() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let id = create_event(&server, "2030-08-01T18:00").await;

    let response: Value = post_signed(&server, &component(&format!("interested_{}", id), "fan-1"))
        .await
        .json();

    assert_eq!(response["data"]["content"], "⚠️ This event is not open for interest yet.");
    assert!(state.store.get(&id).await.unwrap().subscribers().is_empty());
}

#[tokio::test]
async fn test_press_without_a_user_is_refused() {
    let notifier = RecordingNotifier::new();
    let (state, _dir) = setup_state(notifier.clone()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let id = create_event(&server, "2030-09-01T18:00").await;
    let mut accept = component(&format!("accept_{}", id), "mod-1");
    accept.as_object_mut().unwrap().remove("member");
    let mut interest = component(&format!("interested_{}", id), "fan-1");
    interest.as_object_mut().unwrap().remove("member");

    let accepted: Value = post_signed(&server, &accept).await.json();
    let interested: Value = post_signed(&server, &interest).await.json();

    assert_eq!(accepted["data"]["content"], "Unknown user.");
    assert_eq!(accepted["data"]["flags"], 64);
    assert_eq!(interested["data"]["content"], "Unknown user.");
    assert!(!state.store.get(&id).await.unwrap().is_accepted());
    assert_eq!(notifier.calls(), vec![Call::ModerationRequest(id)]);
}

#[tokio::test]
async fn test_staged_uploads_are_not_served() {
    let (state, _dir) = setup_state_with_public_uploads(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let file = staged(&state.uploads, "draft.png", b"unreviewed").await;
    let name = file.path.file_name().unwrap().to_str().unwrap().to_string();
    tokio::fs::write(state.uploads.root().join("flyers/1.png"), b"reviewed")
        .await
        .unwrap();

    let hidden = server.get(&format!("/uploads/incoming/{}", name)).await;
    let listing = server.get("/uploads/incoming").await;
    let public = server.get("/uploads/flyers/1.png").await;

    assert_eq!(hidden.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(listing.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(public.status_code(), StatusCode::OK);
    assert!(file.path.exists());
}

#[tokio::test]
async fn test_overlong_title_is_a_bad_request() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let server = TestServer::new(handlers::router(state.clone())).unwrap();
    let form = MultipartForm::new()
        .add_text("userId", "1")
        .add_text("title", "t".repeat(201))
        .add_text("date", "2030-10-01T18:00");

    let response = server.post("/api/event").multipart(form).await;

    assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json::<Value>()["error"],
        "Title must be at most 200 characters"
    );
    assert!(state.store.all().await.is_empty());
}
