use std::sync::Arc;

use chrono::Duration;
use async_trait::async_trait;
use event_desk_api::models::{ChannelRef, Event, InteractionReply, MessageRef};
use event_desk_api::notifier::{MessagePatch, Notifier, Participants};
use event_desk_api::services::StartNotifier;
use event_desk_api::AdapterError;
use mockall::mock;
use mockall::predicate::eq;

use test_helpers::*;

#[tokio::test]
async fn test_start_notice_goes_out_exactly_once() {
    let notifier = RecordingNotifier::new();
    let (state, _dir) = setup_state(notifier.clone()).await;
    let start = utc(2024, 1, 1, 20, 0, 0);
    let event = state
        .intake
        .submit(submission("Night drive", start), utc(2023, 12, 31, 12, 0, 0))
        .await
        .unwrap();
    let id = event.id().to_string();
    state.moderation.accept(&id, "mod", None).await.unwrap();
    state.moderation.register_interest(&id, "A").await.unwrap();
    state.moderation.register_interest(&id, "B").await.unwrap();

    let report = state.start_notifier.tick(start + Duration::seconds(30)).await;

    assert_eq!(report.notified, vec![id.clone()]);
    assert_eq!(report.cleaned, None);
    assert_eq!(notifier.start_announcements(), vec![(id.clone(), 2)]);
    let mut dms = notifier.direct_messages();
    dms.sort();
    assert_eq!(dms, vec!["A", "B"]);
    assert!(state.store.get(&id).await.unwrap().start_notified());

    let again = state.start_notifier.tick(start + Duration::seconds(90)).await;

    assert!(again.notified.is_empty());
    assert_eq!(notifier.start_announcements().len(), 1);
    assert_eq!(notifier.direct_messages().len(), 2);
}

#[tokio::test]
async fn test_failed_direct_message_does_not_stop_the_others() {
    let notifier = RecordingNotifier::new();
    notifier.make_unreachable("B");
    let (state, _dir) = setup_state(notifier.clone()).await;
    let start = utc(2024, 2, 1, 18, 30, 0);
    let id = state
        .intake
        .submit(submission("Relay", start), utc(2024, 1, 1, 0, 0, 0))
        .await
        .unwrap()
        .id()
        .to_string();
    state.moderation.accept(&id, "mod", None).await.unwrap();
    for user in ["A", "B", "C"] {
        state.moderation.register_interest(&id, user).await.unwrap();
    }

    let report = state.start_notifier.tick(start).await;

    assert_eq!(report.notified, vec![id]);
    let mut dms = notifier.direct_messages();
    dms.sort();
    assert_eq!(dms, vec!["A", "C"]);
}

#[tokio::test]
async fn test_only_accepted_events_in_the_window_are_announced() {
    let notifier = RecordingNotifier::new();
    let (state, _dir) = setup_state(notifier.clone()).await;
    let now = utc(2024, 3, 1, 12, 0, 0);
    let submitted = utc(2024, 2, 1, 0, 0, 0);

    let pending = state
        .intake
        .submit(submission("Pending", now), submitted)
        .await
        .unwrap();
    let past = state
        .intake
        .submit(submission("Past", now - Duration::minutes(30)), submitted)
        .await
        .unwrap();
    let later = state
        .intake
        .submit(submission("Later", now + Duration::minutes(30)), submitted)
        .await
        .unwrap();
    for event in [&past, &later] {
        state.moderation.accept(event.id(), "mod", None).await.unwrap();
    }

    let report = state.start_notifier.tick(now).await;

    assert!(report.notified.is_empty());
    assert!(notifier.start_announcements().is_empty());
    assert!(!state.store.get(pending.id()).await.unwrap().start_notified());
    assert!(!state.store.get(past.id()).await.unwrap().start_notified());
}

#[tokio::test]
async fn test_catch_up_after_a_missed_tick() {
    let notifier = RecordingNotifier::new();
    let (state, _dir) = setup_state(notifier.clone()).await;
    let start = utc(2024, 4, 1, 9, 0, 0);
    let id = state
        .intake
        .submit(submission("Late tick", start), utc(2024, 3, 1, 0, 0, 0))
        .await
        .unwrap()
        .id()
        .to_string();
    state.moderation.accept(&id, "mod", None).await.unwrap();

    assert!(state.start_notifier.tick(start - Duration::seconds(61)).await.notified.is_empty());
    let report = state.start_notifier.tick(start + Duration::seconds(100)).await;

    assert_eq!(report.notified, vec![id]);
}

#[tokio::test]
async fn test_midnight_tick_empties_the_upload_area() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    staged(&state.uploads, "left-behind.png", b"x").await;
    staged(&state.uploads, "abandoned.jpg", b"y").await;

    let noon = state.start_notifier.tick(utc(2024, 1, 1, 12, 0, 0)).await;
    assert_eq!(noon.cleaned, None);
    assert_eq!(incoming_count(&state.uploads).await, 2);

    let midnight = state.start_notifier.tick(utc(2024, 1, 2, 0, 0, 0)).await;

    assert_eq!(midnight.cleaned, Some(2));
    assert_eq!(incoming_count(&state.uploads).await, 0);
}

mock! {
    pub Platform {}

    #[async_trait]
    impl Notifier for Platform {
        async fn post_moderation_request(&self, event: &Event) -> Result<MessageRef, AdapterError>;
        async fn edit_message(&self, message: &MessageRef, patch: MessagePatch) -> Result<(), AdapterError>;
        async fn publish_announcement(&self, event: &Event) -> Result<MessageRef, AdapterError>;
        async fn create_coordination_channel(
            &self,
            event: &Event,
            participants: &Participants,
        ) -> Result<ChannelRef, AdapterError>;
        async fn delete_channel(&self, channel: &ChannelRef) -> Result<(), AdapterError>;
        async fn post_start_announcement(&self, event: &Event) -> Result<(), AdapterError>;
        async fn send_direct_message(&self, user_id: &str, text: &str) -> Result<(), AdapterError>;
        async fn edit_original_reply(&self, reply: &InteractionReply, text: &str) -> Result<(), AdapterError>;
    }
}

#[tokio::test]
async fn test_failed_start_announcement_still_sends_direct_messages() {
    let (state, _dir) = setup_state(RecordingNotifier::new()).await;
    let start = utc(2024, 5, 1, 21, 0, 0);
    let id = state
        .intake
        .submit(submission("Fireworks", start), utc(2024, 4, 1, 0, 0, 0))
        .await
        .unwrap()
        .id()
        .to_string();
    state.moderation.accept(&id, "mod", None).await.unwrap();
    state.moderation.register_interest(&id, "fan").await.unwrap();

    let mut platform = MockPlatform::new();
    platform
        .expect_post_start_announcement()
        .times(1)
        .returning(|_| Err(AdapterError::Rejected("announcements channel missing".into())));
    platform
        .expect_send_direct_message()
        .with(
            eq("fan"),
            eq("🚀 **Hurry!** The event **Fireworks** is starting now."),
        )
        .times(1)
        .returning(|_, _| Ok(()));

    let sweeper = StartNotifier::new(state.store.clone(), Arc::new(platform), state.uploads.clone());
    let announced = sweeper.sweep(start).await;

    assert_eq!(announced.len(), 1);
    assert!(announced[0].start_notified());
    // the latch was persisted before sending, so nothing goes out twice
    assert!(sweeper.sweep(start).await.is_empty());
}
