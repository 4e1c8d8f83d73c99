//! Submission intake: validate the slot, assign an id, move uploads into place, record the
//! event as pending and ask the moderators to review it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::EventError;
use crate::models::ids::next_event_id;
use crate::models::{Event, EventDraft};
use crate::notifier::Notifier;
use crate::services::event_store::EventStore;
use crate::services::slots;
use crate::services::uploads::{self, Relocation, StagedFile, UploadDirs};

/// Longest accepted title, in characters. Leaves room for the prefix in rendered headings.
pub const MAX_TITLE_CHARS: usize = 200;
/// Longest accepted description or support detail, in characters.
pub const MAX_TEXT_CHARS: usize = 1000;

fn check_length(label: &str, value: &str, max: usize) -> Result<(), EventError> {
    if value.chars().count() > max {
        return Err(EventError::validation(format!(
            "{} must be at most {} characters",
            label, max
        )));
    }
    Ok(())
}

/// Text limits the rendered messages can carry.
pub fn validate_text(draft: &EventDraft) -> Result<(), EventError> {
    if draft.title.trim().is_empty() {
        return Err(EventError::validation("Title is required"));
    }
    check_length("Title", &draft.title, MAX_TITLE_CHARS)?;
    check_length("Description", &draft.description, MAX_TEXT_CHARS)?;
    let needs = &draft.support_needs;
    if let Some(vehicles) = &needs.vehicles {
        check_length("Vehicle details", vehicles, MAX_TEXT_CHARS)?;
    }
    if let Some(radio) = &needs.radio {
        check_length("Radio details", radio, MAX_TEXT_CHARS)?;
    }
    if let Some(mapping) = &needs.mapping {
        check_length("Mapping details", &mapping.detail, MAX_TEXT_CHARS)?;
    }
    Ok(())
}

/// A candidate event plus the files uploaded with it, still in the temporary area.
#[derive(Clone, Debug, Default)]
pub struct Submission {
    pub draft: EventDraft,
    pub flyer: Option<StagedFile>,
    pub mapping_files: Vec<StagedFile>,
}

impl Submission {
    pub fn staged_files(&self) -> Vec<StagedFile> {
        self.flyer
            .iter()
            .chain(self.mapping_files.iter())
            .cloned()
            .collect()
    }
}

#[derive(Clone)]
pub struct Intake {
    store: Arc<EventStore>,
    notifier: Arc<dyn Notifier>,
    uploads: UploadDirs,
}

impl Intake {
    pub fn new(store: Arc<EventStore>, notifier: Arc<dyn Notifier>, uploads: UploadDirs) -> Self {
        Self {
            store,
            notifier,
            uploads,
        }
    }

    /// Moves the staged files under `id`. Every successful rename is journalled in `moves`.
    async fn place_uploads(
        &self,
        moves: &mut Relocation,
        draft: &mut EventDraft,
        flyer: Option<&StagedFile>,
        mapping_files: &[StagedFile],
        id: &str,
    ) -> Result<(), EventError> {
        if let Some(flyer) = flyer {
            draft.flyer_asset = Some(self.uploads.relocate_flyer(moves, flyer, id).await?);
        }
        match draft.support_needs.mapping.as_mut() {
            Some(mapping) => {
                mapping.images = self.uploads.relocate_mapping(moves, mapping_files, id).await?;
            }
            None => uploads::discard(mapping_files).await,
        }
        Ok(())
    }

    /// Records a new pending event. Slot validation and the append run under one store lock,
    /// so two submissions for the same slot cannot both succeed.
    pub async fn submit(&self, submission: Submission, now: DateTime<Utc>) -> Result<Event, EventError> {
        let staged = submission.staged_files();
        let Submission {
            mut draft,
            flyer,
            mapping_files,
        } = submission;

        if let Err(e) = validate_text(&draft) {
            info!("Submission refused: {}", e);
            uploads::discard(&staged).await;
            return Err(e);
        }

        let mut guard = self.store.lock().await;

        if let Err(e) = slots::validate(guard.events(), draft.scheduled_at) {
            drop(guard);
            info!("Submission for {} refused: {}", draft.scheduled_at, e);
            uploads::discard(&staged).await;
            return Err(e);
        }

        let id = next_event_id(now, guard.events().iter().map(|e| e.id()));

        let mut moves = Relocation::default();
        if let Err(e) = self
            .place_uploads(&mut moves, &mut draft, flyer.as_ref(), &mapping_files, &id)
            .await
        {
            drop(guard);
            warn!("Could not store uploads for submission {}: {}", id, e);
            moves.rollback().await;
            return Err(e);
        }

        let event = Event::new(id, draft);
        guard.append(event.clone()).await;
        drop(guard);

        info!(
            "Event {} ({}) recorded for {}",
            event.id(),
            event.title,
            event.scheduled_at()
        );

        match self.notifier.post_moderation_request(&event).await {
            Ok(message) => info!(
                "Moderation request for event {} posted as {}",
                event.id(),
                message.message_id
            ),
            Err(e) => warn!(
                "Could not post moderation request for event {}: {}",
                event.id(),
                e
            ),
        }

        Ok(event)
    }
}
