use std::sync::Arc;

use crate::config::Config;
use crate::notifier::Notifier;
use crate::services::event_store::EventStore;
use crate::services::intake::Intake;
use crate::services::moderation::Moderation;
use crate::services::start_notifier::StartNotifier;
use crate::services::uploads::UploadDirs;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<EventStore>,
    pub uploads: UploadDirs,
    pub intake: Intake,
    pub moderation: Moderation,
    pub start_notifier: StartNotifier,
}

impl AppState {
    pub fn new(config: Arc<Config>, store: Arc<EventStore>, notifier: Arc<dyn Notifier>) -> Self {
        let uploads = UploadDirs::new(&config.uploads_dir);
        Self {
            intake: Intake::new(store.clone(), notifier.clone(), uploads.clone()),
            moderation: Moderation::new(store.clone(), notifier.clone(), config.close_channel_delay),
            start_notifier: StartNotifier::new(store.clone(), notifier, uploads.clone()),
            config,
            store,
            uploads,
        }
    }
}
