pub mod event_store;
pub mod intake;
pub mod moderation;
pub mod slots;
pub mod start_notifier;
pub mod uploads;

pub use event_store::EventStore;
pub use intake::{Intake, Submission};
pub use moderation::{AcceptOutcome, Coordination, Moderation};
pub use start_notifier::StartNotifier;
pub use uploads::UploadDirs;
