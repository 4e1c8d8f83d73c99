//! Domain types: the event record, its lifecycle, and the opaque platform references it carries.

pub mod event;
pub mod ids;

pub use event::{Event, EventDraft, EventStatus, Interest, MappingSupport, SupportNeeds};
pub use ids::{ChannelRef, EventId, InteractionReply, MessageRef, UserId};
