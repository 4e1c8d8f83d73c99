//! Interactive control ids. The event id travels inside the control so a click can be
//! resolved back to its event without any per-message state.

use crate::models::EventId;

pub const CLOSE_TICKET: &str = "close_ticket";
pub const REJECT_MODAL_PREFIX: &str = "modalReject_";
pub const REJECT_REASON_INPUT: &str = "reason";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentAction {
    Accept(EventId),
    Reject(EventId),
    Interested(EventId),
    CloseTicket,
}

impl ComponentAction {
    pub fn custom_id(&self) -> String {
        match self {
            ComponentAction::Accept(id) => format!("accept_{}", id),
            ComponentAction::Reject(id) => format!("reject_{}", id),
            ComponentAction::Interested(id) => format!("interested_{}", id),
            ComponentAction::CloseTicket => CLOSE_TICKET.to_string(),
        }
    }

    pub fn parse(custom_id: &str) -> Option<Self> {
        if custom_id == CLOSE_TICKET {
            return Some(ComponentAction::CloseTicket);
        }
        let (action, id) = custom_id.split_once('_')?;
        if id.is_empty() {
            return None;
        }
        let id = id.to_string();
        match action {
            "accept" => Some(ComponentAction::Accept(id)),
            "reject" => Some(ComponentAction::Reject(id)),
            "interested" => Some(ComponentAction::Interested(id)),
            _ => None,
        }
    }
}

pub fn reject_modal_id(event_id: &str) -> String {
    format!("{}{}", REJECT_MODAL_PREFIX, event_id)
}

pub fn parse_reject_modal(custom_id: &str) -> Option<EventId> {
    custom_id
        .strip_prefix(REJECT_MODAL_PREFIX)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
