//! Turn controller: one inbound message in, the ordered replies out.
//!
//! Turns of the same conversation are serialized by a lease held from
//! loading the dialog stack until it is saved again. Different conversations
//! run concurrently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

use crate::conversation::ConversationStore;
use crate::dialog::{ConversationState, DialogEngine};
use crate::error::{RecallError, RecallResult};
use crate::types::{ConversationAddress, InboundEvent, OutboundMessage, TurnReply};

const APOLOGY_RESTART: &str = "Sorry, something went wrong. Let's start over.";
const APOLOGY_RETRY: &str = "Sorry, something went wrong. Please try again.";

type Lease = Arc<tokio::sync::Mutex<()>>;

/// Drives the dialog engine for inbound events.
pub struct TurnController {
    engine: DialogEngine,
    conversations: Arc<dyn ConversationStore>,
    welcome_message: String,
    leases: Mutex<HashMap<String, Lease>>,
}

impl TurnController {
    pub fn new(
        engine: DialogEngine,
        conversations: Arc<dyn ConversationStore>,
        welcome_message: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            conversations,
            welcome_message: welcome_message.into(),
            leases: Mutex::new(HashMap::new()),
        }
    }

    pub fn engine(&self) -> &DialogEngine {
        &self.engine
    }

    /// Handle one inbound event.
    ///
    /// Store and dialog failures are answered with an apology and never
    /// surface here. The only error is a poisoned lease table.
    pub async fn handle(&self, event: &InboundEvent) -> RecallResult<TurnReply> {
        let lease = self.acquire(&event.conversation_id)?;
        let guard = lease.lock_owned().await;

        let reply = self.run_turn(event);

        drop(guard);
        self.release(&event.conversation_id);
        Ok(reply)
    }

    fn run_turn(&self, event: &InboundEvent) -> TurnReply {
        let mut messages = Vec::new();

        let loaded = self
            .record_contact(event)
            .and_then(|()| self.conversations.load_state(&event.conversation_id));
        let mut state = match loaded {
            Ok(state) => state.unwrap_or_default(),
            Err(e) if e.is_unreadable_data() => {
                error!(
                    conversation_id = %event.conversation_id,
                    error = %e,
                    "Saved dialog state unreadable, starting over"
                );
                let state = ConversationState {
                    welcomed: true,
                    ..Default::default()
                };
                messages.push(OutboundMessage::text(APOLOGY_RESTART));
                return self.finish(event, &state, messages);
            }
            Err(e) => {
                error!(
                    conversation_id = %event.conversation_id,
                    code = e.code().as_str(),
                    error = %e,
                    "Could not load conversation"
                );
                return TurnReply {
                    messages: vec![OutboundMessage::text(APOLOGY_RETRY)],
                };
            }
        };

        if !state.welcomed {
            messages.push(OutboundMessage::text(self.welcome_message.clone()));
            state.welcomed = true;
        }

        let mut stack = state.dialog_stack.clone();
        match self
            .engine
            .continue_turn(&event.user_id, event.reply(), event.timestamp, &mut stack)
        {
            Ok(produced) => {
                messages.extend(produced);
                state.dialog_stack = stack;
            }
            Err(e) if e.is_configuration() => {
                error!(
                    conversation_id = %event.conversation_id,
                    error = %e,
                    "Dialog state unusable, starting over"
                );
                messages.push(OutboundMessage::text(APOLOGY_RESTART));
                state.dialog_stack.clear();
            }
            Err(e) => {
                error!(
                    conversation_id = %event.conversation_id,
                    code = e.code().as_str(),
                    error = %e,
                    "Turn failed, keeping previous dialog state"
                );
                messages.push(OutboundMessage::text(APOLOGY_RETRY));
            }
        }

        self.finish(event, &state, messages)
    }

    /// Upsert the user and remember where they were reached.
    fn record_contact(&self, event: &InboundEvent) -> RecallResult<()> {
        self.engine
            .services()
            .progress
            .upsert_user(&event.user_id, event.timestamp)?;
        self.conversations
            .save_address(&ConversationAddress::from_event(event))
    }

    /// Persist the state and build the reply.
    fn finish(
        &self,
        event: &InboundEvent,
        state: &ConversationState,
        messages: Vec<OutboundMessage>,
    ) -> TurnReply {
        if let Err(e) = self
            .conversations
            .save_state(&event.conversation_id, state, event.timestamp)
        {
            error!(
                conversation_id = %event.conversation_id,
                code = e.code().as_str(),
                error = %e,
                "Could not save conversation"
            );
            return TurnReply {
                messages: vec![OutboundMessage::text(APOLOGY_RETRY)],
            };
        }

        info!(
            conversation_id = %event.conversation_id,
            user_id = %event.user_id,
            replies = messages.len(),
            depth = state.dialog_stack.len(),
            "Turn completed"
        );
        TurnReply { messages }
    }

    fn acquire(&self, conversation_id: &str) -> RecallResult<Lease> {
        let mut leases = self
            .leases
            .lock()
            .map_err(|e| RecallError::internal(e.to_string()))?;
        Ok(leases.entry(conversation_id.to_string()).or_default().clone())
    }

    /// Forget the lease once nobody else holds or waits for it.
    fn release(&self, conversation_id: &str) {
        match self.leases.lock() {
            Ok(mut leases) => {
                if leases
                    .get(conversation_id)
                    .is_some_and(|lease| Arc::strong_count(lease) == 1)
                {
                    leases.remove(conversation_id);
                }
            }
            Err(e) => warn!(error = %e, "Lease table poisoned"),
        }
    }

    #[cfg(test)]
    fn lease_count(&self) -> usize {
        self.leases.lock().map(|l| l.len()).unwrap_or_default()
    }
}
