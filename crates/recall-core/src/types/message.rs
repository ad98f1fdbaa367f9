//! Message types exchanged with the transport collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One inbound message from a learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    pub conversation_id: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Value of a pressed button, if the channel reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub button_value: Option<String>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    /// Channel the message arrived on, kept for proactive reminders.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
}

impl InboundEvent {
    /// Create a plain text event stamped with the current time.
    pub fn text(
        conversation_id: impl Into<String>,
        user_id: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user_id: user_id.into(),
            text: Some(text.into()),
            button_value: None,
            timestamp: Utc::now(),
            channel_id: None,
            service_url: None,
        }
    }

    /// Builder method to set the timestamp.
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Builder method to set a pressed button value.
    pub fn with_button(mut self, value: impl Into<String>) -> Self {
        self.button_value = Some(value.into());
        self
    }

    /// The learner's reply. A button value wins over free text.
    pub fn reply(&self) -> Option<&str> {
        self.button_value
            .as_deref()
            .or(self.text.as_deref())
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// A button offered with an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub value: String,
}

impl Button {
    /// A button whose value equals its label.
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            value: label.clone(),
            label,
        }
    }
}

/// One outbound message. Rendering is left to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub buttons: Vec<Button>,
}

impl OutboundMessage {
    /// A plain text message.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// Builder method to attach an image.
    pub fn with_image(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }

    /// Builder method to attach audio.
    pub fn with_audio(mut self, url: Option<String>) -> Self {
        self.audio_url = url;
        self
    }

    /// Builder method to offer buttons.
    pub fn with_buttons<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.buttons = labels.into_iter().map(Button::new).collect();
        self
    }
}

/// Everything the core produced for one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnReply {
    pub messages: Vec<OutboundMessage>,
}

impl TurnReply {
    /// Concatenated message texts, mostly useful in tests and logs.
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.text.as_str()).collect()
    }
}

/// Where to reach a user proactively.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationAddress {
    pub user_id: String,
    pub conversation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_url: Option<String>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationAddress {
    /// The address an inbound event came from.
    pub fn from_event(event: &InboundEvent) -> Self {
        Self {
            user_id: event.user_id.clone(),
            conversation_id: event.conversation_id.clone(),
            channel_id: event.channel_id.clone(),
            service_url: event.service_url.clone(),
            updated_at: event.timestamp,
        }
    }
}
