//! Outbound notification contracts
//!
//! The engine never calls a sender inside a transaction. Notifications are
//! written to an outbox after the primary write commits and delivered later
//! by `dispatch_pending`; a failed delivery is recorded, never raised.

use beatwatch_core_types::Sensitive;
use serde::{Deserialize, Serialize};

use crate::workflow::normalize_state;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    Sms,
    Email,
    Push,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Sms => "Sms",
            Channel::Email => "Email",
            Channel::Push => "Push",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "SMS" => Some(Channel::Sms),
            "EMAIL" => Some(Channel::Email),
            "PUSH" => Some(Channel::Push),
            _ => None,
        }
    }

    /// SMS for phone-like contacts, e-mail when the contact has an `@`
    pub fn for_contact(contact: &str) -> Self {
        if contact.contains('@') {
            Channel::Email
        } else {
            Channel::Sms
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationTopic {
    VisitScheduled,
    VisitCancelled,
    VisitCompleted,
    AlertRaised,
    ReverificationScheduled,
    CredentialIssued,
}

impl NotificationTopic {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationTopic::VisitScheduled => "VisitScheduled",
            NotificationTopic::VisitCancelled => "VisitCancelled",
            NotificationTopic::VisitCompleted => "VisitCompleted",
            NotificationTopic::AlertRaised => "AlertRaised",
            NotificationTopic::ReverificationScheduled => "ReverificationScheduled",
            NotificationTopic::CredentialIssued => "CredentialIssued",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match normalize_state(s).as_str() {
            "VISITSCHEDULED" => Some(NotificationTopic::VisitScheduled),
            "VISITCANCELLED" => Some(NotificationTopic::VisitCancelled),
            "VISITCOMPLETED" => Some(NotificationTopic::VisitCompleted),
            "ALERTRAISED" => Some(NotificationTopic::AlertRaised),
            "REVERIFICATIONSCHEDULED" => Some(NotificationTopic::ReverificationScheduled),
            "CREDENTIALISSUED" => Some(NotificationTopic::CredentialIssued),
            _ => None,
        }
    }
}

/// A message waiting for delivery
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub recipient: Sensitive<String>,
    pub channel: Channel,
    pub topic: NotificationTopic,
    pub message: String,
}

impl Notification {
    /// Channel chosen from the shape of the contact
    pub fn to_contact(contact: &str, topic: NotificationTopic, message: impl Into<String>) -> Self {
        Self {
            recipient: Sensitive::new(contact.to_string()),
            channel: Channel::for_contact(contact),
            topic,
            message: message.into(),
        }
    }
}

/// Delivery transport
///
/// Returns whether the transport accepted the message. Implementations must
/// not panic; the dispatcher does not retry.
pub trait NotificationSender: Send + Sync {
    fn send(&self, recipient: &str, message: &str, channel: Channel) -> bool;
}

/// Accepts everything and delivers nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotificationSender;

impl NotificationSender for NoopNotificationSender {
    fn send(&self, _recipient: &str, _message: &str, _channel: Channel) -> bool {
        true
    }
}

/// Writes each delivery to the log with the recipient masked
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotificationSender;

impl NotificationSender for LogNotificationSender {
    fn send(&self, recipient: &str, message: &str, channel: Channel) -> bool {
        tracing::info!(
            recipient = %Sensitive::new(recipient).masked(),
            channel = channel.as_str(),
            body = message,
            "notification delivered"
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_for_contact() {
        assert_eq!(Channel::for_contact("9876543210"), Channel::Sms);
        assert_eq!(Channel::for_contact("a@b.org"), Channel::Email);
    }

    #[test]
    fn test_notification_debug_hides_recipient() {
        let n = Notification::to_contact("9876543210", NotificationTopic::VisitScheduled, "hi");
        let rendered = format!("{:?}", n);
        assert!(!rendered.contains("9876543210"));
        assert_eq!(n.recipient.expose(), "9876543210");
    }

    #[test]
    fn test_topic_round_trip_names() {
        for topic in [
            NotificationTopic::VisitScheduled,
            NotificationTopic::ReverificationScheduled,
            NotificationTopic::CredentialIssued,
        ] {
            assert_eq!(NotificationTopic::parse(topic.as_str()), Some(topic));
        }
    }
}
