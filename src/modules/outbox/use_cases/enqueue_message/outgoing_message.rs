use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutgoingMessageError {
    #[error("failed to serialize outbox payload of type {message_type}: {source}")]
    Serialization {
        message_type: String,
        source: serde_json::Error,
    },
}

/// An event a business operation wants delivered through the outbox.
pub trait OutgoingMessage {
    /// Discriminator used to pick the publisher.
    fn message_type(&self) -> &str;

    fn serialize_payload(&self) -> Result<String, OutgoingMessageError>;
}

/// Outgoing message with a JSON payload.
#[derive(Debug, Clone)]
pub struct JsonMessage<TBody: Serialize> {
    message_type: String,
    body: TBody,
}

impl<TBody: Serialize> JsonMessage<TBody> {
    pub fn new(message_type: impl Into<String>, body: TBody) -> Self {
        Self {
            message_type: message_type.into(),
            body,
        }
    }
}

impl<TBody: Serialize> OutgoingMessage for JsonMessage<TBody> {
    fn message_type(&self) -> &str {
        &self.message_type
    }

    fn serialize_payload(&self) -> Result<String, OutgoingMessageError> {
        serde_json::to_string(&self.body).map_err(|source| OutgoingMessageError::Serialization {
            message_type: self.message_type.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod json_message_tests {
    use super::*;
    use rstest::rstest;
    use serde::ser::Error as _;
    use serde::{Serialize, Serializer};

    #[derive(Serialize)]
    struct UserCreated {
        email: &'static str,
    }

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    #[rstest]
    fn it_should_serialize_the_body_as_json() {
        let message = JsonMessage::new("user-created", UserCreated { email: "a@b.c" });
        assert_eq!(message.message_type(), "user-created");
        assert_eq!(message.serialize_payload().unwrap(), r#"{"email":"a@b.c"}"#);
    }

    #[rstest]
    fn it_should_report_the_type_when_serialization_fails() {
        let message = JsonMessage::new("broken-type", Unserializable);
        let err = message.serialize_payload().unwrap_err();
        assert!(err.to_string().contains("broken-type"));
    }
}
