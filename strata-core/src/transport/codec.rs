//! Frame encoding.
//!
//! Text frames carry JSON and binary frames carry MessagePack. A reply is
//! encoded the same way as the frame it answers.

use tokio_tungstenite::tungstenite::Message;

use super::protocol::{Inbound, Outbound};
use crate::error::{Error, Result};

/// Encoding of a data frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Json,
    MessagePack,
}

impl Encoding {
    /// The encoding of `message`, or `None` for control frames.
    pub fn of(message: &Message) -> Option<Self> {
        match message {
            Message::Text(_) => Some(Self::Json),
            Message::Binary(_) => Some(Self::MessagePack),
            _ => None,
        }
    }
}

pub fn decode(message: &Message) -> Result<Inbound> {
    match message {
        Message::Text(text) => Ok(serde_json::from_str(text)?),
        Message::Binary(bytes) => Ok(rmp_serde::from_slice(bytes)?),
        _ => Err(Error::invalid_argument("not a data frame")),
    }
}

pub fn encode(message: &Outbound, encoding: Encoding) -> Result<Message> {
    Ok(match encoding {
        Encoding::Json => Message::Text(serde_json::to_string(message)?),
        Encoding::MessagePack => Message::Binary(rmp_serde::to_vec_named(message)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use serde_json::json;

    #[test]
    fn text_frames_are_json() {
        let frame = Message::Text(r#"{"type":"ping"}"#.to_string());
        assert_eq!(Encoding::of(&frame), Some(Encoding::Json));
        assert_eq!(decode(&frame).unwrap(), Inbound::Ping);

        let reply = encode(&Outbound::Pong, Encoding::Json).unwrap();
        assert_eq!(reply, Message::Text(r#"{"type":"pong"}"#.to_string()));
    }

    #[test]
    fn binary_frames_are_msgpack() {
        #[derive(Serialize)]
        struct Frame {
            r#type: &'static str,
            payload: serde_json::Value,
        }

        let bytes = rmp_serde::to_vec_named(&Frame {
            r#type: "event",
            payload: json!({"target_id": "h1"}),
        })
        .unwrap();
        let frame = Message::Binary(bytes);
        assert_eq!(Encoding::of(&frame), Some(Encoding::MessagePack));
        assert_eq!(
            decode(&frame).unwrap(),
            Inbound::Event {
                payload: json!({"target_id": "h1"})
            }
        );

        let Message::Binary(reply) = encode(&Outbound::Pong, Encoding::MessagePack).unwrap() else {
            panic!("expected a binary frame");
        };
        let decoded: serde_json::Value = rmp_serde::from_slice(&reply).unwrap();
        assert_eq!(decoded, json!({"type": "pong"}));
    }

    #[test]
    fn malformed_frames_fail() {
        assert!(decode(&Message::Text("not json".into())).is_err());
        assert!(decode(&Message::Binary(vec![0xc1])).is_err());
        assert!(Encoding::of(&Message::Ping(Vec::new())).is_none());
    }
}
