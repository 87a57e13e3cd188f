//! Record parser for the relay protocol.
//!
//! Implements tolerant reader pattern: unknown fields ignored, unknown types
//! surfaced as [`Record::Unknown`] so the caller can answer them.

use serde_json::Value;

use super::types::{KNOWN_TYPES, Record};
use crate::error::{Error, Result};

/// Parse a single frame (one line, line-feed already stripped).
pub fn parse_line(line: &str) -> Result<Record> {
    let raw: Value = serde_json::from_str(line).map_err(|e| Error::Parse(e.to_string()))?;
    parse_value(raw)
}

/// Parse a JSON value into a record.
pub fn parse_value(raw: Value) -> Result<Record> {
    let record_type = raw
        .get("type")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| Error::Parse("Missing 'type' field".into()))?;

    if !KNOWN_TYPES.contains(&record_type.as_str()) {
        return Ok(Record::Unknown {
            record_type,
            payload: raw,
        });
    }

    serde_json::from_value(raw).map_err(|e| Error::Parse(e.to_string()))
}

/// Render a record as one frame payload (no trailing line-feed).
pub fn to_line(record: &Record) -> Result<String> {
    if let Record::Unknown { record_type, .. } = record {
        return Err(Error::Parse(format!(
            "Refusing to write unknown record type {record_type}"
        )));
    }
    Ok(serde_json::to_string(record)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::protocol::types::*;

    #[test]
    fn parse_register_with_name() {
        let json = r#"{"type":"REGISTER","name":"alice","publicKey":{"e":"5","n":"3233"}}"#;
        let record = parse_line(json).unwrap();
        assert_eq!(
            record,
            Record::Register(Register {
                name: Some("alice".into()),
                public_key: KeyMaterial {
                    e: "5".into(),
                    n: "3233".into(),
                },
            })
        );
    }

    #[test]
    fn parse_register_without_name() {
        let json = r#"{"type":"REGISTER","publicKey":{"e":"5","n":"3233"}}"#;
        let Record::Register(reg) = parse_line(json).unwrap() else {
            panic!("expected REGISTER");
        };
        assert!(reg.name.is_none());
    }

    #[test]
    fn parse_list_request() {
        let record = parse_line(r#"{"type":"LIST_REQUEST"}"#).unwrap();
        assert_eq!(record, Record::ListRequest);
    }

    #[test]
    fn tolerant_reader_ignores_unknown_fields() {
        let json = r#"{"type":"START_CHAT_REQUEST","targetIdentifier":"bob","extra":1}"#;
        let record = parse_line(json).unwrap();
        assert!(matches!(
            record,
            Record::StartChatRequest(StartChatRequest { ref target_identifier }) if target_identifier == "bob"
        ));
    }

    #[test]
    fn message_payload_kept_opaque() {
        let json = r#"{"type":"MESSAGE","receiver":"127.0.0.1:5000","payload":["12","7",{"x":null}]}"#;
        let Record::Message(msg) = parse_line(json).unwrap() else {
            panic!("expected MESSAGE");
        };
        assert_eq!(msg.payload, serde_json::json!(["12", "7", {"x": null}]));
    }

    #[test]
    fn unknown_type_returns_unknown_record() {
        let record = parse_line(r#"{"type":"PING","data":"x"}"#).unwrap();
        assert_eq!(record.record_type(), "PING");
        assert!(matches!(record, Record::Unknown { .. }));
    }

    #[test]
    fn missing_type_is_parse_error() {
        assert!(matches!(parse_line(r#"{"name":"x"}"#), Err(Error::Parse(_))));
    }

    #[test]
    fn non_json_is_parse_error() {
        assert!(matches!(parse_line("hello"), Err(Error::Parse(_))));
    }

    #[test]
    fn known_type_with_missing_field_is_parse_error() {
        assert!(matches!(
            parse_line(r#"{"type":"MESSAGE","payload":[]}"#),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn written_records_use_wire_field_names() {
        let line = to_line(&Record::IncomingMessage(IncomingMessage {
            sender: "a".into(),
            sender_name: Some("alice".into()),
            payload: serde_json::json!(["1"]),
        }))
        .unwrap();
        assert!(line.contains(r#""type":"INCOMING_MESSAGE""#));
        assert!(line.contains(r#""senderName":"alice""#));
    }

    #[test]
    fn error_replies_carry_fixed_texts() {
        assert_eq!(
            Record::unknown_type("PING"),
            Record::Error(ErrorNotice {
                message: "Unknown message type: PING".into()
            })
        );
        let Record::TargetNotFound(nf) = Record::target_not_found("carol") else {
            panic!("expected TARGET_NOT_FOUND");
        };
        assert_eq!(nf.identifier, "carol");
    }

    fn one_of_each() -> Vec<Record> {
        let key = KeyMaterial {
            e: "5".into(),
            n: "3233".into(),
        };
        let samples = vec![
            Record::Register(Register {
                name: None,
                public_key: key.clone(),
            }),
            Record::RegisterAck(RegisterAck {
                identifier: "1.2.3.4:5".into(),
            }),
            Record::ListRequest,
            Record::ClientList(ClientList { list: vec![] }),
            Record::StartChatRequest(StartChatRequest {
                target_identifier: "bob".into(),
            }),
            Record::StartChatInfo(StartChatInfo {
                identifier: "1.2.3.4:5".into(),
                name: Some("bob".into()),
                public_key: key,
            }),
            Record::target_not_found("carol"),
            Record::Message(OutgoingMessage {
                receiver: "1.2.3.4:5".into(),
                payload: Value::Array(vec![]),
            }),
            Record::IncomingMessage(IncomingMessage {
                sender: "1.2.3.4:6".into(),
                sender_name: None,
                payload: Value::Array(vec![]),
            }),
            Record::delivery_failed("1.2.3.4:5"),
            Record::invalid_format(),
        ];
        // Adding a variant breaks this match until a sample exists for it.
        for record in &samples {
            match record {
                Record::Register(_)
                | Record::RegisterAck(_)
                | Record::ListRequest
                | Record::ClientList(_)
                | Record::StartChatRequest(_)
                | Record::StartChatInfo(_)
                | Record::TargetNotFound(_)
                | Record::Message(_)
                | Record::IncomingMessage(_)
                | Record::DeliveryError(_)
                | Record::Error(_) => {}
                Record::Unknown { .. } => unreachable!(),
            }
        }
        samples
    }

    #[test]
    fn every_written_type_is_known_to_the_parser() {
        let samples = one_of_each();
        let tags: std::collections::BTreeSet<&str> =
            samples.iter().map(Record::record_type).collect();
        let known: std::collections::BTreeSet<&str> = KNOWN_TYPES.iter().copied().collect();
        assert_eq!(tags, known);
        assert_eq!(known.len(), KNOWN_TYPES.len());
        for record in samples {
            let tag = record.record_type().to_string();
            let line = to_line(&record).unwrap();
            assert!(line.contains(&format!(r#""type":"{tag}""#)), "{line}");
            assert_eq!(parse_line(&line).unwrap(), record);
        }
    }

    #[test]
    fn unknown_record_is_never_written() {
        let record = Record::Unknown {
            record_type: "PING".into(),
            payload: Value::Null,
        };
        assert!(to_line(&record).is_err());
    }
}
