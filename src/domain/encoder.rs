//! Wire encoding for server-push frames.
//!
//! Frame layout, one line each, newline-terminated, in this order:
//!
//! ```text
//! event: <kind>        (omitted if kind absent/empty)
//! id: <id>             (omitted if id absent/empty)
//! retry: <millis>      (omitted if absent)
//! data: <json payload>
//! <blank line>
//! ```

use std::io::Write;

use axum::body::Bytes;

use super::Event;

/// Failure to turn an [`Event`] into a frame.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    /// The payload could not be serialized to JSON.
    #[error("payload is not serializable: {0}")]
    Payload(#[source] serde_json::Error),

    /// A single-line field contains a line break and would split the frame.
    #[error("{field} must not contain line breaks: {value:?}")]
    InvalidField {
        /// Name of the offending field (`"event"` or `"id"`).
        field: &'static str,
        /// The rejected value.
        value: String,
    },
}

/// Encodes `event` as one complete frame.
///
/// The returned buffer is immutable and cheap to clone, so a broadcast
/// encodes once and hands the same frame to every client.
///
/// # Errors
///
/// Returns [`EncodeError::InvalidField`] if `kind` or `id` contain `\r` or
/// `\n`, and [`EncodeError::Payload`] if the payload fails to serialize.
pub fn encode(event: &Event) -> Result<Bytes, EncodeError> {
    let mut buf = Vec::with_capacity(64);

    if let Some(kind) = non_empty(event.kind.as_deref()) {
        check_single_line("event", kind)?;
        push_line(&mut buf, "event", kind);
    }
    if let Some(id) = non_empty(event.id.as_deref()) {
        check_single_line("id", id)?;
        push_line(&mut buf, "id", id);
    }
    if let Some(retry) = event.retry_millis {
        push_line(&mut buf, "retry", &retry.to_string());
    }

    buf.extend_from_slice(b"data: ");
    serde_json::to_writer(&mut buf, &event.payload).map_err(EncodeError::Payload)?;
    buf.extend_from_slice(b"\n\n");

    Ok(Bytes::from(buf))
}

/// Encodes a frame carrying only a reconnect hint.
///
/// Parsers apply the hint without dispatching an event.
#[must_use]
pub fn encode_retry(millis: u64) -> Bytes {
    let mut buf = Vec::with_capacity(24);
    // Writing to a Vec cannot fail.
    let _ = write!(buf, "retry: {millis}\n\n");
    Bytes::from(buf)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn check_single_line(field: &'static str, value: &str) -> Result<(), EncodeError> {
    if value.contains(['\r', '\n']) {
        return Err(EncodeError::InvalidField {
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

fn push_line(buf: &mut Vec<u8>, field: &str, value: &str) {
    buf.extend_from_slice(field.as_bytes());
    buf.extend_from_slice(b": ");
    buf.extend_from_slice(value.as_bytes());
    buf.push(b'\n');
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    /// Fields recovered from a frame the way an `EventSource` parser reads them.
    #[derive(Debug, Default, PartialEq)]
    struct Parsed {
        kind: Option<String>,
        id: Option<String>,
        retry: Option<u64>,
        data: Vec<String>,
    }

    fn parse(frame: &[u8]) -> Parsed {
        let Ok(text) = std::str::from_utf8(frame) else {
            panic!("frame is not utf-8");
        };
        let Some(body) = text.strip_suffix("\n\n") else {
            panic!("frame not terminated by a blank line: {text:?}");
        };
        let mut parsed = Parsed::default();
        for line in body.split('\n') {
            let (field, value) = line.split_once(": ").unwrap_or((line, ""));
            match field {
                "event" => parsed.kind = Some(value.to_string()),
                "id" => parsed.id = Some(value.to_string()),
                "retry" => parsed.retry = value.parse().ok(),
                "data" => parsed.data.push(value.to_string()),
                other => panic!("unexpected field {other:?}"),
            }
        }
        parsed
    }

    fn encode_ok(event: &Event) -> Bytes {
        let Ok(frame) = encode(event) else {
            panic!("encoding failed");
        };
        frame
    }

    #[test]
    fn full_frame_layout() {
        let event = Event::new(serde_json::json!({"user": 1}))
            .with_kind("ping")
            .with_id("7")
            .with_retry(1500);
        let frame = encode_ok(&event);
        assert_eq!(
            &frame[..],
            b"event: ping\nid: 7\nretry: 1500\ndata: {\"user\":1}\n\n"
        );
    }

    #[test]
    fn fields_survive_parsing() {
        let payload = serde_json::json!({
            "user": 1,
            "message": "line one\nline two",
            "nested": [1, 2, {"ok": true}],
        });
        let event = Event::new(payload.clone())
            .with_kind("update")
            .with_id("abc-123")
            .with_retry(0);
        let parsed = parse(&encode_ok(&event));

        assert_eq!(parsed.kind.as_deref(), Some("update"));
        assert_eq!(parsed.id.as_deref(), Some("abc-123"));
        assert_eq!(parsed.retry, Some(0));
        let [data] = parsed.data.as_slice() else {
            panic!("expected exactly one data line");
        };
        let Ok(decoded) = serde_json::from_str::<serde_json::Value>(data) else {
            panic!("data is not json");
        };
        assert_eq!(decoded, payload);
    }

    #[test]
    fn bare_event_is_single_data_line() {
        let frame = encode_ok(&Event::new(serde_json::json!("hi")));
        assert_eq!(&frame[..], b"data: \"hi\"\n\n");
    }

    #[test]
    fn empty_optional_fields_are_omitted() {
        let event = Event::new(serde_json::Value::Null)
            .with_kind("")
            .with_id("");
        let frame = encode_ok(&event);
        assert_eq!(&frame[..], b"data: null\n\n");
    }

    #[test]
    fn line_break_in_kind_is_rejected() {
        let event = Event::new(serde_json::Value::Null).with_kind("a\nb");
        let result = encode(&event);
        assert!(matches!(
            result,
            Err(EncodeError::InvalidField { field: "event", .. })
        ));
    }

    #[test]
    fn carriage_return_in_id_is_rejected() {
        let event = Event::new(serde_json::Value::Null).with_id("1\r2");
        assert!(matches!(
            encode(&event),
            Err(EncodeError::InvalidField { field: "id", .. })
        ));
    }

    #[test]
    fn retry_only_frame() {
        assert_eq!(&encode_retry(2500)[..], b"retry: 2500\n\n");
    }
}
