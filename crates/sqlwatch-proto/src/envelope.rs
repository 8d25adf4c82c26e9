//! Transport decoding and envelope parsing for queue messages.
//!
//! A notification arrives as the `message_body` column of a receive result:
//! a hex-encoded, UTF-16LE encoded XML document of the shape
//!
//! ```text
//! <qn:QueryNotification xmlns:qn="..." type="change" source="data" info="update">
//!   <qn:Message>{"subscription":"orders","id":"..."}</qn:Message>
//! </qn:QueryNotification>
//! ```
//!
//! The first two bytes of the decoded body are the UTF-16 byte order mark
//! and are skipped unconditionally; this offset is part of the transport
//! contract. The envelope shape is fixed, so it is parsed by a small
//! scanner rather than a general XML parser.

use crate::Error;

/// Root element of the notification envelope.
pub const ENVELOPE_ELEMENT: &str = "qn:QueryNotification";

/// Element carrying the embedded correlation payload.
pub const MESSAGE_ELEMENT: &str = "qn:Message";

/// A parsed notification envelope.
///
/// `source` and `info` are the raw attribute strings; mapping them onto
/// notification kinds happens in [`crate::notification`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    /// The `source` attribute (e.g. "data", "timeout", "statement").
    pub source: String,
    /// The `info` attribute (e.g. "insert", "update", "delete", "none").
    pub info: String,
    /// Text content of the message element: the correlation payload.
    pub message: String,
}

/// Decode a hex-encoded UTF-16LE message body into text.
///
/// The decoded bytes must start with the 2-byte BOM; decoding begins at
/// offset 2. An odd trailing byte count or invalid UTF-16 is an error.
pub fn decode_message_body(body: &str) -> Result<String, Error> {
    let bytes = hex::decode(body.trim())
        .map_err(|e| Error::Transport(format!("message body is not valid hex: {}", e)))?;

    if bytes.len() < 2 {
        return Err(Error::Transport(format!(
            "message body too short for byte order mark: {} bytes",
            bytes.len()
        )));
    }

    let payload = &bytes[2..];
    if payload.len() % 2 != 0 {
        return Err(Error::Transport(format!(
            "message body has odd UTF-16 byte count: {}",
            payload.len()
        )));
    }

    let units: Vec<u16> = payload
        .chunks_exact(2)
        .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
        .collect();

    String::from_utf16(&units)
        .map_err(|e| Error::Transport(format!("message body is not valid UTF-16: {}", e)))
}

/// Encode text as a hex-encoded UTF-16LE message body.
///
/// Inverse of [`decode_message_body`]; used by test fixtures and tooling
/// that fake the backend side of the queue.
pub fn encode_message_body(text: &str) -> String {
    let mut bytes = vec![0xFF, 0xFE];
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_le_bytes());
    }
    hex::encode(bytes)
}

/// Parse a notification envelope from its XML text.
pub fn parse_envelope(xml: &str) -> Result<Envelope, Error> {
    let open = format!("<{}", ENVELOPE_ELEMENT);
    let start = xml
        .find(&open)
        .ok_or_else(|| Error::InvalidEnvelope(format!("missing {} element", ENVELOPE_ELEMENT)))?;

    let after_name = start + open.len();
    let tag_end = xml[after_name..]
        .find('>')
        .map(|i| after_name + i)
        .ok_or_else(|| Error::InvalidEnvelope("unterminated envelope start tag".to_string()))?;
    let attrs = &xml[after_name..tag_end];

    let source = attribute(attrs, "source")
        .ok_or_else(|| Error::InvalidEnvelope("missing source attribute".to_string()))?;
    let info = attribute(attrs, "info")
        .ok_or_else(|| Error::InvalidEnvelope("missing info attribute".to_string()))?;
    let message = element_text(&xml[tag_end + 1..], MESSAGE_ELEMENT)?;

    Ok(Envelope {
        source: unescape(source)?,
        info: unescape(info)?,
        message: unescape(message.trim())?,
    })
}

/// Find the value of a named attribute within a start tag's attribute text.
fn attribute<'a>(attrs: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{}=\"", name);
    let mut search = attrs;
    let mut offset = 0;

    while let Some(pos) = search.find(&needle) {
        let absolute = offset + pos;
        // Must be a whole attribute name, not a suffix of another one.
        let preceded_ok = absolute == 0
            || attrs[..absolute]
                .chars()
                .next_back()
                .is_some_and(char::is_whitespace);
        if preceded_ok {
            let value_start = absolute + needle.len();
            let value_len = attrs[value_start..].find('"')?;
            return Some(&attrs[value_start..value_start + value_len]);
        }
        offset = absolute + needle.len();
        search = &attrs[offset..];
    }
    None
}

/// Extract the text content of the first occurrence of an element.
fn element_text<'a>(xml: &'a str, name: &str) -> Result<&'a str, Error> {
    let open = format!("<{}>", name);
    let close = format!("</{}>", name);

    let start = xml
        .find(&open)
        .ok_or_else(|| Error::InvalidEnvelope(format!("missing {} element", name)))?
        + open.len();
    let len = xml[start..]
        .find(&close)
        .ok_or_else(|| Error::InvalidEnvelope(format!("unterminated {} element", name)))?;

    Ok(&xml[start..start + len])
}

/// Resolve the five predefined XML entities.
fn unescape(text: &str) -> Result<String, Error> {
    if !text.contains('&') {
        return Ok(text.to_string());
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        let entity_end = rest[pos..]
            .find(';')
            .ok_or_else(|| Error::InvalidEnvelope("unterminated XML entity".to_string()))?;
        let entity = &rest[pos..pos + entity_end + 1];
        out.push(match entity {
            "&amp;" => '&',
            "&lt;" => '<',
            "&gt;" => '>',
            "&quot;" => '"',
            "&apos;" => '\'',
            other => {
                return Err(Error::InvalidEnvelope(format!(
                    "unknown XML entity: {}",
                    other
                )))
            }
        });
        rest = &rest[pos + entity_end + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_xml(source: &str, info: &str, message: &str) -> String {
        format!(
            r#"<qn:QueryNotification xmlns:qn="http://schemas.microsoft.com/SQL/Notifications/QueryNotification" type="change" source="{}" info="{}"><qn:Message>{}</qn:Message></qn:QueryNotification>"#,
            source, info, message
        )
    }

    #[test]
    fn test_message_body_roundtrip() {
        let xml = sample_xml("data", "update", "{\"subscription\":\"s\",\"id\":\"1\"}");
        let body = encode_message_body(&xml);
        assert_eq!(decode_message_body(&body).unwrap(), xml);
    }

    #[test]
    fn test_decode_rejects_bad_hex() {
        let err = decode_message_body("zz").unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_decode_rejects_short_body() {
        // One byte: no room for the byte order mark.
        let err = decode_message_body("ff").unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_decode_rejects_odd_utf16_length() {
        // BOM plus three payload bytes.
        let err = decode_message_body("fffe610061").unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
    }

    #[test]
    fn test_parse_envelope() {
        let xml = sample_xml("data", "insert", "{\"subscription\":\"orders\",\"id\":\"abc\"}");
        let envelope = parse_envelope(&xml).unwrap();

        assert_eq!(envelope.source, "data");
        assert_eq!(envelope.info, "insert");
        assert_eq!(envelope.message, "{\"subscription\":\"orders\",\"id\":\"abc\"}");
    }

    #[test]
    fn test_parse_envelope_attribute_order_irrelevant() {
        let xml = r#"<qn:QueryNotification info="none" source="timeout" type="change"><qn:Message>{}</qn:Message></qn:QueryNotification>"#;
        let envelope = parse_envelope(xml).unwrap();

        assert_eq!(envelope.source, "timeout");
        assert_eq!(envelope.info, "none");
    }

    #[test]
    fn test_parse_envelope_unescapes_entities() {
        let xml = sample_xml("data", "update", "{&quot;subscription&quot;:&quot;a&amp;b&quot;}");
        let envelope = parse_envelope(xml.as_str()).unwrap();
        assert_eq!(envelope.message, "{\"subscription\":\"a&b\"}");
    }

    #[test]
    fn test_parse_envelope_missing_root() {
        let err = parse_envelope("<other/>").unwrap_err();
        assert!(matches!(err, Error::InvalidEnvelope(_)));
    }

    #[test]
    fn test_parse_envelope_missing_source() {
        let xml = r#"<qn:QueryNotification info="update"><qn:Message>{}</qn:Message></qn:QueryNotification>"#;
        let err = parse_envelope(xml).unwrap_err();
        assert!(matches!(err, Error::InvalidEnvelope(_)));
    }

    #[test]
    fn test_parse_envelope_missing_message() {
        let xml = r#"<qn:QueryNotification source="data" info="update"></qn:QueryNotification>"#;
        let err = parse_envelope(xml).unwrap_err();
        assert!(matches!(err, Error::InvalidEnvelope(_)));
    }

    #[test]
    fn test_attribute_not_fooled_by_suffix() {
        // "xsource" must not satisfy a lookup for "source".
        let attrs = r#"xsource="wrong" source="right""#;
        assert_eq!(attribute(attrs, "source"), Some("right"));
    }
}
