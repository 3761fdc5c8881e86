//! Batch envelope: one `BatchRequest` element carrying multiple commands.
//!
//! Each child element is dispatched against the registry by its root name.
//! The `onerror` attribute picks the failure policy: `continue` (default)
//! records the failing member and keeps going, `stop` abandons the members
//! after the first failure.

use crate::codec::{Codec, CodecError};
use crate::value::MessageValue;
use crate::xml::XmlElement;

pub const BATCH_ROOT: &str = "BatchRequest";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnError {
    #[default]
    Continue,
    Stop,
}

impl OnError {
    fn as_wire(self) -> &'static str {
        match self {
            OnError::Continue => "continue",
            OnError::Stop => "stop",
        }
    }
}

/// Result of decoding a batch: members that decoded, members that failed.
#[derive(Debug)]
pub struct BatchDecodeResult {
    pub messages: Vec<DecodedMessage>,
    pub failed: Vec<FailedMessage>,
    /// Members after the first failure that were not attempted (stop mode).
    pub skipped: usize,
}

#[derive(Debug)]
pub struct DecodedMessage {
    pub root: String,
    pub value: MessageValue,
}

#[derive(Debug)]
pub struct FailedMessage {
    pub root: String,
    /// Position within the batch, in document order.
    pub index: usize,
    pub reason: String,
}

/// Decode a batch envelope. Member failures (unknown command, bad member
/// content) are reported per member; only a malformed or mis-rooted envelope
/// fails the whole call.
pub fn decode_batch(codec: &Codec, bytes: &[u8]) -> Result<BatchDecodeResult, CodecError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| CodecError::MalformedInput(format!("input is not UTF-8: {}", e)))?;
    let el = XmlElement::parse(text).map_err(|e| CodecError::MalformedInput(e.to_string()))?;
    if el.name != BATCH_ROOT {
        return Err(CodecError::RootMismatch {
            expected: BATCH_ROOT.to_string(),
            found: el.name.clone(),
        });
    }
    let on_error = match el.attr("onerror") {
        None => OnError::Continue,
        Some("continue") => OnError::Continue,
        Some("stop") => OnError::Stop,
        Some(other) => {
            return Err(CodecError::MalformedInput(format!(
                "bad onerror value {:?}",
                other
            )))
        }
    };
    let envelope_ns = el.attr("xmlns");

    let mut result = BatchDecodeResult {
        messages: Vec::new(),
        failed: Vec::new(),
        skipped: 0,
    };
    for (index, child) in el.children.iter().enumerate() {
        // Members inherit the envelope namespace unless they carry their own.
        let ns = child.attr("xmlns").or(envelope_ns);
        let decoded = codec
            .registry()
            .lookup(&child.name, ns)
            .map_err(CodecError::from)
            .and_then(|schema| codec.extract(schema, child));
        match decoded {
            Ok(value) => result.messages.push(DecodedMessage {
                root: child.name.clone(),
                value,
            }),
            Err(e) => {
                log::debug!("batch member {} <{}> failed: {}", index, child.name, e);
                result.failed.push(FailedMessage {
                    root: child.name.clone(),
                    index,
                    reason: e.to_string(),
                });
                if on_error == OnError::Stop {
                    result.skipped = el.children.len() - index - 1;
                    break;
                }
            }
        }
    }
    Ok(result)
}

/// Encode messages into one batch envelope. All members must encode; a batch
/// is never emitted half-built.
pub fn encode_batch(
    codec: &Codec,
    namespace: Option<&str>,
    members: &[(&str, &MessageValue)],
    on_error: OnError,
) -> Result<Vec<u8>, CodecError> {
    let mut el = XmlElement::new(BATCH_ROOT);
    if let Some(ns) = namespace {
        el.set_attr("xmlns", ns);
    }
    el.set_attr("onerror", on_error.as_wire());
    for (root, value) in members {
        let schema = codec.registry().lookup(root, namespace)?;
        let mut child = codec.build_root(schema, value)?;
        // The envelope already carries the namespace.
        child.attrs.retain(|(n, _)| n != "xmlns");
        el.children.push(child);
    }
    Ok(el.to_xml().into_bytes())
}
