//! Envelope - typed container carried over the datagram transport
//!
//! Wire format: `{"type": "metric" | "action", "payload": <JSON record>}`.
//! The payload is kept as raw JSON text, so the router can forward it
//! byte-for-byte without interpreting it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use thiserror::Error;

use super::usage::{Action, Metric};

/// Envelope codec errors
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("malformed envelope: {0}")]
    Malformed(String),

    #[error("unknown envelope type: {0}")]
    UnknownKind(String),

    #[error("failed to encode envelope: {0}")]
    Encode(String),
}

/// Closed set of payload kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvelopeKind {
    Metric,
    Action,
}

impl EnvelopeKind {
    /// Wire discriminant emitted by encoders
    pub fn as_str(&self) -> &'static str {
        match self {
            EnvelopeKind::Metric => "metric",
            EnvelopeKind::Action => "action",
        }
    }

    /// Parse a wire discriminant. `metadata` is the legacy spelling of `metric`.
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "metric" | "metadata" => Some(EnvelopeKind::Metric),
            "action" => Some(EnvelopeKind::Action),
            _ => None,
        }
    }
}

impl std::fmt::Display for EnvelopeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct WireOut<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    payload: &'a RawValue,
}

#[derive(Deserialize)]
struct WireIn<'a> {
    #[serde(rename = "type")]
    kind: String,
    #[serde(borrow)]
    payload: &'a RawValue,
}

/// Typed envelope around an opaque JSON payload
#[derive(Debug, Clone)]
pub struct Envelope {
    kind: EnvelopeKind,
    payload: Box<RawValue>,
}

impl Envelope {
    /// Wrap a metric sample
    pub fn metric(metric: &Metric) -> Result<Self, EnvelopeError> {
        Self::wrap(EnvelopeKind::Metric, metric)
    }

    /// Wrap a lifecycle action
    pub fn action(action: &Action) -> Result<Self, EnvelopeError> {
        Self::wrap(EnvelopeKind::Action, action)
    }

    fn wrap<T: Serialize>(kind: EnvelopeKind, record: &T) -> Result<Self, EnvelopeError> {
        let payload = serde_json::value::to_raw_value(record)
            .map_err(|e| EnvelopeError::Encode(e.to_string()))?;
        Ok(Self { kind, payload })
    }

    pub fn kind(&self) -> EnvelopeKind {
        self.kind
    }

    /// Payload as raw JSON text
    pub fn payload(&self) -> &str {
        self.payload.get()
    }

    /// Payload bytes, exactly as they appeared on the wire
    pub fn into_payload(self) -> Bytes {
        Bytes::copy_from_slice(self.payload.get().as_bytes())
    }

    /// Serialize to a single datagram
    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        let wire = WireOut {
            kind: self.kind.as_str(),
            payload: &self.payload,
        };
        serde_json::to_vec(&wire).map_err(|e| EnvelopeError::Encode(e.to_string()))
    }

    /// Decode a datagram. The payload is validated as JSON but not interpreted.
    pub fn decode(datagram: &[u8]) -> Result<Self, EnvelopeError> {
        let wire: WireIn<'_> = serde_json::from_slice(datagram)
            .map_err(|e| EnvelopeError::Malformed(e.to_string()))?;

        let kind =
            EnvelopeKind::from_wire(&wire.kind).ok_or(EnvelopeError::UnknownKind(wire.kind))?;

        Ok(Self {
            kind,
            payload: wire.payload.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metric() -> Metric {
        Metric {
            pod: "fn-hello-00001".into(),
            cpu_percent: 0.0,
            mem_mb: 42.25,
            timestamp: 1_700_000_000,
            tenant: "acme".into(),
        }
    }

    #[test]
    fn test_encoded_envelope_shape() {
        let envelope = Envelope::metric(&sample_metric()).unwrap();
        let bytes = envelope.encode().unwrap();

        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "metric");
        assert_eq!(value["payload"]["pod"], "fn-hello-00001");
        assert_eq!(value["payload"]["mem_mb"], 42.25);
    }

    #[test]
    fn test_decoded_payload_is_byte_identical() {
        let metric = sample_metric();
        let expected = serde_json::to_vec(&metric).unwrap();

        let datagram = Envelope::metric(&metric).unwrap().encode().unwrap();
        let decoded = Envelope::decode(&datagram).unwrap();

        assert_eq!(decoded.kind(), EnvelopeKind::Metric);
        assert_eq!(decoded.into_payload().as_ref(), expected.as_slice());
    }

    #[test]
    fn test_payload_formatting_is_preserved() {
        // Whitespace and key order inside the payload survive decoding
        let datagram = br#"{"type":"action","payload":{ "tenant":"acme",  "pod":"p", "action":"stop", "timestamp":5 }}"#;
        let decoded = Envelope::decode(datagram).unwrap();

        assert_eq!(decoded.kind(), EnvelopeKind::Action);
        assert_eq!(
            decoded.payload(),
            r#"{ "tenant":"acme",  "pod":"p", "action":"stop", "timestamp":5 }"#
        );
    }

    #[test]
    fn test_legacy_metadata_kind() {
        let datagram = br#"{"type":"metadata","payload":{"pod":"p"}}"#;
        let decoded = Envelope::decode(datagram).unwrap();
        assert_eq!(decoded.kind(), EnvelopeKind::Metric);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let datagram = br#"{"type":"heartbeat","payload":{}}"#;
        match Envelope::decode(datagram) {
            Err(EnvelopeError::UnknownKind(kind)) => assert_eq!(kind, "heartbeat"),
            other => panic!("expected UnknownKind, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_datagram_rejected() {
        assert!(matches!(
            Envelope::decode(b"not json"),
            Err(EnvelopeError::Malformed(_))
        ));
        assert!(matches!(
            Envelope::decode(br#"{"type":"metric"}"#),
            Err(EnvelopeError::Malformed(_))
        ));
    }
}
