use codee::{Decoder, Encoder};

use crate::error::HubError;
use crate::{HubClientMessage, HubServerMessage};

/// Codec for hub traffic over text WebSocket frames.
///
/// Outgoing frames carry a JSON-encoded [`HubClientMessage`], incoming frames a
/// JSON-encoded [`HubServerMessage`]. One message per frame.
///
/// ## Usage
///
/// ```rust,ignore
/// use vmbind_common::codec::HubJsonCodec;
/// use vmbind_common::{HubClientMessage, HubServerMessage};
///
/// let ws = use_websocket_with_options::<HubClientMessage, HubServerMessage, HubJsonCodec, (), DummyEncoder>(
///     "ws://127.0.0.1:5000/hub",
///     options
/// );
/// ```
pub struct HubJsonCodec;

impl Encoder<HubClientMessage> for HubJsonCodec {
    type Error = HubError;
    type Encoded = String;

    fn encode(val: &HubClientMessage) -> Result<Self::Encoded, Self::Error> {
        serde_json::to_string(val).map_err(|e| HubError::Serialization(e.to_string()))
    }
}

impl Decoder<HubServerMessage> for HubJsonCodec {
    type Error = HubError;
    type Encoded = str;

    fn decode(val: &Self::Encoded) -> Result<HubServerMessage, Self::Error> {
        serde_json::from_str(val).map_err(|e| HubError::Deserialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DisposeVm, ResponseVm};
    use serde_json::json;

    #[test]
    fn test_encode_dispose() {
        let msg = HubClientMessage::DisposeVm(DisposeVm { vm_id: "Clock".into() });
        let enc = HubJsonCodec::encode(&msg).unwrap();
        assert_eq!(enc, r#"{"DisposeVm":{"vm_id":"Clock"}}"#);
    }

    #[test]
    fn test_decode_response() {
        let frame = r#"{"ResponseVm":{"vm_id":"Clock","data":{"Seconds":3}}}"#;
        let dec = HubJsonCodec::decode(frame).unwrap();
        assert_eq!(
            dec,
            HubServerMessage::ResponseVm(ResponseVm {
                vm_id: "Clock".into(),
                data: json!({ "Seconds": 3 }),
            })
        );
    }

    #[test]
    fn test_decode_garbage_is_error() {
        let err = HubJsonCodec::decode("not json").unwrap_err();
        assert!(matches!(err, HubError::Deserialization(_)));
    }
}
