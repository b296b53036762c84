//! Message and service type traits
//!
//! Payloads cross the transport as opaque byte buffers. Types implementing
//! [`Message`] are encoded with `serde_json`, which stands in for the
//! generated serialization support of schema types.

use crate::error::{RclError, RclResult};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A message schema type.
pub trait Message: Serialize + DeserializeOwned + Default + Send + 'static {
    /// Fully qualified type name, e.g. `std_msgs/msg/String`.
    const TYPE_NAME: &'static str;
}

/// A service schema type: a request/response pair.
pub trait ServiceType: Send + 'static {
    const SERVICE_TYPE: &'static str;
    type Request: Message;
    type Response: Message;
}

pub(crate) fn encode<M: Message>(message: &M) -> RclResult<Vec<u8>> {
    serde_json::to_vec(message).map_err(|source| RclError::Encode {
        type_name: M::TYPE_NAME,
        source,
    })
}

pub(crate) fn decode<M: Message>(bytes: &[u8]) -> RclResult<M> {
    serde_json::from_slice(bytes).map_err(|source| RclError::Decode {
        type_name: M::TYPE_NAME,
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interfaces::StringMessage;

    #[test]
    fn test_encode_decode_string() {
        let msg = StringMessage {
            data: "hello".to_string(),
        };
        let bytes = encode(&msg).unwrap();
        let back: StringMessage = decode(&bytes).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_decode_garbage_names_type() {
        let err = decode::<StringMessage>(b"not json").unwrap_err();
        assert!(matches!(
            err,
            RclError::Decode {
                type_name: "std_msgs/msg/String",
                ..
            }
        ));
    }
}
