//! Msgpack encode/decode for [`Message`], plus the length-prefixed framing
//! used on the libparodus adapter's sockets (§4.5.1).

use crate::error::WrpError;
use crate::message::Message;

/// Encodes a message as msgpack.
pub fn encode(msg: &Message) -> Result<Vec<u8>, WrpError> {
    Ok(rmp_serde::to_vec_named(msg)?)
}

/// Decodes a message from msgpack.
pub fn decode(bytes: &[u8]) -> Result<Message, WrpError> {
    Ok(rmp_serde::from_slice(bytes)?)
}

/// Length of the big-endian `u32` frame prefix used by [`frame`]/[`unframe`].
pub const FRAME_PREFIX_LEN: usize = 4;

/// Prefixes an encoded message with its big-endian length, for the
/// stream-oriented Unix domain sockets the adapter dials and listens on.
pub fn frame(encoded: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(FRAME_PREFIX_LEN + encoded.len());
    framed.extend_from_slice(&(encoded.len() as u32).to_be_bytes());
    framed.extend_from_slice(encoded);
    framed
}

/// Reads the big-endian length prefix, returning the expected payload length.
pub fn read_frame_len(prefix: &[u8; FRAME_PREFIX_LEN]) -> usize {
    u32::from_be_bytes(*prefix) as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageType;

    #[test]
    fn roundtrips_a_representative_message() {
        let msg = Message::new(MessageType::SimpleEvent, "mac:112233445566/eventer", "event:event_1/x")
            .with_payload(b"hello".to_vec())
            .with_content_type("application/json");
        let encoded = encode(&msg).expect("encode");
        let decoded = decode(&encoded).expect("decode");
        assert_eq!(decoded.source, msg.source);
        assert_eq!(decoded.destination, msg.destination);
        assert_eq!(decoded.payload, msg.payload);
        assert_eq!(decoded.content_type, msg.content_type);
    }

    #[test]
    fn rejects_garbage_bytes() {
        assert!(decode(&[0xff, 0x00, 0x01]).is_err());
    }

    #[test]
    fn frame_prefix_matches_payload_length() {
        let payload = encode(&Message::new(MessageType::ServiceAlive, "mac:a", "mac:b")).expect("encode");
        let framed = frame(&payload);
        let mut prefix = [0u8; FRAME_PREFIX_LEN];
        prefix.copy_from_slice(&framed[..FRAME_PREFIX_LEN]);
        assert_eq!(read_frame_len(&prefix), payload.len());
        assert_eq!(&framed[FRAME_PREFIX_LEN..], payload.as_slice());
    }
}
