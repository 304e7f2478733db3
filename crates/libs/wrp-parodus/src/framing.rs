//! Length-prefixed msgpack framing over `tokio::net::UnixStream` (§4.5.1):
//! a 4-byte big-endian length prefix followed by an `rmp-serde`-encoded
//! [`Message`], reproducing nanomsg PUSH/PULL delivery over a transport the
//! dependency stack actually has a binding for.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};

use wrp_core::{codec, Message, WrpError};

pub async fn write_message(writer: &mut OwnedWriteHalf, msg: &Message) -> Result<(), WrpError> {
    let encoded = codec::encode(msg)?;
    let framed = codec::frame(&encoded);
    writer.write_all(&framed).await?;
    Ok(())
}

pub async fn read_message(reader: &mut OwnedReadHalf) -> Result<Message, WrpError> {
    let mut prefix = [0u8; codec::FRAME_PREFIX_LEN];
    reader.read_exact(&mut prefix).await?;
    let len = codec::read_frame_len(&prefix);
    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    codec::decode(&buf)
}
