//! Small helpers for decoding protobuf messages with a location-tagged error.

use crate::error::{new_protobuf_error, Result};
use protobuf::Message;

pub(crate) fn parse_message_from_bytes<M: Message>(bytes: &[u8], location: &'static str) -> Result<M> {
    M::parse_from_bytes(bytes).map_err(|err| new_protobuf_error(err, location))
}
