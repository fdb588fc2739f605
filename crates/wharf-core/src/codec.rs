//! Binary wire codec shared by the host and client WebSocket protocols
//! (spec §4.A).
//!
//! Every frame starts with a big-endian `u16` message type. Several bodies
//! also carry a big-endian `u32` stream id immediately after the type.
//! Strings embedded in a body (paths) are NUL-terminated UTF-8; the
//! terminator separates the string from any binary field that follows.
//! UUIDs are serialized as their 16 raw bytes.
//!
//! Grounded in
//! `original_source/.../domain/common/message_types/ws_msg_types.go` for
//! the exact type table and the "too short" failure mode, translated to a
//! `#[repr(u16)]` enum with `TryFrom<u16>` — the idiomatic Rust equivalent
//! of the Go integer-alias-plus-constants pattern.

use crate::error::CodecError;
use uuid::Uuid;

/// Size in bytes of the message-type header.
pub const MSG_TYPE_SIZE: usize = 2;
/// Size in bytes of a stream id field.
pub const STREAM_ID_SIZE: usize = 4;
/// Size in bytes of a serialized UUID.
pub const UUID_SIZE: usize = 16;

/// The binary message-type table from spec §6.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum MsgType {
    Error = 0,
    Ack = 1,
    InitWithUuidQuery = 2,
    MetadataQuery = 3,
    MetadataResponse = 4,
    DownloadInitRequest = 5,
    DownloadInitResponse = 6,
    ChunkRequest = 7,
    ChunkResponse = 8,
    EofResponse = 9,
    DownloadCompletionRequest = 10,
    InitExistingHost = 11,
    CreateDirectory = 12,
    DeleteResource = 13,
    CreateFileInitRequest = 14,
    CreateFileInitResponse = 15,
    CreateFileStreamEnd = 16,
    CreateFileHostChunkRequest = 17,
}

impl MsgType {
    /// The big-endian two-byte encoding of this message type.
    pub const fn binary(self) -> [u8; 2] {
        write_u16(self as u16)
    }
}

impl TryFrom<u16> for MsgType {
    type Error = CodecError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Ok(match value {
            0 => MsgType::Error,
            1 => MsgType::Ack,
            2 => MsgType::InitWithUuidQuery,
            3 => MsgType::MetadataQuery,
            4 => MsgType::MetadataResponse,
            5 => MsgType::DownloadInitRequest,
            6 => MsgType::DownloadInitResponse,
            7 => MsgType::ChunkRequest,
            8 => MsgType::ChunkResponse,
            9 => MsgType::EofResponse,
            10 => MsgType::DownloadCompletionRequest,
            11 => MsgType::InitExistingHost,
            12 => MsgType::CreateDirectory,
            13 => MsgType::DeleteResource,
            14 => MsgType::CreateFileInitRequest,
            15 => MsgType::CreateFileInitResponse,
            16 => MsgType::CreateFileStreamEnd,
            17 => MsgType::CreateFileHostChunkRequest,
            other => return Err(CodecError::UnknownMsgType(other)),
        })
    }
}

/// Reads the message type from the front of a frame.
///
/// Fails with [`CodecError::FrameTooShort`] if `bytes` is shorter than
/// [`MSG_TYPE_SIZE`], and [`CodecError::UnknownMsgType`] if the value has
/// no known variant — the caller decides whether an unknown type is fatal
/// (the orchestrator treats it as `UnexpectedMessageType`).
pub fn get_msg_type(bytes: &[u8]) -> Result<MsgType, CodecError> {
    if bytes.len() < MSG_TYPE_SIZE {
        return Err(CodecError::FrameTooShort);
    }
    MsgType::try_from(read_u16(&bytes[..MSG_TYPE_SIZE]))
}

/// Reads the 4-byte stream id that immediately follows the message type in
/// several frame shapes, returning it alongside the remaining payload.
///
/// Fails with [`CodecError::StreamIdTooShort`] if `bytes` (the whole frame,
/// message type included) is shorter than `MSG_TYPE_SIZE + STREAM_ID_SIZE`.
pub fn get_stream_id(bytes: &[u8]) -> Result<(u32, &[u8]), CodecError> {
    if bytes.len() < MSG_TYPE_SIZE + STREAM_ID_SIZE {
        return Err(CodecError::StreamIdTooShort);
    }
    let id = read_u32(&bytes[MSG_TYPE_SIZE..MSG_TYPE_SIZE + STREAM_ID_SIZE]);
    Ok((id, &bytes[MSG_TYPE_SIZE + STREAM_ID_SIZE..]))
}

/// Big-endian encodes a `u16`.
pub const fn write_u16(v: u16) -> [u8; 2] {
    v.to_be_bytes()
}

/// Decodes a big-endian `u16`. Panics if `bytes` is shorter than 2 — callers
/// are expected to have already validated frame length via
/// [`get_msg_type`]/[`get_stream_id`].
pub fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes(bytes[..2].try_into().expect("slice bounds checked by caller"))
}

/// Big-endian encodes a `u32`.
pub const fn write_u32(v: u32) -> [u8; 4] {
    v.to_be_bytes()
}

/// Decodes a big-endian `u32`. Panics if `bytes` is shorter than 4.
pub fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes(bytes[..4].try_into().expect("slice bounds checked by caller"))
}

/// Serializes a UUID as its 16 raw bytes.
pub fn write_uuid(id: Uuid) -> [u8; UUID_SIZE] {
    *id.as_bytes()
}

/// Parses a UUID from its 16 raw bytes.
pub fn read_uuid(bytes: &[u8]) -> Result<Uuid, CodecError> {
    if bytes.len() < UUID_SIZE {
        return Err(CodecError::FrameTooShort);
    }
    let mut buf = [0u8; UUID_SIZE];
    buf.copy_from_slice(&bytes[..UUID_SIZE]);
    Ok(Uuid::from_bytes(buf))
}

/// Encodes `s` as NUL-terminated UTF-8 bytes.
///
/// Rejects `s` if it already contains a NUL byte (Open Question 3, spec
/// §9): an embedded NUL would make the terminator ambiguous, so this
/// encoder refuses to emit a frame a reader could misparse rather than
/// silently truncating at the first NUL.
pub fn write_nul_terminated(s: &str) -> Result<Vec<u8>, CodecError> {
    if s.as_bytes().contains(&0) {
        return Err(CodecError::EmbeddedNul);
    }
    let mut out = Vec::with_capacity(s.len() + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    Ok(out)
}

/// Reads a NUL-terminated UTF-8 string from the front of `bytes`, returning
/// the string and whatever binary data follows the terminator.
pub fn read_nul_terminated(bytes: &[u8]) -> Result<(&str, &[u8]), CodecError> {
    let terminator = bytes
        .iter()
        .position(|&b| b == 0)
        .ok_or(CodecError::MissingTerminator)?;
    let s = std::str::from_utf8(&bytes[..terminator]).map_err(|_| CodecError::InvalidUtf8)?;
    Ok((s, &bytes[terminator + 1..]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u16_roundtrip() {
        for x in [0u16, 1, 255, 256, u16::MAX] {
            assert_eq!(read_u16(&write_u16(x)), x);
        }
    }

    #[test]
    fn u32_roundtrip() {
        for x in [0u32, 1, 65536, u32::MAX] {
            assert_eq!(read_u32(&write_u32(x)), x);
        }
    }

    #[test]
    fn get_msg_type_roundtrip() {
        let rest = b"trailing payload";
        let mut frame = MsgType::MetadataResponse.binary().to_vec();
        frame.extend_from_slice(rest);
        assert_eq!(get_msg_type(&frame).unwrap(), MsgType::MetadataResponse);
    }

    #[test]
    fn get_msg_type_rejects_short_frame() {
        assert_eq!(get_msg_type(&[0x00]), Err(CodecError::FrameTooShort));
        assert_eq!(get_msg_type(&[]), Err(CodecError::FrameTooShort));
    }

    #[test]
    fn get_stream_id_rejects_short_frame() {
        let mut frame = MsgType::ChunkRequest.binary().to_vec();
        frame.extend_from_slice(&[0x00, 0x01, 0x02]); // only 3 of 4 id bytes
        assert_eq!(get_stream_id(&frame), Err(CodecError::StreamIdTooShort));
    }

    #[test]
    fn get_stream_id_splits_payload() {
        let mut frame = MsgType::ChunkRequest.binary().to_vec();
        frame.extend_from_slice(&write_u32(888));
        frame.extend_from_slice(b"payload");
        let (id, payload) = get_stream_id(&frame).unwrap();
        assert_eq!(id, 888);
        assert_eq!(payload, b"payload");
    }

    #[test]
    fn nul_terminated_roundtrip() {
        let encoded = write_nul_terminated("foo/bar.txt").unwrap();
        let (s, rest) = read_nul_terminated(&encoded).unwrap();
        assert_eq!(s, "foo/bar.txt");
        assert!(rest.is_empty());
    }

    #[test]
    fn nul_terminated_rejects_embedded_nul() {
        assert_eq!(
            write_nul_terminated("foo\0bar"),
            Err(CodecError::EmbeddedNul)
        );
    }

    #[test]
    fn nul_terminated_rejects_missing_terminator() {
        assert_eq!(
            read_nul_terminated(b"no terminator here"),
            Err(CodecError::MissingTerminator)
        );
    }

    #[test]
    fn uuid_roundtrip() {
        let id = Uuid::new_v4();
        let bytes = write_uuid(id);
        assert_eq!(read_uuid(&bytes).unwrap(), id);
    }
}
