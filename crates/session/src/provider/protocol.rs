//! Wire protocol for the live-debug socket
//!
//! # Wire Format
//!
//! All messages are length-prefixed:
//! ```text
//! ┌──────────────┬──────────┬──────────────────────────┐
//! │ 4 bytes      │ 1 byte   │ N-1 bytes                │
//! │ length (BE)  │ type     │ payload                  │
//! └──────────────┴──────────┴──────────────────────────┘
//! ```
//!
//! # Message Types
//!
//! - `Subscribe` (0x01): Client → Server, component id + sample rate
//! - `Record` (0x02): Server → Client, one line of debug text
//! - `Heartbeat` (0x03): Server → Client, keep-alive
//! - `Error` (0x04): Server → Client, subscription error
//!
//! Strings are `u32 BE length + UTF-8`. The sample rate is an `f64` BE.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Result, SessionError};
use crate::provider::SubscribeRequest;

/// Message type discriminants
const MSG_SUBSCRIBE: u8 = 0x01;
const MSG_RECORD: u8 = 0x02;
const MSG_HEARTBEAT: u8 = 0x03;
const MSG_ERROR: u8 = 0x04;

/// Largest frame accepted from the wire
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Messages exchanged with the live-debug socket
#[derive(Debug, Clone, PartialEq)]
pub enum StreamMessage {
    /// Client → Server: start streaming a component
    Subscribe(SubscribeRequest),
    /// Server → Client: one record
    Record(String),
    /// Server → Client: keep-alive
    Heartbeat,
    /// Server → Client: the subscription cannot continue
    Error(String),
}

impl StreamMessage {
    /// Encode message to bytes with length prefix
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(64);

        // Reserve space for length prefix (filled in at end)
        buf.put_u32(0);

        match self {
            StreamMessage::Subscribe(req) => {
                buf.put_u8(MSG_SUBSCRIBE);
                encode_string(&req.component_id, &mut buf);
                buf.put_f64(req.sample_rate);
            }
            StreamMessage::Record(text) => {
                buf.put_u8(MSG_RECORD);
                encode_string(text, &mut buf);
            }
            StreamMessage::Heartbeat => {
                buf.put_u8(MSG_HEARTBEAT);
            }
            StreamMessage::Error(msg) => {
                buf.put_u8(MSG_ERROR);
                encode_string(msg, &mut buf);
            }
        }

        // Write length prefix (excluding the 4-byte length field itself)
        let len = (buf.len() - 4) as u32;
        buf[0..4].copy_from_slice(&len.to_be_bytes());

        buf.freeze()
    }

    /// Decode message from bytes (without length prefix)
    pub fn decode(mut buf: Bytes) -> Result<Self> {
        if buf.is_empty() {
            return Err(SessionError::Protocol("empty message".into()));
        }

        let msg_type = buf.get_u8();

        match msg_type {
            MSG_SUBSCRIBE => {
                let component_id = decode_string(&mut buf)?;
                if buf.remaining() < 8 {
                    return Err(SessionError::Protocol("truncated sample rate".into()));
                }
                let sample_rate = buf.get_f64();
                if sample_rate.is_nan() {
                    return Err(SessionError::Protocol("sample rate is NaN".into()));
                }
                Ok(StreamMessage::Subscribe(
                    SubscribeRequest::new(component_id).with_sample_rate(sample_rate),
                ))
            }
            MSG_RECORD => Ok(StreamMessage::Record(decode_string(&mut buf)?)),
            MSG_HEARTBEAT => Ok(StreamMessage::Heartbeat),
            MSG_ERROR => Ok(StreamMessage::Error(decode_string(&mut buf)?)),
            _ => Err(SessionError::Protocol(format!(
                "unknown message type: {msg_type}"
            ))),
        }
    }
}

/// Split one complete frame off the front of `buf`
///
/// Returns `Ok(None)` when more bytes are needed.
pub fn split_frame(buf: &mut BytesMut) -> Result<Option<Bytes>> {
    let Some(len) = read_length_prefix(&buf[..]) else {
        return Ok(None);
    };
    let len = len as usize;

    if len > MAX_FRAME_LEN {
        return Err(SessionError::Protocol(format!(
            "frame of {len} bytes exceeds limit of {MAX_FRAME_LEN}"
        )));
    }

    if buf.len() < 4 + len {
        return Ok(None);
    }

    buf.advance(4);
    Ok(Some(buf.split_to(len).freeze()))
}

/// Read exactly 4 bytes for length prefix
pub fn read_length_prefix(buf: &[u8]) -> Option<u32> {
    if buf.len() < 4 {
        return None;
    }
    Some(u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

fn encode_string(s: &str, buf: &mut BytesMut) {
    let bytes = s.as_bytes();
    buf.put_u32(bytes.len() as u32);
    buf.put_slice(bytes);
}

fn decode_string(buf: &mut Bytes) -> Result<String> {
    if buf.remaining() < 4 {
        return Err(SessionError::Protocol("truncated string length".into()));
    }
    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(SessionError::Protocol("truncated string".into()));
    }
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec())
        .map_err(|e| SessionError::Protocol(format!("invalid UTF-8: {e}")))
}

#[cfg(test)]
#[path = "protocol_test.rs"]
mod tests;
