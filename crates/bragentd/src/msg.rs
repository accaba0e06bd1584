//! Message codec for the agent wire protocol
//!
//! One frame on the wire is:
//!
//! ```text
//! offset 0: u32 code            (big-endian)
//! offset 4: u32 payload_length  (big-endian)
//! offset 8: payload_length bytes of payload
//! ```
//!
//! The payload shape is determined entirely by the code; the frame itself is
//! not self-describing beyond the length field. Encoding and decoding are
//! pure functions over byte buffers with checked-length cursor operations.

use std::fmt;
use std::io::Cursor;

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{AgentError, Result};
use crate::settings::{Settings, SETTINGS_WIRE_SIZE};

/// Frame header size: u32 code + u32 payload length
pub const MSG_HEADER_SIZE: usize = 8;

/// Largest frame accepted on either direction of the link
pub const MAX_FRAME_SIZE: usize = 2048;

/// Largest payload a frame can declare
pub const MAX_PAYLOAD_SIZE: usize = MAX_FRAME_SIZE - MSG_HEADER_SIZE;

/// Request/response codes of the agent protocol (closed set)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MsgCode {
    /// Topology request; inbound frames with this code carry a topology
    /// payload pushed by the SoC
    GetTopology = 0x01,
    /// Request for the current configuration parameters
    GetConfigParams = 0x02,
    /// Configuration parameter install; carries a [`Settings`] payload
    SetConfigParams = 0x03,
    /// Start the border router on the SoC
    StartBr = 0x04,
    /// Stop the border router on the SoC
    StopBr = 0x05,
}

impl MsgCode {
    /// Map a decoded wire code to the closed set
    pub fn from_wire(raw: u32) -> Result<Self> {
        match raw {
            0x01 => Ok(Self::GetTopology),
            0x02 => Ok(Self::GetConfigParams),
            0x03 => Ok(Self::SetConfigParams),
            0x04 => Ok(Self::StartBr),
            0x05 => Ok(Self::StopBr),
            other => Err(AgentError::UnknownCode(other)),
        }
    }

    /// Map a caller-supplied request code to the closed set
    ///
    /// Same mapping as [`MsgCode::from_wire`], but a miss means the caller
    /// asked to build a request the protocol does not define, which is a
    /// distinct failure from receiving garbage off the wire.
    pub fn from_request(raw: u32) -> Result<Self> {
        Self::from_wire(raw).map_err(|_| AgentError::UnsupportedCode(raw))
    }

    pub fn as_u32(self) -> u32 {
        self as u32
    }
}

impl fmt::Display for MsgCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::GetTopology => "GET_TOPOLOGY",
            Self::GetConfigParams => "GET_CONFIG_PARAMS",
            Self::SetConfigParams => "SET_CONFIG_PARAMS",
            Self::StartBr => "START_BR",
            Self::StopBr => "STOP_BR",
        };
        f.write_str(name)
    }
}

/// One protocol message: a code and its opaque payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Msg {
    pub code: MsgCode,
    pub payload: Vec<u8>,
}

impl Msg {
    /// Build a payload-less request
    pub fn request(code: MsgCode) -> Self {
        Self {
            code,
            payload: Vec::new(),
        }
    }

    /// Build a `SET_CONFIG_PARAMS` message carrying the given settings
    pub fn set_config(settings: &Settings) -> Self {
        Self {
            code: MsgCode::SetConfigParams,
            payload: settings.to_wire(),
        }
    }

    /// Encode the message into a wire frame
    ///
    /// Codes with no defined request payload encode to exactly
    /// [`MSG_HEADER_SIZE`] bytes; `SET_CONFIG_PARAMS` encodes to the header
    /// plus the fixed-layout settings record. A payload that does not match
    /// the code's rule is rejected, never silently truncated or padded.
    pub fn encode(&self) -> Result<Vec<u8>> {
        match self.code {
            MsgCode::GetTopology
            | MsgCode::GetConfigParams
            | MsgCode::StartBr
            | MsgCode::StopBr => {
                if !self.payload.is_empty() {
                    return Err(AgentError::InvalidPayload(format!(
                        "{} takes no payload, got {} bytes",
                        self.code,
                        self.payload.len()
                    )));
                }
            }
            MsgCode::SetConfigParams => {
                if self.payload.len() != SETTINGS_WIRE_SIZE {
                    return Err(AgentError::InvalidPayload(format!(
                        "{} payload must be {} bytes, got {}",
                        self.code,
                        SETTINGS_WIRE_SIZE,
                        self.payload.len()
                    )));
                }
            }
        }

        let mut buf = Vec::with_capacity(MSG_HEADER_SIZE + self.payload.len());
        buf.extend_from_slice(&self.code.as_u32().to_be_bytes());
        buf.extend_from_slice(&(self.payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        Ok(buf)
    }

    /// Decode one frame from a byte buffer
    ///
    /// The payload copy is bounded by the declared length field; a buffer
    /// shorter than `8 + declared_length` is rejected as truncated before
    /// any payload bytes are read.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < MSG_HEADER_SIZE {
            return Err(AgentError::Truncated {
                needed: MSG_HEADER_SIZE,
                have: buf.len(),
            });
        }

        let mut cursor = Cursor::new(buf);
        let raw_code = cursor.read_u32::<BigEndian>()?;
        let declared_len = cursor.read_u32::<BigEndian>()? as usize;

        let code = MsgCode::from_wire(raw_code)?;

        if declared_len > MAX_PAYLOAD_SIZE {
            return Err(AgentError::Allocation(declared_len));
        }
        if buf.len() < MSG_HEADER_SIZE + declared_len {
            return Err(AgentError::Truncated {
                needed: MSG_HEADER_SIZE + declared_len,
                have: buf.len(),
            });
        }

        let payload = buf[MSG_HEADER_SIZE..MSG_HEADER_SIZE + declared_len].to_vec();
        Ok(Self { code, payload })
    }
}

/// Format a payload as a hex dump for debug logging
pub fn hex_dump(payload: &[u8]) -> String {
    let mut out = String::with_capacity(payload.len() * 3 + payload.len() / 16 * 8);
    for (i, byte) in payload.iter().enumerate() {
        if i % 16 == 0 {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!("{i:04x}: "));
        }
        out.push_str(&format!("{byte:02x} "));
    }
    out
}
