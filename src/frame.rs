//! Wire framing: `SEQ(4) | TYPE(1) | LEN(2) | PAYLOAD(LEN) | CRC32(4)`,
//! big-endian throughout, CRC-32 computed over everything before it.

/// Bytes before the payload: sequence (4), type (1), payload length (2).
pub const HEADER_LEN: usize = 7;

/// Width of the trailing CRC-32.
pub const CRC_LEN: usize = 4;

/// The length field is two bytes, so payloads top out at 64 KiB - 1.
pub const MAX_PAYLOAD_LEN: usize = u16::MAX as usize;

/// Frame type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FrameKind {
    Join = 0x00,
    Place = 0x01,
    Fire = 0x02,
    Chat = 0x03,
    StateSync = 0x04,
    Ping = 0x05,
    Pong = 0x06,
    Quit = 0x07,
    Error = 0xFF,
}

impl FrameKind {
    pub fn from_byte(byte: u8) -> Option<FrameKind> {
        match byte {
            0x00 => Some(FrameKind::Join),
            0x01 => Some(FrameKind::Place),
            0x02 => Some(FrameKind::Fire),
            0x03 => Some(FrameKind::Chat),
            0x04 => Some(FrameKind::StateSync),
            0x05 => Some(FrameKind::Ping),
            0x06 => Some(FrameKind::Pong),
            0x07 => Some(FrameKind::Quit),
            0xFF => Some(FrameKind::Error),
            _ => None,
        }
    }
}

/// Faults detected while decoding or sequencing frames. All of them fail
/// closed: no partially trusted payload ever escapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Buffer is shorter than the header claims.
    Truncated { needed: usize, got: usize },
    /// Buffer holds more bytes than the header accounts for.
    LengthMismatch { expected: usize, got: usize },
    /// CRC-32 over header and payload disagrees with the trailer.
    ChecksumMismatch { expected: u32, got: u32 },
    /// Type byte is not part of the protocol.
    UnknownKind(u8),
    /// Payload does not fit the two-byte length field.
    PayloadTooLong(usize),
    /// Sequence number at or below the last accepted one.
    StaleSequence { last: u32, got: u32 },
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtocolError::Truncated { needed, got } => {
                write!(f, "Truncated frame: needed {} bytes, got {}", needed, got)
            }
            ProtocolError::LengthMismatch { expected, got } => {
                write!(
                    f,
                    "Frame length mismatch: header accounts for {} bytes, got {}",
                    expected, got
                )
            }
            ProtocolError::ChecksumMismatch { expected, got } => {
                write!(
                    f,
                    "Checksum mismatch: computed {:#010x}, frame carries {:#010x}",
                    expected, got
                )
            }
            ProtocolError::UnknownKind(byte) => {
                write!(f, "Unknown frame type {:#04x}", byte)
            }
            ProtocolError::PayloadTooLong(len) => {
                write!(f, "Payload of {} bytes exceeds {}", len, MAX_PAYLOAD_LEN)
            }
            ProtocolError::StaleSequence { last, got } => {
                write!(
                    f,
                    "Stale sequence number: got {}, last accepted was {}",
                    got, last
                )
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

/// One wire frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub seq: u32,
    pub kind: FrameKind,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(seq: u32, kind: FrameKind, payload: Vec<u8>) -> Self {
        Self { seq, kind, payload }
    }

    pub fn text(seq: u32, kind: FrameKind, text: &str) -> Self {
        Self::new(seq, kind, text.as_bytes().to_vec())
    }

    /// Payload interpreted as text; non-UTF-8 bytes are replaced.
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    pub fn encode(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.payload.len() > MAX_PAYLOAD_LEN {
            return Err(ProtocolError::PayloadTooLong(self.payload.len()));
        }
        let mut buf = Vec::with_capacity(HEADER_LEN + self.payload.len() + CRC_LEN);
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.push(self.kind as u8);
        buf.extend_from_slice(&(self.payload.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.payload);
        let crc = crc32fast::hash(&buf);
        buf.extend_from_slice(&crc.to_be_bytes());
        Ok(buf)
    }

    /// Decode one complete frame. The buffer must hold exactly the bytes the
    /// header accounts for, and the checksum is verified before the type tag
    /// or payload is trusted.
    pub fn decode(buf: &[u8]) -> Result<Frame, ProtocolError> {
        if buf.len() < HEADER_LEN + CRC_LEN {
            return Err(ProtocolError::Truncated {
                needed: HEADER_LEN + CRC_LEN,
                got: buf.len(),
            });
        }
        let seq = u32::from_be_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let kind_byte = buf[4];
        let len = u16::from_be_bytes([buf[5], buf[6]]) as usize;
        let total = HEADER_LEN + len + CRC_LEN;
        if buf.len() < total {
            return Err(ProtocolError::Truncated {
                needed: total,
                got: buf.len(),
            });
        }
        if buf.len() > total {
            return Err(ProtocolError::LengthMismatch {
                expected: total,
                got: buf.len(),
            });
        }
        let crc_offset = HEADER_LEN + len;
        let got = u32::from_be_bytes([
            buf[crc_offset],
            buf[crc_offset + 1],
            buf[crc_offset + 2],
            buf[crc_offset + 3],
        ]);
        let expected = crc32fast::hash(&buf[..crc_offset]);
        if expected != got {
            return Err(ProtocolError::ChecksumMismatch { expected, got });
        }
        let kind =
            FrameKind::from_byte(kind_byte).ok_or(ProtocolError::UnknownKind(kind_byte))?;
        Ok(Frame {
            seq,
            kind,
            payload: buf[HEADER_LEN..crc_offset].to_vec(),
        })
    }
}

/// Read one frame off a byte stream. The outer error is transport-level
/// (EOF, reset); the inner result carries decode faults whose bytes were
/// already consumed, leaving the stream aligned on the next frame.
pub async fn read_frame<R>(reader: &mut R) -> std::io::Result<Result<Frame, ProtocolError>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    use tokio::io::AsyncReadExt;

    let mut header = [0u8; HEADER_LEN];
    reader.read_exact(&mut header).await?;
    let len = u16::from_be_bytes([header[5], header[6]]) as usize;
    let mut rest = vec![0u8; len + CRC_LEN];
    reader.read_exact(&mut rest).await?;
    let mut buf = Vec::with_capacity(HEADER_LEN + rest.len());
    buf.extend_from_slice(&header);
    buf.extend_from_slice(&rest);
    Ok(Frame::decode(&buf))
}
