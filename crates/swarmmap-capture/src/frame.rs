//! Telemetry frames carried in UDP payloads.
//!
//! ```text
//!  0       1       2       3
//! +-------+-------+-------+-------+
//! |ver|knd|     total length      |
//! +-------+-------+-------+-------+
//! |    source     |  destination  |
//! +-------+-------+-------+-------+
//! |           sequence            |
//! +-------+-------+-------+-------+
//! |            payload ...
//! ```
//!
//! All fields are big-endian. `total length` includes the 12-byte header.

use std::io::Read;

use bytes::{Buf, Bytes};
use swarmmap_graph::{NodeId, Position, Status};

use crate::error::{Result, SkipReason};
use crate::net::udp_payload;
use crate::pcap::CaptureReader;

/// The only telemetry version understood.
pub const VERSION: u8 = 1;

pub const HEADER_LEN: usize = 12;

/// Status payload before the unit name.
pub const STATUS_LEN: usize = 12;

pub const POSITION_LEN: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Message = 0,
    Status = 1,
    Command = 2,
    Position = 3,
}

impl TryFrom<u8> for FrameKind {
    type Error = SkipReason;

    fn try_from(value: u8) -> std::result::Result<Self, SkipReason> {
        match value {
            0 => Ok(Self::Message),
            1 => Ok(Self::Status),
            2 => Ok(Self::Command),
            3 => Ok(Self::Position),
            other => Err(SkipReason::Kind(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub kind: FrameKind,
    /// Header plus payload, in bytes
    pub length: u32,
    pub source: u16,
    pub destination: u16,
    pub sequence: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameBody {
    Position(Position),
    Status { status: Status, name: String },
    /// Messages and commands carry nothing the graph uses.
    Other(FrameKind),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub header: FrameHeader,
    pub body: FrameBody,
}

impl Frame {
    /// The unit this frame reports on.
    pub fn source(&self) -> NodeId {
        NodeId(self.header.source)
    }

    /// Decode a frame from a UDP payload.
    pub fn decode(mut buf: Bytes) -> std::result::Result<Self, SkipReason> {
        if buf.remaining() < HEADER_LEN {
            return Err(SkipReason::Truncated("telemetry header"));
        }

        let first = buf.get_u8();
        let version = first >> 4;
        if version != VERSION {
            return Err(SkipReason::Version(version));
        }
        let kind = FrameKind::try_from(first & 0x0F)?;
        let length = buf.get_uint(3) as u32;
        let header = FrameHeader {
            kind,
            length,
            source: buf.get_u16(),
            destination: buf.get_u16(),
            sequence: buf.get_u32(),
        };

        let body = match kind {
            FrameKind::Status => decode_status(&mut buf, length)?,
            FrameKind::Position => decode_position(&mut buf, length)?,
            other => FrameBody::Other(other),
        };
        Ok(Self { header, body })
    }
}

fn decode_status(buf: &mut Bytes, length: u32) -> std::result::Result<FrameBody, SkipReason> {
    let name_len = (length as usize)
        .checked_sub(HEADER_LEN + STATUS_LEN)
        .ok_or(SkipReason::Length(length))?;
    if buf.remaining() < STATUS_LEN + name_len {
        return Err(SkipReason::Truncated("status payload"));
    }

    // 24-bit two's complement
    let hp = ((buf.get_uint(3) as i32) << 8) >> 8;
    let armor = buf.get_u8();
    let max_hp = buf.get_uint(3) as u32;
    let category = buf.get_u8();
    let speed = buf.get_f32();

    let raw_name = buf.split_to(name_len);
    let name = String::from_utf8_lossy(&raw_name)
        .trim_end_matches('\0')
        .to_owned();

    Ok(FrameBody::Status {
        status: Status {
            hp,
            max_hp,
            armor,
            category,
            speed,
        },
        name,
    })
}

fn decode_position(buf: &mut Bytes, length: u32) -> std::result::Result<FrameBody, SkipReason> {
    if (length as usize) < HEADER_LEN + POSITION_LEN {
        return Err(SkipReason::Length(length));
    }
    if buf.remaining() < POSITION_LEN {
        return Err(SkipReason::Truncated("position payload"));
    }

    let longitude = buf.get_f64();
    let latitude = buf.get_f64();
    Ok(FrameBody::Position(Position {
        latitude,
        longitude,
        altitude: buf.get_f32(),
        bearing: buf.get_f32(),
        speed: buf.get_f32(),
        accuracy: buf.get_f32(),
    }))
}

/// Strip the network headers from a captured packet and decode its frame.
pub fn decode_packet(packet: &Bytes) -> std::result::Result<Frame, SkipReason> {
    Frame::decode(udp_payload(packet)?)
}

/// Telemetry frames from a capture, one item per record.
///
/// The outer `Result` ends iteration (the file is unusable); the inner one
/// reports a packet that was skipped.
#[derive(Debug)]
pub struct Frames<R> {
    records: CaptureReader<R>,
}

impl<R: Read> Frames<R> {
    pub fn new(records: CaptureReader<R>) -> Self {
        Self { records }
    }
}

impl<R: Read> CaptureReader<R> {
    /// Decode every record as a telemetry frame.
    pub fn frames(self) -> Frames<R> {
        Frames::new(self)
    }
}

impl<R: Read> Iterator for Frames<R> {
    type Item = Result<std::result::Result<Frame, SkipReason>>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.records.next()? {
            Ok(record) => record,
            Err(e) => return Some(Err(e)),
        };
        Some(Ok(decode_packet(&record.data)))
    }
}
