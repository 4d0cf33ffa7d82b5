//! Swarm telemetry capture decoding
//!
//! Reads classic pcap files of Ethernet traffic and decodes the telemetry
//! frames sent to UDP port 3751:
//!
//! - [`pcap`]: the capture container
//! - [`net`]: Ethernet (with 802.1Q/802.1ad tags), IPv4/IPv6 and UDP headers
//! - [`frame`]: the telemetry header and its status/position payloads
//!
//! ```no_run
//! use swarmmap_capture::{CaptureReader, FrameBody};
//!
//! # fn main() -> swarmmap_capture::Result<()> {
//! for frame in CaptureReader::open("swarm.pcap")?.frames() {
//!     if let Ok(frame) = frame? {
//!         if let FrameBody::Position(position) = frame.body {
//!             println!("{} at {}, {}", frame.header.source, position.latitude, position.longitude);
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod frame;
pub mod net;
pub mod pcap;

pub use error::{Error, Result, SkipReason};
pub use frame::{decode_packet, Frame, FrameBody, FrameHeader, FrameKind, Frames};
pub use pcap::{CaptureReader, Endian, Record};
