//! Error types for swarmmap-capture.

use thiserror::Error;

/// Result type for capture file operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end reading a capture file.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file does not start with a pcap magic number.
    #[error("not a pcap capture (magic {0:#010x})")]
    BadMagic(u32),

    #[error("unsupported pcap version {major}.{minor}")]
    UnsupportedVersion { major: u16, minor: u16 },

    /// Only Ethernet captures are understood.
    #[error("unsupported link type {0}")]
    UnsupportedLinkType(u32),

    /// The file ended in the middle of a header or record.
    #[error("truncated {what}: expected {expected} bytes, got {got}")]
    Truncated {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A record claims more data than any capture would hold.
    #[error("record length {0} exceeds limit")]
    Oversized(u32),
}

/// Why a single packet was passed over. Reading continues with the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("packet too short ({0} bytes)")]
    TooShort(usize),

    #[error("unsupported ethertype {0:#06x}")]
    EtherType(u16),

    #[error("invalid IPv4 header (version {version}, ihl {ihl})")]
    Ipv4Header { version: u8, ihl: u8 },

    #[error("invalid IPv6 header (version {0})")]
    Ipv6Header(u8),

    /// The IP payload is not UDP.
    #[error("transport protocol {0} is not UDP")]
    NotUdp(u8),

    #[error("destination port {0} is not telemetry")]
    Port(u16),

    #[error("telemetry version {0} unsupported")]
    Version(u8),

    #[error("unknown telemetry kind {0}")]
    Kind(u8),

    /// The frame's declared length does not fit its kind or the packet.
    #[error("telemetry length {0} invalid")]
    Length(u32),

    /// A header or payload ran past the end of the packet.
    #[error("{0} truncated")]
    Truncated(&'static str),
}
