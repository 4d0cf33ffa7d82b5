//! Link, network and transport headers in front of a telemetry frame.

use bytes::{Buf, Bytes};

use crate::error::SkipReason;

/// Smallest Ethernet/IPv4/UDP packet that can carry a telemetry header.
pub const MIN_PACKET_LEN: usize = 54;

/// UDP port telemetry is sent to.
pub const TELEMETRY_PORT: u16 = 3751;

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_IPV6: u16 = 0x86DD;
pub const ETHERTYPE_VLAN: u16 = 0x8100;
pub const ETHERTYPE_QINQ: u16 = 0x88A8;

const IPPROTO_UDP: u8 = 17;
const IPV6_HEADER_LEN: usize = 40;
const UDP_HEADER_LEN: usize = 8;

fn need(buf: &Bytes, len: usize, what: &'static str) -> Result<(), SkipReason> {
    if buf.remaining() < len {
        return Err(SkipReason::Truncated(what));
    }
    Ok(())
}

/// Strip Ethernet, IP and UDP headers, returning the UDP payload.
///
/// Accepts one 802.1Q tag, or an 802.1ad tag optionally followed by an
/// inner 802.1Q tag.
pub fn udp_payload(packet: &Bytes) -> Result<Bytes, SkipReason> {
    if packet.len() < MIN_PACKET_LEN {
        return Err(SkipReason::TooShort(packet.len()));
    }
    let mut buf = packet.clone();

    // Destination and source MAC
    buf.advance(12);
    let mut ethertype = buf.get_u16();
    match ethertype {
        ETHERTYPE_VLAN => {
            need(&buf, 4, "802.1Q tag")?;
            buf.advance(2);
            ethertype = buf.get_u16();
        }
        ETHERTYPE_QINQ => {
            need(&buf, 4, "802.1ad tag")?;
            buf.advance(2);
            ethertype = buf.get_u16();
            if ethertype == ETHERTYPE_VLAN {
                need(&buf, 4, "802.1Q tag")?;
                buf.advance(2);
                ethertype = buf.get_u16();
            }
        }
        _ => {}
    }

    let protocol = match ethertype {
        ETHERTYPE_IPV4 => ipv4(&mut buf)?,
        ETHERTYPE_IPV6 => ipv6(&mut buf)?,
        other => return Err(SkipReason::EtherType(other)),
    };
    if protocol != IPPROTO_UDP {
        return Err(SkipReason::NotUdp(protocol));
    }

    need(&buf, UDP_HEADER_LEN, "UDP header")?;
    let _source_port = buf.get_u16();
    let port = buf.get_u16();
    if port != TELEMETRY_PORT {
        return Err(SkipReason::Port(port));
    }
    // length, checksum
    buf.advance(4);

    Ok(buf)
}

/// Consume an IPv4 header including options; returns the protocol.
fn ipv4(buf: &mut Bytes) -> Result<u8, SkipReason> {
    need(buf, 20, "IPv4 header")?;
    let first = buf[0];
    let (version, ihl) = (first >> 4, first & 0x0F);
    if version != 4 || ihl < 5 {
        return Err(SkipReason::Ipv4Header { version, ihl });
    }

    let header_len = usize::from(ihl) * 4;
    need(buf, header_len, "IPv4 options")?;
    let protocol = buf[9];
    buf.advance(header_len);
    Ok(protocol)
}

/// Consume the fixed IPv6 header; returns the next header.
fn ipv6(buf: &mut Bytes) -> Result<u8, SkipReason> {
    need(buf, IPV6_HEADER_LEN, "IPv6 header")?;
    let version = buf[0] >> 4;
    if version != 6 {
        return Err(SkipReason::Ipv6Header(version));
    }
    let next_header = buf[6];
    buf.advance(IPV6_HEADER_LEN);
    Ok(next_header)
}
