//! Classic pcap file reader.
//!
//! A capture is a 24-byte global header followed by records, each a 16-byte
//! record header and `incl_len` bytes of link-layer data. The magic number
//! decides the byte order of every header field after it.

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use bytes::{Buf, Bytes};
use tracing::{debug, trace};

use crate::error::{Error, Result};

/// Magic number as written by a little-endian host.
pub const MAGIC: u32 = 0xA1B2_C3D4;

/// Ethernet link type.
pub const LINKTYPE_ETHERNET: u32 = 1;

pub const GLOBAL_HEADER_LEN: usize = 24;
pub const RECORD_HEADER_LEN: usize = 16;

/// Largest record accepted (the libpcap snapshot limit).
pub const MAX_RECORD_LEN: u32 = 262_144;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    fn u16(self, buf: &mut impl Buf) -> u16 {
        match self {
            Endian::Little => buf.get_u16_le(),
            Endian::Big => buf.get_u16(),
        }
    }

    fn u32(self, buf: &mut impl Buf) -> u32 {
        match self {
            Endian::Little => buf.get_u32_le(),
            Endian::Big => buf.get_u32(),
        }
    }
}

/// One captured packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub ts_sec: u32,
    pub ts_usec: u32,
    /// Length on the wire, which may exceed `data.len()`
    pub original_len: u32,
    pub data: Bytes,
}

/// Iterates over the records of a pcap stream.
///
/// Yields `Err` at most once; iteration ends after any error.
#[derive(Debug)]
pub struct CaptureReader<R> {
    reader: R,
    endian: Endian,
    snaplen: u32,
    done: bool,
}

impl CaptureReader<BufReader<File>> {
    /// Open a capture file and validate its global header.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> CaptureReader<R> {
    /// Read and validate the global header.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut raw = [0u8; GLOBAL_HEADER_LEN];
        let got = read_full(&mut reader, &mut raw)?;
        if got < GLOBAL_HEADER_LEN {
            return Err(Error::Truncated {
                what: "global header",
                expected: GLOBAL_HEADER_LEN,
                got,
            });
        }

        let mut header = &raw[..];
        let magic = header.get_u32_le();
        let endian = if magic == MAGIC {
            Endian::Little
        } else if magic == MAGIC.swap_bytes() {
            Endian::Big
        } else {
            return Err(Error::BadMagic(magic));
        };

        let major = endian.u16(&mut header);
        let minor = endian.u16(&mut header);
        if (major, minor) != (2, 4) {
            return Err(Error::UnsupportedVersion { major, minor });
        }

        // thiszone, sigfigs
        header.advance(8);
        let snaplen = endian.u32(&mut header);
        let link_type = endian.u32(&mut header);
        if link_type != LINKTYPE_ETHERNET {
            return Err(Error::UnsupportedLinkType(link_type));
        }

        debug!(?endian, snaplen, "opened capture");
        Ok(Self {
            reader,
            endian,
            snaplen,
            done: false,
        })
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn snaplen(&self) -> u32 {
        self.snaplen
    }

    /// Read the next record, or `None` at a clean end of file.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let mut raw = [0u8; RECORD_HEADER_LEN];
        let got = read_full(&mut self.reader, &mut raw)?;
        if got == 0 {
            return Ok(None);
        }
        if got < RECORD_HEADER_LEN {
            return Err(Error::Truncated {
                what: "record header",
                expected: RECORD_HEADER_LEN,
                got,
            });
        }

        let mut header = &raw[..];
        let ts_sec = self.endian.u32(&mut header);
        let ts_usec = self.endian.u32(&mut header);
        let incl_len = self.endian.u32(&mut header);
        let original_len = self.endian.u32(&mut header);

        if incl_len > MAX_RECORD_LEN {
            return Err(Error::Oversized(incl_len));
        }

        let mut data = vec![0u8; incl_len as usize];
        let got = read_full(&mut self.reader, &mut data)?;
        if got < data.len() {
            return Err(Error::Truncated {
                what: "record",
                expected: data.len(),
                got,
            });
        }

        trace!(incl_len, original_len, "read record");
        Ok(Some(Record {
            ts_sec,
            ts_usec,
            original_len,
            data: Bytes::from(data),
        }))
    }
}

impl<R: Read> Iterator for CaptureReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` as far as the reader allows; returns the byte count.
fn read_full(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
