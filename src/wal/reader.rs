//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

use crate::error::{MpdbError, Result};

use super::entry::{parse_header, MAX_PAYLOAD_SIZE};
use super::{WalEntry, HEADER_SIZE};

/// Outcome of reading one frame
pub(crate) enum Frame {
    /// A complete, checksummed entry
    Entry(WalEntry),

    /// Clean end of file
    End,

    /// The file ends in the middle of a frame (partial write)
    Torn,

    /// A complete frame whose checksum or payload is invalid
    Corrupt(MpdbError),
}

/// Reads entries from the WAL file
pub struct WalReader {
    reader: BufReader<File>,
    /// Offset just past the last complete, valid entry
    position: u64,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            reader: BufReader::new(file),
            position: 0,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// Returns `Ok(None)` at end of file; partial or corrupted frames are
    /// reported as `MpdbError::WalCorruption`.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.next_frame()? {
            Frame::Entry(entry) => Ok(Some(entry)),
            Frame::End => Ok(None),
            Frame::Torn => Err(MpdbError::WalCorruption(format!(
                "Partial entry at offset {}",
                self.position
            ))),
            Frame::Corrupt(e) => Err(e),
        }
    }

    /// Offset just past the last valid entry read so far
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Iterate over all valid entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }

    pub(crate) fn next_frame(&mut self) -> Result<Frame> {
        let mut header = [0u8; HEADER_SIZE];
        match read_full(&mut self.reader, &mut header)? {
            0 => return Ok(Frame::End),
            n if n < HEADER_SIZE => return Ok(Frame::Torn),
            _ => {}
        }

        let (lsn, crc, len) = parse_header(&header);
        if len > MAX_PAYLOAD_SIZE {
            return Ok(Frame::Corrupt(MpdbError::WalCorruption(format!(
                "Entry length {} exceeds maximum at LSN {}",
                len, lsn
            ))));
        }

        let mut data = vec![0u8; len];
        if read_full(&mut self.reader, &mut data)? < len {
            return Ok(Frame::Torn);
        }

        match WalEntry::from_parts(lsn, crc, &data) {
            Ok(entry) => {
                self.position += (HEADER_SIZE + len) as u64;
                Ok(Frame::Entry(entry))
            }
            Err(e) => Ok(Frame::Corrupt(e)),
        }
    }
}

/// Iterator over WAL entries
///
/// Stops after the first error.
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
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

/// Fill `buf` as far as the file allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}
