//! # Journal — Append-Only Record Log
//!
//! The journal is a single file that only ever grows. Each record is one
//! frame:
//!
//! ```text
//! [0 .. 4)        payload length, u32 little-endian
//! [4 .. 8)        CRC32 of the payload, u32 little-endian
//! [8 .. 8 + len)  payload: the record as JSON
//! ```
//!
//! Frames are written with a single `write_all` and flushed before the
//! append returns. A crash can still leave a torn frame at the tail; it is
//! cut off when the journal is next opened for writing, and skipped by
//! [`Journal::read_file`]. A checksum mismatch anywhere else is
//! corruption and is reported, never skipped.

use std::fs::{File, OpenOptions};
use std::io::{self, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use lq_core::{Record, RecordStore, StoreError};

/// Size of the frame header (length + checksum).
pub const FRAME_HEADER_SIZE: usize = 8;

/// Largest accepted payload: 16 MiB.
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// The append-only journal file.
pub struct Journal {
    path: PathBuf,

    /// Append handle. Held for the duration of every read and write, so a
    /// reader never observes a half-written frame.
    file: Mutex<File>,
}

impl Journal {
    /// Open (or create) the journal at `path`.
    ///
    /// The whole file is scanned once. A torn trailing frame is truncated;
    /// a corrupt frame fails the open.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;

        let scan = scan(BufReader::new(File::open(&path)?))?;
        if scan.torn {
            file.set_len(scan.valid_len)?;
        }

        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    /// Read the records of the journal at `path` without opening it for
    /// writing. The file must exist. A torn tail is skipped but left in
    /// place, since a writer may still be completing that frame.
    pub fn read_file(path: impl AsRef<Path>) -> io::Result<Vec<Record>> {
        let scan = scan(BufReader::new(File::open(path)?))?;
        Ok(scan.records)
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record.
    pub fn write_record(&self, record: &Record) -> io::Result<()> {
        let frame = encode_frame(record)?;
        let mut file = self.lock()?;
        file.write_all(&frame)?;
        file.flush()
    }

    /// Append a batch of records with one write.
    pub fn write_records(&self, records: &[Record]) -> io::Result<usize> {
        let mut buf = Vec::new();
        for record in records {
            buf.extend_from_slice(&encode_frame(record)?);
        }
        let mut file = self.lock()?;
        file.write_all(&buf)?;
        file.flush()?;
        Ok(records.len())
    }

    /// Read every record in append order.
    pub fn read_records(&self) -> io::Result<Vec<Record>> {
        let _guard = self.lock()?;
        let scan = scan(BufReader::new(File::open(&self.path)?))?;
        Ok(scan.records)
    }

    /// Number of records, by a full scan.
    pub fn len(&self) -> io::Result<usize> {
        Ok(self.read_records()?.len())
    }

    pub fn is_empty(&self) -> io::Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Force written frames to stable storage.
    pub fn sync(&self) -> io::Result<()> {
        self.lock()?.sync_data()
    }

    fn lock(&self) -> io::Result<MutexGuard<'_, File>> {
        self.file
            .lock()
            .map_err(|_| io::Error::other("journal lock poisoned"))
    }
}

impl RecordStore for Journal {
    fn append(&self, record: Record) -> Result<(), StoreError> {
        self.write_record(&record)?;
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.read_records()?)
    }

    fn append_all(&self, records: Vec<Record>) -> Result<usize, StoreError> {
        Ok(self.write_records(&records)?)
    }
}

fn encode_frame(record: &Record) -> io::Result<Vec<u8>> {
    let payload = serde_json::to_vec(record)?;
    if payload.len() > MAX_FRAME_SIZE {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "record of {} bytes exceeds the {} byte frame limit",
                payload.len(),
                MAX_FRAME_SIZE
            ),
        ));
    }

    let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

struct Scan {
    records: Vec<Record>,
    /// Byte length of the intact frames.
    valid_len: u64,
    /// The file ends in a partial frame.
    torn: bool,
}

fn scan<R: Read>(mut reader: R) -> io::Result<Scan> {
    let mut records = Vec::new();
    let mut offset: u64 = 0;
    let mut header = [0u8; FRAME_HEADER_SIZE];

    let torn = loop {
        match read_full(&mut reader, &mut header)? {
            0 => break false,
            n if n < FRAME_HEADER_SIZE => break true,
            _ => {}
        }

        let len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let checksum = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        if len > MAX_FRAME_SIZE {
            return Err(corrupt(offset, "frame length exceeds limit"));
        }

        let mut payload = vec![0u8; len];
        if read_full(&mut reader, &mut payload)? < len {
            break true;
        }
        if crc32fast::hash(&payload) != checksum {
            return Err(corrupt(offset, "checksum mismatch"));
        }

        let record: Record =
            serde_json::from_slice(&payload).map_err(|e| corrupt(offset, &e.to_string()))?;
        records.push(record);
        offset += (FRAME_HEADER_SIZE + len) as u64;
    };

    Ok(Scan {
        records,
        valid_len: offset,
        torn,
    })
}

/// Fill `buf` as far as the reader allows. Returns the bytes read; fewer
/// than `buf.len()` means end of file.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
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

fn corrupt(offset: u64, detail: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::InvalidData,
        format!("journal corrupt at byte {}: {}", offset, detail),
    )
}
