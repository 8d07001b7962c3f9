use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use csv::ByteRecord;
use fs2::FileExt;
use tracing::{debug, info, warn};

use crate::error::FeedbackError;
use crate::models::{FeedbackRecord, MAX_RATING, MIN_RATING};

/// Persisted column order, shared by the store file and exports.
pub const COLUMNS: [&str; 6] = ["timestamp", "name", "rating", "emoji", "comment", "sentiment"];

/// Durable append-only sequence of feedback records.
pub trait RecordStore {
    fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError>;

    /// Records in insertion order.
    fn read_all(&self) -> Result<Vec<FeedbackRecord>, FeedbackError>;
}

/// CSV file store, one record per row.
///
/// Appends are serialized by an in-process mutex and an exclusive advisory
/// lock on the file, so writers in other processes are covered too. Reads
/// take no lock and may observe the file just before or just after a write.
#[derive(Debug)]
pub struct CsvFeedbackStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl CsvFeedbackStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FeedbackError> {
        let store = CsvFeedbackStore {
            path: path.into(),
            write_lock: Mutex::new(()),
        };
        store.ensure_initialized()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file with its header row if it is missing or empty.
    /// A file that already holds data is left untouched and never opened
    /// for writing, so read-only stores still open. Safe to call any
    /// number of times.
    pub fn ensure_initialized(&self) -> Result<(), FeedbackError> {
        if self.has_content() {
            return Ok(());
        }

        let _guard = self.guard();
        let mut file = self.open_for_append()?;
        self.write_locked(&mut file, &[])
    }

    fn has_content(&self) -> bool {
        fs::metadata(&self.path)
            .map(|meta| meta.is_file() && meta.len() > 0)
            .unwrap_or(false)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn open_for_append(&self) -> Result<File, FeedbackError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| FeedbackError::write(&self.path, e))?;
        }

        OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| FeedbackError::write(&self.path, e))
    }

    /// Writes `payload` in a single call while holding the file lock,
    /// prefixing the header when the file is still empty, or a line break
    /// when the last row was left unterminated.
    fn write_locked(&self, file: &mut File, payload: &[u8]) -> Result<(), FeedbackError> {
        let to_write_err = |e| FeedbackError::write(&self.path, e);

        file.lock_exclusive().map_err(to_write_err)?;
        let result = (|| -> io::Result<()> {
            let mut buffer = Vec::with_capacity(payload.len() + 64);
            if file.metadata()?.len() == 0 {
                buffer.extend(encode_header()?);
                info!(path = %self.path.display(), "initialized feedback store");
            } else if !payload.is_empty() && !ends_with_line_break(file)? {
                warn!(path = %self.path.display(), "closing unterminated last row");
                buffer.push(b'\n');
            }
            buffer.extend_from_slice(payload);
            if buffer.is_empty() {
                return Ok(());
            }
            file.write_all(&buffer)?;
            file.sync_data()
        })();
        let unlocked = file.unlock();

        result.map_err(to_write_err)?;
        unlocked.map_err(to_write_err)
    }
}

impl RecordStore for CsvFeedbackStore {
    fn append(&self, record: &FeedbackRecord) -> Result<(), FeedbackError> {
        let row = encode_row(record).map_err(|e| FeedbackError::write(&self.path, e))?;

        let _guard = self.guard();
        let mut file = self.open_for_append()?;
        self.write_locked(&mut file, &row)?;

        debug!(path = %self.path.display(), rating = record.rating, "appended feedback");
        Ok(())
    }

    fn read_all(&self) -> Result<Vec<FeedbackRecord>, FeedbackError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                if let Err(err) = self.ensure_initialized() {
                    warn!(error = %err, "could not recreate missing feedback store");
                }
                return Ok(Vec::new());
            }
            Err(err) => return Err(FeedbackError::read(&self.path, err)),
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .from_reader(bytes.as_slice());
        let mut headers = ByteRecord::new();
        let has_header = reader
            .read_byte_record(&mut headers)
            .map_err(|e| FeedbackError::read(&self.path, e))?;

        if !has_header {
            return Ok(Vec::new());
        }
        if !headers.iter().eq(COLUMNS.iter().map(|column| column.as_bytes())) {
            let found: Vec<_> = headers.iter().map(String::from_utf8_lossy).collect();
            return Err(FeedbackError::read(
                &self.path,
                format!("unexpected header row '{}'", found.join(",")),
            ));
        }

        let start = reader.position().byte() as usize;
        let (records, skipped) = decode_rows(&bytes, start, &headers, &self.path);

        if skipped > 0 {
            debug!(skipped, kept = records.len(), "read feedback with skipped rows");
        }

        Ok(records)
    }
}

/// Decodes every data row from `offset` on, skipping bad ones.
///
/// A bad row that swallowed several physical lines, typically a torn quoted
/// field, is dropped and decoding restarts on the line after it began.
fn decode_rows(
    bytes: &[u8],
    mut offset: usize,
    headers: &ByteRecord,
    path: &Path,
) -> (Vec<FeedbackRecord>, usize) {
    let mut records = Vec::new();
    let mut skipped = 0usize;

    loop {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(&bytes[offset..]);
        let mut row = ByteRecord::new();
        let mut resume_at = None;

        loop {
            let row_start = reader.position().byte() as usize;
            let decoded = match reader.read_byte_record(&mut row) {
                Ok(false) => break,
                Ok(true) => decode_row(&row, headers),
                Err(err) => Err(err.to_string()),
            };
            let row_end = reader.position().byte() as usize;

            match decoded {
                Ok(record) => records.push(record),
                Err(reason) => {
                    skipped += 1;
                    warn!(
                        path = %path.display(),
                        byte = offset + row_start,
                        %reason,
                        "skipping malformed feedback row"
                    );
                    let span = &bytes[offset + row_start..offset + row_end];
                    if let Some(next_line) = line_break_inside(span) {
                        resume_at = Some(offset + row_start + next_line);
                        break;
                    }
                }
            }
        }

        match resume_at {
            Some(next) => offset = next,
            None => return (records, skipped),
        }
    }
}

fn decode_row(row: &ByteRecord, headers: &ByteRecord) -> Result<FeedbackRecord, String> {
    if row.len() != COLUMNS.len() {
        return Err(format!("expected {} fields, found {}", COLUMNS.len(), row.len()));
    }
    let record: FeedbackRecord = row.deserialize(Some(headers)).map_err(|e| e.to_string())?;
    check_row(record)
}

/// Offset just past the first line break strictly inside `span`, ignoring
/// the blank lines before it and the terminator after it.
fn line_break_inside(span: &[u8]) -> Option<usize> {
    let is_break = |b: &&u8| matches!(**b, b'\r' | b'\n');
    let lead = span.iter().take_while(is_break).count();
    let body = &span[lead..];
    let trail = body.iter().rev().take_while(is_break).count();

    body[..body.len() - trail]
        .iter()
        .position(|&b| b == b'\n')
        .map(|index| lead + index + 1)
}

fn ends_with_line_break(file: &mut File) -> io::Result<bool> {
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}

/// Rejects rows that parse but break record invariants.
fn check_row(record: FeedbackRecord) -> Result<FeedbackRecord, String> {
    if !(MIN_RATING..=MAX_RATING).contains(&record.rating) {
        return Err(format!("rating {} out of range", record.rating));
    }
    if !record.sentiment.is_finite() || !(-1.0..=1.0).contains(&record.sentiment) {
        return Err(format!("sentiment {} out of range", record.sentiment));
    }
    Ok(record)
}

fn encode_header() -> io::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(COLUMNS)?;
    writer.into_inner().map_err(|e| e.into_error())
}

fn encode_row(record: &FeedbackRecord) -> io::Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.serialize(record)?;
    writer.into_inner().map_err(|e| e.into_error())
}

/// Writes the full record set as UTF-8 CSV in the persisted column order.
pub fn export_csv<W: Write>(records: &[FeedbackRecord], out: W) -> anyhow::Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    writer.write_record(COLUMNS)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}
