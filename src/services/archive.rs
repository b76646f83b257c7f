//! Password-protected zip envelopes for stored payloads.
//!
//! Every payload is stored inside a single-entry, DEFLATE-compressed zip
//! encrypted (AES-256) with a fixed, publicly known password. The password
//! is a deterrent against accidental opening, not a confidentiality measure.
//! AES entries carry a random salt, so wrapping the same bytes twice gives
//! different envelopes.

use std::io::{self, Cursor, Read, Write};
use thiserror::Error;
use tracing::debug;
use zip::{AesMode, CompressionMethod, DateTime, ZipArchive, ZipWriter, write::FileOptions};

/// Password used for every envelope.
pub const ARCHIVE_PASSWORD: &str = "infected";

/// Suffix appended to the key of a payload that was wrapped on upload.
pub const ARCHIVE_SUFFIX: &str = ".zip";

/// Maximum decompressed size per entry inspected by [`is_already_wrapped`].
const MAX_CHECKED_ENTRY_SIZE: u64 = 2 * 1024 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Wrap `data` into a single-entry envelope named `filename`.
///
/// Entry timestamp and permissions are fixed so only the payload and the
/// encryption salt vary between envelopes.
pub fn wrap(filename: &str, data: &[u8], password: &str) -> Result<Vec<u8>, ArchiveError> {
    let options = FileOptions::<()>::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
        .with_aes_encryption(AesMode::Aes256, password);

    let mut writer = ZipWriter::new(Cursor::new(Vec::with_capacity(data.len() / 2 + 256)));
    writer.start_file(filename, options)?;
    writer.write_all(data)?;
    Ok(writer.finish()?.into_inner())
}

/// Returns true if `data` is a zip whose file entries are all encrypted and
/// all decrypt and decompress cleanly under `password`.
///
/// Malformed archives, plain zips and wrong passwords all yield `false`.
pub fn is_already_wrapped(data: &[u8], password: &str) -> bool {
    match inspect_envelope(data, password) {
        Ok(wrapped) => wrapped,
        Err(err) => {
            debug!("payload is not a readable envelope: {}", err);
            false
        }
    }
}

fn inspect_envelope(data: &[u8], password: &str) -> Result<bool, ArchiveError> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;
    let mut files = 0usize;

    for i in 0..archive.len() {
        let entry = archive.by_index_decrypt(i, password.as_bytes())?;
        if entry.is_dir() {
            continue;
        }
        if !entry.encrypted() {
            return Ok(false);
        }
        // Reading to the end verifies the entry CRC.
        let read = io::copy(&mut entry.take(MAX_CHECKED_ENTRY_SIZE + 1), &mut io::sink())?;
        if read > MAX_CHECKED_ENTRY_SIZE {
            return Ok(false);
        }
        files += 1;
    }

    Ok(files > 0)
}
