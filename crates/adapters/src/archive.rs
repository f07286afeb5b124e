// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Gzip-compressed tar extraction.
//!
//! Only directories and regular files are materialised. Any decode failure
//! fails the whole extraction; a partial tree is never reported as success.

use std::cell::Cell;
use std::fs::{self, DirBuilder, File};
use std::io::{self, BufReader, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::{DirBuilderExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use std::rc::Rc;

use ap_core::ErrorKind;
use flate2::read::GzDecoder;
use tar::EntryType;
use thiserror::Error;

/// Bytes inspected to identify the archive format.
const SNIFF_LEN: usize = 512;
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const DIR_MODE: u32 = 0o755;
const COPY_CHUNK: usize = 32 * 1024;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("{} is not a gzip archive", path.display())]
    NotGzip { path: PathBuf },

    #[error("archive is truncated: {0}")]
    Truncated(String),

    #[error("archive is corrupt: {0}")]
    Corrupt(String),

    #[error("archive entry `{0}` escapes the destination")]
    UnsafePath(String),

    #[error("cannot materialise {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::NotGzip { .. } => ErrorKind::Format,
            ExtractError::Truncated(_)
            | ExtractError::Corrupt(_)
            | ExtractError::UnsafePath(_)
            | ExtractError::Io { .. } => ErrorKind::Extraction,
        }
    }
}

/// Counts of what an extraction produced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractSummary {
    pub directories: usize,
    pub files: usize,
    pub skipped: usize,
}

/// Reader that records when its source reports end of input.
struct EofTracking<R> {
    inner: R,
    eof: Rc<Cell<bool>>,
}

impl<R: Read> Read for EofTracking<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        if n == 0 && !buf.is_empty() {
            self.eof.set(true);
        }
        Ok(n)
    }
}

/// Extract `archive` into `dest`, creating `dest` if needed.
///
/// Blocking; run it on a blocking thread from async code.
pub fn extract(archive: &Path, dest: &Path) -> Result<ExtractSummary, ExtractError> {
    let io_err = |path: &Path| {
        let path = path.to_path_buf();
        move |source| ExtractError::Io { path, source }
    };

    let mut file = File::open(archive).map_err(io_err(archive))?;
    if !is_gzip(&mut file).map_err(io_err(archive))? {
        return Err(ExtractError::NotGzip { path: archive.to_path_buf() });
    }
    file.seek(SeekFrom::Start(0)).map_err(io_err(archive))?;

    make_dir(dest)?;

    let eof = Rc::new(Cell::new(false));
    let source = EofTracking { inner: BufReader::new(file), eof: Rc::clone(&eof) };
    let mut tar = tar::Archive::new(GzDecoder::new(source));
    let decode = |e: io::Error| classify(e, &eof);

    let mut summary = ExtractSummary::default();
    for entry in tar.entries().map_err(decode)? {
        let mut entry = entry.map_err(decode)?;
        let raw = entry.path().map_err(decode)?.into_owned();
        let Some(relative) = sanitize(&raw)? else {
            continue;
        };
        let target = dest.join(&relative);

        match entry.header().entry_type() {
            EntryType::Directory => {
                make_dir(&target)?;
                summary.directories += 1;
            }
            EntryType::Regular | EntryType::Continuous => {
                let mode = entry.header().mode().map_err(decode)?;
                let expected = entry.header().size().map_err(decode)?;
                if let Some(parent) = target.parent() {
                    make_dir(parent)?;
                }
                let written = copy_entry(&mut entry, &target, &decode)?;
                if written != expected {
                    return Err(ExtractError::Truncated(format!(
                        "entry `{}` has {written} of {expected} bytes",
                        relative.display()
                    )));
                }
                fs::set_permissions(&target, fs::Permissions::from_mode(mode & 0o7777))
                    .map_err(io_err(&target))?;
                summary.files += 1;
            }
            other => {
                tracing::debug!(path = %relative.display(), kind = ?other, "skipping archive entry");
                summary.skipped += 1;
            }
        }
    }

    // Read through the gzip trailer so its CRC and length are checked.
    let mut decoder = tar.into_inner();
    io::copy(&mut decoder, &mut io::sink()).map_err(|e| classify(e, &eof))?;

    tracing::debug!(
        archive = %archive.display(),
        dest = %dest.display(),
        files = summary.files,
        directories = summary.directories,
        "archive extracted"
    );
    Ok(summary)
}

fn is_gzip(file: &mut File) -> io::Result<bool> {
    let mut head = Vec::with_capacity(SNIFF_LEN);
    Read::by_ref(&mut *file).take(SNIFF_LEN as u64).read_to_end(&mut head)?;
    Ok(head.starts_with(&GZIP_MAGIC))
}

fn classify(err: io::Error, eof: &Cell<bool>) -> ExtractError {
    if eof.get() || err.kind() == io::ErrorKind::UnexpectedEof {
        ExtractError::Truncated(err.to_string())
    } else {
        ExtractError::Corrupt(err.to_string())
    }
}

/// Normalise an entry path, rejecting anything that leaves the destination.
///
/// `Ok(None)` for paths that name the destination itself (`./`).
fn sanitize(raw: &Path) -> Result<Option<PathBuf>, ExtractError> {
    let mut clean = PathBuf::new();
    for component in raw.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(ExtractError::UnsafePath(raw.display().to_string()));
            }
        }
    }
    Ok((!clean.as_os_str().is_empty()).then_some(clean))
}

fn make_dir(path: &Path) -> Result<(), ExtractError> {
    DirBuilder::new()
        .recursive(true)
        .mode(DIR_MODE)
        .create(path)
        .map_err(|source| ExtractError::Io { path: path.to_path_buf(), source })
}

/// Copy an entry body, keeping read (decode) and write (filesystem) failures apart.
fn copy_entry<R: Read>(
    entry: &mut R,
    target: &Path,
    decode: &dyn Fn(io::Error) -> ExtractError,
) -> Result<u64, ExtractError> {
    let write_err = |source| ExtractError::Io { path: target.to_path_buf(), source };
    let mut out = File::create(target).map_err(write_err)?;
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut written = 0u64;
    loop {
        let n = entry.read(&mut buf).map_err(decode)?;
        if n == 0 {
            break;
        }
        out.write_all(&buf[..n]).map_err(write_err)?;
        written += n as u64;
    }
    out.flush().map_err(write_err)?;
    Ok(written)
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
