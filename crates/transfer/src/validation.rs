use dropload_protocol::FileError;
use dropload_protocol::constants::LEGACY_DRAG_MIME;

use crate::FileInfo;

/// Intake limits applied to every candidate file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constraints {
    /// Comma-separated accept patterns (`.ext`, `type/*`, `type/subtype`).
    pub accept: String,
    pub multiple: bool,
    pub min_size_bytes: u64,
    pub max_size_bytes: u64,
    /// Maximum number of tracked files. `0` disables the limit.
    pub max_files: u64,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            accept: "*".into(),
            multiple: true,
            min_size_bytes: 0,
            max_size_bytes: u64::MAX,
            max_files: u64::MAX,
        }
    }
}

/// A candidate that failed validation, with every applicable error.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection<T> {
    pub file: T,
    pub errors: Vec<FileError>,
}

/// Result of validating one intake batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOutcome<T> {
    pub accepted: Vec<T>,
    pub rejected: Vec<Rejection<T>>,
}

/// Checks the candidate's type against the accept pattern list.
///
/// Empty MIME types (directories, some drag sources) and the legacy
/// placeholder type are always accepted.
pub fn file_accepted(file: &FileInfo, accept: &str) -> Result<(), FileError> {
    if file.mime_type.is_empty() || file.mime_type == LEGACY_DRAG_MIME {
        return Ok(());
    }
    if matches_accept(file, accept) {
        Ok(())
    } else {
        Err(FileError::invalid_type(accept))
    }
}

fn matches_accept(file: &FileInfo, accept: &str) -> bool {
    let accept = accept.trim();
    if accept.is_empty() || accept == "*" {
        return true;
    }

    let mime = file.mime_type.to_ascii_lowercase();
    let base_mime = mime.split('/').next().unwrap_or_default();

    accept
        .split(',')
        .map(|pattern| pattern.trim().to_ascii_lowercase())
        .filter(|pattern| !pattern.is_empty())
        .any(|pattern| {
            if pattern == "*" || pattern == "*/*" {
                true
            } else if pattern.starts_with('.') {
                match &file.name {
                    Some(name) => name.to_ascii_lowercase().ends_with(&pattern),
                    None => true,
                }
            } else if let Some(group) = pattern.strip_suffix("/*") {
                base_mime == group
            } else {
                mime == pattern
            }
        })
}

/// Checks the candidate's size against the configured bounds.
///
/// The upper bound is checked first. Candidates of unknown size pass.
pub fn file_match_size(file: &FileInfo, min_size: u64, max_size: u64) -> Result<(), FileError> {
    let Some(size) = file.size else {
        return Ok(());
    };
    if size > max_size {
        return Err(FileError::too_large(max_size));
    }
    if size < min_size {
        return Err(FileError::too_small(min_size));
    }
    Ok(())
}

fn exceeds_count(constraints: &Constraints, existing: usize, accepted: usize) -> bool {
    if !constraints.multiple {
        return accepted > 1;
    }
    constraints.max_files > 0 && (existing + accepted) as u64 > constraints.max_files
}

/// Splits a batch into accepted and rejected candidates.
///
/// `existing` is the number of files already tracked. `custom` runs the
/// caller's validator and returns its errors (empty when the file passes).
///
/// Once the batch overflows the count limit, every candidate of the batch
/// that would otherwise be accepted is rejected with `too-many-files`,
/// including the ones validated after the overflow.
pub fn partition_batch<T, F>(
    batch: Vec<T>,
    constraints: &Constraints,
    existing: usize,
    mut custom: F,
) -> BatchOutcome<T>
where
    T: AsRef<FileInfo>,
    F: FnMut(&T) -> Vec<FileError>,
{
    let mut accepted: Vec<T> = Vec::new();
    let mut rejected: Vec<Rejection<T>> = Vec::new();
    let mut overflowed = false;

    for file in batch {
        let info = file.as_ref();
        let mut errors: Vec<FileError> = [
            file_accepted(info, &constraints.accept).err(),
            file_match_size(info, constraints.min_size_bytes, constraints.max_size_bytes).err(),
        ]
        .into_iter()
        .flatten()
        .collect();
        errors.extend(custom(&file));

        if !errors.is_empty() {
            rejected.push(Rejection { file, errors });
            continue;
        }

        if overflowed {
            rejected.push(Rejection {
                file,
                errors: vec![FileError::too_many_files()],
            });
            continue;
        }

        accepted.push(file);
        if exceeds_count(constraints, existing, accepted.len()) {
            overflowed = true;
            rejected.extend(accepted.drain(..).map(|file| Rejection {
                file,
                errors: vec![FileError::too_many_files()],
            }));
        }
    }

    BatchOutcome { accepted, rejected }
}

/// Returns `true` when every item of a hovered set would be accepted.
///
/// Used for drag feedback: the count check only considers the hovered set.
pub fn all_files_accepted(files: &[FileInfo], constraints: &Constraints) -> bool {
    if exceeds_count(constraints, 0, files.len()) {
        return false;
    }
    files.iter().all(|file| {
        file_accepted(file, &constraints.accept).is_ok()
            && file_match_size(file, constraints.min_size_bytes, constraints.max_size_bytes)
                .is_ok()
    })
}
