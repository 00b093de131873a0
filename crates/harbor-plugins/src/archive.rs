//! Safe `.tgz` extraction and package-root discovery.
//!
//! Entries are unpacked verbatim (no prefix stripping). Extraction rejects:
//! - absolute paths and `..` components
//! - symlinks, hardlinks, device nodes and other non-file entry types
//! - more than [`MAX_ENTRY_COUNT`] entries
//! - more than [`MAX_EXTRACTED_SIZE`] bytes of declared content
//!
//! The package root is located afterwards by [`find_package_root`], which
//! copes with npm-style tarballs that nest everything under `package/`.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;
use tar::{Archive, EntryType};
use tracing::debug;

use crate::error::{PluginError, PluginResult};
use crate::manifest::MANIFEST_FILE;

/// Maximum number of entries allowed in an archive.
pub const MAX_ENTRY_COUNT: usize = 10_000;

/// Maximum total declared content size (500 MB).
pub const MAX_EXTRACTED_SIZE: u64 = 500_000_000;

/// How deep below the extraction root [`find_package_root`] looks.
const PACKAGE_ROOT_MAX_DEPTH: usize = 2;

/// Extract the gzip-compressed tarball at `archive` into `dest`.
///
/// `dest` must already exist.
///
/// # Errors
///
/// Returns [`PluginError::ExtractionError`] if the archive cannot be read,
/// is empty, or exceeds a limit; [`PluginError::PathTraversal`] or
/// [`PluginError::UnsafeEntryType`] for hostile entries.
pub fn extract_archive(archive: &Path, dest: &Path) -> PluginResult<()> {
    let file = File::open(archive).map_err(|e| PluginError::ExtractionError {
        message: format!("failed to open {}: {e}", archive.display()),
    })?;
    let count = unpack(BufReader::new(file), dest)?;
    debug!(
        archive = %archive.display(),
        dest = %dest.display(),
        entries = count,
        "extracted archive"
    );
    Ok(())
}

/// Unpack a gzip-compressed tar stream into `dest`, returning the entry count.
///
/// # Errors
///
/// See [`extract_archive`].
pub fn unpack<R: Read>(reader: R, dest: &Path) -> PluginResult<usize> {
    let dest = dest
        .canonicalize()
        .map_err(|e| PluginError::ExtractionError {
            message: format!("failed to canonicalize destination: {e}"),
        })?;

    let mut archive = Archive::new(GzDecoder::new(reader));
    let entries = archive
        .entries()
        .map_err(|e| extraction(format!("failed to read archive entries: {e}")))?;

    let mut count: usize = 0;
    let mut declared: u64 = 0;

    for entry in entries {
        let mut entry = entry.map_err(|e| extraction(format!("failed to read archive entry: {e}")))?;

        count = count.saturating_add(1);
        if count > MAX_ENTRY_COUNT {
            return Err(extraction(format!(
                "archive exceeds maximum entry count ({MAX_ENTRY_COUNT})"
            )));
        }

        let path = entry
            .path()
            .map_err(|e| extraction(format!("failed to read entry path: {e}")))?
            .into_owned();

        let entry_type = entry.header().entry_type();
        if !is_safe_entry_type(entry_type) {
            return Err(PluginError::UnsafeEntryType {
                entry_type: format!("{entry_type:?}"),
                path: path.display().to_string(),
            });
        }

        let size = entry
            .header()
            .size()
            .map_err(|e| extraction(format!("failed to read entry size: {e}")))?;
        declared = declared.saturating_add(size);
        if declared > MAX_EXTRACTED_SIZE {
            return Err(extraction(format!(
                "archive exceeds maximum extracted size ({MAX_EXTRACTED_SIZE} bytes)"
            )));
        }

        check_entry_path(&path)?;

        // Metadata headers carry no content of their own.
        if matches!(
            entry_type,
            EntryType::GNULongName | EntryType::XHeader | EntryType::XGlobalHeader
        ) {
            continue;
        }

        let target = dest.join(&path);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                extraction(format!("failed to create directory {}: {e}", parent.display()))
            })?;
            // Parents were created by us from validated components; a parent that
            // resolves outside `dest` means something on disk was swapped in.
            let resolved = parent
                .canonicalize()
                .map_err(|e| extraction(format!("failed to resolve {}: {e}", parent.display())))?;
            if !resolved.starts_with(&dest) {
                return Err(PluginError::PathTraversal {
                    path: path.display().to_string(),
                });
            }
        }

        entry
            .unpack(&target)
            .map_err(|e| extraction(format!("failed to unpack {}: {e}", path.display())))?;
    }

    if count == 0 {
        return Err(extraction("archive is empty".into()));
    }

    Ok(count)
}

/// Locate the first directory, breadth-first from `root` (at most two levels
/// down), that contains a `package.json`.
///
/// Directories are visited in name order so the result is deterministic.
#[must_use]
pub fn find_package_root(root: &Path) -> Option<PathBuf> {
    let mut queue = VecDeque::from([(root.to_path_buf(), 0_usize)]);

    while let Some((dir, depth)) = queue.pop_front() {
        if dir.join(MANIFEST_FILE).is_file() {
            return Some(dir);
        }
        if depth >= PACKAGE_ROOT_MAX_DEPTH {
            continue;
        }
        let Ok(read_dir) = std::fs::read_dir(&dir) else {
            continue;
        };
        let mut children: Vec<PathBuf> = read_dir
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .map(|e| e.path())
            .collect();
        children.sort();
        let next = depth.saturating_add(1);
        queue.extend(children.into_iter().map(|c| (c, next)));
    }

    None
}

fn extraction(message: String) -> PluginError {
    PluginError::ExtractionError { message }
}

/// Regular files, directories and metadata headers are allowed; links,
/// devices, FIFOs and sparse entries are not.
fn is_safe_entry_type(entry_type: EntryType) -> bool {
    matches!(
        entry_type,
        EntryType::Regular
            | EntryType::Directory
            | EntryType::GNULongName
            | EntryType::XHeader
            | EntryType::XGlobalHeader
    )
}

fn check_entry_path(path: &Path) -> PluginResult<()> {
    let escapes = path.is_absolute()
        || path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::Prefix(_) | Component::RootDir
            )
        });
    if escapes {
        return Err(PluginError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}
