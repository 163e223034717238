//! Archive inspection and flattened extraction
//!
//! Submissions arrive as zip or tar(.gz) archives; the format is detected
//! from content magic, never from the file extension. Directory entries,
//! hidden/OS-metadata members and IDE droppings are filtered out, and
//! extracted members are flattened to their base names so the contents land
//! in a single flat directory regardless of original nesting.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use flate2::read::GzDecoder;

use crate::error::ScoreResult;

/// Base-name prefixes of hidden/system members (macOS resource forks,
/// Finder metadata, editor backups).
const HIDDEN_PREFIXES: &[&str] = &["__", "._", "~", ".DS_Store"];
/// IDE metadata directory excluded wherever it appears in the path.
const IDE_METADATA_DIR: &str = ".idea";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
    Unknown,
}

fn detect_format(file: &mut File) -> io::Result<ArchiveFormat> {
    // 262 bytes cover the ustar magic at offset 257.
    let mut head = [0u8; 262];
    let mut filled = 0;
    while filled < head.len() {
        let n = file.read(&mut head[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    file.seek(SeekFrom::Start(0))?;

    let format = if filled >= 2 && &head[..2] == b"PK" {
        ArchiveFormat::Zip
    } else if filled >= 2 && head[0] == 0x1f && head[1] == 0x8b {
        ArchiveFormat::TarGz
    } else if filled >= 262 && &head[257..262] == b"ustar" {
        ArchiveFormat::Tar
    } else {
        ArchiveFormat::Unknown
    };
    Ok(format)
}

/// Whether a member is hidden or system metadata.
///
/// Any path component starting with a hidden prefix excludes the member, so
/// files nested under `__MACOSX/` are dropped along with the directory
/// markers themselves.
fn is_hidden(member: &str) -> bool {
    if member.split('/').any(|part| part.contains(IDE_METADATA_DIR)) {
        return true;
    }
    member
        .split('/')
        .filter(|part| !part.is_empty())
        .any(|part| HIDDEN_PREFIXES.iter().any(|prefix| part.starts_with(prefix)))
}

fn base_name(member: &str) -> &str {
    member.trim_end_matches('/').rsplit('/').next().unwrap_or(member)
}

fn keep_member(name: &str, pattern: &str) -> bool {
    !is_hidden(name) && (pattern.is_empty() || name.contains(pattern))
}

/// Inspect an archive and optionally extract the surviving members.
///
/// Returns the flattened base names of all members that are regular files,
/// not hidden, and (for a non-empty `pattern`) contain `pattern` as a
/// substring. With `destination` set, each surviving member is written
/// under it as `destination/<base name>`.
///
/// A file that is neither a readable zip nor a tar archive yields an empty
/// list; the caller treats that as "no usable submission content".
pub fn inspect(
    archive: &Path,
    destination: Option<&Path>,
    pattern: &str,
) -> ScoreResult<Vec<String>> {
    let mut file = File::open(archive)?;
    if let Some(dest) = destination {
        fs::create_dir_all(dest)?;
    }
    match detect_format(&mut file)? {
        ArchiveFormat::Zip => inspect_zip(file, destination, pattern),
        ArchiveFormat::Tar => inspect_tar(file, destination, pattern),
        ArchiveFormat::TarGz => inspect_tar(GzDecoder::new(file), destination, pattern),
        ArchiveFormat::Unknown => {
            log::warn!("{} is neither a zip nor a tar archive", archive.display());
            Ok(Vec::new())
        }
    }
}

fn inspect_zip(
    file: File,
    destination: Option<&Path>,
    pattern: &str,
) -> ScoreResult<Vec<String>> {
    let mut archive = match zip::ZipArchive::new(file) {
        Ok(archive) => archive,
        Err(err) => {
            log::warn!("unreadable zip archive: {err}");
            return Ok(Vec::new());
        }
    };

    let mut names = Vec::new();
    for index in 0..archive.len() {
        let mut member = archive.by_index(index).map_err(io::Error::other)?;
        if member.is_dir() {
            continue;
        }
        let name = member.name().to_owned();
        if !keep_member(&name, pattern) {
            continue;
        }
        let base = base_name(&name).to_owned();
        if let Some(dest) = destination {
            let mut out = File::create(dest.join(&base))?;
            io::copy(&mut member, &mut out)?;
        }
        names.push(base);
    }
    Ok(names)
}

fn inspect_tar<R: Read>(
    reader: R,
    destination: Option<&Path>,
    pattern: &str,
) -> ScoreResult<Vec<String>> {
    let mut archive = tar::Archive::new(reader);
    let mut names = Vec::new();
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry.path()?.to_string_lossy().replace('\\', "/");
        if !keep_member(&name, pattern) {
            continue;
        }
        let base = base_name(&name).to_owned();
        if let Some(dest) = destination {
            let mut out = File::create(dest.join(&base))?;
            io::copy(&mut entry, &mut out)?;
        }
        names.push(base);
    }
    Ok(names)
}
