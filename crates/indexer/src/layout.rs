use crate::MediaIndexType;
use std::path::{Path, PathBuf, MAIN_SEPARATOR};

pub const INDEX_FILE_EXTENSION: &str = "idx";

/// Name of the only bucket inside an index file.
pub const PATHS_BUCKET: &str = "paths";

const ENCODED_SEPARATOR: char = '-';

/// Filesystem-safe encoding of a root directory: the leading separator is
/// stripped and every remaining separator becomes `-`.
pub fn encode_root_dir(root: &Path) -> String {
    let raw = root.to_string_lossy();
    let trimmed = raw
        .strip_prefix('/')
        .or_else(|| raw.strip_prefix(MAIN_SEPARATOR))
        .unwrap_or(&*raw);
    trimmed
        .chars()
        .map(|c| {
            if c == '/' || c == MAIN_SEPARATOR {
                ENCODED_SEPARATOR
            } else {
                c
            }
        })
        .collect()
}

#[must_use]
pub fn index_file_name(kind: MediaIndexType, root: &Path) -> String {
    format!(
        "{}_{}.{INDEX_FILE_EXTENSION}",
        kind.tag(),
        encode_root_dir(root)
    )
}

#[must_use]
pub fn index_file_path(data_dir: &Path, kind: MediaIndexType, root: &Path) -> PathBuf {
    data_dir.join(index_file_name(kind, root))
}

/// Splits an index file name back into its type and encoded root.
pub fn parse_index_file_name(name: &str) -> Option<(MediaIndexType, &str)> {
    let stem = name.strip_suffix(INDEX_FILE_EXTENSION)?.strip_suffix('.')?;
    let (tag, encoded) = stem.split_once('_')?;
    let mut chars = tag.chars();
    let kind = MediaIndexType::from_tag(chars.next()?)?;
    if chars.next().is_some() {
        return None;
    }
    Some((kind, encoded))
}
