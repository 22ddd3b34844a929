use crate::layout::{parse_index_file_name, INDEX_FILE_EXTENSION};
use crate::store::IndexStore;
use crate::{IndexerError, Result};
use std::path::{Path, PathBuf};

/// Run the structural check over every `*.idx` file in `data_dir`.
///
/// Files are checked one at a time in enumeration order and the first
/// failure is returned. Returns the number of files that passed.
pub fn check_all(data_dir: impl AsRef<Path>) -> Result<usize> {
    let data_dir = data_dir.as_ref();
    if !data_dir.exists() {
        log::debug!("No data directory at {}; nothing to check", data_dir.display());
        return Ok(0);
    }

    let mut checked = 0;
    for path in index_files(data_dir)? {
        check_one(&path)?;
        checked += 1;
    }
    log::info!(
        "Consistency check passed for {checked} index files in {}",
        data_dir.display()
    );
    Ok(checked)
}

fn index_files(data_dir: &Path) -> Result<Vec<PathBuf>> {
    let escaped = glob::Pattern::escape(&data_dir.to_string_lossy());
    let pattern = Path::new(&escaped).join(format!("*.{INDEX_FILE_EXTENSION}"));
    let entries = glob::glob(&pattern.to_string_lossy())
        .map_err(|err| IndexerError::Other(format!("invalid index pattern: {err}")))?;

    let mut files = Vec::new();
    for entry in entries {
        files.push(entry.map_err(std::io::Error::from)?);
    }
    Ok(files)
}

fn check_one(path: &Path) -> Result<()> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    match parse_index_file_name(&name) {
        Some((kind, root)) => log::debug!("Opening {kind} index {name:?} (root {root:?})"),
        None => log::debug!("Opening index {name:?}"),
    }

    let mut store = IndexStore::open_for_check(path).map_err(|err| {
        log::error!("{err}");
        err
    })?;
    log::debug!("Checking consistency of index {name:?}");
    let outcome = store.check();
    store.close();
    if let Err(err) = &outcome {
        log::error!("{err}");
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_index(path: &Path, files: &[&str]) {
        let store = IndexStore::open_or_create(path).unwrap();
        build(&store, "paths", files.iter().map(PathBuf::from)).unwrap();
        store.close();
    }

    fn write_junk(path: &Path) {
        fs::write(path, b"definitely not an index file ".repeat(128)).unwrap();
    }

    #[test]
    fn missing_data_dir_has_nothing_to_check() {
        let temp = tempdir().unwrap();
        assert_eq!(check_all(temp.path().join("absent")).unwrap(), 0);
    }

    #[test]
    fn valid_indexes_pass() {
        let temp = tempdir().unwrap();
        write_index(&temp.path().join("m_media-movies.idx"), &["/media/movies/A.mp4"]);
        write_index(&temp.path().join("m_srv.idx"), &[]);

        assert_eq!(check_all(temp.path()).unwrap(), 2);
    }

    #[test]
    fn other_files_are_ignored() {
        let temp = tempdir().unwrap();
        write_junk(&temp.path().join("shadowcaster.db"));
        write_junk(&temp.path().join("m_media.idx.bak"));

        assert_eq!(check_all(temp.path()).unwrap(), 0);
    }

    #[test]
    fn first_broken_index_fails_the_check() {
        let temp = tempdir().unwrap();
        let broken = temp.path().join("a_music.idx");
        write_junk(&broken);
        write_index(&temp.path().join("m_media.idx"), &["/media/A.mp4"]);

        let err = check_all(temp.path()).unwrap_err();
        match err {
            IndexerError::StoreOpen { path, .. } | IndexerError::Corruption { path, .. } => {
                assert_eq!(path, broken)
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    fn write_large_index(path: &Path) {
        let files: Vec<String> = (0..2000)
            .map(|i| format!("/media/movies/season-{}/movie-{i:04}.mp4", i % 7))
            .collect();
        let store = IndexStore::open_or_create(path).unwrap();
        build(&store, "paths", files.iter().map(PathBuf::from)).unwrap();
        store.close();
    }

    /// Damage the index with `damage`, then require `check_all` to fail on
    /// it while leaving its bytes exactly as damaged.
    fn assert_damage_detected(damage: impl FnOnce(&Path)) {
        let temp = tempdir().unwrap();
        let path = temp.path().join("m_media-movies.idx");
        write_large_index(&path);
        damage(&path);
        let damaged = fs::read(&path).unwrap();

        let err = check_all(temp.path()).unwrap_err();
        match err {
            IndexerError::StoreOpen { path: p, .. } | IndexerError::Corruption { path: p, .. } => {
                assert_eq!(p, path)
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(fs::read(&path).unwrap() == damaged, "check rewrote the index");

        // A second startup must reach the same verdict.
        assert!(check_all(temp.path()).is_err());
    }

    #[test]
    fn truncated_index_fails_the_check() {
        assert_damage_detected(|path| {
            let file = fs::OpenOptions::new().write(true).open(path).unwrap();
            let len = file.metadata().unwrap().len();
            file.set_len(len / 2).unwrap();
        });
    }

    #[test]
    fn index_with_trailing_bytes_fails_the_check() {
        assert_damage_detected(|path| {
            let mut file = fs::OpenOptions::new().append(true).open(path).unwrap();
            file.write_all(&[0xA5; 12345]).unwrap();
        });
    }

    #[test]
    fn index_with_flipped_page_bytes_fails_the_check() {
        // The header page stays intact; every later page gets 64 flipped bytes.
        assert_damage_detected(|path| {
            let mut bytes = fs::read(path).unwrap();
            for page in bytes.chunks_mut(4096).skip(1) {
                let end = page.len().min(64);
                for byte in &mut page[..end] {
                    *byte ^= 0xFF;
                }
            }
            fs::write(path, bytes).unwrap();
        });
    }

    #[test]
    fn passing_check_leaves_index_untouched() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("m_media-movies.idx");
        write_large_index(&path);
        let before = fs::read(&path).unwrap();

        assert_eq!(check_all(temp.path()).unwrap(), 1);
        assert!(fs::read(&path).unwrap() == before);
    }

    #[test]
    fn data_dir_with_glob_characters_is_escaped() {
        let temp = tempdir().unwrap();
        let data_dir = temp.path().join("idx[1]");
        fs::create_dir_all(&data_dir).unwrap();
        write_index(&data_dir.join("m_media.idx"), &["/media/A.mp4"]);

        assert_eq!(check_all(&data_dir).unwrap(), 1);
    }
}
