use crate::store::{Bucket, IndexStore, IndexTransaction};
use crate::Result;
use std::path::{Path, PathBuf};

/// Record every path as `file name -> parent directory` in `bucket_name`,
/// inside one write transaction committed after `paths` is exhausted.
///
/// A failing bucket write stops the iteration; whatever was staged is still
/// committed and the first error is returned. Commit failures are terminal.
pub fn build<I>(store: &IndexStore, bucket_name: &str, paths: I) -> Result<usize>
where
    I: IntoIterator<Item = PathBuf>,
{
    let txn = store.begin_write()?;
    let mut written = 0;
    let staged = stage(&txn, bucket_name, paths, &mut written);
    if let Err(err) = &staged {
        log::error!(
            "Stopped writing {} after {written} entries: {err}",
            store.path().display()
        );
    }

    match txn.commit() {
        Ok(()) => staged.map(|()| written),
        Err(err) => {
            log::error!("Failed to commit {}: {err}", store.path().display());
            staged.and(Err(err))
        }
    }
}

fn stage<I>(txn: &IndexTransaction, bucket_name: &str, paths: I, written: &mut usize) -> Result<()>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut bucket: Option<Bucket<'_>> = None;
    for path in paths {
        let Some((filename, directory)) = split_entry(&path) else {
            log::warn!("Skipping path without a file name: {}", path.display());
            continue;
        };
        if bucket.is_none() {
            bucket = txn.bucket(bucket_name, true)?;
        }
        if let Some(bucket) = bucket.as_mut() {
            bucket.put(filename, directory)?;
            *written += 1;
        }
    }
    Ok(())
}

fn split_entry(path: &Path) -> Option<(&[u8], &[u8])> {
    let filename = path.file_name()?;
    let directory = path.parent()?;
    Some((
        filename.as_encoded_bytes(),
        directory.as_os_str().as_encoded_bytes(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Entry;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn entry(filename: &str, directory: &str) -> Entry {
        Entry {
            filename: filename.to_string(),
            directory: directory.to_string(),
        }
    }

    #[test]
    fn maps_file_names_to_parent_directories() {
        let temp = tempdir().unwrap();
        let store = IndexStore::open_or_create(temp.path().join("m_media.idx")).unwrap();

        let written = build(
            &store,
            "paths",
            vec![
                PathBuf::from("/media/movies/A.mp4"),
                PathBuf::from("/media/movies/extras/C.mp4"),
            ],
        )
        .unwrap();

        assert_eq!(written, 2);
        assert_eq!(
            store.entries("paths").unwrap(),
            vec![
                entry("A.mp4", "/media/movies"),
                entry("C.mp4", "/media/movies/extras"),
            ]
        );
    }

    #[test]
    fn later_duplicates_overwrite_earlier_directories() {
        let temp = tempdir().unwrap();
        let store = IndexStore::open_or_create(temp.path().join("m_media.idx")).unwrap();

        build(
            &store,
            "paths",
            vec![
                PathBuf::from("/media/a/clip.webm"),
                PathBuf::from("/media/b/clip.webm"),
            ],
        )
        .unwrap();

        assert_eq!(
            store.entries("paths").unwrap(),
            vec![entry("clip.webm", "/media/b")]
        );
    }

    #[test]
    fn empty_input_commits_without_creating_bucket() {
        let temp = tempdir().unwrap();
        let store = IndexStore::open_or_create(temp.path().join("m_media.idx")).unwrap();

        assert_eq!(build(&store, "paths", Vec::new()).unwrap(), 0);
        assert!(store.entries("paths").unwrap().is_empty());

        let txn = store.begin_write().unwrap();
        assert!(txn.bucket("paths", false).unwrap().is_none());
    }

    #[test]
    fn paths_without_file_name_are_skipped() {
        let temp = tempdir().unwrap();
        let store = IndexStore::open_or_create(temp.path().join("m_media.idx")).unwrap();

        let written = build(
            &store,
            "paths",
            vec![PathBuf::from("/"), PathBuf::from("/media/A.mp4")],
        )
        .unwrap();

        assert_eq!(written, 1);
        assert_eq!(store.entries("paths").unwrap(), vec![entry("A.mp4", "/media")]);
    }

    #[test]
    fn successive_builds_accumulate_entries() {
        let temp = tempdir().unwrap();
        let store = IndexStore::open_or_create(temp.path().join("m_media.idx")).unwrap();

        build(&store, "paths", vec![PathBuf::from("/media/old.mp4")]).unwrap();
        build(&store, "paths", vec![PathBuf::from("/media/new.mp4")]).unwrap();

        assert_eq!(
            store.entries("paths").unwrap(),
            vec![entry("new.mp4", "/media"), entry("old.mp4", "/media")]
        );
    }
}
