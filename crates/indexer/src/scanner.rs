use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use walkdir::WalkDir;

/// Counters describing one pass over a media tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Files emitted for indexing
    pub accepted: usize,

    /// Files skipped with a warning because of their extension
    pub unsupported: usize,

    /// Files skipped silently because they have no extension
    pub no_extension: usize,

    /// Entries below the root that could not be read
    pub entry_errors: usize,

    /// Failure on the root itself; the scan stopped there
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Classification {
    Accepted,
    NoExtension,
    Unsupported(String),
}

/// Scanner for finding media files of one kind below a root directory
pub struct MediaScanner {
    root: PathBuf,
    extensions: &'static [&'static str],
}

impl MediaScanner {
    pub fn new(root: impl AsRef<Path>, extensions: &'static [&'static str]) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            extensions,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Lazily walk the tree, yielding accepted files in traversal order.
    pub fn scan(&self) -> Scan<'_> {
        Scan {
            scanner: self,
            walker: WalkDir::new(&self.root).follow_links(false).into_iter(),
            report: ScanReport::default(),
            finished: false,
        }
    }

    /// Push every accepted path into `tx`, one slot at a time.
    ///
    /// Must run on a blocking thread. The channel closes when `tx` is dropped
    /// on return; if the receiver goes away first the walk stops early.
    pub fn feed(&self, tx: mpsc::Sender<PathBuf>) -> ScanReport {
        let mut scan = self.scan();
        for path in scan.by_ref() {
            if tx.blocking_send(path).is_err() {
                log::debug!(
                    "Index consumer went away; stopping scan of {}",
                    self.root.display()
                );
                break;
            }
        }
        scan.into_report()
    }

    /// The extension is everything after the last `.` of the file name, so
    /// `trailing.` has an empty one and `.DS_Store` has `DS_Store`.
    fn classify(&self, path: &Path) -> Classification {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy())
            .unwrap_or_default();
        let Some((_, ext)) = name.rsplit_once('.') else {
            return Classification::NoExtension;
        };
        if self.extensions.iter().any(|candidate| *candidate == ext) {
            Classification::Accepted
        } else {
            Classification::Unsupported(format!(".{ext}"))
        }
    }
}

/// Non-restartable walk over a media tree; see [`MediaScanner::scan`].
pub struct Scan<'a> {
    scanner: &'a MediaScanner,
    walker: walkdir::IntoIter,
    report: ScanReport,
    finished: bool,
}

impl Scan<'_> {
    pub fn report(&self) -> &ScanReport {
        &self.report
    }

    pub fn into_report(self) -> ScanReport {
        self.report
    }

    fn fail_root(&mut self, err: &walkdir::Error) {
        log::error!("Cannot scan {}: {err}", self.scanner.root.display());
        self.report.root_error = Some(err.to_string());
        self.finished = true;
    }
}

impl Iterator for Scan<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if self.finished {
            return None;
        }

        loop {
            let entry = match self.walker.next() {
                Some(Ok(entry)) => entry,
                Some(Err(err)) if err.depth() == 0 => {
                    self.fail_root(&err);
                    return None;
                }
                Some(Err(err)) => {
                    log::warn!("Skipping unreadable entry: {err}");
                    self.report.entry_errors += 1;
                    continue;
                }
                None => {
                    self.finished = true;
                    return None;
                }
            };

            if !entry.file_type().is_file() {
                continue;
            }

            match self.scanner.classify(entry.path()) {
                Classification::Accepted => {
                    log::debug!("Indexing {}", entry.path().display());
                    self.report.accepted += 1;
                    return Some(entry.into_path());
                }
                Classification::NoExtension => self.report.no_extension += 1,
                Classification::Unsupported(ext) => {
                    log::warn!(
                        "Skipping unsupported media type {ext:?}: {}",
                        entry.path().display()
                    );
                    self.report.unsupported += 1;
                }
            }
        }
    }
}

/// Resolve a relative root against the working directory.
pub(crate) fn absolute_root(root: &Path) -> std::io::Result<PathBuf> {
    if root.is_absolute() {
        Ok(root.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(root))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MOVIE_EXTENSIONS;
    use pretty_assertions::assert_eq;
    use std::fs;
    use tempfile::tempdir;

    fn movie_tree(root: &Path) {
        fs::create_dir_all(root.join("extras")).unwrap();
        fs::write(root.join("A.mp4"), b"").unwrap();
        fs::write(root.join("B.webm"), b"").unwrap();
        fs::write(root.join("notes.txt"), b"").unwrap();
        fs::write(root.join("README"), b"").unwrap();
        fs::write(root.join("extras").join("C.mp4"), b"").unwrap();
    }

    #[test]
    fn yields_only_accepted_files() {
        let temp = tempdir().unwrap();
        movie_tree(temp.path());

        let scanner = MediaScanner::new(temp.path(), MOVIE_EXTENSIONS);
        let mut scan = scanner.scan();
        let mut files: Vec<PathBuf> = scan.by_ref().collect();
        files.sort();

        assert_eq!(
            files,
            vec![
                temp.path().join("A.mp4"),
                temp.path().join("B.webm"),
                temp.path().join("extras").join("C.mp4"),
            ]
        );
        assert_eq!(
            scan.report(),
            &ScanReport {
                accepted: 3,
                unsupported: 1,
                no_extension: 1,
                entry_errors: 0,
                root_error: None,
            }
        );
    }

    #[test]
    fn extension_match_is_case_sensitive() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("LOUD.MP4"), b"").unwrap();
        fs::write(temp.path().join("trailing."), b"").unwrap();

        let scanner = MediaScanner::new(temp.path(), MOVIE_EXTENSIONS);
        let mut scan = scanner.scan();
        assert_eq!(scan.next(), None);
        assert_eq!(scan.report().unsupported, 2);
        assert_eq!(scan.report().no_extension, 0);
    }

    #[test]
    fn trailing_dots_and_dotfiles_count_as_unsupported() {
        let temp = tempdir().unwrap();
        let scanner = MediaScanner::new(temp.path(), MOVIE_EXTENSIONS);

        assert_eq!(
            scanner.classify(&temp.path().join("trailing.")),
            Classification::Unsupported(".".to_string())
        );
        assert_eq!(
            scanner.classify(&temp.path().join(".DS_Store")),
            Classification::Unsupported(".DS_Store".to_string())
        );
        assert_eq!(
            scanner.classify(&temp.path().join("archive.tar.mp4")),
            Classification::Accepted
        );
        assert_eq!(
            scanner.classify(&temp.path().join("README")),
            Classification::NoExtension
        );
    }

    #[test]
    fn directories_named_like_media_are_descended_not_emitted() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("season.mp4");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("episode.webm"), b"").unwrap();

        let scanner = MediaScanner::new(temp.path(), MOVIE_EXTENSIONS);
        let files: Vec<PathBuf> = scanner.scan().collect();

        assert_eq!(files, vec![dir.join("episode.webm")]);
    }

    #[test]
    fn missing_root_ends_scan_with_root_error() {
        let temp = tempdir().unwrap();
        let scanner = MediaScanner::new(temp.path().join("gone"), MOVIE_EXTENSIONS);

        let mut scan = scanner.scan();
        assert_eq!(scan.next(), None);
        assert_eq!(scan.next(), None);
        assert!(scan.report().root_error.is_some());
        assert_eq!(scan.report().accepted, 0);
    }

    #[test]
    fn feed_hands_off_every_path_then_closes() {
        let temp = tempdir().unwrap();
        movie_tree(temp.path());
        let scanner = MediaScanner::new(temp.path(), MOVIE_EXTENSIONS);

        let (tx, mut rx) = mpsc::channel(1);
        let producer = std::thread::spawn(move || scanner.feed(tx));

        let mut received = Vec::new();
        while let Some(path) = rx.blocking_recv() {
            received.push(path);
        }
        let report = producer.join().unwrap();

        assert_eq!(received.len(), 3);
        assert_eq!(report.accepted, 3);
    }

    #[test]
    fn feed_stops_when_consumer_is_gone() {
        let temp = tempdir().unwrap();
        movie_tree(temp.path());
        let scanner = MediaScanner::new(temp.path(), MOVIE_EXTENSIONS);

        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let report = std::thread::spawn(move || scanner.feed(tx)).join().unwrap();

        assert_eq!(report.accepted, 1);
    }

    #[test]
    fn relative_roots_resolve_against_cwd() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(absolute_root(Path::new("media")).unwrap(), cwd.join("media"));
        assert_eq!(
            absolute_root(Path::new("/srv/media")).unwrap(),
            PathBuf::from("/srv/media")
        );
    }
}
