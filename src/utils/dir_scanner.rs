use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// A ticket file found by a directory scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub filename: String,
    pub mtime_ns: i64,
}

/// Whether a directory entry name is a ticket file.
///
/// Hidden files (the cache, lock directory, editor swap files) are never
/// tickets, and neither are temp files left by a crashed writer, since
/// those end in a random nonce rather than `.md`.
pub fn is_ticket_filename(name: &str) -> bool {
    !name.starts_with('.') && name.len() > 3 && name.ends_with(".md")
}

/// Names of all ticket files in a directory, unsorted.
///
/// Returns an empty vector if the directory doesn't exist.
pub fn find_ticket_files(dir_path: &Path) -> io::Result<Vec<String>> {
    match fs::read_dir(dir_path) {
        Ok(entries) => {
            let mut names = Vec::new();
            for entry in entries {
                let name = entry?.file_name().to_string_lossy().into_owned();
                if is_ticket_filename(&name) {
                    names.push(name);
                }
            }
            Ok(names)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

/// Scan a directory for ticket files with their modification times,
/// sorted by filename.
///
/// Files that vanish between listing and `stat` are skipped.
pub fn scan_with_mtime(dir_path: &Path) -> io::Result<Vec<ScannedFile>> {
    let mut files: Vec<ScannedFile> = find_ticket_files(dir_path)?
        .into_iter()
        .filter_map(|filename| {
            let meta = fs::metadata(dir_path.join(&filename)).ok()?;
            let mtime = meta.modified().ok()?;
            Some(ScannedFile {
                filename,
                mtime_ns: mtime_ns(mtime),
            })
        })
        .collect();
    files.sort_by(|a, b| a.filename.cmp(&b.filename));
    Ok(files)
}

/// Nanoseconds since the Unix epoch, negative for earlier times.
pub fn mtime_ns(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => i64::try_from(d.as_nanos()).unwrap_or(i64::MAX),
        Err(e) => i64::try_from(e.duration().as_nanos()).map_or(i64::MIN, |n| -n),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_ticket_filename_filter() {
        assert!(is_ticket_filename("0abc123xyz.md"));
        assert!(!is_ticket_filename(".cache"));
        assert!(!is_ticket_filename(".hidden.md"));
        assert!(!is_ticket_filename("a.md.tmp.Xy12ab34"));
        assert!(!is_ticket_filename(".md"));
        assert!(!is_ticket_filename("notes.txt"));
    }

    #[test]
    fn test_scan_missing_dir_is_empty() {
        let tmp = TempDir::new().unwrap();
        let files = scan_with_mtime(&tmp.path().join("nope")).unwrap();
        assert!(files.is_empty());
    }

    #[test]
    fn test_scan_sorted_and_filtered() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("b.md"), "x").unwrap();
        fs::write(tmp.path().join("a.md"), "x").unwrap();
        fs::write(tmp.path().join(".cache"), "x").unwrap();
        fs::write(tmp.path().join("c.md.tmp.abcdefgh"), "x").unwrap();
        fs::create_dir(tmp.path().join(".locks")).unwrap();

        let names: Vec<String> = scan_with_mtime(tmp.path())
            .unwrap()
            .into_iter()
            .map(|f| f.filename)
            .collect();
        assert_eq!(names, vec!["a.md", "b.md"]);
    }

    #[test]
    fn test_mtime_ns_sign() {
        assert_eq!(mtime_ns(UNIX_EPOCH), 0);
        assert_eq!(mtime_ns(UNIX_EPOCH + Duration::from_nanos(5)), 5);
        assert_eq!(mtime_ns(UNIX_EPOCH - Duration::from_secs(1)), -1_000_000_000);
    }
}
