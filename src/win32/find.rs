//! Directory enumeration primitive
//!
//! [`DirIter`] iterates one directory's immediate children lazily. On
//! Windows it wraps the find-handle state machine: the handle is opened by
//! `FindFirstFileW`, advanced by `FindNextFileW`, and closed on every exit
//! path by the `Drop` impl. This is the only place in the crate that touches
//! the native handle.
//!
//! Contract:
//! - Yields nothing (not an error) when the directory is unreadable or
//!   nonexistent at open time.
//! - Never yields `.`, `..`, or `Thumbs.db` (any case).
//! - Never recurses; a failed advance mid-iteration terminates the sequence
//!   cleanly.
//!
//! Non-Windows builds get a `read_dir`-backed iterator with the same
//! contract so the traversal engine and its tests run everywhere.

/// A raw child record: leaf name plus the reported attribute bitset
#[derive(Debug, Clone)]
pub struct RawDirEntry {
    /// Child name, not a full path
    pub name: String,

    /// Win32 attribute bitset
    pub attributes: u32,
}

/// Names excluded from every directory iteration
///
/// `.` and `..` are the self/parent pseudo-entries; `Thumbs.db` is the
/// Explorer thumbnail index, matched case-insensitively and skipped whether
/// it presents as a file or a directory.
pub fn is_skipped_name(name: &str) -> bool {
    name == "." || name == ".." || name.eq_ignore_ascii_case("thumbs.db")
}

#[cfg(windows)]
mod imp {
    use super::{is_skipped_name, RawDirEntry};
    use std::ffi::OsStr;
    use std::mem;
    use std::os::windows::ffi::OsStrExt;
    use std::path::Path;
    use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
    use windows_sys::Win32::Storage::FileSystem::{
        FindClose, FindFirstFileW, FindNextFileW, WIN32_FIND_DATAW,
    };

    /// Encode a path as a NUL-terminated UTF-16 buffer
    pub(crate) fn to_wide(path: &OsStr) -> Vec<u16> {
        path.encode_wide().chain(std::iter::once(0)).collect()
    }

    fn name_of(data: &WIN32_FIND_DATAW) -> String {
        let len = data
            .cFileName
            .iter()
            .position(|&c| c == 0)
            .unwrap_or(data.cFileName.len());
        String::from_utf16_lossy(&data.cFileName[..len])
    }

    /// Single-use lazy iterator over one directory's children
    ///
    /// Owns exactly one find handle. Send (the handle has no thread
    /// affinity), not shared.
    pub struct DirIter {
        handle: HANDLE,
        pending: Option<WIN32_FIND_DATAW>,
        done: bool,
    }

    unsafe impl Send for DirIter {}

    impl DirIter {
        /// Open a find handle on `dir` with the given wildcard pattern
        ///
        /// An invalid handle (unreadable or vanished directory) produces an
        /// empty iterator, not an error.
        pub fn open(dir: &Path, pattern: &str) -> Self {
            let search = dir.join(pattern);
            let wide = to_wide(search.as_os_str());

            let mut data: WIN32_FIND_DATAW = unsafe { mem::zeroed() };
            let handle = unsafe { FindFirstFileW(wide.as_ptr(), &mut data) };

            if handle == INVALID_HANDLE_VALUE {
                return Self {
                    handle,
                    pending: None,
                    done: true,
                };
            }

            Self {
                handle,
                pending: Some(data),
                done: false,
            }
        }
    }

    impl Iterator for DirIter {
        type Item = RawDirEntry;

        fn next(&mut self) -> Option<RawDirEntry> {
            loop {
                if self.done {
                    return None;
                }

                let data = match self.pending.take() {
                    Some(data) => data,
                    None => {
                        let mut data: WIN32_FIND_DATAW = unsafe { mem::zeroed() };
                        // A failed advance (including ERROR_NO_MORE_FILES)
                        // terminates the sequence cleanly.
                        if unsafe { FindNextFileW(self.handle, &mut data) } == 0 {
                            self.done = true;
                            return None;
                        }
                        data
                    }
                };

                let name = name_of(&data);
                if is_skipped_name(&name) {
                    continue;
                }

                return Some(RawDirEntry {
                    name,
                    attributes: data.dwFileAttributes,
                });
            }
        }
    }

    impl Drop for DirIter {
        fn drop(&mut self) {
            if self.handle != INVALID_HANDLE_VALUE {
                unsafe {
                    FindClose(self.handle);
                }
                self.handle = INVALID_HANDLE_VALUE;
            }
        }
    }
}

#[cfg(not(windows))]
mod imp {
    use super::{is_skipped_name, RawDirEntry};
    use crate::entry::{ATTR_DIRECTORY, ATTR_NORMAL};
    use std::fs;
    use std::path::Path;

    /// Case-insensitive wildcard match supporting `*` and `?`, mirroring the
    /// semantics the native find call applies to its pattern argument.
    pub(crate) fn wildcard_match(pattern: &str, name: &str) -> bool {
        fn matches(p: &[char], n: &[char]) -> bool {
            match (p.first(), n.first()) {
                (None, None) => true,
                (Some('*'), _) => {
                    matches(&p[1..], n) || (!n.is_empty() && matches(p, &n[1..]))
                }
                (Some('?'), Some(_)) => matches(&p[1..], &n[1..]),
                (Some(pc), Some(nc)) => {
                    pc.eq_ignore_ascii_case(nc) && matches(&p[1..], &n[1..])
                }
                _ => false,
            }
        }

        let p: Vec<char> = pattern.chars().collect();
        let n: Vec<char> = name.chars().collect();
        matches(&p, &n)
    }

    /// Portable stand-in for the find-handle iterator
    pub struct DirIter {
        inner: Option<fs::ReadDir>,
        pattern: String,
    }

    impl DirIter {
        /// Open `dir`; an unreadable directory yields an empty iterator
        pub fn open(dir: &Path, pattern: &str) -> Self {
            Self {
                inner: fs::read_dir(dir).ok(),
                pattern: pattern.to_string(),
            }
        }
    }

    impl Iterator for DirIter {
        type Item = RawDirEntry;

        fn next(&mut self) -> Option<RawDirEntry> {
            let inner = self.inner.as_mut()?;
            loop {
                let dirent = match inner.next()? {
                    Ok(dirent) => dirent,
                    Err(_) => {
                        self.inner = None;
                        return None;
                    }
                };

                let name = dirent.file_name().to_string_lossy().into_owned();
                if is_skipped_name(&name) {
                    continue;
                }
                if self.pattern != "*" && !wildcard_match(&self.pattern, &name) {
                    continue;
                }

                let file_type = match dirent.file_type() {
                    Ok(ft) => ft,
                    Err(_) => continue,
                };
                let attributes = if file_type.is_dir() {
                    ATTR_DIRECTORY
                } else {
                    ATTR_NORMAL
                };

                return Some(RawDirEntry { name, attributes });
            }
        }
    }
}

pub use imp::DirIter;

#[cfg(windows)]
pub(crate) use imp::to_wide;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_skipped_names() {
        assert!(is_skipped_name("."));
        assert!(is_skipped_name(".."));
        assert!(is_skipped_name("Thumbs.db"));
        assert!(is_skipped_name("thumbs.db"));
        assert!(is_skipped_name("THUMBS.DB"));

        assert!(!is_skipped_name("..."));
        assert!(!is_skipped_name("Thumbs.db.bak"));
        assert!(!is_skipped_name("file.txt"));
    }

    #[cfg(not(windows))]
    #[test]
    fn test_wildcard_match() {
        use super::imp::wildcard_match;

        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("*.txt", "notes.txt"));
        assert!(wildcard_match("*.TXT", "notes.txt"));
        assert!(!wildcard_match("*.txt", "notes.log"));
        assert!(wildcard_match("repor?.doc", "report.doc"));
        assert!(!wildcard_match("repor?.doc", "reports.doc"));
    }

    #[test]
    fn test_unreadable_directory_is_empty_sequence() {
        let iter = DirIter::open(Path::new("definitely/not/a/real/dir"), "*");
        assert_eq!(iter.count(), 0);
    }

    #[test]
    fn test_iteration_filters_thumbs_db() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("real.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("Thumbs.db"), b"x").unwrap();

        let names: Vec<String> = DirIter::open(dir.path(), "*").map(|e| e.name).collect();
        assert_eq!(names, vec!["real.txt".to_string()]);
    }
}
