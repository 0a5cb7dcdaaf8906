//! Directory-backed flash store
//!
//! Maps the node's `/`-rooted object paths onto files below a host
//! directory. Subdirectories are created on demand when an object is
//! written, so nested paths behave like the flat names of a flash file
//! system.

use std::fs::{self, File};
use std::io::{self, Read as _, Write as _};
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};

use growstation_hal::storage::{
    DirEntry, EntryKind, FlashStore, OpenMode, StorageError, StoredFile, Visit,
};

fn storage_error(e: io::Error) -> StorageError {
    match e.kind() {
        io::ErrorKind::NotFound => StorageError::NotFound,
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => StorageError::InvalidPath,
        _ => StorageError::Io,
    }
}

/// Flash store rooted at a host directory
pub struct DirStore {
    root: PathBuf,
}

impl DirStore {
    /// Open (and create if needed) the store root
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Host path of an object path
    fn host_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        let relative = path.trim_start_matches('/');
        if relative.split('/').any(|segment| segment == "..") {
            return Err(StorageError::InvalidPath);
        }
        Ok(self.root.join(relative))
    }
}

/// An open object below a [`DirStore`]
pub struct DirFile {
    file: File,
}

impl embedded_io::ErrorType for DirFile {
    type Error = StorageError;
}

impl embedded_io::Read for DirFile {
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.file.read(buf).map_err(storage_error)
    }
}

impl embedded_io::Write for DirFile {
    fn write(&mut self, buf: &[u8]) -> Result<usize, StorageError> {
        self.file.write(buf).map_err(storage_error)
    }

    fn flush(&mut self) -> Result<(), StorageError> {
        self.file.flush().map_err(storage_error)
    }
}

impl StoredFile for DirFile {
    fn size(&self) -> u32 {
        self.file
            .metadata()
            .map(|m| u32::try_from(m.len()).unwrap_or(u32::MAX))
            .unwrap_or(0)
    }
}

impl FlashStore for DirStore {
    type File = DirFile;

    fn exists(&mut self, path: &str) -> bool {
        self.host_path(path).is_ok_and(|p| p.is_file())
    }

    fn open(&mut self, path: &str, mode: OpenMode) -> Result<DirFile, StorageError> {
        let host = self.host_path(path)?;
        let file = match mode {
            OpenMode::Read => {
                if host.is_dir() {
                    return Err(StorageError::NotFound);
                }
                File::open(&host)
            }
            OpenMode::Write => {
                if let Some(parent) = host.parent() {
                    fs::create_dir_all(parent).map_err(storage_error)?;
                }
                File::create(&host)
            }
        }
        .map_err(storage_error)?;

        Ok(DirFile { file })
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        let host = self.host_path(path)?;
        fs::remove_file(host).map_err(storage_error)
    }

    fn list(&mut self, dir: &str, visit: &mut Visit<'_>) -> Result<(), StorageError> {
        let host = self.host_path(dir)?;
        let prefix = if dir.ends_with('/') {
            dir.to_string()
        } else {
            format!("{}/", dir)
        };

        let mut entries = fs::read_dir(&host)
            .map_err(storage_error)?
            .filter_map(Result::ok)
            .collect::<Vec<_>>();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let Ok(metadata) = entry.metadata() else {
                continue;
            };
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                tracing::warn!("skipping non UTF-8 name in {}", host.display());
                continue;
            };

            let mut path = heapless::String::new();
            if path.push_str(&prefix).and_then(|_| path.push_str(name)).is_err() {
                tracing::warn!("skipping {}{}: path too long", prefix, name);
                continue;
            }

            let (kind, size) = if metadata.is_dir() {
                (EntryKind::Dir, 0)
            } else {
                (
                    EntryKind::File,
                    u32::try_from(metadata.len()).unwrap_or(u32::MAX),
                )
            };
            if visit(&DirEntry { path, size, kind }).is_break() {
                break;
            }
        }
        Ok(())
    }
}

/// Root directory of a store, for log lines
pub fn describe(root: &Path) -> String {
    root.canonicalize()
        .unwrap_or_else(|_| root.to_path_buf())
        .display()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_io::{Read, Write};

    fn store() -> (tempfile::TempDir, DirStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = DirStore::new(dir.path()).unwrap();
        (dir, store)
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, mut store) = store();
        let mut file = store.open("/notes/a.txt", OpenMode::Write).unwrap();
        file.write_all(b"hello").unwrap();
        drop(file);

        assert!(store.exists("/notes/a.txt"));
        let mut file = store.open("/notes/a.txt", OpenMode::Read).unwrap();
        assert_eq!(file.size(), 5);
        let mut buf = [0u8; 8];
        let n = file.read(&mut buf).unwrap();
        assert_eq!(&buf[..n], b"hello");
    }

    #[test]
    fn test_write_truncates() {
        let (_dir, mut store) = store();
        store
            .open("/a.txt", OpenMode::Write)
            .unwrap()
            .write_all(b"longer content")
            .unwrap();
        store
            .open("/a.txt", OpenMode::Write)
            .unwrap()
            .write_all(b"short")
            .unwrap();
        assert_eq!(store.open("/a.txt", OpenMode::Read).unwrap().size(), 5);
    }

    #[test]
    fn test_missing_object() {
        let (_dir, mut store) = store();
        assert!(!store.exists("/nope"));
        assert!(matches!(
            store.open("/nope", OpenMode::Read),
            Err(StorageError::NotFound)
        ));
        assert_eq!(store.remove("/nope"), Err(StorageError::NotFound));
    }

    #[test]
    fn test_directory_is_not_an_object() {
        let (_dir, mut store) = store();
        store.open("/sub/x.txt", OpenMode::Write).unwrap();
        assert!(!store.exists("/sub"));
        assert!(matches!(
            store.open("/sub", OpenMode::Read),
            Err(StorageError::NotFound)
        ));
    }

    #[test]
    fn test_traversal_rejected() {
        let (_dir, mut store) = store();
        assert!(matches!(
            store.open("/../escape", OpenMode::Write),
            Err(StorageError::InvalidPath)
        ));
    }

    fn collect(store: &mut DirStore, dir: &str) -> Result<Vec<DirEntry>, StorageError> {
        let mut out = Vec::new();
        store.list(dir, &mut |entry: &DirEntry| {
            out.push(entry.clone());
            ControlFlow::Continue(())
        })?;
        Ok(out)
    }

    #[test]
    fn test_list_sorted_with_kinds() {
        let (_dir, mut store) = store();
        store.open("/b.txt", OpenMode::Write).unwrap();
        store
            .open("/a.txt", OpenMode::Write)
            .unwrap()
            .write_all(b"abc")
            .unwrap();
        store.open("/sub/c.txt", OpenMode::Write).unwrap();

        let out = collect(&mut store, "/").unwrap();
        let paths: Vec<_> = out.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(paths, ["/a.txt", "/b.txt", "/sub"]);
        assert_eq!(out[0].size, 3);
        assert_eq!(out[2].kind, EntryKind::Dir);

        let nested = collect(&mut store, "/sub").unwrap();
        assert_eq!(nested[0].path.as_str(), "/sub/c.txt");
    }

    #[test]
    fn test_list_has_no_entry_limit() {
        let (_dir, mut store) = store();
        for i in 0..50 {
            store
                .open(&format!("/f{:02}.txt", i), OpenMode::Write)
                .unwrap();
        }
        let out = collect(&mut store, "/").unwrap();
        assert_eq!(out.len(), 50);
        assert_eq!(out[49].path.as_str(), "/f49.txt");
    }

    #[test]
    fn test_list_stops_on_break() {
        let (_dir, mut store) = store();
        store.open("/a.txt", OpenMode::Write).unwrap();
        store.open("/b.txt", OpenMode::Write).unwrap();

        let mut seen = 0;
        store
            .list("/", &mut |_: &DirEntry| {
                seen += 1;
                ControlFlow::Break(())
            })
            .unwrap();
        assert_eq!(seen, 1);
    }

    #[test]
    fn test_list_missing_directory() {
        let (_dir, mut store) = store();
        assert_eq!(collect(&mut store, "/nope"), Err(StorageError::NotFound));
    }
}
