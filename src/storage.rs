//! JSON request table, keyed by request name
//!
//! Every operation takes the same lock and re-reads the file, so interactive
//! workflows and agent tool calls in the same process never interleave a
//! read-modify-write sequence.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde_json::json;

use crate::constants::DATABASE_FILE;
use crate::error::{StateError, StorageError, TankerError};
use crate::models::{HttpMethod, Request};

/// Requests by name
pub type RequestTable = BTreeMap<String, Request>;

/// Manages the on-disk request table
pub struct Storage {
    dir: PathBuf,
    file: PathBuf,
    lock: Mutex<()>,
}

impl Storage {
    /// Opens the database in `dir`, creating and seeding it on first run
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        let storage = Storage {
            file: dir.join(DATABASE_FILE),
            dir,
            lock: Mutex::new(()),
        };
        ensure_dir(&storage.dir)?;

        {
            let _guard = storage.guard()?;
            if !storage.file.exists() {
                tracing::info!(path = %storage.file.display(), "Seeding request database");
                storage.write(&seed_requests())?;
            }
        }
        Ok(storage)
    }

    pub fn path(&self) -> &Path {
        &self.file
    }

    /// Reads the whole table
    pub fn load(&self) -> Result<RequestTable, StorageError> {
        let _guard = self.guard()?;
        self.read()
    }

    /// Replaces the whole table
    pub fn save(&self, data: &RequestTable) -> Result<(), StorageError> {
        let _guard = self.guard()?;
        self.write(data)
    }

    /// Removes a request; unknown names leave the file untouched
    pub fn delete(&self, name: &str) -> Result<(), TankerError> {
        let _guard = self.guard()?;
        let mut data = self.read()?;
        if data.remove(name).is_none() {
            return Err(StateError::NotFound(name.to_string()).into());
        }
        self.write(&data)?;
        tracing::info!(name, "Request deleted");
        Ok(())
    }

    /// Looks up a single request
    pub fn get(&self, name: &str) -> Result<Request, TankerError> {
        self.load()?
            .remove(name)
            .ok_or_else(|| StateError::NotFound(name.to_string()).into())
    }

    /// Inserts or overwrites a request under its own name
    pub fn put(&self, request: Request) -> Result<(), StorageError> {
        self.replace(None, request)
    }

    /// Stores `request`, removing `previous` first when the name changed
    pub fn replace(&self, previous: Option<&str>, request: Request) -> Result<(), StorageError> {
        let _guard = self.guard()?;
        let mut data = self.read()?;
        if let Some(old) = previous.filter(|old| *old != request.name) {
            data.remove(old);
        }
        tracing::info!(name = %request.name, method = %request.method, "Request saved");
        data.insert(request.name.clone(), request);
        self.write(&data)
    }

    /// All requests, ordered by name
    pub fn list(&self) -> Result<Vec<Request>, StorageError> {
        Ok(self.load()?.into_values().collect())
    }

    pub fn contains(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.load()?.contains_key(name))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StorageError> {
        self.lock.lock().map_err(|_| StorageError::Poisoned)
    }

    fn read(&self) -> Result<RequestTable, StorageError> {
        if !self.file.exists() {
            return Ok(RequestTable::new());
        }
        let content = fs::read(&self.file).map_err(|source| self.io_error(&self.file, source))?;
        if content.iter().all(u8::is_ascii_whitespace) {
            return Ok(RequestTable::new());
        }
        serde_json::from_slice(&content).map_err(|source| StorageError::Parse {
            path: self.file.clone(),
            source,
        })
    }

    /// Atomic write: temp file in the same directory, then rename
    fn write(&self, data: &RequestTable) -> Result<(), StorageError> {
        let content = serde_json::to_vec(data).map_err(StorageError::Encode)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|source| self.io_error(&self.dir, source))?;
        tmp.write_all(&content)
            .map_err(|source| self.io_error(tmp.path(), source))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            tmp.as_file()
                .set_permissions(fs::Permissions::from_mode(0o600))
                .map_err(|source| self.io_error(&self.file, source))?;
        }
        tmp.persist(&self.file)
            .map_err(|e| self.io_error(&self.file, e.error))?;
        Ok(())
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Creates the database directory, owner and group only on unix
pub fn ensure_dir(dir: &Path) -> Result<(), StorageError> {
    if dir.exists() {
        return Ok(());
    }
    let io_error = |source| StorageError::Io {
        path: dir.to_path_buf(),
        source,
    };
    fs::create_dir_all(dir).map_err(io_error)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(0o750)).map_err(io_error)?;
    }
    Ok(())
}

/// Example requests written on first run
fn seed_requests() -> RequestTable {
    let mut get = Request::new("get-example", HttpMethod::GET, "http://localhost:8080/get");
    get.params.insert("foo".into(), json!("bar"));
    get.params.insert("count".into(), json!("42"));
    get.headers.insert("Authorization".into(), json!("secret"));

    let mut post = Request::new("post-example", HttpMethod::POST, "http://localhost:8080/post");
    post.payload.insert(
        "languages".into(),
        json!([
            {"name": "Python", "staticallyTyped": false},
            {"name": "Javascript", "staticallyTyped": false},
            {"name": "Golang", "staticallyTyped": true},
            {"name": "Rust", "staticallyTyped": true}
        ]),
    );
    post.payload.insert("foo".into(), json!("bar"));
    post.payload.insert("count".into(), json!(42));
    post.headers.insert("Content-Type".into(), json!("application/json"));
    post.headers.insert("Authorization".into(), json!("secret"));

    [get, post]
        .into_iter()
        .map(|r| (r.name.clone(), r))
        .collect()
}
