use parking_lot::{Mutex, MutexGuard};
use rusqlite::{Connection, Result as SqlResult};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// How long a write waits on another process holding the file lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Base database connection wrapper.
///
/// The connection sits behind a mutex so the wrapper can be shared with
/// blocking tasks on the runtime.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn new<P: AsRef<Path>>(path: P) -> SqlResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                if let Err(err) = fs::create_dir_all(parent) {
                    log::warn!("Failed to create data directory {}: {err}", parent.display());
                }
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> SqlResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn connection(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock()
    }
}
