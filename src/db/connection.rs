use crate::config::StorageLocation;
use crate::error::Result;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct Database {
    conn: Arc<Mutex<Connection>>,
    path: PathBuf,
}

impl Database {
    pub fn open(location: &StorageLocation) -> Result<Self> {
        match location {
            StorageLocation::Memory => Self::open_in_memory(),
            StorageLocation::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    std::fs::create_dir_all(parent)?;
                }
                let conn = Connection::open(path)?;
                Self::init(conn, path.clone())
            }
        }
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, PathBuf::from(":memory:"))
    }

    fn init(conn: Connection, path: PathBuf) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };

        super::migrations::run(&db)?;

        Ok(db)
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.lock();
        f(&conn)
    }

    pub fn with_conn_mut<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.lock();
        f(&mut conn)
    }

    // A panic mid-query leaves the connection itself usable.
    fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: Arc::clone(&self.conn),
            path: self.path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_file_database_and_creates_parent_dirs() {
        let dir = std::env::temp_dir().join(format!("agrisense-test-{}", std::process::id()));
        let path = dir.join("nested").join("agrisense.db");

        let db = Database::open(&StorageLocation::File(path.clone())).unwrap();
        assert_eq!(db.path(), &path);
        assert!(path.exists());

        drop(db);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn clones_share_one_connection() {
        let db = Database::open(&StorageLocation::Memory).unwrap();
        let other = db.clone();
        db.with_conn(|conn| {
            conn.execute("INSERT INTO crop_profiles (name, moisture_min, moisture_max) VALUES ('Rice', 60, 80)", [])?;
            Ok(())
        })
        .unwrap();
        let count: i64 = other
            .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM crop_profiles", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(count, 1);
    }
}
