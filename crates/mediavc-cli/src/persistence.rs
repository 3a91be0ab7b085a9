//! `SQLite` persistence layer.

use mediavc_core::{Block, BlockStore, Link, StoreError};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Result as SqliteResult};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// `SQLite`-backed block store with named refs.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open or create a `SQLite` database.
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be opened or initialized.
    pub fn open(path: &Path) -> SqliteResult<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Create an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if database cannot be created.
    pub fn in_memory() -> SqliteResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> SqliteResult<Self> {
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> SqliteResult<()> {
        conn.execute_batch(
            r"
            -- Content-addressed blocks
            CREATE TABLE IF NOT EXISTS blocks (
                cid BLOB PRIMARY KEY,
                bytes BLOB NOT NULL
            );

            -- Named store roots
            CREATE TABLE IF NOT EXISTS refs (
                name TEXT PRIMARY KEY,
                store_root BLOB NOT NULL,
                updated_at INTEGER NOT NULL
            );
            ",
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Point `name` at a store root.
    ///
    /// # Errors
    ///
    /// Returns error if the insert fails.
    pub fn save_ref(&self, name: &str, store_root: &Link) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp_millis();
        self.lock()?
            .execute(
                r"
                INSERT OR REPLACE INTO refs (name, store_root, updated_at)
                VALUES (?1, ?2, ?3)
                ",
                (name, store_root.as_bytes().as_slice(), now),
            )
            .map_err(backend)?;

        tracing::debug!(name, store_root = %store_root, "Saved ref");
        Ok(())
    }

    /// Store root `name` points at, if any.
    ///
    /// # Errors
    ///
    /// Returns error if the query fails or the stored root is malformed.
    pub fn load_ref(&self, name: &str) -> Result<Option<Link>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT store_root FROM refs WHERE name = ?1")
            .map_err(backend)?;

        stmt.query_row([name], |row| {
            let bytes: Vec<u8> = row.get(0)?;
            Link::try_from(bytes.as_slice())
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(0, Type::Blob, Box::new(e)))
        })
        .optional()
        .map_err(backend)
    }
}

impl BlockStore for SqliteStore {
    fn put(&self, block: Block) -> Result<(), StoreError> {
        self.lock()?
            .execute(
                "INSERT OR IGNORE INTO blocks (cid, bytes) VALUES (?1, ?2)",
                (block.cid.as_bytes().as_slice(), block.bytes.as_slice()),
            )
            .map_err(backend)?;
        Ok(())
    }

    fn get(&self, cid: &Link) -> Result<Vec<u8>, StoreError> {
        self.lock()?
            .query_row(
                "SELECT bytes FROM blocks WHERE cid = ?1",
                [cid.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)?
            .ok_or(StoreError::NotFound(*cid))
    }

    fn has(&self, cid: &Link) -> Result<bool, StoreError> {
        let found: Option<i64> = self
            .lock()?
            .query_row(
                "SELECT 1 FROM blocks WHERE cid = ?1",
                [cid.as_bytes().as_slice()],
                |row| row.get(0),
            )
            .optional()
            .map_err(backend)?;
        Ok(found.is_some())
    }

    fn size(&self) -> Result<usize, StoreError> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM blocks", [], |row| row.get(0))
            .map_err(backend)?;
        usize::try_from(count).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore").finish_non_exhaustive()
    }
}

#[allow(clippy::needless_pass_by_value)]
fn backend(err: rusqlite::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_are_stored_once() {
        let store = SqliteStore::in_memory().unwrap();
        let block = Block::new(b"frame".to_vec());

        assert!(!store.has(&block.cid).unwrap());
        store.put(block.clone()).unwrap();
        store.put(block.clone()).unwrap();

        assert!(store.has(&block.cid).unwrap());
        assert_eq!(store.get(&block.cid).unwrap(), b"frame");
        assert_eq!(store.size().unwrap(), 1);
    }

    #[test]
    fn missing_block_is_not_found() {
        let store = SqliteStore::in_memory().unwrap();
        let cid = Link::digest(b"absent");
        assert!(matches!(store.get(&cid), Err(StoreError::NotFound(c)) if c == cid));
    }

    #[test]
    fn refs_are_replaced() {
        let store = SqliteStore::in_memory().unwrap();
        assert_eq!(store.load_ref("registry").unwrap(), None);

        let first = Link::digest(b"one");
        let second = Link::digest(b"two");
        store.save_ref("registry", &first).unwrap();
        store.save_ref("registry", &second).unwrap();

        assert_eq!(store.load_ref("registry").unwrap(), Some(second));
    }

    #[test]
    fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mediavc.db");
        let block = Block::new(b"persisted".to_vec());
        let root = Link::digest(b"root");

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put(block.clone()).unwrap();
            store.save_ref("registry", &root).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get(&block.cid).unwrap(), b"persisted");
        assert_eq!(store.load_ref("registry").unwrap(), Some(root));
    }
}
