//! sqlite-store - SQLite implementation of the `RecordStore` port.
//!
//! Purpose
//! - Keep users, pets, shelters and adoption records across restarts with a
//!   single file and no external services.
//! - Implements the `RecordStore` and `Table` traits from the domain crate.
//!
//! Notes
//! - Uses `rusqlite` with the `bundled` feature for portability.
//! - Each table stores a record as a JSON document keyed by its id. Upserts
//!   keep the original rowid, so `values()` returns insertion order.
//! - Id counters live in a `counters` table, one row per entity kind.

use std::marker::PhantomData;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use adoption_domain::{
    AdoptionRecord, CoreError, EntityKind, Pet, Record, RecordStore, Shelter, Table, User, Write,
    WriteBatch,
};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

type SharedConn = Arc<Mutex<Connection>>;

fn lock(conn: &SharedConn) -> Result<MutexGuard<'_, Connection>, CoreError> {
    conn.lock()
        .map_err(|_| CoreError::Repository("mutex poisoned".into()))
}

/// SQL table backing records of `kind`.
fn table_name(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::User => "users",
        EntityKind::Pet => "pets",
        EntityKind::Shelter => "shelters",
        EntityKind::Adoption => "adoption_records",
    }
}

/// SQLite-backed record store.
pub struct SqliteStore {
    conn: SharedConn,
    users: SqliteTable<User>,
    pets: SqliteTable<Pet>,
    shelters: SqliteTable<Shelter>,
    adoptions: SqliteTable<AdoptionRecord>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path and ensure schema.
    /// Missing parent directories are created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, CoreError> {
        if let Some(dir) = path.as_ref().parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    CoreError::Repository(format!("cannot create {}: {e}", dir.display()))
                })?;
            }
        }
        let conn = Connection::open(path).map_err(map_sqerr)?;
        Self::with_connection(conn)
    }

    /// A private in-memory database. Useful for tests.
    pub fn open_in_memory() -> Result<Self, CoreError> {
        Self::with_connection(Connection::open_in_memory().map_err(map_sqerr)?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CoreError> {
        init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            users: SqliteTable::new(conn.clone()),
            pets: SqliteTable::new(conn.clone()),
            shelters: SqliteTable::new(conn.clone()),
            adoptions: SqliteTable::new(conn.clone()),
            conn,
        })
    }
}

fn init_schema(conn: &Connection) -> Result<(), CoreError> {
    let mut ddl = String::new();
    for kind in EntityKind::ALL {
        ddl.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS {} (\n    id TEXT PRIMARY KEY,\n    body TEXT NOT NULL\n);\n",
            table_name(kind)
        ));
    }
    ddl.push_str(
        r#"
        CREATE TABLE IF NOT EXISTS counters (
            name TEXT PRIMARY KEY,
            value INTEGER NOT NULL
        );
        "#,
    );
    conn.execute_batch(&ddl).map_err(map_sqerr)
}

fn map_sqerr<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("sqlite error: {e}"))
}

fn map_codec_err<E: std::fmt::Display>(e: E) -> CoreError {
    CoreError::Repository(format!("bad record in db: {e}"))
}

fn fetch<V: DeserializeOwned>(
    conn: &Connection,
    table: &str,
    key: &str,
) -> Result<Option<V>, CoreError> {
    let body: Option<String> = conn
        .query_row(
            &format!("SELECT body FROM {table} WHERE id = ?1"),
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(map_sqerr)?;
    body.map(|b| serde_json::from_str(&b).map_err(map_codec_err))
        .transpose()
}

fn upsert<V: Serialize>(conn: &Connection, table: &str, key: &str, value: &V) -> Result<(), CoreError> {
    let body = serde_json::to_string(value).map_err(map_codec_err)?;
    conn.execute(
        &format!(
            "INSERT INTO {table}(id, body) VALUES (?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET body = excluded.body"
        ),
        params![key, body],
    )
    .map_err(map_sqerr)?;
    Ok(())
}

/// One record table sharing the store's connection.
pub struct SqliteTable<V> {
    conn: SharedConn,
    _record: PhantomData<fn() -> V>,
}

impl<V: Record> SqliteTable<V> {
    fn new(conn: SharedConn) -> Self {
        Self {
            conn,
            _record: PhantomData,
        }
    }

    fn name(&self) -> &'static str {
        table_name(V::KIND)
    }
}

impl<V: Record + Serialize + DeserializeOwned> Table<V> for SqliteTable<V> {
    fn insert(&self, key: &str, value: V) -> Result<Option<V>, CoreError> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        let previous = fetch(&tx, self.name(), key)?;
        upsert(&tx, self.name(), key, &value)?;
        tx.commit().map_err(map_sqerr)?;
        Ok(previous)
    }

    fn get(&self, key: &str) -> Result<Option<V>, CoreError> {
        let conn = lock(&self.conn)?;
        fetch(&conn, self.name(), key)
    }

    fn values(&self) -> Result<Vec<V>, CoreError> {
        let conn = lock(&self.conn)?;
        let mut stmt = conn
            .prepare(&format!("SELECT body FROM {} ORDER BY rowid", self.name()))
            .map_err(map_sqerr)?;
        let mut rows = stmt.query([]).map_err(map_sqerr)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(map_sqerr)? {
            let body: String = row.get(0).map_err(map_sqerr)?;
            out.push(serde_json::from_str(&body).map_err(map_codec_err)?);
        }
        Ok(out)
    }

    fn remove(&self, key: &str) -> Result<bool, CoreError> {
        let conn = lock(&self.conn)?;
        let changed = conn
            .execute(
                &format!("DELETE FROM {} WHERE id = ?1", self.name()),
                params![key],
            )
            .map_err(map_sqerr)?;
        Ok(changed > 0)
    }
}

impl RecordStore for SqliteStore {
    fn users(&self) -> &dyn Table<User> {
        &self.users
    }

    fn pets(&self) -> &dyn Table<Pet> {
        &self.pets
    }

    fn shelters(&self) -> &dyn Table<Shelter> {
        &self.shelters
    }

    fn adoptions(&self) -> &dyn Table<AdoptionRecord> {
        &self.adoptions
    }

    fn next_sequence(&self, kind: EntityKind) -> Result<u64, CoreError> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        // Ensure counter row exists
        tx.execute(
            "INSERT OR IGNORE INTO counters(name, value) VALUES(?1, 0)",
            params![kind.as_str()],
        )
        .map_err(map_sqerr)?;
        tx.execute(
            "UPDATE counters SET value = value + 1 WHERE name = ?1",
            params![kind.as_str()],
        )
        .map_err(map_sqerr)?;
        let val: u64 = tx
            .query_row(
                "SELECT value FROM counters WHERE name = ?1",
                params![kind.as_str()],
                |row| row.get::<_, i64>(0),
            )
            .map(|v| v as u64)
            .map_err(map_sqerr)?;
        tx.commit().map_err(map_sqerr)?;
        Ok(val)
    }

    fn commit(&self, batch: WriteBatch) -> Result<(), CoreError> {
        let conn = lock(&self.conn)?;
        let tx = conn.unchecked_transaction().map_err(map_sqerr)?;
        for write in batch.writes() {
            match write {
                Write::User(u) => upsert(&tx, table_name(EntityKind::User), u.key(), u)?,
                Write::Pet(p) => upsert(&tx, table_name(EntityKind::Pet), p.key(), p)?,
                Write::Shelter(s) => upsert(&tx, table_name(EntityKind::Shelter), s.key(), s)?,
                Write::Adoption(a) => {
                    upsert(&tx, table_name(EntityKind::Adoption), a.key(), a)?
                }
            }
        }
        // Dropping `tx` without commit rolls every write back.
        tx.commit().map_err(map_sqerr)
    }
}
