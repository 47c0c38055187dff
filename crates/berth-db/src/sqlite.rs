use std::sync::Mutex;

use rusqlite::{Connection, OptionalExtension, Result as SqlResult, params};
use uuid::Uuid;

use berth_core::{Company, IdentityStore, StoreError};

/// SQLite-backed identity store. The connection sits behind a mutex because
/// the store is shared across request handlers.
pub struct DbIdentityStore {
    conn: Mutex<Connection>,
}

impl DbIdentityStore {
    pub fn new(path: &str) -> SqlResult<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> SqlResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> SqlResult<Self> {
        let store = Self { conn: Mutex::new(conn) };
        store.init_tables()?;
        Ok(store)
    }

    fn init_tables(&self) -> SqlResult<()> {
        self.conn.lock().unwrap().execute_batch(
            "
            CREATE TABLE IF NOT EXISTS companies (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                api_key TEXT NOT NULL UNIQUE,
                api_secret TEXT NOT NULL
            );
            ",
        )?;
        Ok(())
    }
}

fn row_to_company(row: &rusqlite::Row<'_>) -> rusqlite::Result<Company> {
    let id: String = row.get(0)?;
    let id = Uuid::parse_str(&id).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(Company {
        id,
        name: row.get(1)?,
        api_key: row.get(2)?,
        api_secret: row.get(3)?,
    })
}

fn map_sql_error(err: rusqlite::Error) -> StoreError {
    match err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::DuplicateKey
        }
        other => StoreError::Backend(other.to_string()),
    }
}

impl IdentityStore for DbIdentityStore {
    fn insert(&self, company: &Company) -> Result<(), StoreError> {
        self.conn
            .lock()
            .unwrap()
            .execute(
                "INSERT INTO companies (id, name, api_key, api_secret) VALUES (?1, ?2, ?3, ?4)",
                params![
                    company.id.to_string(),
                    company.name,
                    company.api_key,
                    company.api_secret
                ],
            )
            .map_err(map_sql_error)?;
        Ok(())
    }

    fn find_by_api_key(&self, api_key: &str) -> Result<Option<Company>, StoreError> {
        self.conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT id, name, api_key, api_secret FROM companies WHERE api_key = ?1",
                [api_key],
                row_to_company,
            )
            .optional()
            .map_err(map_sql_error)
    }

    fn find_by_id(&self, id: &Uuid) -> Result<Option<Company>, StoreError> {
        self.conn
            .lock()
            .unwrap()
            .query_row(
                "SELECT id, name, api_key, api_secret FROM companies WHERE id = ?1",
                [id.to_string()],
                row_to_company,
            )
            .optional()
            .map_err(map_sql_error)
    }

    fn list(&self) -> Result<Vec<Company>, StoreError> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare("SELECT id, name, api_key, api_secret FROM companies ORDER BY name")
            .map_err(map_sql_error)?;
        let rows = stmt
            .query_map([], row_to_company)
            .map_err(map_sql_error)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(map_sql_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_a_company_by_key_and_id() {
        let store = DbIdentityStore::open_in_memory().unwrap();
        let company = Company::new("Acme");
        store.insert(&company).unwrap();

        let by_key = store.find_by_api_key(&company.api_key).unwrap().unwrap();
        assert_eq!(by_key.id, company.id);
        assert_eq!(by_key.api_secret, company.api_secret);

        let by_id = store.find_by_id(&company.id).unwrap().unwrap();
        assert_eq!(by_id.api_key, company.api_key);
    }

    #[test]
    fn unknown_key_reads_as_none() {
        let store = DbIdentityStore::open_in_memory().unwrap();
        assert!(store.find_by_api_key("missing").unwrap().is_none());
    }

    #[test]
    fn duplicate_api_key_is_a_distinct_error() {
        let store = DbIdentityStore::open_in_memory().unwrap();
        let company = Company::new("Acme");
        store.insert(&company).unwrap();

        let mut clone = Company::new("Globex");
        clone.api_key = company.api_key.clone();
        assert!(matches!(store.insert(&clone), Err(StoreError::DuplicateKey)));
    }

    #[test]
    fn list_returns_every_company() {
        let store = DbIdentityStore::open_in_memory().unwrap();
        store.insert(&Company::new("Acme")).unwrap();
        store.insert(&Company::new("Globex")).unwrap();
        assert_eq!(store.list().unwrap().len(), 2);
    }
}
