use rusqlite::{params, Connection, ErrorCode, OpenFlags};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::DbConfig;
use crate::error::StoreError;
use crate::models::{
    EmployerPostingCount, EmployerRecord, PostingListing, PostingRecord, PostingSummary,
    UpsertOutcome,
};
use crate::validate::{validate_employer, validate_posting};

const SCHEMA_VERSION: i32 = 1;

// A posting counts towards the average only if both bounds were given.
const HAS_SALARY: &str = "salary_from > 0 AND salary_to > 0";

pub struct Store {
    conn: Option<Connection>,
    path: PathBuf,
}

impl Store {
    /// Creates the database file if needed, connects and ensures the schema.
    pub fn open(config: &DbConfig) -> Result<Self, StoreError> {
        let path = config.database_path();
        if ensure_database(&path)? {
            info!(database = config.name(), path = %path.display(), "created database");
        }

        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|source| StoreError::Connect {
            path: path.clone(),
            source,
        })?;
        conn.pragma_update(None, "foreign_keys", true)?;

        let store = Self {
            conn: Some(conn),
            path,
        };
        store.ensure_schema()?;
        debug!(path = %store.path.display(), "database ready");
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn conn(&self) -> Result<&Connection, StoreError> {
        self.conn.as_ref().ok_or(StoreError::Closed)
    }

    pub fn ensure_schema(&self) -> Result<(), StoreError> {
        self.conn()?.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS employers (
                id TEXT NOT NULL PRIMARY KEY,
                name TEXT NOT NULL UNIQUE,
                url TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS postings (
                id TEXT NOT NULL PRIMARY KEY,
                employer_id TEXT NOT NULL REFERENCES employers(id),
                name TEXT NOT NULL,
                salary_from INTEGER NOT NULL DEFAULT 0,
                salary_to INTEGER NOT NULL DEFAULT 0,
                currency TEXT NOT NULL,
                url TEXT NOT NULL,
                fetched_at TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX IF NOT EXISTS idx_postings_employer ON postings(employer_id);
            "#,
        )?;
        Ok(())
    }

    // --- Writes ---

    /// Inserts the employer unless one with the same id (or name) exists.
    pub fn upsert_employer(&self, record: &EmployerRecord) -> Result<UpsertOutcome, StoreError> {
        let employer = validate_employer(record).into_result()?;
        let changed = self
            .conn()?
            .execute(
                "INSERT INTO employers (id, name, url) VALUES (?1, ?2, ?3)
                 ON CONFLICT DO NOTHING",
                params![employer.id, employer.name, employer.url],
            )
            .map_err(constraint_or_database)?;
        Ok(UpsertOutcome::from_changes(changed))
    }

    /// Inserts the posting under `employer_id` unless one with the same id exists.
    pub fn upsert_posting(
        &self,
        record: &PostingRecord,
        employer_id: &str,
    ) -> Result<UpsertOutcome, StoreError> {
        let posting = validate_posting(record).into_result()?;
        let changed = self
            .conn()?
            .execute(
                "INSERT INTO postings (id, employer_id, name, salary_from, salary_to, currency, url)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT DO NOTHING",
                params![
                    posting.id,
                    employer_id,
                    posting.name,
                    posting.salary_from,
                    posting.salary_to,
                    posting.currency,
                    posting.url,
                ],
            )
            .map_err(constraint_or_database)?;
        Ok(UpsertOutcome::from_changes(changed))
    }

    // --- Queries ---

    pub fn count_postings_by_employer(&self) -> Result<Vec<EmployerPostingCount>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT e.name, COUNT(p.id)
             FROM employers e
             LEFT JOIN postings p ON p.employer_id = e.id
             GROUP BY e.id, e.name
             ORDER BY e.name",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(EmployerPostingCount {
                employer: row.get(0)?,
                postings: row.get(1)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn list_all_postings(&self) -> Result<Vec<PostingListing>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT e.name, p.name, p.salary_from, p.salary_to, p.url
             FROM postings p
             JOIN employers e ON e.id = p.employer_id
             ORDER BY e.name, p.rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(PostingListing {
                employer: row.get(0)?,
                name: row.get(1)?,
                salary_from: row.get(2)?,
                salary_to: row.get(3)?,
                url: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Mean midpoint salary over postings with both bounds; `None` when no
    /// posting has salary data.
    pub fn average_salary(&self) -> Result<Option<f64>, StoreError> {
        let average = self.conn()?.query_row(
            &format!(
                "SELECT AVG((salary_from + salary_to) / 2.0) FROM postings WHERE {HAS_SALARY}"
            ),
            [],
            |row| row.get::<_, Option<f64>>(0),
        )?;
        Ok(average)
    }

    /// Postings whose stored midpoint is strictly above [`Self::average_salary`].
    /// Every posting is compared, including ones left out of the average.
    pub fn list_above_average_salary(&self) -> Result<Vec<PostingSummary>, StoreError> {
        let Some(average) = self.average_salary()? else {
            return Ok(Vec::new());
        };
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT name, salary_from, salary_to, url
             FROM postings
             WHERE (salary_from + salary_to) / 2.0 > ?1
             ORDER BY rowid",
        )?;
        let rows = stmt.query_map([average], Self::row_to_summary)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Case-insensitive substring match on posting names. SQLite only folds
    /// ASCII case, so matching happens here.
    pub fn list_by_keyword(&self, keyword: &str) -> Result<Vec<PostingSummary>, StoreError> {
        let needle = keyword.to_lowercase();
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT name, salary_from, salary_to, url FROM postings ORDER BY rowid")?;
        let rows = stmt.query_map([], Self::row_to_summary)?;

        let mut matches = Vec::new();
        for row in rows {
            let posting = row?;
            if posting.name.to_lowercase().contains(&needle) {
                matches.push(posting);
            }
        }
        Ok(matches)
    }

    /// Row counts of (employers, postings).
    pub fn counts(&self) -> Result<(i64, i64), StoreError> {
        let counts = self.conn()?.query_row(
            "SELECT (SELECT COUNT(*) FROM employers), (SELECT COUNT(*) FROM postings)",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        Ok(counts)
    }

    /// Releases the connection. Calling it again is a no-op.
    pub fn close(&mut self) -> Result<(), StoreError> {
        match self.conn.take() {
            Some(conn) => {
                conn.close().map_err(|(_, err)| StoreError::Database(err))?;
                debug!(path = %self.path.display(), "database closed");
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn row_to_summary(row: &rusqlite::Row) -> rusqlite::Result<PostingSummary> {
        Ok(PostingSummary {
            name: row.get(0)?,
            salary_from: row.get(1)?,
            salary_to: row.get(2)?,
            url: row.get(3)?,
        })
    }
}

/// Check-then-create the database file. Returns true if it was created.
pub fn ensure_database(path: &Path) -> Result<bool, StoreError> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
    )
    .map_err(|source| StoreError::Connect {
        path: path.to_path_buf(),
        source,
    })?;
    // Writes the header so the file is a real database, not an empty stub.
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    conn.close().map_err(|(_, err)| StoreError::Database(err))?;
    Ok(true)
}

fn constraint_or_database(err: rusqlite::Error) -> StoreError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return StoreError::Constraint(
                message.clone().unwrap_or_else(|| failure.to_string()),
            );
        }
    }
    StoreError::Database(err)
}
