use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::Path;
use crate::tracker::SeenStore;

/// Seen-set kept in an SQLite table instead of a flat file
pub struct SqliteSeenStore {
    conn: Connection,
}

impl SqliteSeenStore {
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        let store = SqliteSeenStore { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS seen_links (
                link TEXT PRIMARY KEY,
                first_seen_at TEXT NOT NULL
            )",
            [],
        )?;

        Ok(())
    }

    /// When a link was first recorded, if ever
    #[cfg(test)]
    pub fn first_seen_at(&self, link: &str) -> Result<Option<chrono::DateTime<Utc>>> {
        use rusqlite::OptionalExtension;

        let seen_at = self.conn
            .query_row(
                "SELECT first_seen_at FROM seen_links WHERE link = ?1",
                params![link],
                |row| row.get(0),
            )
            .optional()?;

        Ok(seen_at)
    }
}

impl SeenStore for SqliteSeenStore {
    fn load(&mut self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT link FROM seen_links")?;

        let links = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(links)
    }

    fn append(&mut self, links: &[String]) -> Result<()> {
        let seen_at = Utc::now();
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR IGNORE INTO seen_links (link, first_seen_at) VALUES (?1, ?2)",
            )?;
            for link in links {
                stmt.execute(params![link, seen_at])?;
            }
        }
        tx.commit()?;

        Ok(())
    }
}
