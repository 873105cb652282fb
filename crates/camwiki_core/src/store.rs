use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension, Row, params};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::WikiError;

/// A wiki page row. `modified_unix` moves every time a revision is added
/// to or removed from the page.
#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub id: i64,
    pub slug: String,
    pub created_unix: i64,
    pub modified_unix: i64,
}

/// One immutable content snapshot. Revision ids come from a store-wide
/// sequence and are the stable handle used in diffs and listings; rows are
/// append-only and never updated in place.
#[derive(Debug, Clone, Serialize)]
pub struct Revision {
    pub id: i64,
    pub page_id: i64,
    pub content: String,
    pub content_hash: String,
    pub message: String,
    pub creator: Option<String>,
    pub creator_ip: Option<String>,
    pub created_unix: i64,
    pub modified_unix: i64,
}

impl Revision {
    /// Display label used by listings.
    pub fn label(&self, slug: &str) -> String {
        format!("Revision {} for {} ({})", self.id, slug, self.created_unix)
    }
}

/// Payload for a new revision; identity fields stay empty for
/// system-created content.
#[derive(Debug, Clone, Default)]
pub struct RevisionDraft {
    pub content: String,
    pub message: String,
    pub creator: Option<String>,
    pub creator_ip: Option<String>,
}

pub struct WikiStore {
    connection: Connection,
}

impl WikiStore {
    /// Open the store at `db_path`. The schema must already be in place;
    /// see `migrate::run_migrations`.
    pub fn open(db_path: &Path) -> Result<Self, WikiError> {
        let connection = Connection::open(db_path)?;
        connection.busy_timeout(Duration::from_secs(5))?;
        connection.pragma_update(None, "foreign_keys", "ON")?;
        connection.pragma_update(None, "journal_mode", "WAL")?;
        Ok(Self { connection })
    }

    pub fn find_page(&self, slug: &str) -> Result<Option<Page>, WikiError> {
        let page = self
            .connection
            .query_row(
                "SELECT id, slug, created_unix, modified_unix
                 FROM wiki_pages
                 WHERE slug = ?1",
                [slug],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    pub fn get_page(&self, slug: &str) -> Result<Page, WikiError> {
        self.find_page(slug)?.ok_or(WikiError::NotFound)
    }

    /// The page's current revision: latest `modified_unix`, ties broken by
    /// highest id. A page without any revision is an integrity error, not
    /// a routine miss.
    pub fn current_revision(&self, page: &Page) -> Result<Revision, WikiError> {
        let revision = self
            .connection
            .query_row(
                &format!(
                    "{REVISION_SELECT} WHERE page_id = ?1
                     ORDER BY modified_unix DESC, id DESC
                     LIMIT 1"
                ),
                [page.id],
                revision_from_row,
            )
            .optional()?;
        revision.ok_or_else(|| WikiError::Integrity(format!("page {} has no revisions", page.slug)))
    }

    pub fn find_revision(&self, revision_id: i64) -> Result<Option<Revision>, WikiError> {
        let revision = self
            .connection
            .query_row(
                &format!("{REVISION_SELECT} WHERE id = ?1"),
                [revision_id],
                revision_from_row,
            )
            .optional()?;
        Ok(revision)
    }

    pub fn get_revision(&self, revision_id: i64) -> Result<Revision, WikiError> {
        self.find_revision(revision_id)?.ok_or(WikiError::NotFound)
    }

    /// Append a revision for `slug` inside one transaction. If no page row
    /// exists yet it is created first; this is the sole page-creation path.
    /// Existing revisions are never overwritten.
    pub fn create_revision(
        &mut self,
        slug: &str,
        draft: &RevisionDraft,
    ) -> Result<(Page, Revision), WikiError> {
        let now = unix_timestamp()?;
        let hash = content_hash(&draft.content);

        let tx = self.connection.transaction()?;
        let existing: Option<i64> = tx
            .query_row("SELECT id FROM wiki_pages WHERE slug = ?1", [slug], |row| {
                row.get(0)
            })
            .optional()?;
        let page_id = match existing {
            Some(id) => id,
            None => {
                tx.execute(
                    "INSERT INTO wiki_pages (slug, created_unix, modified_unix)
                     VALUES (?1, ?2, ?2)",
                    params![slug, now],
                )?;
                tx.last_insert_rowid()
            }
        };

        tx.execute(
            "INSERT INTO wiki_revisions
                 (page_id, content, content_hash, message, creator, creator_ip,
                  created_unix, modified_unix)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)",
            params![
                page_id,
                draft.content,
                hash,
                draft.message,
                draft.creator,
                draft.creator_ip,
                now,
            ],
        )?;
        let revision_id = tx.last_insert_rowid();
        tx.execute(
            "UPDATE wiki_pages SET modified_unix = ?1 WHERE id = ?2",
            params![now, page_id],
        )?;

        let page = load_page(&tx, page_id)?;
        let revision = load_revision(&tx, revision_id)?;
        tx.commit()?;

        debug!("created revision {} for {}", revision.id, page.slug);
        Ok((page, revision))
    }

    pub fn count_pages(&self) -> Result<usize, WikiError> {
        let count: i64 =
            self.connection
                .query_row("SELECT COUNT(*) FROM wiki_pages", [], |row| row.get(0))?;
        to_count(count)
    }

    pub fn count_revisions(&self, page: &Page) -> Result<usize, WikiError> {
        let count: i64 = self.connection.query_row(
            "SELECT COUNT(*) FROM wiki_revisions WHERE page_id = ?1",
            [page.id],
            |row| row.get(0),
        )?;
        to_count(count)
    }

    /// Remove a single revision and touch the owning page. Whether the
    /// page itself should go when this was its last revision is the
    /// workflow's decision, made before calling this.
    pub fn delete_revision(&mut self, revision: &Revision) -> Result<(), WikiError> {
        let now = unix_timestamp()?;
        let tx = self.connection.transaction()?;
        tx.execute("DELETE FROM wiki_revisions WHERE id = ?1", [revision.id])?;
        tx.execute(
            "UPDATE wiki_pages SET modified_unix = ?1 WHERE id = ?2",
            params![now, revision.page_id],
        )?;
        tx.commit()?;

        debug!("deleted revision {}", revision.id);
        Ok(())
    }

    /// Remove a page and all of its revisions in one transaction; the
    /// cascade is explicit so a concurrent reader never sees a half-deleted
    /// page.
    pub fn delete_page(&mut self, page: &Page) -> Result<(), WikiError> {
        let tx = self.connection.transaction()?;
        tx.execute(
            "DELETE FROM wiki_revisions WHERE page_id = ?1",
            [page.id],
        )?;
        tx.execute("DELETE FROM wiki_pages WHERE id = ?1", [page.id])?;
        tx.commit()?;

        debug!("deleted page {} with all revisions", page.slug);
        Ok(())
    }

    pub fn list_pages(&self) -> Result<Vec<Page>, WikiError> {
        let mut statement = self.connection.prepare(
            "SELECT id, slug, created_unix, modified_unix
             FROM wiki_pages
             ORDER BY slug ASC",
        )?;
        let rows = statement.query_map([], page_from_row)?;

        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    /// All revisions newest-first by `modified_unix` (then id), optionally
    /// narrowed to one page.
    pub fn list_revisions(&self, page: Option<&Page>) -> Result<Vec<Revision>, WikiError> {
        let mut out = Vec::new();
        match page {
            Some(page) => {
                let mut statement = self.connection.prepare(&format!(
                    "{REVISION_SELECT} WHERE page_id = ?1
                     ORDER BY modified_unix DESC, id DESC"
                ))?;
                let rows = statement.query_map([page.id], revision_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
            None => {
                let mut statement = self.connection.prepare(&format!(
                    "{REVISION_SELECT} ORDER BY modified_unix DESC, id DESC"
                ))?;
                let rows = statement.query_map([], revision_from_row)?;
                for row in rows {
                    out.push(row?);
                }
            }
        }
        Ok(out)
    }
}

const REVISION_SELECT: &str = "SELECT id, page_id, content, content_hash, message, creator,
        creator_ip, created_unix, modified_unix
 FROM wiki_revisions";

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<Page> {
    Ok(Page {
        id: row.get(0)?,
        slug: row.get(1)?,
        created_unix: row.get(2)?,
        modified_unix: row.get(3)?,
    })
}

fn revision_from_row(row: &Row<'_>) -> rusqlite::Result<Revision> {
    Ok(Revision {
        id: row.get(0)?,
        page_id: row.get(1)?,
        content: row.get(2)?,
        content_hash: row.get(3)?,
        message: row.get(4)?,
        creator: row.get(5)?,
        creator_ip: row.get(6)?,
        created_unix: row.get(7)?,
        modified_unix: row.get(8)?,
    })
}

fn load_page(connection: &Connection, page_id: i64) -> Result<Page, WikiError> {
    let page = connection.query_row(
        "SELECT id, slug, created_unix, modified_unix FROM wiki_pages WHERE id = ?1",
        [page_id],
        page_from_row,
    )?;
    Ok(page)
}

fn load_revision(connection: &Connection, revision_id: i64) -> Result<Revision, WikiError> {
    let revision = connection.query_row(
        &format!("{REVISION_SELECT} WHERE id = ?1"),
        [revision_id],
        revision_from_row,
    )?;
    Ok(revision)
}

fn to_count(count: i64) -> Result<usize, WikiError> {
    usize::try_from(count)
        .map_err(|_| WikiError::Integrity("row count does not fit into usize".to_string()))
}

pub(crate) fn unix_timestamp() -> Result<i64, WikiError> {
    let elapsed = SystemTime::now().duration_since(UNIX_EPOCH)?;
    i64::try_from(elapsed.as_secs())
        .map_err(|_| WikiError::Integrity("timestamp does not fit into i64".to_string()))
}

fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest.iter() {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}
