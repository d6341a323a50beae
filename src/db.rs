//! Database module
//!
//! Persistence for courses, conversation pairs and saved content.

mod schema;

pub use schema::*;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Course not found: {0}")]
    CourseNotFound(String),
    #[error("Saved content not found: {0}")]
    SavedContentNotFound(String),
    #[error("Database lock poisoned")]
    LockPoisoned,
}

pub type DbResult<T> = Result<T, DbError>;

/// Thread-safe database handle
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        Self::init(Connection::open(path)?)
    }

    /// Open an in-memory database (for testing)
    #[allow(dead_code)] // Used in tests
    pub fn open_in_memory() -> DbResult<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> DbResult<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> DbResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| DbError::LockPoisoned)
    }

    // ==================== Course Operations ====================

    /// Create a new course
    pub fn create_course(
        &self,
        title: &str,
        content: &str,
        created_by: Option<&str>,
    ) -> DbResult<Course> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().trunc_subsecs(6);

        conn.execute(
            "INSERT INTO courses (id, title, content, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![id, title, content, created_by, format_datetime(&now)],
        )?;

        Ok(Course {
            id,
            title: title.to_string(),
            content: content.to_string(),
            created_by: created_by.map(String::from),
            created_at: now,
            updated_at: now,
        })
    }

    /// Replace a course's title and content
    pub fn update_course(&self, id: &str, title: &str, content: &str) -> DbResult<Course> {
        {
            let conn = self.conn()?;
            let updated = conn.execute(
                "UPDATE courses SET title = ?1, content = ?2, updated_at = ?3 WHERE id = ?4",
                params![title, content, format_datetime(&Utc::now().trunc_subsecs(6)), id],
            )?;

            if updated == 0 {
                return Err(DbError::CourseNotFound(id.to_string()));
            }
        }
        self.get_course(id)
    }

    /// Get course by ID
    pub fn get_course(&self, id: &str) -> DbResult<Course> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, title, content, created_by, created_at, updated_at
             FROM courses WHERE id = ?1",
            params![id],
            parse_course_row,
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => DbError::CourseNotFound(id.to_string()),
            other => DbError::Sqlite(other),
        })
    }

    /// List all courses, newest first
    pub fn list_courses(&self) -> DbResult<Vec<Course>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, content, created_by, created_at, updated_at
             FROM courses ORDER BY created_at DESC, rowid DESC",
        )?;

        let rows = stmt.query_map([], parse_course_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Delete a course; its pairs and saved content go with it
    pub fn delete_course(&self, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM courses WHERE id = ?1", params![id])?;

        if deleted == 0 {
            return Err(DbError::CourseNotFound(id.to_string()));
        }
        Ok(())
    }

    // ==================== Conversation Pair Operations ====================

    /// Record one completed exchange
    pub fn insert_pair(
        &self,
        user_id: &str,
        course_id: &str,
        message: &str,
        response: &str,
    ) -> DbResult<ConversationPair> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().trunc_subsecs(6);

        conn.execute(
            "INSERT INTO chat_history (id, user_id, course_id, message, response, role, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'user', ?6)",
            params![id, user_id, course_id, message, response, format_datetime(&now)],
        )?;

        Ok(ConversationPair {
            id,
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            message: message.to_string(),
            response: response.to_string(),
            created_at: now,
        })
    }

    /// Pairs for one (user, course), oldest first
    ///
    /// Insertion order breaks `created_at` ties so repeated reads agree.
    pub fn list_pairs(&self, user_id: &str, course_id: &str) -> DbResult<Vec<ConversationPair>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, user_id, course_id, message, response, created_at
             FROM chat_history
             WHERE user_id = ?1 AND course_id = ?2
             ORDER BY created_at ASC, rowid ASC",
        )?;

        let rows = stmt.query_map(params![user_id, course_id], parse_pair_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Stored pairs across users, newest first, with course titles
    ///
    /// `user_filter` narrows the list to one user.
    pub fn list_all_pairs(
        &self,
        user_filter: Option<&str>,
    ) -> DbResult<Vec<ConversationPairEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT h.id, h.user_id, h.course_id, h.message, h.response, h.created_at, c.title
             FROM chat_history h
             LEFT JOIN courses c ON c.id = h.course_id
             WHERE ?1 IS NULL OR h.user_id = ?1
             ORDER BY h.created_at DESC, h.rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_filter], |row| {
            Ok(ConversationPairEntry {
                pair: parse_pair_row(row)?,
                course_title: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    // ==================== Saved Content Operations ====================

    /// Store a promoted assistant reply
    pub fn insert_saved_content(
        &self,
        user_id: &str,
        course_id: &str,
        content: &str,
        title: &str,
    ) -> DbResult<SavedContent> {
        let conn = self.conn()?;
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().trunc_subsecs(6);

        conn.execute(
            "INSERT INTO saved_content (id, user_id, course_id, content, title, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![id, user_id, course_id, content, title, format_datetime(&now)],
        )?;

        Ok(SavedContent {
            id,
            user_id: user_id.to_string(),
            course_id: course_id.to_string(),
            content: content.to_string(),
            title: title.to_string(),
            created_at: now,
        })
    }

    /// A user's saved content, newest first, with course titles
    pub fn list_saved_content(&self, user_id: &str) -> DbResult<Vec<SavedContentEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT s.id, s.user_id, s.course_id, s.content, s.title, s.created_at, c.title
             FROM saved_content s
             LEFT JOIN courses c ON c.id = s.course_id
             WHERE s.user_id = ?1
             ORDER BY s.created_at DESC, s.rowid DESC",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok(SavedContentEntry {
                saved: SavedContent {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    course_id: row.get(2)?,
                    content: row.get(3)?,
                    title: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                },
                course_title: row.get(6)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(DbError::from)
    }

    /// Get one saved item owned by `user_id`
    pub fn get_saved_content(&self, user_id: &str, id: &str) -> DbResult<Option<SavedContent>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, user_id, course_id, content, title, created_at
             FROM saved_content WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
            |row| {
                Ok(SavedContent {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    course_id: row.get(2)?,
                    content: row.get(3)?,
                    title: row.get(4)?,
                    created_at: parse_datetime(&row.get::<_, String>(5)?),
                })
            },
        )
        .optional()
        .map_err(DbError::from)
    }

    /// Delete one saved item owned by `user_id`
    pub fn delete_saved_content(&self, user_id: &str, id: &str) -> DbResult<()> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM saved_content WHERE id = ?1 AND user_id = ?2",
            params![id, user_id],
        )?;

        if deleted == 0 {
            return Err(DbError::SavedContentNotFound(id.to_string()));
        }
        Ok(())
    }
}

fn parse_course_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Course> {
    Ok(Course {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        created_by: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

fn parse_pair_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ConversationPair> {
    Ok(ConversationPair {
        id: row.get(0)?,
        user_id: row.get(1)?,
        course_id: row.get(2)?,
        message: row.get(3)?,
        response: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

/// Fixed-width timestamps so text ordering matches time ordering
fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc))
}
