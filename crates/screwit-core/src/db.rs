//! SQLite persistence for sessions, messages and users.

use crate::store::{DocumentStore, SessionQuery, StoreChange};
use crate::{Result, ScrewitError};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use screwit_types::{Message, Session, SessionUpdate, User};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Capacity of the change feed.
pub const DEFAULT_CHANGE_BUFFER: usize = 256;

/// SQLite-backed document store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    changes_tx: broadcast::Sender<StoreChange>,
}

impl SqliteStore {
    /// Open or create the database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::with_connection(conn, DEFAULT_CHANGE_BUFFER)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?, DEFAULT_CHANGE_BUFFER)
    }

    /// Wrap an open connection, creating the schema if needed.
    pub fn with_connection(conn: Connection, change_buffer: usize) -> Result<Self> {
        let (changes_tx, _) = broadcast::channel(change_buffer.max(1));
        let store = Self {
            conn: Mutex::new(conn),
            changes_tx,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ScrewitError::Store("connection lock poisoned".to_string()))
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                user_id TEXT NOT NULL,
                last_message TEXT,
                last_activity TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                agent_options TEXT NOT NULL,
                message_count INTEGER NOT NULL DEFAULT 0,
                status TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_chat_sessions_user_status
                ON chat_sessions(user_id, status, last_activity);

            CREATE TABLE IF NOT EXISTS messages (
                id TEXT PRIMARY KEY,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                chat_session_id TEXT NOT NULL,
                timestamp TEXT NOT NULL,
                metadata TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_messages_session
                ON messages(chat_session_id, timestamp);

            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL,
                provider TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                profile_picture TEXT,
                organization TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_users_email ON users(email);
            "#,
        )?;
        Ok(())
    }

    /// Number of live receivers on the change feed.
    pub fn watcher_count(&self) -> usize {
        self.changes_tx.receiver_count()
    }

    fn notify(&self, change: StoreChange) {
        // No receivers is fine; nobody is watching yet.
        let _ = self.changes_tx.send(change);
    }

    fn row_to_session(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        let id: String = row.get("id")?;
        let agent_options: String = row.get("agent_options")?;
        let status: String = row.get("status")?;
        let message_count: i64 = row.get("message_count")?;

        Ok(Session {
            id: parse_uuid(0, &id)?,
            title: row.get("title")?,
            user_id: row.get("user_id")?,
            last_message: row.get("last_message")?,
            last_activity: parse_ts(4, &row.get::<_, String>("last_activity")?)?,
            created_at: parse_ts(5, &row.get::<_, String>("created_at")?)?,
            updated_at: parse_ts(6, &row.get::<_, String>("updated_at")?)?,
            agent_options: serde_json::from_str(&agent_options)
                .map_err(|e| conversion_error(7, e))?,
            message_count: message_count.max(0) as u32,
            status: status.parse().map_err(|e| conversion_error(9, e))?,
        })
    }

    fn row_to_message(row: &rusqlite::Row) -> rusqlite::Result<Message> {
        let id: String = row.get("id")?;
        let role: String = row.get("role")?;
        let chat_session_id: String = row.get("chat_session_id")?;
        let timestamp: String = row.get("timestamp")?;
        let metadata: Option<String> = row.get("metadata")?;

        Ok(Message {
            id: parse_uuid(0, &id)?,
            role: role.parse().map_err(|e| conversion_error(1, e))?,
            content: row.get("content")?,
            chat_session_id: parse_uuid(3, &chat_session_id)?,
            timestamp: parse_ts(4, &timestamp)?,
            metadata: metadata
                .map(|json| serde_json::from_str(&json))
                .transpose()
                .map_err(|e| conversion_error(5, e))?,
        })
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<User> {
        Ok(User {
            id: row.get("id")?,
            name: row.get("name")?,
            email: row.get("email")?,
            provider: row.get("provider")?,
            created_at: parse_ts(4, &row.get::<_, String>("created_at")?)?,
            updated_at: parse_ts(5, &row.get::<_, String>("updated_at")?)?,
            profile_picture: row.get("profile_picture")?,
            organization: row.get("organization")?,
        })
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn changes(&self) -> broadcast::Receiver<StoreChange> {
        self.changes_tx.subscribe()
    }

    async fn insert_session(&self, session: &Session) -> Result<()> {
        {
            let conn = self.conn()?;
            conn.execute(
                r#"
                INSERT INTO chat_sessions (
                    id, title, user_id, last_message, last_activity, created_at,
                    updated_at, agent_options, message_count, status
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                "#,
                params![
                    session.id.to_string(),
                    session.title,
                    session.user_id,
                    session.last_message,
                    format_ts(&session.last_activity),
                    format_ts(&session.created_at),
                    format_ts(&session.updated_at),
                    serde_json::to_string(&session.agent_options)?,
                    session.message_count as i64,
                    session.status.as_str(),
                ],
            )?;
        }
        self.notify(StoreChange::Session {
            id: session.id,
            user_id: session.user_id.clone(),
        });
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<Session>> {
        let conn = self.conn()?;
        let session = conn
            .query_row(
                "SELECT * FROM chat_sessions WHERE id = ?1",
                params![id.to_string()],
                Self::row_to_session,
            )
            .optional()?;
        Ok(session)
    }

    async fn query_sessions(&self, query: &SessionQuery) -> Result<Vec<Session>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM chat_sessions
            WHERE user_id = ?1 AND (?2 IS NULL OR status = ?2)
            ORDER BY last_activity DESC, rowid DESC
            LIMIT ?3
            "#,
        )?;
        let sessions = stmt
            .query_map(
                params![
                    query.user_id,
                    query.status.map(|s| s.as_str()),
                    query.limit as i64
                ],
                Self::row_to_session,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    async fn update_session(&self, id: Uuid, update: &SessionUpdate) -> Result<()> {
        let user_id = {
            let conn = self.conn()?;
            let agent_options = update
                .agent_options
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            let changed = conn.execute(
                r#"
                UPDATE chat_sessions SET
                    title = COALESCE(?1, title),
                    last_message = COALESCE(?2, last_message),
                    last_activity = COALESCE(?3, last_activity),
                    updated_at = COALESCE(?4, updated_at),
                    agent_options = COALESCE(?5, agent_options),
                    message_count = COALESCE(?6, message_count),
                    status = COALESCE(?7, status)
                WHERE id = ?8
                "#,
                params![
                    update.title,
                    update.last_message,
                    update.last_activity.as_ref().map(format_ts),
                    update.updated_at.as_ref().map(format_ts),
                    agent_options,
                    update.message_count.map(i64::from),
                    update.status.map(|s| s.as_str()),
                    id.to_string(),
                ],
            )?;
            if changed == 0 {
                return Err(ScrewitError::SessionNotFound(id));
            }
            conn.query_row(
                "SELECT user_id FROM chat_sessions WHERE id = ?1",
                params![id.to_string()],
                |row| row.get::<_, String>(0),
            )?
        };
        debug!(target: "screwit::store", "Updated session {}", id);
        self.notify(StoreChange::Session { id, user_id });
        Ok(())
    }

    async fn insert_message(&self, message: &Message) -> Result<()> {
        {
            let conn = self.conn()?;
            let metadata = message
                .metadata
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;
            conn.execute(
                r#"
                INSERT INTO messages (id, role, content, chat_session_id, timestamp, metadata)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                "#,
                params![
                    message.id.to_string(),
                    message.role.as_str(),
                    message.content,
                    message.chat_session_id.to_string(),
                    format_ts(&message.timestamp),
                    metadata,
                ],
            )?;
        }
        self.notify(StoreChange::Message {
            id: message.id,
            chat_session_id: message.chat_session_id,
        });
        Ok(())
    }

    async fn query_messages(
        &self,
        chat_session_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<Message>> {
        let conn = self.conn()?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map(|l| l as i64).unwrap_or(-1);
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM messages
            WHERE chat_session_id = ?1
            ORDER BY timestamp ASC, rowid ASC
            LIMIT ?2
            "#,
        )?;
        let messages = stmt
            .query_map(
                params![chat_session_id.to_string(), limit],
                Self::row_to_message,
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(messages)
    }

    async fn count_messages(&self, chat_session_id: Uuid) -> Result<u32> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE chat_session_id = ?1",
            params![chat_session_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u32)
    }

    async fn insert_user(&self, user: &User) -> Result<()> {
        {
            let conn = self.conn()?;
            conn.execute(
                r#"
                INSERT OR REPLACE INTO users (
                    id, name, email, provider, created_at, updated_at,
                    profile_picture, organization
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                "#,
                params![
                    user.id,
                    user.name,
                    user.email,
                    user.provider,
                    format_ts(&user.created_at),
                    format_ts(&user.updated_at),
                    user.profile_picture,
                    user.organization,
                ],
            )?;
        }
        self.notify(StoreChange::User {
            id: user.id.clone(),
        });
        Ok(())
    }

    async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT * FROM users WHERE id = ?1",
                params![id],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let conn = self.conn()?;
        let user = conn
            .query_row(
                "SELECT * FROM users WHERE email = ?1 ORDER BY rowid LIMIT 1",
                params![email],
                Self::row_to_user,
            )
            .optional()?;
        Ok(user)
    }
}

/// Fixed-width RFC 3339 so that text order matches time order.
fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(idx: usize, s: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| conversion_error(idx, e))
}

fn parse_uuid(idx: usize, s: &str) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| conversion_error(idx, e))
}

fn conversion_error<E>(idx: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(err))
}
