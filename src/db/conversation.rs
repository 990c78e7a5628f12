use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::{params, Connection};
use uuid::Uuid;

use super::DatabaseError;
use crate::models::enums::MessageRole;
use crate::models::{Message, Session};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

fn now() -> NaiveDateTime {
    chrono::Utc::now().naive_utc()
}

fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Create a session. A blank or missing title becomes "Untitled".
pub fn create_session(conn: &Connection, title: Option<&str>) -> Result<Session, DatabaseError> {
    let title = match title.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_string(),
        _ => "Untitled".to_string(),
    };
    let session = Session {
        id: Uuid::new_v4(),
        title,
        created_at: now(),
        updated_at: now(),
    };
    conn.execute(
        "INSERT INTO sessions (id, title, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            session.id.to_string(),
            session.title,
            format_ts(&session.created_at),
            format_ts(&session.updated_at),
        ],
    )?;
    Ok(session)
}

pub fn get_session(conn: &Connection, id: &Uuid) -> Result<Option<Session>, DatabaseError> {
    let result = conn.query_row(
        "SELECT id, title, created_at, updated_at FROM sessions WHERE id = ?1",
        params![id.to_string()],
        |row| {
            Ok(SessionRow {
                id: row.get(0)?,
                title: row.get(1)?,
                created_at: row.get(2)?,
                updated_at: row.get(3)?,
            })
        },
    );

    match result {
        Ok(row) => Ok(Some(session_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// List sessions, most recently updated first. `search` filters on title.
pub fn list_sessions(
    conn: &Connection,
    search: &str,
    limit: usize,
) -> Result<Vec<Session>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, title, created_at, updated_at FROM sessions
         WHERE title LIKE ?1 ORDER BY updated_at DESC, id LIMIT ?2",
    )?;
    let pattern = format!("%{search}%");
    let rows = stmt.query_map(params![pattern, limit as i64], |row| {
        Ok(SessionRow {
            id: row.get(0)?,
            title: row.get(1)?,
            created_at: row.get(2)?,
            updated_at: row.get(3)?,
        })
    })?;

    let mut sessions = Vec::new();
    for row in rows {
        sessions.push(session_from_row(row?)?);
    }
    Ok(sessions)
}

/// Rename a session; blank titles become "Untitled".
pub fn rename_session(
    conn: &Connection,
    id: &Uuid,
    new_title: &str,
) -> Result<(), DatabaseError> {
    let title = {
        let t = new_title.trim();
        if t.is_empty() { "Untitled" } else { t }
    };
    let changed = conn.execute(
        "UPDATE sessions SET title = ?1, updated_at = ?2 WHERE id = ?3",
        params![title, format_ts(&now()), id.to_string()],
    )?;
    if changed == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "session".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Delete a session; its messages cascade.
pub fn delete_session(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    conn.execute("DELETE FROM sessions WHERE id = ?1", params![id.to_string()])?;
    Ok(())
}

/// Append one message and touch the session's updated_at.
pub fn append_message(
    conn: &Connection,
    session_id: &Uuid,
    role: MessageRole,
    content: &str,
    meta: serde_json::Value,
) -> Result<Message, DatabaseError> {
    let message = Message {
        id: Uuid::new_v4(),
        session_id: *session_id,
        role,
        content: content.to_string(),
        meta,
        created_at: now(),
    };

    let touched = conn.execute(
        "UPDATE sessions SET updated_at = ?1 WHERE id = ?2",
        params![format_ts(&message.created_at), session_id.to_string()],
    )?;
    if touched == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "session".into(),
            id: session_id.to_string(),
        });
    }

    conn.execute(
        "INSERT INTO messages (id, session_id, role, content, meta_json, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            message.id.to_string(),
            message.session_id.to_string(),
            message.role.as_str(),
            message.content,
            message.meta.to_string(),
            format_ts(&message.created_at),
        ],
    )?;
    Ok(message)
}

/// Messages of a session in insertion order.
pub fn get_messages(
    conn: &Connection,
    session_id: &Uuid,
) -> Result<Vec<Message>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, session_id, role, content, meta_json, created_at
         FROM messages WHERE session_id = ?1 ORDER BY created_at ASC, id ASC",
    )?;

    let rows = stmt.query_map(params![session_id.to_string()], |row| {
        Ok(MessageRow {
            id: row.get(0)?,
            session_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            meta_json: row.get(4)?,
            created_at: row.get(5)?,
        })
    })?;

    let mut messages = Vec::new();
    for row in rows {
        messages.push(message_from_row(row?)?);
    }
    Ok(messages)
}

struct SessionRow {
    id: String,
    title: String,
    created_at: String,
    updated_at: String,
}

struct MessageRow {
    id: String,
    session_id: String,
    role: String,
    content: String,
    meta_json: String,
    created_at: String,
}

fn parse_ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT).unwrap_or_default()
}

fn session_from_row(row: SessionRow) -> Result<Session, DatabaseError> {
    Ok(Session {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        title: row.title,
        created_at: parse_ts(&row.created_at),
        updated_at: parse_ts(&row.updated_at),
    })
}

fn message_from_row(row: MessageRow) -> Result<Message, DatabaseError> {
    Ok(Message {
        id: Uuid::parse_str(&row.id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        session_id: Uuid::parse_str(&row.session_id)
            .map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))?,
        role: MessageRole::from_str(&row.role)?,
        content: row.content,
        meta: serde_json::from_str(&row.meta_json).unwrap_or(serde_json::Value::Null),
        created_at: parse_ts(&row.created_at),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::sqlite::open_memory_database;

    #[test]
    fn create_and_get_session() {
        let conn = open_memory_database().unwrap();
        let session = create_session(&conn, Some("UCAS-D case")).unwrap();

        let loaded = get_session(&conn, &session.id).unwrap().unwrap();
        assert_eq!(loaded.title, "UCAS-D case");
        assert_eq!(loaded.id, session.id);
    }

    #[test]
    fn blank_title_becomes_untitled() {
        let conn = open_memory_database().unwrap();
        let session = create_session(&conn, Some("   ")).unwrap();
        assert_eq!(session.title, "Untitled");

        let session = create_session(&conn, None).unwrap();
        assert_eq!(session.title, "Untitled");
    }

    #[test]
    fn append_preserves_order() {
        let conn = open_memory_database().unwrap();
        let session = create_session(&conn, Some("ordering")).unwrap();

        for i in 0..5 {
            append_message(
                &conn,
                &session.id,
                if i % 2 == 0 {
                    MessageRole::User
                } else {
                    MessageRole::Assistant
                },
                &format!("message {i}"),
                serde_json::json!({}),
            )
            .unwrap();
        }

        let messages = get_messages(&conn, &session.id).unwrap();
        assert_eq!(messages.len(), 5);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.content, format!("message {i}"));
        }
    }

    #[test]
    fn append_to_missing_session_fails() {
        let conn = open_memory_database().unwrap();
        let err = append_message(
            &conn,
            &Uuid::new_v4(),
            MessageRole::User,
            "orphan",
            serde_json::json!({}),
        )
        .unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn message_meta_round_trips() {
        let conn = open_memory_database().unwrap();
        let session = create_session(&conn, Some("meta")).unwrap();
        append_message(
            &conn,
            &session.id,
            MessageRole::Assistant,
            "case text",
            serde_json::json!({"stored_path": "results/2026-08-06/case_ab12cd.txt"}),
        )
        .unwrap();

        let messages = get_messages(&conn, &session.id).unwrap();
        assert_eq!(
            messages[0].meta["stored_path"],
            "results/2026-08-06/case_ab12cd.txt"
        );
    }

    #[test]
    fn delete_cascades_messages() {
        let conn = open_memory_database().unwrap();
        let session = create_session(&conn, Some("doomed")).unwrap();
        append_message(
            &conn,
            &session.id,
            MessageRole::User,
            "hello",
            serde_json::json!({}),
        )
        .unwrap();

        delete_session(&conn, &session.id).unwrap();

        assert!(get_session(&conn, &session.id).unwrap().is_none());
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }

    #[test]
    fn rename_updates_title() {
        let conn = open_memory_database().unwrap();
        let session = create_session(&conn, Some("old name")).unwrap();

        rename_session(&conn, &session.id, "new name").unwrap();
        let loaded = get_session(&conn, &session.id).unwrap().unwrap();
        assert_eq!(loaded.title, "new name");

        rename_session(&conn, &session.id, "  ").unwrap();
        let loaded = get_session(&conn, &session.id).unwrap().unwrap();
        assert_eq!(loaded.title, "Untitled");
    }

    #[test]
    fn rename_missing_session_fails() {
        let conn = open_memory_database().unwrap();
        let err = rename_session(&conn, &Uuid::new_v4(), "ghost").unwrap_err();
        assert!(matches!(err, DatabaseError::NotFound { .. }));
    }

    #[test]
    fn list_filters_by_search() {
        let conn = open_memory_database().unwrap();
        create_session(&conn, Some("carrier landing case")).unwrap();
        create_session(&conn, Some("budget review")).unwrap();

        let all = list_sessions(&conn, "", 50).unwrap();
        assert_eq!(all.len(), 2);

        let filtered = list_sessions(&conn, "carrier", 50).unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].title, "carrier landing case");
    }

    #[test]
    fn list_respects_limit() {
        let conn = open_memory_database().unwrap();
        for i in 0..5 {
            create_session(&conn, Some(&format!("session {i}"))).unwrap();
        }
        let limited = list_sessions(&conn, "", 3).unwrap();
        assert_eq!(limited.len(), 3);
    }
}
