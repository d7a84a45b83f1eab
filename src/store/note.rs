use chrono::Utc;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use uuid::Uuid;

use crate::entity::{EntityBase, Note};
use crate::error::Result;

use super::{
    as_flag, filter_sql, flag, parse_opt_uuid, parse_ts, parse_uuid, to_json, vec_from_json,
    ListFilter, Store,
};

#[derive(Debug, Clone, Default)]
pub struct NewNote {
    pub title: String,
    pub body: Option<String>,
    pub tags: Vec<String>,
    pub category_id: Option<Uuid>,
}

/// Partial update; `Some(None)` clears a clearable field
#[derive(Default)]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub body: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub starred: Option<bool>,
    pub hidden: Option<bool>,
}

const NOTE_COLUMNS: &str =
    "id, title, body, tags, category_id, starred, hidden, created_at, updated_at";

impl Store {
    pub fn create_note(&self, input: NewNote) -> Result<Note> {
        let mut note = Note::new(input.title);
        note.body = input.body;
        note.base.tags = input.tags;
        note.base.category_id = input.category_id;

        self.conn().execute(
            "INSERT INTO notes (id, title, body, tags, category_id, starred, hidden, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                note.base.id.to_string(),
                note.base.title,
                note.body,
                to_json(&note.base.tags)?,
                note.base.category_id.map(|id| id.to_string()),
                as_flag(note.base.starred),
                as_flag(note.base.hidden),
                note.base.created_at.to_rfc3339(),
                note.base.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(note)
    }

    pub fn get_note(&self, id: &Uuid) -> Result<Option<Note>> {
        let note = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM notes WHERE id = ?1", NOTE_COLUMNS),
                [id.to_string()],
                note_from_row,
            )
            .optional()?;
        Ok(note)
    }

    /// Newest first
    pub fn list_notes(&self, filter: &ListFilter) -> Result<Vec<Note>> {
        let (clause, binds) = filter_sql(filter);
        let sql = format!(
            "SELECT {} FROM notes WHERE 1=1{} ORDER BY created_at DESC",
            NOTE_COLUMNS, clause
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let notes = stmt
            .query_map(params_from_iter(binds), note_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(notes)
    }

    pub fn update_note(&self, id: &Uuid, updates: NoteUpdate) -> Result<bool> {
        let Some(mut note) = self.get_note(id)? else {
            return Ok(false);
        };

        if let Some(title) = updates.title {
            note.base.title = title;
        }
        if let Some(body) = updates.body {
            note.body = body;
        }
        if let Some(tags) = updates.tags {
            note.base.tags = tags;
        }
        if let Some(category_id) = updates.category_id {
            note.base.category_id = category_id;
        }
        if let Some(starred) = updates.starred {
            note.base.starred = starred;
        }
        if let Some(hidden) = updates.hidden {
            note.base.hidden = hidden;
        }
        note.base.updated_at = Utc::now();

        let changed = self.conn().execute(
            "UPDATE notes SET title = ?1, body = ?2, tags = ?3, category_id = ?4,
                    starred = ?5, hidden = ?6, updated_at = ?7
             WHERE id = ?8",
            params![
                note.base.title,
                note.body,
                to_json(&note.base.tags)?,
                note.base.category_id.map(|id| id.to_string()),
                as_flag(note.base.starred),
                as_flag(note.base.hidden),
                note.base.updated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;

        Ok(changed > 0)
    }

    pub fn delete_note(&self, id: &Uuid) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM notes WHERE id = ?1", [id.to_string()])?;
        Ok(changed > 0)
    }
}

fn note_from_row(row: &Row) -> rusqlite::Result<Note> {
    Ok(Note {
        base: EntityBase {
            id: parse_uuid(row.get(0)?)?,
            title: row.get(1)?,
            tags: vec_from_json(row.get(3)?)?,
            category_id: parse_opt_uuid(row.get(4)?),
            starred: flag(row.get(5)?),
            hidden: flag(row.get(6)?),
            created_at: parse_ts(row.get(7)?)?,
            updated_at: parse_ts(row.get(8)?)?,
        },
        body: row.get(2)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();

        let note = store
            .create_note(NewNote {
                title: "Groceries".to_string(),
                body: Some("milk, eggs".to_string()),
                tags: vec!["home".to_string()],
                ..Default::default()
            })
            .unwrap();

        let fetched = store.get_note(&note.base.id).unwrap().unwrap();
        assert_eq!(fetched.base.title, "Groceries");
        assert_eq!(fetched.body.as_deref(), Some("milk, eggs"));
        assert_eq!(fetched.base.tags, vec!["home".to_string()]);
        assert!(!fetched.base.starred);
        assert_eq!(fetched.base.created_at, fetched.base.updated_at);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.get_note(&Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_update_bumps_updated_at() {
        let store = Store::open_in_memory().unwrap();
        let note = store
            .create_note(NewNote {
                title: "Draft".to_string(),
                ..Default::default()
            })
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        let ok = store
            .update_note(
                &note.base.id,
                NoteUpdate {
                    body: Some(Some("autosaved".to_string())),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(ok);

        let fetched = store.get_note(&note.base.id).unwrap().unwrap();
        assert_eq!(fetched.body.as_deref(), Some("autosaved"));
        assert!(fetched.base.updated_at > note.base.updated_at);
    }

    #[test]
    fn test_update_missing_returns_false() {
        let store = Store::open_in_memory().unwrap();
        let ok = store
            .update_note(&Uuid::new_v4(), NoteUpdate::default())
            .unwrap();
        assert!(!ok);
    }

    #[test]
    fn test_hidden_notes_excluded_by_default() {
        let store = Store::open_in_memory().unwrap();
        let note = store
            .create_note(NewNote {
                title: "Private".to_string(),
                ..Default::default()
            })
            .unwrap();
        store
            .update_note(
                &note.base.id,
                NoteUpdate {
                    hidden: Some(true),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(store.list_notes(&ListFilter::default()).unwrap().is_empty());
        let all = store
            .list_notes(&ListFilter {
                include_hidden: true,
                ..Default::default()
            })
            .unwrap();
        assert_eq!(all.len(), 1);
    }

    #[test]
    fn test_null_tags_read_as_empty() {
        let store = Store::open_in_memory().unwrap();
        store
            .conn()
            .execute(
                "INSERT INTO notes (id, title, created_at, updated_at)
                 VALUES (?1, 'legacy', ?2, ?2)",
                params![
                    Uuid::new_v4().to_string(),
                    chrono::Utc::now().to_rfc3339()
                ],
            )
            .unwrap();

        let notes = store.list_notes(&ListFilter::default()).unwrap();
        assert_eq!(notes.len(), 1);
        assert!(notes[0].base.tags.is_empty());
    }

    #[test]
    fn test_corrupt_tags_column_is_an_error() {
        let store = Store::open_in_memory().unwrap();
        let id = Uuid::new_v4();
        store
            .conn()
            .execute(
                "INSERT INTO notes (id, title, tags, created_at, updated_at)
                 VALUES (?1, 'mangled', 'not json', ?2, ?2)",
                params![id.to_string(), chrono::Utc::now().to_rfc3339()],
            )
            .unwrap();

        let err = store.get_note(&id).unwrap_err();
        assert!(matches!(err, crate::TrellisError::Storage(_)));
    }
}
