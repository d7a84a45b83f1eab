use chrono::{NaiveDate, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use uuid::Uuid;

use crate::entity::{Action, EntityBase, ParentRef, Priority, SubTask};
use crate::error::Result;

use super::{
    as_flag, filter_sql, flag, parse_enum, parse_opt_date, parse_opt_uuid, parse_ts, parse_uuid,
    to_json, vec_from_json, ListFilter, Store,
};

#[derive(Debug, Clone, Default)]
pub struct NewAction {
    pub title: String,
    pub body: Option<String>,
    pub tags: Vec<String>,
    pub category_id: Option<Uuid>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub sub_tasks: Vec<SubTask>,
}

/// Partial update; `Some(None)` clears a clearable field.
///
/// Parent and ordering changes go through the linking operations, not here.
#[derive(Default)]
pub struct ActionUpdate {
    pub title: Option<String>,
    pub body: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub starred: Option<bool>,
    pub hidden: Option<bool>,
    pub done: Option<bool>,
    pub priority: Option<Priority>,
    pub due_date: Option<Option<NaiveDate>>,
    pub sub_tasks: Option<Vec<SubTask>>,
}

pub(crate) const ACTION_COLUMNS: &str = "id, title, body, tags, done, priority, due_date, \
     sub_tasks, parent_id, parent_type, action_order, category_id, starred, hidden, \
     created_at, updated_at";

impl Store {
    pub fn create_action(&self, input: NewAction) -> Result<Action> {
        let mut action = Action::new(input.title);
        action.body = input.body;
        action.base.tags = input.tags;
        action.base.category_id = input.category_id;
        action.priority = input.priority;
        action.due_date = input.due_date;
        action.sub_tasks = input.sub_tasks;

        let sub_tasks_json = to_json(&action.sub_tasks)?;

        // description, completed and sub_actions are legacy mirror columns;
        // body, done and sub_tasks are authoritative.
        self.conn().execute(
            "INSERT INTO actions (id, title, body, description, tags, done, completed, priority,
                                  due_date, sub_tasks, sub_actions, parent_id, parent_type,
                                  action_order, category_id, starred, hidden, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?3, ?4, ?5, ?5, ?6, ?7, ?8, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                action.base.id.to_string(),
                action.base.title,
                action.body,
                to_json(&action.base.tags)?,
                as_flag(action.done),
                action.priority.to_string(),
                action.due_date.map(|d| d.to_string()),
                sub_tasks_json,
                action.parent.map(|p| p.id().to_string()),
                action.parent.map(|p| p.kind()),
                action.order,
                action.base.category_id.map(|id| id.to_string()),
                as_flag(action.base.starred),
                as_flag(action.base.hidden),
                action.base.created_at.to_rfc3339(),
                action.base.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(action)
    }

    pub fn get_action(&self, id: &Uuid) -> Result<Option<Action>> {
        let action = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM actions WHERE id = ?1", ACTION_COLUMNS),
                [id.to_string()],
                action_from_row,
            )
            .optional()?;
        Ok(action)
    }

    pub fn list_actions(&self, filter: &ListFilter) -> Result<Vec<Action>> {
        let (clause, binds) = filter_sql(filter);
        let sql = format!(
            "SELECT {} FROM actions WHERE 1=1{} ORDER BY created_at DESC",
            ACTION_COLUMNS, clause
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let actions = stmt
            .query_map(params_from_iter(binds), action_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(actions)
    }

    pub fn update_action(&self, id: &Uuid, updates: ActionUpdate) -> Result<bool> {
        let Some(mut action) = self.get_action(id)? else {
            return Ok(false);
        };

        let sub_tasks_changed = updates.sub_tasks.is_some();

        if let Some(title) = updates.title {
            action.base.title = title;
        }
        if let Some(body) = updates.body {
            action.body = body;
        }
        if let Some(tags) = updates.tags {
            action.base.tags = tags;
        }
        if let Some(category_id) = updates.category_id {
            action.base.category_id = category_id;
        }
        if let Some(starred) = updates.starred {
            action.base.starred = starred;
        }
        if let Some(hidden) = updates.hidden {
            action.base.hidden = hidden;
        }
        if let Some(done) = updates.done {
            action.done = done;
        }
        if let Some(priority) = updates.priority {
            action.priority = priority;
        }
        if let Some(due_date) = updates.due_date {
            action.due_date = due_date;
        }
        if let Some(sub_tasks) = updates.sub_tasks {
            action.sub_tasks = sub_tasks;
        }

        // A regressed sub-task pulls the action back to not-done.
        if sub_tasks_changed && action.done && action.sub_tasks.iter().any(|t| !t.completed) {
            action.done = false;
        }

        self.persist_action(&mut action)
    }

    /// Toggle a single sub-task. Marking one incomplete while the action is
    /// done forces the action back to not-done.
    pub fn set_sub_task_completed(
        &self,
        action_id: &Uuid,
        sub_task_id: &str,
        completed: bool,
    ) -> Result<bool> {
        let Some(mut action) = self.get_action(action_id)? else {
            return Ok(false);
        };

        let Some(sub_task) = action.sub_tasks.iter_mut().find(|t| t.id == sub_task_id) else {
            return Ok(false);
        };
        sub_task.completed = completed;

        if !completed && action.done {
            action.done = false;
        }

        self.persist_action(&mut action)
    }

    pub fn delete_action(&self, id: &Uuid) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM actions WHERE id = ?1", [id.to_string()])?;
        Ok(changed > 0)
    }

    fn persist_action(&self, action: &mut Action) -> Result<bool> {
        action.base.updated_at = Utc::now();
        let sub_tasks_json = to_json(&action.sub_tasks)?;

        let changed = self.conn().execute(
            "UPDATE actions SET title = ?1, body = ?2, description = ?2, tags = ?3,
                    done = ?4, completed = ?4, priority = ?5, due_date = ?6,
                    sub_tasks = ?7, sub_actions = ?7, category_id = ?8,
                    starred = ?9, hidden = ?10, updated_at = ?11
             WHERE id = ?12",
            params![
                action.base.title,
                action.body,
                to_json(&action.base.tags)?,
                as_flag(action.done),
                action.priority.to_string(),
                action.due_date.map(|d| d.to_string()),
                sub_tasks_json,
                action.base.category_id.map(|id| id.to_string()),
                as_flag(action.base.starred),
                as_flag(action.base.hidden),
                action.base.updated_at.to_rfc3339(),
                action.base.id.to_string(),
            ],
        )?;

        Ok(changed > 0)
    }
}

pub(crate) fn action_from_row(row: &Row) -> rusqlite::Result<Action> {
    let parent_id = parse_opt_uuid(row.get(8)?);
    let parent_type: Option<String> = row.get(9)?;
    let parent = match (parent_type, parent_id) {
        (Some(kind), Some(id)) => ParentRef::from_parts(&kind, id),
        _ => None,
    };

    Ok(Action {
        base: EntityBase {
            id: parse_uuid(row.get(0)?)?,
            title: row.get(1)?,
            tags: vec_from_json(row.get(3)?)?,
            category_id: parse_opt_uuid(row.get(11)?),
            starred: flag(row.get(12)?),
            hidden: flag(row.get(13)?),
            created_at: parse_ts(row.get(14)?)?,
            updated_at: parse_ts(row.get(15)?)?,
        },
        body: row.get(2)?,
        done: flag(row.get(4)?),
        priority: parse_enum(row.get(5)?)?,
        due_date: parse_opt_date(row.get(6)?),
        sub_tasks: vec_from_json(row.get(7)?)?,
        parent,
        order: row.get(10)?,
    })
}
