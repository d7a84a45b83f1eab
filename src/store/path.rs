use chrono::{NaiveDate, Utc};
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use uuid::Uuid;

use crate::entity::{EntityBase, Milestone, Path};
use crate::error::{Result, TrellisError};

use super::{
    as_flag, filter_sql, flag, parse_opt_date, parse_opt_uuid, parse_ts, parse_uuid, to_json,
    vec_from_json, ListFilter, Store,
};

#[derive(Debug, Clone, Default)]
pub struct NewPath {
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub tags: Vec<String>,
    pub category_id: Option<Uuid>,
}

#[derive(Default)]
pub struct PathUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub target_date: Option<Option<NaiveDate>>,
    pub tags: Option<Vec<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub starred: Option<bool>,
    pub hidden: Option<bool>,
}

#[derive(Debug, Clone, Default)]
pub struct NewMilestone {
    pub title: String,
    pub description: Option<String>,
}

#[derive(Default)]
pub struct MilestoneUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub collapsed: Option<bool>,
}

const PATH_COLUMNS: &str = "id, title, description, start_date, target_date, tags, category_id, \
     starred, hidden, created_at, updated_at";

const MILESTONE_COLUMNS: &str =
    "id, path_id, title, description, milestone_order, collapsed, created_at, updated_at";

impl Store {
    pub fn create_path(&self, input: NewPath) -> Result<Path> {
        let mut path = Path::new(input.title);
        path.description = input.description;
        path.start_date = input.start_date;
        path.target_date = input.target_date;
        path.base.tags = input.tags;
        path.base.category_id = input.category_id;

        self.conn().execute(
            "INSERT INTO paths (id, title, description, start_date, target_date, tags,
                                category_id, starred, hidden, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                path.base.id.to_string(),
                path.base.title,
                path.description,
                path.start_date.map(|d| d.to_string()),
                path.target_date.map(|d| d.to_string()),
                to_json(&path.base.tags)?,
                path.base.category_id.map(|id| id.to_string()),
                as_flag(path.base.starred),
                as_flag(path.base.hidden),
                path.base.created_at.to_rfc3339(),
                path.base.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(path)
    }

    /// Milestones come back loaded, ordered ascending
    pub fn get_path(&self, id: &Uuid) -> Result<Option<Path>> {
        let path = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM paths WHERE id = ?1", PATH_COLUMNS),
                [id.to_string()],
                path_from_row,
            )
            .optional()?;

        match path {
            Some(mut path) => {
                path.milestones = self.list_milestones(id)?;
                Ok(Some(path))
            }
            None => Ok(None),
        }
    }

    pub fn list_paths(&self, filter: &ListFilter) -> Result<Vec<Path>> {
        let (clause, binds) = filter_sql(filter);
        let sql = format!(
            "SELECT {} FROM paths WHERE 1=1{} ORDER BY created_at DESC",
            PATH_COLUMNS, clause
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let mut paths = stmt
            .query_map(params_from_iter(binds), path_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        for path in &mut paths {
            path.milestones = self.list_milestones(&path.base.id)?;
        }
        Ok(paths)
    }

    pub fn update_path(&self, id: &Uuid, updates: PathUpdate) -> Result<bool> {
        let Some(mut path) = self.get_path(id)? else {
            return Ok(false);
        };

        if let Some(title) = updates.title {
            path.base.title = title;
        }
        if let Some(description) = updates.description {
            path.description = description;
        }
        if let Some(start_date) = updates.start_date {
            path.start_date = start_date;
        }
        if let Some(target_date) = updates.target_date {
            path.target_date = target_date;
        }
        if let Some(tags) = updates.tags {
            path.base.tags = tags;
        }
        if let Some(category_id) = updates.category_id {
            path.base.category_id = category_id;
        }
        if let Some(starred) = updates.starred {
            path.base.starred = starred;
        }
        if let Some(hidden) = updates.hidden {
            path.base.hidden = hidden;
        }
        path.base.updated_at = Utc::now();

        let changed = self.conn().execute(
            "UPDATE paths SET title = ?1, description = ?2, start_date = ?3, target_date = ?4,
                    tags = ?5, category_id = ?6, starred = ?7, hidden = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                path.base.title,
                path.description,
                path.start_date.map(|d| d.to_string()),
                path.target_date.map(|d| d.to_string()),
                to_json(&path.base.tags)?,
                path.base.category_id.map(|id| id.to_string()),
                as_flag(path.base.starred),
                as_flag(path.base.hidden),
                path.base.updated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;

        Ok(changed > 0)
    }

    /// Remove the path, its milestones, and detach child actions.
    ///
    /// Actions parented directly to the path are orphaned; actions parented
    /// to one of its milestones are rewritten to point at the path, matching
    /// the milestone cascade. One transaction end to end.
    pub fn delete_path(&self, id: &Uuid) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        let path_id = id.to_string();
        let now = Utc::now().to_rfc3339();

        let exists: Option<String> = tx
            .query_row("SELECT id FROM paths WHERE id = ?1", [&path_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Ok(false);
        }

        let orphaned = tx.execute(
            "UPDATE actions SET parent_id = NULL, parent_type = NULL, action_order = 0,
                    updated_at = ?2
             WHERE parent_type = 'path' AND parent_id = ?1",
            params![path_id, now],
        )?;
        let reparented = tx.execute(
            "UPDATE actions SET parent_type = 'path', parent_id = ?1, updated_at = ?2
             WHERE parent_type = 'milestone'
               AND parent_id IN (SELECT id FROM milestones WHERE path_id = ?1)",
            params![path_id, now],
        )?;
        tx.execute("DELETE FROM milestones WHERE path_id = ?1", [&path_id])?;
        tx.execute("DELETE FROM paths WHERE id = ?1", [&path_id])?;
        tx.commit()?;

        tracing::debug!(
            path = %path_id,
            orphaned,
            reparented,
            "deleted path and cascaded to milestones"
        );
        Ok(true)
    }

    /// Appended at the end of the path's milestone sequence
    pub fn add_milestone(&self, path_id: &Uuid, input: NewMilestone) -> Result<Milestone> {
        let exists: Option<String> = self
            .conn()
            .query_row(
                "SELECT id FROM paths WHERE id = ?1",
                [path_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Err(TrellisError::EntityNotFound(path_id.to_string()));
        }

        let next_order: i64 = self.conn().query_row(
            "SELECT COALESCE(MAX(milestone_order), 0) + 1 FROM milestones WHERE path_id = ?1",
            [path_id.to_string()],
            |row| row.get(0),
        )?;

        let mut milestone = Milestone::new(*path_id, input.title, next_order);
        milestone.description = input.description;

        self.conn().execute(
            "INSERT INTO milestones (id, path_id, title, description, milestone_order,
                                     collapsed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                milestone.id.to_string(),
                milestone.path_id.to_string(),
                milestone.title,
                milestone.description,
                milestone.order,
                as_flag(milestone.collapsed),
                milestone.created_at.to_rfc3339(),
                milestone.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(milestone)
    }

    pub fn get_milestone(&self, id: &Uuid) -> Result<Option<Milestone>> {
        let milestone = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM milestones WHERE id = ?1", MILESTONE_COLUMNS),
                [id.to_string()],
                milestone_from_row,
            )
            .optional()?;
        Ok(milestone)
    }

    pub fn list_milestones(&self, path_id: &Uuid) -> Result<Vec<Milestone>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM milestones WHERE path_id = ?1 ORDER BY milestone_order ASC",
            MILESTONE_COLUMNS
        ))?;
        let milestones = stmt
            .query_map([path_id.to_string()], milestone_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(milestones)
    }

    pub fn update_milestone(&self, id: &Uuid, updates: MilestoneUpdate) -> Result<bool> {
        let Some(mut milestone) = self.get_milestone(id)? else {
            return Ok(false);
        };

        if let Some(title) = updates.title {
            milestone.title = title;
        }
        if let Some(description) = updates.description {
            milestone.description = description;
        }
        if let Some(collapsed) = updates.collapsed {
            milestone.collapsed = collapsed;
        }
        milestone.updated_at = Utc::now();

        let changed = self.conn().execute(
            "UPDATE milestones SET title = ?1, description = ?2, collapsed = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                milestone.title,
                milestone.description,
                as_flag(milestone.collapsed),
                milestone.updated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;

        Ok(changed > 0)
    }

    /// Remove the milestone; its child actions move up to the owning path.
    pub fn delete_milestone(&self, id: &Uuid) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        let milestone_id = id.to_string();

        let path_id: Option<String> = tx
            .query_row(
                "SELECT path_id FROM milestones WHERE id = ?1",
                [&milestone_id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(path_id) = path_id else {
            return Ok(false);
        };

        let reparented = tx.execute(
            "UPDATE actions SET parent_type = 'path', parent_id = ?2, updated_at = ?3
             WHERE parent_type = 'milestone' AND parent_id = ?1",
            params![milestone_id, path_id, Utc::now().to_rfc3339()],
        )?;
        tx.execute("DELETE FROM milestones WHERE id = ?1", [&milestone_id])?;
        tx.commit()?;

        tracing::debug!(
            milestone = %milestone_id,
            path = %path_id,
            reparented,
            "deleted milestone, actions moved to path"
        );
        Ok(true)
    }

    /// Bulk order rewrite, applied in one transaction
    pub fn reorder_milestones(&self, path_id: &Uuid, orders: &[(Uuid, i64)]) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        let now = Utc::now().to_rfc3339();

        let exists: Option<String> = tx
            .query_row(
                "SELECT id FROM paths WHERE id = ?1",
                [path_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_none() {
            return Ok(false);
        }

        for (milestone_id, order) in orders {
            tx.execute(
                "UPDATE milestones SET milestone_order = ?1, updated_at = ?2
                 WHERE id = ?3 AND path_id = ?4",
                params![
                    order,
                    now,
                    milestone_id.to_string(),
                    path_id.to_string()
                ],
            )?;
        }
        tx.commit()?;
        Ok(true)
    }
}

fn path_from_row(row: &Row) -> rusqlite::Result<Path> {
    Ok(Path {
        base: EntityBase {
            id: parse_uuid(row.get(0)?)?,
            title: row.get(1)?,
            tags: vec_from_json(row.get(5)?)?,
            category_id: parse_opt_uuid(row.get(6)?),
            starred: flag(row.get(7)?),
            hidden: flag(row.get(8)?),
            created_at: parse_ts(row.get(9)?)?,
            updated_at: parse_ts(row.get(10)?)?,
        },
        description: row.get(2)?,
        start_date: parse_opt_date(row.get(3)?),
        target_date: parse_opt_date(row.get(4)?),
        milestones: Vec::new(),
    })
}

fn milestone_from_row(row: &Row) -> rusqlite::Result<Milestone> {
    Ok(Milestone {
        id: parse_uuid(row.get(0)?)?,
        path_id: parse_uuid(row.get(1)?)?,
        title: row.get(2)?,
        description: row.get(3)?,
        order: row.get(4)?,
        collapsed: flag(row.get(5)?),
        created_at: parse_ts(row.get(6)?)?,
        updated_at: parse_ts(row.get(7)?)?,
    })
}
