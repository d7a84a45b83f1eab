use chrono::Utc;
use rusqlite::{params, params_from_iter, OptionalExtension, Row, Transaction};
use uuid::Uuid;

use crate::entity::{EntityBase, Frequency, Loop, LoopItem};
use crate::error::Result;

use super::{
    as_flag, filter_sql, flag, parse_enum, parse_opt_uuid, parse_ts, parse_uuid, to_json,
    vec_from_json, ListFilter, Store,
};

#[derive(Debug, Clone, Default)]
pub struct NewLoop {
    pub title: String,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub tags: Vec<String>,
    pub category_id: Option<Uuid>,
    pub items: Vec<NewLoopItem>,
}

#[derive(Debug, Clone, Default)]
pub struct NewLoopItem {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: Option<u32>,
    pub quantity: Option<u32>,
}

/// Partial update; a `Some(items)` payload replaces the owned item list
/// wholesale, orphaning actions that referenced removed items.
#[derive(Default)]
pub struct LoopUpdate {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub frequency: Option<Frequency>,
    pub tags: Option<Vec<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub starred: Option<bool>,
    pub hidden: Option<bool>,
    pub items: Option<Vec<NewLoopItem>>,
}

const LOOP_COLUMNS: &str = "id, title, description, frequency, tags, category_id, starred, \
     hidden, created_at, updated_at";

const LOOP_ITEM_COLUMNS: &str =
    "id, loop_id, name, description, duration_minutes, quantity, item_order, created_at, updated_at";

impl Store {
    pub fn create_loop(&self, input: NewLoop) -> Result<Loop> {
        let mut lp = Loop::new(input.title);
        lp.description = input.description;
        lp.frequency = input.frequency;
        lp.base.tags = input.tags;
        lp.base.category_id = input.category_id;

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "INSERT INTO loops (id, title, description, frequency, tags, category_id,
                                starred, hidden, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                lp.base.id.to_string(),
                lp.base.title,
                lp.description,
                lp.frequency.to_string(),
                to_json(&lp.base.tags)?,
                lp.base.category_id.map(|id| id.to_string()),
                as_flag(lp.base.starred),
                as_flag(lp.base.hidden),
                lp.base.created_at.to_rfc3339(),
                lp.base.updated_at.to_rfc3339(),
            ],
        )?;

        lp.items = insert_items(&tx, &lp.base.id, &input.items)?;
        tx.commit()?;

        Ok(lp)
    }

    /// Items come back loaded, ordered ascending
    pub fn get_loop(&self, id: &Uuid) -> Result<Option<Loop>> {
        let lp = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM loops WHERE id = ?1", LOOP_COLUMNS),
                [id.to_string()],
                loop_from_row,
            )
            .optional()?;

        match lp {
            Some(mut lp) => {
                lp.items = self.list_loop_items(id)?;
                Ok(Some(lp))
            }
            None => Ok(None),
        }
    }

    pub fn list_loops(&self, filter: &ListFilter) -> Result<Vec<Loop>> {
        let (clause, binds) = filter_sql(filter);
        let sql = format!(
            "SELECT {} FROM loops WHERE 1=1{} ORDER BY created_at DESC",
            LOOP_COLUMNS, clause
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let mut loops = stmt
            .query_map(params_from_iter(binds), loop_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        drop(stmt);

        for lp in &mut loops {
            lp.items = self.list_loop_items(&lp.base.id)?;
        }
        Ok(loops)
    }

    pub fn list_loop_items(&self, loop_id: &Uuid) -> Result<Vec<LoopItem>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM loop_items WHERE loop_id = ?1 ORDER BY item_order ASC",
            LOOP_ITEM_COLUMNS
        ))?;
        let items = stmt
            .query_map([loop_id.to_string()], loop_item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn update_loop(&self, id: &Uuid, updates: LoopUpdate) -> Result<bool> {
        let Some(mut lp) = self.get_loop(id)? else {
            return Ok(false);
        };

        if let Some(title) = updates.title {
            lp.base.title = title;
        }
        if let Some(description) = updates.description {
            lp.description = description;
        }
        if let Some(frequency) = updates.frequency {
            lp.frequency = frequency;
        }
        if let Some(tags) = updates.tags {
            lp.base.tags = tags;
        }
        if let Some(category_id) = updates.category_id {
            lp.base.category_id = category_id;
        }
        if let Some(starred) = updates.starred {
            lp.base.starred = starred;
        }
        if let Some(hidden) = updates.hidden {
            lp.base.hidden = hidden;
        }
        lp.base.updated_at = Utc::now();

        let tx = self.conn().unchecked_transaction()?;
        tx.execute(
            "UPDATE loops SET title = ?1, description = ?2, frequency = ?3, tags = ?4,
                    category_id = ?5, starred = ?6, hidden = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                lp.base.title,
                lp.description,
                lp.frequency.to_string(),
                to_json(&lp.base.tags)?,
                lp.base.category_id.map(|id| id.to_string()),
                as_flag(lp.base.starred),
                as_flag(lp.base.hidden),
                lp.base.updated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;

        if let Some(items) = updates.items {
            detach_item_actions(&tx, id)?;
            tx.execute(
                "DELETE FROM loop_items WHERE loop_id = ?1",
                [id.to_string()],
            )?;
            insert_items(&tx, id, &items)?;
        }
        tx.commit()?;

        Ok(true)
    }

    /// Remove the loop and its owned items; actions parented to those items
    /// are orphaned, not deleted.
    pub fn delete_loop(&self, id: &Uuid) -> Result<bool> {
        let tx = self.conn().unchecked_transaction()?;
        let loop_id = id.to_string();

        let exists: Option<String> = tx
            .query_row("SELECT id FROM loops WHERE id = ?1", [&loop_id], |row| {
                row.get(0)
            })
            .optional()?;
        if exists.is_none() {
            return Ok(false);
        }

        detach_item_actions(&tx, id)?;
        tx.execute("DELETE FROM loop_items WHERE loop_id = ?1", [&loop_id])?;
        tx.execute("DELETE FROM loops WHERE id = ?1", [&loop_id])?;
        tx.commit()?;
        Ok(true)
    }
}

fn insert_items(tx: &Transaction, loop_id: &Uuid, items: &[NewLoopItem]) -> Result<Vec<LoopItem>> {
    let mut out = Vec::with_capacity(items.len());
    for (index, input) in items.iter().enumerate() {
        let mut item = LoopItem::new(*loop_id, input.name.clone(), index as i64 + 1);
        item.description = input.description.clone();
        item.duration_minutes = input.duration_minutes;
        item.quantity = input.quantity;

        tx.execute(
            "INSERT INTO loop_items (id, loop_id, name, description, duration_minutes,
                                     quantity, item_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                item.id.to_string(),
                item.loop_id.to_string(),
                item.name,
                item.description,
                item.duration_minutes,
                item.quantity,
                item.order,
                item.created_at.to_rfc3339(),
                item.updated_at.to_rfc3339(),
            ],
        )?;
        out.push(item);
    }
    Ok(out)
}

fn detach_item_actions(tx: &Transaction, loop_id: &Uuid) -> Result<()> {
    tx.execute(
        "UPDATE actions SET parent_id = NULL, parent_type = NULL, action_order = 0,
                updated_at = ?2
         WHERE parent_type = 'loop-item'
           AND parent_id IN (SELECT id FROM loop_items WHERE loop_id = ?1)",
        params![loop_id.to_string(), Utc::now().to_rfc3339()],
    )?;
    Ok(())
}

fn loop_from_row(row: &Row) -> rusqlite::Result<Loop> {
    Ok(Loop {
        base: EntityBase {
            id: parse_uuid(row.get(0)?)?,
            title: row.get(1)?,
            tags: vec_from_json(row.get(4)?)?,
            category_id: parse_opt_uuid(row.get(5)?),
            starred: flag(row.get(6)?),
            hidden: flag(row.get(7)?),
            created_at: parse_ts(row.get(8)?)?,
            updated_at: parse_ts(row.get(9)?)?,
        },
        description: row.get(2)?,
        frequency: parse_enum(row.get(3)?)?,
        items: Vec::new(),
    })
}

fn loop_item_from_row(row: &Row) -> rusqlite::Result<LoopItem> {
    Ok(LoopItem {
        id: parse_uuid(row.get(0)?)?,
        loop_id: parse_uuid(row.get(1)?)?,
        name: row.get(2)?,
        description: row.get(3)?,
        duration_minutes: row.get(4)?,
        quantity: row.get(5)?,
        order: row.get(6)?,
        created_at: parse_ts(row.get(7)?)?,
        updated_at: parse_ts(row.get(8)?)?,
    })
}
