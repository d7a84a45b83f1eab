use chrono::Utc;
use rusqlite::{params, OptionalExtension, Row};
use serde::Serialize;
use uuid::Uuid;

use crate::entity::Category;
use crate::error::Result;

use super::{parse_ts, parse_uuid, Store};

#[derive(Debug, Clone, Default)]
pub struct NewCategory {
    pub title: String,
    pub color: String,
}

#[derive(Default)]
pub struct CategoryUpdate {
    pub title: Option<String>,
    pub color: Option<String>,
}

/// Per-entity-type reference counts for one category
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct UsageBreakdown {
    pub notes: u32,
    pub sparks: u32,
    pub actions: u32,
    pub loops: u32,
    pub paths: u32,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CategoryUsage {
    pub is_used: bool,
    pub usage: UsageBreakdown,
    pub total_usage: u32,
}

/// Outcome of a best-effort cleanup batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanupReport {
    pub deleted: Vec<String>,
    pub skipped_in_use: Vec<String>,
    pub errors: Vec<String>,
}

const CATEGORY_COLUMNS: &str = "id, title, color, created_at, updated_at";

impl Store {
    pub fn create_category(&self, input: NewCategory) -> Result<Category> {
        let category = Category::new(input.title, input.color);

        self.conn().execute(
            "INSERT INTO categories (id, title, color, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                category.id.to_string(),
                category.title,
                category.color,
                category.created_at.to_rfc3339(),
                category.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(category)
    }

    pub fn get_category(&self, id: &Uuid) -> Result<Option<Category>> {
        let category = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM categories WHERE id = ?1", CATEGORY_COLUMNS),
                [id.to_string()],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {} FROM categories ORDER BY created_at DESC",
            CATEGORY_COLUMNS
        ))?;
        let categories = stmt
            .query_map([], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    pub fn update_category(&self, id: &Uuid, updates: CategoryUpdate) -> Result<bool> {
        let Some(mut category) = self.get_category(id)? else {
            return Ok(false);
        };

        if let Some(title) = updates.title {
            category.title = title;
        }
        if let Some(color) = updates.color {
            category.color = color;
        }
        category.updated_at = Utc::now();

        let changed = self.conn().execute(
            "UPDATE categories SET title = ?1, color = ?2, updated_at = ?3 WHERE id = ?4",
            params![
                category.title,
                category.color,
                category.updated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;

        Ok(changed > 0)
    }

    /// Refuses to delete a category that is still referenced
    pub fn delete_category(&self, id: &Uuid) -> Result<bool> {
        let usage = self.check_category_usage(id)?;
        if usage.is_used {
            tracing::debug!(category = %id, total = usage.total_usage, "refusing to delete category in use");
            return Ok(false);
        }

        let changed = self
            .conn()
            .execute("DELETE FROM categories WHERE id = ?1", [id.to_string()])?;
        Ok(changed > 0)
    }

    /// One count query per entity table, summed
    pub fn check_category_usage(&self, id: &Uuid) -> Result<CategoryUsage> {
        let usage = UsageBreakdown {
            notes: self.count_references("notes", id)?,
            sparks: self.count_references("sparks", id)?,
            actions: self.count_references("actions", id)?,
            loops: self.count_references("loops", id)?,
            paths: self.count_references("paths", id)?,
        };
        let total_usage = usage.notes + usage.sparks + usage.actions + usage.loops + usage.paths;

        Ok(CategoryUsage {
            is_used: total_usage > 0,
            usage,
            total_usage,
        })
    }

    /// Delete categories left behind by test data: titles starting with
    /// "test" or carrying a "[test]" marker. In-use categories are skipped;
    /// per-item failures go into the report without aborting the batch.
    pub fn cleanup_test_categories(&self) -> Result<CleanupReport> {
        let mut report = CleanupReport::default();

        let candidates: Vec<(Uuid, String)> = {
            let mut stmt = self.conn().prepare(
                "SELECT id, title FROM categories
                 WHERE LOWER(title) LIKE 'test%' OR LOWER(title) LIKE '%[test]%'",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .filter_map(|r| r.ok())
                .filter_map(|(id, title)| Uuid::parse_str(&id).ok().map(|id| (id, title)))
                .collect();
            rows
        };

        for (id, title) in candidates {
            match self.check_category_usage(&id) {
                Ok(usage) if usage.is_used => {
                    report.skipped_in_use.push(title);
                }
                Ok(_) => match self
                    .conn()
                    .execute("DELETE FROM categories WHERE id = ?1", [id.to_string()])
                {
                    Ok(_) => report.deleted.push(title),
                    Err(e) => {
                        tracing::warn!(category = %id, error = %e, "cleanup delete failed");
                        report.errors.push(format!("{}: {}", title, e));
                    }
                },
                Err(e) => {
                    tracing::warn!(category = %id, error = %e, "cleanup usage check failed");
                    report.errors.push(format!("{}: {}", title, e));
                }
            }
        }

        Ok(report)
    }

    fn count_references(&self, table: &str, category_id: &Uuid) -> Result<u32> {
        // Table names come from the fixed list above, never from input.
        let count: u32 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE category_id = ?1", table),
            [category_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

fn category_from_row(row: &Row) -> rusqlite::Result<Category> {
    Ok(Category {
        id: parse_uuid(row.get(0)?)?,
        title: row.get(1)?,
        color: row.get(2)?,
        created_at: parse_ts(row.get(3)?)?,
        updated_at: parse_ts(row.get(4)?)?,
    })
}
