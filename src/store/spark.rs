use chrono::Utc;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};
use uuid::Uuid;

use crate::entity::{EntityBase, Spark};
use crate::error::Result;

use super::{
    as_flag, filter_sql, flag, parse_opt_uuid, parse_ts, parse_uuid, to_json, vec_from_json,
    ListFilter, Store,
};

#[derive(Debug, Clone, Default)]
pub struct NewSpark {
    pub title: String,
    pub body: Option<String>,
    pub tags: Vec<String>,
    pub category_id: Option<Uuid>,
    pub linked_entry_ids: Vec<Uuid>,
}

#[derive(Default)]
pub struct SparkUpdate {
    pub title: Option<String>,
    pub body: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
    pub category_id: Option<Option<Uuid>>,
    pub starred: Option<bool>,
    pub hidden: Option<bool>,
    pub linked_entry_ids: Option<Vec<Uuid>>,
}

const SPARK_COLUMNS: &str =
    "id, title, body, tags, category_id, starred, hidden, linked_entry_ids, created_at, updated_at";

impl Store {
    pub fn create_spark(&self, input: NewSpark) -> Result<Spark> {
        let mut spark = Spark::new(input.title);
        spark.body = input.body;
        spark.base.tags = input.tags;
        spark.base.category_id = input.category_id;
        spark.linked_entry_ids = input.linked_entry_ids;

        self.conn().execute(
            "INSERT INTO sparks (id, title, body, tags, category_id, starred, hidden,
                                 linked_entry_ids, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                spark.base.id.to_string(),
                spark.base.title,
                spark.body,
                to_json(&spark.base.tags)?,
                spark.base.category_id.map(|id| id.to_string()),
                as_flag(spark.base.starred),
                as_flag(spark.base.hidden),
                to_json(&spark.linked_entry_ids)?,
                spark.base.created_at.to_rfc3339(),
                spark.base.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(spark)
    }

    pub fn get_spark(&self, id: &Uuid) -> Result<Option<Spark>> {
        let spark = self
            .conn()
            .query_row(
                &format!("SELECT {} FROM sparks WHERE id = ?1", SPARK_COLUMNS),
                [id.to_string()],
                spark_from_row,
            )
            .optional()?;
        Ok(spark)
    }

    pub fn list_sparks(&self, filter: &ListFilter) -> Result<Vec<Spark>> {
        let (clause, binds) = filter_sql(filter);
        let sql = format!(
            "SELECT {} FROM sparks WHERE 1=1{} ORDER BY created_at DESC",
            SPARK_COLUMNS, clause
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let sparks = stmt
            .query_map(params_from_iter(binds), spark_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(sparks)
    }

    pub fn update_spark(&self, id: &Uuid, updates: SparkUpdate) -> Result<bool> {
        let Some(mut spark) = self.get_spark(id)? else {
            return Ok(false);
        };

        if let Some(title) = updates.title {
            spark.base.title = title;
        }
        if let Some(body) = updates.body {
            spark.body = body;
        }
        if let Some(tags) = updates.tags {
            spark.base.tags = tags;
        }
        if let Some(category_id) = updates.category_id {
            spark.base.category_id = category_id;
        }
        if let Some(starred) = updates.starred {
            spark.base.starred = starred;
        }
        if let Some(hidden) = updates.hidden {
            spark.base.hidden = hidden;
        }
        if let Some(linked) = updates.linked_entry_ids {
            spark.linked_entry_ids = linked;
        }
        spark.base.updated_at = Utc::now();

        let changed = self.conn().execute(
            "UPDATE sparks SET title = ?1, body = ?2, tags = ?3, category_id = ?4,
                    starred = ?5, hidden = ?6, linked_entry_ids = ?7, updated_at = ?8
             WHERE id = ?9",
            params![
                spark.base.title,
                spark.body,
                to_json(&spark.base.tags)?,
                spark.base.category_id.map(|id| id.to_string()),
                as_flag(spark.base.starred),
                as_flag(spark.base.hidden),
                to_json(&spark.linked_entry_ids)?,
                spark.base.updated_at.to_rfc3339(),
                id.to_string(),
            ],
        )?;

        Ok(changed > 0)
    }

    pub fn delete_spark(&self, id: &Uuid) -> Result<bool> {
        let changed = self
            .conn()
            .execute("DELETE FROM sparks WHERE id = ?1", [id.to_string()])?;
        Ok(changed > 0)
    }
}

fn spark_from_row(row: &Row) -> rusqlite::Result<Spark> {
    Ok(Spark {
        base: EntityBase {
            id: parse_uuid(row.get(0)?)?,
            title: row.get(1)?,
            tags: vec_from_json(row.get(3)?)?,
            category_id: parse_opt_uuid(row.get(4)?),
            starred: flag(row.get(5)?),
            hidden: flag(row.get(6)?),
            created_at: parse_ts(row.get(8)?)?,
            updated_at: parse_ts(row.get(9)?)?,
        },
        body: row.get(2)?,
        linked_entry_ids: vec_from_json(row.get(7)?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spark_round_trip_with_links() {
        let store = Store::open_in_memory().unwrap();
        let note = store
            .create_note(crate::store::NewNote {
                title: "Origin".to_string(),
                ..Default::default()
            })
            .unwrap();

        let spark = store
            .create_spark(NewSpark {
                title: "Idea".to_string(),
                linked_entry_ids: vec![note.base.id],
                ..Default::default()
            })
            .unwrap();

        let fetched = store.get_spark(&spark.base.id).unwrap().unwrap();
        assert_eq!(fetched.linked_entry_ids, vec![note.base.id]);
    }

    #[test]
    fn test_list_orders_newest_first() {
        let store = Store::open_in_memory().unwrap();
        for title in ["first", "second", "third"] {
            store
                .create_spark(NewSpark {
                    title: title.to_string(),
                    ..Default::default()
                })
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(3));
        }

        let sparks = store.list_sparks(&ListFilter::default()).unwrap();
        let titles: Vec<_> = sparks.iter().map(|s| s.base.title.as_str()).collect();
        assert_eq!(titles, vec!["third", "second", "first"]);
    }
}
