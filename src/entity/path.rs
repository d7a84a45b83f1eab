// src/entity/path.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

/// A goal track with an ordered set of owned milestones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Path {
    #[serde(flatten)]
    pub base: EntityBase,
    pub description: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub target_date: Option<NaiveDate>,
    pub milestones: Vec<Milestone>,
}

impl Path {
    pub fn new(title: String) -> Self {
        Self {
            base: EntityBase::new(title),
            description: None,
            start_date: None,
            target_date: None,
            milestones: Vec::new(),
        }
    }
}

/// Owned exclusively by its path; deleting the path deletes it.
/// Actions may reference a milestone as their parent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Milestone {
    pub id: Uuid,
    pub path_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub order: i64,
    pub collapsed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Milestone {
    pub fn new(path_id: Uuid, title: String, order: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            path_id,
            title,
            description: None,
            order,
            collapsed: false,
            created_at: now,
            updated_at: now,
        }
    }
}
