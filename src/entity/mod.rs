mod action;
mod category;
mod loops;
mod note;
mod path;
mod spark;

pub use action::{Action, ParentRef, Priority, SubTask};
pub use category::Category;
pub use loops::{Frequency, Loop, LoopItem};
pub use note::Note;
pub use path::{Milestone, Path};
pub use spark::Spark;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Base fields shared by all top-level entities
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityBase {
    pub id: Uuid,
    pub title: String,
    pub tags: Vec<String>,
    pub category_id: Option<Uuid>,
    pub starred: bool,
    pub hidden: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EntityBase {
    pub fn new(title: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            tags: Vec::new(),
            category_id: None,
            starred: false,
            hidden: false,
            created_at: now,
            updated_at: now,
        }
    }
}
