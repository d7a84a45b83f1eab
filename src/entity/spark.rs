// src/entity/spark.rs
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

/// A lightweight captured idea. Same lifecycle shape as a Note, plus
/// weak links to other entries it was spun off from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spark {
    #[serde(flatten)]
    pub base: EntityBase,
    pub body: Option<String>,
    pub linked_entry_ids: Vec<Uuid>,
}

impl Spark {
    pub fn new(title: String) -> Self {
        Self {
            base: EntityBase::new(title),
            body: None,
            linked_entry_ids: Vec::new(),
        }
    }
}
