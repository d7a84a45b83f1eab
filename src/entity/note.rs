// src/entity/note.rs
use serde::{Deserialize, Serialize};

use super::EntityBase;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    #[serde(flatten)]
    pub base: EntityBase,
    pub body: Option<String>,
}

impl Note {
    pub fn new(title: String) -> Self {
        Self {
            base: EntityBase::new(title),
            body: None,
        }
    }
}
