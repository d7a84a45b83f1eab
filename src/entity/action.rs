// src/entity/action.rs
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Normal => write!(f, "normal"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

/// A checklist item owned by an action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubTask {
    pub id: String,
    pub text: String,
    pub completed: bool,
}

/// Where an action hangs: standalone actions carry `None`.
///
/// The parent kind and id travel together so a kind without an id (or the
/// reverse) is unrepresentable in memory; rows where the two columns have
/// drifted apart normalize to standalone on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "kebab-case")]
pub enum ParentRef {
    Path(Uuid),
    Milestone(Uuid),
    LoopItem(Uuid),
}

impl ParentRef {
    pub fn kind(&self) -> &'static str {
        match self {
            ParentRef::Path(_) => "path",
            ParentRef::Milestone(_) => "milestone",
            ParentRef::LoopItem(_) => "loop-item",
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            ParentRef::Path(id) | ParentRef::Milestone(id) | ParentRef::LoopItem(id) => *id,
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "path" => Some(ParentRef::Path(id)),
            "milestone" => Some(ParentRef::Milestone(id)),
            "loop-item" => Some(ParentRef::LoopItem(id)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    #[serde(flatten)]
    pub base: EntityBase,
    pub body: Option<String>,
    pub done: bool,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
    pub sub_tasks: Vec<SubTask>,
    pub parent: Option<ParentRef>,
    pub order: i64,
}

impl Action {
    pub fn new(title: String) -> Self {
        Self {
            base: EntityBase::new(title),
            body: None,
            done: false,
            priority: Priority::default(),
            due_date: None,
            sub_tasks: Vec::new(),
            parent: None,
            order: 0,
        }
    }
}
