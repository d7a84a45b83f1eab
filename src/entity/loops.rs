// src/entity/loops.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::EntityBase;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    #[default]
    Daily,
    Weekdays,
    Weekends,
    Weekly,
    Custom,
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Frequency::Daily => write!(f, "daily"),
            Frequency::Weekdays => write!(f, "weekdays"),
            Frequency::Weekends => write!(f, "weekends"),
            Frequency::Weekly => write!(f, "weekly"),
            Frequency::Custom => write!(f, "custom"),
        }
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekdays" => Ok(Frequency::Weekdays),
            "weekends" => Ok(Frequency::Weekends),
            "weekly" => Ok(Frequency::Weekly),
            "custom" => Ok(Frequency::Custom),
            _ => Err(format!("Invalid frequency: {}", s)),
        }
    }
}

/// A recurring routine with an ordered set of owned items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Loop {
    #[serde(flatten)]
    pub base: EntityBase,
    pub description: Option<String>,
    pub frequency: Frequency,
    pub items: Vec<LoopItem>,
}

impl Loop {
    pub fn new(title: String) -> Self {
        Self {
            base: EntityBase::new(title),
            description: None,
            frequency: Frequency::default(),
            items: Vec::new(),
        }
    }
}

/// Owned exclusively by its loop; deleting the loop deletes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopItem {
    pub id: Uuid,
    pub loop_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: Option<u32>,
    pub quantity: Option<u32>,
    pub order: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LoopItem {
    pub fn new(loop_id: Uuid, name: String, order: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            loop_id,
            name,
            description: None,
            duration_minutes: None,
            quantity: None,
            order,
            created_at: now,
            updated_at: now,
        }
    }
}
