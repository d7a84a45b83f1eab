use std::env;
use std::path::PathBuf;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::entity::SubTask;
use crate::error::{Result, TrellisError};
use crate::store::{
    ActionUpdate, CategoryUpdate, ListFilter, LoopUpdate, MilestoneUpdate, NewAction, NewCategory,
    NewLoop, NewLoopItem, NewMilestone, NewNote, NewPath, NewSpark, NoteUpdate, PathUpdate,
    SparkUpdate, Store,
};

use super::commands::UpdateCommand;

/// Find the data root by looking for .trellis/ or .git/
fn find_data_root() -> PathBuf {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));

    let mut current = cwd.as_path();
    loop {
        if current.join(".trellis").exists() || current.join(".git").exists() {
            return current.to_path_buf();
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return cwd,
        }
    }
}

fn open_store() -> Result<Store> {
    Store::open(&find_data_root())
}

fn parse_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id).map_err(|_| TrellisError::InvalidInput(format!("not a UUID: {}", id)))
}

fn parse_date(date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| TrellisError::InvalidInput(format!("not a date (YYYY-MM-DD): {}", date)))
}

fn parse_opt_id(id: Option<String>) -> Result<Option<Uuid>> {
    id.map(|id| parse_id(&id)).transpose()
}

/// Absent → leave alone, "none" → clear, anything else → set
fn parse_clearable_id(value: Option<&str>) -> Result<Option<Option<Uuid>>> {
    match value {
        None => Ok(None),
        Some("none") => Ok(Some(None)),
        Some(id) => Ok(Some(Some(parse_id(id)?))),
    }
}

fn parse_clearable_date(value: Option<&str>) -> Result<Option<Option<NaiveDate>>> {
    match value {
        None => Ok(None),
        Some("none") => Ok(Some(None)),
        Some(date) => Ok(Some(Some(parse_date(date)?))),
    }
}

fn build_sub_tasks(texts: Vec<String>) -> Vec<SubTask> {
    texts
        .into_iter()
        .map(|text| SubTask {
            id: Uuid::new_v4().to_string(),
            text,
            completed: false,
        })
        .collect()
}

fn short(id: &Uuid) -> String {
    id.to_string()[..8].to_string()
}

pub fn handle_init() -> Result<()> {
    let root = env::current_dir()?;
    let _store = Store::init(&root)?;
    println!("Initialized trellis data directory in {}", root.display());
    Ok(())
}

pub fn handle_add_note(
    title: String,
    body: Option<String>,
    tags: Vec<String>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let note = store.create_note(NewNote {
        title,
        body,
        tags,
        category_id: parse_opt_id(category)?,
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&note)?);
    } else {
        println!("Created note ({}) - {}", short(&note.base.id), note.base.title);
    }
    Ok(())
}

pub fn handle_add_spark(
    title: String,
    body: Option<String>,
    tags: Vec<String>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let spark = store.create_spark(NewSpark {
        title,
        body,
        tags,
        category_id: parse_opt_id(category)?,
        linked_entry_ids: Vec::new(),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&spark)?);
    } else {
        println!(
            "Created spark ({}) - {}",
            short(&spark.base.id),
            spark.base.title
        );
    }
    Ok(())
}

pub fn handle_add_action(
    title: String,
    body: Option<String>,
    priority: String,
    due: Option<String>,
    sub_tasks: Vec<String>,
    tags: Vec<String>,
    category: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let action = store.create_action(NewAction {
        title,
        body,
        tags,
        category_id: parse_opt_id(category)?,
        priority: priority.parse().map_err(TrellisError::InvalidInput)?,
        due_date: due.as_deref().map(parse_date).transpose()?,
        sub_tasks: build_sub_tasks(sub_tasks),
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&action)?);
    } else {
        println!(
            "Created action ({}) - {}",
            short(&action.base.id),
            action.base.title
        );
    }
    Ok(())
}

pub fn handle_add_path(
    title: String,
    description: Option<String>,
    start: Option<String>,
    target: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let path = store.create_path(NewPath {
        title,
        description,
        start_date: start.as_deref().map(parse_date).transpose()?,
        target_date: target.as_deref().map(parse_date).transpose()?,
        ..Default::default()
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&path)?);
    } else {
        println!("Created path ({}) - {}", short(&path.base.id), path.base.title);
    }
    Ok(())
}

pub fn handle_add_loop(
    title: String,
    frequency: String,
    items: Vec<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;

    // Items arrive as "name" or "name:minutes".
    let items = items
        .into_iter()
        .map(|spec| match spec.split_once(':') {
            Some((name, minutes)) => {
                let duration = minutes.parse().map_err(|_| {
                    TrellisError::InvalidInput(format!("bad item duration: {}", spec))
                })?;
                Ok(NewLoopItem {
                    name: name.to_string(),
                    duration_minutes: Some(duration),
                    ..Default::default()
                })
            }
            None => Ok(NewLoopItem {
                name: spec,
                ..Default::default()
            }),
        })
        .collect::<Result<Vec<_>>>()?;

    let lp = store.create_loop(NewLoop {
        title,
        frequency: frequency.parse().map_err(TrellisError::InvalidInput)?,
        items,
        ..Default::default()
    })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&lp)?);
    } else {
        println!(
            "Created loop ({}) - {} [{} items]",
            short(&lp.base.id),
            lp.base.title,
            lp.items.len()
        );
    }
    Ok(())
}

pub fn handle_add_category(title: String, color: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let category = store.create_category(NewCategory { title, color })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&category)?);
    } else {
        println!(
            "Created category ({}) - {}",
            short(&category.id),
            category.title
        );
    }
    Ok(())
}

pub fn handle_list(entity_type: String, hidden: bool, starred: bool, json: bool) -> Result<()> {
    let store = open_store()?;
    let filter = ListFilter {
        include_hidden: hidden,
        starred_only: starred,
        category_id: None,
    };

    match entity_type.as_str() {
        "note" | "notes" => {
            let notes = store.list_notes(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&notes)?);
            } else {
                for n in notes {
                    println!("{}  {}", short(&n.base.id), n.base.title);
                }
            }
        }
        "spark" | "sparks" => {
            let sparks = store.list_sparks(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&sparks)?);
            } else {
                for s in sparks {
                    println!("{}  {}", short(&s.base.id), s.base.title);
                }
            }
        }
        "action" | "actions" => {
            let actions = store.list_actions(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&actions)?);
            } else {
                for a in actions {
                    let mark = if a.done { "x" } else { " " };
                    println!("[{}] {}  {}", mark, short(&a.base.id), a.base.title);
                }
            }
        }
        "path" | "paths" => {
            let paths = store.list_paths(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&paths)?);
            } else {
                for p in paths {
                    println!(
                        "{}  {} [{} milestones]",
                        short(&p.base.id),
                        p.base.title,
                        p.milestones.len()
                    );
                }
            }
        }
        "loop" | "loops" => {
            let loops = store.list_loops(&filter)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&loops)?);
            } else {
                for l in loops {
                    println!(
                        "{}  {} ({})",
                        short(&l.base.id),
                        l.base.title,
                        l.frequency
                    );
                }
            }
        }
        "category" | "categories" => {
            let categories = store.list_categories()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
            } else {
                for c in categories {
                    println!("{}  {} {}", short(&c.id), c.title, c.color);
                }
            }
        }
        other => {
            return Err(TrellisError::InvalidInput(format!(
                "unknown entity type: {}",
                other
            )))
        }
    }
    Ok(())
}

fn fetch_value(
    store: &Store,
    entity_type: &str,
    uuid: &Uuid,
) -> Result<Option<serde_json::Value>> {
    let value = match entity_type {
        "note" => store.get_note(uuid)?.map(|n| serde_json::to_value(&n)),
        "spark" => store.get_spark(uuid)?.map(|s| serde_json::to_value(&s)),
        "action" => store.get_action(uuid)?.map(|a| serde_json::to_value(&a)),
        "path" => store.get_path(uuid)?.map(|p| serde_json::to_value(&p)),
        "milestone" => store.get_milestone(uuid)?.map(|m| serde_json::to_value(&m)),
        "loop" => store.get_loop(uuid)?.map(|l| serde_json::to_value(&l)),
        "category" => store.get_category(uuid)?.map(|c| serde_json::to_value(&c)),
        other => {
            return Err(TrellisError::InvalidInput(format!(
                "unknown entity type: {}",
                other
            )))
        }
    };
    Ok(value.transpose()?)
}

pub fn handle_get(entity_type: String, id: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let uuid = parse_id(&id)?;

    let Some(value) = fetch_value(&store, &entity_type, &uuid)? else {
        return Err(TrellisError::EntityNotFound(id));
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let title = value
            .get("title")
            .and_then(|t| t.as_str())
            .unwrap_or("(untitled)");
        println!("{} {}: {}", entity_type, short(&uuid), title);
    }
    Ok(())
}

pub fn handle_update(cmd: UpdateCommand) -> Result<()> {
    let store = open_store()?;
    let uuid = parse_id(&cmd.id)?;

    let tags = (!cmd.tags.is_empty()).then_some(cmd.tags);
    let category_id = parse_clearable_id(cmd.category.as_deref())?;

    let updated = match cmd.entity_type.as_str() {
        "note" => store.update_note(
            &uuid,
            NoteUpdate {
                title: cmd.title,
                body: cmd.body.map(Some),
                tags,
                category_id,
                starred: cmd.starred,
                hidden: cmd.hidden,
            },
        )?,
        "spark" => store.update_spark(
            &uuid,
            SparkUpdate {
                title: cmd.title,
                body: cmd.body.map(Some),
                tags,
                category_id,
                starred: cmd.starred,
                hidden: cmd.hidden,
                linked_entry_ids: None,
            },
        )?,
        "action" => {
            let sub_tasks = (!cmd.sub_tasks.is_empty()).then(|| build_sub_tasks(cmd.sub_tasks));
            let priority = cmd
                .priority
                .map(|p| p.parse().map_err(TrellisError::InvalidInput))
                .transpose()?;

            let updated = store.update_action(
                &uuid,
                ActionUpdate {
                    title: cmd.title,
                    body: cmd.body.map(Some),
                    tags,
                    category_id,
                    starred: cmd.starred,
                    hidden: cmd.hidden,
                    done: cmd.done,
                    priority,
                    due_date: parse_clearable_date(cmd.due.as_deref())?,
                    sub_tasks,
                },
            )?;
            if updated {
                for (sub_id, completed) in cmd
                    .check
                    .iter()
                    .map(|id| (id, true))
                    .chain(cmd.uncheck.iter().map(|id| (id, false)))
                {
                    if !store.set_sub_task_completed(&uuid, sub_id, completed)? {
                        return Err(TrellisError::EntityNotFound(sub_id.clone()));
                    }
                }
            }
            updated
        }
        "path" => store.update_path(
            &uuid,
            PathUpdate {
                title: cmd.title,
                description: cmd.description.map(Some),
                start_date: parse_clearable_date(cmd.start.as_deref())?,
                target_date: parse_clearable_date(cmd.target.as_deref())?,
                tags,
                category_id,
                starred: cmd.starred,
                hidden: cmd.hidden,
            },
        )?,
        "milestone" => store.update_milestone(
            &uuid,
            MilestoneUpdate {
                title: cmd.title,
                description: cmd.description.map(Some),
                collapsed: cmd.collapsed,
            },
        )?,
        "loop" => {
            let frequency = cmd
                .frequency
                .map(|f| f.parse().map_err(TrellisError::InvalidInput))
                .transpose()?;
            store.update_loop(
                &uuid,
                LoopUpdate {
                    title: cmd.title,
                    description: cmd.description.map(Some),
                    frequency,
                    tags,
                    category_id,
                    starred: cmd.starred,
                    hidden: cmd.hidden,
                    items: None,
                },
            )?
        }
        "category" => store.update_category(
            &uuid,
            CategoryUpdate {
                title: cmd.title,
                color: cmd.color,
            },
        )?,
        other => {
            return Err(TrellisError::InvalidInput(format!(
                "unknown entity type: {}",
                other
            )))
        }
    };

    if !updated {
        return Err(TrellisError::EntityNotFound(cmd.id));
    }

    if cmd.json {
        let Some(value) = fetch_value(&store, &cmd.entity_type, &uuid)? else {
            return Err(TrellisError::EntityNotFound(cmd.id));
        };
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        println!("Updated {} {}", cmd.entity_type, short(&uuid));
    }
    Ok(())
}

pub fn handle_delete(entity_type: String, id: String) -> Result<()> {
    let store = open_store()?;
    let uuid = parse_id(&id)?;

    let deleted = match entity_type.as_str() {
        "note" => store.delete_note(&uuid)?,
        "spark" => store.delete_spark(&uuid)?,
        "action" => store.delete_action(&uuid)?,
        "path" => store.delete_path(&uuid)?,
        "loop" => store.delete_loop(&uuid)?,
        "category" => {
            let usage = store.check_category_usage(&uuid)?;
            if usage.is_used {
                println!(
                    "Category is referenced by {} entries; not deleting",
                    usage.total_usage
                );
                return Ok(());
            }
            store.delete_category(&uuid)?
        }
        other => {
            return Err(TrellisError::InvalidInput(format!(
                "unknown entity type: {}",
                other
            )))
        }
    };

    if !deleted {
        return Err(TrellisError::EntityNotFound(id));
    }
    println!("Deleted {} {}", entity_type, short(&uuid));
    Ok(())
}

pub fn handle_milestone_add(
    path_id: String,
    title: String,
    description: Option<String>,
    json: bool,
) -> Result<()> {
    let store = open_store()?;
    let milestone = store.add_milestone(&parse_id(&path_id)?, NewMilestone { title, description })?;

    if json {
        println!("{}", serde_json::to_string_pretty(&milestone)?);
    } else {
        println!(
            "Added milestone ({}) - {} [order {}]",
            short(&milestone.id),
            milestone.title,
            milestone.order
        );
    }
    Ok(())
}

pub fn handle_milestone_delete(milestone_id: String) -> Result<()> {
    let store = open_store()?;
    if !store.delete_milestone(&parse_id(&milestone_id)?)? {
        return Err(TrellisError::EntityNotFound(milestone_id));
    }
    println!("Deleted milestone; its actions moved up to the path");
    Ok(())
}

pub fn handle_link_action(
    action_id: String,
    path_id: String,
    milestone: Option<String>,
) -> Result<()> {
    let store = open_store()?;
    let milestone_id = parse_opt_id(milestone)?;

    let action_uuid = parse_id(&action_id)?;
    let path_uuid = parse_id(&path_id)?;

    let linked = store.link_action_to_path(&action_uuid, &path_uuid, milestone_id.as_ref())?;
    if !linked {
        // Work out which side was missing so the message names it.
        if store.get_action(&action_uuid)?.is_none() {
            return Err(TrellisError::EntityNotFound(action_id));
        }
        if store.get_path(&path_uuid)?.is_none() {
            return Err(TrellisError::EntityNotFound(path_id));
        }
        let milestone = milestone_id.map(|id| id.to_string()).unwrap_or_default();
        return Err(TrellisError::InvalidInput(format!(
            "milestone {} does not belong to path {}",
            milestone, path_id
        )));
    }
    println!("Linked action {}", &action_id[..8]);
    Ok(())
}

pub fn handle_unlink_action(action_id: String) -> Result<()> {
    let store = open_store()?;
    if !store.unlink_action(&parse_id(&action_id)?)? {
        return Err(TrellisError::EntityNotFound(action_id));
    }
    println!("Action {} is now standalone", &action_id[..8]);
    Ok(())
}

pub fn handle_path_actions(path_id: String, milestone: Option<String>, json: bool) -> Result<()> {
    let store = open_store()?;
    let milestone_id = parse_opt_id(milestone)?;

    let actions = store.get_path_actions(&parse_id(&path_id)?, milestone_id.as_ref())?;
    if json {
        println!("{}", serde_json::to_string_pretty(&actions)?);
    } else {
        for a in actions {
            let mark = if a.done { "x" } else { " " };
            println!("[{}] {}  {} (order {})", mark, short(&a.base.id), a.base.title, a.order);
        }
    }
    Ok(())
}

pub fn handle_category_usage(id: String, json: bool) -> Result<()> {
    let store = open_store()?;
    let usage = store.check_category_usage(&parse_id(&id)?)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&usage)?);
    } else {
        println!(
            "in use: {} (notes {}, sparks {}, actions {}, loops {}, paths {}; total {})",
            usage.is_used,
            usage.usage.notes,
            usage.usage.sparks,
            usage.usage.actions,
            usage.usage.loops,
            usage.usage.paths,
            usage.total_usage
        );
    }
    Ok(())
}

pub fn handle_category_cleanup(json: bool) -> Result<()> {
    let store = open_store()?;
    let report = store.cleanup_test_categories()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Deleted {} categories ({} skipped in use, {} errors)",
            report.deleted.len(),
            report.skipped_in_use.len(),
            report.errors.len()
        );
        for title in &report.deleted {
            println!("  deleted: {}", title);
        }
        for err in &report.errors {
            eprintln!("  error: {}", err);
        }
    }
    Ok(())
}
