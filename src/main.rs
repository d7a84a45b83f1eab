use clap::Parser;
use trellis::cli::{
    handle_add_action, handle_add_category, handle_add_loop, handle_add_note, handle_add_path,
    handle_add_spark, handle_category_cleanup, handle_category_usage, handle_delete, handle_get,
    handle_init, handle_link_action, handle_list, handle_milestone_add, handle_milestone_delete,
    handle_path_actions, handle_unlink_action, handle_update, AddEntity, CategoryAction, Cli,
    Commands, PathAction,
};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Init => handle_init(),
        Commands::Add(add) => match add.entity {
            AddEntity::Note {
                title,
                body,
                tags,
                category,
                json,
            } => handle_add_note(title, body, tags, category, json),
            AddEntity::Spark {
                title,
                body,
                tags,
                category,
                json,
            } => handle_add_spark(title, body, tags, category, json),
            AddEntity::Action {
                title,
                body,
                priority,
                due,
                sub_tasks,
                tags,
                category,
                json,
            } => handle_add_action(title, body, priority, due, sub_tasks, tags, category, json),
            AddEntity::Path {
                title,
                description,
                start,
                target,
                json,
            } => handle_add_path(title, description, start, target, json),
            AddEntity::Loop {
                title,
                frequency,
                items,
                json,
            } => handle_add_loop(title, frequency, items, json),
            AddEntity::Category { title, color, json } => {
                handle_add_category(title, color, json)
            }
        },
        Commands::List {
            entity_type,
            hidden,
            starred,
            json,
        } => handle_list(entity_type, hidden, starred, json),
        Commands::Get {
            entity_type,
            id,
            json,
        } => handle_get(entity_type, id, json),
        Commands::Update(update) => handle_update(update),
        Commands::Delete { entity_type, id } => handle_delete(entity_type, id),
        Commands::Path(path_cmd) => match path_cmd.action {
            PathAction::AddMilestone {
                path_id,
                title,
                description,
                json,
            } => handle_milestone_add(path_id, title, description, json),
            PathAction::DeleteMilestone { milestone_id } => {
                handle_milestone_delete(milestone_id)
            }
            PathAction::Link {
                action_id,
                path_id,
                milestone,
            } => handle_link_action(action_id, path_id, milestone),
            PathAction::Unlink { action_id } => handle_unlink_action(action_id),
            PathAction::Actions {
                path_id,
                milestone,
                json,
            } => handle_path_actions(path_id, milestone, json),
        },
        Commands::Category(cat_cmd) => match cat_cmd.action {
            CategoryAction::Usage { id, json } => handle_category_usage(id, json),
            CategoryAction::Cleanup { json } => handle_category_cleanup(json),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
