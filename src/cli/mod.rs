mod commands;
mod handlers;

pub use commands::{
    AddCommand, AddEntity, CategoryAction, CategoryCommand, Cli, Commands, PathAction, PathCommand,
    UpdateCommand,
};
pub use handlers::{
    handle_add_action, handle_add_category, handle_add_loop, handle_add_note, handle_add_path,
    handle_add_spark, handle_category_cleanup, handle_category_usage, handle_delete, handle_get,
    handle_init, handle_link_action, handle_list, handle_milestone_add, handle_milestone_delete,
    handle_path_actions, handle_unlink_action, handle_update,
};
