use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "trellis")]
#[command(version, about = "Local data engine for notes, sparks, actions, paths and loops")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a trellis data directory here
    Init,

    /// Add a new entity
    Add(AddCommand),

    /// List entities of a type (note, spark, action, path, loop, category)
    List {
        #[arg(value_name = "TYPE")]
        entity_type: String,

        /// Include hidden entries
        #[arg(long)]
        hidden: bool,

        /// Only starred entries
        #[arg(long)]
        starred: bool,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Get a single entity by ID
    Get {
        #[arg(value_name = "TYPE")]
        entity_type: String,

        /// Entity UUID
        id: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Update fields on an entity
    Update(UpdateCommand),

    /// Delete an entity by ID (cascades where the type defines one)
    Delete {
        #[arg(value_name = "TYPE")]
        entity_type: String,

        /// Entity UUID
        id: String,
    },

    /// Path and milestone operations
    Path(PathCommand),

    /// Category maintenance
    Category(CategoryCommand),
}

#[derive(Args, Debug)]
pub struct AddCommand {
    #[command(subcommand)]
    pub entity: AddEntity,
}

#[derive(Subcommand, Debug)]
pub enum AddEntity {
    /// Add a note
    Note {
        title: String,

        /// Note body
        #[arg(long)]
        body: Option<String>,

        /// Tags (can be specified multiple times)
        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        /// Category UUID
        #[arg(long)]
        category: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a spark (a captured idea)
    Spark {
        title: String,

        #[arg(long)]
        body: Option<String>,

        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Add an action
    Action {
        title: String,

        #[arg(long)]
        body: Option<String>,

        /// Priority (low, normal, high, urgent)
        #[arg(long, default_value = "normal")]
        priority: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,

        /// Sub-tasks (can be specified multiple times)
        #[arg(long = "sub-task")]
        sub_tasks: Vec<String>,

        #[arg(long = "tag", short = 't')]
        tags: Vec<String>,

        #[arg(long)]
        category: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Add a path (a goal track)
    Path {
        title: String,

        #[arg(long)]
        description: Option<String>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        start: Option<String>,

        /// Target date (YYYY-MM-DD)
        #[arg(long)]
        target: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Add a loop (a recurring routine)
    Loop {
        title: String,

        /// Frequency (daily, weekdays, weekends, weekly, custom)
        #[arg(long, default_value = "daily")]
        frequency: String,

        /// Items as "name" or "name:minutes" (can be specified multiple times)
        #[arg(long = "item")]
        items: Vec<String>,

        #[arg(long)]
        json: bool,
    },

    /// Add a category
    Category {
        title: String,

        /// Hex color
        #[arg(long, default_value = "#808080")]
        color: String,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct UpdateCommand {
    #[arg(value_name = "TYPE")]
    pub entity_type: String,

    /// Entity UUID
    pub id: String,

    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub body: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    /// Replace the tag list (can be specified multiple times)
    #[arg(long = "tag", short = 't')]
    pub tags: Vec<String>,

    /// Category UUID, or "none" to clear
    #[arg(long)]
    pub category: Option<String>,

    #[arg(long)]
    pub starred: Option<bool>,

    #[arg(long)]
    pub hidden: Option<bool>,

    #[arg(long)]
    pub done: Option<bool>,

    /// Priority (low, normal, high, urgent)
    #[arg(long)]
    pub priority: Option<String>,

    /// Due date (YYYY-MM-DD), or "none" to clear
    #[arg(long)]
    pub due: Option<String>,

    /// Replace the sub-task list (can be specified multiple times)
    #[arg(long = "sub-task")]
    pub sub_tasks: Vec<String>,

    /// Mark a sub-task done by its ID
    #[arg(long)]
    pub check: Option<String>,

    /// Mark a sub-task not done by its ID
    #[arg(long)]
    pub uncheck: Option<String>,

    /// Start date (YYYY-MM-DD), or "none" to clear
    #[arg(long)]
    pub start: Option<String>,

    /// Target date (YYYY-MM-DD), or "none" to clear
    #[arg(long)]
    pub target: Option<String>,

    /// Frequency (daily, weekdays, weekends, weekly, custom)
    #[arg(long)]
    pub frequency: Option<String>,

    /// Hex color
    #[arg(long)]
    pub color: Option<String>,

    #[arg(long)]
    pub collapsed: Option<bool>,

    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct PathCommand {
    #[command(subcommand)]
    pub action: PathAction,
}

#[derive(Subcommand, Debug)]
pub enum PathAction {
    /// Append a milestone to a path
    AddMilestone {
        path_id: String,
        title: String,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        json: bool,
    },

    /// Delete a milestone; its actions move up to the path
    DeleteMilestone { milestone_id: String },

    /// Link an action to a path, or to one of its milestones
    Link {
        action_id: String,
        path_id: String,

        #[arg(long)]
        milestone: Option<String>,
    },

    /// Detach an action from its parent
    Unlink { action_id: String },

    /// List actions attached to a path or milestone
    Actions {
        path_id: String,

        #[arg(long)]
        milestone: Option<String>,

        #[arg(long)]
        json: bool,
    },
}

#[derive(Args, Debug)]
pub struct CategoryCommand {
    #[command(subcommand)]
    pub action: CategoryAction,
}

#[derive(Subcommand, Debug)]
pub enum CategoryAction {
    /// Report how many entities reference a category
    Usage {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// Delete unused test-data categories
    Cleanup {
        #[arg(long)]
        json: bool,
    },
}
