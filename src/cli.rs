use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Generate meeting notes from tracking-API work logs", long_about = None)]
#[clap(propagate_version = true)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Generate meeting notes for a project, board and date range
    Generate(GenerateArgs),
    /// List the projects in the organization
    Projects,
    /// List boards, for one project or grouped across all projects
    Boards(BoardsArgs),
    /// List sprints grouped by project and board
    Sprints,
    /// List the members of a project
    Members(MembersArgs),
    /// List user accounts in the organization
    Users,
    /// Export raw work log data as JSON
    Export(ExportArgs),
    /// Manage the saved settings
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    /// Project name as shown in the tracking system
    #[clap(long)]
    pub project: String,
    /// Board name used for the story point lookup
    #[clap(long)]
    pub board: String,
    /// Restrict the notes to one sprint
    #[clap(long)]
    pub sprint_id: Option<String>,
    /// Start of the work-log date range (YYYY-MM-DD)
    #[clap(long)]
    pub start_date: String,
    /// End of the work-log date range (YYYY-MM-DD)
    #[clap(long)]
    pub end_date: String,
    /// Only include these assignees (repeatable)
    #[clap(long = "user")]
    pub users: Vec<String>,
    /// Write the markup to a file instead of stdout
    #[clap(short, long)]
    pub output: Option<PathBuf>,
    /// Publish the notes to the wiki after generating
    #[clap(long)]
    pub publish: bool,
    /// Wiki space key used when publishing
    #[clap(long, default_value = "RELIC")]
    pub space_key: String,
    /// Wiki space name used when publishing
    #[clap(long, default_value = "Meeting Notes")]
    pub space_name: String,
}

#[derive(Args, Debug, Clone)]
pub struct BoardsArgs {
    /// Project name; omit to list boards for every project
    #[clap(long)]
    pub project: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct MembersArgs {
    /// Project name
    #[clap(long)]
    pub project: String,
}

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Start of the work-log date range (YYYY-MM-DD)
    #[clap(long)]
    pub start_date: String,
    /// End of the work-log date range (YYYY-MM-DD)
    #[clap(long)]
    pub end_date: String,
    /// Directory the JSON export is written to
    #[clap(long, default_value = "downloads")]
    pub out_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[clap(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Create a sample settings file to fill in
    Init,
    /// Show the current settings (without the API key)
    Show,
    /// Set one settings value
    Set { key: String, value: String },
}
