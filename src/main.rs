use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "pk")]
#[command(about = "Profilekit - version-controlled agent profiles with reviewed recommendations")]
#[command(version)]
struct Cli {
    /// Path to the project directory (default: .profilekit in current dir)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Output as JSON for machine consumption
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a project with the interview answers as version 1
    Init {
        /// Project identifier
        #[arg(long, default_value = "default")]
        id: String,

        /// Identity & role section
        #[arg(long)]
        identity_role: Option<String>,

        /// Communication style section
        #[arg(long)]
        communication_style: Option<String>,

        /// Content priorities section
        #[arg(long)]
        content_priorities: Option<String>,

        /// Engagement approach section
        #[arg(long)]
        engagement_approach: Option<String>,

        /// Key framings section
        #[arg(long)]
        key_framings: Option<String>,
    },

    /// Show the current profile
    Show,

    /// Edit one section directly (records a manual version)
    Edit {
        /// Section to edit (e.g. content-priorities)
        section: String,

        /// New section content
        content: String,
    },

    /// Record a test comment as evidence for the next generation run
    Comment {
        /// Comment text
        text: String,

        /// Excerpt of the agent response the comment refers to
        #[arg(long)]
        excerpt: Option<String>,

        /// Comment ID (auto-generated if not provided)
        #[arg(long)]
        id: Option<String>,
    },

    /// Analyze accumulated feedback and generate edit recommendations
    Generate,

    /// List pending recommendations
    Recs {
        /// Only show recommendations from this set
        #[arg(long)]
        set: Option<String>,

        /// Show a word diff of each recommendation's preview
        #[arg(long)]
        diff: bool,
    },

    /// Dismiss a pending recommendation
    Dismiss {
        /// Recommendation ID
        id: String,
    },

    /// Apply all pending recommendations in a set
    Apply {
        /// Set ID (defaults to the most recent set)
        #[arg(long)]
        set: Option<String>,
    },

    /// List all profile versions
    Versions,

    /// Restore an earlier version's content as a new version
    Rollback {
        /// Version number to restore
        version: u32,
    },

    /// Show a word diff of one section between two versions
    Diff {
        /// Section to compare (e.g. content-priorities)
        section: String,

        /// Older version number
        from: u32,

        /// Newer version number (defaults to the current version)
        #[arg(long)]
        to: Option<u32>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let project_dir = cli.dir.unwrap_or_else(|| PathBuf::from(".profilekit"));

    match cli.command {
        Commands::Init {
            id,
            identity_role,
            communication_style,
            content_priorities,
            engagement_approach,
            key_framings,
        } => commands::init::run(
            &project_dir,
            &id,
            identity_role.as_deref(),
            communication_style.as_deref(),
            content_priorities.as_deref(),
            engagement_approach.as_deref(),
            key_framings.as_deref(),
        ),
        Commands::Show => commands::show::run(&project_dir, cli.json),
        Commands::Edit { section, content } => {
            commands::edit::run(&project_dir, &section, &content, cli.json)
        }
        Commands::Comment { text, excerpt, id } => {
            commands::comment::run(&project_dir, &text, excerpt.as_deref(), id.as_deref())
        }
        Commands::Generate => commands::generate::run(&project_dir, cli.json),
        Commands::Recs { set, diff } => {
            commands::recs::run(&project_dir, set.as_deref(), diff, cli.json)
        }
        Commands::Dismiss { id } => commands::dismiss::run(&project_dir, &id),
        Commands::Apply { set } => commands::apply::run(&project_dir, set.as_deref(), cli.json),
        Commands::Versions => commands::versions::run(&project_dir, cli.json),
        Commands::Rollback { version } => commands::rollback::run(&project_dir, version, cli.json),
        Commands::Diff { section, from, to } => {
            commands::diff_cmd::run(&project_dir, &section, from, to, cli.json)
        }
    }
}
