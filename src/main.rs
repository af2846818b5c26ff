//! source-locator: CLI for rewriting rendered web page text in project sources

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use source_locator::locator::ElementHint;

mod commands;

use commands::replace::ReplaceOptions;

#[derive(Parser)]
#[command(name = "source-locator")]
#[command(about = "Rewrite rendered web page text in project sources", long_about = None)]
#[command(version)]
struct Cli {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace the text of an element identified by tag, id and class
    ReplaceElement {
        /// Registered project ID
        project_id: String,

        /// Element tag name (e.g. h1)
        #[arg(long)]
        tag: String,

        /// Element id attribute
        #[arg(long)]
        id: Option<String>,

        /// Element class list as rendered
        #[arg(long = "class")]
        class_name: Option<String>,

        /// Text currently rendered inside the element
        original_text: String,

        /// Replacement text
        new_text: String,

        #[command(flatten)]
        options: ReplaceOptions,
    },

    /// Replace text wherever it appears in the project
    ReplaceText {
        /// Registered project ID
        project_id: String,

        /// Text as rendered in the page
        original_text: String,

        /// Replacement text
        new_text: String,

        #[command(flatten)]
        options: ReplaceOptions,
    },

    /// Manage registered projects
    Project {
        #[command(subcommand)]
        command: ProjectCommand,
    },
}

#[derive(Subcommand)]
enum ProjectCommand {
    /// Register a project directory
    Add {
        /// Project directory (path or file:// URI)
        path: String,

        /// Project ID (defaults to the directory name)
        #[arg(long)]
        id: Option<String>,
    },

    /// List registered projects
    List,

    /// Remove a registered project
    Remove {
        /// Project ID
        id: String,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let success = match cli.command {
        Commands::ReplaceElement {
            project_id,
            tag,
            id,
            class_name,
            original_text,
            new_text,
            options,
        } => {
            let hint = ElementHint { tag, id, class_name };
            commands::replace::execute_element(
                &project_id,
                &hint,
                &original_text,
                &new_text,
                &options,
                cli.json,
            )?
        }

        Commands::ReplaceText {
            project_id,
            original_text,
            new_text,
            options,
        } => commands::replace::execute_text(
            &project_id,
            &original_text,
            &new_text,
            &options,
            cli.json,
        )?,

        Commands::Project { command } => {
            match command {
                ProjectCommand::Add { path, id } => {
                    commands::project::execute_add(&path, id.as_deref())?
                }
                ProjectCommand::List => commands::project::execute_list(cli.json)?,
                ProjectCommand::Remove { id } => commands::project::execute_remove(&id)?,
            }
            true
        }
    };

    if !success {
        std::process::exit(1);
    }

    Ok(())
}
