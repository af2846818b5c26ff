//! Replace commands - Rewrite rendered text in project sources

use anyhow::Result;
use clap::Args;
use owo_colors::OwoColorize;

use source_locator::config::{self, Settings};
use source_locator::locator::commit::FanOutMode;
use source_locator::locator::{ElementHint, OperationResult, Replacer};
use source_locator::registry::SqliteRegistry;

/// Options shared by both replace commands
#[derive(Debug, Clone, Default, Args)]
pub struct ReplaceOptions {
    /// Fail instead of rewriting when more than one file matches
    #[arg(long)]
    pub strict: bool,

    /// Maximum directory depth to scan
    #[arg(long)]
    pub max_depth: Option<usize>,
}

impl ReplaceOptions {
    fn apply(&self, settings: &mut Settings) {
        if self.strict {
            settings.fan_out = FanOutMode::StrictSingleFile;
        }
        if let Some(depth) = self.max_depth {
            settings.max_depth = depth;
        }
    }
}

fn replacer(options: &ReplaceOptions) -> Result<Replacer<SqliteRegistry>> {
    let mut settings = Settings::load(config::settings_path()?)?;
    options.apply(&mut settings);
    let registry = SqliteRegistry::open(&config::registry_db_path()?)?;
    Ok(Replacer::with_settings(registry, &settings))
}

/// Execute replace-element; returns whether the replacement succeeded
pub fn execute_element(
    project_id: &str,
    hint: &ElementHint,
    original_text: &str,
    new_text: &str,
    options: &ReplaceOptions,
    json: bool,
) -> Result<bool> {
    let result =
        replacer(options)?.replace_text_by_selector(project_id, hint, original_text, new_text);
    print_result(&result, json)?;
    Ok(result.success)
}

/// Execute replace-text; returns whether the replacement succeeded
pub fn execute_text(
    project_id: &str,
    original_text: &str,
    new_text: &str,
    options: &ReplaceOptions,
    json: bool,
) -> Result<bool> {
    let result = replacer(options)?.replace_text_in_project(project_id, original_text, new_text);
    print_result(&result, json)?;
    Ok(result.success)
}

fn print_result(result: &OperationResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
    } else {
        println!("{}", format_result(result));
    }
    Ok(())
}

/// Format a result for display
pub fn format_result(result: &OperationResult) -> String {
    if !result.success {
        return format!(
            "{} {}",
            "Failed:".red(),
            result.error.as_deref().unwrap_or("unknown error")
        );
    }

    let files = result.modified_files.as_deref().unwrap_or_default();
    let mut lines = vec![format!(
        "{} {} file(s)",
        "Modified".green(),
        result.files_modified.unwrap_or(files.len())
    )];
    lines.extend(files.iter().map(|file| format!("  {}", file)));
    lines.join("\n")
}
