//! Project command - Manage the project registry

use anyhow::{bail, Result};
use chrono::Local;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;

use source_locator::config;
use source_locator::registry::{Project, SqliteRegistry};

fn open_registry() -> Result<SqliteRegistry> {
    SqliteRegistry::open(&config::registry_db_path()?)
}

/// Register a project directory
pub fn execute_add(path: &str, id: Option<&str>) -> Result<()> {
    let project = open_registry()?.add(path, id)?;
    println!(
        "{} {} -> {}",
        "Registered:".green(),
        project.id,
        project.path.display()
    );
    Ok(())
}

/// Remove a project from the registry
pub fn execute_remove(id: &str) -> Result<()> {
    if !open_registry()?.remove(id)? {
        bail!("Unknown project: {}", id);
    }
    println!("{} {}", "Removed:".green(), id);
    Ok(())
}

/// List registered projects
pub fn execute_list(json: bool) -> Result<()> {
    let projects = open_registry()?.list()?;

    if json {
        let entries: Vec<serde_json::Value> = projects
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id,
                    "path": p.path.to_string_lossy(),
                    "addedAt": p.added_at.to_rfc3339(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        println!("{}", format_projects(&projects));
    }
    Ok(())
}

/// Render projects as a table
pub fn format_projects(projects: &[Project]) -> String {
    if projects.is_empty() {
        return "No projects registered. Add one with `source-locator project add <path>`."
            .to_string();
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![Cell::new("ID"), Cell::new("Path"), Cell::new("Added")]);

    for project in projects {
        let added = project
            .added_at
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M")
            .to_string();
        table.add_row(vec![
            Cell::new(&project.id),
            Cell::new(project.path.to_string_lossy()),
            Cell::new(added),
        ]);
    }

    format!("{}\n\n{} projects registered", table, projects.len())
}
