//! Project registry
//!
//! Maps project ids to project root directories. The replace operations
//! only ever call [`ProjectRegistry::resolve`]; adding and removing
//! projects is a CLI concern.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Lookup of project roots by id
pub trait ProjectRegistry {
    /// Resolve a project id to its root directory, `None` if unknown
    fn resolve(&self, project_id: &str) -> Result<Option<PathBuf>>;
}

impl ProjectRegistry for HashMap<String, PathBuf> {
    fn resolve(&self, project_id: &str) -> Result<Option<PathBuf>> {
        Ok(self.get(project_id).cloned())
    }
}

/// A registered project
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub path: PathBuf,
    pub added_at: DateTime<Utc>,
}

/// SQLite-backed registry
pub struct SqliteRegistry {
    conn: Connection,
}

impl SqliteRegistry {
    /// Open (creating if needed) the registry database at `db_path`
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create: {}", parent.display()))?;
        }
        let conn = Connection::open(db_path)
            .with_context(|| format!("Failed to open: {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS projects (
                id TEXT PRIMARY KEY,
                path TEXT NOT NULL,
                added_at TEXT NOT NULL
            )",
            [],
        )
        .context("Failed to create projects table")?;
        Ok(Self { conn })
    }

    /// Register `path` under `id` (derived from the directory name if omitted)
    pub fn add(&self, path: &str, id: Option<&str>) -> Result<Project> {
        let path = parse_project_path(path)?;
        let path = path
            .canonicalize()
            .with_context(|| format!("Path does not exist: {}", path.display()))?;
        if !path.is_dir() {
            bail!("Not a directory: {}", path.display());
        }

        let id = match id {
            Some(id) if !id.trim().is_empty() => id.trim().to_string(),
            Some(_) => bail!("Project id must not be empty"),
            None => project_id_from_path(&path),
        };

        if self.find(&id)?.is_some() {
            bail!("Project id already registered: {}", id);
        }

        let project = Project {
            id,
            path,
            added_at: Utc::now(),
        };
        self.conn
            .execute(
                "INSERT INTO projects (id, path, added_at) VALUES (?1, ?2, ?3)",
                params![
                    project.id,
                    project.path.to_string_lossy(),
                    project.added_at.to_rfc3339()
                ],
            )
            .with_context(|| format!("Failed to register project: {}", project.id))?;

        Ok(project)
    }

    /// Remove a project; returns whether it existed
    pub fn remove(&self, id: &str) -> Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to remove project: {}", id))?;
        Ok(removed > 0)
    }

    /// All projects, ordered by id
    pub fn list(&self) -> Result<Vec<Project>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, path, added_at FROM projects ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let projects = rows
            .map(|row| {
                let (id, path, added_at) = row?;
                to_project(id, path, &added_at)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(projects)
    }

    fn find(&self, id: &str) -> Result<Option<Project>> {
        let row = self
            .conn
            .query_row(
                "SELECT path, added_at FROM projects WHERE id = ?1",
                params![id],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .with_context(|| format!("Failed to look up project: {}", id))?;

        row.map(|(path, added_at)| to_project(id.to_string(), path, &added_at))
            .transpose()
    }
}

impl ProjectRegistry for SqliteRegistry {
    fn resolve(&self, project_id: &str) -> Result<Option<PathBuf>> {
        Ok(self.find(project_id)?.map(|project| project.path))
    }
}

fn to_project(id: String, path: String, added_at: &str) -> Result<Project> {
    let added_at = DateTime::parse_from_rfc3339(added_at)
        .with_context(|| format!("Invalid timestamp for project {}: {}", id, added_at))?
        .with_timezone(&Utc);
    Ok(Project {
        id,
        path: PathBuf::from(path),
        added_at,
    })
}

/// Accept either a filesystem path or a `file://` URI
fn parse_project_path(input: &str) -> Result<PathBuf> {
    if input.starts_with("file://") {
        let url = Url::parse(input).with_context(|| format!("Invalid URI: {}", input))?;
        return url
            .to_file_path()
            .map_err(|_| anyhow::anyhow!("Not a local file URI: {}", input));
    }
    Ok(PathBuf::from(input))
}

/// Derive a project id from the directory name
///
/// Lowercases the name and turns runs of `.`, `_`, `-` and spaces into a
/// single `-`, trimming both ends. Falls back to a random UUID when nothing
/// is left.
pub fn project_id_from_path<P: AsRef<Path>>(path: P) -> String {
    let name = path
        .as_ref()
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let mut result = String::with_capacity(name.len());
    let mut prev_dash = false;

    for c in name.chars() {
        if matches!(c, '/' | '.' | ' ' | '-' | '_') {
            if !prev_dash && !result.is_empty() {
                result.push('-');
            }
            prev_dash = true;
        } else {
            result.push(c);
            prev_dash = false;
        }
    }

    let slug = result.trim_end_matches('-').to_string();
    if slug.is_empty() {
        uuid::Uuid::new_v4().to_string()
    } else {
        slug
    }
}
