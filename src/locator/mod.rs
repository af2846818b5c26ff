//! Source locator and replacer
//!
//! Maps text edited in a rendered page back to the project files it came
//! from and rewrites it there. The pipeline is:
//!
//! 1. [`scanner`] collects files containing a short search key
//! 2. [`text`] or [`element`] computes the rewritten content per file
//! 3. [`commit`] writes the files that changed
//!
//! Both public operations return an [`OperationResult`] and never an error.

pub mod commit;
pub mod element;
pub mod error;
pub mod scanner;
pub mod text;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::Settings;
use crate::registry::ProjectRegistry;
use commit::{CommitReport, FanOutMode};
use element::ElementCascade;
use scanner::ScanOptions;

pub use error::ReplaceError;

/// Search key length for element replacement
pub const SELECTOR_KEY_CHARS: usize = 30;

/// Search key length for plain-text replacement
pub const TEXT_KEY_CHARS: usize = 50;

/// Structural description of the edited DOM node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementHint {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
}

/// Aggregate result of a replace operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub files_modified: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_files: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    pub fn modified(files: Vec<String>) -> Self {
        Self {
            success: true,
            files_modified: Some(files.len()),
            modified_files: Some(files),
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            files_modified: None,
            modified_files: None,
            error: Some(message.into()),
        }
    }
}

impl From<ReplaceError> for OperationResult {
    fn from(err: ReplaceError) -> Self {
        Self::failed(err.to_string())
    }
}

/// Derive the pre-filter key from rendered text.
///
/// The first `max_chars` characters of the trimmed text, never splitting
/// a UTF-8 sequence.
pub fn search_key(text: &str, max_chars: usize) -> &str {
    let text = text.trim();
    let end = text
        .char_indices()
        .nth(max_chars)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    &text[..end]
}

/// Runs replace operations against projects from a registry
pub struct Replacer<R> {
    registry: R,
    scan: ScanOptions,
    fan_out: FanOutMode,
}

impl<R: ProjectRegistry> Replacer<R> {
    pub fn new(registry: R) -> Self {
        Self {
            registry,
            scan: ScanOptions::default(),
            fan_out: FanOutMode::default(),
        }
    }

    pub fn with_settings(registry: R, settings: &Settings) -> Self {
        Self {
            registry,
            scan: settings.scan_options(),
            fan_out: settings.fan_out,
        }
    }

    pub fn fan_out(mut self, mode: FanOutMode) -> Self {
        self.fan_out = mode;
        self
    }

    pub fn scan_options(mut self, options: ScanOptions) -> Self {
        self.scan = options;
        self
    }

    /// Replace the text content of the element described by `hint`
    pub fn replace_text_by_selector(
        &self,
        project_id: &str,
        hint: &ElementHint,
        original_text: &str,
        new_text: &str,
    ) -> OperationResult {
        let result = self.try_replace_by_selector(project_id, hint, original_text, new_text);
        self.finish(project_id, result)
    }

    /// Replace `original_text` wherever it occurs in the project
    pub fn replace_text_in_project(
        &self,
        project_id: &str,
        original_text: &str,
        new_text: &str,
    ) -> OperationResult {
        let result = self.try_replace_in_project(project_id, original_text, new_text);
        self.finish(project_id, result)
    }

    fn try_replace_by_selector(
        &self,
        project_id: &str,
        hint: &ElementHint,
        original_text: &str,
        new_text: &str,
    ) -> Result<Vec<String>, ReplaceError> {
        require(project_id, "projectId")?;
        require(&hint.tag, "elementHint.tag")?;
        let key = require(search_key(original_text, SELECTOR_KEY_CHARS), "originalText")?;

        let root = self.resolve_root(project_id)?;
        let candidates = scanner::scan(&root, key, &self.scan);
        if candidates.is_empty() {
            return Err(ReplaceError::NoCandidates);
        }

        let cascade = ElementCascade::new(hint, original_text);
        let report = commit::commit(&root, &candidates, self.fan_out, |file, content| {
            let (new_content, tier) = cascade.locate(content, new_text)?;
            debug!(file, %tier, "Element located");
            Some(new_content)
        })?;

        modified_files(report, "Element not found in candidate files")
    }

    fn try_replace_in_project(
        &self,
        project_id: &str,
        original_text: &str,
        new_text: &str,
    ) -> Result<Vec<String>, ReplaceError> {
        require(project_id, "projectId")?;
        require(original_text, "originalText")?;
        if new_text.is_empty() {
            return Err(ReplaceError::invalid("newText is required"));
        }
        let key = require(search_key(original_text, TEXT_KEY_CHARS), "originalText")?;

        let root = self.resolve_root(project_id)?;
        let candidates = scanner::scan(&root, key, &self.scan);
        if candidates.is_empty() {
            return Err(ReplaceError::NoCandidates);
        }

        let report = commit::commit(&root, &candidates, self.fan_out, |file, content| {
            let (new_content, strategy) = text::locate(content, original_text, new_text)?;
            debug!(file, ?strategy, "Text located");
            Some(new_content)
        })?;

        modified_files(report, "Text found by prefix but no full match in candidate files")
    }

    fn resolve_root(&self, project_id: &str) -> Result<PathBuf, ReplaceError> {
        let path = self
            .registry
            .resolve(project_id)
            .map_err(ReplaceError::Registry)?
            .ok_or_else(|| ReplaceError::ProjectNotFound(project_id.to_string()))?;

        let root = path.canonicalize().map_err(|_| {
            ReplaceError::ProjectNotFound(format!(
                "{} (missing directory {})",
                project_id,
                path.display()
            ))
        })?;
        if !root.is_dir() {
            return Err(ReplaceError::ProjectNotFound(format!(
                "{} ({} is not a directory)",
                project_id,
                root.display()
            )));
        }
        Ok(root)
    }

    fn finish(
        &self,
        project_id: &str,
        result: Result<Vec<String>, ReplaceError>,
    ) -> OperationResult {
        match result {
            Ok(files) => {
                info!(project = project_id, files = files.len(), "Replacement applied");
                OperationResult::modified(files)
            }
            Err(err) => {
                warn!(project = project_id, error = %err, "Replacement failed");
                err.into()
            }
        }
    }
}

fn require<'a>(value: &'a str, field: &str) -> Result<&'a str, ReplaceError> {
    if value.trim().is_empty() {
        return Err(ReplaceError::invalid(format!("{} is required", field)));
    }
    Ok(value)
}

fn modified_files(report: CommitReport, no_match: &str) -> Result<Vec<String>, ReplaceError> {
    if !report.modified.is_empty() {
        return Ok(report.modified);
    }
    if let Some(err) = report.failed.into_iter().next() {
        return Err(err);
    }

    let candidates = report.outcomes.len();
    let message = if report.matched > 0 {
        "Matched text left no file changed"
    } else {
        no_match
    };
    Err(ReplaceError::NoMatch {
        message: message.to_string(),
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::collections::HashMap;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            let root = dir.path().join("site");
            for (relative, content) in files {
                let path = root.join(relative);
                fs::create_dir_all(path.parent().unwrap()).unwrap();
                fs::write(path, content).unwrap();
            }
            fs::create_dir_all(&root).unwrap();
            Self { _dir: dir, root }
        }

        fn replacer(&self) -> Replacer<HashMap<String, PathBuf>> {
            let mut registry = HashMap::new();
            registry.insert("site".to_string(), self.root.clone());
            Replacer::new(registry)
        }

        fn read(&self, relative: &str) -> String {
            fs::read_to_string(self.root.join(relative)).unwrap()
        }
    }

    /// Fails the test if the operation touches the registry
    struct UnreachableRegistry;

    impl ProjectRegistry for UnreachableRegistry {
        fn resolve(&self, _project_id: &str) -> Result<Option<PathBuf>> {
            panic!("registry must not be consulted for invalid input");
        }
    }

    fn h1_title() -> ElementHint {
        ElementHint {
            tag: "h1".to_string(),
            id: Some("title".to_string()),
            class_name: None,
        }
    }

    #[test]
    fn test_selector_replaces_element_by_id() {
        let fixture = Fixture::new(&[("App.html", r#"<h1 id="title">Hello</h1>"#)]);

        let result = fixture
            .replacer()
            .replace_text_by_selector("site", &h1_title(), "Hello", "Hi");

        assert_eq!(result, OperationResult::modified(vec!["App.html".to_string()]));
        assert_eq!(fixture.read("App.html"), r#"<h1 id="title">Hi</h1>"#);
    }

    #[test]
    fn test_text_replaced_in_every_file() {
        let fixture = Fixture::new(&[
            ("src/Home.jsx", "<h2>Welcome</h2>"),
            ("public/index.html", "<title>Welcome</title>"),
        ]);

        let result = fixture
            .replacer()
            .replace_text_in_project("site", "Welcome", "Hi");

        assert!(result.success);
        assert_eq!(result.files_modified, Some(2));
        assert_eq!(
            result.modified_files.unwrap(),
            vec!["src/Home.jsx", "public/index.html"]
        );
        assert_eq!(fixture.read("src/Home.jsx"), "<h2>Hi</h2>");
        assert_eq!(fixture.read("public/index.html"), "<title>Hi</title>");
    }

    #[test]
    fn test_no_candidates() {
        let fixture = Fixture::new(&[("src/a.html", "<p>Something else</p>")]);
        let original = "This sentence does not appear anywhere in the project sources";

        let result = fixture
            .replacer()
            .replace_text_in_project("site", original, "Hi");

        assert_eq!(
            result,
            OperationResult::failed("Text not found in any project files")
        );
        assert_eq!(fixture.read("src/a.html"), "<p>Something else</p>");
    }

    #[test]
    fn test_candidate_without_match_is_untouched() {
        let content = r#"<h1 id="title">Hello again</h1>"#;
        let fixture = Fixture::new(&[("src/App.jsx", content)]);

        let result = fixture
            .replacer()
            .replace_text_by_selector("site", &h1_title(), "Hello", "Hi");

        assert!(!result.success);
        let error = result.error.unwrap();
        assert_ne!(error, "Text not found in any project files");
        assert!(error.contains("Element not found"));
        assert_eq!(fixture.read("src/App.jsx"), content);
    }

    #[test]
    fn test_text_differing_inside_key_has_no_candidates() {
        let fixture = Fixture::new(&[("src/a.html", "<p>Welcome home</p>")]);

        let result = fixture
            .replacer()
            .replace_text_in_project("site", "Welcome back", "Hi");

        assert_eq!(
            result,
            OperationResult::failed("Text not found in any project files")
        );
        assert_eq!(fixture.read("src/a.html"), "<p>Welcome home</p>");
    }

    #[test]
    fn test_text_prefix_match_without_full_match() {
        let lead = "Build faster websites with a toolkit that stays out";
        let content = format!("<p>{} of sight</p>", lead);
        let fixture = Fixture::new(&[("src/a.html", content.as_str())]);

        let result = fixture
            .replacer()
            .replace_text_in_project("site", &format!("{lead} of your way"), "Hi");

        assert!(!result.success);
        let error = result.error.unwrap();
        assert!(error.contains("no full match"));
        assert_ne!(error, "Text not found in any project files");
        assert_eq!(fixture.read("src/a.html"), content);
    }

    #[test]
    fn test_identity_replacement_reports_failure_without_writes() {
        let fixture = Fixture::new(&[("src/a.html", "<p>Welcome</p>")]);

        let result = fixture
            .replacer()
            .replace_text_in_project("site", "Welcome", "Welcome");

        assert!(!result.success);
        assert!(result.error.unwrap().contains("no file changed"));
    }

    #[test]
    fn test_whitespace_reformatted_source() {
        let lead = "Build faster websites with a toolkit that stays out";
        let content = format!("<p>{}\n    of your way</p>", lead);
        let fixture = Fixture::new(&[("src/a.vue", content.as_str())]);

        let result = fixture
            .replacer()
            .replace_text_in_project("site", &format!("{lead} of your way"), "Hi there");

        assert!(result.success);
        assert_eq!(fixture.read("src/a.vue"), "<p>Hi there</p>");
    }

    #[test]
    fn test_wrapped_text_inside_key_has_no_candidates() {
        let fixture = Fixture::new(&[("src/a.vue", "<p>Hello\n  world</p>")]);

        let result = fixture
            .replacer()
            .replace_text_in_project("site", "Hello world", "Hi there");

        assert_eq!(result.error.unwrap(), "Text not found in any project files");
        assert_eq!(fixture.read("src/a.vue"), "<p>Hello\n  world</p>");
    }

    #[test]
    fn test_selector_prefers_id_over_tag() {
        let content = "<div>Hello</div>\n<div id=\"title\">Hello</div>";
        let fixture = Fixture::new(&[("src/a.html", content)]);
        let hint = ElementHint {
            tag: "div".to_string(),
            ..h1_title()
        };

        let result = fixture
            .replacer()
            .replace_text_by_selector("site", &hint, "Hello", "Bye");

        assert!(result.success);
        assert_eq!(
            fixture.read("src/a.html"),
            "<div>Hello</div>\n<div id=\"title\">Bye</div>"
        );
    }

    #[test]
    fn test_invalid_input_skips_io() {
        let replacer = Replacer::new(UnreachableRegistry);

        let result = replacer.replace_text_by_selector("", &h1_title(), "Hello", "Hi");
        assert_eq!(result.error.unwrap(), "Invalid input: projectId is required");

        let no_tag = ElementHint::default();
        let result = replacer.replace_text_by_selector("site", &no_tag, "Hello", "Hi");
        assert_eq!(
            result.error.unwrap(),
            "Invalid input: elementHint.tag is required"
        );

        let result = replacer.replace_text_by_selector("site", &h1_title(), "   ", "Hi");
        assert!(!result.success);

        let result = replacer.replace_text_in_project("site", "Hello", "");
        assert_eq!(result.error.unwrap(), "Invalid input: newText is required");
    }

    #[test]
    fn test_unknown_project() {
        let fixture = Fixture::new(&[]);
        let result = fixture
            .replacer()
            .replace_text_in_project("other", "Hello", "Hi");
        assert_eq!(result.error.unwrap(), "Project not found: other");
    }

    #[test]
    fn test_missing_project_directory() {
        let mut registry = HashMap::new();
        registry.insert("gone".to_string(), PathBuf::from("/nonexistent/project/dir"));

        let result = Replacer::new(registry).replace_text_in_project("gone", "Hello", "Hi");
        assert!(result.error.unwrap().starts_with("Project not found: gone"));
    }

    #[test]
    fn test_adversarial_hint_stays_inside_root() {
        let fixture = Fixture::new(&[("src/a.html", "<p>Secret</p>")]);
        let outside = fixture.root.parent().unwrap().join("outside.html");
        fs::write(&outside, r#"<p id="../outside.html">Secret</p>"#).unwrap();

        let hint = ElementHint {
            tag: "p".to_string(),
            id: Some("../outside.html".to_string()),
            class_name: Some("../../etc/passwd".to_string()),
        };
        let result = fixture
            .replacer()
            .replace_text_by_selector("site", &hint, "Secret", "Leaked");

        assert_eq!(result.modified_files.unwrap(), vec!["src/a.html"]);
        assert_eq!(
            fs::read_to_string(Path::new(&outside)).unwrap(),
            r#"<p id="../outside.html">Secret</p>"#
        );
    }

    #[test]
    fn test_strict_mode_rejects_fan_out() {
        let fixture = Fixture::new(&[("src/a.html", "Welcome"), ("src/b.html", "Welcome")]);

        let result = fixture
            .replacer()
            .fan_out(FanOutMode::StrictSingleFile)
            .replace_text_in_project("site", "Welcome", "Hi");

        assert!(!result.success);
        assert!(result.error.unwrap().contains("src/a.html, src/b.html"));
        assert_eq!(fixture.read("src/a.html"), "Welcome");
    }

    #[test]
    fn test_io_failure_reported_over_no_match() {
        let report = CommitReport {
            matched: 1,
            modified: Vec::new(),
            failed: vec![ReplaceError::io(
                "/srv/site/src/a.html",
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            )],
            outcomes: Vec::new(),
        };

        let err = modified_files(report, "Element not found in candidate files").unwrap_err();
        assert_eq!(err.to_string(), "Failed to access /srv/site/src/a.html: disk full");
    }

    #[test]
    fn test_written_files_win_over_failures() {
        let report = CommitReport {
            matched: 2,
            modified: vec!["src/b.html".to_string()],
            failed: vec![ReplaceError::io(
                "/srv/site/src/a.html",
                std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            )],
            outcomes: Vec::new(),
        };

        assert_eq!(modified_files(report, "unused").unwrap(), vec!["src/b.html"]);
    }

    #[test]
    fn test_search_key() {
        assert_eq!(search_key("  Welcome  ", 50), "Welcome");
        assert_eq!(search_key("Hello world", 50), "Hello world");
        assert_eq!(search_key("Hello world", 7), "Hello w");
        assert_eq!(search_key("abcdefghij", 4), "abcd");
        assert_eq!(search_key("héllo wörld", 3), "hél");
        assert_eq!(search_key("héllo wörld", 8), "héllo wö");
        assert_eq!(search_key("   ", 30), "");
    }

    #[test]
    fn test_result_json_shape() {
        let json = serde_json::to_value(OperationResult::modified(vec!["App.html".to_string()]))
            .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "success": true,
                "filesModified": 1,
                "modifiedFiles": ["App.html"]
            })
        );

        let json = serde_json::to_value(OperationResult::failed("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "success": false, "error": "boom" }));
    }

    #[test]
    fn test_element_hint_from_json() {
        let hint: ElementHint =
            serde_json::from_str(r#"{ "tag": "h1", "className": "hero edit-mode" }"#).unwrap();
        assert_eq!(hint.tag, "h1");
        assert_eq!(hint.id, None);
        assert_eq!(hint.class_name.as_deref(), Some("hero edit-mode"));
    }
}
