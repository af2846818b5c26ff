//! Element-aware matcher
//!
//! Finds the markup element the user edited using the structural hint
//! captured by the inspector. Patterns are tried from most to least
//! specific (id, class, bare tag); the first tier that matches a file wins
//! and only the element's inner text is rewritten.

use std::fmt;
use std::ops::Range;

use regex::Regex;
use tracing::warn;

use super::text::tokens_pattern;
use super::ElementHint;

/// Class tokens starting with this prefix are added by the editor overlay
/// and never appear in source.
pub const RESERVED_CLASS_PREFIX: &str = "edit-mode";

/// Specificity tier of a matcher, most specific first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Tier {
    Id,
    Class,
    Tag,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id => write!(f, "id"),
            Self::Class => write!(f, "class"),
            Self::Tag => write!(f, "tag"),
        }
    }
}

/// Byte ranges of a matched element's three parts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub open: Range<usize>,
    pub inner: Range<usize>,
    pub close: Range<usize>,
}

/// One structural matching heuristic
pub trait SourceMatcher {
    fn tier(&self) -> Tier;

    /// Locate the first matching element in `content`
    fn try_match(&self, content: &str) -> Option<Span>;
}

/// Regex shared by all tiers: `(<tag ATTRS>)\s*(TEXT)\s*(</tag>)`.
///
/// Tag names compare case-insensitively, the text does not. Whitespace runs
/// inside the text match any whitespace run in the source.
#[derive(Debug)]
struct ElementPattern {
    regex: Regex,
}

impl ElementPattern {
    fn new(tag: &str, attributes: &str, text: &str) -> Result<Self, regex::Error> {
        let tag = regex::escape(tag);
        let tokens: Vec<&str> = text.split_whitespace().collect();
        let pattern = format!(
            r"(<(?i:{tag}){attributes}>)\s*({text})\s*(</(?i:{tag})\s*>)",
            text = tokens_pattern(&tokens),
        );
        Ok(Self {
            regex: Regex::new(&pattern)?,
        })
    }

    fn find(&self, content: &str) -> Option<Span> {
        let captures = self.regex.captures(content)?;
        Some(Span {
            open: captures.get(1)?.range(),
            inner: captures.get(2)?.range(),
            close: captures.get(3)?.range(),
        })
    }
}

/// Opening tag carrying `id="<id>"` anywhere in its attribute list
#[derive(Debug)]
pub struct IdMatcher(ElementPattern);

impl IdMatcher {
    pub fn new(tag: &str, id: &str, text: &str) -> Result<Self, regex::Error> {
        let attributes = format!(
            r#"(?:\s[^>]*?)?\sid\s*=\s*["']{}["'][^>]*"#,
            regex::escape(id)
        );
        ElementPattern::new(tag, &attributes, text).map(Self)
    }
}

impl SourceMatcher for IdMatcher {
    fn tier(&self) -> Tier {
        Tier::Id
    }

    fn try_match(&self, content: &str) -> Option<Span> {
        self.0.find(content)
    }
}

/// Opening tag whose `class`/`className` value contains a class token
#[derive(Debug)]
pub struct ClassMatcher(ElementPattern);

impl ClassMatcher {
    pub fn new(tag: &str, class_token: &str, text: &str) -> Result<Self, regex::Error> {
        let attributes = format!(
            r#"(?:\s[^>]*?)?\s(?:class|className)\s*=\s*["'][^"']*{}[^"']*["'][^>]*"#,
            regex::escape(class_token)
        );
        ElementPattern::new(tag, &attributes, text).map(Self)
    }
}

impl SourceMatcher for ClassMatcher {
    fn tier(&self) -> Tier {
        Tier::Class
    }

    fn try_match(&self, content: &str) -> Option<Span> {
        self.0.find(content)
    }
}

/// Any opening tag of the element's type
#[derive(Debug)]
pub struct TagMatcher(ElementPattern);

impl TagMatcher {
    pub fn new(tag: &str, text: &str) -> Result<Self, regex::Error> {
        ElementPattern::new(tag, r"(?:\s[^>]*)?", text).map(Self)
    }
}

impl SourceMatcher for TagMatcher {
    fn tier(&self) -> Tier {
        Tier::Tag
    }

    fn try_match(&self, content: &str) -> Option<Span> {
        self.0.find(content)
    }
}

/// First class token not added by the editor overlay
pub fn primary_class(class_name: &str) -> Option<&str> {
    class_name
        .split_whitespace()
        .find(|token| !token.starts_with(RESERVED_CLASS_PREFIX))
}

/// Specificity-ordered list of matchers for one hint
pub struct ElementCascade {
    matchers: Vec<Box<dyn SourceMatcher>>,
}

impl ElementCascade {
    /// Build the cascade for `hint` wrapping `original_text`.
    ///
    /// A tier whose pattern fails to compile is left out.
    pub fn new(hint: &ElementHint, original_text: &str) -> Self {
        let tag = hint.tag.trim();
        let text = original_text.trim();
        let mut matchers: Vec<Box<dyn SourceMatcher>> = Vec::new();

        if let Some(id) = hint.id.as_deref().map(str::trim).filter(|id| !id.is_empty()) {
            push_matcher(&mut matchers, Tier::Id, IdMatcher::new(tag, id, text));
        }

        if let Some(class_token) = hint.class_name.as_deref().and_then(primary_class) {
            push_matcher(
                &mut matchers,
                Tier::Class,
                ClassMatcher::new(tag, class_token, text),
            );
        }

        push_matcher(&mut matchers, Tier::Tag, TagMatcher::new(tag, text));

        Self { matchers }
    }

    /// Tiers present in this cascade, in evaluation order
    pub fn tiers(&self) -> Vec<Tier> {
        self.matchers.iter().map(|m| m.tier()).collect()
    }

    /// Run the cascade over `content`.
    ///
    /// Returns the rewritten content and the tier that matched. The content
    /// may equal the input when the replacement is a no-op; the match still
    /// counts and lower tiers are not consulted.
    pub fn locate(&self, content: &str, replacement: &str) -> Option<(String, Tier)> {
        self.matchers.iter().find_map(|matcher| {
            let span = matcher.try_match(content)?;
            Some((splice(content, &span, replacement), matcher.tier()))
        })
    }
}

fn push_matcher<M>(
    matchers: &mut Vec<Box<dyn SourceMatcher>>,
    tier: Tier,
    matcher: Result<M, regex::Error>,
) where
    M: SourceMatcher + 'static,
{
    match matcher {
        Ok(matcher) => matchers.push(Box::new(matcher)),
        Err(err) => warn!(%tier, error = %err, "Skipping tier with invalid pattern"),
    }
}

/// Swap the inner-text range for `replacement`, keeping both tags verbatim
fn splice(content: &str, span: &Span, replacement: &str) -> String {
    let mut result =
        String::with_capacity(content.len() - span.inner.len() + replacement.len());
    result.push_str(&content[..span.inner.start]);
    result.push_str(replacement);
    result.push_str(&content[span.inner.end..]);
    result
}
