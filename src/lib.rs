//! source-locator library
//!
//! Finds the source of text edited in a rendered web page and rewrites it
//! in place. See [`locator::Replacer`] for the two entry points.

pub mod config;
pub mod locator;
pub mod registry;
