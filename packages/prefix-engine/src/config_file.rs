//! Rewrites the prefix assignment in the application's config file.
//!
//! The file is never parsed as a whole. A single pattern anchors on the
//! assignment statement (`$table_prefix = 'wp_';` by default) and only the
//! quoted value is replaced; identifier, whitespace, quote style and
//! terminator are kept as they were. The assignment must start its line
//! (after indentation), so commented-out copies are ignored.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::error::ConfigError;
use crate::traits::BaseConfigFiles;

pub const DEFAULT_PREFIX_IDENTIFIER: &str = "$table_prefix";

lazy_static! {
    static ref DEFAULT_ASSIGNMENT: PrefixAssignment =
        PrefixAssignment::new(DEFAULT_PREFIX_IDENTIFIER).unwrap();
}

/// Matcher for `<identifier> = <quoted-string> ;` at the start of a line
#[derive(Debug, Clone)]
pub struct PrefixAssignment {
    identifier: String,
    pattern: Regex,
}

impl PrefixAssignment {
    pub fn new(identifier: &str) -> Result<Self, regex::Error> {
        let pattern = Regex::new(&format!(
            r#"(?m)^(?P<head>[ \t]*{}\s*=\s*)(?:'(?P<single>[^'\r\n]*)'|"(?P<double>[^"\r\n]*)")(?P<tail>\s*;)"#,
            regex::escape(identifier)
        ))?;

        Ok(Self {
            identifier: identifier.to_string(),
            pattern,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Value of the first matching assignment
    pub fn read_prefix(&self, content: &str) -> Option<String> {
        let caps = self.pattern.captures(content)?;
        caps.name("single")
            .or_else(|| caps.name("double"))
            .map(|m| m.as_str().to_string())
    }

    /// Replace the value of every matching assignment
    ///
    /// Returns `None` when nothing matched.
    pub fn replace(&self, content: &str, new_prefix: &str) -> Option<String> {
        let mut replacements = 0usize;
        let rewritten = self.pattern.replace_all(content, |caps: &Captures| {
            replacements += 1;
            let quote = if caps.name("single").is_some() { '\'' } else { '"' };
            format!(
                "{}{}{}{}{}",
                &caps["head"], quote, new_prefix, quote, &caps["tail"]
            )
        });

        if replacements == 0 {
            None
        } else {
            Some(rewritten.into_owned())
        }
    }
}

impl Default for PrefixAssignment {
    fn default() -> Self {
        DEFAULT_ASSIGNMENT.clone()
    }
}

pub struct ConfigFileRewriter {
    files: Arc<dyn BaseConfigFiles>,
    assignment: PrefixAssignment,
}

impl ConfigFileRewriter {
    pub fn new(files: Arc<dyn BaseConfigFiles>, assignment: PrefixAssignment) -> Self {
        Self { files, assignment }
    }

    /// Point the assignment in `path` at `new_prefix`, overwriting the file
    pub fn rewrite(&self, path: &Path, new_prefix: &str) -> Result<(), ConfigError> {
        let content = self.files.read(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let rewritten =
            self.assignment
                .replace(&content, new_prefix)
                .ok_or_else(|| ConfigError::NoMatch {
                    path: path.to_path_buf(),
                    identifier: self.assignment.identifier().to_string(),
                })?;

        self.files
            .write(path, &rewritten)
            .map_err(|source| ConfigError::Write {
                path: path.to_path_buf(),
                source,
            })?;

        info!(path = %path.display(), new_prefix = %new_prefix, "Updated config file");
        Ok(())
    }
}
