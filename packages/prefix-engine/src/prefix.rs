//! Run inputs: the prefix pair, the run mode and the deployment topology.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::error::MigrationError;

/// Old and new prefix for one run
///
/// Both halves are non-empty, differ from each other and contain only ASCII
/// letters, digits and underscores. That keeps them safe to splice into SQL
/// identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrefixPair {
    old: String,
    new: String,
}

impl PrefixPair {
    pub fn new(old: impl Into<String>, new: impl Into<String>) -> Result<Self, MigrationError> {
        let old = old.into();
        let new = new.into();

        validate_prefix(&old)?;
        validate_prefix(&new)?;

        if old == new {
            return Err(MigrationError::InvalidPrefix {
                prefix: new,
                reason: "new prefix is the same as the current prefix".to_string(),
            });
        }

        Ok(Self { old, new })
    }

    pub fn old(&self) -> &str {
        &self.old
    }

    pub fn new_prefix(&self) -> &str {
        &self.new
    }

    /// Swap the leading `old` of `name` for `new`, if `name` starts with `old`
    ///
    /// This is a literal byte comparison; `old` occurring anywhere other than
    /// the start of `name` does not count.
    pub fn reprefix(&self, name: &str) -> Option<String> {
        name.strip_prefix(self.old.as_str())
            .map(|suffix| format!("{}{}", self.new, suffix))
    }

    /// [`PrefixPair::reprefix`] for a name the store listed by prefix
    ///
    /// The store's collation decides case, so the leading `old` may differ in
    /// ASCII case. Every other byte still has to match, which keeps `_` from
    /// acting as a wildcard.
    pub fn reprefix_listed(&self, name: &str) -> Option<String> {
        let head = name.get(..self.old.len())?;
        if head.eq_ignore_ascii_case(&self.old) {
            Some(format!("{}{}", self.new, &name[self.old.len()..]))
        } else {
            None
        }
    }
}

fn validate_prefix(prefix: &str) -> Result<(), MigrationError> {
    if prefix.is_empty() {
        return Err(MigrationError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: "prefix must not be empty".to_string(),
        });
    }

    if let Some(bad) = prefix
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(MigrationError::InvalidPrefix {
            prefix: prefix.to_string(),
            reason: format!(
                "only letters, numbers and underscores are allowed (found {:?})",
                bad
            ),
        });
    }

    Ok(())
}

/// Whether mutations are executed or only previewed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Apply,
    DryRun,
}

impl RunMode {
    pub fn from_dry_run(dry_run: bool) -> Self {
        if dry_run {
            RunMode::DryRun
        } else {
            RunMode::Apply
        }
    }

    pub fn is_dry_run(self) -> bool {
        self == RunMode::DryRun
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Topology {
    #[default]
    SingleSite,
    MultiSite,
}

lazy_static! {
    static ref MULTISITE_DEFINE: Regex =
        Regex::new(r#"(?i)define\s*\(\s*['"]MULTISITE['"]\s*,\s*true\s*\)"#).unwrap();
}

impl Topology {
    /// Detect a multisite network from the application config file
    pub fn detect(config_content: &str) -> Self {
        if MULTISITE_DEFINE.is_match(config_content) {
            Topology::MultiSite
        } else {
            Topology::SingleSite
        }
    }

    pub fn is_multi_tenant(self) -> bool {
        self == Topology::MultiSite
    }
}
