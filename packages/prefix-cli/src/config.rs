use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use prefix_engine::config_file::PrefixAssignment;
use prefix_engine::{BaseConfigFiles, Topology};
use std::env;
use std::path::{Path, PathBuf};

/// Name of the config file searched for when none is given
pub const CONFIG_FILE_NAME: &str = "wp-config.php";

/// Connection and file locations, from the environment and then flags
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub database_url: Option<String>,
    pub config_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        // Load .env file if present
        let _ = dotenv();

        Self {
            database_url: env::var("DATABASE_URL").ok(),
            config_file: env::var("REPREFIX_CONFIG_FILE").ok().map(PathBuf::from),
        }
    }

    /// Flags win over the environment
    pub fn with_overrides(mut self, database_url: Option<String>, config_file: Option<PathBuf>) -> Self {
        if database_url.is_some() {
            self.database_url = database_url;
        }
        if config_file.is_some() {
            self.config_file = config_file;
        }
        self
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set (or pass --database-url)")
    }

    /// Explicit config file, or the nearest `wp-config.php` above `start`
    pub fn locate_config_file(&self, start: &Path) -> Option<PathBuf> {
        self.config_file
            .clone()
            .or_else(|| find_config_file(start))
    }
}

pub fn find_config_file(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|path| path.is_file())
}

/// What the site's config file says about the current install
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub path: PathBuf,
    pub prefix: Option<String>,
    pub topology: Topology,
}

impl SiteConfig {
    pub fn inspect(
        files: &dyn BaseConfigFiles,
        path: &Path,
        assignment: &PrefixAssignment,
    ) -> Result<Self> {
        let content = files
            .read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Ok(Self {
            path: path.to_path_buf(),
            prefix: assignment.read_prefix(&content),
            topology: Topology::detect(&content),
        })
    }
}

/// `--old-prefix`, falling back to the prefix assigned in the config file
pub fn resolve_old_prefix(flag: Option<&str>, site: Option<&SiteConfig>) -> Result<String> {
    if let Some(prefix) = flag {
        return Ok(prefix.to_string());
    }

    match site {
        Some(SiteConfig {
            prefix: Some(prefix),
            ..
        }) => Ok(prefix.clone()),
        Some(site) => bail!(
            "No prefix assignment found in {}; pass --old-prefix",
            site.path.display()
        ),
        None => bail!("Cannot determine the current prefix; pass --old-prefix or --config"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prefix_engine::testing::MemoryFiles;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_flags_override_environment_values() {
        let config = Config {
            database_url: Some("mysql://env/wp".to_string()),
            config_file: Some(PathBuf::from("/env/wp-config.php")),
        }
        .with_overrides(Some("mysql://flag/wp".to_string()), None);

        assert_eq!(config.database_url().unwrap(), "mysql://flag/wp");
        assert_eq!(config.config_file, Some(PathBuf::from("/env/wp-config.php")));
    }

    #[test]
    fn test_missing_database_url_is_an_error() {
        let err = Config::default().database_url().unwrap_err();
        assert!(err.to_string().contains("DATABASE_URL"));
    }

    #[test]
    fn test_find_config_file_walks_up() {
        let root = TempDir::new().unwrap();
        let nested = root.path().join("wp-content").join("plugins");
        fs::create_dir_all(&nested).unwrap();
        fs::write(root.path().join(CONFIG_FILE_NAME), "<?php\n").unwrap();

        assert_eq!(
            find_config_file(&nested),
            Some(root.path().join(CONFIG_FILE_NAME))
        );
    }

    #[test]
    fn test_inspect_reads_real_file_from_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "<?php\n// $table_prefix = 'wp_';\n$table_prefix = 'site_';\n").unwrap();

        let site = SiteConfig::inspect(
            &prefix_engine::LocalFiles,
            &path,
            &PrefixAssignment::default(),
        )
        .unwrap();

        assert_eq!(site.prefix.as_deref(), Some("site_"));
        assert_eq!(resolve_old_prefix(None, Some(&site)).unwrap(), "site_");
    }

    #[test]
    fn test_explicit_config_file_skips_search() {
        let config = Config::default()
            .with_overrides(None, Some(PathBuf::from("/srv/site/wp-config.php")));

        assert_eq!(
            config.locate_config_file(Path::new("/nonexistent")),
            Some(PathBuf::from("/srv/site/wp-config.php"))
        );
    }

    #[test]
    fn test_inspect_reads_prefix_and_topology() {
        let files = MemoryFiles::new().with_file(
            "/srv/wp-config.php",
            "<?php\ndefine( 'MULTISITE', true );\n$table_prefix = \"site_\";\n",
        );

        let site = SiteConfig::inspect(
            &files,
            Path::new("/srv/wp-config.php"),
            &PrefixAssignment::default(),
        )
        .unwrap();

        assert_eq!(site.prefix.as_deref(), Some("site_"));
        assert_eq!(site.topology, Topology::MultiSite);
    }

    #[test]
    fn test_inspect_missing_file_names_path() {
        let err = SiteConfig::inspect(
            &MemoryFiles::new(),
            Path::new("/srv/wp-config.php"),
            &PrefixAssignment::default(),
        )
        .unwrap_err();

        assert!(err.to_string().contains("/srv/wp-config.php"));
    }

    #[test]
    fn test_old_prefix_flag_wins() {
        let site = SiteConfig {
            path: PathBuf::from("/srv/wp-config.php"),
            prefix: Some("wp_".to_string()),
            topology: Topology::SingleSite,
        };

        assert_eq!(resolve_old_prefix(Some("legacy_"), Some(&site)).unwrap(), "legacy_");
        assert_eq!(resolve_old_prefix(None, Some(&site)).unwrap(), "wp_");
    }

    #[test]
    fn test_old_prefix_unresolvable() {
        let site = SiteConfig {
            path: PathBuf::from("/srv/wp-config.php"),
            prefix: None,
            topology: Topology::SingleSite,
        };

        assert!(resolve_old_prefix(None, Some(&site)).is_err());
        assert!(resolve_old_prefix(None, None).is_err());
    }
}
