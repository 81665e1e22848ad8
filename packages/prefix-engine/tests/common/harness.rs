//! Test harness with testcontainers for MySQL integration testing.
//!
//! One MySQL container is shared across all tests. Each test gets its own
//! freshly created database, since every run renames tables.

use anyhow::{Context, Result};
use prefix_engine::MySqlStore;
use sqlx::mysql::MySqlPool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use testcontainers::runners::AsyncRunner;
use testcontainers::ContainerAsync;
use testcontainers_modules::mysql::Mysql;
use tokio::sync::OnceCell;

/// Shared container that persists across all tests.
struct SharedTestInfra {
    /// `mysql://root@host:port`, without a database
    server_url: String,
    // Keep the container alive for the entire test run
    _mysql: ContainerAsync<Mysql>,
}

static SHARED_INFRA: OnceCell<SharedTestInfra> = OnceCell::const_new();
static DATABASE_COUNTER: AtomicUsize = AtomicUsize::new(0);

impl SharedTestInfra {
    async fn init() -> Result<Self> {
        // Run tests with: RUST_LOG=debug cargo test -- --ignored --nocapture
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let mysql = Mysql::default()
            .start()
            .await
            .context("Failed to start MySQL container")?;

        let host = mysql.get_host().await?;
        let port = mysql.get_host_port_ipv4(3306).await?;

        Ok(Self {
            server_url: format!("mysql://root@{}:{}", host, port),
            _mysql: mysql,
        })
    }

    async fn get() -> &'static Self {
        SHARED_INFRA
            .get_or_init(|| async {
                Self::init()
                    .await
                    .expect("Failed to initialize shared test infrastructure")
            })
            .await
    }
}

/// One empty database on the shared server
pub struct MySqlHarness {
    pub pool: MySqlPool,
    pub store: Arc<MySqlStore>,
}

impl MySqlHarness {
    pub async fn new() -> Result<Self> {
        let infra = SharedTestInfra::get().await;

        let database = format!(
            "prefix_test_{}",
            DATABASE_COUNTER.fetch_add(1, Ordering::SeqCst)
        );

        let admin = MySqlPool::connect(&format!("{}/test", infra.server_url))
            .await
            .context("Failed to connect to MySQL")?;
        let create = format!("CREATE DATABASE `{}`", database);
        sqlx::raw_sql(&create).execute(&admin).await?;
        admin.close().await;

        let url = format!("{}/{}", infra.server_url, database);
        let pool = MySqlPool::connect(&url)
            .await
            .context("Failed to connect to test database")?;
        let store = MySqlStore::from_pool(pool.clone(), format!("test/{}", database));

        Ok(Self {
            pool,
            store: Arc::new(store),
        })
    }

    /// Create `{prefix}posts`, `{prefix}options` and `{prefix}usermeta` with rows
    pub async fn seed_wordpress(&self, prefix: &str, options: &[&str], meta: &[&str]) -> Result<()> {
        let ddl = [
            format!(
                "CREATE TABLE `{prefix}posts` (
                    ID BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    post_title TEXT NOT NULL
                )"
            ),
            format!(
                "CREATE TABLE `{prefix}options` (
                    option_id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    option_name VARCHAR(191) NOT NULL UNIQUE,
                    option_value LONGTEXT NOT NULL
                )"
            ),
            format!(
                "CREATE TABLE `{prefix}usermeta` (
                    umeta_id BIGINT UNSIGNED NOT NULL AUTO_INCREMENT PRIMARY KEY,
                    user_id BIGINT UNSIGNED NOT NULL DEFAULT 0,
                    meta_key VARCHAR(255) NULL,
                    meta_value LONGTEXT NULL
                )"
            ),
        ];
        for stmt in &ddl {
            sqlx::raw_sql(stmt).execute(&self.pool).await?;
        }

        let insert_option = format!(
            "INSERT INTO `{prefix}options` (option_name, option_value) VALUES (?, '')"
        );
        for name in options {
            sqlx::query(&insert_option)
                .bind(*name)
                .execute(&self.pool)
                .await?;
        }

        let insert_meta = format!(
            "INSERT INTO `{prefix}usermeta` (user_id, meta_key, meta_value) VALUES (1, ?, '')"
        );
        for key in meta {
            sqlx::query(&insert_meta).bind(*key).execute(&self.pool).await?;
        }

        Ok(())
    }

    pub async fn create_table(&self, name: &str) -> Result<()> {
        let stmt = format!("CREATE TABLE `{}` (id INT PRIMARY KEY)", name);
        sqlx::raw_sql(&stmt).execute(&self.pool).await?;
        Ok(())
    }

    pub async fn table_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> = sqlx::query_scalar(
            "SELECT CAST(table_name AS CHAR) FROM information_schema.tables \
             WHERE table_schema = DATABASE() ORDER BY table_name",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(names)
    }

    /// Non-null values of `column`, sorted
    pub async fn keys(&self, table: &str, column: &str) -> Result<Vec<String>> {
        let sql = format!("SELECT `{}` FROM `{}` ORDER BY 1", column, table);
        let keys: Vec<Option<String>> = sqlx::query_scalar(&sql).fetch_all(&self.pool).await?;
        Ok(keys.into_iter().flatten().collect())
    }
}
