//! 数据库连接模块
//!
//! 每种数据库引擎一个驱动类型，负责配置校验、连接串构建和连接后的会话设置；
//! `Connection` 持有经过会话初始化的原生连接池

use crate::config::ConnectionConfig;
use crate::error::{QuickSqlError, QuickSqlResult};
use crate::statement::Statement;
use crate::types::{DataValue, DatabaseType};
use async_trait::async_trait;
use rat_logger::{debug, info};

mod mysql;
mod native;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlDriver;
pub use native::{NativePool, NativeTransaction};
pub use postgres::PostgresDriver;
pub use sqlite::SqliteDriver;
pub use sqlserver::SqlServerDriver;

/// 驱动trait，描述一种数据库引擎的连接串和SQL方言差异
pub trait Driver: Send + Sync + std::fmt::Debug {
    /// 数据库类型
    fn db_type(&self) -> DatabaseType;

    /// 驱动名称，用于错误信息
    fn name(&self) -> &'static str;

    /// 默认端口
    fn default_port(&self) -> Option<u16> {
        None
    }

    /// 校验配置，缺失必填项时返回配置错误
    fn validate(&self, config: &ConnectionConfig) -> QuickSqlResult<()> {
        validate_server_config(self.name(), config)
    }

    /// 构建连接串
    fn dsn(&self, config: &ConnectionConfig) -> String;

    /// 切换schema/search_path的语句
    fn schema_command(&self, _config: &ConnectionConfig) -> Option<String> {
        None
    }

    /// 设置字符编码的语句
    fn encoding_command(&self, _config: &ConnectionConfig) -> Option<String> {
        None
    }

    /// 设置时区的语句
    fn timezone_command(&self, _config: &ConnectionConfig) -> Option<String> {
        None
    }

    /// 设置单个会话属性的语句
    fn attribute_command(&self, key: &str, value: &str) -> String;

    /// 连接建立后按顺序执行的全部语句
    fn session_commands(&self, config: &ConnectionConfig) -> Vec<String> {
        let mut commands = Vec::new();
        commands.extend(self.schema_command(config));
        commands.extend(self.encoding_command(config));
        commands.extend(self.timezone_command(config));
        for (key, value) in &config.attributes {
            commands.push(self.attribute_command(key, value));
        }
        commands.extend(config.commands.iter().cloned());
        commands
    }

    /// 第 `index` 个（从1开始）位置参数的占位符
    fn placeholder(&self, _index: usize) -> String {
        "?".to_string()
    }

    /// 分页子句；无分页时返回 None
    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>, has_order: bool) -> Option<String>;

    /// INSERT 语句后追加的 RETURNING 子句，用于取回自增主键
    fn returning_clause(&self) -> Option<&'static str> {
        None
    }
}

/// 根据数据库类型创建驱动
pub fn create_driver(db_type: &DatabaseType) -> Box<dyn Driver> {
    match db_type {
        DatabaseType::MySQL => Box::new(MySqlDriver),
        DatabaseType::PostgreSQL => Box::new(PostgresDriver),
        DatabaseType::SQLite => Box::new(SqliteDriver),
        DatabaseType::SqlServer => Box::new(SqlServerDriver),
    }
}

/// 服务器型数据库的通用必填项校验
pub(crate) fn validate_server_config(driver: &str, config: &ConnectionConfig) -> QuickSqlResult<()> {
    let missing = |field: &str| {
        crate::quick_error!(config, format!("{} 缺少必填配置项: {}", driver, field))
    };
    if is_blank(&config.host) {
        return Err(missing("host"));
    }
    if is_blank(&config.username) {
        return Err(missing("username"));
    }
    if config.password.is_none() && !config.allow_empty_password {
        return Err(missing("password"));
    }
    if is_blank(&config.database) && !config.allow_no_database {
        return Err(missing("database"));
    }
    Ok(())
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map(str::trim).is_none_or(str::is_empty)
}

/// 拼接 `?k=v&k2=v2` 形式的查询串
pub(crate) fn query_string(pairs: &[(String, String)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let encoded: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect();
    format!("?{}", encoded.join("&"))
}

/// 连接建立后的扩展点，可用于注册自定义函数等
#[async_trait]
pub trait ConnectionEvent: Send + Sync {
    async fn invoke(&self, connection: &Connection) -> QuickSqlResult<()>;
}

/// 一个已建立的数据库连接（原生连接池 + 驱动）
#[derive(Debug)]
pub struct Connection {
    driver: Box<dyn Driver>,
    pool: NativePool,
}

impl Connection {
    /// 校验配置、建立连接池并应用会话设置，最后依次调用配置的事件钩子
    pub async fn open(config: ConnectionConfig) -> QuickSqlResult<Self> {
        let driver = create_driver(&config.driver);
        driver.validate(&config)?;

        let dsn = driver.dsn(&config);
        let session = driver.session_commands(&config);
        info!(
            "建立数据库连接: driver={}, host={}, database={}",
            driver.name(),
            config.host.as_deref().unwrap_or("-"),
            config.database.as_deref().unwrap_or("-")
        );
        debug!("会话初始化语句: {:?}", session);

        let pool = native::connect(&config, &dsn, session).await?;
        let connection = Self { driver, pool };

        for event in &config.events.0 {
            event.invoke(&connection).await?;
        }

        info!("数据库连接就绪: driver={}", connection.driver.name());
        Ok(connection)
    }

    /// 接管已有的 SQLite 连接池
    pub fn from_sqlite_pool(pool: sqlx::SqlitePool) -> Self {
        Self {
            driver: Box::new(SqliteDriver),
            pool: NativePool::Sqlite(pool),
        }
    }

    /// 接管已有的 MySQL 连接池
    pub fn from_mysql_pool(pool: sqlx::MySqlPool) -> Self {
        Self {
            driver: Box::new(MySqlDriver),
            pool: NativePool::MySql(pool),
        }
    }

    /// 接管已有的 PostgreSQL 连接池
    pub fn from_postgres_pool(pool: sqlx::PgPool) -> Self {
        Self {
            driver: Box::new(PostgresDriver),
            pool: NativePool::Postgres(pool),
        }
    }

    pub fn driver(&self) -> &dyn Driver {
        self.driver.as_ref()
    }

    pub fn db_type(&self) -> DatabaseType {
        self.driver.db_type()
    }

    pub fn pool(&self) -> &NativePool {
        &self.pool
    }

    /// 在连接池上执行已编译（位置参数）的语句
    pub async fn run(&self, sql: &str, params: &[DataValue]) -> QuickSqlResult<Statement> {
        self.pool.run(sql, params).await
    }

    /// 执行不带参数的原始语句
    pub async fn exec(&self, sql: &str) -> QuickSqlResult<u64> {
        Ok(self.pool.run(sql, &[]).await?.rows_affected())
    }

    /// 开始事务
    pub async fn begin(&self) -> QuickSqlResult<NativeTransaction> {
        self.pool.begin().await.map_err(|e| match e {
            QuickSqlError::QueryError { message } => crate::quick_error!(transaction, message),
            other => other,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{mysql_config, sqlite_config};

    #[test]
    fn test_factory_dispatch() {
        assert_eq!(create_driver(&DatabaseType::PostgreSQL).db_type(), DatabaseType::PostgreSQL);
        assert_eq!(create_driver(&DatabaseType::SqlServer).name(), "SqlServerDriver");
        assert_eq!(create_driver(&DatabaseType::SQLite).name(), "SqliteDriver");
        assert_eq!(create_driver(&DatabaseType::MySQL).name(), "MySqlDriver");
    }

    #[test]
    fn test_missing_host_names_field_and_driver() {
        let mut config = mysql_config("", "app", "root", "pw");
        config.host = None;
        let err = MySqlDriver.validate(&config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("MySqlDriver"));
        assert!(message.contains("host"));
    }

    #[test]
    fn test_missing_database_can_be_opted_out() {
        let mut config = mysql_config("localhost", "", "root", "pw");
        config.database = None;
        assert!(MySqlDriver.validate(&config).is_err());
        config.allow_no_database = true;
        assert!(MySqlDriver.validate(&config).is_ok());
    }

    #[test]
    fn test_session_commands_order() {
        let mut config = mysql_config("localhost", "app", "root", "pw");
        config.schema = Some("app".into());
        config.charset = Some("utf8mb4".into());
        config.timezone = Some("+08:00".into());
        config.attributes.insert("sql_mode".into(), "'STRICT_ALL_TABLES'".into());
        config.commands.push("SET @x = 1".into());

        let commands = MySqlDriver.session_commands(&config);
        assert_eq!(
            commands,
            vec![
                "USE app".to_string(),
                "SET NAMES 'utf8mb4'".to_string(),
                "SET time_zone = '+08:00'".to_string(),
                "SET SESSION sql_mode = 'STRICT_ALL_TABLES'".to_string(),
                "SET @x = 1".to_string(),
            ]
        );
    }

    #[test]
    fn test_sqlite_has_no_session_settings() {
        let mut config = sqlite_config("memory");
        config.schema = Some("main".into());
        config.charset = Some("utf8".into());
        config.timezone = Some("UTC".into());
        assert!(SqliteDriver.session_commands(&config).is_empty());
    }

    #[tokio::test]
    async fn test_open_memory_sqlite_runs_commands_and_events() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct CountTables(Arc<AtomicUsize>);

        #[async_trait]
        impl ConnectionEvent for CountTables {
            async fn invoke(&self, connection: &Connection) -> QuickSqlResult<()> {
                let stmt = connection
                    .run("SELECT name FROM sqlite_master WHERE type = 'table'", &[])
                    .await?;
                self.0.store(stmt.row_count() as usize, Ordering::SeqCst);
                Ok(())
            }
        }

        let seen = Arc::new(AtomicUsize::new(0));
        let config = ConnectionConfig::builder(DatabaseType::SQLite)
            .database("memory")
            .command("CREATE TABLE boot (id INTEGER PRIMARY KEY)")
            .event(Arc::new(CountTables(seen.clone())))
            .build()
            .unwrap();

        let connection = Connection::open(config).await.unwrap();
        assert_eq!(connection.db_type(), DatabaseType::SQLite);
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sqlserver_open_is_unsupported() {
        let config = crate::config::sqlserver_config("db.local", "app", "sa", "pw");
        let err = Connection::open(config).await.unwrap_err();
        assert!(matches!(err, QuickSqlError::UnsupportedDatabase { .. }));
    }
}
