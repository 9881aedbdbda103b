//! 配置模块
//!
//! 单个连接的配置、连接池参数、日志配置，以及可从 TOML 加载的整体配置

use crate::connection::{create_driver, ConnectionEvent};
use crate::error::QuickSqlResult;
use crate::types::DatabaseType;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// 连接池配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// 最小连接数
    pub min_connections: u32,
    /// 最大连接数
    pub max_connections: u32,
    /// 获取连接超时时间（秒）
    pub acquire_timeout: u64,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: u64,
    /// 连接最大生存时间（秒）
    pub max_lifetime: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            max_connections: 10,
            acquire_timeout: 30,
            idle_timeout: 600,
            max_lifetime: 3600,
        }
    }
}

/// SQL Server 连接串方言
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlServerDialect {
    /// `sqlsrv:Server=...;Database=...`
    #[default]
    Sqlsrv,
    /// `dblib:host=...;dbname=...`
    Dblib,
}

/// 连接建立后要调用的事件钩子列表
#[derive(Clone, Default)]
pub struct EventHooks(pub Vec<Arc<dyn ConnectionEvent>>);

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EventHooks({})", self.0.len())
    }
}

/// 单个命名数据库连接的配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// 驱动类型（mysql / pgsql / sqlite / sqlsrv）
    pub driver: DatabaseType,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    /// 数据库名；SQLite 为文件路径或 `memory`
    #[serde(default)]
    pub database: Option<String>,
    /// MySQL 下为 `USE` 的库名，PostgreSQL 下为 search_path
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub charset: Option<String>,
    #[serde(default)]
    pub collation: Option<String>,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(default)]
    pub application_name: Option<String>,
    /// 允许不配置密码
    #[serde(default)]
    pub allow_empty_password: bool,
    /// 允许不指定数据库
    #[serde(default)]
    pub allow_no_database: bool,
    #[serde(default)]
    pub sqlsrv_dialect: SqlServerDialect,
    /// 追加到连接串上的驱动选项
    #[serde(default)]
    pub options: IndexMap<String, String>,
    /// 连接建立后设置的会话属性
    #[serde(default)]
    pub attributes: IndexMap<String, String>,
    /// 连接建立后依次执行的原始SQL
    #[serde(default)]
    pub commands: Vec<String>,
    #[serde(skip)]
    pub events: EventHooks,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl ConnectionConfig {
    /// 创建指定驱动的空配置
    pub fn new(driver: DatabaseType) -> Self {
        Self {
            driver,
            host: None,
            port: None,
            username: None,
            password: None,
            database: None,
            schema: None,
            charset: None,
            collation: None,
            timezone: None,
            application_name: None,
            allow_empty_password: false,
            allow_no_database: false,
            sqlsrv_dialect: SqlServerDialect::default(),
            options: IndexMap::new(),
            attributes: IndexMap::new(),
            commands: Vec::new(),
            events: EventHooks::default(),
            pool: PoolConfig::default(),
        }
    }

    /// 开始构建配置
    pub fn builder(driver: DatabaseType) -> ConnectionConfigBuilder {
        ConnectionConfigBuilder::new(driver)
    }

    /// 按驱动规则校验必填字段
    pub fn validate(&self) -> QuickSqlResult<()> {
        create_driver(&self.driver).validate(self)
    }
}

/// 连接配置构建器
#[derive(Debug, Clone)]
pub struct ConnectionConfigBuilder {
    config: ConnectionConfig,
}

impl ConnectionConfigBuilder {
    pub fn new(driver: DatabaseType) -> Self {
        Self {
            config: ConnectionConfig::new(driver),
        }
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.config.username = Some(username.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.password = Some(password.into());
        self
    }

    pub fn database(mut self, database: impl Into<String>) -> Self {
        self.config.database = Some(database.into());
        self
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.config.schema = Some(schema.into());
        self
    }

    pub fn charset(mut self, charset: impl Into<String>) -> Self {
        self.config.charset = Some(charset.into());
        self
    }

    pub fn collation(mut self, collation: impl Into<String>) -> Self {
        self.config.collation = Some(collation.into());
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.config.timezone = Some(timezone.into());
        self
    }

    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.config.application_name = Some(name.into());
        self
    }

    pub fn allow_empty_password(mut self, allow: bool) -> Self {
        self.config.allow_empty_password = allow;
        self
    }

    pub fn allow_no_database(mut self, allow: bool) -> Self {
        self.config.allow_no_database = allow;
        self
    }

    pub fn sqlsrv_dialect(mut self, dialect: SqlServerDialect) -> Self {
        self.config.sqlsrv_dialect = dialect;
        self
    }

    pub fn option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.options.insert(key.into(), value.into());
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.attributes.insert(key.into(), value.into());
        self
    }

    pub fn command(mut self, sql: impl Into<String>) -> Self {
        self.config.commands.push(sql.into());
        self
    }

    /// 注册连接建立后调用的事件钩子
    pub fn event(mut self, event: Arc<dyn ConnectionEvent>) -> Self {
        self.config.events.0.push(event);
        self
    }

    pub fn pool(mut self, pool: PoolConfig) -> Self {
        self.config.pool = pool;
        self
    }

    /// 构建并校验配置
    pub fn build(self) -> QuickSqlResult<ConnectionConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// 构建但不校验，校验推迟到首次连接
    pub fn build_unchecked(self) -> ConnectionConfig {
        self.config
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 是否启用终端日志
    pub enabled: bool,
    /// 日志级别
    pub level: LogLevel,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: LogLevel::Info,
        }
    }
}

/// 整体配置：连接注册表、默认连接名和日志
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 默认连接名；缺省时取第一个连接
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub connections: IndexMap<String, ConnectionConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl DatabaseConfig {
    /// 从 TOML 文本加载
    pub fn from_toml_str(content: &str) -> QuickSqlResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> QuickSqlResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 默认连接名
    pub fn default_name(&self) -> Option<String> {
        self.default
            .clone()
            .or_else(|| self.connections.keys().next().cloned())
    }
}

/// SQLite 配置；`memory` 表示内存数据库
pub fn sqlite_config(database: impl Into<String>) -> ConnectionConfig {
    ConnectionConfig::builder(DatabaseType::SQLite)
        .database(database)
        .build_unchecked()
}

/// MySQL 配置
pub fn mysql_config(
    host: impl Into<String>,
    database: impl Into<String>,
    username: impl Into<String>,
    password: impl Into<String>,
) -> ConnectionConfig {
    ConnectionConfig::builder(DatabaseType::MySQL)
        .host(host)
        .database(database)
        .username(username)
        .password(password)
        .build_unchecked()
}

/// PostgreSQL 配置
pub fn postgres_config(
    host: impl Into<String>,
    database: impl Into<String>,
    username: impl Into<String>,
    password: impl Into<String>,
) -> ConnectionConfig {
    ConnectionConfig::builder(DatabaseType::PostgreSQL)
        .host(host)
        .database(database)
        .username(username)
        .password(password)
        .build_unchecked()
}

/// SQL Server 配置
pub fn sqlserver_config(
    host: impl Into<String>,
    database: impl Into<String>,
    username: impl Into<String>,
    password: impl Into<String>,
) -> ConnectionConfig {
    ConnectionConfig::builder(DatabaseType::SqlServer)
        .host(host)
        .database(database)
        .username(username)
        .password(password)
        .build_unchecked()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_toml() {
        let config = DatabaseConfig::from_toml_str(
            r#"
            default = "main"

            [logging]
            level = "debug"

            [connections.main]
            driver = "pgsql"
            host = "db.local"
            username = "app"
            password = "secret"
            database = "shop"
            schema = "public"
            commands = ["SET statement_timeout = 5000"]

            [connections.main.pool]
            max_connections = 4

            [connections.cache]
            driver = "sqlite"
            database = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.default_name().as_deref(), Some("main"));
        assert_eq!(config.logging.level, LogLevel::Debug);
        let main = &config.connections["main"];
        assert_eq!(main.driver, DatabaseType::PostgreSQL);
        assert_eq!(main.pool.max_connections, 4);
        assert_eq!(main.pool.min_connections, 1);
        assert_eq!(main.commands.len(), 1);
        assert_eq!(config.connections["cache"].driver, DatabaseType::SQLite);
    }

    #[test]
    fn test_builder_validates() {
        let err = ConnectionConfig::builder(DatabaseType::MySQL)
            .host("localhost")
            .password("x")
            .database("app")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("username"));

        let ok = ConnectionConfig::builder(DatabaseType::MySQL)
            .host("localhost")
            .username("root")
            .allow_empty_password(true)
            .database("app")
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_default_name_falls_back_to_first() {
        let mut config = DatabaseConfig::default();
        config.connections.insert("a".into(), sqlite_config("memory"));
        config.connections.insert("b".into(), sqlite_config("memory"));
        assert_eq!(config.default_name().as_deref(), Some("a"));
    }
}
