//! rat_quicksql - 轻量的跨数据库SQL访问层
//!
//! 支持 SQLite、PostgreSQL、MySQL（SQL Server 提供连接串与方言）。
//! 连接按名称注册、首次使用时建立；提供增删改查、单层事务、表事件和链式查询构建器

// 导出所有公共模块
pub mod error;
pub mod types;
pub mod config;
pub mod connection;
pub mod statement;
pub mod events;
pub mod database;
pub mod query;
pub mod model;

// 重新导出常用类型和函数
pub use error::{ErrorBuilder, QuickSqlError, QuickSqlResult};
pub use types::*;
pub use config::{
    ConnectionConfig, ConnectionConfigBuilder, DatabaseConfig, LogLevel, LoggingConfig, PoolConfig,
    SqlServerDialect, mysql_config, postgres_config, sqlite_config, sqlserver_config,
};
pub use connection::{
    Connection, ConnectionEvent, Driver, MySqlDriver, PostgresDriver, SqlServerDriver, SqliteDriver,
    create_driver,
};
pub use statement::{BoundParam, ParamType, Statement, bind_values, compile};
pub use events::{EventBus, Listener, TableEvent};
pub use database::Database;
pub use query::{Conjunction, Filter, JoinType, Query, QueryBuilder, QueryOperator, SortDirection};
pub use model::{FieldDefinition, FieldType, Model, ModelMeta, ModelQuery, Repository};

use rat_logger::handler::term::TermConfig;
use rat_logger::{LevelFilter, LoggerBuilder, info};

/// 初始化rat_quicksql库
///
/// 按默认日志配置初始化终端日志
pub fn init() -> QuickSqlResult<()> {
    init_logging(&LoggingConfig::default())?;
    info!("rat_quicksql库已初始化");
    Ok(())
}

/// 按配置初始化日志系统；`enabled` 为 false 时不做任何事
pub fn init_logging(config: &LoggingConfig) -> QuickSqlResult<()> {
    if !config.enabled {
        return Ok(());
    }
    let level = match config.level {
        LogLevel::Error => LevelFilter::Error,
        LogLevel::Warn => LevelFilter::Warn,
        LogLevel::Info => LevelFilter::Info,
        LogLevel::Debug => LevelFilter::Debug,
        LogLevel::Trace => LevelFilter::Trace,
    };
    LoggerBuilder::new()
        .with_level(level)
        .add_terminal_with_config(TermConfig::default())
        .init()
        .map_err(|e| quick_error!(config, format!("日志初始化失败: {}", e)))?;
    Ok(())
}

/// 库版本信息
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// 库名称
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// 获取库信息
pub fn get_info() -> String {
    format!("{} v{}", NAME, VERSION)
}
