//! SQLite 驱动
//!
//! 没有 schema、编码和时区设置；`memory` 与 `:memory:` 均表示内存数据库

use super::{query_string, Driver};
use crate::config::ConnectionConfig;
use crate::error::QuickSqlResult;
use crate::types::DatabaseType;
use std::path::Path;

/// SQLite 驱动
#[derive(Debug, Clone, Copy)]
pub struct SqliteDriver;

impl SqliteDriver {
    /// 是否为内存数据库
    pub fn is_memory(config: &ConnectionConfig) -> bool {
        matches!(
            config.database.as_deref().map(str::trim),
            Some("memory") | Some(":memory:")
        )
    }
}

impl Driver for SqliteDriver {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::SQLite
    }

    fn name(&self) -> &'static str {
        "SqliteDriver"
    }

    fn validate(&self, config: &ConnectionConfig) -> QuickSqlResult<()> {
        let database = match config.database.as_deref().map(str::trim) {
            Some(database) if !database.is_empty() => database,
            _ => {
                return Err(crate::quick_error!(
                    config,
                    format!("{} 缺少必填配置项: database", self.name())
                ));
            }
        };
        if !Self::is_memory(config) && !Path::new(database).exists() {
            return Err(crate::quick_error!(
                config,
                format!("{} 数据库文件不存在: {}", self.name(), database)
            ));
        }
        Ok(())
    }

    fn dsn(&self, config: &ConnectionConfig) -> String {
        let options: Vec<(String, String)> = config
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if Self::is_memory(config) {
            return format!("sqlite::memory:{}", query_string(&options));
        }
        format!(
            "sqlite:{}{}",
            config.database.as_deref().unwrap_or_default(),
            query_string(&options)
        )
    }

    fn attribute_command(&self, key: &str, value: &str) -> String {
        format!("PRAGMA {} = {}", key, value)
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>, _has_order: bool) -> Option<String> {
        match (limit, offset) {
            (Some(limit), offset) => Some(format!("LIMIT {} OFFSET {}", limit, offset.unwrap_or(0))),
            (None, Some(offset)) => Some(format!("LIMIT -1 OFFSET {}", offset)),
            (None, None) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sqlite_config;

    #[test]
    fn test_memory_dsn_skips_file_check() {
        let config = sqlite_config("memory");
        assert!(SqliteDriver.validate(&config).is_ok());
        assert_eq!(SqliteDriver.dsn(&config), "sqlite::memory:");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let config = sqlite_config("/definitely/not/here/app.db");
        let err = SqliteDriver.validate(&config).unwrap_err();
        assert!(matches!(err, crate::QuickSqlError::ConfigError { .. }));
        assert!(err.to_string().contains("/definitely/not/here/app.db"));
    }

    #[test]
    fn test_file_dsn() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_string_lossy().to_string();
        let config = sqlite_config(path.clone());
        assert!(SqliteDriver.validate(&config).is_ok());
        assert_eq!(SqliteDriver.dsn(&config), format!("sqlite:{}", path));
    }

    #[test]
    fn test_attribute_is_pragma() {
        assert_eq!(SqliteDriver.attribute_command("foreign_keys", "ON"), "PRAGMA foreign_keys = ON");
    }
}
