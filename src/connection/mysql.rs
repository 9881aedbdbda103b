//! MySQL 驱动

use super::{query_string, Driver};
use crate::config::ConnectionConfig;
use crate::types::DatabaseType;

/// MySQL 驱动
#[derive(Debug, Clone, Copy)]
pub struct MySqlDriver;

/// 无 LIMIT 时仍需 OFFSET 的最大行数
const MYSQL_MAX_ROWS: &str = "18446744073709551615";

impl Driver for MySqlDriver {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::MySQL
    }

    fn name(&self) -> &'static str {
        "MySqlDriver"
    }

    fn default_port(&self) -> Option<u16> {
        Some(3306)
    }

    fn dsn(&self, config: &ConnectionConfig) -> String {
        let host = config.host.as_deref().unwrap_or("localhost");
        let port = config.port.or(self.default_port()).unwrap_or(3306);
        let database = config
            .database
            .as_deref()
            .map(|d| format!("/{}", d))
            .unwrap_or_default();
        let options: Vec<(String, String)> = config
            .options
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        format!(
            "mysql://{}@{}:{}{}{}",
            credentials(config),
            host,
            port,
            database,
            query_string(&options)
        )
    }

    fn schema_command(&self, config: &ConnectionConfig) -> Option<String> {
        config.schema.as_ref().map(|schema| format!("USE {}", schema))
    }

    fn encoding_command(&self, config: &ConnectionConfig) -> Option<String> {
        let charset = config.charset.as_ref()?;
        Some(match &config.collation {
            Some(collation) => format!("SET NAMES '{}' COLLATE '{}'", charset, collation),
            None => format!("SET NAMES '{}'", charset),
        })
    }

    fn timezone_command(&self, config: &ConnectionConfig) -> Option<String> {
        config
            .timezone
            .as_ref()
            .map(|tz| format!("SET time_zone = '{}'", tz))
    }

    fn attribute_command(&self, key: &str, value: &str) -> String {
        format!("SET SESSION {} = {}", key, value)
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>, _has_order: bool) -> Option<String> {
        match (limit, offset) {
            (Some(limit), offset) => Some(format!("LIMIT {} OFFSET {}", limit, offset.unwrap_or(0))),
            (None, Some(offset)) => Some(format!("LIMIT {} OFFSET {}", MYSQL_MAX_ROWS, offset)),
            (None, None) => None,
        }
    }
}

/// `user[:password]`，两者均做URL编码
pub(super) fn credentials(config: &ConnectionConfig) -> String {
    let user = urlencoding::encode(config.username.as_deref().unwrap_or("")).into_owned();
    match config.password.as_deref() {
        Some(password) if !password.is_empty() => {
            format!("{}:{}", user, urlencoding::encode(password))
        }
        _ => user,
    }
}
