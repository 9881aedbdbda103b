//! SQL Server 驱动
//!
//! 支持 `sqlsrv` 与 `dblib` 两种连接串方言；分页使用 OFFSET ... FETCH

use super::Driver;
use crate::config::{ConnectionConfig, SqlServerDialect};
use crate::types::DatabaseType;

/// SQL Server 驱动
#[derive(Debug, Clone, Copy)]
pub struct SqlServerDriver;

impl Driver for SqlServerDriver {
    fn db_type(&self) -> DatabaseType {
        DatabaseType::SqlServer
    }

    fn name(&self) -> &'static str {
        "SqlServerDriver"
    }

    fn default_port(&self) -> Option<u16> {
        Some(1433)
    }

    fn dsn(&self, config: &ConnectionConfig) -> String {
        let host = config.host.as_deref().unwrap_or("localhost");
        let port = config.port.or(self.default_port()).unwrap_or(1433);
        let mut parts: Vec<String> = Vec::new();

        match config.sqlsrv_dialect {
            SqlServerDialect::Sqlsrv => {
                parts.push(format!("Server={},{}", host, port));
                if let Some(database) = &config.database {
                    parts.push(format!("Database={}", database));
                }
                if let Some(name) = &config.application_name {
                    parts.push(format!("APP={}", name));
                }
            }
            SqlServerDialect::Dblib => {
                parts.push(format!("host={}:{}", host, port));
                if let Some(database) = &config.database {
                    parts.push(format!("dbname={}", database));
                }
                if let Some(charset) = &config.charset {
                    parts.push(format!("charset={}", charset));
                }
                if let Some(name) = &config.application_name {
                    parts.push(format!("appname={}", name));
                }
            }
        }
        for (k, v) in &config.options {
            parts.push(format!("{}={}", k, v));
        }

        let prefix = match config.sqlsrv_dialect {
            SqlServerDialect::Sqlsrv => "sqlsrv",
            SqlServerDialect::Dblib => "dblib",
        };
        format!("{}:{}", prefix, parts.join(";"))
    }

    fn attribute_command(&self, key: &str, value: &str) -> String {
        format!("SET {} {}", key, value)
    }

    fn limit_clause(&self, limit: Option<u64>, offset: Option<u64>, has_order: bool) -> Option<String> {
        if limit.is_none() && offset.is_none() {
            return None;
        }
        let mut clause = String::new();
        // OFFSET ... FETCH 必须跟在 ORDER BY 之后
        if !has_order {
            clause.push_str("ORDER BY (SELECT NULL) ");
        }
        clause.push_str(&format!("OFFSET {} ROWS", offset.unwrap_or(0)));
        if let Some(limit) = limit {
            clause.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
        }
        Some(clause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::sqlserver_config;

    #[test]
    fn test_sqlsrv_dsn() {
        let mut config = sqlserver_config("mssql.local", "erp", "sa", "pw");
        config.application_name = Some("billing".into());
        assert_eq!(
            SqlServerDriver.dsn(&config),
            "sqlsrv:Server=mssql.local,1433;Database=erp;APP=billing"
        );
    }

    #[test]
    fn test_dblib_dsn() {
        let mut config = sqlserver_config("mssql.local", "erp", "sa", "pw");
        config.sqlsrv_dialect = SqlServerDialect::Dblib;
        config.port = Some(1444);
        config.charset = Some("UTF-8".into());
        assert_eq!(
            SqlServerDriver.dsn(&config),
            "dblib:host=mssql.local:1444;dbname=erp;charset=UTF-8"
        );
    }

    #[test]
    fn test_offset_fetch() {
        assert_eq!(
            SqlServerDriver.limit_clause(Some(10), Some(20), true).unwrap(),
            "OFFSET 20 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(
            SqlServerDriver.limit_clause(Some(5), None, false).unwrap(),
            "ORDER BY (SELECT NULL) OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"
        );
    }
}
