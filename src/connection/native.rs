//! 原生连接池与事务
//!
//! 基于 sqlx 的三种连接池，负责参数绑定、执行和结果行解码

use super::sqlite::SqliteDriver;
use crate::config::{ConnectionConfig, PoolConfig};
use crate::error::{QuickSqlError, QuickSqlResult};
use crate::statement::{is_read_statement, Statement};
use crate::types::{DataValue, DatabaseType, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use futures::TryStreamExt;
use rat_logger::{debug, warn};
use sqlx::mysql::{MySql, MySqlConnectOptions, MySqlRow};
use sqlx::pool::PoolOptions;
use sqlx::postgres::{PgConnectOptions, PgRow, Postgres};
use sqlx::sqlite::{Sqlite, SqliteConnectOptions, SqliteRow};
use sqlx::{Column, Executor, Row, ValueRef};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// 原生数据库连接池
#[derive(Debug, Clone)]
pub enum NativePool {
    MySql(sqlx::MySqlPool),
    Postgres(sqlx::PgPool),
    Sqlite(sqlx::SqlitePool),
}

/// 原生事务，持有一个从池中取出的连接
#[derive(Debug)]
pub enum NativeTransaction {
    MySql(sqlx::Transaction<'static, MySql>),
    Postgres(sqlx::Transaction<'static, Postgres>),
    Sqlite(sqlx::Transaction<'static, Sqlite>),
}

fn connection_error(e: sqlx::Error) -> QuickSqlError {
    crate::quick_error!(connection, e.to_string())
}

fn pool_options<DB: sqlx::Database>(config: &PoolConfig) -> PoolOptions<DB> {
    PoolOptions::<DB>::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections.max(1))
        .acquire_timeout(Duration::from_secs(config.acquire_timeout))
        .idle_timeout(Some(Duration::from_secs(config.idle_timeout)))
        .max_lifetime(Some(Duration::from_secs(config.max_lifetime)))
}

/// 建立原生连接池，每个新连接建立后按顺序执行会话语句
pub(super) async fn connect(
    config: &ConnectionConfig,
    dsn: &str,
    session: Vec<String>,
) -> QuickSqlResult<NativePool> {
    let session = Arc::new(session);

    match config.driver {
        DatabaseType::SQLite => {
            let options = SqliteConnectOptions::from_str(dsn).map_err(connection_error)?;
            let mut pool = pool_options::<Sqlite>(&config.pool);
            if SqliteDriver::is_memory(config) {
                // 内存库随连接销毁，只能保留唯一一个常驻连接
                pool = pool
                    .min_connections(1)
                    .max_connections(1)
                    .idle_timeout(None::<Duration>)
                    .max_lifetime(None::<Duration>);
            }
            let pool = pool
                .after_connect(move |conn, _meta| {
                    let session = Arc::clone(&session);
                    Box::pin(async move {
                        for sql in session.iter() {
                            (&mut *conn).execute(sql.as_str()).await?;
                        }
                        Ok(())
                    })
                })
                .connect_with(options)
                .await
                .map_err(connection_error)?;
            Ok(NativePool::Sqlite(pool))
        }
        DatabaseType::MySQL => {
            let options = MySqlConnectOptions::from_str(dsn).map_err(connection_error)?;
            let pool = pool_options::<MySql>(&config.pool)
                .after_connect(move |conn, _meta| {
                    let session = Arc::clone(&session);
                    Box::pin(async move {
                        for sql in session.iter() {
                            (&mut *conn).execute(sql.as_str()).await?;
                        }
                        Ok(())
                    })
                })
                .connect_with(options)
                .await
                .map_err(connection_error)?;
            Ok(NativePool::MySql(pool))
        }
        DatabaseType::PostgreSQL => {
            let options = PgConnectOptions::from_str(dsn).map_err(connection_error)?;
            let pool = pool_options::<Postgres>(&config.pool)
                .after_connect(move |conn, _meta| {
                    let session = Arc::clone(&session);
                    Box::pin(async move {
                        for sql in session.iter() {
                            (&mut *conn).execute(sql.as_str()).await?;
                        }
                        Ok(())
                    })
                })
                .connect_with(options)
                .await
                .map_err(connection_error)?;
            Ok(NativePool::Postgres(pool))
        }
        DatabaseType::SqlServer => Err(crate::quick_error!(
            unsupported_db,
            "sqlsrv（当前构建未包含 SQL Server 原生驱动）"
        )),
    }
}

impl NativePool {
    /// 执行语句并收集结果
    pub async fn run(&self, sql: &str, params: &[DataValue]) -> QuickSqlResult<Statement> {
        match self {
            NativePool::Sqlite(pool) => run_sqlite(pool, sql, params).await,
            NativePool::MySql(pool) => run_mysql(pool, sql, params).await,
            NativePool::Postgres(pool) => run_postgres(pool, sql, params).await,
        }
    }

    /// 开始事务
    pub async fn begin(&self) -> QuickSqlResult<NativeTransaction> {
        Ok(match self {
            NativePool::Sqlite(pool) => NativeTransaction::Sqlite(pool.begin().await?),
            NativePool::MySql(pool) => NativeTransaction::MySql(pool.begin().await?),
            NativePool::Postgres(pool) => NativeTransaction::Postgres(pool.begin().await?),
        })
    }
}

impl NativeTransaction {
    /// 在事务连接上执行语句
    pub async fn run(&mut self, sql: &str, params: &[DataValue]) -> QuickSqlResult<Statement> {
        match self {
            NativeTransaction::Sqlite(tx) => run_sqlite(&mut **tx, sql, params).await,
            NativeTransaction::MySql(tx) => run_mysql(&mut **tx, sql, params).await,
            NativeTransaction::Postgres(tx) => run_postgres(&mut **tx, sql, params).await,
        }
    }

    pub async fn commit(self) -> QuickSqlResult<()> {
        let result = match self {
            NativeTransaction::Sqlite(tx) => tx.commit().await,
            NativeTransaction::MySql(tx) => tx.commit().await,
            NativeTransaction::Postgres(tx) => tx.commit().await,
        };
        result.map_err(|e| crate::quick_error!(transaction, format!("提交失败: {}", e)))
    }

    pub async fn rollback(self) -> QuickSqlResult<()> {
        let result = match self {
            NativeTransaction::Sqlite(tx) => tx.rollback().await,
            NativeTransaction::MySql(tx) => tx.rollback().await,
            NativeTransaction::Postgres(tx) => tx.rollback().await,
        };
        result.map_err(|e| crate::quick_error!(transaction, format!("回滚失败: {}", e)))
    }
}

async fn run_sqlite<'c, E>(executor: E, sql: &str, params: &[DataValue]) -> QuickSqlResult<Statement>
where
    E: Executor<'c, Database = Sqlite>,
{
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            DataValue::Null => query.bind(Option::<String>::None),
            DataValue::Bool(b) => query.bind(*b),
            DataValue::Int(i) => query.bind(*i),
            DataValue::Float(f) => query.bind(*f),
            DataValue::String(s) => query.bind(s.clone()),
            DataValue::Bytes(bytes) => query.bind(bytes.clone()),
            DataValue::DateTime(dt) => query.bind(dt.to_rfc3339()),
            DataValue::Uuid(uuid) => query.bind(uuid.to_string()),
            DataValue::Json(json) => query.bind(json.to_string()),
        };
    }

    let read = is_read_statement(sql);
    let mut rows = Vec::new();
    let mut rows_affected = 0;
    let mut last_insert_id = None;
    let mut stream = query.fetch_many(executor);
    while let Some(item) = stream.try_next().await? {
        match item {
            // 读语句的计数是上一条写语句留下的
            sqlx::Either::Left(_) if read => {}
            sqlx::Either::Left(result) => {
                rows_affected += result.rows_affected();
                let id = result.last_insert_rowid();
                if id > 0 {
                    last_insert_id = Some(id);
                }
            }
            sqlx::Either::Right(row) => rows.push(sqlite_row_to_record(&row)?),
        }
    }
    Ok(Statement::new(rows, rows_affected, last_insert_id))
}

async fn run_mysql<'c, E>(executor: E, sql: &str, params: &[DataValue]) -> QuickSqlResult<Statement>
where
    E: Executor<'c, Database = MySql>,
{
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            DataValue::Null => query.bind(Option::<String>::None),
            DataValue::Bool(b) => query.bind(*b),
            DataValue::Int(i) => query.bind(*i),
            DataValue::Float(f) => query.bind(*f),
            DataValue::String(s) => query.bind(s.clone()),
            DataValue::Bytes(bytes) => query.bind(bytes.clone()),
            DataValue::DateTime(dt) => query.bind(*dt),
            DataValue::Uuid(uuid) => query.bind(uuid.to_string()),
            DataValue::Json(json) => query.bind(sqlx::types::Json(json.clone())),
        };
    }

    let mut rows = Vec::new();
    let mut rows_affected = 0;
    let mut last_insert_id = None;
    let mut stream = query.fetch_many(executor);
    while let Some(item) = stream.try_next().await? {
        match item {
            sqlx::Either::Left(result) => {
                rows_affected += result.rows_affected();
                let id = result.last_insert_id();
                if id > 0 {
                    last_insert_id = Some(id as i64);
                }
            }
            sqlx::Either::Right(row) => rows.push(mysql_row_to_record(&row)?),
        }
    }
    Ok(Statement::new(rows, rows_affected, last_insert_id))
}

async fn run_postgres<'c, E>(executor: E, sql: &str, params: &[DataValue]) -> QuickSqlResult<Statement>
where
    E: Executor<'c, Database = Postgres>,
{
    let mut query = sqlx::query(sql);
    for param in params {
        query = match param {
            DataValue::Null => query.bind(Option::<String>::None),
            DataValue::Bool(b) => query.bind(*b),
            DataValue::Int(i) => query.bind(*i),
            DataValue::Float(f) => query.bind(*f),
            DataValue::String(s) => query.bind(s.clone()),
            DataValue::Bytes(bytes) => query.bind(bytes.clone()),
            DataValue::DateTime(dt) => query.bind(*dt),
            DataValue::Uuid(uuid) => query.bind(*uuid),
            DataValue::Json(json) => query.bind(sqlx::types::Json(json.clone())),
        };
    }

    let mut rows = Vec::new();
    let mut rows_affected = 0;
    let mut stream = query.fetch_many(executor);
    while let Some(item) = stream.try_next().await? {
        match item {
            sqlx::Either::Left(result) => rows_affected += result.rows_affected(),
            sqlx::Either::Right(row) => rows.push(postgres_row_to_record(&row)?),
        }
    }
    // PostgreSQL 没有 last_insert_id，自增主键通过 RETURNING 取回
    Ok(Statement::new(rows, rows_affected, None))
}

/// SQLite 按存储类型依次尝试解码
fn sqlite_row_to_record(row: &SqliteRow) -> QuickSqlResult<Record> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let value = if row.try_get_raw(index)?.is_null() {
            DataValue::Null
        } else if let Ok(i) = row.try_get::<i64, _>(index) {
            DataValue::Int(i)
        } else if let Ok(f) = row.try_get::<f64, _>(index) {
            DataValue::Float(f)
        } else if let Ok(s) = row.try_get::<String, _>(index) {
            DataValue::String(s)
        } else if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
            DataValue::Bytes(bytes)
        } else {
            warn!("无法解码SQLite列: {}", name);
            DataValue::Null
        };
        record.insert(name, value);
    }
    Ok(record)
}

fn mysql_row_to_record(row: &MySqlRow) -> QuickSqlResult<Record> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let value = if row.try_get_raw(index)?.is_null() {
            DataValue::Null
        } else if let Ok(i) = row.try_get::<i64, _>(index) {
            DataValue::Int(i)
        } else if let Ok(u) = row.try_get::<u64, _>(index) {
            match i64::try_from(u) {
                Ok(i) => DataValue::Int(i),
                Err(_) => DataValue::String(u.to_string()),
            }
        } else if let Ok(b) = row.try_get::<bool, _>(index) {
            DataValue::Bool(b)
        } else if let Ok(f) = row.try_get::<f64, _>(index) {
            DataValue::Float(f)
        } else if let Ok(f) = row.try_get::<f32, _>(index) {
            DataValue::Float(f as f64)
        } else if let Ok(s) = row.try_get::<String, _>(index) {
            DataValue::String(s)
        } else if let Ok(dt) = row.try_get::<DateTime<Utc>, _>(index) {
            DataValue::DateTime(dt)
        } else if let Ok(dt) = row.try_get::<NaiveDateTime, _>(index) {
            DataValue::DateTime(dt.and_utc())
        } else if let Ok(d) = row.try_get::<NaiveDate, _>(index) {
            DataValue::String(d.to_string())
        } else if let Ok(t) = row.try_get::<NaiveTime, _>(index) {
            DataValue::String(t.to_string())
        } else if let Ok(json) = row.try_get::<serde_json::Value, _>(index) {
            DataValue::Json(json)
        } else if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
            DataValue::Bytes(bytes)
        } else {
            warn!("无法解码MySQL列: {}", name);
            DataValue::Null
        };
        record.insert(name, value);
    }
    Ok(record)
}

fn postgres_row_to_record(row: &PgRow) -> QuickSqlResult<Record> {
    let mut record = Record::new();
    for (index, column) in row.columns().iter().enumerate() {
        let name = column.name().to_string();
        let value = if row.try_get_raw(index)?.is_null() {
            DataValue::Null
        } else if let Ok(i) = row.try_get::<i64, _>(index) {
            DataValue::Int(i)
        } else if let Ok(i) = row.try_get::<i32, _>(index) {
            DataValue::Int(i as i64)
        } else if let Ok(i) = row.try_get::<i16, _>(index) {
            DataValue::Int(i as i64)
        } else if let Ok(f) = row.try_get::<f64, _>(index) {
            DataValue::Float(f)
        } else if let Ok(f) = row.try_get::<f32, _>(index) {
            DataValue::Float(f as f64)
        } else if let Ok(b) = row.try_get::<bool, _>(index) {
            DataValue::Bool(b)
        } else if let Ok(s) = row.try_get::<String, _>(index) {
            DataValue::String(s)
        } else if let Ok(dt) = row.try_get::<DateTime<Utc>, _>(index) {
            DataValue::DateTime(dt)
        } else if let Ok(dt) = row.try_get::<NaiveDateTime, _>(index) {
            DataValue::DateTime(dt.and_utc())
        } else if let Ok(d) = row.try_get::<NaiveDate, _>(index) {
            DataValue::String(d.to_string())
        } else if let Ok(uuid) = row.try_get::<uuid::Uuid, _>(index) {
            DataValue::Uuid(uuid)
        } else if let Ok(json) = row.try_get::<serde_json::Value, _>(index) {
            DataValue::Json(json)
        } else if let Ok(bytes) = row.try_get::<Vec<u8>, _>(index) {
            DataValue::Bytes(bytes)
        } else {
            debug!("无法解码PostgreSQL列: {}", name);
            DataValue::Null
        };
        record.insert(name, value);
    }
    Ok(record)
}
