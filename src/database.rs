//! 数据库门面
//!
//! 管理命名连接注册表（首次使用时建立连接并缓存），提供增删改查、单层事务和表事件。
//!
//! 事务回调拿到的是绑定了该事务的 `Database` 句柄，只有经由这个句柄执行的语句才会进入事务；
//! 原句柄和其他调用方的语句始终走连接池

use crate::config::{ConnectionConfig, DatabaseConfig};
use crate::connection::{Connection, NativeTransaction};
use crate::error::QuickSqlResult;
use crate::events::{EventBus, TableEvent};
use crate::quick_error;
use crate::statement::{compile, param_name, rename_placeholder, Statement};
use crate::types::{Bindings, DataValue, DatabaseType, IntoBindings, Record};
use dashmap::DashMap;
use futures::future::BoxFuture;
use parking_lot::RwLock;
use rand::distributions::Alphanumeric;
use rand::Rng;
use rat_logger::{debug, error, info, warn};
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// 注册表中的一项：配置和懒加载的连接
#[derive(Debug)]
struct ConnectionSlot {
    config: Option<ConnectionConfig>,
    cell: OnceCell<Arc<Connection>>,
}

/// 连接注册表，同一个门面派生出的事务句柄共享它
#[derive(Debug)]
struct Registry {
    connections: DashMap<String, Arc<ConnectionSlot>>,
    default_driver: RwLock<String>,
}

/// 事务句柄持有的事务
#[derive(Debug)]
struct TransactionScope {
    connection: String,
    native: Mutex<NativeTransaction>,
}

/// 数据库门面
#[derive(Debug)]
pub struct Database {
    registry: Arc<Registry>,
    events: Arc<EventBus>,
    scope: Option<TransactionScope>,
}

impl Database {
    /// 创建空注册表，`default_driver` 为默认连接名
    pub fn new(default_driver: impl Into<String>) -> Self {
        Self::with_events(default_driver, Arc::new(EventBus::new()))
    }

    /// 使用外部传入的事件总线创建
    pub fn with_events(default_driver: impl Into<String>, events: Arc<EventBus>) -> Self {
        Self {
            registry: Arc::new(Registry {
                connections: DashMap::new(),
                default_driver: RwLock::new(default_driver.into()),
            }),
            events,
            scope: None,
        }
    }

    /// 从整体配置创建，注册其中的全部连接
    pub fn from_config(config: &DatabaseConfig) -> QuickSqlResult<Self> {
        let default = config
            .default_name()
            .ok_or_else(|| quick_error!(config, "配置中没有任何数据库连接"))?;
        let database = Self::new(default);
        for (name, connection) in &config.connections {
            database.add_connection(name.clone(), connection.clone());
        }
        Ok(database)
    }

    /// 注册或覆盖一个连接配置；配置在首次连接时才校验
    pub fn add_connection(&self, name: impl Into<String>, config: ConnectionConfig) {
        let name = name.into();
        debug!("注册数据库连接: {} ({})", name, config.driver);
        self.registry.connections.insert(
            name,
            Arc::new(ConnectionSlot {
                config: Some(config),
                cell: OnceCell::new(),
            }),
        );
    }

    /// 注册一个已经建立的连接
    pub fn add_native(&self, name: impl Into<String>, connection: Connection) {
        self.registry.connections.insert(
            name.into(),
            Arc::new(ConnectionSlot {
                config: None,
                cell: OnceCell::new_with(Some(Arc::new(connection))),
            }),
        );
    }

    /// 默认连接名
    pub fn default_driver(&self) -> String {
        self.registry.default_driver.read().clone()
    }

    /// 切换默认连接
    pub fn set_default_driver(&self, name: impl Into<String>) {
        *self.registry.default_driver.write() = name.into();
    }

    /// 已注册的连接名
    pub fn driver_names(&self) -> Vec<String> {
        self.registry.connections.iter().map(|e| e.key().clone()).collect()
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    fn resolve_name(&self, name: Option<&str>) -> String {
        match name {
            Some(name) => name.to_string(),
            None => self.default_driver(),
        }
    }

    /// 获取连接；首次调用时按配置建立连接并缓存，之后的调用返回同一个连接
    pub async fn connection(&self, name: Option<&str>) -> QuickSqlResult<Arc<Connection>> {
        let name = self.resolve_name(name);
        let slot = self
            .registry
            .connections
            .get(&name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| quick_error!(alias_not_found, name.clone()))?;

        let connection = slot
            .cell
            .get_or_try_init(|| async {
                let config = slot
                    .config
                    .clone()
                    .ok_or_else(|| quick_error!(config, format!("连接 '{}' 没有可用配置", name)))?;
                Connection::open(config).await.map(Arc::new)
            })
            .await?;
        Ok(connection.clone())
    }

    /// 连接的数据库类型
    pub async fn db_type(&self, name: Option<&str>) -> QuickSqlResult<DatabaseType> {
        Ok(self.connection(name).await?.db_type())
    }

    /// 编译并执行语句；本句柄的事务属于该连接时在事务上执行
    async fn execute(&self, name: Option<&str>, sql: &str, bindings: &Bindings) -> QuickSqlResult<Statement> {
        let name = self.resolve_name(name);
        let connection = self.connection(Some(&name)).await?;
        let (compiled, params) = compile(sql, bindings, connection.driver())?;
        debug!("执行SQL[{}]: {} 参数: {:?}", name, compiled, params);

        if let Some(scope) = &self.scope {
            if scope.connection == name {
                return scope.native.lock().await.run(&compiled, &params).await;
            }
        }
        connection.run(&compiled, &params).await
    }

    /// 写入之后的事件只做通知，监听器出错时记录日志，不影响已完成的写入
    fn notify(&self, table: &str, event: &mut TableEvent) {
        if let Err(e) = self.events.emit(table, event) {
            warn!("事件监听器执行失败: {}, 错误: {}", event.name(table), e);
        }
    }

    /// 执行任意SQL，返回语句结果
    pub async fn query(&self, sql: &str, bindings: impl IntoBindings) -> QuickSqlResult<Statement> {
        self.query_on(None, sql, bindings).await
    }

    pub async fn query_on(
        &self,
        name: Option<&str>,
        sql: &str,
        bindings: impl IntoBindings,
    ) -> QuickSqlResult<Statement> {
        self.execute(name, sql, &bindings.into_bindings()).await
    }

    /// 读取表中满足条件的行
    pub async fn read(&self, table: &str, conditions: &str, bindings: impl IntoBindings) -> QuickSqlResult<Vec<Record>> {
        self.read_on(None, table, conditions, bindings).await
    }

    pub async fn read_on(
        &self,
        name: Option<&str>,
        table: &str,
        conditions: &str,
        bindings: impl IntoBindings,
    ) -> QuickSqlResult<Vec<Record>> {
        let sql = format!("SELECT * FROM {}{}", table, normalize_conditions(conditions));
        let stmt = self.execute(name, &sql, &bindings.into_bindings()).await?;
        Ok(stmt.into_records())
    }

    /// 插入一行，返回最后插入ID
    pub async fn create(&self, table: &str, record: Record) -> QuickSqlResult<Option<DataValue>> {
        self.create_on(None, table, record, "id").await
    }

    /// 插入一行；`primary_key` 用于从 RETURNING 结果中取回ID
    pub async fn create_on(
        &self,
        name: Option<&str>,
        table: &str,
        record: Record,
        primary_key: &str,
    ) -> QuickSqlResult<Option<DataValue>> {
        let mut event = TableEvent::Creating { record };
        self.events.emit(table, &mut event)?;
        let TableEvent::Creating { record } = event else {
            return Err(quick_error!(event, format!("{}:creating", table), "监听器替换了事件类型"));
        };
        if record.is_empty() {
            return Err(quick_error!(validation, table, "插入的记录不能为空"));
        }

        let connection = self.connection(name).await?;
        let mut columns = Vec::with_capacity(record.len());
        let mut placeholders = Vec::with_capacity(record.len());
        let mut bindings = Bindings::new();
        for (column, value) in &record {
            let param = param_name(column);
            columns.push(column.as_str());
            placeholders.push(format!(":{}", param));
            bindings.insert(param, value.clone());
        }
        let mut sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            table,
            columns.join(", "),
            placeholders.join(", ")
        );
        let returning = connection.driver().returning_clause();
        if let Some(clause) = returning {
            sql.push(' ');
            sql.push_str(clause);
        }

        let stmt = self.execute(name, &sql, &bindings).await?;
        let id = match stmt.last_insert_id() {
            Some(id) => Some(DataValue::Int(id)),
            None if returning.is_some() => stmt
                .records()
                .first()
                .and_then(|row| row.get(primary_key))
                .cloned(),
            None => None,
        };
        info!("插入记录: table={}, id={:?}", table, id);

        let mut event = TableEvent::Created { record, id };
        self.notify(table, &mut event);
        match event {
            TableEvent::Created { id, .. } => Ok(id),
            _ => Ok(None),
        }
    }

    /// 一条语句插入多行，返回受影响行数
    ///
    /// 所有记录的列与第一条一致；`bind_values` 为 false 时值直接内联进SQL
    pub async fn create_multiple(&self, table: &str, records: Vec<Record>, bind_values: bool) -> QuickSqlResult<u64> {
        self.create_multiple_on(None, table, records, bind_values).await
    }

    pub async fn create_multiple_on(
        &self,
        name: Option<&str>,
        table: &str,
        records: Vec<Record>,
        bind_values: bool,
    ) -> QuickSqlResult<u64> {
        let first = records
            .first()
            .ok_or_else(|| quick_error!(validation, table, "批量插入的记录不能为空"))?;
        let columns: Vec<String> = first.keys().cloned().collect();
        if columns.is_empty() {
            return Err(quick_error!(validation, table, "插入的记录不能为空"));
        }

        let mut bindings = Bindings::new();
        let mut rows = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            if record.len() != columns.len() {
                return Err(quick_error!(
                    validation,
                    table,
                    format!("第 {} 条记录的列与第一条记录不一致", index)
                ));
            }
            let mut values = Vec::with_capacity(columns.len());
            for column in &columns {
                let value = record.get(column).ok_or_else(|| {
                    quick_error!(validation, column.clone(), format!("第 {} 条记录缺少该列", index))
                })?;
                if bind_values {
                    let param = format!("{}_{}", param_name(column), index);
                    values.push(format!(":{}", param));
                    bindings.insert(param, value.clone());
                } else {
                    values.push(value.to_sql_literal());
                }
            }
            rows.push(format!("({})", values.join(", ")));
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            table,
            columns.join(", "),
            rows.join(", ")
        );
        let stmt = self.execute(name, &sql, &bindings).await?;
        info!("批量插入: table={}, rows={}", table, stmt.rows_affected());
        Ok(stmt.rows_affected())
    }

    /// 更新满足条件的行，返回应用了新数据的行；没有匹配行时返回 None
    pub async fn update(
        &self,
        table: &str,
        data: Record,
        conditions: &str,
        bindings: impl IntoBindings,
    ) -> QuickSqlResult<Option<Vec<Record>>> {
        self.update_on(None, table, data, conditions, bindings).await
    }

    pub async fn update_on(
        &self,
        name: Option<&str>,
        table: &str,
        data: Record,
        conditions: &str,
        bindings: impl IntoBindings,
    ) -> QuickSqlResult<Option<Vec<Record>>> {
        let mut bindings = bindings.into_bindings();
        let rows = self.read_on(name, table, conditions, bindings.clone()).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut event = TableEvent::Updating { rows, data };
        self.events.emit(table, &mut event)?;
        let TableEvent::Updating { mut rows, data } = event else {
            return Err(quick_error!(event, format!("{}:updating", table), "监听器替换了事件类型"));
        };
        if data.is_empty() {
            return Err(quick_error!(validation, table, "更新的数据不能为空"));
        }

        let mut conditions = conditions.to_string();
        let mut assignments = Vec::with_capacity(data.len());
        let mut set_bindings = Bindings::new();
        for (column, value) in &data {
            let param = param_name(column);
            if let Some(existing) = bindings.shift_remove(&param) {
                // 条件一侧的同名参数改名，避免被SET的值覆盖
                let renamed = format!("{}_{}", param, random_suffix());
                conditions = rename_placeholder(&conditions, &param, &renamed)?;
                bindings.insert(renamed, existing);
            }
            assignments.push(format!("{} = :{}", column, param));
            set_bindings.insert(param, value.clone());
        }
        set_bindings.extend(bindings);

        let sql = format!(
            "UPDATE {} SET {}{}",
            table,
            assignments.join(", "),
            normalize_conditions(&conditions)
        );
        let stmt = self.execute(name, &sql, &set_bindings).await?;
        info!("更新记录: table={}, rows={}", table, stmt.rows_affected());

        for row in &mut rows {
            for (column, value) in &data {
                row.insert(column.clone(), value.clone());
            }
        }
        let mut event = TableEvent::Updated { rows };
        self.notify(table, &mut event);
        match event {
            TableEvent::Updated { rows } => Ok(Some(rows)),
            _ => Ok(None),
        }
    }

    /// 删除满足条件的行，返回被删除的行；没有匹配行时返回 None
    pub async fn delete(
        &self,
        table: &str,
        conditions: &str,
        bindings: impl IntoBindings,
    ) -> QuickSqlResult<Option<Vec<Record>>> {
        self.delete_on(None, table, conditions, bindings).await
    }

    pub async fn delete_on(
        &self,
        name: Option<&str>,
        table: &str,
        conditions: &str,
        bindings: impl IntoBindings,
    ) -> QuickSqlResult<Option<Vec<Record>>> {
        let bindings = bindings.into_bindings();
        let rows = self.read_on(name, table, conditions, bindings.clone()).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let mut event = TableEvent::Deleting { rows };
        self.events.emit(table, &mut event)?;
        let TableEvent::Deleting { rows } = event else {
            return Err(quick_error!(event, format!("{}:deleting", table), "监听器替换了事件类型"));
        };

        let sql = format!("DELETE FROM {}{}", table, normalize_conditions(conditions));
        let stmt = self.execute(name, &sql, &bindings).await?;
        info!("删除记录: table={}, rows={}", table, stmt.rows_affected());

        let mut event = TableEvent::Deleted { rows };
        self.notify(table, &mut event);
        match event {
            TableEvent::Deleted { rows } => Ok(Some(rows)),
            _ => Ok(None),
        }
    }

    /// 本句柄是否绑定了事务
    pub fn in_transaction(&self) -> bool {
        self.scope.is_some()
    }

    /// 在默认连接上以事务执行回调
    ///
    /// 回调收到绑定了事务的句柄，经由它执行的语句都在同一个事务里。
    /// 回调返回 `Ok` 时提交，返回 `Err` 时回滚并原样返回该错误。
    /// 在事务句柄上再次调用时直接执行回调，不开启嵌套事务
    pub async fn transaction<T, F>(&self, callback: F) -> QuickSqlResult<T>
    where
        F: for<'a> FnOnce(&'a Database) -> BoxFuture<'a, QuickSqlResult<T>>,
    {
        self.transaction_on(None, callback).await
    }

    pub async fn transaction_on<T, F>(&self, name: Option<&str>, callback: F) -> QuickSqlResult<T>
    where
        F: for<'a> FnOnce(&'a Database) -> BoxFuture<'a, QuickSqlResult<T>>,
    {
        if self.in_transaction() {
            return callback(self).await;
        }

        let name = self.resolve_name(name);
        let connection = self.connection(Some(&name)).await?;
        let native = connection.begin().await?;
        info!("开始事务: {}", name);
        let scoped = Database {
            registry: Arc::clone(&self.registry),
            events: Arc::clone(&self.events),
            scope: Some(TransactionScope {
                connection: name.clone(),
                native: Mutex::new(native),
            }),
        };

        let result = callback(&scoped).await;

        let Some(scope) = scoped.scope else {
            return Err(quick_error!(transaction, "事务句柄缺少事务"));
        };
        let native = scope.native.into_inner();
        match result {
            Ok(value) => {
                native.commit().await?;
                info!("提交事务: {}", name);
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback) = native.rollback().await {
                    error!("回滚事务失败: {}, 错误: {}", name, rollback);
                } else {
                    warn!("事务已回滚: {}, 原因: {}", name, e);
                }
                Err(e)
            }
        }
    }
}

/// 条件串缺少 `WHERE` 时补上；空串返回空
pub(crate) fn normalize_conditions(conditions: &str) -> String {
    let trimmed = conditions.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    // 关键字之间可以是任意空白
    let mut words = trimmed.split_whitespace().map(str::to_ascii_uppercase);
    let first = words.next().unwrap_or_default();
    let has_clause = match first.as_str() {
        "WHERE" | "LIMIT" => true,
        "ORDER" | "GROUP" => words.next().as_deref() == Some("BY"),
        _ => false,
    };
    if has_clause {
        format!(" {}", trimmed)
    } else {
        format!(" WHERE {}", trimmed)
    }
}

fn random_suffix() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_lowercase())
        .collect()
}
