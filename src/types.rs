//! 数据库类型定义和通用数据类型
//!
//! 定义支持的数据库类型、跨数据库的数据值以及记录/绑定参数的表示

use base64::Engine as _;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 支持的数据库类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DatabaseType {
    /// MySQL 数据库
    MySQL,
    /// PostgreSQL 数据库
    PostgreSQL,
    /// SQLite 数据库
    SQLite,
    /// SQL Server 数据库
    SqlServer,
}

impl DatabaseType {
    /// 获取数据库类型的驱动名称
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseType::MySQL => "mysql",
            DatabaseType::PostgreSQL => "pgsql",
            DatabaseType::SQLite => "sqlite",
            DatabaseType::SqlServer => "sqlsrv",
        }
    }

    /// 从驱动名称解析数据库类型
    ///
    /// 未识别的名称一律按 MySQL 处理
    pub fn from_driver_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "pgsql" | "postgres" | "postgresql" | "pg" => DatabaseType::PostgreSQL,
            "sqlsrv" | "mssql" | "sqlserver" | "dblib" => DatabaseType::SqlServer,
            "sqlite" | "sqlite3" => DatabaseType::SQLite,
            _ => DatabaseType::MySQL,
        }
    }
}

impl From<String> for DatabaseType {
    fn from(s: String) -> Self {
        DatabaseType::from_driver_name(&s)
    }
}

impl From<DatabaseType> for String {
    fn from(t: DatabaseType) -> Self {
        t.as_str().to_string()
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通用数据值类型 - 支持跨数据库的数据表示
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    /// 空值
    Null,
    /// 布尔值
    Bool(bool),
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 字节数组
    Bytes(Vec<u8>),
    /// 日期时间
    DateTime(DateTime<Utc>),
    /// UUID
    Uuid(Uuid),
    /// JSON 值
    Json(serde_json::Value),
}

/// 一行记录：列名到值的有序映射
pub type Record = IndexMap<String, DataValue>;

/// 命名绑定参数：占位符名称（不含冒号）到值的有序映射
pub type Bindings = IndexMap<String, DataValue>;

impl std::fmt::Display for DataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataValue::Null => write!(f, "null"),
            DataValue::Bool(b) => write!(f, "{}", b),
            DataValue::Int(i) => write!(f, "{}", i),
            DataValue::Float(fl) => write!(f, "{}", fl),
            DataValue::String(s) => write!(f, "{}", s),
            DataValue::Bytes(bytes) => write!(f, "[{} bytes]", bytes.len()),
            DataValue::DateTime(dt) => write!(f, "{}", dt.to_rfc3339()),
            DataValue::Uuid(uuid) => write!(f, "{}", uuid),
            DataValue::Json(json) => write!(f, "{}", json),
        }
    }
}

impl DataValue {
    /// 获取数据类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            DataValue::Null => "null",
            DataValue::Bool(_) => "bool",
            DataValue::Int(_) => "int",
            DataValue::Float(_) => "float",
            DataValue::String(_) => "string",
            DataValue::Bytes(_) => "bytes",
            DataValue::DateTime(_) => "datetime",
            DataValue::Uuid(_) => "uuid",
            DataValue::Json(_) => "json",
        }
    }

    /// 判断是否为空值
    pub fn is_null(&self) -> bool {
        matches!(self, DataValue::Null)
    }

    /// 尝试取出整数，字符串形式的整数也会被接受
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DataValue::Int(i) => Some(*i),
            DataValue::Bool(b) => Some(*b as i64),
            DataValue::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            DataValue::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// 转换为不带类型标签的 JSON 值，用于模型反序列化
    pub fn to_json_value(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            DataValue::Null => Value::Null,
            DataValue::Bool(b) => Value::Bool(*b),
            DataValue::Int(i) => Value::from(*i),
            DataValue::Float(f) => serde_json::Number::from_f64(*f)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            DataValue::String(s) => Value::String(s.clone()),
            DataValue::Bytes(bytes) => {
                Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
            }
            DataValue::DateTime(dt) => Value::String(dt.to_rfc3339()),
            DataValue::Uuid(uuid) => Value::String(uuid.to_string()),
            DataValue::Json(json) => json.clone(),
        }
    }

    /// 从 JSON 值解析
    pub fn from_json_value(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => DataValue::Null,
            Value::Bool(b) => DataValue::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => DataValue::Int(i),
                None => DataValue::Float(n.as_f64().unwrap_or_default()),
            },
            Value::String(s) => DataValue::String(s),
            other => DataValue::Json(other),
        }
    }

    /// 渲染为可直接嵌入SQL的字面量
    ///
    /// 仅供不绑定参数的批量插入使用，调用方需自行保证数据可信
    pub fn to_sql_literal(&self) -> String {
        match self {
            DataValue::Null => "NULL".to_string(),
            DataValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
            DataValue::Int(i) => i.to_string(),
            DataValue::Float(f) => f.to_string(),
            DataValue::String(s) => quote_string(s),
            DataValue::Bytes(bytes) => {
                let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
                format!("X'{}'", hex)
            }
            DataValue::DateTime(dt) => quote_string(&dt.format("%Y-%m-%d %H:%M:%S").to_string()),
            DataValue::Uuid(uuid) => quote_string(&uuid.to_string()),
            DataValue::Json(json) => quote_string(&json.to_string()),
        }
    }
}

/// 以不带类型标签的 JSON 形式序列化，便于字段默认值写入配置
impl Serialize for DataValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for DataValue {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(DataValue::from_json_value)
    }
}

fn quote_string(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

impl From<bool> for DataValue {
    fn from(v: bool) -> Self {
        DataValue::Bool(v)
    }
}

impl From<i32> for DataValue {
    fn from(v: i32) -> Self {
        DataValue::Int(v as i64)
    }
}

impl From<i64> for DataValue {
    fn from(v: i64) -> Self {
        DataValue::Int(v)
    }
}

impl From<u32> for DataValue {
    fn from(v: u32) -> Self {
        DataValue::Int(v as i64)
    }
}

impl From<f64> for DataValue {
    fn from(v: f64) -> Self {
        DataValue::Float(v)
    }
}

impl From<&str> for DataValue {
    fn from(v: &str) -> Self {
        DataValue::String(v.to_string())
    }
}

impl From<String> for DataValue {
    fn from(v: String) -> Self {
        DataValue::String(v)
    }
}

impl From<Vec<u8>> for DataValue {
    fn from(v: Vec<u8>) -> Self {
        DataValue::Bytes(v)
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(v: DateTime<Utc>) -> Self {
        DataValue::DateTime(v)
    }
}

impl From<Uuid> for DataValue {
    fn from(v: Uuid) -> Self {
        DataValue::Uuid(v)
    }
}

impl From<serde_json::Value> for DataValue {
    fn from(v: serde_json::Value) -> Self {
        DataValue::Json(v)
    }
}

impl<T: Into<DataValue>> From<Option<T>> for DataValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => DataValue::Null,
        }
    }
}

/// 可转换为命名绑定参数的类型
///
/// 除了结构化的映射和键值对数组，还接受 `"age=18&name=bob"` 形式的宽松字符串
pub trait IntoBindings {
    fn into_bindings(self) -> Bindings;
}

impl IntoBindings for Bindings {
    fn into_bindings(self) -> Bindings {
        self
    }
}

impl IntoBindings for () {
    fn into_bindings(self) -> Bindings {
        Bindings::new()
    }
}

impl IntoBindings for &str {
    fn into_bindings(self) -> Bindings {
        parse_loose_bindings(self)
    }
}

impl IntoBindings for String {
    fn into_bindings(self) -> Bindings {
        parse_loose_bindings(&self)
    }
}

impl<K: Into<String>, V: Into<DataValue>, const N: usize> IntoBindings for [(K, V); N] {
    fn into_bindings(self) -> Bindings {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

impl<K: Into<String>, V: Into<DataValue>> IntoBindings for Vec<(K, V)> {
    fn into_bindings(self) -> Bindings {
        self.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
    }
}

/// 解析 `key=value&key2=value2` 形式的绑定字符串
///
/// 值会先做URL解码，纯整数文本解析为整数，其余保留为字符串
pub fn parse_loose_bindings(input: &str) -> Bindings {
    let mut bindings = Bindings::new();
    for pair in input.split('&') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        let key = decode_component(key);
        let key = key.trim_start_matches(':').to_string();
        let value = decode_component(value);
        let value = match value.parse::<i64>() {
            Ok(i) => DataValue::Int(i),
            Err(_) => DataValue::String(value),
        };
        bindings.insert(key, value);
    }
    bindings
}

fn decode_component(s: &str) -> String {
    let s = s.replace('+', " ");
    urlencoding::decode(&s)
        .map(|c| c.into_owned())
        .unwrap_or(s)
}
