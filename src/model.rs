//! 模型定义系统
//!
//! 通过 serde 结构体描述数据表，`Repository` 提供按主键的增删改查，
//! `ModelQuery` 是单次使用的链式查询：每次终结操作之后构建器状态都会被清空

use crate::database::Database;
use crate::error::QuickSqlResult;
use crate::query::{Filter, JoinType, Query, QueryBuilder, SortDirection};
use crate::quick_error;
use crate::statement::hydrate;
use crate::types::{DataValue, IntoBindings, Record};
use chrono::{DateTime, NaiveDateTime};
use indexmap::IndexMap;
use rat_logger::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::marker::PhantomData;

/// 字段类型枚举
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldType {
    /// 字符串类型
    String {
        max_length: Option<usize>,
        min_length: Option<usize>,
        regex: Option<String>,
    },
    /// 整数类型
    Integer {
        min_value: Option<i64>,
        max_value: Option<i64>,
    },
    /// 浮点数类型
    Float {
        min_value: Option<f64>,
        max_value: Option<f64>,
    },
    /// 布尔类型
    Boolean,
    /// 日期时间类型
    DateTime,
    /// UUID类型
    Uuid,
    /// JSON类型
    Json,
}

/// 字段定义
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// 字段类型
    pub field_type: FieldType,
    /// 是否必填
    pub required: bool,
    /// 默认值，插入时字段缺失则使用
    pub default: Option<DataValue>,
    /// 字段描述
    pub description: Option<String>,
}

impl FieldDefinition {
    /// 创建新的字段定义
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            required: false,
            default: None,
            description: None,
        }
    }

    /// 设置为必填字段
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// 设置默认值
    pub fn default_value(mut self, value: impl Into<DataValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// 设置字段描述
    pub fn description(mut self, desc: &str) -> Self {
        self.description = Some(desc.to_string());
        self
    }

    /// 验证字段值，错误中携带字段名
    pub fn validate(&self, field: &str, value: &DataValue) -> QuickSqlResult<()> {
        let fail = |message: String| Err(quick_error!(validation, field, message));

        if value.is_null() {
            if self.required {
                return fail("必填字段不能为空".to_string());
            }
            return Ok(());
        }

        match &self.field_type {
            FieldType::String { max_length, min_length, regex } => {
                let DataValue::String(s) = value else {
                    return fail("字段类型不匹配，期望字符串类型".to_string());
                };
                let len = s.chars().count();
                if let Some(max_len) = max_length {
                    if len > *max_len {
                        return fail(format!("字符串长度不能超过{}", max_len));
                    }
                }
                if let Some(min_len) = min_length {
                    if len < *min_len {
                        return fail(format!("字符串长度不能少于{}", min_len));
                    }
                }
                if let Some(pattern) = regex {
                    let regex = regex::Regex::new(pattern)
                        .map_err(|e| quick_error!(validation, field, format!("正则表达式无效: {}", e)))?;
                    if !regex.is_match(s) {
                        return fail("字符串不匹配正则表达式".to_string());
                    }
                }
            }
            FieldType::Integer { min_value, max_value } => {
                let DataValue::Int(i) = value else {
                    return fail("字段类型不匹配，期望整数类型".to_string());
                };
                if let Some(min_val) = min_value {
                    if i < min_val {
                        return fail(format!("整数值不能小于{}", min_val));
                    }
                }
                if let Some(max_val) = max_value {
                    if i > max_val {
                        return fail(format!("整数值不能大于{}", max_val));
                    }
                }
            }
            FieldType::Float { min_value, max_value } => {
                let f = match value {
                    DataValue::Float(f) => *f,
                    DataValue::Int(i) => *i as f64,
                    _ => return fail("字段类型不匹配，期望浮点数类型".to_string()),
                };
                if let Some(min_val) = min_value {
                    if f < *min_val {
                        return fail(format!("浮点数值不能小于{}", min_val));
                    }
                }
                if let Some(max_val) = max_value {
                    if f > *max_val {
                        return fail(format!("浮点数值不能大于{}", max_val));
                    }
                }
            }
            FieldType::Boolean => {
                // SQLite/MySQL 以 0/1 存储布尔值
                let ok = match value {
                    DataValue::Bool(_) => true,
                    DataValue::Int(i) => *i == 0 || *i == 1,
                    _ => false,
                };
                if !ok {
                    return fail("字段类型不匹配，期望布尔类型".to_string());
                }
            }
            FieldType::DateTime => {
                let ok = match value {
                    DataValue::DateTime(_) => true,
                    DataValue::String(s) => {
                        DateTime::parse_from_rfc3339(s).is_ok()
                            || NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").is_ok()
                    }
                    _ => false,
                };
                if !ok {
                    return fail("字段类型不匹配，期望日期时间类型".to_string());
                }
            }
            FieldType::Uuid => match value {
                DataValue::Uuid(_) => {}
                DataValue::String(s) if uuid::Uuid::parse_str(s).is_ok() => {}
                DataValue::String(_) => return fail("无效的UUID格式".to_string()),
                _ => return fail("字段类型不匹配，期望UUID字符串".to_string()),
            },
            FieldType::Json => {
                // JSON类型可以接受任何值
            }
        }

        Ok(())
    }
}

/// 模型元数据
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelMeta {
    /// 表名
    pub table: String,
    /// 主键列名；没有主键的表为 None
    pub primary_key: Option<String>,
    /// 使用的连接名，None 表示默认连接
    pub connection: Option<String>,
    /// 字段定义
    pub fields: IndexMap<String, FieldDefinition>,
}

impl ModelMeta {
    /// 以 `id` 为主键的元数据
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: Some("id".to_string()),
            connection: None,
            fields: IndexMap::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    pub fn without_primary_key(mut self) -> Self {
        self.primary_key = None;
        self
    }

    pub fn connection(mut self, name: impl Into<String>) -> Self {
        self.connection = Some(name.into());
        self
    }

    pub fn field(mut self, name: impl Into<String>, definition: FieldDefinition) -> Self {
        self.fields.insert(name.into(), definition);
        self
    }

    /// 校验一行数据
    ///
    /// `partial` 为 true 时只校验出现的字段（用于更新），否则缺失的必填字段也会报错
    pub fn validate(&self, record: &Record, partial: bool) -> QuickSqlResult<()> {
        for (name, definition) in &self.fields {
            match record.get(name) {
                Some(value) => definition.validate(name, value)?,
                None if !partial => definition.validate(name, &DataValue::Null)?,
                None => {}
            }
        }
        Ok(())
    }

    /// 补齐缺失字段的默认值
    pub fn apply_defaults(&self, record: &mut Record) {
        for (name, definition) in &self.fields {
            if let Some(default) = &definition.default {
                let missing = record.get(name).is_none_or(DataValue::is_null);
                if missing {
                    record.insert(name.clone(), default.clone());
                }
            }
        }
    }
}

/// 模型特征
///
/// 所有模型都必须实现这个特征
pub trait Model: Serialize + DeserializeOwned + Send + Sync {
    /// 获取模型元数据
    fn meta() -> ModelMeta;

    /// 每一行水合完成后调用
    fn on_row(&mut self) {}

    /// 按字段定义验证模型数据
    fn validate(&self) -> QuickSqlResult<()> {
        Self::meta().validate(&self.to_record()?, false)
    }

    /// 转换为记录
    fn to_record(&self) -> QuickSqlResult<Record> {
        let value = serde_json::to_value(self)
            .map_err(|e| quick_error!(serialization, format!("序列化失败: {}", e)))?;
        let serde_json::Value::Object(object) = value else {
            return Err(quick_error!(serialization, "模型必须序列化为对象"));
        };
        Ok(object
            .into_iter()
            .map(|(k, v)| (k, DataValue::from_json_value(v)))
            .collect())
    }

    /// 从记录创建模型实例
    fn from_record(record: Record) -> QuickSqlResult<Self> {
        hydrate(record)
    }

    /// 主键值；仅从模型自身数据读取
    fn primary_value(&self) -> QuickSqlResult<Option<DataValue>> {
        let Some(pk) = Self::meta().primary_key else {
            return Ok(None);
        };
        Ok(self.to_record()?.shift_remove(&pk).filter(|v| !v.is_null()))
    }
}

fn checked_meta<T: Model>() -> QuickSqlResult<ModelMeta> {
    let meta = T::meta();
    if meta.table.trim().is_empty() {
        return Err(quick_error!(
            config,
            format!("模型 {} 没有设置表名", std::any::type_name::<T>())
        ));
    }
    Ok(meta)
}

fn require_primary_key<T: Model>(meta: &ModelMeta) -> QuickSqlResult<String> {
    meta.primary_key.clone().ok_or_else(|| {
        quick_error!(config, format!("模型 {} 没有主键", std::any::type_name::<T>()))
    })
}

/// 行水合并调用 `on_row`
fn hydrate_model<T: Model>(record: Record) -> QuickSqlResult<T> {
    let mut model = T::from_record(record)?;
    model.on_row();
    Ok(model)
}

/// 模型仓库
pub struct Repository<'d, T: Model> {
    db: &'d Database,
    _marker: PhantomData<T>,
}

impl<'d, T: Model> Repository<'d, T> {
    pub fn new(db: &'d Database) -> Self {
        Self {
            db,
            _marker: PhantomData,
        }
    }

    /// 开始一次链式查询
    pub fn query(&self) -> QuickSqlResult<ModelQuery<'d, T>> {
        ModelQuery::new(self.db)
    }

    /// 按主键查找
    pub async fn find(&self, id: impl Into<DataValue>) -> QuickSqlResult<Option<T>> {
        let meta = checked_meta::<T>()?;
        let pk = require_primary_key::<T>(&meta)?;
        let mut query = self.query()?;
        query.filter(Filter::eq(pk, id)).fetch().await
    }

    /// 插入模型，返回从数据库重新读取的实例
    pub async fn create(&self, model: &T, validate: bool) -> QuickSqlResult<T> {
        self.query()?.create(model.to_record()?, validate).await
    }

    /// 按主键更新模型的全部字段
    pub async fn update(&self, model: &T, validate: bool) -> QuickSqlResult<Vec<T>> {
        self.query()?.update(model.to_record()?, validate).await
    }

    /// 按主键删除，返回被删除的行
    pub async fn delete(&self, id: impl Into<DataValue>) -> QuickSqlResult<Vec<T>> {
        self.query()?.delete(Some(id.into())).await
    }

    /// 主键存在且对应行存在时更新，否则插入
    pub async fn save(&self, model: &T, validate: bool) -> QuickSqlResult<T> {
        self.query()?.save(model.to_record()?, validate).await
    }
}

/// 单个模型的链式查询
pub struct ModelQuery<'d, T: Model> {
    db: &'d Database,
    meta: ModelMeta,
    builder: QueryBuilder,
    _marker: PhantomData<T>,
}

impl<'d, T: Model> ModelQuery<'d, T> {
    pub fn new(db: &'d Database) -> QuickSqlResult<Self> {
        let meta = checked_meta::<T>()?;
        let builder = QueryBuilder::new(meta.table.clone());
        Ok(Self {
            db,
            meta,
            builder,
            _marker: PhantomData,
        })
    }

    fn connection(&self) -> Option<&str> {
        self.meta.connection.as_deref()
    }

    /// 切换查询的表，之后的插入、更新和删除也作用于该表
    pub fn table(&mut self, table: impl Into<String>) -> &mut Self {
        let table = table.into();
        self.builder.table(table.clone());
        self.meta.table = table;
        self
    }

    pub fn select(&mut self, columns: impl Into<String>) -> &mut Self {
        self.builder.select(columns);
        self
    }

    pub fn join(&mut self, clause: impl Into<String>) -> &mut Self {
        self.builder.join(clause);
        self
    }

    pub fn join_on(&mut self, join_type: JoinType, table: &str, on: &str) -> &mut Self {
        self.builder.join_on(join_type, table, on);
        self
    }

    pub fn where_raw(&mut self, fragment: &str, bindings: impl IntoBindings) -> &mut Self {
        self.builder.where_raw(fragment, bindings);
        self
    }

    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.builder.filter(filter);
        self
    }

    pub fn or_filter(&mut self, filter: Filter) -> &mut Self {
        self.builder.or_filter(filter);
        self
    }

    pub fn group(&mut self, columns: impl Into<String>) -> &mut Self {
        self.builder.group(columns);
        self
    }

    pub fn having(&mut self, fragment: &str, bindings: impl IntoBindings) -> &mut Self {
        self.builder.having(fragment, bindings);
        self
    }

    pub fn order(&mut self, clause: impl Into<String>) -> &mut Self {
        self.builder.order(clause);
        self
    }

    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> &mut Self {
        self.builder.order_by(column, direction);
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.builder.limit(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.builder.offset(offset);
        self
    }

    pub fn bind(&mut self, key: impl Into<String>, value: impl Into<DataValue>) -> &mut Self {
        self.builder.bind(key, value);
        self
    }

    /// 构建器没有任何累积状态
    pub fn is_clear(&self) -> bool {
        self.builder.is_empty()
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    /// 按所用连接的方言渲染当前查询，不执行也不清空状态
    pub async fn get_query(&self) -> QuickSqlResult<Query> {
        let connection = self.db.connection(self.connection()).await?;
        self.builder.build(connection.driver())
    }

    /// 取出当前构建器并清空
    fn take(&mut self) -> QueryBuilder {
        let builder = self.builder.clone();
        self.builder.clear();
        builder
    }

    async fn run_select(&self, builder: &QueryBuilder) -> QuickSqlResult<Vec<Record>> {
        let connection = self.db.connection(self.connection()).await?;
        let query = builder.build(connection.driver())?;
        let stmt = self
            .db
            .query_on(self.connection(), &query.sql, query.bindings)
            .await?;
        Ok(stmt.into_records())
    }

    /// 读取第一行
    pub async fn fetch(&mut self) -> QuickSqlResult<Option<T>> {
        let mut builder = self.take();
        if builder.limit_value().is_none() {
            builder.limit(1);
        }
        let rows = self.run_select(&builder).await?;
        rows.into_iter().next().map(hydrate_model::<T>).transpose()
    }

    /// 读取全部行
    pub async fn fetch_all(&mut self) -> QuickSqlResult<Vec<T>> {
        let builder = self.take();
        let rows = self.run_select(&builder).await?;
        rows.into_iter().map(hydrate_model::<T>).collect()
    }

    /// 读取全部行，不做类型水合
    pub async fn fetch_records(&mut self) -> QuickSqlResult<Vec<Record>> {
        let builder = self.take();
        self.run_select(&builder).await
    }

    /// 满足条件的行数
    pub async fn count(&mut self) -> QuickSqlResult<u64> {
        let builder = self.take();
        let query = builder.build_count()?;
        let mut stmt = self
            .db
            .query_on(self.connection(), &query.sql, query.bindings)
            .await?;
        let count = stmt
            .fetch_column("aggregate")
            .and_then(|v| v.as_i64())
            .unwrap_or(0);
        Ok(count.max(0) as u64)
    }

    pub async fn exists(&mut self) -> QuickSqlResult<bool> {
        Ok(self.count().await? > 0)
    }

    /// 插入一行并从数据库重新读取
    ///
    /// 数据中带主键时按该值读取，主键由数据库生成时按最后插入ID读取，
    /// 没有主键的表按插入的字段逐一相等匹配
    pub async fn create(&mut self, mut data: Record, validate: bool) -> QuickSqlResult<T> {
        self.take();
        self.meta.apply_defaults(&mut data);
        if validate {
            self.meta.validate(&data, false)?;
        }
        if let Some(pk) = &self.meta.primary_key {
            if data.get(pk).is_some_and(DataValue::is_null) {
                data.shift_remove(pk);
            }
        }

        let pk = self.meta.primary_key.clone();
        let id = self
            .db
            .create_on(
                self.connection(),
                &self.meta.table,
                data.clone(),
                pk.as_deref().unwrap_or("id"),
            )
            .await?;
        debug!("模型插入完成: table={}, id={:?}", self.meta.table, id);

        // 显式给出的主键优先；SQLite 的最后插入ID是 rowid，只对自增主键有意义
        let explicit = pk.as_ref().and_then(|pk| data.get(pk).cloned());
        let mut lookup = QueryBuilder::new(self.meta.table.clone());
        match (pk, explicit, id) {
            (Some(pk), Some(value), _) => {
                lookup.filter(Filter::eq(pk, value));
            }
            (Some(pk), None, Some(id)) => {
                lookup.filter(Filter::eq(pk, id));
            }
            _ => {
                for (column, value) in &data {
                    lookup.filter(Filter::eq(column.clone(), value.clone()));
                }
            }
        }
        lookup.limit(1);

        let rows = self.run_select(&lookup).await?;
        let row = rows
            .into_iter()
            .next()
            .ok_or_else(|| quick_error!(query, format!("插入 {} 后未能读取到记录", self.meta.table)))?;
        hydrate_model(row)
    }

    /// 更新满足条件的行；没有条件时使用数据中的主键作为条件
    pub async fn update(&mut self, mut data: Record, validate: bool) -> QuickSqlResult<Vec<T>> {
        let mut builder = self.take();
        if validate {
            self.meta.validate(&data, true)?;
        }
        if !builder.has_conditions() {
            if let Some(pk) = &self.meta.primary_key {
                if let Some(id) = data.shift_remove(pk).filter(|v| !v.is_null()) {
                    builder.filter(Filter::eq(pk.clone(), id));
                }
            }
        }
        if !builder.has_conditions() {
            return Err(quick_error!(
                config,
                format!("更新 {} 需要条件或主键", self.meta.table)
            ));
        }

        let (conditions, bindings) = builder.render_conditions();
        let rows = self
            .db
            .update_on(self.connection(), &self.meta.table, data, &conditions, bindings)
            .await?;
        rows.unwrap_or_default()
            .into_iter()
            .map(hydrate_model::<T>)
            .collect()
    }

    /// 删除满足条件的行；给出 `id` 时以主键作为条件
    pub async fn delete(&mut self, id: Option<DataValue>) -> QuickSqlResult<Vec<T>> {
        let mut builder = self.take();
        if let Some(id) = id {
            let pk = require_primary_key::<T>(&self.meta)?;
            builder.filter(Filter::eq(pk, id));
        }
        if !builder.has_conditions() {
            return Err(quick_error!(
                config,
                format!("删除 {} 需要条件或主键", self.meta.table)
            ));
        }

        let (conditions, bindings) = builder.render_conditions();
        let rows = self
            .db
            .delete_on(self.connection(), &self.meta.table, &conditions, bindings)
            .await?;
        rows.unwrap_or_default()
            .into_iter()
            .map(hydrate_model::<T>)
            .collect()
    }

    /// 主键有值且对应行存在时更新并返回更新后的行，否则插入
    pub async fn save(&mut self, data: Record, validate: bool) -> QuickSqlResult<T> {
        self.take();
        let existing = match &self.meta.primary_key {
            Some(pk) => data.get(pk).filter(|v| !v.is_null()).cloned().map(|id| (pk.clone(), id)),
            None => None,
        };

        if let Some((pk, id)) = existing {
            let mut probe = QueryBuilder::new(self.meta.table.clone());
            probe.filter(Filter::eq(pk.clone(), id.clone()));
            let found = !self.run_select(&probe).await?.is_empty();
            if found {
                let updated = self.update(data, validate).await?;
                return updated.into_iter().next().ok_or_else(|| {
                    quick_error!(query, format!("更新 {} 后未能读取到记录", self.meta.table))
                });
            }
        }
        self.create(data, validate).await
    }
}

/// 便捷宏：定义模型字段类型
#[macro_export]
macro_rules! field_types {
    (string) => {
        $crate::model::FieldType::String {
            max_length: None,
            min_length: None,
            regex: None,
        }
    };
    (string, max_length = $max:expr) => {
        $crate::model::FieldType::String {
            max_length: Some($max),
            min_length: None,
            regex: None,
        }
    };
    (string, regex = $pattern:expr) => {
        $crate::model::FieldType::String {
            max_length: None,
            min_length: None,
            regex: Some($pattern.to_string()),
        }
    };
    (integer) => {
        $crate::model::FieldType::Integer {
            min_value: None,
            max_value: None,
        }
    };
    (integer, min = $min:expr, max = $max:expr) => {
        $crate::model::FieldType::Integer {
            min_value: Some($min),
            max_value: Some($max),
        }
    };
    (float) => {
        $crate::model::FieldType::Float {
            min_value: None,
            max_value: None,
        }
    };
    (boolean) => {
        $crate::model::FieldType::Boolean
    };
    (datetime) => {
        $crate::model::FieldType::DateTime
    };
    (uuid) => {
        $crate::model::FieldType::Uuid
    };
    (json) => {
        $crate::model::FieldType::Json
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    struct User {
        id: Option<i64>,
        name: String,
        age: i64,
    }

    impl Model for User {
        fn meta() -> ModelMeta {
            ModelMeta::new("users")
                .field("name", FieldDefinition::new(field_types!(string, max_length = 8)).required())
                .field("age", FieldDefinition::new(field_types!(integer, min = 0, max = 150)))
                .field("email", FieldDefinition::new(field_types!(string)).default_value("none"))
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Nameless {
        id: i64,
    }

    impl Model for Nameless {
        fn meta() -> ModelMeta {
            ModelMeta::new("")
        }
    }

    #[test]
    fn test_validation_names_field() {
        let user = User { id: None, name: "far too long".into(), age: 3 };
        let err = user.validate().unwrap_err();
        assert!(err.to_string().contains("name"));

        let user = User { id: None, name: "bob".into(), age: 200 };
        let err = user.validate().unwrap_err();
        assert!(err.to_string().contains("age"));
    }

    #[test]
    fn test_partial_validation_skips_missing() {
        let meta = User::meta();
        let mut record = Record::new();
        record.insert("age".into(), DataValue::Int(20));
        assert!(meta.validate(&record, true).is_ok());
        assert!(meta.validate(&record, false).is_err());
    }

    #[test]
    fn test_defaults_fill_missing() {
        let mut record = Record::new();
        User::meta().apply_defaults(&mut record);
        assert_eq!(record.get("email"), Some(&DataValue::from("none")));
    }

    #[test]
    fn test_primary_value_is_explicit_only() {
        let user = User { id: None, name: "a".into(), age: 1 };
        assert_eq!(user.primary_value().unwrap(), None);
        let user = User { id: Some(7), name: "a".into(), age: 1 };
        assert_eq!(user.primary_value().unwrap(), Some(DataValue::Int(7)));
    }

    #[test]
    fn test_missing_table_names_model() {
        let db = Database::new("main");
        let err = Repository::<Nameless>::new(&db).query().err().unwrap();
        assert!(err.to_string().contains("Nameless"));
    }

    #[test]
    fn test_meta_serializes_with_defaults() {
        let json = serde_json::to_value(User::meta()).unwrap();
        assert_eq!(json["fields"]["email"]["default"], serde_json::json!("none"));

        let back: ModelMeta = serde_json::from_value(json).unwrap();
        assert_eq!(back.table, "users");
        assert_eq!(back.fields["email"].default, Some(DataValue::from("none")));
        assert_eq!(back.fields["age"], User::meta().fields["age"]);
    }

    #[test]
    fn test_record_round_trip_through_model() {
        let user = User { id: Some(1), name: "amy".into(), age: 30 };
        let record = user.to_record().unwrap();
        assert_eq!(record.get("age"), Some(&DataValue::Int(30)));
        let back = User::from_record(record).unwrap();
        assert_eq!(back.name, "amy");
    }
}
