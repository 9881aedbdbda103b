//! 查询构建器
//!
//! WHERE/HAVING 条件以表达式树表示，最终由 `build` 一次性渲染为带命名占位符的SQL。
//! `build` 不修改构建器状态，相同的调用序列总是得到相同的SQL

use crate::connection::Driver;
use crate::error::QuickSqlResult;
use crate::quick_error;
use crate::statement::param_name;
use crate::types::{Bindings, DataValue, IntoBindings};
use serde::{Deserialize, Serialize};

/// 条件之间的连接词
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Conjunction {
    #[default]
    And,
    Or,
}

impl Conjunction {
    fn as_sql(&self) -> &'static str {
        match self {
            Conjunction::And => "AND",
            Conjunction::Or => "OR",
        }
    }
}

/// 比较操作符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryOperator {
    /// 等于
    Eq,
    /// 不等于
    Ne,
    /// 大于
    Gt,
    /// 大于等于
    Gte,
    /// 小于
    Lt,
    /// 小于等于
    Lte,
    /// 包含（字符串）
    Contains,
    /// 开始于（字符串）
    StartsWith,
    /// 结束于（字符串）
    EndsWith,
}

impl QueryOperator {
    fn as_sql(&self) -> &'static str {
        match self {
            QueryOperator::Eq => "=",
            QueryOperator::Ne => "<>",
            QueryOperator::Gt => ">",
            QueryOperator::Gte => ">=",
            QueryOperator::Lt => "<",
            QueryOperator::Lte => "<=",
            QueryOperator::Contains | QueryOperator::StartsWith | QueryOperator::EndsWith => "LIKE",
        }
    }

    /// LIKE 类操作符对值加上通配符
    fn wrap_value(&self, value: &DataValue) -> DataValue {
        let pattern = |v: &DataValue| match v {
            DataValue::String(s) => s.clone(),
            other => other.to_string(),
        };
        match self {
            QueryOperator::Contains => DataValue::String(format!("%{}%", pattern(value))),
            QueryOperator::StartsWith => DataValue::String(format!("{}%", pattern(value))),
            QueryOperator::EndsWith => DataValue::String(format!("%{}", pattern(value))),
            _ => value.clone(),
        }
    }
}

/// 条件表达式
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// 原始SQL片段，其中的占位符由调用方绑定
    Raw(String),
    /// 列与值的比较
    Cmp {
        column: String,
        operator: QueryOperator,
        value: DataValue,
    },
    /// `IN` / `NOT IN`
    In {
        column: String,
        values: Vec<DataValue>,
        negated: bool,
    },
    IsNull(String),
    IsNotNull(String),
    /// 全部满足
    All(Vec<Filter>),
    /// 任一满足
    Any(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn raw(sql: impl Into<String>) -> Self {
        Filter::Raw(sql.into())
    }

    pub fn cmp(column: impl Into<String>, operator: QueryOperator, value: impl Into<DataValue>) -> Self {
        Filter::Cmp {
            column: column.into(),
            operator,
            value: value.into(),
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::cmp(column, QueryOperator::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::cmp(column, QueryOperator::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::cmp(column, QueryOperator::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::cmp(column, QueryOperator::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::cmp(column, QueryOperator::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::cmp(column, QueryOperator::Lte, value)
    }

    pub fn contains(column: impl Into<String>, value: impl Into<DataValue>) -> Self {
        Self::cmp(column, QueryOperator::Contains, value)
    }

    pub fn in_list<V: Into<DataValue>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: false,
        }
    }

    pub fn not_in<V: Into<DataValue>>(column: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Filter::In {
            column: column.into(),
            values: values.into_iter().map(Into::into).collect(),
            negated: true,
        }
    }

    pub fn is_null(column: impl Into<String>) -> Self {
        Filter::IsNull(column.into())
    }

    pub fn is_not_null(column: impl Into<String>) -> Self {
        Filter::IsNotNull(column.into())
    }

    pub fn all(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::All(filters.into_iter().collect())
    }

    pub fn any(filters: impl IntoIterator<Item = Filter>) -> Self {
        Filter::Any(filters.into_iter().collect())
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(filter: Filter) -> Self {
        Filter::Not(Box::new(filter))
    }

    fn render(&self, params: &mut Bindings) -> String {
        match self {
            Filter::Raw(sql) => sql.clone(),
            Filter::Cmp { column, operator, value } => {
                if value.is_null() {
                    return match operator {
                        QueryOperator::Ne => format!("{} IS NOT NULL", column),
                        _ => format!("{} IS NULL", column),
                    };
                }
                let name = allocate(params, column, operator.wrap_value(value));
                format!("{} {} :{}", column, operator.as_sql(), name)
            }
            Filter::In { column, values, negated } => {
                if values.is_empty() {
                    // 空列表：IN 恒假，NOT IN 恒真
                    return if *negated { "1 = 1".into() } else { "1 = 0".into() };
                }
                let names: Vec<String> = values
                    .iter()
                    .map(|v| format!(":{}", allocate(params, column, v.clone())))
                    .collect();
                let keyword = if *negated { "NOT IN" } else { "IN" };
                format!("{} {} ({})", column, keyword, names.join(", "))
            }
            Filter::IsNull(column) => format!("{} IS NULL", column),
            Filter::IsNotNull(column) => format!("{} IS NOT NULL", column),
            Filter::All(filters) => render_group(filters, Conjunction::And, params),
            Filter::Any(filters) => render_group(filters, Conjunction::Or, params),
            Filter::Not(inner) => format!("NOT ({})", inner.render(params)),
        }
    }
}

fn render_group(filters: &[Filter], conjunction: Conjunction, params: &mut Bindings) -> String {
    match filters.len() {
        0 => match conjunction {
            Conjunction::And => "1 = 1".into(),
            Conjunction::Or => "1 = 0".into(),
        },
        1 => filters[0].render(params),
        _ => {
            let parts: Vec<String> = filters.iter().map(|f| f.render(params)).collect();
            format!("({})", parts.join(&format!(" {} ", conjunction.as_sql())))
        }
    }
}

/// 以列名为基础分配参数名，已被占用时追加 `_1`、`_2` ...
fn allocate(params: &mut Bindings, column: &str, value: DataValue) -> String {
    let base = param_name(column);
    let mut name = base.clone();
    let mut n = 0;
    while params.contains_key(&name) {
        n += 1;
        name = format!("{}_{}", base, n);
    }
    params.insert(name.clone(), value);
    name
}

/// 拆出原始片段开头的 `AND`/`OR`（不区分大小写）
pub fn split_conjunction(fragment: &str) -> (Conjunction, String) {
    let trimmed = fragment.trim();
    let upper = trimmed.to_ascii_uppercase();
    for (keyword, conjunction) in [("AND", Conjunction::And), ("OR", Conjunction::Or)] {
        if upper.starts_with(keyword) {
            let rest = &trimmed[keyword.len()..];
            if rest.starts_with(|c: char| c.is_whitespace() || c == '(') {
                return (conjunction, rest.trim_start().to_string());
            }
        }
    }
    (Conjunction::And, trimmed.to_string())
}

/// 连接类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
}

impl JoinType {
    fn as_sql(&self) -> &'static str {
        match self {
            JoinType::Inner => "INNER JOIN",
            JoinType::Left => "LEFT JOIN",
            JoinType::Right => "RIGHT JOIN",
        }
    }
}

/// 排序方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    /// 升序
    Asc,
    /// 降序
    Desc,
}

/// 渲染完成的查询
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub bindings: Bindings,
}

/// SQL 查询构建器
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    table: String,
    selects: Vec<String>,
    joins: Vec<String>,
    wheres: Vec<(Conjunction, Filter)>,
    groups: Vec<String>,
    havings: Vec<(Conjunction, Filter)>,
    orders: Vec<String>,
    limit: Option<u64>,
    offset: Option<u64>,
    bindings: Bindings,
}

impl QueryBuilder {
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            ..Default::default()
        }
    }

    pub fn table(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = table.into();
        self
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// 追加选择列，如 `"id, name"`
    pub fn select(&mut self, columns: impl Into<String>) -> &mut Self {
        self.selects.push(columns.into());
        self
    }

    /// 追加原始 JOIN 片段
    pub fn join(&mut self, clause: impl Into<String>) -> &mut Self {
        self.joins.push(clause.into());
        self
    }

    pub fn join_on(&mut self, join_type: JoinType, table: &str, on: &str) -> &mut Self {
        self.joins.push(format!("{} {} ON {}", join_type.as_sql(), table, on));
        self
    }

    /// 追加原始 WHERE 片段，开头的 `AND`/`OR` 作为连接词
    pub fn where_raw(&mut self, fragment: &str, bindings: impl IntoBindings) -> &mut Self {
        let (conjunction, sql) = split_conjunction(fragment);
        if !sql.is_empty() {
            self.wheres.push((conjunction, Filter::Raw(sql)));
        }
        self.bindings.extend(bindings.into_bindings());
        self
    }

    /// 以 AND 追加条件
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.wheres.push((Conjunction::And, filter));
        self
    }

    /// 以 OR 追加条件
    pub fn or_filter(&mut self, filter: Filter) -> &mut Self {
        self.wheres.push((Conjunction::Or, filter));
        self
    }

    pub fn group(&mut self, columns: impl Into<String>) -> &mut Self {
        self.groups.push(columns.into());
        self
    }

    /// 追加原始 HAVING 片段，规则同 `where_raw`
    pub fn having(&mut self, fragment: &str, bindings: impl IntoBindings) -> &mut Self {
        let (conjunction, sql) = split_conjunction(fragment);
        if !sql.is_empty() {
            self.havings.push((conjunction, Filter::Raw(sql)));
        }
        self.bindings.extend(bindings.into_bindings());
        self
    }

    pub fn having_filter(&mut self, filter: Filter) -> &mut Self {
        self.havings.push((Conjunction::And, filter));
        self
    }

    /// 追加原始排序片段，如 `"id DESC"`
    pub fn order(&mut self, clause: impl Into<String>) -> &mut Self {
        self.orders.push(clause.into());
        self
    }

    pub fn order_by(&mut self, column: &str, direction: SortDirection) -> &mut Self {
        let dir = match direction {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        };
        self.orders.push(format!("{} {}", column, dir));
        self
    }

    pub fn limit(&mut self, limit: u64) -> &mut Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(&mut self, offset: u64) -> &mut Self {
        self.offset = Some(offset);
        self
    }

    pub fn bind(&mut self, key: impl Into<String>, value: impl Into<DataValue>) -> &mut Self {
        self.bindings.insert(key.into(), value.into());
        self
    }

    pub fn limit_value(&self) -> Option<u64> {
        self.limit
    }

    pub fn has_conditions(&self) -> bool {
        !self.wheres.is_empty()
    }

    /// 除表名外没有任何累积状态
    pub fn is_empty(&self) -> bool {
        self.selects.is_empty()
            && self.joins.is_empty()
            && self.wheres.is_empty()
            && self.groups.is_empty()
            && self.havings.is_empty()
            && self.orders.is_empty()
            && self.limit.is_none()
            && self.offset.is_none()
            && self.bindings.is_empty()
    }

    /// 清空除表名外的全部状态
    pub fn clear(&mut self) {
        let table = std::mem::take(&mut self.table);
        *self = Self::new(table);
    }

    fn require_table(&self) -> QuickSqlResult<()> {
        if self.table.trim().is_empty() {
            return Err(quick_error!(config, "查询构建器未设置表名"));
        }
        Ok(())
    }

    /// 渲染 WHERE 子句（含 `WHERE` 关键字）和全部绑定参数；没有条件时返回空串
    pub fn render_conditions(&self) -> (String, Bindings) {
        let mut params = self.bindings.clone();
        let clause = render_clauses(&self.wheres, &mut params);
        let clause = if clause.is_empty() {
            clause
        } else {
            format!("WHERE {}", clause)
        };
        (clause, params)
    }

    /// 公共的 FROM ... HAVING 部分
    fn render_body(&self, sql: &mut String, params: &mut Bindings) {
        sql.push_str(" FROM ");
        sql.push_str(&self.table);
        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }
        let wheres = render_clauses(&self.wheres, params);
        if !wheres.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&wheres);
        }
        if !self.groups.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.groups.join(", "));
        }
        let havings = render_clauses(&self.havings, params);
        if !havings.is_empty() {
            sql.push_str(" HAVING ");
            sql.push_str(&havings);
        }
    }

    /// 组装查询
    pub fn build(&self, driver: &dyn Driver) -> QuickSqlResult<Query> {
        self.require_table()?;
        let mut params = self.bindings.clone();

        let mut sql = String::from("SELECT ");
        if self.selects.is_empty() {
            sql.push_str(&format!("{}.*", self.table));
        } else {
            sql.push_str(&self.selects.join(", "));
        }
        self.render_body(&mut sql, &mut params);
        if !self.orders.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.orders.join(", "));
        }
        if let Some(clause) = driver.limit_clause(self.limit, self.offset, !self.orders.is_empty()) {
            sql.push(' ');
            sql.push_str(&clause);
        }

        Ok(Query { sql, bindings: params })
    }

    /// 组装计数查询，忽略选择列、排序和分页
    pub fn build_count(&self) -> QuickSqlResult<Query> {
        self.require_table()?;
        let mut params = self.bindings.clone();
        let mut inner = String::from("SELECT ");
        if self.groups.is_empty() {
            inner.push_str("COUNT(*) AS aggregate");
            self.render_body(&mut inner, &mut params);
            return Ok(Query { sql: inner, bindings: params });
        }
        inner.push_str(&format!("{}.*", self.table));
        self.render_body(&mut inner, &mut params);
        Ok(Query {
            sql: format!("SELECT COUNT(*) AS aggregate FROM ({}) AS grouped", inner),
            bindings: params,
        })
    }
}

fn render_clauses(clauses: &[(Conjunction, Filter)], params: &mut Bindings) -> String {
    let mut sql = String::new();
    for (index, (conjunction, filter)) in clauses.iter().enumerate() {
        // 第一个条件的连接词不输出
        if index > 0 {
            sql.push(' ');
            sql.push_str(conjunction.as_sql());
            sql.push(' ');
        }
        sql.push_str(&filter.render(params));
    }
    sql
}
