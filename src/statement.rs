//! 语句模块
//!
//! 命名占位符到驱动位置参数的编译、带类型推断的参数绑定，以及执行结果的读取与水合

use crate::connection::Driver;
use crate::error::{QuickSqlError, QuickSqlResult};
use crate::types::{Bindings, DataValue, Record};
use serde::de::DeserializeOwned;

/// 这些键绑定的值总是按整数处理
const INTEGER_KEYS: [&str; 4] = ["limit", "offset", "l", "o"];

/// 绑定参数的类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    Null,
    Int,
    Bool,
    Float,
    Str,
    Lob,
}

/// 推断过类型的绑定参数
#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: String,
    pub value: DataValue,
    pub param_type: ParamType,
}

/// 为绑定参数推断类型；`limit`/`offset`/`l`/`o` 强制转换为整数
///
/// 分页参数无法解析为整数时返回错误
pub fn bind_values(bindings: &Bindings) -> QuickSqlResult<Vec<BoundParam>> {
    bindings
        .iter()
        .map(|(name, value)| {
            let key = name.trim_start_matches(':');
            if INTEGER_KEYS.contains(&key) {
                let number = value.as_i64().ok_or_else(|| {
                    crate::quick_error!(query, format!("分页参数 :{} 不是整数: {}", key, value))
                })?;
                return Ok(BoundParam {
                    name: key.to_string(),
                    value: DataValue::Int(number),
                    param_type: ParamType::Int,
                });
            }
            let param_type = match value {
                DataValue::Null => ParamType::Null,
                DataValue::Int(_) => ParamType::Int,
                DataValue::Bool(_) => ParamType::Bool,
                DataValue::Float(_) => ParamType::Float,
                DataValue::Bytes(_) => ParamType::Lob,
                _ => ParamType::Str,
            };
            Ok(BoundParam {
                name: key.to_string(),
                value: value.clone(),
                param_type,
            })
        })
        .collect()
}

/// 语句是否只读取数据
///
/// SQLite 对 SELECT 不会重置变更计数和最后插入ID，读语句需要忽略驱动报告的这两个值
pub(crate) fn is_read_statement(sql: &str) -> bool {
    let mut rest = sql.trim_start();
    loop {
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.split_once('\n').map(|(_, r)| r).unwrap_or("").trim_start();
        } else if let Some(after) = rest.strip_prefix("/*") {
            rest = after.split_once("*/").map(|(_, r)| r).unwrap_or("").trim_start();
        } else if let Some(after) = rest.strip_prefix('(') {
            rest = after.trim_start();
        } else {
            break;
        }
    }

    let keyword: String = rest
        .chars()
        .take_while(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_ascii_uppercase();
    match keyword.as_str() {
        "SELECT" | "PRAGMA" | "EXPLAIN" | "VALUES" => true,
        // CTE 之后也可能跟着写语句
        "WITH" => !rest
            .split(|c: char| !c.is_ascii_alphabetic())
            .any(|word| {
                let word = word.to_ascii_uppercase();
                matches!(word.as_str(), "INSERT" | "UPDATE" | "DELETE" | "REPLACE")
            }),
        _ => false,
    }
}

/// 把绑定参数名规整为合法的占位符名
pub fn param_name(column: &str) -> String {
    column
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// 扫描SQL中的 `:name` 占位符，跳过字符串字面量、带引号的标识符、注释和 `::` 类型转换
///
/// 每遇到一个占位符调用一次 `replace`，用其返回值替换 `:name`
fn rewrite_placeholders<F>(sql: &str, mut replace: F) -> QuickSqlResult<String>
where
    F: FnMut(&str) -> QuickSqlResult<String>,
{
    let chars: Vec<char> = sql.chars().collect();
    let mut out = String::with_capacity(sql.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            '\'' | '"' | '`' => {
                let quote = c;
                out.push(c);
                i += 1;
                while i < chars.len() {
                    out.push(chars[i]);
                    if chars[i] == quote {
                        // 连写两个引号是转义
                        if i + 1 < chars.len() && chars[i + 1] == quote {
                            out.push(chars[i + 1]);
                            i += 2;
                            continue;
                        }
                        i += 1;
                        break;
                    }
                    i += 1;
                }
            }
            '-' if chars.get(i + 1) == Some(&'-') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(chars[i]);
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                out.push_str("/*");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        out.push_str("*/");
                        i += 2;
                        break;
                    }
                    out.push(chars[i]);
                    i += 1;
                }
            }
            ':' if chars.get(i + 1) == Some(&':') => {
                out.push_str("::");
                i += 2;
            }
            ':' if chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphabetic() || *n == '_') =>
            {
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && (chars[end].is_ascii_alphanumeric() || chars[end] == '_') {
                    end += 1;
                }
                let name: String = chars[start..end].iter().collect();
                out.push_str(&replace(&name)?);
                i = end;
            }
            _ => {
                out.push(c);
                i += 1;
            }
        }
    }
    Ok(out)
}

/// SQL中出现的占位符名称（按出现顺序，可重复）
pub fn placeholder_names(sql: &str) -> Vec<String> {
    let mut names = Vec::new();
    let _ = rewrite_placeholders(sql, |name| {
        names.push(name.to_string());
        Ok(format!(":{}", name))
    });
    names
}

/// 把 `:from` 占位符重命名为 `:to`
pub fn rename_placeholder(sql: &str, from: &str, to: &str) -> QuickSqlResult<String> {
    rewrite_placeholders(sql, |name| {
        if name == from {
            Ok(format!(":{}", to))
        } else {
            Ok(format!(":{}", name))
        }
    })
}

/// 把命名占位符编译为驱动的位置参数，返回SQL和按顺序排列的参数值
///
/// 同一名称出现多次时会重复绑定；未被引用的绑定参数被忽略
pub fn compile(sql: &str, bindings: &Bindings, driver: &dyn Driver) -> QuickSqlResult<(String, Vec<DataValue>)> {
    let typed = bind_values(bindings)?;
    let mut params = Vec::new();
    let compiled = rewrite_placeholders(sql, |name| {
        let param = typed.iter().find(|p| p.name == name).ok_or_else(|| {
            crate::quick_error!(query, format!("占位符 :{} 没有对应的绑定参数", name))
        })?;
        params.push(param.value.clone());
        Ok(driver.placeholder(params.len()))
    })?;
    Ok((compiled, params))
}

/// 语句执行结果
#[derive(Debug, Clone, Default)]
pub struct Statement {
    rows: Vec<Record>,
    rows_affected: u64,
    last_insert_id: Option<i64>,
    cursor: usize,
}

impl Statement {
    pub fn new(rows: Vec<Record>, rows_affected: u64, last_insert_id: Option<i64>) -> Self {
        Self {
            rows,
            rows_affected,
            last_insert_id,
            cursor: 0,
        }
    }

    /// 受影响行数；产生结果集的语句返回结果行数
    ///
    /// SQLite 等驱动对 SELECT 不报告行数，此时以实际读取的行数为准
    pub fn row_count(&self) -> u64 {
        if self.rows.is_empty() {
            self.rows_affected
        } else {
            self.rows.len() as u64
        }
    }

    /// 驱动报告的受影响行数
    pub fn rows_affected(&self) -> u64 {
        self.rows_affected
    }

    /// 驱动报告的最后插入ID
    pub fn last_insert_id(&self) -> Option<i64> {
        self.last_insert_id
    }

    /// 读取下一行（无类型记录）
    pub fn fetch_record(&mut self) -> Option<Record> {
        let row = self.rows.get(self.cursor).cloned();
        if row.is_some() {
            self.cursor += 1;
        }
        row
    }

    /// 读取下一行并水合为指定类型
    pub fn fetch<T: DeserializeOwned>(&mut self) -> QuickSqlResult<Option<T>> {
        self.fetch_record().map(hydrate).transpose()
    }

    /// 读取剩余全部行并水合为指定类型
    pub fn fetch_all<T: DeserializeOwned>(&mut self) -> QuickSqlResult<Vec<T>> {
        let rest = self.rows.split_off(self.cursor.min(self.rows.len()));
        rest.into_iter().map(hydrate).collect()
    }

    /// 读取下一行某一列的值
    pub fn fetch_column(&mut self, column: &str) -> Option<DataValue> {
        self.fetch_record().and_then(|mut row| row.shift_remove(column))
    }

    /// 全部结果行
    pub fn records(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_records(self) -> Vec<Record> {
        self.rows
    }

    /// 关闭游标，丢弃未读取的行
    pub fn close_cursor(&mut self) {
        self.rows.clear();
        self.cursor = 0;
    }
}

/// 把一行记录水合为指定类型
pub fn hydrate<T: DeserializeOwned>(record: Record) -> QuickSqlResult<T> {
    let object: serde_json::Map<String, serde_json::Value> = record
        .into_iter()
        .map(|(k, v)| (k, v.to_json_value()))
        .collect();
    serde_json::from_value(serde_json::Value::Object(object)).map_err(|e| {
        QuickSqlError::SerializationError {
            message: format!("记录水合失败: {}", e),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{MySqlDriver, PostgresDriver};
    use crate::types::IntoBindings;

    #[test]
    fn test_limit_keys_force_integers() {
        let bindings = [("limit", "10"), ("o", "5"), ("name", "10")].into_bindings();
        let params = bind_values(&bindings).unwrap();
        assert_eq!(params[0].value, DataValue::Int(10));
        assert_eq!(params[0].param_type, ParamType::Int);
        assert_eq!(params[1].value, DataValue::Int(5));
        assert_eq!(params[2].value, DataValue::String("10".into()));
        assert_eq!(params[2].param_type, ParamType::Str);
    }

    #[test]
    fn test_non_numeric_limit_is_rejected() {
        let bindings = [("limit", "ten")].into_bindings();
        let err = bind_values(&bindings).unwrap_err();
        assert!(err.to_string().contains(":limit"));

        let err = compile("SELECT * FROM t LIMIT :l", &[("l", "x")].into_bindings(), &MySqlDriver).unwrap_err();
        assert!(matches!(err, QuickSqlError::QueryError { .. }));
    }

    #[test]
    fn test_read_statement_detection() {
        assert!(is_read_statement("SELECT * FROM users"));
        assert!(is_read_statement("  -- list\n select 1"));
        assert!(is_read_statement("/* c */ (SELECT 1) UNION (SELECT 2)"));
        assert!(is_read_statement("WITH t AS (SELECT 1) SELECT * FROM t"));
        assert!(is_read_statement("pragma table_info(users)"));
        assert!(!is_read_statement("WITH t AS (SELECT 1) DELETE FROM users"));
        assert!(!is_read_statement("INSERT INTO users (name) VALUES ('a')"));
        assert!(!is_read_statement("UPDATE users SET name = 'b'"));
    }

    #[test]
    fn test_param_types_inferred() {
        let bindings = [("a", DataValue::Bool(true)), ("b", DataValue::Null), ("c", DataValue::Float(1.5))]
            .into_bindings();
        let types: Vec<ParamType> = bind_values(&bindings).unwrap().iter().map(|p| p.param_type).collect();
        assert_eq!(types, vec![ParamType::Bool, ParamType::Null, ParamType::Float]);
    }

    #[test]
    fn test_compile_positional() {
        let bindings = [("age", 18), ("status", 1)].into_bindings();
        let (sql, params) = compile(
            "SELECT * FROM users WHERE age > :age AND status = :status AND note = ':age'",
            &bindings,
            &MySqlDriver,
        )
        .unwrap();
        assert_eq!(sql, "SELECT * FROM users WHERE age > ? AND status = ? AND note = ':age'");
        assert_eq!(params, vec![DataValue::Int(18), DataValue::Int(1)]);
    }

    #[test]
    fn test_compile_postgres_numbers_and_casts() {
        let bindings = [("id", 7)].into_bindings();
        let (sql, params) = compile(
            "SELECT created::date FROM t WHERE id = :id OR parent = :id -- :ignored",
            &bindings,
            &PostgresDriver,
        )
        .unwrap();
        assert_eq!(sql, "SELECT created::date FROM t WHERE id = $1 OR parent = $2 -- :ignored");
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_compile_unknown_placeholder() {
        let err = compile("SELECT :missing", &Bindings::new(), &MySqlDriver).unwrap_err();
        assert!(err.to_string().contains(":missing"));
    }

    #[test]
    fn test_rename_placeholder_is_token_aware() {
        let sql = rename_placeholder("WHERE status = :status AND st = :status_old", "status", "status_x1").unwrap();
        assert_eq!(sql, "WHERE status = :status_x1 AND st = :status_old");
    }

    #[test]
    fn test_row_count_falls_back_to_rows() {
        let mut row = Record::new();
        row.insert("id".into(), DataValue::Int(1));
        let stmt = Statement::new(vec![row.clone(), row], 0, None);
        assert_eq!(stmt.row_count(), 2);
        assert_eq!(Statement::new(vec![], 3, None).row_count(), 3);
    }

    #[test]
    fn test_fetch_advances_cursor() {
        #[derive(serde::Deserialize, Debug, PartialEq)]
        struct User {
            id: i64,
            name: String,
        }
        let rows: Vec<Record> = (1..=3)
            .map(|i| {
                let mut r = Record::new();
                r.insert("id".into(), DataValue::Int(i));
                r.insert("name".into(), DataValue::String(format!("u{}", i)));
                r
            })
            .collect();
        let mut stmt = Statement::new(rows, 0, None);
        let first: User = stmt.fetch().unwrap().unwrap();
        assert_eq!(first, User { id: 1, name: "u1".into() });
        let rest: Vec<User> = stmt.fetch_all().unwrap();
        assert_eq!(rest.len(), 2);
        assert!(stmt.fetch_record().is_none());
    }
}
