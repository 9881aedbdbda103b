//! 表操作事件
//!
//! `Database` 在增删改前后按 `"{表名}:{事件}"` 发出事件，监听器可以修改负载。
//! 写入前的事件（`creating`/`updating`/`deleting`）返回错误会中止当前操作，
//! 写入后的事件只做通知，错误只记录日志

use crate::error::QuickSqlResult;
use crate::types::{DataValue, Record};
use dashmap::DashMap;
use rat_logger::debug;
use std::sync::Arc;

/// 表操作事件负载
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    /// 插入前，可修改待插入的记录
    Creating { record: Record },
    /// 插入后，携带最后插入ID
    Created { record: Record, id: Option<DataValue> },
    /// 更新前，携带匹配的原始行和待写入的数据
    Updating { rows: Vec<Record>, data: Record },
    /// 更新后，携带应用了新数据的行
    Updated { rows: Vec<Record> },
    /// 删除前
    Deleting { rows: Vec<Record> },
    /// 删除后
    Deleted { rows: Vec<Record> },
}

impl TableEvent {
    /// 事件类型名称
    pub fn kind(&self) -> &'static str {
        match self {
            TableEvent::Creating { .. } => "creating",
            TableEvent::Created { .. } => "created",
            TableEvent::Updating { .. } => "updating",
            TableEvent::Updated { .. } => "updated",
            TableEvent::Deleting { .. } => "deleting",
            TableEvent::Deleted { .. } => "deleted",
        }
    }

    /// 完整事件名 `"{table}:{kind}"`
    pub fn name(&self, table: &str) -> String {
        format!("{}:{}", table, self.kind())
    }
}

/// 事件监听器
pub type Listener = Arc<dyn Fn(&mut TableEvent) -> QuickSqlResult<()> + Send + Sync>;

/// 事件总线
#[derive(Default)]
pub struct EventBus {
    listeners: DashMap<String, Vec<Listener>>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册监听器，事件名形如 `users:creating`
    pub fn on<F>(&self, event: impl Into<String>, listener: F)
    where
        F: Fn(&mut TableEvent) -> QuickSqlResult<()> + Send + Sync + 'static,
    {
        self.listeners
            .entry(event.into())
            .or_default()
            .push(Arc::new(listener));
    }

    /// 按注册顺序调用监听器，遇到第一个错误即停止
    pub fn emit(&self, table: &str, event: &mut TableEvent) -> QuickSqlResult<()> {
        let name = event.name(table);
        // 先复制监听器列表，避免监听器内部注册新监听器时死锁
        let listeners: Vec<Listener> = match self.listeners.get(&name) {
            Some(entry) => entry.value().clone(),
            None => return Ok(()),
        };
        debug!("触发事件: {}, 监听器数量: {}", name, listeners.len());
        for listener in listeners {
            listener(event)?;
        }
        Ok(())
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.listeners.get(event).map(|l| l.len()).unwrap_or(0)
    }

    /// 移除某个事件的全部监听器
    pub fn off(&self, event: &str) {
        self.listeners.remove(event);
    }

    pub fn clear(&self) {
        self.listeners.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quick_error;

    #[test]
    fn test_listener_mutates_payload() {
        let bus = EventBus::new();
        bus.on("users:creating", |event| {
            if let TableEvent::Creating { record } = event {
                record.insert("status".into(), DataValue::from("active"));
            }
            Ok(())
        });

        let mut event = TableEvent::Creating { record: Record::new() };
        bus.emit("users", &mut event).unwrap();
        match event {
            TableEvent::Creating { record } => {
                assert_eq!(record.get("status"), Some(&DataValue::from("active")));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_events_are_scoped_by_table() {
        let bus = EventBus::new();
        bus.on("posts:deleting", |_| Err(quick_error!(event, "posts:deleting", "禁止删除")));

        let mut event = TableEvent::Deleting { rows: vec![] };
        assert!(bus.emit("users", &mut event).is_ok());
        assert!(bus.emit("posts", &mut event).is_err());
        assert_eq!(bus.listener_count("posts:deleting"), 1);

        bus.off("posts:deleting");
        assert_eq!(bus.listener_count("posts:deleting"), 0);
    }

    #[test]
    fn test_first_error_stops_chain() {
        use std::sync::atomic::{AtomicUsize, Ordering};
        let bus = EventBus::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        bus.on("t:updated", move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
            Err(quick_error!(event, "t:updated", "停止"))
        });
        let c2 = calls.clone();
        bus.on("t:updated", move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let mut event = TableEvent::Updated { rows: vec![] };
        assert!(bus.emit("t", &mut event).is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
