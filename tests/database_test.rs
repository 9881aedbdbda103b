//! Database 门面集成测试（内存 SQLite）

use rat_quicksql::{
    DataValue, Database, IntoBindings, QuickSqlError, Record, TableEvent, quick_error, sqlite_config,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

async fn setup() -> Database {
    let db = Database::new("main");
    db.add_connection("main", sqlite_config("memory"));
    db.query(
        "CREATE TABLE users (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, status TEXT, age INTEGER)",
        (),
    )
    .await
    .expect("建表失败");
    db
}

fn user(name: &str, status: &str, age: i64) -> Record {
    let mut record = Record::new();
    record.insert("name".into(), DataValue::from(name));
    record.insert("status".into(), DataValue::from(status));
    record.insert("age".into(), DataValue::Int(age));
    record
}

#[tokio::test]
async fn test_create_returns_last_insert_id() {
    let db = setup().await;
    let first = db.create("users", user("amy", "active", 30)).await.unwrap();
    let second = db.create("users", user("bob", "active", 25)).await.unwrap();
    assert_eq!(first, Some(DataValue::Int(1)));
    assert_eq!(second, Some(DataValue::Int(2)));

    let rows = db.read("users", "WHERE id = :id", [("id", 2)]).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&DataValue::from("bob")));
}

#[tokio::test]
async fn test_empty_record_is_rejected() {
    let db = setup().await;
    let err = db.create("users", Record::new()).await.unwrap_err();
    assert!(matches!(err, QuickSqlError::ValidationError { .. }));
}

#[tokio::test]
async fn test_sqlite_select_row_count() {
    let db = setup().await;
    db.create("users", user("amy", "active", 30)).await.unwrap();
    db.create("users", user("bob", "active", 25)).await.unwrap();

    let stmt = db.query("SELECT * FROM users", ()).await.unwrap();
    assert_eq!(stmt.row_count(), 2);
}

#[tokio::test]
async fn test_create_multiple_bound_and_inline() {
    let db = setup().await;
    let rows = vec![user("a", "x", 1), user("b", "y", 2), user("c'd", "z", 3)];
    assert_eq!(db.create_multiple("users", rows.clone(), true).await.unwrap(), 3);
    assert_eq!(db.create_multiple("users", rows, false).await.unwrap(), 3);

    let stored = db.read("users", "name = :name", [("name", "c'd")]).await.unwrap();
    assert_eq!(stored.len(), 2);
}

#[tokio::test]
async fn test_create_multiple_requires_same_columns() {
    let db = setup().await;
    let mut short = Record::new();
    short.insert("name".into(), DataValue::from("x"));
    let err = db
        .create_multiple("users", vec![user("a", "x", 1), short], true)
        .await
        .unwrap_err();
    assert!(matches!(err, QuickSqlError::ValidationError { .. }));
}

#[tokio::test]
async fn test_update_with_colliding_binding() {
    let db = setup().await;
    db.create("users", user("amy", "pending", 30)).await.unwrap();
    db.create("users", user("bob", "active", 25)).await.unwrap();

    let mut data = Record::new();
    data.insert("status".into(), DataValue::from("active"));
    let updated = db
        .update("users", data, "WHERE status = :status", [("status", "pending")])
        .await
        .unwrap()
        .expect("应该有匹配行");

    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].get("name"), Some(&DataValue::from("amy")));
    assert_eq!(updated[0].get("status"), Some(&DataValue::from("active")));

    let active = db.read("users", "status = :s", [("s", "active")]).await.unwrap();
    assert_eq!(active.len(), 2);
    let pending = db.read("users", "status = :s", [("s", "pending")]).await.unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn test_update_without_match_returns_none() {
    let db = setup().await;
    let mut data = Record::new();
    data.insert("age".into(), DataValue::Int(1));
    let result = db.update("users", data, "id = :id", [("id", 99)]).await.unwrap();
    assert!(result.is_none());
}

#[tokio::test]
async fn test_delete_returns_removed_rows() {
    let db = setup().await;
    db.create("users", user("amy", "active", 30)).await.unwrap();
    db.create("users", user("bob", "banned", 25)).await.unwrap();

    let removed = db
        .delete("users", "status = :status", "status=banned")
        .await
        .unwrap()
        .expect("应该删除一行");
    assert_eq!(removed.len(), 1);
    assert_eq!(removed[0].get("name"), Some(&DataValue::from("bob")));
    assert_eq!(db.read("users", "", ()).await.unwrap().len(), 1);

    assert!(db.delete("users", "id = :id", [("id", 42)]).await.unwrap().is_none());
}

#[tokio::test]
async fn test_events_can_mutate_and_veto() {
    let db = setup().await;
    let created = Arc::new(AtomicUsize::new(0));

    db.events().on("users:creating", |event| {
        if let TableEvent::Creating { record } = event {
            record.insert("status".into(), DataValue::from("from-listener"));
        }
        Ok(())
    });
    let counter = created.clone();
    db.events().on("users:created", move |event| {
        if let TableEvent::Created { id: Some(_), .. } = event {
            counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    });
    db.events().on("users:deleting", |_| Err(quick_error!(event, "users:deleting", "禁止删除")));

    let id = db.create("users", user("amy", "active", 30)).await.unwrap();
    let rows = db.read("users", "id = :id", [("id", id.unwrap())]).await.unwrap();
    assert_eq!(rows[0].get("status"), Some(&DataValue::from("from-listener")));
    assert_eq!(created.load(Ordering::SeqCst), 1);

    let err = db.delete("users", "", ()).await.unwrap_err();
    assert!(matches!(err, QuickSqlError::EventError { .. }));
    assert_eq!(db.read("users", "", ()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_empty_select_row_count_after_insert() {
    let db = setup().await;
    db.create("users", user("amy", "active", 30)).await.unwrap();

    let stmt = db.query("SELECT * FROM users WHERE id = 999", ()).await.unwrap();
    assert_eq!(stmt.row_count(), 0);
    assert_eq!(stmt.last_insert_id(), None);
}

#[tokio::test]
async fn test_post_write_listener_errors_do_not_fail_write() {
    let db = setup().await;
    db.events()
        .on("users:created", |_| Err(quick_error!(event, "users:created", "通知失败")));
    db.events()
        .on("users:updated", |_| Err(quick_error!(event, "users:updated", "通知失败")));
    db.events()
        .on("users:deleted", |_| Err(quick_error!(event, "users:deleted", "通知失败")));

    let id = db.create("users", user("amy", "active", 30)).await.unwrap();
    assert_eq!(id, Some(DataValue::Int(1)));

    let mut data = Record::new();
    data.insert("age".into(), DataValue::Int(31));
    let updated = db.update("users", data, "id = :id", [("id", 1)]).await.unwrap();
    assert_eq!(updated.unwrap()[0].get("age"), Some(&DataValue::Int(31)));

    let removed = db.delete("users", "id = :id", [("id", 1)]).await.unwrap();
    assert_eq!(removed.map(|rows| rows.len()), Some(1));
    assert!(db.read("users", "", ()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_transaction_commits() {
    let db = setup().await;
    let id = db
        .transaction(|db| {
            Box::pin(async move {
                let id = db.create("users", user("amy", "active", 30)).await?;
                assert!(db.in_transaction());
                Ok(id)
            })
        })
        .await
        .unwrap();

    assert_eq!(id, Some(DataValue::Int(1)));
    assert!(!db.in_transaction());
    assert_eq!(db.read("users", "", ()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_transaction_rolls_back_and_returns_error() {
    let db = setup().await;
    let err = db
        .transaction(|db| {
            Box::pin(async move {
                db.create("users", user("amy", "active", 30)).await?;
                Err::<(), _>(quick_error!(validation, "name", "故意失败"))
            })
        })
        .await
        .unwrap_err();

    assert!(matches!(err, QuickSqlError::ValidationError { .. }));
    assert!(db.read("users", "", ()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_nested_transaction_runs_inline() {
    let db = setup().await;
    db.transaction(|db| {
        Box::pin(async move {
            db.transaction(|db| {
                Box::pin(async move {
                    db.create("users", user("inner", "active", 1)).await?;
                    Ok(())
                })
            })
            .await?;
            db.create("users", user("outer", "active", 2)).await?;
            Ok(())
        })
    })
    .await
    .unwrap();

    assert_eq!(db.read("users", "", ()).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_rollback_keeps_concurrent_writes() {
    let db = setup().await;

    let (rolled_back, outside) = tokio::join!(
        db.transaction(|tx| {
            Box::pin(async move {
                tx.create("users", user("inside", "active", 1)).await?;
                tokio::time::sleep(Duration::from_millis(100)).await;
                Err::<(), _>(quick_error!(validation, "name", "故意失败"))
            })
        }),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            assert!(!db.in_transaction());
            db.create("users", user("outside", "active", 2)).await
        }
    );

    assert!(rolled_back.is_err());
    assert!(outside.is_ok());
    let rows = db.read("users", "", ()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("name"), Some(&DataValue::from("outside")));
}

#[tokio::test]
async fn test_transaction_handle_shares_registry() {
    let db = setup().await;
    db.add_connection("other", sqlite_config("memory"));
    db.query_on(Some("other"), "CREATE TABLE notes (body TEXT)", ()).await.unwrap();

    db.transaction(|tx| {
        Box::pin(async move {
            assert_eq!(tx.default_driver(), "main");
            // 事务只绑定默认连接，其他连接上的写入直接提交
            let mut note = Record::new();
            note.insert("body".into(), DataValue::from("kept"));
            tx.create_on(Some("other"), "notes", note, "id").await?;
            Err::<(), _>(quick_error!(validation, "body", "回滚主连接"))
        })
    })
    .await
    .unwrap_err();

    assert_eq!(db.read_on(Some("other"), "notes", "", ()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_query_error_keeps_native_message() {
    let db = setup().await;
    let err = db.query("SELECT * FROM missing_table", ()).await.unwrap_err();
    match err {
        QuickSqlError::QueryError { message } => assert!(message.contains("missing_table")),
        other => panic!("意外的错误类型: {:?}", other),
    }
}

#[tokio::test]
async fn test_limit_binding_from_string() {
    let db = setup().await;
    for i in 0..5 {
        db.create("users", user(&format!("u{}", i), "active", i)).await.unwrap();
    }
    let bindings = "limit=2&offset=1".into_bindings();
    let stmt = db
        .query("SELECT * FROM users ORDER BY id LIMIT :limit OFFSET :offset", bindings)
        .await
        .unwrap();
    let names: Vec<DataValue> = stmt
        .records()
        .iter()
        .filter_map(|r| r.get("name").cloned())
        .collect();
    assert_eq!(names, vec![DataValue::from("u1"), DataValue::from("u2")]);
}

#[tokio::test]
async fn test_file_database_and_default_switch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.db");
    std::fs::File::create(&path).unwrap();

    let db = setup().await;
    db.add_connection("file", sqlite_config(path.to_string_lossy().to_string()));
    db.set_default_driver("file");
    db.query("CREATE TABLE notes (id INTEGER PRIMARY KEY, body TEXT)", ()).await.unwrap();
    let mut note = Record::new();
    note.insert("body".into(), DataValue::from("hi"));
    db.create("notes", note).await.unwrap();

    assert_eq!(db.read("notes", "", ()).await.unwrap().len(), 1);
    // 默认连接已切换，内存库中没有 notes 表
    assert!(db.read_on(Some("main"), "notes", "", ()).await.is_err());
    assert_eq!(db.default_driver(), "file");
}
