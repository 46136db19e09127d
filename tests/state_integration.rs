//! Integration tests for the on-disk state format.
//!
//! `plan.json` and `ledger.json` are part of the public surface: operators
//! read them, diff them in code review, and occasionally write them by
//! hand. These tests pin the wire format from the outside, through raw
//! JSON rather than the serde types that produced it.

use remodel::migrate::{Ledger, MigrationOp, MigrationPlan, OpKind, StateStore};
use remodel::schema::Column;
use tempfile::TempDir;

/// Test that a hand-written plan file loads with the documented semantics.
#[tokio::test]
async fn test_hand_written_plan_loads() {
    let dir = TempDir::new().expect("temp dir");
    let store = StateStore::new(dir.path());
    std::fs::create_dir_all(store.dir()).expect("create state dir");
    std::fs::write(
        store.plan_path(),
        r#"{
  "generated_at": "2026-08-25T09:30:00Z",
  "plan": [
    {
      "op": "createTable",
      "table": "users",
      "definition": {
        "name": "users",
        "columns": {
          "id": { "name": "id", "sql_type": "CHAR(36)", "primary_key": true }
        }
      },
      "destructive": false
    },
    {
      "op": "dropTable",
      "table": "abandoned",
      "destructive": true
    }
  ]
}"#,
    )
    .expect("write plan.json");

    let plan = store
        .load_plan()
        .await
        .expect("load plan")
        .expect("plan present");

    assert_eq!(
        plan.identifiers(),
        ["createTable:users", "dropTable:abandoned"]
    );
    assert_eq!(plan.destructive_count(), 1);
    assert!(!plan.is_applied());

    // A hand-written ledger filters pending the same way a recorded one does.
    std::fs::write(
        store.ledger_path(),
        r#"{ "executed": ["createTable:users"] }"#,
    )
    .expect("write ledger.json");
    let ledger = store.load_ledger().await.expect("load ledger");
    let pending = ledger.pending(&plan.operations);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].identifier(), "dropTable:abandoned");
}

/// Test the shape of an engine-written plan file: stable top-level keys,
/// camelCase op tags, and `applied_at` absent until the plan is applied.
#[tokio::test]
async fn test_persisted_plan_shape() {
    let dir = TempDir::new().expect("temp dir");
    let store = StateStore::new(dir.path());

    let mut plan = MigrationPlan::new(vec![MigrationOp::new(
        "users",
        OpKind::AddColumn {
            column: Column::new("email", "VARCHAR(255)"),
        },
        false,
    )]);
    store.save_plan(&plan).await.expect("save plan");

    let text = std::fs::read_to_string(store.plan_path()).expect("read plan.json");
    assert!(text.ends_with('\n'));

    let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert!(json.get("generated_at").is_some());
    assert!(json.get("applied_at").is_none());
    let entry = &json["plan"][0];
    assert_eq!(entry["op"], "addColumn");
    assert_eq!(entry["table"], "users");
    assert_eq!(entry["destructive"], false);
    assert_eq!(entry["column"]["name"], "email");

    plan.mark_applied();
    store.save_plan(&plan).await.expect("save applied plan");
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(store.plan_path()).expect("read"))
            .expect("valid json");
    assert!(json.get("applied_at").is_some());
}

/// Test the shape of the ledger file: execution order preserved, timestamp
/// present once something has been recorded.
#[tokio::test]
async fn test_persisted_ledger_shape() {
    let dir = TempDir::new().expect("temp dir");
    let store = StateStore::new(dir.path());

    let mut ledger = Ledger::new();
    ledger.record("createTable:users");
    ledger.record("addIndex:users.uniq_users_email");
    store.save_ledger(&ledger).await.expect("save ledger");

    let text = std::fs::read_to_string(store.ledger_path()).expect("read ledger.json");
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid json");
    assert_eq!(json["executed"][0], "createTable:users");
    assert_eq!(json["executed"][1], "addIndex:users.uniq_users_email");
    assert!(json.get("last_executed_at").is_some());
}

/// Test that saving creates the state directory, including parents.
#[tokio::test]
async fn test_state_dir_created_on_demand() {
    let dir = TempDir::new().expect("temp dir");
    let store = StateStore::new(dir.path().join("nested").join("migrations"));

    let plan = MigrationPlan::new(Vec::new());
    store.save_plan(&plan).await.expect("save plan");

    assert!(store.plan_path().exists());
    assert!(
        store
            .load_plan()
            .await
            .expect("load plan")
            .expect("plan present")
            .is_empty()
    );
}
