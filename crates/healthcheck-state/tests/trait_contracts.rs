//! Trait contract tests for SchemaSource and TargetConnection.
//!
//! These tests verify the behavioral contracts of the storage traits
//! using in-memory fakes. Any conforming implementation must pass these.

use std::sync::Arc;

use healthcheck_state::fakes::{MemorySchema, MemorySchemaSource};
use healthcheck_state::storage_traits::*;
use healthcheck_state::StateError;

// ===========================================================================
// SchemaSource contract tests
// ===========================================================================

#[tokio::test]
async fn source_lists_each_schema_once() {
    let source = MemorySchemaSource::with_schemas(["b_core_1", "a_core_1", "b_core_1"]);
    let schemas = source.list_schemas().await.unwrap();

    assert_eq!(schemas, vec!["a_core_1".to_string(), "b_core_1".to_string()]);
}

#[tokio::test]
async fn source_connect_binds_schema() {
    let source = MemorySchemaSource::with_schemas(["homo_sapiens_core_110_38"]);
    let conn = source.connect("homo_sapiens_core_110_38").await.unwrap();

    assert_eq!(conn.schema(), "homo_sapiens_core_110_38");
    conn.ping().await.unwrap();
    assert_eq!(source.connect_count(), 1);
}

#[tokio::test]
async fn source_connect_unknown_schema_is_not_found() {
    let source = MemorySchemaSource::with_schemas(["known"]);
    let err = source.connect("unknown").await.err().unwrap();

    assert!(matches!(err, StateError::SchemaNotFound(name) if name == "unknown"));
}

#[tokio::test]
async fn source_connect_unreachable_schema_fails() {
    let source = MemorySchemaSource::new();
    source.insert("broken_core_1", MemorySchema::new().unreachable());
    let err = source.connect("broken_core_1").await.err().unwrap();

    assert!(matches!(err, StateError::Unreachable { .. }));
    assert_eq!(source.connect_count(), 0);
}

// ===========================================================================
// TargetConnection contract tests
// ===========================================================================

#[tokio::test]
async fn connection_counts_are_scoped_by_condition() {
    let source = MemorySchemaSource::new();
    source.insert(
        "mus_musculus_core_110_39",
        MemorySchema::new()
            .with_count("assembly", None, 120)
            .with_count("assembly", Some("asm_start < 1"), 3),
    );
    let conn = source.connect("mus_musculus_core_110_39").await.unwrap();

    assert_eq!(conn.count("assembly", None).await.unwrap(), 120);
    assert_eq!(conn.count("assembly", Some("asm_start < 1")).await.unwrap(), 3);
    assert_eq!(conn.count("exon", None).await.unwrap(), 0);
}

#[tokio::test]
async fn connection_rejects_invalid_table_names() {
    let source = MemorySchemaSource::with_schemas(["s"]);
    let conn = source.connect("s").await.unwrap();
    let err = conn.count("exon; REMOVE TABLE exon", None).await.unwrap_err();

    assert!(matches!(err, StateError::InvalidInput(_)));
}

#[tokio::test]
async fn connection_surfaces_query_failures() {
    let source = MemorySchemaSource::new();
    source.insert("s", MemorySchema::new().failing_table("translation"));
    let conn = source.connect("s").await.unwrap();

    assert!(matches!(
        conn.count("translation", None).await,
        Err(StateError::Query(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn connection_is_shareable_across_tasks() {
    let source = MemorySchemaSource::new();
    source.insert("s", MemorySchema::new().with_count("gene", None, 7));
    let conn: Arc<dyn TargetConnection> = source.connect("s").await.unwrap();

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let conn = Arc::clone(&conn);
        tasks.push(tokio::spawn(async move { conn.count("gene", None).await }));
    }
    for task in tasks {
        assert_eq!(task.await.unwrap().unwrap(), 7);
    }
}

#[tokio::test]
async fn connection_select_projects_and_limits() {
    let row = |name: &str| -> Row {
        [
            ("name".to_string(), name.to_string()),
            ("coord_system_name".to_string(), "chromosome".to_string()),
            ("length".to_string(), "100".to_string()),
        ]
        .into_iter()
        .collect()
    };
    let source = MemorySchemaSource::new();
    source.insert(
        "s",
        MemorySchema::new().with_rows(
            "seq_region",
            Some("length < 10"),
            vec![row("1"), row("2"), row("3")],
        ),
    );
    let conn = source.connect("s").await.unwrap();

    let rows = conn
        .select("seq_region", &["name", "coord_system.name"], Some("length < 10"), 2)
        .await
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0]["name"], "1");
    assert_eq!(rows[0]["coord_system_name"], "chromosome");
    assert!(!rows[0].contains_key("length"));

    let none = conn
        .select("seq_region", &["name"], None, 50)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn connection_select_rejects_bad_columns() {
    let source = MemorySchemaSource::with_schemas(["s"]);
    let conn = source.connect("s").await.unwrap();

    for columns in [&[][..], &["name; REMOVE TABLE seq_region"][..]] {
        let err = conn.select("seq_region", columns, None, 1).await.unwrap_err();
        assert!(matches!(err, StateError::InvalidInput(_)));
    }
}
