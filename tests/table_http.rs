//! Status table served over HTTP and consumed through HttpTable

use std::sync::Arc;

use meerkat::common::MonitorConfig;
use meerkat::node::{CommandQueue, CommandType, NodeStatus, StatusRegistry};
use meerkat::table::{http, HttpTable, MemTable, RocksTable, StatusTable};
use serde_json::Value;
use tempfile::TempDir;
use tokio::net::TcpListener;

async fn start_table(table: Arc<dyn StatusTable>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(http::serve(listener, table));
    url
}

#[tokio::test]
async fn test_health() {
    let url = start_table(Arc::new(MemTable::new())).await;
    HttpTable::new(url.clone()).unwrap().ping().await.unwrap();

    let json: Value = reqwest::get(format!("{}/health", url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn test_read_write_through_http() {
    let url = start_table(Arc::new(MemTable::new())).await;
    let table = HttpTable::new(url).unwrap();

    let row = vec!["1", "x:1-2", "L", "t", "1"];
    table
        .write_range("Status", 'b', 5, 'f', row.iter().map(|s| s.to_string()).collect())
        .await
        .unwrap();
    table.write_cell("Status", 'c', 3, "x:1-2").await.unwrap();

    let rows = table.read_range("Status", 'b', 5, 'f', 6).await.unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0], row);
    assert_eq!(rows[1], vec!["", "", "", "", ""]);

    // clearing a cell reads back empty
    table.write_cell("Status", 'b', 5, "").await.unwrap();
    let rows = table.read_range("Status", 'b', 5, 'b', 5).await.unwrap();
    assert_eq!(rows[0], vec![""]);
}

#[tokio::test]
async fn test_sheet_names_are_encoded() {
    let url = start_table(Arc::new(MemTable::new())).await;
    let table = HttpTable::new(url).unwrap();

    table.write_cell("Fleet Status", 'c', 3, "a").await.unwrap();
    table.write_cell("Fleet/Other", 'c', 3, "b").await.unwrap();

    let rows = table.read_range("Fleet Status", 'c', 3, 'c', 3).await.unwrap();
    assert_eq!(rows[0], vec!["a"]);
    let rows = table.read_range("Fleet/Other", 'c', 3, 'c', 3).await.unwrap();
    assert_eq!(rows[0], vec!["b"]);
}

#[tokio::test]
async fn test_bad_requests_are_rejected() {
    let url = start_table(Arc::new(MemTable::new())).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/v1/sheets/Status/range?from=5b&to=f6", url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("cell"));

    let resp = client
        .put(format!("{}/v1/sheets/Status/range", url))
        .json(&serde_json::json!({ "from": "b5", "to": "f6", "values": ["1"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

    let table = HttpTable::new(url).unwrap();
    assert!(table.read_range("Status", 'f', 5, 'b', 5).await.is_err());
}

#[tokio::test]
async fn test_oversized_range_is_rejected() {
    let table: Arc<dyn StatusTable> = Arc::new(MemTable::new());
    let url = start_table(table).await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/v1/sheets/Status/range?from=a1&to=z4000000000", url))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let json: Value = resp.json().await.unwrap();
    assert!(json["error"].as_str().unwrap().contains("exceeds"));

    // the service is still up and answering normal reads
    let table = HttpTable::new(url).unwrap();
    table.ping().await.unwrap();
    let rows = table.read_range("Status", 'b', 5, 'f', 24).await.unwrap();
    assert_eq!(rows.len(), 20);
}

#[tokio::test]
async fn test_registry_and_queue_over_rocksdb() {
    let dir = TempDir::new().unwrap();
    let rocks = Arc::new(RocksTable::open(dir.path().join("cells")).unwrap());
    let url = start_table(rocks).await;

    let table: Arc<dyn StatusTable> = Arc::new(HttpTable::new(url).unwrap());
    let config = MonitorConfig::default();
    let registry = StatusRegistry::new(table.clone(), config.clone());
    let queue = CommandQueue::new(table, config);

    let a = registry.register("10.0.0.1:4096-20240101120000").await.unwrap();
    let b = registry.register("10.0.0.2:4096-20240101120000").await.unwrap();
    assert_eq!((a, b), (5, 6));

    let rows = registry.active_rows().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.status == NodeStatus::Live && r.count == 1));

    registry.retire(a).await.unwrap();
    let peers = registry.discover_peers("nobody").await.unwrap();
    assert_eq!(peers.len(), 1);
    assert_eq!(peers[0].row_number, b);

    let queued = queue.enqueue(CommandType::All, "$print hi").await.unwrap();
    assert_eq!(queue.head().await.unwrap(), Some(queued));
    queue.pop().await.unwrap();
    assert_eq!(queue.head().await.unwrap(), None);
}
