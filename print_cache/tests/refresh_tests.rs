//! End-to-end refresh against a mock Scryfall: bulk index, conditional
//! download, reload.

use std::time::Duration;

use print_cache::{BulkClient, CacheConfig, CacheError, DownloadStatus, PrintCache};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn setup(mock_uri: &str, dir: &TempDir) -> (PrintCache, BulkClient) {
    let mut config = CacheConfig::with_data_dir(dir.path());
    config.http.bulk_index_url = format!("{mock_uri}/bulk-data");
    config.http.max_retries = 1;
    config.http.backoff_factor = 0.0;
    config.http.download_timeout = Duration::from_secs(5);
    let client = BulkClient::new(config.http.clone()).unwrap();
    (PrintCache::new(config), client)
}

async fn mount_bulk_index(mock_server: &MockServer) {
    let uri = mock_server.uri();
    let index = json!({
        "object": "list",
        "data": [
            {
                "type": "default_cards",
                "download_uri": format!("{uri}/default.json"),
                "updated_at": "2024-05-01T09:00:00+00:00"
            },
            {
                "type": "rulings",
                "download_uri": format!("{uri}/rulings.json")
            },
            {
                "type": "oracle_cards"
            }
        ]
    });
    Mock::given(method("GET"))
        .and(path("/bulk-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(index))
        .mount(mock_server)
        .await;
}

fn prints_body() -> String {
    json!([
        {"id": "a1", "oracle_id": "bolt", "name": "Lightning Bolt", "set": "lea", "collector_number": "161"},
        {"id": "b2", "oracle_id": "bolt", "name": "Lightning Bolt", "set": "m10", "collector_number": "146"},
        {"id": "c3", "oracle_id": "shock", "name": "Shock", "set": "m19", "collector_number": "156"}
    ])
    .to_string()
}

#[tokio::test]
async fn refresh_downloads_and_loads_prints() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (cache, client) = setup(&mock_server.uri(), &dir);
    mount_bulk_index(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/default.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"d1\"")
                .set_body_string(prints_body()),
        )
        .mount(&mock_server)
        .await;

    let report = cache
        .refresh_dataset(&client, "default_cards", false)
        .await
        .unwrap();

    assert_eq!(report.download.status, DownloadStatus::Downloaded);
    assert_eq!(report.loaded, Some(true));
    assert_eq!(report.records, 3);
    assert_eq!(report.epoch, 1);
    assert_eq!(report.updated_at.as_deref(), Some("2024-05-01T09:00:00+00:00"));
    assert_eq!(cache.find_print("m10", "146", None).unwrap().id, "b2");
    assert_eq!(cache.unique_oracle_id_by_name("Shock").as_deref(), Some("shock"));
}

#[tokio::test]
async fn unchanged_dataset_is_not_downloaded_again() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (cache, client) = setup(&mock_server.uri(), &dir);
    mount_bulk_index(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/default.json"))
        .and(header("If-None-Match", "\"d1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/default.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"d1\"")
                .set_body_string(prints_body()),
        )
        .with_priority(2)
        .mount(&mock_server)
        .await;

    let first = cache
        .refresh_dataset(&client, "default_cards", false)
        .await
        .unwrap();
    assert_eq!(first.download.status, DownloadStatus::Downloaded);
    let bytes = std::fs::read(&cache.config().prints_path).unwrap();

    let second = cache
        .refresh_dataset(&client, "default_cards", false)
        .await
        .unwrap();
    assert_eq!(second.download.status, DownloadStatus::NotModified);
    assert_eq!(std::fs::read(&cache.config().prints_path).unwrap(), bytes);
    // The reload still counts
    assert_eq!(second.epoch, 2);
    assert_eq!(second.records, 3);
}

#[tokio::test]
async fn missing_file_after_not_modified_forces_download() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (cache, client) = setup(&mock_server.uri(), &dir);
    mount_bulk_index(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/default.json"))
        .and(header("If-None-Match", "\"d1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/default.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"d1\"")
                .set_body_string(prints_body()),
        )
        .with_priority(2)
        .mount(&mock_server)
        .await;

    // Stale sidecar with no bulk file next to it
    std::fs::write(dir.path().join("scryfall_default_cards.json.etag"), "\"d1\"").unwrap();

    let report = cache
        .refresh_dataset(&client, "default_cards", false)
        .await
        .unwrap();
    assert_eq!(report.download.status, DownloadStatus::Downloaded);
    assert!(cache.config().prints_path.exists());
    assert_eq!(report.records, 3);
}

#[tokio::test]
async fn refresh_rulings_loads_rulings_index() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (cache, client) = setup(&mock_server.uri(), &dir);
    mount_bulk_index(&mock_server).await;

    let rulings = json!([
        {"oracle_id": "bolt", "source": "wotc", "published_at": "2004-10-04", "comment": "Deals 3 damage."}
    ]);
    Mock::given(method("GET"))
        .and(path("/rulings.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rulings))
        .mount(&mock_server)
        .await;

    let report = cache.refresh_dataset(&client, "rulings", false).await.unwrap();
    assert_eq!(report.loaded, Some(true));
    assert_eq!(report.epoch, 0);
    assert_eq!(cache.rulings_for("BOLT").len(), 1);
    assert!(cache.config().rulings_path.exists());
}

#[tokio::test]
async fn unknown_dataset_is_an_error() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (cache, client) = setup(&mock_server.uri(), &dir);
    mount_bulk_index(&mock_server).await;

    let result = cache.refresh_dataset(&client, "all_cards", false).await;
    assert!(matches!(result, Err(CacheError::DatasetNotFound(kind)) if kind == "all_cards"));

    let result = cache.refresh_dataset(&client, "oracle_cards", false).await;
    assert!(matches!(result, Err(CacheError::NoDownloadUri(_))));
    assert_eq!(cache.cache_epoch(), 0);
}

#[tokio::test]
async fn failed_download_keeps_loaded_data() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (cache, client) = setup(&mock_server.uri(), &dir);
    mount_bulk_index(&mock_server).await;

    std::fs::write(&cache.config().prints_path, prints_body()).unwrap();
    assert!(cache.reload(None));

    Mock::given(method("GET"))
        .and(path("/default.json"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&mock_server)
        .await;

    let result = cache.refresh_dataset(&client, "default_cards", true).await;
    assert!(matches!(result, Err(CacheError::HttpStatus(s)) if s.as_u16() == 502));
    assert_eq!(cache.cache_epoch(), 1);
    assert!(cache.cache_ready());
    assert_eq!(
        std::fs::read_to_string(&cache.config().prints_path).unwrap(),
        prints_body()
    );
}

#[tokio::test]
async fn concurrent_refreshes_run_one_after_the_other() {
    let mock_server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let (cache, client) = setup(&mock_server.uri(), &dir);
    mount_bulk_index(&mock_server).await;

    Mock::given(method("GET"))
        .and(path("/default.json"))
        .and(header("If-None-Match", "\"d1\""))
        .respond_with(ResponseTemplate::new(304))
        .with_priority(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/default.json"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"d1\"")
                .set_body_string(prints_body()),
        )
        .with_priority(2)
        .expect(1)
        .mount(&mock_server)
        .await;

    let (first, second) = tokio::join!(
        cache.refresh_dataset(&client, "default_cards", false),
        cache.refresh_dataset(&client, "default_cards", false),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    // The second refresh sees the ETag stored by the first
    let mut statuses = vec![first.download.status, second.download.status];
    statuses.sort_by_key(|s| *s == DownloadStatus::NotModified);
    assert_eq!(
        statuses,
        vec![DownloadStatus::Downloaded, DownloadStatus::NotModified]
    );
    assert_eq!(cache.cache_epoch(), 2);
    assert_eq!(cache.generation().index().len(), 3);
}
