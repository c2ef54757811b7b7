use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::json;

use trove_api::app::AppServices;
use trove_catalog::CatalogItem;
use trove_core::{ExpectedVersion, Predicate};
use trove_infra::AppConfig;
use trove_infra::store::{InMemoryRecordStore, RecordStore, SharedStore, StoreError};
use trove_inventory::InventoryRecord;

struct TestServer {
    base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn spawn() -> Self {
        // Same router as prod (in-memory stores, seeded catalog), ephemeral port.
        let app = trove_api::app::build_app(&AppConfig::default())
            .await
            .expect("failed to build app");
        Self::serve(app).await
    }

    async fn serve(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { base_url, handle }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn catalog_id(client: &reqwest::Client, srv: &TestServer, name: &str) -> String {
    let items: Vec<serde_json::Value> = client
        .get(srv.url("/catalog/items"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    items
        .iter()
        .find(|i| i["name"] == name)
        .and_then(|i| i["id"].as_str())
        .unwrap_or_else(|| panic!("catalog item {name} not seeded"))
        .to_string()
}

async fn grant(
    client: &reqwest::Client,
    srv: &TestServer,
    user_id: &str,
    catalog_item_id: &str,
    quantity: i64,
) -> reqwest::Response {
    client
        .post(srv.url("/items"))
        .json(&json!({
            "userId": user_id,
            "catalogItemId": catalog_item_id,
            "quantity": quantity,
        }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn health_is_ok() {
    let srv = TestServer::spawn().await;
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn grants_accumulate_and_list_joins_catalog_metadata() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let potion = catalog_id(&client, &srv, "Potion").await;
    let sword = catalog_id(&client, &srv, "Bronze sword").await;
    let user = uuid::Uuid::now_v7().to_string();

    assert_eq!(grant(&client, &srv, &user, &potion, 5).await.status(), StatusCode::OK);
    assert_eq!(grant(&client, &srv, &user, &potion, 3).await.status(), StatusCode::OK);
    assert_eq!(grant(&client, &srv, &user, &sword, 1).await.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/items?userId={user}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let items: Vec<serde_json::Value> = res.json().await.unwrap();
    assert_eq!(items.len(), 2);

    let potion_view = items.iter().find(|i| i["catalogItemId"] == potion.as_str()).unwrap();
    assert_eq!(potion_view["name"], "Potion");
    assert_eq!(potion_view["description"], "Restores a small amount of HP");
    assert_eq!(potion_view["quantity"], 8);

    let sword_view = items.iter().find(|i| i["catalogItemId"] == sword.as_str()).unwrap();
    assert_eq!(sword_view["quantity"], 1);
}

#[tokio::test]
async fn listing_for_unknown_user_is_empty() {
    let srv = TestServer::spawn().await;
    let user = uuid::Uuid::now_v7();
    let res = reqwest::get(srv.url(&format!("/items?userId={user}"))).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let items: Vec<serde_json::Value> = res.json().await.unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn listing_requires_a_usable_user_id() {
    let srv = TestServer::spawn().await;

    for query in [
        "/items",
        "/items?userId=",
        "/items?userId=%20%20",
        "/items?userId=00000000-0000-0000-0000-000000000000",
        "/items?userId=not-a-uuid",
    ] {
        let res = reqwest::get(srv.url(query)).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "query {query}");
        let body: serde_json::Value = res.json().await.unwrap();
        assert_eq!(body["error"], "validation_error");
    }
}

#[tokio::test]
async fn grant_rejects_invalid_requests() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let potion = catalog_id(&client, &srv, "Potion").await;
    let user = uuid::Uuid::now_v7().to_string();

    let res = grant(&client, &srv, &user, &potion, 0).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = grant(&client, &srv, &user, &potion, -4).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = grant(&client, &srv, &uuid::Uuid::nil().to_string(), &potion, 1).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/items"))
        .json(&json!({ "userId": user }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Nothing was written by any rejected grant.
    let items: Vec<serde_json::Value> = client
        .get(srv.url(&format!("/items?userId={user}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn granting_an_unknown_catalog_item_surfaces_on_list() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let user = uuid::Uuid::now_v7().to_string();
    let unknown = uuid::Uuid::now_v7().to_string();

    // Grants do not consult the catalog.
    assert_eq!(grant(&client, &srv, &user, &unknown, 1).await.status(), StatusCode::OK);

    let res = client
        .get(srv.url(&format!("/items?userId={user}")))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "dangling_reference");
}

#[tokio::test]
async fn catalog_crud_roundtrip() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(srv.url("/catalog/items"))
        .json(&json!({ "name": "Ether", "description": "Restores MP", "price": 900 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::CREATED);
    let created: serde_json::Value = res.json().await.unwrap();
    let id = created["id"].as_str().unwrap().to_string();
    assert_eq!(created["price"], 900);

    let res = client
        .put(srv.url(&format!("/catalog/items/{id}")))
        .json(&json!({ "name": "Hi-Ether", "description": "Restores a lot of MP", "price": 1500 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);

    let fetched: serde_json::Value = client
        .get(srv.url(&format!("/catalog/items/{id}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(fetched["name"], "Hi-Ether");
    assert_eq!(fetched["price"], 1500);

    // Catalog edits show up in inventory listings at query time.
    let user = uuid::Uuid::now_v7().to_string();
    assert_eq!(grant(&client, &srv, &user, &id, 2).await.status(), StatusCode::OK);
    let items: Vec<serde_json::Value> = client
        .get(srv.url(&format!("/items?userId={user}")))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(items[0]["name"], "Hi-Ether");
}

#[tokio::test]
async fn catalog_errors_map_to_status_codes() {
    let srv = TestServer::spawn().await;
    let client = reqwest::Client::new();
    let missing = uuid::Uuid::now_v7();

    let res = client.get(srv.url(&format!("/catalog/items/{missing}"))).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .put(srv.url(&format!("/catalog/items/{missing}")))
        .json(&json!({ "name": "x", "price": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client.get(srv.url("/catalog/items/garbage")).send().await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    let res = client
        .post(srv.url("/catalog/items"))
        .json(&json!({ "name": "  ", "price": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

/// Inventory store whose reads stall longer than any test deadline.
struct StalledStore {
    inner: InMemoryRecordStore<InventoryRecord>,
    delay: Duration,
}

#[async_trait::async_trait]
impl RecordStore<InventoryRecord> for StalledStore {
    async fn get_all(&self, predicate: &Predicate) -> Result<Vec<InventoryRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_all(predicate).await
    }

    async fn get_one(&self, predicate: &Predicate) -> Result<Option<InventoryRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get_one(predicate).await
    }

    async fn create(&self, record: InventoryRecord) -> Result<InventoryRecord, StoreError> {
        self.inner.create(record).await
    }

    async fn update(
        &self,
        record: InventoryRecord,
        expected: ExpectedVersion,
    ) -> Result<InventoryRecord, StoreError> {
        self.inner.update(record, expected).await
    }
}

#[tokio::test]
async fn requests_past_the_deadline_time_out() {
    let inventory: SharedStore<InventoryRecord> = Arc::new(StalledStore {
        inner: InMemoryRecordStore::new(),
        delay: Duration::from_secs(5),
    });
    let catalog: SharedStore<CatalogItem> = Arc::new(InMemoryRecordStore::new());
    let services = Arc::new(AppServices::new(inventory, catalog, 8));
    let srv = TestServer::serve(trove_api::app::router(services, Duration::from_millis(50))).await;
    let user = uuid::Uuid::now_v7();

    let res = reqwest::get(srv.url(&format!("/items?userId={user}"))).await.unwrap();
    assert_eq!(res.status(), StatusCode::REQUEST_TIMEOUT);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "timeout");

    // Routes that skip the stalled store still answer within the deadline.
    let res = reqwest::get(srv.url("/health")).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_query_strings_use_the_error_envelope() {
    let srv = TestServer::spawn().await;
    let user = uuid::Uuid::now_v7();

    let res = reqwest::get(srv.url(&format!("/items?userId={user}&userId={user}")))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: serde_json::Value = res.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}
