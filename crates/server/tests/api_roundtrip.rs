use std::sync::Arc;
use std::time::Duration;

use clientela_core::domain::customer::{CustomerId, CustomerPatch, NewCustomer};
use clientela_core::errors::StoreError;
use clientela_db::repositories::{InMemoryCustomerStore, RestCustomerStore};
use clientela_db::CustomerStore;
use clientela_server::{api, health};

async fn spawn_server() -> String {
    let store: Arc<dyn CustomerStore> = Arc::new(InMemoryCustomerStore::default());
    let app = api::router(Arc::clone(&store)).merge(health::router(store));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let address = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{address}")
}

fn fields(first_name: &str, last_name: &str, email: &str) -> NewCustomer {
    NewCustomer {
        first_name: first_name.to_string(),
        last_name: last_name.to_string(),
        email: email.to_string(),
        phone: "555-0100".to_string(),
        address: "Main St 1".to_string(),
        photo: None,
    }
}

#[tokio::test]
async fn rest_store_round_trips_through_the_server() {
    let base_url = spawn_server().await;
    let remote =
        RestCustomerStore::new(&base_url, Duration::from_secs(5), None).expect("rest store");

    assert!(remote.list().await.expect("initial list").is_empty());

    let ana = remote.create(fields("Ana", "Lopez", "ana@x.com")).await.expect("create ana");
    let juan = remote.create(fields("Juan", "García", "juan@x.com")).await.expect("create juan");
    assert_ne!(ana.id, juan.id);

    let fetched = remote.get_by_id(&ana.id).await.expect("get").expect("ana present");
    assert_eq!(fetched, ana);

    let updated = remote
        .update(
            &ana.id,
            CustomerPatch { phone: Some("555-0199".to_string()), ..CustomerPatch::default() },
        )
        .await
        .expect("update");
    assert_eq!(updated.phone, "555-0199");
    assert_eq!(updated.first_name, "Ana");
    assert_eq!(updated.created_at, ana.created_at);
    assert!(updated.updated_at.is_some());

    let found = remote.search("GARC").await.expect("search");
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id, juan.id);

    let ack = remote.delete(&juan.id).await.expect("delete");
    assert!(ack.success);
    assert_eq!(ack.id, juan.id);

    let remaining = remote.list().await.expect("list after delete");
    assert_eq!(remaining, vec![updated]);
}

#[tokio::test]
async fn rest_store_maps_server_errors_back_to_store_errors() {
    let base_url = spawn_server().await;
    let remote =
        RestCustomerStore::new(&base_url, Duration::from_secs(5), None).expect("rest store");

    let missing = CustomerId::from("missing");
    assert_eq!(remote.get_by_id(&missing).await.expect("get"), None);

    let error = remote
        .update(&missing, CustomerPatch { phone: Some("1".to_string()), ..Default::default() })
        .await
        .expect_err("update of absent id");
    assert!(matches!(error, StoreError::NotFound(ref id) if id == &missing));

    let error =
        remote.create(fields("", "Lopez", "ana@x.com")).await.expect_err("blank first name");
    assert_eq!(error.kind(), "validation");
}

#[tokio::test]
async fn health_endpoint_reports_ready() {
    let base_url = spawn_server().await;
    let response = reqwest::get(format!("{base_url}/health")).await.expect("health request");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    let body: serde_json::Value = response.json().await.expect("health body");
    assert_eq!(body["status"], "ready");
}
