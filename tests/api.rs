use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use prometheus_api::model::{ColumnDecl, EntityDecl};
use prometheus_api::{app, migration, models, seed, App, Mode, Registry, Settings};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

async fn setup() -> App {
    let settings = Settings::for_mode(Mode::Test);
    let app = app::init(&settings).await.unwrap();
    migration::create_all(&app.state.pool, &app.state.registry).await.unwrap();
    app
}

async fn seed_batches(app: &App, batches: std::ops::Range<usize>) {
    let dataset = seed::init_values();
    let pieces = seed::process(&dataset[batches], &app.state.registry).unwrap();
    seed::load(&app.state.pool, &app.state.registry, &pieces).await.unwrap();
}

async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(serde_json::to_vec(&v).unwrap()),
        None => Body::empty(),
    };
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("Content-Type", "application/json")
                .header("Host", "localhost:5000")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn count(router: &Router, table: &str) -> i64 {
    let (status, body) = send(router, "GET", &format!("/{}", table), None).await;
    assert_eq!(status, StatusCode::OK);
    body["num_results"].as_i64().unwrap()
}

#[tokio::test]
async fn seeding_lookup_tables_fills_listing() {
    let app = setup().await;
    let router = app.router();
    assert_eq!(count(&router, "commodity_type").await, 0);

    seed_batches(&app, 0..2).await;
    let (status, body) = send(&router, "GET", "/commodity_type", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["num_results"], 6);
    assert_eq!(body["page"], 1);
    assert_eq!(body["total_pages"], 1);
    assert_eq!(body["objects"][0]["name"], "Stock");
    assert_eq!(body["objects"][0]["group"]["name"], "Security");
}

#[tokio::test]
async fn patch_links_existing_or_creates_related_row() {
    let app = setup().await;
    let router = app.router();
    seed_batches(&app, 0..3).await;

    let (status, body) = send(&router, "PATCH", "/commodity/1", Some(json!({"type": {"add": {"id": 2}}}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type_id"], 2);
    assert_eq!(body["type"]["name"], "Bond");
    assert_eq!(count(&router, "commodity_type").await, 6);

    let (status, body) = send(
        &router,
        "PATCH",
        "/commodity/1",
        Some(json!({"type": {"add": {"name": "Crypto", "group_id": 2}}})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["type"]["name"], "Crypto");
    assert_eq!(count(&router, "commodity_type").await, 7);

    let (status, _) = send(&router, "PATCH", "/commodity/1", Some(json!({"type": {"add": {"id": 99}}}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn create_with_nested_relation() {
    let app = setup().await;
    let router = app.router();
    seed_batches(&app, 0..3).await;
    assert_eq!(count(&router, "event_type").await, 5);

    let event = json!({
        "commodity_id": 6,
        "currency_id": 1,
        "value": 0.11,
        "date": "1/22/12",
        "type": {"name": "Rights Issue"},
    });
    let (status, body) = send(&router, "POST", "/event", Some(event)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["date"], "2012-01-22");
    assert_eq!(body["value"], "0.11");
    assert_eq!(body["type"]["name"], "Rights Issue");
    assert_eq!(body["commodity"]["symbol"], "AAPL");
    assert_eq!(count(&router, "event_type").await, 6);
}

#[tokio::test]
async fn price_round_trip_and_delete() {
    let app = setup().await;
    let router = app.router();
    seed_batches(&app, 0..3).await;

    let (status, created) = send(
        &router,
        "POST",
        "/price",
        Some(json!({"commodity_id": 6, "currency_id": 1, "close": 120.5, "date": "2015-03-02"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = created["id"].as_i64().unwrap();

    let (status, read) = send(&router, "GET", &format!("/price/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["close"], "120.5");
    assert_eq!(read["date"], "2015-03-02");
    assert_eq!(read["currency"]["symbol"], "USD");

    let (status, body) = send(&router, "DELETE", &format!("/price/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    let (status, body) = send(&router, "DELETE", &format!("/price/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn invalid_bodies_are_rejected() {
    let app = setup().await;
    let router = app.router();
    seed_batches(&app, 0..1).await;

    let (status, body) = send(&router, "POST", "/exchange", Some(json!({"name": "LSE"}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["symbol"], "symbol is required");

    let (status, _) = send(&router, "POST", "/exchange", Some(json!({"name": "LSE", "symbol": "LSE", "colour": 1}))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, _) = send(&router, "POST", "/exchange", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&router, "GET", "/exchange/abc", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn seeding_in_reverse_order_violates_foreign_keys() {
    let app = setup().await;
    let router = app.router();
    let mut dataset = seed::init_values();
    dataset.reverse();
    let pieces = seed::process(&dataset, &app.state.registry).unwrap();
    let err = seed::load(&app.state.pool, &app.state.registry, &pieces).await.unwrap_err();
    assert_eq!(err.status(), StatusCode::CONFLICT);

    for table in app.state.registry.table_names() {
        assert_eq!(count(&router, table).await, 0, "{} kept rows", table);
    }
}

#[tokio::test]
async fn seeding_in_order_loads_every_batch() {
    let app = setup().await;
    let router = app.router();
    seed_batches(&app, 0..4).await;
    assert_eq!(count(&router, "commodity").await, 7);
    assert_eq!(count(&router, "holding").await, 1);
}

#[tokio::test]
async fn decimals_round_trip_exactly() {
    let app = setup().await;
    let router = app.router();
    seed_batches(&app, 0..3).await;

    let (status, created) = send(
        &router,
        "POST",
        "/price",
        Some(json!({"commodity_id": 6, "currency_id": 1, "close": "123456789012345678.25"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["close"], "123456789012345678.25");

    let (status, read) = send(&router, "GET", &format!("/price/{}", created["id"]), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["close"], "123456789012345678.25");

    // q={"filters":[{"name":"close","op":"gt","val":1000}]}
    let q = "%7B%22filters%22%3A%5B%7B%22name%22%3A%22close%22%2C%22op%22%3A%22gt%22%2C%22val%22%3A1000%7D%5D%7D";
    let (status, body) = send(&router, "GET", &format!("/price?q={}", q), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["num_results"], 1);

    let (status, body) = send(
        &router,
        "POST",
        "/price",
        Some(json!({"commodity_id": 6, "currency_id": 1, "close": "12,5"})),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["details"]["close"], "must be a decimal number");
}

#[tokio::test]
async fn datetimes_round_trip_and_stay_out_of_docs() {
    let app = setup().await;
    let router = app.router();

    let (status, created) = send(
        &router,
        "POST",
        "/exchange",
        Some(json!({"name": "London", "symbol": "LSE", "utc_created": "2016-02-03T04:05:06Z"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["utc_created"], "2016-02-03T04:05:06");
    let updated = created["utc_updated"].as_str().unwrap();
    assert_eq!(updated.len(), 19);
    assert_eq!(&updated[10..11], "T");

    let (_, docs) = send(&router, "GET", "/swagger.json", None).await;
    for name in ["exchange", "exchange_flat"] {
        let props = docs["definitions"][name]["properties"].as_object().unwrap();
        assert!(!props.contains_key("utc_created"));
        assert!(!props.contains_key("utc_updated"));
    }
}

#[tokio::test]
async fn oversized_body_is_a_json_error() {
    let app = setup().await;
    let router = app.router();
    let payload = vec![b' '; 3 * 1024 * 1024];
    let response = router
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/exchange")
                .header("Content-Type", "application/json")
                .body(Body::from(payload))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(
        response.headers()["content-type"],
        "application/json; charset=utf-8"
    );
    assert_eq!(response.headers()["access-control-allow-origin"], "*");
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], "payload_too_large");
}

static WATCHLIST: EntityDecl = EntityDecl {
    entity_name: "Watchlist",
    doc: Some("Symbols to follow"),
    columns: &[ColumnDecl::new("name", "VARCHAR(32)"), ColumnDecl::new("target", "NUMERIC")],
    relations: &[],
    bases: &[&models::ENTITY],
};

#[tokio::test]
async fn caller_declared_tables_serve_alone() {
    let registry = Registry::from_decls(&[&WATCHLIST]).unwrap();
    let app = app::init_with(&Settings::for_mode(Mode::Test), registry).await.unwrap();
    migration::create_all(&app.state.pool, &app.state.registry).await.unwrap();
    let router = app.router();

    let (status, created) = send(&router, "POST", "/watchlist", Some(json!({"name": "tech", "target": 99.5}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["target"], "99.5");
    assert_eq!(count(&router, "watchlist").await, 1);

    let (status, _) = send(&router, "GET", "/commodity", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        app.api.bound_paths().into_iter().collect::<Vec<_>>(),
        vec!["/eval/watchlist", "/watchlist", "/watchlist/{watchlist_id}"]
    );
}

#[tokio::test]
async fn search_filters_and_eval() {
    let app = setup().await;
    let router = app.router();
    seed_batches(&app, 0..3).await;

    let (status, body) = send(&router, "GET", "/commodity?symbol=USD", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["num_results"], 1);
    assert_eq!(body["objects"][0]["name"], "US Dollar");

    // q={"filters":[{"name":"symbol","op":"eq","val":"EUR"}],"single":true}
    let q = "%7B%22filters%22%3A%5B%7B%22name%22%3A%22symbol%22%2C%22op%22%3A%22eq%22%2C%22val%22%3A%22EUR%22%7D%5D%2C%22single%22%3Atrue%7D";
    let (status, body) = send(&router, "GET", &format!("/commodity?q={}", q), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Euro");

    let (status, body) = send(&router, "GET", "/commodity?results_per_page=3&page=3", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["num_results"], 7);
    assert_eq!(body["total_pages"], 3);
    assert_eq!(body["objects"].as_array().unwrap().len(), 1);

    // q={"functions":[{"name":"count","field":"id"}]}
    let q = "%7B%22functions%22%3A%5B%7B%22name%22%3A%22count%22%2C%22field%22%3A%22id%22%7D%5D%7D";
    let (status, body) = send(&router, "GET", &format!("/eval/commodity?q={}", q), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count__id"], 7);

    let (status, _) = send(&router, "GET", "/commodity?colour=red", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unbound_methods_and_paths() {
    let app = setup().await;
    let router = app.router();

    let (status, body) = send(&router, "DELETE", "/commodity", None).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "method_not_allowed");

    let (status, body) = send(&router, "GET", "/nothing_here", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn operational_routes() {
    let app = setup().await;
    let router = app.router();

    let (status, body) = send(&router, "GET", "/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Welcome to the Prometheus API!");

    let (status, body) = send(&router, "GET", "/keys/", None).await;
    assert_eq!(status, StatusCode::OK);
    let exchange = body.as_array().unwrap().iter().find(|k| k["table"] == "exchange").unwrap();
    assert_eq!(exchange["columns"], json!(["name", "symbol"]));

    let (status, body) = send(&router, "GET", "/init_values/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body[0]["table"], "exchange");
    assert_eq!(body[0]["data"][0]["symbol"], "NYSE");

    seed_batches(&app, 0..1).await;
    assert_eq!(count(&router, "exchange").await, 4);
    let (status, body) = send(&router, "GET", "/reset/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Database reset!");
    assert_eq!(count(&router, "exchange").await, 0);
}

#[tokio::test]
async fn swagger_describes_exactly_the_bound_routes() {
    let app = setup().await;
    let router = app.router();

    let (status, body) = send(&router, "GET", "/swagger.json", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["swagger"], "2.0");
    assert_eq!(body["host"], "localhost:5000");

    let documented: std::collections::BTreeSet<String> =
        body["paths"].as_object().unwrap().keys().cloned().collect();
    assert_eq!(documented, app.api.bound_paths());
    assert!(body["definitions"]["commodity"]["properties"].get("utc_created").is_none());
}
