mod common;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::json;

#[tokio::test]
async fn trace_crud_round_trip() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    // Starts empty
    let res = client
        .get(format!("{}/admin/traces", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert!(body["success"].as_bool().unwrap_or(false), "body: {}", body);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(0));

    // Create
    let res = client
        .post(format!("{}/admin/traces", server.base_url))
        .json(&json!({
            "title": "Upstream feed",
            "url": "/trace/upstream",
            "modelSetKey": "ms1",
            "faIcon": "bolt"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::CREATED);
    let body = res.json::<serde_json::Value>().await?;
    let id = body["data"]["id"].as_i64().expect("created id");

    // Read back
    let res = client
        .get(format!("{}/admin/traces/{}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["title"], json!("Upstream feed"));
    assert_eq!(body["data"]["modelSetKey"], json!("ms1"));

    // Update
    let res = client
        .put(format!("{}/admin/traces/{}", server.base_url, id))
        .json(&json!({ "title": "Downstream feed", "url": "/trace/downstream" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["title"], json!("Downstream feed"));

    // Delete
    let res = client
        .delete(format!("{}/admin/traces/{}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);

    let res = client
        .get(format!("{}/admin/traces/{}", server.base_url, id))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn invalid_payload_is_rejected() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    // Missing the required url field
    let res = client
        .post(format!("{}/admin/traces", server.base_url))
        .json(&json!({ "title": "No url" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    // Not an object at all
    let res = client
        .post(format!("{}/admin/traces", server.base_url))
        .json(&json!(["not", "an", "object"]))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);

    Ok(())
}

#[tokio::test]
async fn mutating_missing_records_is_not_found() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    let res = client
        .put(format!("{}/admin/traces/4242", server.base_url))
        .json(&json!({ "title": "ghost", "url": "/nowhere" }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = client
        .delete(format!("{}/admin/traces/4242", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    Ok(())
}

#[tokio::test]
async fn settings_list_and_update() -> Result<()> {
    let server = common::spawn_server().await?;
    let client = reqwest::Client::new();

    // The platform normally seeds settings; do it through the handler here.
    let created = server
        .plugin
        .settings_handler()
        .create(
            match json!({
                "key": "Trace Colors",
                "type": "char",
                "char_value": "red, green"
            }) {
                serde_json::Value::Object(map) => map,
                _ => unreachable!(),
            },
        )
        .await?;
    let id = created.id.expect("setting id");

    let res = client
        .get(format!("{}/admin/settings", server.base_url))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));

    let res = client
        .put(format!("{}/admin/settings/{}", server.base_url, id))
        .json(&json!({
            "key": "Trace Colors",
            "type": "char",
            "char_value": "blue, orange"
        }))
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body = res.json::<serde_json::Value>().await?;
    assert_eq!(body["data"]["char_value"], json!("blue, orange"));

    Ok(())
}
