//! End-to-end tests driving the router the way clients do: append and
//! retrieve across topics with a moving cursor, and a live watch stream
//! read frame by frame.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::time::timeout;
use tower::util::ServiceExt;

use maildrop_core::{Message, MessageStore, MessagesResponse};
use maildrop_server::{AppState, create_router};
use maildrop_storage::{MessageStoreConfig, RedbMessageStore};

async fn test_state(dir: &TempDir) -> AppState {
    let store = RedbMessageStore::open(MessageStoreConfig {
        db_path: dir.path().join("messages.redb"),
        retention: Duration::from_secs(24 * 60 * 60),
        gc_interval: Duration::from_secs(600),
    })
    .unwrap();

    AppState {
        store: Arc::new(store),
        push_interval: Duration::from_millis(10),
        metrics: None,
    }
}

fn sample_items() -> Vec<Value> {
    vec![
        json!({"A": "Hi", "B": 0.0}),
        json!({"A": "Hello", "B": 1.0}),
        json!({"A": "Bonjour", "B": 2.0}),
        json!({"A": "Hola", "B": 3.0}),
        json!({"A": "Shalom", "B": 4.0}),
    ]
}

async fn do_append(app: &Router, topic: &str, item: &Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/topics/{topic}"))
                .body(Body::from(serde_json::to_vec(item).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

async fn do_get(app: &Router, topic: &str, generation_id: &str, from_index: &str) -> MessagesResponse {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri(format!(
                    "/topics/{topic}?generationID={generation_id}&fromIndex={from_index}"
                ))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn generation_id(app: &Router) -> String {
    do_get(app, "_invalid_topic_", "", "").await.generation_id
}

#[tokio::test]
async fn append_and_get_with_moving_cursor() {
    let dir = TempDir::new().unwrap();
    let app = create_router(test_state(&dir).await);
    let generation = generation_id(&app).await;

    let items = sample_items();
    for topic in ["topic0", "topic1", "topic2", "topic3"] {
        for (idx, item) in items.iter().enumerate() {
            do_append(&app, topic, item).await;

            // Read back one object at a time through the cursor.
            let from_index = (idx + 1).to_string();
            let batch = do_get(&app, topic, &generation, &from_index).await;
            assert_eq!(batch.generation_id, generation);
            assert_eq!(batch.messages.len(), 1, "topic {topic}, index {from_index}");
            assert_eq!(batch.messages[0].data, *item);
        }
    }
}

#[tokio::test]
async fn foreign_generation_replays_full_history() {
    let dir = TempDir::new().unwrap();
    let app = create_router(test_state(&dir).await);

    do_append(&app, "t", &json!({"only": "item"})).await;

    let batch = do_get(&app, "t", "e2c2ffca-0000-4000-8000-0123456789ab", "3").await;
    assert_eq!(batch.messages.len(), 1);
    assert_eq!(batch.messages[0].index, 1);
}

#[tokio::test]
async fn watch_streams_appended_messages() {
    let dir = TempDir::new().unwrap();
    let state = test_state(&dir).await;
    let app = create_router(state.clone());
    let generation = generation_id(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/topics/watched/watch?generationID=&fromIndex=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();

    let items = sample_items();
    let producer_items = items.clone();
    let store = state.store.clone();
    tokio::spawn(async move {
        for item in &producer_items {
            store.append("watched", item.clone()).await.unwrap();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    });

    let mut received: Vec<Message> = Vec::new();
    while received.len() < items.len() {
        let frame = timeout(Duration::from_secs(10), body.frame())
            .await
            .expect("timed out waiting for watch push")
            .expect("watch stream ended early")
            .unwrap();

        let Ok(data) = frame.into_data() else {
            continue;
        };
        let batch: MessagesResponse = serde_json::from_slice(&data).unwrap();
        assert_eq!(batch.generation_id, generation);
        received.extend(batch.messages);
    }

    assert_eq!(received.len(), items.len());
    for (i, message) in received.iter().enumerate() {
        assert_eq!(message.index, i as u64 + 1);
        assert_eq!(message.data, items[i]);
    }
}

#[tokio::test]
async fn watch_rejects_invalid_from_index() {
    let dir = TempDir::new().unwrap();
    let app = create_router(test_state(&dir).await);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/topics/watched/watch?fromIndex=-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
