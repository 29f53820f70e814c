use crate::helper::{self, TestServer};
use serde_json::json;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[tokio::test]
async fn broadcast_reaches_subscription() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let feed = client.channel("feed:user_7");

    let mut likes = feed.subscribe("like_update").await.unwrap();
    feed.join().await.unwrap();
    server.frame().await;

    server.broadcast("feed:user_7", "like_update", json!({"product_id": "p1", "likes": 5}));

    let payload = likes.receive(helper::TIMEOUT).await.unwrap();
    assert_eq!(payload["product_id"], "p1");
    assert_eq!(payload["likes"], 5);

    assert!(likes.receive(Duration::from_millis(100)).await.is_none());
}

#[tokio::test]
async fn only_exact_topic_and_event_is_dispatched() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let feed = client.channel("feed:user_7");

    let mut items = feed.subscribe("new_item").await.unwrap();
    feed.join().await.unwrap();
    server.frame().await;

    server.broadcast("feed:user_8", "new_item", json!({"item": {"id": "other"}}));
    server.broadcast("feed:user_7", "like_update", json!({"product_id": "p1", "likes": 1}));
    server.broadcast("feed:user_7", "new_item", json!({"item": {"id": "mine"}}));

    let payload = items.receive(helper::TIMEOUT).await.unwrap();
    assert_eq!(payload["item"]["id"], "mine");
}

#[tokio::test]
async fn malformed_text_is_skipped() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let chat = client.channel("chat:room_1");

    let mut messages = chat.subscribe("message").await.unwrap();
    chat.join().await.unwrap();
    server.frame().await;

    server.send_text("{not json");
    server.send_text(r#"{"topic":"","event":"message","payload":{}}"#);
    server.broadcast("chat:room_1", "message", json!({"content": "still alive"}));

    let payload = messages.receive(helper::TIMEOUT).await.unwrap();
    assert_eq!(payload["content"], "still alive");
}

#[tokio::test]
async fn raw_texts_reach_message_callback() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let texts = Arc::new(Mutex::new(Vec::<String>::new()));

    let t = texts.clone();
    client
        .on_message(move |text: &str| t.lock().unwrap().push(text.to_string()))
        .await
        .unwrap();

    client.join("chat:room_1").await.unwrap();
    server.frame().await;

    let t = &texts;
    assert!(helper::eventually(move || async move { !t.lock().unwrap().is_empty() }).await);
    assert!(texts.lock().unwrap()[0].contains("phx_reply"));
}

#[tokio::test]
async fn other_handlers_survive_unsubscribe() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let chat = client.channel("chat:room_1");
    let count = Arc::new(Mutex::new(0));

    let subscription = chat.subscribe("message").await.unwrap();
    let c = count.clone();
    chat.on("message", move |_| *c.lock().unwrap() += 1).await.unwrap();
    chat.join().await.unwrap();
    server.frame().await;

    assert!(subscription.unsubscribe().await.unwrap());

    server.broadcast("chat:room_1", "message", json!({"content": "hi"}));

    let c = &count;
    assert!(helper::eventually(move || async move { *c.lock().unwrap() == 1 }).await);
}

#[tokio::test]
async fn dropped_subscription_is_unregistered() {
    let server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let chat = client.channel("chat:room_1");

    let subscription = chat.subscribe("message").await.unwrap();
    let handler_ref = subscription.handler_ref();

    drop(subscription);

    assert!(!client.off(handler_ref).await.unwrap());
}
