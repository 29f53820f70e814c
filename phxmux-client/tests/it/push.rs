use crate::helper::{self, to_client_error, TestServer};
use phxmux_client::ErrorKind;
use phxmux_codec::frame::{ChatMessage, LocationUpdate};
use serde_json::json;
use std::time::Duration;

#[tokio::test]
async fn frames_arrive_in_order() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    client.join("chat:room_42").await.unwrap();

    let mut refs = vec![];
    for text in ["one", "two", "three"] {
        refs.push(client.push("chat:room_42", "message", ChatMessage::new(text).payload()).await.unwrap());
    }

    let join = server.frame().await;
    assert_eq!(join.event, "phx_join");

    for (text, msg_ref) in ["one", "two", "three"].iter().zip(&refs) {
        let f = server.frame().await;

        assert_eq!(f.event, "message");
        assert_eq!(f.payload, json!({"content": text}));
        assert_eq!(f.msg_ref.as_ref(), Some(msg_ref));
    }

    assert_eq!(refs, vec!["2", "3", "4"]);
}

#[tokio::test]
async fn push_without_join_is_rejected() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    let result = client.push("feed:user_7", "like_item", json!({"product_id": "p1"})).await;
    assert_eq!(to_client_error(result).kind, ErrorKind::NotJoined);

    // the first frame the server sees is the later join
    client.join("feed:user_7").await.unwrap();
    assert_eq!(server.frame().await.event, "phx_join");
}

#[tokio::test]
async fn push_is_allowed_while_joining() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    client.join("delivery:delivery_3").await.unwrap();
    client
        .push("delivery:delivery_3", "location_update", LocationUpdate::new(47.5, 19.04).payload())
        .await
        .unwrap();

    server.frame().await;
    let f = server.frame().await;

    assert_eq!(f.event, "location_update");
    assert_eq!(f.payload["latitude"], 47.5);
    assert_eq!(f.payload["longitude"], 19.04);
}

#[tokio::test]
async fn heartbeats_go_to_the_system_topic() {
    let mut server = TestServer::start().await;
    let config = helper::config(&server).heartbeat(Some(Duration::from_millis(50)));
    let client = phxmux_client::connect(config).await.unwrap();

    let f = server.frame().await;

    assert_eq!(f.topic, "phoenix");
    assert_eq!(f.event, "heartbeat");
    assert_eq!(f.payload, json!({}));

    client.close().await.unwrap();
}
