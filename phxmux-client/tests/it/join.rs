use crate::helper::{self, to_client_error, TestServer, FORBIDDEN};
use phxmux_client::{ErrorKind, TopicState};
use serde_json::json;

#[tokio::test]
async fn token_is_sent_as_query_param() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    assert_eq!(server.query().await.as_deref(), Some("token=secret"));

    client.close().await.unwrap();
}

#[tokio::test]
async fn join_is_acknowledged() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    assert!(client.join("chat:room_42").await.unwrap());

    let join = server.frame().await;
    assert_eq!(join.topic, "chat:room_42");
    assert_eq!(join.event, "phx_join");
    assert_eq!(join.payload, json!({}));
    assert_eq!(join.msg_ref.as_deref(), Some("1"));

    let c = &client;
    assert!(helper::eventually(move || async move { c.is_joined("chat:room_42").await.unwrap() }).await);
}

#[tokio::test]
async fn rejected_join_removes_topic() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let topic = format!("{}:room_1", FORBIDDEN);

    client.join(&topic).await.unwrap();
    server.frame().await;

    let c = &client;
    let t = topic.as_str();
    assert!(helper::eventually(move || async move { c.topic_state(t).await.unwrap() == TopicState::Absent }).await);

    let result = client.push(&topic, "message", json!({"content": "hi"})).await;
    assert_eq!(to_client_error(result).kind, ErrorKind::NotJoined);
}

#[tokio::test]
async fn second_join_sends_nothing() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    assert!(client.join("feed:user_7").await.unwrap());
    assert!(!client.join("feed:user_7").await.unwrap());

    client.push("feed:user_7", "view_item", json!({"product_id": "p1"})).await.unwrap();

    assert_eq!(server.frame().await.event, "phx_join");
    assert_eq!(server.frame().await.event, "view_item");
}

#[tokio::test]
async fn leave_is_optimistic() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    client.join("delivery:delivery_9").await.unwrap();
    client.leave("delivery:delivery_9").await.unwrap();

    assert_eq!(client.topic_state("delivery:delivery_9").await.unwrap(), TopicState::Absent);

    let result = client
        .push("delivery:delivery_9", "location_update", json!({"latitude": 1.0, "longitude": 2.0}))
        .await;
    assert_eq!(to_client_error(result).kind, ErrorKind::NotJoined);

    server.frame().await;
    let leave = server.frame().await;
    assert_eq!(leave.event, "phx_leave");
    assert_eq!(leave.msg_ref.as_deref(), Some("2"));
}

#[tokio::test]
async fn channel_handle_joins_its_topic() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let chat = client.channel("chat:room_5");

    assert_eq!(chat.topic(), "chat:room_5");
    assert!(chat.join().await.unwrap());
    assert_eq!(server.frame().await.topic, "chat:room_5");

    let ch = &chat;
    assert!(helper::eventually(move || async move { ch.is_joined().await.unwrap() }).await);

    chat.leave().await.unwrap();
    assert_eq!(chat.state().await.unwrap(), TopicState::Absent);
}
