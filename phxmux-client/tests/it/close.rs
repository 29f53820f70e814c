use crate::helper::{self, to_client_error, TestServer};
use phxmux_client::{ConnectionState, ErrorKind};
use serde_json::json;
use std::sync::{Arc, Mutex};

#[tokio::test]
async fn close_leaves_every_topic() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    client.join("chat:room_1").await.unwrap();
    client.join("feed:user_7").await.unwrap();
    server.frame().await;
    server.frame().await;

    let c = &client;
    assert!(helper::eventually(move || async move { c.is_joined("feed:user_7").await.unwrap() }).await);

    client.close().await.unwrap();

    assert_eq!(client.connection_state().await.unwrap(), ConnectionState::Closed);
    assert!(client.topics().await.unwrap().is_empty());
    assert!(!client.is_joined("chat:room_1").await.unwrap());

    let result = client.push("chat:room_1", "message", json!({"content": "late"})).await;
    assert_eq!(to_client_error(result).kind, ErrorKind::NotConnected);
}

#[tokio::test]
async fn server_close_is_reported() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let closes = Arc::new(Mutex::new(vec![]));

    let c = closes.clone();
    client
        .on_close(move |code: u16, reason: &str| c.lock().unwrap().push((code, reason.to_string())))
        .await
        .unwrap();

    client.join("chat:room_1").await.unwrap();
    server.frame().await;

    server.close(1001, "going away");

    let c = &client;
    assert!(
        helper::eventually(move || async move {
            c.connection_state().await.unwrap() == ConnectionState::Closed
        })
        .await
    );

    assert!(client.topics().await.unwrap().is_empty());
    assert_eq!(*closes.lock().unwrap(), vec![(1001, "going away".to_string())]);
}

#[tokio::test]
async fn reopen_starts_refs_over() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();
    let opens = Arc::new(Mutex::new(0));

    let o = opens.clone();
    client.on_open(move || *o.lock().unwrap() += 1).await.unwrap();

    client.join("chat:room_1").await.unwrap();
    client.push("chat:room_1", "message", json!({"content": "first"})).await.unwrap();
    client.close().await.unwrap();

    client.open().await.unwrap();
    client.join("chat:room_1").await.unwrap();

    assert_eq!(server.frame().await.msg_ref.as_deref(), Some("1"));
    assert_eq!(server.frame().await.msg_ref.as_deref(), Some("2"));

    let rejoin = server.frame().await;
    assert_eq!(rejoin.event, "phx_join");
    assert_eq!(rejoin.msg_ref.as_deref(), Some("1"));

    assert_eq!(*opens.lock().unwrap(), 1);
}

#[tokio::test]
async fn open_twice_is_a_noop() {
    let mut server = TestServer::start().await;
    let client = helper::connect_to(&server).await.unwrap();

    client.open().await.unwrap();

    assert_eq!(client.connection_state().await.unwrap(), ConnectionState::Open);

    server.query().await;
    client.close().await.unwrap();
}
