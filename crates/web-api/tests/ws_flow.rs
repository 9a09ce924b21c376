//! 消息流端到端测试：提交、回执、限流拒绝、历史回放。

mod support;

use std::time::Duration;

use serde_json::json;

use support::{
    connect, identity, next_event, next_event_of, send_event, spawn_server, token_for,
};

#[tokio::test]
async fn message_reaches_every_peer_including_sender() {
    let server = spawn_server().await;
    let alice = identity("alice", "#a3c9f0");
    let bob = identity("bob", "#f0c9a3");

    let mut alice_ws = connect(&server, &token_for(&server, &alice)).await;
    next_event_of(&mut alice_ws, "users:online").await;
    let mut bob_ws = connect(&server, &token_for(&server, &bob)).await;
    next_event_of(&mut bob_ws, "users:online").await;
    // alice 也会收到 bob 上线后的快照
    next_event_of(&mut alice_ws, "users:online").await;

    send_event(&mut alice_ws, json!({"type": "message:send", "content": "hello room"})).await;

    let broadcast = next_event_of(&mut alice_ws, "message:new").await;
    assert_eq!(broadcast["content"], "hello room");
    assert_eq!(broadcast["displayName"], "alice");
    assert_eq!(broadcast["color"], "#a3c9f0");

    let ack = next_event_of(&mut alice_ws, "message:ack").await;
    assert_eq!(ack["id"], broadcast["id"]);

    let at_bob = next_event_of(&mut bob_ws, "message:new").await;
    assert_eq!(at_bob["content"], "hello room");

    // 恰好持久化一条记录
    assert_eq!(server.store.message_count().await, 1);
}

#[tokio::test]
async fn sixth_message_in_window_is_rejected() {
    let server = spawn_server().await;
    let alice = identity("alice", "#a3c9f0");
    let mut ws = connect(&server, &token_for(&server, &alice)).await;
    next_event_of(&mut ws, "users:online").await;

    for n in 1..=6 {
        send_event(&mut ws, json!({"type": "message:send", "content": format!("msg {n}")})).await;
    }

    let mut delivered = 0;
    let mut acked = 0;
    let mut rejected = Vec::new();
    // 6 次提交产出 5 条广播 + 5 条回执 + 1 条拒绝
    for _ in 0..11 {
        let event = next_event(&mut ws).await;
        match event["type"].as_str().unwrap() {
            "message:new" => delivered += 1,
            "message:ack" => acked += 1,
            "message:rejected" => rejected.push(event["reason"].as_str().unwrap().to_string()),
            other => panic!("unexpected event: {other}"),
        }
    }

    assert_eq!(delivered, 5);
    assert_eq!(acked, 5);
    assert_eq!(rejected, vec!["rate_limited".to_string()]);
    assert_eq!(server.store.message_count().await, 5);
}

#[tokio::test]
async fn invalid_content_is_rejected_without_trace() {
    let server = spawn_server().await;
    let alice = identity("alice", "#a3c9f0");
    let mut ws = connect(&server, &token_for(&server, &alice)).await;
    next_event_of(&mut ws, "users:online").await;

    send_event(&mut ws, json!({"type": "message:send", "content": "   "})).await;

    let event = next_event(&mut ws).await;
    assert_eq!(event["type"], "message:rejected");
    assert_eq!(event["reason"], "invalid_content");
    assert_eq!(server.store.message_count().await, 0);
}

#[tokio::test]
async fn markup_is_sanitized_before_broadcast() {
    let server = spawn_server().await;
    let alice = identity("alice", "#a3c9f0");
    let mut ws = connect(&server, &token_for(&server, &alice)).await;
    next_event_of(&mut ws, "users:online").await;

    send_event(&mut ws, json!({"type": "message:send", "content": "<b>hi</b>"})).await;

    let broadcast = next_event_of(&mut ws, "message:new").await;
    assert_eq!(broadcast["content"], "&lt;b&gt;hi&lt;/b&gt;");
}

#[tokio::test]
async fn late_joiner_receives_history_in_order() {
    let server = spawn_server().await;
    let alice = identity("alice", "#a3c9f0");
    let mut alice_ws = connect(&server, &token_for(&server, &alice)).await;
    next_event_of(&mut alice_ws, "users:online").await;

    for n in 1..=3 {
        send_event(
            &mut alice_ws,
            json!({"type": "message:send", "content": format!("history {n}")}),
        )
        .await;
        next_event_of(&mut alice_ws, "message:ack").await;
    }

    // 后加入者先收到按时间升序的历史，再收到在线快照
    let bob = identity("bob", "#f0c9a3");
    let mut bob_ws = connect(&server, &token_for(&server, &bob)).await;
    for n in 1..=3 {
        let event = next_event(&mut bob_ws).await;
        assert_eq!(event["type"], "message:new");
        assert_eq!(event["content"], format!("history {n}"));
    }
    let snapshot = next_event(&mut bob_ws).await;
    assert_eq!(snapshot["type"], "users:online");

    // 历史帧不应重复
    support::assert_silent(&mut bob_ws, Duration::from_millis(200)).await;
}
