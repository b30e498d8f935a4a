//! Session pairing tests over local TCP
//!
//! Each test gets its own port so they can run concurrently.

use std::time::Duration;

use bytes::Bytes;
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};

use balltrack_core::{Command, Response};
use balltrack_transport::{
    Error, PublishSession, PullSession, PushSession, ReplySession, RequestSession, Session,
};

const HOST: &str = "127.0.0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestMsg {
    message: String,
}

fn msg(text: &str) -> TestMsg {
    TestMsg {
        message: text.to_string(),
    }
}

#[tokio::test]
async fn test_push_pull_pairing() {
    let mut push = PushSession::new(5801);
    push.start(HOST).await.unwrap();

    let mut pull = PullSession::new(5801);
    pull.start(HOST).await.unwrap();

    push.send(&msg("Testing the connection")).await.unwrap();

    let received: TestMsg = pull.recv().await.unwrap();
    assert_eq!(received, msg("Testing the connection"));
}

#[tokio::test]
async fn test_request_reply_turn_taking() {
    let mut reply = ReplySession::new(5802);
    reply.start(HOST).await.unwrap();

    let mut request = RequestSession::new(5802);
    request.start(HOST).await.unwrap();

    // Send a request
    request.send(&msg("Testing the connection")).await.unwrap();

    // Receive the request and respond
    let received: TestMsg = reply.recv().await.unwrap();
    assert_eq!(received, msg("Testing the connection"));
    reply.send(&msg("Received the message")).await.unwrap();

    // Receive the response
    let response: TestMsg = request.recv().await.unwrap();
    assert_eq!(response, msg("Received the message"));

    // A fresh request/reply cycle works on the same sockets
    request.send(&msg("Second request")).await.unwrap();
    let received: TestMsg = reply.recv().await.unwrap();
    assert_eq!(received, msg("Second request"));
    reply.send(&msg("Second response")).await.unwrap();
    let response: TestMsg = request.recv().await.unwrap();
    assert_eq!(response, msg("Second response"));
}

#[tokio::test]
async fn test_reply_never_returns_stale_data() {
    let mut reply = ReplySession::new(5803);
    reply.start(HOST).await.unwrap();

    let mut request = RequestSession::new(5803);
    request.start(HOST).await.unwrap();

    request.send(&msg("only request")).await.unwrap();
    let _: TestMsg = reply.recv().await.unwrap();
    reply.send(&msg("only response")).await.unwrap();
    let _: TestMsg = request.recv().await.unwrap();

    // No new request has arrived: non-blocking receive reports the
    // sentinel, not yesterday's message
    let pending: Option<TestMsg> = reply.try_recv().await.unwrap();
    assert_eq!(pending, None);
}

#[tokio::test]
async fn test_reply_enforces_alternation() {
    let mut reply = ReplySession::new(5804);
    reply.start(HOST).await.unwrap();

    let mut request = RequestSession::new(5804);
    request.start(HOST).await.unwrap();

    request.send(&msg("request")).await.unwrap();
    let _: TestMsg = reply.recv().await.unwrap();

    // Receiving again while the reply is owed is a protocol violation
    let second = reply.try_recv::<TestMsg>().await;
    assert!(matches!(second, Err(Error::ProtocolViolation(_))));

    // Replying and declining both settle the turn; a decline with no
    // request pending is itself a violation
    reply.send(&msg("response")).await.unwrap();
    assert!(matches!(
        reply.decline(),
        Err(Error::ProtocolViolation(_))
    ));
}

#[tokio::test]
async fn test_request_enforces_alternation() {
    let mut reply = ReplySession::new(5805);
    reply.start(HOST).await.unwrap();

    let mut request = RequestSession::new(5805);
    request.start(HOST).await.unwrap();

    request.send(&msg("first")).await.unwrap();

    // A second send before collecting the reply is a protocol violation
    let second = request.send(&msg("second")).await;
    assert!(matches!(second, Err(Error::ProtocolViolation(_))));
}

#[tokio::test]
async fn test_send_receive_round_trip() {
    let mut reply = ReplySession::new(5806);
    reply.start(HOST).await.unwrap();

    let mut request = RequestSession::new(5806);
    request.start(HOST).await.unwrap();

    // Drive the responder from a task so send_receive can block
    let responder = tokio::spawn(async move {
        let received: TestMsg = reply.recv().await.unwrap();
        assert_eq!(received, msg("ping"));
        reply.send(&msg("pong")).await.unwrap();
    });

    let response: TestMsg = request.send_receive(&msg("ping")).await.unwrap();
    assert_eq!(response, msg("pong"));

    responder.await.unwrap();
}

#[tokio::test]
async fn test_megabyte_feed_frame_through_push_pull() {
    let mut push = PushSession::new(5807);
    push.start(HOST).await.unwrap();

    let mut pull = PullSession::new(5807);
    pull.start(HOST).await.unwrap();

    let sent = Response::CameraFeedData {
        left_feed: Bytes::from(vec![0x11u8; 1_200_000]),
        right_feed: Bytes::from(vec![0x22u8; 1_048_576]),
    };
    push.send(&sent).await.unwrap();

    let received: Response = pull.recv().await.unwrap();
    assert_eq!(received, sent);
    assert_eq!(received.command(), Command::CameraFeedData);
}

#[tokio::test]
async fn test_pull_timeout_sentinel() {
    let mut push = PushSession::new(5808);
    push.start(HOST).await.unwrap();

    let mut pull = PullSession::new(5808);
    pull.start(HOST).await.unwrap();

    let got: Option<TestMsg> = pull.recv_timeout(Duration::from_millis(50)).await.unwrap();
    assert_eq!(got, None);
}

#[tokio::test]
async fn test_connected_session_start_is_idempotent() {
    let mut push = PushSession::new(5809);
    push.start(HOST).await.unwrap();

    let mut pull = PullSession::new(5809);
    pull.start(HOST).await.unwrap();
    pull.start(HOST).await.unwrap();
    assert!(pull.is_connected());

    pull.stop().await.unwrap();
    pull.stop().await.unwrap();
    assert!(!pull.is_connected());
}

#[tokio::test]
async fn test_binding_lifecycle_as_trait_objects() {
    let mut sessions: Vec<Box<dyn Session>> = vec![
        Box::new(ReplySession::new(5810)),
        Box::new(PushSession::new(5811)),
        Box::new(PublishSession::new(5812)),
    ];

    for session in &mut sessions {
        assert!(session.pattern().binds());
        assert!(!session.is_connected());
        session.start(HOST).await.unwrap();
        session.start(HOST).await.unwrap();
        assert!(session.is_connected());
        session.stop().await.unwrap();
        session.stop().await.unwrap();
        assert!(!session.is_connected());
    }
}

#[tokio::test]
async fn test_publish_subscribe_topic_filtering() {
    use balltrack_transport::SubscribeSession;

    let mut publisher = PublishSession::new(5813);
    publisher.start(HOST).await.unwrap();

    let mut subscriber = SubscribeSession::new(5813, [Response::CAMERA_FEED_TOPIC]);
    subscriber.start(HOST).await.unwrap();

    // The unwanted topic is dropped by the subscriber, the wanted one kept
    publisher.send("telemetry", &msg("not for you")).await.unwrap();
    publisher
        .send(Response::CAMERA_FEED_TOPIC, &msg("for you"))
        .await
        .unwrap();

    let (topic, received): (String, TestMsg) = subscriber.recv().await.unwrap();
    assert_eq!(topic, Response::CAMERA_FEED_TOPIC);
    assert_eq!(received, msg("for you"));
}
