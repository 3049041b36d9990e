// menu-client/tests/channel_reconnect.rs
// 推送订阅重连策略测试 (虚拟时间)

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use menu_client::message::{CLOSE_AUTH_REJECTED, CLOSE_NORMAL};
use menu_client::{
    ChannelConnection, ChannelError, ChannelEvent, ChannelEventKind, ChannelSubscriber,
    ChannelTransport, Frame, OrderStatus,
};
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

const DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct MockTransport {
    pending: Mutex<VecDeque<mpsc::UnboundedReceiver<Frame>>>,
    connects: AtomicUsize,
}

impl MockTransport {
    /// Queue the next connection; the sender drives it
    fn expect_connection(&self) -> mpsc::UnboundedSender<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.lock().push_back(rx);
        tx
    }

    fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct MockConnection {
    frames: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl ChannelConnection for MockConnection {
    async fn recv(&mut self) -> Frame {
        self.frames.recv().await.unwrap_or(Frame::Closed(None))
    }

    async fn close(&mut self, _code: u16) {}
}

#[async_trait]
impl ChannelTransport for MockTransport {
    async fn connect(&self, _url: &str) -> Result<Box<dyn ChannelConnection>, ChannelError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        match self.pending.lock().pop_front() {
            Some(frames) => Ok(Box::new(MockConnection { frames })),
            None => Err(ChannelError::Connection("connection refused".into())),
        }
    }
}

fn setup() -> (Arc<MockTransport>, ChannelSubscriber, broadcast::Receiver<ChannelEvent>) {
    let transport = Arc::new(MockTransport::default());
    let subscriber = ChannelSubscriber::new(transport.clone(), "ws://localhost/ws/table/t1", DELAY);
    let events = subscriber.events();
    (transport, subscriber, events)
}

#[tokio::test(start_paused = true)]
async fn test_auth_rejected_close_does_not_reconnect() {
    let (transport, subscriber, mut events) = setup();
    let conn = transport.expect_connection();
    let _spare = transport.expect_connection();

    subscriber.connect();
    assert_eq!(
        events.recv().await.unwrap(),
        ChannelEvent::Connected { reconnected: false }
    );

    conn.send(Frame::Closed(Some(CLOSE_AUTH_REJECTED))).unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        ChannelEvent::Disconnected {
            code: Some(CLOSE_AUTH_REJECTED),
            will_reconnect: false
        }
    );

    tokio::time::sleep(DELAY * 10).await;
    assert_eq!(transport.connects(), 1);
    assert!(!subscriber.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_normal_close_does_not_reconnect() {
    let (transport, subscriber, mut events) = setup();
    let conn = transport.expect_connection();

    subscriber.connect();
    events.recv().await.unwrap();
    conn.send(Frame::Closed(Some(CLOSE_NORMAL))).unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        ChannelEvent::Disconnected {
            will_reconnect: false,
            ..
        }
    ));

    tokio::time::sleep(DELAY * 10).await;
    assert_eq!(transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abnormal_close_reconnects_once_after_delay() {
    let (transport, subscriber, mut events) = setup();
    let first = transport.expect_connection();
    let _second = transport.expect_connection();

    subscriber.connect();
    events.recv().await.unwrap();

    first.send(Frame::Closed(Some(1006))).unwrap();
    assert_eq!(
        events.recv().await.unwrap(),
        ChannelEvent::Disconnected {
            code: Some(1006),
            will_reconnect: true
        }
    );
    let closed_at = Instant::now();

    assert_eq!(
        events.recv().await.unwrap(),
        ChannelEvent::Connected { reconnected: true }
    );
    let waited = closed_at.elapsed();
    assert!(waited >= DELAY && waited < DELAY + Duration::from_secs(1));
    assert_eq!(transport.connects(), 2);

    // The second connection stays open: no further attempts
    tokio::time::sleep(DELAY * 10).await;
    assert_eq!(transport.connects(), 2);
    assert!(subscriber.is_connected());
}

#[tokio::test(start_paused = true)]
async fn test_second_connect_is_noop() {
    let (transport, subscriber, mut events) = setup();
    let _conn = transport.expect_connection();

    assert!(subscriber.connect());
    events.recv().await.unwrap();
    assert!(!subscriber.connect());

    tokio::time::sleep(DELAY).await;
    assert_eq!(transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_bad_messages_do_not_end_connection() {
    let (transport, subscriber, mut events) = setup();
    let conn = transport.expect_connection();

    subscriber.connect();
    events.recv().await.unwrap();

    conn.send(Frame::Text("{not json".into())).unwrap();
    conn.send(Frame::Text(r#"{"type":"table_moved","order_id":1,"timestamp":1}"#.into()))
        .unwrap();
    conn.send(Frame::Text(
        r#"{"type":"status_update","order_id":1,"status":"ready","timestamp":2}"#.into(),
    ))
    .unwrap();

    let ChannelEvent::Message(msg) = events.recv().await.unwrap() else {
        panic!("expected a message");
    };
    assert_eq!(msg.kind, ChannelEventKind::StatusUpdate);
    assert_eq!(msg.status, Some(OrderStatus::Ready));
    assert!(subscriber.is_connected());
    assert_eq!(transport.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_cancels_pending_reconnect() {
    let (transport, subscriber, mut events) = setup();
    let conn = transport.expect_connection();
    let _unused = transport.expect_connection();

    subscriber.connect();
    events.recv().await.unwrap();
    conn.send(Frame::Closed(Some(1011))).unwrap();
    assert!(matches!(
        events.recv().await.unwrap(),
        ChannelEvent::Disconnected {
            will_reconnect: true,
            ..
        }
    ));

    subscriber.disconnect();
    tokio::time::sleep(DELAY * 3).await;
    assert_eq!(transport.connects(), 1);
    assert!(!subscriber.is_running());
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_closes_open_connection() {
    let (transport, subscriber, mut events) = setup();
    let _conn = transport.expect_connection();

    subscriber.connect();
    events.recv().await.unwrap();
    subscriber.disconnect();

    assert_eq!(
        events.recv().await.unwrap(),
        ChannelEvent::Disconnected {
            code: Some(CLOSE_NORMAL),
            will_reconnect: false
        }
    );
    assert!(!subscriber.is_connected());
}
