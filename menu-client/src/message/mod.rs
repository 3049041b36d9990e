// menu-client/src/message/mod.rs
// 实时推送订阅 - 连接生命周期与重连策略

mod transport;

pub use shared::message::{
    CLOSE_AUTH_REJECTED, CLOSE_NORMAL, ChannelEventKind, ChannelMessage, should_reconnect,
};
pub use transport::{ChannelConnection, ChannelTransport, Frame, WsTransport};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::ClientError;

/// 事件通道容量
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed")]
    Closed,
}

impl From<ChannelError> for ClientError {
    fn from(err: ChannelError) -> Self {
        ClientError::Channel(err.to_string())
    }
}

/// Lifecycle and payload events seen by the host application
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Connection open. After a reconnect, missed events are not replayed:
    /// re-fetch authoritative state.
    Connected { reconnected: bool },
    Message(ChannelMessage),
    Disconnected {
        code: Option<u16>,
        will_reconnect: bool,
    },
}

/// 推送订阅者
///
/// - `connect()` 幂等：已有连接 (或正在重连) 时忽略
/// - 正常关闭 (1000) 与认证拒绝 (1008) 不重连
/// - 其他关闭在固定延迟后重连一次
/// - `disconnect()` / drop 取消挂起的重连
pub struct ChannelSubscriber {
    transport: Arc<dyn ChannelTransport>,
    url: String,
    reconnect_delay: Duration,
    /// 连续连接失败上限 (0 表示无限重试)
    max_reconnect_attempts: u32,
    events: broadcast::Sender<ChannelEvent>,
    running: Mutex<Option<CancellationToken>>,
    connected: Arc<AtomicBool>,
}

impl std::fmt::Debug for ChannelSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSubscriber")
            .field("url", &self.url)
            .field("reconnect_delay", &self.reconnect_delay)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl ChannelSubscriber {
    pub fn new(
        transport: Arc<dyn ChannelTransport>,
        url: impl Into<String>,
        reconnect_delay: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            transport,
            url: url.into(),
            reconnect_delay,
            max_reconnect_attempts: 0,
            events,
            running: Mutex::new(None),
            connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// WebSocket subscriber
    pub fn websocket(url: impl Into<String>, reconnect_delay: Duration) -> Self {
        Self::new(Arc::new(WsTransport::new()), url, reconnect_delay)
    }

    /// 设置最大连续失败次数 (0 表示无限重试)
    pub fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub fn events(&self) -> broadcast::Receiver<ChannelEvent> {
        self.events.subscribe()
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }

    /// A connection is open or being (re)established
    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .as_ref()
            .is_some_and(|t| !t.is_cancelled())
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Start the connection loop. Returns `false` if one is already running.
    pub fn connect(&self) -> bool {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|t| !t.is_cancelled()) {
            tracing::debug!(url = %self.url, "Channel already connected, ignoring connect");
            return false;
        }

        let token = CancellationToken::new();
        *running = Some(token.clone());

        let worker = Worker {
            transport: self.transport.clone(),
            url: self.url.clone(),
            reconnect_delay: self.reconnect_delay,
            max_reconnect_attempts: self.max_reconnect_attempts,
            events: self.events.clone(),
            connected: self.connected.clone(),
            token,
        };
        tokio::spawn(worker.run());
        true
    }

    /// Close the connection and cancel any pending reconnect
    pub fn disconnect(&self) {
        if let Some(token) = self.running.lock().take() {
            token.cancel();
        }
    }
}

impl Drop for ChannelSubscriber {
    fn drop(&mut self) {
        self.disconnect();
    }
}

enum PumpEnd {
    Cancelled,
    Closed(Option<u16>),
}

struct Worker {
    transport: Arc<dyn ChannelTransport>,
    url: String,
    reconnect_delay: Duration,
    max_reconnect_attempts: u32,
    events: broadcast::Sender<ChannelEvent>,
    connected: Arc<AtomicBool>,
    token: CancellationToken,
}

impl Worker {
    fn emit(&self, event: ChannelEvent) {
        // No receivers is fine
        let _ = self.events.send(event);
    }

    async fn run(self) {
        let mut reconnected = false;
        let mut failures: u32 = 0;

        loop {
            let attempt = tokio::select! {
                _ = self.token.cancelled() => break,
                result = self.transport.connect(&self.url) => result,
            };

            let will_reconnect = match attempt {
                Ok(mut conn) => {
                    failures = 0;
                    self.connected.store(true, Ordering::SeqCst);
                    tracing::info!(url = %self.url, reconnected, "Channel connected");
                    self.emit(ChannelEvent::Connected { reconnected });

                    let end = self.pump(conn.as_mut()).await;
                    self.connected.store(false, Ordering::SeqCst);

                    match end {
                        PumpEnd::Cancelled => {
                            conn.close(CLOSE_NORMAL).await;
                            tracing::info!(url = %self.url, "Channel disconnected");
                            self.emit(ChannelEvent::Disconnected {
                                code: Some(CLOSE_NORMAL),
                                will_reconnect: false,
                            });
                            break;
                        }
                        PumpEnd::Closed(code) => {
                            let will_reconnect = should_reconnect(code);
                            if will_reconnect {
                                tracing::warn!(url = %self.url, ?code, delay = ?self.reconnect_delay, "Channel closed, reconnecting");
                            } else {
                                tracing::info!(url = %self.url, ?code, "Channel closed");
                            }
                            self.emit(ChannelEvent::Disconnected {
                                code,
                                will_reconnect,
                            });
                            will_reconnect
                        }
                    }
                }
                Err(e) => {
                    failures += 1;
                    let will_reconnect =
                        self.max_reconnect_attempts == 0 || failures < self.max_reconnect_attempts;
                    tracing::warn!(url = %self.url, error = %e, failures, will_reconnect, "Channel connect failed");
                    self.emit(ChannelEvent::Disconnected {
                        code: None,
                        will_reconnect,
                    });
                    will_reconnect
                }
            };

            if !will_reconnect {
                break;
            }
            reconnected = true;

            tokio::select! {
                _ = self.token.cancelled() => break,
                _ = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        // Lets a later connect() start a fresh loop
        self.token.cancel();
    }

    async fn pump(&self, conn: &mut dyn ChannelConnection) -> PumpEnd {
        loop {
            let frame = tokio::select! {
                _ = self.token.cancelled() => return PumpEnd::Cancelled,
                frame = conn.recv() => frame,
            };

            match frame {
                Frame::Text(text) => match ChannelMessage::from_json(&text) {
                    Ok(msg) if msg.is_known() => self.emit(ChannelEvent::Message(msg)),
                    Ok(msg) => {
                        tracing::debug!(order_id = msg.order_id, "Ignoring unknown channel message type");
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Dropping unparseable channel message");
                    }
                },
                Frame::Closed(code) => return PumpEnd::Closed(code),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc;

    /// Scripted connections; connect fails once the script runs out
    #[derive(Debug, Default)]
    struct ScriptedTransport {
        script: Mutex<VecDeque<mpsc::UnboundedReceiver<Frame>>>,
        attempts: AtomicUsize,
    }

    impl ScriptedTransport {
        fn push(&self) -> mpsc::UnboundedSender<Frame> {
            let (tx, rx) = mpsc::unbounded_channel();
            self.script.lock().push_back(rx);
            tx
        }

        fn attempts(&self) -> usize {
            self.attempts.load(Ordering::SeqCst)
        }
    }

    struct ScriptedConnection {
        rx: mpsc::UnboundedReceiver<Frame>,
    }

    #[async_trait]
    impl ChannelConnection for ScriptedConnection {
        async fn recv(&mut self) -> Frame {
            self.rx.recv().await.unwrap_or(Frame::Closed(None))
        }

        async fn close(&mut self, _code: u16) {}
    }

    #[async_trait]
    impl ChannelTransport for ScriptedTransport {
        async fn connect(&self, _url: &str) -> Result<Box<dyn ChannelConnection>, ChannelError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            match self.script.lock().pop_front() {
                Some(rx) => Ok(Box::new(ScriptedConnection { rx })),
                None => Err(ChannelError::Connection("refused".into())),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_connects_stop_at_limit() {
        let transport = Arc::new(ScriptedTransport::default());
        let subscriber = ChannelSubscriber::new(transport.clone(), "ws://test", Duration::from_secs(3))
            .with_max_reconnect_attempts(3);
        let mut events = subscriber.events();

        subscriber.connect();
        for expected in [true, true, false] {
            let event = events.recv().await.unwrap();
            assert_eq!(
                event,
                ChannelEvent::Disconnected {
                    code: None,
                    will_reconnect: expected
                }
            );
        }

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(transport.attempts(), 3);
        assert!(!subscriber.is_running());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_again_after_auth_rejection() {
        let transport = Arc::new(ScriptedTransport::default());
        let first = transport.push();
        let _second = transport.push();
        let subscriber = ChannelSubscriber::new(transport.clone(), "ws://test", Duration::from_secs(5));
        let mut events = subscriber.events();

        subscriber.connect();
        assert_eq!(
            events.recv().await.unwrap(),
            ChannelEvent::Connected { reconnected: false }
        );
        first.send(Frame::Closed(Some(CLOSE_AUTH_REJECTED))).unwrap();
        assert!(matches!(
            events.recv().await.unwrap(),
            ChannelEvent::Disconnected {
                will_reconnect: false,
                ..
            }
        ));
        tokio::task::yield_now().await;
        assert!(!subscriber.is_running());

        // An explicit connect (e.g. after a fresh login) starts over
        assert!(subscriber.connect());
        assert_eq!(
            events.recv().await.unwrap(),
            ChannelEvent::Connected { reconnected: false }
        );
        assert_eq!(transport.attempts(), 2);
    }
}
