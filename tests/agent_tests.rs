//! Agent 集成测试
//!
//! 用一个最小的 ZMTP ROUTER 端模拟数据库控制端点。

#[cfg(unix)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;
    use futures_util::{SinkExt, StreamExt};
    use pilot_agent::zmtp::{
        Greeting, Metadata, ZmtpCodec, ZmtpCommand, ZmtpFrame, GREETING_LEN, IDENTITY, SOCKET_TYPE,
    };
    use pilot_agent::{
        AgentConfig, ConnectError, DealerSocket, Endpoint, ErrorKind, PilotAgent, RunOutcome,
        MODEL_IDENTITY,
    };
    use tempfile::tempdir;
    use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
    use tokio::net::{TcpListener, UnixListener};
    use tokio_util::codec::Framed;

    /// ROUTER 端握手，返回 framed 连接和 DEALER 声明的 identity
    async fn router_handshake<S>(mut stream: S) -> (Framed<S, ZmtpCodec>, String)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        stream.write_all(&Greeting::null(true).encode()).await.unwrap();
        let mut buf = [0u8; GREETING_LEN];
        stream.read_exact(&mut buf).await.unwrap();
        Greeting::decode(&buf).unwrap();

        let mut framed = Framed::new(stream, ZmtpCodec::new());
        let ready = ZmtpCommand::Ready(Metadata::new().with(SOCKET_TYPE, "ROUTER"));
        framed.send(ZmtpFrame::Command(ready.encode())).await.unwrap();

        let identity = match framed.next().await.unwrap().unwrap() {
            ZmtpFrame::Command(body) => match ZmtpCommand::decode(body).unwrap() {
                ZmtpCommand::Ready(metadata) => {
                    assert_eq!(metadata.get_str(SOCKET_TYPE).as_deref(), Some("DEALER"));
                    metadata.get_str(IDENTITY).unwrap()
                }
                other => panic!("Expected READY, got {:?}", other),
            },
            other => panic!("Expected command frame, got {:?}", other),
        };
        (framed, identity)
    }

    /// 发送 `["", payload]`
    async fn send_message<S>(framed: &mut Framed<S, ZmtpCodec>, payload: &'static [u8])
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        framed.send(ZmtpFrame::more(Bytes::new())).await.unwrap();
        framed
            .send(ZmtpFrame::last(Bytes::from_static(payload)))
            .await
            .unwrap();
    }

    /// 接收一条完整消息
    async fn recv_message<S>(framed: &mut Framed<S, ZmtpCodec>) -> Vec<Bytes>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut frames = Vec::new();
        loop {
            match framed.next().await.unwrap().unwrap() {
                ZmtpFrame::Message { body, more } => {
                    frames.push(body);
                    if !more {
                        return frames;
                    }
                }
                ZmtpFrame::Command(_) => {}
            }
        }
    }

    fn assert_payload(frames: &[Bytes], expected: &[u8]) {
        assert_eq!(frames.len(), 2);
        assert!(frames[0].is_empty());
        assert_eq!(&frames[1][..], expected);
    }

    #[tokio::test]
    async fn test_full_session_over_ipc() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("pilot-ipc0");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let config = AgentConfig::new(Endpoint::ipc(&socket_path));
        let agent = tokio::spawn(PilotAgent::<DealerSocket>::run(config));

        let (stream, _) = listener.accept().await.unwrap();
        let (mut router, identity) = router_handshake(stream).await;
        assert_eq!(identity, MODEL_IDENTITY);

        // 上线通知
        assert_payload(&recv_message(&mut router).await, b"CConnected");

        // 心跳
        send_message(&mut router, b"CHeartbeat").await;
        assert_payload(&recv_message(&mut router).await, b"PHeartbeat");

        // 空 payload 不回复；下一条回复必须是 Quit 确认
        send_message(&mut router, b"").await;
        send_message(&mut router, b"CQuit").await;
        assert_payload(&recv_message(&mut router).await, b"PQuit");

        let outcome = agent.await.unwrap().unwrap();
        assert_eq!(outcome, RunOutcome::Quit);

        // shutdown 后连接关闭
        assert!(router.next().await.is_none());
    }

    #[tokio::test]
    async fn test_full_session_over_tcp() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        let config = AgentConfig::new(Endpoint::tcp("127.0.0.1", port));
        let agent = tokio::spawn(PilotAgent::<DealerSocket>::run(config));

        let (stream, _) = listener.accept().await.unwrap();
        let (mut router, _) = router_handshake(stream).await;
        assert_payload(&recv_message(&mut router).await, b"CConnected");

        // 未知命令按心跳回复
        send_message(&mut router, b"CReloadModel").await;
        assert_payload(&recv_message(&mut router).await, b"PHeartbeat");

        send_message(&mut router, b"CQuit").await;
        assert_payload(&recv_message(&mut router).await, b"PQuit");

        assert_eq!(agent.await.unwrap().unwrap(), RunOutcome::Quit);
    }

    #[tokio::test]
    async fn test_peer_close_ends_session() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("pilot-ipc0");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let config = AgentConfig::new(Endpoint::ipc(&socket_path));
        let agent = tokio::spawn(PilotAgent::<DealerSocket>::run(config));

        let (stream, _) = listener.accept().await.unwrap();
        let (mut router, _) = router_handshake(stream).await;
        assert_payload(&recv_message(&mut router).await, b"CConnected");
        drop(router);

        let outcome = agent.await.unwrap().unwrap();
        assert_eq!(outcome, RunOutcome::Error(ErrorKind::PeerClosed));
    }

    #[tokio::test]
    async fn test_missing_socket_is_connect_error() {
        let dir = tempdir().unwrap();
        let config = AgentConfig::new(Endpoint::ipc(dir.path().join("missing.sock")));

        let result = PilotAgent::<DealerSocket>::run(config).await;
        assert!(matches!(result, Err(ConnectError::Unreachable { .. })));
    }

    #[tokio::test]
    async fn test_inproc_endpoint_is_unsupported() {
        let endpoint: Endpoint = "inproc://noisepage".parse().unwrap();
        let config = AgentConfig::new(endpoint);

        let result = PilotAgent::<DealerSocket>::run(config).await;
        assert!(matches!(result, Err(ConnectError::UnsupportedEndpoint(_))));
    }

    #[tokio::test]
    async fn test_silent_peer_times_out() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("silent.sock");
        // 只 bind 不 accept：连接能建立，但永远收不到 greeting
        let _listener = UnixListener::bind(&socket_path).unwrap();

        let config = AgentConfig::new(Endpoint::ipc(&socket_path))
            .with_handshake_timeout(Duration::from_millis(200));

        let result = PilotAgent::<DealerSocket>::run(config).await;
        assert!(matches!(result, Err(ConnectError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_non_zmtp_peer_fails_handshake() {
        let dir = tempdir().unwrap();
        let socket_path = dir.path().join("plain.sock");
        let listener = UnixListener::bind(&socket_path).unwrap();

        let config = AgentConfig::new(Endpoint::ipc(&socket_path));
        let agent = tokio::spawn(PilotAgent::<DealerSocket>::run(config));

        // 非 ZMTP 对端：发一段普通文本
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(&[b'x'; GREETING_LEN]).await.unwrap();

        let result = agent.await.unwrap();
        assert!(matches!(result, Err(ConnectError::Handshake(_))));
    }
}
