//! WebSocket transport against a real tokio-tungstenite client.

#[cfg(feature = "websocket")]
mod websocket {
    use std::sync::Arc;
    use std::time::Duration;

    use futures_util::{SinkExt, StreamExt};
    use strikeball_transport::{
        Connection, Transport, TransportError, WebSocketConnection, WebSocketTransport,
    };
    use tokio::io::AsyncWriteExt;
    use tokio_tungstenite::tungstenite::Message;

    type Client = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    async fn listen() -> WebSocketTransport {
        WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("ephemeral bind")
    }

    async fn pair() -> (WebSocketConnection, Client) {
        let mut transport = listen().await;
        let addr = transport.local_addr().unwrap();
        let accepted = tokio::spawn(async move { transport.accept().await.unwrap() });
        let (client, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .unwrap();
        (accepted.await.unwrap(), client)
    }

    #[tokio::test]
    async fn test_bind_bad_address_reports_bind_error() {
        let err = WebSocketTransport::bind("not-an-address")
            .await
            .err()
            .expect("bind must fail");
        assert!(matches!(err, TransportError::Bind { ref addr, .. } if addr == "not-an-address"));
    }

    #[tokio::test]
    async fn test_accept_request_without_upgrade_reports_handshake_error() {
        let mut transport = listen().await;
        let addr = transport.local_addr().unwrap();

        let mut raw = tokio::net::TcpStream::connect(addr).await.unwrap();
        raw.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n").await.unwrap();

        let err = transport.accept().await.err().expect("upgrade must fail");
        assert!(matches!(err, TransportError::Handshake(_)));
    }

    #[tokio::test]
    async fn test_accept_assigns_distinct_ids_and_peer_addr() {
        let (first, _client) = pair().await;
        let (second, _other) = pair().await;

        assert_ne!(first.id(), second.id());
        assert!(first.peer_addr().ip().is_loopback());
    }

    #[tokio::test]
    async fn test_send_text_arrives_as_text_frame() {
        let (conn, mut client) = pair().await;

        conn.send_text(r#"{"type":"GAME_STATUS"}"#.to_string())
            .await
            .unwrap();

        let frame = client.next().await.unwrap().unwrap();
        assert_eq!(frame, Message::text(r#"{"type":"GAME_STATUS"}"#));
    }

    #[tokio::test]
    async fn test_send_binary_arrives_as_binary_frame() {
        let (conn, mut client) = pair().await;

        conn.send(&[1, 2, 3]).await.unwrap();

        let frame = client.next().await.unwrap().unwrap();
        assert_eq!(frame, Message::binary(vec![1u8, 2, 3]));
    }

    #[tokio::test]
    async fn test_recv_text_and_binary_frames_yield_bytes() {
        let (conn, mut client) = pair().await;

        client.send(Message::text("456")).await.unwrap();
        client.send(Message::binary(b"789".to_vec())).await.unwrap();

        assert_eq!(conn.recv().await.unwrap().as_deref(), Some(&b"456"[..]));
        assert_eq!(conn.recv().await.unwrap().as_deref(), Some(&b"789"[..]));
    }

    #[tokio::test]
    async fn test_recv_skips_ping_frames() {
        let (conn, mut client) = pair().await;

        client.send(Message::Ping(vec![9u8].into())).await.unwrap();
        client.send(Message::text("after-ping")).await.unwrap();

        assert_eq!(
            conn.recv().await.unwrap().as_deref(),
            Some(&b"after-ping"[..])
        );
    }

    #[tokio::test]
    async fn test_recv_client_close_returns_none() {
        let (conn, mut client) = pair().await;

        client.close(None).await.unwrap();

        assert!(conn.recv().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_send_text_while_recv_pending_completes() {
        let (conn, mut client) = pair().await;
        let conn = Arc::new(conn);

        let reader = Arc::clone(&conn);
        let parked = tokio::spawn(async move { reader.recv().await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        tokio::time::timeout(Duration::from_secs(1), conn.send_text("push".into()))
            .await
            .expect("writer must not wait on the reader")
            .unwrap();
        assert_eq!(
            client.next().await.unwrap().unwrap(),
            Message::text("push")
        );

        client.close(None).await.unwrap();
        assert!(parked.await.unwrap().unwrap().is_none());
    }
}
