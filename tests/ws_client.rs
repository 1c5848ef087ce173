use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

use okx_ws::ws::requests;
use okx_ws::{OkxConfig, OkxWsClient, OkxWsError, SessionClass, StreamEvent};

const WAIT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn test_config(url: &str) -> OkxConfig {
    OkxConfig::new(
        "test-key".to_string(),
        "test-secret".to_string(),
        "test-pass".to_string(),
    )
    .public_url(url.to_string())
    .private_url(url.to_string())
}

async fn bind_server() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    (listener, url)
}

async fn accept_ws(listener: &TcpListener) -> WebSocketStream<TcpStream> {
    let (stream, _) = listener.accept().await.unwrap();
    accept_async(stream).await.unwrap()
}

/// Read the next JSON control frame, answering keepalive pings like the
/// venue does.
async fn next_json(ws: &mut WebSocketStream<TcpStream>) -> serde_json::Value {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .expect("timed out waiting for a client frame")
            .expect("client closed the connection")
            .unwrap();
        match msg {
            Message::Text(text) if text == "ping" => {
                ws.send(Message::Text("pong".to_string())).await.unwrap();
            }
            Message::Text(text) => return serde_json::from_str(&text).unwrap(),
            Message::Ping(payload) => {
                ws.send(Message::Pong(payload)).await.unwrap();
            }
            _ => {}
        }
    }
}

async fn wait_until<F, Fut>(mut condition: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    timeout(WAIT, async {
        loop {
            if condition().await {
                return;
            }
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}

#[tokio::test]
async fn private_subscribe_blocks_until_login_ack() {
    init_tracing();
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;

        // the first control frame must be the login
        let login = next_json(&mut ws).await;
        assert_eq!(login["op"], "login");
        let auth = &login["args"][0];
        assert_eq!(auth["apiKey"], "test-key");
        assert_eq!(auth["passphrase"], "test-pass");
        assert!(auth["timestamp"].is_string());
        assert!(auth["sign"].is_string());

        // hold the client in its authorization wait for a while
        sleep(Duration::from_millis(600)).await;
        ws.send(Message::Text(
            r#"{"event":"login","code":"0","msg":""}"#.to_string(),
        ))
        .await
        .unwrap();

        // only then may the subscribe frame arrive
        let subscribe = next_json(&mut ws).await;
        assert_eq!(subscribe["op"], "subscribe");
        assert_eq!(subscribe["args"][0]["channel"], "account");

        // and exactly once: nothing else shows up
        let extra = timeout(Duration::from_millis(700), ws.next()).await;
        assert!(extra.is_err(), "unexpected extra frame: {:?}", extra);

        ws
    });

    let client = OkxWsClient::new(test_config(&url));
    timeout(
        WAIT,
        client.subscribe_account(requests::Account::default(), None),
    )
    .await
    .expect("private subscribe never unblocked")
    .unwrap();

    assert!(client.is_authorized().await);
    assert!(client.is_connected(SessionClass::Private).await);

    // tearing the connection down resets the authorization state
    let ws = server.await.unwrap();
    drop(ws);
    let probe = client.clone();
    wait_until(|| {
        let probe = probe.clone();
        async move { !probe.is_connected(SessionClass::Private).await }
    })
    .await;
    assert!(!client.is_authorized().await);
}

#[tokio::test]
async fn public_data_routes_to_typed_channels() {
    init_tracing();
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        let mut ws = accept_ws(&listener).await;

        let subscribe = next_json(&mut ws).await;
        assert_eq!(subscribe["op"], "subscribe");
        assert_eq!(subscribe["args"][0]["channel"], "tickers");
        assert_eq!(subscribe["args"][0]["instId"], "BTC-USDT");

        ws.send(Message::Text(
            r#"{"event":"subscribe","arg":{"channel":"tickers","instId":"BTC-USDT"}}"#
                .to_string(),
        ))
        .await
        .unwrap();
        ws.send(Message::Text(
            r#"{"arg":{"channel":"tickers","instId":"BTC-USDT"},
                "data":[{"instId":"BTC-USDT","last":"42000","askPx":"42001","bidPx":"41999"}]}"#
                .to_string(),
        ))
        .await
        .unwrap();

        // park the connection so the client side stays up while asserting
        sleep(Duration::from_secs(2)).await;
    });

    let client = OkxWsClient::new(test_config(&url));
    let (sub_tx, mut sub_rx) = mpsc::unbounded_channel();
    let (structured_tx, mut structured_rx) = mpsc::unbounded_channel();
    let (raw_tx, mut raw_rx) = mpsc::unbounded_channel();
    let (tickers_tx, mut tickers_rx) = mpsc::unbounded_channel();
    client
        .set_control_channels(None, Some(sub_tx), None, None, None)
        .await;
    client
        .set_event_channels(Some(structured_tx), Some(raw_tx))
        .await;

    client
        .subscribe_tickers(
            requests::Tickers {
                inst_id: "BTC-USDT".to_string(),
            },
            Some(tickers_tx),
        )
        .await
        .unwrap();

    let ack = timeout(WAIT, sub_rx.recv()).await.unwrap().unwrap();
    assert_eq!(ack.arg.unwrap().channel, "tickers");

    let event = timeout(WAIT, tickers_rx.recv()).await.unwrap().unwrap();
    assert_eq!(event.data[0].last, "42000");

    // the structured sink saw both the ack and the data event
    assert!(matches!(
        timeout(WAIT, structured_rx.recv()).await.unwrap().unwrap(),
        StreamEvent::Subscribe(_)
    ));
    assert!(matches!(
        timeout(WAIT, structured_rx.recv()).await.unwrap().unwrap(),
        StreamEvent::Tickers(_)
    ));
    assert!(raw_rx.try_recv().is_err());

    server.await.unwrap();
}

#[tokio::test]
async fn connect_retry_is_cancellable() {
    init_tracing();
    // nothing listens here; every dial attempt fails
    let client = OkxWsClient::new(test_config("ws://127.0.0.1:9"));
    let mut done_rx = client.take_done_receiver().await.unwrap();

    let connecting = {
        let client = client.clone();
        tokio::spawn(async move { client.connect(SessionClass::Public).await })
    };
    sleep(Duration::from_millis(300)).await;
    client.cancel();

    let result = timeout(WAIT, connecting).await.unwrap().unwrap();
    assert!(matches!(result, Err(OkxWsError::Cancelled("connect"))));
    assert_eq!(timeout(WAIT, done_rx.recv()).await.unwrap(), Some("connect"));
}

#[tokio::test]
async fn malformed_envelope_tears_down_and_redials_lazily() {
    init_tracing();
    let (listener, url) = bind_server().await;

    let server = tokio::spawn(async move {
        // first connection: poison it with an undecodable frame
        let mut ws = accept_ws(&listener).await;
        ws.send(Message::Text("not json at all".to_string()))
            .await
            .unwrap();
        // keep the socket open; the client must drop it on its own
        sleep(Duration::from_millis(200)).await;
        drop(ws);

        // the next connect() dials a fresh connection
        let _ws = accept_ws(&listener).await;
    });

    let client = OkxWsClient::new(test_config(&url));
    client.connect(SessionClass::Public).await.unwrap();

    let probe = client.clone();
    wait_until(|| {
        let probe = probe.clone();
        async move { !probe.is_connected(SessionClass::Public).await }
    })
    .await;

    // lazy reconnect on next use
    client.connect(SessionClass::Public).await.unwrap();
    assert!(client.is_connected(SessionClass::Public).await);

    server.await.unwrap();
}
