//! Integration tests for d3-connector.
//!
//! A fake D3 server runs on loopback: the dispatcher port answers every
//! connection with the line port and hangs up; the line port serves framed
//! calls with a canned reply function.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use d3_connector::config::{StaticSettings, TimeoutSettings};
use d3_connector::log::{LogTitle, MemorySink};
use d3_connector::structure::Structure;
use d3_connector::{D3Request, ErrorKind, Session, SessionState, Settings, Value};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

type Reply = Arc<dyn Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync>;

struct FakeD3 {
    main_port: u16,
    line_port: u16,
    dispatches: Arc<AtomicUsize>,
    line_connections: Arc<AtomicUsize>,
    /// Frames as received, length prefix included.
    frames: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl FakeD3 {
    async fn start<F>(reply: F) -> Self
    where
        F: Fn(&[u8]) -> Option<Vec<u8>> + Send + Sync + 'static,
    {
        let line = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let line_port = line.local_addr().unwrap().port();
        let fake = Self::dispatcher(format!("{}\n", line_port).into_bytes(), line_port).await;

        let reply: Reply = Arc::new(reply);
        let frames = fake.frames.clone();
        let connections = fake.line_connections.clone();
        tokio::spawn(async move {
            loop {
                let Ok((stream, _)) = line.accept().await else {
                    return;
                };
                connections.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(serve_line(stream, reply.clone(), frames.clone()));
            }
        });

        fake
    }

    /// Dispatcher only, answering every connection with `answer`.
    async fn dispatcher(answer: Vec<u8>, line_port: u16) -> Self {
        let main = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let main_port = main.local_addr().unwrap().port();
        let dispatches = Arc::new(AtomicUsize::new(0));

        let counter = dispatches.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = main.accept().await else {
                    return;
                };
                counter.fetch_add(1, Ordering::SeqCst);
                let _ = stream.write_all(&answer).await;
                let _ = stream.shutdown().await;
            }
        });

        Self {
            main_port,
            line_port,
            dispatches,
            line_connections: Arc::new(AtomicUsize::new(0)),
            frames: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn settings(&self, io_timeout: u64) -> Settings {
        let mut settings = Settings::new("127.0.0.1", self.main_port);
        if let Some(server) = settings.server.as_mut() {
            server.timeout = Some(TimeoutSettings {
                main: Some(2),
                child: Some(2),
                io: Some(io_timeout),
            });
        }
        settings
    }

    fn session(&self) -> Session {
        Session::new(StaticSettings(self.settings(5)))
    }

    fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap().clone()
    }
}

async fn serve_line(mut stream: TcpStream, reply: Reply, frames: Arc<Mutex<Vec<Vec<u8>>>>) {
    while let Some(frame) = read_frame(&mut stream).await {
        let payload = frame[8..].to_vec();
        frames.lock().unwrap().push(frame);

        match reply(&payload) {
            Some(body) => {
                if write_frame(&mut stream, &body).await.is_err() {
                    return;
                }
            }
            None => tokio::time::sleep(Duration::from_secs(30)).await,
        }
    }
}

/// One request frame, length prefix included.
async fn read_frame(stream: &mut TcpStream) -> Option<Vec<u8>> {
    let mut prefix = [0u8; 8];
    stream.read_exact(&mut prefix).await.ok()?;
    let len: usize = std::str::from_utf8(&prefix).ok()?.parse().ok()?;
    let mut frame = prefix.to_vec();
    frame.resize(8 + len, 0);
    stream.read_exact(&mut frame[8..]).await.ok()?;
    Some(frame)
}

async fn write_frame(stream: &mut TcpStream, body: &[u8]) -> std::io::Result<()> {
    let mut out = format!("{:08}", body.len()).into_bytes();
    out.extend_from_slice(body);
    stream.write_all(&out).await
}

fn second_reply(_: &[u8]) -> Option<Vec<u8>> {
    Some(b"4\x01SECOND\x01".to_vec())
}

/// Fake D3 whose first line connection runs `first`; every later line
/// connection answers each call with `SECOND`.
async fn start_scripted<S, Fut>(first: S) -> FakeD3
where
    S: FnOnce(TcpStream) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let line = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let line_port = line.local_addr().unwrap().port();
    let fake = FakeD3::dispatcher(format!("{}\n", line_port).into_bytes(), line_port).await;

    let frames = fake.frames.clone();
    let connections = fake.line_connections.clone();
    tokio::spawn(async move {
        let Ok((stream, _)) = line.accept().await else {
            return;
        };
        connections.fetch_add(1, Ordering::SeqCst);
        tokio::spawn(first(stream));

        let reply: Reply = Arc::new(second_reply);
        loop {
            let Ok((stream, _)) = line.accept().await else {
                return;
            };
            connections.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(serve_line(stream, reply.clone(), frames.clone()));
        }
    });

    fake
}

fn getcust_reply(_: &[u8]) -> Option<Vec<u8>> {
    Some(b"4\x01NAME\x01ADDR\x01".to_vec())
}

fn strs(items: &[&str]) -> Vec<Value> {
    items.iter().map(|s| Value::from(*s)).collect()
}

#[tokio::test]
async fn test_getcust_end_to_end() {
    let d3 = FakeD3::start(getcust_reply).await;
    let mut session = d3.session();

    let fields = session
        .call("GETCUST", vec![Value::from("123")])
        .await
        .unwrap();

    assert_eq!(fields, strs(&["NAME", "ADDR"]));
    assert_eq!(session.line(), Some(d3.line_port));
    assert_eq!(
        session.state(),
        SessionState::Connected {
            line: d3.line_port
        }
    );

    let frames = d3.frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0], b"000000154\x01GETCUST\x011\x01123".to_vec());
}

#[tokio::test]
async fn test_line_reused_across_calls() {
    let d3 = FakeD3::start(getcust_reply).await;
    let mut session = d3.session();

    for id in ["1", "2", "3"] {
        session.call("GETCUST", vec![Value::from(id)]).await.unwrap();
    }

    assert_eq!(d3.dispatches.load(Ordering::SeqCst), 1);
    assert_eq!(d3.line_connections.load(Ordering::SeqCst), 1);
    assert_eq!(d3.frames().len(), 3);
}

#[tokio::test]
async fn test_nested_params_and_reply() {
    let d3 = FakeD3::start(|_| Some(b"4\x01A\xFEB\x01x\xFDy\xFEz\x01".to_vec())).await;
    let mut session = d3.session();

    let params = vec![
        Value::from(vec!["a", "b"]),
        Value::List(vec![Value::from(vec!["c", "d"]), Value::from("e")]),
    ];
    let fields = session.call("NEST", params).await.unwrap();

    assert_eq!(
        fields,
        vec![
            Value::from(vec!["A", "B"]),
            Value::List(vec![Value::from(vec!["x", "y"]), Value::from("z")]),
        ]
    );
    assert_eq!(
        d3.frames()[0][8..].to_vec(),
        b"4\x01NEST\x012\x01a\xFEb\x01c\xFDd\xFEe".to_vec()
    );
}

#[tokio::test]
async fn test_latin1_round_trip() {
    let d3 = FakeD3::start(|request| {
        let name = request.split(|&b| b == 0x01).last().unwrap_or_default();
        let mut reply = b"4\x01".to_vec();
        reply.extend_from_slice(name);
        reply.push(0x01);
        Some(reply)
    })
    .await;
    let mut session = d3.session();

    let fields = session.call("ECHO", vec![Value::from("señor")]).await.unwrap();

    assert_eq!(fields, strs(&["señor"]));
    assert!(d3.frames()[0].ends_with(b"se\xF1or"));
}

#[tokio::test]
async fn test_call_structured() {
    let d3 = FakeD3::start(|_| Some(b"4\x01ACME\x0112.5\x01555-1\xFE555-2\x01".to_vec())).await;
    let mut session = d3.session();

    let customer = Structure::object(
        "customer",
        vec![
            Structure::scalar("name"),
            Structure::numeric("balance"),
            Structure::scalar("phones").multiple(),
        ],
    );
    let built = session
        .call_structured("GETCUST", vec![Value::from("123")], &customer)
        .await
        .unwrap();

    assert_eq!(
        built,
        json!({"name": "ACME", "balance": 12.5, "phones": ["555-1", "555-2"]})
    );
}

#[tokio::test]
async fn test_call_structured_arity_mismatch() {
    let d3 = FakeD3::start(getcust_reply).await;
    let mut session = d3.session();

    let customer = Structure::object("customer", vec![Structure::scalar("name")]);
    let err = session
        .call_structured("GETCUST", vec![Value::from("123")], &customer)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(session.is_connected());
}

#[tokio::test]
async fn test_call_request() {
    struct GetCustomer {
        id: u32,
    }

    impl D3Request for GetCustomer {
        fn routine_name(&self) -> &str {
            "GETCUST"
        }

        fn params(&self) -> Vec<Value> {
            vec![Value::from(self.id)]
        }
    }

    let d3 = FakeD3::start(getcust_reply).await;
    let mut session = d3.session();

    let fields = session.call_request(&GetCustomer { id: 123 }).await.unwrap();

    assert_eq!(fields, strs(&["NAME", "ADDR"]));
    assert!(d3.frames()[0].ends_with(b"\x011\x01123"));
}

#[tokio::test]
async fn test_no_lines_available() {
    let d3 = FakeD3::dispatcher(Vec::new(), 0).await;
    let mut session = d3.session();

    let err = session.call("GETCUST", strs(&["1"])).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(err.to_string(), "D3: no lines available");
    assert_eq!(session.state(), SessionState::Configured);
}

#[tokio::test]
async fn test_unparsable_line_reply() {
    let d3 = FakeD3::dispatcher(b"busy\n".to_vec(), 0).await;
    let mut session = d3.session();

    let err = session.open().await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(err.to_string(), "D3: cannot connect to line");
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_line_unreachable() {
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let closed_port = closed.local_addr().unwrap().port();
    drop(closed);

    let d3 = FakeD3::dispatcher(format!("{}\n", closed_port).into_bytes(), closed_port).await;
    let mut session = d3.session();

    let err = session.open().await.unwrap_err();
    assert_eq!(err.to_string(), "D3: cannot connect to line");
}

#[tokio::test]
async fn test_dispatcher_unreachable() {
    let closed = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = closed.local_addr().unwrap().port();
    drop(closed);

    let mut session = Session::new(StaticSettings(Settings::new("127.0.0.1", port)));
    let err = session.call("GETCUST", strs(&["1"])).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Connectivity);
    assert_eq!(err.to_string(), "D3: cannot establish connection");
    assert_eq!(session.state(), SessionState::Configured);
}

#[tokio::test]
async fn test_disabled_settings() {
    let mut settings = Settings::new("127.0.0.1", 1);
    settings.active = false;
    let mut session = Session::new(StaticSettings(settings));

    let err = session.call("GETCUST", strs(&["1"])).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(session.state(), SessionState::Unconfigured);
}

#[tokio::test]
async fn test_validation_before_connect() {
    let d3 = FakeD3::start(getcust_reply).await;
    let mut session = d3.session();

    assert_eq!(
        session.call("", strs(&["1"])).await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(
        session.call("GETCUST", vec![]).await.unwrap_err().kind(),
        ErrorKind::Validation
    );
    assert_eq!(d3.dispatches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_send_without_line() {
    let d3 = FakeD3::start(getcust_reply).await;
    let mut session = d3.session();

    let err = session.send(b"4\x01X").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotConnected);

    session.open().await.unwrap();
    let err = session.send(b"").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(session.is_connected());
}

#[tokio::test]
async fn test_reply_timeout_drops_line() {
    let d3 = FakeD3::start(|_| None).await;
    let mut session = Session::new(StaticSettings(d3.settings(1)));

    let err = session.call("SLOW", strs(&["1"])).await.unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert_eq!(
        err.to_string(),
        "D3: request took longer than 1 seconds to be processed"
    );
    assert!(!session.is_connected());
    assert_eq!(session.state(), SessionState::Configured);
}

#[tokio::test]
async fn test_late_reply_not_returned_to_next_call() {
    let d3 = start_scripted(|mut stream| async move {
        let Some(_) = read_frame(&mut stream).await else {
            return;
        };
        tokio::time::sleep(Duration::from_millis(1500)).await;
        let _ = write_frame(&mut stream, b"4\x01FIRST\x01").await;
        // A caller still on this line would read FIRST next.
        serve_line(stream, Arc::new(second_reply), Arc::new(Mutex::new(Vec::new()))).await;
    })
    .await;
    let mut session = Session::new(StaticSettings(d3.settings(1)));

    let err = session.call("SLOW", strs(&["1"])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(!session.is_connected());

    let fields = session.call("FAST", strs(&["2"])).await.unwrap();
    assert_eq!(fields, strs(&["SECOND"]));
    assert_eq!(d3.dispatches.load(Ordering::SeqCst), 2);
    assert_eq!(d3.line_connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_slow_but_complete_reply_keeps_line() {
    let d3 = start_scripted(|mut stream| async move {
        let Some(_) = read_frame(&mut stream).await else {
            return;
        };
        // Every piece lands within the I/O limit; the whole reply does not.
        for piece in [&b"000000084\x01F"[..], &b"IRS"[..], &b"T\x01"[..]] {
            if stream.write_all(piece).await.is_err() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(600)).await;
        }
        serve_line(stream, Arc::new(second_reply), Arc::new(Mutex::new(Vec::new()))).await;
    })
    .await;
    let mut session = Session::new(StaticSettings(d3.settings(1)));

    let err = session.call("SLOW", strs(&["1"])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Timeout);
    assert!(session.is_connected());

    let fields = session.call("FAST", strs(&["2"])).await.unwrap();
    assert_eq!(fields, strs(&["SECOND"]));
    assert_eq!(d3.line_connections.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_malformed_length_drops_line() {
    let d3 = start_scripted(|mut stream| async move {
        let Some(_) = read_frame(&mut stream).await else {
            return;
        };
        let _ = stream.write_all(b"abcdefgh4\x01FIRST\x01").await;
        serve_line(stream, Arc::new(second_reply), Arc::new(Mutex::new(Vec::new()))).await;
    })
    .await;
    let mut session = d3.session();

    let err = session.call("GETCUST", strs(&["1"])).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    assert!(!session.is_connected());

    let fields = session.call("GETCUST", strs(&["2"])).await.unwrap();
    assert_eq!(fields, strs(&["SECOND"]));
    assert_eq!(d3.line_connections.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_log_batches() {
    let d3 = FakeD3::start(getcust_reply).await;
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::builder()
        .settings(StaticSettings(d3.settings(5)))
        .log_sink(sink.clone())
        .extended_log(true)
        .build()
        .unwrap();

    session.call("GETCUST", strs(&["1"])).await.unwrap();
    session.call("GETCUST", strs(&["2"])).await.unwrap();

    let batches = sink.take();
    assert_eq!(batches.len(), 2);
    assert_eq!(
        batches[0].titles(),
        vec![
            LogTitle::Preparation,
            LogTitle::Call,
            LogTitle::RawResponse,
            LogTitle::Response,
            LogTitle::ResponseArray,
        ]
    );
    assert_eq!(
        batches[1].titles(),
        vec![
            LogTitle::Call,
            LogTitle::RawResponse,
            LogTitle::Response,
            LogTitle::ResponseArray,
        ]
    );

    let call = batches[0].find(LogTitle::Call).unwrap();
    assert_eq!(call.body, json!(["4", "GETCUST", "1", "1"]));
    let response = batches[0].find(LogTitle::ResponseArray).unwrap();
    assert_eq!(response.body, json!(["NAME", "ADDR"]));
    let preparation = batches[0].find(LogTitle::Preparation).unwrap();
    let socket = preparation.body["socket"].as_str().unwrap();
    assert!(socket.contains(&format!("line {}", d3.line_port)));
}

#[tokio::test]
async fn test_log_batch_on_failure() {
    let d3 = FakeD3::dispatcher(Vec::new(), 0).await;
    let sink = Arc::new(MemorySink::new());
    let mut session = Session::builder()
        .settings(StaticSettings(d3.settings(5)))
        .log_sink(sink.clone())
        .build()
        .unwrap();

    let _ = session.call("GETCUST", strs(&["1"])).await;

    let batches = sink.batches();
    assert_eq!(batches.len(), 1);
    assert_eq!(
        batches[0].titles(),
        vec![LogTitle::Preparation, LogTitle::Error]
    );
    assert_eq!(
        batches[0].find(LogTitle::Error).unwrap().body_text(),
        "(Connectivity) D3: no lines available"
    );
}
