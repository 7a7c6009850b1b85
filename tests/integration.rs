//! Integration tests for wirecall.
//!
//! These tests drive a client and a server against each other over real
//! transports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::duplex;
use tokio::net::TcpListener;

use wirecall::codec::MsgPackCodec;
use wirecall::contract::{ContractInfo, Method, Reply, ServiceContract};
use wirecall::protocol::{decode_header, encode_header, Envelope, HeaderKind};
use wirecall::transport::{SocketTransport, StreamTransport};
use wirecall::{CancelSignal, OperationError, RpcClient, RpcError, Server, ServerConfig};

#[derive(Serialize, Deserialize, Debug, Default, Clone, PartialEq)]
struct Order {
    id: u32,
    items: Vec<String>,
}

const ADD: Method<(i32, i32), i32> = Method::new("Add");
const ANSWER: Method<(), i32> = Method::new("Answer");
const DESCRIBE: Method<(Order, Option<String>), String> = Method::new("Describe");
const RESET: Method<(), ()> = Method::new("Reset");

/// Worker whose call counter is shared by every connection.
#[derive(Default)]
struct Calculator {
    calls: AtomicUsize,
}

fn contract() -> ServiceContract<Calculator> {
    ServiceContract::builder("Calculator")
        .operation(&ADD, |calc: Arc<Calculator>, (a, b): (i32, i32)| {
            calc.calls.fetch_add(1, Ordering::SeqCst);
            Reply::ready(a + b)
        })
        .operation(&ANSWER, |_calc: Arc<Calculator>, ()| {
            Reply::deferred(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                Ok::<_, OperationError>(42)
            })
        })
        .operation(
            &DESCRIBE,
            |_calc: Arc<Calculator>, (order, note): (Order, Option<String>)| {
                let note = note.unwrap_or_else(|| "none".to_string());
                Reply::ready(format!("#{} [{}] note={}", order.id, order.items.join(","), note))
            },
        )
        .operation(&RESET, |calc: Arc<Calculator>, ()| {
            calc.calls.store(0, Ordering::SeqCst);
            Reply::ready(())
        })
        .build()
}

fn client() -> RpcClient {
    RpcClient::new(contract().info())
}

/// Client and server stream transports joined by an in-memory pipe.
fn stream_pair() -> (
    StreamTransport<tokio::io::DuplexStream>,
    StreamTransport<tokio::io::DuplexStream>,
) {
    let (a, b) = duplex(64 * 1024);
    (StreamTransport::new(a), StreamTransport::new(b))
}

/// Add(3, 4) over a stream pair decodes to 7, then the session ends cleanly.
#[tokio::test]
async fn test_end_to_end_add_over_stream() {
    let (mut client_side, server_side) = stream_pair();
    let server = Server::new(contract(), Calculator::default());
    let connection = server.spawn_connection(server_side);

    let client = client();
    let sum = client.call(&mut client_side, &ADD, (3, 4)).await.unwrap();
    assert_eq!(sum, 7);

    client.end_session(&mut client_side).await.unwrap();
    connection.join().await.unwrap();
    assert_eq!(server.worker().calls.load(Ordering::SeqCst), 1);
}

/// Same scenario over loopback TCP with the socket transport.
#[tokio::test]
async fn test_end_to_end_add_over_tcp() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(contract(), Calculator::default());
    let stop = CancelSignal::new();

    let serving = {
        let server = server.clone();
        let stop = stop.clone();
        tokio::spawn(async move { server.serve_tcp(listener, stop).await })
    };

    let client = client();
    let mut transport = SocketTransport::connect(addr, client.transport_config())
        .await
        .unwrap();
    assert_eq!(client.call(&mut transport, &ADD, (3, 4)).await.unwrap(), 7);
    assert_eq!(client.call(&mut transport, &ADD, (40, 2)).await.unwrap(), 42);
    client.end_session(&mut transport).await.unwrap();

    stop.cancel();
    serving.await.unwrap().unwrap();
}

/// Deferred results are awaited before the response is sent.
#[tokio::test]
async fn test_deferred_result_is_unwrapped() {
    let (mut client_side, server_side) = stream_pair();
    let server = Server::new(contract(), Calculator::default());
    let connection = server.spawn_connection(server_side);

    let client = client();
    assert_eq!(client.call(&mut client_side, &ANSWER, ()).await.unwrap(), 42);

    client.end_session(&mut client_side).await.unwrap();
    connection.join().await.unwrap();
}

/// Structured arguments, a nil argument, and a unit result.
#[tokio::test]
async fn test_structured_and_unit_calls() {
    let (mut client_side, server_side) = stream_pair();
    let server = Server::new(contract(), Calculator::default());
    let connection = server.spawn_connection(server_side);
    let client = client();

    let order = Order {
        id: 7,
        items: vec!["bolt".to_string(), "nut".to_string()],
    };
    let described = client
        .call(&mut client_side, &DESCRIBE, (order.clone(), None))
        .await
        .unwrap();
    assert_eq!(described, "#7 [bolt,nut] note=none");

    let described = client
        .call(&mut client_side, &DESCRIBE, (order, Some("rush".to_string())))
        .await
        .unwrap();
    assert_eq!(described, "#7 [bolt,nut] note=rush");

    client.call(&mut client_side, &ADD, (1, 1)).await.unwrap();
    client.call(&mut client_side, &RESET, ()).await.unwrap();
    assert_eq!(server.worker().calls.load(Ordering::SeqCst), 0);

    client.end_session(&mut client_side).await.unwrap();
    connection.join().await.unwrap();
}

/// Untyped calls carry raw blobs; nil blobs decode to the parameter default.
#[tokio::test]
async fn test_named_calls() {
    let (mut client_side, server_side) = stream_pair();
    let server = Server::new(contract(), Calculator::default());
    let connection = server.spawn_connection(server_side);
    let client = client();

    let args = vec![Some(MsgPackCodec::encode(&5i32).unwrap()), None];
    let raw = client
        .call_named(&mut client_side, "Add", args)
        .await
        .unwrap()
        .unwrap();
    let sum: i32 = MsgPackCodec::decode(&raw).unwrap();
    assert_eq!(sum, 5);

    let answer: i32 = client
        .call_named_as(&mut client_side, "Answer", Vec::new())
        .await
        .unwrap();
    assert_eq!(answer, 42);

    let result = client
        .call_named(&mut client_side, "DoesNotExist", Vec::new())
        .await;
    assert!(matches!(result, Err(RpcError::UnknownOperation(_))));

    client.end_session(&mut client_side).await.unwrap();
    connection.join().await.unwrap();
}

/// A server without the requested operation closes the connection without
/// answering.
#[tokio::test]
async fn test_unknown_operation_closes_connection() {
    const MISSING: Method<(), i32> = Method::new("Missing");

    let (mut client_side, server_side) = stream_pair();
    let server = Server::new(contract(), Calculator::default());
    let connection = server.spawn_connection(server_side);

    let client = RpcClient::new(contract().info().with_method(&MISSING));
    let result = client.call(&mut client_side, &MISSING, ()).await;
    assert!(matches!(result, Err(RpcError::ConnectionClosed)));

    let outcome = connection.join().await;
    assert!(matches!(outcome, Err(RpcError::UnknownOperation(name)) if name == "Missing"));
}

/// Too few argument blobs fail the dispatch.
#[tokio::test]
async fn test_arity_mismatch_closes_connection() {
    const SHORT_ADD: Method<(i32,), i32> = Method::new("Add");

    let (mut client_side, server_side) = stream_pair();
    let server = Server::new(contract(), Calculator::default());
    let connection = server.spawn_connection(server_side);

    let client = RpcClient::new(ContractInfo::new("Calculator").with_method(&SHORT_ADD));
    let result = client.call(&mut client_side, &SHORT_ADD, (1,)).await;
    assert!(matches!(result, Err(RpcError::ConnectionClosed)));

    match connection.join().await {
        Err(RpcError::ArityMismatch {
            operation,
            expected,
            actual,
        }) => {
            assert_eq!(operation, "Add");
            assert_eq!(expected, 2);
            assert_eq!(actual, 1);
        }
        other => panic!("unexpected: {other:?}"),
    }
}

/// Exactly the declared number of blobs succeeds, even when all are nil.
#[tokio::test]
async fn test_all_nil_arguments_are_accepted() {
    let (mut client_side, server_side) = stream_pair();
    let server = Server::new(contract(), Calculator::default());
    let connection = server.spawn_connection(server_side);

    let sum: i32 = client()
        .call_named_as(&mut client_side, "Add", vec![None, None])
        .await
        .unwrap();
    assert_eq!(sum, 0);

    drop(client_side);
    connection.join().await.unwrap();
}

/// Connections run independently against one shared worker.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_tcp_connections() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = Server::new(contract(), Calculator::default());
    let stop = CancelSignal::new();

    let serving = {
        let server = server.clone();
        let stop = stop.clone();
        tokio::spawn(async move { server.serve_tcp(listener, stop).await })
    };

    let mut callers = Vec::new();
    for n in 0..8 {
        callers.push(tokio::spawn(async move {
            let client = client();
            let mut transport = SocketTransport::connect(addr, client.transport_config())
                .await
                .unwrap();
            for i in 0..10 {
                let sum = client.call(&mut transport, &ADD, (n, i)).await.unwrap();
                assert_eq!(sum, n + i);
            }
            client.end_session(&mut transport).await.unwrap();
        }));
    }
    for caller in callers {
        caller.await.unwrap();
    }

    assert_eq!(server.worker().calls.load(Ordering::SeqCst), 80);
    stop.cancel();
    serving.await.unwrap().unwrap();
}

/// Hooks installed through the builder see both sides of every exchange.
#[tokio::test]
async fn test_hooks_over_stream() {
    let events = Arc::new(AtomicUsize::new(0));
    let on_request = Arc::clone(&events);
    let on_response = Arc::clone(&events);

    let server = Server::builder(contract(), Arc::new(Calculator::default()))
        .on_request(move |_| {
            let events = Arc::clone(&on_request);
            async move {
                events.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .on_response(move |_| {
            let events = Arc::clone(&on_response);
            async move {
                events.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .build();

    let (mut client_side, server_side) = stream_pair();
    let connection = server.spawn_connection(server_side);
    let client = client();
    client.call(&mut client_side, &ADD, (1, 2)).await.unwrap();
    client.call(&mut client_side, &ANSWER, ()).await.unwrap();
    client.end_session(&mut client_side).await.unwrap();
    connection.join().await.unwrap();

    assert_eq!(events.load(Ordering::SeqCst), 4);
}

/// A payload over the server's limit is rejected before it is read.
#[tokio::test]
async fn test_server_payload_limit() {
    let config = ServerConfig::from_json_str(r#"{"transport": {"max_payload_size": 16}}"#).unwrap();
    let server = Server::builder(contract(), Arc::new(Calculator::default()))
        .config(config)
        .build();

    let (mut client_side, server_side) = stream_pair();
    let connection = server.spawn_connection(server_side);

    let order = Order {
        id: 1,
        items: vec!["a very long item name that overflows the limit".to_string()],
    };
    let result = client()
        .call(&mut client_side, &DESCRIBE, (order, None))
        .await;
    assert!(matches!(result, Err(RpcError::ConnectionClosed)));
    assert!(matches!(
        connection.join().await,
        Err(RpcError::PayloadTooLarge { max: 16, .. })
    ));
}

#[test]
fn test_envelope_with_nil_argument() {
    let envelope = Envelope::for_request("Foo", vec![Some(vec![0x01]), None]);
    let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();

    assert_eq!(decoded.operation, "Foo");
    assert_eq!(decoded.arguments.len(), 2);
    assert_eq!(
        decoded.arguments[0].as_deref().map(|b| b.as_slice()),
        Some(&[0x01u8][..])
    );
    assert!(decoded.arguments[1].is_none());
}

#[test]
fn test_header_lengths() {
    for length in [0u64, 1, 255, 65_536, u32::MAX as u64 + 1, i64::MAX as u64] {
        let header = encode_header(length);
        assert_eq!(decode_header(&header, false).unwrap(), HeaderKind::Frame(length));
    }
}
