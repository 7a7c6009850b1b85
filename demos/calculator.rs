//! Calculator - request/response over loopback TCP.
//!
//! This example demonstrates:
//! - Declaring typed methods and building a contract around a worker
//! - Serving the contract with one dispatch loop per connection
//! - Calling it with typed and untyped calls
//! - Synchronous and deferred results
//!
//! # Running
//!
//! ```text
//! RUST_LOG=wirecall=debug cargo run --example calculator
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;
use wirecall::codec::MsgPackCodec;
use wirecall::contract::{Method, Reply, ServiceContract};
use wirecall::transport::SocketTransport;
use wirecall::{CancelSignal, OperationError, RpcClient, Server};

const ADD: Method<(i64, i64), i64> = Method::new("Add");
const DIVIDE: Method<(f64, f64), f64> = Method::new("Divide");
const SLOW_SQUARE: Method<(i64,), i64> = Method::new("SlowSquare");
const COUNT: Method<(), u64> = Method::new("Count");

/// Worker shared by every connection.
#[derive(Default)]
struct Calculator {
    calls: AtomicU64,
}

impl Calculator {
    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

fn contract() -> ServiceContract<Calculator> {
    ServiceContract::builder("Calculator")
        .operation(&ADD, |calc: Arc<Calculator>, (a, b): (i64, i64)| {
            calc.tick();
            Reply::ready(a + b)
        })
        .operation(&DIVIDE, |calc: Arc<Calculator>, (a, b): (f64, f64)| {
            calc.tick();
            if b == 0.0 {
                return Reply::failed("division by zero");
            }
            Reply::ready(a / b)
        })
        .operation(&SLOW_SQUARE, |calc: Arc<Calculator>, (n,): (i64,)| {
            calc.tick();
            Reply::deferred(async move {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, OperationError>(n * n)
            })
        })
        .operation(&COUNT, |calc: Arc<Calculator>, ()| {
            Reply::ready(calc.calls.load(Ordering::Relaxed))
        })
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wirecall=info")),
        )
        .init();

    // Server: log every exchange and absorb connection errors
    let contract = contract();
    let info = contract.info();
    let server = Server::builder(contract, Arc::new(Calculator::default()))
        .on_request(|request| async move {
            tracing::info!(operation = %request.operation, "Request");
            Ok(())
        })
        .on_error(|error| async move {
            tracing::warn!(%error, "Connection closed with error");
            Ok(())
        })
        .build();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let stop = CancelSignal::new();
    let serving = {
        let stop = stop.clone();
        tokio::spawn(async move { server.serve_tcp(listener, stop).await })
    };

    // Client: typed calls
    let client = RpcClient::builder(info)
        .request_timeout(Duration::from_secs(5))
        .build();
    let mut transport = SocketTransport::connect(addr, client.transport_config()).await?;

    let sum = client.call(&mut transport, &ADD, (3, 4)).await?;
    println!("Add(3, 4) = {sum}");

    let quotient = client.call(&mut transport, &DIVIDE, (22.0, 7.0)).await?;
    println!("Divide(22, 7) = {quotient:.4}");

    let square = client.call(&mut transport, &SLOW_SQUARE, (12,)).await?;
    println!("SlowSquare(12) = {square}");

    // Client: untyped call with pre-encoded arguments
    let args = vec![
        Some(MsgPackCodec::encode(&100i64)?),
        Some(MsgPackCodec::encode(&-1i64)?),
    ];
    let sum: i64 = client.call_named_as(&mut transport, "Add", args).await?;
    println!("Add(100, -1) = {sum}");

    let count = client.call(&mut transport, &COUNT, ()).await?;
    println!("Calls so far: {count}");

    client.end_session(&mut transport).await?;

    // A failing operation closes its connection
    let mut transport = SocketTransport::connect(addr, client.transport_config()).await?;
    match client.call(&mut transport, &DIVIDE, (1.0, 0.0)).await {
        Ok(value) => println!("Divide(1, 0) = {value}"),
        Err(e) => println!("Divide(1, 0) failed: {e}"),
    }

    stop.cancel();
    serving.await??;
    Ok(())
}
