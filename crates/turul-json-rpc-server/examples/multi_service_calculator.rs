//! Multi-Service Calculator Example
//!
//! Registers three services behind one dispatcher and feeds it a scripted
//! sequence of payloads, printing each reply. Shows overloads, named params,
//! default values, application errors, notifications and batches.
//!
//! Run with `RUST_LOG=debug` to watch routing and resolution.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;
use turul_json_rpc_server::prelude::*;

/// Arithmetic with overloaded `add`
struct Calculator;

impl RpcService for Calculator {
    fn interfaces(&self) -> Vec<Interface<Self>> {
        vec![
            Interface::new("Calculator")
                .method(
                    Method::new("add")
                        .param::<i64>("a")
                        .param::<i64>("b")
                        .returns::<i64>()
                        .sync_handler(|_: &Calculator, args| {
                            let (a, b): (i64, i64) = (args.get(0)?, args.get(1)?);
                            a.checked_add(b)
                                .ok_or_else(|| ServiceError::application(1000, "integer overflow"))
                        }),
                )
                .method(
                    Method::new("add")
                        .param::<i64>("a")
                        .param::<i64>("b")
                        .param::<i64>("c")
                        .returns::<i64>()
                        .sync_handler(|_: &Calculator, args| {
                            let values: Vec<i64> = (0..3).map(|i| args.get(i)).collect::<Result<_, _>>()?;
                            values
                                .into_iter()
                                .try_fold(0i64, i64::checked_add)
                                .ok_or_else(|| ServiceError::application(1000, "integer overflow"))
                        }),
                )
                .method(
                    Method::new("add")
                        .param::<f64>("a")
                        .param::<f64>("b")
                        .returns::<f64>()
                        .sync_handler(|_: &Calculator, args| {
                            Ok(args.get::<f64>(0)? + args.get::<f64>(1)?)
                        }),
                )
                .method(
                    Method::new("divide")
                        .param::<f64>("dividend")
                        .param::<f64>("divisor")
                        .returns::<f64>()
                        .sync_handler(|_: &Calculator, args| {
                            let dividend: f64 = args.named("dividend")?;
                            let divisor: f64 = args.named("divisor")?;
                            if divisor == 0.0 {
                                return Err(ServiceError::application(1001, "division by zero")
                                    .with_data(serde_json::json!({ "dividend": dividend })));
                            }
                            Ok(dividend / divisor)
                        }),
                ),
        ]
    }
}

/// Text helpers
struct Text;

impl RpcService for Text {
    fn interfaces(&self) -> Vec<Interface<Self>> {
        vec![
            Interface::new("Text")
                .method(
                    Method::new("repeat")
                        .param::<String>("text")
                        .param_or::<u32>("times", serde_json::json!(2))
                        .returns::<String>()
                        .sync_handler(|_: &Text, args| {
                            let text: String = args.get(0)?;
                            let times: u32 = args.get(1)?;
                            Ok(text.repeat(times as usize))
                        }),
                )
                .method(
                    Method::new("join")
                        .param::<Vec<String>>("parts")
                        .param_or::<String>("separator", serde_json::json!(" "))
                        .returns::<String>()
                        .sync_handler(|_: &Text, args| {
                            let parts: Vec<String> = args.get(0)?;
                            let separator: String = args.get(1)?;
                            Ok(parts.join(&separator))
                        }),
                ),
        ]
    }
}

/// Default service for unqualified method names
struct System {
    pings: AtomicU64,
}

impl RpcService for System {
    fn interfaces(&self) -> Vec<Interface<Self>> {
        vec![
            Interface::new("System")
                .method(Method::new("ping").returns::<String>().handler(
                    |system: Arc<System>, _args| async move {
                        system.pings.fetch_add(1, Ordering::Relaxed);
                        Ok::<_, ServiceError>("pong".to_string())
                    },
                ))
                .method(Method::new("pings").returns::<u64>().sync_handler(
                    |system: &System, _| Ok::<_, ServiceError>(system.pings.load(Ordering::Relaxed)),
                )),
        ]
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let dispatcher = JsonRpcDispatcher::builder()
        .default_service("System")
        .service("Calculator", Arc::new(Calculator))
        .service("Text", Arc::new(Text))
        .service(
            "System",
            Arc::new(System {
                pings: AtomicU64::new(0),
            }),
        )
        .build();

    info!("Registered methods: {:?}", dispatcher.registered_methods());

    let script = [
        r#"{"jsonrpc":"2.0","method":"Calculator.add","params":[2,3],"id":1}"#,
        r#"{"jsonrpc":"2.0","method":"Calculator.add","params":[1,2,3],"id":2}"#,
        r#"{"jsonrpc":"2.0","method":"Calculator.add","params":[2.5,1],"id":3}"#,
        r#"{"jsonrpc":"2.0","method":"Calculator.divide","params":{"divisor":4,"dividend":10},"id":4}"#,
        r#"{"jsonrpc":"2.0","method":"Calculator.divide","params":[1,0],"id":5}"#,
        r#"{"jsonrpc":"2.0","method":"Calculator.add","params":["two","three"],"id":6}"#,
        r#"{"jsonrpc":"2.0","method":"Text.repeat","params":["ab"],"id":7}"#,
        r#"{"jsonrpc":"2.0","method":"Text.join","params":{"parts":["a","b","c"],"separator":"-"},"id":"join"}"#,
        r#"{"jsonrpc":"2.0","method":"ping"}"#,
        r#"[
            {"jsonrpc":"2.0","method":"ping","id":10},
            {"jsonrpc":"2.0","method":"Missing.method","id":11},
            {"jsonrpc":"2.0","method":"ping"},
            {"jsonrpc":"2.0","method":"pings","id":12}
        ]"#,
        r#"[]"#,
        r#"{"jsonrpc":"2.0","method":"#,
    ];

    for payload in script {
        let compact = payload.split_whitespace().collect::<Vec<_>>().join(" ");
        println!("--> {}", compact);
        match dispatcher.handle_str(payload).await {
            Some(reply) => println!("<-- {}", reply),
            None => println!("<-- (no reply)"),
        }
    }

    Ok(())
}
