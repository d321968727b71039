//! Call - run one D3 routine and print the reply fields.
//!
//! This demo shows:
//! - Loading settings from a TOML file
//! - Writing the per-call log to stderr with the detail formatter
//! - Calling a routine and walking the nested reply
//!
//! # Running
//!
//! ```text
//! cargo run --example call -- d3.toml GETCUST 123
//! ```
//!
//! with `d3.toml`:
//!
//! ```toml
//! [server]
//! host = "d3.example.net"
//! mainport = 9000
//! [server.timeout]
//! io = 30
//! ```

use std::sync::Arc;

use d3_connector::config::TomlFileSettings;
use d3_connector::log::{DetailFormatter, DetailMode, WriterSink};
use d3_connector::{Session, Value};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "d3_connector=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "d3.toml".to_string());
    let routine = args.next().unwrap_or_else(|| "GETCUST".to_string());
    let params: Vec<Value> = args.map(Value::from).collect();

    let detail = DetailFormatter::new(DetailMode::Raw).max_len(None);
    let mut session = Session::builder()
        .settings(TomlFileSettings::new(&path))
        .log_sink(Arc::new(WriterSink::with_formatter(std::io::stderr(), detail)))
        .extended_log(true)
        .build()?;

    let fields = session.call(&routine, params).await?;
    for (i, field) in fields.iter().enumerate() {
        println!("{:>3}: {}", i + 1, field.to_json());
    }

    Ok(())
}
