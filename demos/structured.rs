//! Structured - build a typed document from a D3 reply.
//!
//! This demo shows:
//! - Describing a reply with a `Structure` schema
//! - Numeric coercion, elided fields and repeating groups
//! - Pivoting parallel multivalued fields into rows
//!
//! # Running
//!
//! ```text
//! cargo run --example structured -- d3.toml 123
//! ```
//!
//! The `GETCUST` routine is expected to answer
//! `name, balance, internal code, phone numbers, order ids, order totals`.

use std::sync::Arc;

use d3_connector::config::TomlFileSettings;
use d3_connector::log::{TimerFormatter, TracingSink, WriterSink};
use d3_connector::structure::{pivot_rows, Structure};
use d3_connector::{Session, Value};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let path = args.next().unwrap_or_else(|| "d3.toml".to_string());
    let id = args.next().unwrap_or_else(|| "123".to_string());

    let mut session = Session::builder()
        .settings(TomlFileSettings::new(&path))
        .log_sink(Arc::new(TracingSink))
        .log_sink(Arc::new(WriterSink::with_formatter(std::io::stderr(), TimerFormatter)))
        .build()?;

    let customer = Structure::object(
        "customer",
        vec![
            Structure::scalar("name"),
            Structure::numeric("balance"),
            Structure::elided("internal"),
            Structure::scalar("phones").multiple(),
            Structure::scalar("order_ids").multiple(),
            Structure::scalar("order_totals").multiple(),
        ],
    );

    let fields = session.call("GETCUST", vec![Value::from(id.as_str())]).await?;
    let built = d3_connector::structure::build(&Value::List(fields.clone()), &customer)?;
    println!("{}", serde_json::to_string_pretty(&built)?);

    // order ids and totals come back as parallel multivalues
    if let Some(orders) = pivot_rows(&fields, 4, Some(2)) {
        for row in orders {
            let cells: Vec<_> = row.iter().map(|v| v.as_str().unwrap_or("")).collect();
            println!("order {}", cells.join(" = "));
        }
    }

    Ok(())
}
