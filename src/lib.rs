//! # d3-connector
//!
//! Async Rust client for D3 multivalue database servers.
//!
//! A [`Session`] asks the D3 dispatcher for a free line, connects to it, and
//! runs routines over a length-framed exchange. Requests and replies are
//! nested values flattened with D3's four-level separators.
//!
//! ## Architecture
//!
//! - **Codec**: [`Value`] trees to and from separator-delimited bytes
//! - **Protocol**: 8-digit length framing, chunked reply reads, timeouts
//! - **Session**: settings, line negotiation, calls, per-call log batches
//! - **Structure**: schema-driven building of decoded replies, correlative pivot
//!
//! ## Example
//!
//! ```no_run
//! use d3_connector::config::StaticSettings;
//! use d3_connector::structure::Structure;
//! use d3_connector::{Session, Settings, Value};
//!
//! #[tokio::main]
//! async fn main() -> d3_connector::Result<()> {
//!     let mut session = Session::builder()
//!         .settings(StaticSettings(Settings::new("d3.example.net", 9000)))
//!         .build()?;
//!
//!     let fields = session.call("GETCUST", vec![Value::from("123")]).await?;
//!     println!("{:?}", fields);
//!
//!     let customer = Structure::object(
//!         "customer",
//!         vec![Structure::scalar("name"), Structure::scalar("address")],
//!     );
//!     let built = session
//!         .call_structured("GETCUST", vec![Value::from("123")], &customer)
//!         .await?;
//!     println!("{}", built);
//!     Ok(())
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod log;
pub mod protocol;
pub mod structure;

mod session;

pub use codec::{Charset, DelimiterCodec, Value};
pub use config::{ServerConfig, Settings, SettingsProvider};
pub use error::{D3Error, ErrorKind, Result};
pub use session::{D3Request, Session, SessionBuilder, SessionState};
pub use structure::{Pivot, Structure};
