//! Structure module - schema-driven record building.
//!
//! Decoded D3 replies are positional. This module gives them names and types:
//!
//! - [`Structure`] - immutable schema tree (scalar, numeric, object, elided,
//!   optionally repeating)
//! - [`build`] / [`build_with_first_level`] - match a decoded [`Value`]
//!   against a schema, producing a `serde_json::Value`
//! - [`pivot`] - recombine parallel multivalued fields into rows
//!
//! [`Value`]: crate::codec::Value
//!
//! # Example
//!
//! ```
//! use d3_connector::codec::Value;
//! use d3_connector::structure::{build_with_first_level, Structure};
//!
//! let schema = Structure::object(
//!     "customer",
//!     vec![
//!         Structure::scalar("name"),
//!         Structure::scalar("phones").multiple(),
//!     ],
//! );
//! let data = Value::List(vec![Value::from("ACME"), Value::from(vec!["1", "2"])]);
//! let built = build_with_first_level(&data, &schema).unwrap();
//! assert_eq!(built["customer"]["phones"][1], "2");
//! ```

mod builder;
mod pivot;
mod schema;

pub use builder::{build, build_with_first_level};
pub use pivot::{pivot, pivot_row, pivot_rows, Pivot};
pub use schema::{Shape, Structure};
