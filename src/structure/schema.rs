//! Structure schema.
//!
//! A [`Structure`] describes the expected shape of one position of a decoded
//! reply: the key its built value is stored under, whether the position is a
//! repeating group, and whether it is a plain scalar, a numeric scalar, an
//! object with positional properties, or a position to drop.
//!
//! # Example
//!
//! ```
//! use d3_connector::structure::Structure;
//!
//! let customer = Structure::object(
//!     "customer",
//!     vec![
//!         Structure::scalar("name"),
//!         Structure::numeric("balance"),
//!         Structure::elided("internal"),
//!         Structure::scalar("phones").multiple(),
//!     ],
//! );
//! assert!(customer.is_object());
//! assert_eq!(customer.properties().len(), 4);
//! ```

/// Shape of a schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Scalar leaf; `numeric` leaves are coerced to numbers.
    Scalar { numeric: bool },
    /// Object whose properties correspond positionally to a decoded list.
    Object { properties: Vec<Structure> },
    /// Present on the wire, dropped from the built result.
    Elided,
}

/// Schema node.
///
/// Immutable once built; share it by reference (or clone it) across any
/// number of builds.
#[derive(Debug, Clone, PartialEq)]
pub struct Structure {
    name: String,
    multiple: bool,
    shape: Shape,
}

impl Structure {
    /// Plain scalar property.
    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiple: false,
            shape: Shape::Scalar { numeric: false },
        }
    }

    /// Numeric scalar property: blank maps to `null`, anything else must be
    /// a decimal number.
    pub fn numeric(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiple: false,
            shape: Shape::Scalar { numeric: true },
        }
    }

    /// Object property.
    ///
    /// An object needs at least one property; with none, the node is a plain
    /// scalar.
    pub fn object(name: impl Into<String>, properties: Vec<Structure>) -> Self {
        let shape = if properties.is_empty() {
            Shape::Scalar { numeric: false }
        } else {
            Shape::Object { properties }
        };
        Self {
            name: name.into(),
            multiple: false,
            shape,
        }
    }

    /// Position that is consumed but never stored.
    pub fn elided(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            multiple: false,
            shape: Shape::Elided,
        }
    }

    /// Mark this node as a repeating group.
    pub fn multiple(mut self) -> Self {
        self.multiple = true;
        self
    }

    /// Key under which the built value is stored.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Check if this node is a repeating group.
    #[inline]
    pub fn is_multiple(&self) -> bool {
        self.multiple
    }

    /// Check if this node is a numeric scalar.
    #[inline]
    pub fn is_numeric(&self) -> bool {
        matches!(self.shape, Shape::Scalar { numeric: true })
    }

    /// Check if this node is an object.
    #[inline]
    pub fn is_object(&self) -> bool {
        matches!(self.shape, Shape::Object { .. })
    }

    /// Check if this node is elided.
    #[inline]
    pub fn is_elided(&self) -> bool {
        matches!(self.shape, Shape::Elided)
    }

    /// Object properties, empty for non-objects.
    pub fn properties(&self) -> &[Structure] {
        match &self.shape {
            Shape::Object { properties } => properties,
            _ => &[],
        }
    }
}
