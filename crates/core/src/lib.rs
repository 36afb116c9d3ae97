//! Ordex Core - Key, value and error types for the Ordex reactive index.
//!
//! This crate provides the foundational types shared by every Ordex crate:
//!
//! - `Key`: composite, order-preserving index keys (text, number, tuples, `Max` sentinel)
//! - `Value` / `PropertyMap`: the closed property-value variant records store
//! - `Error`: precondition-violation taxonomy for all engine operations
//!
//! # Example
//!
//! ```rust
//! use ordex_core::{Key, Value};
//!
//! let key = Key::tuple(vec![Key::text("user"), Key::number(42.0)]);
//! assert!(key.validate().is_ok());
//! assert!(key < Key::tuple(vec![Key::text("user"), Key::Max]));
//!
//! let v = Value::text("alice");
//! assert_eq!(v.as_text(), Some("alice"));
//! ```

#![no_std]

extern crate alloc;

mod error;
mod key;
mod value;

pub use error::{Error, Result};
pub use key::{Key, MAX_TEXT_COMPONENT};
pub use value::{PropertyMap, Value};
