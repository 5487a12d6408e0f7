//! Domain models for the server.

pub mod product;

pub use product::{NewProduct, Product, ProductUpdate};
