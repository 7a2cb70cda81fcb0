//! Creatio Operations Module
//!
//! A uniform description of the four OData requests (read, create, update,
//! delete) that the client executes.

pub mod operation;

pub use operation::Operation;
