//! # Facade Module
//!
//! This module implements the **Facade** pattern, serving as an intermediate logic layer
//! between the application and the underlying document store.
//!
//! * **Database Abstraction:** Facades work on typed records and never expose whether
//!   the connected store is the in-process one or PostgreSQL.
//! * **Coordinated Logic:** They own the multi-step operations, such as validating a
//!   record, requesting a sequence value and writing it, or rolling back a failed batch.
//! * **Error taxonomy:** Every failure reaching the caller is a [`FacadeError`].

mod facade_auto_increment;
pub use facade_auto_increment::*;

mod facade_connection;
pub use facade_connection::*;

mod facade_error;
pub use facade_error::*;

mod facade_model;
pub use facade_model::*;
