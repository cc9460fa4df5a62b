//! Database layer for data persistence and access.
//!
//! Implements the data access layer using SQLx with PostgreSQL, following
//! the repository pattern: API handlers talk to repositories
//! ([`handlers`]), repositories run queries against record structs
//! ([`models`]), and failures are categorized by [`errors`].
//!
//! Repositories borrow a connection, so multi-statement invariants run
//! inside a transaction owned by the caller (or opened internally where the
//! operation itself is the transaction boundary).
//!
//! Migrations live in `migrations/` and are exposed through
//! [`crate::migrator`].

pub mod errors;
pub mod handlers;
pub mod models;
