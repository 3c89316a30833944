//! # Todo Shared Library
//!
//! Data layer shared by the todo API server and its test suites.
//!
//! ## Module Organization
//!
//! - `db`: PostgreSQL pool and embedded migrations
//! - `models`: Row types (users, todo lists, todos) and their queries
//! - `store`: The `Store` capability handed to request handlers, with
//!   PostgreSQL and in-memory implementations

pub mod db;
pub mod models;
pub mod store;
