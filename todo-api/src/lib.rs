//! # Todo API Server Library
//!
//! HTTP surface for users, todo lists and todos.
//!
//! ## Modules
//!
//! - `app`: Application state and router builder
//! - `config`: Configuration management
//! - `error`: Error handling and HTTP response mapping
//! - `extract`: Body extractor and lenient id/flag parsing
//! - `middleware`: Request logging
//! - `routes`: API route handlers

pub mod app;
pub mod config;
pub mod error;
pub mod extract;
pub mod middleware;
pub mod routes;
