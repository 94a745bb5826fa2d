//! Inbox synchronization: pulls subscriptions and a paginated posts feed from
//! the remote inbox service into a local SQLite store.
//!
//! [`sync::InboxSync`] is the entry point. It runs at most one round at a
//! time and hands the outcome of that round to every caller that asked
//! while it was running.

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod feed;
pub mod models;
pub mod sync;
