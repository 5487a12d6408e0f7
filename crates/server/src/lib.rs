//! Daily Darshan server library.
//!
//! This crate provides the web application as a library, allowing it to be
//! tested and reused.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod error;
pub mod filters;
pub mod models;
pub mod routes;
pub mod state;
pub mod storage;
