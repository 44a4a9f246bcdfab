//! `skylapse` -- command line front end for `skylapse-core`.
//!
//! Parses arguments, loads configuration from the environment, resolves
//! place names, and runs the [`pipeline`].

pub mod args;
pub mod config;
pub mod geocode;
pub mod pipeline;
