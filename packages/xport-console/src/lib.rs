//! XPort Console - Library interface
//!
//! Configuration, application wiring and command handlers, exposed for
//! integration tests.

pub mod app;
pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
