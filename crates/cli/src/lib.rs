//! `authdbctl`: parse flags, resolve configuration, run one command through
//! [`authdb::Client`] and print the result.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod output;
pub mod styles;
