//! `stockwatch` command line: argument parsing, resolved configuration and
//! the subcommands.

pub mod args;
pub mod commands;
pub mod config;
