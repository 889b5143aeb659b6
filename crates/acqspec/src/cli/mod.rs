//! CLI module for acqspec
//!
//! Every command reads its inputs from files, works on an in-memory session,
//! and prints either tables or JSON.

pub mod acquisitions;
pub mod apply;
pub mod config;
pub mod init;
pub mod output;
