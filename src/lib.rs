pub mod analyzer;
pub mod boundary;
pub mod changelog;
pub mod cli;
pub mod config;
pub mod conventional;
pub mod domain;
pub mod error;
pub mod flow;
pub mod git;
pub mod guard;
pub mod hooks;
pub mod ui;

pub use error::{ErrorKind, GitFlowError, Result};
