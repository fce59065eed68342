//! Core modules: the XML tree, the objective contract, file discovery,
//! configuration and the batch runner.

pub mod config;
pub mod discovery;
pub mod document;
pub mod error;
pub mod objective;
pub mod runner;
