#[macro_use]
extern crate log;

pub mod cli;
pub mod config;
pub mod conflict;
pub mod context;
pub mod env;
pub mod error;
pub mod logger;
pub mod probe;
pub mod procs;
pub mod resolve;
pub mod stack;
pub mod startup;
pub mod ui;

pub use miette::Result;
