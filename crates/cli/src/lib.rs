//! Command line interface of grip.

pub mod address;
mod app;
pub mod command;
mod logging;

pub use app::Args;
