//! Command-line interface.

pub mod app;
pub mod commands;
pub mod dispatch;
pub mod env;
pub mod info;
pub mod output;
pub mod parse;
pub mod providers;
pub mod runtime;
pub mod send;
pub mod serve;

pub use app::run;
