pub mod cli;
mod app;
mod config;
mod effects;
mod logging;
mod render;
mod session;

pub use app::run_app;
