//! stashguard CLI
//!
//! File formats and presentation for the stashguard engine: configuration,
//! scenario files, and plain-text rendering of explain traces.

pub mod cli;
pub mod config;
pub mod render;
pub mod scenario;

pub use cli::{Cli, Commands};
pub use config::CliConfig;
pub use render::Renderer;
pub use scenario::{ActionReport, ActionResult, ActionSpec, Scenario, World};
