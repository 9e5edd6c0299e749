use clap::Subcommand;

use super::config::ConfigArgs;
use super::demo::DemoArgs;

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Run the scripted command chain against the in-memory fixture page
    Demo(DemoArgs),

    /// Inspect and validate the shim configuration
    Config(ConfigArgs),
}
