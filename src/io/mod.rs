pub mod config_io;
pub mod fixer;

pub use config_io::{ConfigError, load_config, load_config_from};
pub use fixer::CommandFixer;
