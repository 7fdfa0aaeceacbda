// crates/daemon/src/config/mod.rs

pub mod model;
pub mod parser;
pub mod validator;

pub use model::DaemonConfig;
pub use parser::{parse_config, parse_config_file};
