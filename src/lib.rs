pub mod auth;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod mover;

pub use classifier::{Classifier, Destination, MatchMode};
pub use config::Config;
pub use drive::{DriveClient, FileDirectory, MemoryDirectory};
pub use error::{ConfigError, DriveError, RunError};
pub use mover::{FileOutcome, Mover, RunReport, RunTally};
