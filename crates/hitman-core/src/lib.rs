pub mod approve;
pub mod batcher;
pub mod bonus;
pub mod client;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod fake;
pub mod io;
pub mod ledger;
pub mod mturk;
pub mod paginate;
pub mod paths;
pub mod processor;
pub mod qualification;
pub mod sigv4;
pub mod types;
pub mod workers;

pub use error::{HitmanError, Result};
