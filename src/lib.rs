pub mod batch;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod intrinsics;
mod metrics;
pub mod scene;
pub mod utils;
pub mod viewer;

pub use config::Opts;
pub use scene::{ReconcileOptions, ReconcileReport, Reconciler};
