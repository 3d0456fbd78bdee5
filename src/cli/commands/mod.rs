//! CLI command implementations.

mod ask;
mod chart;
mod config;
mod index;
mod latest;
mod query;
mod tools;

pub use ask::run_ask;
pub use chart::{run_chart, ChartOptions};
pub use config::run_config;
pub use index::run_index;
pub use latest::run_latest;
pub use query::run_query;
pub use tools::run_tools;
