pub mod aliases;
pub mod args;
pub mod fetch;
pub mod join;
pub mod normalize;
pub mod pipeline;
pub mod records;
pub mod render;
pub mod severity;
pub mod utils;

pub use aliases::{init_default_aliases, reconcile, AliasTable};
pub use args::Args;
pub use fetch::{HttpFetcher, JsonSource};
pub use pipeline::{generate_map, generate_map_with, print_run_summary};
pub use records::{CaseRecord, GeoRecord, JoinedRecord, RunSummary, SeverityTier};
pub use severity::classify;
