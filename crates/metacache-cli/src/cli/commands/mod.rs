//! CLI command handlers, one per file.

mod collect;
mod lookup;
mod serve;

pub use collect::run_collect;
pub use lookup::run_lookup;
pub use serve::run_serve;
