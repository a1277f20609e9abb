//! File formats, reports and command-line plumbing for the build-order
//! simulator.
//!
//! The `bar_sim` binary is a thin layer over this crate:
//!
//! - [`io`]: build-order RON files and JSON export
//! - [`maps`]: map presets and their reduction to one player's economy
//! - [`catalog_loader`]: per-faction unit catalogs with a cache
//! - [`parse`]: goal and strategy strings from the command line
//! - [`report`] / [`compare`]: text reports written to stdout
//!
//! # Example
//!
//! ```bash
//! # Simulate one build order
//! cargo run -p bar_headless -- simulate data/build_orders/standard_opening.ron
//!
//! # Compare several
//! cargo run -p bar_headless -- compare a.ron b.ron
//!
//! # Search for the fastest factory on a preset map
//! cargo run -p bar_headless -- optimize --objective fastest_factory --map comet_catcher
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod catalog_loader;
pub mod compare;
pub mod io;
pub mod maps;
pub mod parse;
pub mod report;

pub use catalog_loader::{load_catalog, CatalogCache, CatalogLoadError};
pub use compare::{compare_report, winners, Winner};
pub use io::{
    build_order_from_ron_str, export_build_order_json, export_result_json, load_build_order,
    save_build_order, BuildOrderDocument, BuildOrderIoError,
};
pub use maps::{default_maps_dir, map_data_to_map_config, MapData, MapDataError, MapRegistry};
pub use parse::{parse_goal_spec, parse_strategy, ParseError};
pub use report::{fmt_rate, fmt_time, full_report};
