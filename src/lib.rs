//! wbi-map
//!
//! Classification and tooltip engine for a choropleth map of World Bank style
//! indicators. Pairs with the `wbi-map` CLI.
//!
//! ### Features
//! - Color a region by explicit breaks or by uniform bins over the indicator's range
//! - Legends that always agree with the map colors
//! - A small `{{ ... }}` template language for tooltip text
//! - Tooltip resolution with year-aware lookup, precision formatting and data-gap fallbacks
//!
//! ### Example
//! ```no_run
//! use wbi_map::{TooltipResolver, load};
//!
//! let configs = load::read_configs("configs.json")?;
//! let global = load::read_global("global.json")?;
//! let resolver = TooltipResolver::new(&configs, &global);
//! println!("{}", resolver.resolve_value("KEN", "literacy_rate", Some("2015")));
//! println!("{}", resolver.fill_color("KEN", "literacy_rate", Some("2015")));
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod classify;
pub mod format;
pub mod load;
pub mod models;
pub mod normalize;
pub mod store;
pub mod template;
pub mod tooltip;

pub use classify::{ColorScheme, LegendEntry, legend_entries, number_color};
pub use format::{NumberFormatter, NumeralFormatter, format_from_precision};
pub use models::{Configs, Global};
pub use normalize::normalize;
pub use store::Store;
pub use template::compile_template;
pub use tooltip::TooltipResolver;
