//! Kernel utilities shared across slices.
//! Keep this crate lightweight; it hosts config loading and date formatting.
//!
//! ## Config loading
//! ```rust,ignore
//! use bazaar_kernel::config::{load_config, validate_required};
//! use bazaar_kernel::domain::config::ClientConfig;
//!
//! let cfg: ClientConfig = load_config(Some("client"))?;
//! validate_required(&cfg)?;
//! ```
//!
//! ## Dates
//! ```rust
//! use bazaar_kernel::datetime::{format_relative, parse_timestamp};
//!
//! let now = parse_timestamp("2024-01-15T15:30:00Z").unwrap();
//! let sent = parse_timestamp("2024-01-15T13:00:00Z").unwrap();
//! assert_eq!(format_relative(sent, now), "2 hours ago");
//! ```
pub mod config;
pub mod datetime;

pub use bazaar_domain as domain;
