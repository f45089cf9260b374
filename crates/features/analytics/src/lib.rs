//! # Analytics
//!
//! GA4-compatible product analytics for the marketplace client.
//!
//! [`Analytics`] turns domain actions (a purchase, a listing, a search) into
//! [`AnalyticsEvent`]s and hands them to an [`AnalyticsSink`]. Two sinks ship
//! with the crate:
//!
//! * [`TracingSink`] logs every event under the `analytics` target.
//! * [`BusSink`] publishes [`AnalyticsTracked`] on a shared event bus.
//!
//! A tracker built with an empty measurement id is disabled and only logs
//! what it would have sent.

mod error;
mod event;
mod sink;
mod tracker;

pub use error::{AnalyticsError, AnalyticsErrorExt};
pub use event::AnalyticsEvent;
pub use sink::{AnalyticsSink, AnalyticsTracked, BusSink, TracingSink};
pub use tracker::{Analytics, CURRENCY};
