//! Jenkins collector.
//!
//! - [`JenkinsCollector`]: polls configured jobs directly and walks
//!   configured views, including nested views
//! - [`CiClient`]: the fetch seam, with [`JenkinsHttpClient`] as the
//!   production implementation

mod client;
mod collector;
mod health;
#[cfg(test)]
mod mock;
mod view;

pub use client::{
    BuildDocument, CiClient, Culprit, DEFAULT_VIEW_DEPTH, FetchError, JenkinsHttpClient,
    ViewDocument, ViewJob, ViewRef,
};
pub use collector::{JenkinsCollector, JenkinsConfig};
pub use health::HealthCache;
pub use view::{classify_color, latest_build, nested_view_name};
