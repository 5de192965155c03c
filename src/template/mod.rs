//! Template planning for sliding-window scans.

mod plan;

pub use plan::TemplatePlan;
