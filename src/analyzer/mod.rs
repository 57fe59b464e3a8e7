//! Version analysis - commit classification, baseline tags and bump advice

pub mod tags;
pub mod version_advisor;

pub use tags::TaggedVersion;
pub use version_advisor::{History, VersionAdvice, VersionAdvisor};
