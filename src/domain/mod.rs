//! Domain logic - pure business rules independent of git operations

pub mod branch;
pub mod commit;
pub mod tag;
pub mod version;

pub use branch::{Branch, BranchKind};
pub use commit::{Category, CommitRecord, CommitType};
pub use tag::TagPattern;
pub use version::{Version, VersionBump};
