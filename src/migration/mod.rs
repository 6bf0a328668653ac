//! Tooling for rolling the notification workflow out across an organization.
//!
//! - `report`: CSV files passed between the tools.
//! - `workflow`: the workflow file template and parsing helpers.
//! - `rollout`: scan, pull-request and ready-for-review operations over a [`RepoHost`].
//!
//! [`RepoHost`]: crate::github::RepoHost

pub mod report;
pub mod rollout;
pub mod workflow;

pub use rollout::{mark_ready, roll_out, scan_org, FileChange, RolloutResult, WorkflowUsage};
