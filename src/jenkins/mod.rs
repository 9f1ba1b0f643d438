mod client;
pub(crate) mod types;

pub use client::JenkinsClient;
pub use types::JobSnapshot;
