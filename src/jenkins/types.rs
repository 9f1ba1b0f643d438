use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A Jenkins job (`/job/<name>/api/json`).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// Short job name (last path segment for folder jobs)
    pub name: String,
    /// Folder-qualified name, e.g. `folder/service`
    #[serde(default)]
    pub full_name: Option<String>,
    /// Whether new builds can be started
    #[serde(default = "default_buildable")]
    pub buildable: bool,
}

fn default_buildable() -> bool {
    true
}

impl Job {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.name)
    }
}

/// One execution of a job.
#[derive(Debug, Clone, Deserialize)]
pub struct Build {
    /// Build number
    pub number: u64,
    /// Duration in milliseconds; 0 while running
    #[serde(default)]
    pub duration: i64,
    /// Start time in milliseconds since the epoch
    #[serde(default)]
    pub timestamp: i64,
    /// `SUCCESS`, `FAILURE`, `UNSTABLE`, `ABORTED`, ...; absent while running
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub building: bool,
}

impl Build {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }

    pub fn result(&self) -> &str {
        self.result.as_deref().unwrap_or_default()
    }

    /// A build is good once it has finished successfully.
    pub fn is_good(&self) -> bool {
        !self.building && self.result() == "SUCCESS"
    }
}

/// Aggregated test results of a build (`/<number>/testReport/api/json`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    #[serde(default)]
    pub fail_count: u64,
    #[serde(default)]
    pub skip_count: u64,
    #[serde(default)]
    pub pass_count: u64,
    #[serde(default)]
    pub suites: Vec<TestSuite>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestSuite {
    pub name: String,
    #[serde(default)]
    pub cases: Vec<TestCase>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub name: String,
    /// `PASSED`, `FIXED`, `FAILED`, `REGRESSION` or `SKIPPED`
    pub status: String,
    #[serde(default)]
    pub skipped: bool,
    /// Build number where the case started failing, 0 if passing
    #[serde(default)]
    pub failed_since: u64,
    /// Number of builds the case has been failing for
    #[serde(default)]
    pub age: u64,
}

impl TestCase {
    pub fn is_failing(&self) -> bool {
        !self.skipped && self.status != "PASSED"
    }
}

/// Pipeline execution graph (`/<number>/wfapi/describe`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PipelineRun {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStage {
    pub id: String,
    pub name: String,
    /// `SUCCESS`, `IN_PROGRESS`, `UNSTABLE`, `FAILED`, ...
    pub status: String,
    #[serde(default)]
    pub duration_millis: i64,
}

impl PipelineStage {
    pub fn duration_secs(&self) -> i64 {
        self.duration_millis / 1000
    }
}

/// Everything fetched for one job during a polling cycle.
#[derive(Debug, Clone)]
pub struct JobSnapshot {
    pub name: String,
    pub last_completed_build: Build,
    pub last_build: Build,
    pub test_report: Option<TestReport>,
    pub completed_pipeline: Option<PipelineRun>,
    /// Only fetched while the last build is running
    pub running_pipeline: Option<PipelineRun>,
}
