use std::sync::{Arc, Mutex, PoisonError};

use log::debug;
use prometheus::{Encoder, GaugeVec, Opts, Registry, TextEncoder};

use crate::error::Result;
use crate::jenkins::JobSnapshot;

/// Prometheus gauges describing the configured Jenkins jobs.
///
/// ## Metrics
/// - `jenkins_running_build{jobname, buildid, isgood}`
/// - `jenkins_running_build_pipeline_status{jobname, buildid, id, stage}`
/// - `jenkins_running_build_elapsed_time{jobname, buildid, isgood}`
/// - `jenkins_build_success{jobname, buildid}`
/// - `jenkins_build_duration_seconds{jobname, buildid}`
/// - `jenkins_build_timestamp{jobname, buildid}`
/// - `jenkins_build_test_count{jobname, buildid, result}`
/// - `jenkins_build_test_case_failure_age{jobname, buildid, suite, case, status, failedsince}`
/// - `jenkins_build_pipeline_duration_seconds{jobname, buildid, id, stage}`
///
/// Every series is rebuilt from scratch on each polling cycle, see [`ExporterMetrics::publish`].
#[derive(Clone)]
pub struct ExporterMetrics {
    running_build: GaugeVec,
    running_build_pipeline_status: GaugeVec,
    running_build_elapsed_time: GaugeVec,
    build_success: GaugeVec,
    build_duration_seconds: GaugeVec,
    build_timestamp: GaugeVec,
    build_test_count: GaugeVec,
    build_test_case_failure_age: GaugeVec,
    build_pipeline_duration_seconds: GaugeVec,
    registry: Arc<Registry>,
    /// Held while a cycle is applied and while a scrape is encoded.
    cycle: Arc<Mutex<()>>,
}

fn gauge_vec(registry: &Registry, name: &str, help: &str, labels: &[&str]) -> Result<GaugeVec> {
    let gauge = GaugeVec::new(Opts::new(name, help), labels)?;
    registry.register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

impl ExporterMetrics {
    pub fn new_with_registry(registry: Arc<Registry>) -> Result<Self> {
        Ok(Self {
            running_build: gauge_vec(
                &registry,
                "jenkins_running_build",
                "1 if there is a build running, 0 otherwise",
                &["jobname", "buildid", "isgood"],
            )?,
            running_build_pipeline_status: gauge_vec(
                &registry,
                "jenkins_running_build_pipeline_status",
                "Status of each stage of the running build: 0 success, 1 in progress, 2 unstable, 3 failed, -1 unknown",
                &["jobname", "buildid", "id", "stage"],
            )?,
            running_build_elapsed_time: gauge_vec(
                &registry,
                "jenkins_running_build_elapsed_time",
                "Elapsed time of the current (running) build",
                &["jobname", "buildid", "isgood"],
            )?,
            build_success: gauge_vec(
                &registry,
                "jenkins_build_success",
                "0 if build has failed, 1 if succeeded",
                &["jobname", "buildid"],
            )?,
            build_duration_seconds: gauge_vec(
                &registry,
                "jenkins_build_duration_seconds",
                "Duration of the build in seconds",
                &["jobname", "buildid"],
            )?,
            build_timestamp: gauge_vec(
                &registry,
                "jenkins_build_timestamp",
                "Timestamp of the build",
                &["jobname", "buildid"],
            )?,
            build_test_count: gauge_vec(
                &registry,
                "jenkins_build_test_count",
                "Number of tests in the build by result",
                &["jobname", "buildid", "result"],
            )?,
            build_test_case_failure_age: gauge_vec(
                &registry,
                "jenkins_build_test_case_failure_age",
                "Age of the failed tests in this build",
                &["jobname", "buildid", "suite", "case", "status", "failedsince"],
            )?,
            build_pipeline_duration_seconds: gauge_vec(
                &registry,
                "jenkins_build_pipeline_duration_seconds",
                "Duration of each pipeline stage in seconds",
                &["jobname", "buildid", "id", "stage"],
            )?,
            registry,
            cycle: Arc::new(Mutex::new(())),
        })
    }

    pub fn new() -> Result<Self> {
        Self::new_with_registry(Arc::new(Registry::new()))
    }

    /// Drop every series.
    pub fn reset(&self) {
        self.running_build.reset();
        self.running_build_pipeline_status.reset();
        self.running_build_elapsed_time.reset();
        self.build_success.reset();
        self.build_duration_seconds.reset();
        self.build_timestamp.reset();
        self.build_test_count.reset();
        self.build_test_case_failure_age.reset();
        self.build_pipeline_duration_seconds.reset();
    }

    /// Replace all series with the given cycle's snapshots.
    ///
    /// Scrapes running concurrently see either the previous cycle or this one.
    pub fn publish(&self, snapshots: &[JobSnapshot]) {
        let _cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);

        self.reset();
        for snapshot in snapshots {
            self.record_job(snapshot);
        }
    }

    /// Set the series of one job without resetting anything.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_job(&self, job: &JobSnapshot) {
        let jobname = job.name.as_str();
        let completed = &job.last_completed_build;
        let completed_id = completed.number.to_string();
        let common = [jobname, completed_id.as_str()];

        self.build_duration_seconds
            .with_label_values(&common)
            .set((completed.duration / 1000) as f64);
        self.build_timestamp
            .with_label_values(&common)
            .set(completed.started_at().map_or(0, |ts| ts.timestamp()) as f64);
        self.build_success
            .with_label_values(&common)
            .set(build_success_value(completed.result()));

        if let Some(report) = &job.test_report {
            for (result, count) in [
                ("fail", report.fail_count),
                ("skip", report.skip_count),
                ("pass", report.pass_count),
            ] {
                self.build_test_count
                    .with_label_values(&[jobname, completed_id.as_str(), result])
                    .set(count as f64);
            }

            for suite in &report.suites {
                for case in suite.cases.iter().filter(|case| case.is_failing()) {
                    let failed_since = case.failed_since.to_string();
                    self.build_test_case_failure_age
                        .with_label_values(&[
                            jobname,
                            completed_id.as_str(),
                            suite.name.as_str(),
                            case.name.as_str(),
                            case.status.as_str(),
                            failed_since.as_str(),
                        ])
                        .set(case.age as f64);
                }
            }
        }

        if let Some(pipeline) = &job.completed_pipeline {
            for stage in &pipeline.stages {
                let id = format_stage_id(&stage.id);
                self.build_pipeline_duration_seconds
                    .with_label_values(&[jobname, completed_id.as_str(), id.as_str(), stage.name.as_str()])
                    .set(stage.duration_secs() as f64);
            }
        }

        let last = &job.last_build;
        let last_id = last.number.to_string();
        let is_good = if last.is_good() { "1" } else { "0" };
        let running = [jobname, last_id.as_str(), is_good];

        self.running_build
            .with_label_values(&running)
            .set(if last.building { 1.0 } else { 0.0 });

        if last.building {
            let mut elapsed_secs: i64 = 0;
            for stage in job.running_pipeline.iter().flat_map(|run| &run.stages) {
                elapsed_secs += stage.duration_secs();
                let id = format_stage_id(&stage.id);
                self.running_build_pipeline_status
                    .with_label_values(&[jobname, last_id.as_str(), id.as_str(), stage.name.as_str()])
                    .set(stage_status_value(&stage.status));
            }

            self.running_build_elapsed_time
                .with_label_values(&running)
                .set(elapsed_secs as f64);
        }

        debug!("Recorded metrics for job: {jobname}");
    }

    /// Encode all series in the Prometheus text exposition format.
    pub fn render(&self) -> Result<String> {
        let _cycle = self.cycle.lock().unwrap_or_else(PoisonError::into_inner);

        let encoder = TextEncoder::new();
        let families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&families, &mut buffer)?;

        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}

/// 0 if the build failed, 1 for any other result.
pub fn build_success_value(result: &str) -> f64 {
    if result == "FAILURE" {
        0.0
    } else {
        1.0
    }
}

pub fn stage_status_value(status: &str) -> f64 {
    match status {
        "SUCCESS" => 0.0,
        "IN_PROGRESS" => 1.0,
        "UNSTABLE" => 2.0,
        "FAILED" => 3.0,
        _ => -1.0,
    }
}

/// Stage ids are zero-padded to three characters so they sort as strings.
pub fn format_stage_id(id: &str) -> String {
    format!("{id:0>3}")
}
