use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::sync::watch;

use crate::error::Result;
use crate::jenkins::{JenkinsClient, JobSnapshot};
use crate::metrics::ExporterMetrics;

/// Periodically collects the configured jobs and publishes them as metrics.
pub struct Poller {
    client: JenkinsClient,
    jobs: Vec<String>,
    interval: Duration,
    metrics: ExporterMetrics,
}

impl Poller {
    pub fn new(
        client: JenkinsClient,
        jobs: Vec<String>,
        interval: Duration,
        metrics: ExporterMetrics,
    ) -> Self {
        Self {
            client,
            jobs,
            interval,
            metrics,
        }
    }

    /// Run one polling cycle.
    ///
    /// Fails without touching the published series when Jenkins is unreachable.
    /// Jobs that cannot be collected are logged and left out of the cycle.
    /// Returns the number of jobs published.
    pub async fn poll_once(&self) -> Result<usize> {
        debug!("Connecting to Jenkins API and collecting metrics...");

        self.client.init().await?;

        let mut snapshots = Vec::with_capacity(self.jobs.len());
        for name in &self.jobs {
            match self.collect_job(name).await {
                Ok(snapshot) => {
                    debug!("Finished collecting metrics for job: {name}");
                    snapshots.push(snapshot);
                }
                Err(e) => error!("Unable to collect metrics for job {name}: {e}"),
            }
        }

        self.metrics.publish(&snapshots);

        Ok(snapshots.len())
    }

    async fn collect_job(&self, name: &str) -> Result<JobSnapshot> {
        let job = self.client.job(name).await?;
        if !job.buildable {
            debug!("Job {} is disabled", job.display_name());
        }

        let last_completed_build = self.client.last_completed_build(name).await?;
        let last_build = self.client.last_build(name).await?;

        let test_report = self
            .client
            .test_report(name, last_completed_build.number)
            .await
            .unwrap_or_else(|e| {
                warn!("Unable to get test report for {name} #{}: {e}", last_completed_build.number);
                None
            });

        let completed_pipeline = self
            .client
            .pipeline_run(name, last_completed_build.number)
            .await
            .unwrap_or_else(|e| {
                warn!("Unable to get pipeline run for {name} #{}: {e}", last_completed_build.number);
                None
            });

        let running_pipeline = if last_build.building {
            let run = self
                .client
                .pipeline_run(name, last_build.number)
                .await
                .unwrap_or_else(|e| {
                    warn!("Unable to get running pipeline for {name} #{}: {e}", last_build.number);
                    None
                });
            if let Some(run) = &run {
                debug!(
                    "Pipeline run {} of {name} is {} with {} stages",
                    run.id,
                    run.status,
                    run.stages.len()
                );
            }
            run
        } else {
            None
        };

        Ok(JobSnapshot {
            name: name.to_owned(),
            last_completed_build,
            last_build,
            test_report,
            completed_pipeline,
            running_pipeline,
        })
    }

    /// Poll until `shutdown` changes, sleeping the configured interval between cycles.
    ///
    /// A cycle still in flight is abandoned on shutdown; nothing is published for it.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(
            "Polling {} jobs every {}s",
            self.jobs.len(),
            self.interval.as_secs()
        );

        loop {
            tokio::select! {
                result = self.poll_once() => match result {
                    Ok(published) => info!("Published metrics for {published}/{} jobs", self.jobs.len()),
                    Err(e) => error!("Unable to connect to Jenkins: {e}"),
                },
                _ = shutdown.changed() => {
                    info!("Stopping Jenkins poller during a polling cycle");
                    break;
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                _ = shutdown.changed() => {
                    info!("Stopping Jenkins poller");
                    break;
                }
            }
        }
    }
}
