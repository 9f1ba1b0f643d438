use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, error, info, LevelFilter};
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::Config;
use crate::jenkins::JenkinsClient;
use crate::metrics::ExporterMetrics;
use crate::poller::Poller;
use crate::server;

#[derive(Parser)]
#[command(name = "jenkins-exporter")]
#[command(author, version, about = "Prometheus exporter for Jenkins jobs", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, env = "JENKINS_EXPORTER_CONFIG", default_value = "./config.toml")]
    config: PathBuf,

    /// Sets log level to debug
    #[arg(short, long, default_value_t = false)]
    debug: bool,

    /// Address to serve /metrics on
    #[arg(short, long, default_value = "0.0.0.0:9118")]
    listen_address: SocketAddr,
}

impl Cli {
    pub fn log_level(&self) -> LevelFilter {
        if self.debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        }
    }

    pub async fn execute(&self) -> Result<()> {
        let config = Config::load(&self.config).context("Unable to load configuration")?;
        debug!("Configuration: {config:?}");

        let jenkins = config.jenkins;
        let client = JenkinsClient::new(jenkins.base_url()?, jenkins.credentials(), jenkins.tls_insecure)?;
        let metrics = ExporterMetrics::new()?;
        let poller = Poller::new(client, jenkins.jobs.clone(), jenkins.poll_interval(), metrics.clone());

        let listener = TcpListener::bind(self.listen_address)
            .await
            .with_context(|| format!("Unable to listen on {}", self.listen_address))?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let poller_task = tokio::spawn(poller.run(shutdown_rx));

        info!("Serving metrics on {}/metrics", self.listen_address);
        axum::serve(listener, server::router(metrics))
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Unable to listen for shutdown signal: {e}");
                }
                info!("Shutting down");
                let _ = shutdown_tx.send(true);
            })
            .await
            .context("HTTP server failed")?;

        poller_task.await.context("Jenkins poller panicked")?;

        Ok(())
    }
}
