use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use log::error;
use prometheus::{Encoder, TextEncoder};

use crate::metrics::ExporterMetrics;

const LANDING_PAGE: &str = r#"<html>
<head><title>Jenkins Exporter</title></head>
<body>
<h1>Jenkins Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>"#;

/// Build the scrape router.
///
/// Routes:
/// - GET / - Landing page
/// - GET /metrics - Prometheus text exposition
pub fn router(metrics: ExporterMetrics) -> Router {
    Router::new()
        .route("/", get(landing_page))
        .route("/metrics", get(metrics_handler))
        .with_state(metrics)
}

async fn landing_page() -> Html<&'static str> {
    Html(LANDING_PAGE)
}

async fn metrics_handler(State(metrics): State<ExporterMetrics>) -> Response {
    match metrics.render() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TextEncoder::new().format_type().to_owned())],
            body,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to encode metrics: {e}"),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::tests::{completed_snapshot, sample};
    use tokio::net::TcpListener;

    async fn serve(metrics: ExporterMetrics) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(metrics)).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn test_metrics_endpoint_serves_published_cycle() {
        let metrics = ExporterMetrics::new().unwrap();
        metrics.publish(&[completed_snapshot("app")]);
        let base = serve(metrics).await;

        let response = reqwest::get(format!("{base}/metrics")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        assert!(response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("text/plain")));

        let body = response.text().await.unwrap();
        assert!(body.contains("# HELP jenkins_build_success"));
        assert_eq!(
            sample(&body, "jenkins_build_success", &[("jobname", "app"), ("buildid", "42")]),
            Some(0.0)
        );
    }

    #[tokio::test]
    async fn test_landing_page_links_metrics() {
        let base = serve(ExporterMetrics::new().unwrap()).await;

        let body = reqwest::get(&base).await.unwrap().text().await.unwrap();
        assert!(body.contains("href=\"/metrics\""));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let base = serve(ExporterMetrics::new().unwrap()).await;

        let response = reqwest::get(format!("{base}/healthz")).await.unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    }
}
