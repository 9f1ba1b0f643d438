use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use url::Url;

use crate::auth::Credentials;
use crate::error::{ExporterError, Result};

use super::types::{Build, Job, PipelineRun, TestReport};

/// Client for the Jenkins JSON REST API.
pub struct JenkinsClient {
    client: Client,
    base_url: Url,
    credentials: Option<Credentials>,
}

impl JenkinsClient {
    pub fn new(base_url: Url, credentials: Option<Credentials>, tls_insecure: bool) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("jenkins-exporter/", env!("CARGO_PKG_VERSION")))
            .danger_accept_invalid_certs(tls_insecure)
            .build()
            .map_err(|e| ExporterError::Config(format!("Failed to create HTTP client: {e}")))?;

        if base_url.cannot_be_a_base() {
            return Err(ExporterError::Config(format!(
                "Invalid Jenkins URL: {base_url}"
            )));
        }

        Ok(Self {
            client,
            base_url,
            credentials,
        })
    }

    /// Helper to build authenticated requests
    fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(creds) = &self.credentials {
            request.basic_auth(&creds.user, Some(creds.password.as_str()))
        } else {
            request
        }
    }

    /// Construct an API URL from path segments below the base URL.
    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    /// Path segments of a job; `folder/service` becomes `job/folder/job/service`.
    fn job_segments(job: &str) -> Vec<&str> {
        job.split('/')
            .filter(|part| !part.is_empty())
            .flat_map(|part| ["job", part])
            .collect()
    }

    fn job_endpoint<'a>(&self, job: &'a str, rest: &[&'a str]) -> Url {
        let mut segments = Self::job_segments(job);
        segments.extend_from_slice(rest);
        self.endpoint(segments)
    }

    /// GET a JSON document. `Ok(None)` means the resource does not exist.
    async fn get_json<T>(&self, url: Url) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        debug!("GET {url}");

        let response = self.auth_request(self.client.get(url)).send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(ExporterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        Ok(Some(serde_json::from_str(&body)?))
    }

    /// Check that the server is reachable and the credentials are accepted.
    pub async fn init(&self) -> Result<()> {
        self.get_json::<serde_json::Value>(self.endpoint(["api", "json"]))
            .await?
            .ok_or_else(|| ExporterError::Api {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: format!("No Jenkins API found at {}", self.base_url),
            })?;
        Ok(())
    }

    pub async fn job(&self, name: &str) -> Result<Job> {
        self.get_json(self.job_endpoint(name, &["api", "json"]))
            .await?
            .ok_or_else(|| ExporterError::JobNotFound(name.to_owned()))
    }

    pub async fn last_completed_build(&self, name: &str) -> Result<Build> {
        self.permalink_build(name, "lastCompletedBuild").await
    }

    /// The most recent build, which may still be running.
    pub async fn last_build(&self, name: &str) -> Result<Build> {
        self.permalink_build(name, "lastBuild").await
    }

    async fn permalink_build(&self, name: &str, permalink: &str) -> Result<Build> {
        self.get_json(self.job_endpoint(name, &[permalink, "api", "json"]))
            .await?
            .ok_or_else(|| ExporterError::NoBuild {
                job: name.to_owned(),
                permalink: permalink.to_owned(),
            })
    }

    /// Test results of a build; `None` when the build published none.
    pub async fn test_report(&self, name: &str, number: u64) -> Result<Option<TestReport>> {
        let number = number.to_string();
        self.get_json(self.job_endpoint(name, &[number.as_str(), "testReport", "api", "json"]))
            .await
    }

    /// Stage view of a pipeline build; `None` for non-pipeline jobs.
    pub async fn pipeline_run(&self, name: &str, number: u64) -> Result<Option<PipelineRun>> {
        let number = number.to_string();
        self.get_json(self.job_endpoint(name, &[number.as_str(), "wfapi", "describe"]))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Password;

    fn client_for(url: &str, credentials: Option<Credentials>) -> JenkinsClient {
        JenkinsClient::new(Url::parse(url).unwrap(), credentials, false).unwrap()
    }

    #[test]
    fn test_job_endpoint_for_folder_jobs() {
        let client = client_for("https://jenkins.example.com/ci/", None);

        let url = client.job_endpoint("folder/service", &["lastBuild", "api", "json"]);
        assert_eq!(
            url.as_str(),
            "https://jenkins.example.com/ci/job/folder/job/service/lastBuild/api/json"
        );
    }

    #[test]
    fn test_job_endpoint_encodes_names() {
        let client = client_for("http://localhost:8080", None);

        let url = client.job_endpoint("my job", &["api", "json"]);
        assert_eq!(url.as_str(), "http://localhost:8080/job/my%20job/api/json");
    }

    #[test]
    fn test_rejects_non_base_url() {
        let result = JenkinsClient::new(Url::parse("mailto:ci@example.com").unwrap(), None, false);
        assert!(matches!(result, Err(ExporterError::Config(_))));
    }

    #[tokio::test]
    async fn test_init_sends_basic_auth() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/json")
            .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"mode": "NORMAL", "jobs": []}"#)
            .create_async()
            .await;

        let creds = Credentials::from_parts("admin", &Password::from("secret"));
        let client = client_for(&server.url(), creds);

        client.init().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_init_reports_auth_failure() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/json")
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let client = client_for(&server.url(), None);

        match client.init().await {
            Err(ExporterError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert_eq!(message, "Unauthorized");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_job_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/ghost/api/json")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);

        let err = client.job("ghost").await.unwrap_err();
        assert!(matches!(err, ExporterError::JobNotFound(ref name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_last_completed_build() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/app/lastCompletedBuild/api/json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"number": 41, "duration": 93000, "timestamp": 1700000000000, "result": "FAILURE", "building": false}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server.url(), None);

        let build = client.last_completed_build("app").await.unwrap();
        assert_eq!(build.number, 41);
        assert_eq!(build.duration, 93000);
        assert_eq!(build.result(), "FAILURE");
    }

    #[tokio::test]
    async fn test_job_without_builds() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/fresh/lastBuild/api/json")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);

        let err = client.last_build("fresh").await.unwrap_err();
        assert!(matches!(err, ExporterError::NoBuild { .. }));
    }

    #[tokio::test]
    async fn test_missing_test_report_and_pipeline_are_none() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/freestyle/3/testReport/api/json")
            .with_status(404)
            .create_async()
            .await;
        server
            .mock("GET", "/job/freestyle/3/wfapi/describe")
            .with_status(404)
            .create_async()
            .await;

        let client = client_for(&server.url(), None);

        assert!(client.test_report("freestyle", 3).await.unwrap().is_none());
        assert!(client.pipeline_run("freestyle", 3).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_body_is_a_json_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/job/app/api/json")
            .with_status(200)
            .with_body("<html>login</html>")
            .create_async()
            .await;

        let client = client_for(&server.url(), None);

        let err = client.job("app").await.unwrap_err();
        assert!(matches!(err, ExporterError::Json(_)));
    }
}
