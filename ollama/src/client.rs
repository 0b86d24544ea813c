use futures::StreamExt;
use futures::future::BoxFuture;
use futures::stream::BoxStream;
use serde::Deserialize;
use tracing::debug;
use tracing::info;

use modeldock_core::DockErr;
use modeldock_core::ModelEntry;
use modeldock_core::ModelSource;
use modeldock_core::ProviderKind;
use modeldock_core::Result;
use modeldock_core::UnifiedModel;
use modeldock_core::sort_most_recent_first;

use crate::fetch::send_resilient;
use crate::ndjson::pull_event_stream;
use crate::pull::PullEvent;
use crate::pull::PullProgressReporter;
use crate::url::host_root;

#[derive(Deserialize)]
struct TagsResponse {
    models: Option<Vec<ModelEntry>>,
}

/// Client for the management API of a local Ollama-compatible daemon.
///
/// The daemon owns every model; this client only mirrors its state. All
/// operations are safe to run concurrently for different model names; nothing
/// here serializes or queues them.
pub struct OllamaClient {
    client: reqwest::Client,
    host_root: String,
}

impl OllamaClient {
    /// Build a client from a configured base URL. A `/v1` inference suffix is
    /// tolerated and stripped; the management API lives at the host root.
    pub fn from_base_url(base_url: &str) -> Self {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self::with_client(client, base_url)
    }

    /// Build from a caller-supplied reqwest client (custom timeouts, DNS
    /// overrides in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            host_root: host_root(base_url),
        }
    }

    pub fn host_root(&self) -> &str {
        &self.host_root
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.host_root)
    }

    /// Probe whether the daemon is reachable at all. Never errors; callers
    /// that need the unreachable/blocked distinction use [`Self::list_models`].
    pub async fn probe(&self) -> bool {
        let request = match self.client.get(self.endpoint("/api/tags")).build() {
            Ok(request) => request,
            Err(_) => return false,
        };
        match send_resilient(&self.client, request).await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("daemon probe failed: {e}");
                false
            }
        }
    }

    /// List the models installed on the daemon, most recently modified first.
    pub async fn list_models(&self) -> Result<Vec<ModelEntry>> {
        let request = self.client.get(self.endpoint("/api/tags")).build()?;
        let response = send_resilient(&self.client, request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DockErr::RegistryUnavailable(status, body));
        }

        let tags = response.json::<TagsResponse>().await?;
        let mut models = tags.models.unwrap_or_default();
        sort_most_recent_first(&mut models);
        debug!("daemon reports {} installed models", models.len());
        Ok(models)
    }

    /// Start a pull and return its event stream. An untagged name pulls
    /// `:latest`, matching what the daemon itself would default to.
    pub async fn pull_model_stream(&self, name: &str) -> Result<BoxStream<'static, PullEvent>> {
        let target = with_default_tag(name);
        debug!("pulling model {target}");
        let request = self
            .client
            .post(self.endpoint("/api/pull"))
            .json(&serde_json::json!({"name": target, "stream": true}))
            .build()?;
        let response = send_resilient(&self.client, request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DockErr::PullFailed(format!(
                "failed to start pull: HTTP {status}"
            )));
        }
        Ok(pull_event_stream(response.bytes_stream()))
    }

    /// Pull a model, forwarding every record to `reporter`. Resolves when the
    /// daemon reports success or the stream ends; rejects with the daemon's
    /// own message when an error record appears.
    pub async fn pull_with_reporter(
        &self,
        name: &str,
        reporter: &mut dyn PullProgressReporter,
    ) -> Result<()> {
        let stream = self.pull_model_stream(name).await?;
        drive(stream, reporter, DockErr::PullFailed).await?;
        info!("pulled model {}", with_default_tag(name));
        Ok(())
    }

    /// Create a model on the daemon from a local weights file. The streamed
    /// records carry only a status string, never byte counters.
    pub async fn create_model(
        &self,
        name: &str,
        source_path: &str,
        reporter: &mut dyn PullProgressReporter,
    ) -> Result<()> {
        let modelfile = format!("FROM \"{source_path}\"");
        debug!("creating model {name} from {source_path}");
        let request = self
            .client
            .post(self.endpoint("/api/create"))
            .json(&serde_json::json!({
                "name": name,
                "modelfile": modelfile,
                "stream": true,
            }))
            .build()?;
        let response = send_resilient(&self.client, request).await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DockErr::CreateFailed(format!(
                "failed to start create: HTTP {status}"
            )));
        }
        drive(pull_event_stream(response.bytes_stream()), reporter, DockErr::CreateFailed).await?;
        info!("created model {name}");
        Ok(())
    }

    /// Remove a model from the daemon.
    pub async fn delete_model(&self, name: &str) -> Result<()> {
        debug!("deleting model {name}");
        let request = self
            .client
            .delete(self.endpoint("/api/delete"))
            .json(&serde_json::json!({"name": name}))
            .build()?;
        let response = send_resilient(&self.client, request).await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DockErr::DeleteFailed(format!("HTTP {status}: {body}")));
        }
        info!("deleted model {name}");
        Ok(())
    }

    /// Make sure `name` is installed, pulling it when missing. The workflow
    /// the app runs when a local model is selected for the first time.
    pub async fn ensure_model_ready(
        &self,
        name: &str,
        reporter: &mut dyn PullProgressReporter,
    ) -> Result<()> {
        let target = with_default_tag(name);
        let installed = self.list_models().await?;
        if installed.iter().any(|m| m.name == target) {
            debug!("model {target} already installed");
            return Ok(());
        }
        self.pull_with_reporter(&target, reporter).await
    }
}

impl ModelSource for OllamaClient {
    fn provider(&self) -> ProviderKind {
        ProviderKind::Ollama
    }

    fn list_models(&self) -> BoxFuture<'_, Result<Vec<UnifiedModel>>> {
        Box::pin(async move {
            let api_url = format!("{}/v1", self.host_root);
            let entries = OllamaClient::list_models(self).await?;
            Ok(entries
                .iter()
                .map(|entry| UnifiedModel::new(ProviderKind::Ollama, &entry.name, &api_url))
                .collect())
        })
    }
}

/// Append `:latest` to an untagged model name; tagged names pass unchanged.
fn with_default_tag(name: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{name}:latest")
    }
}

/// Drive an event stream into a reporter. A daemon-reported error record
/// rejects with `fail`; end of stream resolves.
async fn drive(
    mut stream: BoxStream<'static, PullEvent>,
    reporter: &mut dyn PullProgressReporter,
    fail: impl Fn(String) -> DockErr,
) -> Result<()> {
    while let Some(event) = stream.next().await {
        reporter.on_event(&event)?;
        match event {
            PullEvent::Success => return Ok(()),
            PullEvent::Error(message) => return Err(fail(message)),
            PullEvent::Progress(_) => continue,
        }
    }
    debug!("progress stream ended without an explicit success record");
    Ok(())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use pretty_assertions::assert_eq;
    use wiremock::Mock;
    use wiremock::MockServer;
    use wiremock::ResponseTemplate;
    use wiremock::matchers::body_json;
    use wiremock::matchers::method;
    use wiremock::matchers::path;

    #[derive(Default)]
    struct Recorder {
        events: Vec<PullEvent>,
    }

    impl PullProgressReporter for Recorder {
        fn on_event(&mut self, event: &PullEvent) -> std::io::Result<()> {
            self.events.push(event.clone());
            Ok(())
        }
    }

    fn tags_body() -> serde_json::Value {
        serde_json::json!({
            "models": [
                {
                    "name": "mistral:latest",
                    "digest": "def",
                    "size": 4_000_000u64,
                    "modified_at": "2024-05-01T00:00:00Z",
                    "details": {"parameter_size": "7B", "quantization_level": "Q4_0"}
                },
                {
                    "name": "llama3.2:latest",
                    "digest": "abc",
                    "size": 2_000_000u64,
                    "modified_at": "2024-06-01T00:00:00Z"
                }
            ]
        })
    }

    #[tokio::test]
    async fn list_models_parses_and_sorts_most_recent_first() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tags_body()))
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let models = client.list_models().await.unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name, "llama3.2:latest");
        assert_eq!(models[1].details.parameter_size, "7B");
    }

    #[tokio::test]
    async fn list_models_maps_http_errors_to_registry_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(503).set_body_string("loading"))
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let err = client.list_models().await.unwrap_err();
        assert!(
            matches!(&err, DockErr::RegistryUnavailable(status, body)
                if status.as_u16() == 503 && body == "loading"),
            "err = {err:?}"
        );
    }

    #[tokio::test]
    async fn untagged_pull_targets_latest() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .and(body_json(
                serde_json::json!({"name": "mistral:latest", "stream": true}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                concat!(
                    r#"{"status":"pulling abc","completed":50,"total":100}"#,
                    "\n",
                    r#"{"status":"success"}"#,
                    "\n",
                ),
                "application/x-ndjson",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let mut recorder = Recorder::default();
        client.pull_with_reporter("mistral", &mut recorder).await.unwrap();

        assert_eq!(recorder.events.len(), 2);
        let PullEvent::Progress(progress) = &recorder.events[0] else {
            panic!("expected progress first, got {:?}", recorder.events);
        };
        assert_eq!(progress.percentage(), Some(50.0));
        assert_eq!(recorder.events[1], PullEvent::Success);
    }

    #[tokio::test]
    async fn tagged_pull_names_are_sent_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .and(body_json(
                serde_json::json!({"name": "llama3.2:3b", "stream": true}),
            ))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                "{\"status\":\"success\"}\n",
                "application/x-ndjson",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let mut recorder = Recorder::default();
        client.pull_with_reporter("llama3.2:3b", &mut recorder).await.unwrap();
    }

    #[tokio::test]
    async fn in_stream_error_rejects_and_stops_delivery() {
        let server = MockServer::start().await;
        // The daemon answers 200 even when the stream reports failure, so the
        // outcome has to come from the records.
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                concat!(
                    r#"{"error":"pull model manifest: file does not exist"}"#,
                    "\n",
                    r#"{"status":"success"}"#,
                    "\n",
                ),
                "application/x-ndjson",
            ))
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let mut recorder = Recorder::default();
        let err = client
            .pull_with_reporter("doesnotexist", &mut recorder)
            .await
            .unwrap_err();

        assert!(
            matches!(&err, DockErr::PullFailed(message)
                if message == "pull model manifest: file does not exist"),
            "err = {err:?}"
        );
        // Nothing after the error record reached the reporter.
        assert_eq!(
            recorder.events,
            vec![PullEvent::Error(
                "pull model manifest: file does not exist".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn create_sends_a_single_from_line_modelfile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/create"))
            .and(body_json(serde_json::json!({
                "name": "tuned",
                "modelfile": "FROM \"/models/tuned.gguf\"",
                "stream": true,
            })))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                concat!(
                    r#"{"status":"parsing modelfile"}"#,
                    "\n",
                    r#"{"status":"success"}"#,
                    "\n",
                ),
                "application/x-ndjson",
            ))
            .expect(1)
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let mut recorder = Recorder::default();
        client
            .create_model("tuned", "/models/tuned.gguf", &mut recorder)
            .await
            .unwrap();
        assert_eq!(recorder.events.last(), Some(&PullEvent::Success));
    }

    #[tokio::test]
    async fn delete_maps_http_errors_to_delete_failed() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/delete"))
            .and(body_json(serde_json::json!({"name": "mistral:latest"})))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let err = client.delete_model("mistral:latest").await.unwrap_err();
        assert!(
            matches!(&err, DockErr::DeleteFailed(message) if message.contains("model not found")),
            "err = {err:?}"
        );
    }

    #[tokio::test]
    async fn delete_succeeds_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/api/delete"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        client.delete_model("mistral:latest").await.unwrap();
    }

    #[tokio::test]
    async fn ensure_model_ready_skips_the_pull_when_installed() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tags_body()))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/pull"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let mut recorder = Recorder::default();
        client
            .ensure_model_ready("mistral", &mut recorder)
            .await
            .unwrap();
        assert!(recorder.events.is_empty());
    }

    #[tokio::test]
    async fn probe_reflects_daemon_reachability() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        assert!(client.probe().await);
    }

    #[tokio::test]
    async fn unified_listing_derives_stable_ids_and_inference_urls() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tags_body()))
            .mount(&server)
            .await;

        let client = OllamaClient::from_base_url(&server.uri());
        let source: &dyn ModelSource = &client;
        let unified = source.list_models().await.unwrap();
        assert_eq!(unified.len(), 2);
        assert_eq!(unified[0].id, "ollama-llama3.2:latest");
        assert_eq!(unified[0].api_url, format!("{}/v1", server.uri()));
    }
}
