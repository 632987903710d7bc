use crate::alerts::Notifier;
use crate::error::NotifyError;
use crate::message::NotifyMessage;
use log::{debug, error};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Runtime;

/// Upper bound for a single webhook request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers notifications as JSON `POST` requests to a webhook
///
/// Each message is sent as `{"summary": ..., "body": ...}`. Non-2xx responses
/// are logged with status, body and headers and reported as
/// `NotifyError::Rejected`; nothing is retried.
pub struct WebhookNotifier {
    client: Client,
    url: String,
    runtime: Arc<Runtime>,
}

impl WebhookNotifier {
    /// Create a notifier posting to `url`
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::ClientSetup` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, runtime: Arc<Runtime>) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| NotifyError::ClientSetup(e.to_string()))?;

        Ok(Self {
            client,
            url: url.into(),
            runtime,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post(&self, message: &NotifyMessage) -> Result<(), NotifyError> {
        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!("Delivered notification ({}): {}", status.as_u16(), message.summary);
            return Ok(());
        }

        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        error!(
            "Failed sending notification status_code={} text={:?}. All headers:\n{:?}",
            status.as_u16(),
            body,
            headers
        );

        Err(NotifyError::Rejected {
            status: status.as_u16(),
        })
    }
}

impl Notifier for WebhookNotifier {
    fn send(&self, message: &NotifyMessage) -> Result<(), NotifyError> {
        self.runtime.block_on(self.post(message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Start a mock server on `runtime` answering `POST /notify` with `status`
    fn webhook_server(runtime: &Runtime, status: u16) -> MockServer {
        runtime.block_on(async {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/notify"))
                .respond_with(ResponseTemplate::new(status).set_body_string("rejected by test"))
                .mount(&server)
                .await;
            server
        })
    }

    fn runtime() -> Arc<Runtime> {
        Arc::new(Runtime::new().unwrap())
    }

    #[test]
    fn test_posts_summary_and_body_as_json() {
        let rt = runtime();
        let server = rt.block_on(MockServer::start());
        rt.block_on(
            Mock::given(method("POST"))
                .and(path("/notify"))
                .and(header("content-type", "application/json"))
                .and(body_json(json!({
                    "summary": "🟡 Warning: restarted",
                    "body": "Old restart count=0"
                })))
                .respond_with(ResponseTemplate::new(200))
                .expect(1)
                .mount(&server),
        );

        let notifier =
            WebhookNotifier::new(format!("{}/notify", server.uri()), Arc::clone(&rt)).unwrap();
        let message = NotifyMessage::new("🟡 Warning: restarted", "Old restart count=0");
        notifier.send(&message).unwrap();

        let requests = rt.block_on(server.received_requests()).unwrap();
        assert_eq!(requests.len(), 1);
        rt.block_on(server.verify());
    }

    #[test]
    fn test_non_success_status_is_rejected() {
        let rt = runtime();
        let server = webhook_server(&rt, 500);
        let notifier =
            WebhookNotifier::new(format!("{}/notify", server.uri()), Arc::clone(&rt)).unwrap();

        let result = notifier.send(&NotifyMessage::new("summary", "body"));
        assert!(matches!(result, Err(NotifyError::Rejected { status: 500 })));

        // Nothing is retried
        let requests = rt.block_on(server.received_requests()).unwrap();
        assert_eq!(requests.len(), 1);
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        // Nothing listens on port 1
        let notifier = WebhookNotifier::new("http://127.0.0.1:1/notify", runtime()).unwrap();
        let result = notifier.send(&NotifyMessage::new("summary", "body"));
        assert!(matches!(result, Err(NotifyError::TransportFailed(_))));
    }
}
