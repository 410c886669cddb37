//! Mail delivery backends
//!
//! `HttpMailer` posts to an HTTP mail gateway; `LogMailer` just logs and
//! is the default for development, where no gateway is configured.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use crate::EmailMessage;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

pub struct HttpMailer {
    client: reqwest::Client,
    endpoint: String,
    from: String,
    api_token: Option<String>,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>, from: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            from: from.into(),
            api_token: None,
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let mut request = self.client.post(&self.endpoint).json(&json!({
            "from": self.from,
            "to": message.to,
            "subject": message.subject,
            "body": message.body,
        }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            anyhow::bail!("mail gateway returned {}", response.status());
        }
        Ok(())
    }
}

pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        info!(to = %message.to, subject = %message.subject, "email delivered to log");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn http_mailer_posts_message_json() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(body_json(json!({
                "from": "noreply@tessera.dev",
                "to": "ada@example.com",
                "subject": "Hello",
                "body": "Hi Ada",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(format!("{}/send", server.uri()), "noreply@tessera.dev");
        let message = EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Hi Ada".to_string(),
        };
        mailer.send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn http_mailer_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("authorization", "Bearer sekrit"))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mailer =
            HttpMailer::new(server.uri(), "noreply@tessera.dev").with_api_token("sekrit");
        let message = EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Hi".to_string(),
        };
        mailer.send(&message).await.unwrap();
    }

    #[tokio::test]
    async fn http_mailer_surfaces_gateway_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mailer = HttpMailer::new(server.uri(), "noreply@tessera.dev");
        let message = EmailMessage {
            to: "ada@example.com".to_string(),
            subject: "Hello".to_string(),
            body: "Hi".to_string(),
        };
        assert!(mailer.send(&message).await.is_err());
    }
}
