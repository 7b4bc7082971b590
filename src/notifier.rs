use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use reqwest::Client;

/// Push channel for matching listings
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push(&self, title: &str, body: &str) -> Result<()>;
}

/// Publishes to an ntfy topic: the body is the message text, the title and
/// tags travel as headers.
pub struct NtfyNotifier {
    client: Client,
    url: String,
    tags: String,
}

impl NtfyNotifier {
    pub fn new(client: Client, url: &str, tags: &str) -> Self {
        Self {
            client,
            url: url.to_string(),
            tags: tags.to_string(),
        }
    }

    fn build_request(&self, title: &str, body: &str) -> Result<reqwest::Request> {
        // ntfy accepts raw UTF-8 in the Title header ("€" in every title)
        let title = HeaderValue::from_bytes(title.as_bytes()).context("Title is not a valid header value")?;
        let tags = HeaderValue::from_str(&self.tags).context("Tags is not a valid header value")?;

        self.client
            .post(&self.url)
            .header("Title", title)
            .header("Tags", tags)
            .body(body.as_bytes().to_vec())
            .build()
            .context("Failed to build notification request")
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn push(&self, title: &str, body: &str) -> Result<()> {
        let request = self.build_request(title, body)?;
        self.client
            .execute(request)
            .await
            .with_context(|| format!("Failed to post notification to {}", self.url))?
            .error_for_status()
            .context("Notification endpoint rejected the message")?;

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_request() {
        let notifier = NtfyNotifier::new(Client::new(), "https://ntfy.sh/mytopic", "house");
        let request = notifier
            .build_request("Eindhoven - €1500/m incl. util", "40 m², furnished\nhttps://x/1")
            .unwrap();

        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().as_str(), "https://ntfy.sh/mytopic");
        assert_eq!(request.headers()["Tags"], "house");
        assert_eq!(
            request.headers()["Title"].as_bytes(),
            "Eindhoven - €1500/m incl. util".as_bytes()
        );
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, "40 m², furnished\nhttps://x/1".as_bytes());
    }
}
