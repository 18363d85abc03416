use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

use crate::platform::{NormalizedUrl, Platform};

// Most sites serve reduced markup to obvious bots, so the default UA is a
// browser one. Storefronts are the exception: they serve richer static
// metadata to crawlers.
const BROWSER_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
const CRAWLER_UA: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

const OEMBED_ENDPOINT: &str = "https://www.youtube.com/oembed";

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("upstream returned {status} {status_text}")]
    Status { status: u16, status_text: String },
}

/// Platform-native side-channel metadata, fetched independently of the HTML
/// document. Currently YouTube oEmbed only.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OEmbed {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author_name: Option<String>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new() -> Result<Self, FetchError> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self { client })
    }

    /// One-shot GET. Non-2xx is a hard failure carrying the upstream status;
    /// there is no retry for arbitrary untrusted targets.
    pub async fn fetch_html(&self, target: &NormalizedUrl) -> Result<String, FetchError> {
        let user_agent = match target.platform {
            Platform::Shopping => CRAWLER_UA,
            _ => BROWSER_UA,
        };

        let response = self
            .client
            .get(target.absolute())
            .header(USER_AGENT, user_agent)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                status_text: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        Ok(response.text().await?)
    }

    /// Auxiliary oEmbed lookup. Failure here is never fatal; the pipeline
    /// proceeds with HTML-derived data only.
    pub async fn fetch_oembed(&self, target: &NormalizedUrl) -> Option<OEmbed> {
        if target.platform != Platform::YouTube {
            return None;
        }

        let endpoint = Url::parse_with_params(
            OEMBED_ENDPOINT,
            &[("url", target.absolute()), ("format", "json")],
        )
        .ok()?;

        match self.client.get(endpoint).send().await {
            Ok(response) if response.status().is_success() => {
                match response.json::<OEmbed>().await {
                    Ok(oembed) => Some(oembed),
                    Err(e) => {
                        tracing::debug!("oEmbed response was not parseable: {e}");
                        None
                    }
                }
            }
            Ok(response) => {
                tracing::debug!("oEmbed lookup returned {}", response.status());
                None
            }
            Err(e) => {
                tracing::debug!("oEmbed lookup failed: {e}");
                None
            }
        }
    }
}
