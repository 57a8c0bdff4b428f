use crate::descriptor::ElementDescriptor;
use crate::errors::{Result, TesterError};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

const MAX_REDIRECTS: usize = 10;

/// Annotates link descriptors with the HTTP status chain their href
/// resolves through, following redirects manually so every hop is
/// recorded.
pub struct LinkProber {
    client: reqwest::Client,
}

impl LinkProber {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(timeout)
            .build()
            .map_err(|err| TesterError::ConfigurationError(err.to_string()))?;
        Ok(Self { client })
    }

    /// HEAD-probe `href` relative to `base`. Returns the status of every
    /// hop, final status last, or `None` when the href is inert, malformed,
    /// or unreachable.
    pub async fn status_chain(&self, base: &str, href: &str) -> Option<Vec<u16>> {
        let trimmed = href.trim();
        if trimmed.is_empty()
            || trimmed.starts_with('#')
            || trimmed.to_lowercase().starts_with("javascript:")
        {
            return None;
        }
        let base = Url::parse(base).ok()?;
        let mut target = base.join(trimmed).ok()?;

        let mut chain = Vec::new();
        for _ in 0..MAX_REDIRECTS {
            let response = match self.client.head(target.clone()).send().await {
                Ok(response) => response,
                Err(err) => {
                    debug!(url = %target, error = %err, "link probe failed");
                    return None;
                }
            };
            let status = response.status();
            chain.push(status.as_u16());

            if !status.is_redirection() {
                return Some(chain);
            }
            let location = response
                .headers()
                .get(reqwest::header::LOCATION)
                .and_then(|value| value.to_str().ok())?;
            target = target.join(location).ok()?;
        }
        // Redirect loop deeper than the cap.
        Some(chain)
    }

    /// Fill in `status_chain` for every anchor descriptor that carries a
    /// resolvable href.
    pub async fn annotate(&self, base: &str, descriptors: &mut [ElementDescriptor]) {
        let mut probed = 0usize;
        for descriptor in descriptors.iter_mut() {
            if descriptor.tag_name != "a" || descriptor.href.is_empty() {
                continue;
            }
            descriptor.status_chain = self.status_chain(base, &descriptor.href).await;
            if descriptor.status_chain.is_some() {
                probed += 1;
            }
        }
        info!(probed, "link status probing complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn inert_hrefs_are_skipped() {
        let prober = LinkProber::new(Duration::from_secs(5)).unwrap();
        assert_eq!(prober.status_chain("https://example.com", "").await, None);
        assert_eq!(prober.status_chain("https://example.com", "#").await, None);
        assert_eq!(
            prober
                .status_chain("https://example.com", "#section")
                .await,
            None
        );
        assert_eq!(
            prober
                .status_chain("https://example.com", "javascript:void(0)")
                .await,
            None
        );
    }

    #[tokio::test]
    async fn malformed_base_yields_none() {
        let prober = LinkProber::new(Duration::from_secs(5)).unwrap();
        assert_eq!(prober.status_chain("not a url", "/about").await, None);
    }
}
