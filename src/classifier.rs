use crate::core::{Backend, Config};
use crate::descriptor::ElementDescriptor;
use crate::discovery::selectors;
use crate::errors::TesterError;
use crate::locator::ElementLocator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Terminal classification of a single click attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClickOutcome {
    ActiveNavigation,
    ActiveTitleChange,
    ActiveUiChange,
    DeadClick,
    NotClickable,
    ElementNotFound,
    ClickIntercepted,
    StaleElement,
    Timeout,
    Error,
}

impl ClickOutcome {
    /// Active outcomes are the ones where the click visibly did something.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            ClickOutcome::ActiveNavigation
                | ClickOutcome::ActiveTitleChange
                | ClickOutcome::ActiveUiChange
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClickOutcome::ActiveNavigation => "active_navigation",
            ClickOutcome::ActiveTitleChange => "active_title_change",
            ClickOutcome::ActiveUiChange => "active_ui_change",
            ClickOutcome::DeadClick => "dead_click",
            ClickOutcome::NotClickable => "not_clickable",
            ClickOutcome::ElementNotFound => "element_not_found",
            ClickOutcome::ClickIntercepted => "click_intercepted",
            ClickOutcome::StaleElement => "stale_element",
            ClickOutcome::Timeout => "timeout",
            ClickOutcome::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickResult {
    pub element: ElementDescriptor,
    pub outcome: ClickOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub page_changed: bool,
    pub url_before: String,
    pub url_after: String,
    pub new_elements_appeared: bool,
    pub timestamp: DateTime<Utc>,
}

impl ClickResult {
    fn new(element: ElementDescriptor, outcome: ClickOutcome, url: &str) -> Self {
        Self {
            element,
            outcome,
            error_message: None,
            page_changed: false,
            url_before: url.to_string(),
            url_after: url.to_string(),
            new_elements_appeared: false,
            timestamp: Utc::now(),
        }
    }

    fn with_message(mut self, message: impl Into<String>) -> Self {
        self.error_message = Some(message.into());
        self
    }
}

/// An href that discards the click before any handler could act on it.
/// Internal spaces (only spaces, not all whitespace) are stripped before
/// comparing, so "javascript: void(0)" and " # " are inert but
/// "javascript:\nvoid(0)" is not. A whitespace-only href is inert; an
/// empty one is not, since it means the attribute was absent.
pub fn is_dead_click_by_href(href: &str) -> bool {
    if href.is_empty() {
        return false;
    }
    let stripped: String = href
        .chars()
        .filter(|c| *c != ' ')
        .collect::<String>()
        .to_lowercase();
    stripped.trim().is_empty()
        || stripped == "javascript:void(0)"
        || stripped == "javascript::void(0)"
        || stripped == "#"
}

/// Re-locates a discovered element, clicks it, and classifies what happened.
pub struct ClickClassifier {
    config: Config,
    locator: ElementLocator,
}

impl ClickClassifier {
    pub fn new(config: Config) -> Self {
        let locator = ElementLocator::new(config.discovery.max_text_len);
        Self { config, locator }
    }

    /// Classification is total: every failure mode maps to an outcome, so
    /// one broken element never aborts a batch.
    pub async fn classify<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        descriptor: &ElementDescriptor,
    ) -> ClickResult {
        match self.classify_inner(backend, session, descriptor).await {
            Ok(result) => result,
            Err(err) => {
                let url = backend
                    .current_url(session)
                    .await
                    .unwrap_or_default();
                let outcome = match &err {
                    TesterError::StaleElement(_) => ClickOutcome::StaleElement,
                    TesterError::TimeoutError(_) => ClickOutcome::Timeout,
                    _ => ClickOutcome::Error,
                };
                ClickResult::new(descriptor.clone(), outcome, &url)
                    .with_message(err.to_string())
            }
        }
    }

    async fn classify_inner<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        descriptor: &ElementDescriptor,
    ) -> crate::errors::Result<ClickResult> {
        let url_before = backend.current_url(session).await?;
        let title_before = backend.title(session).await?;

        if descriptor.is_carousel_element {
            self.pause_carousels(backend, session).await;
        }

        let handle = match self
            .locator
            .locate(
                backend,
                session,
                descriptor,
                !descriptor.is_carousel_element,
            )
            .await
        {
            Some(handle) => handle,
            None => {
                return Ok(ClickResult::new(
                    descriptor.clone(),
                    ClickOutcome::ElementNotFound,
                    &url_before,
                )
                .with_message("Element could not be located for clicking"));
            }
        };

        if descriptor.is_carousel_element {
            backend.force_visible_chain(session, &handle).await?;
        }

        backend.scroll_into_view(session, &handle).await?;
        tokio::time::sleep(Duration::from_millis(self.config.test.scroll_settle_ms)).await;

        let displayed = backend.is_displayed(session, &handle).await?;
        let enabled = backend.is_enabled(session, &handle).await?;
        if !displayed || !enabled {
            return Ok(ClickResult::new(
                descriptor.clone(),
                ClickOutcome::NotClickable,
                &url_before,
            )
            .with_message("Element is not displayed or enabled"));
        }

        if let Err(err) = backend.click(session, &handle).await {
            match err {
                TesterError::StaleElement(_) => return Err(err),
                _ => {
                    debug!(error = %err, "native click failed, trying scripted click");
                    if let Err(force_err) = backend.force_click(session, &handle).await {
                        return Ok(ClickResult::new(
                            descriptor.clone(),
                            ClickOutcome::ClickIntercepted,
                            &url_before,
                        )
                        .with_message(format!("Click intercepted: {force_err}")));
                    }
                }
            }
        }

        tokio::time::sleep(Duration::from_millis(self.config.test.post_click_wait_ms)).await;

        let url_after = backend.current_url(session).await.unwrap_or_else(|_| url_before.clone());
        let title_after = backend.title(session).await.unwrap_or_else(|_| title_before.clone());

        let mut result = ClickResult::new(descriptor.clone(), ClickOutcome::DeadClick, &url_before);
        result.url_after = url_after.clone();

        // An inert href discards the click regardless of what else the page
        // did, so it is checked before any observed change.
        if is_dead_click_by_href(&descriptor.href) {
            result.outcome = ClickOutcome::DeadClick;
            result.error_message = Some("Dead click: href is javascript:void(0)".to_string());
            return Ok(result);
        }

        if url_after != url_before {
            result.outcome = ClickOutcome::ActiveNavigation;
            result.page_changed = true;
            return Ok(result);
        }

        if title_after != title_before {
            result.outcome = ClickOutcome::ActiveTitleChange;
            result.page_changed = true;
            return Ok(result);
        }

        if self.overlay_appeared(backend, session).await {
            result.outcome = ClickOutcome::ActiveUiChange;
            result.new_elements_appeared = true;
            return Ok(result);
        }

        result.outcome = ClickOutcome::DeadClick;
        Ok(result)
    }

    async fn pause_carousels<B: Backend>(&self, backend: &B, session: &B::Session) {
        for selector in selectors::CAROUSEL_CONTAINER_SELECTORS {
            let containers = match backend.query_all(session, selector).await {
                Ok(containers) => containers,
                Err(_) => continue,
            };
            for container in containers {
                if let Err(err) = backend.pause_animations(session, &container).await {
                    warn!(error = %err, "could not pause carousel before click");
                }
            }
        }
    }

    /// Probes for overlays and open dropdowns that a UI-only click could
    /// have produced. Probe failures count as nothing appearing.
    async fn overlay_appeared<B: Backend>(&self, backend: &B, session: &B::Session) -> bool {
        for selector in selectors::OVERLAY_SELECTORS
            .iter()
            .chain(selectors::DROPDOWN_SELECTORS.iter())
        {
            let handles = match backend.query_all(session, selector).await {
                Ok(handles) => handles,
                Err(_) => continue,
            };
            for handle in handles {
                if backend.is_displayed(session, &handle).await.unwrap_or(false) {
                    return true;
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn void_href_is_dead() {
        assert!(is_dead_click_by_href("javascript:void(0)"));
        assert!(is_dead_click_by_href("JavaScript:Void(0)"));
        assert!(is_dead_click_by_href("javascript: void(0)"));
        assert!(is_dead_click_by_href("javascript::void(0)"));
    }

    #[test]
    fn hash_href_is_dead() {
        assert!(is_dead_click_by_href("#"));
        assert!(is_dead_click_by_href(" # "));
    }

    #[test]
    fn whitespace_only_href_is_dead() {
        assert!(is_dead_click_by_href("   "));
        assert!(is_dead_click_by_href("\t\n"));
    }

    #[test]
    fn empty_href_is_not_dead() {
        assert!(!is_dead_click_by_href(""));
    }

    #[test]
    fn real_hrefs_are_not_dead() {
        assert!(!is_dead_click_by_href("/about"));
        assert!(!is_dead_click_by_href("https://example.com"));
        assert!(!is_dead_click_by_href("javascript:doSomething()"));
        assert!(!is_dead_click_by_href("#section-2"));
    }

    #[test]
    fn only_spaces_are_stripped_before_comparison() {
        assert!(is_dead_click_by_href("javascript: void(0)"));
        assert!(!is_dead_click_by_href("javascript:\nvoid(0)"));
        assert!(!is_dead_click_by_href("javascript:\tvoid(0)"));
    }

    #[test]
    fn active_outcomes() {
        assert!(ClickOutcome::ActiveNavigation.is_active());
        assert!(ClickOutcome::ActiveTitleChange.is_active());
        assert!(ClickOutcome::ActiveUiChange.is_active());
        assert!(!ClickOutcome::DeadClick.is_active());
        assert!(!ClickOutcome::Error.is_active());
        assert!(!ClickOutcome::StaleElement.is_active());
    }

    #[test]
    fn outcome_serializes_snake_case() {
        let json = serde_json::to_string(&ClickOutcome::ActiveNavigation).unwrap();
        assert_eq!(json, "\"active_navigation\"");
        let json = serde_json::to_string(&ClickOutcome::DeadClick).unwrap();
        assert_eq!(json, "\"dead_click\"");
    }
}
