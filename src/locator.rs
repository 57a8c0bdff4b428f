use crate::core::Backend;
use crate::descriptor::{normalize_text, ElementDescriptor};
use tracing::debug;

/// Re-finds a previously discovered element on a freshly loaded page.
///
/// Strategies run in order of reliability: document-unique id, recorded CSS
/// path, then the full class list. The first candidate whose tag and
/// normalized text match the descriptor wins; a failing strategy falls
/// through to the next one.
pub struct ElementLocator {
    max_text_len: usize,
}

impl ElementLocator {
    pub fn new(max_text_len: usize) -> Self {
        Self { max_text_len }
    }

    pub async fn locate<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        descriptor: &ElementDescriptor,
        require_displayed: bool,
    ) -> Option<B::Handle> {
        if !descriptor.id.is_empty() {
            let selector = format!("[id=\"{}\"]", descriptor.id);
            if let Some(handle) = self
                .first_match(backend, session, &selector, descriptor, require_displayed)
                .await
            {
                return Some(handle);
            }
        }

        if !descriptor.css_path.is_empty() {
            match backend.query_one(session, &descriptor.css_path).await {
                Ok(Some(handle)) => {
                    if self
                        .matches(backend, session, &handle, descriptor, require_displayed)
                        .await
                    {
                        return Some(handle);
                    }
                }
                Ok(None) => {}
                Err(err) => debug!(error = %err, "css path lookup failed"),
            }
        }

        if !descriptor.class_names.trim().is_empty() {
            let selector: String = descriptor
                .class_names
                .split_whitespace()
                .map(|class| format!(".{class}"))
                .collect();
            if let Some(handle) = self
                .first_match(backend, session, &selector, descriptor, require_displayed)
                .await
            {
                return Some(handle);
            }
        }

        None
    }

    async fn first_match<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        selector: &str,
        descriptor: &ElementDescriptor,
        require_displayed: bool,
    ) -> Option<B::Handle> {
        let candidates = match backend.query_all(session, selector).await {
            Ok(candidates) => candidates,
            Err(err) => {
                debug!(selector, error = %err, "locator query failed");
                return None;
            }
        };
        for candidate in candidates {
            if self
                .matches(backend, session, &candidate, descriptor, require_displayed)
                .await
            {
                return Some(candidate);
            }
        }
        None
    }

    async fn matches<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
        descriptor: &ElementDescriptor,
        require_displayed: bool,
    ) -> bool {
        let tag = match backend.tag_name(session, handle).await {
            Ok(tag) => tag.to_lowercase(),
            Err(_) => return false,
        };
        if tag != descriptor.tag_name {
            return false;
        }
        let text = match backend.text(session, handle).await {
            Ok(text) => normalize_text(&text, self.max_text_len),
            Err(_) => return false,
        };
        if text != descriptor.text {
            return false;
        }
        if require_displayed
            && !backend.is_displayed(session, handle).await.unwrap_or(false)
        {
            return false;
        }
        true
    }
}
