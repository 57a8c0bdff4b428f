use crate::core::{Backend, DiscoveryConfig};
use crate::descriptor::{ElementDescriptor, Fingerprint};
use crate::discovery::selectors;
use crate::errors::Result;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, warn};

/// Pauses a carousel's auto-rotation and forces every slide (including
/// off-screen or hidden ones) into a measurable state long enough to
/// extract its clickable descendants.
///
/// Everything here is best-effort: a scripting failure yields an empty
/// result and the container is left in a paused, not necessarily restored,
/// rotation state.
pub struct SlideNormalizer<'a> {
    config: &'a DiscoveryConfig,
}

impl<'a> SlideNormalizer<'a> {
    pub fn new(config: &'a DiscoveryConfig) -> Self {
        Self { config }
    }

    /// Pause rotation and return the container's slides in order. An empty
    /// return is an expected outcome the caller must tolerate.
    pub async fn normalize<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        container: &B::Handle,
    ) -> Vec<B::Handle> {
        if let Err(err) = backend.pause_animations(session, container).await {
            warn!(error = %err, "could not pause carousel rotation");
        }
        tokio::time::sleep(Duration::from_millis(self.config.slide_settle_ms)).await;

        match self.enumerate_slides(backend, session, container).await {
            Ok(slides) => {
                debug!(count = slides.len(), "found carousel slides");
                slides
            }
            Err(err) => {
                warn!(error = %err, "error enumerating carousel slides");
                Vec::new()
            }
        }
    }

    /// Extract carousel-sourced descriptors from every slide of `container`.
    /// `seen` deduplicates within the carousel pass only; the main discovery
    /// fingerprint set never sees these.
    pub async fn extract_descriptors<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        container: &B::Handle,
        seen: &mut HashSet<Fingerprint>,
    ) -> Vec<ElementDescriptor> {
        let slides = self.normalize(backend, session, container).await;
        let mut descriptors = Vec::new();
        for slide in &slides {
            match self
                .extract_from_slide(backend, session, slide, seen)
                .await
            {
                Ok(mut found) => descriptors.append(&mut found),
                Err(err) => debug!(error = %err, "error extracting clickables from slide"),
            }
        }
        descriptors
    }

    async fn enumerate_slides<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        container: &B::Handle,
    ) -> Result<Vec<B::Handle>> {
        for selector in selectors::SLIDE_SELECTORS {
            match backend.query_within(session, container, selector).await {
                Ok(found) if !found.is_empty() => return Ok(found),
                Ok(_) => {}
                Err(err) => debug!(selector, error = %err, "slide selector failed"),
            }
        }

        // No named slide matched; scan direct children for slide-like ones.
        let mut slides = Vec::new();
        for child in backend
            .children(session, container)
            .await
            .unwrap_or_default()
        {
            if self.looks_like_slide(backend, session, &child).await {
                slides.push(child);
            }
        }

        if slides.is_empty() {
            for wrapper_selector in selectors::SLIDE_WRAPPER_SELECTORS {
                let wrappers = backend
                    .query_within(session, container, wrapper_selector)
                    .await
                    .unwrap_or_default();
                for wrapper in wrappers {
                    for child in backend.children(session, &wrapper).await.unwrap_or_default() {
                        if self.looks_like_slide(backend, session, &child).await {
                            slides.push(child);
                        }
                    }
                }
            }
        }

        Ok(slides)
    }

    async fn looks_like_slide<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
    ) -> bool {
        self.slide_likeness(backend, session, handle)
            .await
            .unwrap_or(false)
    }

    /// An element qualifies as a slide if it carries slide-typical content
    /// (image, long text, link or button), slide-like positioning, or a
    /// slide-keyword class name.
    async fn slide_likeness<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
    ) -> Result<bool> {
        if !backend.query_within(session, handle, "img").await?.is_empty() {
            return Ok(true);
        }
        if backend.text(session, handle).await?.trim().len() > 20 {
            return Ok(true);
        }
        if !backend.query_within(session, handle, "a").await?.is_empty()
            || !backend
                .query_within(session, handle, "button")
                .await?
                .is_empty()
        {
            return Ok(true);
        }

        let position = backend.computed_style(session, handle, "position").await?;
        if matches!(position.as_str(), "absolute" | "relative") {
            return Ok(true);
        }
        let float = backend.computed_style(session, handle, "float").await?;
        if matches!(float.as_str(), "left" | "right") {
            return Ok(true);
        }
        let display = backend.computed_style(session, handle, "display").await?;
        if matches!(display.as_str(), "flex" | "inline-block") {
            return Ok(true);
        }

        let classes = backend
            .attribute(session, handle, "class")
            .await?
            .unwrap_or_default()
            .to_lowercase();
        Ok(selectors::SLIDE_CLASS_KEYWORDS
            .iter()
            .any(|keyword| classes.contains(keyword)))
    }

    async fn extract_from_slide<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        slide: &B::Handle,
        seen: &mut HashSet<Fingerprint>,
    ) -> Result<Vec<ElementDescriptor>> {
        backend.force_visible(session, slide).await?;
        tokio::time::sleep(Duration::from_millis(self.config.slide_settle_ms)).await;

        let mut descriptors = Vec::new();

        for selector in selectors::SLIDE_CLICKABLE_SELECTORS {
            match backend.query_within(session, slide, selector).await {
                Ok(handles) => {
                    for handle in handles {
                        // The slide may still be visually hidden, so only
                        // enablement gates capture here.
                        if backend.is_enabled(session, &handle).await.unwrap_or(false) {
                            if let Some(descriptor) =
                                self.capture_hidden(backend, session, &handle).await
                            {
                                if seen.insert(descriptor.fingerprint()) {
                                    descriptors.push(descriptor);
                                }
                            }
                        }
                    }
                }
                Err(err) => debug!(selector, error = %err, "slide clickable selector failed"),
            }
        }

        // Descendants whose text carries an action word are clickable
        // candidates even when no selector matched them. Wrappers whose
        // matching text actually belongs to a descendant are skipped; the
        // descendant is its own candidate.
        match backend.query_within(session, slide, "*").await {
            Ok(handles) => {
                for handle in handles {
                    let text = backend
                        .text(session, &handle)
                        .await
                        .unwrap_or_default()
                        .to_uppercase();
                    if text.is_empty() {
                        continue;
                    }
                    let word = match selectors::ACTION_WORDS
                        .iter()
                        .find(|word| text.contains(*word))
                    {
                        Some(word) => *word,
                        None => continue,
                    };
                    if self
                        .descendant_carries_word(backend, session, &handle, word)
                        .await
                    {
                        continue;
                    }
                    if backend.is_enabled(session, &handle).await.unwrap_or(false) {
                        if let Some(descriptor) =
                            self.capture_hidden(backend, session, &handle).await
                        {
                            if seen.insert(descriptor.fingerprint()) {
                                descriptors.push(descriptor);
                            }
                        }
                    }
                }
            }
            Err(err) => debug!(error = %err, "action word sweep failed"),
        }

        // Restoration is best-effort; a failure leaves the slide forced
        // visible, which is non-fatal.
        let _ = backend.clear_visual_overrides(session, slide).await;

        Ok(descriptors)
    }

    /// True when any descendant's text also carries `word`, meaning this
    /// element is a wrapper around the real clickable.
    async fn descendant_carries_word<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
        word: &str,
    ) -> bool {
        let children = match backend.query_within(session, handle, "*").await {
            Ok(children) => children,
            Err(_) => return false,
        };
        for child in children {
            let child_text = backend
                .text(session, &child)
                .await
                .unwrap_or_default()
                .to_uppercase();
            if child_text.contains(word) {
                return true;
            }
        }
        false
    }

    /// Capture a descriptor from an element that may currently be hidden:
    /// force it visible long enough to measure, then restore.
    async fn capture_hidden<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
    ) -> Option<ElementDescriptor> {
        if backend.force_visible(session, handle).await.is_err() {
            return None;
        }
        let captured = super::capture(backend, session, handle, self.config, true, None)
            .await
            .ok();
        let _ = backend.clear_visual_overrides(session, handle).await;

        captured.map(|mut descriptor| {
            // Captured under a forced-visible override.
            descriptor.is_displayed = true;
            descriptor
        })
    }
}
