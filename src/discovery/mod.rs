pub mod carousel;
pub mod selectors;

pub use carousel::SlideNormalizer;

use crate::core::{Backend, DiscoveryConfig, DomPredicate};
use crate::descriptor::{normalize_text, DetectionMethod, ElementDescriptor, Fingerprint};
use crate::errors::Result;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Walks a rendered page and produces descriptors for everything that looks
/// clickable: a structural selector sweep, a pointer-cursor sweep, and an
/// event-listener sweep, with carousels handled up front so their hidden
/// slides are not lost.
pub struct DiscoveryEngine {
    config: DiscoveryConfig,
}

impl DiscoveryEngine {
    pub fn new(config: DiscoveryConfig) -> Self {
        Self { config }
    }

    pub async fn discover<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        url: &str,
    ) -> Result<Vec<ElementDescriptor>> {
        info!(url, "loading page for element discovery");
        backend.navigate(session, url).await?;
        self.wait_for_body(backend, session).await;
        tokio::time::sleep(Duration::from_millis(self.config.settle_ms)).await;

        let scope = self.find_main_region(backend, session).await;
        if scope.is_some() {
            info!("scoped discovery to main content region");
        } else {
            info!("no main content region found, filtering header/footer per element");
        }

        let mut seen: HashSet<Fingerprint> = HashSet::new();
        let mut descriptors: Vec<ElementDescriptor> = Vec::new();

        // Carousels first: their slides are captured through forced
        // visibility and would otherwise be skipped as hidden.
        let carousel_descriptors = self
            .carousel_pass(backend, session, scope.as_ref())
            .await;

        for selector in selectors::CLICKABLE_SELECTORS {
            match self
                .scoped_query(backend, session, scope.as_ref(), selector)
                .await
            {
                Ok(handles) => {
                    for handle in handles {
                        self.admit(
                            backend,
                            session,
                            &handle,
                            DetectionMethod::Structural,
                            &mut seen,
                            &mut descriptors,
                        )
                        .await;
                    }
                }
                Err(err) => debug!(selector, error = %err, "clickable selector failed"),
            }
        }
        info!(count = descriptors.len(), "structural sweep complete");

        match backend
            .query_where(session, DomPredicate::PointerCursor)
            .await
        {
            Ok(handles) => {
                for handle in handles {
                    self.admit(
                        backend,
                        session,
                        &handle,
                        DetectionMethod::PointerCursor,
                        &mut seen,
                        &mut descriptors,
                    )
                    .await;
                }
            }
            Err(err) => warn!(error = %err, "pointer cursor sweep failed"),
        }

        match backend
            .query_where(session, DomPredicate::ClickHandler)
            .await
        {
            Ok(handles) => {
                for handle in handles {
                    self.admit(
                        backend,
                        session,
                        &handle,
                        DetectionMethod::EventListener,
                        &mut seen,
                        &mut descriptors,
                    )
                    .await;
                }
            }
            Err(err) => warn!(error = %err, "event listener sweep failed"),
        }

        descriptors.extend(carousel_descriptors);
        info!(total = descriptors.len(), "element discovery finished");
        Ok(descriptors)
    }

    async fn wait_for_body<B: Backend>(&self, backend: &B, session: &B::Session) {
        let deadline = Duration::from_millis(self.config.body_wait_ms);
        let started = std::time::Instant::now();
        loop {
            if let Ok(Some(_)) = backend.query_one(session, "body").await {
                return;
            }
            if started.elapsed() >= deadline {
                warn!("page load timeout, proceeding with available elements");
                return;
            }
            tokio::time::sleep(Duration::from_millis(250)).await;
        }
    }

    async fn find_main_region<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
    ) -> Option<B::Handle> {
        for selector in selectors::MAIN_CONTENT_SELECTORS {
            if let Ok(Some(handle)) = backend.query_one(session, selector).await {
                if backend.is_displayed(session, &handle).await.unwrap_or(false) {
                    debug!(selector, "main content region selected");
                    return Some(handle);
                }
            }
        }
        None
    }

    async fn carousel_pass<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        scope: Option<&B::Handle>,
    ) -> Vec<ElementDescriptor> {
        let normalizer = SlideNormalizer::new(&self.config);
        let mut carousel_seen: HashSet<Fingerprint> = HashSet::new();
        let mut descriptors = Vec::new();

        for selector in selectors::CAROUSEL_CONTAINER_SELECTORS {
            let containers = match self.scoped_query(backend, session, scope, selector).await {
                Ok(containers) => containers,
                Err(err) => {
                    debug!(selector, error = %err, "carousel selector failed");
                    continue;
                }
            };
            for container in containers {
                if !backend
                    .is_displayed(session, &container)
                    .await
                    .unwrap_or(false)
                {
                    continue;
                }
                if self.is_excluded(backend, session, &container).await {
                    continue;
                }
                debug!(selector, "processing carousel container");
                let mut found = normalizer
                    .extract_descriptors(backend, session, &container, &mut carousel_seen)
                    .await;
                descriptors.append(&mut found);
            }
        }

        if !descriptors.is_empty() {
            info!(count = descriptors.len(), "carousel pass complete");
        }
        descriptors
    }

    async fn scoped_query<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        scope: Option<&B::Handle>,
        selector: &str,
    ) -> Result<Vec<B::Handle>> {
        match scope {
            Some(region) => backend.query_within(session, region, selector).await,
            None => backend.query_all(session, selector).await,
        }
    }

    /// Capture `handle` into `out` if it is visible, enabled, outside
    /// excluded chrome and not owned by a carousel, and its fingerprint has
    /// not been seen before.
    async fn admit<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
        method: DetectionMethod,
        seen: &mut HashSet<Fingerprint>,
        out: &mut Vec<ElementDescriptor>,
    ) {
        if !backend.is_displayed(session, handle).await.unwrap_or(false) {
            return;
        }
        if !backend.is_enabled(session, handle).await.unwrap_or(false) {
            return;
        }
        if self.is_excluded(backend, session, handle).await {
            return;
        }
        if self.inside_carousel(backend, session, handle).await {
            return;
        }
        match capture(backend, session, handle, &self.config, false, Some(method)).await {
            Ok(descriptor) => {
                if seen.insert(descriptor.fingerprint()) {
                    out.push(descriptor);
                }
            }
            Err(err) => debug!(error = %err, "failed to capture element"),
        }
    }

    async fn is_excluded<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
    ) -> bool {
        self.exclusion_check(backend, session, handle)
            .await
            .unwrap_or(false)
    }

    /// True when the element or any ancestor belongs to page chrome:
    /// header/footer/nav tags, navigation roles, or keyword-bearing
    /// class/id attributes.
    async fn exclusion_check<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
    ) -> Result<bool> {
        let tag = backend.tag_name(session, handle).await?.to_lowercase();
        if selectors::HEADER_FOOTER_TAGS.contains(&tag.as_str()) {
            return Ok(true);
        }
        let classes = backend
            .attribute(session, handle, "class")
            .await?
            .unwrap_or_default();
        let id = backend
            .attribute(session, handle, "id")
            .await?
            .unwrap_or_default();
        let merged = format!("{classes} {id}").to_lowercase();
        if selectors::HEADER_FOOTER_KEYWORDS
            .iter()
            .any(|keyword| merged.contains(keyword))
        {
            return Ok(true);
        }
        let role = backend
            .attribute(session, handle, "role")
            .await?
            .unwrap_or_default();
        if selectors::HEADER_FOOTER_ROLES.contains(&role.as_str()) {
            return Ok(true);
        }

        for ancestor in backend.ancestors(session, handle).await? {
            if selectors::HEADER_FOOTER_TAGS.contains(&ancestor.tag.to_lowercase().as_str()) {
                return Ok(true);
            }
            if selectors::HEADER_FOOTER_ROLES.contains(&ancestor.role.as_str()) {
                return Ok(true);
            }
            let merged = format!("{} {}", ancestor.classes, ancestor.id).to_lowercase();
            if selectors::HEADER_FOOTER_KEYWORDS
                .iter()
                .any(|keyword| merged.contains(keyword))
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// True when the element sits inside a carousel container. Such
    /// elements are captured by the carousel pass instead.
    async fn inside_carousel<B: Backend>(
        &self,
        backend: &B,
        session: &B::Session,
        handle: &B::Handle,
    ) -> bool {
        let own_classes = backend
            .attribute(session, handle, "class")
            .await
            .ok()
            .flatten()
            .unwrap_or_default()
            .to_lowercase();
        if selectors::CAROUSEL_CLASS_KEYWORDS
            .iter()
            .any(|keyword| own_classes.contains(keyword))
        {
            return true;
        }
        let ancestors = match backend.ancestors(session, handle).await {
            Ok(ancestors) => ancestors,
            Err(_) => return false,
        };
        ancestors.iter().any(|ancestor| {
            let classes = ancestor.classes.to_lowercase();
            selectors::CAROUSEL_CLASS_KEYWORDS
                .iter()
                .any(|keyword| classes.contains(keyword))
        })
    }
}

/// Read every attribute a descriptor carries from the live element. Path
/// resolution failures degrade to empty paths rather than losing the
/// element.
pub(crate) async fn capture<B: Backend>(
    backend: &B,
    session: &B::Session,
    handle: &B::Handle,
    config: &DiscoveryConfig,
    is_carousel_element: bool,
    detection_method: Option<DetectionMethod>,
) -> Result<ElementDescriptor> {
    let tag_name = backend.tag_name(session, handle).await?.to_lowercase();
    let raw_text = backend.text(session, handle).await?;

    let attribute = |name: &'static str| backend.attribute(session, handle, name);
    let class_names = attribute("class").await?.unwrap_or_default();
    let id = attribute("id").await?.unwrap_or_default();
    let href = attribute("href").await?.unwrap_or_default();
    let onclick = attribute("onclick").await?.unwrap_or_default();
    let role = attribute("role").await?.unwrap_or_default();
    let input_type = attribute("type").await?.unwrap_or_default();
    let data_testid = attribute("data-testid").await?.unwrap_or_default();
    let aria_label = attribute("aria-label").await?.unwrap_or_default();

    let dom_path = backend.dom_path(session, handle).await.unwrap_or_default();
    let css_path = backend.css_path(session, handle).await.unwrap_or_default();
    let position = backend.bounding_box(session, handle).await?;
    let is_displayed = backend.is_displayed(session, handle).await?;
    let is_enabled = backend.is_enabled(session, handle).await?;

    Ok(ElementDescriptor {
        tag_name,
        text: normalize_text(&raw_text, config.max_text_len),
        class_names,
        id,
        href,
        onclick,
        role,
        input_type,
        data_testid,
        aria_label,
        dom_path,
        css_path,
        position,
        is_displayed,
        is_enabled,
        is_carousel_element,
        detection_method,
        status_chain: None,
    })
}
