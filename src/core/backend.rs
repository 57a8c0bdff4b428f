use crate::core::Config;
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Position and size of an element at capture time, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Identifying attributes of one ancestor, innermost first, up to the body.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AncestorInfo {
    pub tag: String,
    pub classes: String,
    pub id: String,
    pub role: String,
}

/// Typed live-DOM predicates a backend can evaluate in bulk. The script (or
/// other mechanism) that implements each predicate belongs to the binding,
/// not to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomPredicate {
    /// Computed `cursor: pointer` with a non-zero rendered size.
    PointerCursor,
    /// An inline click-type handler or a click-indicating data attribute
    /// (`onclick`/`onmousedown`/`onmouseup`, `data-action`, `data-click`,
    /// `data-href`), with a non-zero rendered size.
    ClickHandler,
}

/// Contract required from the browser-automation driver.
///
/// A `Session` is one isolated browsing context with its own navigation
/// state and cookie jar. A `Handle` is a live reference to one element and
/// is only valid until the next navigation of its session; operations on a
/// handle whose element no longer resolves return
/// [`TesterError::StaleElement`](crate::errors::TesterError::StaleElement).
#[async_trait]
pub trait Backend: Send + Sync {
    type Session: Send + Sync;
    type Handle: Send + Sync + Clone;

    /// Launch the underlying browser process.
    async fn launch(&mut self, config: &Config) -> Result<()>;

    /// Open a new isolated browsing context.
    async fn new_session(&self) -> Result<Self::Session>;

    /// Release a browsing context.
    async fn close_session(&self, session: Self::Session) -> Result<()>;

    async fn navigate(&self, session: &Self::Session, url: &str) -> Result<()>;

    async fn current_url(&self, session: &Self::Session) -> Result<String>;

    async fn title(&self, session: &Self::Session) -> Result<String>;

    /// All elements matching a CSS selector, in document order.
    async fn query_all(&self, session: &Self::Session, selector: &str)
        -> Result<Vec<Self::Handle>>;

    /// First element matching a CSS selector, if any.
    async fn query_one(
        &self,
        session: &Self::Session,
        selector: &str,
    ) -> Result<Option<Self::Handle>>;

    /// All descendants of `scope` matching a CSS selector.
    async fn query_within(
        &self,
        session: &Self::Session,
        scope: &Self::Handle,
        selector: &str,
    ) -> Result<Vec<Self::Handle>>;

    /// Direct element children of `handle`.
    async fn children(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Vec<Self::Handle>>;

    /// Evaluate a predicate against the whole live DOM and return matches.
    async fn query_where(
        &self,
        session: &Self::Session,
        predicate: DomPredicate,
    ) -> Result<Vec<Self::Handle>>;

    async fn tag_name(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String>;

    /// Visible text, untrimmed.
    async fn text(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String>;

    async fn attribute(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>>;

    /// Bounding box, or `None` when the element has no layout.
    async fn bounding_box(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Option<Rect>>;

    async fn is_displayed(&self, session: &Self::Session, handle: &Self::Handle) -> Result<bool>;

    async fn is_enabled(&self, session: &Self::Session, handle: &Self::Handle) -> Result<bool>;

    /// A single resolved computed-style property value.
    async fn computed_style(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
        property: &str,
    ) -> Result<String>;

    /// Ancestor chain from the element's parent up to (excluding) the body.
    async fn ancestors(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Vec<AncestorInfo>>;

    /// Structural path from the document root (XPath-shaped).
    async fn dom_path(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String>;

    /// Generated CSS path (id shortcut or nth-of-type chain).
    async fn css_path(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String>;

    /// Direct (input-level) click.
    async fn click(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()>;

    /// Forced script-level click, used as the fallback when a direct click
    /// is intercepted.
    async fn force_click(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()>;

    async fn scroll_into_view(&self, session: &Self::Session, handle: &Self::Handle)
        -> Result<()>;

    /// Override display/visibility/opacity/transform and elevate stacking so
    /// the element becomes measurable. Original inline styles are remembered
    /// for [`clear_visual_overrides`](Backend::clear_visual_overrides).
    async fn force_visible(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()>;

    /// Force the element and every ancestor into a visible, untransformed,
    /// normal-stacking state.
    async fn force_visible_chain(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()>;

    /// Best-effort restoration of styles changed by a visibility override.
    async fn clear_visual_overrides(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()>;

    /// Best-effort pause of auto-rotation inside a container: library pause
    /// calls, CSS animation-state override, interval clearing, autoplay stop
    /// on known slider objects. All available mechanisms are applied.
    async fn pause_animations(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()>;

    fn is_running(&self) -> bool;

    async fn close(&mut self) -> Result<()>;
}
