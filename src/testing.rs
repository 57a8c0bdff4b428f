//! In-memory backend for exercising discovery, classification, and
//! scheduling without a real browser.

use crate::core::{AncestorInfo, Backend, Config, DomPredicate, Rect};
use crate::errors::{Result, TesterError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

/// What clicking a mock element does to its page.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ClickEffect {
    #[default]
    None,
    /// The click navigates the session to this URL.
    Navigate(String),
    /// The click changes the document title.
    SetTitle(String),
    /// The click makes the element at this index appear.
    Reveal(usize),
    /// The click toggles a class on the clicked element.
    ToggleClass(String),
    /// Both native and scripted clicks fail.
    Intercept,
}

#[derive(Debug, Clone)]
pub struct MockElement {
    pub tag: String,
    pub text: String,
    pub classes: String,
    pub id: String,
    pub attrs: HashMap<String, String>,
    pub styles: HashMap<String, String>,
    pub visible: bool,
    pub enabled: bool,
    /// Absent elements are invisible to every query until revealed.
    pub present: bool,
    pub rect: Option<Rect>,
    pub parent: Option<usize>,
    pub effect: ClickEffect,
}

impl MockElement {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            text: String::new(),
            classes: String::new(),
            id: String::new(),
            attrs: HashMap::new(),
            styles: HashMap::new(),
            visible: true,
            enabled: true,
            present: true,
            rect: Some(Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 20.0,
            }),
            parent: Some(0),
            effect: ClickEffect::None,
        }
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn classes(mut self, classes: &str) -> Self {
        self.classes = classes.to_string();
        self
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = id.to_string();
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn href(self, href: &str) -> Self {
        self.attr("href", href)
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles.insert(property.to_string(), value.to_string());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn absent(mut self) -> Self {
        self.present = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn parent(mut self, index: usize) -> Self {
        self.parent = Some(index);
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.effect = effect;
        self
    }
}

#[derive(Debug, Clone)]
pub struct MockPage {
    pub title: String,
    pub elements: Vec<MockElement>,
}

impl MockPage {
    /// Element 0 is always the document body; `elements` land at indices
    /// starting from 1 and default to the body as parent.
    pub fn new(title: &str, elements: Vec<MockElement>) -> Self {
        let mut body = MockElement::new("body");
        body.parent = None;
        body.rect = Some(Rect {
            x: 0.0,
            y: 0.0,
            width: 1920.0,
            height: 1080.0,
        });
        let mut all = vec![body];
        all.extend(elements);
        Self {
            title: title.to_string(),
            elements: all,
        }
    }
}

struct MockSession {
    url: String,
    title: String,
    elements: Vec<MockElement>,
    generation: u64,
    open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockHandle {
    session: usize,
    index: usize,
    generation: u64,
}

struct MockState {
    pages: HashMap<String, MockPage>,
    sessions: Vec<MockSession>,
    launched: bool,
    session_limit: Option<usize>,
}

/// A backend over a fixed set of registered pages. Each session holds its
/// own copy of the page it last navigated to; navigation bumps a generation
/// counter so handles from before the navigation go stale.
pub struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                pages: HashMap::new(),
                sessions: Vec::new(),
                launched: false,
                session_limit: None,
            }),
        }
    }

    pub fn register_page(&self, url: &str, page: MockPage) {
        let mut state = self.lock();
        state.pages.insert(url.to_string(), page);
    }

    /// Sessions created but not yet closed. Lets tests assert that the
    /// scheduler releases its pool.
    pub fn open_sessions(&self) -> usize {
        self.lock().sessions.iter().filter(|s| s.open).count()
    }

    /// Cap the number of sessions that can ever be created; further
    /// `new_session` calls fail. Lets tests exercise pool exhaustion.
    pub fn limit_sessions(&self, limit: usize) {
        self.lock().session_limit = Some(limit);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn resolve<'a>(
        state: &'a MockState,
        session: usize,
        handle: &MockHandle,
    ) -> Result<&'a MockElement> {
        let sess = state
            .sessions
            .get(session)
            .ok_or_else(|| TesterError::PoolError("unknown session".to_string()))?;
        if handle.session != session || handle.generation != sess.generation {
            return Err(TesterError::StaleElement(
                "handle predates the current page".to_string(),
            ));
        }
        let element = sess
            .elements
            .get(handle.index)
            .ok_or_else(|| TesterError::ElementNotFound("no such element".to_string()))?;
        if !element.present {
            return Err(TesterError::StaleElement(
                "element is not attached".to_string(),
            ));
        }
        Ok(element)
    }

    fn handle(session: usize, index: usize, generation: u64) -> MockHandle {
        MockHandle {
            session,
            index,
            generation,
        }
    }

    fn synthetic_css_path(index: usize) -> String {
        format!("body > *:nth-child({index})")
    }

    fn attr_value(element: &MockElement, name: &str) -> Option<String> {
        match name {
            "id" if !element.id.is_empty() => Some(element.id.clone()),
            "id" => None,
            "class" if !element.classes.is_empty() => Some(element.classes.clone()),
            "class" => None,
            _ => element.attrs.get(name).cloned(),
        }
    }

    fn matches_simple(element: &MockElement, selector: &str) -> bool {
        let selector = selector.trim();
        if selector.is_empty() {
            return false;
        }
        if selector == "*" {
            return true;
        }
        // Combinators and pseudo-classes are out of scope for the mock
        // matcher; synthesized css paths are handled by exact match in the
        // query methods.
        if selector.contains(' ') || selector.contains('>') || selector.contains(':') {
            return false;
        }

        let mut rest = selector;
        let tag_end = rest
            .find(|c| c == '.' || c == '#' || c == '[')
            .unwrap_or(rest.len());
        let tag = &rest[..tag_end];
        if !tag.is_empty() && tag != element.tag {
            return false;
        }
        rest = &rest[tag_end..];

        while !rest.is_empty() {
            if let Some(stripped) = rest.strip_prefix('.') {
                let end = stripped
                    .find(|c| c == '.' || c == '#' || c == '[')
                    .unwrap_or(stripped.len());
                let class = &stripped[..end];
                if !element.classes.split_whitespace().any(|c| c == class) {
                    return false;
                }
                rest = &stripped[end..];
            } else if let Some(stripped) = rest.strip_prefix('#') {
                let end = stripped
                    .find(|c| c == '.' || c == '[')
                    .unwrap_or(stripped.len());
                if element.id != stripped[..end] {
                    return false;
                }
                rest = &stripped[end..];
            } else if let Some(stripped) = rest.strip_prefix('[') {
                let end = match stripped.find(']') {
                    Some(end) => end,
                    None => return false,
                };
                if !Self::matches_attr_test(element, &stripped[..end]) {
                    return false;
                }
                rest = &stripped[end + 1..];
            } else {
                return false;
            }
        }
        true
    }

    fn matches_attr_test(element: &MockElement, test: &str) -> bool {
        let unquote = |v: &str| v.trim_matches('"').trim_matches('\'').to_string();
        if let Some((name, value)) = test.split_once("*=") {
            let value = unquote(value);
            return Self::attr_value(element, name.trim())
                .map(|actual| actual.contains(&value))
                .unwrap_or(false);
        }
        if let Some((name, value)) = test.split_once('=') {
            let value = unquote(value);
            return Self::attr_value(element, name.trim())
                .map(|actual| actual == value)
                .unwrap_or(false);
        }
        Self::attr_value(element, test.trim()).is_some()
    }

    fn matches(element: &MockElement, selector_list: &str) -> bool {
        selector_list
            .split(',')
            .any(|sel| Self::matches_simple(element, sel))
    }

    fn is_descendant_of(elements: &[MockElement], index: usize, ancestor: usize) -> bool {
        let mut cur = elements.get(index).and_then(|e| e.parent);
        while let Some(parent) = cur {
            if parent == ancestor {
                return true;
            }
            cur = elements.get(parent).and_then(|e| e.parent);
        }
        false
    }

    fn load_page(state: &mut MockState, session: usize, url: &str) -> Result<()> {
        let page = state
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| TesterError::NavigationFailed(format!("no page registered for {url}")))?;
        let sess = &mut state.sessions[session];
        sess.url = url.to_string();
        sess.title = page.title;
        sess.elements = page.elements;
        sess.generation += 1;
        Ok(())
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    type Session = usize;
    type Handle = MockHandle;

    async fn launch(&mut self, _config: &Config) -> Result<()> {
        self.lock().launched = true;
        Ok(())
    }

    async fn new_session(&self) -> Result<Self::Session> {
        let mut state = self.lock();
        if let Some(limit) = state.session_limit {
            if state.sessions.len() >= limit {
                return Err(TesterError::SessionCreationFailed(
                    "session limit reached".to_string(),
                ));
            }
        }
        state.sessions.push(MockSession {
            url: String::new(),
            title: String::new(),
            elements: Vec::new(),
            generation: 0,
            open: true,
        });
        Ok(state.sessions.len() - 1)
    }

    async fn close_session(&self, session: Self::Session) -> Result<()> {
        let mut state = self.lock();
        if let Some(sess) = state.sessions.get_mut(session) {
            sess.open = false;
        }
        Ok(())
    }

    async fn navigate(&self, session: &Self::Session, url: &str) -> Result<()> {
        let mut state = self.lock();
        Self::load_page(&mut state, *session, url)
    }

    async fn current_url(&self, session: &Self::Session) -> Result<String> {
        Ok(self.lock().sessions[*session].url.clone())
    }

    async fn title(&self, session: &Self::Session) -> Result<String> {
        Ok(self.lock().sessions[*session].title.clone())
    }

    async fn query_all(&self, session: &Self::Session, selector: &str) -> Result<Vec<MockHandle>> {
        let state = self.lock();
        let sess = &state.sessions[*session];
        let mut out = Vec::new();
        for (index, element) in sess.elements.iter().enumerate() {
            if !element.present {
                continue;
            }
            if Self::matches(element, selector)
                || Self::synthetic_css_path(index) == selector
            {
                out.push(Self::handle(*session, index, sess.generation));
            }
        }
        Ok(out)
    }

    async fn query_one(
        &self,
        session: &Self::Session,
        selector: &str,
    ) -> Result<Option<MockHandle>> {
        Ok(self.query_all(session, selector).await?.into_iter().next())
    }

    async fn query_within(
        &self,
        session: &Self::Session,
        scope: &Self::Handle,
        selector: &str,
    ) -> Result<Vec<MockHandle>> {
        let state = self.lock();
        Self::resolve(&state, *session, scope)?;
        let sess = &state.sessions[*session];
        let mut out = Vec::new();
        for (index, element) in sess.elements.iter().enumerate() {
            if !element.present || index == scope.index {
                continue;
            }
            if !Self::is_descendant_of(&sess.elements, index, scope.index) {
                continue;
            }
            if Self::matches(element, selector) {
                out.push(Self::handle(*session, index, sess.generation));
            }
        }
        Ok(out)
    }

    async fn children(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Vec<MockHandle>> {
        let state = self.lock();
        Self::resolve(&state, *session, handle)?;
        let sess = &state.sessions[*session];
        let mut out = Vec::new();
        for (index, element) in sess.elements.iter().enumerate() {
            if element.present && element.parent == Some(handle.index) {
                out.push(Self::handle(*session, index, sess.generation));
            }
        }
        Ok(out)
    }

    async fn query_where(
        &self,
        session: &Self::Session,
        predicate: DomPredicate,
    ) -> Result<Vec<MockHandle>> {
        let state = self.lock();
        let sess = &state.sessions[*session];
        let mut out = Vec::new();
        for (index, element) in sess.elements.iter().enumerate() {
            if !element.present {
                continue;
            }
            let hit = match predicate {
                DomPredicate::PointerCursor => {
                    element.styles.get("cursor").map(String::as_str) == Some("pointer")
                        && element.visible
                        && element.rect.map(|r| r.width > 0.0).unwrap_or(false)
                }
                DomPredicate::ClickHandler => ["onclick", "data-action", "data-click", "data-href"]
                    .iter()
                    .any(|name| element.attrs.contains_key(*name)),
            };
            if hit {
                out.push(Self::handle(*session, index, sess.generation));
            }
        }
        Ok(out)
    }

    async fn tag_name(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        let state = self.lock();
        Ok(Self::resolve(&state, *session, handle)?.tag.clone())
    }

    async fn text(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        let state = self.lock();
        Ok(Self::resolve(&state, *session, handle)?.text.clone())
    }

    async fn attribute(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>> {
        let state = self.lock();
        let element = Self::resolve(&state, *session, handle)?;
        Ok(Self::attr_value(element, name))
    }

    async fn bounding_box(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Option<Rect>> {
        let state = self.lock();
        Ok(Self::resolve(&state, *session, handle)?.rect)
    }

    async fn is_displayed(&self, session: &Self::Session, handle: &Self::Handle) -> Result<bool> {
        let state = self.lock();
        Ok(Self::resolve(&state, *session, handle)?.visible)
    }

    async fn is_enabled(&self, session: &Self::Session, handle: &Self::Handle) -> Result<bool> {
        let state = self.lock();
        Ok(Self::resolve(&state, *session, handle)?.enabled)
    }

    async fn computed_style(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
        property: &str,
    ) -> Result<String> {
        let state = self.lock();
        let element = Self::resolve(&state, *session, handle)?;
        Ok(element.styles.get(property).cloned().unwrap_or_default())
    }

    async fn ancestors(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Vec<AncestorInfo>> {
        let state = self.lock();
        Self::resolve(&state, *session, handle)?;
        let sess = &state.sessions[*session];
        let mut out = Vec::new();
        let mut cur = sess.elements[handle.index].parent;
        while let Some(index) = cur {
            let element = &sess.elements[index];
            out.push(AncestorInfo {
                tag: element.tag.clone(),
                classes: element.classes.clone(),
                id: element.id.clone(),
                role: element.attrs.get("role").cloned().unwrap_or_default(),
            });
            cur = element.parent;
        }
        Ok(out)
    }

    async fn dom_path(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        let state = self.lock();
        Self::resolve(&state, *session, handle)?;
        Ok(format!("/body/*[{}]", handle.index))
    }

    async fn css_path(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        let state = self.lock();
        Self::resolve(&state, *session, handle)?;
        Ok(Self::synthetic_css_path(handle.index))
    }

    async fn click(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        let mut state = self.lock();
        let effect = {
            let element = Self::resolve(&state, *session, handle)?;
            element.effect.clone()
        };
        match effect {
            ClickEffect::None => Ok(()),
            ClickEffect::Intercept => Err(TesterError::ClickIntercepted(
                "another element would receive the click".to_string(),
            )),
            ClickEffect::Navigate(url) => Self::load_page(&mut state, *session, &url),
            ClickEffect::SetTitle(title) => {
                state.sessions[*session].title = title;
                Ok(())
            }
            ClickEffect::Reveal(index) => {
                let sess = &mut state.sessions[*session];
                if let Some(target) = sess.elements.get_mut(index) {
                    target.present = true;
                    target.visible = true;
                }
                Ok(())
            }
            ClickEffect::ToggleClass(class) => {
                let sess = &mut state.sessions[*session];
                let element = &mut sess.elements[handle.index];
                let mut classes: Vec<&str> = element.classes.split_whitespace().collect();
                if let Some(pos) = classes.iter().position(|c| *c == class) {
                    classes.remove(pos);
                    element.classes = classes.join(" ");
                } else {
                    element.classes = format!("{} {}", element.classes, class)
                        .trim()
                        .to_string();
                }
                Ok(())
            }
        }
    }

    async fn force_click(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        {
            let state = self.lock();
            let element = Self::resolve(&state, *session, handle)?;
            if element.effect == ClickEffect::Intercept {
                return Err(TesterError::ClickIntercepted(
                    "scripted click also failed".to_string(),
                ));
            }
        }
        self.click(session, handle).await
    }

    async fn scroll_into_view(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()> {
        let state = self.lock();
        Self::resolve(&state, *session, handle)?;
        Ok(())
    }

    async fn force_visible(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        let mut state = self.lock();
        let sess = state
            .sessions
            .get_mut(*session)
            .ok_or_else(|| TesterError::PoolError("unknown session".to_string()))?;
        if handle.generation != sess.generation {
            return Err(TesterError::StaleElement(
                "handle predates the current page".to_string(),
            ));
        }
        let element = sess
            .elements
            .get_mut(handle.index)
            .ok_or_else(|| TesterError::ElementNotFound("no such element".to_string()))?;
        element.visible = true;
        if element.rect.is_none() {
            element.rect = Some(Rect {
                x: 0.0,
                y: 0.0,
                width: 100.0,
                height: 20.0,
            });
        }
        Ok(())
    }

    async fn force_visible_chain(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()> {
        self.force_visible(session, handle).await?;
        let parents: Vec<usize> = {
            let state = self.lock();
            let sess = &state.sessions[*session];
            let mut chain = Vec::new();
            let mut cur = sess.elements[handle.index].parent;
            while let Some(index) = cur {
                chain.push(index);
                cur = sess.elements[index].parent;
            }
            chain
        };
        let mut state = self.lock();
        let sess = &mut state.sessions[*session];
        for index in parents {
            sess.elements[index].visible = true;
        }
        Ok(())
    }

    async fn clear_visual_overrides(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()> {
        let state = self.lock();
        Self::resolve(&state, *session, handle)?;
        Ok(())
    }

    async fn pause_animations(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()> {
        let state = self.lock();
        Self::resolve(&state, *session, handle)?;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().launched
    }

    async fn close(&mut self) -> Result<()> {
        self.lock().launched = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> MockPage {
        MockPage::new(
            "Home",
            vec![
                MockElement::new("a").text("About").href("/about").id("about"),
                MockElement::new("button")
                    .text("Buy")
                    .classes("btn btn-primary"),
            ],
        )
    }

    #[tokio::test]
    async fn selector_matching_covers_tag_class_id_attr() {
        let backend = MockBackend::new();
        backend.register_page("https://example.com", page());
        let session = backend.new_session().await.unwrap();
        backend
            .navigate(&session, "https://example.com")
            .await
            .unwrap();

        assert_eq!(backend.query_all(&session, "a").await.unwrap().len(), 1);
        assert_eq!(
            backend.query_all(&session, ".btn-primary").await.unwrap().len(),
            1
        );
        assert_eq!(backend.query_all(&session, "#about").await.unwrap().len(), 1);
        assert_eq!(
            backend.query_all(&session, "a[href]").await.unwrap().len(),
            1
        );
        assert_eq!(
            backend
                .query_all(&session, "[href=\"/about\"]")
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            backend
                .query_all(&session, "button, a")
                .await
                .unwrap()
                .len(),
            2
        );
        assert!(backend.query_all(&session, "input").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn navigation_invalidates_old_handles() {
        let backend = MockBackend::new();
        backend.register_page("https://example.com", page());
        let session = backend.new_session().await.unwrap();
        backend
            .navigate(&session, "https://example.com")
            .await
            .unwrap();

        let handle = backend
            .query_one(&session, "#about")
            .await
            .unwrap()
            .unwrap();
        backend
            .navigate(&session, "https://example.com")
            .await
            .unwrap();

        let err = backend.tag_name(&session, &handle).await.unwrap_err();
        assert!(matches!(err, TesterError::StaleElement(_)));
    }

    #[tokio::test]
    async fn sessions_are_isolated() {
        let backend = MockBackend::new();
        backend.register_page(
            "https://example.com",
            MockPage::new(
                "Home",
                vec![MockElement::new("a")
                    .text("About")
                    .href("/about")
                    .id("about")
                    .on_click(ClickEffect::Navigate("https://example.com/about".to_string()))],
            ),
        );
        backend.register_page("https://example.com/about", MockPage::new("About", vec![]));
        let a = backend.new_session().await.unwrap();
        let b = backend.new_session().await.unwrap();
        backend.navigate(&a, "https://example.com").await.unwrap();
        backend.navigate(&b, "https://example.com").await.unwrap();

        let handle = backend.query_one(&a, "#about").await.unwrap().unwrap();
        backend.click(&a, &handle).await.unwrap();

        assert_eq!(
            backend.current_url(&a).await.unwrap(),
            "https://example.com/about"
        );
        assert_eq!(
            backend.current_url(&b).await.unwrap(),
            "https://example.com"
        );
    }
}
