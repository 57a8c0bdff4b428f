use crate::core::{AncestorInfo, Backend, Config, DomPredicate, Rect};
use crate::errors::{Result, TesterError};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde_json::Value;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

/// Handle tagging: every element a query returns gets a synthetic
/// `data-dc-handle` attribute, and later per-element scripts resolve it by
/// that attribute. A handle that no longer resolves maps to a stale error.
const TAG_FN: &str = r#"
const tag = (el) => {
    let id = el.getAttribute('data-dc-handle');
    if (!id) {
        window.__dcSeq = (window.__dcSeq || 0) + 1;
        id = 'dc-' + window.__dcSeq;
        el.setAttribute('data-dc-handle', id);
    }
    return id;
};
"#;

const STALE_SENTINEL: &str = "__stale__";

fn document_script(body: &str) -> String {
    format!("(() => {{ {TAG_FN} {body} }})()")
}

fn element_script(handle: &str, body: &str) -> String {
    format!(
        "(() => {{ {TAG_FN} \
         const el = document.querySelector('[data-dc-handle=\"{handle}\"]'); \
         if (!el) return JSON.stringify('{STALE_SENTINEL}'); \
         {body} }})()"
    )
}

/// Quote an arbitrary string as a JavaScript string literal.
fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Chrome implementation of the browser backend. One launched browser,
/// one tab per session.
pub struct ChromeBackend {
    browser: Option<Browser>,
    default_timeout: Duration,
}

impl ChromeBackend {
    pub fn new() -> Self {
        Self {
            browser: None,
            default_timeout: Duration::from_secs(30),
        }
    }

    fn eval_json(&self, tab: &Arc<Tab>, script: &str) -> Result<Value> {
        let result = tab
            .evaluate(script, false)
            .map_err(|e| TesterError::ScriptFailed(e.to_string()))?;
        let raw = result.value.unwrap_or(Value::Null);
        let text = raw.as_str().ok_or_else(|| {
            TesterError::ScriptFailed("script did not return a string".to_string())
        })?;
        let value: Value = serde_json::from_str(text)?;
        if value.as_str() == Some(STALE_SENTINEL) {
            return Err(TesterError::StaleElement(
                "element is no longer attached to the document".to_string(),
            ));
        }
        Ok(value)
    }

    fn handles_from(&self, value: Value) -> Result<Vec<String>> {
        let array = value.as_array().ok_or_else(|| {
            TesterError::ScriptFailed("expected an array of element handles".to_string())
        })?;
        Ok(array
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    fn element_string(&self, tab: &Arc<Tab>, handle: &str, body: &str) -> Result<String> {
        let value = self.eval_json(tab, &element_script(handle, body))?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    fn element_bool(&self, tab: &Arc<Tab>, handle: &str, body: &str) -> Result<bool> {
        let value = self.eval_json(tab, &element_script(handle, body))?;
        Ok(value.as_bool().unwrap_or(false))
    }
}

impl Default for ChromeBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for ChromeBackend {
    type Session = Arc<Tab>;
    type Handle = String;

    async fn launch(&mut self, config: &Config) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.browser.viewport.width, config.browser.viewport.height
        );

        let user_agent_arg = config
            .browser
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={ua}"));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];
        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }
        for arg in &config.browser.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.browser.headless)
            .args(args)
            .build()
            .map_err(|e| TesterError::LaunchFailed(e.to_string()))?;

        let browser =
            Browser::new(launch_options).map_err(|e| TesterError::LaunchFailed(e.to_string()))?;

        self.browser = Some(browser);
        self.default_timeout = Duration::from_millis(config.browser.launch_timeout_ms);
        Ok(())
    }

    async fn new_session(&self) -> Result<Self::Session> {
        let browser = self
            .browser
            .as_ref()
            .ok_or(TesterError::BrowserNotLaunched)?;
        let tab = browser
            .new_tab()
            .map_err(|e| TesterError::SessionCreationFailed(e.to_string()))?;
        tab.set_default_timeout(self.default_timeout);
        Ok(tab)
    }

    async fn close_session(&self, session: Self::Session) -> Result<()> {
        session
            .close(true)
            .map_err(|e| TesterError::SessionCreationFailed(e.to_string()))?;
        Ok(())
    }

    async fn navigate(&self, session: &Self::Session, url: &str) -> Result<()> {
        session
            .navigate_to(url)
            .map_err(|e| TesterError::NavigationFailed(e.to_string()))?;
        session
            .wait_until_navigated()
            .map_err(|e| TesterError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self, session: &Self::Session) -> Result<String> {
        Ok(session.get_url())
    }

    async fn title(&self, session: &Self::Session) -> Result<String> {
        let value = self.eval_json(
            session,
            "(() => JSON.stringify(document.title || ''))()",
        )?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }

    async fn query_all(&self, session: &Self::Session, selector: &str) -> Result<Vec<String>> {
        let sel = js_string(selector);
        let body = format!(
            "const out = []; \
             for (const el of document.querySelectorAll({sel})) out.push(tag(el)); \
             return JSON.stringify(out);"
        );
        let value = self.eval_json(session, &document_script(&body))?;
        self.handles_from(value)
    }

    async fn query_one(&self, session: &Self::Session, selector: &str) -> Result<Option<String>> {
        let sel = js_string(selector);
        let body = format!(
            "const el = document.querySelector({sel}); \
             return JSON.stringify(el ? tag(el) : null);"
        );
        let value = self.eval_json(session, &document_script(&body))?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn query_within(
        &self,
        session: &Self::Session,
        scope: &Self::Handle,
        selector: &str,
    ) -> Result<Vec<String>> {
        let sel = js_string(selector);
        let body = format!(
            "const out = []; \
             for (const child of el.querySelectorAll({sel})) out.push(tag(child)); \
             return JSON.stringify(out);"
        );
        let value = self.eval_json(session, &element_script(scope, &body))?;
        self.handles_from(value)
    }

    async fn children(&self, session: &Self::Session, handle: &Self::Handle) -> Result<Vec<String>> {
        let body = "const out = []; \
                    for (const child of el.children) out.push(tag(child)); \
                    return JSON.stringify(out);";
        let value = self.eval_json(session, &element_script(handle, body))?;
        self.handles_from(value)
    }

    async fn query_where(
        &self,
        session: &Self::Session,
        predicate: DomPredicate,
    ) -> Result<Vec<String>> {
        let body = match predicate {
            DomPredicate::PointerCursor => {
                "const out = []; \
                 for (const el of document.querySelectorAll('*')) { \
                     const style = window.getComputedStyle(el); \
                     if (style.cursor !== 'pointer') continue; \
                     const rect = el.getBoundingClientRect(); \
                     if (rect.width > 0 && rect.height > 0) out.push(tag(el)); \
                 } \
                 return JSON.stringify(out);"
            }
            DomPredicate::ClickHandler => {
                "const out = []; \
                 for (const el of document.querySelectorAll('*')) { \
                     if (el.onclick || el.getAttribute('onclick') || \
                         el.getAttribute('onmousedown') || el.getAttribute('onmouseup') || \
                         el.getAttribute('data-action') || el.getAttribute('data-click') || \
                         el.getAttribute('data-href')) out.push(tag(el)); \
                 } \
                 return JSON.stringify(out);"
            }
        };
        let value = self.eval_json(session, &document_script(body))?;
        self.handles_from(value)
    }

    async fn tag_name(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        self.element_string(
            session,
            handle,
            "return JSON.stringify(el.tagName.toLowerCase());",
        )
    }

    async fn text(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        self.element_string(
            session,
            handle,
            "return JSON.stringify(el.innerText || el.textContent || '');",
        )
    }

    async fn attribute(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
        name: &str,
    ) -> Result<Option<String>> {
        let name_js = js_string(name);
        let body = format!("return JSON.stringify(el.getAttribute({name_js}));");
        let value = self.eval_json(session, &element_script(handle, &body))?;
        Ok(value.as_str().map(str::to_string))
    }

    async fn bounding_box(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Option<Rect>> {
        let body = "const rect = el.getBoundingClientRect(); \
                    return JSON.stringify({x: rect.x, y: rect.y, width: rect.width, height: rect.height});";
        let value = self.eval_json(session, &element_script(handle, body))?;
        if value.is_null() {
            return Ok(None);
        }
        let rect = serde_json::from_value(value)?;
        Ok(Some(rect))
    }

    async fn is_displayed(&self, session: &Self::Session, handle: &Self::Handle) -> Result<bool> {
        self.element_bool(
            session,
            handle,
            "const style = window.getComputedStyle(el); \
             const rect = el.getBoundingClientRect(); \
             return JSON.stringify(style.display !== 'none' && \
                 style.visibility !== 'hidden' && style.opacity !== '0' && \
                 rect.width > 0 && rect.height > 0);",
        )
    }

    async fn is_enabled(&self, session: &Self::Session, handle: &Self::Handle) -> Result<bool> {
        self.element_bool(
            session,
            handle,
            "return JSON.stringify(!el.disabled && el.getAttribute('aria-disabled') !== 'true');",
        )
    }

    async fn computed_style(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
        property: &str,
    ) -> Result<String> {
        let prop = js_string(property);
        let body = format!(
            "return JSON.stringify(window.getComputedStyle(el).getPropertyValue({prop}));"
        );
        self.element_string(session, handle, &body)
    }

    async fn ancestors(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<Vec<AncestorInfo>> {
        let body = "const out = []; \
                    let cur = el.parentElement; \
                    while (cur && cur !== document.documentElement) { \
                        out.push({ \
                            tag: cur.tagName.toLowerCase(), \
                            classes: cur.getAttribute('class') || '', \
                            id: cur.id || '', \
                            role: cur.getAttribute('role') || '' \
                        }); \
                        cur = cur.parentElement; \
                    } \
                    return JSON.stringify(out);";
        let value = self.eval_json(session, &element_script(handle, body))?;
        let ancestors = serde_json::from_value(value)?;
        Ok(ancestors)
    }

    async fn dom_path(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        let body = "const parts = []; \
                    let cur = el; \
                    while (cur && cur.nodeType === Node.ELEMENT_NODE) { \
                        if (cur.id) { parts.unshift('/*[@id=\"' + cur.id + '\"]'); return JSON.stringify('/' + parts.join('/')); } \
                        let index = 1; \
                        let sib = cur.previousElementSibling; \
                        while (sib) { if (sib.tagName === cur.tagName) index++; sib = sib.previousElementSibling; } \
                        parts.unshift(cur.tagName.toLowerCase() + '[' + index + ']'); \
                        cur = cur.parentElement; \
                    } \
                    return JSON.stringify('/' + parts.join('/'));";
        self.element_string(session, handle, body)
    }

    async fn css_path(&self, session: &Self::Session, handle: &Self::Handle) -> Result<String> {
        let body = "const parts = []; \
                    let cur = el; \
                    while (cur && cur.nodeType === Node.ELEMENT_NODE && cur.tagName.toLowerCase() !== 'html') { \
                        if (cur.id) { parts.unshift('#' + CSS.escape(cur.id)); break; } \
                        let index = 1; \
                        let sib = cur.previousElementSibling; \
                        while (sib) { index++; sib = sib.previousElementSibling; } \
                        parts.unshift(cur.tagName.toLowerCase() + ':nth-child(' + index + ')'); \
                        cur = cur.parentElement; \
                    } \
                    return JSON.stringify(parts.join(' > '));";
        self.element_string(session, handle, body)
    }

    async fn click(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        let selector = format!("[data-dc-handle=\"{handle}\"]");
        let element = session
            .find_element(&selector)
            .map_err(|e| TesterError::StaleElement(e.to_string()))?;
        element
            .click()
            .map_err(|e| TesterError::ClickIntercepted(e.to_string()))?;
        Ok(())
    }

    async fn force_click(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        self.eval_json(
            session,
            &element_script(handle, "el.click(); return JSON.stringify(true);"),
        )?;
        Ok(())
    }

    async fn scroll_into_view(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        self.eval_json(
            session,
            &element_script(
                handle,
                "el.scrollIntoView({block: 'center', behavior: 'smooth'}); \
                 return JSON.stringify(true);",
            ),
        )?;
        Ok(())
    }

    async fn force_visible(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        let body = format!("{REVEAL_FN} reveal(el); return JSON.stringify(true);");
        self.eval_json(session, &element_script(handle, &body))?;
        Ok(())
    }

    async fn force_visible_chain(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()> {
        let body = format!(
            "{REVEAL_FN} \
             reveal(el); \
             let cur = el.parentElement; \
             while (cur && cur.tagName.toLowerCase() !== 'body') {{ reveal(cur); cur = cur.parentElement; }} \
             return JSON.stringify(true);"
        );
        self.eval_json(session, &element_script(handle, &body))?;
        Ok(())
    }

    async fn clear_visual_overrides(
        &self,
        session: &Self::Session,
        handle: &Self::Handle,
    ) -> Result<()> {
        let body = "const restore = (node) => { \
                        if (node.hasAttribute('data-dc-style-backup')) { \
                            node.style.cssText = node.getAttribute('data-dc-style-backup'); \
                            node.removeAttribute('data-dc-style-backup'); \
                        } \
                    }; \
                    restore(el); \
                    let cur = el.parentElement; \
                    while (cur && cur.tagName.toLowerCase() !== 'body') { restore(cur); cur = cur.parentElement; } \
                    return JSON.stringify(true);";
        self.eval_json(session, &element_script(handle, body))?;
        Ok(())
    }

    async fn pause_animations(&self, session: &Self::Session, handle: &Self::Handle) -> Result<()> {
        let body = "const freeze = (node) => { \
                        node.style.setProperty('animation-play-state', 'paused', 'important'); \
                        node.style.setProperty('transition', 'none', 'important'); \
                    }; \
                    freeze(el); \
                    for (const child of el.querySelectorAll('*')) freeze(child); \
                    try { if (window.jQuery && window.jQuery(el).carousel) window.jQuery(el).carousel('pause'); } catch (e) {} \
                    try { if (el.swiper && el.swiper.autoplay) el.swiper.autoplay.stop(); } catch (e) {} \
                    try { if (window.jQuery && window.jQuery(el).slick) window.jQuery(el).slick('slickPause'); } catch (e) {} \
                    return JSON.stringify(true);";
        self.eval_json(session, &element_script(handle, body))?;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        self.browser = None;
        Ok(())
    }
}

/// Shared by force_visible and force_visible_chain: back up the inline
/// style once, then override whatever hides the element.
const REVEAL_FN: &str = "const reveal = (node) => { \
    if (!node.hasAttribute('data-dc-style-backup')) { \
        node.setAttribute('data-dc-style-backup', node.style.cssText); \
    } \
    if (window.getComputedStyle(node).display === 'none') { \
        node.style.setProperty('display', 'block', 'important'); \
    } \
    node.style.setProperty('visibility', 'visible', 'important'); \
    node.style.setProperty('opacity', '1', 'important'); \
    node.style.setProperty('transform', 'none', 'important'); \
    node.style.setProperty('z-index', '2147483647', 'important'); \
    node.removeAttribute('hidden'); \
    node.setAttribute('aria-hidden', 'false'); \
};";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_script_embeds_handle_and_sentinel() {
        let script = element_script("dc-7", "return JSON.stringify(true);");
        assert!(script.contains("[data-dc-handle=\"dc-7\"]"));
        assert!(script.contains(STALE_SENTINEL));
    }

    #[test]
    fn js_string_escapes_quotes() {
        assert_eq!(js_string("a\"b"), "\"a\\\"b\"");
        assert_eq!(js_string("plain"), "\"plain\"");
    }

    #[test]
    fn unlaunched_backend_is_not_running() {
        let backend = ChromeBackend::new();
        assert!(!backend.is_running());
    }
}
