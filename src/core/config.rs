use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub browser: BrowserConfig,
    pub discovery: DiscoveryConfig,
    pub test: TestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
    pub launch_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Bounded wait for a body element after navigation. Expiry is non-fatal.
    pub body_wait_ms: u64,
    /// Fixed settle delay for dynamic content once the body exists.
    pub settle_ms: u64,
    /// Visible text is trimmed and truncated to this many characters at capture.
    pub max_text_len: usize,
    /// Delay after forcing a slide visible, before extracting its descendants.
    pub slide_settle_ms: u64,
    /// Annotate http(s) link descriptors with a HEAD-request status chain.
    pub check_links: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestConfig {
    /// Number of independent automation sessions the scheduler acquires.
    pub concurrency: usize,
    /// Settle delay after a worker re-navigates to the target page.
    pub renavigate_settle_ms: u64,
    /// Delay after scrolling an element into view, before the clickability recheck.
    pub scroll_settle_ms: u64,
    /// Delay after a click, before reading URL/title and probing for overlays.
    pub post_click_wait_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: None,
            args: vec![],
            launch_timeout_ms: 30000,
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            body_wait_ms: 10000,
            settle_ms: 5000,
            max_text_len: 100,
            slide_settle_ms: 1000,
            check_links: false,
        }
    }
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            renavigate_settle_ms: 2000,
            scroll_settle_ms: 1000,
            post_click_wait_ms: 2000,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}
