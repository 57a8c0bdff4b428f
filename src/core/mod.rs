pub mod backend;
pub mod config;

pub use backend::{AncestorInfo, Backend, DomPredicate, Rect};
pub use config::{BrowserConfig, Config, DiscoveryConfig, TestConfig, Viewport};
