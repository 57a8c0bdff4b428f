//! Clickable-element discovery and dead-click detection for rendered web
//! pages.
//!
//! The crate drives a real browser (or any [`core::Backend`]
//! implementation) through three phases: discover everything on a page
//! that looks clickable, click each element on a pool of parallel browser
//! sessions, and classify what every click actually did.

pub mod backend;
pub mod classifier;
pub mod core;
pub mod descriptor;
pub mod discovery;
pub mod errors;
pub mod linkcheck;
pub mod locator;
pub mod report;
pub mod scheduler;
pub mod testing;

pub use backend::ChromeBackend;
pub use classifier::{is_dead_click_by_href, ClickClassifier, ClickOutcome, ClickResult};
pub use crate::core::{Backend, Config};
pub use descriptor::{DetectionMethod, ElementDescriptor, Fingerprint};
pub use discovery::DiscoveryEngine;
pub use errors::{Result, TesterError};
pub use linkcheck::LinkProber;
pub use locator::ElementLocator;
pub use report::{Summary, TestRun};
pub use scheduler::Scheduler;
