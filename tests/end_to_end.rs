//! End-to-end discovery and classification against the in-memory backend.

use deadclick::classifier::{ClickClassifier, ClickOutcome};
use deadclick::core::{Backend, Config};
use deadclick::discovery::DiscoveryEngine;
use deadclick::scheduler::Scheduler;
use deadclick::testing::{ClickEffect, MockBackend, MockElement, MockPage};
use std::sync::Arc;

const HOME: &str = "https://example.com";

/// All waits shortened so a test run does not sit in sleeps.
fn test_config() -> Config {
    let mut config = Config::default();
    config.discovery.body_wait_ms = 100;
    config.discovery.settle_ms = 0;
    config.discovery.slide_settle_ms = 0;
    config.test.renavigate_settle_ms = 0;
    config.test.scroll_settle_ms = 0;
    config.test.post_click_wait_ms = 0;
    config.test.concurrency = 2;
    config
}

fn descriptor_for(
    tag: &str,
    text: &str,
    classes: &str,
    css_path: &str,
) -> deadclick::ElementDescriptor {
    deadclick::ElementDescriptor {
        tag_name: tag.to_string(),
        text: text.to_string(),
        class_names: classes.to_string(),
        id: String::new(),
        href: String::new(),
        onclick: String::new(),
        role: String::new(),
        input_type: String::new(),
        data_testid: String::new(),
        aria_label: String::new(),
        dom_path: String::new(),
        css_path: css_path.to_string(),
        position: None,
        is_displayed: true,
        is_enabled: true,
        is_carousel_element: false,
        detection_method: None,
        status_chain: None,
    }
}

fn backend_with(pages: Vec<(&str, MockPage)>) -> MockBackend {
    let backend = MockBackend::new();
    for (url, page) in pages {
        backend.register_page(url, page);
    }
    backend
}

#[tokio::test]
async fn navigation_link_and_inert_link_classify_differently() {
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("a")
                .text("About us")
                .href("/about")
                .id("about")
                .on_click(ClickEffect::Navigate(format!("{HOME}/about"))),
            MockElement::new("a").text("No-op").href("#"),
        ],
    );
    let about = MockPage::new("About", vec![]);
    let backend = backend_with(vec![(HOME, home), (&format!("{HOME}/about"), about)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();
    assert_eq!(descriptors.len(), 2);

    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, descriptors.len(), descriptors).await;

    assert_eq!(run.elements_tested, 2);
    assert_eq!(run.active_clicks, 1);
    assert_eq!(run.dead_clicks, 1);
    assert!(run.error.is_none());

    let nav = run
        .results
        .iter()
        .find(|r| r.element.id == "about")
        .unwrap();
    assert_eq!(nav.outcome, ClickOutcome::ActiveNavigation);
    assert!(nav.page_changed);
    assert_eq!(nav.url_after, format!("{HOME}/about"));

    let inert = run.results.iter().find(|r| r.element.href == "#").unwrap();
    assert_eq!(inert.outcome, ClickOutcome::DeadClick);
}

#[tokio::test]
async fn hidden_carousel_slide_link_is_discovered_and_clickable() {
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("div").classes("carousel"),
            MockElement::new("div").classes("slide").parent(1).hidden(),
            MockElement::new("a")
                .text("Promo")
                .href("/promo")
                .parent(2)
                .hidden()
                .on_click(ClickEffect::Navigate(format!("{HOME}/promo"))),
        ],
    );
    let promo = MockPage::new("Promo", vec![]);
    let backend = backend_with(vec![(HOME, home), (&format!("{HOME}/promo"), promo)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();

    let promo_link = descriptors
        .iter()
        .find(|d| d.href == "/promo")
        .expect("hidden slide link should be discovered");
    assert!(promo_link.is_carousel_element);
    assert!(promo_link.is_displayed);

    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, descriptors.len(), descriptors).await;
    let result = run
        .results
        .iter()
        .find(|r| r.element.href == "/promo")
        .unwrap();
    assert_eq!(result.outcome, ClickOutcome::ActiveNavigation);
}

#[tokio::test]
async fn identical_element_in_and_out_of_carousel_is_recorded_twice() {
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("a").text("Shop").href("/shop"),
            MockElement::new("div").classes("carousel"),
            MockElement::new("div").classes("slide").parent(2),
            MockElement::new("a").text("Shop").href("/shop").parent(3),
        ],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();

    let shop: Vec<_> = descriptors.iter().filter(|d| d.href == "/shop").collect();
    assert_eq!(shop.len(), 2);
    assert_eq!(shop[0].fingerprint(), shop[1].fingerprint());
    assert!(!shop[0].is_carousel_element);
    assert!(shop[1].is_carousel_element);
}

#[tokio::test]
async fn repeated_discovery_yields_the_same_elements() {
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("a").text("One").href("/one"),
            MockElement::new("button").text("Two").classes("btn"),
            MockElement::new("div").classes("carousel"),
            MockElement::new("div").classes("slide").parent(3).hidden(),
            MockElement::new("a").text("Three").href("/three").parent(4).hidden(),
        ],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();
    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();

    let first = engine.discover(&backend, &session, HOME).await.unwrap();
    let second = engine.discover(&backend, &session, HOME).await.unwrap();

    assert_eq!(first.len(), second.len());
    let first_prints: Vec<_> = first.iter().map(|d| d.fingerprint()).collect();
    let second_prints: Vec<_> = second.iter().map(|d| d.fingerprint()).collect();
    assert_eq!(first_prints, second_prints);
}

#[tokio::test]
async fn modal_opening_click_is_a_ui_change() {
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("button")
                .text("Open details")
                .classes("btn")
                .on_click(ClickEffect::Reveal(2)),
            MockElement::new("div").classes("modal").absent(),
        ],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();
    assert_eq!(descriptors.len(), 1);

    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, 1, descriptors).await;
    assert_eq!(run.results[0].outcome, ClickOutcome::ActiveUiChange);
    assert!(run.results[0].new_elements_appeared);
    assert!(!run.results[0].page_changed);
}

#[tokio::test]
async fn class_toggling_click_with_no_visible_effect_is_dead() {
    let home = MockPage::new(
        "Home",
        vec![MockElement::new("button")
            .text("Select")
            .classes("btn")
            .on_click(ClickEffect::ToggleClass("active".to_string()))],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();

    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, 1, descriptors).await;
    assert_eq!(run.results[0].outcome, ClickOutcome::DeadClick);
}

#[tokio::test]
async fn title_change_without_navigation_is_active() {
    let home = MockPage::new(
        "Home",
        vec![MockElement::new("button")
            .text("Rename")
            .classes("btn")
            .on_click(ClickEffect::SetTitle("Renamed".to_string()))],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();

    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, 1, descriptors).await;
    assert_eq!(run.results[0].outcome, ClickOutcome::ActiveTitleChange);
    assert!(run.results[0].page_changed);
}

#[tokio::test]
async fn inert_href_wins_even_when_the_page_reacts() {
    // The link both navigates and carries an inert href; the href verdict
    // takes priority.
    let home = MockPage::new(
        "Home",
        vec![MockElement::new("a")
            .text("Broken")
            .href("javascript:void(0)")
            .on_click(ClickEffect::SetTitle("Changed".to_string()))],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();

    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, 1, descriptors).await;
    assert_eq!(run.results[0].outcome, ClickOutcome::DeadClick);
    assert!(run.results[0]
        .error_message
        .as_deref()
        .unwrap()
        .contains("javascript:void(0)"));
}

#[tokio::test]
async fn intercepted_click_is_reported_as_intercepted() {
    let home = MockPage::new(
        "Home",
        vec![MockElement::new("button")
            .text("Covered")
            .classes("btn")
            .on_click(ClickEffect::Intercept)],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();

    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, 1, descriptors).await;
    assert_eq!(run.results[0].outcome, ClickOutcome::ClickIntercepted);
}

#[tokio::test]
async fn header_and_footer_elements_are_not_discovered() {
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("nav"),
            MockElement::new("a").text("Nav link").href("/nav").parent(1),
            MockElement::new("div").classes("site-footer"),
            MockElement::new("a")
                .text("Footer link")
                .href("/footer")
                .parent(3),
            MockElement::new("a").text("Content link").href("/content"),
        ],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();

    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0].href, "/content");
}

#[tokio::test]
async fn pointer_cursor_and_listener_elements_are_discovered() {
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("div")
                .text("Hover me")
                .style("cursor", "pointer"),
            MockElement::new("span")
                .text("Handled")
                .attr("onclick", "handle()"),
        ],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();

    // The onclick span is caught by the structural sweep; the cursor div
    // only by the pointer sweep.
    assert_eq!(descriptors.len(), 2);
    let cursor = descriptors
        .iter()
        .find(|d| d.text == "Hover me")
        .expect("cursor-styled element should be discovered");
    assert_eq!(
        cursor.detection_method,
        Some(deadclick::DetectionMethod::PointerCursor)
    );
}

#[tokio::test]
async fn missing_and_unclickable_elements_get_terminal_outcomes() {
    let home = MockPage::new(
        "Home",
        vec![MockElement::new("button")
            .text("Ghost")
            .classes("btn")
            .disabled()],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();
    let session = backend.new_session().await.unwrap();
    backend.navigate(&session, HOME).await.unwrap();

    let classifier = ClickClassifier::new(config);

    // Present but disabled.
    let mut disabled = descriptor_for("button", "Ghost", "btn", "body > *:nth-child(1)");
    let result = classifier.classify(&backend, &session, &disabled).await;
    assert_eq!(result.outcome, ClickOutcome::NotClickable);

    // Same descriptor pointed at a path that no longer resolves.
    disabled.css_path = "body > *:nth-child(99)".to_string();
    disabled.class_names.clear();
    disabled.id.clear();
    let result = classifier.classify(&backend, &session, &disabled).await;
    assert_eq!(result.outcome, ClickOutcome::ElementNotFound);
}

#[tokio::test]
async fn action_word_sweep_skips_wrappers_around_the_real_clickable() {
    // The wrapper div's text contains "Learn more" only because its span
    // child does; only the span should be captured.
    let home = MockPage::new(
        "Home",
        vec![
            MockElement::new("div").classes("carousel"),
            MockElement::new("div").classes("slide").parent(1).hidden(),
            MockElement::new("div")
                .text("Learn more about us")
                .parent(2)
                .hidden(),
            MockElement::new("span").text("Learn more").parent(3).hidden(),
        ],
    );
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();

    let learn_more: Vec<_> = descriptors
        .iter()
        .filter(|d| d.text.to_uppercase().contains("LEARN MORE"))
        .collect();
    assert_eq!(learn_more.len(), 1);
    assert_eq!(learn_more[0].tag_name, "span");
}

#[tokio::test]
async fn run_fails_cleanly_when_no_session_can_be_opened() {
    let home = MockPage::new("Home", vec![MockElement::new("a").text("One").href("/one")]);
    let backend = backend_with(vec![(HOME, home)]);
    backend.limit_sessions(0);
    let config = test_config();

    let descriptors = vec![descriptor_for("a", "One", "", "body > *:nth-child(1)")];
    let scheduler = Scheduler::new(Arc::new(backend), config);
    let run = scheduler.run(HOME, 7, descriptors).await;

    assert!(run.error.is_some());
    assert!(run.results.is_empty());
    assert_eq!(run.elements_tested, 0);
    assert_eq!(run.total_elements_found, 7);
}

#[tokio::test]
async fn scheduler_partitions_work_and_releases_sessions() {
    let mut elements = Vec::new();
    for i in 0..5 {
        elements.push(
            MockElement::new("a")
                .text(&format!("Link {i}"))
                .href(&format!("/page-{i}")),
        );
    }
    let home = MockPage::new("Home", elements);
    let backend = backend_with(vec![(HOME, home)]);
    let config = test_config();

    let engine = DiscoveryEngine::new(config.discovery.clone());
    let session = backend.new_session().await.unwrap();
    let descriptors = engine.discover(&backend, &session, HOME).await.unwrap();
    backend.close_session(session).await.unwrap();
    assert_eq!(descriptors.len(), 5);

    let backend = Arc::new(backend);
    let scheduler = Scheduler::new(Arc::clone(&backend), config);
    let run = scheduler.run(HOME, 5, descriptors).await;

    assert_eq!(run.elements_tested, 5);
    let concurrency = run.concurrency.expect("concurrency metadata recorded");
    assert_eq!(concurrency.workers, 2);
    assert_eq!(concurrency.batch_sizes, vec![3, 2]);
    assert_eq!(backend.open_sessions(), 0);

    // Every element clicked exactly once, in some completion order.
    let mut hrefs: Vec<_> = run.results.iter().map(|r| r.element.href.clone()).collect();
    hrefs.sort();
    let expected: Vec<_> = (0..5).map(|i| format!("/page-{i}")).collect();
    assert_eq!(hrefs, expected);
}
