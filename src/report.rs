use crate::classifier::{ClickOutcome, ClickResult};
use crate::errors::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// How the run was parallelized, recorded alongside the results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcurrencyInfo {
    pub workers: usize,
    pub batches: usize,
    pub batch_sizes: Vec<usize>,
    pub total_time_secs: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub total_tested: usize,
    pub active_percentage: f64,
    pub dead_percentage: f64,
    pub error_percentage: f64,
    pub most_common_classes: Vec<(String, usize)>,
    pub outcome_breakdown: BTreeMap<String, usize>,
}

/// Complete record of one page test: every click result plus aggregate
/// counts. A run that failed before any element was clicked still produces
/// a `TestRun`, with `error` set and empty results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestRun {
    pub run_id: Uuid,
    pub url: String,
    pub total_elements_found: usize,
    pub elements_tested: usize,
    pub active_clicks: usize,
    pub dead_clicks: usize,
    pub errors: usize,
    pub results: Vec<ClickResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyInfo>,
    pub summary: Summary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(count as f64 / total as f64 * 100.0)
}

impl Summary {
    pub fn from_results(results: &[ClickResult]) -> Self {
        let total = results.len();
        let active = results.iter().filter(|r| r.outcome.is_active()).count();
        let dead = results
            .iter()
            .filter(|r| r.outcome == ClickOutcome::DeadClick)
            .count();
        let errors = total - active - dead;

        let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
        let mut class_counts: BTreeMap<String, usize> = BTreeMap::new();
        for result in results {
            *breakdown
                .entry(result.outcome.as_str().to_string())
                .or_insert(0) += 1;
            // Individual class names, not whole class lists: "btn primary"
            // and "btn secondary" both count toward "btn".
            for class in result.element.class_names.split_whitespace() {
                *class_counts.entry(class.to_string()).or_insert(0) += 1;
            }
        }

        let mut most_common: Vec<(String, usize)> = class_counts.into_iter().collect();
        // Count descending, name ascending for ties; BTreeMap already gave
        // us name order so the sort only has to be stable on count.
        most_common.sort_by(|a, b| b.1.cmp(&a.1));
        most_common.truncate(10);

        Self {
            total_tested: total,
            active_percentage: percentage(active, total),
            dead_percentage: percentage(dead, total),
            error_percentage: percentage(errors, total),
            most_common_classes: most_common,
            outcome_breakdown: breakdown,
        }
    }
}

impl TestRun {
    pub fn from_results(
        url: &str,
        total_elements_found: usize,
        results: Vec<ClickResult>,
        concurrency: Option<ConcurrencyInfo>,
    ) -> Self {
        let summary = Summary::from_results(&results);
        let active = results.iter().filter(|r| r.outcome.is_active()).count();
        let dead = results
            .iter()
            .filter(|r| r.outcome == ClickOutcome::DeadClick)
            .count();
        let errors = results.len() - active - dead;
        Self {
            run_id: Uuid::new_v4(),
            url: url.to_string(),
            total_elements_found,
            elements_tested: results.len(),
            active_clicks: active,
            dead_clicks: dead,
            errors,
            results,
            concurrency,
            summary,
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// A run that never got to click anything. Discovery may still have
    /// counted elements before the failure.
    pub fn failed(url: &str, total_elements_found: usize, message: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            url: url.to_string(),
            total_elements_found,
            elements_tested: 0,
            active_clicks: 0,
            dead_clicks: 0,
            errors: 0,
            results: Vec::new(),
            concurrency: None,
            summary: Summary::from_results(&[]),
            error: Some(message.into()),
            timestamp: Utc::now(),
        }
    }

    /// Render the run to stdout: aggregate summary followed by the first
    /// ten detailed results.
    pub fn print_report(&self) {
        let bar = "=".repeat(80);
        println!("\n{bar}");
        println!("CLICKABILITY TEST REPORT");
        println!("{bar}");
        println!("URL: {}", self.url);
        println!("Timestamp: {}", self.timestamp.to_rfc3339());

        if let Some(error) = &self.error {
            println!("\nTest failed: {error}");
            println!("{bar}");
            return;
        }

        println!("\nElements found: {}", self.total_elements_found);
        println!("Elements tested: {}", self.elements_tested);
        println!(
            "Active clicks: {} ({:.2}%)",
            self.active_clicks, self.summary.active_percentage
        );
        println!(
            "Dead clicks: {} ({:.2}%)",
            self.dead_clicks, self.summary.dead_percentage
        );
        println!(
            "Errors: {} ({:.2}%)",
            self.errors, self.summary.error_percentage
        );

        if let Some(concurrency) = &self.concurrency {
            println!(
                "\nWorkers: {} | Batches: {:?} | Total time: {:.2}s",
                concurrency.workers, concurrency.batch_sizes, concurrency.total_time_secs
            );
        }

        if !self.summary.outcome_breakdown.is_empty() {
            println!("\nOutcome breakdown:");
            for (outcome, count) in &self.summary.outcome_breakdown {
                println!("  {outcome}: {count}");
            }
        }

        if !self.summary.most_common_classes.is_empty() {
            println!("\nMost common element classes:");
            for (classes, count) in &self.summary.most_common_classes {
                println!("  {count}x {classes}");
            }
        }

        println!("\n{}", "-".repeat(80));
        println!("DETAILED RESULTS (first 10)");
        println!("{}", "-".repeat(80));
        for result in self.results.iter().take(10) {
            let label = if result.element.text.is_empty() {
                format!("<{}>", result.element.tag_name)
            } else {
                format!("<{}> \"{}\"", result.element.tag_name, result.element.text)
            };
            println!("\n{label}");
            println!("  Outcome: {}", result.outcome.as_str());
            if let Some(message) = &result.error_message {
                println!("  Detail: {message}");
            }
            if result.page_changed {
                println!("  {} -> {}", result.url_before, result.url_after);
            }
            if let Some(chain) = &result.element.status_chain {
                println!("  Link status chain: {chain:?}");
            }
        }
        println!("\n{bar}");
    }

    /// Persist the full run as pretty-printed JSON. When `path` is `None`
    /// the filename is derived from the last URL path segment.
    pub fn save_to_file(&self, path: Option<&Path>) -> Result<PathBuf> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => PathBuf::from(format!(
                "clickability_test_results_{}.json",
                url_slug(&self.url)
            )),
        };
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)?;
        info!(path = %path.display(), "results saved");
        Ok(path)
    }
}

fn url_slug(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let segment = trimmed
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("page");
    segment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::ElementDescriptor;

    fn result_with(outcome: ClickOutcome, classes: &str) -> ClickResult {
        ClickResult {
            element: ElementDescriptor {
                tag_name: "a".to_string(),
                text: "Go".to_string(),
                class_names: classes.to_string(),
                id: String::new(),
                href: "/go".to_string(),
                onclick: String::new(),
                role: String::new(),
                input_type: String::new(),
                data_testid: String::new(),
                aria_label: String::new(),
                dom_path: String::new(),
                css_path: String::new(),
                position: None,
                is_displayed: true,
                is_enabled: true,
                is_carousel_element: false,
                detection_method: None,
                status_chain: None,
            },
            outcome,
            error_message: None,
            page_changed: false,
            url_before: "https://example.com".to_string(),
            url_after: "https://example.com".to_string(),
            new_elements_appeared: false,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn summary_percentages_round_to_two_decimals() {
        let results = vec![
            result_with(ClickOutcome::ActiveNavigation, "btn"),
            result_with(ClickOutcome::DeadClick, "btn"),
            result_with(ClickOutcome::Error, "link"),
        ];
        let summary = Summary::from_results(&results);
        assert_eq!(summary.total_tested, 3);
        assert_eq!(summary.active_percentage, 33.33);
        assert_eq!(summary.dead_percentage, 33.33);
        assert_eq!(summary.error_percentage, 33.33);
    }

    #[test]
    fn summary_of_empty_results() {
        let summary = Summary::from_results(&[]);
        assert_eq!(summary.total_tested, 0);
        assert_eq!(summary.active_percentage, 0.0);
        assert_eq!(summary.dead_percentage, 0.0);
        assert_eq!(summary.error_percentage, 0.0);
        assert!(summary.most_common_classes.is_empty());
    }

    #[test]
    fn class_counts_split_multi_class_lists() {
        let results = vec![
            result_with(ClickOutcome::DeadClick, "btn primary"),
            result_with(ClickOutcome::DeadClick, "btn secondary"),
        ];
        let summary = Summary::from_results(&results);
        assert_eq!(summary.most_common_classes[0], ("btn".to_string(), 2));
        assert!(summary
            .most_common_classes
            .iter()
            .any(|(name, count)| name == "primary" && *count == 1));
        assert!(!summary
            .most_common_classes
            .iter()
            .any(|(name, _)| name.contains(' ')));
    }

    #[test]
    fn most_common_classes_capped_at_ten() {
        let mut results = Vec::new();
        for i in 0..15 {
            results.push(result_with(ClickOutcome::DeadClick, &format!("cls-{i}")));
        }
        results.push(result_with(ClickOutcome::DeadClick, "cls-3"));
        let summary = Summary::from_results(&results);
        assert_eq!(summary.most_common_classes.len(), 10);
        assert_eq!(
            summary.most_common_classes[0],
            ("cls-3".to_string(), 2)
        );
    }

    #[test]
    fn breakdown_counts_every_outcome() {
        let results = vec![
            result_with(ClickOutcome::ActiveNavigation, ""),
            result_with(ClickOutcome::ActiveNavigation, ""),
            result_with(ClickOutcome::StaleElement, ""),
        ];
        let summary = Summary::from_results(&results);
        assert_eq!(summary.outcome_breakdown["active_navigation"], 2);
        assert_eq!(summary.outcome_breakdown["stale_element"], 1);
    }

    #[test]
    fn run_counts_mirror_results() {
        let results = vec![
            result_with(ClickOutcome::ActiveUiChange, ""),
            result_with(ClickOutcome::DeadClick, ""),
            result_with(ClickOutcome::Timeout, ""),
        ];
        let run = TestRun::from_results("https://example.com/page", 5, results, None);
        assert_eq!(run.total_elements_found, 5);
        assert_eq!(run.elements_tested, 3);
        assert_eq!(run.active_clicks, 1);
        assert_eq!(run.dead_clicks, 1);
        assert_eq!(run.errors, 1);
        assert!(run.error.is_none());
    }

    #[test]
    fn failed_run_carries_message_and_discovered_count() {
        let run = TestRun::failed("https://example.com", 7, "no sessions available");
        assert_eq!(run.elements_tested, 0);
        assert_eq!(run.total_elements_found, 7);
        assert_eq!(run.error.as_deref(), Some("no sessions available"));
    }

    #[test]
    fn default_filename_uses_last_url_segment() {
        assert_eq!(url_slug("https://example.com/products/widgets"), "widgets");
        assert_eq!(url_slug("https://example.com/products/"), "products");
        assert_eq!(url_slug("https://example.com"), "example_com");
    }
}
