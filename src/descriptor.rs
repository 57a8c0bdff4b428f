use crate::core::Rect;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Which discovery sweep produced a descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    Structural,
    PointerCursor,
    EventListener,
}

/// A serializable snapshot of one DOM node at discovery time.
///
/// Descriptors are immutable once produced: state after a page reload is
/// re-derived by the locator, never written back onto the original snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    pub tag_name: String,
    /// Trimmed visible text, truncated at capture time.
    pub text: String,
    /// Space-separated class list, as authored.
    pub class_names: String,
    pub id: String,
    pub href: String,
    pub onclick: String,
    pub role: String,
    /// The `type` attribute, relevant for inputs.
    pub input_type: String,
    pub data_testid: String,
    pub aria_label: String,
    /// Structural path from the document root (XPath-shaped).
    pub dom_path: String,
    /// Generated CSS path.
    pub css_path: String,
    pub position: Option<Rect>,
    pub is_displayed: bool,
    pub is_enabled: bool,
    /// True when the descriptor was extracted from a normalized carousel
    /// slide; such descriptors need visibility overrides before clicking and
    /// are exempt from the main fingerprint set.
    pub is_carousel_element: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_method: Option<DetectionMethod>,
    /// HTTP status codes along the redirect chain of `href`, final last.
    /// Annotation only; never consulted by classification.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_chain: Option<Vec<u16>>,
}

impl ElementDescriptor {
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(self)
    }
}

/// Content hash identifying one logical element. Two descriptors sharing a
/// fingerprint are the same element regardless of which sweep found them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn of(descriptor: &ElementDescriptor) -> Self {
        let key = format!(
            "{}|{}|{}|{}|{}",
            descriptor.tag_name,
            descriptor.text,
            descriptor.href,
            descriptor.class_names,
            descriptor.id
        );
        let digest = Sha256::digest(key.as_bytes());
        Fingerprint(digest.iter().map(|b| format!("{b:02x}")).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Trim and truncate visible text the same way at capture and relocation,
/// so equality checks compare like with like.
pub fn normalize_text(raw: &str, max_len: usize) -> String {
    let trimmed = raw.trim();
    trimmed.chars().take(max_len).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(tag: &str, text: &str, href: &str, classes: &str, id: &str) -> ElementDescriptor {
        ElementDescriptor {
            tag_name: tag.to_string(),
            text: text.to_string(),
            class_names: classes.to_string(),
            id: id.to_string(),
            href: href.to_string(),
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
        }
    }

    #[test]
    fn fingerprint_is_deterministic() {
        let a = descriptor("a", "Learn More", "/about", "btn primary", "cta");
        let b = descriptor("a", "Learn More", "/about", "btn primary", "cta");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_ignores_detection_method_and_paths() {
        let mut a = descriptor("a", "Learn More", "/about", "btn", "");
        let mut b = a.clone();
        a.detection_method = Some(DetectionMethod::Structural);
        a.dom_path = "/html/body/a[1]".to_string();
        b.detection_method = Some(DetectionMethod::PointerCursor);
        b.dom_path = "/html/body/div[2]/a[1]".to_string();
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_distinguishes_content() {
        let a = descriptor("a", "Learn More", "/about", "btn", "");
        let b = descriptor("a", "Learn More", "/contact", "btn", "");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn normalize_text_trims_and_truncates() {
        assert_eq!(normalize_text("  hello  ", 100), "hello");
        let long = "x".repeat(150);
        assert_eq!(normalize_text(&long, 100).len(), 100);
    }
}
