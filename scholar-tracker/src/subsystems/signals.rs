//! Signal collector state: scroll depth tracking and click classification.
//!
//! Pure bookkeeping; the tracker decides when to submit and owns the locks.

use std::sync::OnceLock;

use regex::Regex;
use scholar_core::InteractionType;

use crate::events::ClickTarget;

/// Per-paper signal counters, reset when a new paper is tracked.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalState {
    max_scroll_depth: u8,
    last_emitted_depth: u8,
    click_count: u32,
}

impl SignalState {
    pub fn max_scroll_depth(&self) -> u8 {
        self.max_scroll_depth
    }

    pub fn click_count(&self) -> u32 {
        self.click_count
    }

    /// Fold a new scroll depth into the running maximum. Returns the depth to
    /// report when it beats the last reported depth by more than `threshold`
    /// points and the emission debounce allows it.
    pub fn observe_scroll(&mut self, depth: u8, threshold: u8, emission_ready: bool) -> Option<u8> {
        let depth = depth.min(100);
        self.max_scroll_depth = self.max_scroll_depth.max(depth);

        let beats_threshold = depth > self.last_emitted_depth.saturating_add(threshold);
        if beats_threshold && emission_ready {
            self.last_emitted_depth = depth;
            Some(depth)
        } else {
            None
        }
    }

    pub fn register_click(&mut self) -> u32 {
        self.click_count += 1;
        self.click_count
    }
}

fn pdf_link() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)(\.pdf(?:$|[?#])|/pdf/)").ok())
        .as_ref()
}

fn external_link() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^https?://").ok()).as_ref()
}

/// PDF link, then external link, then bookmark control, then plain click.
pub fn classify_click(target: &ClickTarget) -> InteractionType {
    if let Some(href) = target.href.as_deref() {
        if pdf_link().is_some_and(|re| re.is_match(href)) {
            return InteractionType::ClickPdf;
        }
        if external_link().is_some_and(|re| re.is_match(href)) {
            return InteractionType::ClickUrl;
        }
    }

    let bookmark_class = target
        .classes
        .iter()
        .any(|c| c.to_ascii_lowercase().contains("bookmark"));
    let bookmark_action = target
        .data_action
        .as_deref()
        .is_some_and(|a| a.eq_ignore_ascii_case("bookmark"));

    if bookmark_class || bookmark_action {
        InteractionType::Bookmark
    } else {
        InteractionType::Click
    }
}
