//! Page event bus
//!
//! The host (UI shell, WASM bridge, replay driver) publishes scroll, click and
//! unload events here. The tracker subscribes one listener per tracked paper
//! and drops the subscription when the paper is finalized.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Scroll position as reported by the page, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScrollMetrics {
    pub scroll_top: f64,
    pub scroll_height: f64,
    pub client_height: f64,
}

impl ScrollMetrics {
    /// Percentage of the scrollable height reached, 0-100. A page that fits
    /// in the viewport reports 0.
    pub fn depth_percent(&self) -> u8 {
        let scrollable = self.scroll_height - self.client_height;
        if !scrollable.is_finite() || scrollable <= 0.0 {
            return 0;
        }
        let percent = (self.scroll_top / scrollable * 100.0).round();
        if percent.is_nan() {
            return 0;
        }
        percent.clamp(0.0, 100.0) as u8
    }

    /// Metrics for a page scrolled to `percent` of a 100-unit scroll range.
    pub fn at_percent(percent: f64) -> Self {
        Self {
            scroll_top: percent,
            scroll_height: 200.0,
            client_height: 100.0,
        }
    }
}

/// The element a click landed on, reduced to what classification needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClickTarget {
    /// `href` of the closest enclosing link, if any.
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub classes: Vec<String>,
    /// Value of a `data-action` attribute, if any.
    #[serde(default)]
    pub data_action: Option<String>,
}

impl ClickTarget {
    pub fn link(href: impl Into<String>) -> Self {
        Self {
            href: Some(href.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageEvent {
    Scroll(ScrollMetrics),
    Click(ClickTarget),
    Unload,
}

#[derive(Debug, Clone)]
pub struct PageEvents {
    tx: broadcast::Sender<PageEvent>,
}

impl PageEvents {
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish an event. Returns the number of listeners that received it.
    pub fn publish(&self, event: PageEvent) -> usize {
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PageEvent> {
        self.tx.subscribe()
    }

    pub fn listener_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
