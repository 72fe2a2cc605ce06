//! Content improvement hook. The default only tags the text; a real
//! rewriting backend plugs in behind the same trait.

/// Carried in `AppState` as `Arc<dyn ContentImprover>`.
pub trait ContentImprover: Send + Sync {
    fn improve(&self, content: &str) -> String;
}

pub const IMPROVED_MARKER: &str = " [Improved]";

/// Appends [`IMPROVED_MARKER`] to the submitted content.
#[derive(Debug, Default, Clone, Copy)]
pub struct MarkerImprover;

impl ContentImprover for MarkerImprover {
    fn improve(&self, content: &str) -> String {
        format!("{content}{IMPROVED_MARKER}")
    }
}
