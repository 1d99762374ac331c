//! Image matching for the clicker
//!
//! Template loading, screen capture and zero-mean normalized cross-correlation.

pub mod matcher;
pub mod screen;
pub mod template;


// Re-export main types and functions
pub use matcher::{MatchResult, ScreenMatcher, best_match};
pub use screen::{PrimaryMonitor, ScreenFrame, ScreenSource};
pub use template::{Template, TemplateStore, scan_png_files};
