// Image clicker module
// Finds each template on the live screen in file name order and clicks
// its center, for a configurable number of passes.

pub mod channels;
pub mod error;
pub mod fsm;
pub mod match_image;
pub mod progress;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;


// Re-export the main types and functions for easy access
pub use channels::create_event_channel;
pub use error::{CaptureError, ClickerError, ClickerResult};
pub use fsm::{ClickerRun, ImageClicker, PASS_PAUSE, POLL_INTERVAL, StopHandle};
pub use match_image::{
    MatchResult, PrimaryMonitor, ScreenFrame, ScreenMatcher, ScreenSource, Template, TemplateStore,
};
pub use progress::compute_progress;
pub use types::{CancelToken, ClickerEvent, ClickerSettings, EngineState, RunOutcome, RunReport};
