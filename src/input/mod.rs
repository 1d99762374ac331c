// Input module
// Synthetic pointer clicks (output side) and the global mouse/keyboard
// hook (input side: recorder clicks and the ESC stop key).

pub mod driver;
pub mod error;
pub mod hook;

pub use driver::{EnigoDriver, PointerDriver};
pub use error::{InputError, InputResult};
pub use hook::{HookEvent, spawn_global_hook};
