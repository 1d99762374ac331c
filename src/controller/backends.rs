//! Factories for the screen and pointer backends a worker runs against

use crate::clicker::{PrimaryMonitor, ScreenSource};
use crate::input::{EnigoDriver, PointerDriver};

pub type ScreenFactory = Box<dyn Fn() -> Box<dyn ScreenSource> + Send + Sync>;
pub type DriverFactory = Box<dyn Fn() -> Box<dyn PointerDriver> + Send + Sync>;

/// Every worker gets fresh backends from these factories.
pub struct Backends {
    screen: ScreenFactory,
    driver: DriverFactory,
}

impl Backends {
    pub fn new(screen: ScreenFactory, driver: DriverFactory) -> Self {
        Self { screen, driver }
    }

    /// Primary monitor through xcap, pointer through enigo.
    pub fn system() -> Self {
        Self::new(
            Box::new(|| Box::new(PrimaryMonitor::new())),
            Box::new(|| Box::new(EnigoDriver::new())),
        )
    }

    pub fn screen(&self) -> Box<dyn ScreenSource> {
        (self.screen)()
    }

    pub fn driver(&self) -> Box<dyn PointerDriver> {
        (self.driver)()
    }
}
