//! `DataLogger` – records monitor data for offline analysis.

use autopin_kernel::Diagnostics;

use crate::monitor::Monitor;
use crate::tags::LoggerType;

pub trait DataLogger: Send + Sync {
    fn logger_type(&self) -> LoggerType;

    /// Prepare output for the given monitor set.  Problems go to
    /// `diagnostics`.
    fn init(&mut self, monitors: &[Box<dyn Monitor>], diagnostics: &Diagnostics);
}
