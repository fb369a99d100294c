//! [`Diagnostics`] – the error-accumulating scope of one watchdog run.
//!
//! Every component funnels its configuration and runtime problems into the
//! same context through [`Diagnostics::report`].  Reporting never fails and
//! never interrupts the caller; it records the problem, logs it, and flips
//! the context into its error state.  The error state is monotonic: once set
//! it is never cleared.
//!
//! The first transition into the error state invokes the notifier installed
//! with [`Diagnostics::with_notifier`], which the watchdog uses to turn any
//! error into a stop notification.
//!
//! # Example
//!
//! ```
//! use autopin_kernel::diagnostics::Diagnostics;
//! use autopin_types::{Category, ErrorKind};
//!
//! let ctx = Diagnostics::new("Watchdog 0");
//! assert!(!ctx.is_error());
//!
//! ctx.report(ErrorKind::BadConfig, Category::OptionMissing, "No control strategy configured");
//! ctx.report(ErrorKind::Unsupported, Category::Critical, "Data logger \"csv\" is not supported");
//!
//! assert!(ctx.is_error());
//! assert_eq!(ctx.reports().len(), 2);
//! ```

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use autopin_types::{Category, ErrorKind};
use tracing::{debug, error, info};

/// A single recorded problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: ErrorKind,
    pub category: Category,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}/{}] {}", self.kind, self.category, self.message)
    }
}

type Notifier = Box<dyn Fn(&str, &Diagnostic) + Send + Sync>;

/// Named, monotonic error scope shared by reference with every component of
/// a watchdog run.
pub struct Diagnostics {
    name: String,
    errored: AtomicBool,
    reports: Mutex<Vec<Diagnostic>>,
    notifier: Option<Notifier>,
}

impl Diagnostics {
    /// Create a context without an error notifier.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            errored: AtomicBool::new(false),
            reports: Mutex::new(Vec::new()),
            notifier: None,
        }
    }

    /// Create a context whose first error transition calls `notifier` with the
    /// scope name and the triggering diagnostic.
    pub fn with_notifier(
        name: impl Into<String>,
        notifier: impl Fn(&str, &Diagnostic) + Send + Sync + 'static,
    ) -> Self {
        Self {
            notifier: Some(Box::new(notifier)),
            ..Self::new(name)
        }
    }

    /// Scope identifier, e.g. `"Watchdog 3"` or the configured `Name`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record a problem and enter the error state.
    pub fn report(&self, kind: ErrorKind, category: Category, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            category,
            message: message.into(),
        };
        error!(
            scope = %self.name,
            kind = %diagnostic.kind,
            category = %diagnostic.category,
            "{}",
            diagnostic.message
        );

        if let Ok(mut reports) = self.reports.lock() {
            reports.push(diagnostic.clone());
        }

        let first = !self.errored.swap(true, Ordering::AcqRel);
        if first && let Some(notify) = &self.notifier {
            notify(&self.name, &diagnostic);
        }
    }

    /// `true` if anything has ever been reported in this scope.
    pub fn is_error(&self) -> bool {
        self.errored.load(Ordering::Acquire)
    }

    /// Snapshot of every report, in report order.
    pub fn reports(&self) -> Vec<Diagnostic> {
        self.reports
            .lock()
            .map(|reports| reports.clone())
            .unwrap_or_default()
    }

    /// Number of reports whose category equals `category`.
    pub fn count_category(&self, category: &Category) -> usize {
        self.reports
            .lock()
            .map(|reports| reports.iter().filter(|d| &d.category == category).count())
            .unwrap_or_default()
    }

    /// Log a progress message under this scope.
    pub fn info(&self, message: &str) {
        info!(scope = %self.name, "{message}");
    }

    /// Log a debug message under this scope.
    pub fn debug(&self, message: &str) {
        debug!(scope = %self.name, "{message}");
    }
}

impl fmt::Debug for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Diagnostics")
            .field("name", &self.name)
            .field("errored", &self.is_error())
            .field("reports", &self.reports())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn fresh_context_is_clean() {
        let ctx = Diagnostics::new("scope");
        assert_eq!(ctx.name(), "scope");
        assert!(!ctx.is_error());
        assert!(ctx.reports().is_empty());
    }

    #[test]
    fn report_records_and_flags() {
        let ctx = Diagnostics::new("scope");
        ctx.report(
            ErrorKind::BadConfig,
            Category::Inconsistent,
            "Specified 2 control strategies",
        );
        assert!(ctx.is_error());
        assert_eq!(
            ctx.reports(),
            vec![Diagnostic {
                kind: ErrorKind::BadConfig,
                category: Category::Inconsistent,
                message: "Specified 2 control strategies".to_string(),
            }]
        );
    }

    #[test]
    fn reports_accumulate_in_order() {
        let ctx = Diagnostics::new("scope");
        ctx.report(ErrorKind::BadConfig, Category::OptionMissing, "first");
        ctx.report(ErrorKind::Unsupported, Category::Critical, "second");
        ctx.report(ErrorKind::Monitor, Category::Other("sampling".into()), "third");

        let messages: Vec<_> = ctx.reports().into_iter().map(|d| d.message).collect();
        assert_eq!(messages, vec!["first", "second", "third"]);
        assert_eq!(ctx.count_category(&Category::Critical), 1);
    }

    #[test]
    fn notifier_fires_only_on_first_error() {
        let fired = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&fired);
        let ctx = Diagnostics::with_notifier("Watchdog 9", move |scope, diagnostic| {
            assert_eq!(scope, "Watchdog 9");
            assert_eq!(diagnostic.message, "boom");
            seen.fetch_add(1, Ordering::SeqCst);
        });

        ctx.report(ErrorKind::System, Category::Critical, "boom");
        ctx.report(ErrorKind::System, Category::Critical, "again");

        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(ctx.is_error());
    }

    #[test]
    fn display_includes_kind_and_category() {
        let d = Diagnostic {
            kind: ErrorKind::Unsupported,
            category: Category::Critical,
            message: "Control strategy \"x\" is not supported".into(),
        };
        assert_eq!(
            d.to_string(),
            "[unsupported/critical] Control strategy \"x\" is not supported"
        );
    }
}
