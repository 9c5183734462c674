//! Exception-wrapping opt-in and its deprecation advisory.

use crate::parameters::PARAM_WRAP_EXCEPTIONS;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Package the advisory is issued for
pub const ADVISORY_PACKAGE: &str = "elif-encrypt";

/// Release that introduced the advisory
pub const ADVISORY_SINCE: &str = "5.4.2";

/// Release in which wrapped errors become the default
pub const WRAPPED_BY_DEFAULT_IN: &str = "6.0";

static PROCESS_ADVISORY_GATE: AtomicBool = AtomicBool::new(false);

/// Non-fatal notice about an upcoming default change
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advisory {
    pub package: &'static str,
    pub since: &'static str,
    pub current_behavior: &'static str,
    pub future_default_in: &'static str,
    pub opt_in_parameter: &'static str,
}

impl Advisory {
    pub fn wrap_exceptions() -> Self {
        Self {
            package: ADVISORY_PACKAGE,
            since: ADVISORY_SINCE,
            current_behavior: "encryptor errors are passed through unwrapped",
            future_default_in: WRAPPED_BY_DEFAULT_IN,
            opt_in_parameter: PARAM_WRAP_EXCEPTIONS,
        }
    }
}

/// Destination for advisories
pub trait AdvisorySink: Send + Sync {
    fn emit(&self, advisory: &Advisory);
}

/// Sink writing advisories as `tracing` warnings
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAdvisorySink;

impl AdvisorySink for TracingAdvisorySink {
    fn emit(&self, advisory: &Advisory) {
        tracing::warn!(
            target: "elif_encrypt::deprecation",
            package = advisory.package,
            since = advisory.since,
            "Since {} {}: {}. Starting with {} errors are wrapped by default; set '{}' to true to opt in now",
            advisory.package,
            advisory.since,
            advisory.current_behavior,
            advisory.future_default_in,
            advisory.opt_in_parameter
        );
    }
}

/// Sink keeping advisories in memory
#[derive(Debug, Default, Clone)]
pub struct CollectingAdvisorySink {
    advisories: Arc<Mutex<Vec<Advisory>>>,
}

impl CollectingAdvisorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advisories(&self) -> Vec<Advisory> {
        self.advisories
            .lock()
            .map(|advisories| advisories.clone())
            .unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.advisories().len()
    }
}

impl AdvisorySink for CollectingAdvisorySink {
    fn emit(&self, advisory: &Advisory) {
        if let Ok(mut advisories) = self.advisories.lock() {
            advisories.push(advisory.clone());
        }
    }
}

#[derive(Debug, Clone)]
enum Gate {
    Process,
    Isolated(Arc<AtomicBool>),
}

impl Gate {
    /// Returns true for the first caller only
    fn open_once(&self) -> bool {
        let flag = match self {
            Gate::Process => &PROCESS_ADVISORY_GATE,
            Gate::Isolated(flag) => flag.as_ref(),
        };
        !flag.swap(true, Ordering::SeqCst)
    }
}

/// Resolves the exception-wrapping flag.
///
/// On the legacy path an advisory is emitted at most once per gate. The
/// default gate is process-wide.
#[derive(Clone)]
pub struct FeatureToggleManager {
    sink: Arc<dyn AdvisorySink>,
    gate: Gate,
}

impl FeatureToggleManager {
    pub fn new(sink: Arc<dyn AdvisorySink>) -> Self {
        Self {
            sink,
            gate: Gate::Process,
        }
    }

    /// Manager with its own once-gate, independent of the process-wide one
    pub fn isolated(sink: Arc<dyn AdvisorySink>) -> Self {
        Self {
            sink,
            gate: Gate::Isolated(Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn resolve(&self, wrap_exceptions: bool) -> bool {
        if !wrap_exceptions && self.gate.open_once() {
            self.sink.emit(&Advisory::wrap_exceptions());
        }
        wrap_exceptions
    }
}

impl Default for FeatureToggleManager {
    fn default() -> Self {
        Self::new(Arc::new(TracingAdvisorySink))
    }
}

impl std::fmt::Debug for FeatureToggleManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureToggleManager")
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
