//! Compatibility resolution.
//!
//! Which event-interception mechanism can work depends on whether the runtime
//! supports annotations, attributes or both, and whether the mapping library
//! still exposes its annotation reader. The table below encodes exactly the
//! supported combinations; anything it does not match fails instead of
//! degrading silently.

use crate::error::{BootstrapError, BootstrapResult};
use crate::version::{Version, VersionSignal};
use crate::wiring::{ListenerKind, SecretStrategy, WiringBundle};
use once_cell::sync::Lazy;
use semver::{Comparator, Op, Prerelease, VersionReq};

/// Oldest host framework release the bundle supports
pub const MINIMUM_FRAMEWORK: Version = Version::new(5, 4, 0);

/// First runtime major with attribute support
pub const ATTRIBUTE_RUNTIME_MAJOR: u64 = 8;

/// Mapping-library releases that dropped the annotation reader
pub static ATTRIBUTE_ONLY_MAPPING: Lazy<VersionReq> = Lazy::new(|| VersionReq {
    comparators: vec![Comparator {
        op: Op::Caret,
        major: 3,
        minor: Some(0),
        patch: None,
        pre: Prerelease::EMPTY,
    }],
});

pub type Predicate = fn(&VersionSignal) -> bool;

/// What a matching row decides
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// The host framework is below the supported floor
    Unsupported,
    Select(ListenerKind),
}

/// One row of the decision table
#[derive(Debug, Clone, Copy)]
pub struct CompatibilityRule {
    pub description: &'static str,
    pub predicate: Predicate,
    pub outcome: RuleOutcome,
}

impl CompatibilityRule {
    pub const fn new(description: &'static str, predicate: Predicate, outcome: RuleOutcome) -> Self {
        Self {
            description,
            predicate,
            outcome,
        }
    }

    pub fn matches(&self, signal: &VersionSignal) -> bool {
        (self.predicate)(signal)
    }
}

fn below_minimum_framework(s: &VersionSignal) -> bool {
    (s.framework.major, s.framework.minor) < (MINIMUM_FRAMEWORK.major, MINIMUM_FRAMEWORK.minor)
}

fn framework_5_or_6(s: &VersionSignal) -> bool {
    (5..=6).contains(&s.framework.major)
}

fn legacy_runtime(s: &VersionSignal) -> bool {
    framework_5_or_6(s) && s.runtime.major < ATTRIBUTE_RUNTIME_MAJOR
}

fn attribute_only_mapping(s: &VersionSignal) -> bool {
    framework_5_or_6(s)
        && s.runtime.major >= ATTRIBUTE_RUNTIME_MAJOR
        && ATTRIBUTE_ONLY_MAPPING.matches(&s.mapping_library)
}

fn mixed_metadata(s: &VersionSignal) -> bool {
    framework_5_or_6(s) && s.runtime.major >= ATTRIBUTE_RUNTIME_MAJOR
}

fn attribute_only_framework(s: &VersionSignal) -> bool {
    s.framework.major >= 7
}

static STANDARD_RULES: [CompatibilityRule; 5] = [
    CompatibilityRule::new(
        "framework < 5.4: unsupported",
        below_minimum_framework,
        RuleOutcome::Unsupported,
    ),
    CompatibilityRule::new(
        "framework 5.x-6.x, runtime < 8: annotations only",
        legacy_runtime,
        RuleOutcome::Select(ListenerKind::LegacyAnnotationSubscriber),
    ),
    CompatibilityRule::new(
        "framework 5.x-6.x, runtime >= 8, mapping library ^3.0: attributes only",
        attribute_only_mapping,
        RuleOutcome::Select(ListenerKind::AttributeOnlyListener),
    ),
    CompatibilityRule::new(
        "framework 5.x-6.x, runtime >= 8: annotations and attributes",
        mixed_metadata,
        RuleOutcome::Select(ListenerKind::AnnotationAndAttributeSubscriber),
    ),
    CompatibilityRule::new(
        "framework >= 7: attributes only",
        attribute_only_framework,
        RuleOutcome::Select(ListenerKind::AttributeOnlyListener),
    ),
];

/// Ordered decision table; the first matching row wins
#[derive(Debug, Clone)]
pub struct CompatibilityTable {
    rules: Vec<CompatibilityRule>,
}

impl CompatibilityTable {
    /// The supported combinations
    pub fn standard() -> Self {
        Self::new(STANDARD_RULES.to_vec())
    }

    pub fn new(rules: Vec<CompatibilityRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[CompatibilityRule] {
        &self.rules
    }

    /// First rule matching the signal, if any
    pub fn find(&self, signal: &VersionSignal) -> Option<&CompatibilityRule> {
        self.rules.iter().find(|rule| rule.matches(signal))
    }
}

impl Default for CompatibilityTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// Selects the wiring bundle for a set of version signals.
///
/// Pure: the same inputs always select the same bundle.
#[derive(Debug, Clone, Default)]
pub struct CompatibilityResolver {
    table: CompatibilityTable,
}

impl CompatibilityResolver {
    pub fn new(table: CompatibilityTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &CompatibilityTable {
        &self.table
    }

    pub fn select(
        &self,
        framework: Version,
        runtime: Version,
        mapping_library: Version,
        has_inline_secret: bool,
    ) -> BootstrapResult<WiringBundle> {
        self.select_for(
            &VersionSignal::new(framework, runtime, mapping_library),
            has_inline_secret,
        )
    }

    pub fn select_for(
        &self,
        signal: &VersionSignal,
        has_inline_secret: bool,
    ) -> BootstrapResult<WiringBundle> {
        let rule = self
            .table
            .find(signal)
            .ok_or_else(|| BootstrapError::unresolvable_bundle(signal.clone()))?;

        tracing::debug!(rule = rule.description, %signal, "Compatibility rule matched");

        match rule.outcome {
            RuleOutcome::Unsupported => Err(BootstrapError::unsupported_version(
                signal.framework.clone(),
                MINIMUM_FRAMEWORK,
            )),
            RuleOutcome::Select(listener) => Ok(WiringBundle::new(
                listener,
                SecretStrategy::for_inline_secret(has_inline_secret),
            )),
        }
    }
}
