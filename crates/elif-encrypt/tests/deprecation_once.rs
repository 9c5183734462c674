//! The process-wide advisory gate. Kept in its own test binary so no other
//! test opens the gate first.

use elif_encrypt::{CollectingAdvisorySink, FeatureToggleManager};
use std::sync::Arc;

#[test]
fn advisory_is_emitted_once_per_process() {
    let sink = CollectingAdvisorySink::new();

    let first = FeatureToggleManager::new(Arc::new(sink.clone()));
    let second = FeatureToggleManager::new(Arc::new(sink.clone()));

    assert!(first.resolve(true));
    assert_eq!(sink.count(), 0);

    assert!(!first.resolve(false));
    assert!(!second.resolve(false));
    assert!(!first.resolve(false));

    assert_eq!(sink.count(), 1);
}
