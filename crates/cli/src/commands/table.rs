use elif_encrypt::compat::{ATTRIBUTE_ONLY_MAPPING, MINIMUM_FRAMEWORK};
use elif_encrypt::{CompatibilityTable, ListenerKind, RuleOutcome, SecretStrategy};

pub fn run() {
    println!("Compatibility table (first match wins):");
    for (index, rule) in CompatibilityTable::standard().rules().iter().enumerate() {
        let outcome = match rule.outcome {
            RuleOutcome::Unsupported => "unsupported".to_string(),
            RuleOutcome::Select(kind) => kind.to_string(),
        };
        println!("  {}. {:<60} => {}", index + 1, rule.description, outcome);
    }
    println!(
        "Minimum framework: {}, attribute-only mapping library: {}",
        MINIMUM_FRAMEWORK, *ATTRIBUTE_ONLY_MAPPING
    );

    println!("Listeners:");
    for kind in ListenerKind::ALL {
        let sources: Vec<&str> = kind.metadata_sources().iter().map(|s| s.as_str()).collect();
        let events: Vec<&str> = kind.events().iter().map(|e| e.as_str()).collect();
        println!(
            "  {:<36} tag={} metadata={} events={}",
            kind,
            kind.registration().tag(),
            sources.join("+"),
            events.join(",")
        );
    }

    println!("Secret axis:");
    println!("  secret set   => {}", SecretStrategy::SecretSupplied);
    println!("  secret unset => {}", SecretStrategy::SecretFactory);
}
