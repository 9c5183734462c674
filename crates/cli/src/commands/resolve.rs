use anyhow::Context;
use elif_encrypt::{BootstrapOrchestrator, ParameterValue, RawConfig, Resolution, VersionSignal};
use serde::Serialize;

#[derive(Serialize)]
struct ResolveReport<'a> {
    bundle: String,
    listener: &'static str,
    secret: &'static str,
    encryptor: &'a elif_encrypt::EncryptorBinding,
    versions: &'a VersionSignal,
    parameters: &'a elif_encrypt::WiringParameters,
    services: Vec<elif_encrypt::ServiceDefinition>,
}

pub fn run(
    config_paths: &[String],
    framework: &str,
    runtime: &str,
    mapping: &str,
    json: bool,
) -> anyhow::Result<()> {
    let layers = config_paths
        .iter()
        .map(|path| {
            RawConfig::from_yaml_file(path).with_context(|| format!("Failed to load config '{}'", path))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    let versions = VersionSignal::parse(framework, runtime, mapping)?;

    let resolution = BootstrapOrchestrator::new().resolve(RawConfig::merge_all(layers), &versions)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report(&resolution))?);
    } else {
        print_resolution(&resolution);
    }

    Ok(())
}

fn report(resolution: &Resolution) -> ResolveReport<'_> {
    ResolveReport {
        bundle: resolution.bundle.to_string(),
        listener: resolution.bundle.listener.as_str(),
        secret: resolution.bundle.secret.as_str(),
        encryptor: &resolution.binding,
        versions: &resolution.versions,
        parameters: &resolution.parameters,
        services: resolution.bundle.services(),
    }
}

fn print_resolution(resolution: &Resolution) {
    println!("Versions: {}", resolution.versions);
    println!("Wiring bundle: {}", resolution.bundle);

    let binding = &resolution.binding;
    if binding.aliased {
        println!("Encryptor: {} -> {}", binding.requested, binding.implementation);
    } else {
        println!("Encryptor: {} (custom)", binding.implementation);
    }

    println!("Parameters:");
    for (name, value) in resolution.parameters.redacted() {
        match value {
            ParameterValue::String(value) => println!("  {} = {:?}", name, value),
            ParameterValue::Bool(value) => println!("  {} = {}", name, value),
        }
    }

    println!("Services:");
    for service in resolution.bundle.services() {
        if service.tags.is_empty() {
            println!("  {} ({})", service.id, service.implementation);
        } else {
            println!(
                "  {} ({}) [{}]",
                service.id,
                service.implementation,
                service.tags.join(", ")
            );
        }
    }
}
