use elif_encrypt::EncryptorRegistry;
use std::collections::BTreeMap;

pub fn run(json: bool) -> anyhow::Result<()> {
    let registry = EncryptorRegistry::new();

    if json {
        let table: BTreeMap<&str, &str> = registry.aliases().collect();
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        println!("Encryptor aliases:");
        for (alias, implementation) in registry.aliases() {
            println!("  {:<8} {}", alias, implementation);
        }
        println!("Any other value is used as an implementation identifier as-is.");
    }

    Ok(())
}
