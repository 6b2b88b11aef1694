use std::path::Path;
use std::sync::Arc;
use veil_core::config::VeilConfig;
use veil_core::hash::Sha256Digest;
use veil_core::resolve::DigestResolver;

fn resolver(config_path: &Path) -> anyhow::Result<DigestResolver> {
    let config = VeilConfig::load_or_default(config_path)?;
    Ok(DigestResolver::new(
        Arc::new(config.catalog()?),
        Arc::new(Sha256Digest),
    ))
}

/// `veil probe --item <ID> --category <LABEL>`
pub fn probe(config_path: &Path, item: &str, category: &str) -> anyhow::Result<()> {
    let resolver = resolver(config_path)?;
    let Some(id) = resolver.catalog().id_of_ignore_case(category) else {
        anyhow::bail!("Unknown category: {category}. Run `veil categories` to list them.");
    };
    let rt = tokio::runtime::Runtime::new()?;
    let digest = rt.block_on(resolver.obfuscate(item, id))?;
    println!("{digest}");
    Ok(())
}

/// `veil resolve --item <ID> --digest <HEX>`
pub fn resolve(config_path: &Path, item: &str, digest: &str) -> anyhow::Result<()> {
    let resolver = resolver(config_path)?;
    let rt = tokio::runtime::Runtime::new()?;
    match rt.block_on(resolver.resolve(item, &digest.to_lowercase()))? {
        Some(label) => {
            println!("{label}");
            Ok(())
        }
        None => anyhow::bail!("No category matches digest {digest} for item {item}"),
    }
}
