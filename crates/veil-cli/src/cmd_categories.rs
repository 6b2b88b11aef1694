use std::path::Path;
use veil_core::config::VeilConfig;

/// `veil categories`
pub fn execute(config_path: &Path, json: bool) -> anyhow::Result<()> {
    let config = VeilConfig::load_or_default(config_path)?.with_env();
    let catalog = config.catalog()?;
    let hide = config.hide_list();

    if json {
        println!("{}", serde_json::to_string_pretty(catalog.entries())?);
        return Ok(());
    }
    for entry in catalog.entries() {
        let hidden = veil_core::dispatch::should_hide(entry.label.as_str(), &hide);
        let mark = if hidden { "  (hidden)" } else { "" };
        println!("{:>3}  {}{mark}", entry.id.0, entry.label);
    }
    Ok(())
}
