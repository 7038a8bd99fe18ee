use std::path::Path;

use anyhow::bail;
use fairsend_core::SimConfig;

pub fn init_config(path: &str, seed: u64) -> anyhow::Result<()> {
    let output = Path::new(path);
    if output.exists() {
        bail!("{} already exists", output.display());
    }

    let config = SimConfig::scaffold(seed);
    std::fs::write(output, config.to_toml_string()?)?;
    println!("✓ Generated {}", output.display());

    Ok(())
}
