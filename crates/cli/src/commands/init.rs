use std::path::Path;

use onboard_core::config::OnboardConfig;
use tracing::info;

/// Run the `init` command: write a default configuration file.
pub async fn run(config_path: &str, force: bool) -> anyhow::Result<()> {
    let path = Path::new(config_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Pass --force to overwrite it.",
            path.display()
        );
    }

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let config = OnboardConfig::generate_default();
    let toml_str = toml::to_string_pretty(&config)?;
    std::fs::write(path, &toml_str)?;
    info!("Wrote configuration to {}", path.display());

    println!("onboard initialized successfully!");
    println!("  Configuration: {}", path.display());
    println!();
    println!("Next steps:");
    println!(
        "  1. Edit {} with your domain controller and service account",
        path.display()
    );
    println!("  2. Map departments to groups under [groups.departments]");
    println!("  3. Run `onboard test-connection` to check the bind");
    println!("  4. Run `onboard run --action create --input users.csv --dry-run` to preview");

    Ok(())
}
