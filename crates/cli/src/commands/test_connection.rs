use std::path::Path;

use onboard_core::config::OnboardConfig;
use onboard_directory::client::AdClient;

/// Run the `test-connection` command: bind once with the configured account.
pub async fn run(config_path: &str) -> anyhow::Result<()> {
    let config = OnboardConfig::load(Path::new(config_path))?;
    config.validate()?;

    println!("Testing LDAP connection to {}...", config.directory.server);

    let client = AdClient::new(&config.directory);
    match client.test_connection().await {
        Ok(()) => {
            println!("LDAP connection successful!");
            Ok(())
        }
        Err(e) => {
            println!("LDAP connection failed: {e}");
            Err(e.into())
        }
    }
}
