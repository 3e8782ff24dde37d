/*!
 * Init command: first-run configuration wizard
 *
 * Asks for the provider, its coordinates, credentials and the source
 * directory, then writes `~/.oci-uploader/config.toml` (or the `--config`
 * path).
 */

use crate::config::{Provider, UploadConfig};
use anyhow::Result;
use console::style;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Password, Select};
use secrecy::SecretString;
use std::path::{Path, PathBuf};

/// Environment variable read for the secret key when it is not in the file
pub const SECRET_KEY_ENV: &str = "OCI_UPLOADER_SECRET_KEY";

/// Answers collected by the wizard
#[derive(Debug, Clone, Default)]
pub struct WizardAnswers {
    pub provider: Provider,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_key: Option<String>,
    pub source_dir: Option<PathBuf>,
    pub max_size_gb: Option<f64>,
}

/// Run the interactive initialization wizard
pub fn run_init_wizard(config_path: Option<&Path>) -> Result<()> {
    print_welcome();

    let config_path = match config_path {
        Some(path) => path.to_path_buf(),
        None => get_default_config_path()?,
    };
    if config_path.exists()
        && !Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Existing configuration found. Overwrite?")
            .default(false)
            .interact()?
    {
        println!("\n{}", style("Configuration unchanged.").cyan());
        return Ok(());
    }

    let answers = interview()?;
    let store_secret = answers.secret_key.is_some();
    let config = build_config(answers);

    // The secret may come from the environment later; check everything else
    let mut check = config.clone();
    if check.secret_key.is_none() {
        check.secret_key = Some(SecretString::from("unset"));
    }
    check
        .validate()
        .map_err(|e| anyhow::anyhow!("Configuration is not usable: {}", e))?;

    config
        .to_file(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to save configuration: {}", e))?;

    print_summary(&config_path, &config, store_secret);
    Ok(())
}

fn interview() -> Result<WizardAnswers> {
    let theme = ColorfulTheme::default();

    println!("\n{}", style("Object Store").cyan().bold());
    let providers = &[
        "Oracle Cloud Object Storage",
        "Cloudflare R2",
        "Other S3-compatible endpoint",
    ];
    let selection = Select::with_theme(&theme)
        .with_prompt("Where should files be uploaded?")
        .default(0)
        .items(providers)
        .interact()?;

    let provider = match selection {
        0 => Provider::Oci {
            namespace: Input::with_theme(&theme)
                .with_prompt("Object Storage namespace")
                .interact_text()?,
            region: Input::with_theme(&theme)
                .with_prompt("Region")
                .default("ap-hyderabad-1".to_string())
                .interact_text()?,
        },
        1 => Provider::R2 {
            account_id: Input::with_theme(&theme)
                .with_prompt("Account ID")
                .interact_text()?,
            public_base_url: optional_input(&theme, "Public bucket URL (blank for none)")?,
        },
        _ => Provider::Custom {
            endpoint: Input::with_theme(&theme)
                .with_prompt("Endpoint URL")
                .interact_text()?,
            region: Input::with_theme(&theme)
                .with_prompt("Region")
                .default("us-east-1".to_string())
                .interact_text()?,
            public_base_url: optional_input(&theme, "Public bucket URL (blank for none)")?,
        },
    };

    let bucket: String = Input::with_theme(&theme)
        .with_prompt("Bucket name")
        .interact_text()?;

    println!("\n{}", style("Credentials").cyan().bold());
    let access_key_id: String = Input::with_theme(&theme)
        .with_prompt("Access key ID")
        .interact_text()?;

    let store_secret = Confirm::with_theme(&theme)
        .with_prompt(format!(
            "Store the secret key in the config file? (otherwise set {})",
            SECRET_KEY_ENV
        ))
        .default(false)
        .interact()?;
    let secret_key = if store_secret {
        Some(
            Password::with_theme(&theme)
                .with_prompt("Secret access key")
                .interact()?,
        )
    } else {
        None
    };

    println!("\n{}", style("Upload").cyan().bold());
    let source_dir = optional_input(&theme, "Source directory (blank to pass --source)")?
        .map(PathBuf::from);
    let max_size_gb = optional_input(&theme, "Bucket size limit in GB (blank for none)")?
        .map(|s| s.parse::<f64>())
        .transpose()
        .map_err(|e| anyhow::anyhow!("Invalid size limit: {}", e))?;

    Ok(WizardAnswers {
        provider,
        bucket,
        access_key_id,
        secret_key,
        source_dir,
        max_size_gb,
    })
}

fn optional_input(theme: &ColorfulTheme, prompt: &str) -> Result<Option<String>> {
    let value: String = Input::with_theme(theme)
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    let value = value.trim();
    Ok(if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    })
}

/// Turn wizard answers into a configuration with default tuning
pub fn build_config(answers: WizardAnswers) -> UploadConfig {
    UploadConfig {
        provider: answers.provider,
        bucket: answers.bucket.trim().to_string(),
        access_key_id: answers.access_key_id.trim().to_string(),
        secret_key: answers
            .secret_key
            .filter(|s| !s.is_empty())
            .map(SecretString::from),
        source_dir: answers.source_dir,
        max_size_gb: answers.max_size_gb,
        ..Default::default()
    }
}

/// Print welcome banner
fn print_welcome() {
    println!();
    println!(
        "{}",
        style("╔════════════════════════════════════════╗").cyan()
    );
    println!(
        "{}",
        style("║    ☁ Welcome to oci-uploader setup     ║").cyan()
    );
    println!(
        "{}",
        style("╚════════════════════════════════════════╝").cyan()
    );
    println!();
    println!("This wizard creates the configuration used by 'oci-uploader upload'.");
}

/// Get the default configuration file path
fn get_default_config_path() -> Result<PathBuf> {
    UploadConfig::default_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine home directory"))
}

/// Print configuration summary
fn print_summary(config_path: &Path, config: &UploadConfig, secret_stored: bool) {
    println!();
    println!(
        "{}",
        style("╔════════════════════════════════════════╗").green()
    );
    println!(
        "{}",
        style("║    ✅ Configuration Saved              ║").green()
    );
    println!(
        "{}",
        style("╚════════════════════════════════════════╝").green()
    );
    println!();
    println!("  Location: {}", style(config_path.display()).cyan());
    println!();
    println!("  {}", style("Configuration Summary:").bold());
    println!("  ─────────────────────────");
    println!("  Provider:   {}", style(config.provider.name()).yellow());
    println!(
        "  Endpoint:   {}",
        style(config.provider.endpoint_url()).yellow()
    );
    println!("  Bucket:     {}", style(&config.bucket).yellow());
    if let Some(dir) = &config.source_dir {
        println!("  Source:     {}", style(dir.display()).yellow());
    }
    if let Some(gb) = config.max_size_gb {
        println!("  Size limit: {}", style(format!("{} GB", gb)).yellow());
    }
    println!();
    println!("  {}", style("Next Steps:").bold());
    if !secret_stored {
        println!("  1. export {}=<your secret key>", SECRET_KEY_ENV);
    } else {
        println!(
            "  1. Keep {} private, it contains your secret key",
            config_path.display()
        );
    }
    println!("  2. Run 'oci-uploader upload' to upload the source directory");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    fn oci_answers() -> WizardAnswers {
        WizardAnswers {
            provider: Provider::Oci {
                namespace: "axaxnpcrorw5".to_string(),
                region: "ap-hyderabad-1".to_string(),
            },
            bucket: " media ".to_string(),
            access_key_id: "AKID".to_string(),
            secret_key: Some("s3cr3t".to_string()),
            source_dir: Some(PathBuf::from("/data/upload")),
            max_size_gb: Some(10.0),
        }
    }

    #[test]
    fn test_build_config_from_answers() {
        let config = build_config(oci_answers());
        assert_eq!(config.bucket, "media");
        assert_eq!(
            config.secret_key.as_ref().map(|s| s.expose_secret().to_string()),
            Some("s3cr3t".to_string())
        );
        assert_eq!(config.max_size_bytes(), Some(10 * 1024 * 1024 * 1024));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_secret_is_not_stored() {
        let config = build_config(WizardAnswers {
            secret_key: Some(String::new()),
            ..oci_answers()
        });
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn test_wizard_config_round_trips() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join(".oci-uploader").join("config.toml");

        let config = build_config(WizardAnswers {
            secret_key: None,
            ..oci_answers()
        });
        config.to_file(&path).unwrap();

        let loaded = UploadConfig::from_file(&path).unwrap();
        assert_eq!(loaded.provider, config.provider);
        assert_eq!(loaded.bucket, "media");
        assert!(loaded.secret_key.is_none());
        assert!(!std::fs::read_to_string(&path).unwrap().contains("secret_key"));
    }
}
