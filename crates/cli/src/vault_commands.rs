//! CLI commands over the vault.

use std::sync::Arc;

use {
    clap::{Args, Subcommand},
    ledgerlock_config::LedgerlockConfig,
    ledgerlock_vault::{
        Domain, MigrationReport, MigrationService, SqliteStore, Vault, VaultOptions, VaultStatus,
    },
    tracing::debug,
};

/// PIN argument shared by every command that needs an unlocked vault.
#[derive(Args, Debug)]
pub struct PinArg {
    /// Vault PIN (4-6 digits).
    #[arg(long, env = "LEDGERLOCK_PIN", hide_env_values = true)]
    pub pin: String,
}

#[derive(Subcommand, Debug)]
pub enum VaultCommand {
    /// Create the vault and set its PIN.
    Setup {
        #[command(flatten)]
        pin: PinArg,
        /// Also escrow the data key behind platform biometrics.
        #[arg(long)]
        biometric: bool,
    },
    /// Show whether the vault exists, lockout state and settings.
    Status,
    /// Check the PIN and import any legacy plaintext records.
    Unlock {
        #[command(flatten)]
        pin: PinArg,
    },
    /// Change the PIN without re-encrypting any data.
    ChangePin {
        #[arg(long)]
        old: String,
        #[arg(long)]
        new: String,
    },
    /// Encrypt a JSON value into a domain, replacing what was there.
    Put {
        domain: Domain,
        /// JSON document, e.g. '[{"id":"inv_1","qty":5}]'.
        json: String,
        #[command(flatten)]
        pin: PinArg,
    },
    /// Decrypt and print a domain.
    Get {
        domain: Domain,
        #[command(flatten)]
        pin: PinArg,
    },
    /// Delete a domain's encrypted data.
    Remove {
        domain: Domain,
        #[command(flatten)]
        pin: PinArg,
    },
    /// Import legacy plaintext records into the vault.
    Migrate {
        #[command(flatten)]
        pin: PinArg,
    },
    /// Set the inactivity timeout (0 = never).
    AutoLock {
        minutes: u32,
        #[command(flatten)]
        pin: PinArg,
    },
    /// Delete the vault and all encrypted data. Legacy plaintext is kept.
    Reset {
        /// Confirm the irreversible deletion.
        #[arg(long)]
        yes: bool,
    },
}

pub async fn handle_vault(command: VaultCommand, config: &LedgerlockConfig) -> anyhow::Result<()> {
    let vault = open_vault(config).await?;

    match command {
        VaultCommand::Setup { pin, biometric } => {
            vault.setup(&pin.pin, biometric).await?;
            println!("Vault created.");
            print_report(&MigrationService::new(vault).run_once().await?);
        },
        VaultCommand::Status => {
            let status = vault.status().await?;
            let security = vault.security_status().await?;
            println!("Status:          {}", status_label(status));
            if security.pin_set {
                println!("Auto-lock:       {}", auto_lock_label(security.auto_lock_minutes));
                let biometric = if security.biometric_enabled {
                    "enabled"
                } else {
                    "disabled"
                };
                println!("Biometric:       {biometric}");
                println!("Failed attempts: {}", security.failed_attempts);
                if let Some(minutes) = security.locked_out_minutes {
                    println!("Locked out:      {minutes} more minute(s)");
                }
            }
        },
        VaultCommand::Unlock { pin } => {
            vault.unlock(&pin.pin).await?;
            println!("PIN accepted.");
            print_report(&MigrationService::new(vault).run_once().await?);
        },
        VaultCommand::ChangePin { old, new } => {
            vault.unlock(&old).await?;
            vault.change_pin(&old, &new).await?;
            println!("PIN changed.");
        },
        VaultCommand::Put { domain, json, pin } => {
            let value: serde_json::Value = serde_json::from_str(&json)
                .map_err(|e| anyhow::anyhow!("invalid JSON for {domain}: {e}"))?;
            vault.unlock(&pin.pin).await?;
            vault.encrypt(domain, &value).await?;
            println!("Stored {domain}.");
        },
        VaultCommand::Get { domain, pin } => {
            vault.unlock(&pin.pin).await?;
            match vault.decrypt(domain).await? {
                Some(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                None => println!("No {domain} data stored."),
            }
        },
        VaultCommand::Remove { domain, pin } => {
            vault.unlock(&pin.pin).await?;
            if vault.remove(domain).await? {
                println!("Removed {domain}.");
            } else {
                println!("No {domain} data stored.");
            }
        },
        VaultCommand::Migrate { pin } => {
            vault.unlock(&pin.pin).await?;
            let report = MigrationService::new(vault).run_once().await?;
            if report.is_empty() {
                println!("Nothing to migrate.");
            }
            print_report(&report);
        },
        VaultCommand::AutoLock { minutes, pin } => {
            vault.unlock(&pin.pin).await?;
            vault.set_auto_lock_minutes(minutes).await?;
            println!("Auto-lock set to {}.", auto_lock_label(minutes));
        },
        VaultCommand::Reset { yes } => {
            if !yes {
                anyhow::bail!("refusing to delete the vault without --yes");
            }
            vault.reset().await?;
            println!("Vault deleted. Run `ledgerlock setup` to start over.");
        },
    }

    Ok(())
}

async fn open_vault(config: &LedgerlockConfig) -> anyhow::Result<Arc<Vault>> {
    let path = ledgerlock_config::database_path(config);
    debug!(path = %path.display(), "opening vault database");
    let store = SqliteStore::open(&path).await?;
    Ok(Arc::new(
        Vault::new(Arc::new(store)).with_options(VaultOptions::from(config)),
    ))
}

fn print_report(report: &MigrationReport) {
    for domain in &report.migrated {
        println!("Migrated {domain} into the vault.");
    }
    for domain in &report.already_encrypted {
        println!("Removed leftover plaintext {domain}.");
    }
    for domain in &report.failed {
        eprintln!("Could not migrate {domain}: stored value is not valid JSON (left untouched).");
    }
}

fn status_label(status: VaultStatus) -> &'static str {
    match status {
        VaultStatus::Uninitialized => "not set up",
        VaultStatus::Locked => "locked",
        VaultStatus::Unlocked => "unlocked",
    }
}

fn auto_lock_label(minutes: u32) -> String {
    match minutes {
        0 => "never".to_string(),
        1 => "1 minute".to_string(),
        n => format!("{n} minutes"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels() {
        assert_eq!(auto_lock_label(0), "never");
        assert_eq!(auto_lock_label(1), "1 minute");
        assert_eq!(auto_lock_label(15), "15 minutes");
        assert_eq!(status_label(VaultStatus::Uninitialized), "not set up");
    }
}
