mod backup;
mod base32;
mod clipboard;
mod key;
mod migration;
mod prompt;
mod qr;
mod store;
mod totp;

use crate::clipboard::copy_to_clipboard;
use crate::key::TotpKey;
use crate::prompt::{prompt_string, prompt_with_default};
use crate::store::{find_key, has_duplicate, load_keys, merge_keys, save_keys, store_path};
use anyhow::{Result, anyhow};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "otpm", version, about = "Minimal TOTP authenticator in Rust")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Add a new TOTP key (prompts for account and secret)
    Add {
        /// Display name, e.g. "GitHub"
        name: String,
    },

    /// Edit an existing key
    Edit {
        /// Display name of the key to edit
        name: String,
    },

    /// Delete a key
    Rm {
        /// Display name of the key to delete
        name: String,
    },

    /// List stored keys
    Ls,

    /// Print the current code for a key
    Show {
        /// Display name of the key
        name: String,
        /// Show as JSON (code + seconds remaining)
        #[arg(long)]
        json: bool,
    },

    /// Copy the current code to the clipboard
    Clip {
        /// Display name of the key
        name: String,
    },

    /// Live view of all codes with a per-second countdown
    Watch,

    /// Export all keys as a Google Authenticator migration URL
    ///
    /// Examples:
    ///   otpm export
    ///   otpm export --qr export.png
    Export {
        /// Also write the URL as a QR code PNG
        #[arg(long, value_name = "FILE")]
        qr: Option<PathBuf>,
    },

    /// Import keys from a migration URL
    ///
    /// Examples:
    ///   otpm import 'otpauth-migration://offline?data=...'
    Import {
        /// The otpauth-migration:// URL
        url: String,
    },

    /// JSON backup of the key store
    Backup {
        #[command(subcommand)]
        cmd: BackupCommands,
    },
}

#[derive(Subcommand, Debug)]
enum BackupCommands {
    /// Write all keys to a JSON backup file
    ///
    /// Examples:
    ///   otpm backup create
    ///   otpm backup create my_backup.json
    Create {
        /// Optional backup filename
        file: Option<String>,
    },
    /// Import keys from a JSON backup file
    Restore {
        /// Backup file to read
        file: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Add { name } => cmd_add(&name)?,
        Commands::Edit { name } => cmd_edit(&name)?,
        Commands::Rm { name } => cmd_rm(&name)?,
        Commands::Ls => cmd_ls()?,
        Commands::Show { name, json } => cmd_show(&name, json)?,
        Commands::Clip { name } => cmd_clip(&name)?,
        Commands::Watch => cmd_watch()?,
        Commands::Export { qr } => cmd_export(qr)?,
        Commands::Import { url } => cmd_import(&url)?,
        Commands::Backup { cmd } => match cmd {
            BackupCommands::Create { file } => cmd_backup_create(file)?,
            BackupCommands::Restore { file } => cmd_backup_restore(&file)?,
        },
    }

    Ok(())
}

fn cmd_add(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("Key name cannot be empty");
    }

    let account = prompt_string("Account (optional, e.g. alice@example.com): ")?;
    let raw_secret = prompt_string("Secret (Base32): ")?;
    // Users paste secrets with spaces or lowercase letters; normalize first.
    let secret = base32::normalize(&raw_secret);
    if !base32::is_valid(&secret) {
        anyhow::bail!("Invalid secret key format. Please enter a valid Base32 key.");
    }

    let path = store_path()?;
    let mut keys = load_keys(&path)?;
    let key = TotpKey::new(name, account.trim(), secret);
    if has_duplicate(&keys, &key) {
        anyhow::bail!("A key named '{}' with that account already exists", name);
    }

    keys.push(key);
    save_keys(&path, &keys)?;
    println!("Key added successfully");
    Ok(())
}

fn cmd_edit(name: &str) -> Result<()> {
    let path = store_path()?;
    let mut keys = load_keys(&path)?;
    let idx = find_key(&keys, name).ok_or_else(|| anyhow!("No key named '{}'", name))?;

    let new_name = prompt_with_default("Name", &keys[idx].name)?;
    let new_account = prompt_with_default("Account", &keys[idx].account)?;
    let new_secret = base32::normalize(&prompt_with_default("Secret", &keys[idx].secret)?);
    if !base32::is_valid(&new_secret) {
        anyhow::bail!("Invalid secret key format. Please enter a valid Base32 key.");
    }

    keys[idx].name = new_name.trim().to_string();
    keys[idx].account = new_account.trim().to_string();
    keys[idx].secret = new_secret;

    save_keys(&path, &keys)?;
    println!("Key updated successfully");
    Ok(())
}

fn cmd_rm(name: &str) -> Result<()> {
    let path = store_path()?;
    let mut keys = load_keys(&path)?;
    let idx = find_key(&keys, name).ok_or_else(|| anyhow!("No key named '{}'", name))?;

    let answer = prompt_string(&format!("Delete key '{}'? [y/N]: ", name))?;
    if !matches!(answer.trim(), "y" | "Y" | "yes") {
        println!("Aborted.");
        return Ok(());
    }

    keys.remove(idx);
    save_keys(&path, &keys)?;
    println!("Key deleted successfully");
    Ok(())
}

fn cmd_ls() -> Result<()> {
    let keys = load_keys(&store_path()?)?;
    if keys.is_empty() {
        println!("No keys stored. Run `otpm add <name>` first.");
        return Ok(());
    }

    for key in &keys {
        if key.account.is_empty() {
            println!("{}", key.name);
        } else {
            println!("{} ({})", key.name, key.account);
        }
    }
    Ok(())
}

fn cmd_show(name: &str, json: bool) -> Result<()> {
    let keys = load_keys(&store_path()?)?;
    let idx = find_key(&keys, name).ok_or_else(|| anyhow!("No key named '{}'", name))?;

    let now = totp::now_unix();
    let code = totp::generate_at(&keys[idx].secret, now);

    if json {
        let out = serde_json::json!({
            "name": keys[idx].name,
            "account": keys[idx].account,
            "code": code,
            "secondsRemaining": totp::seconds_remaining(now),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("{code}");
    }
    Ok(())
}

fn cmd_clip(name: &str) -> Result<()> {
    let keys = load_keys(&store_path()?)?;
    let idx = find_key(&keys, name).ok_or_else(|| anyhow!("No key named '{}'", name))?;

    let code = totp::generate(&keys[idx].secret);
    if code == totp::FAILURE_CODE {
        anyhow::bail!("Cannot generate a code for '{}': invalid secret", name);
    }

    copy_to_clipboard(&code)?;
    println!("Code copied to clipboard.");
    Ok(())
}

/// Redraw every second; codes are recomputed only when the 30-second
/// time-step ticks over.
fn cmd_watch() -> Result<()> {
    let keys = load_keys(&store_path()?)?;
    if keys.is_empty() {
        println!("No keys stored. Run `otpm add <name>` first.");
        return Ok(());
    }

    let width = keys
        .iter()
        .map(|k| display_label(k).len())
        .max()
        .unwrap_or(0);

    let mut last_step = u64::MAX;
    let mut codes: Vec<String> = Vec::new();

    loop {
        let now = totp::now_unix();
        let step = totp::time_step(now);
        if step != last_step {
            codes = keys
                .iter()
                .map(|k| totp::generate_at(&k.secret, now))
                .collect();
            last_step = step;
        }

        print!("\x1B[2J\x1B[H"); // clear screen, home cursor
        println!(
            "otpm — codes change in {}s (Ctrl-C to quit)\n",
            totp::seconds_remaining(now)
        );
        for (key, code) in keys.iter().zip(&codes) {
            println!(
                "{:<width$}  {}",
                display_label(key),
                totp::format_code(code),
                width = width
            );
        }
        std::io::stdout().flush()?;
        std::thread::sleep(std::time::Duration::from_secs(1));
    }
}

fn display_label(key: &TotpKey) -> String {
    if key.account.is_empty() {
        key.name.clone()
    } else {
        format!("{} ({})", key.name, key.account)
    }
}

fn cmd_export(qr_file: Option<PathBuf>) -> Result<()> {
    let keys = load_keys(&store_path()?)?;
    let url = migration::encode_url(&keys)?;
    println!("{url}");

    if let Some(path) = qr_file {
        qr::write_qr_png(&url, &path)?;
        eprintln!("QR code written to {}", path.display());
    }
    Ok(())
}

fn cmd_import(url: &str) -> Result<()> {
    let imported = migration::decode_url(url)?;
    if imported.is_empty() {
        println!("No TOTP entries found in the migration payload.");
        return Ok(());
    }

    let path = store_path()?;
    let mut keys = load_keys(&path)?;
    let (added, skipped) = merge_keys(&mut keys, imported);
    if added > 0 {
        save_keys(&path, &keys)?;
    }

    println!("Imported {added} key(s), skipped {skipped} duplicate(s).");
    Ok(())
}

fn cmd_backup_create(file: Option<String>) -> Result<()> {
    let keys = load_keys(&store_path()?)?;
    let written = backup::backup_create(&keys, file)?;
    println!("Backup created at {written}");
    Ok(())
}

fn cmd_backup_restore(file: &std::path::Path) -> Result<()> {
    let result = backup::backup_read(file)?;
    if result.dropped > 0 {
        println!("Dropped {} invalid record(s).", result.dropped);
    }

    let path = store_path()?;
    let mut keys = load_keys(&path)?;
    let (added, skipped) = merge_keys(&mut keys, result.keys);
    if added > 0 {
        save_keys(&path, &keys)?;
    }

    println!("Restored {added} key(s), skipped {skipped} duplicate(s).");
    Ok(())
}
