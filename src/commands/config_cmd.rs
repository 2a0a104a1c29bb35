use clap::{Args, Subcommand};

use super::OutputFormat;
use crate::config::Config;

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },
}

impl ConfigCommand {
    pub fn run(&self, config: &Config) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        let mut value = serde_json::to_value(config)?;
                        // Never print the API key
                        if value["remote"]["api_key"].is_string() {
                            value["remote"]["api_key"] = "********".into();
                        }
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!("database_path: {}", config.database_path.value.display());
                        println!("  source: {}", config.database_path.source);
                        println!();

                        println!("media_dir: {}", config.media_dir.value.display());
                        println!("  source: {}", config.media_dir.source);
                        println!();

                        let remote = &config.remote;
                        println!(
                            "remote.base_url: {}",
                            remote.base_url.as_deref().unwrap_or("(not set)")
                        );
                        println!(
                            "remote.api_key: {}",
                            if remote.api_key.is_some() { "********" } else { "(not set)" }
                        );
                        println!(
                            "remote.user_id: {}",
                            remote.user_id.as_deref().unwrap_or("(not set)")
                        );
                        println!();

                        for (name, policy) in [
                            ("read", &config.policies.read),
                            ("write", &config.policies.write),
                            ("metadata", &config.policies.metadata),
                        ] {
                            println!(
                                "policies.{}: timeout {}ms, {} retries, {}ms apart{}",
                                name,
                                policy.timeout_ms,
                                policy.max_retries,
                                policy.retry_delay_ms,
                                if policy.throw_on_timeout { "" } else { ", best effort" }
                            );
                        }
                    }
                }
                Ok(())
            }
        }
    }
}
