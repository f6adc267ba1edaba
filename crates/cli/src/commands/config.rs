use anyhow::{bail, Result};
use clap::{Args, Subcommand};
use console::style;
use infrastructure::config::{AppConfig, ConfigLoader, ConfigSource, ConfigValidator};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration and where it came from
    Show,
    /// Print an example configuration file
    Example,
    /// Write the default configuration to a file
    #[command(alias = "gen")]
    Generate {
        #[arg(short, long, default_value = "succession.toml")]
        output: PathBuf,
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
    /// Check the effective configuration
    #[command(alias = "check")]
    Validate,
}

impl ConfigCommand {
    pub async fn execute(self, config: &AppConfig, source: &ConfigSource) -> Result<()> {
        match self.command {
            ConfigSubcommand::Show => {
                match source {
                    ConfigSource::File(path) => {
                        println!("{} {}", style("# loaded from").dim(), path.display())
                    }
                    ConfigSource::Default => println!("{}", style("# built-in defaults").dim()),
                }
                println!("{}", toml::to_string_pretty(config)?);
            }
            ConfigSubcommand::Example => {
                println!("{}", ConfigLoader::generate_example_config());
            }
            ConfigSubcommand::Generate { output, force } => {
                if output.exists() && !force {
                    bail!("{} already exists, use --force to overwrite", output.display());
                }
                ConfigLoader::new()
                    .save_config(&AppConfig::default(), &output)
                    .await?;
                info!("Example configuration written");
                println!("{} Wrote {}", style("✓").green(), output.display());
            }
            ConfigSubcommand::Validate => {
                ConfigValidator::new().validate(config)?;
                println!("{} Configuration is valid", style("✓").green());
            }
        }
        Ok(())
    }
}
