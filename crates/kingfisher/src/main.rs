use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use kingfisher_syslog::config::{self, LogFormat, LoggingConfig, SyslogConfig};
use kingfisher_syslog::server::SyslogServer;

#[derive(Parser)]
#[command(name = "kingfisher")]
#[command(about = "Cisco ISE syslog ingestion service", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/kingfisher/config.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the syslog ingestion server
    Server {
        /// Write the default configuration file and exit
        #[arg(long)]
        init_config: bool,

        /// Validate the configuration and exit
        #[arg(long)]
        check_config: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Server {
            init_config,
            check_config,
        } => {
            let syslog_config = if cli.config.exists() {
                config::load_config(&cli.config)?
            } else {
                let mut defaults = SyslogConfig::default();
                config::apply_env_overrides(&mut defaults);
                defaults
            };

            if init_config {
                config::write_config(&cli.config, &syslog_config)?;
                println!("Wrote config to {}", cli.config.display());
                return Ok(());
            }

            config::validate_config(&syslog_config)?;

            if check_config {
                println!("Config OK: {}", cli.config.display());
                return Ok(());
            }

            // The appender guard must outlive the server so buffered log
            // lines reach the file on shutdown.
            let _log_guard = init_logging(&syslog_config.logging)?;

            SyslogServer::new(syslog_config).run().await?;
        }
    }

    Ok(())
}

fn init_logging(
    logging: &LoggingConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    if let Some(ref log_file) = logging.file {
        let dir = match log_file.parent() {
            Some(path) => path,
            None => std::path::Path::new("."),
        };
        let file_name = log_file
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("logging.file must include a file name"))?;
        let file_appender = tracing_appender::rolling::never(dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        match logging.format {
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(EnvFilter::new(logging.level.clone()))
                    .with_writer(non_blocking)
                    .init();
            }
            LogFormat::Text => {
                tracing_subscriber::fmt()
                    .with_env_filter(EnvFilter::new(logging.level.clone()))
                    .with_writer(non_blocking)
                    .init();
            }
        }

        Ok(Some(guard))
    } else {
        match logging.format {
            LogFormat::Json => {
                tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(EnvFilter::new(logging.level.clone()))
                    .init();
            }
            LogFormat::Text => {
                tracing_subscriber::fmt()
                    .with_env_filter(EnvFilter::new(logging.level.clone()))
                    .init();
            }
        }

        Ok(None)
    }
}
