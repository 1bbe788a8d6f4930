//! acme-tools - Main entry point
//!
//! Registers ACME accounts and requests certificates through DNS-01
//! challenges.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use acme_tools::api::{create_account_file, request_certificate, RequestOptions};
use acme_tools::dns::{HickoryResolver, Resolver};
use acme_tools::logging::{init_logging, LogFormat};
use acme_tools::{storage, AccountManager, KeyType, RecordType, LETSENCRYPT_STAGING, VERSION};
use acme_tools_config::{Config, DEFAULT_CONFIG_TOML};

/// acme-tools - Obtain certificates from an ACME CA using DNS-01 challenges
#[derive(Parser, Debug)]
#[command(name = "acme-tools")]
#[command(author, version = VERSION, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Configuration file path (TOML or JSON)
    #[arg(short = 'c', long = "config", env = "ACME_TOOLS_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long = "verbose", global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long = "log-format", value_enum, default_value_t = LogFormat::Text, global = true)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Manage ACME accounts
    #[command(subcommand)]
    Account(AccountCommands),

    /// Request a certificate
    Request {
        /// Domain to include (repeatable, the first one names the output files)
        #[arg(short = 'd', long = "domain")]
        domains: Vec<String>,

        /// Account file created by `account create`
        #[arg(long = "account-file", env = "ACME_TOOLS_ACCOUNT_FILE")]
        account_file: Option<PathBuf>,

        /// Certificate key type (EC256, EC384, RSA2048, RSA3072, RSA4096)
        #[arg(long = "key-type")]
        key_type: Option<KeyType>,

        /// Directory receiving the key and certificate chain
        #[arg(long = "out-dir")]
        out_dir: Option<PathBuf>,

        /// Bound on order validation and finalization, in seconds
        #[arg(long = "timeout-secs")]
        timeout_secs: Option<u64>,
    },

    /// Resolve a DNS record the way propagation checks do
    Resolve {
        /// Fully qualified domain name
        fqdn: String,

        /// Record type (A, CNAME, NS, TXT, SOA)
        #[arg(short = 't', long = "type", default_value = "TXT")]
        record_type: RecordType,

        /// Nameserver to query (repeatable)
        #[arg(long = "nameserver")]
        nameservers: Vec<IpAddr>,
    },

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Print version information
    Version,
}

#[derive(Subcommand, Debug)]
enum AccountCommands {
    /// Register a new account and write it to a file
    Create {
        /// Contact email
        #[arg(long = "email")]
        email: Option<String>,

        /// ACME directory URL
        #[arg(long = "directory", conflicts_with = "staging")]
        directory: Option<String>,

        /// Use the Let's Encrypt staging directory
        #[arg(long = "staging")]
        staging: bool,

        /// Account file to write
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// Overwrite an existing account file
        #[arg(long = "force")]
        force: bool,
    },

    /// Load an account file and print its details
    Show {
        /// Account file to read
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },

    /// Deactivate the account stored in a file
    Deactivate {
        /// Account file to read
        #[arg(short = 'f', long = "file")]
        file: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Write the default configuration
    Init {
        /// Destination file
        #[arg(short = 'o', long = "output", default_value = "acme-tools.toml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long = "force")]
        force: bool,
    },

    /// Load and validate the configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Both instant-acme and reqwest build TLS clients
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format)?;

    match cli.command {
        Commands::Version => {
            println!("acme-tools {}", VERSION);
            Ok(())
        }
        Commands::Config(ConfigCommands::Init { output, force }) => init_config(&output, force),
        Commands::Config(ConfigCommands::Check) => check_config(cli.config.as_deref()),
        Commands::Account(command) => {
            let config = load_config(cli.config.as_deref())?;
            run_account_command(command, &config).await
        }
        Commands::Request {
            domains,
            account_file,
            key_type,
            out_dir,
            timeout_secs,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let request = CertificateRequest {
                domains,
                account_file,
                key_type,
                out_dir,
                timeout_secs,
            };
            run_request(request, &config).await
        }
        Commands::Resolve {
            fqdn,
            record_type,
            nameservers,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let nameservers = if nameservers.is_empty() {
                config.propagation.nameservers
            } else {
                nameservers
            };
            resolve(&fqdn, record_type, &nameservers).await
        }
    }
}

/// Load the configuration file, or built-in defaults without one
fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            Config::from_file(path).context("Failed to load configuration file")
        }
        None => Ok(Config::default()),
    }
}

async fn run_account_command(command: AccountCommands, config: &Config) -> Result<()> {
    match command {
        AccountCommands::Create {
            email,
            directory,
            staging,
            output,
            force,
        } => {
            let email = email
                .or_else(|| config.account.email.clone())
                .context("An email address is required (--email or account.email)")?;
            let directory = match (directory, staging) {
                (Some(directory), _) => directory,
                (None, true) => LETSENCRYPT_STAGING.to_string(),
                (None, false) => config.account.directory_url().to_string(),
            };
            let output = output.unwrap_or_else(|| config.account.file.clone());

            if !force {
                storage::ensure_absent(&output)?;
            }

            info!(email = %email, directory = %directory, "Registering account");
            create_account_file(&output, &email, &directory)
                .await
                .context("Failed to create account")?;

            println!("Account created: {}", output.display());
            Ok(())
        }
        AccountCommands::Show { file } => {
            let file = file.unwrap_or_else(|| config.account.file.clone());
            let manager = AccountManager::import_from_file(&file)
                .await
                .with_context(|| format!("Failed to load account file {}", file.display()))?;

            println!("Email:     {}", manager.email());
            println!("Directory: {}", manager.directory());
            if let Some(id) = manager.account_id() {
                println!("Account:   {}", id);
            }
            Ok(())
        }
        AccountCommands::Deactivate { file } => {
            let file = file.unwrap_or_else(|| config.account.file.clone());
            let mut manager = AccountManager::import_from_file(&file)
                .await
                .with_context(|| format!("Failed to load account file {}", file.display()))?;

            manager
                .deactivate()
                .await
                .context("Failed to deactivate account")?;

            println!("Account deactivated: {}", file.display());
            warn!(
                path = %file.display(),
                "The account file can no longer be used to request certificates"
            );
            Ok(())
        }
    }
}

/// Command line overrides of a certificate request
struct CertificateRequest {
    domains: Vec<String>,
    account_file: Option<PathBuf>,
    key_type: Option<KeyType>,
    out_dir: Option<PathBuf>,
    timeout_secs: Option<u64>,
}

async fn run_request(request: CertificateRequest, config: &Config) -> Result<()> {
    let domains = if request.domains.is_empty() {
        config.certificate.domains.clone()
    } else {
        request.domains
    };
    let Some(primary) = domains.first().cloned() else {
        bail!("No domains to request (use --domain or certificate.domains)");
    };

    let mut options = RequestOptions::from_config(config).context("Failed to set up DNS provider")?;
    if let Some(key_type) = request.key_type {
        options = options.with_key_type(key_type);
    }
    if let Some(secs) = request.timeout_secs {
        options = options.with_timeout(Duration::from_secs(secs));
    }

    let account_file = request
        .account_file
        .unwrap_or_else(|| config.account.file.clone());
    let out_dir = request
        .out_dir
        .unwrap_or_else(|| config.certificate.output_dir.clone());

    let issued = request_certificate(&domains, &account_file, options)
        .await
        .context("Certificate request failed")?;

    let (key_path, cert_path) = storage::save_certificate(&out_dir, &primary, &issued)
        .context("Failed to save certificate")?;

    let remaining = issued.not_after - chrono::Utc::now();
    if remaining.num_days() < 30 {
        warn!(expires = %issued.not_after, "Issued certificate expires in less than 30 days");
    }

    println!("Private key:       {}", key_path.display());
    println!("Certificate chain: {}", cert_path.display());
    println!("Expires:           {}", issued.not_after.to_rfc3339());
    Ok(())
}

async fn resolve(fqdn: &str, record_type: RecordType, nameservers: &[IpAddr]) -> Result<()> {
    let resolver = HickoryResolver::new(nameservers);
    info!(fqdn = %fqdn, record_type = %record_type, nameservers = ?resolver.nameservers(), "Resolving");

    let values = resolver
        .resolve(fqdn, record_type)
        .await
        .with_context(|| format!("Failed to resolve {} {}", record_type, fqdn))?;

    if values.is_empty() {
        println!("No {} records found for {}", record_type, fqdn);
    }
    for value in values {
        println!("{}", value);
    }
    Ok(())
}

fn init_config(output: &Path, force: bool) -> Result<()> {
    if !force {
        storage::ensure_absent(output)?;
    }
    let path = storage::write_file(output, DEFAULT_CONFIG_TOML.trim_start(), true)
        .with_context(|| format!("Failed to write default config to {}", output.display()))?;

    println!("Configuration written to {}", path.display());
    Ok(())
}

fn check_config(path: Option<&Path>) -> Result<()> {
    let config = match path {
        Some(path) => {
            info!("Checking configuration file: {}", path.display());
            Config::from_file(path).context("Failed to load configuration file")?
        }
        None => {
            info!("Checking embedded default configuration");
            Config::default_embedded().context("Failed to load embedded configuration")?
        }
    };

    println!("Configuration OK");
    println!("  directory:    {}", config.account.directory_url());
    println!("  account file: {}", config.account.file.display());
    println!("  domains:      {}", config.certificate.domains.join(", "));
    println!("  key type:     {}", config.certificate.key_type);
    println!("  dns provider: {}", config.dns_provider.provider.name());

    if config.account.email.is_none() {
        warn!("account.email is not set; `account create` will need --email");
    }
    Ok(())
}
