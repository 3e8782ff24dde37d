/*!
 * oci-uploader CLI - Command Line Interface
 *
 * Version: 0.3.0
 */

use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use oci_uploader::{
    cli_style::{format_bytes, header_box, stats_table},
    config::{Destination, LogLevel, Provider, UploadConfig},
    core::{run_upload, PipelineOptions, UploadTarget, UrlIssuer, UrlReport},
    error::{Result, UploadError, EXIT_PARTIAL, EXIT_SUCCESS},
    logging,
    output::{DestinationReport, OutputWriter, UploadReport, UrlSummary},
    protocol::s3::{S3Client, S3Operations},
};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Parser)]
#[command(name = "oci-uploader")]
#[command(
    version,
    about = "Upload a folder to OCI Object Storage (or any S3-compatible store) and get public and pre-signed URLs",
    long_about = None
)]
struct Cli {
    /// Configuration file (default: ~/.oci-uploader/config.toml when present)
    #[arg(long, value_name = "FILE", global = true, env = "OCI_UPLOADER_CONFIG")]
    config: Option<PathBuf>,

    /// Log level
    #[arg(long, value_enum, global = true)]
    log_level: Option<LogLevel>,

    /// Write logs to this file as JSON instead of stderr
    #[arg(long = "log", value_name = "FILE", global = true)]
    log: Option<PathBuf>,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Machine-readable JSON Lines output
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every file of a directory, then print retrieval URLs
    Upload {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        urls: UrlArgs,

        /// Directory whose files are uploaded
        #[arg(short, long, value_name = "DIR", env = "OCI_UPLOADER_SOURCE")]
        source: Option<PathBuf>,

        /// Refuse to upload if the bucket would grow past this many GB
        #[arg(long, value_name = "GB")]
        max_size_gb: Option<f64>,

        /// Files at or above this size (MiB) use multipart upload
        #[arg(long, value_name = "MIB")]
        multipart_threshold_mb: Option<u64>,

        /// Multipart part size in MiB (5..=5120)
        #[arg(long, value_name = "MIB")]
        part_size_mb: Option<usize>,

        /// Parts of one file uploaded in parallel (1..=64)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Issue a pre-signed URL for every object already in the bucket
    Presign {
        #[command(flatten)]
        connection: ConnectionArgs,

        /// Only objects whose name starts with this prefix
        #[arg(long, default_value = "")]
        prefix: String,

        /// Validity of the URLs in seconds (max 604800)
        #[arg(long, value_name = "SECS")]
        presign_ttl: Option<u64>,

        /// Save the URLs to this file
        #[arg(long, value_name = "FILE")]
        save_urls: Option<PathBuf>,
    },

    /// Issue URLs for the given object names without uploading
    Urls {
        #[command(flatten)]
        connection: ConnectionArgs,

        #[command(flatten)]
        urls: UrlArgs,

        /// Object names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Interactive setup wizard
    Init,

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum ProviderArg {
    Oci,
    R2,
    Custom,
}

/// Where to connect and how to authenticate; every flag overrides the
/// config file
#[derive(Args, Default)]
struct ConnectionArgs {
    /// Only use this configured destination (repeatable)
    #[arg(long = "destination", value_name = "NAME")]
    destinations: Vec<String>,

    /// Object store provider
    #[arg(long, value_enum, env = "OCI_UPLOADER_PROVIDER")]
    provider: Option<ProviderArg>,

    /// OCI Object Storage namespace
    #[arg(long, env = "OCI_UPLOADER_NAMESPACE")]
    namespace: Option<String>,

    /// Region (OCI region identifier, or signing region for custom endpoints)
    #[arg(long, env = "OCI_UPLOADER_REGION")]
    region: Option<String>,

    /// Cloudflare account ID (R2)
    #[arg(long, env = "OCI_UPLOADER_ACCOUNT_ID")]
    account_id: Option<String>,

    /// S3-compatible endpoint URL (custom provider)
    #[arg(long, env = "OCI_UPLOADER_ENDPOINT")]
    endpoint: Option<String>,

    /// Base URL that serves the bucket publicly (R2 / custom)
    #[arg(long, env = "OCI_UPLOADER_PUBLIC_BASE_URL")]
    public_base_url: Option<String>,

    /// Bucket name
    #[arg(short, long, env = "OCI_UPLOADER_BUCKET")]
    bucket: Option<String>,

    /// Access key ID
    #[arg(long, env = "OCI_UPLOADER_ACCESS_KEY_ID")]
    access_key_id: Option<String>,

    /// Secret access key (prefer the environment variable)
    #[arg(long, env = "OCI_UPLOADER_SECRET_KEY", hide_env_values = true)]
    secret_key: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

/// Which URLs to issue and where to save them
#[derive(Args, Default)]
struct UrlArgs {
    /// Do not issue pre-signed URLs
    #[arg(long)]
    no_presign: bool,

    /// Do not issue public URLs
    #[arg(long)]
    no_public: bool,

    /// Validity of pre-signed URLs in seconds (max 604800)
    #[arg(long, value_name = "SECS")]
    presign_ttl: Option<u64>,

    /// Save the URLs to this file (JSON with --json)
    #[arg(long, value_name = "FILE")]
    save_urls: Option<PathBuf>,
}

impl ConnectionArgs {
    fn apply(&self, config: &mut UploadConfig) -> Result<()> {
        if !config.destinations.is_empty() && self.overrides_connection() {
            warn!("Connection flags only apply to the top-level settings, not to [[destinations]]");
        }
        config.provider = self.provider_from(&config.provider);

        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Some(id) = &self.access_key_id {
            config.access_key_id = id.clone();
        }
        if let Some(secret) = self.secret_key.as_deref().filter(|s| !s.is_empty()) {
            config.secret_key = Some(SecretString::from(secret.to_string()));
        }
        if let Some(timeout) = self.timeout {
            config.timeout_seconds = timeout;
        }
        config.select_destinations(&self.destinations)
    }

    fn overrides_connection(&self) -> bool {
        self.provider.is_some()
            || self.bucket.is_some()
            || self.access_key_id.is_some()
            || self.secret_key.is_some()
            || self.namespace.is_some()
            || self.account_id.is_some()
            || self.endpoint.is_some()
    }

    /// Provider from flags, falling back to the configured one field by field
    fn provider_from(&self, current: &Provider) -> Provider {
        let kind = self.provider.unwrap_or(match current {
            Provider::Oci { .. } => ProviderArg::Oci,
            Provider::R2 { .. } => ProviderArg::R2,
            Provider::Custom { .. } => ProviderArg::Custom,
        });
        let pick = |flag: &Option<String>, fallback: Option<&String>| {
            flag.clone()
                .or_else(|| fallback.cloned())
                .unwrap_or_default()
        };

        match (kind, current) {
            (ProviderArg::Oci, Provider::Oci { namespace, region }) => Provider::Oci {
                namespace: pick(&self.namespace, Some(namespace)),
                region: pick(&self.region, Some(region)),
            },
            (ProviderArg::Oci, _) => Provider::Oci {
                namespace: pick(&self.namespace, None),
                region: pick(&self.region, None),
            },
            (
                ProviderArg::R2,
                Provider::R2 {
                    account_id,
                    public_base_url,
                },
            ) => Provider::R2 {
                account_id: pick(&self.account_id, Some(account_id)),
                public_base_url: self.public_base_url.clone().or(public_base_url.clone()),
            },
            (ProviderArg::R2, _) => Provider::R2 {
                account_id: pick(&self.account_id, None),
                public_base_url: self.public_base_url.clone(),
            },
            (
                ProviderArg::Custom,
                Provider::Custom {
                    endpoint,
                    region,
                    public_base_url,
                },
            ) => Provider::Custom {
                endpoint: pick(&self.endpoint, Some(endpoint)),
                region: pick(&self.region, Some(region)),
                public_base_url: self.public_base_url.clone().or(public_base_url.clone()),
            },
            (ProviderArg::Custom, _) => Provider::Custom {
                endpoint: pick(&self.endpoint, None),
                region: self
                    .region
                    .clone()
                    .unwrap_or_else(|| "us-east-1".to_string()),
                public_base_url: self.public_base_url.clone(),
            },
        }
    }
}

impl UrlArgs {
    fn apply(&self, config: &mut UploadConfig) {
        if self.no_presign {
            config.presigned_urls = false;
        }
        if self.no_public {
            config.public_urls = false;
        }
        if let Some(ttl) = self.presign_ttl {
            config.presign_ttl_secs = ttl;
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let output = OutputWriter::new(cli.json);

    let code = match run(cli, &output) {
        Ok(code) => code,
        Err(e) => {
            output.error(&e);
            e.exit_code()
        }
    };
    std::process::exit(code);
}

fn run(cli: Cli, output: &OutputWriter) -> Result<i32> {
    match cli.command {
        Commands::Init => {
            oci_uploader::commands::init::run_init_wizard(cli.config.as_deref())
                .map_err(|e| UploadError::Config(format!("Initialization failed: {}", e)))?;
            return Ok(EXIT_SUCCESS);
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            clap_complete::generate(shell, &mut cmd, "oci-uploader", &mut std::io::stdout());
            return Ok(EXIT_SUCCESS);
        }
        _ => {}
    }

    let mut config = load_config(cli.config.as_deref())?;
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }
    if cli.log.is_some() {
        config.log_file = cli.log.clone();
    }
    config.verbose |= cli.verbose;

    if let Err(e) = logging::init_logging(&config) {
        eprintln!("Warning: Failed to initialize logging: {}", e);
    }

    let runtime = tokio::runtime::Runtime::new()?;

    match cli.command {
        Commands::Upload {
            connection,
            urls,
            source,
            max_size_gb,
            multipart_threshold_mb,
            part_size_mb,
            concurrency,
        } => {
            connection.apply(&mut config)?;
            urls.apply(&mut config);
            if source.is_some() {
                config.source_dir = source;
            }
            if max_size_gb.is_some() {
                config.max_size_gb = max_size_gb;
            }
            if let Some(mb) = multipart_threshold_mb {
                config.multipart_threshold = mb.saturating_mul(1024 * 1024);
            }
            if let Some(mb) = part_size_mb {
                config.multipart_chunk_size = mb.saturating_mul(1024 * 1024);
            }
            if let Some(n) = concurrency {
                config.max_concurrency = n;
            }
            runtime.block_on(handle_upload(&config, urls.save_urls.as_deref(), output))
        }
        Commands::Presign {
            connection,
            prefix,
            presign_ttl,
            save_urls,
        } => {
            connection.apply(&mut config)?;
            if let Some(ttl) = presign_ttl {
                config.presign_ttl_secs = ttl;
            }
            runtime.block_on(handle_presign(&config, &prefix, save_urls.as_deref(), output))
        }
        Commands::Urls {
            connection,
            urls,
            names,
        } => {
            connection.apply(&mut config)?;
            urls.apply(&mut config);
            runtime.block_on(handle_urls(&config, &names, urls.save_urls.as_deref(), output))
        }
        Commands::Init | Commands::Completions { .. } => Ok(EXIT_SUCCESS),
    }
}

/// Explicit config file must load; the default one is optional
fn load_config(path: Option<&Path>) -> Result<UploadConfig> {
    if let Some(path) = path {
        return UploadConfig::from_file(path);
    }
    match UploadConfig::default_path() {
        Some(path) if path.exists() => {
            debug!(path = %path.display(), "Loading default config");
            UploadConfig::from_file(&path)
        }
        _ => Ok(UploadConfig::default()),
    }
}

/// One client per destination of this run, in configuration order
async fn connect(config: &UploadConfig) -> Result<Vec<(Destination, S3Client)>> {
    config.validate()?;
    let mut connected = Vec::new();
    for destination in config.targets() {
        let client = S3Client::new(destination.to_s3_config(config)?)
            .await
            .map_err(UploadError::Storage)?;
        info!(
            destination = %destination.name,
            provider = destination.provider.name(),
            endpoint = %destination.provider.endpoint_url(),
            bucket = %destination.bucket,
            "Connected"
        );
        connected.push((destination, client));
    }
    Ok(connected)
}

fn print_header(
    connected: &[(Destination, S3Client)],
    output: &OutputWriter,
    source: Option<&Path>,
) {
    if output.is_json() {
        return;
    }
    let subtitle = match connected {
        [(only, _)] => only.provider.name().to_string(),
        many => format!("{} destinations", many.len()),
    };
    header_box("oci-uploader", Some(subtitle.as_str()));

    let mut rows = Vec::new();
    if let Some(dir) = source {
        rows.push(("Source", dir.display().to_string()));
    }
    for (destination, _) in connected {
        if connected.len() > 1 {
            rows.push(("Destination", destination.name.clone()));
        }
        rows.push(("Endpoint", destination.provider.endpoint_url()));
        rows.push(("Bucket", destination.bucket.clone()));
        if let Some(limit) = destination.max_size_bytes() {
            rows.push(("Size limit", format_bytes(limit)));
        }
    }
    println!("{}", stats_table(&rows));
}

fn url_summary(destination: &Destination, ttl_secs: u64, report: &UrlReport) -> UrlSummary {
    UrlSummary::new(
        &destination.name,
        &destination.bucket,
        &destination.provider.endpoint_url(),
        ttl_secs,
        report,
    )
}

fn save_urls(output: &OutputWriter, path: Option<&Path>, summaries: &[UrlSummary]) -> Result<()> {
    if let Some(path) = path {
        output.save_urls(path, summaries)?;
        output.success(&format!("URLs saved to {}", path.display()));
    }
    Ok(())
}

async fn handle_upload(
    config: &UploadConfig,
    save_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<i32> {
    let options = PipelineOptions::from_config(config)?;
    let connected = connect(config).await?;
    print_header(&connected, output, Some(&options.source_dir));

    let targets: Vec<UploadTarget<'_>> = connected
        .iter()
        .map(|(destination, client)| {
            UploadTarget::new(destination.name.as_str(), client)
                .with_size_limit(destination.max_size_bytes())
                .with_public_base(destination.public_url_base())
        })
        .collect();

    let mut sink = output.event_sink(config.verbose);
    let outcome = run_upload(&targets, &options, sink.as_mut()).await?;

    if outcome.files == 0 {
        output.warning(&format!(
            "No files to upload in {}",
            options.source_dir.display()
        ));
    }

    let destinations = connected
        .iter()
        .zip(&outcome.destinations)
        .map(|((destination, _), result)| {
            let summary = url_summary(destination, config.presign_ttl_secs, &result.urls);
            DestinationReport::from_outcome(destination.provider.name(), result, summary)
        })
        .collect();
    let report = UploadReport::new(outcome.files, outcome.total_bytes, destinations);

    output.upload_report(&report);
    let summaries = report.url_summaries();
    if !summaries.is_empty() {
        save_urls(output, save_path, &summaries)?;
    }

    Ok(report.exit_code())
}

async fn handle_presign(
    config: &UploadConfig,
    prefix: &str,
    save_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<i32> {
    let connected = connect(config).await?;
    print_header(&connected, output, None);

    let mut code = EXIT_SUCCESS;
    let mut summaries = Vec::new();
    for (destination, client) in &connected {
        let listing = match client.list_objects(prefix).await {
            Ok(listing) => listing,
            Err(e) if connected.len() > 1 => {
                warn!(destination = %destination.name, error = %e, "Could not list bucket");
                output.error(&UploadError::Storage(e));
                code = EXIT_PARTIAL;
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        let names: Vec<&str> = listing.objects.iter().map(|o| o.key.as_str()).collect();
        if names.is_empty() {
            output.warning(&format!(
                "No objects in bucket '{}' [{}]",
                destination.bucket, destination.name
            ));
            continue;
        }

        let report = UrlIssuer::new(client, None)
            .with_kinds(false, true)
            .issue_all(&names, Duration::from_secs(config.presign_ttl_secs))
            .await;
        let summary = url_summary(destination, config.presign_ttl_secs, &report);
        output.url_summary(&summary);
        code = code.max(summary.exit_code());
        summaries.push(summary);
    }

    if !summaries.is_empty() {
        save_urls(output, save_path, &summaries)?;
    }
    Ok(code)
}

async fn handle_urls(
    config: &UploadConfig,
    names: &[String],
    save_path: Option<&Path>,
    output: &OutputWriter,
) -> Result<i32> {
    let connected = connect(config).await?;

    let mut code = EXIT_SUCCESS;
    let mut summaries = Vec::new();
    for (destination, client) in &connected {
        let report = UrlIssuer::new(client, destination.public_url_base())
            .with_kinds(config.public_urls, config.presigned_urls)
            .issue_all(names, Duration::from_secs(config.presign_ttl_secs))
            .await;
        let summary = url_summary(destination, config.presign_ttl_secs, &report);
        output.url_summary(&summary);
        code = code.max(summary.exit_code());
        summaries.push(summary);
    }

    save_urls(output, save_path, &summaries)?;
    Ok(code)
}
