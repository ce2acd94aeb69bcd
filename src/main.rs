use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use feedpress::config::{Config, PipelineSettings, APP_PASSWORD_ENV};
use feedpress::feed::{FetchOptions, HttpFeedFetcher};
use feedpress::pipeline::{Pipeline, PublishOptions, RunReport};
use feedpress::repository::{
    ContentRepository, EntryStatus, MemoryRepository, RestCredentials, RestRepository,
};
use feedpress::rewrite::ContentTransformer;
use feedpress::scheduler::{Scheduler, PIPELINE_JOB};
use feedpress::settings::render_settings_form;
use feedpress::util::HostPolicy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::{Path, PathBuf};

/// Get the config file path (~/.config/feedpress/config.toml)
fn default_config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home)
        .join(".config")
        .join("feedpress")
        .join("config.toml"))
}

#[derive(Parser, Debug)]
#[command(
    name = "feedpress",
    version,
    about = "Import keyword-matched RSS items into a WordPress-compatible site"
)]
struct Args {
    /// Config file (default: ~/.config/feedpress/config.toml)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the pipeline once and print a summary
    Run {
        /// Publish into an in-memory store instead of the configured site
        #[arg(long)]
        dry_run: bool,
    },
    /// Run the pipeline on a schedule until interrupted
    Daemon {
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the current pipeline settings
    Settings,
}

fn build_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.as_str())
        .connect_timeout(config.fetch_timeout())
        .build()
        .context("Failed to create HTTP client")
}

fn host_policy(config: &Config) -> HostPolicy {
    if config.allow_private_hosts {
        HostPolicy::AllowPrivate
    } else {
        HostPolicy::PublicOnly
    }
}

fn build_transformer(config: &Config) -> Result<ContentTransformer> {
    let transformer = if config.rewrite_rules.is_empty() {
        ContentTransformer::with_default_rules()
    } else {
        ContentTransformer::new(config.rewrite_rules.clone())
    };
    transformer.context("Invalid rewrite_rules in config file")
}

fn build_repository(config: &Config, client: reqwest::Client) -> Result<RestRepository> {
    let site_url = config.repository.site_url.as_deref().context(
        "No [repository] site_url configured. Set it in the config file or use --dry-run.",
    )?;

    let password = config
        .repository
        .resolve_password(std::env::var(APP_PASSWORD_ENV).ok());
    let credentials = match (&config.repository.username, password) {
        (Some(username), Some(app_password)) => Some(RestCredentials {
            username: username.clone(),
            app_password,
        }),
        (Some(_), None) => {
            tracing::warn!(
                "repository.username is set but no app password was found (set {})",
                APP_PASSWORD_ENV
            );
            None
        }
        _ => None,
    };

    let repository = RestRepository::new(client, site_url, credentials)
        .with_context(|| format!("Invalid repository site_url '{site_url}'"))?
        .with_media_policy(host_policy(config))
        .with_request_timeout(config.fetch_timeout());
    Ok(repository)
}

async fn execute<R: ContentRepository>(
    fetcher: HttpFeedFetcher,
    repository: R,
    transformer: ContentTransformer,
    options: PublishOptions,
    settings: &PipelineSettings,
) -> (RunReport, R) {
    let pipeline = Pipeline::new(fetcher, repository, transformer).with_options(options);
    let mut rng = StdRng::from_entropy();
    let report = pipeline.run(settings, &mut rng).await;
    (report, pipeline.into_repository())
}

/// Loads configuration fresh and performs one pipeline pass.
async fn run_once(config_path: &Path, dry_run: bool) -> Result<RunReport> {
    let config = Config::load(config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let settings = PipelineSettings::from_store(&config);
    let transformer = build_transformer(&config)?;
    let client = build_client(&config)?;

    let fetcher = HttpFeedFetcher::new(
        client.clone(),
        FetchOptions {
            max_items: config.max_items_per_feed,
            timeout: config.fetch_timeout(),
            host_policy: host_policy(&config),
            ..FetchOptions::default()
        },
    );
    let options = PublishOptions {
        author: config.author,
        status: EntryStatus::Publish,
    };

    if dry_run {
        let (report, repository) = execute(
            fetcher,
            MemoryRepository::new(),
            transformer,
            options,
            &settings,
        )
        .await;
        for stored in repository.entries() {
            println!("[dry-run] would publish: {}", stored.entry.title);
        }
        return Ok(report);
    }

    let repository = build_repository(&config, client)?;
    let (report, _) = execute(fetcher, repository, transformer, options, &settings).await;
    Ok(report)
}

async fn run_daemon(config_path: PathBuf, dry_run: bool) -> Result<()> {
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    let interval = config.schedule_interval();

    let mut scheduler = Scheduler::new();
    let path = config_path.clone();
    scheduler.schedule(PIPELINE_JOB, interval, move || {
        let path = path.clone();
        async move {
            match run_once(&path, dry_run).await {
                Ok(report) => tracing::debug!(published = report.published, "Scheduled run complete"),
                Err(e) => tracing::error!(error = %format!("{e:#}"), "Scheduled run failed"),
            }
        }
    });

    println!(
        "feedpress running every {} minutes (config: {}). Press Ctrl-C to stop.",
        interval.as_secs() / 60,
        config_path.display()
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    scheduler.unschedule(PIPELINE_JOB);
    println!("Stopped.");
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing (RUST_LOG controls verbosity)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config_path = match args.config {
        Some(path) => path,
        None => default_config_path()?,
    };

    match args.command {
        Command::Run { dry_run } => {
            let report = run_once(&config_path, dry_run).await?;
            println!("{report}");
        }
        Command::Daemon { dry_run } => run_daemon(config_path, dry_run).await?,
        Command::Settings => {
            let config = Config::load(&config_path)
                .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
            print!("{}", render_settings_form(&config));
        }
    }

    Ok(())
}
