use clap::Parser;
use kwatch::alerts::{LogNotifier, Notifier, WebhookNotifier};
use kwatch::cluster::KubeProvider;
use kwatch::config::{detect_namespace, Config, Overrides, Settings, SERVICE_ACCOUNT_NAMESPACE};
use kwatch::poller::Poller;
use kwatch::watchers::{build_watchers, WatcherKind};
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Command-line arguments for the cluster watcher
#[derive(Parser, Debug)]
#[command(
    name = "kwatch",
    about = "Kubernetes namespace watcher - polls pods and events and posts changes to a webhook",
    long_about = "Polls a Kubernetes namespace every minute, compares what it sees with the previous \
                  poll and sends a notification to a webhook for new warning events, restarted or \
                  unready containers, and changes of the active vault pod."
)]
struct Cli {
    /// Watchers to enable
    #[arg(
        value_name = "WATCHER",
        help = "Watchers to enable: EventWatcher, PodWatcher, VaultActiveWatcher"
    )]
    watchers: Vec<WatcherKind>,

    /// Exclusion patterns for the watchers named on the command line
    #[arg(
        short,
        long,
        value_name = "REGEX",
        help = "Ignore objects whose full name matches this regex (repeatable)"
    )]
    exclude: Vec<String>,

    /// Webhook receiving notifications
    #[arg(long, env = "NOTIFY_URL", value_name = "URL")]
    notify_url: Option<String>,

    /// Namespace to watch
    #[arg(short, long, env = "WATCH_NAMESPACE", value_name = "NAMESPACE")]
    namespace: Option<String>,

    /// Kubeconfig file; in-cluster or default kubeconfig otherwise
    #[arg(long, env = "KUBECONFIG_PATH", value_name = "FILE")]
    kubeconfig: Option<PathBuf>,

    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Configuration file path (YAML format)"
    )]
    config: Option<PathBuf>,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Run a single poll cycle and exit
    #[arg(long)]
    once: bool,

    /// Enable verbose logging
    #[arg(
        short,
        long,
        help = "Enable verbose logging output (sets RUST_LOG=debug)"
    )]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    ///
    /// # Returns
    ///
    /// `Ok(())` if all arguments are valid, `Err(String)` with error message otherwise
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }

            if let Some(extension) = config_path.extension() {
                if extension != "yaml" && extension != "yml" {
                    warn!(
                        "Configuration file does not have .yaml extension: {}",
                        config_path.display()
                    );
                }
            }
        }

        if let Some(ref kubeconfig) = self.kubeconfig {
            if !kubeconfig.is_file() {
                return Err(format!("Kubeconfig is not a file: {}", kubeconfig.display()));
            }
        }

        if self.watchers.is_empty() && self.config.is_none() {
            return Err("Name at least one watcher or pass --config".to_string());
        }

        if !self.exclude.is_empty() && self.watchers.is_empty() {
            warn!("--exclude has no effect without watchers on the command line");
        }

        Ok(())
    }

    fn overrides(&self) -> Overrides {
        Overrides {
            namespace: self.namespace.clone(),
            notify_url: self.notify_url.clone(),
            kubeconfig: self.kubeconfig.clone(),
            watchers: self.watchers.clone(),
            exclude: self.exclude.clone(),
            dry_run: self.dry_run,
        }
    }

    /// Load the config file (if any) and merge it with the command line
    fn settings(&self) -> anyhow::Result<Settings> {
        let file = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        let detected = detect_namespace(Path::new(SERVICE_ACCOUNT_NAMESPACE));
        Ok(Settings::resolve(file, self.overrides(), detected)?)
    }
}

/// Wire the provider, notifier and watchers together
fn build_poller(settings: &Settings, runtime: Arc<Runtime>) -> anyhow::Result<Poller> {
    let watchers = build_watchers(&settings.watchers, &settings.namespace)?;

    let provider = KubeProvider::connect(Arc::clone(&runtime), settings.kubeconfig.as_deref())?;

    let notifier: Box<dyn Notifier> = match &settings.notify_url {
        Some(url) => {
            let webhook = WebhookNotifier::new(url.as_str(), runtime)?;
            info!("Sending notifications to {}", webhook.url());
            Box::new(webhook)
        }
        None => {
            info!("Dry run: notifications will only be logged");
            Box::new(LogNotifier)
        }
    };

    Ok(Poller::new(
        settings.namespace.as_str(),
        Box::new(provider),
        notifier,
        watchers,
    ))
}

fn main() {
    // Parse command-line arguments
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    if cli.verbose {
        std::env::set_var("RUST_LOG", "debug");
    }
    env_logger::init();

    info!("Starting kwatch");

    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {}", e);
        std::process::exit(1);
    }

    let settings = match cli.settings() {
        Ok(settings) => settings,
        Err(e) => {
            error!("Failed to load configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let runtime = match Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(e) => {
            error!("Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let mut poller = match build_poller(&settings, runtime) {
        Ok(poller) => poller,
        Err(e) => {
            error!("Failed to initialize poller: {:#}", e);
            std::process::exit(1);
        }
    };

    if cli.once {
        let completed = poller.run_cycle();
        if !completed {
            std::process::exit(1);
        }
        return;
    }

    // Set up signal handling for graceful shutdown (SIGINT)
    let (shutdown_sender, shutdown_receiver) = mpsc::channel();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("Received interrupt signal (SIGINT), shutting down gracefully...");
        if let Err(e) = shutdown_sender.send(()) {
            error!("Failed to send shutdown signal: {}", e);
        }
    }) {
        error!("Error setting SIGINT handler: {}", e);
        std::process::exit(1);
    }

    info!("kwatch is running. Press Ctrl+C to stop.");
    poller.run(&shutdown_receiver);

    info!("kwatch shutdown complete");
}
