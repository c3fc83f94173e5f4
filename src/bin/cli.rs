//! CLI binary for otaprobe.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{ArgGroup, Parser};
use indicatif::HumanBytes;
use otaprobe::store::DEFAULT_STORE_FILE;
use otaprobe::{ProbeOutcome, Target, UpdateStore, download, metadata, probe_all};
use otaprobe_checkin::{ProbeConfig, ProbeResult, Prober};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// otaprobe: ask Google's checkin service for Android OTA updates.
#[derive(Parser)]
#[command(name = "otaprobe", version, about)]
#[command(group(ArgGroup::new("input").required(true).args(["config", "fingerprint"])))]
struct Cli {
    /// Device configuration YAML file. Repeat to probe several devices.
    #[arg(short, long, value_name = "FILE")]
    config: Vec<PathBuf>,

    /// Probe this build fingerprint instead of a configuration file.
    #[arg(long, value_name = "FINGERPRINT")]
    fingerprint: Option<String>,

    /// Model code to report (overrides the configured model).
    #[arg(long, value_name = "MODEL")]
    model: Option<String>,

    /// Override the incremental version from the configuration file.
    #[arg(short, long, value_name = "VERSION")]
    incremental: Option<String>,

    /// Download found packages.
    #[arg(long)]
    download: bool,

    /// Directory packages are downloaded into.
    #[arg(long, value_name = "DIR", default_value = ".")]
    output_dir: PathBuf,

    /// Do not read the target build from found packages.
    #[arg(long)]
    no_metadata: bool,

    /// Verbose logging and dumps of every checkin response.
    #[arg(long)]
    debug: bool,

    /// Update store file.
    #[arg(long, value_name = "FILE", default_value = DEFAULT_STORE_FILE)]
    store: PathBuf,

    /// Do not read or write the update store.
    #[arg(long)]
    no_store: bool,

    /// Checkin timeout in seconds.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    timeout: u64,

    /// Print results as JSON on stdout.
    #[arg(long)]
    json: bool,
}

/// One line of `--json` output.
#[derive(Serialize)]
struct Report<'a> {
    name: &'a str,
    #[serde(flatten)]
    result: Option<&'a ProbeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug {
        "otaprobe=debug,otaprobe_checkin=debug"
    } else {
        "otaprobe=info,otaprobe_checkin=info"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let targets = load_targets(&cli)?;

    let config = ProbeConfig {
        timeout_seconds: cli.timeout,
        ..Default::default()
    };
    let prober = Prober::new(config).context("invalid probe configuration")?;

    let mut store = if cli.no_store {
        None
    } else {
        Some(UpdateStore::load(&cli.store)?)
    };

    let debug_dir = cli.debug.then_some(Path::new("."));
    let mut outcomes = probe_all(&prober, targets, debug_dir).await;

    let client = reqwest::Client::new();
    if !cli.no_metadata {
        let updates = outcomes
            .iter_mut()
            .filter_map(|o| o.result.as_mut().ok())
            .filter_map(|r| r.update.as_mut());
        for update in updates {
            metadata::fill_target_fingerprint(&client, update).await;
        }
    }

    let mut reports = Vec::with_capacity(outcomes.len());
    let mut failed = 0usize;

    for ProbeOutcome { target, result } in &outcomes {
        let mut report = Report {
            name: &target.name,
            result: None,
            new: None,
            path: None,
            error: None,
        };

        match result {
            Ok(result) => {
                let is_new = store
                    .as_ref()
                    .is_none_or(|s| s.is_new(&target.name, result));
                report.result = Some(result);
                if result.found {
                    report.new = Some(is_new);
                }
                if !cli.json {
                    print_result(&target.name, result, is_new);
                }

                if let Some(update) = result.update.as_ref().filter(|_| cli.download) {
                    match download::download_update(&client, update, &cli.output_dir, !cli.json)
                        .await
                    {
                        Ok(path) => report.path = Some(path),
                        Err(err) => {
                            tracing::error!(config = %target.name, error = %err, "download failed");
                            report.error = Some(err.to_string());
                            failed += 1;
                        }
                    }
                }

                if let Some(store) = store.as_mut() {
                    store.record_success(&target.name, result.clone());
                }
            }
            Err(err) => {
                failed += 1;
                if !cli.json {
                    println!("{}: probe failed: {err}", target.name);
                }
                report.error = Some(err.to_string());
                if let Some(store) = store.as_mut() {
                    store.record_failure(&target.name, &err.to_string());
                }
            }
        }

        reports.push(report);
    }

    if let Some(store) = &store {
        store.save()?;
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }

    if failed > 0 {
        tracing::error!(failed, total = outcomes.len(), "some probes failed");
        std::process::exit(1);
    }
    Ok(())
}

fn load_targets(cli: &Cli) -> anyhow::Result<Vec<Target>> {
    if let Some(fingerprint) = &cli.fingerprint {
        return Ok(vec![Target::ad_hoc(fingerprint, cli.model.as_deref())?]);
    }

    cli.config
        .iter()
        .map(|path| {
            let mut target = Target::from_config_file(path, cli.incremental.as_deref())
                .with_context(|| format!("cannot load {}", path.display()))?;
            if let Some(model) = &cli.model {
                target.model = Some(model.clone());
            }
            Ok(target)
        })
        .collect()
}

fn print_result(name: &str, result: &ProbeResult, is_new: bool) {
    let Some(update) = &result.update else {
        println!("{name}: up to date");
        return;
    };
    let marker = if is_new { " [new]" } else { "" };
    println!("{name}: {} ({}){marker}", update.title, update.package_kind);
    println!("  tag:    {}", update.tag_name);
    println!("  device: {}", update.device);
    if let Some(size) = update.size {
        let approx = if update.size_approximate { "~" } else { "" };
        println!("  size:   {approx}{}", HumanBytes(size));
    }
    if let Some(fingerprint) = &update.fingerprint {
        println!("  build:  {fingerprint}");
    }
    println!("  url:    {}", update.url);
    if !update.description.is_empty() {
        println!();
        for line in update.description.lines() {
            println!("  {line}");
        }
    }
}
