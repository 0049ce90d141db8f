// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod cli;
mod output;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use futures::StreamExt;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};
use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
use tracing_subscriber::prelude::*;

use cli::{Args, Command, OutputFormat, Target};
use kubeq::config::{self, Config};
use kubeq::kubernetes::resources::{self, KINDS};
use kubeq::kubernetes::{
    DynamicObject, Filter, KubeTransport, Query, ResourceKind, Scope, Selector, Since, Transport,
};

/// `kubeq.log` in `log_dir`: 10MB per file, 5 files, rotated daily as well
fn rolling_appender(log_dir: &Path) -> std::io::Result<RollingFileAppenderBase> {
    let condition = RollingConditionBase::new()
        .daily()
        .max_size(10 * 1024 * 1024);
    RollingFileAppenderBase::new(log_dir.join("kubeq.log"), condition, 5)
}

/// Initialize logging with file output and optional stderr
fn init_logging(verbose: bool) {
    use tracing_subscriber::fmt::format::FmtSpan;

    let log_dir = config::base_dir()
        .map(|p| p.join("log"))
        .unwrap_or_else(|_| std::path::PathBuf::from("."));

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Could not create log directory: {}", e);
        return;
    }

    let file_appender = match rolling_appender(&log_dir) {
        Ok(appender) => appender,
        Err(e) => {
            eprintln!("Warning: Could not create log file: {}", e);
            return;
        }
    };

    let (non_blocking, _guard) = file_appender.get_non_blocking_appender();
    // Leak the guard to keep the background writer alive
    std::mem::forget(_guard);

    let filter = if verbose { "kubeq=debug" } else { "kubeq=info" };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_span_events(FmtSpan::NONE);

    if verbose {
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::NONE);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(stderr_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    if rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .is_err()
    {
        return Err(anyhow!("Failed to install rustls crypto provider"));
    }

    let args = Args::parse();
    init_logging(args.verbose);

    let config = Config::load().context("Failed to load configuration")?;

    match &args.command {
        Command::Resources => {
            let result = output::QueryResult::from_kinds(KINDS);
            println!("{}", result.format(&args.output, args.no_headers));
            Ok(())
        }
        Command::Get { target, name } => {
            let (kind, query) = prepare(&args, &config, target).await?;
            run_get(&args, &kind, &query, name.as_deref()).await
        }
        Command::Watch { target, since } => {
            let (kind, query) = prepare(&args, &config, target).await?;
            run_watch(&args, &config, &kind, &query, since.as_deref()).await
        }
    }
}

/// Resolve the kind, connect and build the query for `get` and `watch`
async fn prepare(
    args: &Args,
    config: &Config,
    target: &Target,
) -> Result<(ResourceKind, Query<DynamicObject>)> {
    let kind = resources::lookup(&target.resource).ok_or_else(|| {
        anyhow!(
            "Unknown resource type '{}' (run `kubeq resources` for the list)",
            target.resource
        )
    })?;

    // --context overrides the config file, which overrides kubeconfig
    let context = args.context.as_deref().or(config.context.as_deref());
    let transport = KubeTransport::connect(context).await?;

    let scope = resolve_scope(target, config, transport.default_namespace());
    let filter = build_filter(target, scope);
    debug!(kind = kind.kind, ?filter, "Resolved query");

    let transport: Arc<dyn Transport> = Arc::new(transport);
    let query = Query::with_kind(transport, kind).filter(filter);
    Ok((kind, query))
}

/// `-A` wins, then `-n`, then the config file, then the kubeconfig context
fn resolve_scope(target: &Target, config: &Config, context_namespace: &str) -> Scope {
    if target.all_namespaces {
        Scope::All
    } else if let Some(ns) = &target.namespace {
        Scope::namespace(ns.as_str())
    } else if let Some(ns) = &config.namespace {
        Scope::namespace(ns.as_str())
    } else {
        Scope::namespace(context_namespace)
    }
}

fn build_filter(target: &Target, scope: Scope) -> Filter {
    let mut filter = Filter::new().namespace(scope);
    if let Some(selector) = &target.selector {
        filter = filter.selector(Selector::raw(selector.as_str()));
    }
    if let Some(selector) = &target.field_selector {
        filter = filter.field_selector(Selector::raw(selector.as_str()));
    }
    filter
}

fn parse_since(since: Option<&str>) -> Since {
    match since {
        None => Since::Server,
        Some(s) if s.eq_ignore_ascii_case("now") => Since::Now,
        Some(rv) => Since::Version(rv.to_string()),
    }
}

async fn run_get(
    args: &Args,
    kind: &ResourceKind,
    query: &Query<DynamicObject>,
    name: Option<&str>,
) -> Result<()> {
    let rendered = match name {
        Some(name) => query
            .get_by_name(name)
            .await
            .map(|obj| output::format_object(kind, &obj, &args.output, args.no_headers)),
        None => query
            .objects()
            .await
            .map(|objs| output::format_objects(kind, objs, &args.output, args.no_headers)),
    };

    match rendered {
        Ok(out) => {
            println!("{}", out);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_watch(
    args: &Args,
    config: &Config,
    kind: &ResourceKind,
    query: &Query<DynamicObject>,
    since: Option<&str>,
) -> Result<()> {
    let watch = query
        .watch(parse_since(since))
        .await?
        .with_backoff(config.watch.backoff());
    let mut stream = watch.into_stream();
    let mut header = !args.no_headers && matches!(args.output, OutputFormat::Table);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Watch interrupted");
                return Ok(());
            }
            next = stream.next() => match next {
                Some(Ok(event)) => {
                    println!("{}", output::format_event(kind, &event, &args.output, header));
                    header = false;
                }
                Some(Err(e)) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
                None => return Ok(()),
            }
        }
    }
}
