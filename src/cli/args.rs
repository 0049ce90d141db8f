// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "kubeq")]
#[command(author, version, about = "Query and watch Kubernetes resources")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Kubernetes context to use (defaults to config, then kubeconfig's current context)
    #[arg(short, long, global = true, value_name = "CONTEXT", env = "KUBEQ_CONTEXT")]
    pub context: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Omit column headers in output
    #[arg(long, global = true)]
    pub no_headers: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Resource, scope and selectors shared by `get` and `watch`
#[derive(ClapArgs, Debug, Clone)]
pub struct Target {
    /// Resource kind (e.g. pods, deploy, svc)
    pub resource: String,

    /// Namespace to query
    #[arg(short, long, conflicts_with = "all_namespaces")]
    pub namespace: Option<String>,

    /// Query across all namespaces
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,

    /// Label selector (e.g. "app=web,tier in (a,b)")
    #[arg(short = 'l', long)]
    pub selector: Option<String>,

    /// Field selector (e.g. "status.phase=Running")
    #[arg(long)]
    pub field_selector: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List resources, or fetch one by name
    Get {
        #[command(flatten)]
        target: Target,

        /// Fetch a single object by name
        #[arg(conflicts_with = "all_namespaces")]
        name: Option<String>,
    },

    /// Stream changes to resources until interrupted
    Watch {
        #[command(flatten)]
        target: Target,

        /// Start point: "now" (after the current state) or a resource version
        #[arg(long)]
        since: Option<String>,
    },

    /// List the built-in resource kinds
    Resources,
}

#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_get() {
        let args = Args::parse_from([
            "kubeq", "get", "pods", "web-0", "-n", "prod", "-l", "app=web", "-o", "json",
        ]);
        match args.command {
            Command::Get { target, name } => {
                assert_eq!(target.resource, "pods");
                assert_eq!(target.namespace.as_deref(), Some("prod"));
                assert_eq!(target.selector.as_deref(), Some("app=web"));
                assert_eq!(name.as_deref(), Some("web-0"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
        assert!(matches!(args.output, OutputFormat::Json));
    }

    #[test]
    fn test_parse_watch() {
        let args = Args::parse_from([
            "kubeq", "watch", "deploy", "-A", "--field-selector", "metadata.name=web", "--since", "now",
        ]);
        match args.command {
            Command::Watch { target, since } => {
                assert!(target.all_namespaces);
                assert_eq!(target.field_selector.as_deref(), Some("metadata.name=web"));
                assert_eq!(since.as_deref(), Some("now"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_name_conflicts_with_all_namespaces() {
        let result = Args::try_parse_from(["kubeq", "get", "pods", "web-0", "-A"]);
        assert!(result.is_err());

        let args = Args::parse_from(["kubeq", "get", "pods", "-A"]);
        assert!(matches!(args.command, Command::Get { name: None, .. }));
    }

    #[test]
    fn test_namespace_conflicts_with_all() {
        let result = Args::try_parse_from(["kubeq", "get", "pods", "-n", "a", "-A"]);
        assert!(result.is_err());
    }
}
