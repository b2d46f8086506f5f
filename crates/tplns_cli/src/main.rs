//! `tplns`: resolve template namespaces for an installation file.

mod cli;
mod installation;

use clap::Parser;
use cli::{Cli, Command, OutputFormat};
use installation::{Installation, InstallationError};
use log::info;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use tplns_core::{
    default_log_level, find_protected_namespaces, init_logging, merge_namespaces,
    normalize_extension_list, AlterHooks, CacheError, CacheStore, ExtensionKind, FixedActiveTheme,
    LoaderError, LoggingError, MemoryCacheStore, NamespaceMap, NamespaceOwner, NamespaceRegistry,
    ProtectedNamespaces, RegistryConfig, SqliteCacheStore, TemplateLoader,
};

#[derive(Debug)]
enum CliError {
    Installation(InstallationError),
    Cache(CacheError),
    Logging(LoggingError),
    Loader(LoaderError),
    Output(serde_json::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Installation(err) => write!(f, "{err}"),
            Self::Cache(err) => write!(f, "cache unavailable: {err}"),
            Self::Logging(err) => write!(f, "{err}"),
            Self::Loader(err) => write!(f, "{err}"),
            Self::Output(err) => write!(f, "cannot encode output: {err}"),
        }
    }
}

impl From<InstallationError> for CliError {
    fn from(value: InstallationError) -> Self {
        Self::Installation(value)
    }
}

impl From<CacheError> for CliError {
    fn from(value: CacheError) -> Self {
        Self::Cache(value)
    }
}

impl From<LoggingError> for CliError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<LoaderError> for CliError {
    fn from(value: LoaderError) -> Self {
        Self::Loader(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Output(value)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    if let Some(log_dir) = &cli.log_dir {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir)?;
    }

    match &cli.command {
        Command::Namespaces {
            installation,
            theme,
        } => {
            let mut loader = open_loader(&cli, installation, theme.as_deref())?;
            let namespaces = loader.paths().clone();
            print_namespaces(&namespaces, cli.format)
        }
        Command::Find {
            installation,
            template,
            theme,
        } => {
            let mut loader = open_loader(&cli, installation, theme.as_deref())?;
            let path = loader.find_template(template)?;
            match cli.format {
                OutputFormat::Text => println!("{}", path.display()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "template": template,
                        "path": path,
                    }))?
                ),
            }
            Ok(())
        }
        Command::Protected { installation } => print_protected(installation, cli.format),
    }
}

fn open_loader(
    cli: &Cli,
    installation: &Path,
    theme: Option<&str>,
) -> Result<TemplateLoader, CliError> {
    let installation = Installation::load(installation)?;
    let active_theme = theme.unwrap_or(&installation.active_theme).to_string();
    let config = RegistryConfig::new(installation.root.clone());

    let cache: Arc<dyn CacheStore> = match &cli.cache {
        Some(path) => Arc::new(SqliteCacheStore::open(path)?),
        None => Arc::new(MemoryCacheStore::new()),
    };
    info!(
        "event=cli_open module=cli status=ok root={} theme={} cache={}",
        config.root.display(),
        active_theme,
        if cli.cache.is_some() { "sqlite" } else { "memory" }
    );

    let registry = NamespaceRegistry::new(
        config,
        Arc::new(installation.discovery()?),
        Arc::new(FixedActiveTheme::new(&active_theme)),
        cache,
    );
    Ok(TemplateLoader::new(registry))
}

fn print_namespaces(namespaces: &NamespaceMap, format: OutputFormat) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(namespaces)?),
        OutputFormat::Text => {
            for (namespace, paths) in namespaces {
                println!("@{namespace}");
                for path in paths {
                    println!("  {}", path.display());
                }
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ProtectedReport<'a> {
    protected: &'a ProtectedNamespaces,
    violations: Vec<String>,
}

/// Protected namespaces and the dropped contributions, from one normalization pass.
fn protected_report(
    installation: Installation,
) -> Result<(ProtectedNamespaces, Vec<String>), CliError> {
    let root = installation.root.clone();
    let discovery = installation.discovery()?;

    let modules = normalize_extension_list(&discovery, ExtensionKind::Module, &root);
    let themes = normalize_extension_list(&discovery, ExtensionKind::Theme, &root);
    let protected =
        find_protected_namespaces(modules.iter().chain(themes.iter()), &AlterHooks::new());
    let outcome = merge_namespaces(&modules, &themes, &protected);
    let violations = outcome.violations.iter().map(ToString::to_string).collect();
    Ok((protected, violations))
}

fn print_protected(installation: &Path, format: OutputFormat) -> Result<(), CliError> {
    let (protected, violations) = protected_report(Installation::load(installation)?)?;

    match format {
        OutputFormat::Json => {
            let report = ProtectedReport {
                protected: &protected,
                violations,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            for (namespace, NamespaceOwner { name, kind, .. }) in &protected {
                println!("@{namespace}\t{name} {kind}");
            }
            for violation in &violations {
                println!("dropped: {violation}");
            }
        }
    }
    Ok(())
}
