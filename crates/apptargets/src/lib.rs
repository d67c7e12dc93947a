//! # apptargets
//!
//! Command-line tool for generating native extension targets (widgets, share
//! extensions, App Clips and more) for cross-platform mobile apps.
//!
//! ## Overview
//!
//! `apptargets` drives [`apptargets_sdk`] over a project laid out as:
//!
//! ```text
//! my-app/
//! ├── app.json                 # host app configuration
//! ├── apptargets.toml          # optional, see [`config`]
//! ├── targets/
//! │   └── content-share/
//! │       └── target.toml      # one descriptor per target
//! ├── ios/HostApp.xcodeproj/
//! └── android/app/build.gradle
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Write a starter apptargets.toml
//! apptargets init
//!
//! # Scaffold a share extension descriptor
//! apptargets new-target share "Content Share"
//!
//! # Preview, then apply, a generation pass
//! apptargets --dry-run prebuild
//! apptargets prebuild
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `prebuild` | Run a generation pass over every discovered target |
//! | `resolve` | Print targets with every default filled in |
//! | `list` | List discovered target directories |
//! | `defaults` | Show the per-kind defaults table |
//! | `init` | Write a starter `apptargets.toml` |
//! | `new-target` | Scaffold a target descriptor from a template |
//! | `storage` | Read and write the shared key/value store |
//!
//! ## CLI Flags
//!
//! Global flags available on all commands:
//!
//! - **`--dry-run`** - Preview what would be done without making changes
//! - **`--verbose` / `-v`** - Enable debug logging (otherwise `RUST_LOG` applies)
//! - **`--project-root`** - Project directory (defaults to the nearest
//!   ancestor holding `app.json` or `apptargets.toml`)
//!
//! ## Modules
//!
//! - [`config`] - Configuration file support for `apptargets.toml`

#![cfg_attr(docsrs, feature(doc_cfg))]

use anyhow::{Context, Result, anyhow, bail};
use apptargets_sdk::{
    GenerationContext, GenerationReport, HostAppConfig, Platform, StorageBridge, TargetConfig,
    TargetDescriptor, TargetEntry, TargetType, discover_targets, generate, lookup_defaults,
    resolve, scaffold_target,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

pub mod config;

use config::{ApptargetsConfig, CONFIG_FILE_NAME, ConfigResolver};

/// Generates native extension targets from declarative descriptors.
#[derive(Parser, Debug)]
#[command(name = "apptargets", author, version, about = "Native extension target generator", long_about = None)]
struct Cli {
    /// Print what would be done without actually doing it
    #[arg(long, global = true)]
    dry_run: bool,

    /// Enable debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    /// Project directory (defaults to the nearest ancestor with app.json or apptargets.toml)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Path overrides shared by commands that touch the project.
#[derive(Args, Debug, Default, Clone)]
struct PathArgs {
    #[arg(long, help = "Directory containing target subdirectories")]
    targets_dir: Option<PathBuf>,
    #[arg(long, help = "Host app configuration file (app.json)")]
    app_config: Option<PathBuf>,
    #[arg(long, help = "Directory holding the .xcodeproj")]
    ios_dir: Option<PathBuf>,
    #[arg(long, help = "Directory holding the Gradle project")]
    android_dir: Option<PathBuf>,
    #[arg(long, help = "Host entitlements file to update with app groups")]
    host_entitlements: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a generation pass: entitlements, Info.plist, Xcode project and Gradle namespace.
    Prebuild {
        #[command(flatten)]
        paths: PathArgs,
        #[arg(long, help = "Print the report as JSON")]
        json: bool,
    },
    /// Resolve targets against the host app and print them with defaults filled in.
    Resolve {
        #[command(flatten)]
        paths: PathArgs,
        #[arg(help = "Target directory name (all targets when omitted)")]
        target: Option<String>,
    },
    /// List discovered target directories.
    List {
        #[command(flatten)]
        paths: PathArgs,
    },
    /// Show the defaults table, or the defaults for one kind.
    Defaults {
        #[arg(help = "Target kind, e.g. widget or share")]
        target_type: Option<TargetType>,
        #[arg(long, help = "Print as JSON")]
        json: bool,
    },
    /// Write a starter apptargets.toml.
    Init {
        #[arg(long, help = "Output path (defaults to <project root>/apptargets.toml)")]
        output: Option<PathBuf>,
    },
    /// Scaffold a new target descriptor.
    NewTarget {
        #[arg(help = "Target kind, e.g. widget or share")]
        target_type: TargetType,
        #[arg(help = "Display name of the target")]
        name: String,
        #[arg(long, help = "Directory containing target subdirectories")]
        targets_dir: Option<PathBuf>,
    },
    /// Read and write the shared key/value store of a widget.
    Storage {
        #[arg(long, help = "Platform whose container layout to use (ios or android)")]
        platform: Platform,
        #[arg(
            long,
            help = "App-group container root (iOS) or app data directory (Android)"
        )]
        root: PathBuf,
        #[command(subcommand)]
        action: StorageAction,
    },
}

#[derive(Subcommand, Debug)]
enum StorageAction {
    /// Store a value.
    Set {
        widget: String,
        key: String,
        value: String,
    },
    /// Print a value; exits with an error when the key is missing.
    Get { widget: String, key: String },
    /// Delete a value.
    Remove { widget: String, key: String },
    /// Request that the widget reload.
    Refresh { widget: String },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let root = match cli.project_root {
        Some(root) => root,
        None => project_root()?,
    };

    match cli.command {
        Command::Prebuild { paths, json } => {
            let project = Project::load(&root, &paths)?;
            if cli.dry_run {
                print_plan(&project)?;
            } else {
                let report = cmd_prebuild(&project)?;
                print_report(&report, json)?;
                if !report.is_success() {
                    bail!("{} target(s) failed", report.failures.len());
                }
            }
        }
        Command::Resolve { paths, target } => {
            let project = Project::load(&root, &paths)?;
            let resolved = cmd_resolve(&project, target.as_deref())?;
            println!("{}", serde_json::to_string_pretty(&resolved)?);
        }
        Command::List { paths } => {
            let project = Project::load_layout(&root, &paths)?;
            cmd_list(&project.targets_dir)?;
        }
        Command::Defaults { target_type, json } => {
            cmd_defaults(target_type, json)?;
        }
        Command::Init { output } => {
            let output = output.unwrap_or_else(|| root.join(CONFIG_FILE_NAME));
            let contents = starter_config(&root);
            if cli.dry_run {
                println!("Would write {:?}:\n\n{}", output, contents);
            } else {
                ensure_can_write(&output)?;
                write_file(&output, contents.as_bytes())?;
                println!("Wrote starter config to {:?}", output);
            }
        }
        Command::NewTarget {
            target_type,
            name,
            targets_dir,
        } => {
            let paths = PathArgs {
                targets_dir,
                ..PathArgs::default()
            };
            let project = Project::load_layout(&root, &paths)?;
            if cli.dry_run {
                println!(
                    "Would scaffold a {} target named {:?} under {:?}",
                    target_type, name, project.targets_dir
                );
            } else {
                let dir = scaffold_target(&project.targets_dir, target_type, &name)
                    .with_context(|| format!("scaffolding target {:?}", name))?;
                println!("✓ Created {:?}", dir);
                println!("  Edit {:?} and run `apptargets prebuild`.", dir.join("target.toml"));
            }
        }
        Command::Storage {
            platform,
            root: storage_root,
            action,
        } => {
            let bridge = StorageBridge::for_platform(platform, &storage_root);
            cmd_storage(&bridge, action, cli.dry_run)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // A subscriber may already be installed when run() is called twice in one process.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Resolved project layout: CLI flags over `apptargets.toml` over defaults.
#[derive(Debug)]
struct Project {
    targets_dir: PathBuf,
    app_config: PathBuf,
    ios_dir: PathBuf,
    android_dir: PathBuf,
    host_entitlements: Option<PathBuf>,
    project_root: PathBuf,
    host: Option<HostAppConfig>,
}

impl Project {
    /// Layout only, without reading the host config.
    fn load_layout(root: &Path, paths: &PathArgs) -> Result<Self> {
        let resolver = ConfigResolver::discover_from(root)?;
        if let Some(path) = &resolver.config_path {
            tracing::debug!(path = %path.display(), "using config file");
        }
        Ok(Self {
            targets_dir: resolver.targets_dir(paths.targets_dir.clone()),
            app_config: resolver.app_config(paths.app_config.clone()),
            ios_dir: resolver.ios_dir(paths.ios_dir.clone()),
            android_dir: resolver.android_dir(paths.android_dir.clone()),
            host_entitlements: resolver.host_entitlements(paths.host_entitlements.clone()),
            project_root: resolver.base_dir,
            host: None,
        })
    }

    fn load(root: &Path, paths: &PathArgs) -> Result<Self> {
        let mut project = Self::load_layout(root, paths)?;
        let host = HostAppConfig::load(&project.app_config)
            .with_context(|| format!("loading host app config {:?}", project.app_config))?;
        project.host = Some(host);
        Ok(project)
    }

    fn host(&self) -> Result<&HostAppConfig> {
        self.host
            .as_ref()
            .ok_or_else(|| anyhow!("host app config was not loaded"))
    }

    fn context(&self) -> Result<GenerationContext> {
        let host = self.host()?;
        let ctx = GenerationContext::new(&self.project_root)
            .with_ios_dir(&self.ios_dir)
            .with_android_dir(&self.android_dir);
        let entitlements = self
            .host_entitlements
            .clone()
            .unwrap_or_else(|| ctx.default_host_entitlements(host));
        Ok(ctx.with_host_entitlements(entitlements))
    }

    fn entries(&self) -> Result<Vec<TargetEntry>> {
        let found = discover_targets(&self.targets_dir)
            .with_context(|| format!("discovering targets in {:?}", self.targets_dir))?;
        Ok(found.into_iter().map(TargetEntry::from).collect())
    }
}

fn cmd_prebuild(project: &Project) -> Result<GenerationReport> {
    let host = project.host()?.clone();
    let ctx = project.context()?;
    let entries = project.entries()?;
    if entries.is_empty() {
        println!("No targets found in {:?}", project.targets_dir);
    }
    let (_, report) = generate(host, &ctx, entries).context("generation pass failed")?;
    Ok(report)
}

fn print_report(report: &GenerationReport, as_json: bool) -> Result<()> {
    if as_json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    for target in &report.targets {
        println!("✓ {} ({})", target.product_name, target.target_type);
        println!("  Bundle identifier: {}", target.bundle_identifier);
        println!("  Deployment target: {}", target.deployment_target);
        if let Some(group) = &target.app_group {
            println!("  App group: {}", group);
        }
        if let Some(ios) = &target.ios {
            if ios.mutation.is_noop() && !ios.entitlements_written && !ios.info_plist_written {
                println!("  Xcode: up to date");
            } else {
                println!(
                    "  Xcode: settings changed: {}, assets copied: {}, colors refreshed: {}, plists written: {}",
                    ios.mutation.settings_changed,
                    ios.mutation.assets_copied,
                    ios.mutation.colors_refreshed,
                    ios.entitlements_written || ios.info_plist_written
                );
            }
        }
    }
    for failure in &report.failures {
        println!("✗ {}", failure);
    }
    if let Some(path) = &report.project_file {
        let state = if report.project_written { "updated" } else { "unchanged" };
        println!("\nXcode project {}: {:?}", state, path);
    }
    if report.host_entitlements_written {
        println!("Host entitlements updated");
    }
    if report.android_namespace_fixed {
        println!("Android namespace updated");
    }
    Ok(())
}

/// Resolves every target and prints what a pass would touch.
fn print_plan(project: &Project) -> Result<()> {
    let resolved = resolve_all(project)?;
    println!("Dry run: {} target(s) in {:?}", resolved.len(), project.targets_dir);
    for (label, outcome) in resolved {
        match outcome {
            Ok(descriptor) => {
                let name = descriptor.name.unwrap_or_default();
                let bundle = descriptor
                    .ios
                    .as_ref()
                    .and_then(|ios| ios.bundle_identifier.clone())
                    .unwrap_or_default();
                println!("  {} -> {} ({})", label, name, bundle);
            }
            Err(error) => println!("  {} -> error: {}", label, error),
        }
    }
    println!("Would update {:?} and {:?}", project.ios_dir, project.android_dir);
    Ok(())
}

type ResolveOutcome = std::result::Result<TargetDescriptor, apptargets_sdk::TargetsError>;

fn resolve_all(project: &Project) -> Result<Vec<(String, ResolveOutcome)>> {
    let host = project.host()?;
    let found = discover_targets(&project.targets_dir)
        .with_context(|| format!("discovering targets in {:?}", project.targets_dir))?;
    Ok(found
        .into_iter()
        .map(|target| {
            let outcome = TargetDescriptor::load(&target.descriptor_path)
                .and_then(|descriptor| resolve(&TargetConfig::from(descriptor), host))
                .map(|resolved| resolved.to_descriptor());
            (target.label(), outcome)
        })
        .collect())
}

/// Resolved descriptors keyed by directory name.
fn cmd_resolve(project: &Project, only: Option<&str>) -> Result<Value> {
    let mut out = serde_json::Map::new();
    for (label, outcome) in resolve_all(project)? {
        if only.is_some_and(|name| name != label) {
            continue;
        }
        let descriptor = outcome.with_context(|| format!("resolving target {:?}", label))?;
        out.insert(label, serde_json::to_value(descriptor)?);
    }
    if let Some(name) = only
        && out.is_empty()
    {
        bail!("no target directory named {:?} in {:?}", name, project.targets_dir);
    }
    Ok(Value::Object(out))
}

fn cmd_list(targets_dir: &Path) -> Result<()> {
    let found = discover_targets(targets_dir)
        .with_context(|| format!("discovering targets in {:?}", targets_dir))?;

    if found.is_empty() {
        println!("No targets found in {:?}.", targets_dir);
        println!("\nTo add one:");
        println!("  apptargets new-target <type> <name>");
    } else {
        println!("Found {} target(s):", found.len());
        for target in found {
            let file = target
                .descriptor_path
                .file_name()
                .map(|f| f.to_string_lossy().into_owned())
                .unwrap_or_default();
            println!("  - {} ({})", target.label(), file);
        }
    }

    Ok(())
}

fn defaults_json(target_type: TargetType) -> Value {
    let defaults = lookup_defaults(target_type);
    json!({
        "type": target_type.as_str(),
        "minimumDeploymentTarget": defaults.minimum_deployment_target,
        "bundleIdentifierSuffix": defaults.bundle_identifier_suffix,
        "productType": defaults.product_type,
        "extensionPointIdentifier": defaults.extension_point_identifier,
        "frameworks": defaults.frameworks,
        "deploymentSetting": defaults.deployment_setting.build_setting(),
        "reactNativeCapable": defaults.react_native_capable,
        "defaultActivationRules": defaults.default_activation_rules,
    })
}

fn cmd_defaults(target_type: Option<TargetType>, as_json: bool) -> Result<()> {
    let types: Vec<TargetType> = match target_type {
        Some(ty) => vec![ty],
        None => TargetType::ALL.to_vec(),
    };

    if as_json {
        let values: Vec<Value> = types.into_iter().map(defaults_json).collect();
        println!("{}", serde_json::to_string_pretty(&values)?);
        return Ok(());
    }

    println!(
        "{:<26} {:<8} {:<22} extension point",
        "type", "min OS", "bundle suffix"
    );
    for ty in types {
        let defaults = lookup_defaults(ty);
        println!(
            "{:<26} {:<8} {:<22} {}",
            ty.as_str(),
            defaults.minimum_deployment_target,
            defaults.bundle_identifier_suffix,
            defaults.extension_point_identifier.unwrap_or("-")
        );
    }
    Ok(())
}

fn starter_config(root: &Path) -> String {
    let host_product = HostAppConfig::load(&root.join("app.json"))
        .map(|host| host.product_name())
        .ok()
        .filter(|product| !product.is_empty())
        .unwrap_or_else(|| "HostApp".to_string());
    ApptargetsConfig::generate_starter_toml(&host_product)
}

fn cmd_storage(bridge: &StorageBridge, action: StorageAction, dry_run: bool) -> Result<()> {
    match action {
        StorageAction::Set { widget, key, value } => {
            if dry_run {
                println!("Would set {:?} for {} on {}", key, widget, bridge.platform());
            } else {
                bridge
                    .set(&widget, &key, &value)
                    .with_context(|| format!("storing {:?} for {}", key, widget))?;
            }
        }
        StorageAction::Get { widget, key } => {
            let value = bridge
                .get(&widget, &key)
                .with_context(|| format!("reading {:?} for {}", key, widget))?;
            match value {
                Some(value) => println!("{}", value),
                None => bail!("no value stored for {:?} in {}", key, widget),
            }
        }
        StorageAction::Remove { widget, key } => {
            if dry_run {
                println!("Would remove {:?} for {}", key, widget);
            } else {
                bridge
                    .remove(&widget, &key)
                    .with_context(|| format!("removing {:?} for {}", key, widget))?;
            }
        }
        StorageAction::Refresh { widget } => {
            if dry_run {
                println!("Would request a reload of {}", widget);
            } else {
                bridge
                    .refresh(&widget)
                    .with_context(|| format!("requesting a reload of {}", widget))?;
                println!("Requested a reload of {}", widget);
            }
        }
    }
    Ok(())
}

fn project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("resolving project root from current directory")?;
    Ok(find_project_root(&cwd).unwrap_or(cwd))
}

fn find_project_root(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|candidate| is_project_root(candidate))
        .map(|root| root.to_path_buf())
}

fn is_project_root(candidate: &Path) -> bool {
    candidate.join(CONFIG_FILE_NAME).is_file() || candidate.join("app.json").is_file()
}

fn ensure_can_write(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("refusing to overwrite existing file: {:?}", path);
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("writing file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const FIXTURE: &str = include_str!("../../apptargets-sdk/tests/fixtures/project.pbxproj");

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn sample_project() -> TempDir {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir(root.join(".git")).unwrap();
        write(
            &root.join("app.json"),
            r#"{"expo": {"name": "Host App", "ios": {"bundleIdentifier": "com.example.app"}}}"#,
        );
        write(&root.join("ios/HostApp.xcodeproj/project.pbxproj"), FIXTURE);
        write(
            &root.join("targets/content-share/target.toml"),
            "type = \"share\"\nname = \"Content Share\"\nappGroup = \"group.x\"\n",
        );
        dir
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["apptargets", "prebuild", "--json", "--dry-run", "-v"]).unwrap();
        assert!(cli.dry_run);
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::Prebuild { json: true, .. }));
    }

    #[test]
    fn parses_target_types_and_platforms() {
        let cli = Cli::try_parse_from(["apptargets", "new-target", "widget", "Clock"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::NewTarget {
                target_type: TargetType::Widget,
                ..
            }
        ));

        let cli = Cli::try_parse_from([
            "apptargets", "storage", "--platform", "android", "--root", "/data", "get", "w", "k",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Command::Storage {
                platform: Platform::Android,
                action: StorageAction::Get { .. },
                ..
            }
        ));

        assert!(Cli::try_parse_from(["apptargets", "new-target", "gadget", "X"]).is_err());
    }

    #[test]
    fn finds_project_root_from_nested_directory() {
        let project = sample_project();
        let nested = project.path().join("targets/content-share");
        assert_eq!(find_project_root(&nested).as_deref(), Some(project.path()));
    }

    #[test]
    fn prebuild_generates_and_is_idempotent() {
        let project = sample_project();
        let loaded = Project::load(project.path(), &PathArgs::default()).unwrap();

        let report = cmd_prebuild(&loaded).unwrap();
        assert!(report.is_success(), "{:?}", report.failures);
        assert!(report.project_written);
        assert!(report.host_entitlements_written);
        assert!(project.path().join("ios/HostApp/HostApp.entitlements").is_file());

        let again = cmd_prebuild(&loaded).unwrap();
        assert!(!again.project_written);
        assert!(!again.host_entitlements_written);
    }

    #[test]
    fn config_file_overrides_layout() {
        let project = sample_project();
        write(
            &project.path().join(CONFIG_FILE_NAME),
            "[project]\ntargets_dir = \"native\"\n",
        );
        let loaded = Project::load_layout(project.path(), &PathArgs::default()).unwrap();
        assert_eq!(loaded.targets_dir, project.path().join("native"));

        let cli_paths = PathArgs {
            targets_dir: Some(project.path().join("targets")),
            ..PathArgs::default()
        };
        let loaded = Project::load_layout(project.path(), &cli_paths).unwrap();
        assert_eq!(loaded.targets_dir, project.path().join("targets"));
    }

    #[test]
    fn resolve_fills_bundle_identifier() {
        let project = sample_project();
        let loaded = Project::load(project.path(), &PathArgs::default()).unwrap();

        let resolved = cmd_resolve(&loaded, Some("content-share")).unwrap();
        assert_eq!(
            resolved["content-share"]["ios"]["bundleIdentifier"],
            "com.example.app.share"
        );
        assert!(cmd_resolve(&loaded, Some("missing")).is_err());
    }

    #[test]
    fn defaults_json_covers_every_kind() {
        for ty in TargetType::ALL {
            let value = defaults_json(ty);
            assert_eq!(value["type"], ty.as_str());
            assert!(value["minimumDeploymentTarget"].as_str().is_some());
        }
    }

    #[test]
    fn starter_config_uses_host_product_name() {
        let project = sample_project();
        let contents = starter_config(project.path());
        assert!(contents.contains("ios/HostApp/HostApp.entitlements"));

        let output = project.path().join(CONFIG_FILE_NAME);
        ensure_can_write(&output).unwrap();
        write_file(&output, contents.as_bytes()).unwrap();
        assert!(ensure_can_write(&output).is_err());
    }

    #[test]
    fn storage_commands_round_trip() {
        let dir = TempDir::new().unwrap();
        let bridge = StorageBridge::android(dir.path());
        cmd_storage(
            &bridge,
            StorageAction::Set {
                widget: "Clock".into(),
                key: "k".into(),
                value: "v".into(),
            },
            false,
        )
        .unwrap();
        assert_eq!(bridge.get("Clock", "k").unwrap().as_deref(), Some("v"));

        cmd_storage(
            &bridge,
            StorageAction::Remove {
                widget: "Clock".into(),
                key: "k".into(),
            },
            true,
        )
        .unwrap();
        assert_eq!(bridge.get("Clock", "k").unwrap().as_deref(), Some("v"));

        let missing = cmd_storage(
            &bridge,
            StorageAction::Get {
                widget: "Clock".into(),
                key: "nope".into(),
            },
            false,
        );
        assert!(missing.is_err());
    }
}
