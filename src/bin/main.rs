// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (c) 2026 nervosys

//! CLI tool for LinMan (linman)

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use linman::{
    view, ActionError, ActionKind, ActionRequest, ActionRunner, Aggregator, DeviceEntry,
    HotplugWatcher, InventoryConfig, NetlinkUeventSocket, RefreshCoordinator, Snapshot,
    SystemRunner,
};

#[derive(Parser)]
#[command(name = "linman")]
#[command(about = "LinMan: a de-duplicated inventory of the devices attached to this Linux machine", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Enumerate devices once and print the inventory (default)
    Scan {
        /// Include hidden (virtual) devices
        #[arg(short, long)]
        all: bool,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Print the full property sheet of every device
        #[arg(short, long)]
        details: bool,
    },
    /// Print the inventory and keep it current as devices come and go
    Watch {
        /// Include hidden (virtual) devices
        #[arg(short, long)]
        all: bool,
    },
    /// Run a privileged driver action on one device
    Action {
        #[arg(value_enum)]
        kind: ActionArg,

        /// Bus subsystem (pci, usb, ...)
        #[arg(long)]
        subsystem: String,

        /// Driver or module name
        #[arg(long)]
        driver: String,

        /// Bus-local device ID (e.g. 0000:00:1f.6)
        #[arg(long, default_value = "")]
        device: String,
    },
    /// Configuration helpers
    Config {
        #[command(subcommand)]
        action: ConfigSubcommand,
    },
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Print a sample configuration file
    Sample,
    /// Print the effective configuration
    Show,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Unbind,
    Rebind,
    Unload,
    Reload,
}

impl From<ActionArg> for ActionKind {
    fn from(arg: ActionArg) -> Self {
        match arg {
            ActionArg::Unbind => ActionKind::Unbind,
            ActionArg::Rebind => ActionKind::Rebind,
            ActionArg::Unload => ActionKind::UnloadModule,
            ActionArg::Reload => ActionKind::ReloadModule,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    env_logger::init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Some(Commands::Scan {
            all,
            format,
            details,
        }) => handle_scan(config, all, format, details)?,
        None => {
            let show_hidden = config.show_hidden;
            handle_scan(config, show_hidden, OutputFormat::Text, false)?
        }
        Some(Commands::Watch { all }) => handle_watch(config, all)?,
        Some(Commands::Action {
            kind,
            subsystem,
            driver,
            device,
        }) => handle_action(&config, ActionRequest::new(kind.into(), subsystem, driver, device))?,
        Some(Commands::Config { action }) => match action {
            ConfigSubcommand::Sample => print!("{}", InventoryConfig::sample_toml()),
            ConfigSubcommand::Show => print!("{}", toml::to_string_pretty(&config)?),
        },
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<InventoryConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            log::debug!("Loading configuration from {}", path.display());
            Ok(InventoryConfig::from_toml_file(path)?)
        }
        None => Ok(InventoryConfig::default()),
    }
}

fn handle_scan(
    config: InventoryConfig,
    show_hidden: bool,
    format: OutputFormat,
    details: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let snapshot = Aggregator::system(config).refresh();
    match format {
        OutputFormat::Json => {
            let entries: Vec<&DeviceEntry> = view::visible(&snapshot, show_hidden).collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Text if details => print_details(&snapshot, show_hidden),
        OutputFormat::Text => print_inventory(&snapshot, show_hidden),
    }
    Ok(())
}

fn print_inventory(snapshot: &Snapshot, show_hidden: bool) {
    for (category, entries) in view::group_by_category(snapshot, show_hidden) {
        println!("{}", format!("═══ {} ═══", category).cyan().bold());
        for entry in entries {
            print_entry(entry);
        }
        println!();
    }
    print_summary(snapshot, show_hidden);
}

fn print_details(snapshot: &Snapshot, show_hidden: bool) {
    for entries in view::group_by_category(snapshot, show_hidden).into_values() {
        for entry in entries {
            println!("{}", entry.details());
            println!();
        }
    }
    print_summary(snapshot, show_hidden);
}

fn print_summary(snapshot: &Snapshot, show_hidden: bool) {
    let hidden = snapshot.hidden_count();
    let mut summary = format!("{} devices", snapshot.len());
    if hidden > 0 && !show_hidden {
        summary.push_str(&format!(", {} hidden (use --all)", hidden));
    }
    let missing = snapshot.missing_driver_count();
    if missing > 0 {
        summary.push_str(&format!(", {} without driver", missing));
    }
    println!("{}", summary.dimmed());
}

fn print_entry(entry: &DeviceEntry) {
    let name = if entry.is_hidden {
        entry.name.dimmed()
    } else {
        entry.name.white().bold()
    };
    let mut line = format!("  {} {}", "▶".green(), name);
    if let Some(vendor) = &entry.vendor {
        line.push_str(&format!("  {}", vendor.as_str().dimmed()));
    }
    if !entry.driver.is_unbound() {
        line.push_str(&format!("  [{}]", entry.driver.to_string().green()));
    } else if entry.driver_missing {
        line.push_str(&format!("  {}", "[driver missing]".red().bold()));
    }
    println!("{}", line);

    if let Some(description) = &entry.description {
        println!("      {}", description.as_str().dimmed());
    }
    if !entry.logical_names.is_empty() {
        println!("      {}", entry.logical_names.join(", ").dimmed());
    }
}

fn handle_watch(config: InventoryConfig, show_hidden: bool) -> Result<(), Box<dyn std::error::Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .map_err(|e| format!("Error setting Ctrl-C handler: {}", e))?;

    let previous: Mutex<Option<BTreeMap<String, String>>> = Mutex::new(None);
    let sink = move |snapshot: &Snapshot| {
        let current: BTreeMap<String, String> = view::visible(snapshot, show_hidden)
            .map(|e| (e.device_path.clone(), e.name.clone()))
            .collect();
        let mut previous = previous.lock().unwrap_or_else(|e| e.into_inner());
        match previous.as_ref() {
            None => print_inventory(snapshot, show_hidden),
            Some(before) => print_changes(snapshot, before, &current),
        }
        *previous = Some(current);
    };

    let hotplug = config.hotplug.clone();
    let coordinator = Arc::new(RefreshCoordinator::new(
        Aggregator::system(config),
        Arc::new(sink),
    ));
    coordinator.request();

    let socket = NetlinkUeventSocket::open()?;
    let c = coordinator.clone();
    let watcher = HotplugWatcher::spawn(socket, &hotplug, move || {
        if let Err(e) = c.request_in_background() {
            log::warn!("Cannot start refresh: {}", e);
        }
    })?;

    eprintln!("{}", "Watching for device changes (Ctrl-C to stop)".dimmed());
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(200));
    }
    watcher.stop();
    Ok(())
}

fn print_changes(
    snapshot: &Snapshot,
    before: &BTreeMap<String, String>,
    after: &BTreeMap<String, String>,
) {
    let stamp = snapshot.captured_at.with_timezone(&chrono::Local).format("%H:%M:%S");
    let mut changed = false;
    for (path, name) in after.iter().filter(|(p, _)| !before.contains_key(*p)) {
        println!("[{}] {} {} ({})", stamp, "+".green().bold(), name, path.dimmed());
        changed = true;
    }
    for (path, name) in before.iter().filter(|(p, _)| !after.contains_key(*p)) {
        println!("[{}] {} {} ({})", stamp, "-".red().bold(), name, path.dimmed());
        changed = true;
    }
    if !changed {
        log::debug!("Refresh #{} produced no visible change", snapshot.generation);
    }
}

fn handle_action(
    config: &InventoryConfig,
    request: ActionRequest,
) -> Result<(), Box<dyn std::error::Error>> {
    let runner = ActionRunner::new(config, Arc::new(SystemRunner::new()));
    match runner.run(&request) {
        Ok(()) => {
            println!(
                "{} {} {}",
                "✓".green().bold(),
                request.kind,
                request.device.as_str().white().bold()
            );
            Ok(())
        }
        Err(ActionError::Declined) => {
            eprintln!("{}", "Authorization declined; nothing was changed".yellow());
            Err(ActionError::Declined.into())
        }
        Err(e) => Err(e.into()),
    }
}
