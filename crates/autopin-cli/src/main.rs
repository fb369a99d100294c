//! `autopin-cli` – Autopin Command Line Interface
//!
//! Runs one watchdog against the simulated platform:
//!
//! 1. Loads `~/.autopin/settings.toml` (or `--settings PATH`), applying
//!    `AUTOPIN_*` environment overrides.
//! 2. Builds the watchdog configuration from `KEY=VALUE` / `KEY+=VALUE`
//!    arguments.
//! 3. Bootstraps the watchdog and prints every diagnostic it collected.
//! 4. Serves events until the run stops.  **Ctrl-C** requests the stop.
//!
//! ```text
//! autopin PerformanceMonitors=m1 m1.type=random ControlStrategy=noop
//! ```

mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use autopin_hal::{MapConfiguration, SimRegistry};
use autopin_runtime::{Phase, Watchdog, WatchdogSettings, init_tracing};
use autopin_types::{Event, Pid};
use clap::Parser;
use colored::Colorize;
use tracing::warn;

#[derive(Parser, Debug)]
#[command(name = "autopin", version, about = "Thread-pinning watchdog")]
struct Cli {
    /// Settings file [default: ~/.autopin/settings.toml]
    #[arg(long, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Process id reported by the simulated observed process
    #[arg(long, value_name = "PID")]
    pid: Option<Pid>,

    /// Write the effective settings back to the settings file
    #[arg(long)]
    save_settings: bool,

    /// Watchdog configuration, e.g. `ControlStrategy=noop` or
    /// `PerformanceMonitors+=m2`
    #[arg(value_name = "KEY=VALUE")]
    options: Vec<String>,
}

fn main() -> ExitCode {
    let _guard = init_tracing("autopin");
    let cli = Cli::parse();

    print_banner();

    // ── Settings ──────────────────────────────────────────────────────────
    let path = cli.settings.clone().unwrap_or_else(config::settings_path);
    let settings = match config::load_from(&path) {
        Ok(Some(settings)) => {
            println!("  Settings loaded from {}", path.display().to_string().bold());
            settings
        }
        Ok(None) => default_settings(),
        Err(e) => {
            println!("{}: {e}", "Settings error".red());
            println!("  Using default settings.");
            default_settings()
        }
    };
    if cli.save_settings {
        match config::save_to(&settings, &path) {
            Ok(()) => println!(
                "  {} Settings saved to {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            ),
            Err(e) => println!("{}: {e}", "Error saving settings".red()),
        }
    }

    // ── Configuration ─────────────────────────────────────────────────────
    let mut configuration = MapConfiguration::new();
    for option in &cli.options {
        if let Err(e) = configuration.apply(option) {
            eprintln!("{}: {e}", "Invalid option".red());
            return ExitCode::from(2);
        }
    }

    // ── Bootstrap ─────────────────────────────────────────────────────────
    let mut registry = SimRegistry::builder().with_all().with_builtins();
    if let Some(pid) = cli.pid {
        registry = registry.with_pid(pid);
    }
    let factory = registry.build().into_factory();
    let mut watchdog = Watchdog::new(Box::new(configuration), factory, &settings);

    println!("\n  Bootstrapping {} …", watchdog.name().bold());
    let phase = watchdog.run();
    print_diagnostics(&watchdog);

    if phase == Phase::Failed {
        println!(
            "\n  {} {} halted in bootstrap.",
            "✗".red().bold(),
            watchdog.name().bold()
        );
        return ExitCode::FAILURE;
    }
    println!(
        "  {} {} is live (pid {}).",
        "✓".green().bold(),
        watchdog.name().bold(),
        watchdog
            .pid()
            .map_or_else(|| "?".to_string(), |pid| pid.to_string())
    );

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let stop = watchdog.stop_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – stopping the watchdog …".yellow().bold());
        let _ = stop.emit(Event::Stop);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler");
    }

    // ── Event loop ────────────────────────────────────────────────────────
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("{}: {e}", "Failed to start the event loop".red());
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(watchdog.serve());

    println!("  {} Watchdog stopped.", "✓".green());
    ExitCode::SUCCESS
}

fn default_settings() -> WatchdogSettings {
    let mut settings = WatchdogSettings::default();
    settings.apply_env_overrides();
    settings
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_diagnostics(watchdog: &Watchdog) {
    let reports = watchdog.diagnostics().reports();
    if reports.is_empty() {
        return;
    }
    println!("\n  {} diagnostic(s):", reports.len());
    for report in reports {
        println!("    {} {report}", "•".red());
    }
    println!();
}

fn print_banner() {
    println!();
    println!("{}", r#"   ___       __            _     "#.bold().cyan());
    println!("{}", r#"  / _ |__ __/ /____  ___  (_)__  "#.bold().cyan());
    println!("{}", r#" / __ / // / __/ _ \/ _ \/ / _ \ "#.bold().cyan());
    println!("{}", r#"/_/ |_\_,_/\__/\___/ .__/_/_//_/ "#.bold().cyan());
    println!("{}", r#"                  /_/            "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Autopin".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Thread-pinning watchdog");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_assignments_and_flags() {
        let cli = Cli::try_parse_from([
            "autopin",
            "--pid",
            "77",
            "PerformanceMonitors=m1",
            "m1.type=random",
        ])
        .expect("valid arguments");

        assert_eq!(cli.pid, Some(77));
        assert!(!cli.save_settings);
        assert_eq!(cli.options, ["PerformanceMonitors=m1", "m1.type=random"]);
    }

    #[test]
    fn rejects_non_numeric_pid() {
        assert!(Cli::try_parse_from(["autopin", "--pid", "abc"]).is_err());
    }
}
