use crate::agents::update_decider::PlannedUpdate;
use crate::agents::{
    CommandRunner, Decision, LogNotifier, ModInstaller, ModScannerAgent, Notifier,
    ServiceController, SystemRunner, UpdateDecider, WebhookNotifier,
};
use crate::config::Config;
use crate::error::{Result, SyncError};
use crate::registry::{ModPortalClient, ModRegistry};
use crate::utils::path_validator::PathValidator;
use colored::Colorize;
use std::path::Path;
use tracing::{debug, error, info, warn};

/// A version change of one mod, applied or planned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModChange {
    pub name: String,
    pub title: String,
    pub from: String,
    pub to: String,
}

impl ModChange {
    fn from_plan(plan: &PlannedUpdate<'_>) -> Self {
        Self {
            name: plan.local.name.clone(),
            title: plan.remote.title.clone(),
            from: plan.local_version.to_string(),
            to: plan.remote_version.to_string(),
        }
    }

    fn message(&self) -> String {
        format!("Updated {} ({} -> {})", self.title, self.from, self.to)
    }
}

/// What a sync run did
#[derive(Debug, Clone, Default)]
pub struct SyncReport {
    /// Number of mods found in the mod directory.
    pub scanned: usize,
    pub up_to_date: Vec<String>,
    pub updated: Vec<ModChange>,
    /// Changes found during a dry run.
    pub planned: Vec<ModChange>,
    pub skipped_downgrades: Vec<ModChange>,
    pub failed: Vec<(String, String)>,
    pub restarted: bool,
    pub server_updated: bool,
}

impl SyncReport {
    /// `ModsFailed` if any mod failed. A mod that installed but could not be
    /// announced appears in both `updated` and `failed`, so the total is the
    /// scanned inventory rather than a sum of the lists.
    pub fn ensure_no_failures(&self) -> Result<()> {
        if self.failed.is_empty() {
            return Ok(());
        }
        Err(SyncError::ModsFailed {
            failed: self.failed.len(),
            total: self.scanned,
        })
    }
}

/// The external systems a sync run talks to.
pub struct Collaborators<'a> {
    pub registry: &'a dyn ModRegistry,
    pub runner: &'a dyn CommandRunner,
    pub notifier: &'a dyn Notifier,
}

/// Execute the sync workflow against the real mod portal, docker-compose
/// and webhook.
pub fn execute_sync(config: &Config) -> Result<SyncReport> {
    let registry = ModPortalClient::new(config)?;
    let runner = SystemRunner;
    let notifier: Box<dyn Notifier> = match &config.webhook {
        Some(url) => Box::new(WebhookNotifier::new(url.clone(), config.timeout)?),
        None => Box::new(LogNotifier),
    };

    let report = run_sync(
        config,
        &Collaborators {
            registry: &registry,
            runner: &runner,
            notifier: notifier.as_ref(),
        },
    )?;

    print_report(&report, config.dry_run);
    report.ensure_no_failures()?;

    println!("\n{}", "✨ Sync completed successfully!".green().bold());
    Ok(report)
}

/// Scan, decide, install, restart and report.
///
/// Stops at the first error unless `keep_going` is set, in which case
/// per-mod failures are collected in the report and the remaining mods are
/// still processed.
pub fn run_sync(config: &Config, io: &Collaborators<'_>) -> Result<SyncReport> {
    let mut report = SyncReport::default();
    let mode = if config.dry_run { " (dry run)" } else { "" };
    println!("{}", format!("Synchronising Factorio mods{mode}...").cyan().bold());

    // Step 1: Scan the mod directory
    println!("\n{}", "1. Scanning mod directory...".yellow());
    let local_mods = ModScannerAgent::new(&config.mod_dir).scan()?;
    report.scanned = local_mods.len();
    println!(
        "   Found {} mod(s) in {}",
        local_mods.len(),
        config.mod_dir.display().to_string().dimmed()
    );

    if local_mods.is_empty() {
        println!("{}", "   Nothing to check".dimmed());
    } else {
        // Step 2: Query the registry
        println!("\n{}", "2. Fetching mod metadata...".yellow());
        let names: Vec<String> = local_mods.keys().cloned().collect();
        let index = io.registry.fetch_metadata(&names)?.into_index();
        println!("{}", format!("✓ Received metadata for {} mod(s)", index.len()).green());

        // Step 3: Update outdated mods
        println!("\n{}", "3. Checking for updates...".yellow());
        let mod_dir = if config.dry_run {
            config.mod_dir.clone()
        } else {
            PathValidator::validate_mod_dir(&config.mod_dir)?
        };
        let decider = UpdateDecider::new(&index);
        let installer = ModInstaller::new(io.registry, &mod_dir, config.owner);

        for local in local_mods.values() {
            let outcome = decider.decide(local).and_then(|plan| {
                process_mod(config, io, &installer, &plan, &mut report)
            });

            if let Err(e) = outcome {
                if !config.keep_going {
                    return Err(e);
                }
                error!(mod_name = %local.name, error = %e, "Mod update failed");
                println!("   {} {}: {}", "✗".red(), local.name.white().bold(), e);
                report.failed.push((local.name.clone(), e.to_string()));
            }
        }
    }

    // Step 4: Restart once if anything changed
    if !report.updated.is_empty() {
        println!("\n{}", "4. Restarting server...".yellow());
        controller(config, io).restart()?;
        report.restarted = true;
        println!("{}", format!("✓ Restarted service '{}'", config.service).green());
    }

    // Step 5: Update the server image
    if config.update_server {
        println!("\n{}", "5. Updating server...".yellow());
        if config.dry_run {
            println!("   Would pull and recreate service '{}'", config.service);
        } else {
            controller(config, io).update_server()?;
            report.server_updated = true;
            io.notifier.notify("Server updated")?;
            println!("{}", "✓ Server updated".green());
        }
    }

    Ok(report)
}

fn process_mod(
    config: &Config,
    io: &Collaborators<'_>,
    installer: &ModInstaller<'_>,
    plan: &PlannedUpdate<'_>,
    report: &mut SyncReport,
) -> Result<()> {
    let change = ModChange::from_plan(plan);

    if !plan.decision.needs_update(!config.no_downgrade) {
        match plan.decision {
            Decision::Downgrade => {
                warn!(mod_name = %change.name, from = %change.from, to = %change.to, "Skipping downgrade");
                println!(
                    "   {} {} {} → {} (older release, skipped)",
                    "•".dimmed(),
                    change.title.white().bold(),
                    change.from,
                    change.to.yellow()
                );
                report.skipped_downgrades.push(change);
            }
            _ => report.up_to_date.push(change.name),
        }
        return Ok(());
    }

    info!(mod_name = %change.name, from = %change.from, to = %change.to, "New version available");
    if plan.decision == Decision::Downgrade {
        warn!(mod_name = %change.name, "Newest listed release is older than the installed archive");
    }
    println!(
        "   • New version of {} available {} → {}",
        change.title.white().bold(),
        change.from.red(),
        change.to.green().bold()
    );

    if config.dry_run {
        report.planned.push(change);
        return Ok(());
    }

    println!("   Downloading {} ({})", change.title, change.to);
    let installed = installer.install(plan.remote, &plan.local.file_name)?;
    debug!(sha1 = %installed.sha1, removed = ?installed.removed, "Install verified");
    println!(
        "   {}",
        format!("✓ Installed {}", file_name(&installed.path)).green()
    );

    let message = change.message();
    report.updated.push(change);
    io.notifier.notify(&message)
}

fn controller<'a>(config: &Config, io: &Collaborators<'a>) -> ServiceController<'a> {
    ServiceController::new(
        io.runner,
        &config.compose,
        &config.compose_file,
        &config.service,
        config.restart_delay,
    )
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_report(report: &SyncReport, dry_run: bool) {
    println!("\n{}", "Summary:".cyan().bold());
    println!("  {} up to date", report.up_to_date.len().to_string().yellow());

    if dry_run {
        println!("  {} would be updated", report.planned.len().to_string().yellow());
        for change in &report.planned {
            println!(
                "    • {} {} → {}",
                change.name.white().bold(),
                change.from.red(),
                change.to.green()
            );
        }
    } else {
        println!("  {} updated", report.updated.len().to_string().yellow());
        for change in &report.updated {
            println!(
                "    • {} {} → {}",
                change.name.white().bold(),
                change.from.red(),
                change.to.green()
            );
        }
    }

    if !report.skipped_downgrades.is_empty() {
        println!(
            "  {} downgrade(s) skipped",
            report.skipped_downgrades.len().to_string().yellow()
        );
    }

    if !report.failed.is_empty() {
        println!("  {} failed", report.failed.len().to_string().red());
        for (name, reason) in &report.failed {
            println!("    • {} {}", name.white().bold(), reason.dimmed());
        }
    }

    if report.restarted {
        println!("  server restarted");
    }
    if report.server_updated {
        println!("  server image updated");
    }
}
