//! Background worker collecting system snapshots.

use crate::{
    config::Config,
    snapshot::{ProcessInfo, SystemSnapshot},
};
use std::path::PathBuf;
use sysinfo::System;
use tokio::sync::mpsc;

/// Commands sent from the UI to the worker.
#[derive(Debug)]
pub enum WorkerCmd {
    /// Collect a fresh snapshot of system metrics.
    RefreshSnapshot,
    /// Persist and apply updated settings.
    SaveSettings(Config),
}

/// Events emitted by the worker for UI updates.
#[derive(Clone, Debug)]
pub enum WorkerEvent {
    /// Fresh snapshot of system metrics.
    SnapshotLoaded(SystemSnapshot),
    /// Informational log message.
    Log(String),
    /// User-visible error message.
    Error(String),
}

/// Main worker loop: own the sysinfo handle and handle commands sequentially.
pub async fn run(
    mut rx: mpsc::Receiver<WorkerCmd>,
    tx: mpsc::Sender<WorkerEvent>,
    mut cfg: Config,
    cfg_path: PathBuf,
) {
    // One long-lived handle; CPU usage needs deltas between refreshes.
    let mut system = System::new_all();
    tracing::info!("worker started");

    // Process commands one at a time to keep state consistent.
    while let Some(cmd) = rx.recv().await {
        match cmd {
            WorkerCmd::SaveSettings(new_cfg) => {
                tracing::info!("save settings");
                cfg = new_cfg;
                match cfg.save(&cfg_path) {
                    Ok(()) => {
                        let _ = tx.send(WorkerEvent::Log("settings saved".into())).await;
                    }
                    Err(e) => {
                        tracing::error!("settings save failed: {e}");
                        let _ = tx
                            .send(WorkerEvent::Error(format!("settings save failed: {e}")))
                            .await;
                    }
                }
            }

            WorkerCmd::RefreshSnapshot => {
                tracing::info!("refresh snapshot");
                let snapshot = collect_snapshot(&mut system, cfg.snapshot.top_processes).await;
                tracing::info!(
                    "snapshot collected: cpu {:.1}%, {} processes",
                    snapshot.cpu_usage,
                    snapshot.process_count
                );
                let _ = tx.send(WorkerEvent::SnapshotLoaded(snapshot)).await;
            }
        }
    }
}

/// Collect one snapshot of the whole system.
///
/// CPU usage is a delta, so the first refresh only primes the counters
/// and a second one runs after the minimum measurement interval.
async fn collect_snapshot(system: &mut System, top_processes: usize) -> SystemSnapshot {
    system.refresh_all();
    tokio::time::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL).await;
    system.refresh_all();

    SystemSnapshot {
        host_name: System::host_name(),
        uptime_secs: System::uptime(),
        cpu_usage: system.global_cpu_usage(),
        total_memory: system.total_memory(),
        used_memory: system.used_memory(),
        total_swap: system.total_swap(),
        used_swap: system.used_swap(),
        load_average: load_average(),
        process_count: system.processes().len(),
        top_processes: busiest_processes(system, top_processes),
        taken_at: Some(chrono::Local::now()),
    }
}

/// Read the 1/5/15 minute load averages.
fn load_average() -> (f64, f64, f64) {
    let load = System::load_average();
    (load.one, load.five, load.fifteen)
}

/// Pick the processes with the highest CPU usage.
fn busiest_processes(system: &System, count: usize) -> Vec<ProcessInfo> {
    let mut processes: Vec<ProcessInfo> = system
        .processes()
        .iter()
        .map(|(pid, process)| ProcessInfo {
            pid: pid.as_u32(),
            name: process.name().to_string_lossy().to_string(),
            cpu_usage: process.cpu_usage(),
            memory: process.memory(),
        })
        .collect();
    processes.sort_by(|a, b| {
        b.cpu_usage
            .partial_cmp(&a.cpu_usage)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    processes.truncate(count);
    processes
}
