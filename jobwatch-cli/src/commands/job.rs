//! Job command handlers
//!
//! Creating jobs, reading status, and waiting for completion against a
//! running job service.

use std::time::Instant;

use anyhow::Result;
use colored::*;

use jobwatch_client::{JobWatcher, WatcherConfig};

/// Create a single job and print its id
pub async fn create_job(config: WatcherConfig) -> Result<()> {
    let watcher = JobWatcher::new(config)?;

    let id = watcher.create().await?;
    println!("{}", format!("Created job {}", id).green());

    watcher.dispose().await?;
    Ok(())
}

/// Read and print the current status of a job
pub async fn show_status(config: WatcherConfig, id: u64) -> Result<()> {
    let watcher = JobWatcher::new(config)?;

    match watcher.client().fetch_status(id).await {
        Ok(status) => {
            let line = format!("Job {} is {}", id, status);
            if status == "completed" {
                println!("{}", line.green());
            } else {
                println!("{}", line.yellow());
            }
        }
        Err(err) if err.is_not_found() => {
            println!("{}", format!("Job {} not found", id).red());
        }
        Err(err) => return Err(err.into()),
    }

    watcher.dispose().await?;
    Ok(())
}

/// Block until a job reports completion
pub async fn wait_for_job(config: WatcherConfig, id: u64) -> Result<()> {
    let watcher = JobWatcher::new(config)?;

    println!("{}", format!("Waiting for job {}...", id).dimmed());
    let start = Instant::now();

    watcher.wait_for_job(id).await?;

    println!(
        "{}",
        format!("Job {} completed after {:.2?}", id, start.elapsed()).green()
    );

    watcher.dispose().await?;
    Ok(())
}

/// Create several jobs and wait for all of them to complete
pub async fn run_demo(config: WatcherConfig, jobs: usize) -> Result<()> {
    let watcher = JobWatcher::new(config)?;
    let start = Instant::now();

    let mut ids = Vec::with_capacity(jobs);
    for _ in 0..jobs {
        let id = watcher.create().await?;
        println!("{}", format!("Created job {}", id).bold());
        ids.push(id);
    }

    let mut waits = Vec::with_capacity(ids.len());
    for &id in &ids {
        let watcher = watcher.clone();
        waits.push(tokio::spawn(async move { watcher.wait_for_job(id).await }));
    }

    for (id, wait) in ids.iter().zip(waits) {
        wait.await??;
        println!("{}", format!("Job {} completed", id).green());
    }

    println!(
        "{}",
        format!("All {} job(s) completed in {:.2?}", jobs, start.elapsed()).bold()
    );

    watcher.dispose().await?;
    Ok(())
}
