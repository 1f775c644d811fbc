//! Common library for the `rdcmp` directory comparison tool
//!
//! `rdcmp` compares two directories by the names of their immediate entries, reports what is
//! missing on either side and can copy the missing files across. Contents are never compared and
//! subdirectories are not descended into.
//!
//! # Modules
//!
//! - [`filter`] - which names take part in comparison (no `.`/`_` prefixes)
//! - [`cmp`] - listing, set difference, reporting and the copy passes
//! - [`copy`] - copying a single file with its metadata
//! - [`preserve`] - applying timestamps, permissions and ownership
//! - [`report`] - the [`report::Reporter`] collaborator and the stdout/log-file writer
//! - [`timer`] - per-operation elapsed-time measurement
//! - [`config`] - runtime and output configuration
//!
//! [`run`] sets up tracing and the tokio runtime for the binary and executes the comparison.

use anyhow::Context;
use tracing_subscriber::prelude::*;

pub mod cmp;
pub mod config;
pub mod copy;
pub mod filter;
pub mod preserve;
pub mod report;
pub mod timer;

#[cfg(test)]
mod testutils;

pub use cmp::cmp;
pub use config::{OutputConfig, RuntimeConfig};

fn init_tracing(output: &OutputConfig) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(output.log_level().into())
        .from_env()
        .context("invalid RUST_LOG directives")?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .context("failed to initialize tracing")?;
    Ok(())
}

fn build_runtime(runtime: &RuntimeConfig) -> anyhow::Result<tokio::runtime::Runtime> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if runtime.max_workers > 0 {
        builder.worker_threads(runtime.max_workers);
    }
    if runtime.max_blocking_threads > 0 {
        builder.max_blocking_threads(runtime.max_blocking_threads);
    }
    builder.build().context("failed to create runtime")
}

/// Run `func` to completion and print its summary if requested.
///
/// Returns `None` if anything failed. The error chain is logged and, unless quiet, printed to
/// stderr.
pub fn run<Fut, Summary>(
    output: OutputConfig,
    runtime: RuntimeConfig,
    func: impl FnOnce() -> Fut,
) -> Option<Summary>
where
    Fut: std::future::Future<Output = anyhow::Result<Summary>>,
    Summary: std::fmt::Display,
{
    let res = init_tracing(&output)
        .and_then(|()| build_runtime(&runtime))
        .and_then(|runtime| runtime.block_on(func()));
    match res {
        Ok(summary) => {
            if output.print_summary || output.verbose > 0 {
                println!("{}", &summary);
            }
            Some(summary)
        }
        Err(error) => {
            report_failure(&output, &error);
            None
        }
    }
}

fn report_failure(output: &OutputConfig, error: &anyhow::Error) {
    tracing::error!("{:#}", error);
    if !output.quiet {
        eprintln!("{:#}", error);
    }
}
