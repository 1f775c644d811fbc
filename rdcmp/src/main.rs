use anyhow::Result;
use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "rdcmp",
    version,
    about = "Compare two directories by filename and optionally copy missing files",
    long_about = "`rdcmp` lists the files present in one directory but missing in the other.

Only the names of entries directly under each directory are compared: contents are not
checked and subdirectories are not descended into. Names starting with '.' or '_' are ignored.

Missing files can be copied across in either direction. Copies keep timestamps and permission
bits, and each copy reports its elapsed time and throughput. The first failed copy stops the run.

EXIT CODES:
    0 - Comparison (and any requested copies) completed
    1 - A directory could not be listed or a copy failed

EXAMPLES:
    # Show what is missing on either side
    rdcmp /mnt/disk1/Films /mnt/backup/Films

    # Copy files found only in the source into the destination
    rdcmp /mnt/disk1/Films /mnt/backup/Films --copy_source

    # Synchronize both ways and log the listing to a file
    rdcmp /mnt/disk1/Films /mnt/backup/Films --copy_source --copy_dest --log films.log"
)]
struct Args {
    // Copy options
    /// Copy files missing in the destination from the source into the destination
    #[arg(long = "copy_source", alias = "copy-source", help_heading = "Copy options")]
    copy_source: bool,

    /// Copy files missing in the source from the destination into the source
    #[arg(long = "copy_dest", alias = "copy-dest", help_heading = "Copy options")]
    copy_dest: bool,

    /// Also preserve file owner and group of copied files (usually requires root)
    #[arg(long, help_heading = "Copy options")]
    preserve_owner: bool,

    // Progress & output
    /// File to store the comparison listing (instead of stdout)
    #[arg(long, value_name = "PATH", help_heading = "Progress & output")]
    log: Option<std::path::PathBuf>,

    /// Verbose level (implies "summary"): -v INFO / -vv DEBUG / -vvv TRACE (default: ERROR)
    ///
    /// Per-file copy timings are logged at INFO level.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, help_heading = "Progress & output")]
    verbose: u8,

    /// Print summary at the end
    #[arg(long, help_heading = "Progress & output")]
    summary: bool,

    /// Quiet mode, suppress stdout output (errors and listing)
    ///
    /// When used with --log, the listing is still written to the log file.
    #[arg(short = 'q', long = "quiet", help_heading = "Progress & output")]
    quiet: bool,

    // Advanced settings
    /// Number of worker threads, 0 means number of cores
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_workers: usize,

    /// Number of blocking worker threads, 0 means Tokio runtime default (512)
    #[arg(
        long,
        default_value = "0",
        value_name = "N",
        help_heading = "Advanced settings"
    )]
    max_blocking_threads: usize,

    // ARGUMENTS
    /// Source directory for comparison
    #[arg()]
    source: std::path::PathBuf,

    /// Destination directory for comparison
    #[arg()]
    destination: std::path::PathBuf,
}

impl Args {
    fn cmp_settings(&self) -> common::cmp::Settings {
        common::cmp::Settings {
            copy_missing_to_destination: self.copy_source,
            copy_missing_to_source: self.copy_dest,
            preserve: if self.preserve_owner {
                common::preserve::preserve_all()
            } else {
                common::preserve::preserve_default()
            },
        }
    }
}

async fn async_main(args: Args) -> Result<common::cmp::Summary> {
    // output to stdout if no log file and not quiet
    let use_stdout = args.log.is_none() && !args.quiet;
    let log_handle = common::report::LogWriter::new(args.log.as_deref(), use_stdout).await?;
    let res = common::cmp(
        &args.source,
        &args.destination,
        &log_handle,
        &args.cmp_settings(),
    )
    .await;
    // keep whatever was reported before a failure
    log_handle.flush().await?;
    res.map_err(|error| {
        tracing::debug!("completed before failure:\n{}", &error.summary);
        error.into()
    })
}

fn main() {
    let args = Args::parse();
    let func = {
        let args = args.clone();
        || async_main(args)
    };
    let output = common::OutputConfig {
        quiet: args.quiet,
        verbose: args.verbose,
        print_summary: args.summary,
    };
    let runtime = common::RuntimeConfig {
        max_workers: args.max_workers,
        max_blocking_threads: args.max_blocking_threads,
    };
    match common::run(output, runtime, func) {
        Some(_) => std::process::exit(0),
        None => std::process::exit(1),
    }
}
