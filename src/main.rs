//! PUF Key Generation CLI
//!
//! Command-line interface for enrolling PUF keys from binary readings and
//! checking later readings against them.

use clap::{Parser, Subcommand};
use puf_keygen::{
    metrics::{MetricsError, MetricsRegistry},
    pipeline::{
        ConfigError, EnrollmentRecord, FileConfig, Pipeline, Reconciliation, RecordError,
    },
    reconcile::ReconcileOutcome,
    source::{PufReading, SourceError, SyntheticPuf},
    PipelineError,
};
use rand_core::{OsRng, RngCore};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Exit code when a recovered key is rejected.
const EXIT_REJECTED: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "puf-keygen", version, about = "PUF key enrollment and recovery")]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Key length in bits (overrides the config file).
    #[arg(long, global = true)]
    key_length: Option<usize>,

    /// Correction threshold in percent (overrides the config file).
    #[arg(long, global = true)]
    threshold: Option<f64>,

    /// Sample distinct addresses only.
    #[arg(long, global = true)]
    distinct: bool,

    /// Print Prometheus metrics when done.
    #[arg(long, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Enroll from one reading and recover from another.
    Run { enroll: PathBuf, recover: PathBuf },
    /// Enroll from a reading and save the address record.
    Enroll {
        reading: PathBuf,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Recover using a saved record and the enrollment reading.
    Recover {
        reference: PathBuf,
        reading: PathBuf,
        #[arg(short, long)]
        record: PathBuf,
    },
    /// Enroll once and recover against many readings.
    Sweep {
        enroll: PathBuf,
        #[arg(required = true)]
        readings: Vec<PathBuf>,
    },
    /// Run the pipeline on a synthetic PUF.
    Simulate {
        /// Device size in bits.
        #[arg(long, default_value_t = 1024)]
        puf_size: usize,
        /// Per-bit flip probability of each re-read.
        #[arg(long, default_value_t = 0.03)]
        flip_rate: f64,
        /// Number of noisy re-reads.
        #[arg(long, default_value_t = 1)]
        reads: u32,
        /// Device seed (random if omitted).
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Record(#[from] RecordError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

fn main() -> ExitCode {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("PUF Key Generator v{}", puf_keygen::VERSION);

    match execute(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<FileConfig, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => FileConfig::from_file(path)?,
        None => FileConfig::default(),
    };

    if let Some(key_length) = cli.key_length {
        config.enrollment.key_length = key_length;
    }
    if let Some(threshold) = cli.threshold {
        config.reconciliation.threshold_pct = threshold;
    }
    if cli.distinct {
        config.enrollment.allow_duplicates = false;
    }
    if cli.metrics {
        config.output.print_metrics = true;
    }

    config.validate()?;
    Ok(config)
}

fn execute(cli: Cli) -> Result<ExitCode, CliError> {
    let config = load_config(&cli)?;
    let mut pipeline = Pipeline::from_config(&config)?;
    let metrics = MetricsRegistry::new()?;

    let code = match cli.command {
        Command::Run { enroll, recover } => {
            let reading_a = PufReading::from_file(&enroll)?;
            let reading_b = PufReading::from_file(&recover)?;

            let report = pipeline.run(&reading_a, &reading_b)?;
            metrics.observe_enrollment(&report.enrollment);
            metrics.observe_reconciliation(&report.reconciliation);
            exit_code(print_reconciliation(&report.reconciliation))
        }
        Command::Enroll { reading, out } => {
            let reading = PufReading::from_file(&reading)?;
            let enrollment = pipeline.enroll(&reading)?;
            metrics.observe_enrollment(&enrollment);

            enrollment
                .to_record(config.enrollment.allow_duplicates)
                .save(&out)?;
            println!(
                "Enrolled {}-bit key from {} ({} distinct addresses), record saved to {}",
                enrollment.key.len(),
                reading.origin(),
                enrollment.addresses.distinct_count(),
                out.display()
            );
            ExitCode::SUCCESS
        }
        Command::Recover {
            reference,
            reading,
            record,
        } => {
            let record = EnrollmentRecord::load(&record)?;
            let reference = PufReading::from_file(&reference)?;
            let reading = PufReading::from_file(&reading)?;

            let reconciliation = pipeline.recover_with_record(&record, &reference, &reading)?;
            metrics.observe_reconciliation(&reconciliation);
            exit_code(print_reconciliation(&reconciliation))
        }
        Command::Sweep { enroll, readings } => {
            let reference = PufReading::from_file(&enroll)?;
            let enrollment = pipeline.enroll(&reference)?;
            metrics.observe_enrollment(&enrollment);

            let interrupted = Arc::new(AtomicBool::new(false));
            let flag = Arc::clone(&interrupted);
            if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
                warn!("Failed to install Ctrl-C handler: {}", e);
            }

            let mut tally = SweepTally::default();
            for path in &readings {
                if interrupted.load(Ordering::SeqCst) {
                    warn!("Interrupted, stopping sweep");
                    break;
                }

                let reading = match PufReading::from_file(path) {
                    Ok(r) => r,
                    Err(e) => {
                        warn!("Skipping reading: {}", e);
                        tally.skipped += 1;
                        continue;
                    }
                };

                let recovered = match pipeline.recover(&reading, &enrollment.addresses) {
                    Ok(key) => key,
                    Err(e) => {
                        warn!("Skipping {}: {}", path.display(), e);
                        tally.skipped += 1;
                        continue;
                    }
                };
                let reconciliation = pipeline.reconcile(&enrollment.key, &recovered)?;
                metrics.observe_reconciliation(&reconciliation);

                let verdict = tally.record(&reconciliation.outcome);
                println!(
                    "{}: Error Rate: {:.5}% ({})",
                    path.display(),
                    reconciliation.report.error_rate,
                    verdict
                );
            }

            info!(
                corrected = tally.corrected,
                rejected = tally.rejected,
                skipped = tally.skipped,
                "Sweep finished"
            );
            println!("{}", tally);
            tally.exit_code()
        }
        Command::Simulate {
            puf_size,
            flip_rate,
            reads,
            seed,
        } => {
            let seed = seed.unwrap_or_else(|| OsRng.next_u64());
            let mut puf = SyntheticPuf::new(puf_size.div_ceil(8), seed);
            info!(seed, bits = puf.size_bits(), flip_rate, "Simulating PUF");

            let enrollment = pipeline.enroll(&puf.reference())?;
            metrics.observe_enrollment(&enrollment);

            let mut all_corrected = true;
            for _ in 0..reads {
                let reading = puf.read(flip_rate);
                let recovered = pipeline.recover(&reading, &enrollment.addresses)?;
                let reconciliation = pipeline.reconcile(&enrollment.key, &recovered)?;
                metrics.observe_reconciliation(&reconciliation);

                println!("{}:", reading.origin());
                all_corrected &= print_reconciliation(&reconciliation);
            }
            exit_code(all_corrected)
        }
    };

    if config.output.print_metrics {
        print!("{}", metrics.encode()?);
    }

    Ok(code)
}

/// Per-reading results of a sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct SweepTally {
    corrected: u32,
    rejected: u32,
    /// Readings that could not be loaded or extracted.
    skipped: u32,
}

/// Overall result of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SweepStatus {
    Accepted,
    Rejected,
    Failed,
}

impl SweepTally {
    /// Counts one outcome and returns its label.
    fn record(&mut self, outcome: &ReconcileOutcome) -> &'static str {
        if outcome.is_corrected() {
            self.corrected += 1;
            "corrected"
        } else {
            self.rejected += 1;
            "rejected"
        }
    }

    /// Skipped readings take precedence over rejections.
    fn status(&self) -> SweepStatus {
        if self.skipped > 0 {
            SweepStatus::Failed
        } else if self.rejected > 0 {
            SweepStatus::Rejected
        } else {
            SweepStatus::Accepted
        }
    }

    fn exit_code(&self) -> ExitCode {
        match self.status() {
            SweepStatus::Accepted => ExitCode::SUCCESS,
            SweepStatus::Rejected => ExitCode::from(EXIT_REJECTED),
            SweepStatus::Failed => ExitCode::FAILURE,
        }
    }
}

impl std::fmt::Display for SweepTally {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Corrected: {}, rejected: {}, skipped: {}",
            self.corrected, self.rejected, self.skipped
        )
    }
}

fn exit_code(accepted: bool) -> ExitCode {
    if accepted {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_REJECTED)
    }
}

/// Prints the outcome and returns true if the key was accepted.
fn print_reconciliation(reconciliation: &Reconciliation) -> bool {
    let report = &reconciliation.report;
    println!("Error Rate: {:.5}%", report.error_rate);

    match &reconciliation.outcome {
        ReconcileOutcome::Corrected { post_report, .. } => {
            println!(
                "Key corrected with error correction. Errors: {}",
                report.error_count
            );
            println!(
                "Corrected Key Compared Error Rate: {:.5}%",
                post_report.error_rate
            );
            true
        }
        ReconcileOutcome::Rejected { reason, .. } => {
            println!("Error rate too high, key could not be corrected. ({})", reason);
            false
        }
    }
}
