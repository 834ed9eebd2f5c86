use clap::Parser as ClapParser;
use docweave::cli::{BatchOptions, CliError, JobOutcome, execute_batch};
use docweave::config::ReportConfig;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "docweave")]
#[command(about = "Docweave - Fill document templates from workbook data using inline tags")]
#[command(version)]
struct Cli {
    /// Template document (JSON)
    #[arg(short, long)]
    template: PathBuf,

    /// Workbooks to fill the template from, one report each
    #[arg(short = 'c', long = "calc", num_args = 1.., required = true)]
    workbooks: Vec<PathBuf>,

    /// Output paths, one per workbook (default: next to each workbook)
    #[arg(short, long, num_args = 1..)]
    output: Vec<PathBuf>,

    /// Worker threads (0 runs the reports one after another)
    #[arg(short = 'm', long, default_value_t = 0)]
    threads: usize,

    /// Report configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Reject strings in numeric expressions
    #[arg(long)]
    strict_strings: bool,
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    match run(cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("docweave=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Returns whether every report was produced.
fn run(cli: Cli) -> Result<bool, CliError> {
    let started = Instant::now();

    let mut config = match &cli.config {
        Some(path) => ReportConfig::load(path)?,
        None => ReportConfig::default(),
    };
    if cli.strict_strings {
        config.strict_strings = true;
    }

    let options = BatchOptions {
        template: cli.template,
        workbooks: cli.workbooks,
        outputs: cli.output,
        threads: cli.threads,
    };
    let outcomes = execute_batch(&options, &config)?;

    let single = outcomes.len() == 1;
    for outcome in &outcomes {
        print_outcome(outcome, single);
    }
    println!("Total time: {:.2}s", started.elapsed().as_secs_f64());

    Ok(outcomes.iter().all(JobOutcome::is_ok))
}

fn print_outcome(outcome: &JobOutcome, single: bool) {
    let workbook = outcome.job.workbook.display();
    match &outcome.result {
        Ok(summary) => {
            let failed = match summary.failed {
                0 => String::new(),
                n => format!(" ({n} tags failed)"),
            };
            println!(
                "Report for {workbook} saved to {} in {:.2}s{failed}",
                outcome.job.output.display(),
                outcome.elapsed.as_secs_f64()
            );
        }
        Err(e) if single => println!("Report for {workbook} failed: {e}"),
        Err(_) => println!("Report for {workbook} failed"),
    }
}
