use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::{Args, Parser, Subcommand};

use tablemig::app::batch::BatchReport;
use tablemig::app::command::{self, PassKind, RunOverrides};
use tablemig::infra::interrupt;

#[derive(Parser)]
#[command(name = "tablemig", version)]
#[command(about = "Migrate legacy <a-table-column> markup to column arrays", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Print the batch report as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rewrite tables declared with column children into :columns arrays
    Convert(RunArgs),
    /// Remove dangling icon import blocks
    CleanImports(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Directory searched recursively for documents
    root: PathBuf,

    /// Report what would change without writing
    #[arg(long)]
    dry_run: bool,

    /// Glob selecting documents relative to the root
    #[arg(long)]
    pattern: Option<String>,

    /// Worker threads (0 = one per core)
    #[arg(short, long)]
    jobs: Option<usize>,
}

impl RunArgs {
    fn overrides(&self) -> RunOverrides {
        RunOverrides {
            dry_run: self.dry_run,
            pattern: self.pattern.clone(),
            jobs: self.jobs,
        }
    }
}

fn print_report(report: &BatchReport, kind: PassKind) {
    let verb = match kind {
        PassKind::Convert => "Converted",
        PassKind::CleanImports => "Cleaned",
    };
    for document in report.changed() {
        match kind {
            PassKind::Convert => println!(
                "{verb} {} table(s) in: {}",
                document.rewrites,
                document.path.display()
            ),
            PassKind::CleanImports => println!("{verb}: {}", document.path.display()),
        }
    }
    for document in report.failed() {
        eprintln!(
            "Failed: {}: {}",
            document.path.display(),
            document.error.as_deref().unwrap_or("unknown error")
        );
    }
    let suffix = if report.dry_run { " (dry run)" } else { "" };
    println!("\n{verb} {} files{suffix}.", report.changed().count());
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    tablemig::init(cli.verbose);

    let (kind, args) = match &cli.command {
        Commands::Convert(args) => (PassKind::Convert, args),
        Commands::CleanImports(args) => (PassKind::CleanImports, args),
    };
    let cancel = interrupt::cancel_on_ctrl_c();
    let report = command::execute_with_cancel(kind, &args.root, args.overrides(), cancel)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report, kind);
    }

    let skipped = report.skipped().count();
    if skipped > 0 {
        bail!("interrupted, {skipped} document(s) not processed");
    }
    let failed = report.failed().count();
    if failed > 0 {
        bail!("{failed} document(s) could not be processed");
    }
    Ok(())
}
