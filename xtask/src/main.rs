use std::fs;
use std::path::{Path, PathBuf};
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the transform stack workspace",
    long_about = "A unified CLI for running CI checks and producing the\n\
                  deployment template artifact consumed by the provisioning tool."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Synthesize the deployment template into the artifact directory
    Synth {
        /// Target account id (12 digits)
        #[arg(long, env = "DEPLOY_ACCOUNT_ID")]
        account_id: String,
        /// Target region, e.g. eu-central-1
        #[arg(long, env = "DEPLOY_REGION")]
        region: String,
        /// Artifact directory
        #[arg(long, default_value = "dist")]
        out_dir: PathBuf,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Synthesize against a fixture environment to catch rendering drift
    Smoke,
    /// Run check + smoke
    All,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn synthesize_template(account_id: &str, region: &str, out_dir: &Path) {
    step("Synthesize deployment template");
    fs::create_dir_all(out_dir).expect("failed to create artifact directory");
    let output = out_dir.join("template.json");
    let output_arg = output.to_string_lossy().into_owned();

    run_cargo(&[
        "run",
        "-p",
        "transform_stack_cli",
        "--",
        "--account-id",
        account_id,
        "--region",
        region,
        "--output",
        &output_arg,
    ]);

    eprintln!("\nPackaged artifact:\n- {}", output.display());
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_check() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);

    step("Test transform_stack_core");
    run_cargo(&["test", "-p", "transform_stack_core"]);

    step("Test transform_stack_cli");
    run_cargo(&["test", "-p", "transform_stack_cli"]);
}

fn ci_smoke() {
    step("Synthesize against fixture environment");
    run_cargo(&[
        "run",
        "-p",
        "transform_stack_cli",
        "--",
        "--account-id",
        "123456789012",
        "--region",
        "eu-central-1",
    ]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::Smoke => ci_smoke(),
                CiJob::All => {
                    ci_check();
                    ci_smoke();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::Synth {
            account_id,
            region,
            out_dir,
        } => {
            synthesize_template(&account_id, &region, &out_dir);
        }
    }
}
