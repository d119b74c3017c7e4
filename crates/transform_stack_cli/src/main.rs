//! Synthesis entry point: reads the target environment, renders the
//! deployment template, and writes it to a file or stdout. The template is
//! the only artifact; provisioning itself happens in an external tool.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::exit;

use clap::Parser;
use tracing::{error, info};
use transform_stack_core::{
    render_template, template_fingerprint, Environment, StackDefinition, Template, ValidationError,
};

#[derive(Parser)]
#[command(
    name = "transform-stack",
    about = "Synthesize the deployment template for the scheduled transform job"
)]
struct Cli {
    /// Target account id (12 digits).
    #[arg(long, env = "DEPLOY_ACCOUNT_ID")]
    account_id: String,
    /// Target region, e.g. eu-central-1.
    #[arg(long, env = "DEPLOY_REGION")]
    region: String,
    /// Write the rendered template here instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

fn synthesize_template(account_id: &str, region: &str) -> Result<Template, ValidationError> {
    let environment = Environment::new(account_id, region)?;
    let graph = StackDefinition::default().synthesize(&environment)?;
    render_template(&graph)
}

fn write_template(template: &Template, output: Option<&Path>) -> io::Result<()> {
    match output {
        Some(path) => {
            let file = File::create(path)?;
            serde_json::to_writer_pretty(file, template)?;
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            serde_json::to_writer_pretty(&mut handle, template)?;
            handle.write_all(b"\n")
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let template = match synthesize_template(&cli.account_id, &cli.region) {
        Ok(template) => template,
        Err(validation_error) => {
            error!(%validation_error, "synthesis failed");
            exit(1);
        }
    };

    info!(
        fingerprint = %template_fingerprint(&template),
        resources = template.resources.len(),
        "template synthesized"
    );

    if let Err(io_error) = write_template(&template, cli.output.as_deref()) {
        error!(%io_error, "failed to write template");
        exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_for_valid_environment() {
        let template = synthesize_template("123456789012", "eu-central-1")
            .expect("synthesis should pass");
        assert_eq!(template.resources.len(), 10);
    }

    #[test]
    fn rejects_invalid_account_id() {
        let error = synthesize_template("not-an-account", "eu-central-1")
            .expect_err("synthesis should fail");
        assert!(error.message().contains("12 digits"));
    }

    #[test]
    fn rejects_invalid_region() {
        let error =
            synthesize_template("123456789012", "Berlin").expect_err("synthesis should fail");
        assert!(error.message().contains("region"));
    }

    #[test]
    fn written_template_round_trips_from_disk() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let path = dir.path().join("template.json");

        let template = synthesize_template("123456789012", "eu-central-1")
            .expect("synthesis should pass");
        write_template(&template, Some(&path)).expect("write should pass");

        let raw = std::fs::read_to_string(&path).expect("template should be readable");
        let reparsed: Template = serde_json::from_str(&raw).expect("template should parse");
        assert_eq!(
            template_fingerprint(&reparsed),
            template_fingerprint(&template)
        );
    }
}
