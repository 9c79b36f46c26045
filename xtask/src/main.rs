use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const RUNTIME_BINARY: &str = "transform_runtime";
const DEFAULT_TEMPLATE: &str = "infra/s3_object_lambda_redaction.yaml";
const DIST_DIR: &str = "infra/dist";

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the object-read redaction workspace",
    long_about = "A unified CLI for CI checks, Lambda packaging and deployment\n\
                  template validation in the redaction workspace."
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
    /// Build the runtime in release mode and zip it as the Lambda `bootstrap`
    ServerlessPackage {
        /// Compilation target triple for the Lambda binary
        #[arg(long, default_value = "x86_64-unknown-linux-gnu")]
        target: String,
    },
    /// Lint the CloudFormation template with cfn-lint
    ValidateTemplate {
        /// Template to validate
        #[arg(long, env = "REDACTION_TEMPLATE", default_value = DEFAULT_TEMPLATE)]
        path: String,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting, clippy, and tests
    Check,
    /// Run check + template validation
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

fn package_serverless_lambda(target: &str) {
    if !target_installed(target) {
        eprintln!("rust target `{target}` is not installed; run `rustup target add {target}`");
        exit(1);
    }

    step("Build transform lambda binary");
    run_cargo(&[
        "build",
        "--release",
        "-p",
        "redaction_lambda",
        "--bin",
        RUNTIME_BINARY,
        "--target",
        target,
    ]);

    step("Package lambda zip artifact");
    let binary_path = Path::new("target")
        .join(target)
        .join("release")
        .join(RUNTIME_BINARY);
    let binary = fs::read(&binary_path).unwrap_or_else(|error| {
        eprintln!("cannot read '{}': {error}", binary_path.display());
        exit(1);
    });

    fs::create_dir_all(DIST_DIR).expect("failed to create dist directory");
    let zip_path = Path::new(DIST_DIR).join("transform.zip");
    write_bootstrap_zip(&binary, &zip_path).expect("failed to write lambda zip");

    eprintln!("\nPackaged {} ({} bytes)", zip_path.display(), binary.len());
}

/// True when rustup lists `target` as installed, or when rustup is missing
/// and the build is left to report the problem.
fn target_installed(target: &str) -> bool {
    match Command::new("rustup")
        .args(["target", "list", "--installed"])
        .output()
    {
        Ok(output) => String::from_utf8_lossy(&output.stdout)
            .lines()
            .any(|line| line.trim() == target),
        Err(_) => true,
    }
}

fn write_bootstrap_zip(binary: &[u8], zip_path: &Path) -> zip::result::ZipResult<()> {
    let mut zip = ZipWriter::new(fs::File::create(zip_path)?);
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file("bootstrap", options)?;
    zip.write_all(binary)?;
    zip.finish()?;
    Ok(())
}

/// Runs `cfn-lint` and exits with its status. Output is relayed as-is.
fn validate_template(path: &str) {
    if !Path::new(path).exists() {
        eprintln!("template not found at '{path}'");
        exit(1);
    }

    step("Validate CloudFormation template");
    eprintln!("+ cfn-lint {path}");
    let output = match Command::new("cfn-lint").arg(path).output() {
        Ok(value) => value,
        Err(error) => {
            eprintln!("failed to run cfn-lint ({error}); install it with `pip install cfn-lint`");
            exit(1);
        }
    };

    print!("{}", String::from_utf8_lossy(&output.stdout));
    eprint!("{}", String::from_utf8_lossy(&output.stderr));

    if output.status.success() {
        eprintln!("Template is valid.");
    } else {
        eprintln!("Template validation failed.");
        exit(output.status.code().unwrap_or(1));
    }
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

    step("Test redaction_core");
    run_cargo(&["test", "-p", "redaction_core"]);

    step("Test redaction_lambda");
    run_cargo(&["test", "-p", "redaction_lambda"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Check => ci_check(),
                CiJob::All => {
                    ci_check();
                    validate_template(DEFAULT_TEMPLATE);
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::ServerlessPackage { target } => package_serverless_lambda(&target),
        Commands::ValidateTemplate { path } => {
            validate_template(&path);
        }
    }
}
