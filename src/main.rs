use anyhow::{Context, Result};
use clap::Parser;
use codemend::config::Config;
use codemend::executor::SandboxedExecutor;
use codemend::language::LanguageVariant;
use codemend::oracle::OpenRouterOracle;
use codemend::repair::{verify_and_repair, RepairConfig};
use std::fs;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(
    name = "codemend",
    about = "Verify AI-generated code by running it, and repair it from the diagnostics",
    version
)]
struct Args {
    /// Source file to verify, or '-' to read from stdin
    file: PathBuf,

    /// What the code is supposed to do (embedded in repair prompts)
    #[arg(short, long, default_value = "make this code run correctly")]
    intent: String,

    /// Language hint (python, javascript, java, cpp); inferred from the
    /// file extension or code content when omitted
    #[arg(short, long)]
    lang: Option<String>,

    /// Maximum execution attempts per session
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Wall-clock budget for the whole session, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write the repaired code back to the input file
    #[arg(short, long)]
    write: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let from_stdin = args.file.as_os_str() == "-";
    let code = if from_stdin {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read code from stdin")?;
        buf
    } else {
        fs::read_to_string(&args.file)
            .with_context(|| format!("failed to read {}", args.file.display()))?
    };

    // An explicit --lang wins; otherwise a recognized file extension is as
    // good as an editor tag. Content heuristics are the last resort.
    let hint = args.lang.clone().or_else(|| {
        if from_stdin {
            return None;
        }
        let ext = args.file.extension()?.to_str()?;
        match LanguageVariant::from_extension(ext) {
            LanguageVariant::Unknown => None,
            variant => Some(variant.name().to_string()),
        }
    });

    let config = Config::load();
    let oracle = OpenRouterOracle::from_config(&config)?;

    let repair_config = RepairConfig {
        max_attempts: args
            .max_attempts
            .or(config.max_attempts)
            .unwrap_or(codemend::repair::DEFAULT_MAX_ATTEMPTS),
        timeout: Duration::from_secs(
            args.timeout_secs
                .or(config.timeout_secs)
                .unwrap_or(codemend::repair::DEFAULT_TIMEOUT.as_secs()),
        ),
    };
    // A single command can never outlive the session budget, so the budget
    // also bounds any run the timeout abandons.
    let executor = Arc::new(SandboxedExecutor::with_command_timeout(
        repair_config.timeout,
    )?);

    eprintln!("  Verifying with model {}...", oracle.model());
    let outcome = verify_and_repair(
        &args.intent,
        &code,
        hint.as_deref(),
        &oracle,
        executor,
        &repair_config,
    )
    .await;

    if outcome.success {
        eprintln!("  Verified: the code runs.");
        if !outcome.output.is_empty() {
            print!("{}", outcome.output);
        }
    } else {
        eprintln!("  Could not verify the code within the attempt and time budget.");
    }

    if args.write && !from_stdin {
        fs::write(&args.file, &outcome.code)
            .with_context(|| format!("failed to write {}", args.file.display()))?;
        eprintln!("  Wrote {} back to {}.",
            if outcome.success { "repaired code" } else { "last candidate" },
            args.file.display()
        );
    } else if !outcome.success || outcome.code != code.trim() {
        // Surface the final candidate so the caller always gets some code
        // back, repaired or original.
        println!("{}", outcome.code);
    }

    if !outcome.success {
        std::process::exit(1);
    }
    Ok(())
}
