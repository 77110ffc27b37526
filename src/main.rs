// Command-line front end: streams a design-to-code generation from the HTTP
// backend into a local directory, continuing it until every file exists.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kodegen_figma_codegen::transport::http::DEFAULT_API_BASE_URL;
use kodegen_figma_codegen::{
    CodegenError, ContinuationController, FsMaterializer, GenerationSession, HttpBackend,
    Manifest, SessionOptions, VERSION, WireFormat, WireSchema,
};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "kodegen-figma-codegen")]
#[command(version = VERSION)]
#[command(about = "Stream generated code from a design-to-code backend into files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Stream a generation and write its files
    Generate {
        /// Backend generation identifier
        generation_id: String,

        /// Base URL of the generation service
        #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_API_BASE_URL)]
        api_url: String,

        /// Directory to write files under
        #[arg(long, default_value = ".")]
        out: PathBuf,

        /// JSON file listing the expected files (`{"remainingFiles": [...]}`)
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Continuation rounds after the initial request
        #[arg(long, default_value_t = 3)]
        max_attempts: u32,

        /// Transport retries per round
        #[arg(long, default_value_t = 5)]
        max_retries: u32,

        /// Delay between transport retries, in milliseconds
        #[arg(long, default_value_t = 1000)]
        retry_delay_ms: u64,

        /// Treat the stream as stalled after this many seconds without data
        #[arg(long)]
        idle_timeout_secs: Option<u64>,

        /// Read file names from the legacy `aFileName` key
        #[arg(long)]
        legacy_keys: bool,

        /// Wire format: auto, json or tagged
        #[arg(long, default_value = "auto")]
        format: WireFormat,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Generate {
            generation_id,
            api_url,
            out,
            manifest,
            max_attempts,
            max_retries,
            retry_delay_ms,
            idle_timeout_secs,
            legacy_keys,
            format,
        } => {
            let mut builder = SessionOptions::builder()
                .output_root(&out)
                .wire_format(format)
                .max_attempts(max_attempts)
                .max_retries(max_retries)
                .retry_delay(Duration::from_millis(retry_delay_ms));
            if legacy_keys {
                builder = builder.schema(WireSchema::legacy());
            }
            if let Some(secs) = idle_timeout_secs {
                builder = builder.idle_timeout(Duration::from_secs(secs));
            }
            let options = builder.build()?;

            let cancel = CancellationToken::new();
            let mut session = GenerationSession::new(generation_id, options)
                .with_cancellation(cancel.clone());
            if let Some(path) = manifest {
                let manifest = Manifest::load(&path)
                    .await
                    .with_context(|| format!("Failed to load manifest {}", path.display()))?;
                session = session.with_manifest(&manifest)?;
            }

            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    log::warn!("Interrupted, stopping generation");
                    cancel.cancel();
                }
            });

            let backend = HttpBackend::new(api_url)?;
            let mut controller = ContinuationController::new(backend, FsMaterializer::new(out));

            match controller.run(&mut session).await {
                Ok(report) => {
                    println!("{report}");
                    for file in &report.completed_files {
                        println!("  {file}");
                    }
                    Ok(())
                }
                Err(e) => {
                    let written = session.completed_files().len();
                    let outstanding = match &e {
                        CodegenError::MaxAttemptsExceeded { outstanding, .. } => outstanding.len(),
                        _ => session.outstanding_files().len(),
                    };
                    eprintln!("{written} files written, {outstanding} outstanding");
                    Err(e.into())
                }
            }
        }
    }
}
