//! omrscan - read answers from photographed bubble sheets
//!
//! `omrscan scan photo.jpg` prints the marked option for every question;
//! `omrscan serve` runs the web UI and HTTP API.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use omrscan::config::Config;
use omrscan::grading::{grade, parse_key};
use omrscan::loader::load_path;
use omrscan::overlay::render_overlay;
use omrscan::server::{self, AppState};
use omrscan::{RasterImage, ScanError, Scanner};

/// omrscan - optical mark recognition for answer sheets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "omrscan.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan a single sheet photo
    Scan {
        /// Photo of the answer sheet (JPEG or PNG)
        image: PathBuf,

        /// Number of questions on the sheet (defaults to the config value)
        #[arg(short, long)]
        questions: Option<usize>,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,

        /// Write a debug overlay PNG to this path
        #[arg(long)]
        overlay: Option<PathBuf>,

        /// Answer key to grade against, e.g. "ABCDABCD"
        #[arg(long)]
        key: Option<String>,

        /// Working width override (0 = analyze at the original size)
        #[arg(long)]
        width: Option<u32>,
    },

    /// Run the web UI and API
    Serve {
        /// Web server host
        #[arg(long)]
        host: Option<String>,

        /// Web server port
        #[arg(short, long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    match args.command {
        Command::Scan {
            image,
            questions,
            json,
            overlay,
            key,
            width,
        } => {
            let mut config = Config::load(&args.config)?;
            if let Some(width) = width {
                config.scan.working_width = width;
            }
            let questions = questions.unwrap_or(config.scan.question_count);
            let key = key
                .as_deref()
                .map(parse_key)
                .transpose()
                .context("Invalid answer key")?;

            // Analysis is CPU-bound
            tokio::task::spawn_blocking(move || {
                scan_file(&config, &image, questions, json, overlay, key)
            })
            .await
            .context("Scan task panicked")?
        }
        Command::Serve { host, port } => {
            info!("omrscan v{}", env!("CARGO_PKG_VERSION"));

            // Load or create configuration, CLI args override
            let config = Config::load_or_create(&args.config)?;
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            info!(
                "Questions: {}, working width: {}",
                config.scan.question_count, config.scan.working_width
            );

            let state = Arc::new(AppState::new(
                Arc::new(RwLock::new(config)),
                args.config.clone(),
            ));

            let addr = format!("{}:{}", host, port);
            info!("Starting web server at http://{}", addr);
            server::run_server(&addr, state).await
        }
    }
}

fn scan_file(
    config: &Config,
    path: &Path,
    questions: usize,
    json: bool,
    overlay_path: Option<PathBuf>,
    key: Option<Vec<omrscan::AnswerOption>>,
) -> Result<()> {
    let image = load_path(path, config.scan.working_width())
        .with_context(|| format!("Failed to load {:?}", path))?;
    let raster = RasterImage::from_rgba(&image)?;

    let scanner = Scanner::new(config.template.clone());
    let scan = match scanner.analyze(&raster, questions) {
        Ok(scan) => scan,
        Err(err @ ScanError::MarkersNotFound { .. }) => {
            return Err(err).context(
                "Make sure all four corner squares are inside the photo and not covered",
            );
        }
        Err(err) => return Err(err.into()),
    };

    if let Some(out) = &overlay_path {
        render_overlay(&image, &scan)
            .save(out)
            .with_context(|| format!("Failed to write overlay to {:?}", out))?;
        info!("Wrote overlay to {:?}", out);
    }

    let report = key.map(|k| grade(&scan.answers, &k));

    if json {
        let mut value = serde_json::to_value(&scan)?;
        if let Some(report) = report {
            value["grade"] = serde_json::to_value(report)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    for (question, answer) in &scan.answers {
        match answer {
            Some(option) => println!("{:>4}. {}", question, option),
            None => println!("{:>4}. -", question),
        }
    }
    println!("{}/{} answered", scan.answered_count(), questions);

    if let Some(r) = report {
        println!(
            "Score: {}/{} ({}%), {} wrong, {} blank",
            r.correct, r.total, r.percent, r.wrong, r.blank
        );
    }

    Ok(())
}
