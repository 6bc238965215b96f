//! pubstream CLI
//!
//! Command-line tools for exercising streaming sessions.
//!
//! # Commands
//!
//! - `demo` - Run a complete session over an in-process bus and print the frames
//! - `subject` - Generate reply subjects and correlation tokens
//! - `decode` - Check one raw frame against a receiver's expectations

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// pubstream command-line tools.
#[derive(Parser)]
#[command(name = "pubstream")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a complete session over an in-process bus
    Demo {
        /// Number of data frames the handler publishes
        #[arg(short = 'n', long, default_value = "5")]
        frames: usize,

        /// Request body sent to the handler
        #[arg(short, long, default_value = "hello")]
        payload: String,

        /// Subject the handler listens on
        #[arg(short, long, default_value = "demo.items")]
        subject: String,

        /// Skip the readiness confirmation leg (early frames may be lost)
        #[arg(long)]
        no_ready: bool,

        /// Session deadline in milliseconds
        #[arg(short, long, default_value = "5000")]
        timeout_ms: u64,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Generate reply subjects or correlation tokens
    Subject {
        /// Generator (fast, crypto, uid)
        #[arg(short, long, default_value = "fast")]
        strategy: String,

        /// Prefix for generated subjects
        #[arg(short, long, default_value = "_INBOX")]
        prefix: String,

        /// Number of values to generate
        #[arg(short = 'n', long, default_value = "1")]
        count: usize,
    },

    /// Check a raw frame against a receiver's expectations
    Decode {
        /// Session correlation token the receiver expects
        #[arg(short, long)]
        uid: String,

        /// Sequence the receiver expects next
        #[arg(short, long, default_value = "0")]
        expected: u64,

        /// Header as NAME=VALUE (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Frame body
        #[arg(short, long, default_value = "")]
        body: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Demo {
            frames,
            payload,
            subject,
            no_ready,
            timeout_ms,
            format,
        } => {
            let options = commands::demo::DemoOptions {
                frames,
                payload,
                subject,
                readiness: !no_ready,
                timeout_ms,
            };
            commands::demo::run(&options, &format).await?;
        }
        Commands::Subject {
            strategy,
            prefix,
            count,
        } => {
            commands::subject::run(&strategy, &prefix, count)?;
        }
        Commands::Decode {
            uid,
            expected,
            headers,
            body,
        } => {
            commands::decode::run(&uid, expected, &headers, &body)?;
        }
        Commands::Version => {
            println!("pubstream CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("pubstream Core v{}", pubstream_core::VERSION);
        }
    }

    Ok(())
}
