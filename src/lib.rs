//! # vsxlink
//!
//! Bridge between a home-automation host and Pioneer VSX network receivers.
//!
//! The bridge:
//! - Keeps one TCP session per configured receiver, reconnecting as needed
//! - Mirrors each receiver's state and logs every meaningful change
//! - Persists the source, preset and MCACC names the receivers report
//! - Accepts actions from an optional stdin console
//!
//! ## Architecture
//!
//! The protocol and session logic live in [`vsxlink_core`]; this crate adds
//! the tokio runtime, sockets, configuration and storage.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                        vsxlink                          │
//! │  ┌─────────────┐        ┌─────────────────────────────┐ │
//! │  │ Console     │ mpsc   │ Bridge (poll loop)          │ │
//! │  │ (stdin)     ├───────►│  - ReceiverEngine           │ │
//! │  └─────────────┘        │  - LabelStore               │ │
//! │                         └──────────────┬──────────────┘ │
//! │                                        ▼                │
//! │  ┌─────────────────────────────────────────────────────┐│
//! │  │              TokioIoProvider                        ││
//! │  │  - socket2 connect with timeout + keepalive         ││
//! │  │  - Implements vsxlink_core::IoProvider              ││
//! │  └─────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Command-Line Interface
//!
//! See [`Cli`] for all available options. Key options:
//!
//! - `-c, --config` - Configuration file
//! - `-t, --tick-ms` - Poll interval override
//! - `--console` - Read actions from standard input
//! - `-v` / `-q` - Increase or decrease verbosity

use std::path::PathBuf;

use clap::Parser;

pub mod bridge;
pub mod config;
pub mod console;
pub mod storage;
pub mod tokio_io;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Clone, Debug)]
#[command(version, about)]
pub struct Cli {
    #[clap(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::InfoLevel>,

    /// Configuration file [default: config.json in the platform config directory]
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Poll interval in milliseconds, overriding the configuration
    #[arg(short, long)]
    pub tick_ms: Option<u64>,

    /// Read actions from standard input
    #[arg(long, default_value_t = false)]
    pub console: bool,
}
