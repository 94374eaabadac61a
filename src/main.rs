//! Tagfs CLI application entry point
//!
//! Opens the instance under `--root` (default `<data dir>/tagfs`), runs one
//! command against it and persists the index and configuration on exit.
//!
//! # Usage
//!
//! ```bash
//! # Create a file tagged music and live, then find it again
//! tagfs put /query/music+live/set.flac ./set.flac
//! tagfs ls /query/music&live
//! tagfs query 'music-live'
//!
//! # Manage tags
//! tagfs mkdir /tags/archive
//! tagfs tags
//!
//! # Mount (requires the `fuse` feature)
//! tagfs mount ~/tagged
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`.

use colored::Colorize;
use tagfs::{
    TagfsError,
    cli::{Cli, Commands},
    commands::{self, OutputMode},
    config,
    fs::TagFs,
};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

type Result<T> = std::result::Result<T, TagfsError>;

fn init_logging(command: &Commands) {
    let default_level = match command {
        #[cfg(feature = "fuse")]
        Commands::Mount { .. } => "tagfs=info",
        _ => "tagfs=warn",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let root = match cli.root {
        Some(root) => root,
        None => config::default_root()?,
    };
    let mode = OutputMode {
        quiet: cli.quiet,
        json: cli.json,
    };

    let mut fs = TagFs::open(&root)?;

    match cli.command {
        Commands::Ls { path, long } => commands::ls(&fs, &path, long, mode)?,
        Commands::Stat { path } => commands::stat(&fs, &path, mode)?,
        Commands::Mkdir { path } => commands::mkdir(&mut fs, &path, mode)?,
        Commands::Rmdir { path, force } => commands::rmdir(&mut fs, &path, force, mode)?,
        Commands::Put { path, source, mode: perm } => {
            commands::put(&mut fs, &path, source.as_deref(), perm, mode)?;
        }
        Commands::Cat { path } => commands::cat(&fs, &path)?,
        Commands::Write { path, offset, data } => commands::write(&mut fs, &path, offset, &data, mode)?,
        Commands::Rm { path } => commands::rm(&mut fs, &path, mode)?,
        Commands::Mv { old, new } => commands::mv(&mut fs, &old, &new, mode)?,
        Commands::Query { expr } => commands::query(&fs, &expr, mode)?,
        Commands::Tags => commands::tags(&fs, mode)?,
        #[cfg(feature = "fuse")]
        Commands::Mount { mountpoint, allow_other } => {
            // The adapter persists state itself when the kernel unmounts
            return commands::mount(fs, &mountpoint, allow_other, mode);
        }
    }

    fs.unmount()?;
    Ok(())
}

fn main() {
    let cli = Cli::parse_args();
    init_logging(&cli.command);

    if let Err(e) = run(cli) {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(e.exit_code());
    }
}
