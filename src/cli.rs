//! Command-line interface definitions and parsing
//!
//! Each subcommand maps onto one filesystem operation of an instance opened
//! for the duration of the command, so an instance can be inspected and
//! edited without mounting it.
//!
//! # Commands
//!
//! - **ls / stat / cat**: read-only calls against any virtual path
//! - **mkdir / rmdir**: create and remove tags (`/tags/<tag>`)
//! - **put / write / rm / mv**: file calls in the query namespace
//! - **query**: evaluate an expression and print the matching files
//! - **tags**: list tags with member counts
//! - **mount**: serve the instance through FUSE (feature `fuse`)
//!
//! Global flags: `--root` picks the instance, `-q` prints bare results,
//! `--json` prints machine-readable output.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tagfs")]
#[command(about = "A tag-addressable virtual filesystem", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Instance root directory (default: <data dir>/tagfs)
    #[arg(short = 'r', long = "root", value_name = "DIR", global = true)]
    pub root: Option<PathBuf>,

    /// Suppress informational output (only print results)
    #[arg(short = 'q', long = "quiet", global = true)]
    pub quiet: bool,

    /// Print results as JSON
    #[arg(long = "json", global = true, conflicts_with = "quiet")]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// List a directory
    #[command(visible_alias = "list")]
    Ls {
        /// Virtual path, e.g. /query/music&live
        #[arg(default_value = "/")]
        path: String,

        /// Show size and modification time of each entry
        #[arg(short = 'l', long = "long")]
        long: bool,
    },

    /// Show the attributes of a path
    Stat {
        path: String,
    },

    /// Create a tag
    Mkdir {
        /// Tag path, e.g. /tags/music
        path: String,
    },

    /// Remove a tag (files keep their other tags)
    Rmdir {
        /// Tag path, e.g. /tags/music
        path: String,

        /// Skip confirmation prompt for tags that still have files
        #[arg(short = 'f', long = "force")]
        force: bool,
    },

    /// Create a file from a local file or stdin
    Put {
        /// Target path: /query/<tag>+<tag>/<filename>
        path: String,

        /// Local file to copy from (reads stdin if omitted)
        source: Option<PathBuf>,

        /// Permission bits of the new file, in octal
        #[arg(short = 'm', long = "mode", default_value = "644", value_parser = parse_mode)]
        mode: u32,
    },

    /// Print the content of a file
    Cat {
        path: String,
    },

    /// Write data into an existing file at an offset
    Write {
        path: String,

        /// Byte offset to write at
        offset: u64,

        /// Data to write
        data: String,
    },

    /// Remove a file from every tag and delete it
    Rm {
        path: String,
    },

    /// Move a file to a new tag set and/or filename
    Mv {
        /// Current path: /query/<expr>/<filename>
        old: String,

        /// New path: /query/<tag>+<tag>/<filename>
        new: String,
    },

    /// Evaluate a tag query and print matching files
    #[command(visible_alias = "q")]
    Query {
        /// Query expression, e.g. "music&live"
        expr: String,
    },

    /// List all tags with their file counts
    Tags,

    /// Mount the instance at a directory
    #[cfg(feature = "fuse")]
    Mount {
        mountpoint: PathBuf,

        /// Allow other users to access the mount
        #[arg(long = "allow-other")]
        allow_other: bool,
    },
}

impl Cli {
    /// Parse command-line arguments
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

fn parse_mode(value: &str) -> Result<u32, String> {
    u32::from_str_radix(value, 8)
        .ok()
        .filter(|mode| *mode <= 0o7777)
        .ok_or_else(|| format!("'{value}' is not an octal permission mode"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ls_default_path() {
        let cli = Cli::parse_from(["tagfs", "ls"]);
        assert_eq!(
            cli.command,
            Commands::Ls {
                path: "/".to_string(),
                long: false
            }
        );
        assert!(cli.root.is_none());
    }

    #[test]
    fn test_parse_global_flags_after_command() {
        let cli = Cli::parse_from(["tagfs", "query", "a&b", "--root", "/tmp/x", "-q"]);
        assert_eq!(cli.command, Commands::Query { expr: "a&b".to_string() });
        assert_eq!(cli.root, Some(PathBuf::from("/tmp/x")));
        assert!(cli.quiet);
    }

    #[test]
    fn test_parse_put_with_mode() {
        let cli = Cli::parse_from(["tagfs", "put", "/query/a+b/f", "local.txt", "-m", "600"]);
        if let Commands::Put { path, source, mode } = cli.command {
            assert_eq!(path, "/query/a+b/f");
            assert_eq!(source, Some(PathBuf::from("local.txt")));
            assert_eq!(mode, 0o600);
        } else {
            panic!("Expected Put command");
        }
    }

    #[test]
    fn test_parse_put_rejects_bad_mode() {
        assert!(Cli::try_parse_from(["tagfs", "put", "/query/a/f", "-m", "999"]).is_err());
        assert!(Cli::try_parse_from(["tagfs", "put", "/query/a/f", "-m", "17777"]).is_err());
    }

    #[test]
    fn test_parse_write() {
        let cli = Cli::parse_from(["tagfs", "write", "/query/a/f", "10", "hello"]);
        assert_eq!(
            cli.command,
            Commands::Write {
                path: "/query/a/f".to_string(),
                offset: 10,
                data: "hello".to_string()
            }
        );
    }

    #[test]
    fn test_json_conflicts_with_quiet() {
        assert!(Cli::try_parse_from(["tagfs", "--json", "-q", "tags"]).is_err());
    }
}
