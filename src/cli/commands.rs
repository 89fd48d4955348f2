//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - generate: run the loop for one ticker across platforms
//! - check: run the automatic checks against an existing post
//! - platforms: show resolved platform profiles

use clap::{Parser, Subcommand};
use postforge::content::Platform;
use std::path::PathBuf;

/// Postforge - turns equity research into platform-ready posts
#[derive(Parser, Debug)]
#[command(name = "postforge")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate posts for a ticker
    Generate {
        /// Ticker symbol, e.g. TSM
        ticker: String,

        /// Platforms to target (default: all)
        #[arg(short, long, value_delimiter = ',')]
        platforms: Vec<Platform>,

        /// Report file (.json or .md); located under the reports dir when omitted
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Override the configured round limit
        #[arg(short, long)]
        max_rounds: Option<u32>,

        /// Override the configured output directory
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Build and validate requests without calling any service
        #[arg(long)]
        dry_run: bool,
    },

    /// Run the automatic checks against an existing post
    Check {
        /// Post to check (.json for structured payloads)
        file: PathBuf,

        /// Platform whose policy applies
        #[arg(short, long)]
        platform: Platform,

        /// Ticker the post is about
        #[arg(short, long)]
        ticker: String,

        /// Report file; located under the reports dir when omitted
        #[arg(short, long)]
        source: Option<PathBuf>,
    },

    /// List resolved platform profiles
    Platforms,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::try_parse_from(["postforge", "generate", "TSM"]).unwrap();
        match cli.command {
            Commands::Generate {
                ticker,
                platforms,
                source,
                max_rounds,
                output,
                dry_run,
            } => {
                assert_eq!(ticker, "TSM");
                assert!(platforms.is_empty());
                assert!(source.is_none());
                assert!(max_rounds.is_none());
                assert!(output.is_none());
                assert!(!dry_run);
            }
            _ => panic!("Expected generate command"),
        }
    }

    #[test]
    fn test_generate_platform_list() {
        let cli = Cli::try_parse_from(["postforge", "generate", "AMD", "-p", "twitter,xhs", "--max-rounds", "5"]).unwrap();
        match cli.command {
            Commands::Generate {
                platforms, max_rounds, ..
            } => {
                assert_eq!(platforms, vec![Platform::Twitter, Platform::Xiaohongshu]);
                assert_eq!(max_rounds, Some(5));
            }
            _ => panic!("Expected generate command"),
        }
    }

    #[test]
    fn test_unknown_platform_rejected() {
        assert!(Cli::try_parse_from(["postforge", "generate", "AMD", "-p", "myspace"]).is_err());
    }

    #[test]
    fn test_check_command() {
        let cli = Cli::try_parse_from(["postforge", "-v", "check", "post.txt", "-p", "xueqiu", "-t", "TSM"]).unwrap();
        assert!(cli.is_verbose());
        match cli.command {
            Commands::Check {
                file,
                platform,
                ticker,
                source,
            } => {
                assert_eq!(file, PathBuf::from("post.txt"));
                assert_eq!(platform, Platform::Xueqiu);
                assert_eq!(ticker, "TSM");
                assert!(source.is_none());
            }
            _ => panic!("Expected check command"),
        }
    }

    #[test]
    fn test_config_option() {
        let cli = Cli::try_parse_from(["postforge", "platforms", "-c", "/etc/postforge.yml"]).unwrap();
        assert_eq!(cli.config.as_ref(), Some(&PathBuf::from("/etc/postforge.yml")));
        assert!(matches!(cli.command, Commands::Platforms));
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
