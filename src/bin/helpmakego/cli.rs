//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

/// Find all files a Go package depends on - suitable for Make
#[derive(Parser)]
#[command(name = "helpmakego")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the package to analyze (defaults to the current directory)
    pub path_to_package: Option<PathBuf>,

    /// Include test files in the dependency analysis
    #[arg(long)]
    pub test: bool,

    /// Output source files as a JSON array
    #[arg(long)]
    pub json: bool,

    /// Output absolute paths instead of relative paths
    #[arg(long)]
    pub abs: bool,

    /// Include module files (go.mod, go.sum) in the result
    #[arg(
        long = "mod",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub include_mod: bool,

    /// Do not run the normal process, run as a cache daemon for the given
    /// module root. Only ever set by another helpmakego invocation.
    #[arg(long = "x-daemon", hide = true)]
    pub x_daemon: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_flag_forms() {
        let cli = Cli::parse_from(["helpmakego"]);
        assert!(cli.include_mod);

        let cli = Cli::parse_from(["helpmakego", "--mod=false"]);
        assert!(!cli.include_mod);

        let cli = Cli::parse_from(["helpmakego", "--mod"]);
        assert!(cli.include_mod);
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["helpmakego"]);
        assert!(!cli.test);
        assert!(!cli.json);
        assert!(!cli.abs);
        assert!(!cli.x_daemon);
        assert!(cli.path_to_package.is_none());
    }
}
