use clap::Parser;
use std::path::PathBuf;

/// Inserts a missing local binding into selected functions and threads it
/// through their formatting calls.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The source file to patch in place
    #[arg(required_unless_present = "print_config")]
    pub file: Option<PathBuf>,

    /// TOML recipe to use instead of the XDG config or the built-in recipe
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print a diff instead of writing the file
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Fail when a target function or call pattern matched nothing
    #[arg(long)]
    pub strict: bool,

    /// Print the effective recipe as TOML and exit
    #[arg(long)]
    pub print_config: bool,
}
