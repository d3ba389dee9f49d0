use clap::{builder::styling::AnsiColor, Parser};

/// memscan - inspect and edit another process's virtual memory on macOS.
#[derive(Parser, Debug)]
#[command(
    name = "memscan",
    bin_name = "memscan",
    about = "An interactive macOS memory scanner",
    version,
    styles = clap::builder::Styles::styled()
        .header(AnsiColor::BrightYellow.on_default())
        .usage(AnsiColor::BrightYellow.on_default())
        .literal(AnsiColor::BrightGreen.on_default())
        .placeholder(AnsiColor::BrightCyan.on_default())
)]
pub struct Cli {
    /// Attach to this pid (or process name) on startup
    pub target: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}
