#[cfg(not(target_os = "macos"))]
compile_error!("memscan only supports macOS targets.");

use clap::Parser;
use memscan::cli::Cli;
use memscan::repl::Repl;

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Info,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new().filter_level(level).init();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    let mut repl = Repl::new();
    if let Some(target) = cli.target {
        repl.attach_initial(&target);
    }

    if let Err(e) = repl.run() {
        log::error!("REPL loop aborted: {e}");
        std::process::exit(1);
    }
}
