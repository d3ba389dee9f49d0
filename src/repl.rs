//! REPL (Read-Eval-Print Loop): the interactive command surface over a
//! `Session`.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use owo_colors::OwoColorize;

use crate::error::{Error, Result};
use crate::session::Session;
use crate::value::{CompareOp, ValueType};

pub struct Repl {
    session: Session,
}

impl Repl {
    pub fn new() -> Self {
        Self {
            session: Session::new(),
        }
    }

    /// Attach to a startup target given on the command line. Failure is
    /// reported but does not prevent the REPL from starting detached.
    pub fn attach_initial(&mut self, target: &str) {
        if let Err(e) = self.cmd_attach(&[target]) {
            println!("{} {}", "[error]".bright_red(), e);
        }
    }

    pub fn run(&mut self) -> std::io::Result<()> {
        self.banner();

        let cancel = Arc::new(AtomicBool::new(false));
        {
            let cancel = cancel.clone();
            let _ = ctrlc::set_handler(move || cancel.store(true, Ordering::SeqCst));
        }

        loop {
            print!("{} ", ">".bright_yellow().bold());
            std::io::stdout().flush()?;

            let mut input = String::new();
            if std::io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();
            if input.is_empty() {
                continue;
            }

            cancel.store(false, Ordering::SeqCst);
            match self.dispatch(input, &cancel) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => println!("{} {}", "[error]".bright_red(), e),
            }
        }
        Ok(())
    }

    fn banner(&self) {
        println!("{}", "=== memscan ===".bright_yellow().bold());
        println!(
            "{} Type 'help' for available commands",
            "[info]".bright_cyan()
        );
        println!();
    }

    fn dispatch(&mut self, input: &str, cancel: &Arc<AtomicBool>) -> Result<bool> {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let ok = match parts[0] {
            "ps" => self.cmd_ps(),
            "attach" => self.cmd_attach(&parts[1..]),
            "detach" => self.cmd_detach(),
            "info" => self.cmd_info(),
            "regions" => self.cmd_regions(),
            "scan" => self.cmd_scan(&parts[1..]),
            "next" => self.cmd_next(&parts[1..]),
            "results" => self.cmd_results(&parts[1..]),
            "read" => self.cmd_read(&parts[1..]),
            "write" => self.cmd_write(&parts[1..]),
            "watch" => self.cmd_watch(&parts[1..], cancel),
            "save" => self.cmd_save(&parts[1..]),
            "load" => self.cmd_load(&parts[1..]),
            "help" | "h" => {
                self.print_help();
                Ok(())
            }
            "exit" | "quit" | "q" => return Ok(false),
            other => {
                println!("{} unknown command '{}'", "[error]".bright_red(), other);
                Ok(())
            }
        };
        ok.map(|()| true)
    }

    fn print_help(&self) {
        println!("{}", "Commands:".bright_yellow().bold());
        for (cmd, desc) in [
            ("ps", "list processes"),
            ("attach <pid|name>", "attach to a process"),
            ("detach", "release the current session"),
            ("info", "show attached process info"),
            ("regions", "list memory regions"),
            (
                "scan <type> <value> [op=exact]",
                "first scan (op: exact/greater/less)",
            ),
            (
                "next <type> <value> [op=exact]",
                "next scan (op: exact/greater/less/changed/unchanged)",
            ),
            ("results [limit=20]", "show up to limit results"),
            ("read <addr> <type> [len]", "read one value"),
            ("write <addr> <type> <value>", "write one value"),
            (
                "watch <addr> <type> [interval_ms=1000] [len]",
                "poll until ctrl-c",
            ),
            ("save <path>", "save current results"),
            ("load <path>", "load a prior result set"),
            ("help", "show this message"),
            ("exit, quit", "leave memscan"),
        ] {
            println!("  {:<42} {}", cmd.green(), desc);
        }
    }

    fn cmd_ps(&self) -> Result<()> {
        for p in crate::process_list::list()? {
            println!("{:>8}  {}", p.pid.to_string().bright_yellow(), p.name);
        }
        Ok(())
    }

    fn cmd_attach(&mut self, args: &[&str]) -> Result<()> {
        let target = args
            .first()
            .ok_or_else(|| Error::MissingArgument("pid or process name".to_string()))?;
        let (pid, name) = match target.parse::<u32>() {
            Ok(pid) => {
                let name = crate::process_list::list()?
                    .into_iter()
                    .find(|p| p.pid == pid)
                    .map(|p| p.name)
                    .unwrap_or_else(|| "?".to_string());
                (pid, name)
            }
            Err(_) => {
                let pid = crate::process_list::resolve_name(target)?;
                (pid, target.to_string())
            }
        };
        self.session.attach(pid, name.clone())?;
        println!(
            "{} attached to {} ({})",
            "[done]".bright_green(),
            pid.to_string().bright_yellow(),
            name
        );
        Ok(())
    }

    fn cmd_detach(&mut self) -> Result<()> {
        self.session.detach()?;
        println!("{} detached", "[done]".bright_green());
        Ok(())
    }

    fn cmd_info(&self) -> Result<()> {
        if !self.session.is_attached() {
            return Err(Error::NotAttached);
        }
        let regions = self.session.regions()?;
        let engine = self.session.engine()?;
        println!(
            "pid: {}  name: {}  regions: {}  results: {}  mapped: {} bytes",
            self.session.pid().unwrap(),
            self.session.name().unwrap(),
            regions.len(),
            engine.results().len(),
            regions.total_bytes()
        );
        Ok(())
    }

    fn cmd_regions(&mut self) -> Result<()> {
        self.session.refresh_regions()?;
        for r in self.session.regions()?.regions() {
            println!(
                "{} {:>10} {}",
                format!("{:#012x}", r.start).bright_blue(),
                r.size,
                r.label()
            );
        }
        Ok(())
    }

    fn cmd_scan(&mut self, args: &[&str]) -> Result<()> {
        if args.len() < 2 {
            return Err(Error::MissingArgument("type, value".to_string()));
        }
        let ty = ValueType::from_token(args[0])?;
        let (literal, op) = split_value_and_op(&args[1..]);
        let summary = self.session.first_scan(ty, op, &literal)?;
        self.print_summary(&summary);
        Ok(())
    }

    fn cmd_next(&mut self, args: &[&str]) -> Result<()> {
        if args.len() < 2 {
            return Err(Error::MissingArgument("type, value".to_string()));
        }
        let ty = ValueType::from_token(args[0])?;
        let (literal, op) = split_value_and_op(&args[1..]);
        let literal = if op.ignores_pattern() {
            None
        } else {
            Some(literal)
        };
        let summary = self.session.next_scan(ty, op, literal.as_deref())?;
        self.print_summary(&summary);
        Ok(())
    }

    fn print_summary(&self, summary: &crate::scanner::ScanSummary) {
        println!(
            "{} {} match(es)",
            "[done]".bright_green(),
            summary.count.to_string().bright_yellow()
        );
        if summary.truncated {
            println!(
                "{} {}",
                "[warn]".bright_yellow(),
                Error::ResultSetTruncated {
                    cap: crate::scanner::MAX_CANDIDATES
                }
            );
        }
    }

    fn cmd_results(&self, args: &[&str]) -> Result<()> {
        let limit: usize = args.first().and_then(|s| s.parse().ok()).unwrap_or(20);
        let engine = self.session.engine()?;
        engine.value_type().ok_or(Error::NoPriorResults)?;
        for (i, c) in engine.results().iter().take(limit).enumerate() {
            println!(
                "{:>6}  {}  {}",
                i.to_string().bright_black(),
                format!("{:#012x}", c.address).bright_blue(),
                c.rendered.bright_green()
            );
        }
        if engine.results().len() > limit {
            println!(
                "{} ... and {} more",
                "[skip]".magenta(),
                engine.results().len() - limit
            );
        }
        Ok(())
    }

    fn cmd_read(&self, args: &[&str]) -> Result<()> {
        if args.len() < 2 {
            return Err(Error::MissingArgument("address, type".to_string()));
        }
        let addr = parse_address(args[0])?;
        let ty = ValueType::from_token(args[1])?;
        let len = args.get(2).and_then(|s| s.parse().ok());
        let rendered = self.session.read_value(addr, ty, len)?;
        println!("{}", rendered.bright_green());
        Ok(())
    }

    fn cmd_write(&self, args: &[&str]) -> Result<()> {
        if args.len() < 3 {
            return Err(Error::MissingArgument("address, type, value".to_string()));
        }
        let addr = parse_address(args[0])?;
        let ty = ValueType::from_token(args[1])?;
        let literal = args[2..].join(" ");
        self.session.write_value(addr, ty, &literal)?;
        println!("{} wrote value at {:#x}", "[done]".bright_green(), addr);
        Ok(())
    }

    fn cmd_watch(&self, args: &[&str], cancel: &Arc<AtomicBool>) -> Result<()> {
        if args.len() < 2 {
            return Err(Error::MissingArgument("address, type".to_string()));
        }
        let addr = parse_address(args[0])?;
        let ty = ValueType::from_token(args[1])?;
        let interval_ms: u64 = match args.get(2) {
            Some(s) => s
                .parse()
                .map_err(|_| Error::MissingArgument("interval_ms must be an integer".to_string()))?,
            None => 1000,
        };
        let len = args.get(3).and_then(|s| s.parse().ok());
        println!("{} watching (ctrl-c to stop)", "[info]".bright_cyan());
        self.session.watch_value(
            addr,
            ty,
            len,
            Duration::from_millis(interval_ms),
            cancel,
            |old, new| {
                println!(
                    "{} {} {}",
                    old.bright_green(),
                    "→".bright_yellow(),
                    new.bright_green()
                )
            },
        )?;
        Ok(())
    }

    fn cmd_save(&self, args: &[&str]) -> Result<()> {
        let path = args
            .first()
            .ok_or_else(|| Error::MissingArgument("path".to_string()))?;
        self.session.save_results(Path::new(path))?;
        println!("{} saved to {}", "[done]".bright_green(), path);
        Ok(())
    }

    fn cmd_load(&mut self, args: &[&str]) -> Result<()> {
        let path = args
            .first()
            .ok_or_else(|| Error::MissingArgument("path".to_string()))?;
        let count = self.session.load_results(Path::new(path))?;
        println!("{} loaded {} result(s)", "[done]".bright_green(), count);
        Ok(())
    }
}

impl Default for Repl {
    fn default() -> Self {
        Self::new()
    }
}

/// Splits a `scan`/`next` tail into its value literal and trailing op
/// keyword, defaulting to `exact` when the last token isn't an op.
fn split_value_and_op(args: &[&str]) -> (String, CompareOp) {
    if let Some((&last, rest)) = args.split_last() {
        if let Ok(op) = CompareOp::from_token(last) {
            return (rest.join(" "), op);
        }
    }
    (args.join(" "), CompareOp::Eq)
}

fn parse_address(s: &str) -> Result<usize> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => usize::from_str_radix(hex, 16),
        None => usize::from_str_radix(s, 10),
    };
    parsed.map_err(|_| Error::MissingArgument(format!("'{s}' is not a valid address")))
}
