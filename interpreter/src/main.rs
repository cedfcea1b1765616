use anyhow::Result;
use clap::{Parser, ValueEnum};
use puncta_lib::Config;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[cfg(feature = "dev")]
mod debugger;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    script: PathBuf,

    /// ignored if RUST_LOG is set
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,

    /// write the log into this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// abort after this many executed instructions
    #[arg(long)]
    max_steps: Option<u64>,

    #[cfg(feature = "dev")]
    #[arg(short = 't', long)]
    show_tokens: bool,

    #[cfg(feature = "dev")]
    #[arg(short = 'p', long)]
    show_program: bool,

    #[cfg(feature = "dev")]
    #[arg(short = 'd', long)]
    debug: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

fn init_logging(level: LogLevel, log_file: Option<&Path>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log_file {
        Some(path) => builder
            .with_writer(Mutex::new(File::create(path)?))
            .with_ansi(false)
            .init(),
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level, cli.log_file.as_deref())?;
    let config = Config {
        max_steps: cli.max_steps,
    };

    if let Some(res) = run_dev(&cli, config) {
        return res;
    }

    debug!(script = %cli.script.display(), ?config, "running script");
    if let Err(e) = puncta_lib::run_file(&cli.script, config, |_| {}) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    Ok(())
}

/// handles the dev flags, returns `None` if none of them is set
#[cfg(feature = "dev")]
fn run_dev(cli: &Cli, config: Config) -> Option<Result<()>> {
    use crossterm::{self as ct, terminal};
    use puncta_lib::{compiler, lexer::Lexer, vm::Executor};

    if !(cli.show_tokens || cli.show_program || cli.debug) {
        return None;
    }
    let run = || -> Result<()> {
        let src = std::fs::read_to_string(&cli.script)?;
        if cli.show_tokens {
            for token in Lexer::new(&src) {
                let token = token?;
                println!("{:>4}| {}", token.line, token.kind);
            }
            return Ok(());
        }

        let program = compiler::compile(&src)?;
        if cli.show_program {
            for (i, inst) in program.text.iter().enumerate() {
                println!("{:>4} {}", i, inst);
            }
            println!("Labels:");
            for (name, idx) in program.sorted_labels() {
                println!("{:>4} {}", idx, name);
            }
            return Ok(());
        }

        let mut exec = Executor::new(program, config);
        exec.check_labels()?;
        let mut stdout = std::io::stdout();
        ct::execute!(stdout, terminal::EnterAlternateScreen)?;
        let res = debugger::run(&mut exec, &src, &mut stdout);
        ct::execute!(stdout, terminal::LeaveAlternateScreen)?;
        res
    };
    Some(run())
}

#[cfg(not(feature = "dev"))]
fn run_dev(_: &Cli, _: Config) -> Option<Result<()>> {
    None
}
