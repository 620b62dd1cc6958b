mod builtins;
mod cli;
mod config;
mod error;
mod parse;
mod process_exec;
mod prompt;
mod shell;
mod snippet;
mod store;
mod template;

use std::{io, process::ExitCode};

use anyhow::Result;
use nu_ansi_term::Color;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::{
    cli::Invocation,
    config::Config,
    error::ExecError,
    prompt::TerminalPrompter,
    store::JsonFileStore,
};

const LOG_ENV: &str = "ZEI_LOG";

fn init_logging(cfg: &Config) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(cfg.log.as_deref().unwrap_or("warn")))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

async fn dispatch(invocation: Invocation, cfg: &Config) -> Result<()> {
    // [1] The store is opened once and passed down explicitly
    let store = JsonFileStore::new(&cfg.store);
    tracing::debug!(path = %store.path().display(), "using snippet store");

    let mut prompter = TerminalPrompter::new();
    let mut out = io::stdout();

    match invocation {
        Invocation::List => builtins::list(&store, &mut out, cfg.color).await,
        Invocation::Show(id) => builtins::show(&store, &id, &mut out, cfg.color).await,
        Invocation::Add => builtins::add(&store, &mut prompter, &mut out).await,
        Invocation::Update(id) => builtins::update(&store, &id, &mut prompter, &mut out).await,
        Invocation::Remove(ids) => builtins::remove(&store, &ids, &mut prompter, &mut out).await,
        Invocation::Run(id) => {
            let tokens = shell::load(&store, &id, &mut prompter).await?;

            // [2] Once prompting is over, Ctrl-C cancels the snippet instead of killing zei
            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });
            shell::run(&tokens, &cancel).await
        }
        Invocation::Help => {
            print!("{}", builtins::help());
            Ok(())
        }
        Invocation::Version => {
            println!("zei {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<ExecError>() {
        Some(ExecError::ProcessFailed { code: Some(code) }) => {
            ExitCode::from(u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1))
        }
        Some(ExecError::Cancelled) => ExitCode::from(130),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = config::init();
    init_logging(&cfg);
    for problem in &cfg.problems {
        tracing::warn!("config: {problem}");
    }

    let result = match cli::parse_args(std::env::args().skip(1)) {
        Ok(invocation) => dispatch(invocation, &cfg).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = format!("zei: {e:#}");
            if cfg.color {
                eprintln!("{}", Color::Red.paint(message));
            } else {
                eprintln!("{message}");
            }
            exit_code(&e)
        }
    }
}
