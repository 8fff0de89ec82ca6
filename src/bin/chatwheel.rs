//! CLI binary for chatwheel.

use anyhow::{bail, Context};
use chatwheel::render::{BlockFactory, TerminalPainter};
use chatwheel::{
    history, CancelToken, ChatConfig, Conversation, OllamaClient, PacingPolicy, TickOutcome,
};
use clap::{ArgAction, Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Chatwheel: streaming chat with a local Ollama server.
#[derive(Parser)]
#[command(name = "chatwheel", version, about)]
struct Cli {
    /// Path to the JSON settings file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Ollama server URL (overrides the settings file).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat.
    Chat {
        /// Model to chat with (defaults to the last one used).
        #[arg(short, long)]
        model: Option<String>,

        /// System prompt for this and later sessions.
        #[arg(short, long)]
        system: Option<String>,

        /// Load a saved conversation before starting.
        #[arg(long, value_name = "FILE")]
        history: Option<PathBuf>,
    },

    /// List installed models.
    Models,

    /// Download a model.
    Pull {
        /// Model name, e.g. `llama3:8b`.
        name: String,
    },
}

/// Ctrl-C state shared with the signal handler.
#[derive(Clone, Default)]
struct Interrupt {
    generating: Arc<AtomicBool>,
    requested: Arc<AtomicBool>,
}

impl Interrupt {
    /// Install the handler. Ctrl-C cancels a live generation and exits
    /// otherwise.
    fn install() -> anyhow::Result<Self> {
        let interrupt = Self::default();
        let handler = interrupt.clone();
        ctrlc::set_handler(move || {
            if handler.generating.load(Ordering::SeqCst) {
                handler.requested.store(true, Ordering::SeqCst);
            } else {
                std::process::exit(130);
            }
        })
        .context("failed to install Ctrl-C handler")?;
        Ok(interrupt)
    }

    fn set_generating(&self, generating: bool) {
        self.requested.store(false, Ordering::SeqCst);
        self.generating.store(generating, Ordering::SeqCst);
    }

    fn take(&self) -> bool {
        self.requested.swap(false, Ordering::SeqCst)
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("chatwheel={level}"))),
        )
        .with_writer(io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(ChatConfig::default_path);
    let mut config = ChatConfig::load(&config_path);
    if let Some(url) = cli.url {
        config.ollama_url = url;
    }
    let client = OllamaClient::new(&config.ollama_url);

    match cli.command.unwrap_or(Command::Chat {
        model: None,
        system: None,
        history: None,
    }) {
        Command::Chat {
            model,
            system,
            history,
        } => run_chat(client, config, &config_path, model, system, history),
        Command::Models => list_models(&client),
        Command::Pull { name } => pull(&client, &name),
    }
}

fn list_models(client: &OllamaClient) -> anyhow::Result<()> {
    let models = client
        .list_models()
        .with_context(|| format!("cannot list models at {}", client.base_url()))?;
    if models.is_empty() {
        eprintln!("no models installed; try `chatwheel pull llama3`");
    }
    for model in models {
        println!("{model}");
    }
    Ok(())
}

fn pull(client: &OllamaClient, name: &str) -> anyhow::Result<()> {
    let interrupt = Interrupt::install()?;
    interrupt.set_generating(true);

    let cancel = CancelToken::new();
    let watcher = {
        let cancel = cancel.clone();
        let interrupt = interrupt.clone();
        thread::spawn(move || {
            while !cancel.is_cancelled() {
                if interrupt.take() {
                    cancel.cancel();
                }
                thread::sleep(std::time::Duration::from_millis(50));
            }
        })
    };

    let mut stderr = io::stderr();
    let result = client.pull_model(name, &cancel, &mut |progress| {
        let line = progress.fraction().map_or_else(
            || progress.status.clone(),
            |fraction| format!("{} {:>3.0}%", progress.status, fraction * 100.0),
        );
        let _ = write!(stderr, "\r\x1b[2K{line}");
        let _ = stderr.flush();
    });
    let interrupted = cancel.is_cancelled();
    cancel.cancel();
    let _ = watcher.join();
    eprintln!();

    result.with_context(|| format!("pull of {name} failed"))?;
    if interrupted {
        bail!("pull of {name} interrupted");
    }
    Ok(())
}

fn run_chat(
    client: OllamaClient,
    mut config: ChatConfig,
    config_path: &Path,
    model: Option<String>,
    system: Option<String>,
    history_file: Option<PathBuf>,
) -> anyhow::Result<()> {
    if !client.check_connection() {
        bail!("cannot reach Ollama at {}", client.base_url());
    }

    let model = match model.or_else(|| config.last_model().map(str::to_string)) {
        Some(model) => model,
        None => client
            .list_models()?
            .into_iter()
            .next()
            .context("no models installed; try `chatwheel pull llama3`")?,
    };
    if let Some(system) = system {
        config.system_prompt = system;
    }
    let policy = PacingPolicy::from_config(&config.pacing)?;

    let mut conversation = Conversation::new(Arc::new(client), BlockFactory::new(), policy);
    conversation.set_model(model.clone());
    conversation.set_system_prompt(config.system_prompt());
    if let Some(path) = history_file {
        conversation.load_history(history::load(&path)?)?;
        eprintln!("loaded {} turns from {}", conversation.history().len(), path.display());
    }

    config.last_model.clone_from(&model);
    if let Err(err) = config.save(config_path) {
        eprintln!("warning: could not save settings: {err}");
    }

    let interrupt = Interrupt::install()?;
    eprintln!("chatting with {model}; /save FILE, /load FILE, /clear, /quit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut line = String::new();
    loop {
        print!("> ");
        stdout.flush()?;
        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();

        if let Some(command) = input.strip_prefix('/') {
            match run_command(&mut conversation, command) {
                Ok(true) => continue,
                Ok(false) => break,
                Err(err) => {
                    eprintln!("error: {err}");
                    continue;
                }
            }
        }

        if let Err(err) = conversation.send(input) {
            eprintln!("error: {err}");
            continue;
        }
        interrupt.set_generating(true);
        let outcome = stream_response(&mut conversation, &interrupt, &mut stdout);
        interrupt.set_generating(false);
        if let TickOutcome::Failed { message, .. } = outcome? {
            eprintln!("error: {message}");
        }
    }
    Ok(())
}

/// Handle a slash command. Returns `false` to quit.
fn run_command(
    conversation: &mut Conversation<BlockFactory>,
    command: &str,
) -> anyhow::Result<bool> {
    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(name, arg)| (name, arg.trim()));
    match name {
        "save" if !arg.is_empty() => {
            history::save(Path::new(arg), conversation.history())?;
            eprintln!("saved {} turns", conversation.history().len());
        }
        "load" if !arg.is_empty() => {
            let turns = history::load(Path::new(arg))?;
            conversation.load_history(turns)?;
            for turn in conversation.history() {
                println!("{}: {}", turn.role, turn.content);
            }
        }
        "clear" => conversation.clear(),
        "quit" | "exit" => return Ok(false),
        _ => eprintln!("unknown command: /{command}"),
    }
    Ok(true)
}

/// Tick the live session to its end, painting as it goes.
fn stream_response(
    conversation: &mut Conversation<BlockFactory>,
    interrupt: &Interrupt,
    out: &mut io::Stdout,
) -> anyhow::Result<TickOutcome> {
    let width = crossterm::terminal::size().map_or(80, |(w, _)| w);
    let mut painter = TerminalPainter::new(width);

    loop {
        if interrupt.take() && conversation.cancel() {
            debug!("cancel requested from terminal");
        }
        let outcome = conversation.tick();
        if let TickOutcome::Advanced { path, .. } = &outcome {
            painter.paint(out, conversation.live_views(), *path)?;
        }
        match outcome.next_delay() {
            Some(delay) => thread::sleep(delay),
            None => {
                painter.finish(out)?;
                return Ok(outcome);
            }
        }
    }
}
