//! Headless shell over `tasktimer_core`.
//!
//! # Responsibility
//! - Expose task list/create/delete, a foreground timer view and the manual
//!   daily reset as subcommands.
//! - Render core events as plain terminal lines.

use clap::{Parser, Subcommand};
use log::info;
use std::error::Error;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;
use tasktimer_core::{
    format_hms, init_logging_from_config, NoopObserver, SessionState, StopReason, TaskDraft,
    TaskId, TaskTimer, TimerConfig, TimerEvent, TimerObserver,
};

type CliResult<T> = Result<T, Box<dyn Error>>;

#[derive(Parser)]
#[command(name = "tasktimer", version, about = "Per-task time tracking with daily reset")]
struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every task with its accumulated time
    List,
    /// Create a task
    Add {
        name: String,
        /// Minimum time in minutes
        #[arg(long, default_value = "")]
        min: String,
        /// Maximum time in minutes
        #[arg(long, default_value = "")]
        max: String,
        /// Track time without thresholds
        #[arg(long)]
        no_timer: bool,
    },
    /// Delete a task by id
    Remove { id: TaskId },
    /// Run the timer for a task in the foreground
    Run {
        /// Task name; the first match is used
        name: String,
    },
    /// Zero every task's accumulated time now
    Reset,
}

enum Input {
    Event(TimerEvent),
    Line(String),
    Closed,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> CliResult<()> {
    let config = match &cli.config {
        Some(path) => TimerConfig::load_from(path)?,
        None => TimerConfig::load()?,
    };
    init_logging_from_config(&config)?;
    info!(
        "event=cli_start module=cli status=ok version={}",
        tasktimer_core::core_version()
    );

    match cli.command {
        Commands::List => {
            let timer = TaskTimer::open(&config, Arc::new(NoopObserver))?;
            print_tasks(&timer);
        }
        Commands::Add {
            name,
            min,
            max,
            no_timer,
        } => {
            let timer = TaskTimer::open(&config, Arc::new(NoopObserver))?;
            let draft = TaskDraft::from_form(&name, &min, &max, no_timer)?;
            let task = timer.add_task(&draft)?;
            println!("[{}] {}", task.id, task.display_line());
        }
        Commands::Remove { id } => {
            let timer = TaskTimer::open(&config, Arc::new(NoopObserver))?;
            let task = timer.remove_task(id)?;
            println!("removed [{}] {}", task.id, task.name);
        }
        Commands::Run { name } => run_timer(&config, &name)?,
        Commands::Reset => {
            let timer = TaskTimer::open(&config, Arc::new(NoopObserver))?;
            let count = timer.reset_now()?;
            println!("reset {count} task(s)");
        }
    }
    Ok(())
}

fn print_tasks(timer: &TaskTimer<tasktimer_core::SqliteTaskStore>) {
    let tasks = timer.list_tasks();
    if tasks.is_empty() {
        println!("no tasks");
        return;
    }
    for task in tasks {
        println!("[{}] {}", task.id, task.display_line());
    }
}

fn run_timer(config: &TimerConfig, name: &str) -> CliResult<()> {
    let (tx, rx) = mpsc::channel::<Input>();
    let events = tx.clone();
    let observer: Arc<dyn TimerObserver> = Arc::new(move |event: &TimerEvent| {
        let _ = events.send(Input::Event(event.clone()));
    });

    let timer = TaskTimer::open(config, observer)?;
    timer.start_session(name)?;
    spawn_stdin_reader(tx)?;
    println!("commands: p = pause/resume, + = add time, - = remove time, q = stop");

    event_loop(&timer, &rx)?;
    if timer.session_state() != SessionState::Idle {
        timer.stop_session()?;
    }
    Ok(())
}

fn spawn_stdin_reader(tx: Sender<Input>) -> CliResult<()> {
    thread::Builder::new()
        .name("tasktimer-stdin".to_string())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                match line {
                    Ok(line) => {
                        if tx.send(Input::Line(line)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }
            let _ = tx.send(Input::Closed);
        })?;
    Ok(())
}

fn event_loop(
    timer: &TaskTimer<tasktimer_core::SqliteTaskStore>,
    rx: &Receiver<Input>,
) -> CliResult<()> {
    while let Ok(input) = rx.recv() {
        match input {
            Input::Event(event) => {
                if render(&event) {
                    return Ok(());
                }
            }
            Input::Line(line) => {
                let outcome = match line.trim() {
                    "p" => timer.toggle_pause().map(Some),
                    "+" => timer.add_time().map(Some),
                    "-" => timer.remove_time().map(Some),
                    "q" => timer.stop_session().map(Some),
                    "" => Ok(None),
                    other => {
                        println!("unknown command `{other}`");
                        Ok(None)
                    }
                };
                if let Err(err) = outcome {
                    println!("error: {err}");
                }
            }
            Input::Closed => return Ok(()),
        }
    }
    Ok(())
}

/// Prints one event; returns `true` once the session has stopped.
fn render(event: &TimerEvent) -> bool {
    match event {
        TimerEvent::SessionStarted { display, .. } => println!("started at {display}"),
        TimerEvent::Tick { display, .. } => println!("{display}"),
        TimerEvent::PauseChanged { paused, .. } => {
            println!("{}", if *paused { "paused" } else { "resumed" })
        }
        TimerEvent::MinimumReached { name, .. } => {
            println!("Minimum time reached for {name}. Task completed!")
        }
        TimerEvent::MaximumReached { name, .. } => {
            println!("Maximum time reached for {name}. Time's up!")
        }
        TimerEvent::SessionStopped {
            elapsed, reason, ..
        } => {
            let why = match reason {
                StopReason::User => "stopped",
                StopReason::MaximumReached => "finished",
                StopReason::TaskRemoved => "task removed",
            };
            println!("{why} at {}", format_hms(*elapsed));
            return true;
        }
        TimerEvent::DailyResetCompleted { task_count } => {
            println!("daily reset: {task_count} task(s) zeroed")
        }
    }
    false
}
