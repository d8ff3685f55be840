mod cli;

use clap::{CommandFactory, Parser};
use cli::{Cli, Command, collect_overrides};
use std::cell::RefCell;
use std::io::{self, BufRead};
use std::sync::Arc;
use std::time::Duration;
use tabled::settings::Style;
use tabled::{Table, Tabled};
use taskbell_core::alarm::{Alarm, alarm_from_config};
use taskbell_core::clock::SystemClock;
use taskbell_core::config::{self, Config, Palette};
use taskbell_core::error::AppError;
use taskbell_core::model::Task;
use taskbell_core::notify::notifier_from_env;
use taskbell_core::prompt::{Answer, Prompt, QueuedPrompt, StdinPrompt};
use taskbell_core::reminder::ReminderPoller;
use taskbell_core::render::{RenderedList, render};
use taskbell_core::task_api;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "taskbell=warn,taskbell_cli=warn,taskbell_core=warn";
const ALARM_WAIT: Duration = Duration::from_millis(200);

/// Alarms and stop questions owned by one interactive session. Answers
/// arrive as REPL lines, since the REPL owns stdin.
#[derive(Default)]
struct ReplSession {
    prompt: QueuedPrompt,
    alarms: RefCell<Vec<Arc<dyn Alarm>>>,
}

impl ReplSession {
    fn silence(&self) {
        self.prompt.clear();
        for alarm in self.alarms.borrow_mut().drain(..) {
            alarm.stop();
        }
    }
}

#[derive(Tabled)]
struct TaskRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "✔")]
    done: String,
    #[tabled(rename = "Task")]
    task: String,
}

fn print_list_plain(view: &RenderedList, palette: &Palette) {
    if view.rows.is_empty() {
        println!("No tasks.");
    } else {
        let rows = view.rows.iter().map(|row| {
            let short_id = row.id.get(..8).unwrap_or(&row.id).to_string();
            if row.completed {
                TaskRow {
                    id: palette.mutedize(&short_id),
                    done: palette.mutedize("✔"),
                    task: palette.mutedize(&row.label),
                }
            } else {
                TaskRow {
                    id: short_id,
                    done: String::new(),
                    task: row.label.clone(),
                }
            }
        });
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
    }

    println!("{}", palette.accentize(&view.pending_caption()));
    println!("{}", palette.accentize(&view.completed_caption()));
}

fn print_list_json(view: &RenderedList, dark_mode: bool) {
    let json = serde_json::json!({
        "tasks": view.rows,
        "pending": view.pending,
        "completed": view.completed,
        "dark_mode": dark_mode,
    });
    println!("{}", json);
}

fn print_task_json(task: &Task) {
    let json = serde_json::json!({
        "id": task.id,
        "text": task.text,
        "completed": task.completed,
        "reminder": task.reminder,
        "notified": task.notified,
    });
    println!("{}", json);
}

fn describe(task: &Task) -> String {
    format!("{} ({})", task.text, task.short_id())
}

fn normalize_parse_error(err: clap::Error) -> AppError {
    let rendered = err.to_string();
    let first_line = rendered.lines().next().unwrap_or("invalid command").trim();
    let message = first_line
        .strip_prefix("error: ")
        .unwrap_or(first_line)
        .to_string();
    AppError::invalid_input(message)
}

fn split_command_line(line: &str) -> Result<Vec<String>, AppError> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escape = false;

    for ch in line.chars() {
        if escape {
            if ch != '"' && ch != '\\' {
                current.push('\\');
            }
            current.push(ch);
            escape = false;
            continue;
        }

        if in_quotes && ch == '\\' {
            escape = true;
            continue;
        }

        if ch == '"' {
            in_quotes = !in_quotes;
            continue;
        }

        if ch.is_whitespace() && !in_quotes {
            if !current.is_empty() {
                args.push(current.clone());
                current.clear();
            }
            continue;
        }

        current.push(ch);
    }

    if in_quotes {
        return Err(AppError::invalid_input("unterminated quote in command"));
    }

    if !current.is_empty() {
        args.push(current);
    }

    Ok(args)
}

fn print_help() {
    let mut cmd = Cli::command();
    let help = cmd.render_help();
    println!("{help}");
}

fn load_config(cli: &Cli) -> Result<Config, AppError> {
    let loaded = config::load_config_with_fallback();
    if let Some(err) = loaded.error {
        tracing::warn!(error = %err, "ignoring config file");
    }
    let overrides = collect_overrides(&cli.config_override).map_err(AppError::invalid_input)?;
    Ok(config::merge_overrides(&loaded.config, &overrides))
}

fn run_watch(
    cli: &Cli,
    config: &Config,
    once: bool,
    session: Option<&ReplSession>,
) -> Result<(), AppError> {
    let mut list = task_api::open_default()?;
    let notifier = notifier_from_env(config.notifications);
    let alarm = alarm_from_config(&config.sound);
    let stdin_prompt = StdinPrompt;
    let prompt: &dyn Prompt = match session {
        Some(session) => {
            session.alarms.borrow_mut().push(Arc::clone(&alarm));
            &session.prompt
        }
        None => &stdin_prompt,
    };
    let poller = ReminderPoller::new(notifier.as_ref(), prompt, Arc::clone(&alarm));
    let interval = Duration::from_secs(config.poll_interval_secs);
    let max_ticks = if once { Some(1) } else { None };

    if !once && !cli.json {
        println!(
            "Watching reminders every {}s (Ctrl-C to stop)",
            config.poll_interval_secs
        );
    }

    let json = cli.json;
    poller.run(&mut list, &SystemClock, interval, max_ticks, |task| {
        if json {
            print_task_json(task);
        } else {
            println!("Reminder fired: {}", describe(task));
        }
    })?;

    // A one-shot run owns its alarm until someone silences it.
    if session.is_none() {
        while alarm.is_ringing() {
            std::thread::sleep(ALARM_WAIT);
        }
    }

    Ok(())
}

fn run_command(cli: Cli, session: Option<&ReplSession>) -> Result<(), AppError> {
    let config = load_config(&cli)?;

    match cli.command {
        Command::Add { ref text, ref at } => {
            let text = text.as_deref().unwrap_or_default();
            match task_api::add_task(text, at.as_deref())? {
                Some(task) if cli.json => print_task_json(&task),
                Some(task) => match task.reminder() {
                    Some(reminder) => {
                        println!("Added task: {} at {}", describe(&task), reminder)
                    }
                    None => println!("Added task: {}", describe(&task)),
                },
                None if cli.json => println!("null"),
                None => {}
            }
        }
        Command::Done { ref id } => {
            let task = task_api::toggle_task(id)?;
            if cli.json {
                print_task_json(&task);
            } else if task.completed {
                println!("Completed task: {}", describe(&task));
            } else {
                println!("Reopened task: {}", describe(&task));
            }
        }
        Command::Delete { ref id } => {
            let task = task_api::delete_task(id)?;
            if cli.json {
                print_task_json(&task);
            } else {
                println!("Deleted task: {}", describe(&task));
            }
        }
        Command::Clear => {
            let cleared = task_api::clear_tasks()?;
            if cli.json {
                println!("{}", serde_json::json!({ "cleared": cleared }));
            } else {
                println!("Cleared {cleared} task(s)");
            }
        }
        Command::List => {
            let tasks = task_api::list_tasks()?;
            let dark_mode = task_api::dark_mode()?;
            let view = render(&tasks);
            if cli.json {
                print_list_json(&view, dark_mode);
            } else {
                print_list_plain(&view, &config::palette_for(&config, dark_mode));
            }
        }
        Command::DarkMode => {
            let enabled = task_api::toggle_dark_mode()?;
            if cli.json {
                println!("{}", serde_json::json!({ "dark_mode": enabled }));
            } else {
                println!("Dark mode {}", if enabled { "on" } else { "off" });
            }
        }
        Command::Watch { once } => {
            if session.is_some() && !once {
                return Err(AppError::invalid_input(
                    "watch needs --once in interactive mode",
                ));
            }
            run_watch(&cli, &config, once, session)?;
        }
    }

    Ok(())
}

fn run_interactive() -> Result<(), AppError> {
    let session = ReplSession::default();
    let result = read_commands(&session);
    session.silence();
    result
}

fn read_commands(session: &ReplSession) -> Result<(), AppError> {
    let mut input = String::new();
    let stdin = io::stdin();
    let mut stdin_lock = stdin.lock();

    loop {
        input.clear();
        let bytes = stdin_lock.read_line(&mut input)?;

        if bytes == 0 {
            break;
        }

        let line = input.trim();
        if line.is_empty() {
            continue;
        }

        match session.prompt.answer(line) {
            Some(Answer::Confirmed) => {
                println!("Alarm stopped");
                continue;
            }
            Some(Answer::Declined) => {
                println!("Alarm still ringing (type stop to silence it)");
                continue;
            }
            None => {}
        }

        if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
            break;
        }

        if line == "help" || line == "?" {
            print_help();
            continue;
        }

        if line.eq_ignore_ascii_case("stop") {
            session.silence();
            println!("Alarm stopped");
            continue;
        }

        let args = match split_command_line(line) {
            Ok(args) => args,
            Err(err) => {
                eprintln!("ERROR: {}", err);
                continue;
            }
        };

        if args.is_empty() {
            continue;
        }

        let mut argv = Vec::with_capacity(args.len() + 1);
        argv.push("taskbell".to_string());
        argv.extend(args);

        let cli = match Cli::try_parse_from(argv) {
            Ok(cli) => cli,
            Err(err) => {
                eprintln!("ERROR: {}", normalize_parse_error(err));
                continue;
            }
        };

        if let Err(err) = run_command(cli, Some(session)) {
            eprintln!("ERROR: {}", err);
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_tracing();

    let mut args = std::env::args_os();
    args.next();
    if args.next().is_none() {
        if let Err(err) = run_interactive() {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
        return;
    }

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            ) {
                err.exit();
            }
            eprintln!("ERROR: {}", normalize_parse_error(err));
            std::process::exit(1);
        }
    };

    if let Err(err) = run_command(cli, None) {
        eprintln!("ERROR: {}", err);
        std::process::exit(1);
    }
}
