mod api;
mod cache;
mod command;
mod comic;
mod process;
mod session;
mod shell;


use std::io;

use anyhow::{Context, Result};
use crossterm::execute;
use crossterm::terminal::SetTitle;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::warn;

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::db::SearchDb;
use crate::error::ClientError;

use self::api::ComicApi;
use self::cache::ImageCache;
use self::command::{Invocation, split_line};
use self::process::Tools;
use self::session::Session;
use self::shell::{Reply, Shell};

pub fn run(cli: Cli) -> Result<()> {
    let config = Config::from_settings(cli.settings)?;
    let mut shell = open_shell(&config)?;

    let result = match cli.command {
        Some(Command::Shell) | None => run_repl(&mut shell),
        Some(Command::Run { line }) => {
            run_line(&mut shell, &line.join(" "));
            Ok(())
        }
        Some(Command::UpdateDb) => run_update_db(&mut shell),
    };

    if let Err(err) = shell.cache().clear() {
        warn!("{err}");
    }
    result
}

fn open_shell(config: &Config) -> Result<Shell> {
    let api = ComicApi::from_config(config);
    let latest = api
        .latest_num()
        .context("unable to reach the comic API")?;
    Ok(Shell::new(
        Session::new(latest),
        api,
        ImageCache::new(&config.cache_dir),
        Tools::from_config(config),
        SearchDb::new(&config.data_dir),
        config.save_dir.clone(),
    ))
}

fn run_repl(shell: &mut Shell) -> Result<()> {
    let _ = execute!(io::stdout(), SetTitle("xkcd"));
    println!(
        "A command line xkcd client (v{})",
        env!("CARGO_PKG_VERSION")
    );
    println!("Type `help' or `license' for more info");

    let mut editor = DefaultEditor::new().context("failed to initialize line editor")?;
    while shell.is_running() {
        match editor.readline(&shell.prompt()) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = editor.add_history_entry(line.as_str());
                }
                run_line(shell, &line);
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => return Err(err).context("failed to read input"),
        }
    }
    Ok(())
}

/// Runs each `;`-separated command of one input line, stopping early after
/// `quit`.
fn run_line(shell: &mut Shell, line: &str) {
    for (name, args) in split_line(line) {
        if !shell.is_running() {
            break;
        }
        let Some(invocation) = Invocation::parse(name, &args) else {
            println!("Unknown command");
            continue;
        };
        match shell.execute(invocation) {
            Ok(reply) => show_reply(shell, reply),
            Err(err) => println!("Error: {err:#}"),
        }
    }
}

fn show_reply(shell: &Shell, reply: Reply) {
    match reply {
        Reply::Silent => {}
        Reply::Text(text) => println!("{text}"),
        Reply::Paged(text) => match shell.tools().page(&text) {
            Ok(true) => {}
            Ok(false) => println!("{text}"),
            Err(err) => {
                if let Some(ClientError::ToolMissing { .. }) = err.downcast_ref::<ClientError>() {
                    eprintln!("Warning: {err}");
                } else {
                    eprintln!("Warning: pager failed: {err:#}");
                }
                println!("{text}");
            }
        },
        Reply::Image(path) => {
            if let Err(err) = shell.tools().view_image(&path) {
                println!("Error: {err:#}");
            }
        }
        Reply::Sequence(parts) => {
            for part in parts {
                show_reply(shell, part);
            }
        }
    }
}

fn run_update_db(shell: &mut Shell) -> Result<()> {
    let recorded = shell.backfill_search_db()?;
    println!("Recorded {recorded} comic(s) in the search database.");
    Ok(())
}
