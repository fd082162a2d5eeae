use std::path::PathBuf;

use crate::db::SearchScope;

use super::session::RandomMode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RandomOptions {
    pub(crate) mode: RandomMode,
    pub(crate) display: bool,
    pub(crate) display_image: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Command {
    Random(RandomOptions),
    Display { num: Option<u32>, image: bool },
    Explain { num: Option<u32> },
    Next { amount: i64 },
    Prev { amount: i64 },
    First,
    Last,
    Goto { target: Option<i64> },
    Update { search_db: bool },
    Save { path: Option<PathBuf> },
    Search { scope: SearchScope, query: Option<String> },
    Quit,
    License,
    Help { topic: Option<String> },
}

/// A parsed command plus whether it was handed arguments it ignores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Invocation {
    pub(crate) command: Command,
    pub(crate) ignored_args: bool,
}

pub(crate) const ARGS_WARNING: &str = "Command does not take arguments";

pub(crate) const COMMAND_NAMES: &[&str] = &[
    "random",
    "display",
    "explain",
    "next",
    "prev",
    "previous",
    "first",
    "last",
    "goto",
    "update",
    "save",
    "search",
    "search-titles",
    "search-transcripts",
    "quit",
    "exit",
    "license",
    "help",
];

/// Splits one input line into `(name, args)` pairs on `;`; blank segments are
/// dropped.
pub(crate) fn split_line(line: &str) -> Vec<(&str, Vec<&str>)> {
    line.split(';')
        .filter_map(|segment| {
            let mut words = segment.split_whitespace();
            let name = words.next()?;
            Some((name, words.collect()))
        })
        .collect()
}

fn amount_arg(args: &[&str]) -> i64 {
    args.first()
        .and_then(|raw| raw.parse::<i64>().ok())
        .unwrap_or(1)
}

fn comic_arg(args: &[&str]) -> Option<u32> {
    args.iter().find_map(|raw| raw.parse::<u32>().ok())
}

fn query_arg(args: &[&str]) -> Option<String> {
    (!args.is_empty()).then(|| args.join(" "))
}

impl Invocation {
    pub(crate) fn parse(name: &str, args: &[&str]) -> Option<Self> {
        let plain = |command| Self {
            command,
            ignored_args: false,
        };
        let no_args = |command| Self {
            command,
            ignored_args: !args.is_empty(),
        };

        let invocation = match name {
            "random" => {
                let has = |short: &str, long: &str| args.iter().any(|a| *a == short || *a == long);
                plain(Command::Random(RandomOptions {
                    mode: if has("-f", "--fast") {
                        RandomMode::Fast
                    } else {
                        RandomMode::Unique
                    },
                    display: has("-d", "--display"),
                    display_image: has("-i", "--display-img"),
                }))
            }
            "display" => plain(Command::Display {
                num: comic_arg(args),
                image: args.contains(&"img"),
            }),
            "explain" => plain(Command::Explain {
                num: comic_arg(args),
            }),
            "next" => plain(Command::Next {
                amount: amount_arg(args),
            }),
            "prev" | "previous" => plain(Command::Prev {
                amount: amount_arg(args),
            }),
            "first" => no_args(Command::First),
            "last" => no_args(Command::Last),
            "goto" => plain(Command::Goto {
                target: args.first().and_then(|raw| raw.parse::<i64>().ok()),
            }),
            "update" => Self {
                command: Command::Update {
                    search_db: args.contains(&"search_db"),
                },
                ignored_args: args.iter().any(|arg| *arg != "search_db"),
            },
            "save" => plain(Command::Save {
                path: args.first().map(PathBuf::from),
            }),
            "search" => plain(Command::Search {
                scope: SearchScope::All,
                query: query_arg(args),
            }),
            "search-titles" => plain(Command::Search {
                scope: SearchScope::Titles,
                query: query_arg(args),
            }),
            "search-transcripts" => plain(Command::Search {
                scope: SearchScope::Transcripts,
                query: query_arg(args),
            }),
            "quit" | "exit" => no_args(Command::Quit),
            "license" => no_args(Command::License),
            "help" => plain(Command::Help {
                topic: args.first().map(|topic| topic.to_string()),
            }),
            _ => return None,
        };
        Some(invocation)
    }
}

pub(crate) const OVERVIEW_HELP: &str = "
Use `next', `prev', `first', `last', `goto' and `random' to select comics.
Use `display' to show comics' transcriptions.
Use `display img' to display images (requires an image viewer and a running X
server).
Use `explain' to show the explain xkcd page for that comic.
Use `update' to check for new comics.
Use `save' to save comics to disk.
Use `search' to search the offline title and transcript database.
Use `quit' or `exit' to exit.
Use `help [command]' to get help.";

pub(crate) fn command_help(topic: &str) -> Option<&'static str> {
    let text = match topic {
        "random" => {
            "Selects a random comic. Without -f or --fast, never repeats a comic \
             until every comic has been seen. When -d or --display is passed, also \
             displays the comic's title, release date and transcription. When -i or \
             --display-img is passed, also display image."
        }
        "display" => {
            "Displays selected comic's transcription or image. When called without \
             arguments, will display text representation of selected comic. When \
             called with 'img' as an argument, displays image (using your selected \
             method of displaying images). When first argument is number, displays \
             comic with that ID."
        }
        "explain" => {
            "Shows selected comic's explainxkcd page as text. If an argument is \
             provided, shows that comic's page. Great if you missed the point of a \
             comic."
        }
        "next" => {
            "Selects next comic. When called with an argument, moves [argument] \
             number of comics forward."
        }
        "prev" | "previous" => {
            "Selects previous comic. When called with an argument, moves [argument] \
             number of comics backward."
        }
        "first" => "Selects the first comic. Takes no arguments.",
        "last" => "Selects the last comic. Takes no arguments.",
        "goto" => "Moves to comic number [argument]. Without arguments, goes to last comic.",
        "update" => {
            "Updates latest comic. With 'search_db' as an argument, also appends \
             every new comic's title and transcript to the offline search database."
        }
        "save" => {
            "Saves selected comic to disk, with file name [argument]. Without \
             arguments, saves to [comic number].png in the save directory."
        }
        "search" => {
            "Searches comic titles and transcripts in the offline database for \
             [argument]. Run `update search_db' first to build the database."
        }
        "search-titles" => "Like `search', but only looks at comic titles.",
        "search-transcripts" => "Like `search', but only looks at comic transcripts.",
        "quit" | "exit" => "Closes the program. Takes no arguments.",
        "help" => "Shows help. With an argument, shows help for command [argument].",
        "license" => "Shows license.",
        _ => return None,
    };
    Some(text)
}

pub(crate) fn help_text(topic: Option<&str>) -> String {
    let Some(topic) = topic else {
        return OVERVIEW_HELP.to_string();
    };
    match command_help(topic) {
        Some(text) => text.to_string(),
        None if COMMAND_NAMES.contains(&topic) => {
            "Command exists, but has no documentation.".to_string()
        }
        None => "Unknown command.".to_string(),
    }
}

pub(crate) const LICENSE_TEXT: &str = "
Copyright © 2016 randomdude999
This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <http://www.gnu.org/licenses/>.";
