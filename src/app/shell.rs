use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::warn;

use crate::db::{SearchDb, SearchScope};
use crate::error::ClientError;

use super::api::ComicApi;
use super::cache::ImageCache;
use super::command::{ARGS_WARNING, Command, Invocation, LICENSE_TEXT, RandomOptions, help_text};
use super::comic::MISSING_COMIC;
use super::process::Tools;
use super::session::{GotoOutcome, Session};

pub(crate) const MISSING_QUERY: &str = "Missing argument: query";
pub(crate) const MISSING_DB: &str = "This function needs a dictionary of comic titles. \
Please see the documentation of the program for more info.";
pub(crate) const NO_MATCHES: &str = "No matches.";

/// What a command hands back to the input loop. Parts are shown in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Reply {
    Silent,
    Text(String),
    /// Long output meant for the pager.
    Paged(String),
    /// A cached image for the viewer.
    Image(PathBuf),
    Sequence(Vec<Reply>),
}

impl Reply {
    fn then(self, next: Reply) -> Reply {
        match (self, next) {
            (Reply::Silent, next) => next,
            (first, Reply::Silent) => first,
            (Reply::Sequence(mut parts), next) => {
                parts.push(next);
                Reply::Sequence(parts)
            }
            (first, next) => Reply::Sequence(vec![first, next]),
        }
    }

    fn error(err: &anyhow::Error) -> Reply {
        Reply::Text(format!("Error: {err:#}"))
    }

    /// Printable text of every part, one per line. Images contribute nothing.
    #[cfg(test)]
    pub(crate) fn text(&self) -> String {
        match self {
            Reply::Silent | Reply::Image(_) => String::new(),
            Reply::Text(text) | Reply::Paged(text) => text.clone(),
            Reply::Sequence(parts) => parts
                .iter()
                .map(Reply::text)
                .filter(|text| !text.is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

pub(crate) struct Shell {
    pub(crate) session: Session,
    api: ComicApi,
    cache: ImageCache,
    tools: Tools,
    search_db: SearchDb,
    save_dir: PathBuf,
    running: bool,
}

impl Shell {
    pub(crate) fn new(
        session: Session,
        api: ComicApi,
        cache: ImageCache,
        tools: Tools,
        search_db: SearchDb,
        save_dir: PathBuf,
    ) -> Self {
        Self {
            session,
            api,
            cache,
            tools,
            search_db,
            save_dir,
            running: true,
        }
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running
    }

    pub(crate) fn prompt(&self) -> String {
        format!("xkcd [{}]> ", self.session.current())
    }

    pub(crate) fn tools(&self) -> &Tools {
        &self.tools
    }

    pub(crate) fn cache(&self) -> &ImageCache {
        &self.cache
    }

    pub(crate) fn execute(&mut self, invocation: Invocation) -> Result<Reply> {
        let reply = self.execute_command(invocation.command)?;
        if invocation.ignored_args {
            return Ok(Reply::Text(ARGS_WARNING.to_string()).then(reply));
        }
        Ok(reply)
    }

    fn execute_command(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::Random(options) => self.random(options),
            Command::Display { num, image } => self.display(num, image),
            Command::Explain { num } => self.explain(num),
            Command::Next { amount } => {
                self.session.next(amount);
                Ok(Reply::Silent)
            }
            Command::Prev { amount } => {
                self.session.prev(amount);
                Ok(Reply::Silent)
            }
            Command::First => {
                self.session.first();
                Ok(Reply::Silent)
            }
            Command::Last => {
                self.session.last();
                Ok(Reply::Silent)
            }
            Command::Goto { target } => match self.session.goto(target) {
                GotoOutcome::Moved => Ok(Reply::Silent),
                GotoOutcome::NotFound => Ok(Reply::Text(format!("{MISSING_COMIC} Not Found"))),
            },
            Command::Update { search_db } => self.update(search_db),
            Command::Save { path } => self.save(path),
            Command::Search { scope, query } => self.search(scope, query.as_deref()),
            Command::Quit => {
                self.running = false;
                Ok(Reply::Silent)
            }
            Command::License => Ok(Reply::Text(LICENSE_TEXT.to_string())),
            Command::Help { topic } => Ok(Reply::Text(help_text(topic.as_deref()))),
        }
    }

    fn random(&mut self, options: RandomOptions) -> Result<Reply> {
        let pick = self.session.random(options.mode);
        let mut reply = if pick.pool_reset {
            Reply::Text("Every comic has been seen; starting a new round.".to_string())
        } else {
            Reply::Silent
        };
        if options.display {
            reply = reply.then(self.display(None, false)?);
        }
        if options.display_image {
            // keep the transcript when the comic has no image
            reply = match self.display(None, true) {
                Ok(image) => reply.then(image),
                Err(err) => reply.then(Reply::error(&err)),
            };
        }
        Ok(reply)
    }

    fn display(&mut self, num: Option<u32>, image: bool) -> Result<Reply> {
        let num = num.unwrap_or(self.session.current());
        if image {
            return Ok(Reply::Image(self.cache.ensure(&self.api, num)?));
        }
        let info = self.api.comic(num)?;
        Ok(Reply::Paged(info.render()))
    }

    fn explain(&mut self, num: Option<u32>) -> Result<Reply> {
        let num = num.unwrap_or(self.session.current());
        let html = self.api.explain_html(num)?;
        let rendered = self.tools.render_html(&html)?;
        Ok(Reply::Paged(extract_explanation(&rendered)))
    }

    fn save(&mut self, path: Option<PathBuf>) -> Result<Reply> {
        let num = self.session.current();
        let target = path.unwrap_or_else(|| self.save_dir.join(format!("{num}.png")));
        let cached = self.cache.ensure(&self.api, num)?;
        copy_image(&cached, &target)?;
        Ok(Reply::Text(format!(
            "Saving comic {num} to location {}",
            target.display()
        )))
    }

    fn update(&mut self, search_db: bool) -> Result<Reply> {
        let latest = self.api.latest_num()?;
        let reply = match self.session.observe_latest(latest) {
            0 => Reply::Text("No new comics.".to_string()),
            1 => Reply::Text("1 new comic!".to_string()),
            delta => Reply::Text(format!("{delta} new comics!")),
        };
        if !search_db {
            return Ok(reply);
        }
        // max_known has already moved, so the report stands even if the backfill fails
        let outcome = match self.backfill_search_db() {
            Ok(recorded) => Reply::Text(format!(
                "Recorded {recorded} comic(s) in the search database."
            )),
            Err(err) => Reply::error(&err),
        };
        Ok(reply.then(outcome))
    }

    /// Appends every comic after the last recorded one up to `max_known`.
    pub(crate) fn backfill_search_db(&mut self) -> Result<u32> {
        let start = self.search_db.last_recorded()? + 1;
        let end = self.session.max_known();
        if start > end {
            return Ok(0);
        }

        let progress = ProgressBar::new(u64::from(end - start + 1));
        if let Ok(style) = ProgressStyle::with_template("{bar:40} {pos}/{len} comics {msg}") {
            progress.set_style(style);
        }

        let mut recorded = 0;
        for num in start..=end {
            progress.inc(1);
            if num == MISSING_COMIC {
                continue;
            }
            let info = self
                .api
                .comic(num)
                .with_context(|| format!("search database update stopped at comic {num}"))?;
            self.search_db
                .append(num, &info.title, info.searchable_transcript())
                .with_context(|| format!("search database update stopped at comic {num}"))?;
            recorded += 1;
        }
        progress.finish_and_clear();
        Ok(recorded)
    }

    fn search(&mut self, scope: SearchScope, query: Option<&str>) -> Result<Reply> {
        let Some(query) = query else {
            return Ok(Reply::Text(MISSING_QUERY.to_string()));
        };
        if !self.search_db.exists() {
            return Ok(Reply::Text(MISSING_DB.to_string()));
        }
        let index = self.search_db.load()?;
        if index.skipped_lines() > 0 {
            warn!(
                skipped = index.skipped_lines(),
                "ignored malformed lines in the search database"
            );
        }
        let hits = index.search(query, scope);
        if hits.is_empty() {
            return Ok(Reply::Text(NO_MATCHES.to_string()));
        }
        let mut out = String::from("Matches:");
        for hit in hits {
            out.push('\n');
            out.push_str(&hit.to_string());
        }
        Ok(Reply::Text(out))
    }
}

fn copy_image(from: &Path, to: &Path) -> Result<()> {
    fs::copy(from, to)
        .map(|_| ())
        .map_err(|err| anyhow!(ClientError::io("failed to save image to", to, err)))
}

/// Keeps the article body: the text between the first and last `[edit] `
/// section markers. Falls back to the whole text when there are fewer than
/// two markers.
pub(crate) fn extract_explanation(rendered: &str) -> String {
    let sections: Vec<&str> = rendered.split("[edit] ").collect();
    if sections.len() < 3 {
        return rendered.to_string();
    }
    sections[1..sections.len() - 1].concat()
}
