use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;

const TITLES_FILE: &str = "titles.txt";
const TRANSCRIPTS_FILE: &str = "transcripts.txt";

/// Title and transcript of one comic, joined by comic number.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComicText {
    pub title: Option<String>,
    pub transcript: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchScope {
    Titles,
    Transcripts,
    All,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub num: u32,
    pub title: String,
}

impl fmt::Display for SearchHit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(#{}) {}", self.num, self.title)
    }
}

/// In-memory store keyed by comic number. The two files are joined on the
/// number each line carries, never on line position.
#[derive(Debug, Default)]
pub struct SearchIndex {
    records: BTreeMap<u32, ComicText>,
    skipped_lines: usize,
}

impl SearchIndex {
    pub fn from_lines(titles: &str, transcripts: &str) -> Self {
        let mut index = Self::default();
        for line in titles.lines() {
            match parse_record_line(line) {
                Some((num, title)) => index.records.entry(num).or_default().title = Some(title),
                None if line.trim().is_empty() => {}
                None => index.skipped_lines += 1,
            }
        }
        for line in transcripts.lines() {
            match parse_record_line(line) {
                Some((num, text)) => {
                    index.records.entry(num).or_default().transcript = Some(text)
                }
                None if line.trim().is_empty() => {}
                None => index.skipped_lines += 1,
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }

    #[cfg(test)]
    pub fn get(&self, num: u32) -> Option<&ComicText> {
        self.records.get(&num)
    }

    /// Case-insensitive substring search. Hits are unique per comic and
    /// ordered by comic number; no match is an empty list.
    pub fn search(&self, query: &str, scope: SearchScope) -> Vec<SearchHit> {
        let needle = query.to_lowercase();
        let contains = |text: &Option<String>| {
            text.as_deref()
                .is_some_and(|text| text.to_lowercase().contains(&needle))
        };

        let mut matched = BTreeSet::new();
        for (num, record) in &self.records {
            let title_hit = scope != SearchScope::Transcripts && contains(&record.title);
            let transcript_hit = scope != SearchScope::Titles && contains(&record.transcript);
            if title_hit || transcript_hit {
                matched.insert(*num);
            }
        }

        matched
            .into_iter()
            .map(|num| SearchHit {
                num,
                title: self
                    .records
                    .get(&num)
                    .and_then(|record| record.title.clone())
                    .unwrap_or_else(|| "(untitled)".to_string()),
            })
            .collect()
    }
}

/// The pair of append-only flat files backing offline search.
#[derive(Debug, Clone)]
pub struct SearchDb {
    titles_path: PathBuf,
    transcripts_path: PathBuf,
}

impl SearchDb {
    pub fn new(dir: &Path) -> Self {
        Self {
            titles_path: dir.join(TITLES_FILE),
            transcripts_path: dir.join(TRANSCRIPTS_FILE),
        }
    }

    #[cfg(test)]
    pub fn titles_path(&self) -> &Path {
        &self.titles_path
    }

    pub fn exists(&self) -> bool {
        self.titles_path.is_file()
    }

    pub fn load(&self) -> Result<SearchIndex> {
        let titles = fs::read_to_string(&self.titles_path)
            .with_context(|| format!("failed to read {}", self.titles_path.display()))?;
        let transcripts = if self.transcripts_path.exists() {
            fs::read_to_string(&self.transcripts_path)
                .with_context(|| format!("failed to read {}", self.transcripts_path.display()))?
        } else {
            String::new()
        };
        let index = SearchIndex::from_lines(&titles, &transcripts);
        debug!(
            records = index.len(),
            skipped = index.skipped_lines(),
            "loaded search database"
        );
        Ok(index)
    }

    /// Number on the last non-empty line of the title file, 0 when there is
    /// no file yet.
    pub fn last_recorded(&self) -> Result<u32> {
        if !self.titles_path.exists() {
            return Ok(0);
        }
        let raw = fs::read_to_string(&self.titles_path)
            .with_context(|| format!("failed to read {}", self.titles_path.display()))?;
        let Some(line) = raw.lines().rev().find(|line| !line.trim().is_empty()) else {
            return Ok(0);
        };
        parse_record_line(line)
            .map(|(num, _)| num)
            .with_context(|| format!("malformed last line in {}", self.titles_path.display()))
    }

    pub fn append(&self, num: u32, title: &str, transcript: &str) -> Result<()> {
        if let Some(parent) = self.titles_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        // Transcript first: the title file's last line marks completion.
        append_line(&self.transcripts_path, &encode_record_line(num, transcript)?)?;
        append_line(&self.titles_path, &encode_record_line(num, title)?)?;
        debug!(num, "appended search record");
        Ok(())
    }
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    writeln!(file, "{line}").with_context(|| format!("failed to write {}", path.display()))
}

pub fn encode_record_line(num: u32, text: &str) -> Result<String> {
    let quoted = serde_json::to_string(text).context("failed to quote record text")?;
    Ok(format!("{num}:{quoted}"))
}

/// Splits on the first colon. The text is a JSON string literal; plain
/// single- or double-quoted text is accepted too.
pub fn parse_record_line(line: &str) -> Option<(u32, String)> {
    let (num, rest) = line.trim_end_matches(['\r', '\n']).split_once(':')?;
    let num = num.trim().parse::<u32>().ok()?;
    let rest = rest.trim();
    if let Ok(text) = serde_json::from_str::<String>(rest) {
        return Some((num, text));
    }
    let unquoted = ['"', '\'']
        .iter()
        .find_map(|quote| rest.strip_prefix(*quote)?.strip_suffix(*quote))
        .unwrap_or(rest);
    Some((num, unquoted.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TempDir;

    #[test]
    fn parse_record_line_decodes_json_quoted_text() {
        let (num, text) = parse_record_line(r#"1296:"Git Commit""#).expect("line should parse");
        assert_eq!(num, 1296);
        assert_eq!(text, "Git Commit");
    }

    #[test]
    fn parse_record_line_splits_on_first_colon_only() {
        let (num, text) =
            parse_record_line(r#"42:"Title: with a colon\nand a newline""#).expect("parse");
        assert_eq!(num, 42);
        assert_eq!(text, "Title: with a colon\nand a newline");
    }

    #[test]
    fn parse_record_line_accepts_single_quoted_text() {
        let (num, text) = parse_record_line("7:'Barrel - Part 1'").expect("parse");
        assert_eq!(num, 7);
        assert_eq!(text, "Barrel - Part 1");
    }

    #[test]
    fn parse_record_line_rejects_missing_number() {
        assert!(parse_record_line("no number here").is_none());
        assert!(parse_record_line("abc:\"x\"").is_none());
    }

    #[test]
    fn encode_record_line_keeps_records_on_one_line() {
        let line = encode_record_line(3, "line one\nline \"two\"").expect("encode");
        assert!(!line.contains('\n'));
        let (num, text) = parse_record_line(&line).expect("parse");
        assert_eq!(num, 3);
        assert_eq!(text, "line one\nline \"two\"");
    }

    #[test]
    fn search_matches_exactly_one_title_case_insensitively() {
        let index = SearchIndex::from_lines("1:\"Barrel - Part 1\"\n2:\"Petit Trees\"\n", "");
        let hits = index.search("BARREL", SearchScope::Titles);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].to_string(), "(#1) Barrel - Part 1");
    }

    #[test]
    fn search_without_match_is_empty() {
        let index = SearchIndex::from_lines("1:\"Barrel - Part 1\"\n2:\"Petit Trees\"\n", "");
        assert!(index.search("velociraptor", SearchScope::All).is_empty());
    }

    #[test]
    fn transcript_hits_resolve_titles_by_number_not_position() {
        // transcripts out of order and with a gap relative to titles
        let titles = "1:\"Barrel - Part 1\"\n2:\"Petit Trees\"\n3:\"Island\"\n";
        let transcripts = "3:\"a lonely island\"\n1:\"a boy in a barrel\"\n";
        let index = SearchIndex::from_lines(titles, transcripts);

        let hits = index.search("island", SearchScope::Transcripts);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].num, 3);
        assert_eq!(hits[0].title, "Island");
    }

    #[test]
    fn combined_search_deduplicates_and_orders_by_number() {
        let titles = "11:\"Barrel - Part 2\"\n1:\"Barrel - Part 1\"\n";
        let transcripts = "1:\"Boy in a barrel\"\n11:\"Barrel floats\"\n";
        let index = SearchIndex::from_lines(titles, transcripts);

        let hits = index.search("barrel", SearchScope::All);
        let rendered: Vec<String> = hits.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["(#1) Barrel - Part 1", "(#11) Barrel - Part 2"]);
    }

    #[test]
    fn malformed_lines_are_counted_and_skipped() {
        let index = SearchIndex::from_lines("1:\"One\"\ngarbage\n\n2:\"Two\"\n", "x\n");
        assert_eq!(index.len(), 2);
        assert_eq!(index.skipped_lines(), 2);
    }

    #[test]
    fn appended_title_is_found_by_its_own_text() {
        let dir = TempDir::new("db-roundtrip");
        let db = SearchDb::new(dir.path());
        assert!(!db.exists());
        assert_eq!(db.last_recorded().expect("last"), 0);

        db.append(1, "Barrel - Part 1", "A boy sits in a barrel")
            .expect("append 1");
        db.append(2, "Petit Trees (sketch)", "").expect("append 2");

        assert!(db.exists());
        assert_eq!(db.last_recorded().expect("last"), 2);
        let index = db.load().expect("load");
        let hits = index.search("Petit Trees (sketch)", SearchScope::Titles);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].to_string(), "(#2) Petit Trees (sketch)");
        assert_eq!(
            index.get(1).and_then(|r| r.transcript.as_deref()),
            Some("A boy sits in a barrel")
        );
    }

    #[test]
    fn last_recorded_ignores_trailing_blank_lines() {
        let dir = TempDir::new("db-last");
        let db = SearchDb::new(dir.path());
        fs::write(db.titles_path(), "5:\"Five\"\n6:\"Six\"\n\n\n").expect("write");
        assert_eq!(db.last_recorded().expect("last"), 6);
    }
}
