use chrono::NaiveDate;
use serde::Deserialize;

/// The comic that does not exist. Sequential movement steps over it.
pub(crate) const MISSING_COMIC: u32 = 404;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ComicInfo {
    pub(crate) num: u32,
    #[serde(default)]
    pub(crate) year: String,
    #[serde(default)]
    pub(crate) month: String,
    #[serde(default)]
    pub(crate) day: String,
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) transcript: String,
    #[serde(default)]
    pub(crate) alt: String,
    #[serde(default)]
    pub(crate) img: String,
}

impl ComicInfo {
    pub(crate) fn release_date(&self) -> String {
        let parsed = (
            self.year.trim().parse::<i32>(),
            self.month.trim().parse::<u32>(),
            self.day.trim().parse::<u32>(),
        );
        let date = match parsed {
            (Ok(year), Ok(month), Ok(day)) => NaiveDate::from_ymd_opt(year, month, day),
            _ => None,
        };
        match date {
            Some(date) => date.format("%Y-%-m-%-d").to_string(),
            None => format!("{}-{}-{}", self.year, self.month, self.day),
        }
    }

    /// Transcript, or the title text when no transcript exists yet.
    pub(crate) fn body(&self) -> String {
        if self.transcript.trim().is_empty() {
            format!("No transcript available yet.\n\nTitle text: \"{}\"", self.alt)
        } else {
            self.transcript.clone()
        }
    }

    /// Text recorded in the offline database for transcript search.
    pub(crate) fn searchable_transcript(&self) -> &str {
        if self.transcript.trim().is_empty() {
            &self.alt
        } else {
            &self.transcript
        }
    }

    pub(crate) fn render(&self) -> String {
        format!(
            "{}\nRelease date: {}\n{}",
            self.title,
            self.release_date(),
            self.body()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn barrel() -> ComicInfo {
        serde_json::from_str(
            r#"{"month": "1", "num": 1, "link": "", "year": "2006", "news": "",
                "safe_title": "Barrel - Part 1",
                "transcript": "[[A boy sits in a barrel which is floating in an ocean.]]\nBoy: I wonder where I'll float next?\n[[The barrel drifts into the distance. Nothing else can be seen.]]\n{{Alt: Don't we all.}}",
                "alt": "Don't we all.", "img": "https://imgs.xkcd.com/comics/barrel_cropped_(1).jpg",
                "title": "Barrel - Part 1", "day": "1"}"#,
        )
        .expect("comic json should decode")
    }

    #[test]
    fn render_matches_display_layout() {
        let expected = "Barrel - Part 1\nRelease date: 2006-1-1\n\
[[A boy sits in a barrel which is floating in an ocean.]]\n\
Boy: I wonder where I'll float next?\n\
[[The barrel drifts into the distance. Nothing else can be seen.]]\n\
{{Alt: Don't we all.}}";
        assert_eq!(barrel().render(), expected);
    }

    #[test]
    fn missing_transcript_falls_back_to_title_text() {
        let mut comic = barrel();
        comic.transcript = String::new();
        assert_eq!(
            comic.body(),
            "No transcript available yet.\n\nTitle text: \"Don't we all.\""
        );
        assert_eq!(comic.searchable_transcript(), "Don't we all.");
    }

    #[test]
    fn release_date_is_not_zero_padded() {
        let mut comic = barrel();
        comic.year = "2010".to_string();
        comic.month = "9".to_string();
        comic.day = "24".to_string();
        assert_eq!(comic.release_date(), "2010-9-24");
    }

    #[test]
    fn unparseable_release_date_is_printed_raw() {
        let mut comic = barrel();
        comic.month = "13".to_string();
        assert_eq!(comic.release_date(), "2006-13-1");
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(serde_json::from_str::<ComicInfo>(r#"{"num": "one"}"#).is_err());
    }
}
