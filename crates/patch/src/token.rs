//! Published record tokens.
//!
//! Two shapes appear in slot values:
//!
//! ```text
//! [https://youtu.be/abc 1:08.36]            plain
//! [https://youtu.be/abc 1:01.40] (IGT)      plain, in-game time
//! 1:08.36 [https://youtu.be/abc (Best Available Video)]
//! ```

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use wrsync_core::{Duration, Record, IGT_MARKER};

pub const BEST_AVAILABLE_VIDEO: &str = "(Best Available Video)";

fn plain_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\[\s*(?P<link>\S+)\s+(?P<time>[0-9][0-9:.]*)\s*\]\s*(?P<igt>\(IGT\))?$").unwrap()
    })
}

fn bav_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<time>[0-9][0-9:.]*)\s*\[\s*(?P<link>\S+)\s+\(Best Available Video\)\s*\]\s*(?P<igt>\(IGT\))?$",
        )
        .unwrap()
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub time: Duration,
    pub link: String,
    /// Time has no video of its own; the link is the best one available.
    pub best_available: bool,
}

impl Token {
    pub fn parse(text: &str) -> Option<Token> {
        let text = text.trim();
        let (caps, best_available) = match plain_re().captures(text) {
            Some(caps) => (caps, false),
            None => (bav_re().captures(text)?, true),
        };
        let mut time = Duration::parse(caps.name("time")?.as_str()).ok()?;
        if caps.name("igt").is_some() {
            time = time.into_in_game();
        }
        Some(Token { time, link: caps.name("link")?.as_str().to_string(), best_available })
    }

    pub fn from_record(record: &Record) -> Token {
        Token { time: record.time.clone(), link: record.link.clone(), best_available: false }
    }

    /// Same time and specifiers, different video.
    pub fn with_link(&self, link: &str) -> Token {
        Token { link: link.to_string(), ..self.clone() }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let time = self.time.display_bare();
        if self.best_available {
            write!(f, "{time} [{} {BEST_AVAILABLE_VIDEO}]", self.link)?;
        } else {
            write!(f, "[{} {time}]", self.link)?;
        }
        if self.time.timing().is_in_game() {
            write!(f, " {IGT_MARKER}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrsync_core::Timing;

    #[test]
    fn plain() {
        let tok = Token::parse("[https://youtu.be/a 9.80]").unwrap();
        assert_eq!(tok.link, "https://youtu.be/a");
        assert_eq!(tok.time, Duration::parse("9.80").unwrap());
        assert!(!tok.best_available);
        assert_eq!(tok.to_string(), "[https://youtu.be/a 9.80]");
    }

    #[test]
    fn in_game() {
        let tok = Token::parse("[https://youtu.be/a 1:01.40] (IGT)").unwrap();
        assert_eq!(tok.time.timing(), Timing::InGame);
        assert_eq!(tok.time.display(), "1:01.40 (IGT)");
        assert_eq!(tok.to_string(), "[https://youtu.be/a 1:01.40] (IGT)");
    }

    #[test]
    fn best_available_video() {
        let text = "1:08.36 [https://youtu.be/b (Best Available Video)]";
        let tok = Token::parse(text).unwrap();
        assert!(tok.best_available);
        assert_eq!(tok.time.millis(), 68_360);
        assert_eq!(tok.link, "https://youtu.be/b");
        assert_eq!(tok.to_string(), text);
        assert_eq!(
            tok.with_link("https://youtu.be/c").to_string(),
            "1:08.36 [https://youtu.be/c (Best Available Video)]"
        );
    }

    #[test]
    fn unparseable() {
        for text in ["", "9.80", "[https://youtu.be/a]", "[a 9.8x]", "TBD", "[a b 9.80]"] {
            assert_eq!(Token::parse(text), None, "{text:?}");
        }
    }
}
