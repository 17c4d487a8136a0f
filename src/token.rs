use once_cell::sync::Lazy;
use regex::Regex;

/// Prefix reserved for decoration tokens that would otherwise read as
/// durations (tempo figures, repeat counts, tuplet fractions, partials).
/// Callers must supply it; the mergers strip it on output.
pub const ESCAPE_SIGIL: char = '@';

/// Canonical note-length numerals followed by a non-digit or end of token.
static NOTE_DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(1|2|4|8|16|32|64|128)(\D|$)").unwrap());

/// Single pitches or chords in <>'s.
static PITCH_OR_CHORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^<>]+>|\S+").unwrap());

/// A time signature command with its escaped num/denom pair.
static TIME_SIGNATURE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\time\s+@(\d+/\d+)").unwrap());

/// A rhythm token, classified by the duration grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RhythmToken {
    /// Carries a note length and must be paired with exactly one pitch or chord.
    Duration(String),
    /// Everything else, kept verbatim apart from the escape sigil.
    Decoration(String),
}

impl RhythmToken {
    pub fn classify(tok: &str) -> Self {
        if is_duration(tok) {
            RhythmToken::Duration(tok.to_string())
        } else {
            RhythmToken::Decoration(tok.to_string())
        }
    }

    pub fn text(&self) -> &str {
        match self {
            RhythmToken::Duration(s) | RhythmToken::Decoration(s) => s,
        }
    }
}

/// Purely syntactic; an unescaped decoration that collides with the
/// grammar (e.g. `4=60` without its sigil) is misread as a duration.
pub fn is_duration(tok: &str) -> bool {
    NOTE_DURATION.is_match(tok)
}

pub fn strip_sigil(tok: &str) -> &str {
    tok.strip_prefix(ESCAPE_SIGIL).unwrap_or(tok)
}

/// Split a pitch string into chord and single-pitch tokens, in order.
pub fn pitch_tokens(pitches: &str) -> Vec<&str> {
    PITCH_OR_CHORD.find_iter(pitches).map(|m| m.as_str()).collect()
}

/// Split a rhythm string into lines of whitespace-separated tokens,
/// preserving the line structure.
pub fn rhythm_lines(text: &str) -> Vec<Vec<&str>> {
    text.split('\n')
        .map(|line| line.split_whitespace().collect())
        .collect()
}

/// The meter declared in `text`, if any. The last declaration wins.
pub fn time_signature(text: &str) -> Option<&str> {
    TIME_SIGNATURE
        .captures_iter(text)
        .last()
        .map(|caps| caps.get(1).unwrap().as_str())
}

/// Scan a list of bars backwards for the most recent meter declaration.
pub fn last_time_signature(bars: &[String]) -> Option<&str> {
    bars.iter().rev().find_map(|bar| time_signature(bar))
}
