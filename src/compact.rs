use once_cell::sync::Lazy;
use regex::Regex;

/// Full-measure sounding rest: 'R' + digits + optional length modifiers.
static SOUNDING_REST: Lazy<Regex> = Lazy::new(|| Regex::new(r"R\d+[0-9.*/]*").unwrap());

/// Full-measure spacer rest: 's' + the same suffix.
static SPACER_REST: Lazy<Regex> = Lazy::new(|| Regex::new(r"s\d+[0-9.*/]*").unwrap());

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

/// Which flavor of full-measure rest a compaction pass looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestKind {
    /// `R1`-style rests, used on ordinary voices.
    Sounding,
    /// `s1`-style spacers, used on the structure voice.
    Spacer,
}

impl RestKind {
    pub fn pattern(self) -> &'static Regex {
        match self {
            RestKind::Sounding => &SOUNDING_REST,
            RestKind::Spacer => &SPACER_REST,
        }
    }
}

fn prefix_match(ptn: &Regex, tok: &str) -> bool {
    ptn.find(tok).is_some_and(|m| m.start() == 0)
}

fn full_token_match(ptn: &Regex, tok: &str) -> bool {
    ptn.find(tok)
        .is_some_and(|m| m.start() == 0 && m.end() == tok.len())
}

/// Replace every maximal run of two or more identical, whitespace-separated,
/// pattern-matching tokens in `text` with `token*N`. Whitespace outside runs
/// (line breaks included) is left untouched. Runs require exact token
/// equality, not just pattern membership. The result is a fixpoint, so
/// re-applying is a no-op.
pub fn gather_token_runs(text: &str, ptn: &Regex) -> String {
    let mut current = text.to_string();
    loop {
        let next = gather_once(&current, ptn);
        if next == current {
            return next;
        }
        current = next;
    }
}

fn gather_once(text: &str, ptn: &Regex) -> String {
    let words: Vec<regex::Match> = WORD.find_iter(text).collect();

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut i = 0;
    while i < words.len() {
        let word = &words[i];
        let mut j = i + 1;
        if prefix_match(ptn, word.as_str()) {
            while j < words.len() && words[j].as_str() == word.as_str() {
                j += 1;
            }
        }
        if j - i >= 2 {
            out.push_str(&text[cursor..word.start()]);
            out.push_str(word.as_str());
            out.push('*');
            out.push_str(&(j - i).to_string());
            cursor = words[j - 1].end();
        }
        i = j;
    }
    out.push_str(&text[cursor..]);
    out
}

/// How one bar relates to the run in progress (if any).
#[derive(Debug, Clone, PartialEq, Eq)]
enum Transition {
    /// No usable match; passes through and terminates any run.
    Unmatched,
    /// Exactly one match, positioned as the bar's last content.
    Begin(String),
    /// The bar is solely a repetition of the run's identity literal.
    Append,
    /// The identity literal leads the bar with trailing content after it.
    AppendEnd(String),
    /// A different rest literal, positioned as the bar's last content.
    EndBegin(String),
    /// Any other non-extending match while a run is open.
    End,
}

fn classify_bar(bar: &str, ptn: &Regex, exact: Option<&str>) -> Transition {
    let toks: Vec<&str> = bar.split_whitespace().collect();
    let hits: Vec<usize> = toks
        .iter()
        .enumerate()
        .filter(|(_, t)| full_token_match(ptn, t))
        .map(|(i, _)| i)
        .collect();
    if hits.len() != 1 {
        return Transition::Unmatched;
    }
    let at = hits[0];
    let matched = toks[at];
    let is_last = at + 1 == toks.len();

    match exact {
        None => {
            if is_last {
                Transition::Begin(matched.to_string())
            } else {
                Transition::Unmatched
            }
        }
        Some(identity) if matched == identity => {
            if at == 0 && is_last {
                Transition::Append
            } else if at == 0 {
                Transition::AppendEnd(toks[1..].join(" "))
            } else {
                Transition::End
            }
        }
        Some(_) => {
            if is_last {
                Transition::EndBegin(matched.to_string())
            } else {
                Transition::End
            }
        }
    }
}

#[derive(Debug)]
enum State {
    Idle,
    Gathering {
        startbar: String,
        identity: String,
        count: usize,
    },
}

fn close_run(startbar: &str, count: usize, tail: Option<&str>) -> String {
    // The startbar's matching token is its last token, so the whole bar
    // is the prefix of the multi-measure rest.
    let mut bar = format!("{startbar}*{count}");
    if let Some(tail) = tail {
        if !tail.is_empty() {
            bar.push(' ');
            bar.push_str(tail);
        }
    }
    bar
}

/// Consolidate runs of full-measure rest bars in an ordered bar list into
/// single multiplicity-annotated bars. The run identity is the exact rest
/// literal of the opening bar; a differing literal (e.g. after a meter
/// change, where the bar length annotation differs) never extends a run.
pub fn gather_rest_bars<S: AsRef<str>>(bars: &[S], kind: RestKind) -> Vec<String> {
    let ptn = kind.pattern();
    let mut out = Vec::new();
    let mut state = State::Idle;

    for bar in bars {
        let bar = bar.as_ref();
        let exact = match &state {
            State::Idle => None,
            State::Gathering { identity, .. } => Some(identity.as_str()),
        };
        match classify_bar(bar, ptn, exact) {
            Transition::Begin(identity) => {
                state = State::Gathering {
                    startbar: bar.trim().to_string(),
                    identity,
                    count: 1,
                };
            }
            Transition::Append => {
                if let State::Gathering { count, .. } = &mut state {
                    *count += 1;
                }
            }
            Transition::AppendEnd(tail) => {
                if let State::Gathering { startbar, count, .. } =
                    std::mem::replace(&mut state, State::Idle)
                {
                    out.push(close_run(&startbar, count + 1, Some(&tail)));
                }
            }
            Transition::EndBegin(identity) => {
                if let State::Gathering { startbar, count, .. } =
                    std::mem::replace(&mut state, State::Idle)
                {
                    out.push(close_run(&startbar, count, None));
                }
                state = State::Gathering {
                    startbar: bar.trim().to_string(),
                    identity,
                    count: 1,
                };
            }
            Transition::End | Transition::Unmatched => {
                if let State::Gathering { startbar, count, .. } =
                    std::mem::replace(&mut state, State::Idle)
                {
                    out.push(close_run(&startbar, count, None));
                }
                out.push(bar.to_string());
            }
        }
    }

    if let State::Gathering { startbar, count, .. } = state {
        out.push(close_run(&startbar, count, None));
    }
    out
}
