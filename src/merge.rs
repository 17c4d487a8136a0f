use crate::token::{RhythmToken, is_duration, pitch_tokens, rhythm_lines, strip_sigil};

/// Merge a pitch string into a (possibly multi-line) rhythm string.
///
/// Each duration-bearing token gets the next unconsumed pitch or chord
/// prepended with no separator; decorations pass through with the escape
/// sigil stripped. One pitch cursor is shared across all lines. Running
/// out of pitches is not an error: the current line is kept up to the
/// exhaustion point and all later lines are dropped, so the output stays
/// syntactically balanced.
pub fn merge(pitches: &str, rhythm: &str) -> Vec<String> {
    let plist = pitch_tokens(pitches);

    let mut merged = Vec::new();
    let mut pindex = 0;
    for line in rhythm_lines(rhythm) {
        let mut mlist: Vec<String> = Vec::new();
        let mut out_of_pitches = false;
        for tok in line {
            match RhythmToken::classify(tok) {
                RhythmToken::Duration(dur) => match plist.get(pindex) {
                    Some(pitch) => {
                        mlist.push(format!("{pitch}{dur}"));
                        pindex += 1;
                    }
                    None => {
                        out_of_pitches = true;
                        break;
                    }
                },
                RhythmToken::Decoration(dec) => mlist.push(strip_sigil(&dec).to_string()),
            }
        }
        merged.push(mlist.join(" "));
        if out_of_pitches {
            break;
        }
    }
    merged
}

/// Splice a voice's bar rhythm into the structural decorations carried by
/// the structure voice's rhythm for the same bar: the structure's leading
/// decorations (everything before its first duration-bearing token), then
/// the voice's own tokens, then the structure's trailing tokens (everything
/// after its last duration-bearing token). The voice's durations are never
/// touched. A structure bar with no durations contributes all of its tokens
/// as leading decoration.
///
/// `strip_sigils` removes escape sigils during the reconstruction; use it
/// when the result goes straight to percussion/MIDI-internal output rather
/// than through [`merge`].
pub fn merge_structure(structure: &str, voice: &str, strip_sigils: bool) -> String {
    let stoks: Vec<&str> = structure.split_whitespace().collect();
    let (leading, trailing): (&[&str], &[&str]) =
        match stoks.iter().position(|t| is_duration(t)) {
            None => (&stoks[..], &[]),
            Some(first) => {
                let last = stoks.iter().rposition(|t| is_duration(t)).unwrap();
                (&stoks[..first], &stoks[last + 1..])
            }
        };

    fn keep(tok: &str, strip: bool) -> &str {
        if strip { strip_sigil(tok) } else { tok }
    }

    let mut lines: Vec<String> = voice
        .lines()
        .map(|line| {
            line.split_whitespace()
                .map(|t| keep(t, strip_sigils))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect();
    if lines.is_empty() {
        lines.push(String::new());
    }

    let lead = leading
        .iter()
        .map(|t| keep(t, strip_sigils))
        .collect::<Vec<_>>()
        .join(" ");
    let trail = trailing
        .iter()
        .map(|t| keep(t, strip_sigils))
        .collect::<Vec<_>>()
        .join(" ");

    if !lead.is_empty() {
        let first = &mut lines[0];
        *first = if first.is_empty() {
            lead
        } else {
            format!("{lead} {first}")
        };
    }
    if !trail.is_empty() {
        let last = lines.last_mut().unwrap();
        *last = if last.is_empty() {
            trail
        } else {
            format!("{last} {trail}")
        };
    }

    lines.join("\n")
}
