use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::compact::{RestKind, gather_rest_bars, gather_token_runs};
use crate::error::Error;
use crate::merge::{merge, merge_structure};
use crate::metronome::{self, TickTable};
use crate::project::{METRONOME_VOICE, Project, STRUCTURE_VOICE, Voice};

/// Default header template. Substituted with the project's header items
/// plus `voicename`.
pub const TOP_TEMPLATE: &str = r#"\version "2.24.4"
\pointAndClickOff

\paper {
  top-system-spacing.basic-distance = #10
  score-system-spacing.basic-distance = #20
  system-system-spacing.basic-distance = #20
  last-bottom-spacing.basic-distance = #10
}

\header {
  title = "$title"
  subsubtitle = "$voicename"
  poet = "$poet"
  composer = "$composer"
  tagline = "Transcribed by $transcriber"
}

global = {
  \set Score.skipBars = ##t
  \override MultiMeasureRest.staff-position = #0
}
vglobal = {
  \slurDown
  \override Rest.staff-position = #0
}
"#;

/// Default footer template, wiring the emitted blocks into a display score
/// and a MIDI score. Substituted with the compiled voice's fields.
pub const BOTTOM_TEMPLATE: &str = r#"\score {
  <<
    \new Staff = "${labbr}" \with {
      instrumentName = "${name} "
      shortInstrumentName = "${abbr} "
    } <<
      \clef "$clef"
      \new Voice = "${labbr}" { \voiceOne \global \vglobal \${labbr}Music }
      \new Voice = "structure" { \voiceTwo \global \structure }
    >>
    ${iflyrics}\new Lyrics \lyricsto "${labbr}" \${labbr}Words
  >>
  \layout {}
}

\score {
  \unfoldRepeats << \${labbr}Midi \\ \structureTicks >>
  \midi {}
}
"#;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\{(\w+)\}|\$(\w+)").unwrap());

/// Replace `$name` and `${name}` placeholders from `items`, leaving unknown
/// placeholders untouched.
pub fn substitute(body: &str, items: &BTreeMap<String, String>) -> String {
    PLACEHOLDER
        .replace_all(body, |caps: &regex::Captures| {
            let key = caps.get(1).or_else(|| caps.get(2)).unwrap().as_str();
            match items.get(key) {
                Some(value) => value.clone(),
                None => caps.get(0).unwrap().as_str().to_string(),
            }
        })
        .to_string()
}

/// Assemble the complete LilyPond file for one voice: substituted header,
/// the shared structure and click-track blocks, the voice's display and
/// MIDI music, its lyrics when present, and the substituted footer.
pub fn render_voice(
    project: &Project,
    voicename: &str,
    ticks: &TickTable,
) -> Result<String, Error> {
    if voicename == STRUCTURE_VOICE || voicename == METRONOME_VOICE {
        return Err(Error::ReservedVoice(voicename.to_string()));
    }
    let voice = project.voice(voicename)?;
    let structure = project.voice(STRUCTURE_VOICE)?;
    if voice.bar_count() > structure.bar_count() {
        return Err(Error::StructureTooShort {
            voice: voicename.to_string(),
            structure_bars: structure.bar_count(),
            voice_bars: voice.bar_count(),
        });
    }

    let mut top_items = project.top.items.clone();
    top_items.insert("voicename".to_string(), voice.name.clone());
    let top = substitute(&project.top.body, &top_items);

    let mut bottom_items = BTreeMap::new();
    for (key, value) in [
        ("name", voice.name.as_str()),
        ("abbr", voice.abbr.as_str()),
        ("labbr", voice.labbr.as_str()),
        ("clef", voice.clef.as_str()),
        ("iflyrics", if voice.lyrics.is_some() { "" } else { "% " }),
    ] {
        bottom_items.insert(key.to_string(), value.to_string());
    }
    let bottom = substitute(&project.bottom.body, &bottom_items);

    let mut parts = vec![
        top,
        render_structure(structure),
        render_ticks(&structure.rhythm, ticks)?,
        render_music(voice),
        render_midi(voice, structure),
    ];
    if let Some(words) = render_words(voice) {
        parts.push(words);
    }
    parts.push(bottom);
    Ok(parts.join("\n"))
}

/// One merged string per bar, multi-line rhythm entry folded into the bar.
fn merged_bars(voice: &Voice) -> Vec<String> {
    voice
        .rhythm
        .iter()
        .enumerate()
        .map(|(i, rhythm)| merge(&voice.pitches[i], rhythm).join("\n"))
        .collect()
}

fn block(header: &str, bars: &[String], footer: &str) -> String {
    let mut lines = Vec::with_capacity(bars.len() + 2);
    lines.push(header.to_string());
    lines.extend(bars.iter().cloned());
    lines.push(footer.to_string());
    lines.join("\n")
}

fn render_structure(structure: &Voice) -> String {
    let bars = gather_rest_bars(&merged_bars(structure), RestKind::Spacer);
    block(
        &format!("structure = {}", structure.rwrapper[0]),
        &bars,
        &structure.rwrapper[1],
    )
}

fn render_ticks(structure_rhythm: &[String], table: &TickTable) -> Result<String, Error> {
    let bars = metronome::synthesize(structure_rhythm, table)?;
    let text = block(r"structureTicks = \drums {", &bars, "}");
    // Degraded bars are single full-measure rest tokens; runs of them
    // collapse here. Meter changes always yield distinct rest literals.
    Ok(gather_token_runs(&text, RestKind::Sounding.pattern()))
}

fn render_music(voice: &Voice) -> String {
    let bars = gather_rest_bars(&merged_bars(voice), RestKind::Sounding);
    block(
        &format!("{}Music = {}", voice.labbr, voice.rwrapper[0]),
        &bars,
        &voice.rwrapper[1],
    )
}

/// The MIDI variant carries the structure's repeats and tempo marks inline
/// so `\unfoldRepeats` can expand them. Sigils are retained through the
/// splice; the pitch merge strips them.
fn render_midi(voice: &Voice, structure: &Voice) -> String {
    let mut bars = Vec::with_capacity(voice.rhythm.len());
    for (i, rhythm) in voice.rhythm.iter().enumerate() {
        let spliced = merge_structure(&structure.rhythm[i], rhythm, false);
        bars.push(merge(&voice.pitches[i], &spliced).join("\n"));
    }
    let bars = gather_rest_bars(&bars, RestKind::Sounding);
    block(
        &format!("{}Midi = {}", voice.labbr, voice.rwrapper[0]),
        &bars,
        &voice.rwrapper[1],
    )
}

fn render_words(voice: &Voice) -> Option<String> {
    let lyrics = voice.lyrics.as_ref()?;
    let lwrapper = voice.lwrapper.as_ref()?;
    Some(block(
        &format!("{}Words = {}", voice.labbr, lwrapper[0]),
        lyrics,
        &lwrapper[1],
    ))
}
