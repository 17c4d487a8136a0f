use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::score::{BOTTOM_TEMPLATE, TOP_TEMPLATE};
use crate::token::last_time_signature;

/// Reserved voice carrying time signatures, tempos, and repeats for all voices.
pub const STRUCTURE_VOICE: &str = "structure";
/// Reserved name of the synthesized click track.
pub const METRONOME_VOICE: &str = "metronome";

const SUPPORTED_CLEFS: [&str; 6] = ["treble", "treble_8", "bass", "alto", "tenor", "percussion"];

/// One musical part. The `pitches`, `rhythm`, and (when present) `lyrics`
/// lists are bar-parallel and always the same length.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Voice {
    pub name: String,
    pub abbr: String,
    pub labbr: String,
    pub clef: String,
    pub rwrapper: [String; 2],
    pub pitches: Vec<String>,
    pub rhythm: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lwrapper: Option<[String; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyrics: Option<Vec<String>>,
}

impl Voice {
    pub fn new(name: &str, abbr: &str, rel: &str, clef: &str, has_lyrics: bool) -> Self {
        let clef = if SUPPORTED_CLEFS.contains(&clef) {
            clef
        } else {
            log::warn!("clef must be one of {SUPPORTED_CLEFS:?}, falling back to treble");
            "treble"
        };
        Voice {
            name: name.to_string(),
            abbr: abbr.to_string(),
            labbr: lilysafe_name(abbr),
            clef: clef.to_string(),
            rwrapper: [format!("\\relative {rel} {{"), "}".to_string()],
            pitches: Vec::new(),
            rhythm: Vec::new(),
            lwrapper: has_lyrics.then(|| [r"\lyricmode {".to_string(), "}".to_string()]),
            lyrics: has_lyrics.then(Vec::new),
        }
    }

    /// The shared structure voice, seeded with a single 4/4 bar.
    pub fn structure() -> Self {
        Voice {
            name: "Structure".to_string(),
            abbr: "struct".to_string(),
            labbr: "struct".to_string(),
            clef: "treble".to_string(),
            rwrapper: [r"{ \hideNotes".to_string(), r"\unHideNotes }".to_string()],
            pitches: vec!["s".to_string()],
            rhythm: vec![r"\time @4/4 1".to_string()],
            lwrapper: None,
            lyrics: None,
        }
    }

    pub fn bar_count(&self) -> usize {
        self.rhythm.len()
    }
}

/// Template text with `$name`/`${name}` placeholders and its substitution map.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateBlock {
    pub body: String,
    #[serde(default)]
    pub items: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub voices: BTreeMap<String, Voice>,
    pub top: TemplateBlock,
    pub bottom: TemplateBlock,
}

impl Default for Project {
    fn default() -> Self {
        Self::new()
    }
}

impl Project {
    pub fn new() -> Self {
        let mut voices = BTreeMap::new();
        voices.insert(STRUCTURE_VOICE.to_string(), Voice::structure());

        let mut items = BTreeMap::new();
        for (key, value) in [
            ("title", "Excellent Title"),
            ("poet", "Famous Poet"),
            ("composer", "Famous Composer"),
            ("transcriber", "Your Name Here"),
        ] {
            items.insert(key.to_string(), value.to_string());
        }

        Project {
            voices,
            top: TemplateBlock {
                body: TOP_TEMPLATE.to_string(),
                items,
            },
            bottom: TemplateBlock {
                body: BOTTOM_TEMPLATE.to_string(),
                items: BTreeMap::new(),
            },
        }
    }

    pub fn voice(&self, name: &str) -> Result<&Voice, Error> {
        self.voices
            .get(name)
            .ok_or_else(|| Error::UnknownVoice(name.to_string()))
    }

    pub fn voice_mut(&mut self, name: &str) -> Result<&mut Voice, Error> {
        self.voices
            .get_mut(name)
            .ok_or_else(|| Error::UnknownVoice(name.to_string()))
    }

    pub fn add_voice(&mut self, key: &str, voice: Voice) -> Result<(), Error> {
        if key == METRONOME_VOICE {
            return Err(Error::ReservedVoice(key.to_string()));
        }
        if self.voices.contains_key(key) {
            return Err(Error::DuplicateVoice(key.to_string()));
        }
        self.voices.insert(key.to_string(), voice);
        Ok(())
    }

    pub fn bar_counts(&self) -> Vec<(&str, usize)> {
        self.voices
            .iter()
            .map(|(name, voice)| (name.as_str(), voice.bar_count()))
            .collect()
    }

    /// The meter in effect at 1-based `bar`, from the structure's rhythm.
    pub fn meter_before(&self, bar: usize) -> Result<String, Error> {
        let structure = self.voice(STRUCTURE_VOICE)?;
        let end = bar.min(structure.rhythm.len());
        last_time_signature(&structure.rhythm[..end])
            .map(str::to_string)
            .ok_or(Error::NoMeter { bar })
    }

    /// Overwrite 1-based `bar`, or append when `bar` is one past the end.
    pub fn set_bar(
        &mut self,
        voicename: &str,
        bar: usize,
        pitches: &str,
        rhythm: &str,
        lyrics: Option<&str>,
    ) -> Result<(), Error> {
        let voice = self.voice_mut(voicename)?;
        let nbars = voice.bar_count();
        if bar == 0 || bar > nbars + 1 {
            return Err(Error::BarOutOfRange {
                voice: voicename.to_string(),
                bar,
                nbars,
            });
        }
        if bar == nbars + 1 {
            voice.pitches.push(pitches.to_string());
            voice.rhythm.push(rhythm.to_string());
            if let Some(list) = &mut voice.lyrics {
                list.push(lyrics.unwrap_or("").to_string());
            }
        } else {
            voice.pitches[bar - 1] = pitches.to_string();
            voice.rhythm[bar - 1] = rhythm.to_string();
            if let Some(list) = &mut voice.lyrics {
                list[bar - 1] = lyrics.unwrap_or("").to_string();
            }
        }
        Ok(())
    }

    /// Fill one bar with a full-measure rest for the meter in effect: a
    /// spacer for the structure voice, a sounding rest elsewhere. Returns
    /// the meter used.
    pub fn fill_rest_bar(&mut self, voicename: &str, bar: usize) -> Result<String, Error> {
        let meter = self.meter_before(bar)?;
        let pitch = if voicename == STRUCTURE_VOICE { "s" } else { "R" };
        let rhythm = format!("1*{meter}");
        self.set_bar(voicename, bar, pitch, &rhythm, Some(""))?;
        Ok(meter)
    }

    /// Insert full-measure rest bars from `firstbar` to `lastbar` inclusive.
    pub fn insert_rests(
        &mut self,
        voicename: &str,
        firstbar: usize,
        lastbar: usize,
    ) -> Result<String, Error> {
        check_range(voicename, firstbar, lastbar)?;
        let meter = self.meter_before(firstbar)?;
        let pitch = if voicename == STRUCTURE_VOICE { "s" } else { "R" };
        let barlength = format!("1*{meter}");
        let nbars = lastbar - firstbar + 1;
        let at = firstbar - 1;

        let voice = self.voice_mut(voicename)?;
        insert_range(&mut voice.pitches, vec![pitch.to_string(); nbars], at);
        insert_range(&mut voice.rhythm, vec![barlength; nbars], at);
        if let Some(list) = &mut voice.lyrics {
            insert_range(list, vec![String::new(); nbars], at);
        }
        Ok(meter)
    }

    /// Delete bars `firstbar` to `lastbar` inclusive.
    pub fn delete_bars(
        &mut self,
        voicename: &str,
        firstbar: usize,
        lastbar: usize,
    ) -> Result<(), Error> {
        check_range(voicename, firstbar, lastbar)?;
        let voice = self.voice_mut(voicename)?;
        let pitches = cut_range(&voice.pitches, firstbar - 1, lastbar - 1);
        let rhythm = cut_range(&voice.rhythm, firstbar - 1, lastbar - 1);
        voice.pitches = pitches;
        voice.rhythm = rhythm;
        if let Some(list) = voice.lyrics.take() {
            voice.lyrics = Some(cut_range(&list, firstbar - 1, lastbar - 1));
        }
        Ok(())
    }

    /// Paste bars `firstbar..=lastbar` of `from` into `to` starting at
    /// 1-based `at`, replacing what is there and extending the target as
    /// needed. Lyrics travel only when both voices carry them.
    pub fn paste(
        &mut self,
        from: &str,
        firstbar: usize,
        lastbar: usize,
        to: &str,
        at: usize,
    ) -> Result<(), Error> {
        check_range(from, firstbar, lastbar)?;
        let source = self.voice(from)?.clone();
        if lastbar > source.bar_count() {
            return Err(Error::BarOutOfRange {
                voice: from.to_string(),
                bar: lastbar,
                nbars: source.bar_count(),
            });
        }
        let target = self.voice_mut(to)?;
        if at == 0 || at > target.bar_count() + 1 {
            return Err(Error::BarOutOfRange {
                voice: to.to_string(),
                bar: at,
                nbars: target.bar_count(),
            });
        }

        let i0 = firstbar - 1;
        let i1 = lastbar;
        let j0 = at - 1;
        let j1 = j0 + (i1 - i0);

        splice_range(&mut target.pitches, j0, j1, &source.pitches[i0..i1]);
        splice_range(&mut target.rhythm, j0, j1, &source.rhythm[i0..i1]);
        if let (Some(tl), Some(sl)) = (&mut target.lyrics, &source.lyrics) {
            splice_range(tl, j0, j1, &sl[i0..i1]);
        }
        Ok(())
    }

    pub fn view_bar(&self, voicename: &str, bar: usize) -> Result<String, Error> {
        let voice = self.voice(voicename)?;
        if bar == 0 || bar > voice.bar_count() {
            return Err(Error::BarOutOfRange {
                voice: voicename.to_string(),
                bar,
                nbars: voice.bar_count(),
            });
        }
        let i = bar - 1;
        let mut view = format!(
            "{voicename} bar {bar}:\n{}\n{}",
            voice.pitches[i], voice.rhythm[i]
        );
        if let Some(lyrics) = &voice.lyrics {
            view.push('\n');
            view.push_str(&lyrics[i]);
        }
        Ok(view)
    }
}

fn check_range(voicename: &str, firstbar: usize, lastbar: usize) -> Result<(), Error> {
    if firstbar == 0 || lastbar < firstbar {
        return Err(Error::Usage(format!(
            "bad bar range {firstbar} thru {lastbar} for {voicename}"
        )));
    }
    Ok(())
}

fn cut_range<T: Clone>(seq: &[T], i0: usize, i1: usize) -> Vec<T> {
    let mut out = seq[..i0.min(seq.len())].to_vec();
    if i1 + 1 < seq.len() {
        out.extend_from_slice(&seq[i1 + 1..]);
    }
    out
}

fn insert_range<T: Clone>(seq: &mut Vec<T>, values: Vec<T>, at: usize) {
    let at = at.min(seq.len());
    seq.splice(at..at, values);
}

fn splice_range<T: Clone>(seq: &mut Vec<T>, j0: usize, j1: usize, values: &[T]) {
    let end = j1.min(seq.len());
    let j0 = j0.min(seq.len());
    seq.splice(j0..end, values.iter().cloned());
}

/// Spell digits out so an abbreviation survives as a LilyPond identifier.
pub fn lilysafe_name(name: &str) -> String {
    const DIGITS: [&str; 10] = [
        "Zero", "One", "Two", "Three", "Four", "Five", "Six", "Seven", "Eight", "Nine",
    ];
    let mut safe = String::with_capacity(name.len());
    for c in name.chars() {
        if let Some(d) = c.to_digit(10) {
            safe.push_str(DIGITS[d as usize]);
        } else if c.is_ascii_alphabetic() {
            safe.push(c);
        }
    }
    safe
}
