use crate::*;

use std::collections::BTreeMap;

use regex::Regex;

use crate::metronome::{TickPattern, TickTable, synthesize};
use crate::project::lilysafe_name;
use crate::score::{render_voice, substitute};
use crate::token::{is_duration, last_time_signature, pitch_tokens, time_signature};

#[test]
fn test_duration_classification() {
    assert!(is_duration("1"));
    assert!(is_duration("2.."));
    assert!(is_duration("4*3"));
    assert!(is_duration("16"));
    assert!(is_duration("1*3/4"));
    assert!(is_duration(r"64\rest"));
    assert!(is_duration("128"));

    assert!(!is_duration("@4=60"));
    assert!(!is_duration("@4/4"));
    assert!(!is_duration("3"));
    assert!(!is_duration("12"));
    assert!(!is_duration(r"\time"));
    assert!(!is_duration("a4"));
}

#[test]
fn test_pitch_tokens_chords() {
    assert_eq!(
        pitch_tokens("a bes <c d ees>"),
        vec!["a", "bes", "<c d ees>"]
    );
    assert_eq!(pitch_tokens(""), Vec::<&str>::new());
}

#[test]
fn test_time_signature_scan() {
    assert_eq!(time_signature(r"\time @6/8"), Some("6/8"));
    assert_eq!(time_signature("no meter here"), None);

    let bars = vec![
        r"\time @3/4 1*3/4".to_string(),
        String::new(),
        r"\time @6/8 1*6/8".to_string(),
    ];
    assert_eq!(last_time_signature(&bars), Some("6/8"));
    assert_eq!(last_time_signature(&bars[..2]), Some("3/4"));
    assert_eq!(last_time_signature(&[]), None);
}

#[test]
fn test_merge_notes_and_chords() {
    let merged = merge("a bes <c d ees>", "@4=60 1 ~\n( 1 ) 1");
    assert_eq!(merged, vec!["4=60 a1 ~", "( bes1 ) <c d ees>1"]);
}

#[test]
fn test_merge_out_of_pitches() {
    let merged = merge("a bes", "@4=60 1 ~\n( 1 ) 1");
    assert_eq!(merged, vec!["4=60 a1 ~", "( bes1 )"]);
}

#[test]
fn test_merge_drops_lines_after_exhaustion() {
    let merged = merge("a", "4\n4\n4");
    assert_eq!(merged, vec!["a4", ""]);
}

#[test]
fn test_merge_token_conservation() {
    let merged = merge("a b c d e", "4 4\n4 4\n4 4 4");
    assert_eq!(merged, vec!["a4 b4", "c4 d4", "e4"]);
}

#[test]
fn test_merge_decorations_pass_through() {
    let merged = merge("", r#"\time @4/4 \bar "|.""#);
    assert_eq!(merged, vec![r#"\time 4/4 \bar "|.""#]);
}

#[test]
fn test_merge_empty_pitches_first_duration() {
    assert_eq!(merge("", "1 2"), vec![""]);
}

#[test]
fn test_merge_structure_transplants_decorations() {
    let spliced = merge_structure(r"\repeat volta @2 { 1*4/4 }", "4 4 4 4", false);
    assert_eq!(spliced, r"\repeat volta @2 { 4 4 4 4 }");

    let stripped = merge_structure(r"\repeat volta @2 { 1*4/4 }", "4 4 4 4", true);
    assert_eq!(stripped, r"\repeat volta 2 { 4 4 4 4 }");
}

#[test]
fn test_merge_structure_identity_without_decorations() {
    assert_eq!(merge_structure("1 1", "8 8 8 8", false), "8 8 8 8");
}

#[test]
fn test_merge_structure_no_durations_all_leading() {
    assert_eq!(merge_structure(r"\time @4/4", "2 2", false), r"\time @4/4 2 2");
}

#[test]
fn test_merge_structure_then_pitch_merge() {
    // MIDI path: splice with sigils retained, the pitch merge strips them.
    let spliced = merge_structure(r"\time @4/4 1", "1", false);
    assert_eq!(merge("a", &spliced), vec![r"\time 4/4 a1"]);
}

#[test]
fn test_gather_token_runs_basic() {
    let ptn = Regex::new(r"ab\w").unwrap();
    assert_eq!(gather_token_runs("foo abc abc", &ptn), "foo abc*2");
}

#[test]
fn test_gather_token_runs_multiple_runs() {
    let ptn = Regex::new(r"a\w\w").unwrap();
    let target = "xyz xyz abc abc zzq zzq ak9 ak9 ak9 foo abc";
    assert_eq!(
        gather_token_runs(target, &ptn),
        "xyz xyz abc*2 zzq zzq ak9*3 foo abc"
    );
}

#[test]
fn test_gather_token_runs_preserves_lines_and_whitespace() {
    let ptn = RestKind::Sounding.pattern();
    assert_eq!(
        gather_token_runs("\\time 4/4 a1\nR1 R1\nb1", ptn),
        "\\time 4/4 a1\nR1*2\nb1"
    );
    assert_eq!(gather_token_runs("  R1 R1 x", ptn), "  R1*2 x");
}

#[test]
fn test_gather_token_runs_requires_identity() {
    let ptn = RestKind::Sounding.pattern();
    assert_eq!(gather_token_runs("R1 R2", ptn), "R1 R2");
    assert_eq!(gather_token_runs("R1*4/4 R1*3/4", ptn), "R1*4/4 R1*3/4");
}

#[test]
fn test_gather_token_runs_idempotent() {
    let ptn = RestKind::Sounding.pattern();
    for text in [
        "R1 R1 R1",
        "R1 R1 R1*2",
        "a1 R1 b1",
        "\\time 4/4 R1\nR1 R1",
        "",
        "   ",
    ] {
        let once = gather_token_runs(text, ptn);
        assert_eq!(gather_token_runs(&once, ptn), once);
    }
}

#[test]
fn test_gather_rest_bars_collapses_run() {
    let bars = [r"\time 4/4 R1", "R1", "R1"];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Sounding),
        vec![r"\time 4/4 R1*3"]
    );
}

#[test]
fn test_gather_rest_bars_meter_change_starts_new_run() {
    let bars = [r"\time 4/4 R1", "R1", "R1*3/4"];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Sounding),
        vec![r"\time 4/4 R1*2", "R1*3/4*1"]
    );
}

#[test]
fn test_gather_rest_bars_append_end() {
    let bars = [r"\time 4/4 R1", "R1", "R1 }", "R1*3/4"];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Sounding),
        vec![r"\time 4/4 R1*3 }", "R1*3/4*1"]
    );
}

#[test]
fn test_gather_rest_bars_unmatched_terminates() {
    let bars = [r"\time 4/4 R1", "R1", "R1", "R1*3/4", "a1"];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Sounding),
        vec![r"\time 4/4 R1*3", "R1*3/4*1", "a1"]
    );
}

#[test]
fn test_gather_rest_bars_ignores_other_rest_kinds() {
    let bars = [r"\time 4/4 r1", "R1", "R1"];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Sounding),
        vec![r"\time 4/4 r1", "R1*2"]
    );
}

#[test]
fn test_gather_rest_bars_spacer_runs() {
    let bars = [
        r"\time 4/4 s1*4/4",
        "s1*4/4",
        r"\time 3/4 s1*3/4",
        "s1*3/4",
    ];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Spacer),
        vec![r"\time 4/4 s1*4/4*2", r"\time 3/4 s1*3/4*2"]
    );
}

#[test]
fn test_gather_rest_bars_mid_bar_match_closes_run() {
    let bars = ["s1*4/4", r"\repeat volta 2 { s1*4/4 }"];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Spacer),
        vec!["s1*4/4*1", r"\repeat volta 2 { s1*4/4 }"]
    );
}

#[test]
fn test_gather_rest_bars_no_false_positive_inside_words() {
    // 'bes1' must not read as a spacer rest.
    let bars = ["bes1", "s1", "s1"];
    assert_eq!(
        gather_rest_bars(&bars, RestKind::Spacer),
        vec!["bes1", "s1*2"]
    );
}

#[test]
fn test_metronome_four_four_pattern() {
    let table = TickTable::default();
    let bars = vec![r"\time @4/4 1*4/4".to_string(), "1*4/4".to_string()];
    let ticks = synthesize(&bars, &table).unwrap();
    assert_eq!(ticks[0], r"\time 4/4 wbh4 wbl4 wbl4 wbl4");
    // Meter carries forward to bars without their own declaration.
    assert_eq!(ticks[1], "wbh4 wbl4 wbl4 wbl4");
}

#[test]
fn test_metronome_unknown_meter_degrades_to_rest() {
    let table = TickTable::default();
    let bars = vec![
        r"\time @11/16 1*11/16".to_string(),
        "1*11/16".to_string(),
    ];
    let ticks = synthesize(&bars, &table).unwrap();
    assert_eq!(ticks[0], r"\time 11/16 R1*11/16");
    assert_eq!(ticks[1], "R1*11/16");
}

#[test]
fn test_metronome_missing_meter_is_fatal() {
    let table = TickTable::default();
    let bars = vec!["1".to_string()];
    assert!(matches!(
        synthesize(&bars, &table),
        Err(Error::NoMeter { bar: 1 })
    ));
}

#[test]
fn test_metronome_inherits_structure_decorations() {
    let table = TickTable::default();
    let bars = vec![r"\repeat volta @2 { \time @3/4 1*3/4 }".to_string()];
    let ticks = synthesize(&bars, &table).unwrap();
    assert_eq!(ticks[0], r"\repeat volta 2 { \time 3/4 wbh4 wbl4 wbl4 }");
}

#[test]
fn test_metronome_patches_partial_bars() {
    let table = TickTable::default();
    let bars = vec![r"\time @4/4 \partial @4 1*4/4".to_string()];
    let ticks = synthesize(&bars, &table).unwrap();
    assert_eq!(ticks[0], r"\time 4/4 \partial 4 r4 wbh4 wbl4 wbl4 wbl4");
}

#[test]
fn test_metronome_strips_key_signatures() {
    let table = TickTable::default();
    let bars = vec![r"\time @4/4 \key g \major 1*4/4".to_string()];
    let ticks = synthesize(&bars, &table).unwrap();
    assert_eq!(ticks[0], r"\time 4/4 wbh4 wbl4 wbl4 wbl4");
}

#[test]
fn test_tick_table_overrides() {
    let mut table = TickTable::default();
    table.insert(
        "11/16",
        TickPattern {
            pitches: "wbh wbl wbl".to_string(),
            rhythm: "8 8 8*7/16".to_string(),
        },
    );
    let bars = vec![r"\time @11/16 1*11/16".to_string()];
    let ticks = synthesize(&bars, &table).unwrap();
    assert_eq!(ticks[0], r"\time 11/16 wbh8 wbl8 wbl8*7/16");
}

#[test]
fn test_lilysafe_name_spells_digits() {
    assert_eq!(lilysafe_name("S1"), "SOne");
    assert_eq!(lilysafe_name("mm"), "mm");
    assert_eq!(lilysafe_name("B2b"), "BTwob");
}

#[test]
fn test_project_bar_editing_keeps_lists_parallel() {
    let mut project = Project::new();
    project
        .add_voice("soprano", Voice::new("Soprano I", "S1", "c''", "treble", true))
        .unwrap();

    project
        .set_bar("soprano", 1, "a b c d", "4 4 4 4", Some("la la la la"))
        .unwrap();
    project.set_bar("soprano", 2, "R", "1*4/4", None).unwrap();

    let voice = project.voice("soprano").unwrap();
    assert_eq!(voice.bar_count(), 2);
    assert_eq!(voice.pitches.len(), 2);
    assert_eq!(voice.lyrics.as_ref().unwrap().len(), 2);

    assert!(matches!(
        project.set_bar("soprano", 9, "a", "4", None),
        Err(Error::BarOutOfRange { .. })
    ));
}

#[test]
fn test_project_fill_rest_bar() {
    let mut project = Project::new();
    project
        .add_voice("alto", Voice::new("Alto", "A", "c'", "treble", false))
        .unwrap();
    project.fill_rest_bar("alto", 1).unwrap();

    let voice = project.voice("alto").unwrap();
    assert_eq!(voice.pitches[0], "R");
    assert_eq!(voice.rhythm[0], "1*4/4");

    // The structure voice gets a spacer instead.
    project.fill_rest_bar("structure", 1).unwrap();
    let structure = project.voice("structure").unwrap();
    assert_eq!(structure.pitches[0], "s");
}

#[test]
fn test_project_insert_rests_uses_current_meter() {
    let mut project = Project::new();
    project
        .set_bar("structure", 2, "s", r"\time @3/4 1*3/4", None)
        .unwrap();
    project
        .add_voice("alto", Voice::new("Alto", "A", "c'", "treble", false))
        .unwrap();
    project.set_bar("alto", 1, "a", "2.", None).unwrap();
    project.set_bar("alto", 2, "b", "2.", None).unwrap();

    let meter = project.insert_rests("alto", 3, 4).unwrap();
    assert_eq!(meter, "3/4");
    let voice = project.voice("alto").unwrap();
    assert_eq!(voice.bar_count(), 4);
    assert_eq!(voice.rhythm[2], "1*3/4");
    assert_eq!(voice.pitches[3], "R");
}

#[test]
fn test_project_missing_meter() {
    let mut project = Project::new();
    project.set_bar("structure", 1, "s", "1", None).unwrap();
    project
        .add_voice("alto", Voice::new("Alto", "A", "c'", "treble", false))
        .unwrap();
    assert!(matches!(
        project.insert_rests("alto", 1, 2),
        Err(Error::NoMeter { .. })
    ));
}

#[test]
fn test_project_delete_and_paste() {
    let mut project = Project::new();
    project
        .add_voice("alto", Voice::new("Alto", "A", "c'", "treble", false))
        .unwrap();
    for (bar, pitch) in ["a", "b", "c", "d"].iter().enumerate() {
        project.set_bar("alto", bar + 1, pitch, "1", None).unwrap();
    }

    project.delete_bars("alto", 2, 3).unwrap();
    let voice = project.voice("alto").unwrap();
    assert_eq!(voice.pitches, vec!["a", "d"]);

    project
        .add_voice("tenor", Voice::new("Tenor", "T", "c", "treble_8", false))
        .unwrap();
    project.paste("alto", 1, 2, "tenor", 1).unwrap();
    let tenor = project.voice("tenor").unwrap();
    assert_eq!(tenor.pitches, vec!["a", "d"]);
    assert_eq!(tenor.rhythm.len(), 2);
}

#[test]
fn test_project_reserved_and_duplicate_voices() {
    let mut project = Project::new();
    assert!(matches!(
        project.add_voice("metronome", Voice::new("MM", "mm", "c", "percussion", false)),
        Err(Error::ReservedVoice(_))
    ));
    assert!(matches!(
        project.add_voice("structure", Voice::structure()),
        Err(Error::DuplicateVoice(_))
    ));
}

#[test]
fn test_substitute_placeholders() {
    let mut items = BTreeMap::new();
    items.insert("title".to_string(), "Mass in B".to_string());
    assert_eq!(
        substitute("x $title y ${title} z", &items),
        "x Mass in B y Mass in B z"
    );
    assert_eq!(substitute("keep $unknown", &items), "keep $unknown");
}

#[test]
fn test_render_voice_end_to_end() {
    let mut project = Project::new();
    project
        .add_voice("alto", Voice::new("Alto", "A1", "c'", "treble", true))
        .unwrap();
    project
        .set_bar("alto", 1, "a bes c d", "4 4 4 4", Some("A -- men"))
        .unwrap();

    let output = render_voice(&project, "alto", &TickTable::default()).unwrap();

    assert!(output.contains(r#"subsubtitle = "Alto""#));
    assert!(output.contains(r"structure = { \hideNotes"));
    assert!(output.contains(r"\time 4/4 s1*1"));
    assert!(output.contains(r"structureTicks = \drums {"));
    assert!(output.contains(r"\time 4/4 wbh4 wbl4 wbl4 wbl4"));
    assert!(output.contains(r"AOneMusic = \relative c' {"));
    assert!(output.contains("a4 bes4 c4 d4"));
    assert!(output.contains(r"AOneMidi = \relative c' {"));
    assert!(output.contains(r"\time 4/4 a4 bes4 c4 d4"));
    assert!(output.contains(r"AOneWords = \lyricmode {"));
    assert!(output.contains("A -- men"));
    assert!(output.contains(r#"\new Voice = "AOne""#));
    assert!(output.contains(r#"\lyricsto "AOne""#));
    assert!(output.contains(r"\unfoldRepeats << \AOneMidi \\ \structureTicks >>"));
}

#[test]
fn test_render_voice_without_lyrics_comments_out_lyric_wiring() {
    let mut project = Project::new();
    project
        .add_voice("bass", Voice::new("Bass", "B", "c", "bass", false))
        .unwrap();
    project.set_bar("bass", 1, "c e g c", "4 4 4 4", None).unwrap();

    let output = render_voice(&project, "bass", &TickTable::default()).unwrap();
    assert!(output.contains(r#"% \new Lyrics \lyricsto "B""#));
    assert!(!output.contains("BWords ="));
}

#[test]
fn test_render_voice_compacts_rest_bars() {
    let mut project = Project::new();
    project.fill_rest_bar("structure", 2).unwrap();
    project.fill_rest_bar("structure", 3).unwrap();
    project.fill_rest_bar("structure", 4).unwrap();
    project
        .add_voice("alto", Voice::new("Alto", "A", "c'", "treble", false))
        .unwrap();
    project.set_bar("alto", 1, "a b c d", "4 4 4 4", None).unwrap();
    project.insert_rests("alto", 2, 4).unwrap();

    let output = render_voice(&project, "alto", &TickTable::default()).unwrap();
    assert!(output.contains("R1*4/4*3"));
    assert!(output.contains("s1*4/4*3"));
}

#[test]
fn test_render_voice_guards() {
    let mut project = Project::new();
    project
        .add_voice("alto", Voice::new("Alto", "A", "c'", "treble", false))
        .unwrap();
    project.set_bar("alto", 1, "a", "1", None).unwrap();
    project.set_bar("alto", 2, "b", "1", None).unwrap();

    let table = TickTable::default();
    assert!(matches!(
        render_voice(&project, "structure", &table),
        Err(Error::ReservedVoice(_))
    ));
    assert!(matches!(
        render_voice(&project, "alto", &table),
        Err(Error::StructureTooShort { .. })
    ));
    assert!(matches!(
        render_voice(&project, "nobody", &table),
        Err(Error::UnknownVoice(_))
    ));
}
