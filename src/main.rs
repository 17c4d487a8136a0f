use std::fs;
use std::path::{Path, PathBuf};
use std::process::{self, Command};

use argh::FromArgs;

use lilypond_copyist::Error;
use lilypond_copyist::metronome::TickTable;
use lilypond_copyist::project::{Project, STRUCTURE_VOICE, Voice};
use lilypond_copyist::score::render_voice;
use lilypond_copyist::store::SnapshotStore;

/// Bar-by-bar transcription assistant for LilyPond
#[derive(FromArgs)]
struct Args {
    /// path to the project folder (created if missing)
    #[argh(positional)]
    project: String,

    #[argh(subcommand)]
    command: Cmd,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Cmd {
    Compile(CompileCmd),
    Bars(BarsCmd),
    View(ViewCmd),
    Set(SetCmd),
    Rest(RestCmd),
    Delete(DeleteCmd),
    Paste(PasteCmd),
    Meta(MetaCmd),
    AddVoice(AddVoiceCmd),
    Undo(UndoCmd),
    Redo(RedoCmd),
}

/// compile one voice to a .ly file
#[derive(FromArgs)]
#[argh(subcommand, name = "compile")]
struct CompileCmd {
    /// voice to compile
    #[argh(positional)]
    voice: String,

    /// run lilypond on the result
    #[argh(switch)]
    typeset: bool,
}

/// show bar counts for each voice
#[derive(FromArgs)]
#[argh(subcommand, name = "bars")]
struct BarsCmd {}

/// print pitches, rhythm, and lyrics for a range of bars
#[derive(FromArgs)]
#[argh(subcommand, name = "view")]
struct ViewCmd {
    /// voice to view
    #[argh(positional)]
    voice: String,

    /// first bar
    #[argh(positional)]
    first: usize,

    /// last bar
    #[argh(positional)]
    last: usize,
}

/// set the contents of one bar (appends when bar is one past the end)
#[derive(FromArgs)]
#[argh(subcommand, name = "set")]
struct SetCmd {
    /// voice to edit
    #[argh(positional)]
    voice: String,

    /// bar number, 1-based
    #[argh(positional)]
    bar: usize,

    /// pitch tokens for the bar
    #[argh(option)]
    pitches: Option<String>,

    /// rhythm tokens for the bar
    #[argh(option)]
    rhythm: Option<String>,

    /// lyric text for the bar
    #[argh(option)]
    lyrics: Option<String>,

    /// fill the bar with a full-measure rest instead
    #[argh(switch)]
    rest: bool,
}

/// insert full-measure rest bars over a range
#[derive(FromArgs)]
#[argh(subcommand, name = "rest")]
struct RestCmd {
    /// voice to edit
    #[argh(positional)]
    voice: String,

    /// first bar
    #[argh(positional)]
    first: usize,

    /// last bar
    #[argh(positional)]
    last: usize,
}

/// delete a range of bars
#[derive(FromArgs)]
#[argh(subcommand, name = "delete")]
struct DeleteCmd {
    /// voice to edit
    #[argh(positional)]
    voice: String,

    /// first bar
    #[argh(positional)]
    first: usize,

    /// last bar
    #[argh(positional)]
    last: usize,
}

/// paste a range of bars from one voice into another
#[derive(FromArgs)]
#[argh(subcommand, name = "paste")]
struct PasteCmd {
    /// voice to copy from
    #[argh(positional)]
    from: String,

    /// first bar to copy
    #[argh(positional)]
    first: usize,

    /// last bar to copy
    #[argh(positional)]
    last: usize,

    /// voice to paste into
    #[argh(positional)]
    to: String,

    /// bar to paste at
    #[argh(positional)]
    at: usize,
}

/// set header fields
#[derive(FromArgs)]
#[argh(subcommand, name = "meta")]
struct MetaCmd {
    /// score title
    #[argh(option)]
    title: Option<String>,

    /// poet
    #[argh(option)]
    poet: Option<String>,

    /// composer
    #[argh(option)]
    composer: Option<String>,

    /// transcriber credited in the tagline
    #[argh(option)]
    transcriber: Option<String>,
}

/// create a new voice
#[derive(FromArgs)]
#[argh(subcommand, name = "add-voice")]
struct AddVoiceCmd {
    /// voice key, e.g. "soprano1"
    #[argh(positional)]
    voice: String,

    /// display name, e.g. "Soprano I"
    #[argh(option)]
    name: Option<String>,

    /// short instrument name, e.g. "S1"
    #[argh(option)]
    abbr: Option<String>,

    /// relative octave anchor, e.g. "c''"
    #[argh(option, default = "String::from(\"c''\")")]
    rel: String,

    /// clef (treble, treble_8, bass, alto, tenor, percussion)
    #[argh(option, default = "String::from(\"treble\")")]
    clef: String,

    /// the voice carries lyrics
    #[argh(switch)]
    lyrics: bool,
}

/// revert to the previous snapshot
#[derive(FromArgs)]
#[argh(subcommand, name = "undo")]
struct UndoCmd {}

/// reapply the snapshot undone last
#[derive(FromArgs)]
#[argh(subcommand, name = "redo")]
struct RedoCmd {}

fn main() {
    env_logger::init();
    let args: Args = argh::from_env();

    if let Err(e) = run(args) {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Error> {
    let project_dir = PathBuf::from(&args.project);
    fs::create_dir_all(&project_dir)?;
    let mut store = SnapshotStore::open(&project_dir)?;

    let mut project = if store.has_snapshots() {
        store.load()?
    } else {
        println!("Starting from scratch ...");
        let project = Project::new();
        store.save(&project)?;
        project
    };

    match args.command {
        Cmd::Compile(cmd) => compile(&project_dir, &project, &cmd)?,
        Cmd::Bars(_) => {
            for (name, nbars) in project.bar_counts() {
                println!("  {name} : {nbars} bars");
            }
        }
        Cmd::View(cmd) => {
            for bar in cmd.first..=cmd.last {
                println!("{}\n", project.view_bar(&cmd.voice, bar)?);
            }
        }
        Cmd::Set(cmd) => {
            if cmd.rest {
                let meter = project.fill_rest_bar(&cmd.voice, cmd.bar)?;
                println!("Created full measure rest for {meter} meter.");
            } else {
                let (pitches, rhythm) = match (&cmd.pitches, &cmd.rhythm) {
                    (Some(p), Some(r)) => (p.as_str(), r.as_str()),
                    _ => {
                        return Err(Error::Usage(
                            "set needs --pitches and --rhythm, or --rest".to_string(),
                        ));
                    }
                };
                project.set_bar(&cmd.voice, cmd.bar, pitches, rhythm, cmd.lyrics.as_deref())?;
            }
            store.save(&project)?;
        }
        Cmd::Rest(cmd) => {
            let meter = project.insert_rests(&cmd.voice, cmd.first, cmd.last)?;
            println!(
                "Inserted rests for {meter} meter in {} {} thru {}.",
                cmd.voice, cmd.first, cmd.last
            );
            store.save(&project)?;
        }
        Cmd::Delete(cmd) => {
            project.delete_bars(&cmd.voice, cmd.first, cmd.last)?;
            println!("deleted {} {} thru {}", cmd.voice, cmd.first, cmd.last);
            if cmd.voice != STRUCTURE_VOICE && project.voice(&cmd.voice)?.bar_count() == 0 {
                project.voices.remove(&cmd.voice);
                println!("deleted empty voice {}", cmd.voice);
            }
            store.save(&project)?;
        }
        Cmd::Paste(cmd) => {
            project.paste(&cmd.from, cmd.first, cmd.last, &cmd.to, cmd.at)?;
            store.save(&project)?;
        }
        Cmd::Meta(cmd) => {
            for (key, value) in [
                ("title", cmd.title),
                ("poet", cmd.poet),
                ("composer", cmd.composer),
                ("transcriber", cmd.transcriber),
            ] {
                if let Some(value) = value {
                    project.top.items.insert(key.to_string(), value);
                }
            }
            store.save(&project)?;
        }
        Cmd::AddVoice(cmd) => {
            let name = cmd.name.as_deref().unwrap_or(&cmd.voice);
            let abbr = cmd.abbr.as_deref().unwrap_or(&cmd.voice);
            let voice = Voice::new(name, abbr, &cmd.rel, &cmd.clef, cmd.lyrics);
            project.add_voice(&cmd.voice, voice)?;
            println!("{} added.", cmd.voice);
            store.save(&project)?;
        }
        Cmd::Undo(_) => {
            if store.undo()?.is_some() {
                println!("undid last change");
            } else {
                println!("Nothing to undo");
            }
        }
        Cmd::Redo(_) => {
            if store.redo()?.is_some() {
                println!("redid last undo");
            } else {
                println!("Nothing to redo");
            }
        }
    }
    Ok(())
}

fn compile(project_dir: &Path, project: &Project, cmd: &CompileCmd) -> Result<(), Error> {
    let mut ticks = TickTable::default();
    let overrides = project_dir.join("ticks.yml");
    if overrides.exists() {
        ticks.load_overrides(&overrides)?;
    }

    let output = render_voice(project, &cmd.voice, &ticks)?;

    let base = project_dir
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("score");
    let ly_path = project_dir.join(format!("{base}_{}.ly", cmd.voice));
    fs::write(&ly_path, &output)?;
    println!("{}", ly_path.display());

    if cmd.typeset {
        let outspec = ly_path.with_extension("");
        let status = Command::new("lilypond")
            .arg("-o")
            .arg(&outspec)
            .arg(&ly_path)
            .status()?;
        if !status.success() {
            log::warn!("lilypond exited with {status}");
        }
    }
    Ok(())
}
