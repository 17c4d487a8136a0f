use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// No `\time` has been declared in the structure at or before the bar
    /// that needs one.
    #[error("no time signature found in structure at or before bar {bar}")]
    NoMeter { bar: usize },

    #[error("no voice named {0}")]
    UnknownVoice(String),

    #[error("'{0}' is a reserved voice name")]
    ReservedVoice(String),

    #[error("voice {0} already exists")]
    DuplicateVoice(String),

    #[error("bar {bar} out of range for {voice} ({nbars} bars)")]
    BarOutOfRange {
        voice: String,
        bar: usize,
        nbars: usize,
    },

    #[error("cannot compile {voice}: structure has {structure_bars} bars, {voice} has {voice_bars}")]
    StructureTooShort {
        voice: String,
        structure_bars: usize,
        voice_bars: usize,
    },

    #[error("no snapshot to load in {0}")]
    EmptyStore(String),

    #[error("{0}")]
    Usage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed snapshot: {0}")]
    Store(#[from] serde_json::Error),

    #[error("malformed tick table: {0}")]
    TickTable(#[from] serde_yaml::Error),
}
