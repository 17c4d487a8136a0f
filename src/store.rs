use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::project::Project;

/// A folder of numbered JSON snapshots of one work in progress. Every save
/// writes a new snapshot; undo and redo move a cursor over the snapshot
/// sequence without deleting anything. The cursor is persisted so undo
/// survives across program runs.
pub struct SnapshotStore {
    json_dir: PathBuf,
    indices: Vec<u64>,
    cursor: Option<usize>,
}

impl SnapshotStore {
    /// Open (creating if needed) the `json/` folder inside `project_dir`.
    pub fn open(project_dir: &Path) -> Result<Self, Error> {
        let json_dir = project_dir.join("json");
        fs::create_dir_all(&json_dir)?;

        let mut indices = Vec::new();
        for entry in fs::read_dir(&json_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(n) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                indices.push(n);
            }
        }
        indices.sort_unstable();

        let mut store = SnapshotStore {
            json_dir,
            indices,
            cursor: None,
        };
        store.cursor = store.read_cursor();
        Ok(store)
    }

    fn cursor_path(&self) -> PathBuf {
        self.json_dir.join("current")
    }

    fn read_cursor(&self) -> Option<usize> {
        if self.indices.is_empty() {
            return None;
        }
        let saved = fs::read_to_string(self.cursor_path())
            .ok()
            .and_then(|s| s.trim().parse::<u64>().ok())
            .and_then(|n| self.indices.iter().position(|&i| i == n));
        saved.or(Some(self.indices.len() - 1))
    }

    fn write_cursor(&self) -> Result<(), Error> {
        if let Some(pos) = self.cursor {
            fs::write(self.cursor_path(), format!("{}\n", self.indices[pos]))?;
        }
        Ok(())
    }

    pub fn has_snapshots(&self) -> bool {
        !self.indices.is_empty()
    }

    /// Serialize the project into the next numbered snapshot.
    pub fn save(&mut self, project: &Project) -> Result<(), Error> {
        let next = self.indices.last().map_or(0, |n| n + 1);
        let path = self.json_dir.join(format!("{next}.json"));
        fs::write(&path, serde_json::to_string(project)?)?;
        self.indices.push(next);
        self.cursor = Some(self.indices.len() - 1);
        self.write_cursor()?;
        log::info!("saved {next}.json");
        Ok(())
    }

    /// Deserialize the snapshot the cursor points at.
    pub fn load(&self) -> Result<Project, Error> {
        let pos = self
            .cursor
            .ok_or_else(|| Error::EmptyStore(self.json_dir.display().to_string()))?;
        let path = self.json_dir.join(format!("{}.json", self.indices[pos]));
        let text = fs::read_to_string(&path)?;
        log::info!("loaded {}.json", self.indices[pos]);
        Ok(serde_json::from_str(&text)?)
    }

    /// Step back one snapshot and load it. Returns None when there is
    /// nothing earlier.
    pub fn undo(&mut self) -> Result<Option<Project>, Error> {
        match self.cursor {
            Some(pos) if pos > 0 => {
                self.cursor = Some(pos - 1);
                self.write_cursor()?;
                Ok(Some(self.load()?))
            }
            _ => {
                log::info!("nothing to undo");
                Ok(None)
            }
        }
    }

    /// Step forward one snapshot and load it. Returns None when there is
    /// nothing later.
    pub fn redo(&mut self) -> Result<Option<Project>, Error> {
        match self.cursor {
            Some(pos) if pos + 1 < self.indices.len() => {
                self.cursor = Some(pos + 1);
                self.write_cursor()?;
                Ok(Some(self.load()?))
            }
            _ => {
                log::info!("nothing to redo");
                Ok(None)
            }
        }
    }
}
