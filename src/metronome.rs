use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::merge::{merge, merge_structure};
use crate::token::time_signature;

/// A canned click pattern for one meter: parallel pitch and rhythm strings
/// in the same shape as ordinary bar entry. `wbh` marks loud downbeats,
/// `wbl` the soft subdivisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickPattern {
    pub pitches: String,
    pub rhythm: String,
}

/// Meter string -> click pattern. Starts from the built-in table; entries
/// can be replaced or extended from a `ticks.yml` file in the project folder.
#[derive(Debug, Clone)]
pub struct TickTable(BTreeMap<String, TickPattern>);

impl Default for TickTable {
    fn default() -> Self {
        let mut table = BTreeMap::new();
        let mut add = |meter: &str, pitches: &str, rhythm: &str| {
            table.insert(
                meter.to_string(),
                TickPattern {
                    pitches: pitches.to_string(),
                    rhythm: rhythm.to_string(),
                },
            );
        };
        add("2/4", "wbh wbl", "4 4");
        add("3/4", "wbh wbl wbl", "4 4 4");
        add("4/4", "wbh wbl wbl wbl", "4 4 4 4");
        add("5/4", "wbh wbl wbl wbh wbl", "4 4 4 4 4");
        add("2/2", "wbh wbl", "2 2");
        add("3/2", "wbh wbl wbl", "2 2 2");
        add("3/8", "wbh wbl wbl", "8 8 8");
        add("6/8", "wbh wbl wbl wbh wbl wbl", "8 8 8 8 8 8");
        add("7/8", "wbh wbl wbl wbh wbl wbh wbl", "8 8 8 8 8 8 8");
        add(
            "9/8",
            "wbh wbl wbl wbh wbl wbl wbh wbl wbl",
            "8 8 8 8 8 8 8 8 8",
        );
        add(
            "12/8",
            "wbh wbl wbl wbh wbl wbl wbh wbl wbl wbh wbl wbl",
            "8 8 8 8 8 8 8 8 8 8 8 8",
        );
        TickTable(table)
    }
}

impl TickTable {
    pub fn get(&self, meter: &str) -> Option<&TickPattern> {
        self.0.get(meter)
    }

    pub fn insert(&mut self, meter: &str, pattern: TickPattern) {
        self.0.insert(meter.to_string(), pattern);
    }

    /// Merge override entries from a YAML file mapping meter -> pattern.
    pub fn load_overrides(&mut self, path: &Path) -> Result<(), Error> {
        let text = std::fs::read_to_string(path)?;
        let overrides: BTreeMap<String, TickPattern> = serde_yaml::from_str(&text)?;
        log::debug!("loaded {} tick pattern overrides from {}", overrides.len(), path.display());
        self.0.extend(overrides);
        Ok(())
    }
}

/// Synthesize one click-track rhythm string per structure bar.
///
/// The meter is discovered from `\time` commands in the structure rhythm and
/// carried forward until superseded; a bar before any declaration is a hard
/// error. Meters without a canned pattern degrade to a full-measure rest and
/// are reported. Each bar inherits the structure's repeat/tempo decorations
/// through the structure merger, then gets a matching rest inserted after any
/// `\partial` marker and any `\key` declaration removed (the click voice is
/// rendered in percussion mode, which carries no key signature).
pub fn synthesize(structure_rhythm: &[String], table: &TickTable) -> Result<Vec<String>, Error> {
    let mut ticks = Vec::with_capacity(structure_rhythm.len());
    let mut meter: Option<String> = None;

    for (i, bar) in structure_rhythm.iter().enumerate() {
        if let Some(found) = time_signature(bar) {
            meter = Some(found.to_string());
        }
        let meter = meter.as_deref().ok_or(Error::NoMeter { bar: i + 1 })?;

        let pattern = match table.get(meter) {
            Some(tick) => merge(&tick.pitches, &tick.rhythm).join(" "),
            None => {
                log::warn!("no tick pattern for {meter} meter, substituting a full-measure rest");
                format!("R1*{meter}")
            }
        };

        let spliced = merge_structure(bar, &pattern, true);
        ticks.push(strip_key_signatures(&patch_partials(&spliced)));
    }
    Ok(ticks)
}

/// Insert a rest matching the partial duration after every `\partial` marker.
fn patch_partials(line: &str) -> String {
    let toks: Vec<&str> = line.split_whitespace().collect();
    let mut out: Vec<String> = Vec::with_capacity(toks.len());
    let mut i = 0;
    while i < toks.len() {
        if toks[i] == r"\partial" && i + 1 < toks.len() {
            let dur = toks[i + 1];
            out.push(toks[i].to_string());
            out.push(dur.to_string());
            out.push(format!("r{dur}"));
            i += 2;
        } else {
            out.push(toks[i].to_string());
            i += 1;
        }
    }
    out.join(" ")
}

/// Drop `\key <tonic> \<mode>` commands.
fn strip_key_signatures(line: &str) -> String {
    let toks: Vec<&str> = line.split_whitespace().collect();
    let mut out: Vec<&str> = Vec::with_capacity(toks.len());
    let mut i = 0;
    while i < toks.len() {
        if toks[i] == r"\key" {
            i += 3;
        } else {
            out.push(toks[i]);
            i += 1;
        }
    }
    out.join(" ")
}
