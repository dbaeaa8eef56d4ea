//! Persistence for genomes and training runs.
//!
//! Genomes are stored as pretty-printed JSON documents:
//!
//! ```text
//! { "fitness": f64,
//!   "nodes": [ { "id": u32, "type": "Input", "function": "PassThrough" }, ... ],
//!   "connections": [ { "id": u32, "from": u32, "to": u32, "weight": f64, "enabled": bool }, ... ] }
//! ```
//!
//! Nodes are written inputs first, then outputs, then hidden nodes by id, so
//! a loaded genome gets its I/O order back from document order. A
//! [`GenomeStore`] names files inside one directory (`<name>.json`) and also
//! keeps the per-generation training history.

// Date arithmetic on Unix seconds
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss
)]

use crate::error::{FormatError, PersistenceError};
use crate::neat::activation::{Activation, UnknownActivation};
use crate::neat::genome::{Connection, Genome, Node, NodeKind, UnknownNodeKind};
use crate::neat::sequencer::{ConnectionId, NodeId, Sequencer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Default directory for saved specimens.
pub const DEFAULT_STORE_DIR: &str = "SavedSpecimen";

/// Name of the best-ever genome inside a store.
pub const BEST: &str = "best";

/// File name of the training history inside a store.
pub const HISTORY_FILE: &str = "training_history.json";

/// On-disk form of a genome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenomeRecord {
    /// Fitness at the time of saving.
    pub fitness: f64,
    /// Nodes in I/O order: inputs, outputs, then hidden by id.
    pub nodes: Vec<NodeRecord>,
    /// Connections by id.
    pub connections: Vec<ConnectionRecord>,
}

/// On-disk form of a node.
///
/// Type and function are kept as strings so that unknown names surface as
/// [`FormatError`]s instead of generic JSON errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeRecord {
    /// Node id.
    pub id: NodeId,
    /// `Input`, `Hidden` or `Output`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Activation function name.
    pub function: String,
}

/// On-disk form of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Innovation number.
    pub id: ConnectionId,
    /// Source node id.
    pub from: NodeId,
    /// Destination node id.
    pub to: NodeId,
    /// Connection weight.
    pub weight: f64,
    /// Whether the connection takes part in evaluation.
    pub enabled: bool,
}

impl GenomeRecord {
    /// Snapshot a genome.
    #[must_use]
    pub fn from_genome(genome: &Genome) -> Self {
        let hidden = genome.nodes().filter(|n| n.kind == NodeKind::Hidden);
        let io = genome
            .inputs()
            .iter()
            .chain(genome.outputs())
            .filter_map(|&id| genome.node(id));

        let nodes = io
            .chain(hidden)
            .map(|node| NodeRecord {
                id: node.id,
                kind: node.kind.name().to_string(),
                function: node.activation.name().to_string(),
            })
            .collect();

        let connections = genome
            .connections()
            .map(|c| ConnectionRecord {
                id: c.id,
                from: c.from,
                to: c.to,
                weight: c.weight,
                enabled: c.enabled,
            })
            .collect();

        Self {
            fitness: genome.fitness(),
            nodes,
            connections,
        }
    }

    /// Validate the record and build a genome from it.
    ///
    /// Nothing is built unless the whole record is valid. On success both
    /// sequencer floors are raised past the loaded ids.
    ///
    /// # Errors
    ///
    /// Returns a [`FormatError`] for duplicate ids, unknown node types or
    /// activation names, and connections whose endpoints are missing.
    pub fn into_genome(self, seq: &mut Sequencer) -> Result<Genome, FormatError> {
        let mut node_ids = BTreeSet::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for record in &self.nodes {
            if !node_ids.insert(record.id) {
                return Err(FormatError::DuplicateNode(record.id));
            }
            let kind: NodeKind =
                record
                    .kind
                    .parse()
                    .map_err(|UnknownNodeKind(kind)| FormatError::UnknownNodeType {
                        node: record.id,
                        kind,
                    })?;
            let activation: Activation = record.function.parse().map_err(
                |UnknownActivation(function)| FormatError::UnknownActivation {
                    node: record.id,
                    function,
                },
            )?;
            nodes.push(Node::with_activation(record.id, kind, activation));
        }

        let mut connection_ids = BTreeSet::new();
        for record in &self.connections {
            if !connection_ids.insert(record.id) {
                return Err(FormatError::DuplicateConnection(record.id));
            }
            for endpoint in [record.from, record.to] {
                if !node_ids.contains(&endpoint) {
                    return Err(FormatError::DanglingEndpoint {
                        connection: record.id,
                        node: endpoint,
                    });
                }
            }
        }

        let of_kind = |kind: NodeKind| -> Vec<NodeId> {
            nodes.iter().filter(|n| n.kind == kind).map(|n| n.id).collect()
        };
        let inputs = of_kind(NodeKind::Input);
        let outputs = of_kind(NodeKind::Output);

        let connections = self
            .connections
            .into_iter()
            .map(|c| {
                let mut connection = Connection::new(c.id, c.from, c.to, c.weight);
                connection.enabled = c.enabled;
                connection
            })
            .collect();

        let genome = Genome::from_parts(nodes, connections, inputs, outputs, self.fitness);

        if let Some(max) = genome.max_node_id() {
            seq.raise_node_floor(max.saturating_add(1));
        }
        if let Some(max) = genome.max_connection_id() {
            seq.raise_connection_floor(max.saturating_add(1));
        }

        Ok(genome)
    }
}

/// Serialize a genome to pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if a weight or the fitness is not finite.
pub fn to_json(genome: &Genome) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&GenomeRecord::from_genome(genome))
}

/// Parse and validate a genome document.
///
/// # Errors
///
/// Returns a [`FormatError`] if the document is malformed or invalid.
pub fn from_json(json: &str, seq: &mut Sequencer) -> Result<Genome, FormatError> {
    let record: GenomeRecord = serde_json::from_str(json)?;
    record.into_genome(seq)
}

/// Write a genome to `path`.
///
/// # Errors
///
/// Returns an error if serialization or the write fails.
pub fn save_genome(genome: &Genome, path: &Path) -> Result<(), PersistenceError> {
    let json = to_json(genome).map_err(|e| PersistenceError::format(path, e))?;
    fs::write(path, json).map_err(|e| PersistenceError::io(path, e))
}

/// Read and validate the genome stored at `path`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid genome.
pub fn load_genome(path: &Path, seq: &mut Sequencer) -> Result<Genome, PersistenceError> {
    let json = fs::read_to_string(path).map_err(|e| PersistenceError::io(path, e))?;
    from_json(&json, seq).map_err(|e| PersistenceError::format(path, e))
}

/// Best, mean and worst fitness of every finished generation.
///
/// Stored as `[[best...], [mean...], [worst...]]`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingHistory {
    /// Best fitness per generation.
    pub best: Vec<f64>,
    /// Mean fitness per generation.
    pub mean: Vec<f64>,
    /// Worst fitness per generation.
    pub worst: Vec<f64>,
}

impl TrainingHistory {
    /// Append one generation.
    pub fn push(&mut self, best: f64, mean: f64, worst: f64) {
        self.best.push(best);
        self.mean.push(mean);
        self.worst.push(worst);
    }

    /// Number of recorded generations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.best.len()
    }

    /// Whether no generation has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.best.is_empty()
    }
}

/// A directory of named genome files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenomeStore {
    dir: PathBuf,
}

impl Default for GenomeStore {
    fn default() -> Self {
        Self::new(DEFAULT_STORE_DIR)
    }
}

impl GenomeStore {
    /// Store rooted at `dir`. The directory is created on first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the genome called `name`.
    #[must_use]
    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }

    /// Save `genome` as `name`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the write fails.
    pub fn save(&self, name: &str, genome: &Genome) -> Result<PathBuf, PersistenceError> {
        self.ensure_dir()?;
        let path = self.path(name);
        save_genome(genome, &path)?;
        debug!(path = %path.display(), fitness = genome.fitness(), "saved genome");
        Ok(path)
    }

    /// Load the genome called `name`. A missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or is invalid.
    pub fn load(
        &self,
        name: &str,
        seq: &mut Sequencer,
    ) -> Result<Option<Genome>, PersistenceError> {
        let path = self.path(name);
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };
        from_json(&json, seq)
            .map(Some)
            .map_err(|e| PersistenceError::format(path, e))
    }

    /// Stored fitness of `name`, without validating the genome.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn fitness_of(&self, name: &str) -> Result<Option<f64>, PersistenceError> {
        let path = self.path(name);
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };
        let record: GenomeRecord =
            serde_json::from_str(&json).map_err(|e| PersistenceError::format(&path, e))?;
        Ok(Some(record.fitness))
    }

    /// Save `genome` as `name` unless the stored copy is at least as fit.
    ///
    /// An unreadable stored copy counts as missing. Returns whether the file
    /// was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub fn save_if_fitter(&self, name: &str, genome: &Genome) -> Result<bool, PersistenceError> {
        let stored = self.fitness_of(name).unwrap_or_else(|e| {
            warn!(error = %e, "ignoring unreadable stored genome");
            None
        });
        if stored.is_some_and(|fitness| fitness >= genome.fitness()) {
            return Ok(false);
        }
        self.save(name, genome)?;
        Ok(true)
    }

    /// Write the training history.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created or the write fails.
    pub fn save_history(&self, history: &TrainingHistory) -> Result<(), PersistenceError> {
        self.ensure_dir()?;
        let path = self.dir.join(HISTORY_FILE);
        let json = serde_json::to_string_pretty(&[&history.best, &history.mean, &history.worst])
            .map_err(|e| PersistenceError::format(&path, e))?;
        fs::write(&path, json).map_err(|e| PersistenceError::io(path, e))
    }

    /// Read the training history. A missing file is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_history(&self) -> Result<Option<TrainingHistory>, PersistenceError> {
        let path = self.dir.join(HISTORY_FILE);
        let Some(json) = read_optional(&path)? else {
            return Ok(None);
        };
        let [best, mean, worst]: [Vec<f64>; 3] =
            serde_json::from_str(&json).map_err(|e| PersistenceError::format(&path, e))?;
        Ok(Some(TrainingHistory { best, mean, worst }))
    }

    /// Promote the fittest `generation_<n>_best` snapshot to `best`.
    ///
    /// Nothing changes when `best` is already at least as fit. Unreadable
    /// snapshots are skipped. Returns the promoted fitness, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed or the copy fails.
    pub fn select_best(&self) -> Result<Option<f64>, PersistenceError> {
        let mut fittest: Option<(String, f64)> = None;
        for name in self.names()? {
            if !is_generation_best(&name) {
                continue;
            }
            match self.fitness_of(&name) {
                Ok(Some(fitness)) => {
                    if fittest.as_ref().is_none_or(|(_, best)| fitness > *best) {
                        fittest = Some((name, fitness));
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "skipping unreadable snapshot"),
            }
        }

        let Some((name, fitness)) = fittest else {
            return Ok(None);
        };
        let current = self.fitness_of(BEST).unwrap_or(None);
        if current.is_some_and(|current| current >= fitness) {
            return Ok(None);
        }

        let (from, to) = (self.path(&name), self.path(BEST));
        fs::copy(&from, &to).map_err(|e| PersistenceError::io(to, e))?;
        debug!(from = %from.display(), fitness, "promoted snapshot to best");
        Ok(Some(fitness))
    }

    /// Delete every file in the store except `best.json`.
    ///
    /// Returns the number of files removed. A missing directory is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if listing or removal fails.
    pub fn clear(&self) -> Result<usize, PersistenceError> {
        let keep = self.path(BEST);
        let mut removed = 0;
        for path in self.files()? {
            if path == keep {
                continue;
            }
            fs::remove_file(&path).map_err(|e| PersistenceError::io(&path, e))?;
            removed += 1;
        }
        Ok(removed)
    }

    /// Names (file stems) of every genome document in the store, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub fn names(&self) -> Result<Vec<String>, PersistenceError> {
        let mut names: Vec<String> = self
            .files()?
            .into_iter()
            .filter(|p| p.extension().is_some_and(|e| e == "json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .filter(|name| format!("{name}.json") != HISTORY_FILE)
            .collect();
        names.sort();
        Ok(names)
    }

    fn files(&self) -> Result<Vec<PathBuf>, PersistenceError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(PersistenceError::io(&self.dir, e)),
        };
        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| PersistenceError::io(&self.dir, e))?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        Ok(files)
    }

    fn ensure_dir(&self) -> Result<(), PersistenceError> {
        fs::create_dir_all(&self.dir).map_err(|e| PersistenceError::io(&self.dir, e))
    }
}

/// Name of the per-generation best snapshot.
#[must_use]
pub fn generation_best_name(generation: u32) -> String {
    format!("generation_{generation}_best")
}

/// Name of the per-generation worst snapshot.
#[must_use]
pub fn generation_worst_name(generation: u32) -> String {
    format!("generation_{generation}_worst")
}

/// Name of a timestamped best-ever snapshot, `best_YYYYMMDD_HHMMSS`.
#[must_use]
pub fn snapshot_name() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    format!("{BEST}_{}", format_timestamp(secs))
}

fn is_generation_best(name: &str) -> bool {
    name.strip_prefix("generation_")
        .and_then(|rest| rest.strip_suffix("_best"))
        .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
}

fn read_optional(path: &Path) -> Result<Option<String>, PersistenceError> {
    match fs::read_to_string(path) {
        Ok(json) => Ok(Some(json)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(PersistenceError::io(path, e)),
    }
}

/// Format a Unix timestamp as `YYYYMMDD_HHMMSS` (UTC).
fn format_timestamp(secs: u64) -> String {
    const SECS_PER_DAY: u64 = 86_400;

    let time_of_day = secs % SECS_PER_DAY;
    let (hour, min, sec) = (time_of_day / 3600, (time_of_day % 3600) / 60, time_of_day % 60);

    // Civil date from days since 1970-01-01, in 400-year eras from 0000-03-01.
    let days = (secs / SECS_PER_DAY) as i64 + 719_468;
    let era = days.div_euclid(146_097);
    let day_of_era = days.rem_euclid(146_097);
    let year_of_era =
        (day_of_era - day_of_era / 1460 + day_of_era / 36_524 - day_of_era / 146_096) / 365;
    let day_of_year = day_of_era - (365 * year_of_era + year_of_era / 4 - year_of_era / 100);
    let mp = (5 * day_of_year + 2) / 153;
    let day = day_of_year - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = year_of_era + era * 400 + i64::from(month <= 2);

    format!("{year:04}{month:02}{day:02}_{hour:02}{min:02}{sec:02}")
}
