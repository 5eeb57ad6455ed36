//! Write-once, replay-many result log.
//!
//! Record layout, one byte tag followed by fields:
//!
//! | Tag | Record         | Fields                                      |
//! |-----|----------------|---------------------------------------------|
//! | 1   | `NEW_DEP`      | id, group, name, version, configuration     |
//! | 2   | `ROOT`         | id                                          |
//! | 3   | `FIRST_LVL`    | id                                          |
//! | 4   | `PARENT_CHILD` | parent id, child id, artifact set id        |
//!
//! Ids are small longs, strings are length prefixed. `ROOT` is always the last
//! record and ends the replay.

use crate::codec::{Decoder, Encoder};
use crate::error::{Error, Result};
use crate::results::{ResultEdge, ResultNode, TransientConfigurationResults};
use depot_core::{ModuleVersionIdentifier, ResolvedConfigurationIdentifier};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::sync::Arc;
use tracing::debug;

const NEW_DEP: u8 = 1;
const ROOT: u8 = 2;
const FIRST_LVL: u8 = 3;
const PARENT_CHILD: u8 = 4;

fn record_name(tag: u8) -> &'static str {
    match tag {
        NEW_DEP => "NEW_DEP",
        ROOT => "ROOT",
        FIRST_LVL => "FIRST_LVL",
        PARENT_CHILD => "PARENT_CHILD",
        _ => "UNKNOWN",
    }
}

enum State<W: Write> {
    Writing { encoder: Encoder<W>, records: usize },
    Flushed(W),
    Loaded(Arc<TransientConfigurationResults>),
    Cleared,
    Failed,
}

impl<W: Write> State<W> {
    const fn name(&self) -> &'static str {
        match self {
            Self::Writing { .. } => "still being written",
            Self::Flushed(_) => "flushed",
            Self::Loaded(_) => "loaded",
            Self::Cleared => "cleared",
            Self::Failed => "broken by an earlier write failure",
        }
    }
}

/// Backing storage of a result log: written once, then read from the start
/// any number of times.
pub trait LogStorage: Write + Read + Seek + Send {}

impl<T: Write + Read + Seek + Send> LogStorage for T {}

/// Builds the result log during resolution and replays it afterwards.
///
/// States: writing, then flushed once [`done`](Self::done) writes the root,
/// then loaded on the first [`load`](Self::load). Loading is serialized, so the
/// log is decoded at most once and every caller shares the same graph.
pub struct TransientConfigurationResultsBuilder<S: LogStorage = File> {
    state: Mutex<State<BufWriter<S>>>,
}

impl TransientConfigurationResultsBuilder<File> {
    /// A builder backed by an anonymous temporary file.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary file cannot be created.
    pub fn new() -> Result<Self> {
        let file = tempfile::tempfile().map_err(|e| Error::io(e, "create result log"))?;
        Ok(Self::with_storage(file))
    }
}

impl<S: LogStorage> TransientConfigurationResultsBuilder<S> {
    /// A builder writing to `storage`.
    pub fn with_storage(storage: S) -> Self {
        Self {
            state: Mutex::new(State::Writing {
                encoder: Encoder::new(BufWriter::new(storage)),
                records: 0,
            }),
        }
    }

    fn write_record(
        &self,
        operation: &'static str,
        write: impl FnOnce(&mut Encoder<BufWriter<S>>) -> io::Result<()>,
    ) -> Result<()> {
        let mut state = self.state.lock();
        let State::Writing { encoder, records } = &mut *state else {
            return Err(Error::InvalidState {
                operation,
                state: state.name(),
            });
        };
        if let Err(e) = write(encoder) {
            *state = State::Failed;
            return Err(Error::io(e, operation));
        }
        *records += 1;
        Ok(())
    }

    /// Declare node `id`.
    ///
    /// # Errors
    ///
    /// Fails after [`done`](Self::done) or on I/O errors.
    pub fn resolved_dependency(
        &self,
        id: u64,
        identifier: &ResolvedConfigurationIdentifier,
    ) -> Result<()> {
        self.write_record("write NEW_DEP record", |encoder| {
            encoder.write_byte(NEW_DEP)?;
            encoder.write_small_long(id)?;
            encoder.write_string(&identifier.module.group)?;
            encoder.write_string(&identifier.module.name)?;
            encoder.write_string(&identifier.module.version)?;
            encoder.write_string(&identifier.configuration)
        })
    }

    /// Mark node `id` as a first-level dependency.
    ///
    /// # Errors
    ///
    /// Fails after [`done`](Self::done) or on I/O errors.
    pub fn first_level_dependency(&self, id: u64) -> Result<()> {
        self.write_record("write FIRST_LVL record", |encoder| {
            encoder.write_byte(FIRST_LVL)?;
            encoder.write_small_long(id)
        })
    }

    /// Record the edge `parent -> child` and its artifact set.
    ///
    /// # Errors
    ///
    /// Fails after [`done`](Self::done) or on I/O errors.
    pub fn parent_child(&self, parent: u64, child: u64, artifact_set_id: u64) -> Result<()> {
        self.write_record("write PARENT_CHILD record", |encoder| {
            encoder.write_byte(PARENT_CHILD)?;
            encoder.write_small_long(parent)?;
            encoder.write_small_long(child)?;
            encoder.write_small_long(artifact_set_id)
        })
    }

    /// Write the root record and flush. No record can be written afterwards.
    ///
    /// # Errors
    ///
    /// Fails if called twice or on I/O errors.
    pub fn done(&self, root: u64) -> Result<()> {
        const OPERATION: &str = "write ROOT record";
        let mut state = self.state.lock();
        match std::mem::replace(&mut *state, State::Failed) {
            State::Writing {
                mut encoder,
                records,
            } => {
                let written = encoder
                    .write_byte(ROOT)
                    .and_then(|()| encoder.write_small_long(root))
                    .and_then(|()| encoder.flush());
                if let Err(e) = written {
                    return Err(Error::io(e, OPERATION));
                }
                debug!(records = records + 1, root, "Flushed resolution result log");
                *state = State::Flushed(encoder.into_inner());
                Ok(())
            }
            other => {
                let name = other.name();
                *state = other;
                Err(Error::InvalidState {
                    operation: OPERATION,
                    state: name,
                })
            }
        }
    }

    /// Replay the log, or return the graph replayed earlier.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Corrupt`] for malformed logs and
    /// [`Error::InvalidState`] before [`done`](Self::done) or after
    /// [`clear`](Self::clear).
    pub fn load(&self) -> Result<Arc<TransientConfigurationResults>> {
        let mut state = self.state.lock();
        let results = match &mut *state {
            State::Loaded(results) => return Ok(Arc::clone(results)),
            State::Flushed(writer) => {
                let storage = writer.get_mut();
                storage
                    .seek(SeekFrom::Start(0))
                    .map_err(|e| Error::io(e, "rewind result log"))?;
                Arc::new(decode(BufReader::new(storage))?)
            }
            other => {
                return Err(Error::InvalidState {
                    operation: "load results",
                    state: other.name(),
                });
            }
        };
        debug!(nodes = results.len(), "Loaded resolution result log");
        *state = State::Loaded(Arc::clone(&results));
        Ok(results)
    }

    /// Drop the log and any loaded graph.
    pub fn clear(&self) {
        *self.state.lock() = State::Cleared;
    }
}

struct Replay {
    records_read: usize,
    last_record: Option<&'static str>,
}

impl Replay {
    fn corrupt(&self, reason: impl Into<String>) -> Error {
        Error::Corrupt {
            records_read: self.records_read,
            last_record: self.last_record,
            reason: reason.into(),
        }
    }

    fn io(&self, error: &io::Error) -> Error {
        if error.kind() == io::ErrorKind::UnexpectedEof {
            self.corrupt("unexpected end of stream before the ROOT record")
        } else {
            self.corrupt(error.to_string())
        }
    }
}

/// Decode a complete log.
///
/// # Errors
///
/// Returns [`Error::Corrupt`] on unknown record types, references to ids not
/// declared by an earlier `NEW_DEP` record, duplicate ids, and end of stream
/// before `ROOT`.
pub fn decode(reader: impl Read) -> Result<TransientConfigurationResults> {
    let mut decoder = Decoder::new(reader);
    let mut replay = Replay {
        records_read: 0,
        last_record: None,
    };
    let mut nodes: BTreeMap<u64, ResultNode> = BTreeMap::new();
    let mut first_level = Vec::new();
    let mut edges = Vec::new();

    loop {
        let tag = decoder.read_byte().map_err(|e| replay.io(&e))?;
        match tag {
            NEW_DEP => {
                let mut read = || -> io::Result<(u64, ResolvedConfigurationIdentifier)> {
                    let id = decoder.read_small_long()?;
                    let group = decoder.read_string()?;
                    let name = decoder.read_string()?;
                    let version = decoder.read_string()?;
                    let configuration = decoder.read_string()?;
                    Ok((
                        id,
                        ResolvedConfigurationIdentifier::new(
                            ModuleVersionIdentifier::new(group, name, version),
                            configuration,
                        ),
                    ))
                };
                let (id, identifier) = read().map_err(|e| replay.io(&e))?;
                match nodes.entry(id) {
                    Entry::Occupied(_) => {
                        return Err(replay.corrupt(format!("node {id} declared twice")));
                    }
                    Entry::Vacant(slot) => {
                        slot.insert(ResultNode {
                            id,
                            identifier,
                            children: Vec::new(),
                            parents: Vec::new(),
                        });
                    }
                }
            }
            ROOT => {
                let id = decoder.read_small_long().map_err(|e| replay.io(&e))?;
                if !nodes.contains_key(&id) {
                    return Err(replay.corrupt(format!("root node {id} was never declared")));
                }
                return Ok(TransientConfigurationResults::new(
                    id,
                    nodes,
                    first_level,
                    edges,
                ));
            }
            FIRST_LVL => {
                let id = decoder.read_small_long().map_err(|e| replay.io(&e))?;
                if !nodes.contains_key(&id) {
                    return Err(replay.corrupt(format!(
                        "first-level node {id} was never declared"
                    )));
                }
                first_level.push(id);
            }
            PARENT_CHILD => {
                let mut read = || -> io::Result<(u64, u64, u64)> {
                    Ok((
                        decoder.read_small_long()?,
                        decoder.read_small_long()?,
                        decoder.read_small_long()?,
                    ))
                };
                let (parent, child, artifact_set_id) = read().map_err(|e| replay.io(&e))?;
                for id in [parent, child] {
                    if !nodes.contains_key(&id) {
                        return Err(replay.corrupt(format!("edge node {id} was never declared")));
                    }
                }
                if let Some(node) = nodes.get_mut(&parent) {
                    node.children.push(child);
                }
                if let Some(node) = nodes.get_mut(&child) {
                    node.parents.push(parent);
                }
                edges.push(ResultEdge {
                    parent,
                    child,
                    artifact_set_id,
                });
            }
            unknown => {
                return Err(replay.corrupt(format!("unknown record type {unknown}")));
            }
        }
        replay.records_read += 1;
        replay.last_record = Some(record_name(tag));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn identifier(name: &str) -> ResolvedConfigurationIdentifier {
        ResolvedConfigurationIdentifier::new(
            ModuleVersionIdentifier::new("org", name, "1.0"),
            "default",
        )
    }

    fn in_memory() -> TransientConfigurationResultsBuilder<Cursor<Vec<u8>>> {
        TransientConfigurationResultsBuilder::with_storage(Cursor::new(Vec::new()))
    }

    #[test]
    fn test_round_trip() {
        let builder = in_memory();
        builder.resolved_dependency(1, &identifier("root")).unwrap();
        builder.resolved_dependency(2, &identifier("lib")).unwrap();
        builder.parent_child(1, 2, 7).unwrap();
        builder.first_level_dependency(2).unwrap();
        builder.done(1).unwrap();

        let results = builder.load().unwrap();
        assert_eq!(results.root_id(), 1);
        assert_eq!(results.root().unwrap().children, vec![2]);
        assert_eq!(results.node(2).unwrap().parents, vec![1]);
        assert!(results.is_first_level(2));
        assert_eq!(results.artifact_set_id(1, 2), Some(7));
        assert_eq!(results.node(2).unwrap().identifier, identifier("lib"));
    }

    #[test]
    fn test_load_is_memoized() {
        let builder = in_memory();
        builder.resolved_dependency(1, &identifier("root")).unwrap();
        builder.done(1).unwrap();
        let first = builder.load().unwrap();
        let second = builder.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_state_errors() {
        let builder = in_memory();
        assert!(matches!(builder.load(), Err(Error::InvalidState { .. })));
        builder.resolved_dependency(1, &identifier("root")).unwrap();
        builder.done(1).unwrap();
        assert!(matches!(
            builder.first_level_dependency(1),
            Err(Error::InvalidState { .. })
        ));
        assert!(matches!(builder.done(1), Err(Error::InvalidState { .. })));
        builder.clear();
        assert!(matches!(builder.load(), Err(Error::InvalidState { .. })));
    }

    #[test]
    fn test_root_is_last_under_concurrent_writes() {
        for _ in 0..50 {
            let builder = in_memory();
            builder.resolved_dependency(0, &identifier("root")).unwrap();
            let accepted = std::thread::scope(|scope| {
                let writers: Vec<_> = (0..4u64)
                    .map(|writer| {
                        let builder = &builder;
                        scope.spawn(move || {
                            let mut accepted = 0;
                            for i in 0..200u64 {
                                let id = 1 + writer * 1000 + i;
                                if builder.resolved_dependency(id, &identifier("lib")).is_err() {
                                    break;
                                }
                                accepted += 1;
                            }
                            accepted
                        })
                    })
                    .collect();
                builder.done(0).unwrap();
                writers
                    .into_iter()
                    .map(|w| w.join().unwrap())
                    .sum::<usize>()
            });
            assert_eq!(builder.load().unwrap().len(), accepted + 1);
        }
    }

    #[test]
    fn test_file_backed_builder() {
        let builder = TransientConfigurationResultsBuilder::new().unwrap();
        builder.resolved_dependency(3, &identifier("root")).unwrap();
        builder.done(3).unwrap();
        assert_eq!(builder.load().unwrap().root_id(), 3);
    }

    fn encode(records: impl FnOnce(&mut Encoder<&mut Vec<u8>>)) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut encoder = Encoder::new(&mut bytes);
        records(&mut encoder);
        bytes
    }

    fn write_new_dep(encoder: &mut Encoder<&mut Vec<u8>>, id: u64) {
        encoder.write_byte(NEW_DEP).unwrap();
        encoder.write_small_long(id).unwrap();
        for field in ["org", "lib", "1.0", "default"] {
            encoder.write_string(field).unwrap();
        }
    }

    #[test]
    fn test_unknown_record_type() {
        let bytes = encode(|e| {
            write_new_dep(e, 1);
            e.write_byte(9).unwrap();
        });
        match decode(bytes.as_slice()).unwrap_err() {
            Error::Corrupt {
                records_read,
                last_record,
                reason,
            } => {
                assert_eq!(records_read, 1);
                assert_eq!(last_record, Some("NEW_DEP"));
                assert!(reason.contains("unknown record type 9"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undeclared_ids_rejected() {
        let edge = encode(|e| {
            write_new_dep(e, 1);
            e.write_byte(PARENT_CHILD).unwrap();
            e.write_small_long(1).unwrap();
            e.write_small_long(2).unwrap();
            e.write_small_long(0).unwrap();
        });
        assert!(matches!(decode(edge.as_slice()), Err(Error::Corrupt { .. })));

        let first_level = encode(|e| {
            e.write_byte(FIRST_LVL).unwrap();
            e.write_small_long(5).unwrap();
        });
        let err = decode(first_level.as_slice()).unwrap_err();
        assert!(err.to_string().contains("0 records read"));

        let root = encode(|e| {
            e.write_byte(ROOT).unwrap();
            e.write_small_long(1).unwrap();
        });
        assert!(decode(root.as_slice()).is_err());
    }

    #[test]
    fn test_eof_before_root() {
        let bytes = encode(|e| write_new_dep(e, 1));
        let err = decode(bytes.as_slice()).unwrap_err();
        assert!(err.to_string().contains("before the ROOT record"));
        assert!(err.to_string().contains("last record: NEW_DEP"));
    }

    #[test]
    fn test_duplicate_declaration_rejected() {
        let bytes = encode(|e| {
            write_new_dep(e, 1);
            write_new_dep(e, 1);
        });
        assert!(decode(bytes.as_slice()).unwrap_err().to_string().contains("declared twice"));
    }
}
