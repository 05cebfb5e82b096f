//! Dispatcher / sink (component E): the single-threaded consumer that drains the ordered stream
//! of translated entries, lazily opens shard output files (optionally GZIP-wrapped), retries
//! deferred routing decisions, and recovers from malformed records by writing them to `.errors`.

use crate::entry::Entry;
use crate::error::{RecordError, SplitError};
use crate::ldif::reader::OrderedReceiver;
use crate::parent_map::ParentMap;
use crate::pipeline::PipelineOutcome;
use crate::router::{Decision, Shard, ShardSet, Strategy};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

const PROGRESS_INTERVAL: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OutputTarget {
    Shard(Shard),
    Errors,
}

impl OutputTarget {
    fn suffix(&self) -> String {
        match self {
            OutputTarget::Shard(s) => s.suffix(),
            OutputTarget::Errors => ".errors".to_string(),
        }
    }
}

enum OutputStream {
    Plain(File),
    Gz(GzEncoder<File>),
}

impl Write for OutputStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputStream::Plain(f) => f.write(buf),
            OutputStream::Gz(g) => g.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputStream::Plain(f) => f.flush(),
            OutputStream::Gz(g) => g.flush(),
        }
    }
}

impl OutputStream {
    /// Flushes any GZIP trailer and closes the underlying file. Called on every opened stream
    /// both at clean end-of-stream and on cancellation (§5, "Cancellation").
    fn finish(self) -> io::Result<()> {
        match self {
            OutputStream::Plain(mut f) => f.flush(),
            OutputStream::Gz(g) => g.finish().map(|_| ()),
        }
    }
}

/// Final counters reported at end-of-stream (§4.E).
pub struct RunSummary {
    pub entries_read: u64,
    pub entries_excluded: u64,
    pub shard_files: Vec<(PathBuf, u64)>,
    pub had_recoverable_error: bool,
}

pub struct Dispatcher {
    base_path: PathBuf,
    compress: bool,
    streams: HashMap<OutputTarget, OutputStream>,
    counts: HashMap<OutputTarget, u64>,
    open_order: Vec<OutputTarget>,
    entries_read: u64,
    entries_excluded: u64,
    had_recoverable_error: bool,
}

impl Dispatcher {
    pub fn new(base_path: PathBuf, compress: bool) -> Self {
        Dispatcher {
            base_path,
            compress,
            streams: HashMap::new(),
            counts: HashMap::new(),
            open_order: Vec::new(),
            entries_read: 0,
            entries_excluded: 0,
            had_recoverable_error: false,
        }
    }

    fn path_for(&self, target: &OutputTarget) -> PathBuf {
        let mut name = self.base_path.clone().into_os_string();
        name.push(target.suffix());
        PathBuf::from(name)
    }

    fn open(&mut self, target: OutputTarget) -> Result<(), SplitError> {
        if self.streams.contains_key(&target) {
            return Ok(());
        }
        let path = self.path_for(&target);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| SplitError::Output {
                    path: path.clone(),
                    source,
                })?;
            }
        }
        let file = File::create(&path).map_err(|source| SplitError::Output {
            path: path.clone(),
            source,
        })?;
        let stream = if self.compress {
            OutputStream::Gz(GzEncoder::new(file, Compression::default()))
        } else {
            OutputStream::Plain(file)
        };
        self.streams.insert(target.clone(), stream);
        self.counts.insert(target.clone(), 0);
        self.open_order.push(target);
        Ok(())
    }

    fn write_record(&mut self, target: OutputTarget, bytes: &str) -> Result<(), SplitError> {
        self.open(target.clone())?;
        let path = self.path_for(&target);
        let stream = self.streams.get_mut(&target).expect("just opened");
        stream
            .write_all(bytes.as_bytes())
            .map_err(|source| SplitError::Output { path, source })?;
        *self.counts.get_mut(&target).expect("just opened") += 1;
        Ok(())
    }

    fn record_error(&mut self, raw_or_serialized: &str, error: &RecordError) -> Result<(), SplitError> {
        self.had_recoverable_error = true;
        let mut record = String::new();
        record.push_str("# ");
        record.push_str(&error.to_string());
        record.push('\n');
        record.push_str(raw_or_serialized);
        if !raw_or_serialized.ends_with('\n') {
            record.push('\n');
        }
        record.push('\n');
        self.write_record(OutputTarget::Errors, &record)
    }

    fn maybe_print_progress(&self) {
        if self.entries_read % PROGRESS_INTERVAL == 0 {
            println!("Processed {} entries", self.entries_read);
        }
    }

    fn finish(mut self) -> Result<RunSummary, SplitError> {
        let mut shard_files = Vec::new();
        for target in self.open_order.drain(..) {
            let path = {
                let mut name = self.base_path.clone().into_os_string();
                name.push(target.suffix());
                PathBuf::from(name)
            };
            let stream = self.streams.remove(&target).expect("opened target");
            stream
                .finish()
                .map_err(|source| SplitError::Output { path: path.clone(), source })?;
            let count = self.counts.remove(&target).unwrap_or(0);
            shard_files.push((path, count));
        }
        Ok(RunSummary {
            entries_read: self.entries_read,
            entries_excluded: self.entries_excluded,
            shard_files,
            had_recoverable_error: self.had_recoverable_error,
        })
    }
}

fn resolve_shards(
    entry: &Entry,
    decision: Decision,
    strategy: &Strategy,
    parent_map: &ParentMap,
) -> Result<ShardSet, RecordError> {
    match decision {
        Decision::Shards(shards) => Ok(shards),
        Decision::Deferred => match strategy.route(entry, parent_map) {
            Decision::Shards(shards) => Ok(shards),
            Decision::Deferred => Err(RecordError::NoParent),
        },
    }
}

/// Drives the dispatcher to completion over `ordered`, per §4.E. Returns the final summary on
/// success, or propagates an `OutputError`/`UnrecoverableParseError`-class `SplitError` that
/// should abort the process with a non-zero exit.
pub fn run(
    mut ordered: OrderedReceiver,
    strategy: &Strategy,
    parent_map: &ParentMap,
    base_path: PathBuf,
    compress: bool,
) -> Result<RunSummary, SplitError> {
    let mut dispatcher = Dispatcher::new(base_path, compress);

    while let Some(translated) = ordered.recv() {
        dispatcher.entries_read += 1;
        match translated.outcome {
            PipelineOutcome::Malformed { raw_text, error } => {
                let unrecoverable = matches!(error, RecordError::Unrecoverable(_));
                dispatcher.record_error(&raw_text, &error)?;
                if unrecoverable {
                    dispatcher.maybe_print_progress();
                    break;
                }
            }
            PipelineOutcome::Routed {
                entry,
                decision,
                serialized,
            } => match resolve_shards(&entry, decision, strategy, parent_map) {
                Ok(shard_set) if shard_set.is_empty() => {
                    dispatcher.entries_excluded += 1;
                }
                Ok(shard_set) => {
                    for shard in shard_set {
                        dispatcher.write_record(OutputTarget::Shard(shard), &serialized)?;
                    }
                }
                Err(record_error) => {
                    dispatcher.record_error(&serialized, &record_error)?;
                }
            },
        }
        dispatcher.maybe_print_progress();
    }

    ordered.join();
    let summary = dispatcher.finish()?;

    println!(
        "{} entries read, {} entries excluded",
        summary.entries_read, summary.entries_excluded
    );
    for (path, count) in &summary.shard_files {
        println!("{} entries written to {}", count, path.display());
    }

    Ok(summary)
}

/// Single-source convenience: determines the output base path per §4.F ("If multiple source
/// inputs are provided, an explicit base output path is required; otherwise the first source
/// path is used.").
pub fn resolve_base_path(explicit: Option<PathBuf>, sources: &[PathBuf]) -> PathBuf {
    explicit.unwrap_or_else(|| sources[0].clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::ldif::reader;
    use crate::router::{hash_rdn::HashRdn, OutsideHandling, RoutingContext};
    use std::io::Cursor;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[test]
    fn writes_shards_and_reports_counts() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("export");

        let text = "dn: dc=example,dc=com\nobjectClass: domain\n\n\
                    dn: ou=People,dc=example,dc=com\nobjectClass: organizationalUnit\n\n\
                    dn: uid=alice,ou=People,dc=example,dc=com\nuid: alice\n\n";

        let strategy = Strategy::HashRdn(HashRdn::new(RoutingContext {
            split_base: Dn::parse("ou=People,dc=example,dc=com").unwrap(),
            num_shards: 2,
            outside: OutsideHandling::AllSets,
        }));
        let parent_map = Arc::new(ParentMap::new());
        let ordered = reader::spawn(
            Cursor::new(text.as_bytes().to_vec()),
            Arc::new(strategy),
            Arc::clone(&parent_map),
            2,
        );

        let strategy = Strategy::HashRdn(HashRdn::new(RoutingContext {
            split_base: Dn::parse("ou=People,dc=example,dc=com").unwrap(),
            num_shards: 2,
            outside: OutsideHandling::AllSets,
        }));
        let summary = run(ordered, &strategy, &parent_map, base.clone(), false).unwrap();

        assert_eq!(summary.entries_read, 3);
        assert_eq!(summary.entries_excluded, 0);
        assert!(!summary.had_recoverable_error);

        let set1 = fs::read_to_string(format!("{}.set1", base.display())).unwrap();
        assert!(set1.contains("dc=example,dc=com") || set1.contains("uid=alice"));
    }

    #[test]
    fn malformed_record_goes_to_errors_and_marks_recoverable() {
        let dir = tempdir().unwrap();
        let base = dir.path().join("export");

        let text = "not-a-dn-line\n\ndn: dc=example,dc=com\nobjectClass: domain\n\n";
        let strategy = Strategy::HashRdn(HashRdn::new(RoutingContext {
            split_base: Dn::parse("dc=example,dc=com").unwrap(),
            num_shards: 2,
            outside: OutsideHandling::Omit,
        }));
        let parent_map = Arc::new(ParentMap::new());
        let ordered = reader::spawn(
            Cursor::new(text.as_bytes().to_vec()),
            Arc::new(strategy),
            Arc::clone(&parent_map),
            1,
        );

        let strategy = Strategy::HashRdn(HashRdn::new(RoutingContext {
            split_base: Dn::parse("dc=example,dc=com").unwrap(),
            num_shards: 2,
            outside: OutsideHandling::Omit,
        }));
        let summary = run(ordered, &strategy, &parent_map, base.clone(), false).unwrap();
        assert!(summary.had_recoverable_error);

        let errors = fs::read_to_string(format!("{}.errors", base.display())).unwrap();
        assert!(errors.starts_with('#'));
        assert!(errors.contains("not-a-dn-line"));
    }
}
