//! Translation pipeline (component D): invoked per parsed record, possibly concurrently from
//! worker threads. Pure with respect to the entry; only the parent map and (for fewest-entries)
//! the shard counters are touched as side effects, never I/O.

use crate::entry::Entry;
use crate::error::RecordError;
use crate::ldif::parse::parse_entry;
use crate::ldif::record::RawRecord;
use crate::parent_map::ParentMap;
use crate::router::{Decision, Strategy};

/// The per-record outcome, still missing a final shard assignment if routing deferred.
pub enum PipelineOutcome {
    Routed {
        entry: Entry,
        decision: Decision,
        serialized: String,
    },
    Malformed {
        raw_text: String,
        error: RecordError,
    },
}

/// A translated entry: the pipeline's output plus the record's source sequence number, which the
/// reader uses to restore source order at the dispatcher boundary (§4.D, §5).
pub struct Translated {
    pub seq: u64,
    pub outcome: PipelineOutcome,
}

pub fn translate(record: RawRecord, strategy: &Strategy, parent_map: &ParentMap) -> Translated {
    let seq = record.seq;
    let outcome = match parse_entry(&record) {
        Ok(entry) => {
            let decision = strategy.route(&entry, parent_map);
            let serialized = entry.to_ldif();
            PipelineOutcome::Routed {
                entry,
                decision,
                serialized,
            }
        }
        Err(error) => PipelineOutcome::Malformed {
            raw_text: record.raw_text(),
            error,
        },
    };
    Translated { seq, outcome }
}
