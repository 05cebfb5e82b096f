//! Multi-threaded LDIF reader (component G): a producer thread tokenizes records off the input
//! stream into a bounded work queue; a pool of `numThreads` workers drain it, each parsing a
//! record and invoking the translation pipeline (§4.D). Results arrive out of order from the
//! worker pool; `OrderedReceiver` restores source order before handing entries to the dispatcher,
//! per the ordering guarantee in §5.

use crate::error::RecordError;
use crate::ldif::record::RecordReader;
use crate::parent_map::ParentMap;
use crate::pipeline::{translate, PipelineOutcome, Translated};
use crate::router::Strategy;
use crossbeam_channel::{bounded, Receiver};
use std::collections::BTreeMap;
use std::io::BufRead;
use std::sync::Arc;
use std::thread;

/// Spawns the producer and worker threads and returns a handle that yields translated entries in
/// strict source order. Dropping the returned `OrderedReceiver` before it is fully drained is
/// fine; the threads detect the closed channel and wind down.
pub fn spawn<R>(
    reader: R,
    strategy: Arc<Strategy>,
    parent_map: Arc<ParentMap>,
    num_threads: u32,
) -> OrderedReceiver
where
    R: BufRead + Send + 'static,
{
    let num_threads = num_threads.max(1) as usize;
    // Bounded at a small multiple of the worker count: enough to keep every worker fed without
    // unbounded memory growth on a reader far faster than routing.
    let (work_tx, work_rx) = bounded(num_threads * 4);
    let (results_tx, results_rx) = bounded(num_threads * 4);

    let producer_results_tx = results_tx.clone();
    let producer = thread::spawn(move || {
        let mut records = RecordReader::new(reader);
        let mut next_seq = 0u64;
        loop {
            match records.next() {
                Some(Ok(record)) => {
                    next_seq = record.seq + 1;
                    if work_tx.send(record).is_err() {
                        break;
                    }
                }
                Some(Err(io_err)) => {
                    let translated = Translated {
                        seq: next_seq,
                        outcome: PipelineOutcome::Malformed {
                            raw_text: String::new(),
                            error: RecordError::Unrecoverable(io_err.to_string()),
                        },
                    };
                    let _ = producer_results_tx.send(translated);
                    break;
                }
                None => break,
            }
        }
        // Dropping `work_tx` here (end of closure) signals workers to stop.
    });

    let mut workers = Vec::with_capacity(num_threads);
    for _ in 0..num_threads {
        let work_rx = work_rx.clone();
        let results_tx = results_tx.clone();
        let strategy = Arc::clone(&strategy);
        let parent_map = Arc::clone(&parent_map);
        workers.push(thread::spawn(move || {
            while let Ok(record) = work_rx.recv() {
                let translated = translate(record, &strategy, &parent_map);
                if results_tx.send(translated).is_err() {
                    break;
                }
            }
        }));
    }
    drop(results_tx);
    drop(work_rx);

    OrderedReceiver {
        rx: results_rx,
        buffer: BTreeMap::new(),
        next_seq: 0,
        producer: Some(producer),
        workers,
    }
}

/// Restores strict source order over the worker pool's unordered output.
pub struct OrderedReceiver {
    rx: Receiver<Translated>,
    buffer: BTreeMap<u64, Translated>,
    next_seq: u64,
    producer: Option<thread::JoinHandle<()>>,
    workers: Vec<thread::JoinHandle<()>>,
}

impl OrderedReceiver {
    /// Returns the next translated entry in source order, or `None` once the stream and all
    /// workers have finished.
    pub fn recv(&mut self) -> Option<Translated> {
        loop {
            if let Some(translated) = self.buffer.remove(&self.next_seq) {
                self.next_seq += 1;
                return Some(translated);
            }
            match self.rx.recv() {
                Ok(translated) if translated.seq == self.next_seq => {
                    self.next_seq += 1;
                    return Some(translated);
                }
                Ok(translated) => {
                    self.buffer.insert(translated.seq, translated);
                }
                Err(_) => {
                    return self.buffer.remove(&self.next_seq).map(|t| {
                        self.next_seq += 1;
                        t
                    })
                }
            }
        }
    }

    /// Joins the producer and worker threads. Call after draining to completion.
    pub fn join(mut self) {
        if let Some(producer) = self.producer.take() {
            let _ = producer.join();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dn::Dn;
    use crate::router::{hash_rdn::HashRdn, OutsideHandling, RoutingContext};
    use std::io::Cursor;

    fn strategy() -> Arc<Strategy> {
        Arc::new(Strategy::HashRdn(HashRdn::new(RoutingContext {
            split_base: Dn::parse("ou=People,dc=example,dc=com").unwrap(),
            num_shards: 4,
            outside: OutsideHandling::AllSets,
        })))
    }

    #[test]
    fn preserves_source_order_across_many_threads() {
        let mut text = String::new();
        for i in 0..200 {
            text.push_str(&format!(
                "dn: uid=user{i},ou=People,dc=example,dc=com\nuid: user{i}\n\n"
            ));
        }
        let parent_map = Arc::new(ParentMap::new());
        let mut ordered = spawn(Cursor::new(text.into_bytes()), strategy(), parent_map, 8);

        let mut seqs = Vec::new();
        while let Some(t) = ordered.recv() {
            seqs.push(t.seq);
        }
        ordered.join();

        let expected: Vec<u64> = (0..200).collect();
        assert_eq!(seqs, expected);
    }
}
