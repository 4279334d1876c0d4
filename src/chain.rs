//! Routing of one record stream through a chain of filtered outputs.

use std::str::FromStr;

use crate::errors::{Error, Result};
use crate::expr::Expr;
use crate::hts::{Header, Record, RecordSink, RecordSource};

/// How a link's outcome decides whether the next link sees the record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChainPolicy {
    /// Every output is offered every record.
    Parallel,
    /// Later outputs only see records the earlier ones accepted.
    Series,
    /// Later outputs only see records the earlier ones rejected.
    Shuttle,
}

impl ChainPolicy {
    pub fn continues(self, matched: bool) -> bool {
        match self {
            ChainPolicy::Parallel => true,
            ChainPolicy::Series => matched,
            ChainPolicy::Shuttle => !matched,
        }
    }
}

impl FromStr for ChainPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "parallel" => Ok(ChainPolicy::Parallel),
            "series" => Ok(ChainPolicy::Series),
            "shuttle" => Ok(ChainPolicy::Shuttle),
            other => Err(Error::UnknownChain(other.to_owned())),
        }
    }
}

/// One output: a compiled expression, its sink, and its outcome counters.
struct OutputLink {
    label: String,
    expr: Expr,
    sink: Box<dyn RecordSink>,
    accepted: u64,
    rejected: u64,
}

/// An ordered pipeline of outputs sharing one chain policy. Records are
/// dispatched front to back; the policy decides how far each one travels.
pub struct FilterChain {
    policy: ChainPolicy,
    links: Vec<OutputLink>,
}

impl FilterChain {
    pub fn new(policy: ChainPolicy) -> Self {
        Self {
            policy,
            links: Vec::new(),
        }
    }

    pub fn add_output(&mut self, label: impl Into<String>, expr: Expr, sink: Box<dyn RecordSink>) {
        self.links.push(OutputLink {
            label: label.into(),
            expr,
            sink,
            accepted: 0,
            rejected: 0,
        });
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Could any record on this chromosome reach a sink? A link's own answer
    /// counts, and later links are consulted only when the policy would
    /// forward a non-matching record past an earlier link.
    pub fn wants_chromosome(&self, header: &Header, tid: u32) -> bool {
        want_chromosome(&self.links, self.policy, header, tid)
    }

    fn dispatch(&mut self, header: &Header, record: &Record) -> Result<()> {
        let policy = self.policy;
        for link in &mut self.links {
            let matched = link.expr.matches_record(header, record);
            if matched {
                link.accepted += 1;
                link.sink.write_record(header, record)?;
            } else {
                link.rejected += 1;
            }
            if !policy.continues(matched) {
                break;
            }
        }
        Ok(())
    }

    /// Stream every record from `source` through the chain. When
    /// `chromosome_skip` is set, chromosomes no link could match are skipped
    /// wholesale without decoding their records.
    pub fn run(&mut self, source: &mut dyn RecordSource, chromosome_skip: bool) -> Result<()> {
        let header = source.header().clone();
        for link in &mut self.links {
            link.sink.write_header(&header)?;
        }

        let mut wanted: Vec<Option<bool>> = vec![None; header.targets().len()];
        while let Some(record) = source.next_record()? {
            if chromosome_skip {
                if let Some(tid) = record.tid {
                    if let Some(cache) = wanted.get_mut(tid as usize) {
                        let want = *cache
                            .get_or_insert_with(|| want_chromosome(&self.links, self.policy, &header, tid));
                        if !want {
                            source.skip_chromosome(tid)?;
                            continue;
                        }
                    }
                }
            }
            self.dispatch(&header, &record)?;
        }

        for link in &mut self.links {
            link.sink.finish()?;
        }
        Ok(())
    }

    /// Accept/reject counters per output, in chain order.
    pub fn counts(&self) -> Vec<(u64, u64)> {
        self.links
            .iter()
            .map(|l| (l.accepted, l.rejected))
            .collect()
    }

    pub fn write_summary(&self) {
        for link in &self.links {
            println!("{}:", link.label);
            println!("Accepted: {}", link.accepted);
            println!("Rejected: {}", link.rejected);
        }
    }
}

fn want_chromosome(links: &[OutputLink], policy: ChainPolicy, header: &Header, tid: u32) -> bool {
    for link in links {
        if link.expr.matches_chromosome(header, tid) {
            return true;
        }
        if !policy.continues(false) {
            return false;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hts::{MemorySink, MemorySource, FLAG_PAIRED, FLAG_UNMAPPED};
    use crate::parser::parse;
    use crate::predicates::default_predicates;

    fn header() -> Header {
        Header::from_targets([("chr1", 1000), ("chrX", 800)])
    }

    fn mapped(tid: u32, flag: u16) -> Record {
        Record {
            tid: Some(tid),
            flag,
            ..Record::default()
        }
    }

    fn chain_of(policy: ChainPolicy, queries: &[&str]) -> (FilterChain, Vec<std::sync::Arc<std::sync::Mutex<Vec<Record>>>>) {
        let mut chain = FilterChain::new(policy);
        let mut handles = Vec::new();
        for (i, query) in queries.iter().enumerate() {
            let (sink, records) = MemorySink::new();
            chain.add_output(format!("out{i}"), parse(query, default_predicates()).unwrap(), Box::new(sink));
            handles.push(records);
        }
        (chain, handles)
    }

    #[test]
    fn policy_continuation() {
        assert!(ChainPolicy::Parallel.continues(true));
        assert!(ChainPolicy::Parallel.continues(false));
        assert!(ChainPolicy::Series.continues(true));
        assert!(!ChainPolicy::Series.continues(false));
        assert!(!ChainPolicy::Shuttle.continues(true));
        assert!(ChainPolicy::Shuttle.continues(false));
    }

    #[test]
    fn policy_names() {
        assert_eq!("series".parse::<ChainPolicy>().unwrap(), ChainPolicy::Series);
        assert!("sideways".parse::<ChainPolicy>().is_err());
    }

    #[test]
    fn series_stops_at_first_rejection() {
        let (mut chain, outs) = chain_of(ChainPolicy::Series, &["false", "true", "true"]);
        let mut source = MemorySource::new(header(), vec![mapped(0, 0)]);
        chain.run(&mut source, false).unwrap();

        assert_eq!(chain.counts(), vec![(0, 1), (0, 0), (0, 0)]);
        assert!(outs.iter().all(|o| o.lock().unwrap().is_empty()));
    }

    #[test]
    fn parallel_offers_every_record_everywhere() {
        let (mut chain, outs) = chain_of(ChainPolicy::Parallel, &["false", "true", "true"]);
        let mut source = MemorySource::new(header(), vec![mapped(0, 0), mapped(0, 0)]);
        chain.run(&mut source, false).unwrap();

        assert_eq!(chain.counts(), vec![(0, 2), (2, 0), (2, 0)]);
        assert_eq!(outs[1].lock().unwrap().len(), 2);
        assert_eq!(outs[2].lock().unwrap().len(), 2);
    }

    #[test]
    fn shuttle_claims_accepted_records() {
        let (mut chain, outs) =
            chain_of(ChainPolicy::Shuttle, &["paired?", "true"]);
        let mut source = MemorySource::new(
            header(),
            vec![mapped(0, FLAG_PAIRED), mapped(0, 0)],
        );
        chain.run(&mut source, false).unwrap();

        // the paired record stops at the first link, the other travels on
        assert_eq!(chain.counts(), vec![(1, 1), (1, 0)]);
        assert_eq!(outs[0].lock().unwrap().len(), 1);
        assert_eq!(outs[1].lock().unwrap().len(), 1);
    }

    #[test]
    fn chromosome_wanted_through_the_chain() {
        let h = header();
        let (chain, _) = chain_of(ChainPolicy::Series, &["chr(x)", "chr(1)"]);
        // series never forwards a rejected record, so only the head counts
        assert!(chain.wants_chromosome(&h, 1));
        assert!(!chain.wants_chromosome(&h, 0));

        let (chain, _) = chain_of(ChainPolicy::Parallel, &["chr(x)", "chr(1)"]);
        assert!(chain.wants_chromosome(&h, 0));
        assert!(chain.wants_chromosome(&h, 1));

        let (chain, _) = chain_of(ChainPolicy::Shuttle, &["chr(x)", "chr(1)"]);
        assert!(chain.wants_chromosome(&h, 0));
    }

    #[test]
    fn skipped_chromosomes_are_never_counted() {
        let (mut chain, outs) = chain_of(ChainPolicy::Parallel, &["chr(x)"]);
        let mut source = MemorySource::new(
            header(),
            vec![mapped(0, 0), mapped(0, 0), mapped(1, 0), mapped(1, FLAG_PAIRED)],
        );
        chain.run(&mut source, true).unwrap();

        // both chr1 records skipped without touching the counters
        assert_eq!(chain.counts(), vec![(2, 0)]);
        assert_eq!(outs[0].lock().unwrap().len(), 2);
    }

    #[test]
    fn unmapped_records_survive_the_skip() {
        let (mut chain, _) = chain_of(ChainPolicy::Parallel, &["chr(x)"]);
        let unplaced = Record {
            flag: FLAG_UNMAPPED,
            ..Record::default()
        };
        let mut source = MemorySource::new(header(), vec![mapped(0, 0), unplaced]);
        chain.run(&mut source, true).unwrap();

        // the unmapped record is evaluated (and rejected), the chr1 one skipped
        assert_eq!(chain.counts(), vec![(0, 1)]);
    }

    #[test]
    fn paired_not_unmapped_scenario() {
        let (mut chain, _) = chain_of(ChainPolicy::Parallel, &["paired? & !unmapped?"]);
        let mut source = MemorySource::new(
            header(),
            vec![mapped(0, FLAG_PAIRED), mapped(0, FLAG_UNMAPPED)],
        );
        chain.run(&mut source, false).unwrap();
        assert_eq!(chain.counts(), vec![(1, 1)]);
    }
}
