//! End-to-end filtering of SAM files on disk.

use std::fs;
use std::path::Path;

use tempfile::tempdir;

use bamsieve::hts::{open_for_read, open_for_write, RecordSource};
use bamsieve::{default_predicates, parse, ChainPolicy, FilterChain};

const INPUT: &str = "\
@HD\tVN:1.6\tSO:coordinate
@SQ\tSN:chr1\tLN:1000
@SQ\tSN:chrX\tLN:800
a1\t99\tchr1\t100\t60\t4M\t=\t150\t54\tACGT\tIIII\tRG:Z:g1
a2\t147\tchr1\t150\t60\t4M\t=\t100\t-54\tTTTT\tIIII\tRG:Z:g1
x1\t0\tchrX\t50\t30\t4M\t*\t0\t0\tCCCC\tIIII
u1\t4\t*\t0\t0\t*\t*\t0\t0\tAAAA\t*
";

fn write_input(dir: &Path) -> String {
    let path = dir.join("input.sam");
    fs::write(&path, INPUT).unwrap();
    path.to_str().unwrap().to_owned()
}

fn single_output_chain(dir: &Path, query: &str, name: &str) -> (FilterChain, String) {
    let out = dir.join(name).to_str().unwrap().to_owned();
    let mut chain = FilterChain::new(ChainPolicy::Parallel);
    chain.add_output(
        &out,
        parse(query, default_predicates()).unwrap(),
        Box::new(open_for_write(&out).unwrap()),
    );
    (chain, out)
}

#[test]
fn paired_not_unmapped_scenario() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path());
    let (mut chain, out) = single_output_chain(dir.path(), "paired? & !unmapped?", "out.sam");

    let mut source = open_for_read(&input, false).unwrap();
    chain.run(&mut source, true).unwrap();

    assert_eq!(chain.counts(), vec![(2, 2)]);

    let text = fs::read_to_string(out).unwrap();
    assert!(text.contains("@SQ\tSN:chr1\tLN:1000"));
    assert!(text.contains("\na1\t"));
    assert!(text.contains("\na2\t"));
    assert!(!text.contains("x1"));
    assert!(!text.contains("u1"));
}

#[test]
fn chromosome_skip_leaves_counters_untouched() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path());
    let (mut chain, _) = single_output_chain(dir.path(), "chr(x)", "out.sam");

    let mut source = open_for_read(&input, false).unwrap();
    chain.run(&mut source, true).unwrap();

    // both chr1 records are skipped wholesale; the unmapped one is rejected
    assert_eq!(chain.counts(), vec![(1, 1)]);
}

#[test]
fn ignoring_the_skip_counts_everything() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path());
    let (mut chain, _) = single_output_chain(dir.path(), "chr(x)", "out.sam");

    let mut source = open_for_read(&input, false).unwrap();
    chain.run(&mut source, false).unwrap();

    assert_eq!(chain.counts(), vec![(1, 3)]);
}

#[test]
fn series_chain_on_disk() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path());
    let first = dir.path().join("mapped.sam").to_str().unwrap().to_owned();
    let second = dir.path().join("read1.sam").to_str().unwrap().to_owned();

    let mut chain = FilterChain::new(ChainPolicy::Series);
    chain.add_output(
        &first,
        parse("!unmapped?", default_predicates()).unwrap(),
        Box::new(open_for_write(&first).unwrap()),
    );
    chain.add_output(
        &second,
        parse("read1?", default_predicates()).unwrap(),
        Box::new(open_for_write(&second).unwrap()),
    );

    let mut source = open_for_read(&input, false).unwrap();
    chain.run(&mut source, false).unwrap();

    // u1 never reaches the second link under series chaining
    assert_eq!(chain.counts(), vec![(3, 1), (1, 2)]);
    let text = fs::read_to_string(second).unwrap();
    assert!(text.contains("\na1\t"));
    assert!(!text.contains("u1"));
}

#[test]
fn gzip_round_trip() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path());
    let (mut chain, out) = single_output_chain(dir.path(), "true", "out.sam.gz");

    let mut source = open_for_read(&input, false).unwrap();
    chain.run(&mut source, false).unwrap();
    assert_eq!(chain.counts(), vec![(4, 0)]);

    let mut reread = open_for_read(&out, true).unwrap();
    assert_eq!(reread.header().targets().len(), 2);
    let mut n = 0;
    while let Some(_) = reread.next_record().unwrap() {
        n += 1;
    }
    assert_eq!(n, 4);
}

#[test]
fn read_group_filter() {
    let dir = tempdir().unwrap();
    let input = write_input(dir.path());
    let (mut chain, _) = single_output_chain(dir.path(), "read_group(g1)", "out.sam");

    let mut source = open_for_read(&input, false).unwrap();
    chain.run(&mut source, false).unwrap();
    assert_eq!(chain.counts(), vec![(2, 2)]);
}
