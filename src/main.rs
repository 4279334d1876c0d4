use clap::Parser;
use colored::Colorize;

use bamsieve::hts::{open_for_read, open_for_write};
use bamsieve::{default_predicates, parse_with_report, ChainPolicy, FilterChain};

/// Filter a SAM file based on the provided queries.
///
/// Queries and output files come in pairs; each record is routed through
/// the outputs according to the chaining method.
#[derive(Parser)]
#[command(name = "bamsieve", version)]
struct Args {
    /// The input file to filter
    #[arg(short = 'f', long = "input", value_name = "FILE")]
    input: String,

    /// The input file is gzip-compressed, not plain text
    #[arg(short = 'b', long = "binary")]
    binary: bool,

    /// Chain the queries, rather than use them independently
    #[arg(
        short = 'c',
        long = "chain",
        value_name = "METHOD",
        default_value = "parallel"
    )]
    chain: String,

    /// Do not skip chromosomes that no query could match
    #[arg(short = 'I', long = "ignore-index")]
    ignore_index: bool,

    /// Pairs of query and output file
    #[arg(value_name = "QUERY OUTPUT", required = true)]
    outputs: Vec<String>,
}

fn main() {
    std::process::exit(run());
}

fn run() -> i32 {
    let args = Args::parse();

    if args.outputs.len() % 2 != 0 {
        report("Queries and output files must be paired.");
        return 1;
    }
    let policy = match args.chain.parse::<ChainPolicy>() {
        Ok(policy) => policy,
        Err(e) => {
            report(e);
            return 1;
        }
    };

    let mut chain = FilterChain::new(policy);
    for pair in args.outputs.chunks(2) {
        let Some(expr) = parse_with_report(&pair[0], default_predicates()) else {
            return 1;
        };
        let sink = match open_for_write(&pair[1]) {
            Ok(sink) => sink,
            Err(e) => {
                report(e);
                return 1;
            }
        };
        chain.add_output(&pair[1], expr, Box::new(sink));
    }

    let mut source = match open_for_read(&args.input, args.binary) {
        Ok(source) => source,
        Err(e) => {
            report(e);
            return 1;
        }
    };

    match chain.run(&mut source, !args.ignore_index) {
        Ok(()) => {
            chain.write_summary();
            0
        }
        Err(e) => {
            report(e);
            1
        }
    }
}

fn report(message: impl std::fmt::Display) {
    eprintln!("{} {message}", "Error:".red().bold());
}
