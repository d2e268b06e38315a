//! Train a treeformer ensemble from a tokenized corpus.
//!
//! The corpus is a JSON array of records. Each record is an array of token
//! ids whose first element is the prompt length. Trees are streamed into the
//! output file as they finish, so an interrupted run still leaves every tree
//! written so far on disk (minus the closing bracket).
//!
//! ```text
//! treeformer_train --corpus tokens.json --out trees.json --trees 32 --threads 8
//! ```

use std::fs::File;
use std::io::BufReader;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use treeformer::persist::JsonArraySink;
use treeformer::{Corpus, SamplingPolicy, TreeformerConfig, TreeformerModel, Verbosity};

const USAGE: &str = "treeformer_train

  --corpus <path>       Corpus JSON: array of [prompt_len, tokens...] records
  --out <path>          Output ensemble JSON (default: trees.json)
  --trees <n>           Number of trees (default: 32)
  --threads <n>         Worker threads, 0 = all cores (default: 0)
  --seed <n>            Master seed (default: 42)
  --max-depth <n>       Maximum tree depth (default: 32)
  --min-split <n>       Minimum states per split (default: 128)
  --all-positions       Train on every position instead of strided samples
  --verbose             Per-node progress
  --quiet               Warnings and errors only";

#[derive(Debug)]
struct Args {
    corpus: PathBuf,
    out: PathBuf,
    n_trees: usize,
    n_threads: usize,
    seed: u64,
    max_depth: usize,
    min_split_samples: usize,
    all_positions: bool,
    verbosity: Verbosity,
}

fn parse_value<T: std::str::FromStr>(flag: &str, value: Option<String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{flag} expects a value"))?;
    value.parse().map_err(|_| format!("invalid value for {flag}: {value}"))
}

/// Returns `Ok(None)` when `--help` was requested.
fn parse_args(mut it: impl Iterator<Item = String>) -> Result<Option<Args>, String> {
    let mut corpus: Option<PathBuf> = None;
    let mut out = PathBuf::from("trees.json");
    let mut n_trees = 32usize;
    let mut n_threads = 0usize;
    let mut seed = 42u64;
    let mut max_depth = 32usize;
    let mut min_split_samples = 128usize;
    let mut all_positions = false;
    let mut verbosity = Verbosity::Info;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--corpus" => corpus = Some(parse_value(&arg, it.next())?),
            "--out" => out = parse_value(&arg, it.next())?,
            "--trees" => n_trees = parse_value(&arg, it.next())?,
            "--threads" => n_threads = parse_value(&arg, it.next())?,
            "--seed" => seed = parse_value(&arg, it.next())?,
            "--max-depth" => max_depth = parse_value(&arg, it.next())?,
            "--min-split" => min_split_samples = parse_value(&arg, it.next())?,
            "--all-positions" => all_positions = true,
            "--verbose" => verbosity = Verbosity::Debug,
            "--quiet" => verbosity = Verbosity::Warning,
            "--help" | "-h" => return Ok(None),
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    let corpus = corpus.ok_or_else(|| "--corpus is required".to_string())?;
    Ok(Some(Args {
        corpus,
        out,
        n_trees,
        n_threads,
        seed,
        max_depth,
        min_split_samples,
        all_positions,
        verbosity,
    }))
}

fn init_tracing(verbosity: Verbosity) {
    let default = match verbosity {
        Verbosity::Silent => "error",
        Verbosity::Warning => "warn",
        Verbosity::Info => "info",
        Verbosity::Debug => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_corpus(path: &Path) -> Result<Corpus, Box<dyn std::error::Error>> {
    let reader = BufReader::new(File::open(path)?);
    let records: Vec<Vec<u16>> = serde_json::from_reader(reader)?;
    Ok(Corpus::from_records(records))
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let corpus = load_corpus(&args.corpus)?;
    tracing::info!(
        sequences = corpus.len(),
        positions = corpus.n_positions(),
        path = %args.corpus.display(),
        "corpus loaded"
    );

    let builder = TreeformerConfig::builder()
        .n_trees(args.n_trees)
        .seed(args.seed)
        .max_depth(args.max_depth)
        .min_split_samples(args.min_split_samples)
        .verbosity(args.verbosity)
        .maybe_n_threads(NonZeroUsize::new(args.n_threads));
    let config = if args.all_positions {
        builder.train_sampling(SamplingPolicy::All).build()?
    } else {
        builder.build()?
    };

    let mut sink = JsonArraySink::create(&args.out)?;
    let summary = TreeformerModel::train_into(&corpus, &config, &mut sink)?;
    sink.finish()?;

    tracing::info!(
        written = summary.n_written,
        skipped = summary.n_skipped,
        out = %args.out.display(),
        "ensemble saved"
    );
    Ok(())
}

fn main() -> ExitCode {
    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            eprintln!("{USAGE}");
            return ExitCode::SUCCESS;
        }
        Err(msg) => {
            eprintln!("error: {msg}\n\n{USAGE}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(args.verbosity);
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(%err, "training failed");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<Args>, String> {
        parse_args(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn quiet_keeps_warnings() {
        let args = parse(&["--corpus", "c.json", "--quiet"]).unwrap().unwrap();
        assert_eq!(args.verbosity, Verbosity::Warning);
        let line = USAGE.lines().find(|l| l.contains("--quiet")).unwrap();
        assert!(line.contains("Warnings"));
    }

    #[test]
    fn defaults_and_overrides() {
        let args = parse(&["--corpus", "c.json", "--trees", "4", "--all-positions"])
            .unwrap()
            .unwrap();
        assert_eq!(args.corpus, PathBuf::from("c.json"));
        assert_eq!(args.out, PathBuf::from("trees.json"));
        assert_eq!(args.n_trees, 4);
        assert!(args.all_positions);
        assert_eq!(args.verbosity, Verbosity::Info);
    }

    #[test]
    fn rejects_missing_corpus_and_unknown_flags() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--corpus", "c.json", "--bogus"]).is_err());
        assert!(parse(&["--corpus", "c.json", "--trees", "many"]).is_err());
        assert!(parse(&["--help"]).unwrap().is_none());
    }
}
