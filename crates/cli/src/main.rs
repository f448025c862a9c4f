//! Bahr CLI: Arabic poetry meter detection.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Deserialize;

use bahr_core::analysis::{Analyzer, VerseAnalysis, split_hemistichs};
use bahr_core::config::AnalyzerConfig;
use bahr_core::language::encode::{encode, encode_detailed};
use bahr_core::prosody::library::Supplement;
use bahr_core::prosody::meters::{METERS, meter};
use bahr_core::prosody::tafila::{scan_with_meter, segment};
use bahr_core::types::{MeterId, RhythmPattern};

// ─── Top-level CLI ───────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "bahr",
    about = "Detect the meter of classical Arabic verse",
    version,
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Full analysis of one or more verses
    Analyze(AnalyzeArgs),
    /// Encode text into a rhythm pattern
    Encode(EncodeArgs),
    /// Break a rhythm pattern into feet
    Segment(SegmentArgs),
    /// Detect the meter of a rhythm pattern
    Detect(DetectArgs),
    /// List the meter table
    Meters(MetersArgs),
    /// Measure top-1 accuracy on a labeled corpus
    Evaluate(EvaluateArgs),
    /// Collect labeled patterns the library does not know yet
    Mine(MineArgs),
}

// ─── Shared arguments (embedded in each subcommand) ──────────────

#[derive(Parser, Debug)]
struct SharedArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Supplementary pattern table (overrides the config file)
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Show verbose output
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

// ─── Subcommands ─────────────────────────────────────────────────

#[derive(Parser, Debug)]
struct AnalyzeArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Verse text; hemistichs separated by `*`, `|` or a tab
    text: Option<String>,

    /// Read one verse per line from this file
    #[arg(long, conflicts_with = "text")]
    file: Option<PathBuf>,

    /// Number of candidates to report
    #[arg(long)]
    top_k: Option<usize>,
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Hemistich text
    text: String,

    /// Treat the text as undiacritized even if marks are present
    #[arg(long, default_value_t = false)]
    undiacritized: bool,

    /// Do not lengthen the final short vowel
    #[arg(long, default_value_t = false)]
    no_saturate: bool,
}

#[derive(Parser, Debug)]
struct SegmentArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Rhythm pattern, or Arabic text with --text
    input: String,

    /// Encode the input as text first
    #[arg(long, default_value_t = false)]
    text: bool,

    /// Scan against this meter's forms instead of greedy segmentation
    #[arg(long)]
    meter: Option<String>,
}

#[derive(Parser, Debug)]
struct DetectArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// Rhythm patterns in '/' and 'o' notation
    #[arg(required = true)]
    patterns: Vec<String>,

    /// Number of candidates to report
    #[arg(long)]
    top_k: Option<usize>,
}

#[derive(Parser, Debug)]
struct MetersArgs {
    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Parser, Debug)]
struct EvaluateArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// JSONL corpus, one {"text", "meter"} object per line
    corpus: PathBuf,
}

#[derive(Parser, Debug)]
struct MineArgs {
    #[command(flatten)]
    shared: SharedArgs,

    /// JSONL corpus, one {"text", "meter"} object per line
    corpus: PathBuf,

    /// Where to write the supplementary table
    #[arg(long, short)]
    output: PathBuf,
}

// ─── Main ────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    // Init logging
    let verbose = match &cli.command {
        Command::Analyze(a) => a.shared.verbose,
        Command::Encode(a) => a.shared.verbose,
        Command::Segment(a) => a.shared.verbose,
        Command::Detect(a) => a.shared.verbose,
        Command::Meters(a) => a.shared.verbose,
        Command::Evaluate(a) => a.shared.verbose,
        Command::Mine(a) => a.shared.verbose,
    };
    let log_level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    let result = match cli.command {
        Command::Analyze(args) => run_analyze(args),
        Command::Encode(args) => run_encode(args),
        Command::Segment(args) => run_segment(args),
        Command::Detect(args) => run_detect(args),
        Command::Meters(args) => run_meters(args),
        Command::Evaluate(args) => run_evaluate(args),
        Command::Mine(args) => run_mine(args),
    };

    if let Err(e) = result {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

// ─── Helpers ─────────────────────────────────────────────────────

/// Load the config file and apply command-line overrides.
fn load_config(shared: &SharedArgs) -> Result<AnalyzerConfig> {
    let mut config = AnalyzerConfig::load(shared.config.as_deref())?;
    if let Some(p) = &shared.patterns {
        config.patterns_file = Some(p.clone());
    }
    Ok(config)
}

fn build_analyzer(shared: &SharedArgs) -> Result<Analyzer> {
    let config = load_config(shared)?;
    Analyzer::from_config(config).context("Failed to build pattern library")
}

fn parse_pattern(s: &str) -> Result<RhythmPattern> {
    s.parse()
        .with_context(|| format!("Invalid rhythm pattern: {}", s))
}

fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Debug, Deserialize)]
struct LabeledVerse {
    text: String,
    meter: MeterId,
}

/// Read a JSONL corpus of labeled verses, skipping blank lines.
fn read_corpus(path: &Path) -> Result<Vec<LabeledVerse>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read corpus {}", path.display()))?;
    let mut verses = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let verse: LabeledVerse = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: bad corpus line", path.display(), i + 1))?;
        verses.push(verse);
    }
    if verses.is_empty() {
        bail!("Corpus is empty: {}", path.display());
    }
    log::info!("Loaded {} labeled verses from {}", verses.len(), path.display());
    Ok(verses)
}

fn print_analysis(a: &VerseAnalysis) {
    println!("Verse: {}", a.text);
    for h in &a.hemistichs {
        let diacritics = if h.has_diacritics { "" } else { " (undiacritized)" };
        println!("  {}  {}{}", h.pattern, h.segmentation.names().join(" "), diacritics);
        if let Some(feet) = &h.scansion {
            let names: Vec<&str> = feet.iter().map(|f| f.name).collect();
            println!("    scansion: {}", names.join(" "));
        }
    }
    if a.candidates.is_empty() {
        println!("  No meter identified");
    }
    for c in &a.candidates {
        let def = meter(c.meter);
        let exact = if c.is_exact_match { "exact" } else { "fuzzy" };
        println!(
            "  {:<10} {:<10} {:.3}  {}  variations: {}",
            def.translit, def.name, c.confidence, exact, c.variations
        );
    }
    if let Some(reason) = a.uncertainty.reason {
        println!("  Uncertain ({:?}): {:?}", reason, a.uncertainty.contenders);
    }
    if a.recommendation.is_some() {
        println!("  Adding diacritics would improve the result");
    }
}

// ─── Runners ─────────────────────────────────────────────────────

fn run_analyze(args: AnalyzeArgs) -> Result<()> {
    let mut config = load_config(&args.shared)?;
    if let Some(k) = args.top_k {
        config.detector.top_k = k;
    }
    let analyzer = Analyzer::from_config(config)?;

    let texts: Vec<String> = match (&args.text, &args.file) {
        (Some(t), _) => vec![t.clone()],
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from)
            .collect(),
        (None, None) => bail!("Give verse text or --file"),
    };

    let mut json = Vec::new();
    for (text, result) in texts.iter().zip(analyzer.analyze_batch(&texts)) {
        match result {
            Ok(a) if args.shared.json => json.push(a.to_json_value()),
            Ok(a) => print_analysis(&a),
            Err(e) => log::warn!("Skipping {:?}: {}", text, e),
        }
    }
    if args.shared.json {
        print_json(&serde_json::Value::Array(json))?;
    }
    Ok(())
}

fn run_encode(args: EncodeArgs) -> Result<()> {
    let mut config = load_config(&args.shared)?;
    config.encode.saturate_final = !args.no_saturate;

    let hint = if args.undiacritized { Some(false) } else { None };
    let encoded = encode_detailed(&args.text, hint, &config.encode)?;

    if args.shared.json {
        print_json(&serde_json::json!({
            "normalized": encoded.normalized,
            "has_diacritics": encoded.has_diacritics,
            "phonemes": encoded.phonemes,
            "pattern": encoded.pattern,
        }))?;
    } else {
        println!("{}", encoded.pattern);
    }
    Ok(())
}

fn run_segment(args: SegmentArgs) -> Result<()> {
    let config = load_config(&args.shared)?;
    let pattern = if args.text {
        encode(&args.input, None, &config.encode)?
    } else {
        parse_pattern(&args.input)?
    };

    if let Some(name) = &args.meter {
        let id: MeterId = name.parse()?;
        let Some(feet) = scan_with_meter(&pattern, meter(id)) else {
            bail!("{} is not a form of {}", pattern, id);
        };
        if args.shared.json {
            print_json(&serde_json::to_value(&feet)?)?;
        } else {
            for f in &feet {
                let variations: Vec<&str> = f.variations.iter().map(|v| v.name()).collect();
                println!(
                    "{:<10} {:<10} {:<10} {}",
                    f.pattern,
                    f.name,
                    f.base,
                    variations.join(", ")
                );
            }
        }
        return Ok(());
    }

    let seg = segment(&pattern);
    if args.shared.json {
        print_json(&serde_json::to_value(&seg)?)?;
    } else {
        for f in &seg.feet {
            println!("{:>3}  {:<10} {:<10} {}", f.start, f.pattern, f.name, f.translit);
        }
        if !seg.is_complete() {
            println!("Unmatched at: {:?}", seg.residue);
        }
    }
    Ok(())
}

fn run_detect(args: DetectArgs) -> Result<()> {
    let config = load_config(&args.shared)?;
    let top_k = args.top_k.unwrap_or(config.detector.top_k);
    let analyzer = Analyzer::from_config(config)?;
    let detector = analyzer.detector();

    let patterns = args
        .patterns
        .iter()
        .map(|p| parse_pattern(p))
        .collect::<Result<Vec<_>>>()?;
    let batch = detector.detect_batch(&patterns, top_k);

    if args.shared.json {
        let out: Vec<serde_json::Value> = patterns
            .iter()
            .zip(&batch)
            .map(|(p, results)| {
                serde_json::json!({
                    "pattern": p,
                    "candidates": results,
                    "uncertainty": detector.classify(results),
                })
            })
            .collect();
        return print_json(&serde_json::Value::Array(out));
    }

    for (p, results) in patterns.iter().zip(&batch) {
        println!("{}", p);
        if results.is_empty() {
            println!("  No meter identified");
        }
        for r in results {
            println!(
                "  {:<10} {:.3}  {}",
                meter(r.meter).translit,
                r.confidence,
                r.matched_pattern
            );
        }
    }
    Ok(())
}

fn run_meters(args: MetersArgs) -> Result<()> {
    let analyzer = build_analyzer(&args.shared)?;
    let library = analyzer.library().snapshot();

    if args.shared.json {
        let meters: Vec<serde_json::Value> = library
            .meters()
            .iter()
            .map(|mp| {
                let def = mp.def();
                serde_json::json!({
                    "id": def.id,
                    "name": def.name,
                    "translit": def.translit,
                    "rank": def.rank,
                    "base_pattern": def.base_pattern(),
                    "patterns": mp.patterns.len(),
                    "empirical": mp.empirical_count(),
                })
            })
            .collect();
        return print_json(&serde_json::json!({
            "version": library.version(),
            "meters": meters,
        }));
    }

    println!("Library {} ({} patterns)", library.short_version(), library.len());
    for mp in library.meters() {
        let def = mp.def();
        println!(
            "{:>2}  {:<10} {:<10} {:>4}  {}",
            def.rank,
            def.translit,
            def.name,
            mp.patterns.len(),
            def.base_pattern()
        );
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    let analyzer = build_analyzer(&args.shared)?;
    let corpus = read_corpus(&args.corpus)?;
    let texts: Vec<String> = corpus.iter().map(|v| v.text.clone()).collect();
    let results = analyzer.analyze_batch(&texts);

    // meter -> (total, correct)
    let mut per_meter: BTreeMap<MeterId, (usize, usize)> = BTreeMap::new();
    let mut correct = 0usize;
    let mut failed = 0usize;
    let mut uncertain = 0usize;

    for (verse, result) in corpus.iter().zip(&results) {
        let entry = per_meter.entry(verse.meter).or_default();
        entry.0 += 1;
        match result {
            Ok(a) => {
                if a.uncertainty.is_uncertain {
                    uncertain += 1;
                }
                if a.best().is_some_and(|b| b.meter == verse.meter) {
                    correct += 1;
                    entry.1 += 1;
                }
            }
            Err(e) => {
                failed += 1;
                log::debug!("Failed on {:?}: {}", verse.text, e);
            }
        }
    }
    let accuracy = correct as f64 / corpus.len() as f64;

    if args.shared.json {
        let meters: serde_json::Map<String, serde_json::Value> = per_meter
            .iter()
            .map(|(id, (total, ok))| {
                (id.key().to_string(), serde_json::json!({ "total": total, "correct": ok }))
            })
            .collect();
        return print_json(&serde_json::json!({
            "total": corpus.len(),
            "correct": correct,
            "accuracy": accuracy,
            "uncertain": uncertain,
            "failed": failed,
            "meters": meters,
            "library_version": analyzer.library().snapshot().version(),
        }));
    }

    println!("Top-1 accuracy: {:.2}% ({}/{})", accuracy * 100.0, correct, corpus.len());
    println!("Uncertain: {}  Failed: {}", uncertain, failed);
    for (id, (total, ok)) in &per_meter {
        let pct = *ok as f64 * 100.0 / *total as f64;
        println!("  {:<10} {:>5}/{:<5} {:.1}%", id.key(), ok, total, pct);
    }
    Ok(())
}

fn run_mine(args: MineArgs) -> Result<()> {
    let analyzer = build_analyzer(&args.shared)?;
    let library = analyzer.library().snapshot();
    let corpus = read_corpus(&args.corpus)?;

    let found: Vec<(MeterId, RhythmPattern)> = corpus
        .par_iter()
        .flat_map_iter(|verse| {
            split_hemistichs(&verse.text)
                .into_iter()
                .filter_map(|h| match analyzer.encode(&h, None) {
                    Ok(e) => Some((verse.meter, e.pattern)),
                    Err(e) => {
                        log::debug!("Skipping hemistich {:?}: {}", h, e);
                        None
                    }
                })
                .collect::<Vec<_>>()
        })
        .filter(|(id, pattern)| library.lookup(*id, pattern).is_none())
        .collect();

    let mut supplement = Supplement::default();
    for (id, pattern) in found {
        supplement.insert(id, pattern);
    }

    let json = serde_json::to_string_pretty(&supplement.to_json_value())?;
    std::fs::write(&args.output, json)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    log::info!("Mined {} new patterns", supplement.len());
    println!("Wrote {} patterns to {}", supplement.len(), args.output.display());
    if !args.shared.json {
        for def in METERS {
            let n = supplement.patterns.get(&def.id).map_or(0, Vec::len);
            if n > 0 {
                println!("  {:<10} {}", def.translit, n);
            }
        }
    }
    Ok(())
}
