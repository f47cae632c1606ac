use std::path::PathBuf;
use std::process::ExitCode;

use bpe_tokenizer_editor::BpeTokenizerEditor;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bpe-tokenizer-editor", about = "Edit HuggingFace-style BPE tokenizer.json files")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print vocabulary/merge-table statistics and validate merge integrity.
    Inspect { path: PathBuf },
    /// Add one or more tokens, using the first applicable strategy for each.
    Add {
        path: PathBuf,
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Remove one or more tokens, cascading to every dependent merge result.
    Remove {
        path: PathBuf,
        #[arg(long = "token", required = true)]
        tokens: Vec<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Shrink the vocabulary by cascade-removing the longest, highest-id
    /// non-special, non-single-character tokens first.
    Shrink {
        path: PathBuf,
        #[arg(long)]
        count: usize,
        #[arg(long = "min-id", default_value_t = 0)]
        min_id: u32,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> bpe_tokenizer_editor::Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { path } => inspect(&path),
        Command::Add { path, tokens, out } => add(&path, &tokens, out.as_deref()),
        Command::Remove { path, tokens, out } => remove(&path, &tokens, out.as_deref()),
        Command::Shrink {
            path,
            count,
            min_id,
            out,
        } => shrink(&path, count, min_id, out.as_deref()),
    }
}

fn inspect(path: &std::path::Path) -> bpe_tokenizer_editor::Result<()> {
    let editor = BpeTokenizerEditor::load(path)?;
    let stats = editor.get_stats();
    println!("vocab size:      {}", stats.vocab_size);
    println!("merges:          {}", stats.merges_count);
    println!("single-char:     {}", stats.single_char_count);
    println!("special tokens:  {}", stats.special_token_count);
    println!(
        "id range:        {}..={}",
        stats.min_token_id.unwrap_or(0),
        stats.max_token_id.unwrap_or(0)
    );

    let validation = editor.validate_merges();
    if validation.invalid_count == 0 {
        println!("merges valid:    yes ({} checked)", validation.valid_count);
    } else {
        println!(
            "merges valid:    no ({} of {} invalid)",
            validation.invalid_count,
            validation.valid_count + validation.invalid_count
        );
        for invalid in &validation.invalid_merges {
            println!("  [{}] {} + {}", invalid.position, invalid.left, invalid.right);
        }
    }
    Ok(())
}

fn add(path: &std::path::Path, tokens: &[String], out: Option<&std::path::Path>) -> bpe_tokenizer_editor::Result<()> {
    let mut editor = BpeTokenizerEditor::load(path)?;
    let results = editor.add_tokens(tokens);
    for (token, result) in tokens.iter().zip(results) {
        match result {
            Ok(result) => println!("{token:?}: {} (id {})", result.method, result.id),
            Err(err) => println!("{token:?}: failed ({err})"),
        }
    }
    editor.save(out.unwrap_or(path))
}

fn remove(path: &std::path::Path, tokens: &[String], out: Option<&std::path::Path>) -> bpe_tokenizer_editor::Result<()> {
    let mut editor = BpeTokenizerEditor::load(path)?;
    let results = editor.remove_tokens(tokens);
    let removed: std::collections::HashSet<_> = results.iter().map(|r| r.requested.as_str()).collect();
    for token in tokens {
        if !removed.contains(token.as_str()) {
            println!("{token:?}: not in vocabulary, skipped");
        }
    }
    for result in &results {
        println!("{:?}: removed {} token(s)", result.requested, result.removed_tokens.len());
    }
    editor.save(out.unwrap_or(path))
}

#[cfg(feature = "progressbar")]
fn shrink_progress(count: usize) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(count as u64);
    bar.set_style(
        indicatif::ProgressStyle::with_template("{bar:40} {pos}/{len} candidates")
            .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar()),
    );
    bar
}

fn shrink(
    path: &std::path::Path,
    count: usize,
    min_id: u32,
    out: Option<&std::path::Path>,
) -> bpe_tokenizer_editor::Result<()> {
    let mut editor = BpeTokenizerEditor::load(path)?;

    #[cfg(feature = "progressbar")]
    let bar = shrink_progress(count);

    let result = editor.shrink(count, min_id)?;

    #[cfg(feature = "progressbar")]
    {
        bar.set_position(result.roots.len() as u64);
        bar.finish_and_clear();
    }

    println!(
        "shrink: {} -> {} vocab entries ({} roots, {} tokens removed, {} merges dropped)",
        result.initial_vocab_size,
        result.final_vocab_size,
        result.roots.len(),
        result.removed_tokens.len(),
        result.removed_merges
    );
    editor.save(out.unwrap_or(path))
}
