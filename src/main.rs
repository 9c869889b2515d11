use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reprise::grade::QualityGrade;
use reprise::store::CsvStore;
use reprise::{review, sm2};

#[derive(Parser)]
#[command(name = "reprise", version, about = "SM-2 review scheduling over a CSV card file")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Review due cards in the terminal
    Drill { file: PathBuf },
    /// Serve the JSON review API
    Serve {
        file: PathBuf,
        #[arg(short, long, env = "REPRISE_PORT", default_value_t = 3000)]
        port: u16,
    },
    /// Show due counts and the difficulty spread
    Stats { file: PathBuf },
    /// Add cards with fresh scheduling state
    Enroll {
        file: PathBuf,
        #[arg(required = true)]
        prompts: Vec<String>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Drill { file } => drill(open(&file)?),
        Command::Serve { file, port } => {
            let store = open(&file)?;
            tokio::runtime::Runtime::new()
                .context("failed to start tokio runtime")?
                .block_on(reprise::web::serve(store, port))
                .with_context(|| format!("server on port {port} failed"))
        }
        Command::Stats { file } => {
            stats(&open(&file)?);
            Ok(())
        }
        Command::Enroll { file, prompts } => {
            let mut store = open(&file)?;
            let now = Utc::now();
            for prompt in &prompts {
                let id = store.enroll(prompt, now)?;
                println!("{id}\t{prompt}");
            }
            Ok(())
        }
    }
}

fn open(file: &Path) -> anyhow::Result<CsvStore> {
    CsvStore::open(file).with_context(|| format!("cannot open {}", file.display()))
}

fn stats(store: &CsvStore) {
    let now = Utc::now();
    let records = store.records();
    let due = review::filter_due(records, now).len();
    let summary = review::difficulty_summary(records);

    println!("{} cards, {} due", records.len(), due);
    println!(
        "  recommended session: {}",
        review::recommend_session_size(due)
    );
    println!(
        "  hard: {}, medium: {}, easy: {}",
        summary.hard, summary.medium, summary.easy
    );
}

fn drill(mut store: CsvStore) -> anyhow::Result<()> {
    let now = Utc::now();
    let due_total = review::filter_due(store.records(), now).len();
    let mut session: Vec<(String, String)> = review::build_session(store.records(), now)
        .into_iter()
        .map(|i| {
            let r = &store.records()[i];
            (r.id.clone(), r.prompt.clone())
        })
        .collect();

    if session.is_empty() {
        println!("No cards due for review.");
        return Ok(());
    }

    println!(
        "{} cards due, reviewing {} this session.\n",
        due_total,
        session.len()
    );
    shuffle(&mut session);

    let mut counts = [0u32; 6];
    let stdin = io::stdin();
    let mut stdin = stdin.lock();
    let mut buf = String::new();

    for (i, (id, prompt)) in session.iter().enumerate() {
        println!("[{}/{}]", i + 1, session.len());
        println!();
        println!("{prompt}");
        println!();

        print!("Press Enter when you have an answer...");
        io::stdout().flush()?;
        buf.clear();
        stdin.read_line(&mut buf)?;

        let grade = loop {
            print!("Rate 0-5 (0=blackout, 3=hesitant, 5=perfect): ");
            io::stdout().flush()?;
            buf.clear();
            if stdin.read_line(&mut buf)? == 0 {
                println!();
                println!("Input closed, ending session early.");
                return Ok(());
            }
            match buf.parse::<QualityGrade>() {
                Ok(g) => break g,
                Err(e) => println!("{e}"),
            }
        };

        // Each grading is stamped with its own instant.
        let graded_at = Utc::now();
        let state = review::grade_card(&mut store, id, grade, graded_at)
            .with_context(|| format!("could not save review of card {id}"))?;
        counts[usize::from(grade.value())] += 1;
        println!(
            "Next review in {} day(s).",
            sm2::days_until_due(&state, graded_at)
        );
        println!();
    }

    println!("Session complete!");
    let tally: Vec<String> = QualityGrade::ALL
        .iter()
        .map(|g| format!("{g}: {}", counts[usize::from(g.value())]))
        .collect();
    println!("  {}", tally.join(", "));
    Ok(())
}

fn shuffle<T>(items: &mut [T]) {
    // Fisher-Yates over a time-seeded xorshift64
    let mut state: u64 = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(1, |d| d.as_nanos() as u64);
    if state == 0 {
        state = 1;
    }

    for i in (1..items.len()).rev() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        let j = (state as usize) % (i + 1);
        items.swap(i, j);
    }
}
