use clap::{Parser, Subcommand};

use watch_check::candidate::{CHALLENGES, MediaCandidate};
use watch_check::{AssessmentResult, Config, WatchCheck, diagnostics_for};

#[derive(Parser)]
#[command(
    name = "watch-check",
    about = "Will watching this knock you out of Whamageddon?"
)]
struct Cli {
    /// Output machine-readable JSON (default: human-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Do not write the diagnostics log
    #[arg(long, global = true)]
    no_diagnostics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Assess a movie or TV title
    Check {
        /// Title query, e.g. "The Office S03E10" (remaining args are joined)
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// List the candidates a query resolves to
    Search {
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Show the challenges and their knockout songs
    Challenges,
}

// ============================================================================
// Output Formatting
// ============================================================================

/// One-line summary of a candidate.
fn describe(candidate: &MediaCandidate) -> String {
    let mut line = format!(
        "{} ({}, {}) [id {}]",
        candidate.title, candidate.year, candidate.kind, candidate.id
    );
    match (candidate.season_number, candidate.episode_number) {
        (Some(s), Some(e)) => line.push_str(&format!(" S{s:02}E{e:02}")),
        (Some(s), None) => line.push_str(&format!(" season {s}")),
        _ => {}
    }
    line
}

fn print_result(result: &AssessmentResult) {
    println!("{}", describe(&result.matched));
    if let Some(ref source) = result.matched.source {
        println!("  {source}");
    }
    println!();
    println!("{}", result.assessment);
    println!();
    println!("Source: {}", result.source);

    if !result.alternatives.is_empty() {
        println!();
        println!("Did you mean:");
        for alt in &result.alternatives {
            println!("  - {}", describe(alt));
        }
    }
}

fn print_candidates(candidates: &[MediaCandidate]) {
    if candidates.is_empty() {
        println!("No candidates found.");
        return;
    }
    for (i, candidate) in candidates.iter().enumerate() {
        println!("{}. {}", i + 1, describe(candidate));
        if let Some(ref description) = candidate.description {
            println!("   {description}");
        }
    }
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();
    let diagnostics = diagnostics_for(&config, !cli.no_diagnostics);
    let pipeline = WatchCheck::from_config(&config, diagnostics);

    match cli.command {
        Command::Check { query } => {
            let result = match pipeline.check(&query.join(" ")).await {
                Ok(result) => result,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print_result(&result);
            }
        }
        Command::Search { query } => {
            let candidates = match pipeline.search(&query.join(" ")).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    eprintln!("{e}");
                    std::process::exit(1);
                }
            };
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&candidates)?);
            } else {
                print_candidates(&candidates);
            }
        }
        Command::Challenges => {
            if cli.json {
                let value: Vec<_> = CHALLENGES
                    .iter()
                    .map(|c| {
                        serde_json::json!({
                            "name": c.name,
                            "window": c.window,
                            "knockoutSongs": c.knockout_songs,
                        })
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&value)?);
            } else {
                for challenge in CHALLENGES {
                    println!("{} ({})", challenge.name, challenge.window);
                    for song in challenge.knockout_songs {
                        println!("  - {song}");
                    }
                }
            }
        }
    }

    Ok(())
}
