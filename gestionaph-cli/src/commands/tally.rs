use anyhow::Result;
use gestionaph_core::voting::ProjectTally;
use std::fmt::Write;
use std::path::Path;

pub async fn run(config_path: &Path, project_id: &str, json: bool) -> Result<()> {
    let portal = super::connect(config_path)?;
    let tally = portal.voting().project_tally(project_id).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&tally)?);
    } else {
        print!("{}", render(&tally));
    }
    Ok(())
}

/// Plain-text ranking, most voted first
pub fn render(tally: &ProjectTally) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Total votes: {}", tally.total_votes);
    for (rank, entry) in tally.ranking.iter().enumerate() {
        let _ = writeln!(
            out,
            "{:>2}. {:<24} {:>12.2} {:>4} votes {:>5.1}%",
            rank + 1,
            entry.quote.provider_name,
            entry.quote.amount,
            entry.vote_count,
            entry.percentage
        );
    }
    if tally.leader().is_none() {
        let _ = writeln!(out, "No votes yet");
    }
    out
}
