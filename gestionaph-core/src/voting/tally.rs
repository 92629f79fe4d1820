//! Vote counting and quote ranking
//!
//! Pure over one project's quotes and votes; recomputed on every read.

use crate::model::{ProjectQuote, ProjectVote};
use serde::Serialize;
use std::collections::HashMap;

/// One quote's share of the project vote
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteTally {
    #[serde(flatten)]
    pub quote: ProjectQuote,
    pub vote_count: usize,
    /// `vote_count / total_votes * 100`, or 0 when nobody voted
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectTally {
    /// Every vote of the project, including votes for unknown quotes
    pub total_votes: usize,
    /// Most voted first; equal counts keep quote order
    pub ranking: Vec<QuoteTally>,
}

impl ProjectTally {
    /// Quote in the lead, if anyone has voted
    pub fn leader(&self) -> Option<&QuoteTally> {
        self.ranking.first().filter(|entry| entry.vote_count > 0)
    }
}

pub fn tally(quotes: &[ProjectQuote], votes: &[ProjectVote]) -> ProjectTally {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for vote in votes {
        *counts.entry(vote.vote_choice.as_str()).or_default() += 1;
    }

    let total_votes = votes.len();
    let mut ranking: Vec<QuoteTally> = quotes
        .iter()
        .map(|quote| {
            let vote_count = counts.get(quote.id.as_str()).copied().unwrap_or(0);
            let percentage = if total_votes == 0 {
                0.0
            } else {
                vote_count as f64 / total_votes as f64 * 100.0
            };
            QuoteTally { quote: quote.clone(), vote_count, percentage }
        })
        .collect();

    // sort_by is stable
    ranking.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));

    ProjectTally { total_votes, ranking }
}
