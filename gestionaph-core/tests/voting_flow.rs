//! Project voting and the quote ranking

use gestionaph_core::model::ProjectStatus;
use gestionaph_core::voting::{NewProject, NewQuote, VotingService};
use gestionaph_core::{Portal, PortalError};

fn quote(provider: &str, amount: f64) -> NewQuote {
    NewQuote {
        provider_name: provider.to_string(),
        amount,
        file_url: format!("https://files.test/{}.pdf", provider.to_lowercase()),
    }
}

async fn project_with_quotes(voting: &VotingService) -> (String, Vec<String>) {
    let project = voting
        .create_project(NewProject::new("New roof", "Replace the clubhouse roof", 45_000.0))
        .await
        .unwrap();
    let mut quotes = Vec::new();
    for (provider, amount) in [("Alfa", 41_000.0), ("Beta", 43_500.0), ("Gamma", 39_900.0)] {
        quotes.push(voting.add_quote(&project, quote(provider, amount)).await.unwrap());
    }
    (project, quotes)
}

#[tokio::test]
async fn ranking_follows_vote_share() {
    let portal = Portal::in_memory("voting-flow");
    let voting = portal.voting();
    let (project, quotes) = project_with_quotes(&voting).await;
    voting.set_status(&project, ProjectStatus::Voting).await.unwrap();

    voting.submit_vote(&project, "u1", &quotes[1]).await.unwrap();
    voting.submit_vote(&project, "u2", &quotes[1]).await.unwrap();
    voting.submit_vote(&project, "u3", &quotes[2]).await.unwrap();

    let tally = voting.project_tally(&project).await.unwrap();
    assert_eq!(tally.total_votes, 3);

    let ranked: Vec<(&str, usize)> = tally
        .ranking
        .iter()
        .map(|entry| (entry.quote.provider_name.as_str(), entry.vote_count))
        .collect();
    assert_eq!(ranked, [("Beta", 2), ("Gamma", 1), ("Alfa", 0)]);
    assert!((tally.ranking[0].percentage - 66.666).abs() < 0.01);
    assert!((tally.ranking[1].percentage - 33.333).abs() < 0.01);
    assert_eq!(tally.ranking[2].percentage, 0.0);
    assert_eq!(tally.leader().map(|l| l.quote.id.as_str()), Some(quotes[1].as_str()));
}

#[tokio::test]
async fn revote_replaces_previous_choice() {
    let portal = Portal::in_memory("voting-flow");
    let voting = portal.voting();
    let (project, quotes) = project_with_quotes(&voting).await;
    voting.set_status(&project, ProjectStatus::Voting).await.unwrap();

    let first = voting.submit_vote(&project, "u1", &quotes[0]).await.unwrap();
    let second = voting.submit_vote(&project, "u1", &quotes[2]).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first, format!("{}_u1", project));

    let tally = voting.project_tally(&project).await.unwrap();
    assert_eq!(tally.total_votes, 1);
    assert_eq!(tally.ranking[0].quote.id, quotes[2]);
    assert_eq!(tally.ranking[0].percentage, 100.0);

    let overview = voting.list_projects(Some("u1")).await.unwrap();
    assert_eq!(overview.len(), 1);
    let vote = overview[0].user_vote.as_ref().unwrap();
    assert_eq!(vote.vote_choice, quotes[2]);
}

#[tokio::test]
async fn votes_need_an_open_project_and_its_own_quote() {
    let portal = Portal::in_memory("voting-flow");
    let voting = portal.voting();
    let (project, quotes) = project_with_quotes(&voting).await;
    let (other, other_quotes) = project_with_quotes(&voting).await;

    let closed = voting.submit_vote(&project, "u1", &quotes[0]).await;
    assert!(matches!(closed, Err(PortalError::Validation(_))));

    voting.set_status(&project, ProjectStatus::Voting).await.unwrap();
    voting.set_status(&other, ProjectStatus::Voting).await.unwrap();
    let foreign = voting.submit_vote(&project, "u1", &other_quotes[0]).await;
    assert!(matches!(foreign, Err(PortalError::Validation(_))));

    let missing = voting.submit_vote("nope", "u1", &quotes[0]).await;
    assert!(matches!(missing, Err(PortalError::Validation(_))));

    assert_eq!(voting.project_tally(&project).await.unwrap().total_votes, 0);
}

#[tokio::test]
async fn project_without_votes_ranks_in_quote_order() {
    let portal = Portal::in_memory("voting-flow");
    let voting = portal.voting();
    let (project, quotes) = project_with_quotes(&voting).await;

    let tally = voting.project_tally(&project).await.unwrap();
    assert_eq!(tally.total_votes, 0);
    assert!(tally.leader().is_none());
    let ids: Vec<&str> = tally.ranking.iter().map(|entry| entry.quote.id.as_str()).collect();
    assert_eq!(ids, quotes.iter().map(String::as_str).collect::<Vec<_>>());
    assert!(tally.ranking.iter().all(|entry| entry.percentage == 0.0));
}

#[tokio::test]
async fn quote_for_missing_project_is_not_found() {
    let portal = Portal::in_memory("voting-flow");
    let err = portal.voting().add_quote("missing", quote("Alfa", 100.0)).await;
    assert!(matches!(err, Err(PortalError::NotFound { .. })));
}
