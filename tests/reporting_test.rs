mod common;

use anyhow::Result;
use common::{cast_votes_for, register_voters, seed_election, test_service};
use suffragium::application::ResultsSelection;

#[tokio::test]
async fn test_results_ranked_by_votes_then_name() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeded = seed_election(&service, "General", &["C", "A", "B"]).await?;

    cast_votes_for(&service, &seeded, "A", 3).await?;
    cast_votes_for(&service, &seeded, "B", 5).await?;
    cast_votes_for(&service, &seeded, "C", 3).await?;

    let page = service.results(Some(seeded.election.id)).await?;
    assert_eq!(page.election().map(|e| e.id), Some(seeded.election.id));

    let order: Vec<&str> = page
        .standings()
        .iter()
        .map(|s| s.candidate.name.as_str())
        .collect();
    assert_eq!(order, vec!["B", "A", "C"]);

    let ranks: Vec<usize> = page.standings().iter().map(|s| s.rank).collect();
    assert_eq!(ranks, vec![1, 2, 2]);

    match &page.selection {
        ResultsSelection::Selected { total_votes, .. } => assert_eq!(*total_votes, 11),
        other => panic!("expected a selection, got {:?}", other),
    }
    Ok(())
}

#[tokio::test]
async fn test_results_for_unknown_election_is_not_an_error() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_election(&service, "General", &["A"]).await?;

    let page = service.results(Some(404)).await?;
    assert!(page.is_invalid());
    assert!(page.standings().is_empty());
    assert_eq!(page.elections.len(), 1);
    assert!(matches!(
        page.selection,
        ResultsSelection::Invalid { election_id: 404 }
    ));
    Ok(())
}

#[tokio::test]
async fn test_results_without_selection_lists_elections() -> Result<()> {
    let (service, _temp) = test_service().await?;
    seed_election(&service, "General", &["A"]).await?;
    seed_election(&service, "Council", &["B"]).await?;

    let page = service.results(None).await?;
    assert!(matches!(page.selection, ResultsSelection::None));
    assert!(page.election().is_none());
    assert_eq!(page.elections.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_dashboard_counts_and_ordering() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let zonal = seed_election(&service, "Zonal", &["Anil", "Bala"]).await?;
    let assembly = seed_election(&service, "Assembly", &["Kiran", "Zoya"]).await?;

    cast_votes_for(&service, &zonal, "Bala", 2).await?;
    cast_votes_for(&service, &assembly, "Zoya", 1).await?;
    register_voters(&service, "idle", 2).await?;

    let dashboard = service.dashboard().await?;
    assert_eq!(dashboard.election_count, 2);
    assert_eq!(dashboard.voter_count, 5);
    assert_eq!(dashboard.candidate_count, 4);
    assert_eq!(dashboard.vote_count, 3);

    let rows: Vec<(&str, &str, i64)> = dashboard
        .candidates
        .iter()
        .map(|e| {
            (
                e.election_name.as_str(),
                e.candidate.name.as_str(),
                e.candidate.vote_count,
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            ("Assembly", "Zoya", 1),
            ("Assembly", "Kiran", 0),
            ("Zonal", "Bala", 2),
            ("Zonal", "Anil", 0),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_empty_ledger_dashboard() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let dashboard = service.dashboard().await?;
    assert_eq!(dashboard.election_count, 0);
    assert_eq!(dashboard.vote_count, 0);
    assert!(dashboard.candidates.is_empty());

    let report = service.check_integrity().await?;
    assert!(report.is_healthy());
    Ok(())
}

#[tokio::test]
async fn test_integrity_detects_drifted_tally() -> Result<()> {
    let (service, _temp) = test_service().await?;
    let seeded = seed_election(&service, "General", &["A", "B"]).await?;
    cast_votes_for(&service, &seeded, "A", 2).await?;
    assert!(service.check_integrity().await?.is_healthy());

    sqlx::query("UPDATE candidates SET vote_count = vote_count + 5 WHERE id = ?")
        .bind(seeded.candidate("B").id)
        .execute(service.repository().pool())
        .await?;

    let report = service.check_integrity().await?;
    assert!(!report.is_healthy());
    assert_eq!(report.counted_total, 7);
    assert!(report.issues.iter().any(|i| i.contains("'B'")));
    Ok(())
}
