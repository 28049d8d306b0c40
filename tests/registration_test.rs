mod common;

use anyhow::Result;
use chrono::NaiveDate;
use common::test_service;
use suffragium::application::AppError;

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

#[tokio::test]
async fn test_create_election_starts_inactive() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let election = service
        .create_election(
            "Lok Sabha 2024",
            "Lok Sabha",
            Some(date("2024-04-19")),
            Some(date("2024-06-01")),
        )
        .await?;

    assert!(!election.is_active);
    assert_eq!(election.start_date, Some(date("2024-04-19")));

    let stored = service.get_election(election.id).await?;
    assert_eq!(stored.name, "Lok Sabha 2024");
    assert_eq!(stored.election_type, "Lok Sabha");
    assert_eq!(stored.end_date, Some(date("2024-06-01")));
    assert!(!stored.is_active);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_election_name_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .create_election("Municipal 2025", "Nagar Panchayat", None, None)
        .await?;
    let result = service
        .create_election("Municipal 2025", "Something else", None, None)
        .await;

    assert!(matches!(result, Err(AppError::DuplicateElectionName(ref n)) if n == "Municipal 2025"));
    assert!(result.unwrap_err().is_duplicate());
    assert_eq!(service.list_elections().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_election_requires_name_and_type() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let no_name = service.create_election("  ", "Lok Sabha", None, None).await;
    assert!(matches!(no_name, Err(AppError::Validation(_))));

    let no_type = service.create_election("General", "", None, None).await;
    assert!(matches!(no_type, Err(AppError::Validation(_))));

    let reversed = service
        .create_election(
            "General",
            "Lok Sabha",
            Some(date("2024-06-01")),
            Some(date("2024-04-19")),
        )
        .await;
    assert!(matches!(reversed, Err(AppError::Validation(_))));

    assert!(service.list_elections().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_registered_voter_is_listed_once() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let voter = service
        .create_voter(
            "ABC1234567",
            "Asha Rao",
            Some("asha@example.org".into()),
            Some("+91 98450 00000".into()),
        )
        .await?;
    assert!(!voter.has_voted);

    let voters = service.list_voters().await?;
    let matching: Vec<_> = voters
        .iter()
        .filter(|v| v.voter_id == "ABC1234567")
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].email.as_deref(), Some("asha@example.org"));
    assert_eq!(matching[0].face_embedding, None);

    Ok(())
}

#[tokio::test]
async fn test_duplicate_voter_id_and_email() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .create_voter("V-1", "Asha", Some("asha@example.org".into()), None)
        .await?;

    let same_id = service.create_voter("V-1", "Someone", None, None).await;
    assert!(matches!(same_id, Err(AppError::DuplicateVoterId(ref id)) if id == "V-1"));

    let same_email = service
        .create_voter("V-2", "Other", Some("asha@example.org".into()), None)
        .await;
    assert!(matches!(same_email, Err(AppError::DuplicateEmail(ref e)) if e == "asha@example.org"));

    assert_eq!(service.list_voters().await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_voters_without_email_do_not_collide() -> Result<()> {
    let (service, _temp) = test_service().await?;

    service
        .create_voter("V-1", "Asha", Some("".into()), None)
        .await?;
    service.create_voter("V-2", "Ravi", None, None).await?;

    let voters = service.list_voters().await?;
    assert_eq!(voters.len(), 2);
    assert!(voters.iter().all(|v| v.email.is_none()));
    Ok(())
}

#[tokio::test]
async fn test_voter_requires_id_and_name() -> Result<()> {
    let (service, _temp) = test_service().await?;

    assert!(matches!(
        service.create_voter("", "Asha", None, None).await,
        Err(AppError::Validation(_))
    ));
    assert!(matches!(
        service.create_voter("V-1", "", None, None).await,
        Err(AppError::Validation(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_candidate_needs_existing_election() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let result = service.create_candidate(42, "Nobody", None).await;
    assert!(matches!(result, Err(AppError::UnknownElection(42))));
    assert!(result.unwrap_err().is_reference());

    let election = service
        .create_election("General", "Lok Sabha", None, None)
        .await?;
    let blank = service.create_candidate(election.id, " ", None).await;
    assert!(matches!(blank, Err(AppError::Validation(_))));

    let candidate = service
        .create_candidate(election.id, "Meera", Some("Independent".into()))
        .await?;
    assert_eq!(candidate.vote_count, 0);
    assert_eq!(candidate.party.as_deref(), Some("Independent"));

    Ok(())
}

#[tokio::test]
async fn test_candidates_listed_by_election_then_name() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let zonal = service.create_election("Zonal", "Local", None, None).await?;
    let assembly = service
        .create_election("Assembly", "State", None, None)
        .await?;

    service.create_candidate(zonal.id, "Bala", None).await?;
    service.create_candidate(assembly.id, "Zoya", None).await?;
    service.create_candidate(zonal.id, "Anil", None).await?;
    service.create_candidate(assembly.id, "Kiran", None).await?;

    let listed: Vec<(String, String)> = service
        .list_candidates()
        .await?
        .into_iter()
        .map(|e| (e.election_name, e.candidate.name))
        .collect();

    assert_eq!(
        listed,
        vec![
            ("Assembly".to_string(), "Kiran".to_string()),
            ("Assembly".to_string(), "Zoya".to_string()),
            ("Zonal".to_string(), "Anil".to_string()),
            ("Zonal".to_string(), "Bala".to_string()),
        ]
    );
    Ok(())
}
