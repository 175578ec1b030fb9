//! End-to-end flows through the public API over an in-process directory

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use expert_discovery::{
    DirectoryService, DiscoveryConfig, DiscoveryEngine, DiscoveryError, Expert, ExpertId,
    InMemoryDirectory, NotificationKind, Operation, SearchFilterEngine, Session, ToggleOutcome,
};

const EMAIL: &str = "ana@example.com";

const CATALOG: &str = r#"[
    {"_id": "a1", "name": "Asha Rao", "domain": "ai engineer", "location": "Bangalore",
     "skills": ["pytorch", "nlp"], "linkedin": "https://linkedin.com/in/asha"},
    {"_id": "b2", "name": "Bo Chen", "domain": "UX Designer", "location": "Delhi"},
    {"id": 3, "name": "Carmen Diaz", "domain": "AI Engineer", "location": "Mumbai"},
    {"id": "d4", "name": "Dev Patel", "domain": "Data Science", "location": "Pune",
     "about": "Forecasting at scale"},
    {"id": "e5", "name": "Eli Stone", "domain": "Cloud", "location": "Goa"}
]"#;

fn setup(signed_in: bool) -> (Arc<InMemoryDirectory>, DiscoveryEngine) {
    let directory = Arc::new(InMemoryDirectory::from_json(CATALOG).expect("catalog"));
    let session = Session::in_memory();
    if signed_in {
        session.login(EMAIL, "token");
    }
    let engine = DiscoveryEngine::new(directory.clone(), session, &DiscoveryConfig::default());
    (directory, engine)
}

fn ids(experts: &[Expert]) -> Vec<&str> {
    experts.iter().map(|e| e.id.as_str()).collect()
}

#[tokio::test]
async fn test_catalog_parses_mixed_id_shapes() {
    let (_, engine) = setup(false);
    let catalog = engine.catalog.ensure_loaded(engine.service()).await.unwrap();

    assert_eq!(ids(&catalog), vec!["a1", "b2", "3", "d4", "e5"]);
    assert_eq!(catalog[3].bio.as_deref(), Some("Forecasting at scale"));
    assert!(!catalog[0].links.is_empty());
    assert_eq!(
        engine.catalog.domains().await,
        vec!["Ai Engineer", "Cloud", "Data Science", "UX Designer"]
    );
    assert_eq!(engine.catalog.stats().await.domains_covered, 4);
}

#[tokio::test]
async fn test_search_by_domain_and_query() {
    let (_, engine) = setup(false);

    let mut search = SearchFilterEngine::new();
    search.toggle_domain("AI Engineer");
    assert_eq!(ids(&engine.search(&search).await.unwrap()), vec!["a1", "3"]);

    search.set_query("mumbai");
    assert_eq!(ids(&engine.search(&search).await.unwrap()), vec!["3"]);
}

#[tokio::test]
async fn test_anonymous_search_is_not_recorded() {
    let (directory, engine) = setup(false);
    let results = engine
        .search(&SearchFilterEngine::with_query("chen"))
        .await
        .unwrap();

    assert_eq!(ids(&results), vec!["b2"]);
    assert_eq!(directory.calls(Operation::AppendRecentSearch), 0);
    assert_eq!(directory.calls(Operation::Recommendations), 0);
}

#[tokio::test]
async fn test_search_history_drives_recommendations() {
    let (directory, engine) = setup(true);

    for q in ["cloud", "ux", "ai"] {
        engine.search(&SearchFilterEngine::with_query(q)).await.unwrap();
    }
    assert_eq!(engine.recent.list(), vec!["ai", "ux", "cloud"]);
    assert_eq!(directory.last_seed(), Some(vec!["ai".to_string()]));

    let feed = engine.recommendations.current();
    assert!(feed.len() <= 5);
    let unique: HashSet<_> = feed.iter().map(|e| &e.id).collect();
    assert_eq!(unique.len(), feed.len());
    // both AI engineers match the seed and lead the feed
    assert_eq!(
        feed[..2].iter().map(|e| e.id.as_str()).collect::<HashSet<_>>(),
        HashSet::from(["a1", "3"])
    );

    engine.search(&SearchFilterEngine::with_query("cloud")).await.unwrap();
    assert_eq!(engine.recent.list(), vec!["cloud", "ai", "ux"]);
    assert_eq!(directory.last_seed(), Some(vec!["cloud".to_string()]));
}

#[tokio::test]
async fn test_recent_list_never_exceeds_three() {
    let (_, engine) = setup(true);
    for q in ["a", "b", "c", "d", "b", "e", "a"] {
        let list = engine.recent.submit(q).await.unwrap();
        assert!(list.len() <= 3);
    }
    assert_eq!(engine.recent.list(), vec!["a", "e", "b"]);
}

#[tokio::test]
async fn test_failed_history_append_still_returns_results() {
    let (directory, engine) = setup(true);
    directory.inject_failure(
        Operation::AppendRecentSearch,
        DiscoveryError::Network("offline".into()),
    );

    let results = engine
        .search(&SearchFilterEngine::with_query("goa"))
        .await
        .unwrap();
    assert_eq!(ids(&results), vec!["e5"]);
    assert!(engine.recent.list().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_trending_rotates_over_catalog() {
    let (_, engine) = setup(false);
    engine
        .trending
        .load_from_catalog(&engine.catalog, engine.service())
        .await
        .unwrap();

    let sequence: Vec<ExpertId> = engine.trending.items().into_iter().map(|e| e.id).collect();
    assert_eq!(sequence.len(), 5);

    let highlighted = engine.trending.highlighted().unwrap();
    assert_eq!(highlighted.id, sequence[1]);

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(engine.trending.highlighted().unwrap().id, sequence[2]);

    engine.trending.stop();
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(engine.trending.highlighted().unwrap().id, sequence[2]);
}

#[tokio::test(start_paused = true)]
async fn test_bookmark_round_trip_through_saved_view() {
    let (directory, engine) = setup(true);
    let mut notes = engine.notifications.subscribe();
    let id = ExpertId::new("d4");

    assert_eq!(engine.bookmarks.toggle(&id).await, ToggleOutcome::Saved);
    assert_eq!(directory.saved_ids(EMAIL), vec![id.clone()]);

    let saved = engine.saved.load().await.unwrap();
    assert_eq!(ids(&saved), vec!["d4"]);

    assert_eq!(engine.saved.remove(&id).await, ToggleOutcome::Removed);
    assert!(directory.saved_ids(EMAIL).is_empty());
    assert!(engine.saved.entries()[0].removing);

    tokio::time::sleep(Duration::from_millis(301)).await;
    assert!(engine.saved.experts().is_empty());

    let kinds: Vec<_> = [notes.recv().await.unwrap(), notes.recv().await.unwrap()]
        .into_iter()
        .map(|n| (n.kind, n.message))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (NotificationKind::Success, "Expert saved successfully.".to_string()),
            (NotificationKind::Success, "Expert removed from saved.".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_server_rejection_surfaces_message() {
    let (directory, engine) = setup(true);
    let id = ExpertId::new("a1");
    // saved elsewhere, local mirror not yet loaded
    directory.save_expert(EMAIL, &id).await.unwrap();

    let outcome = engine.bookmarks.toggle(&id).await;
    assert_eq!(
        outcome,
        ToggleOutcome::Failed {
            message: "Expert already saved".into()
        }
    );
    assert!(!engine.bookmarks.is_saved(&id));

    engine.bookmarks.load().await.unwrap();
    assert!(engine.bookmarks.is_saved(&id));
}

#[tokio::test]
async fn test_logout_clears_session_scoped_state() {
    let (_, engine) = setup(true);
    engine.recent.submit("ml").await.unwrap();
    engine.bookmarks.toggle(&ExpertId::new("b2")).await;

    engine.session().logout();
    assert!(engine.recommendations.refresh().await.is_empty());
    assert_eq!(
        engine.bookmarks.toggle(&ExpertId::new("b2")).await,
        ToggleOutcome::RequiresAuth
    );
    assert!(engine.bookmarks.load().await.unwrap().is_empty());
    assert!(!engine.bookmarks.is_saved(&ExpertId::new("b2")));
}

#[tokio::test]
async fn test_next_user_starts_clean() {
    let (directory, engine) = setup(true);
    engine.search(&SearchFilterEngine::with_query("secret")).await.unwrap();
    let id = ExpertId::new("e5");
    assert_eq!(engine.bookmarks.toggle(&id).await, ToggleOutcome::Saved);

    engine.session().logout();
    engine.session().login("ben@example.com", "token-b");

    assert!(engine.recent.list().is_empty());
    assert!(!engine.bookmarks.is_saved(&id));
    assert!(engine.saved.load().await.unwrap().is_empty());

    assert_eq!(engine.bookmarks.toggle(&id).await, ToggleOutcome::Saved);
    assert_eq!(directory.saved_ids("ben@example.com"), vec![id.clone()]);
    assert_eq!(directory.saved_ids(EMAIL), vec![id]);
}
