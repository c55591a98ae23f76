use imitation_core::conversation::{NewConversation, PersistenceGateway};
use imitation_core::profile::{AutomationProfile, DEFAULT_PROMPT_TEMPLATE};
use imitation_core::session::AUTOMATION_PARTICIPANT_ID;
use imitation_infrastructure::{InMemoryConversationStore, ProfileCatalog, TomlConversationStore};
use tempfile::TempDir;

fn automation_game(session_id: &str, human: &str) -> NewConversation {
    NewConversation {
        session_id: session_id.to_string(),
        first_participant_id: human.to_string(),
        second_participant_id: AUTOMATION_PARTICIPANT_ID.to_string(),
        first_is_automation: false,
        second_is_automation: true,
        automation_profile_id: Some("barista".to_string()),
    }
}

fn human_game(session_id: &str, first: &str, second: &str) -> NewConversation {
    NewConversation {
        session_id: session_id.to_string(),
        first_participant_id: first.to_string(),
        second_participant_id: second.to_string(),
        first_is_automation: false,
        second_is_automation: false,
        automation_profile_id: None,
    }
}

fn catalog() -> ProfileCatalog {
    ProfileCatalog::new(vec![
        AutomationProfile::new("barista", "Sam").with_prompt_template("You are {{ name }}."),
    ])
}

/// Behaviour every Persistence Gateway must share.
async fn exercise_gateway(store: &dyn PersistenceGateway) {
    // Create, then look up by session id
    let created = store
        .create_conversation(automation_game("s-auto", "alice"))
        .await
        .expect("Should create conversation");
    assert_eq!(created.conversation_id, "s-auto");

    let record = store
        .get_conversation_by_session_id("s-auto")
        .await
        .unwrap()
        .expect("Record should exist");
    assert_eq!(record.first_participant_id, "alice");
    assert_eq!(record.opponent_is_automation("alice"), Some(true));

    assert!(store.get_conversation_by_session_id("s-none").await.unwrap().is_none());

    // Duplicate creation is refused
    assert!(
        store
            .create_conversation(automation_game("s-auto", "alice"))
            .await
            .is_err()
    );

    // Messages are kept in order
    store.create_message("s-auto", true, "hi there", "alice").await.unwrap();
    store
        .create_message("s-auto", false, "hey!", AUTOMATION_PARTICIPANT_ID)
        .await
        .unwrap();
    let messages = store.list_messages("s-auto").await.unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "hi there");
    assert!(messages[0].sender_is_first);
    assert_eq!(messages[1].sender_id, AUTOMATION_PARTICIPANT_ID);

    let err = store.create_message("s-none", true, "lost", "alice").await.unwrap_err();
    assert!(err.is_not_found());

    // Guesses are scored and immutable
    let record = store.submit_guess("s-auto", "alice", true).await.unwrap();
    assert_eq!(record.first_guess, Some(true));
    assert_eq!(record.first_guess_correct, Some(true));

    let record = store.submit_guess("s-auto", "alice", false).await.unwrap();
    assert_eq!(record.first_guess, Some(true));

    let err = store.submit_guess("s-auto", "mallory", true).await.unwrap_err();
    assert!(err.is_validation());

    let err = store.submit_guess("s-none", "alice", true).await.unwrap_err();
    assert!(err.is_not_found());

    // Participant history and statistics
    store
        .create_conversation(human_game("s-human", "bob", "alice"))
        .await
        .unwrap();
    store.submit_guess("s-human", "bob", true).await.unwrap();

    let history = store.conversations_for_participant("alice").await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].created_at >= history[1].created_at);
    assert!(store.conversations_for_participant("carol").await.unwrap().is_empty());

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.finished_games, 2);
    assert_eq!(stats.total_guesses, 2);
    assert_eq!(stats.correct_guesses, 1);
    assert_eq!(stats.automation_games, 1);
    assert_eq!(stats.human_games, 1);

    // Profile catalog
    let profile = store.random_automation_profile().await.unwrap().unwrap();
    assert_eq!(profile.id, "barista");
    assert_eq!(
        store.prompt_template(Some("barista")).await.unwrap(),
        "You are {{ name }}."
    );
    assert_eq!(store.prompt_template(None).await.unwrap(), DEFAULT_PROMPT_TEMPLATE);
}

#[tokio::test]
async fn test_in_memory_store() {
    let store = InMemoryConversationStore::new(catalog());
    exercise_gateway(&store).await;
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_toml_store() {
    let temp_dir = TempDir::new().unwrap();
    let store = TomlConversationStore::new(temp_dir.path().join("conversations"), catalog());
    exercise_gateway(&store).await;

    assert!(temp_dir.path().join("conversations").join("s-auto.toml").exists());
}

#[tokio::test]
async fn test_toml_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("conversations");

    {
        let store = TomlConversationStore::new(root.clone(), ProfileCatalog::default());
        store
            .create_conversation(human_game("s1", "bob", "carol"))
            .await
            .unwrap();
        store.create_message("s1", true, "hello", "bob").await.unwrap();
        store.submit_guess("s1", "carol", false).await.unwrap();
    }

    let reopened = TomlConversationStore::new(root, ProfileCatalog::default());
    let record = reopened
        .get_conversation_by_session_id("s1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.second_guess_correct, Some(true));
    assert_eq!(reopened.list_messages("s1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_toml_store_skips_corrupt_documents() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path().join("conversations");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("broken.toml"), "this is = = not toml").unwrap();

    let store = TomlConversationStore::new(root, ProfileCatalog::default());
    store
        .create_conversation(human_game("s1", "bob", "carol"))
        .await
        .unwrap();

    let stats = store.statistics().await.unwrap();
    assert_eq!(stats.human_games, 1);
}

#[tokio::test]
async fn test_empty_catalog_yields_no_profile() {
    let store = InMemoryConversationStore::default();
    assert!(store.random_automation_profile().await.unwrap().is_none());
    assert!(store.is_empty().await);
}
