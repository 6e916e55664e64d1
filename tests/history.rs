use amber_chat::{
    gateway::{Gateway, GeminiGateway, ModelGateway, OllamaGateway},
    models::{ChatMessage, Role},
    router::{ModelRouter, Provider},
    session::ChatSession,
    store::ConversationStore,
    title::generate_title,
};
use httpmock::prelude::*;
use serde_json::json;
use tempfile::TempDir;

fn open_store(max_history_length: usize) -> (TempDir, ConversationStore) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.db");
    let store = ConversationStore::open(path.to_str().unwrap(), max_history_length).unwrap();
    (dir, store)
}

#[tokio::test]
async fn conversation_over_ollama_survives_reopen() {
    let server = MockServer::start_async().await;
    let title = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/generate");
            then.status(200).json_body(json!({ "response": "\"Sourdough Basics\"" }));
        })
        .await;
    let chat = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(200).json_body(json!({
                "message": { "role": "assistant", "content": "Feed the starter daily." }
            }));
        })
        .await;

    let (dir, store) = open_store(30);
    let gateway = Gateway::Ollama(OllamaGateway::new(server.base_url()).with_model("llama2"));
    let mut session = ChatSession::new(Provider::Ollama, "llama2");

    session
        .send(&store, &gateway, "How do I keep a sourdough starter alive?")
        .await
        .unwrap();
    session.send(&store, &gateway, "And in summer?").await.unwrap();

    title.assert_hits_async(1).await;
    chat.assert_hits_async(2).await;

    let chat_id = session.chat_id().unwrap();
    drop(store);

    let path = dir.path().join("history.db");
    let reopened = ConversationStore::open(path.to_str().unwrap(), 30).unwrap();
    let stored = reopened.get_chat(chat_id).unwrap().unwrap();
    assert_eq!(stored.title, "Sourdough Basics");
    assert_eq!(stored.model, "ollama/llama2");
    assert_eq!(reopened.count_messages(chat_id).unwrap(), 4);

    let resumed = ChatSession::resume(&reopened, chat_id, Provider::Ollama, "llama2")
        .unwrap()
        .unwrap();
    assert_eq!(resumed.transcript(), session.transcript());
}

#[tokio::test]
async fn retention_keeps_newest_messages_across_turns() {
    let (_dir, store) = open_store(4);
    let chat_id = store.create_chat("Counting", "ollama/llama2").unwrap();

    for n in 0..7 {
        let role = if n % 2 == 0 { Role::User } else { Role::Assistant };
        store
            .save_message(chat_id, role, &format!("message {n}"), None)
            .unwrap();
        assert!(store.count_messages(chat_id).unwrap() <= 4);
    }

    let contents: Vec<String> = store
        .get_chat_messages(chat_id)
        .unwrap()
        .into_iter()
        .map(|message| message.content)
        .collect();
    assert_eq!(
        contents,
        vec!["message 3", "message 4", "message 5", "message 6"]
    );
}

#[tokio::test]
async fn router_dispatches_to_registered_gateway() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/models/gemini-pro:generateContent")
                .header("x-goog-api-key", "test-key");
            then.status(200).json_body(json!({
                "candidates": [{ "content": { "parts": [{ "text": "Bonjour" }] } }]
            }));
        })
        .await;

    let router = ModelRouter::from_gateways([(
        Provider::Gemini,
        Gateway::Gemini(GeminiGateway::new(
            "test-key",
            &server.base_url(),
            "gemini-pro",
        )),
    )]);

    assert_eq!(router.list_providers(), vec![Provider::Gemini]);
    assert!(router.get_model("openai").is_none());

    let gateway = router.get_model("GEMINI").unwrap();
    let reply = gateway
        .generate_response(&[ChatMessage::user("Say hello in French")])
        .await;
    assert_eq!(reply, "Bonjour");
}

#[tokio::test]
async fn unreachable_provider_still_records_the_turn() {
    let (_dir, store) = open_store(30);
    // Nothing listens on port 9 here.
    let gateway = OllamaGateway::new("http://127.0.0.1:9").with_model("llama2");
    let mut session = ChatSession::new(Provider::Ollama, "llama2");

    let reply = session
        .send(&store, &gateway, "Plan a weekend in Lisbon")
        .await
        .unwrap();
    assert!(reply.starts_with("Error generating response: "));

    let chat = store.get_chat(session.chat_id().unwrap()).unwrap().unwrap();
    assert_eq!(chat.title, generate_title("Plan a weekend in Lisbon"));
    assert_eq!(store.count_messages(chat.id).unwrap(), 2);
}

#[test]
fn clearing_history_removes_chats_and_attachments() {
    let (_dir, store) = open_store(30);
    let first = store.create_chat("One", "openai/gpt-4").unwrap();
    let second = store.create_chat("Two", "gemini/gemini-pro").unwrap();
    store.save_message(first, Role::User, "hi", None).unwrap();
    let attachment = store.save_attachment(second, "a.bin", &[0, 1, 2]).unwrap();

    assert_eq!(store.clear_all_history().unwrap(), 2);
    assert!(store.get_all_chats().unwrap().is_empty());
    assert!(store.get_chat_messages(first).unwrap().is_empty());
    assert!(store.get_attachment(attachment).unwrap().is_none());
}
