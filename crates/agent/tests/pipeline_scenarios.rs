use std::sync::Arc;

use promptgate_agent::openai::OpenAiChatModel;
use promptgate_agent::testing::ScriptedChatModel;
use promptgate_agent::{InvocationOverrides, Pipeline};
use promptgate_core::config::{ConfigOverrides, LoadOptions};
use promptgate_core::{ConversationState, GuardVerdict, Role, Settings};
use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings_with_banned(words: &[&str]) -> Arc<Settings> {
    let mut settings = Settings::default();
    settings.rules.banned_words = words.iter().map(|word| word.to_string()).collect();
    Arc::new(settings)
}

fn completion(content: serde_json::Value) -> serde_json::Value {
    json!({
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content.to_string(), "refusal": null},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn banned_word_prompt_gets_a_kind_reminder() {
    let model = Arc::new(ScriptedChatModel::new().reply(
        "guard_result",
        json!({"allowed": false, "reason": "The prompt contains the forbidden term 'joke'"}),
    ));
    let pipeline = Pipeline::new(model, settings_with_banned(&["weather", "joke", "horoscope"]));

    let state = pipeline
        .run_prompt("tell me a joke", &InvocationOverrides::default())
        .await
        .expect("pipeline should complete");

    let last = state.final_message().expect("final message");
    assert_eq!(last.role, Role::Assistant);
    assert!(last.content.starts_with("Kind reminder: "));
    assert!(last.content.contains("The prompt contains the forbidden term 'joke'"));
    assert!(!state.allowed());
}

#[tokio::test]
async fn allowed_prompt_returns_the_answer_verbatim() {
    let answer = "Protocol ABC is a standardized cardiology guideline for patient care.";
    let model = Arc::new(
        ScriptedChatModel::new()
            .reply("guard_result", json!({"allowed": true, "reason": null}))
            .reply("answer_result", json!({ "answer": answer })),
    );
    let pipeline = Pipeline::new(model.clone(), settings_with_banned(&["weather", "joke"]));

    let state = pipeline
        .run_prompt("Summarize protocol ABC for cardiology.", &InvocationOverrides::default())
        .await
        .expect("pipeline should complete");

    let last = state.final_message().expect("final message");
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, answer);
    assert_eq!(state.verdict(), &GuardVerdict::Allowed);
    assert_eq!(state.messages().len(), 2);

    let requests = model.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[0].schema.name, "guard_result");
    assert_eq!(requests[1].schema.name, "answer_result");
}

#[tokio::test]
async fn identical_input_yields_identical_final_state() {
    let model = Arc::new(
        ScriptedChatModel::new()
            .reply("guard_result", json!({"allowed": true, "reason": null}))
            .reply("answer_result", json!({"answer": "same every time"})),
    );
    let pipeline = Pipeline::new(model, Arc::new(Settings::default()));
    let overrides = InvocationOverrides::default();

    let first = pipeline
        .run(ConversationState::from_prompt("hello"), &overrides)
        .await
        .expect("first run");
    let second = pipeline
        .run(ConversationState::from_prompt("hello"), &overrides)
        .await
        .expect("second run");

    assert_eq!(first, second);
}

#[tokio::test]
async fn overrides_do_not_leak_into_settings_or_later_runs() {
    let model = Arc::new(
        ScriptedChatModel::new()
            .reply("guard_result", json!({"allowed": true}))
            .reply("answer_result", json!({"answer": "ok"})),
    );
    let settings = Arc::new(Settings::default());
    let pipeline = Pipeline::new(model.clone(), settings.clone());

    let overrides = InvocationOverrides {
        guard_model: Some("guard-override".to_string()),
        main_model: Some("main-override".to_string()),
        temperature: Some(0.8),
    };
    pipeline.run_prompt("first", &overrides).await.expect("overridden run");
    pipeline.run_prompt("second", &InvocationOverrides::default()).await.expect("default run");

    let models: Vec<_> = model.requests().into_iter().map(|request| request.model).collect();
    assert_eq!(models, vec!["guard-override", "main-override", "gpt-4o-mini", "gpt-4o"]);
    assert_eq!(settings.llm.guard_model, "gpt-4o-mini");
    assert_eq!(settings.llm.temperature, 0.0);
}

#[tokio::test]
async fn http_backed_pipeline_answers_allowed_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("guard_result"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(json!({"allowed": true, "reason": null}))),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("answer_result"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion(json!({"answer": "ABC covers cardiology triage."}))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let settings = Settings::load(LoadOptions {
        config_path: Some("does-not-exist.toml".into()),
        overrides: ConfigOverrides {
            api_key: Some("sk-test".to_string()),
            base_url: Some(server.uri()),
            ..ConfigOverrides::default()
        },
        ..LoadOptions::default()
    })
    .expect("settings should load");
    let model = OpenAiChatModel::from_config(&settings.llm).expect("client should build");
    let pipeline = Pipeline::new(Arc::new(model), Arc::new(settings));

    let state = pipeline
        .run_prompt("Summarize protocol ABC for cardiology.", &InvocationOverrides::default())
        .await
        .expect("pipeline should complete");

    assert_eq!(
        state.final_message().map(|message| message.content.as_str()),
        Some("ABC covers cardiology triage.")
    );
}

#[tokio::test]
async fn http_backed_pipeline_surfaces_guard_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let model = OpenAiChatModel::new(&server.uri(), "sk-test".to_string().into(), 5)
        .expect("client should build");
    let pipeline = Pipeline::new(Arc::new(model), Arc::new(Settings::default()));

    let error = pipeline
        .run_prompt("hello", &InvocationOverrides::default())
        .await
        .expect_err("guard outage should fail the invocation");

    assert!(error.to_string().contains("guard classification failed"));
    assert!(error.to_string().contains("503"));
}
