mod common;

use std::time::{Duration, Instant};

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use guardchat::backends::{Stats, Verdict};
use guardchat::commands::chat::{ChatSession, LoopControl};
use guardchat::config::ChatConfig;
use guardchat::conversation::ConversationState;

use common::{router_for, transport_config};

fn stats_body() -> serde_json::Value {
    json!({
        "total_prompts": 5,
        "safe_count": 4,
        "misuse_count": 1,
        "flagged_count": 0
    })
}

async fn mount_classify(server: &MockServer, delay: Duration) {
    Mock::given(method("POST"))
        .and(path("/api/classify"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "id": "c1",
                    "predicted_class": 0,
                    "confidence": 0.97,
                    "processing_time": 0.02
                }))
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_slow_stats_refresh_does_not_hold_up_the_prompt() {
    let rest = MockServer::start().await;
    mount_classify(&rest, Duration::from_millis(300)).await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stats_body())
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&rest)
        .await;

    let router = router_for(&transport_config(&rest.uri(), None));
    let mut session = ChatSession::start(&ChatConfig::default(), router);

    let started = Instant::now();
    assert_eq!(session.handle_line("hello").await, LoopControl::Continue);
    assert_eq!(session.handle_line("/stats").await, LoopControl::Continue);
    session.render_pending();
    let elapsed = started.elapsed();

    assert!(
        elapsed < Duration::from_secs(2),
        "input handling waited {:?} for stats",
        elapsed
    );

    let conversation = session.conversation();
    assert_eq!(conversation.state(), ConversationState::Idle);
    assert_eq!(conversation.messages().len(), 3);
    assert_eq!(conversation.messages()[2].predicted_class, Some(Verdict::Safe));
    // The refresh is still in flight
    assert_eq!(conversation.stats(), Stats::default());
}

#[tokio::test]
async fn test_finish_waits_for_background_refresh() {
    let rest = MockServer::start().await;
    mount_classify(&rest, Duration::ZERO).await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(stats_body())
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&rest)
        .await;

    let router = router_for(&transport_config(&rest.uri(), None));
    let config = ChatConfig {
        show_welcome: false,
        show_sidebar: false,
    };
    let mut session = ChatSession::start(&config, router);

    session.handle_line("hello").await;
    session.finish().await;

    assert_eq!(
        session.conversation().stats(),
        Stats {
            total_prompts: 5,
            safe_count: 4,
            misuse_count: 1,
            flagged_count: 0,
        }
    );
}

#[tokio::test]
async fn test_failed_classification_returns_to_prompt() {
    let rest = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/classify"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&rest)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/stats"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&rest)
        .await;

    let router = router_for(&transport_config(&rest.uri(), None));
    let mut session = ChatSession::start(&ChatConfig::default(), router);

    assert_eq!(session.handle_line("hello").await, LoopControl::Continue);
    assert_eq!(session.handle_line("/flag").await, LoopControl::Continue);
    session.finish().await;

    let conversation = session.conversation();
    assert_eq!(conversation.state(), ConversationState::Idle);
    assert!(conversation.flaggable().is_empty());
}
