mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use common::{config, Behaviour, RecordingSink, RecordingSleeper, ScriptedRenderer};
use pretty_assertions::assert_eq;
use scrape_core::{FailureKind, PipelineConfig, Target};
use scrape_engine::{Converter, ExtractionPipeline, PipelineEvent};
use tempfile::TempDir;

struct Harness {
    pipeline: ExtractionPipeline,
    renderer: ScriptedRenderer,
    sleeper: Arc<RecordingSleeper>,
    sink: Arc<RecordingSink>,
}

fn harness(config: PipelineConfig, renderer: ScriptedRenderer) -> Harness {
    let sleeper = Arc::new(RecordingSleeper::default());
    let sink = Arc::new(RecordingSink::default());
    let pipeline = ExtractionPipeline::new(Arc::new(config), Arc::new(renderer.clone()))
        .with_sleeper(sleeper.clone())
        .with_sink(sink.clone());
    Harness {
        pipeline,
        renderer,
        sleeper,
        sink,
    }
}

#[tokio::test]
async fn first_attempt_success_saves_selected_content() {
    let temp = TempDir::new().unwrap();
    let h = harness(config(temp.path(), 3), ScriptedRenderer::new());

    let outcome = h.pipeline.run(Target::new("a", "doc")).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 1);
    let content = outcome.content().unwrap();
    assert!(content.contains("Body of a"), "unexpected content: {content:?}");
    assert!(!content.contains("Site menu"));
    assert!(!content.contains("Copyright footer"));

    let saved = fs::read_to_string(temp.path().join("doc.md")).unwrap();
    assert_eq!(saved, content);
    assert_eq!(outcome.path(), Some(temp.path().join("doc.md").as_path()));
    assert!(h.sleeper.delays().is_empty());
    assert_eq!(h.renderer.stats.opened(), 1);
    assert_eq!(h.renderer.stats.closed(), 1);
}

#[tokio::test]
async fn two_failures_then_success_backs_off_base_then_double() {
    let temp = TempDir::new().unwrap();
    let renderer = ScriptedRenderer::new().with("A", Behaviour::FailTimes(2));
    let h = harness(config(temp.path(), 3), renderer);

    let outcome = h.pipeline.run(Target::new("A", "x")).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 3);
    assert_eq!(
        h.sleeper.delays(),
        vec![Duration::from_millis(100), Duration::from_millis(200)]
    );
    assert!(temp.path().join("x.md").exists());
}

#[tokio::test]
async fn success_at_attempt_k_stops_retrying() {
    let temp = TempDir::new().unwrap();
    let renderer = ScriptedRenderer::new().with("a", Behaviour::FailTimes(1));
    let h = harness(config(temp.path(), 5), renderer);

    let outcome = h.pipeline.run(Target::new("a", "doc")).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 2);
    assert_eq!(h.renderer.stats.calls("a"), 2);
    assert_eq!(h.sleeper.delays().len(), 1);
}

#[tokio::test]
async fn always_failing_renderer_exhausts_all_attempts() {
    let temp = TempDir::new().unwrap();
    let renderer = ScriptedRenderer::new().with("a", Behaviour::AlwaysFail);
    let h = harness(config(temp.path(), 4), renderer);

    let outcome = h.pipeline.run(Target::new("a", "doc")).await;

    assert!(!outcome.is_success());
    assert_eq!(outcome.attempts, 4);
    let error = outcome.error().unwrap();
    assert_eq!(error.kind, FailureKind::Render);
    assert!(error.message.contains("scripted failure 4"), "{error}");

    let delays = h.sleeper.delays();
    assert_eq!(delays.len(), 3);
    assert!(delays.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(h.renderer.stats.calls("a"), 4);
    assert_eq!(h.renderer.stats.opened(), 4);
    assert_eq!(h.renderer.stats.closed(), 4);
    assert!(!temp.path().join("doc.md").exists());
}

#[tokio::test]
async fn failures_and_exhaustion_are_reported_to_the_sink() {
    let temp = TempDir::new().unwrap();
    let renderer = ScriptedRenderer::new().with("a", Behaviour::AlwaysFail);
    let h = harness(config(temp.path(), 2), renderer);

    h.pipeline.run(Target::new("a", "doc")).await;

    let events = h.sink.events();
    let failed = events
        .iter()
        .filter(|e| matches!(e, PipelineEvent::AttemptFailed { .. }))
        .count();
    assert_eq!(failed, 2);
    assert!(events.iter().any(|e| matches!(
        e,
        PipelineEvent::BackoffScheduled {
            next_attempt: 2,
            ..
        }
    )));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Exhausted { attempts: 2, .. })
    ));
}

#[tokio::test]
async fn page_load_timeout_is_a_retryable_render_failure() {
    let temp = TempDir::new().unwrap();
    let config = PipelineConfig {
        page_load_timeout: Duration::from_millis(50),
        ..config(temp.path(), 2)
    };
    let renderer = ScriptedRenderer::new().with("slow", Behaviour::Hang);
    let h = harness(config, renderer);

    let outcome = h.pipeline.run(Target::new("slow", "doc")).await;

    assert_eq!(outcome.attempts, 2);
    let error = outcome.error().unwrap();
    assert_eq!(error.kind, FailureKind::Render);
    assert!(error.message.contains("timed out"), "{error}");
    assert_eq!(h.renderer.stats.opened(), 2);
    assert_eq!(h.renderer.stats.closed(), 2);
}

#[tokio::test]
async fn panicking_renderer_still_releases_its_session() {
    let temp = TempDir::new().unwrap();
    let renderer = ScriptedRenderer::new().with("a", Behaviour::Panic);
    let h = harness(config(temp.path(), 3), renderer);

    let outcome = h.pipeline.run(Target::new("a", "doc")).await;

    assert_eq!(outcome.attempts, 3);
    let error = outcome.error().unwrap();
    assert_eq!(error.kind, FailureKind::Render);
    assert!(error.message.contains("renderer blew up"), "{error}");
    assert_eq!(h.renderer.stats.opened(), 3);
    assert_eq!(h.renderer.stats.closed(), 3);
}

#[tokio::test]
async fn blank_markup_counts_as_failure() {
    let temp = TempDir::new().unwrap();
    let renderer = ScriptedRenderer::new().with("a", Behaviour::Empty);
    let h = harness(config(temp.path(), 2), renderer);

    let outcome = h.pipeline.run(Target::new("a", "doc")).await;

    assert_eq!(outcome.attempts, 2);
    assert!(outcome
        .error()
        .unwrap()
        .message
        .contains("renderer returned no markup"));
}

#[tokio::test]
async fn persistence_failures_are_retried() {
    let temp = TempDir::new().unwrap();
    let not_a_dir = temp.path().join("occupied");
    fs::write(&not_a_dir, "x").unwrap();
    let h = harness(config(&not_a_dir, 3), ScriptedRenderer::new());

    let outcome = h.pipeline.run(Target::new("a", "doc")).await;

    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.error().unwrap().kind, FailureKind::Persistence);
    assert_eq!(h.renderer.stats.calls("a"), 3);
    assert_eq!(h.sleeper.delays().len(), 2);
}

#[tokio::test]
async fn missing_output_directory_is_created() {
    let temp = TempDir::new().unwrap();
    let nested = temp.path().join("deep").join("out");
    let h = harness(config(&nested, 1), ScriptedRenderer::new());

    let outcome = h.pipeline.run(Target::new("a", "doc")).await;

    assert!(outcome.is_success());
    assert!(nested.join("doc.md").is_file());
}

#[tokio::test]
async fn rerun_overwrites_previous_file() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("doc.md"), "stale content from an old run").unwrap();

    let first = harness(config(temp.path(), 1), ScriptedRenderer::new());
    first.pipeline.run(Target::new("a", "doc")).await;

    let second = harness(
        config(temp.path(), 1),
        ScriptedRenderer::new().with_body_prefix("Fresh text of"),
    );
    let outcome = second.pipeline.run(Target::new("a", "doc")).await;

    let saved = fs::read_to_string(temp.path().join("doc.md")).unwrap();
    assert_eq!(saved, outcome.content().unwrap());
    assert!(saved.contains("Fresh text of a"));
    assert!(!saved.contains("Body of a"));
    assert!(!saved.contains("stale"));
}

struct PanickingConverter;

impl Converter for PanickingConverter {
    fn to_markdown(&self, _html: &str) -> String {
        panic!("converter choked");
    }
}

#[tokio::test]
async fn converter_failure_saves_plain_text_without_retry() {
    let temp = TempDir::new().unwrap();
    let h = harness(config(temp.path(), 3), ScriptedRenderer::new());
    let pipeline = h.pipeline.with_converter(Arc::new(PanickingConverter));

    let outcome = pipeline.run(Target::new("a", "doc")).await;

    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 1);
    let content = outcome.content().unwrap();
    assert!(content.contains("Heading"));
    assert!(content.contains("Body of a"));
    assert!(!content.contains("Site menu"));
    assert!(h.sink.events().iter().any(|e| matches!(
        e,
        PipelineEvent::ConverterFallback { reason, .. } if reason == "converter choked"
    )));
}
