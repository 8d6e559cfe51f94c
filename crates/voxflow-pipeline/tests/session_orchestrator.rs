//! End-to-end session scenarios: generator → detector → worker → bus →
//! client events.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    CountingProvider, FailingProvider, RecordingProvider, ScriptedGenerator, SlowProvider,
    audio_events,
    audio_sequences, event_names, pipeline, pipeline_with, run_session,
};
use tokio::sync::mpsc;
use tokio_test::assert_ok;
use voxflow_core::{
    ErrorKind, GenerationRequest, GeneratorError, PipelineSettings, ProviderError, SessionId,
    SessionState, StreamEvent, SynthesisProvider,
};
use voxflow_pipeline::SilenceProvider;

const REPLY: [&str; 6] = [
    "Hello there. ",
    "How are you ",
    "feeling today? ",
    "I am doing ",
    "quite well, ",
    "thank you.",
];

fn silence() -> Arc<dyn SynthesisProvider> {
    Arc::new(SilenceProvider::new("backup"))
}

#[tokio::test]
async fn full_session_delivers_ordered_audio_then_stream_end() {
    let pipeline = pipeline(vec![silence()]);
    let (outcome, events) = run_session(&pipeline, ScriptedGenerator::tokens(&REPLY)).await;

    let names = event_names(&events);
    assert_eq!(names.first(), Some(&"meta"));
    assert_eq!(names.last(), Some(&"stream-end"));
    assert_eq!(names.iter().filter(|n| **n == "text-delta").count(), REPLY.len());

    assert_eq!(audio_sequences(&events), vec![0, 1, 2]);
    assert_eq!(outcome.state, SessionState::Closed);
    assert_eq!(outcome.summary.fragments, 3);
    assert_eq!(outcome.summary.ready, 3);
    assert!(!outcome.summary.timed_out);
    assert!(!outcome.client_disconnected);
    assert_eq!(outcome.accumulated_chars, REPLY.concat().chars().count());

    match events.last() {
        Some(StreamEvent::StreamEnd { summary }) => assert_eq!(summary, &outcome.summary),
        other => panic!("expected stream-end, got {other:?}"),
    }
}

#[tokio::test]
async fn meta_names_model_and_providers() {
    let pipeline = pipeline(vec![silence()]);
    let (outcome, events) = run_session(&pipeline, ScriptedGenerator::tokens(&["Hi there you."])).await;

    assert_eq!(
        events[0],
        StreamEvent::Meta {
            session_id: outcome.session_id,
            model: "scripted".to_string(),
            providers: vec!["backup".to_string()],
        }
    );
}

#[tokio::test]
async fn failing_primary_falls_back_for_every_fragment() {
    let pipeline = pipeline(vec![
        Arc::new(FailingProvider::new(
            "primary",
            ProviderError::Unavailable("connection refused".into()),
        )),
        silence(),
    ]);
    let (outcome, events) = run_session(&pipeline, ScriptedGenerator::tokens(&REPLY)).await;

    assert_eq!(outcome.summary.ready, 3);
    for event in audio_events(&events) {
        match event {
            StreamEvent::AudioChunk { provider_used, .. } => assert_eq!(provider_used, "backup"),
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[tokio::test]
async fn exhausted_chain_reports_audio_errors_and_still_ends() {
    let pipeline = pipeline(vec![Arc::new(FailingProvider::new(
        "primary",
        ProviderError::Rejected("quota exceeded".into()),
    ))]);
    let (outcome, events) = run_session(&pipeline, ScriptedGenerator::tokens(&REPLY)).await;

    assert_eq!(outcome.summary.failed, 3);
    assert_eq!(outcome.summary.ready, 0);
    assert_eq!(audio_sequences(&events), vec![0, 1, 2]);
    assert!(audio_events(&events).iter().all(|e| matches!(
        e,
        StreamEvent::AudioError {
            error_kind: ErrorKind::AllProvidersExhausted,
            ..
        }
    )));
    assert_eq!(event_names(&events).last(), Some(&"stream-end"));
}

#[tokio::test]
async fn generator_error_emits_error_then_drains_accumulated_text() {
    let pipeline = pipeline(vec![silence()]);
    let generator = ScriptedGenerator::failing_after(
        &["Partial sentence here. ", "and more"],
        GeneratorError::Connection("reset".into()),
    );
    let (outcome, events) = run_session(&pipeline, generator).await;

    let names = event_names(&events);
    let error_at = names.iter().position(|n| *n == "error").expect("error event");
    assert_eq!(names.last(), Some(&"stream-end"));
    assert!(error_at < names.len() - 1);

    // The trailing short remainder is still spoken.
    assert_eq!(outcome.summary.fragments, 2);
    assert_eq!(outcome.summary.ready, 2);
    assert_eq!(
        outcome.generator_error,
        Some(GeneratorError::Connection("reset".into()))
    );
}

#[tokio::test]
async fn unreachable_generator_ends_with_error_and_empty_summary() {
    let pipeline = pipeline(vec![silence()]);
    let generator = ScriptedGenerator::unreachable(GeneratorError::Upstream {
        status: 503,
        body: "busy".into(),
    });
    let (outcome, events) = run_session(&pipeline, generator).await;

    assert_eq!(event_names(&events), vec!["meta", "error", "stream-end"]);
    assert_eq!(outcome.summary.fragments, 0);
}

#[tokio::test(start_paused = true)]
async fn idle_generator_is_treated_as_failure() {
    let settings = PipelineSettings {
        session_idle_timeout_ms: 1_000,
        ..PipelineSettings::default()
    };
    let pipeline = pipeline_with(vec![silence()], settings);
    let generator = ScriptedGenerator::hanging_after(&["Hello there friend"]);
    let (outcome, events) = run_session(&pipeline, generator).await;

    assert_eq!(
        outcome.generator_error,
        Some(GeneratorError::IdleTimeout(Duration::from_secs(1)))
    );
    assert!(event_names(&events).contains(&"error"));
    assert_eq!(outcome.summary.fragments, 1);
    assert_eq!(outcome.summary.ready, 1);
}

#[tokio::test(start_paused = true)]
async fn stalled_generator_open_times_out() {
    let settings = PipelineSettings {
        session_idle_timeout_ms: 1_000,
        ..PipelineSettings::default()
    };
    let pipeline = pipeline_with(vec![silence()], settings);
    let (outcome, events) = run_session(&pipeline, ScriptedGenerator::stalled()).await;

    assert_eq!(event_names(&events), vec!["meta", "error", "stream-end"]);
    assert_eq!(
        outcome.generator_error,
        Some(GeneratorError::IdleTimeout(Duration::from_secs(1)))
    );
    assert_eq!(outcome.summary.fragments, 0);
    assert!(!pipeline.is_active(&outcome.session_id));
}

#[tokio::test(start_paused = true)]
async fn drain_timeout_ends_stream_with_timed_out_flag() {
    let settings = PipelineSettings {
        drain_timeout_ms: 1_000,
        provider_timeout_ms: 60_000,
        ..PipelineSettings::default()
    };
    let pipeline = pipeline_with(
        vec![Arc::new(SlowProvider::new(Duration::from_secs(30)))],
        settings,
    );
    let (outcome, events) = run_session(&pipeline, ScriptedGenerator::tokens(&REPLY)).await;

    assert!(outcome.summary.timed_out);
    assert_eq!(outcome.summary.fragments, 3);
    assert_eq!(outcome.summary.ready, 0);
    assert_eq!(event_names(&events).last(), Some(&"stream-end"));

    // Everything left behind was purged with the session.
    assert!(pipeline.registry().list_by_session(&outcome.session_id).is_empty());
    assert_eq!(pipeline.status().queue_length, 0);
}

#[tokio::test]
async fn short_fragments_are_merged_with_the_next() {
    let pipeline = pipeline(vec![silence()]);
    let generator =
        ScriptedGenerator::tokens(&["Hi. ", "Yes. ", "This is a longer sentence. ", "Ok."]);
    let (outcome, events) = run_session(&pipeline, generator).await;

    // "Hi. Yes. This is a longer sentence." then the trailing "Ok." on flush.
    assert_eq!(outcome.summary.fragments, 2);
    assert_eq!(audio_sequences(&events), vec![0, 1]);
}

#[tokio::test]
async fn merging_never_exceeds_max_fragment_chars() {
    let settings = PipelineSettings {
        max_fragment_chars: 40,
        min_fragment_chars: 10,
        ..PipelineSettings::default()
    };
    let recording = Arc::new(RecordingProvider::default());
    let pipeline = pipeline_with(
        vec![recording.clone() as Arc<dyn SynthesisProvider>],
        settings,
    );
    let long = "This sentence runs close to the limit.";
    assert!(long.chars().count() <= 40);
    let (outcome, _) = run_session(&pipeline, ScriptedGenerator::tokens(&["Hi. ", long])).await;

    // Merging "Hi." would overflow, so it is spoken on its own.
    assert_eq!(outcome.summary.fragments, 2);
    assert_eq!(recording.texts(), vec!["Hi.".to_string(), long.to_string()]);
}

#[tokio::test]
async fn repeated_text_is_served_from_cache() {
    let counting = Arc::new(CountingProvider::default());
    let pipeline = pipeline(vec![counting.clone() as Arc<dyn SynthesisProvider>]);

    let (first, _) = run_session(&pipeline, ScriptedGenerator::tokens(&REPLY)).await;
    let (second, events) = run_session(&pipeline, ScriptedGenerator::tokens(&REPLY)).await;

    assert_eq!(first.summary.ready, 3);
    assert_eq!(second.summary.ready, 3);
    assert_eq!(counting.calls(), 3);
    assert!(audio_events(&events).iter().all(|e| matches!(
        e,
        StreamEvent::AudioChunk { provider_used, .. } if provider_used == "counting"
    )));
}

#[tokio::test]
async fn disconnect_purges_session_state() {
    let pipeline = pipeline(vec![Arc::new(SlowProvider::new(Duration::from_secs(30)))]);
    let orchestrator = pipeline.begin_session(None, None).unwrap();
    let session_id = orchestrator.session_id().clone();

    let (tx, mut rx) = mpsc::channel(64);
    let handle = tokio::spawn(orchestrator.run(
        Arc::new(ScriptedGenerator::tokens(&REPLY)),
        GenerationRequest::new("How are you?"),
        tx,
    ));

    // By the third delta the first two sentences have been registered.
    let mut deltas = 0;
    while deltas < 3 {
        match rx.recv().await {
            Some(StreamEvent::TextDelta { .. }) => deltas += 1,
            Some(_) => {}
            None => panic!("session closed before the client left"),
        }
    }
    drop(rx);

    let outcome = assert_ok!(handle.await);
    assert!(outcome.client_disconnected);
    assert!(outcome.summary.fragments >= 2);

    assert!(pipeline.registry().list_by_session(&session_id).is_empty());
    assert_eq!(pipeline.bus().subscriber_count(&session_id), 0);
    assert_eq!(pipeline.status().queue_length, 0);
    assert!(!pipeline.is_active(&session_id));
}

#[tokio::test(start_paused = true)]
async fn in_flight_synthesis_publishes_nothing_after_disconnect() {
    let pipeline = pipeline(vec![Arc::new(SlowProvider::new(Duration::from_secs(3)))]);
    let orchestrator = pipeline.begin_session(None, None).unwrap();
    let session_id = orchestrator.session_id().clone();
    let mut spy = pipeline.bus().subscribe(&session_id);

    let (tx, mut rx) = mpsc::channel(64);
    let handle = tokio::spawn(orchestrator.run(
        Arc::new(ScriptedGenerator::tokens(&REPLY)),
        GenerationRequest::new("How are you?"),
        tx,
    ));

    let mut deltas = 0;
    while deltas < 3 {
        match rx.recv().await {
            Some(StreamEvent::TextDelta { .. }) => deltas += 1,
            Some(_) => {}
            None => panic!("session closed before the client left"),
        }
    }
    while spy.receiver.try_recv().is_ok() {}
    drop(rx);

    let outcome = assert_ok!(handle.await);
    assert!(outcome.client_disconnected);

    // Let the provider call that was in flight finish.
    tokio::time::sleep(Duration::from_secs(20)).await;

    assert!(spy.receiver.try_recv().is_err());
    assert!(pipeline.registry().list_by_session(&session_id).is_empty());
    assert!(!pipeline.status().worker_busy);
}

#[tokio::test]
async fn concurrent_sessions_keep_their_own_order() {
    let pipeline = pipeline(vec![silence()]);

    let a = run_session(&pipeline, ScriptedGenerator::tokens(&REPLY));
    let b = run_session(
        &pipeline,
        ScriptedGenerator::tokens(&["First of all. ", "Second of all. ", "Third and last."]),
    );
    let ((outcome_a, events_a), (outcome_b, events_b)) = tokio::join!(a, b);

    assert_ne!(outcome_a.session_id, outcome_b.session_id);
    assert_eq!(audio_sequences(&events_a), vec![0, 1, 2]);
    assert_eq!(audio_sequences(&events_b), vec![0, 1, 2]);
    assert_eq!(pipeline.status().active_sessions, 0);
    assert_eq!(pipeline.registry().session_count(), 0);
}

#[tokio::test]
async fn caller_supplied_session_id_is_used() {
    let pipeline = pipeline(vec![silence()]);
    let orchestrator = pipeline
        .begin_session(Some(SessionId::from("client-42")), None)
        .unwrap();
    assert_eq!(orchestrator.session_id().as_str(), "client-42");
}
