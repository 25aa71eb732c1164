use parla_core::{
    audio_channel, result_channel, AudioFrame, RecognizerConfig, ResultMessage, SessionConfig,
};
use parla_engine::{DriverOutcome, RecognitionDriver, RecognizerRegistry};
use std::time::Duration;

#[tokio::test]
async fn test_full_pipeline_null_recognizer() {
    let registry = RecognizerRegistry::new();
    let recognizer_config = RecognizerConfig::default();
    let recognizer = registry.build(&recognizer_config).unwrap();
    let streaming = recognizer_config.streaming_config(&SessionConfig::new("en-US"));

    let (audio_tx, audio_rx) = audio_channel(8);
    let (results_tx, mut results_rx) = result_channel(8);
    let handle = RecognitionDriver::new(1, recognizer, streaming).spawn(audio_rx, results_tx);

    audio_tx.send_frame(AudioFrame::new(vec![0; 480])).await.unwrap();
    audio_tx.send_frame(AudioFrame::new(vec![0; 320])).await.unwrap();
    audio_tx.finish().await;

    let timeout = Duration::from_secs(2);
    let mut transcripts = Vec::new();
    loop {
        let message = tokio::time::timeout(timeout, results_rx.recv())
            .await
            .expect("timed out");
        match message {
            ResultMessage::Event(event) => transcripts.push((event.transcript, event.is_final)),
            ResultMessage::EndOfStream => break,
            ResultMessage::Failure(msg) => panic!("unexpected failure: {msg}"),
        }
    }

    assert_eq!(
        transcripts,
        vec![
            ("[null] 480 bytes".to_string(), false),
            ("[null] 320 bytes".to_string(), false),
            ("[null] 800 bytes".to_string(), true),
        ]
    );

    let report = handle.await.unwrap();
    assert_eq!(report.frames_fed, 2);
    assert_eq!(report.outcome, DriverOutcome::Completed);
}

#[tokio::test]
async fn test_simul_recognizer_unreachable_reports_failure() {
    let registry = RecognizerRegistry::new();
    // Bind then drop to get a port nothing listens on
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let mut extra = toml::map::Map::new();
    extra.insert(
        "address".to_string(),
        toml::Value::String(format!("127.0.0.1:{port}")),
    );
    let recognizer_config = RecognizerConfig {
        engine: "simul".to_string(),
        extra: toml::Value::Table(extra),
        ..RecognizerConfig::default()
    };
    let recognizer = registry.build(&recognizer_config).unwrap();
    let streaming = recognizer_config.streaming_config(&SessionConfig::new("en-US"));

    let (_audio_tx, audio_rx) = audio_channel(8);
    let (results_tx, mut results_rx) = result_channel(8);
    let handle = RecognitionDriver::new(2, recognizer, streaming).spawn(audio_rx, results_tx);

    let message = tokio::time::timeout(Duration::from_secs(5), results_rx.recv())
        .await
        .expect("timed out");
    assert!(matches!(message, ResultMessage::Failure(_)));
    assert_eq!(results_rx.recv().await, ResultMessage::EndOfStream);

    let report = handle.await.unwrap();
    assert!(matches!(report.outcome, DriverOutcome::Failed(_)));
}
