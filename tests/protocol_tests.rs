// Tests for the protocol session state machine and the wire schema.

mod common;

use std::time::Duration;

use common::{make_packet, MockConnector};
use scribe_stream::{
    InboundMessage, OutboundMessage, ProtocolConfig, ProtocolSession, PunctuationMode,
    SequencedChunkEncoder, SessionState, StartError, StreamDescriptor,
};

fn test_config() -> ProtocolConfig {
    ProtocolConfig {
        connect_timeout: Duration::from_millis(200),
        end_wait: Duration::from_millis(200),
        ..ProtocolConfig::default()
    }
}

#[tokio::test]
async fn connect_sends_config_first_and_reaches_streaming() {
    let (connector, mut remote) = MockConnector::new();
    let mut session = ProtocolSession::new(ProtocolConfig {
        speech_locales: vec!["ENGLISH_US".to_string(), "SPANISH_ES".to_string()],
        punctuation_mode: Some(PunctuationMode::Explicit),
        ..test_config()
    });

    let _inbound = session.connect(&connector, "token-123").await.unwrap();
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(
        connector.last_bearer.lock().unwrap().as_deref(),
        Some("token-123")
    );

    let first = remote.outbound_rx.recv().await.unwrap();
    match first {
        OutboundMessage::Config {
            encoding,
            sample_rate,
            speech_locales,
            streams,
            punctuation_mode,
            enable_audio_chunk_ack,
        } => {
            assert_eq!(encoding, "PCM_S16LE");
            assert_eq!(sample_rate, 16_000);
            assert_eq!(speech_locales, vec!["ENGLISH_US", "SPANISH_ES"]);
            assert_eq!(streams.len(), 1);
            assert_eq!(punctuation_mode, Some(PunctuationMode::Explicit));
            assert!(enable_audio_chunk_ack);
        }
        other => panic!("expected CONFIG first, got {other:?}"),
    }
}

#[test]
fn wire_format_matches_the_service_schema() {
    let config = OutboundMessage::Config {
        encoding: "PCM_S16LE".to_string(),
        sample_rate: 16_000,
        speech_locales: vec!["ENGLISH_US".to_string(), "SPANISH_ES".to_string()],
        streams: vec![StreamDescriptor::unspecified("stream1")],
        punctuation_mode: None,
        enable_audio_chunk_ack: true,
    };
    let value = serde_json::to_value(&config).unwrap();
    assert_eq!(value["type"], "CONFIG");
    assert_eq!(value["speech_locales"][0], "ENGLISH_US");
    assert_eq!(value["speech_locales"][1], "SPANISH_ES");
    assert_eq!(value["streams"][0]["speaker_type"], "unspecified");
    assert!(
        value.get("punctuation_mode").is_none(),
        "unset punctuation mode must be omitted"
    );

    let end = serde_json::to_value(&OutboundMessage::End).unwrap();
    assert_eq!(end["type"], "END");

    let inbound: InboundMessage = serde_json::from_str(
        r#"{"type":"TRANSCRIPT_ITEM","id":"it1","start_offset_ms":100,
            "end_offset_ms":900,"text":"hello","is_final":false}"#,
    )
    .unwrap();
    let fragment = inbound.into_fragment().unwrap();
    assert_eq!(fragment.id, "it1");
    assert!(!fragment.is_final);

    let ack: InboundMessage =
        serde_json::from_str(r#"{"type":"AUDIO_CHUNK_ACK","seq_id":7}"#).unwrap();
    assert!(ack.into_fragment().is_none());
}

#[tokio::test]
async fn connect_times_out_and_fails_the_session() {
    let (connector, _remote) = MockConnector::slow(Duration::from_secs(60));
    let mut session = ProtocolSession::new(ProtocolConfig {
        connect_timeout: Duration::from_millis(50),
        ..test_config()
    });

    let result = session.connect(&connector, "token").await;
    assert!(matches!(result, Err(StartError::ConnectTimeout)));
    assert_eq!(session.state(), SessionState::Failed);
}

#[tokio::test]
async fn chunks_are_dropped_outside_streaming() {
    let (connector, mut remote) = MockConnector::new();
    let mut session = ProtocolSession::new(test_config());
    let mut encoder = SequencedChunkEncoder::new("stream1");

    // Not connected yet: silently dropped.
    session.send_chunk(encoder.encode(make_packet(4, 0.1)));

    let _inbound = session.connect(&connector, "token").await.unwrap();
    let _config = remote.outbound_rx.recv().await.unwrap();

    session.send_chunk(encoder.encode(make_packet(4, 0.1)));
    match remote.outbound_rx.recv().await.unwrap() {
        OutboundMessage::AudioChunk { seq_id, .. } => assert_eq!(seq_id, 1),
        other => panic!("expected AUDIO_CHUNK, got {other:?}"),
    }
    assert_eq!(session.chunks_sent(), 1);

    session.end().await;
    session.send_chunk(encoder.encode(make_packet(4, 0.1)));
    assert_eq!(session.chunks_sent(), 1, "no sends after ENDING");
}

#[tokio::test]
async fn end_sends_end_once_and_waits_for_remote_close() {
    let (connector, mut remote) = MockConnector::new();
    let mut session = ProtocolSession::new(ProtocolConfig {
        end_wait: Duration::from_secs(5),
        ..test_config()
    });

    let _inbound = session.connect(&connector, "token").await.unwrap();
    let _config = remote.outbound_rx.recv().await.unwrap();

    // Remote closes as soon as it sees END.
    let open_tx = remote.open_tx;
    let mut outbound_rx = remote.outbound_rx;
    let remote_task = tokio::spawn(async move {
        let mut end_messages = 0;
        while let Some(message) = outbound_rx.recv().await {
            if matches!(message, OutboundMessage::End) {
                end_messages += 1;
                let _ = open_tx.send(false);
            }
        }
        end_messages
    });

    session.end().await;
    assert_eq!(session.state(), SessionState::Closed);

    // A second end is a no-op.
    session.end().await;
    assert_eq!(session.state(), SessionState::Closed);

    let end_messages = remote_task.await.unwrap();
    assert_eq!(end_messages, 1, "END must be sent exactly once");
}

#[tokio::test]
async fn end_is_bounded_when_remote_never_closes() {
    let (connector, mut remote) = MockConnector::new();
    let mut session = ProtocolSession::new(ProtocolConfig {
        end_wait: Duration::from_millis(100),
        ..test_config()
    });

    let _inbound = session.connect(&connector, "token").await.unwrap();
    let _config = remote.outbound_rx.recv().await.unwrap();

    // Remote never flips the open flag; end must still return.
    let started = std::time::Instant::now();
    session.end().await;
    assert_eq!(session.state(), SessionState::Closed);
    assert!(
        started.elapsed() < Duration::from_secs(2),
        "forced close took too long: {:?}",
        started.elapsed()
    );
}

#[tokio::test]
async fn failed_is_terminal() {
    let (connector, mut remote) = MockConnector::new();
    let mut session = ProtocolSession::new(test_config());

    let _inbound = session.connect(&connector, "token").await.unwrap();
    let _config = remote.outbound_rx.recv().await.unwrap();

    session.mark_failed();
    assert_eq!(session.state(), SessionState::Failed);

    // No transitions out of FAILED.
    session.end().await;
    assert_eq!(session.state(), SessionState::Failed);

    let mut encoder = SequencedChunkEncoder::new("stream1");
    session.send_chunk(encoder.encode(make_packet(4, 0.1)));
    assert_eq!(session.chunks_sent(), 0);
}
