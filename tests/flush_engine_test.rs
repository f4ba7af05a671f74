mod common;

use chrono::{DateTime, TimeZone, Utc};
use cloudwatch_log_forwarder::buffer::{DATA_AMOUNT_LIMIT, EVENT_SIZE_LIMIT, MAX_BATCH_SIZE};
use cloudwatch_log_forwarder::reliability::Clock;
use cloudwatch_log_forwarder::sender::{ClientError, ErrorKind, LogStreamDescription};
use cloudwatch_log_forwarder::{
    EngineConfig, FlushEngine, ForwarderError, PendingRecord, SequenceTokenMode,
};
use common::{Call, RecordingClient, destination, engine, record};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

struct FrozenClock;

impl Clock for FrozenClock {
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000, 0).single().unwrap()
    }
}

fn tracked_engine(client: &Arc<RecordingClient>) -> FlushEngine<Arc<RecordingClient>> {
    FlushEngine::new(
        Arc::clone(client),
        destination(),
        EngineConfig {
            batch_size: 1,
            sequence_tokens: SequenceTokenMode::Tracked,
        },
    )
    .unwrap()
}

#[tokio::test]
async fn test_out_of_order_submissions_are_put_chronologically() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 4);

    for n in [3, 1, 4, 2] {
        engine
            .submit(record(&format!("record{n}"), 1_700_000_000_000 + n))
            .await
            .unwrap();
    }

    assert_eq!(
        client.put_messages(),
        vec![vec!["record1", "record2", "record3", "record4"]]
    );
    assert_eq!(engine.pending_records(), 0);
}

#[tokio::test]
async fn test_scrambled_timestamps_are_put_non_decreasing() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, MAX_BATCH_SIZE);

    // 37 is coprime with 101, so this visits every timestamp in 0..101 once.
    let timestamps: Vec<i64> = (0..101).map(|n| (n * 37) % 101).collect();
    for &ts in &timestamps {
        engine.submit(record(&format!("m{ts}"), ts)).await.unwrap();
    }
    engine.close().await.unwrap();

    let sent: Vec<i64> = client.puts()[0]
        .log_events
        .iter()
        .map(|e| e.timestamp)
        .collect();
    assert_eq!(sent, (0..101).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_every_ordering_of_four_records_is_sorted() {
    let orders = [
        [1, 2, 3, 4], [1, 2, 4, 3], [1, 3, 2, 4], [1, 3, 4, 2], [1, 4, 2, 3], [1, 4, 3, 2],
        [2, 1, 3, 4], [2, 1, 4, 3], [2, 3, 1, 4], [2, 3, 4, 1], [2, 4, 1, 3], [2, 4, 3, 1],
        [3, 1, 2, 4], [3, 1, 4, 2], [3, 2, 1, 4], [3, 2, 4, 1], [3, 4, 1, 2], [3, 4, 2, 1],
        [4, 1, 2, 3], [4, 1, 3, 2], [4, 2, 1, 3], [4, 2, 3, 1], [4, 3, 1, 2], [4, 3, 2, 1],
    ];

    for order in orders {
        let client = RecordingClient::new();
        let mut engine = engine(&client, 4);
        for n in order {
            engine.submit(record(&format!("record{n}"), n)).await.unwrap();
        }

        assert_eq!(
            client.put_messages(),
            vec![vec!["record1", "record2", "record3", "record4"]],
            "order {order:?}"
        );
    }
}

#[tokio::test]
async fn test_equal_timestamps_keep_submission_order() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 10);

    engine.submit(record("late", 20)).await.unwrap();
    engine.submit(record("first", 10)).await.unwrap();
    engine.submit(record("second", 10)).await.unwrap();
    engine.close().await.unwrap();

    assert_eq!(client.put_messages(), vec![vec!["first", "second", "late"]]);
    let timestamps: Vec<i64> = client.puts()[0]
        .log_events
        .iter()
        .map(|e| e.timestamp)
        .collect();
    assert_eq!(timestamps, vec![10, 10, 20]);
}

#[tokio::test]
async fn test_oversized_message_is_split_into_event_sized_chunks() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, MAX_BATCH_SIZE);

    let message: String = (0..EVENT_SIZE_LIMIT * 2 + 10)
        .map(|i| char::from(b'a' + (i % 26) as u8))
        .collect();
    engine
        .submit(PendingRecord::new(message.clone(), 42))
        .await
        .unwrap();
    assert_eq!(engine.pending_records(), 3);
    engine.close().await.unwrap();

    let puts = client.puts();
    assert_eq!(puts.len(), 1);
    let events = &puts[0].log_events;
    assert_eq!(events.len(), 3);
    assert!(events.iter().all(|e| e.message.len() <= EVENT_SIZE_LIMIT));
    assert!(events.iter().all(|e| e.timestamp == 42));
    let rejoined: String = events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(rejoined, message);
}

#[tokio::test]
async fn test_oversized_multibyte_message_keeps_characters_intact() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, MAX_BATCH_SIZE);

    let message = format!("{}€€", "a".repeat(EVENT_SIZE_LIMIT - 1));
    engine
        .submit(PendingRecord::new(message.clone(), 42))
        .await
        .unwrap();
    engine.close().await.unwrap();

    let events = &client.puts()[0].log_events;
    let lens: Vec<usize> = events.iter().map(|e| e.message.len()).collect();
    assert_eq!(lens, vec![EVENT_SIZE_LIMIT - 1, 6]);
    assert!(events.iter().all(|e| !e.message.contains('\u{FFFD}')));
    let rejoined: String = events.iter().map(|e| e.message.as_str()).collect();
    assert_eq!(rejoined, message);
}

#[tokio::test]
async fn test_reaching_byte_ceiling_flushes_before_append() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, MAX_BATCH_SIZE);

    // Each record costs exactly a quarter of the ceiling.
    let message = "x".repeat(DATA_AMOUNT_LIMIT / 4 - 26);
    for ts in 0..4 {
        engine
            .submit(PendingRecord::new(message.clone(), ts))
            .await
            .unwrap();
    }

    let puts = client.puts();
    assert_eq!(puts.len(), 1);
    assert_eq!(puts[0].log_events.len(), 3);
    assert_eq!(engine.pending_records(), 1);
    assert_eq!(engine.pending_bytes(), DATA_AMOUNT_LIMIT / 4);
}

#[tokio::test]
async fn test_count_ceiling_starts_new_batch() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 3);

    for ts in 0..4 {
        engine.submit(record(&format!("m{ts}"), ts)).await.unwrap();
    }
    assert_eq!(client.put_messages(), vec![vec!["m0", "m1", "m2"]]);
    assert_eq!(engine.pending_records(), 1);

    engine.close().await.unwrap();
    assert_eq!(
        client.put_messages(),
        vec![vec!["m0", "m1", "m2"], vec!["m3"]]
    );
}

#[tokio::test]
async fn test_flush_of_empty_batch_touches_nothing() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 10);

    engine.flush().await.unwrap();
    engine.close().await.unwrap();

    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_missing_stream_is_recreated_and_put_retried_once() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::not_found("stream gone")));
    let mut engine = engine(&client, 10);

    engine.submit(record("hello", 1)).await.unwrap();
    engine.close().await.unwrap();

    let calls = client.calls();
    assert_eq!(calls.len(), 3);
    assert!(matches!(calls[0], Call::PutLogEvents(_)));
    assert!(matches!(calls[1], Call::CreateLogStream(_)));
    assert!(matches!(calls[2], Call::PutLogEvents(_)));
    assert_eq!(client.put_messages(), vec![vec!["hello"], vec!["hello"]]);
    assert_eq!(engine.stats().snapshot().stream_recoveries, 1);
}

#[tokio::test]
async fn test_missing_group_cascades_before_retry() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::not_found("stream gone")));
    client.script_create_stream(Err(ClientError::not_found("group gone")));
    let mut engine = engine(&client, 10);

    engine.submit(record("hello", 1)).await.unwrap();
    engine.close().await.unwrap();

    assert_eq!(client.create_stream_calls(), 2);
    assert_eq!(client.create_group_calls(), 1);
    assert_eq!(client.retention_calls(), 1);
    assert_eq!(client.puts().len(), 2);

    let calls = client.calls();
    assert!(matches!(calls[2], Call::CreateLogGroup(_)));
    assert!(matches!(calls.last(), Some(Call::PutLogEvents(_))));
}

#[tokio::test]
async fn test_second_not_found_is_fatal_and_batch_discarded() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::not_found("stream gone")));
    client.script_put(Err(ClientError::not_found("still gone")));
    let mut engine = engine(&client, 10);

    engine.submit(record("lost", 1)).await.unwrap();
    let err = engine.flush().await.unwrap_err();

    assert!(matches!(err, ForwarderError::Client(_)));
    assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    assert_eq!(client.puts().len(), 2);
    assert_eq!(engine.pending_records(), 0);

    // The engine stays usable after a fatal flush.
    engine.submit(record("next", 2)).await.unwrap();
    engine.close().await.unwrap();
    assert_eq!(client.put_messages().last().unwrap(), &vec!["next"]);
}

#[tokio::test]
async fn test_other_put_failure_is_not_retried() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::other("AccessDeniedException", "nope")));
    let mut engine = engine(&client, 10);

    engine.submit(record("denied", 1)).await.unwrap();
    let err = engine.close().await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::Other));
    assert_eq!(client.calls().len(), 1);
    assert_eq!(engine.pending_records(), 0);

    let stats = engine.stats().snapshot();
    assert_eq!(stats.flush_attempts, 1);
    assert_eq!(stats.failed_flushes, 1);
    assert_eq!(stats.successful_flushes, 0);
}

#[tokio::test]
async fn test_failed_stream_recreation_surfaces_bootstrap_error() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::not_found("stream gone")));
    client.script_create_stream(Err(ClientError::other("AccessDeniedException", "nope")));
    let mut engine = engine(&client, 10);

    engine.submit(record("m", 1)).await.unwrap();
    let err = engine.close().await.unwrap_err();

    assert!(matches!(err, ForwarderError::Bootstrap(_)));
    assert_eq!(err.kind(), Some(ErrorKind::Other));
    assert_eq!(client.puts().len(), 1);
}

#[tokio::test]
async fn test_batch_size_above_ceiling_is_rejected_without_client_calls() {
    let client = RecordingClient::new();

    for batch_size in [MAX_BATCH_SIZE + 1, 0] {
        let result = FlushEngine::new(
            Arc::clone(&client),
            destination(),
            EngineConfig {
                batch_size,
                ..EngineConfig::default()
            },
        );
        assert!(matches!(result, Err(ForwarderError::Config(_))));
    }
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_construction_sends_nothing() {
    let client = RecordingClient::new();
    let _engine = engine(&client, MAX_BATCH_SIZE);
    assert!(client.calls().is_empty());
}

#[tokio::test]
async fn test_set_stream_name_flushes_old_stream_first() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 10);

    engine.submit(record("old", 1)).await.unwrap();
    engine.set_stream_name("corr-1/req-2").await.unwrap();
    assert_eq!(engine.destination().stream_name(), "corr-1/req-2");
    assert_eq!(engine.pending_records(), 0);

    engine.submit(record("new", 2)).await.unwrap();
    engine.close().await.unwrap();

    let streams: Vec<String> = client
        .puts()
        .into_iter()
        .map(|put| put.log_stream_name)
        .collect();
    assert_eq!(streams, vec!["corr-1/req-1", "corr-1/req-2"]);
}

#[tokio::test]
async fn test_set_stream_name_with_empty_batch_only_switches() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 10);

    engine.set_stream_name("other").await.unwrap();
    engine.set_stream_name("other").await.unwrap();

    assert_eq!(engine.destination().stream_name(), "other");
    assert!(client.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_sixth_put_in_one_second_is_throttled() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 1).with_clock(Arc::new(FrozenClock));
    let start = Instant::now();

    for ts in 0..5 {
        engine.submit(record("m", ts)).await.unwrap();
    }
    assert_eq!(start.elapsed(), Duration::ZERO);

    engine.submit(record("m", 5)).await.unwrap();
    assert!(start.elapsed() >= Duration::from_secs(1));
    assert_eq!(client.puts().len(), 6);
}

#[tokio::test]
async fn test_tokens_are_never_sent_when_disabled() {
    let client = RecordingClient::new();
    client.script_put_token("t1");
    let mut engine = engine(&client, 1);

    engine.submit(record("a", 1)).await.unwrap();
    engine.submit(record("b", 2)).await.unwrap();

    assert!(client.puts().iter().all(|put| put.sequence_token.is_none()));
    assert_eq!(engine.sequence_token(), None);
}

#[tokio::test]
async fn test_stale_token_is_fatal_when_disabled() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::invalid_sequence_token(Some("t9".into()))));
    let mut engine = engine(&client, 1);

    let err = engine.submit(record("a", 1)).await.unwrap_err();

    assert_eq!(err.kind(), Some(ErrorKind::InvalidSequenceToken));
    assert_eq!(client.calls().len(), 1);
}

#[tokio::test]
async fn test_tracked_token_chains_between_puts() {
    let client = RecordingClient::new();
    client.script_put_token("t1");
    client.script_put_token("t2");
    let mut engine = tracked_engine(&client);

    engine.submit(record("a", 1)).await.unwrap();
    engine.submit(record("b", 2)).await.unwrap();

    let tokens: Vec<Option<String>> = client
        .puts()
        .into_iter()
        .map(|put| put.sequence_token)
        .collect();
    assert_eq!(tokens, vec![None, Some("t1".to_string())]);
    assert_eq!(engine.sequence_token(), Some("t2"));
}

#[tokio::test]
async fn test_stale_token_adopts_expected_token_and_retries() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::invalid_sequence_token(Some("t7".into()))));
    client.script_put_token("t8");
    let mut engine = tracked_engine(&client);

    engine.submit(record("a", 1)).await.unwrap();

    let puts = client.puts();
    assert_eq!(puts.len(), 2);
    assert_eq!(puts[1].sequence_token.as_deref(), Some("t7"));
    assert_eq!(engine.sequence_token(), Some("t8"));
    assert_eq!(engine.stats().snapshot().sequence_refreshes, 1);
}

#[tokio::test]
async fn test_stale_token_without_hint_is_refetched() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::invalid_sequence_token(None)));
    client.script_describe(Ok(vec![
        LogStreamDescription {
            log_stream_name: "corr-1/req-1-suffix".to_string(),
            upload_sequence_token: Some("wrong".to_string()),
        },
        LogStreamDescription {
            log_stream_name: "corr-1/req-1".to_string(),
            upload_sequence_token: Some("t3".to_string()),
        },
    ]));
    let mut engine = tracked_engine(&client);

    engine.submit(record("a", 1)).await.unwrap();

    let calls = client.calls();
    assert!(matches!(calls[1], Call::DescribeLogStreams(_)));
    let puts = client.puts();
    assert_eq!(puts.len(), 2);
    assert_eq!(puts[1].sequence_token.as_deref(), Some("t3"));
}

#[tokio::test]
async fn test_recreated_stream_resets_token() {
    let client = RecordingClient::new();
    client.script_put_token("t1");
    client.script_put(Err(ClientError::not_found("stream gone")));
    let mut engine = tracked_engine(&client);

    engine.submit(record("a", 1)).await.unwrap();
    engine.submit(record("b", 2)).await.unwrap();

    let tokens: Vec<Option<String>> = client
        .puts()
        .into_iter()
        .map(|put| put.sequence_token)
        .collect();
    assert_eq!(tokens, vec![None, Some("t1".to_string()), None]);
}

#[tokio::test]
async fn test_stats_count_successful_flushes() {
    let client = RecordingClient::new();
    let mut engine = engine(&client, 2);

    for ts in 0..5 {
        engine.submit(record("abcd", ts)).await.unwrap();
    }
    engine.close().await.unwrap();

    let stats = engine.stats().snapshot();
    assert_eq!(stats.flush_attempts, 3);
    assert_eq!(stats.successful_flushes, 3);
    assert_eq!(stats.records_sent, 5);
    assert_eq!(stats.bytes_sent, 5 * (4 + 26));
    assert_eq!(stats.failed_flushes, 0);
}

#[tokio::test]
async fn test_recovered_flush_counts_once_with_two_puts() {
    let client = RecordingClient::new();
    client.script_put(Err(ClientError::not_found("stream gone")));
    let mut engine = engine(&client, 10);

    engine.submit(record("retried", 1)).await.unwrap();
    engine.close().await.unwrap();

    let stats = engine.stats().snapshot();
    assert_eq!(client.puts().len(), 2);
    assert_eq!(stats.flush_attempts, 1);
    assert_eq!(stats.successful_flushes, 1);
    assert_eq!(stats.stream_recoveries, 1);
    assert_eq!(stats.records_sent, 1);
}
