use futures_util::stream::StreamExt;
use std::io;
use std::time::Duration;
use tributary::error::UpstreamMessage;
use tributary::prelude::*;

#[derive(Debug)]
struct DecodeError {
    offset: usize,
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bad frame at offset {}", self.offset)
    }
}

impl std::error::Error for DecodeError {}

#[test]
fn test_error_display_messages() {
    assert_eq!(
        StreamError::upstream_msg("socket reset").to_string(),
        "upstream failure: socket reset"
    );
    assert_eq!(
        StreamError::TimeoutExceeded(Duration::from_millis(50)).to_string(),
        "no element received within 50ms"
    );
    assert_eq!(
        StreamError::invalid_config("window size must be greater than zero").to_string(),
        "invalid configuration: window size must be greater than zero"
    );
    assert_eq!(StreamError::Cancelled.to_string(), "operation cancelled");
    assert_eq!(StreamError::ChannelClosed.to_string(), "channel closed");
}

#[test]
fn test_upstream_keeps_original_error() {
    let err = StreamError::upstream(DecodeError { offset: 12 });
    match &err {
        StreamError::Upstream(inner) => {
            let decode = inner.downcast_ref::<DecodeError>().unwrap();
            assert_eq!(decode.offset, 12);
        }
        other => panic!("unexpected variant {:?}", other),
    }

    // Clones share the same underlying error
    let cloned = err.clone();
    assert_eq!(cloned.to_string(), err.to_string());
}

#[test]
fn test_upstream_msg_is_plain_message() {
    match StreamError::upstream_msg("gone") {
        StreamError::Upstream(inner) => {
            assert_eq!(inner.downcast_ref::<UpstreamMessage>().unwrap().0, "gone");
        }
        other => panic!("unexpected variant {:?}", other),
    }
}

#[test]
fn test_io_error_conversion() {
    fn read_header() -> StreamResult<()> {
        Err(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"))?;
        Ok(())
    }

    let err = read_header().unwrap_err();
    assert!(matches!(err, StreamError::Upstream(_)));
    assert!(err.to_string().contains("short read"));
}

#[test]
fn test_cancellation_classification() {
    assert!(StreamError::Cancelled.is_cancellation());
    assert!(StreamError::ChannelClosed.is_cancellation());
    assert!(!StreamError::upstream_msg("x").is_cancellation());
    assert!(!StreamError::TimeoutExceeded(Duration::from_secs(1)).is_cancellation());
}

#[tokio::test]
async fn test_fail_constructor_yields_error_then_ends() {
    let mut s: Flow<i32> = fail(StreamError::upstream_msg("nope"));
    assert!(matches!(s.next().await, Some(Err(StreamError::Upstream(_)))));
    assert!(s.next().await.is_none());
}

#[tokio::test]
async fn test_from_results_stops_at_first_error() {
    let items: Vec<StreamResult<i32>> = from_results(vec![
        Ok(1),
        Err(StreamError::upstream_msg("a")),
        Err(StreamError::upstream_msg("b")),
        Ok(2),
    ])
    .collect()
    .await;

    assert_eq!(items.len(), 2);
    match &items[1] {
        Err(e) => assert_eq!(e.to_string(), "upstream failure: a"),
        Ok(v) => panic!("expected failure, got {}", v),
    }
}

#[tokio::test]
async fn test_failure_in_long_pipeline_surfaces_once() {
    let source = from_results((0..20).map(|i| {
        if i == 13 {
            Err(StreamError::upstream_msg("row 13 corrupt"))
        } else {
            Ok(i)
        }
    }).collect::<Vec<_>>());

    let items: Vec<StreamResult<Vec<i32>>> = source
        .skip_flow(2)
        .distinct_flow()
        .take_while_flow(|_| true)
        .buffer_flow(4)
        .unwrap()
        .collect()
        .await;

    // [2..=5], [6..=9], then the failure; [10, 11, 12] is discarded
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].as_ref().unwrap(), &vec![2, 3, 4, 5]);
    assert_eq!(items[1].as_ref().unwrap(), &vec![6, 7, 8, 9]);
    assert!(items[2].is_err());
}
