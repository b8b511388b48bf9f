use async_stream::stream;
use futures::TryStreamExt;
use futures_util::stream::StreamExt;
use quickcheck::{quickcheck, TestResult};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tributary::prelude::*;
use tributary::{combine_latest_with_config, merge_with_config, with_latest_from_with_config};

/// Emits `(delay_ms, value)` pairs in order, sleeping before each one
fn timed<T>(events: Vec<(u64, T)>) -> Flow<T>
where
    T: Send + 'static,
{
    stream! {
        for (delay, value) in events {
            sleep(Duration::from_millis(delay)).await;
            yield Ok(value);
        }
    }
    .boxed()
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Never-ending source that flips `dropped` when its task is torn down
fn endless(dropped: Arc<AtomicBool>) -> Flow<u32> {
    let flag = DropFlag(dropped);
    stream! {
        let _flag = flag;
        let mut i = 0u32;
        loop {
            yield Ok(i);
            i = i.wrapping_add(1);
            sleep(Duration::from_millis(5)).await;
        }
    }
    .boxed()
}

#[tokio::test]
async fn test_merge_emits_every_element() {
    let mut result: Vec<i32> = merge(vec![
        from_iter(vec![1, 2, 3]),
        from_iter(vec![10, 20]),
        from_iter(vec![100]),
    ])
    .try_collect()
    .await
    .unwrap();

    result.sort();
    assert_eq!(result, vec![1, 2, 3, 10, 20, 100]);
}

#[tokio::test]
async fn test_merge_keeps_per_upstream_order() {
    let sources: Vec<Flow<(usize, i32)>> = {
        let mut rng = rand::thread_rng();
        (0..4)
            .map(|side| {
                let events = (0..10)
                    .map(|i| (rng.gen_range(0..3), (side, i)))
                    .collect();
                timed(events)
            })
            .collect()
    };

    let result: Vec<(usize, i32)> = merge(sources).try_collect().await.unwrap();
    assert_eq!(result.len(), 40);

    for side in 0..4 {
        let seq: Vec<i32> = result.iter().filter(|(s, _)| *s == side).map(|(_, v)| *v).collect();
        assert_eq!(seq, (0..10).collect::<Vec<_>>());
    }
}

#[tokio::test(start_paused = true)]
async fn test_merge_interleaves_by_arrival() {
    let result: Vec<i32> = timed(vec![(10, 1), (20, 3)])
        .merge_flow(timed(vec![(20, 2), (20, 4)]))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(result, vec![1, 2, 3, 4]);
}

#[tokio::test]
async fn test_merge_of_nothing_is_empty() {
    let result: Vec<i32> = merge::<i32>(Vec::new()).try_collect().await.unwrap();
    assert!(result.is_empty());
}

#[tokio::test]
async fn test_merge_fails_fast_and_cancels_siblings() {
    let dropped = Arc::new(AtomicBool::new(false));
    let failing = stream! {
        sleep(Duration::from_millis(20)).await;
        yield Err(StreamError::upstream_msg("producer crashed"));
    }
    .boxed();

    let items: Vec<StreamResult<u32>> = merge(vec![endless(dropped.clone()), failing]).collect().await;

    let errors = items.iter().filter(|r| r.is_err()).count();
    assert_eq!(errors, 1);
    assert!(items.last().unwrap().is_err());

    sleep(Duration::from_millis(20)).await;
    assert!(dropped.load(Ordering::SeqCst), "sibling producer was not cancelled");
}

#[tokio::test]
async fn test_dropping_merged_flow_cancels_producers() {
    let dropped_a = Arc::new(AtomicBool::new(false));
    let dropped_b = Arc::new(AtomicBool::new(false));

    let first: Vec<u32> = merge(vec![endless(dropped_a.clone()), endless(dropped_b.clone())])
        .take_flow(5)
        .try_collect()
        .await
        .unwrap();
    assert_eq!(first.len(), 5);

    sleep(Duration::from_millis(20)).await;
    assert!(dropped_a.load(Ordering::SeqCst));
    assert!(dropped_b.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_merge_with_bounded_config_backpressures_fast_producer() {
    let config = ChannelConfig::new().bounded(1);
    let merged = merge_with_config(vec![from_iter(0..1000), from_iter(1000..2000)], &config).unwrap();

    let mut count = 0;
    let mut s = merged;
    while let Some(item) = s.next().await {
        item.unwrap();
        count += 1;
        if count % 100 == 0 {
            tokio::task::yield_now().await;
        }
    }
    assert_eq!(count, 2000);
}

#[tokio::test]
async fn test_zero_capacity_config_rejected() {
    let config = ChannelConfig::new().bounded(0);
    assert!(matches!(
        merge_with_config(vec![from_iter(vec![1])], &config),
        Err(StreamError::InvalidConfiguration(_))
    ));
    assert!(combine_latest_with_config(from_iter(vec![1]), from_iter(vec![2]), &config).is_err());
    assert!(with_latest_from_with_config(from_iter(vec![1]), from_iter(vec![2]), &config).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_combine_latest_waits_for_both_sides() {
    let a = timed(vec![(0, 1), (10, 2), (30, 3)]);
    let b = timed(vec![(15, "x"), (10, "y")]);

    let result: Vec<(i32, &str)> = combine_latest(a, b).try_collect().await.unwrap();

    // a: 1@0, 2@10, 3@40   b: x@15, y@25
    assert_eq!(result, vec![(2, "x"), (2, "y"), (3, "y")]);
}

#[tokio::test(start_paused = true)]
async fn test_combine_latest_one_side_empty_emits_nothing() {
    let result: Vec<(i32, i32)> = timed(vec![(0, 1), (5, 2)])
        .combine_latest_flow(empty())
        .try_collect()
        .await
        .unwrap();
    assert!(result.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_combine_latest_propagates_failure() {
    let a = timed(vec![(0, 1), (50, 2)]);
    let b = stream! {
        yield Ok(10);
        sleep(Duration::from_millis(10)).await;
        yield Err(StreamError::upstream_msg("b failed"));
    }
    .boxed();

    let items: Vec<StreamResult<(i32, i32)>> = combine_latest(a, b).collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &(1, 10));
    assert!(items[1].is_err());
}

#[tokio::test]
async fn test_dropping_combined_flow_cancels_both_producers() {
    let dropped_a = Arc::new(AtomicBool::new(false));
    let dropped_b = Arc::new(AtomicBool::new(false));

    let mut combined = combine_latest(endless(dropped_a.clone()), endless(dropped_b.clone()));
    assert!(combined.next().await.unwrap().is_ok());
    drop(combined);

    sleep(Duration::from_millis(50)).await;
    assert!(dropped_a.load(Ordering::SeqCst));
    assert!(dropped_b.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_with_latest_from_samples_on_trigger() {
    let trigger = timed(vec![(5, ()), (10, ()), (10, ()), (10, ())]);
    let sampled = timed(vec![(10, "a"), (12, "b")]);

    let result: Vec<&str> = with_latest_from(trigger, sampled).try_collect().await.unwrap();

    // triggers @5 (nothing yet), @15 -> a, @25 -> b, @35 -> b
    assert_eq!(result, vec!["a", "b", "b"]);
}

#[tokio::test(start_paused = true)]
async fn test_with_latest_from_ends_with_trigger_and_cancels_sampled() {
    let dropped = Arc::new(AtomicBool::new(false));
    let trigger = timed(vec![(12, 'x'), (10, 'y')]);

    let result: Vec<u32> = trigger
        .with_latest_from_flow(endless(dropped.clone()))
        .try_collect()
        .await
        .unwrap();
    assert_eq!(result.len(), 2);

    sleep(Duration::from_millis(20)).await;
    assert!(dropped.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_with_latest_from_sampled_failure_surfaces() {
    let trigger = timed(vec![(10, ()), (100, ())]);
    let sampled = stream! {
        yield Ok(1);
        sleep(Duration::from_millis(20)).await;
        yield Err(StreamError::upstream_msg("sampled failed"));
    }
    .boxed();

    let items: Vec<StreamResult<i32>> = with_latest_from(trigger, sampled).collect().await;
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].as_ref().unwrap(), &1);
    assert!(items[1].is_err());
}

fn merge_preserves_multiset(a: Vec<i16>, b: Vec<i16>) -> TestResult {
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .unwrap();

    let merged: Vec<i16> = rt.block_on(async {
        merge(vec![from_iter(a.clone()), from_iter(b.clone())])
            .try_collect()
            .await
            .unwrap()
    });

    let mut expected: Vec<i16> = a.into_iter().chain(b).collect();
    let mut merged = merged;
    expected.sort();
    merged.sort();
    TestResult::from_bool(merged == expected)
}

#[test]
fn test_merge_multiset_property() {
    quickcheck(merge_preserves_multiset as fn(Vec<i16>, Vec<i16>) -> TestResult);
}
