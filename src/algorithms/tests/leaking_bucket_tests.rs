#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::{
        algorithms::{LeakingBucket, ProcessReport, RateLimitAlgorithm, StatusDetails},
        clock::{Clock, ManualClock},
        config::LeakingBucketConfig,
        error::RateLimiterError,
        test_utils::{shared, test_clock},
    };

    fn bucket(clock: &ManualClock, bucket_size: u64, outflow: u64) -> LeakingBucket {
        LeakingBucket::new(
            LeakingBucketConfig {
                bucket_size,
                outflow_rate_per_minute: outflow,
            },
            shared(clock),
        )
        .unwrap()
    }

    /// A full queue rejects until a drain frees room
    #[test]
    fn test_queue_bound() {
        let clock = test_clock();
        let bucket = bucket(&clock, 3, 1);

        for i in 0..3 {
            assert!(bucket.add_request(), "Request {} should be queued", i);
        }
        let result = bucket.check_and_record();
        assert!(!result.allowed, "Fourth request should be dropped");
        assert_eq!(result.details, StatusDetails::LeakingBucket { queue_size: 3 });

        let report = bucket.process_requests();
        assert_eq!(
            report,
            ProcessReport {
                queue_size: 2,
                processed_request: 1
            }
        );
        assert!(bucket.add_request(), "Drain should free one slot");
        assert!(!bucket.add_request());
    }

    /// Draining removes the oldest arrivals first
    #[test]
    fn test_drain_is_fifo() {
        let clock = test_clock();
        let bucket = bucket(&clock, 3, 2);

        let mut arrivals = Vec::new();
        for _ in 0..3 {
            arrivals.push(clock.now());
            assert!(bucket.add_request());
            clock.advance(Duration::from_millis(10));
        }
        assert_eq!(bucket.queued(), arrivals);

        let report = bucket.process_requests();
        assert_eq!(report.processed_request, 2);
        assert_eq!(report.queue_size, 1);
        assert_eq!(bucket.queued(), vec![arrivals[2]], "Only t3 should remain");
    }

    #[test]
    fn test_drain_stops_when_empty() {
        let clock = test_clock();
        let bucket = bucket(&clock, 10, 5);

        bucket.add_request();
        bucket.add_request();

        assert_eq!(
            bucket.process_requests(),
            ProcessReport {
                queue_size: 0,
                processed_request: 2
            }
        );
        assert_eq!(
            bucket.process_requests(),
            ProcessReport {
                queue_size: 0,
                processed_request: 0
            },
            "Draining an empty queue processes nothing"
        );
    }

    #[test]
    fn test_rejected_requests_are_not_queued() {
        let clock = test_clock();
        let bucket = bucket(&clock, 1, 1);

        assert!(bucket.add_request());
        let first = bucket.queued();
        clock.advance(Duration::from_secs(1));
        assert!(!bucket.add_request());
        assert_eq!(bucket.queued(), first);
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let clock = test_clock();
        let err = LeakingBucket::new(
            LeakingBucketConfig {
                bucket_size: 0,
                outflow_rate_per_minute: 1,
            },
            shared(&clock),
        )
        .unwrap_err();
        assert!(matches!(err, RateLimiterError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_concurrent_adds_respect_bound() {
        let clock = test_clock();
        let bucket = Arc::new(bucket(&clock, 16, 4));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let bucket = Arc::clone(&bucket);
                std::thread::spawn(move || {
                    let mut admitted = 0;
                    for _ in 0..10 {
                        if bucket.add_request() {
                            admitted += 1;
                        }
                        bucket.process_requests();
                    }
                    admitted
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert!(bucket.queue_size() <= 16);
        assert!(admitted >= 16, "Drains interleave with adds, so at least a full bucket gets in");
    }
}
