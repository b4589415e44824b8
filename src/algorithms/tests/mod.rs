// src/algorithms/tests/mod.rs


/// Tests for Leaking Bucket algorithm
mod leaking_bucket_tests;



/// Common tests for all algorithm implementations
#[cfg(test)]
mod common_tests {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::algorithms::{
        FixedWindowCounter, LeakingBucket, LimiterKind, RateLimitAlgorithm, SlidingWindowLog,
        TokenBucket,
    };
    use crate::config::{
        FixedWindowCounterConfig, LeakingBucketConfig, SlidingWindowLogConfig, TokenBucketConfig,
    };
    use crate::test_utils::{count_admitted, shared, test_clock};

    /// With no maintenance and no time passing, every algorithm admits
    /// exactly its configured ceiling
    #[test]
    fn test_algorithm_trait_consistency() {
        let clock = test_clock();
        let limiters: Vec<Arc<dyn RateLimitAlgorithm>> = vec![
            Arc::new(
                TokenBucket::new(TokenBucketConfig {
                    capacity: 5,
                    refill_rate_per_minute: 1,
                })
                .unwrap(),
            ),
            Arc::new(
                LeakingBucket::new(
                    LeakingBucketConfig {
                        bucket_size: 5,
                        outflow_rate_per_minute: 1,
                    },
                    shared(&clock),
                )
                .unwrap(),
            ),
            Arc::new(
                FixedWindowCounter::new(
                    FixedWindowCounterConfig {
                        max_number_req: 5,
                        time_interval: 60,
                    },
                    shared(&clock),
                )
                .unwrap(),
            ),
            Arc::new(
                SlidingWindowLog::new(
                    SlidingWindowLogConfig {
                        max_req_allowed: 5,
                        time_window: 60,
                    },
                    shared(&clock),
                )
                .unwrap(),
            ),
        ];

        let kinds: Vec<LimiterKind> = limiters.iter().map(|l| l.kind()).collect();
        assert_eq!(kinds, LimiterKind::ALL.to_vec());

        for limiter in &limiters {
            let admitted = count_admitted(limiter.as_ref(), &clock, 8, Duration::ZERO);
            assert_eq!(admitted, 5, "{} should admit exactly 5", limiter.kind());

            let status = limiter.check_and_record();
            assert!(!status.allowed);
            assert_eq!(status.remaining, 0);
            assert_eq!(status.limit, 5);
        }
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in LimiterKind::ALL {
            assert_eq!(LimiterKind::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(LimiterKind::parse("gcra"), None);
    }

    #[test]
    fn test_status_serializes_with_original_field_names() {
        let bucket = TokenBucket::new(TokenBucketConfig {
            capacity: 3,
            refill_rate_per_minute: 1,
        })
        .unwrap();
        let json = serde_json::to_value(bucket.check_and_record()).unwrap();

        assert_eq!(json["allowed"], true);
        assert_eq!(json["details"]["algorithm"], "token_bucket");
        assert_eq!(json["details"]["tokens"], 2);
    }
}
