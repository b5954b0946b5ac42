//! Integration tests for the concurrent Fibonacci driver.

use std::time::Duration;

use fibcache::driver::FibonacciDriver;
use fibcache::{CacheError, ComputeError, EntryState};

const EXPECTED: [u128; 11] = [0, 1, 1, 2, 3, 5, 8, 13, 21, 34, 55];

// Correctness of the recurrence
mod correctness_tests {
    use super::*;

    #[tokio::test]
    async fn test_first_eleven_values() {
        let driver = FibonacciDriver::seeded();

        for (n, expected) in EXPECTED.iter().enumerate() {
            assert_eq!(driver.compute(n as i64).await, Ok(*expected), "index {n}");
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests_all_correct() {
        let driver = FibonacciDriver::seeded();

        let results = futures::future::join_all((0..=6).map(|n| driver.compute(n))).await;

        for (n, result) in results.into_iter().enumerate() {
            assert_eq!(result, Ok(EXPECTED[n]), "index {n}");
        }
    }

    #[tokio::test]
    async fn test_sequence_in_order() {
        let driver = FibonacciDriver::unseeded();

        let values = driver.sequence(10).await.unwrap();

        assert_eq!(values, EXPECTED.to_vec());
        assert_eq!(driver.evaluations(), 11);
    }

    #[tokio::test]
    async fn test_recurrence_holds_for_larger_indices() {
        let driver = FibonacciDriver::seeded().with_delay(Duration::ZERO);

        for n in 2..=90 {
            let value = driver.compute(n).await.unwrap();
            let minus_one = driver.compute(n - 1).await.unwrap();
            let minus_two = driver.compute(n - 2).await.unwrap();
            assert_eq!(value, minus_one + minus_two);
        }
    }
}

// Deduplication of concurrent and overlapping work
mod compute_once_tests {
    use super::*;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_ten_ten_nine_scenario() {
        let driver = FibonacciDriver::unseeded();

        let (r1, r2, r3) = tokio::join!(driver.compute(10), driver.compute(10), driver.compute(9));

        assert_eq!(r1, Ok(55));
        assert_eq!(r1, r2);
        assert_eq!(r3, Ok(34));
        // One evaluation per distinct index in 0..=10.
        assert_eq!(driver.evaluations(), 11);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_many_callers_same_index() {
        let driver = FibonacciDriver::unseeded();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let driver = driver.clone();
                tokio::spawn(async move { driver.compute(15).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(610));
        }
        assert_eq!(driver.evaluations(), 16);
        assert_eq!(driver.cache().stats().misses, 16);
    }

    #[tokio::test]
    async fn test_seeded_base_cases_never_evaluate() {
        let driver = FibonacciDriver::seeded();

        assert_eq!(driver.compute(0).await, Ok(0));
        assert_eq!(driver.compute(1).await, Ok(1));
        assert_eq!(driver.evaluations(), 0);
        assert_eq!(driver.cache().stats().misses, 0);

        // Only indices 2..=10 need work once 0 and 1 are seeded.
        driver.compute(10).await.unwrap();
        assert_eq!(driver.evaluations(), 9);
    }

    #[tokio::test]
    async fn test_resolved_index_is_a_hit() {
        let driver = FibonacciDriver::seeded();

        driver.compute(10).await.unwrap();
        let evaluations = driver.evaluations();
        let hits = driver.cache().stats().hits;

        assert_eq!(driver.compute(10).await, Ok(55));
        assert_eq!(driver.evaluations(), evaluations);
        assert_eq!(driver.cache().stats().hits, hits + 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subproblems_are_issued_together() {
        let driver = FibonacciDriver::seeded().with_delay(Duration::from_millis(100));

        let running = {
            let driver = driver.clone();
            tokio::spawn(async move { driver.compute(10).await })
        };

        // Past the first evaluation's delay, before the second finishes its own.
        tokio::time::sleep(Duration::from_millis(150)).await;
        let cache = driver.cache();
        assert_eq!(cache.state(&10), EntryState::InFlight);
        assert_eq!(cache.state(&9), EntryState::InFlight);
        assert_eq!(cache.state(&8), EntryState::InFlight);

        assert_eq!(running.await.unwrap(), Ok(55));
    }

    #[tokio::test]
    async fn test_independent_drivers_do_not_share() {
        let first = FibonacciDriver::seeded().with_delay(Duration::ZERO);
        let second = FibonacciDriver::seeded().with_delay(Duration::ZERO);

        first.compute(10).await.unwrap();

        assert_eq!(second.cache().get(&10), None);
        assert_eq!(second.evaluations(), 0);
    }
}

// Validation and failure handling
mod error_tests {
    use super::*;

    #[tokio::test]
    async fn test_negative_index_rejected() {
        let driver = FibonacciDriver::seeded();

        let result = driver.compute(-5).await;

        assert!(matches!(result, Err(ComputeError::InvalidIndex(_))));
        assert_eq!(driver.cache().len(), 2);
        assert_eq!(driver.cache().stats().misses, 0);
    }

    #[tokio::test]
    async fn test_largest_representable_index() {
        let driver = FibonacciDriver::seeded().with_delay(Duration::ZERO);

        assert_eq!(
            driver.compute(186).await,
            Ok(332_825_110_087_067_562_321_196_029_789_634_457_848)
        );
        assert_eq!(driver.cache().len(), 187);
    }

    #[tokio::test]
    async fn test_index_past_range_rejected_before_any_work() {
        let driver = FibonacciDriver::seeded();

        let (a, b) = tokio::join!(driver.compute(187), driver.compute(1_000_000));

        assert_eq!(a, Err(ComputeError::Overflow(187)));
        assert_eq!(b, Err(ComputeError::Overflow(1_000_000)));
        assert_eq!(driver.cache().state(&187), EntryState::Absent);
        assert_eq!(driver.cache().state(&186), EntryState::Absent);

        let stats = driver.cache().stats();
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.failures, 0);
        assert_eq!(driver.evaluations(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_only_affects_caller() {
        let driver = FibonacciDriver::seeded()
            .with_delay(Duration::from_millis(50))
            .with_wait_timeout(Duration::from_millis(10));

        let result = driver.compute(3).await;
        assert!(matches!(
            result,
            Err(ComputeError::Cache(CacheError::WaitTimeout { .. }))
        ));

        // The computation keeps going and resolves for later callers.
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(driver.cache().get(&3), Some(2));
    }
}
