//! Background retry of payment cancellations.
//!
//! When a rental is canceled but the payment service refuses the matching
//! cancellation, the cancellation is handed to a detached task that keeps
//! trying on a fixed interval. Nobody waits for the task; its outcome is only
//! logged and counted.

use std::time::Duration;

use clients::PaymentClient;
use common::PaymentUid;

use crate::pending::PendingCancellations;

/// How often and how long a failed payment cancellation is retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Upper bound on cancellation attempts, including the first.
    pub max_attempts: u32,
    /// Pause between consecutive attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MAX_ATTEMPTS, Self::DEFAULT_INTERVAL)
    }
}

/// How a retry loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// The payment service accepted the cancellation.
    Succeeded { attempts: u32 },
    /// Every attempt failed; the cancellation stays owed.
    Exhausted { attempts: u32 },
}

/// Retries `cancel_payment` until it succeeds or the policy runs out.
///
/// The first attempt is made immediately. On success the payment's owed
/// marker is cleared; on exhaustion it is left in place so a later read of
/// the rental can still settle it.
#[tracing::instrument(skip(payments, pending))]
pub async fn retry_payment_cancellation<P>(
    payments: &P,
    payment_uid: PaymentUid,
    pending: &PendingCancellations,
    policy: RetryPolicy,
) -> RetryOutcome
where
    P: PaymentClient + ?Sized,
{
    for attempt in 1..=policy.max_attempts {
        match payments.cancel_payment(payment_uid).await {
            Ok(()) => {
                pending.remove(payment_uid).await;
                metrics::counter!("payment_cancellation_retries_total", "outcome" => "succeeded")
                    .increment(1);
                tracing::info!(%payment_uid, attempt, "payment cancellation delivered");
                return RetryOutcome::Succeeded { attempts: attempt };
            }
            Err(e) => {
                tracing::debug!(%payment_uid, attempt, error = %e, "payment cancellation attempt failed");
            }
        }

        if attempt < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    metrics::counter!("payment_cancellation_retries_total", "outcome" => "exhausted").increment(1);
    tracing::error!(
        %payment_uid,
        attempts = policy.max_attempts,
        "giving up on payment cancellation"
    );
    RetryOutcome::Exhausted {
        attempts: policy.max_attempts,
    }
}

/// Starts [`retry_payment_cancellation`] on its own task and returns at once.
///
/// The task outlives the request that started it. The caller holds the
/// payment's retry claim; the task gives it back when it ends.
pub fn spawn_payment_cancellation_retry<P>(
    payments: P,
    payment_uid: PaymentUid,
    pending: PendingCancellations,
    policy: RetryPolicy,
) where
    P: PaymentClient + 'static,
{
    tracing::warn!(%payment_uid, max_attempts = policy.max_attempts, "scheduling payment cancellation retry");
    tokio::spawn(async move {
        retry_payment_cancellation(&payments, payment_uid, &pending, policy).await;
        pending.release_retry(payment_uid).await;
    });
}

#[cfg(test)]
mod tests {
    use clients::InMemoryPaymentService;
    use domain::{Money, PaymentStatus};
    use tokio::time::Instant;

    use super::*;

    fn assert_elapsed(started: Instant, expected: Duration) {
        let elapsed = started.elapsed();
        assert!(
            elapsed >= expected && elapsed < expected + Duration::from_secs(1),
            "elapsed {elapsed:?}, expected about {expected:?}"
        );
    }

    async fn owed_payment(
        payments: &InMemoryPaymentService,
        pending: &PendingCancellations,
    ) -> PaymentUid {
        let uid = payments.create_payment(Money::new(300)).await.unwrap();
        pending.insert(uid).await;
        uid
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_on_first_success() {
        let payments = InMemoryPaymentService::new();
        let pending = PendingCancellations::new();
        let uid = owed_payment(&payments, &pending).await;

        // Succeeds on the fourth attempt.
        payments.fail_next_cancellations(3);
        let started = Instant::now();

        let outcome =
            retry_payment_cancellation(&payments, uid, &pending, RetryPolicy::default()).await;

        assert_eq!(outcome, RetryOutcome::Succeeded { attempts: 4 });
        assert_eq!(payments.cancel_attempts(), 4);
        assert_elapsed(started, Duration::from_secs(30));
        assert_eq!(payments.payment(uid).unwrap().status, PaymentStatus::Canceled);
        assert!(!pending.contains(uid).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_attempts() {
        let payments = InMemoryPaymentService::new();
        let pending = PendingCancellations::new();
        let uid = owed_payment(&payments, &pending).await;

        payments.fail_next_cancellations(1_000);
        let started = Instant::now();

        let outcome =
            retry_payment_cancellation(&payments, uid, &pending, RetryPolicy::default()).await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 100 });
        assert_eq!(payments.cancel_attempts(), 100);
        assert_elapsed(started, Duration::from_secs(99 * 10));
        assert_eq!(payments.payment(uid).unwrap().status, PaymentStatus::Paid);
        assert!(pending.contains(uid).await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_success_does_not_sleep() {
        let payments = InMemoryPaymentService::new();
        let pending = PendingCancellations::new();
        let uid = owed_payment(&payments, &pending).await;
        let started = Instant::now();

        let outcome =
            retry_payment_cancellation(&payments, uid, &pending, RetryPolicy::default()).await;

        assert_eq!(outcome, RetryOutcome::Succeeded { attempts: 1 });
        assert_elapsed(started, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_attempts_policy_is_exhausted_at_once() {
        let payments = InMemoryPaymentService::new();
        let pending = PendingCancellations::new();
        let uid = owed_payment(&payments, &pending).await;

        let outcome = retry_payment_cancellation(
            &payments,
            uid,
            &pending,
            RetryPolicy::new(0, Duration::from_secs(10)),
        )
        .await;

        assert_eq!(outcome, RetryOutcome::Exhausted { attempts: 0 });
        assert_eq!(payments.cancel_attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_retry_runs_detached() {
        let payments = InMemoryPaymentService::new();
        let pending = PendingCancellations::new();
        let uid = owed_payment(&payments, &pending).await;
        payments.fail_next_cancellations(2);
        assert!(pending.claim_retry(uid).await);

        spawn_payment_cancellation_retry(
            payments.clone(),
            uid,
            pending.clone(),
            RetryPolicy::default(),
        );

        tokio::time::sleep(Duration::from_secs(25)).await;
        assert_eq!(payments.cancel_attempts(), 3);
        assert!(!pending.contains(uid).await);
        assert!(!pending.is_retrying(uid).await);
    }
}
