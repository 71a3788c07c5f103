//! Saga coordinator for the rental operations.

use std::time::Instant;

use clients::{CarClient, ClientError, PaymentClient, RentalClient};
use common::{CarUid, PaymentUid, RentalUid, Username};
use domain::{
    AggregatedRentalView, CarsPage, CarsQuery, NewRental, Payment, Rental, RentalConfirmation,
    RentalRequest, RentalStatus,
};

use crate::error::SagaError;
use crate::pending::PendingCancellations;
use crate::rental_saga::{
    STEP_CANCEL_PAYMENT, STEP_CANCEL_RENTAL, STEP_CREATE_PAYMENT, STEP_CREATE_RENTAL,
    STEP_FINISH_RENTAL, STEP_RELEASE_CAR, STEP_RESERVE_CAR,
};
use crate::retry::{self, RetryPolicy};

/// A rental view produced by a read that may have settled an owed payment
/// cancellation first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettledRentalView {
    pub view: AggregatedRentalView,
    /// True when this read delivered a previously failed payment cancellation.
    pub settled_payment: bool,
}

/// Orchestrates rental operations across the car, rental and payment services.
///
/// Every operation is a strictly sequential chain of remote calls; nothing is
/// fanned out and no forward step is retried. Compensations undo completed
/// steps in reverse order. The only state kept between requests is the
/// registry of owed payment cancellations.
pub struct RentalSagaCoordinator<C, R, P>
where
    C: CarClient,
    R: RentalClient,
    P: PaymentClient + Clone + 'static,
{
    cars: C,
    rentals: R,
    payments: P,
    pending: PendingCancellations,
    retry_policy: RetryPolicy,
}

impl<C, R, P> RentalSagaCoordinator<C, R, P>
where
    C: CarClient,
    R: RentalClient,
    P: PaymentClient + Clone + 'static,
{
    /// Creates a coordinator with the default retry policy.
    pub fn new(cars: C, rentals: R, payments: P) -> Self {
        Self {
            cars,
            rentals,
            payments,
            pending: PendingCancellations::new(),
            retry_policy: RetryPolicy::default(),
        }
    }

    /// Replaces the policy used for background payment cancellation retries.
    pub fn with_retry_policy(mut self, retry_policy: RetryPolicy) -> Self {
        self.retry_policy = retry_policy;
        self
    }

    /// Owed payment cancellations.
    pub fn pending_cancellations(&self) -> &PendingCancellations {
        &self.pending
    }

    /// Rents a car: reserve it, charge the whole period, open the rental.
    ///
    /// A payment failure releases the car. A rental failure cancels the
    /// payment and releases the car. A 503 from the payment service is
    /// reported as [`SagaError::PaymentUnavailable`].
    #[tracing::instrument(skip(self, request), fields(car_uid = %request.car_uid))]
    pub async fn rent_car(
        &self,
        username: &Username,
        request: RentalRequest,
    ) -> Result<RentalConfirmation, SagaError> {
        metrics::counter!("rental_saga_executions_total", "operation" => "rent").increment(1);
        let started = Instant::now();
        let result = self.run_rent(username, request).await;
        record_outcome("rent", started, &result);
        result
    }

    async fn run_rent(
        &self,
        username: &Username,
        request: RentalRequest,
    ) -> Result<RentalConfirmation, SagaError> {
        let car_uid = request.car_uid;

        // 1. Reserve the car
        tracing::info!(step = STEP_RESERVE_CAR, "saga step started");
        let reserved = self
            .cars
            .reserve_car(car_uid)
            .await
            .map_err(|source| SagaError::StepFailed {
                step: STEP_RESERVE_CAR,
                source,
            })?;

        // 2. Price the whole period
        let Some(price) = reserved.price.for_period(request.date_from, request.date_to) else {
            tracing::warn!(daily_price = %reserved.price, "rental price out of range");
            self.compensate_reservation(car_uid).await?;
            return Err(SagaError::PriceOutOfRange {
                car_uid,
                daily_price: reserved.price,
            });
        };

        // 3. Charge the payment
        tracing::info!(step = STEP_CREATE_PAYMENT, %price, "saga step started");
        let payment_uid = match self.payments.create_payment(price).await {
            Ok(payment_uid) => payment_uid,
            Err(source) => {
                tracing::warn!(step = STEP_CREATE_PAYMENT, error = %source, "saga step failed");
                if source.is_payment_unavailable() {
                    // A failed release never masks payment unavailability; it is
                    // logged and counted by the compensation itself.
                    self.compensate_reservation(car_uid).await.ok();
                    return Err(SagaError::PaymentUnavailable);
                }
                self.compensate_reservation(car_uid).await?;
                return Err(SagaError::StepFailed {
                    step: STEP_CREATE_PAYMENT,
                    source,
                });
            }
        };

        // 4. Open the rental
        tracing::info!(step = STEP_CREATE_RENTAL, %payment_uid, "saga step started");
        let new_rental = NewRental {
            car_uid,
            date_from: request.date_from,
            date_to: request.date_to,
            username: username.clone(),
            payment_uid,
        };
        let rental_uid = match self.rentals.create_rental(new_rental).await {
            Ok(rental_uid) => rental_uid,
            Err(source) => {
                tracing::warn!(step = STEP_CREATE_RENTAL, error = %source, "saga step failed");
                self.compensate_payment(payment_uid).await;
                self.compensate_reservation(car_uid).await?;
                return Err(SagaError::StepFailed {
                    step: STEP_CREATE_RENTAL,
                    source,
                });
            }
        };

        tracing::info!(%rental_uid, %payment_uid, %price, "car rented");
        Ok(RentalConfirmation {
            rental_uid,
            car_uid,
            date_from: request.date_from,
            date_to: request.date_to,
            status: RentalStatus::InProgress,
            payment: Payment::paid(payment_uid, price),
        })
    }

    /// Finishes a rental and releases its car. Not reversible, so nothing is
    /// compensated; any failure is reported as [`SagaError::RentalNotEnded`].
    #[tracing::instrument(skip(self))]
    pub async fn end_rental(&self, rental_uid: RentalUid) -> Result<(), SagaError> {
        metrics::counter!("rental_saga_executions_total", "operation" => "finish").increment(1);
        let started = Instant::now();
        let result = self.run_end(rental_uid).await;
        record_outcome("finish", started, &result);
        result
    }

    async fn run_end(&self, rental_uid: RentalUid) -> Result<(), SagaError> {
        let not_ended = |source| SagaError::RentalNotEnded { rental_uid, source };

        tracing::info!(step = STEP_FINISH_RENTAL, "saga step started");
        let car_uid = self
            .rentals
            .finish_rental(rental_uid)
            .await
            .map_err(not_ended)?;

        tracing::info!(step = STEP_RELEASE_CAR, %car_uid, "saga step started");
        self.cars.release_car(car_uid).await.map_err(not_ended)?;

        tracing::info!(%car_uid, "rental finished");
        Ok(())
    }

    /// Cancels a rental, releases its car and cancels its payment.
    ///
    /// The car is released before the payment is touched. If the payment
    /// cannot be canceled, the cancellation is recorded as owed, handed to a
    /// background retry and [`SagaError::PaymentCancellationDeferred`] is
    /// returned.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_rental(&self, rental_uid: RentalUid) -> Result<(), SagaError> {
        metrics::counter!("rental_saga_executions_total", "operation" => "cancel").increment(1);
        let started = Instant::now();
        let result = self.run_cancel(rental_uid).await;
        record_outcome("cancel", started, &result);
        result
    }

    async fn run_cancel(&self, rental_uid: RentalUid) -> Result<(), SagaError> {
        // 1. Cancel the rental record
        tracing::info!(step = STEP_CANCEL_RENTAL, "saga step started");
        let rental = self
            .rentals
            .cancel_rental(rental_uid)
            .await
            .map_err(|source| SagaError::StepFailed {
                step: STEP_CANCEL_RENTAL,
                source,
            })?;

        // 2. Release the car
        tracing::info!(step = STEP_RELEASE_CAR, car_uid = %rental.car_uid, "saga step started");
        let released = self.cars.release_car(rental.car_uid).await;
        if let Err(e) = &released {
            tracing::error!(step = STEP_RELEASE_CAR, car_uid = %rental.car_uid, error = %e, "saga step failed");
        }

        // 3. Cancel the payment, whether or not the car came back
        tracing::info!(step = STEP_CANCEL_PAYMENT, payment_uid = %rental.payment_uid, "saga step started");
        if let Err(source) = self.payments.cancel_payment(rental.payment_uid).await {
            tracing::warn!(step = STEP_CANCEL_PAYMENT, error = %source, "saga step failed");
            self.defer_payment_cancellation(rental.payment_uid).await;
            return Err(SagaError::PaymentCancellationDeferred {
                payment_uid: rental.payment_uid,
                source,
            });
        }

        released.map_err(|source| SagaError::StepFailed {
            step: STEP_RELEASE_CAR,
            source,
        })?;

        tracing::info!(car_uid = %rental.car_uid, payment_uid = %rental.payment_uid, "rental canceled");
        Ok(())
    }

    /// Reads a rental with its car and payment, first delivering an owed
    /// payment cancellation if the payment still reads as paid.
    ///
    /// This read can write: the returned `settled_payment` flag tells whether
    /// it did. A failed car lookup fails the read; a failed payment lookup
    /// only omits the payment from the view.
    #[tracing::instrument(skip(self))]
    pub async fn rental_info_with_settlement(
        &self,
        username: &Username,
        rental_uid: RentalUid,
    ) -> Result<SettledRentalView, SagaError> {
        let rental = self.rentals.get_rental(username, rental_uid).await?;
        let settled_payment = self.settle_owed_cancellation(rental.payment_uid).await?;

        let car = self.cars.get_car(rental.car_uid).await?;
        let payment = match self.payments.get_payment(rental.payment_uid).await {
            Ok(payment) => Some(payment),
            Err(e) => {
                tracing::warn!(payment_uid = %rental.payment_uid, error = %e, "payment omitted from rental view");
                None
            }
        };

        Ok(SettledRentalView {
            view: AggregatedRentalView::assemble(&rental, &car, payment),
            settled_payment,
        })
    }

    /// Lists a user's rentals joined with cars and payments.
    ///
    /// Unlike the single-rental read, any failed lookup fails the listing.
    #[tracing::instrument(skip(self))]
    pub async fn list_user_rentals(
        &self,
        username: &Username,
    ) -> Result<Vec<AggregatedRentalView>, SagaError> {
        let rentals = self.rentals.get_user_rentals(username).await?;

        let mut views = Vec::with_capacity(rentals.len());
        for rental in &rentals {
            views.push(self.joined_view(rental).await?);
        }
        Ok(views)
    }

    /// One page of the car listing.
    pub async fn list_cars(&self, query: CarsQuery) -> Result<CarsPage, SagaError> {
        Ok(self.cars.list_cars(query).await?)
    }

    async fn joined_view(&self, rental: &Rental) -> Result<AggregatedRentalView, ClientError> {
        let payment = self.payments.get_payment(rental.payment_uid).await?;
        let car = self.cars.get_car(rental.car_uid).await?;
        Ok(AggregatedRentalView::assemble(rental, &car, Some(payment)))
    }

    /// Delivers an owed cancellation for `payment_uid`, if one is recorded.
    ///
    /// Returns true when a cancellation was sent. An unreadable payment leaves
    /// the marker alone.
    async fn settle_owed_cancellation(&self, payment_uid: PaymentUid) -> Result<bool, SagaError> {
        if !self.pending.contains(payment_uid).await {
            return Ok(false);
        }

        let payment = match self.payments.get_payment(payment_uid).await {
            Ok(payment) => payment,
            Err(e) => {
                tracing::warn!(%payment_uid, error = %e, "cannot read payment with owed cancellation");
                return Ok(false);
            }
        };

        if !payment.is_paid() {
            self.pending.remove(payment_uid).await;
            return Ok(false);
        }

        tracing::info!(%payment_uid, "delivering owed payment cancellation");
        self.payments
            .cancel_payment(payment_uid)
            .await
            .map_err(|source| SagaError::CompensationFailed {
                step: STEP_CREATE_PAYMENT,
                source,
            })?;
        self.pending.remove(payment_uid).await;
        metrics::counter!("rental_saga_compensations_total", "step" => STEP_CREATE_PAYMENT, "outcome" => "settled_on_read")
            .increment(1);
        Ok(true)
    }

    /// Undoes a car reservation.
    async fn compensate_reservation(&self, car_uid: CarUid) -> Result<(), SagaError> {
        match self.cars.release_car(car_uid).await {
            Ok(()) => {
                record_compensation(STEP_RESERVE_CAR, "completed");
                tracing::info!(step = STEP_RESERVE_CAR, %car_uid, "compensation step completed");
                Ok(())
            }
            Err(source) => {
                record_compensation(STEP_RESERVE_CAR, "failed");
                tracing::error!(step = STEP_RESERVE_CAR, %car_uid, error = %source, "compensation step failed");
                Err(SagaError::CompensationFailed {
                    step: STEP_RESERVE_CAR,
                    source,
                })
            }
        }
    }

    /// Undoes a payment. A failure does not stop the compensation chain; the
    /// cancellation is deferred to the background retry instead.
    async fn compensate_payment(&self, payment_uid: PaymentUid) {
        match self.payments.cancel_payment(payment_uid).await {
            Ok(()) => {
                record_compensation(STEP_CREATE_PAYMENT, "completed");
                tracing::info!(step = STEP_CREATE_PAYMENT, %payment_uid, "compensation step completed");
            }
            Err(e) => {
                record_compensation(STEP_CREATE_PAYMENT, "deferred");
                tracing::warn!(step = STEP_CREATE_PAYMENT, %payment_uid, error = %e, "compensation step deferred");
                self.defer_payment_cancellation(payment_uid).await;
            }
        }
    }

    /// Records the cancellation as owed and makes sure a background retry is
    /// running for it. At most one retry runs per payment; a payment whose
    /// earlier retry gave up gets a new one.
    async fn defer_payment_cancellation(&self, payment_uid: PaymentUid) {
        self.pending.insert(payment_uid).await;
        if self.pending.claim_retry(payment_uid).await {
            retry::spawn_payment_cancellation_retry(
                self.payments.clone(),
                payment_uid,
                self.pending.clone(),
                self.retry_policy,
            );
        } else {
            tracing::debug!(%payment_uid, "payment cancellation retry already running");
        }
    }
}

fn record_compensation(step: &'static str, outcome: &'static str) {
    metrics::counter!("rental_saga_compensations_total", "step" => step, "outcome" => outcome)
        .increment(1);
}

fn record_outcome<T>(operation: &'static str, started: Instant, result: &Result<T, SagaError>) {
    let duration = started.elapsed().as_secs_f64();
    metrics::histogram!("rental_saga_duration_seconds", "operation" => operation).record(duration);
    match result {
        Ok(_) => tracing::info!(operation, duration, "saga completed"),
        Err(e) => {
            metrics::counter!("rental_saga_failed_total", "operation" => operation).increment(1);
            tracing::warn!(
                operation,
                duration,
                compensation_failed = e.is_compensation_failure(),
                error = %e,
                "saga failed"
            );
        }
    }
}
