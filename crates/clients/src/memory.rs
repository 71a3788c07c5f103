//! In-memory stand-ins for the backend services.
//!
//! Each service keeps its records behind an `Arc<Mutex<_>>` so clones share
//! state, and exposes switches that make selected operations fail the way the
//! real service would.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use common::{CarUid, PaymentUid, RentalUid, Username};
use domain::{
    Car, CarsPage, CarsQuery, Money, NewRental, Payment, PaymentStatus, Rental, RentalStatus,
    ReservedCar,
};

use crate::car::CarClient;
use crate::error::{Backend, ClientError};
use crate::payment::PaymentClient;
use crate::rental::RentalClient;

fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// -- Car service --

#[derive(Debug, Default)]
struct InMemoryCarState {
    cars: HashMap<CarUid, Car>,
    release_calls: HashMap<CarUid, u32>,
    fail_on_reserve: bool,
    fail_on_release: bool,
}

/// In-memory car service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCarService {
    state: Arc<Mutex<InMemoryCarState>>,
}

impl InMemoryCarService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an available car and returns its identifier.
    pub fn add_car(&self, brand: &str, model: &str, daily_price: i64) -> CarUid {
        let car_uid = CarUid::new();
        let car = Car {
            car_uid,
            brand: brand.to_string(),
            model: model.to_string(),
            registration_number: format!("RN-{}", &car_uid.to_string()[..8]),
            power: 150,
            price: Money::new(daily_price),
            car_type: "SEDAN".to_string(),
            available: true,
        };
        lock(&self.state).cars.insert(car_uid, car);
        car_uid
    }

    pub fn set_fail_on_reserve(&self, fail: bool) {
        lock(&self.state).fail_on_reserve = fail;
    }

    pub fn set_fail_on_release(&self, fail: bool) {
        lock(&self.state).fail_on_release = fail;
    }

    /// Returns true if the car exists and is currently reserved.
    pub fn is_reserved(&self, car_uid: CarUid) -> bool {
        lock(&self.state)
            .cars
            .get(&car_uid)
            .is_some_and(|car| !car.available)
    }

    /// Number of release calls received for a car, successful or not.
    pub fn release_count(&self, car_uid: CarUid) -> u32 {
        lock(&self.state)
            .release_calls
            .get(&car_uid)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl CarClient for InMemoryCarService {
    async fn reserve_car(&self, car_uid: CarUid) -> Result<ReservedCar, ClientError> {
        let mut state = lock(&self.state);
        if state.fail_on_reserve {
            return Err(ClientError::remote(Backend::Car, "car service unavailable"));
        }
        let car = state
            .cars
            .get_mut(&car_uid)
            .ok_or_else(|| ClientError::not_found(Backend::Car, format!("car {car_uid}")))?;
        if !car.available {
            return Err(ClientError::remote(
                Backend::Car,
                format!("car {car_uid} is already reserved"),
            ));
        }
        car.available = false;
        Ok(ReservedCar {
            car_uid,
            price: car.price,
        })
    }

    async fn release_car(&self, car_uid: CarUid) -> Result<(), ClientError> {
        let mut state = lock(&self.state);
        *state.release_calls.entry(car_uid).or_default() += 1;
        if state.fail_on_release {
            return Err(ClientError::remote(Backend::Car, "car service unavailable"));
        }
        let car = state
            .cars
            .get_mut(&car_uid)
            .ok_or_else(|| ClientError::not_found(Backend::Car, format!("car {car_uid}")))?;
        car.available = true;
        Ok(())
    }

    async fn get_car(&self, car_uid: CarUid) -> Result<Car, ClientError> {
        lock(&self.state)
            .cars
            .get(&car_uid)
            .cloned()
            .ok_or_else(|| ClientError::not_found(Backend::Car, format!("car {car_uid}")))
    }

    async fn list_cars(&self, query: CarsQuery) -> Result<CarsPage, ClientError> {
        let state = lock(&self.state);
        let mut cars: Vec<Car> = state
            .cars
            .values()
            .filter(|car| query.show_all || car.available)
            .cloned()
            .collect();
        cars.sort_by(|a, b| (&a.brand, &a.model).cmp(&(&b.brand, &b.model)));

        let total_elements = cars.len() as u64;
        let size = query.size.max(1) as usize;
        let skip = (query.page.max(1) as usize - 1) * size;
        let items = cars.into_iter().skip(skip).take(size).collect();

        Ok(CarsPage {
            page: query.page,
            page_size: query.size,
            total_elements,
            items,
        })
    }
}

// -- Rental service --

#[derive(Debug, Default)]
struct InMemoryRentalState {
    rentals: HashMap<RentalUid, Rental>,
    fail_on_create: bool,
    fail_on_finish: bool,
    fail_on_cancel: bool,
}

/// In-memory rental service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRentalService {
    state: Arc<Mutex<InMemoryRentalState>>,
}

impl InMemoryRentalService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_on_create(&self, fail: bool) {
        lock(&self.state).fail_on_create = fail;
    }

    pub fn set_fail_on_finish(&self, fail: bool) {
        lock(&self.state).fail_on_finish = fail;
    }

    pub fn set_fail_on_cancel(&self, fail: bool) {
        lock(&self.state).fail_on_cancel = fail;
    }

    pub fn rental(&self, rental_uid: RentalUid) -> Option<Rental> {
        lock(&self.state).rentals.get(&rental_uid).cloned()
    }

    pub fn rental_count(&self) -> usize {
        lock(&self.state).rentals.len()
    }

    fn transition(
        &self,
        rental_uid: RentalUid,
        to: RentalStatus,
        fail: impl Fn(&InMemoryRentalState) -> bool,
    ) -> Result<Rental, ClientError> {
        let mut state = lock(&self.state);
        if fail(&*state) {
            return Err(ClientError::remote(
                Backend::Rental,
                "rental service unavailable",
            ));
        }
        let rental = state.rentals.get_mut(&rental_uid).ok_or_else(|| {
            ClientError::not_found(Backend::Rental, format!("rental {rental_uid}"))
        })?;
        if rental.status != RentalStatus::InProgress {
            return Err(ClientError::remote(
                Backend::Rental,
                format!("rental {rental_uid} is {}", rental.status),
            ));
        }
        rental.status = to;
        Ok(rental.clone())
    }
}

#[async_trait]
impl RentalClient for InMemoryRentalService {
    async fn get_user_rentals(&self, username: &Username) -> Result<Vec<Rental>, ClientError> {
        let state = lock(&self.state);
        let mut rentals: Vec<Rental> = state
            .rentals
            .values()
            .filter(|r| &r.username == username)
            .cloned()
            .collect();
        rentals.sort_by_key(|r| (r.date_from, r.rental_uid.as_uuid()));
        Ok(rentals)
    }

    async fn get_rental(
        &self,
        username: &Username,
        rental_uid: RentalUid,
    ) -> Result<Rental, ClientError> {
        lock(&self.state)
            .rentals
            .get(&rental_uid)
            .filter(|r| &r.username == username)
            .cloned()
            .ok_or_else(|| ClientError::not_found(Backend::Rental, format!("rental {rental_uid}")))
    }

    async fn create_rental(&self, rental: NewRental) -> Result<RentalUid, ClientError> {
        let mut state = lock(&self.state);
        if state.fail_on_create {
            return Err(ClientError::remote(
                Backend::Rental,
                "rental service unavailable",
            ));
        }
        let rental_uid = RentalUid::new();
        state.rentals.insert(
            rental_uid,
            Rental {
                rental_uid,
                car_uid: rental.car_uid,
                payment_uid: rental.payment_uid,
                username: rental.username,
                date_from: rental.date_from,
                date_to: rental.date_to,
                status: RentalStatus::InProgress,
            },
        );
        Ok(rental_uid)
    }

    async fn finish_rental(&self, rental_uid: RentalUid) -> Result<CarUid, ClientError> {
        self.transition(rental_uid, RentalStatus::Finished, |s| s.fail_on_finish)
            .map(|rental| rental.car_uid)
    }

    async fn cancel_rental(&self, rental_uid: RentalUid) -> Result<Rental, ClientError> {
        self.transition(rental_uid, RentalStatus::Canceled, |s| s.fail_on_cancel)
    }
}

// -- Payment service --

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    payments: HashMap<PaymentUid, Payment>,
    unavailable_on_create: bool,
    fail_on_create: bool,
    fail_on_get: bool,
    failing_cancellations: u32,
    cancel_attempts: u32,
}

/// In-memory payment service.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<Mutex<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes payment creation answer 503.
    pub fn set_unavailable_on_create(&self, unavailable: bool) {
        lock(&self.state).unavailable_on_create = unavailable;
    }

    /// Makes payment creation fail with a generic error.
    pub fn set_fail_on_create(&self, fail: bool) {
        lock(&self.state).fail_on_create = fail;
    }

    pub fn set_fail_on_get(&self, fail: bool) {
        lock(&self.state).fail_on_get = fail;
    }

    /// Makes the next `count` cancellations answer 503.
    pub fn fail_next_cancellations(&self, count: u32) {
        lock(&self.state).failing_cancellations = count;
    }

    /// Number of cancellation requests received, successful or not.
    pub fn cancel_attempts(&self) -> u32 {
        lock(&self.state).cancel_attempts
    }

    pub fn payment(&self, payment_uid: PaymentUid) -> Option<Payment> {
        lock(&self.state).payments.get(&payment_uid).cloned()
    }

    pub fn payment_count(&self) -> usize {
        lock(&self.state).payments.len()
    }
}

#[async_trait]
impl PaymentClient for InMemoryPaymentService {
    async fn get_payment(&self, payment_uid: PaymentUid) -> Result<Payment, ClientError> {
        let state = lock(&self.state);
        if state.fail_on_get {
            return Err(ClientError::remote(Backend::Payment, "request timed out"));
        }
        state
            .payments
            .get(&payment_uid)
            .cloned()
            .ok_or_else(|| ClientError::not_found(Backend::Payment, format!("payment {payment_uid}")))
    }

    async fn create_payment(&self, price: Money) -> Result<PaymentUid, ClientError> {
        let mut state = lock(&self.state);
        if state.unavailable_on_create {
            return Err(ClientError::PaymentUnavailable);
        }
        if state.fail_on_create {
            return Err(ClientError::remote(Backend::Payment, "request timed out"));
        }
        let payment = Payment::paid(PaymentUid::new(), price);
        let payment_uid = payment.payment_uid;
        state.payments.insert(payment_uid, payment);
        Ok(payment_uid)
    }

    async fn cancel_payment(&self, payment_uid: PaymentUid) -> Result<(), ClientError> {
        let mut state = lock(&self.state);
        state.cancel_attempts += 1;
        if state.failing_cancellations > 0 {
            state.failing_cancellations -= 1;
            return Err(ClientError::PaymentUnavailable);
        }
        let payment = state.payments.get_mut(&payment_uid).ok_or_else(|| {
            ClientError::not_found(Backend::Payment, format!("payment {payment_uid}"))
        })?;
        payment.status = PaymentStatus::Canceled;
        Ok(())
    }
}
