//! Step names used in logs, metrics and errors.

/// Step: reserve the car and learn its daily price.
pub const STEP_RESERVE_CAR: &str = "reserve_car";

/// Step: charge the customer for the whole rental period.
pub const STEP_CREATE_PAYMENT: &str = "create_payment";

/// Step: open the rental record.
pub const STEP_CREATE_RENTAL: &str = "create_rental";

/// Step: mark the rental finished.
pub const STEP_FINISH_RENTAL: &str = "finish_rental";

/// Step: mark the rental canceled.
pub const STEP_CANCEL_RENTAL: &str = "cancel_rental";

/// Step: make the car available again.
pub const STEP_RELEASE_CAR: &str = "release_car";

/// Step: cancel the payment.
pub const STEP_CANCEL_PAYMENT: &str = "cancel_payment";
