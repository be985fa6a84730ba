mod billing_period;

pub use billing_period::start_of_month;
