pub use integrals::{ConfigIntegrals, IntegralFile};

mod integrals;
