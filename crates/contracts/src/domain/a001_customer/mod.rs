pub mod aggregate;
pub mod lifecycle;

pub use aggregate::{Customer, CustomerCard, CustomerDto, CustomerId, CustomerPatch, CustomerStage};
pub use lifecycle::{Applied, CounterDelta, StageShift};
