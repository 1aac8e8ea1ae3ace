pub mod a001_customer;
pub mod a002_note;
pub mod a003_order;
pub mod common;
