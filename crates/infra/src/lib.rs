//! Infrastructure layer: storage adapters and the bill generation pipeline.

pub mod audit;
pub mod bill_store;
pub mod billing_handler;
pub mod db;
pub mod directory;
pub mod sequence;

pub use billing_handler::{
    BillingFailure, BillingHandler, BillingStage, GenerateBill, GenerateBillError, GeneratedBill,
};

#[cfg(test)]
mod test_support;

#[cfg(test)]
mod integration_tests;
