//! Customer record lookup.
//!
//! The agent only needs a one-line summary of a customer to ground its
//! answer; the directory behind it is pluggable. [`MockCustomerDirectory`]
//! returns a fixed profile for any id.

use async_trait::async_trait;
use tracing::debug;
use warden_core::error::ToolError;

#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// A short, model-readable summary of the customer.
    async fn lookup(&self, customer_id: &str) -> Result<String, ToolError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MockCustomerDirectory;

#[async_trait]
impl CustomerDirectory for MockCustomerDirectory {
    async fn lookup(&self, customer_id: &str) -> Result<String, ToolError> {
        let customer_id = customer_id.trim();
        if customer_id.is_empty() {
            return Err(ToolError::InvalidArguments("customer_id is empty".into()));
        }
        debug!(customer_id, "Mock customer lookup");
        Ok(format!(
            "Customer {customer_id}: Premium user since 2023, 3 previous support tickets"
        ))
    }
}
