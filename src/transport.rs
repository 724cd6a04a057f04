use async_trait::async_trait;

use crate::compiler::CompiledQuery;
use crate::error::Error;

/// -----------------------------
/// Transport contract
/// -----------------------------
///
/// Submits compiled statements to the database. Connection pooling, retries
/// and credentials live behind this trait; the catalog never retries.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Runs one statement and returns its result rows.
    async fn execute(&self, query: &CompiledQuery) -> Result<Vec<serde_json::Value>, Error>;

    /// Runs statements in order, stopping at the first failure.
    async fn execute_all(
        &self,
        statements: &[CompiledQuery],
    ) -> Result<Vec<Vec<serde_json::Value>>, Error> {
        let mut results = Vec::with_capacity(statements.len());
        for statement in statements {
            results.push(self.execute(statement).await?);
        }
        Ok(results)
    }
}
