use crate::errors::RoutingError;
use serde::{Deserialize, Serialize};
use std::fmt::Display;

/// Opaque node identifier in the channel network
pub type NodeId = u32;

/// Identifier of a payment inside one batch
pub type TransactionId = usize;

/// A payment to be routed through the channel network. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub source: NodeId,
    pub target: NodeId,
    pub amount: u64,
}

impl Transaction {
    /// Create a transaction, rejecting self-payments and zero amounts
    pub fn new(id: TransactionId, source: NodeId, target: NodeId, amount: u64) -> Result<Self, RoutingError> {
        if source == target {
            return Err(RoutingError::InvalidTransaction { id, reason: format!("source and target are both node {source}") });
        }
        if amount == 0 {
            return Err(RoutingError::InvalidTransaction { id, reason: "amount must be positive".to_string() });
        }
        Ok(Self { id, source, target, amount })
    }
}

impl Display for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Transaction(id={}, {}->{}, amount={})", self.id, self.source, self.target, self.amount)
    }
}

/// Mean payment amount of a batch, `None` for an empty batch
pub fn mean_amount(transactions: &[Transaction]) -> Option<f64> {
    if transactions.is_empty() {
        return None;
    }
    let total: f64 = transactions.iter().map(|tx| tx.amount as f64).sum();
    Some(total / transactions.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transaction_creation() -> eyre::Result<()> {
        let tx = Transaction::new(1, 0, 10, 500)?;

        assert_eq!(tx.source, 0);
        assert_eq!(tx.target, 10);
        assert_eq!(tx.amount, 500);
        assert_eq!(tx.id, 1);
        assert_eq!(tx.to_string(), "Transaction(id=1, 0->10, amount=500)");

        Ok(())
    }

    #[test]
    fn test_transaction_rejects_self_payment() {
        let err = Transaction::new(3, 7, 7, 100).unwrap_err();
        assert!(matches!(err, RoutingError::InvalidTransaction { id: 3, .. }));
    }

    #[test]
    fn test_transaction_rejects_zero_amount() {
        assert!(Transaction::new(0, 1, 2, 0).is_err());
    }

    #[test]
    fn test_mean_amount() -> eyre::Result<()> {
        let batch = vec![Transaction::new(0, 0, 1, 200)?, Transaction::new(1, 1, 2, 400)?];
        assert_eq!(mean_amount(&batch), Some(300.0));
        assert_eq!(mean_amount(&[]), None);
        Ok(())
    }
}
