use super::poly::VarId;
use crate::logic::types::TransactionId;
use std::collections::BTreeMap;

/// Sparse `transaction -> candidate index -> variable` matrix.
///
/// Variables exist only for candidates that were actually found, and are handed out
/// once: asking again for the same `(transaction, candidate)` returns the same id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecisionVariables {
    by_transaction: BTreeMap<TransactionId, BTreeMap<usize, VarId>>,
    labels: Vec<(TransactionId, usize)>,
}

impl DecisionVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variable for `x[transaction][candidate]`, created on first request
    pub fn get_or_create(&mut self, transaction: TransactionId, candidate: usize) -> VarId {
        let next = VarId(self.labels.len());
        let var = *self.by_transaction.entry(transaction).or_default().entry(candidate).or_insert(next);
        if var == next {
            self.labels.push((transaction, candidate));
        }
        var
    }

    pub fn get(&self, transaction: TransactionId, candidate: usize) -> Option<VarId> {
        self.by_transaction.get(&transaction)?.get(&candidate).copied()
    }

    /// `(transaction, candidate)` behind a variable
    pub fn label(&self, var: VarId) -> Option<(TransactionId, usize)> {
        self.labels.get(var.0).copied()
    }

    /// Variables of one transaction in candidate order
    pub fn row(&self, transaction: TransactionId) -> impl Iterator<Item = (usize, VarId)> + '_ {
        self.by_transaction.get(&transaction).into_iter().flat_map(|row| row.iter().map(|(j, var)| (*j, *var)))
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransactionId, usize, VarId)> + '_ {
        self.by_transaction.iter().flat_map(|(tx, row)| row.iter().map(move |(j, var)| (*tx, *j, *var)))
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}
