use super::route::{Route, RouteHash};
use super::types::TransactionId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Display;

/// Ordered candidate routes of one transaction. Makes sure no node sequence appears twice.
#[derive(Debug, Clone, Default)]
pub struct CandidateRoutes {
    routes: Vec<Route>,
    hashes: HashSet<RouteHash>,
}

impl CandidateRoutes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route unless an identical node sequence is already present. Returns true if added.
    pub fn insert(&mut self, route: Route) -> bool {
        if !self.hashes.insert(route.route_hash.clone()) {
            return false;
        }
        self.routes.push(route);
        true
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Route> {
        self.routes.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter()
    }

    pub fn contains(&self, route: &Route) -> bool {
        self.hashes.contains(&route.route_hash)
    }

    pub fn as_slice(&self) -> &[Route] {
        &self.routes
    }
}

impl FromIterator<Route> for CandidateRoutes {
    fn from_iter<T: IntoIterator<Item = Route>>(iter: T) -> Self {
        let mut candidates = CandidateRoutes::new();
        for route in iter {
            candidates.insert(route);
        }
        candidates
    }
}

/// Non-fatal conditions found while collecting candidates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateWarning {
    /// No path between source and target
    Unroutable(TransactionId),
    /// Fewer distinct routes than requested
    Shortfall { id: TransactionId, found: usize, requested: usize },
}

impl Display for CandidateWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateWarning::Unroutable(id) => write!(f, "transaction {id} has no route"),
            CandidateWarning::Shortfall { id, found, requested } => {
                write!(f, "transaction {id}: found {found} of {requested} candidate routes")
            }
        }
    }
}

/// Transaction id -> candidate routes. A missing id and an empty entry both mean unroutable.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    entries: BTreeMap<TransactionId, CandidateRoutes>,
    pub warnings: Vec<CandidateWarning>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: TransactionId, routes: CandidateRoutes) {
        self.entries.insert(id, routes);
    }

    /// Candidates of a transaction, empty slice when unroutable or unknown
    pub fn routes(&self, id: TransactionId) -> &[Route] {
        self.entries.get(&id).map(|routes| routes.as_slice()).unwrap_or(&[])
    }

    pub fn route(&self, id: TransactionId, index: usize) -> Option<&Route> {
        self.entries.get(&id)?.get(index)
    }

    pub fn is_routable(&self, id: TransactionId) -> bool {
        !self.routes(id).is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (TransactionId, &CandidateRoutes)> {
        self.entries.iter().map(|(id, routes)| (*id, routes))
    }

    /// Number of transactions with an entry
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total routes over all transactions
    pub fn total_routes(&self) -> usize {
        self.entries.values().map(|routes| routes.len()).sum()
    }

    /// Largest candidate count of any transaction
    pub fn max_candidates(&self) -> usize {
        self.entries.values().map(|routes| routes.len()).max().unwrap_or(0)
    }
}
