use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Identity of a binary decision variable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VarId(pub usize);

impl Display for VarId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Sorted, duplicate-free variable product. The empty monomial is the constant term.
type Monomial = Vec<VarId>;

/// One `coefficient * Π vars` term, the wire form of a [`BinaryPoly`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolyTerm {
    pub vars: Vec<VarId>,
    pub coefficient: f64,
}

/// Sparse polynomial over binary variables.
///
/// `x * x = x` holds, so every monomial is a set of variables. Terms are kept in a
/// `BTreeMap`, which makes construction order-independent and equality exact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<PolyTerm>", into = "Vec<PolyTerm>")]
pub struct BinaryPoly {
    terms: BTreeMap<Monomial, f64>,
}

impl BinaryPoly {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        let mut poly = Self::zero();
        poly.add_term(Vec::new(), value);
        poly
    }

    pub fn variable(var: VarId) -> Self {
        let mut poly = Self::zero();
        poly.add_term(vec![var], 1.0);
        poly
    }

    /// Add `coefficient * Π vars`. Repeated variables collapse.
    pub fn add_term(&mut self, mut vars: Vec<VarId>, coefficient: f64) {
        if coefficient == 0.0 {
            return;
        }
        vars.sort_unstable();
        vars.dedup();
        let entry = self.terms.entry(vars).or_insert(0.0);
        *entry += coefficient;
        if *entry == 0.0 {
            self.terms.retain(|_, c| *c != 0.0);
        }
    }

    pub fn is_zero(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn num_terms(&self) -> usize {
        self.terms.len()
    }

    /// Highest monomial size, 0 for constants
    pub fn degree(&self) -> usize {
        self.terms.keys().map(|vars| vars.len()).max().unwrap_or(0)
    }

    pub fn constant_term(&self) -> f64 {
        self.terms.get(&Vec::new()).copied().unwrap_or(0.0)
    }

    /// Coefficient of the monomial over `vars`
    pub fn coefficient(&self, vars: &[VarId]) -> f64 {
        let mut key = vars.to_vec();
        key.sort_unstable();
        key.dedup();
        self.terms.get(&key).copied().unwrap_or(0.0)
    }

    /// All variables that appear in some term
    pub fn variables(&self) -> BTreeSet<VarId> {
        self.terms.keys().flatten().copied().collect()
    }

    pub fn terms(&self) -> impl Iterator<Item = (&[VarId], f64)> {
        self.terms.iter().map(|(vars, c)| (vars.as_slice(), *c))
    }

    pub fn scale(&self, factor: f64) -> Self {
        if factor == 0.0 {
            return Self::zero();
        }
        Self { terms: self.terms.iter().map(|(vars, c)| (vars.clone(), c * factor)).collect() }
    }

    pub fn square(&self) -> Self {
        self * self
    }

    /// Value under a variable assignment
    pub fn evaluate<F: Fn(VarId) -> f64>(&self, value: F) -> f64 {
        self.terms.iter().map(|(vars, c)| c * vars.iter().map(|var| value(*var)).product::<f64>()).sum()
    }
}

impl From<Vec<PolyTerm>> for BinaryPoly {
    fn from(terms: Vec<PolyTerm>) -> Self {
        let mut poly = BinaryPoly::zero();
        for term in terms {
            poly.add_term(term.vars, term.coefficient);
        }
        poly
    }
}

impl From<BinaryPoly> for Vec<PolyTerm> {
    fn from(poly: BinaryPoly) -> Self {
        poly.terms.into_iter().map(|(vars, coefficient)| PolyTerm { vars, coefficient }).collect()
    }
}

impl From<VarId> for BinaryPoly {
    fn from(var: VarId) -> Self {
        BinaryPoly::variable(var)
    }
}

impl AddAssign<&BinaryPoly> for BinaryPoly {
    fn add_assign(&mut self, rhs: &BinaryPoly) {
        for (vars, c) in &rhs.terms {
            self.add_term(vars.clone(), *c);
        }
    }
}

impl AddAssign<BinaryPoly> for BinaryPoly {
    fn add_assign(&mut self, rhs: BinaryPoly) {
        *self += &rhs;
    }
}

impl AddAssign<f64> for BinaryPoly {
    fn add_assign(&mut self, rhs: f64) {
        self.add_term(Vec::new(), rhs);
    }
}

impl Add<&BinaryPoly> for &BinaryPoly {
    type Output = BinaryPoly;

    fn add(self, rhs: &BinaryPoly) -> BinaryPoly {
        let mut sum = self.clone();
        sum += rhs;
        sum
    }
}

impl Add for BinaryPoly {
    type Output = BinaryPoly;

    fn add(mut self, rhs: BinaryPoly) -> BinaryPoly {
        self += &rhs;
        self
    }
}

impl Sub<f64> for BinaryPoly {
    type Output = BinaryPoly;

    fn sub(mut self, rhs: f64) -> BinaryPoly {
        self += -rhs;
        self
    }
}

impl Neg for &BinaryPoly {
    type Output = BinaryPoly;

    fn neg(self) -> BinaryPoly {
        self.scale(-1.0)
    }
}

impl Mul<f64> for &BinaryPoly {
    type Output = BinaryPoly;

    fn mul(self, rhs: f64) -> BinaryPoly {
        self.scale(rhs)
    }
}

impl Mul<&BinaryPoly> for &BinaryPoly {
    type Output = BinaryPoly;

    fn mul(self, rhs: &BinaryPoly) -> BinaryPoly {
        let mut product = BinaryPoly::zero();
        for (left_vars, left_c) in &self.terms {
            for (right_vars, right_c) in &rhs.terms {
                let mut vars = left_vars.clone();
                vars.extend_from_slice(right_vars);
                product.add_term(vars, left_c * right_c);
            }
        }
        product
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const X: VarId = VarId(0);
    const Y: VarId = VarId(1);

    #[test]
    fn test_idempotent_square() {
        let x = BinaryPoly::variable(X);
        assert_eq!(x.square(), x);
    }

    #[test]
    fn test_square_of_linear_sum() {
        // (x + y - 1)^2 = x + y + 2xy - 2x - 2y + 1 = 2xy - x - y + 1
        let sum = BinaryPoly::variable(X) + BinaryPoly::variable(Y) - 1.0;
        let squared = sum.square();

        assert_eq!(squared.coefficient(&[X, Y]), 2.0);
        assert_eq!(squared.coefficient(&[X]), -1.0);
        assert_eq!(squared.coefficient(&[Y]), -1.0);
        assert_eq!(squared.constant_term(), 1.0);
        assert_eq!(squared.degree(), 2);
        assert_eq!(squared.num_terms(), 4);
    }

    #[test]
    fn test_evaluate() {
        let poly = &BinaryPoly::variable(X).scale(3.0) + &BinaryPoly::constant(2.0);
        let xy = &BinaryPoly::variable(X) * &BinaryPoly::variable(Y);

        assert_eq!(poly.evaluate(|_| 1.0), 5.0);
        assert_eq!(poly.evaluate(|_| 0.0), 2.0);
        assert_eq!(xy.evaluate(|var| if var == X { 1.0 } else { 0.0 }), 0.0);
        assert_eq!(xy.evaluate(|_| 1.0), 1.0);
    }

    #[test]
    fn test_cancellation_removes_terms() {
        let mut poly = BinaryPoly::variable(X);
        poly += -&BinaryPoly::variable(X);
        assert!(poly.is_zero());
        assert!(BinaryPoly::variable(Y).scale(0.0).is_zero());
    }

    #[test]
    fn test_construction_order_does_not_matter() {
        let a = BinaryPoly::variable(X) + BinaryPoly::variable(Y);
        let b = BinaryPoly::variable(Y) + BinaryPoly::variable(X);
        assert_eq!(a, b);
        assert_eq!(a.variables().into_iter().collect::<Vec<_>>(), vec![X, Y]);
    }

    #[test]
    fn test_serialize_poly() -> eyre::Result<()> {
        let poly = (BinaryPoly::variable(X) + BinaryPoly::variable(Y) - 1.0).square();

        let serialized = serde_json::to_string(&poly)?;
        let deserialized: BinaryPoly = serde_json::from_str(&serialized)?;

        assert_eq!(poly, deserialized);
        Ok(())
    }
}
