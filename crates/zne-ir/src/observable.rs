//! Pauli observables measured at the end of a circuit.
//!
//! Labels are read left to right: the first character acts on qubit 0.
//! Weighted sums are written as `"0.5*ZZ + 0.5*XX"` or `"ZI - IZ"`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{IrError, IrResult};
use crate::qubit::QubitId;

/// A single-qubit Pauli operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pauli {
    /// Identity.
    I,
    /// Pauli-X.
    X,
    /// Pauli-Y.
    Y,
    /// Pauli-Z.
    Z,
}

impl Pauli {
    fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(Pauli::I),
            'X' => Some(Pauli::X),
            'Y' => Some(Pauli::Y),
            'Z' => Some(Pauli::Z),
            _ => None,
        }
    }

    fn as_char(self) -> char {
        match self {
            Pauli::I => 'I',
            Pauli::X => 'X',
            Pauli::Y => 'Y',
            Pauli::Z => 'Z',
        }
    }
}

/// A weighted tensor product of Pauli operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PauliString {
    /// Real coefficient of the term.
    pub coeff: f64,
    /// One operator per qubit; index `k` acts on qubit `k`.
    pub paulis: Vec<Pauli>,
}

impl PauliString {
    /// Create a weighted Pauli string.
    pub fn new(coeff: f64, paulis: Vec<Pauli>) -> Self {
        Self { coeff, paulis }
    }

    /// Parse an unweighted label such as `"ZIX"`.
    pub fn from_label(label: &str) -> IrResult<Self> {
        let paulis = label
            .chars()
            .map(|c| {
                Pauli::from_char(c).ok_or_else(|| {
                    IrError::InvalidObservable(format!("unknown Pauli '{c}' in '{label}'"))
                })
            })
            .collect::<IrResult<Vec<_>>>()?;

        if paulis.is_empty() {
            return Err(IrError::InvalidObservable("empty Pauli label".into()));
        }
        Ok(Self::new(1.0, paulis))
    }

    /// Number of qubits the string spans.
    pub fn num_qubits(&self) -> usize {
        self.paulis.len()
    }

    /// Qubits carrying a non-identity operator, with that operator.
    pub fn support(&self) -> impl Iterator<Item = (QubitId, Pauli)> + '_ {
        self.paulis
            .iter()
            .enumerate()
            .filter(|(_, p)| **p != Pauli::I)
            .map(|(q, p)| (QubitId(q as u32), *p))
    }

    /// Number of non-identity operators.
    pub fn weight(&self) -> usize {
        self.support().count()
    }

    /// Label without the coefficient.
    pub fn label(&self) -> String {
        self.paulis.iter().map(|p| p.as_char()).collect()
    }
}

/// A Hermitian observable as a real-weighted sum of Pauli strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawObservable")]
pub struct Observable {
    terms: Vec<PauliString>,
}

/// Unchecked wire form, validated through [`Observable::new`].
#[derive(Deserialize)]
struct RawObservable {
    terms: Vec<PauliString>,
}

impl TryFrom<RawObservable> for Observable {
    type Error = IrError;

    fn try_from(raw: RawObservable) -> Result<Self, Self::Error> {
        Observable::new(raw.terms)
    }
}

impl Observable {
    /// Build an observable from terms of equal width.
    pub fn new(terms: Vec<PauliString>) -> IrResult<Self> {
        let Some(first) = terms.first() else {
            return Err(IrError::InvalidObservable("observable has no terms".into()));
        };
        let width = first.num_qubits();
        if let Some(bad) = terms.iter().find(|t| t.num_qubits() != width) {
            return Err(IrError::InvalidObservable(format!(
                "term '{}' spans {} qubits, expected {width}",
                bad.label(),
                bad.num_qubits()
            )));
        }
        if let Some(bad) = terms.iter().find(|t| !t.coeff.is_finite()) {
            return Err(IrError::InvalidObservable(format!(
                "term '{}' has non-finite coefficient",
                bad.label()
            )));
        }
        Ok(Self { terms })
    }

    /// Z on `qubit` of an `num_qubits`-wide register.
    pub fn z(num_qubits: usize, qubit: QubitId) -> IrResult<Self> {
        if qubit.index() >= num_qubits {
            return Err(IrError::QubitNotFound {
                qubit,
                num_qubits: num_qubits as u32,
                gate_name: None,
            });
        }
        let mut paulis = vec![Pauli::I; num_qubits];
        paulis[qubit.index()] = Pauli::Z;
        Self::new(vec![PauliString::new(1.0, paulis)])
    }

    /// The terms of the sum.
    pub fn terms(&self) -> &[PauliString] {
        &self.terms
    }

    /// Width of the observable.
    pub fn num_qubits(&self) -> usize {
        self.terms[0].num_qubits()
    }

    /// Check that the observable can be measured on a circuit of `num_qubits`.
    pub fn check_width(&self, num_qubits: usize) -> IrResult<()> {
        if self.num_qubits() != num_qubits {
            return Err(IrError::InvalidObservable(format!(
                "observable spans {} qubits but circuit has {num_qubits}",
                self.num_qubits()
            )));
        }
        Ok(())
    }

    /// Largest possible |⟨O⟩|, the sum of absolute coefficients.
    pub fn norm_bound(&self) -> f64 {
        self.terms.iter().map(|t| t.coeff.abs()).sum()
    }
}

fn parse_term(term: &str) -> IrResult<PauliString> {
    let (sign, body) = match term.as_bytes().first() {
        Some(b'-') => (-1.0, &term[1..]),
        Some(b'+') => (1.0, &term[1..]),
        _ => (1.0, term),
    };

    let (coeff, label) = match body.split_once('*') {
        Some((c, l)) => {
            let coeff: f64 = c
                .parse()
                .map_err(|_| IrError::InvalidObservable(format!("bad coefficient '{c}'")))?;
            (coeff, l)
        }
        None => (1.0, body),
    };

    let mut string = PauliString::from_label(label)?;
    string.coeff = sign * coeff;
    Ok(string)
}

/// Split a compact expression at top-level `+`/`-` signs, keeping the sign
/// with the following term. Signs inside exponents (`1e-3`) or right after
/// `*` do not split.
fn split_terms(expr: &str) -> Vec<&str> {
    let bytes = expr.as_bytes();
    let mut terms = vec![];
    let mut start = 0;
    for i in 1..bytes.len() {
        let is_sign = bytes[i] == b'+' || bytes[i] == b'-';
        let prev = bytes[i - 1];
        if is_sign && !matches!(prev, b'e' | b'E' | b'*' | b'+' | b'-') {
            terms.push(&expr[start..i]);
            start = i;
        }
    }
    terms.push(&expr[start..]);
    terms
}

impl FromStr for Observable {
    type Err = IrError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(IrError::InvalidObservable("empty observable".into()));
        }
        let terms = split_terms(&compact)
            .into_iter()
            .map(parse_term)
            .collect::<IrResult<Vec<_>>>()?;
        Observable::new(terms)
    }
}

impl fmt::Display for Observable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, term) in self.terms.iter().enumerate() {
            let magnitude = term.coeff.abs();
            match (i, term.coeff < 0.0) {
                (0, true) => write!(f, "-")?,
                (0, false) => {}
                (_, true) => write!(f, " - ")?,
                (_, false) => write!(f, " + ")?,
            }
            if (magnitude - 1.0).abs() > f64::EPSILON {
                write!(f, "{magnitude}*")?;
            }
            write!(f, "{}", term.label())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_label() {
        let obs: Observable = "Z".parse().unwrap();
        assert_eq!(obs.num_qubits(), 1);
        assert_eq!(obs.terms()[0].coeff, 1.0);
        assert_eq!(obs.terms()[0].paulis, vec![Pauli::Z]);
    }

    #[test]
    fn test_weighted_sum() {
        let obs: Observable = "0.5*ZZ + 0.5 * XX - 1e-3*IY".parse().unwrap();
        assert_eq!(obs.terms().len(), 3);
        assert_eq!(obs.terms()[1].label(), "XX");
        assert!((obs.terms()[2].coeff + 1e-3).abs() < 1e-15);
        assert!((obs.norm_bound() - 1.001).abs() < 1e-12);
    }

    #[test]
    fn test_support_and_weight() {
        let term = PauliString::from_label("ZIX").unwrap();
        let support: Vec<_> = term.support().collect();
        assert_eq!(support, vec![(QubitId(0), Pauli::Z), (QubitId(2), Pauli::X)]);
        assert_eq!(term.weight(), 2);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!("".parse::<Observable>().is_err());
        assert!("ZQ".parse::<Observable>().is_err());
        assert!("ZZ + X".parse::<Observable>().is_err());
        assert!("abc*Z".parse::<Observable>().is_err());
    }

    #[test]
    fn test_z_on_qubit() {
        let obs = Observable::z(3, QubitId(1)).unwrap();
        assert_eq!(obs.terms()[0].label(), "IZI");
        assert!(obs.check_width(3).is_ok());
        assert!(obs.check_width(2).is_err());
        assert!(Observable::z(2, QubitId(2)).is_err());
    }

    #[test]
    fn test_deserialize_validates_terms() {
        let obs: Observable = "0.5*ZZ + XI".parse().unwrap();
        let json = serde_json::to_string(&obs).unwrap();
        assert_eq!(serde_json::from_str::<Observable>(&json).unwrap(), obs);

        assert!(serde_json::from_str::<Observable>(r#"{"terms": []}"#).is_err());
        let ragged = r#"{"terms": [
            {"coeff": 1.0, "paulis": ["Z"]},
            {"coeff": 1.0, "paulis": ["Z", "Z"]}
        ]}"#;
        assert!(serde_json::from_str::<Observable>(ragged).is_err());
    }

    #[test]
    fn test_display() {
        let obs: Observable = "-ZI + 0.25*XX".parse().unwrap();
        assert_eq!(obs.to_string(), "-ZI + 0.25*XX");
    }
}
