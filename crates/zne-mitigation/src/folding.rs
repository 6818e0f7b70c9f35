//! Noise scaling by unitary folding.
//!
//! Folding inserts identities of the form G†G into a circuit. In the
//! noiseless limit the folded circuit implements the same unitary, while on
//! hardware every inserted instruction adds noise, so the effective noise
//! grows with the instruction count.
//!
//! For a circuit U of `d` instructions and λ = 1 + 2(n + s/d):
//!
//! | Strategy | Output |
//! |----------|--------|
//! | [`FoldingStrategy::Global`] | U (U†U)ⁿ, then the first `s` instructions and their adjoints in reverse |
//! | [`FoldingStrategy::GatesFromLeft`] | every G becomes G (G†G)ⁿ, the first `s` get one more G†G |
//! | [`FoldingStrategy::GatesFromRight`] | as above, the last `s` get the extra fold |
//!
//! Every strategy yields d(2n+1) + 2s instructions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use zne_ir::{Circuit, Instruction};

use crate::error::{MitigationError, MitigationResult};
use crate::scale::{FoldPlan, ScaleFactor};

/// Where folds are inserted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldingStrategy {
    /// Fold the circuit as a whole.
    #[default]
    Global,
    /// Fold gate by gate, partial folds from the start of the circuit.
    GatesFromLeft,
    /// Fold gate by gate, partial folds from the end of the circuit.
    GatesFromRight,
}

impl FoldingStrategy {
    /// Get the strategy name.
    pub fn name(&self) -> &'static str {
        match self {
            FoldingStrategy::Global => "global",
            FoldingStrategy::GatesFromLeft => "gates_from_left",
            FoldingStrategy::GatesFromRight => "gates_from_right",
        }
    }
}

impl fmt::Display for FoldingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FoldingStrategy {
    type Err = MitigationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "global" => Ok(FoldingStrategy::Global),
            "gates_from_left" | "left" => Ok(FoldingStrategy::GatesFromLeft),
            "gates_from_right" | "right" => Ok(FoldingStrategy::GatesFromRight),
            other => Err(MitigationError::InvalidOptions(format!(
                "unknown folding strategy '{other}'"
            ))),
        }
    }
}

/// A noise-scaled circuit variant.
#[derive(Debug, Clone)]
pub struct FoldedCircuit {
    /// The folded circuit.
    pub circuit: Circuit,
    /// Requested scale factor.
    pub scale_factor: ScaleFactor,
    /// Decomposition used for the fold.
    pub plan: FoldPlan,
}

impl FoldedCircuit {
    /// Scale factor actually realized, folded length over original length.
    ///
    /// Differs from the request when `s/d` cannot hit the fraction exactly.
    pub fn achieved_scale_factor(&self) -> f64 {
        self.plan.achieved()
    }
}

/// Fold `circuit` to the noise level `scale_factor`.
///
/// At λ = 1 the circuit is returned unchanged. For λ > 1 the circuit must be
/// non-empty and every instruction must have an adjoint.
pub fn fold(
    circuit: &Circuit,
    scale_factor: ScaleFactor,
    strategy: FoldingStrategy,
) -> MitigationResult<FoldedCircuit> {
    let depth = circuit.len();
    let plan = scale_factor.fold_plan(depth);

    if scale_factor == ScaleFactor::ONE {
        return Ok(FoldedCircuit {
            circuit: circuit.clone(),
            scale_factor,
            plan,
        });
    }
    if depth == 0 {
        return Err(MitigationError::EmptyCircuit);
    }

    let adjoints = adjoints(circuit)?;
    let instructions = circuit.instructions();
    let instructions = match strategy {
        FoldingStrategy::Global => fold_global(instructions, &adjoints, &plan),
        FoldingStrategy::GatesFromLeft => fold_local(instructions, &adjoints, &plan, |i| {
            i < plan.partial
        }),
        FoldingStrategy::GatesFromRight => fold_local(instructions, &adjoints, &plan, |i| {
            i >= depth - plan.partial
        }),
    };
    debug_assert_eq!(instructions.len(), plan.folded_len());

    debug!(
        circuit = circuit.name(),
        %strategy,
        requested = scale_factor.value(),
        achieved = plan.achieved(),
        full_folds = plan.full_folds,
        partial = plan.partial,
        "Folded circuit"
    );

    Ok(FoldedCircuit {
        circuit: circuit.derive(
            format!("{}_x{}", circuit.name(), scale_factor),
            instructions,
        ),
        scale_factor,
        plan,
    })
}

/// Adjoint of every instruction, in program order.
fn adjoints(circuit: &Circuit) -> MitigationResult<Vec<Instruction>> {
    circuit
        .iter()
        .enumerate()
        .map(|(index, inst)| {
            inst.adjoint()
                .map_err(|_| MitigationError::NonInvertibleGate {
                    index,
                    name: inst.name().to_string(),
                })
        })
        .collect()
}

fn fold_global(
    instructions: &[Instruction],
    adjoints: &[Instruction],
    plan: &FoldPlan,
) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(plan.folded_len());
    out.extend_from_slice(instructions);

    for _ in 0..plan.full_folds {
        out.extend(adjoints.iter().rev().cloned());
        out.extend_from_slice(instructions);
    }

    let s = plan.partial;
    out.extend_from_slice(&instructions[..s]);
    out.extend(adjoints[..s].iter().rev().cloned());
    out
}

fn fold_local(
    instructions: &[Instruction],
    adjoints: &[Instruction],
    plan: &FoldPlan,
    extra_fold: impl Fn(usize) -> bool,
) -> Vec<Instruction> {
    let mut out = Vec::with_capacity(plan.folded_len());
    for (i, (inst, adj)) in instructions.iter().zip(adjoints).enumerate() {
        out.push(inst.clone());
        let folds = plan.full_folds + usize::from(extra_fold(i));
        for _ in 0..folds {
            out.push(adj.clone());
            out.push(inst.clone());
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use zne_ir::{CustomGate, GateKind, QubitId, StandardGate};

    fn names(circuit: &Circuit) -> Vec<String> {
        circuit.iter().map(|i| i.name().to_string()).collect()
    }

    fn s_t_h() -> Circuit {
        let mut circuit = Circuit::new("sth", 1);
        circuit
            .s(QubitId(0))
            .unwrap()
            .t(QubitId(0))
            .unwrap()
            .h(QubitId(0))
            .unwrap();
        circuit
    }

    #[test]
    fn test_identity_at_one() {
        let circuit = s_t_h();
        let folded = fold(&circuit, ScaleFactor::ONE, FoldingStrategy::Global).unwrap();
        assert_eq!(folded.circuit, circuit);
        assert_eq!(folded.achieved_scale_factor(), 1.0);
    }

    #[test]
    fn test_global_full_fold() {
        let folded = fold(&s_t_h(), ScaleFactor::new(3.0).unwrap(), FoldingStrategy::Global)
            .unwrap();
        assert_eq!(
            names(&folded.circuit),
            vec!["s", "t", "h", "h", "tdg", "sdg", "s", "t", "h"]
        );
    }

    #[test]
    fn test_global_partial_fold() {
        // λ = 1 + 2 * (2/3) folds the first two instructions once.
        let scale = ScaleFactor::new(1.0 + 4.0 / 3.0).unwrap();
        let folded = fold(&s_t_h(), scale, FoldingStrategy::Global).unwrap();
        assert_eq!(
            names(&folded.circuit),
            vec!["s", "t", "h", "s", "t", "tdg", "sdg"]
        );
    }

    #[test]
    fn test_local_folds() {
        let scale = ScaleFactor::new(1.0 + 2.0 / 3.0).unwrap();

        let left = fold(&s_t_h(), scale, FoldingStrategy::GatesFromLeft).unwrap();
        assert_eq!(names(&left.circuit), vec!["s", "sdg", "s", "t", "h"]);

        let right = fold(&s_t_h(), scale, FoldingStrategy::GatesFromRight).unwrap();
        assert_eq!(names(&right.circuit), vec!["s", "t", "h", "h", "h"]);
    }

    #[test]
    fn test_local_full_fold() {
        let folded = fold(
            &s_t_h(),
            ScaleFactor::new(3.0).unwrap(),
            FoldingStrategy::GatesFromLeft,
        )
        .unwrap();
        assert_eq!(
            names(&folded.circuit),
            vec!["s", "sdg", "s", "t", "tdg", "t", "h", "h", "h"]
        );
    }

    #[test]
    fn test_rotation_adjoint_in_fold() {
        let mut circuit = Circuit::new("rot", 1);
        circuit.rx(0.3, QubitId(0)).unwrap();
        let folded =
            fold(&circuit, ScaleFactor::new(3.0).unwrap(), FoldingStrategy::Global).unwrap();

        let angles: Vec<f64> = folded
            .circuit
            .iter()
            .filter_map(|i| match i.as_gate().map(|g| &g.kind) {
                Some(GateKind::Standard(StandardGate::Rx(theta))) => Some(*theta),
                _ => None,
            })
            .collect();
        assert_eq!(angles, vec![0.3, -0.3, 0.3]);
    }

    #[test]
    fn test_empty_circuit() {
        let circuit = Circuit::new("empty", 1);
        assert!(fold(&circuit, ScaleFactor::ONE, FoldingStrategy::Global).is_ok());
        let err = fold(&circuit, ScaleFactor::new(3.0).unwrap(), FoldingStrategy::Global)
            .unwrap_err();
        assert!(matches!(err, MitigationError::EmptyCircuit));
    }

    #[test]
    fn test_non_invertible() {
        let mut circuit = Circuit::new("opaque", 1);
        circuit.x(QubitId(0)).unwrap();
        circuit
            .gate(CustomGate::new("mystery", 1), [QubitId(0)])
            .unwrap();

        let err = fold(&circuit, ScaleFactor::new(3.0).unwrap(), FoldingStrategy::Global)
            .unwrap_err();
        match err {
            MitigationError::NonInvertibleGate { index, name } => {
                assert_eq!(index, 1);
                assert_eq!(name, "mystery");
            }
            other => panic!("Expected NonInvertibleGate, got {other:?}"),
        }

        // Nothing to invert at λ = 1.
        assert!(fold(&circuit, ScaleFactor::ONE, FoldingStrategy::Global).is_ok());
    }

    #[test]
    fn test_reset_blocks_folding() {
        let mut circuit = Circuit::new("reset", 1);
        circuit.x(QubitId(0)).unwrap().reset(QubitId(0)).unwrap();
        let err = fold(&circuit, ScaleFactor::new(3.0).unwrap(), FoldingStrategy::GatesFromRight)
            .unwrap_err();
        assert!(matches!(err, MitigationError::NonInvertibleGate { index: 1, .. }));
    }

    #[test]
    fn test_strategy_parse() {
        assert_eq!("global".parse::<FoldingStrategy>().unwrap(), FoldingStrategy::Global);
        assert_eq!(
            "gates-from-right".parse::<FoldingStrategy>().unwrap(),
            FoldingStrategy::GatesFromRight
        );
        assert_eq!("left".parse::<FoldingStrategy>().unwrap(), FoldingStrategy::GatesFromLeft);
        assert!("random".parse::<FoldingStrategy>().is_err());
    }
}
