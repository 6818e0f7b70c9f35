//! Property-based tests for unitary folding.

use proptest::prelude::*;
use zne_ir::{Circuit, QubitId};
use zne_mitigation::{FoldingStrategy, ScaleFactor, fold};

#[derive(Debug, Clone)]
enum GateOp {
    H(u32),
    X(u32),
    S(u32),
    T(u32),
    Rz(f64, u32),
    CX(u32, u32),
}

impl GateOp {
    fn apply(self, circuit: &mut Circuit) {
        let _ = match self {
            GateOp::H(q) => circuit.h(QubitId(q)),
            GateOp::X(q) => circuit.x(QubitId(q)),
            GateOp::S(q) => circuit.s(QubitId(q)),
            GateOp::T(q) => circuit.t(QubitId(q)),
            GateOp::Rz(theta, q) => circuit.rz(theta, QubitId(q)),
            GateOp::CX(c, t) => circuit.cx(QubitId(c), QubitId(t)),
        };
    }
}

fn arb_gate_op(num_qubits: u32) -> impl Strategy<Value = GateOp> {
    let single = prop_oneof![
        (0..num_qubits).prop_map(GateOp::H),
        (0..num_qubits).prop_map(GateOp::X),
        (0..num_qubits).prop_map(GateOp::S),
        (0..num_qubits).prop_map(GateOp::T),
        (-3.0_f64..3.0, 0..num_qubits).prop_map(|(theta, q)| GateOp::Rz(theta, q)),
    ];
    if num_qubits < 2 {
        single.boxed()
    } else {
        prop_oneof![
            4 => single,
            1 => (0..num_qubits, 1..num_qubits)
                .prop_map(move |(c, offset)| GateOp::CX(c, (c + offset) % num_qubits)),
        ]
        .boxed()
    }
}

/// Circuits with 1-4 qubits and 1-20 invertible gates.
fn arb_circuit() -> impl Strategy<Value = Circuit> {
    (1_u32..=4).prop_flat_map(|num_qubits| {
        prop::collection::vec(arb_gate_op(num_qubits), 1..=20).prop_map(move |ops| {
            let mut circuit = Circuit::new("prop", num_qubits);
            for op in ops {
                op.apply(&mut circuit);
            }
            circuit
        })
    })
}

fn arb_strategy() -> impl Strategy<Value = FoldingStrategy> {
    prop_oneof![
        Just(FoldingStrategy::Global),
        Just(FoldingStrategy::GatesFromLeft),
        Just(FoldingStrategy::GatesFromRight),
    ]
}

proptest! {
    #[test]
    fn unit_scale_is_identity(circuit in arb_circuit(), strategy in arb_strategy()) {
        let folded = fold(&circuit, ScaleFactor::ONE, strategy).unwrap();
        prop_assert_eq!(folded.circuit, circuit);
    }

    #[test]
    fn odd_scale_multiplies_length(
        circuit in arb_circuit(),
        n in 0usize..5,
        strategy in arb_strategy(),
    ) {
        let scale = ScaleFactor::new(1.0 + 2.0 * n as f64).unwrap();
        let folded = fold(&circuit, scale, strategy).unwrap();
        prop_assert_eq!(folded.circuit.len(), circuit.len() * (2 * n + 1));
        prop_assert_eq!(folded.achieved_scale_factor(), scale.value());
    }

    #[test]
    fn any_scale_matches_plan(
        circuit in arb_circuit(),
        lambda in 1.0_f64..9.0,
        strategy in arb_strategy(),
    ) {
        let scale = ScaleFactor::new(lambda).unwrap();
        let folded = fold(&circuit, scale, strategy).unwrap();
        let plan = scale.fold_plan(circuit.len());

        prop_assert_eq!(folded.circuit.len(), plan.folded_len());
        prop_assert!(plan.partial <= circuit.len());
        // Rounding s moves the achieved factor by at most one instruction pair.
        prop_assert!((folded.achieved_scale_factor() - lambda).abs() <= 1.0 / circuit.len() as f64 + 1e-9);
    }

    #[test]
    fn folding_is_deterministic(
        circuit in arb_circuit(),
        lambda in 1.0_f64..7.0,
        strategy in arb_strategy(),
    ) {
        let scale = ScaleFactor::new(lambda).unwrap();
        let a = fold(&circuit, scale, strategy).unwrap();
        let b = fold(&circuit, scale, strategy).unwrap();
        prop_assert_eq!(a.circuit.instructions(), b.circuit.instructions());
    }

    #[test]
    fn global_fold_starts_with_original(circuit in arb_circuit(), lambda in 1.0_f64..7.0) {
        let scale = ScaleFactor::new(lambda).unwrap();
        let folded = fold(&circuit, scale, FoldingStrategy::Global).unwrap();
        let d = circuit.len();
        prop_assert_eq!(&folded.circuit.instructions()[..d], circuit.instructions());

        // Every full fold is U† followed by U.
        let adjoint = circuit.adjoint().unwrap();
        let plan = scale.fold_plan(d);
        for k in 0..plan.full_folds {
            let start = d * (1 + 2 * k);
            prop_assert_eq!(&folded.circuit.instructions()[start..start + d], adjoint.instructions());
            prop_assert_eq!(&folded.circuit.instructions()[start + d..start + 2 * d], circuit.instructions());
        }
    }

    #[test]
    fn adjoint_is_an_involution(circuit in arb_circuit()) {
        let twice = circuit.adjoint().unwrap().adjoint().unwrap();
        prop_assert_eq!(twice.instructions(), circuit.instructions());
    }
}
