//! Circuit instructions combining gates with operands.

use serde::{Deserialize, Serialize};

use crate::error::{IrError, IrResult};
use crate::gate::{Gate, StandardGate};
use crate::qubit::QubitId;

/// The kind of instruction in a circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InstructionKind {
    /// A quantum gate operation.
    Gate(Gate),
    /// Barrier (synchronization point).
    Barrier,
    /// Reset qubit to |0⟩.
    Reset,
}

/// A complete instruction with operands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instruction {
    /// The kind of instruction.
    pub kind: InstructionKind,
    /// Qubits this instruction operates on.
    pub qubits: Vec<QubitId>,
}

impl Instruction {
    /// Create a gate instruction.
    pub fn gate(gate: impl Into<Gate>, qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Gate(gate.into()),
            qubits: qubits.into_iter().collect(),
        }
    }

    /// Create a single-qubit gate instruction.
    pub fn single_qubit_gate(gate: StandardGate, qubit: QubitId) -> Self {
        Self::gate(gate, [qubit])
    }

    /// Create a two-qubit gate instruction.
    pub fn two_qubit_gate(gate: StandardGate, q1: QubitId, q2: QubitId) -> Self {
        Self::gate(gate, [q1, q2])
    }

    /// Create a reset instruction.
    pub fn reset(qubit: QubitId) -> Self {
        Self {
            kind: InstructionKind::Reset,
            qubits: vec![qubit],
        }
    }

    /// Create a barrier instruction.
    pub fn barrier(qubits: impl IntoIterator<Item = QubitId>) -> Self {
        Self {
            kind: InstructionKind::Barrier,
            qubits: qubits.into_iter().collect(),
        }
    }

    /// Check if this is a gate instruction.
    pub fn is_gate(&self) -> bool {
        matches!(self.kind, InstructionKind::Gate(_))
    }

    /// Check if this is a barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self.kind, InstructionKind::Barrier)
    }

    /// Check if this is a reset.
    pub fn is_reset(&self) -> bool {
        matches!(self.kind, InstructionKind::Reset)
    }

    /// Get the gate if this is a gate instruction.
    pub fn as_gate(&self) -> Option<&Gate> {
        match &self.kind {
            InstructionKind::Gate(g) => Some(g),
            _ => None,
        }
    }

    /// Get the name of the instruction.
    pub fn name(&self) -> &str {
        match &self.kind {
            InstructionKind::Gate(g) => g.name(),
            InstructionKind::Barrier => "barrier",
            InstructionKind::Reset => "reset",
        }
    }

    /// Compute the inverse of this instruction.
    ///
    /// Gates are replaced by their adjoint on the same operands. Barriers are
    /// markers and invert to themselves. Resets are not unitary.
    pub fn adjoint(&self) -> IrResult<Instruction> {
        match &self.kind {
            InstructionKind::Gate(gate) => Ok(Instruction {
                kind: InstructionKind::Gate(gate.adjoint()?),
                qubits: self.qubits.clone(),
            }),
            InstructionKind::Barrier => Ok(self.clone()),
            InstructionKind::Reset => Err(IrError::NonUnitaryOperation("reset".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gate::GateKind;

    #[test]
    fn test_gate_instruction() {
        let inst = Instruction::single_qubit_gate(StandardGate::H, QubitId(0));
        assert!(inst.is_gate());
        assert_eq!(inst.qubits.len(), 1);
        assert_eq!(inst.name(), "h");
    }

    #[test]
    fn test_barrier_instruction() {
        let inst = Instruction::barrier([QubitId(0), QubitId(1), QubitId(2)]);
        assert!(inst.is_barrier());
        assert_eq!(inst.qubits.len(), 3);
        assert_eq!(inst.adjoint().unwrap(), inst);
    }

    #[test]
    fn test_inverse_instruction_keeps_operands() {
        let inst = Instruction::two_qubit_gate(StandardGate::CRz(0.5), QubitId(1), QubitId(0));
        let inv = inst.adjoint().unwrap();

        assert_eq!(inv.qubits, vec![QubitId(1), QubitId(0)]);
        match inv.as_gate().map(|g| &g.kind) {
            Some(GateKind::Standard(StandardGate::CRz(theta))) => assert_eq!(*theta, -0.5),
            other => panic!("Expected CRz gate, got {other:?}"),
        }
    }

    #[test]
    fn test_reset_is_not_invertible() {
        let err = Instruction::reset(QubitId(0)).adjoint().unwrap_err();
        assert!(matches!(err, IrError::NonUnitaryOperation(_)));
    }
}
