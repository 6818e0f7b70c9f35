//! Statevector simulation engine.

use num_complex::Complex64;
use rand::Rng;
use std::f64::consts::PI;

use zne_ir::{CustomGate, GateKind, Instruction, InstructionKind, Pauli, PauliString, StandardGate};

/// A statevector representing a quantum state.
///
/// Basis index bit `k` is the state of qubit `k`.
pub struct Statevector {
    /// The state amplitudes (2^n complex numbers).
    amplitudes: Vec<Complex64>,
    /// Number of qubits.
    num_qubits: usize,
}

/// Bit masks describing the action of a Pauli string on basis states.
///
/// P|i⟩ = i^(#Y) · (−1)^popcount(i & phase) · |i ^ flip⟩
#[derive(Debug, Clone, Copy)]
struct PauliMasks {
    flip: usize,
    phase: usize,
    num_y: u32,
}

impl PauliMasks {
    fn new(paulis: impl IntoIterator<Item = (usize, Pauli)>) -> Self {
        let mut masks = PauliMasks {
            flip: 0,
            phase: 0,
            num_y: 0,
        };
        for (qubit, pauli) in paulis {
            let bit = 1 << qubit;
            match pauli {
                Pauli::I => {}
                Pauli::X => masks.flip |= bit,
                Pauli::Y => {
                    masks.flip |= bit;
                    masks.phase |= bit;
                    masks.num_y += 1;
                }
                Pauli::Z => masks.phase |= bit,
            }
        }
        masks
    }

    /// Coefficient c with P|i⟩ = c |i ^ flip⟩.
    fn coefficient(&self, i: usize) -> Complex64 {
        let global = Complex64::i().powu(self.num_y % 4);
        if (i & self.phase).count_ones() % 2 == 1 {
            -global
        } else {
            global
        }
    }
}

impl Statevector {
    /// Create a new statevector initialized to |0...0⟩.
    pub fn new(num_qubits: usize) -> Self {
        let size = 1 << num_qubits;
        let mut amplitudes = vec![Complex64::new(0.0, 0.0); size];
        amplitudes[0] = Complex64::new(1.0, 0.0);
        Self {
            amplitudes,
            num_qubits,
        }
    }

    /// Apply an instruction to the statevector.
    ///
    /// Resets measure the qubit and flip it back to |0⟩, so they need a
    /// random source.
    pub fn apply<R: Rng + ?Sized>(&mut self, instruction: &Instruction, rng: &mut R) {
        let qubits: Vec<_> = instruction.qubits.iter().map(|q| q.index()).collect();
        match &instruction.kind {
            InstructionKind::Gate(gate) => match &gate.kind {
                GateKind::Standard(std_gate) => self.apply_standard_gate(std_gate, &qubits),
                GateKind::Custom(custom) => self.apply_custom_gate(custom, &qubits),
            },
            InstructionKind::Reset => self.reset(qubits[0], rng),
            InstructionKind::Barrier => {}
        }
    }

    /// Apply a standard gate.
    pub fn apply_standard_gate(&mut self, gate: &StandardGate, qubits: &[usize]) {
        match *gate {
            // Single-qubit gates
            StandardGate::I => {}
            StandardGate::X => self.apply_x(qubits[0]),
            StandardGate::Y => self.apply_y(qubits[0]),
            StandardGate::Z => self.apply_z(qubits[0]),
            StandardGate::H => self.apply_h(qubits[0]),
            StandardGate::S => self.apply_phase(qubits[0], PI / 2.0),
            StandardGate::Sdg => self.apply_phase(qubits[0], -PI / 2.0),
            StandardGate::T => self.apply_phase(qubits[0], PI / 4.0),
            StandardGate::Tdg => self.apply_phase(qubits[0], -PI / 4.0),
            StandardGate::SX => self.apply_rx(qubits[0], PI / 2.0),
            StandardGate::SXdg => self.apply_rx(qubits[0], -PI / 2.0),
            StandardGate::Rx(theta) => self.apply_rx(qubits[0], theta),
            StandardGate::Ry(theta) => self.apply_ry(qubits[0], theta),
            StandardGate::Rz(theta) => self.apply_rz(qubits[0], theta),
            StandardGate::P(theta) => self.apply_phase(qubits[0], theta),
            StandardGate::U(theta, phi, lambda) => self.apply_u(qubits[0], theta, phi, lambda),

            // Two-qubit gates
            StandardGate::CX => self.apply_cx(qubits[0], qubits[1]),
            StandardGate::CY => self.apply_cy(qubits[0], qubits[1]),
            StandardGate::CZ => self.apply_cz(qubits[0], qubits[1]),
            StandardGate::CH => self.apply_ch(qubits[0], qubits[1]),
            StandardGate::Swap => self.apply_swap(qubits[0], qubits[1]),
            StandardGate::ISwap => self.apply_iswap(qubits[0], qubits[1], 1.0),
            StandardGate::ISwapDg => self.apply_iswap(qubits[0], qubits[1], -1.0),
            StandardGate::CRx(theta) => {
                self.apply_controlled(qubits[0], qubits[1], rx_matrix(theta));
            }
            StandardGate::CRy(theta) => {
                self.apply_controlled(qubits[0], qubits[1], ry_matrix(theta));
            }
            StandardGate::CRz(theta) => self.apply_crz(qubits[0], qubits[1], theta),
            StandardGate::CP(theta) => self.apply_cp(qubits[0], qubits[1], theta),
            StandardGate::RXX(theta) => {
                self.apply_pauli_rotation(&[(qubits[0], Pauli::X), (qubits[1], Pauli::X)], theta);
            }
            StandardGate::RYY(theta) => {
                self.apply_pauli_rotation(&[(qubits[0], Pauli::Y), (qubits[1], Pauli::Y)], theta);
            }
            StandardGate::RZZ(theta) => {
                self.apply_pauli_rotation(&[(qubits[0], Pauli::Z), (qubits[1], Pauli::Z)], theta);
            }

            // Three-qubit gates
            StandardGate::CCX => self.apply_ccx(qubits[0], qubits[1], qubits[2]),
            StandardGate::CSwap => self.apply_cswap(qubits[0], qubits[1], qubits[2]),
        }
    }

    /// Apply a custom gate through its matrix.
    ///
    /// Matrix index bit `j` corresponds to `qubits[j]`. Gates without a
    /// matrix are rejected before simulation starts.
    fn apply_custom_gate(&mut self, gate: &CustomGate, qubits: &[usize]) {
        if let Some(matrix) = &gate.matrix {
            self.apply_matrix(qubits, matrix);
        }
    }

    /// Apply a dense 2^k × 2^k row-major matrix to `qubits`.
    pub fn apply_matrix(&mut self, qubits: &[usize], matrix: &[Complex64]) {
        let dim = 1usize << qubits.len();
        debug_assert_eq!(matrix.len(), dim * dim);

        let operand_mask: usize = qubits.iter().map(|q| 1 << q).sum();
        let index = |base: usize, m: usize| {
            qubits
                .iter()
                .enumerate()
                .filter(|(j, _)| (m >> j) & 1 == 1)
                .fold(base, |acc, (_, q)| acc | (1 << q))
        };

        let mut old = vec![Complex64::new(0.0, 0.0); dim];
        for base in 0..(1usize << self.num_qubits) {
            if base & operand_mask != 0 {
                continue;
            }
            for (m, slot) in old.iter_mut().enumerate() {
                *slot = self.amplitudes[index(base, m)];
            }
            for row in 0..dim {
                let value = (0..dim).map(|col| matrix[row * dim + col] * old[col]).sum();
                self.amplitudes[index(base, row)] = value;
            }
        }
    }

    // =========================================================================
    // Pauli operators
    // =========================================================================

    /// Apply a Pauli operator given as `(qubit, pauli)` pairs.
    pub fn apply_pauli(&mut self, paulis: &[(usize, Pauli)]) {
        let masks = PauliMasks::new(paulis.iter().copied());
        let mut next = vec![Complex64::new(0.0, 0.0); self.amplitudes.len()];
        for (i, amp) in self.amplitudes.iter().enumerate() {
            next[i ^ masks.flip] = masks.coefficient(i) * *amp;
        }
        self.amplitudes = next;
    }

    /// Apply exp(−iθ/2 · P) for a Pauli operator P.
    fn apply_pauli_rotation(&mut self, paulis: &[(usize, Pauli)], theta: f64) {
        let c = (theta / 2.0).cos();
        let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
        let masks = PauliMasks::new(paulis.iter().copied());

        let mut next = vec![Complex64::new(0.0, 0.0); self.amplitudes.len()];
        for (i, amp) in self.amplitudes.iter().enumerate() {
            next[i] += c * *amp;
            next[i ^ masks.flip] += neg_i_s * masks.coefficient(i) * *amp;
        }
        self.amplitudes = next;
    }

    /// Exact ⟨ψ|P|ψ⟩ for one Pauli string, ignoring its coefficient.
    pub fn expectation(&self, term: &PauliString) -> f64 {
        let masks = PauliMasks::new(term.support().map(|(q, p)| (q.index(), p)));
        self.amplitudes
            .iter()
            .enumerate()
            .map(|(i, amp)| (self.amplitudes[i ^ masks.flip].conj() * masks.coefficient(i) * *amp).re)
            .sum()
    }

    /// Probability that measuring `qubit` gives 1.
    pub fn probability_one(&self, qubit: usize) -> f64 {
        let mask = 1 << qubit;
        self.amplitudes
            .iter()
            .enumerate()
            .filter(|(i, _)| i & mask != 0)
            .map(|(_, amp)| amp.norm_sqr())
            .sum()
    }

    // =========================================================================
    // Single-qubit gate implementations
    // =========================================================================

    fn apply_x(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_y(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_z(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    fn apply_h(&mut self, qubit: usize) {
        let mask = 1 << qubit;
        let sqrt2_inv = 1.0 / 2.0_f64.sqrt();
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = sqrt2_inv * (a + b);
                self.amplitudes[j] = sqrt2_inv * (a - b);
            }
        }
    }

    fn apply_phase(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if i & mask != 0 {
                self.amplitudes[i] *= phase;
            }
        }
    }

    fn apply_1q(&mut self, qubit: usize, m: [[Complex64; 2]; 2]) {
        let mask = 1 << qubit;
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                let j = i | mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    fn apply_rx(&mut self, qubit: usize, theta: f64) {
        self.apply_1q(qubit, rx_matrix(theta));
    }

    fn apply_ry(&mut self, qubit: usize, theta: f64) {
        self.apply_1q(qubit, ry_matrix(theta));
    }

    fn apply_rz(&mut self, qubit: usize, theta: f64) {
        let mask = 1 << qubit;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            if i & mask == 0 {
                self.amplitudes[i] *= phase_0;
            } else {
                self.amplitudes[i] *= phase_1;
            }
        }
    }

    fn apply_u(&mut self, qubit: usize, theta: f64, phi: f64, lambda: f64) {
        let c = Complex64::new((theta / 2.0).cos(), 0.0);
        let s = (theta / 2.0).sin();
        self.apply_1q(
            qubit,
            [
                [c, -Complex64::from_polar(s, lambda)],
                [
                    Complex64::from_polar(s, phi),
                    Complex64::from_polar(1.0, phi + lambda) * c,
                ],
            ],
        );
    }

    // =========================================================================
    // Two-qubit gate implementations
    // =========================================================================

    fn apply_controlled(&mut self, control: usize, target: usize, m: [[Complex64; 2]; 2]) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let a = self.amplitudes[i];
                let b = self.amplitudes[j];
                self.amplitudes[i] = m[0][0] * a + m[0][1] * b;
                self.amplitudes[j] = m[1][0] * a + m[1][1] * b;
            }
        }
    }

    fn apply_cx(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cy(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let i_val = Complex64::new(0.0, 1.0);
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = -i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_cz(&mut self, control: usize, target: usize) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask != 0) {
                self.amplitudes[i] = -self.amplitudes[i];
            }
        }
    }

    fn apply_ch(&mut self, control: usize, target: usize) {
        let h = Complex64::new(1.0 / 2.0_f64.sqrt(), 0.0);
        self.apply_controlled(control, target, [[h, h], [h, -h]]);
    }

    fn apply_swap(&mut self, q1: usize, q2: usize) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        for i in 0..(1 << self.num_qubits) {
            let b1 = (i & mask1) != 0;
            let b2 = (i & mask2) != 0;
            if b1 && !b2 {
                let j = (i & !mask1) | mask2;
                self.amplitudes.swap(i, j);
            }
        }
    }

    /// iSWAP for `sign = 1`, its adjoint for `sign = -1`.
    fn apply_iswap(&mut self, q1: usize, q2: usize, sign: f64) {
        let mask1 = 1 << q1;
        let mask2 = 1 << q2;
        let i_val = Complex64::new(0.0, sign);
        for i in 0..(1 << self.num_qubits) {
            let b1 = (i & mask1) != 0;
            let b2 = (i & mask2) != 0;
            if b1 && !b2 {
                let j = (i & !mask1) | mask2;
                let tmp = self.amplitudes[i];
                self.amplitudes[i] = i_val * self.amplitudes[j];
                self.amplitudes[j] = i_val * tmp;
            }
        }
    }

    fn apply_crz(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let phase_0 = Complex64::from_polar(1.0, -theta / 2.0);
        let phase_1 = Complex64::from_polar(1.0, theta / 2.0);
        for i in 0..(1 << self.num_qubits) {
            if i & ctrl_mask != 0 {
                if i & tgt_mask == 0 {
                    self.amplitudes[i] *= phase_0;
                } else {
                    self.amplitudes[i] *= phase_1;
                }
            }
        }
    }

    fn apply_cp(&mut self, control: usize, target: usize, theta: f64) {
        let ctrl_mask = 1 << control;
        let tgt_mask = 1 << target;
        let phase = Complex64::from_polar(1.0, theta);
        for i in 0..(1 << self.num_qubits) {
            if (i & ctrl_mask != 0) && (i & tgt_mask != 0) {
                self.amplitudes[i] *= phase;
            }
        }
    }

    // =========================================================================
    // Three-qubit gate implementations
    // =========================================================================

    fn apply_ccx(&mut self, c1: usize, c2: usize, target: usize) {
        let c1_mask = 1 << c1;
        let c2_mask = 1 << c2;
        let tgt_mask = 1 << target;
        for i in 0..(1 << self.num_qubits) {
            if (i & c1_mask != 0) && (i & c2_mask != 0) && (i & tgt_mask == 0) {
                let j = i | tgt_mask;
                self.amplitudes.swap(i, j);
            }
        }
    }

    fn apply_cswap(&mut self, control: usize, t1: usize, t2: usize) {
        let ctrl_mask = 1 << control;
        let t1_mask = 1 << t1;
        let t2_mask = 1 << t2;
        for i in 0..(1 << self.num_qubits) {
            if i & ctrl_mask != 0 {
                let b1 = (i & t1_mask) != 0;
                let b2 = (i & t2_mask) != 0;
                if b1 && !b2 {
                    let j = (i & !t1_mask) | t2_mask;
                    self.amplitudes.swap(i, j);
                }
            }
        }
    }

    /// Measure `qubit`, then flip it to |0⟩ if the outcome was 1.
    fn reset<R: Rng + ?Sized>(&mut self, qubit: usize, rng: &mut R) {
        let mask = 1 << qubit;
        let p_one = self.probability_one(qubit);
        let outcome_one = rng.r#gen::<f64>() < p_one;
        let norm = if outcome_one { p_one } else { 1.0 - p_one }.sqrt();
        if norm == 0.0 {
            return;
        }

        for i in 0..(1 << self.num_qubits) {
            if ((i & mask) != 0) != outcome_one {
                self.amplitudes[i] = Complex64::new(0.0, 0.0);
            } else {
                self.amplitudes[i] /= norm;
            }
        }
        if outcome_one {
            self.apply_x(qubit);
        }
    }
}

fn rx_matrix(theta: f64) -> [[Complex64; 2]; 2] {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let neg_i_s = Complex64::new(0.0, -(theta / 2.0).sin());
    [[c, neg_i_s], [neg_i_s, c]]
}

fn ry_matrix(theta: f64) -> [[Complex64; 2]; 2] {
    let c = Complex64::new((theta / 2.0).cos(), 0.0);
    let s = Complex64::new((theta / 2.0).sin(), 0.0);
    [[c, -s], [s, c]]
}
