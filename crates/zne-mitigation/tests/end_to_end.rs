//! Zero-noise extrapolation against the local noisy simulator.

use std::sync::Arc;

use zne_adapter_sim::{NoiseModel, NoisySimulator};
use zne_hal::ExecutionOptions;
use zne_ir::{Circuit, Observable, QubitId};
use zne_mitigation::{
    CancellationToken, FitModel, FoldingStrategy, ScaleFactor, ZneOptions, extrapolate,
};

fn noisy() -> Arc<NoisySimulator> {
    Arc::new(NoisySimulator::with_noise(NoiseModel::depolarizing(0.02, 0.02)).unwrap())
}

fn options(model: FitModel) -> ZneOptions {
    ZneOptions::new()
        .with_scale_factors(ScaleFactor::odd(3))
        .with_model(model)
        .with_execution(ExecutionOptions::new().with_shots(4000).with_seed(7))
}

#[tokio::test]
async fn test_mitigation_beats_raw_value() {
    let circuit = Circuit::x_chain(10).unwrap();
    let observable = Observable::z(1, QubitId(0)).unwrap();

    for model in [FitModel::Linear, FitModel::Exponential] {
        let result = extrapolate(
            noisy(),
            &circuit,
            &observable,
            &options(model),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let raw = result.unmitigated_value.unwrap();
        assert!(raw < 0.85, "raw = {raw}");
        assert!(
            (result.ideal_value - 1.0).abs() < (raw - 1.0).abs(),
            "{model}: mitigated {} is not closer to 1.0 than raw {raw}",
            result.ideal_value
        );
    }
}

#[tokio::test]
async fn test_noise_grows_with_scale_factor() {
    let circuit = Circuit::x_chain(10).unwrap();
    let observable = Observable::z(1, QubitId(0)).unwrap();

    let result = extrapolate(
        noisy(),
        &circuit,
        &observable,
        &options(FitModel::Linear),
        &CancellationToken::new(),
    )
    .await
    .unwrap();

    let values = result.dataset.values();
    assert_eq!(values.len(), 3);
    assert!(values[0] > values[1] && values[1] > values[2], "{values:?}");
}

#[tokio::test]
async fn test_ideal_simulator_is_unchanged_by_folding() {
    let circuit = Circuit::bell().unwrap();
    let observable: Observable = "ZZ + 0.5*XX".parse().unwrap();

    for folding in [
        FoldingStrategy::Global,
        FoldingStrategy::GatesFromLeft,
        FoldingStrategy::GatesFromRight,
    ] {
        let opts = ZneOptions::new()
            .with_scale_factors(ScaleFactor::linspace(3.0, 5).unwrap())
            .with_folding(folding)
            .with_model(FitModel::Richardson);
        let result = extrapolate(
            Arc::new(NoisySimulator::ideal()),
            &circuit,
            &observable,
            &opts,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        for sample in result.dataset.samples() {
            assert!((sample.value - 1.5).abs() < 1e-12, "{folding}: {sample:?}");
        }
        assert!((result.ideal_value - 1.5).abs() < 1e-9);
    }
}
