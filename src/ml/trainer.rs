// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Custom train + validation loop using Burn's DataLoader and
// Adam. The inner loop is generic over SequenceModel, so the
// same code trains both architectures; run_training owns the
// closed-set dispatch.
//
// Per batch: forward → cross-entropy over every position
// ([PAD] masked) → backward → Adam step. The loss scalar is
// checked before the backward pass; a non-finite value aborts
// the whole run — divergence is a configuration problem, not
// something to retry.
//
// The caller's stop flag is polled between batches only; there
// is no mid-batch cancellation. The loop takes the model by
// value and hands it back — exactly one owner mutates a
// parameter set at a time.
//
// Reference: Burn Book §5, Kingma & Ba (2015) Adam

use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    nn::loss::CrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::SequenceBatcher, dataset::SequenceDataset, vocab};
use crate::domain::errors::CoreError;
use crate::infra::checkpoint::CheckpointManager;
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::model::{
    ArchitectureKind, AttentionModel, AttentionModelConfig, RecurrentModel, RecurrentModelConfig,
    SequenceModel,
};

pub type TrainBackend = burn::backend::Autodiff<burn::backend::NdArray>;
pub type ValidBackend = burn::backend::NdArray;

/// Build the configured architecture and run the training loop.
/// The application layer calls this and never touches a tensor.
pub fn run_training(
    cfg:           &TrainConfig,
    train_dataset: SequenceDataset,
    val_dataset:   SequenceDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    stop:          &AtomicBool,
) -> Result<()> {
    let device = <TrainBackend as Backend>::Device::default();

    match cfg.architecture {
        ArchitectureKind::Attention => {
            let model_cfg = AttentionModelConfig::new(
                cfg.vocab_size, cfg.context_window, cfg.d_model,
                cfg.num_heads, cfg.num_layers, cfg.d_ff, cfg.dropout,
            );
            let model: AttentionModel<TrainBackend> = model_cfg.init(&device);
            tracing::info!(
                "Attention model ready: {} layers, d_model={}",
                cfg.num_layers, cfg.d_model
            );
            train_loop(cfg, model, train_dataset, val_dataset, ckpt_manager, metrics, stop, device)?;
        }
        ArchitectureKind::Recurrent => {
            let model_cfg = RecurrentModelConfig::new(
                cfg.vocab_size, cfg.context_window, cfg.d_model,
                cfg.hidden_size, cfg.dropout,
            );
            let model: RecurrentModel<TrainBackend> = model_cfg.init(&device);
            tracing::info!("Recurrent model ready: hidden_size={}", cfg.hidden_size);
            train_loop(cfg, model, train_dataset, val_dataset, ckpt_manager, metrics, stop, device)?;
        }
    }
    Ok(())
}

/// The architecture-agnostic loop. Returns the trained model.
///
/// Zero epochs is a legitimate no-op: the model comes back
/// exactly as initialized, with no checkpoint written.
#[allow(clippy::too_many_arguments)]
fn train_loop<M>(
    cfg:           &TrainConfig,
    mut model:     M,
    train_dataset: SequenceDataset,
    val_dataset:   SequenceDataset,
    ckpt_manager:  &CheckpointManager,
    metrics:       &MetricsLogger,
    stop:          &AtomicBool,
    device:        <TrainBackend as Backend>::Device,
) -> Result<M>
where
    M: SequenceModel<TrainBackend> + AutodiffModule<TrainBackend>,
    M::InnerModule: SequenceModel<ValidBackend>,
{
    // ── Adam optimiser ────────────────────────────────────────────────────────
    // m = β1*m + (1-β1)*g        (mean)
    // v = β2*v + (1-β2)*g²       (variance)
    // θ = θ - lr * m / (√v + ε)  (update)
    let optim_cfg = AdamConfig::new().with_epsilon(1e-8);
    let mut optim = optim_cfg.init();

    // ── Training data loader (AutodiffBackend) ────────────────────────────────
    let train_batcher = SequenceBatcher::<TrainBackend>::new(device.clone());
    let train_loader  = DataLoaderBuilder::new(train_batcher)
        .batch_size(cfg.batch_size)
        .shuffle(42)
        .num_workers(1)
        .build(train_dataset);

    // ── Validation data loader (InnerBackend — no autodiff overhead) ──────────
    let val_batcher = SequenceBatcher::<ValidBackend>::new(device.clone());
    let val_loader  = DataLoaderBuilder::new(val_batcher)
        .batch_size(cfg.batch_size)
        .num_workers(1)
        .build(val_dataset);

    // Last finite loss, carried into the divergence error for diagnostics
    let mut last_loss = f64::NAN;

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {

        // ── Training phase ────────────────────────────────────────────────────
        let mut train_loss_sum = 0.0f64;
        let mut train_batches  = 0usize;

        for batch in train_loader.iter() {
            // Stop signals are honoured between batches only
            if stop.load(Ordering::Relaxed) {
                tracing::info!("Stop signal received — ending training in epoch {}", epoch);
                ckpt_manager.save_model(&model, epoch)?;
                return Ok(model);
            }

            let logits = model.forward(batch.inputs);
            let loss   = next_token_loss(logits, batch.targets);

            let loss_val: f64 = loss.clone().into_scalar().elem::<f64>();
            check_finite(loss_val, last_loss)?;
            last_loss = loss_val;

            train_loss_sum += loss_val;
            train_batches  += 1;

            // Backward pass + Adam update
            let grads = loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);
        }

        let avg_train_loss = if train_batches > 0 {
            train_loss_sum / train_batches as f64
        } else { f64::NAN };

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() drops autodiff; the loss path has no
        // dropout, so evaluation is deterministic
        let model_valid = model.valid();

        let mut val_loss_sum = 0.0f64;
        let mut val_batches  = 0usize;
        let mut correct      = 0i64;
        let mut total        = 0i64;

        for batch in val_loader.iter() {
            let logits = model_valid.forward(batch.inputs);
            let [b, s, v] = logits.dims();
            let logits  = logits.reshape([b * s, v]);
            let targets = batch.targets.reshape([b * s]);

            let ce = CrossEntropyLossConfig::new()
                .with_pad_tokens(Some(vec![vocab::PAD as usize]))
                .init(&logits.device());
            let batch_loss: f64 = ce
                .forward(logits.clone(), targets.clone())
                .into_scalar().elem::<f64>();
            val_loss_sum += batch_loss;
            val_batches  += 1;

            // argmax(1) returns shape [n, 1] — flatten to [n]
            // before comparing with the flat targets
            let pred = logits.argmax(1).flatten::<1>(0, 1);

            // [PAD] positions carry no information — mask them
            // out of the accuracy as well as the loss
            let non_pad = targets.clone().equal_elem(vocab::PAD as i32).bool_not();

            correct += (pred.equal(targets).int() * non_pad.clone().int())
                .sum().into_scalar().elem::<i64>();
            total += non_pad.int().sum().into_scalar().elem::<i64>();
        }

        let avg_val_loss = if val_batches > 0 { val_loss_sum / val_batches as f64 } else { f64::NAN };
        let accuracy     = if total > 0 { correct as f64 / total as f64 } else { 0.0 };

        println!(
            "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | next_token_acc={:.1}%",
            epoch, cfg.epochs, avg_train_loss, avg_val_loss, accuracy * 100.0,
        );
        metrics.log(&EpochMetrics::new(epoch, avg_train_loss, avg_val_loss, accuracy))?;

        // ── Checkpoint cadence ────────────────────────────────────────────────
        // Every `checkpoint_every` epochs, and always on the last
        if epoch % cfg.checkpoint_every.max(1) == 0 || epoch == cfg.epochs {
            ckpt_manager.save_model(&model, epoch)?;
            tracing::info!("Checkpoint saved for epoch {}", epoch);
        }
    }

    tracing::info!("Training complete");
    Ok(model)
}

/// Cross-entropy of next-token predictions over every position,
/// with [PAD] targets masked out.
fn next_token_loss<B: Backend>(logits: Tensor<B, 3>, targets: Tensor<B, 2, Int>) -> Tensor<B, 1> {
    let [b, s, v] = logits.dims();
    let logits  = logits.reshape([b * s, v]);
    let targets = targets.reshape([b * s]);

    CrossEntropyLossConfig::new()
        .with_pad_tokens(Some(vec![vocab::PAD as usize]))
        .init(&logits.device())
        .forward(logits, targets)
}

/// A non-finite loss is fatal. The last finite value rides
/// along so the operator can see where the run fell over.
fn check_finite(loss: f64, last_finite: f64) -> Result<(), CoreError> {
    if loss.is_finite() {
        Ok(())
    } else {
        Err(CoreError::TrainingDiverged { last_loss: last_finite })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::SequenceSample;
    use crate::ml::model::AttentionModel;
    use std::fs;
    use std::path::PathBuf;

    fn tiny_config(dir: &PathBuf, epochs: usize) -> TrainConfig {
        TrainConfig {
            midi_dir:         String::new(),
            checkpoint_dir:   dir.to_string_lossy().into_owned(),
            architecture:     ArchitectureKind::Attention,
            ticks_per_step:   120,
            context_window:   4,
            stride:           2,
            batch_size:       2,
            epochs,
            checkpoint_every: 1,
            lr:               1e-3,
            d_model:          8,
            num_heads:        2,
            num_layers:       1,
            d_ff:             16,
            hidden_size:      16,
            dropout:          0.0,
            vocab_size:       10,
        }
    }

    fn tiny_dataset() -> SequenceDataset {
        // Four windows of length context_window + 1 over vocab 10
        let samples = vec![
            SequenceSample::new(vec![2, 4, 5, 6, 7]),
            SequenceSample::new(vec![4, 5, 6, 7, 3]),
            SequenceSample::new(vec![2, 5, 4, 6, 7]),
            SequenceSample::new(vec![5, 4, 6, 7, 3]),
        ];
        SequenceDataset::new(samples)
    }

    fn tiny_model(device: &<TrainBackend as Backend>::Device) -> AttentionModel<TrainBackend> {
        AttentionModelConfig::new(10, 4, 8, 2, 1, 16, 0.0).init(device)
    }

    fn test_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cadenza-trainer-{tag}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn probe_logits<M: SequenceModel<TrainBackend>>(
        model: &M,
        device: &<TrainBackend as Backend>::Device,
    ) -> burn::tensor::TensorData {
        let tokens = Tensor::<TrainBackend, 1, Int>::from_ints([2, 4, 5, 6].as_slice(), device)
            .unsqueeze::<2>();
        model.forward(tokens).into_data()
    }

    #[test]
    fn test_zero_epochs_leaves_parameters_unchanged() {
        let dir = test_dir("zero");
        let cfg = tiny_config(&dir, 0);
        let device = Default::default();

        let model = tiny_model(&device);
        let before = probe_logits(&model, &device);

        let metrics = MetricsLogger::new(dir.to_string_lossy().into_owned()).unwrap();
        let ckpt = CheckpointManager::new(dir.to_string_lossy().into_owned());
        let stop = AtomicBool::new(false);

        let model = train_loop(
            &cfg, model, tiny_dataset(), tiny_dataset(), &ckpt, &metrics, &stop, device.clone(),
        )
        .unwrap();

        assert_eq!(probe_logits(&model, &device), before);
        assert!(!dir.join("latest_epoch.json").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_one_epoch_trains_and_checkpoints() {
        let dir = test_dir("one");
        let cfg = tiny_config(&dir, 1);
        let device = Default::default();

        let model = tiny_model(&device);
        let before = probe_logits(&model, &device);

        let metrics = MetricsLogger::new(dir.to_string_lossy().into_owned()).unwrap();
        let ckpt = CheckpointManager::new(dir.to_string_lossy().into_owned());
        let stop = AtomicBool::new(false);

        let model = train_loop(
            &cfg, model, tiny_dataset(), tiny_dataset(), &ckpt, &metrics, &stop, device.clone(),
        )
        .unwrap();

        // An optimizer step must have changed the weights
        assert_ne!(probe_logits(&model, &device), before);
        assert!(dir.join("latest_epoch.json").exists());
        assert!(dir.join("metrics.csv").exists());
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_pre_set_stop_flag_halts_before_any_step() {
        let dir = test_dir("stop");
        let cfg = tiny_config(&dir, 5);
        let device = Default::default();

        let model = tiny_model(&device);
        let before = probe_logits(&model, &device);

        let metrics = MetricsLogger::new(dir.to_string_lossy().into_owned()).unwrap();
        let ckpt = CheckpointManager::new(dir.to_string_lossy().into_owned());
        let stop = AtomicBool::new(true);

        let model = train_loop(
            &cfg, model, tiny_dataset(), tiny_dataset(), &ckpt, &metrics, &stop, device.clone(),
        )
        .unwrap();

        assert_eq!(probe_logits(&model, &device), before);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_non_finite_loss_is_fatal_with_last_loss() {
        assert!(check_finite(1.5, f64::NAN).is_ok());
        let err = check_finite(f64::NAN, 2.25).unwrap_err();
        match err {
            CoreError::TrainingDiverged { last_loss } => assert_eq!(last_loss, 2.25),
            other => panic!("unexpected error: {other}"),
        }
        assert!(check_finite(f64::INFINITY, 0.0).is_err());
    }
}
