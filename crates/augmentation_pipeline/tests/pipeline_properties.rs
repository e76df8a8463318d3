//! Properties of the built transform sequences.
//!
//! Tests cover:
//! - Sequence order for the CIFAR10 end-to-end configuration
//! - Cutout / dual-cutout precedence
//! - Dense-tensor conversion as the last step of every sequence
//! - Depth expansion shape and weights
//! - Worker seed derivation and crop draws
//! - Normalization round trip
//! - Unsupported datasets and invalid configurations

mod common;
use common::constant_rgb_items;

use augmentation_pipeline::{
    build_transforms,
    dataloader::{init_worker_rng, worker_seed},
    pipeline::{ComposedTransform, PrimitiveKind},
    profile::DatasetId,
    transforms::{
        vision::{RandomCrop, Tubify},
        Frame, Transform,
    },
    PipelineConfig, PipelineError,
};

use anyhow::Result;
use tch::{Kind, Tensor};

fn cifar_end_to_end_config() -> Result<PipelineConfig> {
    Ok(PipelineConfig::from_json_str(
        r#"{
            "dataset": "CIFAR10",
            "use_random_crop": true,
            "random_crop_padding": 4,
            "use_horizontal_flip": true,
            "use_random_erasing": false,
            "use_cutout": false,
            "use_dual_cutout": false,
            "tubify": false,
            "batch_size": 4,
            "num_workers": 0,
            "use_gpu": false
        }"#,
    )?)
}

fn cutout_family(kinds: &[PrimitiveKind]) -> Vec<PrimitiveKind> {
    kinds
        .iter()
        .copied()
        .filter(|k| matches!(k, PrimitiveKind::Cutout | PrimitiveKind::DualCutout))
        .collect()
}

// ================================================================================================
// 1. Sequence construction
// ================================================================================================
#[test]
fn test_cifar10_end_to_end_sequences() -> Result<()> {
    let config = cifar_end_to_end_config()?;
    let (profile, train, test) = build_transforms(&config)?;

    assert_eq!(profile.id, DatasetId::Cifar10);
    assert_eq!(
        train.names(),
        vec!["random-crop", "horizontal-flip", "normalize", "to-tensor"]
    );
    assert_eq!(test.names(), vec!["normalize", "to-tensor"]);

    let image = constant_rgb_items(1, [10, 200, 30]).remove(0).image;
    let output = train.apply_image(image)?.into_tensor()?;
    assert_eq!(output.size(), vec![3, 32, 32]);
    assert_eq!(output.kind(), Kind::Float);
    Ok(())
}

#[test]
fn test_cutout_takes_precedence_over_dual_cutout() -> Result<()> {
    for dataset in ["CIFAR10", "CIFAR100", "MNIST", "FashionMNIST", "KMNIST", "K49"] {
        for inside in [false, true] {
            let config = PipelineConfig::new(dataset)
                .with_cutout(8, 0.5, inside)
                .with_dual_cutout(8, 0.5, inside);
            let (_, train, test) = build_transforms(&config)?;

            assert_eq!(
                cutout_family(&train.kinds()),
                vec![PrimitiveKind::Cutout],
                "{} should use single-output cutout",
                dataset
            );
            assert!(cutout_family(&test.kinds()).is_empty());
        }
    }
    Ok(())
}

#[test]
fn test_dual_cutout_alone_yields_two_views() -> Result<()> {
    let config = PipelineConfig::new("CIFAR10").with_dual_cutout(8, 1.0, false);
    let (_, train, _) = build_transforms(&config)?;
    assert_eq!(cutout_family(&train.kinds()), vec![PrimitiveKind::DualCutout]);

    let composed = ComposedTransform::new(train);
    let sample = composed.apply(constant_rgb_items(1, [128, 128, 128]).remove(0))?;
    assert_eq!(sample.image()?.size(), vec![3, 32, 32]);
    assert_eq!(sample.get("image_dual")?.size(), vec![3, 32, 32]);
    Ok(())
}

#[test]
fn test_last_step_is_to_tensor_for_every_flag_combination() -> Result<()> {
    for dataset in ["CIFAR10", "MNIST", "K49"] {
        for mask in 0u32..32 {
            let bit = |i: u32| mask & (1 << i) != 0;
            let mut config = PipelineConfig::new(dataset);
            if bit(0) {
                config = config.with_random_crop(4);
            }
            if bit(1) {
                config = config.with_horizontal_flip();
            }
            if bit(2) {
                config = config.with_random_erasing(0.5, [0.02, 0.4], 0.3, 3);
            }
            if bit(3) {
                config = config.with_cutout(8, 0.5, false);
            }
            if bit(4) {
                config = config.with_tubify(4);
            }

            let (_, train, test) = build_transforms(&config)?;
            assert_eq!(train.kinds().last(), Some(&PrimitiveKind::ToTensor));
            assert_eq!(test.kinds().last(), Some(&PrimitiveKind::ToTensor));
        }
    }
    Ok(())
}

#[test]
fn test_k49_legacy_sequences() -> Result<()> {
    let (_, train, test) = build_transforms(&PipelineConfig::new("K49"))?;
    assert_eq!(
        train.names(),
        vec![
            "to-image",
            "grayscale",
            "image-to-tensor",
            "tensor-normalize",
            "normalize",
            "to-tensor"
        ]
    );
    assert_eq!(test.names(), vec!["normalize", "to-tensor"]);
    Ok(())
}

// ================================================================================================
// 2. Depth expansion
// ================================================================================================
#[test]
fn test_tubify_shape_and_peak_weight() -> Result<()> {
    for depth in 1..=9usize {
        let tubify = Tubify::new(depth)?;

        for input in [
            Tensor::ones([5, 7], (Kind::Float, tch::Device::Cpu)),
            Tensor::ones([1, 5, 7], (Kind::Float, tch::Device::Cpu)),
        ] {
            let output = tubify.apply(Frame::Array(input))?.into_tensor()?;
            assert_eq!(output.size(), vec![depth as i64, 1, 5, 7]);
        }

        let weights = tubify.weights();
        let peak = weights[depth / 2];
        assert!(weights.iter().all(|w| *w <= peak + 1e-12));
        assert!((peak - 1.0).abs() < 1e-12);
    }
    Ok(())
}

#[test]
fn test_tubify_in_mnist_train_sequence() -> Result<()> {
    let config = PipelineConfig::new("MNIST").with_tubify(6);
    let (_, train, test) = build_transforms(&config)?;
    assert_eq!(train.names(), vec!["normalize", "tubify", "to-tensor"]);
    assert_eq!(test.names(), vec!["normalize", "tubify", "to-tensor"]);

    let image = image::DynamicImage::new_luma8(28, 28);
    let output = train.apply_image(image)?.into_tensor()?;
    assert_eq!(output.size(), vec![6, 1, 28, 28]);
    Ok(())
}

// ================================================================================================
// 3. Worker seeding
// ================================================================================================
#[test]
fn test_worker_seeds_differ_by_ordinal() {
    for base in [0u64, 42, u64::MAX - 3] {
        for i in 0..4usize {
            for j in 0..4usize {
                let (si, sj) = (worker_seed(base, i), worker_seed(base, j));
                assert_eq!(si.wrapping_sub(sj), (i as u64).wrapping_sub(j as u64));
            }
        }
    }
}

#[test]
fn test_crop_draws_differ_across_workers() -> Result<()> {
    let crop = RandomCrop::new(32, 4)?;
    let base = 1234;

    let draws: Vec<(u32, u32)> = (0..8)
        .map(|worker| {
            init_worker_rng(worker_seed(base, worker));
            crop.draw_offset(32, 32)
        })
        .collect::<Result<_, _>>()?;

    let first = draws[0];
    assert!(
        draws.iter().skip(1).any(|d| *d != first),
        "all workers drew the same crop: {:?}",
        draws
    );

    // Same seed, same draw
    init_worker_rng(worker_seed(base, 0));
    assert_eq!(crop.draw_offset(32, 32)?, first);
    Ok(())
}

// ================================================================================================
// 4. Normalization round trip
// ================================================================================================
#[test]
fn test_test_sequence_round_trip_restores_mean_image() -> Result<()> {
    for dataset in ["CIFAR10", "CIFAR100", "MNIST", "FashionMNIST", "KMNIST"] {
        let config = PipelineConfig::new(dataset);
        let (profile, _, test) = build_transforms(&config)?;
        let channels = profile.channels() as i64;
        let size = profile.size as i64;

        let mean = Tensor::from_slice(&profile.mean).view([channels, 1, 1]);
        let std = Tensor::from_slice(&profile.std).view([channels, 1, 1]);
        let original = mean.expand([channels, size, size], false).contiguous();

        let output = test.apply(Frame::Array(&original * 255.0))?.into_tensor()?;
        assert!(output.abs().max().double_value(&[]) < 1e-5);

        let restored = &output * &std + &mean;
        assert!(
            restored.allclose(&original, 1e-5, 1e-6, false),
            "{} round trip failed",
            dataset
        );
    }
    Ok(())
}

// ================================================================================================
// 5. Errors
// ================================================================================================
#[test]
fn test_unknown_dataset_is_unsupported() {
    let config = PipelineConfig::new("FOO").with_cutout(8, 0.5, false);
    match build_transforms(&config) {
        Err(PipelineError::UnsupportedDataset { name }) => assert_eq!(name, "FOO"),
        other => panic!("expected UnsupportedDataset, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_enabled_flag_without_sub_parameters_is_invalid() {
    let mut config = PipelineConfig::new("CIFAR10");
    config.use_random_erasing = true;
    config.random_erasing_prob = Some(0.5);

    assert!(matches!(
        build_transforms(&config),
        Err(PipelineError::InvalidConfiguration(_))
    ));
}

#[test]
fn test_malformed_input_is_a_runtime_error() -> Result<()> {
    let (_, _, test) = build_transforms(&PipelineConfig::new("CIFAR10"))?;
    let err = test
        .apply(Frame::Array(Tensor::zeros([1, 32, 32], (Kind::Float, tch::Device::Cpu))))
        .err()
        .and_then(|e| e.downcast_ref::<PipelineError>().cloned());

    assert!(matches!(
        err,
        Some(PipelineError::TransformRuntime { primitive: "normalize", .. })
    ));
    Ok(())
}
