//! Builds the train and test sequences from a configuration.
//!
//! The train sequence is assembled by walking [`TRAIN_STAGES`] in order.
//! Every stage reads its own flags and appends zero or more primitives, so
//! the order of the table is the order of the sequence and no
//! configuration can reorder it:
//!
//! | # | stage          | appends                                                 |
//! |---|----------------|---------------------------------------------------------|
//! | 1 | random_crop    | random-crop (profile size, configured padding)          |
//! | 2 | horizontal_flip| horizontal-flip (p = 0.5)                               |
//! | 3 | random_erasing | random-erasing                                          |
//! | 4 | cutout         | cutout, or else dual-cutout                             |
//! | 5 | legacy         | to-image, grayscale, image-to-tensor, tensor-normalize  |
//! | 6 | normalize      | normalize (always)                                      |
//! | 7 | tubify         | tubify                                                  |
//! | 8 | to_tensor      | to-tensor (always)                                      |
//!
//! The legacy stage only fires for profiles with `legacy_normalization`.
//! Its tensor-normalize is followed by the regular normalize, so those
//! profiles are normalized twice on the train path.

use super::primitive::Primitive;
use super::sequence::TransformSequence;
use crate::config::PipelineConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::profile::DatasetProfile;
use crate::transforms::vision::{
    Cutout, DualCutout, Grayscale, ImageToTensor, Normalize, RandomCrop, RandomErasing,
    RandomHorizontalFlip, TensorNormalize, ToImage, ToTensor, Tubify,
};

const FLIP_PROBABILITY: f64 = 0.5;

type Stage = fn(&PipelineBuilder) -> PipelineResult<Vec<Primitive>>;

const TRAIN_STAGES: &[(&str, Stage)] = &[
    ("random_crop", PipelineBuilder::random_crop),
    ("horizontal_flip", PipelineBuilder::horizontal_flip),
    ("random_erasing", PipelineBuilder::random_erasing),
    ("cutout", PipelineBuilder::cutout),
    ("legacy", PipelineBuilder::legacy_train),
    ("normalize", PipelineBuilder::normalize),
    ("tubify", PipelineBuilder::tubify),
    ("to_tensor", PipelineBuilder::to_tensor),
];

fn require<T: Copy>(value: Option<T>, key: &str, flag: &str) -> PipelineResult<T> {
    value.ok_or_else(|| PipelineError::invalid(format!("{} is required when {} is set", key, flag)))
}

/// Turns a [`PipelineConfig`] and its resolved [`DatasetProfile`] into
/// transform sequences.
///
/// ```ignore
/// let profile = config.validate()?;
/// let builder = PipelineBuilder::new(&config, &profile);
/// let train = builder.build_train()?;
/// let test = builder.build_test()?;
/// ```
#[derive(Debug, Clone)]
pub struct PipelineBuilder {
    config: PipelineConfig,
    profile: DatasetProfile,
}

impl PipelineBuilder {
    pub fn new(config: &PipelineConfig, profile: &DatasetProfile) -> Self {
        Self {
            config: config.clone(),
            profile: profile.clone(),
        }
    }

    pub fn profile(&self) -> &DatasetProfile {
        &self.profile
    }

    pub fn build_train(&self) -> PipelineResult<TransformSequence> {
        let mut primitives = Vec::new();
        for (stage, build) in TRAIN_STAGES {
            let appended = build(self)?;
            if !appended.is_empty() {
                tracing::trace!(stage, count = appended.len(), "train stage appended primitives");
            }
            primitives.extend(appended);
        }

        let sequence = TransformSequence::new(primitives);
        tracing::debug!(
            dataset = %self.profile.id,
            primitives = ?sequence.names(),
            deterministic = sequence.is_deterministic(),
            "built train sequence"
        );
        Ok(sequence)
    }

    /// The evaluation sequence: normalize (and optionally tubify), then
    /// to-tensor.
    ///
    /// For legacy profiles a grayscale sequence is assembled first and then
    /// replaced by the regular one, so the returned sequence is the same
    /// for every profile with the same flags.
    pub fn build_test(&self) -> PipelineResult<TransformSequence> {
        let legacy = if self.profile.legacy_normalization {
            Some(TransformSequence::new(vec![
                Primitive::Grayscale(Grayscale),
                Primitive::ImageToTensor(ImageToTensor),
                Primitive::TensorNormalize(self.tensor_normalize()?),
            ]))
        } else {
            None
        };

        let mut primitives = self.normalize()?;
        primitives.extend(self.tubify()?);
        primitives.extend(self.to_tensor()?);
        let sequence = TransformSequence::new(primitives);

        if let Some(replaced) = legacy {
            tracing::debug!(
                dataset = %self.profile.id,
                replaced = ?replaced.names(),
                "legacy test sequence superseded"
            );
        }
        tracing::debug!(
            dataset = %self.profile.id,
            primitives = ?sequence.names(),
            deterministic = sequence.is_deterministic(),
            "built test sequence"
        );
        Ok(sequence)
    }

    fn random_crop(&self) -> PipelineResult<Vec<Primitive>> {
        if !self.config.use_random_crop {
            return Ok(vec![]);
        }
        let padding = require(
            self.config.random_crop_padding,
            "random_crop_padding",
            "use_random_crop",
        )?;
        Ok(vec![Primitive::RandomCrop(RandomCrop::new(
            self.profile.size,
            padding,
        )?)])
    }

    fn horizontal_flip(&self) -> PipelineResult<Vec<Primitive>> {
        if !self.config.use_horizontal_flip {
            return Ok(vec![]);
        }
        Ok(vec![Primitive::HorizontalFlip(RandomHorizontalFlip::new(
            FLIP_PROBABILITY,
        )?)])
    }

    fn random_erasing(&self) -> PipelineResult<Vec<Primitive>> {
        let cfg = &self.config;
        if !cfg.use_random_erasing {
            return Ok(vec![]);
        }
        const FLAG: &str = "use_random_erasing";
        let erasing = RandomErasing::new(
            require(cfg.random_erasing_prob, "random_erasing_prob", FLAG)?,
            require(
                cfg.random_erasing_area_ratio_range,
                "random_erasing_area_ratio_range",
                FLAG,
            )?,
            require(
                cfg.random_erasing_min_aspect_ratio,
                "random_erasing_min_aspect_ratio",
                FLAG,
            )?,
            require(
                cfg.random_erasing_max_attempt,
                "random_erasing_max_attempt",
                FLAG,
            )?,
        )?;
        Ok(vec![Primitive::RandomErasing(erasing)])
    }

    /// Cutout takes precedence when both cutout flags are set.
    fn cutout(&self) -> PipelineResult<Vec<Primitive>> {
        let cfg = &self.config;
        let flag = match (cfg.use_cutout, cfg.use_dual_cutout) {
            (true, _) => "use_cutout",
            (false, true) => "use_dual_cutout",
            (false, false) => return Ok(vec![]),
        };
        let size = require(cfg.cutout_size, "cutout_size", flag)?;
        let prob = require(cfg.cutout_prob, "cutout_prob", flag)?;
        let inside = require(cfg.cutout_inside, "cutout_inside", flag)?;

        Ok(vec![if cfg.use_cutout {
            Primitive::Cutout(Cutout::new(size, prob, inside)?)
        } else {
            Primitive::DualCutout(DualCutout::new(size, prob, inside)?)
        }])
    }

    fn legacy_train(&self) -> PipelineResult<Vec<Primitive>> {
        if !self.profile.legacy_normalization {
            return Ok(vec![]);
        }
        Ok(vec![
            Primitive::ToImage(ToImage),
            Primitive::Grayscale(Grayscale),
            Primitive::ImageToTensor(ImageToTensor),
            Primitive::TensorNormalize(self.tensor_normalize()?),
        ])
    }

    fn normalize(&self) -> PipelineResult<Vec<Primitive>> {
        Ok(vec![Primitive::Normalize(Normalize::new(
            &self.profile.mean,
            &self.profile.std,
        )?)])
    }

    fn tubify(&self) -> PipelineResult<Vec<Primitive>> {
        if !self.config.tubify {
            return Ok(vec![]);
        }
        Ok(vec![Primitive::Tubify(Tubify::new(self.config.tubify_depth)?)])
    }

    fn to_tensor(&self) -> PipelineResult<Vec<Primitive>> {
        Ok(vec![Primitive::ToTensor(ToTensor)])
    }

    fn tensor_normalize(&self) -> PipelineResult<TensorNormalize> {
        TensorNormalize::new(&self.profile.mean, &self.profile.std)
    }
}
