//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx3d, Offset3d};

pub use crate::consts::{is_background, is_foreground, BACKGROUND};

pub use crate::volume::{DistanceMapSet, LabelVolume, NiftiHeaderAttr, StructuringElement};

pub use crate::metrics::{
    BinaryMetricBatch, ClosestDistanceSurfaceMetric, CohenKappa, CurrentsEvaluation,
    CurrentsMetric, DiceCoefficient, HausdorffDistanceSurfaceMetric, ImageMetric,
    JaccardCoefficient, MetricError, PositivePredictiveValue, Sensitivity, Specificity,
    SurfaceMetric,
};

pub use crate::perturb::{LabelPerturbationEngine, PerturbConfig};

pub use crate::surface::{read_surface, write_surface, Surface, SurfaceError, SurfaceIoError};
