//! 分割与表面比较度量.
//!
//! 以两个能力 trait 取代经典的虚基类层次: 图像度量吃二值/标签体素场,
//! 表面度量吃三角网格. 各度量自身无共享可变状态, 构造时完成参数校验.

use std::error::Error;
use std::fmt;

use ndarray::ArrayView3;

use crate::surface::Surface;
use crate::Idx3d;

pub mod currents;
pub mod overlap;
pub mod surface_dist;

pub use currents::{CurrentsEvaluation, CurrentsMetric};
pub use overlap::{
    BinaryMetricBatch, CohenKappa, ConfusionCounts, DiceCoefficient, JaccardCoefficient,
    PositivePredictiveValue, Sensitivity, Specificity,
};
pub use surface_dist::{ClosestDistanceSurfaceMetric, HausdorffDistanceSurfaceMetric};

/// 度量参数或输入错误.
#[derive(Debug, Clone, PartialEq)]
pub enum MetricError {
    /// 两幅输入图像形状不一致.
    ShapeMismatch(Idx3d, Idx3d),

    /// 核宽度必须为正有限数.
    BadKernelWidth(f64),

    /// 分位数必须落在 `[0, 1]`.
    BadPercentile(f64),
}

impl fmt::Display for MetricError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ShapeMismatch(a, b) => {
                write!(f, "image shape mismatch: {a:?} vs {b:?}")
            }
            Self::BadKernelWidth(h) => write!(f, "kernel width must be positive, got {h}"),
            Self::BadPercentile(p) => write!(f, "percentile must be within [0, 1], got {p}"),
        }
    }
}

impl Error for MetricError {}

/// 体素场上的度量.
///
/// `is_input_binary` 为真的度量只认 0 / 非 0 两类, 标签值的具体大小无意义;
/// 为假的度量 (如 Kappa) 在完整标签字母表上工作.
pub trait ImageMetric {
    /// 计算度量值. 形状不一致是致命输入错误.
    fn value(
        &self,
        fixed: &ArrayView3<'_, u16>,
        moving: &ArrayView3<'_, u16>,
    ) -> Result<f64, MetricError>;

    /// 交换两输入是否不变.
    fn is_symmetric(&self) -> bool;

    /// 输入是否按二值掩膜解释.
    fn is_input_binary(&self) -> bool;
}

/// 三角网格上的度量.
pub trait SurfaceMetric {
    /// 计算度量值.
    fn value(&self, fixed: &Surface, moving: &Surface) -> Result<f64, MetricError>;

    /// 交换两输入是否不变.
    fn is_symmetric(&self) -> bool;
}

/// 形状一致性检查, 图像度量实现的公共入口.
pub(crate) fn check_same_shape(
    fixed: &ArrayView3<'_, u16>,
    moving: &ArrayView3<'_, u16>,
) -> Result<(), MetricError> {
    let a = fixed.dim();
    let b = moving.dim();
    if a != b {
        return Err(MetricError::ShapeMismatch(a, b));
    }
    Ok(())
}
