//! 重叠类图像度量: Dice / Jaccard / 灵敏度 / 特异度 / PPV / Cohen Kappa.
//!
//! 二值度量先汇总混淆矩阵再算比值; 全空输入给出各自的最优值,
//! 视为退化但良定义的结果而非错误.

use std::collections::BTreeMap;

use ndarray::{ArrayView3, Zip};

use super::{check_same_shape, ImageMetric, MetricError};
use crate::consts::BACKGROUND;
use crate::volume::LabelVolume;

/// 二值混淆矩阵. 非 0 体素视为前景.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionCounts {
    /// 两者皆前景.
    pub true_pos: u64,
    /// 两者皆背景.
    pub true_neg: u64,
    /// 仅 moving 前景.
    pub false_pos: u64,
    /// 仅 fixed 前景.
    pub false_neg: u64,
}

impl ConfusionCounts {
    /// 逐体素汇总混淆矩阵.
    pub fn tally(
        fixed: &ArrayView3<'_, u16>,
        moving: &ArrayView3<'_, u16>,
    ) -> Result<Self, MetricError> {
        check_same_shape(fixed, moving)?;
        let mut counts = Self::default();
        Zip::from(fixed).and(moving).for_each(|&f, &m| {
            match (f != BACKGROUND, m != BACKGROUND) {
                (true, true) => counts.true_pos += 1,
                (false, false) => counts.true_neg += 1,
                (false, true) => counts.false_pos += 1,
                (true, false) => counts.false_neg += 1,
            }
        });
        Ok(counts)
    }
}

/// `2|A∩B| / (|A|+|B|)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiceCoefficient;

/// `|A∩B| / |A∪B|`.
#[derive(Debug, Clone, Copy, Default)]
pub struct JaccardCoefficient;

/// `TP / (TP+FN)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sensitivity;

/// `TN / (TN+FP)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Specificity;

/// `TP / (TP+FP)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositivePredictiveValue;

/// 分子为 0 且分母为 0 时返回 1.0 (全空输入的最优值).
fn ratio(num: u64, den: u64) -> f64 {
    if den == 0 {
        1.0
    } else {
        num as f64 / den as f64
    }
}

macro_rules! impl_confusion_metric {
    ($ty:ty, $symmetric:expr, |$c:ident| $expr:expr) => {
        impl ImageMetric for $ty {
            fn value(
                &self,
                fixed: &ArrayView3<'_, u16>,
                moving: &ArrayView3<'_, u16>,
            ) -> Result<f64, MetricError> {
                let $c = ConfusionCounts::tally(fixed, moving)?;
                Ok($expr)
            }

            fn is_symmetric(&self) -> bool {
                $symmetric
            }

            fn is_input_binary(&self) -> bool {
                true
            }
        }
    };
}

impl_confusion_metric!(DiceCoefficient, true, |c| ratio(
    2 * c.true_pos,
    2 * c.true_pos + c.false_pos + c.false_neg
));
impl_confusion_metric!(JaccardCoefficient, true, |c| ratio(
    c.true_pos,
    c.true_pos + c.false_pos + c.false_neg
));
impl_confusion_metric!(Sensitivity, false, |c| ratio(
    c.true_pos,
    c.true_pos + c.false_neg
));
impl_confusion_metric!(Specificity, false, |c| ratio(
    c.true_neg,
    c.true_neg + c.false_pos
));
impl_confusion_metric!(PositivePredictiveValue, false, |c| ratio(
    c.true_pos,
    c.true_pos + c.false_pos
));

/// Cohen Kappa, 在两幅图像出现过的完整标签字母表上计算.
#[derive(Debug, Clone, Copy, Default)]
pub struct CohenKappa;

impl ImageMetric for CohenKappa {
    fn value(
        &self,
        fixed: &ArrayView3<'_, u16>,
        moving: &ArrayView3<'_, u16>,
    ) -> Result<f64, MetricError> {
        check_same_shape(fixed, moving)?;

        // 联合分布与两侧边缘分布, 标签稀疏所以用 map 而非定长表.
        let mut joint: BTreeMap<(u16, u16), u64> = BTreeMap::new();
        let mut fixed_marginal: BTreeMap<u16, u64> = BTreeMap::new();
        let mut moving_marginal: BTreeMap<u16, u64> = BTreeMap::new();
        let mut total = 0u64;

        Zip::from(fixed).and(moving).for_each(|&f, &m| {
            *joint.entry((f, m)).or_insert(0) += 1;
            *fixed_marginal.entry(f).or_insert(0) += 1;
            *moving_marginal.entry(m).or_insert(0) += 1;
            total += 1;
        });

        if total == 0 {
            return Ok(1.0);
        }
        let total = total as f64;

        let observed: u64 = joint
            .iter()
            .filter(|((f, m), _)| f == m)
            .map(|(_, &n)| n)
            .sum();
        let po = observed as f64 / total;

        let pe: f64 = fixed_marginal
            .iter()
            .map(|(label, &nf)| {
                let nm = moving_marginal.get(label).copied().unwrap_or(0);
                (nf as f64 / total) * (nm as f64 / total)
            })
            .sum();

        if (1.0 - pe).abs() < f64::EPSILON {
            // 偶然一致率为 1 只在两侧各自恒定时出现, 此时一致即完美.
            return Ok(if po >= 1.0 { 1.0 } else { 0.0 });
        }
        Ok((po - pe) / (1.0 - pe))
    }

    fn is_symmetric(&self) -> bool {
        true
    }

    fn is_input_binary(&self) -> bool {
        false
    }
}

/// 逐标签二值化后批量评估同一个二值度量.
///
/// 标签范围取两幅图像最大标签的较大者, 从 1 开始; 某标签只在一侧出现时
/// 另一侧按全空掩膜参与.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryMetricBatch;

impl BinaryMetricBatch {
    /// 对 `1..=max_label` 的每个标签计算 `(标签, 度量值)`.
    pub fn evaluate<M: ImageMetric>(
        metric: &M,
        fixed: &LabelVolume,
        moving: &LabelVolume,
    ) -> Result<Vec<(u16, f64)>, MetricError> {
        check_same_shape(&fixed.data(), &moving.data())?;

        let max_label = fixed.max_label().max(moving.max_label());
        let mut out = Vec::with_capacity(usize::from(max_label));
        for label in 1..=max_label {
            let fixed_bin = fixed.data().mapv(|v| u16::from(v == label));
            let moving_bin = moving.data().mapv(|v| u16::from(v == label));
            let value = metric.value(&fixed_bin.view(), &moving_bin.view())?;
            out.push((label, value));
        }
        Ok(out)
    }
}
