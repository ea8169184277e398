//! 形态学 label 扰动引擎.
//!
//! 对多 label 3D 标注施加 `N` 轮随机扰动, 每轮随机挑选一个仍然存在的
//! label, 用随机稀疏化的球形结构元对其区域做膨胀或腐蚀.
//! 不变量: 每轮结束后所有体素仍有定义的 label, 且 label 值不超出
//! 初始体数据的 `[0, max_label]` 范围.
//!
//! 轮与轮之间严格串行: 第 `i+1` 轮读取第 `i` 轮留下的状态,
//! 不可并行化. 随机源由调用方注入, 固定种子即可复现整个扰动序列.

use std::error::Error;
use std::fmt;

use log::{debug, info};
use rand::Rng;

use crate::volume::morph::{self, StructuringElement};
use crate::volume::{DistanceMapSet, LabelVolume};

/// 扰动引擎的配置错误. 两个参数都在任何计算开始前校验.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PerturbConfigError {
    /// 迭代轮数必须不小于 1.
    TooFewIterations(usize),

    /// 结构元半径必须不小于 1.
    RadiusTooSmall(usize),
}

impl fmt::Display for PerturbConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewIterations(n) => {
                write!(f, "number of iterations must be >= 1, got {n}")
            }
            Self::RadiusTooSmall(r) => {
                write!(f, "structuring element radius must be >= 1, got {r}")
            }
        }
    }
}

impl Error for PerturbConfigError {}

/// 扰动引擎的运行参数.
#[derive(Debug, Clone, Copy)]
pub struct PerturbConfig {
    iterations: usize,
    radius: usize,
}

impl PerturbConfig {
    /// 校验并创建配置. `iterations` 与 `radius` 均须不小于 1,
    /// 否则返回对应的 [`PerturbConfigError`].
    pub fn new(iterations: usize, radius: usize) -> Result<Self, PerturbConfigError> {
        if iterations < 1 {
            return Err(PerturbConfigError::TooFewIterations(iterations));
        }
        if radius < 1 {
            return Err(PerturbConfigError::RadiusTooSmall(radius));
        }
        Ok(Self { iterations, radius })
    }

    /// 迭代轮数.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// 结构元半径 (体素).
    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }
}

/// 单次形态学操作实现块.
impl LabelVolume {
    /// 用结构元 `se` 膨胀 `label` 的区域, 被膨胀掩膜覆盖的体素一律
    /// 改写为 `label` (last-writer-wins, 不保护既有归属).
    pub fn dilate_label(&mut self, label: u16, se: &StructuringElement) {
        let mask = self.binary_mask(label);
        let dilated = morph::dilate(&mask, se);

        for (pos, m) in dilated.indexed_iter() {
            if *m != 0 {
                self[pos] = label;
            }
        }
    }

    /// 用结构元 `se` 腐蚀 `label` 的区域, 被腐蚀掉的体素按
    /// 符号距离回填到最近的幸存 label.
    ///
    /// 距离图针对腐蚀前的当前体数据构建, 每个 `[0, max_label]`
    /// 范围内的 label 一张. 回填排除 `label` 本身, 并列时低序号胜出.
    pub fn erode_label_with_fill(&mut self, label: u16, se: &StructuringElement, max_label: u16) {
        let dmaps = DistanceMapSet::build(self, max_label);

        let mask = self.binary_mask(label);
        let eroded = morph::erode(&mask, se);

        // 只回填从 label 掩膜中被移除的体素, 其余 label 的体素一概不碰.
        for (pos, (m, e)) in mask.indexed_iter().map(|(p, m)| (p, (m, &eroded[p]))) {
            if *m == 1 && *e == 0 {
                self[pos] = dmaps.nearest_label_excluding(pos, label);
            }
        }
    }
}

/// 形态学 label 扰动引擎. 持有注入的随机源, 对一个体数据独占运行.
pub struct LabelPerturbationEngine<R: Rng> {
    config: PerturbConfig,
    rng: R,
}

impl<R: Rng> LabelPerturbationEngine<R> {
    /// 以给定配置和随机源创建引擎.
    pub fn new(config: PerturbConfig, rng: R) -> Self {
        Self { config, rng }
    }

    /// 原地扰动 `vol`, 共 `iterations` 轮.
    ///
    /// 全背景体数据 (max label 为 0) 是 no-op 成功; 扰动过程中前景
    /// 全部消失时提前终止, 同样不是错误.
    pub fn run(&mut self, vol: &mut LabelVolume) {
        let max_label = vol.max_label();
        info!("max label = {max_label}");

        if max_label == 0 {
            return;
        }

        for iter in 0..self.config.iterations {
            // 统计阶段: 以当前状态为准.
            let mut counts = vec![0usize; max_label as usize + 1];
            for p in vol.data().iter() {
                counts[*p as usize] += 1;
            }
            debug!("iter {iter}: label counts = {counts:?}");

            let present: Vec<u16> = (1..=max_label).filter(|l| counts[*l as usize] > 0).collect();
            if present.is_empty() {
                debug!("iter {iter}: no foreground left, stopping early");
                break;
            }

            // 挑选阶段: 在存在的 label 中均匀挑选.
            let picked = present[self.rng.gen_range(0..present.len())];

            // 形状阶段: 球形结构元 + 逐偏移掷硬币稀疏化.
            let mut se = StructuringElement::ball(self.config.radius);
            se.thin(&mut self.rng);

            // 操作阶段: 公平硬币决定膨胀或腐蚀.
            if self.rng.gen_bool(0.5) {
                debug!("iter {iter}: dilating label {picked}");
                vol.dilate_label(picked, &se);
            } else {
                debug!("iter {iter}: eroding label {picked}");
                vol.erode_label_with_fill(picked, &se, max_label);
            }
        }
    }
}
