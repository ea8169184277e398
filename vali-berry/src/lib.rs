#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供多 label 医学分割图像与三角网格表面的验证 metric
//! 计算, 以及用于生成"模拟评分者差异"数据的 label 扰动算法.
//!
//! 该 crate 目前仅提供 `safe` 接口. 在非期望情况下, 程序会直接 panic,
//! 而不会导致内存错误. As what Rust promises.
//!
//! # 开发计划
//!
//! ### 体数据基础结构 ✅
//!
//! nii 格式多 label 3D 标注的读写与基本统计 (计数, 替换, 邻域).
//! 读写往返保证几何元信息 (origin, spacing, direction) 不变.
//!
//! 实现位于 `vali-berry/src/volume`.
//!
//! ### 重叠类 metric ✅
//!
//! Dice, Jaccard, sensitivity, specificity, PPV 与 Cohen kappa.
//! 另提供按 label 逐个二值化的批量计算器.
//!
//! 实现位于 `vali-berry/src/metrics/overlap.rs`.
//!
//! ### 表面距离类 metric ✅
//!
//! 最近点平均距离与 (分位数) Hausdorff 距离, 基于 k-d tree 最近邻查询.
//!
//! 实现位于 `vali-berry/src/metrics/surface_dist.rs`.
//!
//! ### Currents 表面 metric ✅
//!
//! Glaunes et al. (CVPR 2004) 提出的 currents 表示下的表面差异度量.
//! 每个表面被表示为 "三角形质心处的面积加权法向量" 之和,
//! 在各向同性 Gaussian kernel 定义的 RKHS 中计算二者距离的平方.
//! 提供精确 (全对) 与截断近似 (质心 k-d tree, 半径 `3h`) 两种求值模式.
//!
//! 实现位于 `vali-berry/src/metrics/currents.rs`.
//!
//! ### 形态学 label 扰动 ✅
//!
//! 每轮随机挑选一个存在的 label, 用随机稀疏化的球形结构元对其区域
//! 做膨胀或腐蚀; 腐蚀去掉的体素按逐 label 符号距离图回填到最近的
//! 幸存 label, 保证任何体素不会失去定义.
//!
//! 实现位于 `vali-berry/src/perturb.rs`.
//!
//! ### 逐 label 符号距离图 ✅
//!
//! Felzenszwalb-Huttenlocher 可分离平方 EDT, 支持各向异性体素间距.
//!
//! 实现位于 `vali-berry/src/volume/dmap.rs`.
//!
//! ### 表面文件读写 ✅
//!
//! OFF / ASC / BYU / legacy VTK / PLY 五种网格容器, 按扩展名分发.
//! 未知扩展名直接报错, 不做内容嗅探. 非三角形面片是硬错误.
//!
//! 实现位于 `vali-berry/src/surface/io.rs`.
//!
//! ### 完善代码文档 ⌛️
//!
//! 给每个 public API 提供文档, 并视情况给 private API 提供文档.

/// 三维索引, 同时也可一定程度上用作非负整数向量. 约定顺序为 `(z, h, w)`.
pub type Idx3d = (usize, usize, usize);

/// 二维索引.
pub type Idx2d = (usize, usize);

/// 三维整型偏移量, 用于结构元等以原点为中心的邻域.
pub type Offset3d = (i64, i64, i64);

pub mod consts;

/// 多 label 3D 标注的基础数据结构与距离图 / 形态学原语.
pub mod volume;

pub use volume::{DistanceMapSet, LabelVolume, NiftiHeaderAttr, StructuringElement};

pub mod metrics;

pub mod perturb;

pub mod surface;

pub mod prelude;
