//! 顶点集之间的距离度量: 平均最近距离与分位数 Hausdorff.
//!
//! 两者都在点集层面工作, 不关心三角形连接关系. 最近邻查询走 kd 树,
//! 每次评估现场建树, 不跨调用缓存.

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point3;
use ordered_float::OrderedFloat;

use super::{MetricError, SurfaceMetric};
use crate::surface::Surface;

fn build_tree(points: &[Point3<f64>]) -> KdTree<f64, 3> {
    let mut tree: KdTree<f64, 3> = KdTree::new();
    for (i, p) in points.iter().enumerate() {
        tree.add(&[p.x, p.y, p.z], i as u64);
    }
    tree
}

/// 每个 moving 顶点到 fixed 顶点集的最近距离, 逐点取值.
fn closest_distances(moving: &[Point3<f64>], fixed_tree: &KdTree<f64, 3>) -> Vec<f64> {
    moving
        .iter()
        .map(|p| {
            let nearest = fixed_tree.nearest_one::<SquaredEuclidean>(&[p.x, p.y, p.z]);
            nearest.distance.sqrt()
        })
        .collect()
}

/// moving 顶点到 fixed 顶点集最近距离的平均值.
///
/// 非对称: 交换两输入一般得到不同的值. moving 为空时取 0,
/// fixed 为空而 moving 非空时距离无定义, 取正无穷.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosestDistanceSurfaceMetric;

impl SurfaceMetric for ClosestDistanceSurfaceMetric {
    fn value(&self, fixed: &Surface, moving: &Surface) -> Result<f64, MetricError> {
        if moving.n_points() == 0 {
            return Ok(0.0);
        }
        if fixed.n_points() == 0 {
            return Ok(f64::INFINITY);
        }

        let tree = build_tree(fixed.points());
        let distances = closest_distances(moving.points(), &tree);
        Ok(distances.iter().sum::<f64>() / distances.len() as f64)
    }

    fn is_symmetric(&self) -> bool {
        false
    }
}

/// 对称分位数 Hausdorff 距离.
///
/// 两个方向各取最近距离的指定分位数, 再取较大者. `percentile = 1.0`
/// 即经典 Hausdorff. 两侧皆空取 0, 恰有一侧为空取正无穷.
#[derive(Debug, Clone, Copy)]
pub struct HausdorffDistanceSurfaceMetric {
    percentile: f64,
}

impl HausdorffDistanceSurfaceMetric {
    /// 构造时校验分位数落在 `[0, 1]`.
    pub fn new(percentile: f64) -> Result<Self, MetricError> {
        if !(0.0..=1.0).contains(&percentile) {
            return Err(MetricError::BadPercentile(percentile));
        }
        Ok(Self { percentile })
    }

    /// 配置的分位数.
    #[inline]
    pub fn percentile(&self) -> f64 {
        self.percentile
    }

    /// 单方向分位数距离. 距离升序排序后按分位数取下标.
    fn directed(&self, from: &[Point3<f64>], to_tree: &KdTree<f64, 3>) -> f64 {
        let mut distances = closest_distances(from, to_tree);
        distances.sort_unstable_by_key(|&d| OrderedFloat(d));

        let idx = (self.percentile * (distances.len() - 1) as f64).round() as usize;
        distances[idx]
    }
}

impl SurfaceMetric for HausdorffDistanceSurfaceMetric {
    fn value(&self, fixed: &Surface, moving: &Surface) -> Result<f64, MetricError> {
        match (fixed.n_points() == 0, moving.n_points() == 0) {
            (true, true) => return Ok(0.0),
            (true, false) | (false, true) => return Ok(f64::INFINITY),
            (false, false) => {}
        }

        let fixed_tree = build_tree(fixed.points());
        let moving_tree = build_tree(moving.points());

        let forward = self.directed(moving.points(), &fixed_tree);
        let backward = self.directed(fixed.points(), &moving_tree);
        Ok(forward.max(backward))
    }

    fn is_symmetric(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point_cloud(points: &[[f64; 3]]) -> Surface {
        let points = points
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect();
        Surface::new(points, Vec::new()).unwrap()
    }

    /// 平移点集的平均最近距离即平移量.
    #[test]
    fn test_closest_distance_translation() {
        let fixed = point_cloud(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        let moving = point_cloud(&[[0.0, 0.5, 0.0], [1.0, 0.5, 0.0], [2.0, 0.5, 0.0]]);

        let metric = ClosestDistanceSurfaceMetric;
        let v = metric.value(&fixed, &moving).unwrap();
        assert!((v - 0.5).abs() < 1e-12);
    }

    /// moving 为空取 0, 仅 fixed 为空取正无穷.
    #[test]
    fn test_closest_distance_empty_cases() {
        let empty = point_cloud(&[]);
        let some = point_cloud(&[[0.0, 0.0, 0.0]]);

        let metric = ClosestDistanceSurfaceMetric;
        assert_eq!(metric.value(&some, &empty).unwrap(), 0.0);
        assert_eq!(metric.value(&empty, &some).unwrap(), f64::INFINITY);
    }

    /// 分位数 1.0 即经典 Hausdorff: 取双向最坏点.
    #[test]
    fn test_hausdorff_full_percentile() {
        let fixed = point_cloud(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let moving = point_cloud(&[[0.0, 0.0, 0.0], [4.0, 0.0, 0.0]]);

        let metric = HausdorffDistanceSurfaceMetric::new(1.0).unwrap();
        let v = metric.value(&fixed, &moving).unwrap();
        assert!((v - 3.0).abs() < 1e-12);
        // 对称性.
        let w = metric.value(&moving, &fixed).unwrap();
        assert!((v - w).abs() < 1e-12);
    }

    /// 低分位数忽略离群点, 排序保证取到的是有序统计量.
    #[test]
    fn test_hausdorff_percentile_ignores_outlier() {
        // moving 中 10 个点贴合, 1 个离群: 0.5 分位数不受离群点影响.
        let fixed_pts: Vec<[f64; 3]> = (0..11).map(|i| [i as f64, 0.0, 0.0]).collect();
        let mut moving_pts = fixed_pts.clone();
        moving_pts[10] = [10.0, 100.0, 0.0];

        let fixed = point_cloud(&fixed_pts);
        let moving = point_cloud(&moving_pts);

        let half = HausdorffDistanceSurfaceMetric::new(0.5).unwrap();
        let v = half.value(&fixed, &moving).unwrap();
        assert!(v < 1.0, "median distance should ignore the outlier, got {v}");

        let full = HausdorffDistanceSurfaceMetric::new(1.0).unwrap();
        let w = full.value(&fixed, &moving).unwrap();
        assert!((w - 100.0).abs() < 1e-9);
    }

    /// 分位数超界在构造时立即报错.
    #[test]
    fn test_bad_percentile_rejected() {
        assert_eq!(
            HausdorffDistanceSurfaceMetric::new(1.5).unwrap_err(),
            MetricError::BadPercentile(1.5)
        );
        assert!(HausdorffDistanceSurfaceMetric::new(-0.1).is_err());
    }

    /// 两侧皆空取 0, 恰有一侧为空取正无穷.
    #[test]
    fn test_hausdorff_empty_cases() {
        let empty = point_cloud(&[]);
        let some = point_cloud(&[[0.0, 0.0, 0.0]]);
        let metric = HausdorffDistanceSurfaceMetric::new(0.95).unwrap();

        assert_eq!(metric.value(&empty, &empty).unwrap(), 0.0);
        assert_eq!(metric.value(&empty, &some).unwrap(), f64::INFINITY);
        assert_eq!(metric.value(&some, &empty).unwrap(), f64::INFINITY);
    }
}
