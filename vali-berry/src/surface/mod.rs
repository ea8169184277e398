//! 三角网格表面的基础数据结构与几何辅助.

use std::collections::HashMap;
use std::error::Error;
use std::fmt;

use nalgebra::{Point3, Vector3};
use once_cell::sync::Lazy;

pub mod io;

pub use io::{read_surface, write_surface, SurfaceIoError};

/// 表面数据的结构性错误.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceError {
    /// 三角形引用了不存在的点. `(三角形序号, 越界的点序号, 点总数)`.
    PointIndexOutOfRange(usize, usize, usize),

    /// 面片不是三角形. `(面片序号, 顶点个数)`.
    /// 非三角形面片是硬错误, 不做静默跳过, 也不做扇形三角化.
    NonTriangleCell(usize, usize),
}

impl fmt::Display for SurfaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PointIndexOutOfRange(tri, idx, n) => write!(
                f,
                "triangle {tri} references point {idx}, but surface has {n} points"
            ),
            Self::NonTriangleCell(cell, n) => {
                write!(f, "cell {cell} has {n} vertices, only triangles are supported")
            }
        }
    }
}

impl Error for SurfaceError {}

/// 不可变三角网格表面: 有序点集 + 有序三角形连接关系.
///
/// 构造时校验所有点索引; 非三角形面片在类型层面即不可表示
/// (I/O 层遇到时直接报 [`SurfaceError::NonTriangleCell`]).
#[derive(Debug, Clone)]
pub struct Surface {
    points: Vec<Point3<f64>>,
    triangles: Vec<[usize; 3]>,
}

impl Surface {
    /// 校验并创建表面. 任一三角形引用越界点时返回 `Err`.
    pub fn new(points: Vec<Point3<f64>>, triangles: Vec<[usize; 3]>) -> Result<Self, SurfaceError> {
        for (t, tri) in triangles.iter().enumerate() {
            for &idx in tri {
                if idx >= points.len() {
                    return Err(SurfaceError::PointIndexOutOfRange(t, idx, points.len()));
                }
            }
        }
        Ok(Self { points, triangles })
    }

    /// 点集.
    #[inline]
    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    /// 三角形连接关系 (0 基点索引).
    #[inline]
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// 点的个数.
    #[inline]
    pub fn n_points(&self) -> usize {
        self.points.len()
    }

    /// 三角形的个数.
    #[inline]
    pub fn n_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// 是否没有任何三角形?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// 每个三角形的质心, 顺序与 [`Self::triangles`] 一致.
    pub fn centroids(&self) -> Vec<Point3<f64>> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                let (pa, pb, pc) = (self.points[a], self.points[b], self.points[c]);
                Point3::from((pa.coords + pb.coords + pc.coords) / 3.0)
            })
            .collect()
    }

    /// 每个三角形的面积加权法向量: 两条边向量的叉积, 不做归一化.
    /// 模恰为三角形面积的两倍, 方向由顶点环绕序决定.
    /// 退化 (零面积) 三角形给出零向量, 在所有 kernel 求和中自然贡献 0.
    pub fn weighted_normals(&self) -> Vec<Vector3<f64>> {
        self.triangles
            .iter()
            .map(|&[a, b, c]| {
                let (pa, pb, pc) = (self.points[a], self.points[b], self.points[c]);
                (pb - pa).cross(&(pc - pa))
            })
            .collect()
    }

    /// 生成球面三角网格 (icosphere).
    ///
    /// 从正二十面体出发做 `subdivisions` 次 4 分细分, 每次细分后把
    /// 新顶点拉回单位球面, 最后按 `radius` 缩放并平移到 `center`.
    /// 细分 4 次约 2562 个顶点.
    pub fn sphere(center: Point3<f64>, radius: f64, subdivisions: usize) -> Self {
        assert!(radius > 0.0);

        let (mut points, mut triangles) = ICOSAHEDRON.clone();
        for _ in 0..subdivisions {
            (points, triangles) = subdivide(&points, &triangles);
        }

        let points = points
            .into_iter()
            .map(|p| center + p.coords * radius)
            .collect();

        // 细分只会引用既有或新插入的顶点, 不可能越界.
        Self::new(points, triangles).unwrap()
    }
}

/// 单位球面上的正二十面体.
static ICOSAHEDRON: Lazy<(Vec<Point3<f64>>, Vec<[usize; 3]>)> = Lazy::new(|| {
    let phi = (1.0 + 5.0f64.sqrt()) / 2.0;
    let verts = [
        [-1.0, phi, 0.0],
        [1.0, phi, 0.0],
        [-1.0, -phi, 0.0],
        [1.0, -phi, 0.0],
        [0.0, -1.0, phi],
        [0.0, 1.0, phi],
        [0.0, -1.0, -phi],
        [0.0, 1.0, -phi],
        [phi, 0.0, -1.0],
        [phi, 0.0, 1.0],
        [-phi, 0.0, -1.0],
        [-phi, 0.0, 1.0],
    ];
    let points = verts
        .iter()
        .map(|v| Point3::from(Vector3::new(v[0], v[1], v[2]).normalize()))
        .collect();

    let faces = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];
    (points, faces)
});

/// 把每个三角形 4 分, 新的边中点拉回单位球面.
fn subdivide(
    points: &[Point3<f64>],
    triangles: &[[usize; 3]],
) -> (Vec<Point3<f64>>, Vec<[usize; 3]>) {
    let mut new_points = points.to_vec();
    let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();
    let mut new_triangles = Vec::with_capacity(triangles.len() * 4);

    let mut midpoint = |i: usize, j: usize, pts: &mut Vec<Point3<f64>>| -> usize {
        let key = if i < j { (i, j) } else { (j, i) };
        *midpoints.entry(key).or_insert_with(|| {
            let mid = (pts[i].coords + pts[j].coords) / 2.0;
            pts.push(Point3::from(mid.normalize()));
            pts.len() - 1
        })
    };

    for &[a, b, c] in triangles {
        let ab = midpoint(a, b, &mut new_points);
        let bc = midpoint(b, c, &mut new_points);
        let ca = midpoint(c, a, &mut new_points);

        new_triangles.push([a, ab, ca]);
        new_triangles.push([b, bc, ab]);
        new_triangles.push([c, ca, bc]);
        new_triangles.push([ab, bc, ca]);
    }

    (new_points, new_triangles)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 越界的三角形索引在构造时即被拒绝.
    #[test]
    fn test_invalid_index_rejected() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let err = Surface::new(points, vec![[0, 1, 3]]).unwrap_err();
        assert_eq!(err, SurfaceError::PointIndexOutOfRange(0, 3, 3));
    }

    /// 单位直角三角形: 质心与面积加权法向量的解析值.
    #[test]
    fn test_centroid_and_weighted_normal() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let surf = Surface::new(points, vec![[0, 1, 2]]).unwrap();

        let c = surf.centroids()[0];
        assert!((c - Point3::new(1.0 / 3.0, 1.0 / 3.0, 0.0)).norm() < 1e-12);

        // 面积 0.5, 加权法向量模为 1, 指向 +z.
        let n = surf.weighted_normals()[0];
        assert!((n - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }

    /// 退化三角形的加权法向量是零向量.
    #[test]
    fn test_degenerate_triangle_zero_normal() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        ];
        let surf = Surface::new(points, vec![[0, 1, 2]]).unwrap();
        assert_eq!(surf.weighted_normals()[0].norm(), 0.0);
    }

    /// icosphere 的总面积收敛到 4 pi r^2.
    #[test]
    fn test_sphere_area_converges() {
        let surf = Surface::sphere(Point3::new(1.0, -2.0, 3.0), 10.0, 3);
        let area: f64 = surf.weighted_normals().iter().map(|n| n.norm() / 2.0).sum();

        let exact = 4.0 * std::f64::consts::PI * 100.0;
        // 细分 3 次的内接多面体, 面积略小于球面积.
        assert!(area < exact);
        assert!(area > exact * 0.98);
    }

    /// 细分后的顶点个数符合封闭二十面体的组合公式.
    #[test]
    fn test_sphere_subdivision_counts() {
        let surf = Surface::sphere(Point3::origin(), 1.0, 0);
        assert_eq!(surf.n_points(), 12);
        assert_eq!(surf.n_triangles(), 20);

        let surf = Surface::sphere(Point3::origin(), 1.0, 2);
        assert_eq!(surf.n_triangles(), 320);
        assert_eq!(surf.n_points(), 162);
    }
}
