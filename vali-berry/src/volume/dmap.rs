//! 逐 label 符号距离图.
//!
//! 腐蚀回填需要知道 "每个体素到每个 label 区域的距离". 这里用
//! Felzenszwalb-Huttenlocher 可分离平方 EDT 逐轴扫描实现,
//! 体素间距各向异性时以毫米为单位计算. 符号约定: 区域内部为负,
//! 外部为正 (与 ITK SignedMaurer 默认一致).

use ndarray::{Array3, Zip};

use super::{LabelVolume, NiftiHeaderAttr};
use crate::Idx3d;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};
    }
}

/// 一维平方距离变换, 下包络法. `f` 为各采样点的初始平方距离,
/// 采样点间距为 `step`. 结果写入 `d`.
///
/// `f` 中允许出现 `f64::INFINITY` (代表该点不含种子).
fn dt_1d(f: &[f64], step: f64, d: &mut [f64]) {
    let n = f.len();
    debug_assert_eq!(n, d.len());

    // v: 包络中抛物线的顶点下标; z: 相邻抛物线的分界位置.
    let mut v = vec![0usize; n];
    let mut z = vec![0.0f64; n + 1];
    let mut k = 0usize;
    let mut started = false;

    for q in 0..n {
        if f[q].is_infinite() {
            continue;
        }
        let xq = q as f64 * step;

        if !started {
            v[0] = q;
            z[0] = f64::NEG_INFINITY;
            z[1] = f64::INFINITY;
            started = true;
            continue;
        }

        loop {
            let p = v[k];
            let xp = p as f64 * step;
            // 两条抛物线 f[p] + (x - xp)^2 与 f[q] + (x - xq)^2 的交点.
            let s = ((f[q] + xq * xq) - (f[p] + xp * xp)) / (2.0 * (xq - xp));
            if s <= z[k] {
                debug_assert!(k > 0);
                k -= 1;
            } else {
                k += 1;
                v[k] = q;
                z[k] = s;
                z[k + 1] = f64::INFINITY;
                break;
            }
        }
    }

    if !started {
        d.fill(f64::INFINITY);
        return;
    }

    let mut k = 0usize;
    for (q, out) in d.iter_mut().enumerate() {
        let x = q as f64 * step;
        while z[k + 1] < x {
            k += 1;
        }
        let xv = v[k] as f64 * step;
        *out = f[v[k]] + (x - xv) * (x - xv);
    }
}

/// 三维平方欧氏距离变换: 返回每个体素到掩膜中最近非零体素的平方距离
/// (毫米制). 掩膜为空时全为 `INFINITY`.
fn edt_sq(mask: &Array3<u8>, spacing: [f64; 3]) -> Array3<f64> {
    let (nz, nh, nw) = mask.dim();
    let [sz, sh, sw] = spacing;

    let mut dist = mask.mapv(|p| if p != 0 { 0.0f64 } else { f64::INFINITY });

    // 沿 w 轴.
    let mut buf = vec![0.0f64; nw.max(nh).max(nz)];
    for z in 0..nz {
        for h in 0..nh {
            let f: Vec<f64> = (0..nw).map(|w| dist[(z, h, w)]).collect();
            dt_1d(&f, sw, &mut buf[..nw]);
            for w in 0..nw {
                dist[(z, h, w)] = buf[w];
            }
        }
    }

    // 沿 h 轴.
    for z in 0..nz {
        for w in 0..nw {
            let f: Vec<f64> = (0..nh).map(|h| dist[(z, h, w)]).collect();
            dt_1d(&f, sh, &mut buf[..nh]);
            for h in 0..nh {
                dist[(z, h, w)] = buf[h];
            }
        }
    }

    // 沿 z 轴.
    for h in 0..nh {
        for w in 0..nw {
            let f: Vec<f64> = (0..nz).map(|z| dist[(z, h, w)]).collect();
            dt_1d(&f, sz, &mut buf[..nz]);
            for z in 0..nz {
                dist[(z, h, w)] = buf[z];
            }
        }
    }

    dist
}

/// 计算二值掩膜的符号距离图: 掩膜内部为负, 外部为正, 量纲为毫米.
///
/// 全前景掩膜给出全 `-INFINITY`, 全背景掩膜给出全 `INFINITY`,
/// 二者都是良定义的退化结果.
pub fn signed_distance(mask: &Array3<u8>, spacing: [f64; 3]) -> Array3<f32> {
    let to_fg = edt_sq(mask, spacing);
    let inverted = mask.mapv(|p| 1 - p);
    let to_bg = edt_sq(&inverted, spacing);

    let mut out = Array3::<f32>::zeros(mask.dim());
    Zip::from(&mut out)
        .and(&to_fg)
        .and(&to_bg)
        .for_each(|o, &fg, &bg| {
            *o = (fg.sqrt() - bg.sqrt()) as f32;
        });
    out
}

/// 某一时刻 label 体数据的逐 label 符号距离图集合.
///
/// 针对 `[0, max_label]` 范围内的每个 label 值各保存一张距离图,
/// 全部以构建时的体数据为准. 体数据一旦变化, 该集合即失效,
/// 必须重建 (腐蚀路径每轮都重建, 不跨轮缓存).
pub struct DistanceMapSet {
    maps: Vec<Array3<f32>>,
}

impl DistanceMapSet {
    /// 对当前体数据构建 `0..=max_label` 的全部符号距离图.
    ///
    /// 这是每轮 O(max_label) 次全量距离变换的昂贵操作,
    /// 以换取相对增量维护的简单与正确.
    pub fn build(vol: &LabelVolume, max_label: u16) -> Self {
        let spacing = vol.pix_dim();

        cfg_if::cfg_if! {
            if #[cfg(feature = "rayon")] {
                let maps = (0..=max_label)
                    .into_par_iter()
                    .map(|label| signed_distance(&vol.binary_mask(label), spacing))
                    .collect();
            } else {
                let maps = (0..=max_label)
                    .map(|label| signed_distance(&vol.binary_mask(label), spacing))
                    .collect();
            }
        }

        Self { maps }
    }

    /// 获取值为 `label` 的距离图. label 越界时 panic.
    #[inline]
    pub fn map(&self, label: u16) -> &Array3<f32> {
        &self.maps[label as usize]
    }

    /// 在 `pos` 处查找绝对距离最小的 label, 排除 `excluded` 本身.
    ///
    /// 距离相同时, 扫描按 label 升序进行且仅在严格更小时更新,
    /// 因此并列时最小的 label 胜出.
    pub fn nearest_label_excluding(&self, pos: Idx3d, excluded: u16) -> u16 {
        let mut closest = excluded;
        let mut closest_dist = f32::INFINITY;

        for (label, map) in self.maps.iter().enumerate() {
            if label as u16 == excluded {
                continue;
            }
            let d = map[pos].abs();
            if d < closest_dist {
                closest_dist = d;
                closest = label as u16;
            }
        }
        closest
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use itertools::iproduct;
    use ndarray::Array3;

    /// 暴力平方 EDT, 用作小尺寸对照.
    fn brute_force_sq(mask: &Array3<u8>, spacing: [f64; 3]) -> Array3<f64> {
        let (nz, nh, nw) = mask.dim();
        let [sz, sh, sw] = spacing;
        let mut out = Array3::<f64>::from_elem(mask.dim(), f64::INFINITY);
        for (z, h, w) in iproduct!(0..nz, 0..nh, 0..nw) {
            for (z2, h2, w2) in iproduct!(0..nz, 0..nh, 0..nw) {
                if mask[(z2, h2, w2)] == 0 {
                    continue;
                }
                let dz = (z as f64 - z2 as f64) * sz;
                let dh = (h as f64 - h2 as f64) * sh;
                let dw = (w as f64 - w2 as f64) * sw;
                let d = dz * dz + dh * dh + dw * dw;
                if d < out[(z, h, w)] {
                    out[(z, h, w)] = d;
                }
            }
        }
        out
    }

    /// 可分离 EDT 与暴力结果必须一致 (各向同性).
    #[test]
    fn test_edt_matches_brute_force() {
        let mut mask = Array3::<u8>::zeros((6, 7, 8));
        // 两个相隔的种子点和一小块区域.
        mask[(1, 1, 1)] = 1;
        mask[(4, 5, 6)] = 1;
        mask[(2, 3, 4)] = 1;
        mask[(2, 3, 5)] = 1;

        let spacing = [1.0, 1.0, 1.0];
        let fast = edt_sq(&mask, spacing);
        let slow = brute_force_sq(&mask, spacing);
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    /// 各向异性间距下仍然与暴力结果一致.
    #[test]
    fn test_edt_anisotropic() {
        let mut mask = Array3::<u8>::zeros((4, 5, 6));
        mask[(0, 0, 0)] = 1;
        mask[(3, 4, 5)] = 1;

        let spacing = [2.5, 0.75, 1.25];
        let fast = edt_sq(&mask, spacing);
        let slow = brute_force_sq(&mask, spacing);
        for (a, b) in fast.iter().zip(slow.iter()) {
            assert!((a - b).abs() < 1e-9, "{a} != {b}");
        }
    }

    /// 空掩膜的距离图应当全为正无穷.
    #[test]
    fn test_edt_empty_mask() {
        let mask = Array3::<u8>::zeros((3, 3, 3));
        let dist = edt_sq(&mask, [1.0, 1.0, 1.0]);
        assert!(dist.iter().all(|d| d.is_infinite()));
    }

    /// 符号约定: 内部为负, 外部为正.
    #[test]
    fn test_signed_distance_sign() {
        let mut mask = Array3::<u8>::zeros((5, 5, 5));
        for (z, h, w) in iproduct!(1..4, 1..4, 1..4) {
            mask[(z, h, w)] = 1;
        }
        let sd = signed_distance(&mask, [1.0, 1.0, 1.0]);
        assert!(sd[(2, 2, 2)] < 0.0);
        assert!(sd[(0, 0, 0)] > 0.0);
        // 中心体素到最近背景恰为 2 个体素.
        assert!((sd[(2, 2, 2)] + 2.0).abs() < 1e-6);
    }

    /// 并列距离时, 低 label 序号胜出.
    #[test]
    fn test_nearest_label_tie_break() {
        // 1D 布局: [1, 0, 2], 中间的背景体素到两侧 label 距离相等.
        let mut data = Array3::<u16>::zeros((1, 1, 3));
        data[(0, 0, 0)] = 1;
        data[(0, 0, 2)] = 2;
        let vol = LabelVolume::fake(data, [1.0, 1.0, 1.0]);

        let dmaps = DistanceMapSet::build(&vol, 2);
        // 排除背景以外的并列: label 1 与 label 2 到中心等距, 1 胜出.
        assert_eq!(dmaps.nearest_label_excluding((0, 0, 1), 0), 1);
    }
}
