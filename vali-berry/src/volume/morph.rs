//! 二值形态学原语: 球形结构元, 膨胀与腐蚀.

use itertools::iproduct;
use ndarray::Array3;
use rand::Rng;

use crate::Offset3d;

/// 有限 3D 邻域掩膜, 定义一次膨胀/腐蚀的作用范围.
///
/// 以原点为中心的球 (欧氏范数不超过半径的整数偏移集合).
/// 生成后可用 [`Self::thin`] 做随机稀疏化, 得到每轮形状各异的结构元.
#[derive(Debug, Clone)]
pub struct StructuringElement {
    radius: usize,
    offsets: Vec<Offset3d>,
}

impl StructuringElement {
    /// 生成半径为 `radius` 的球形结构元. 半径以体素为单位, 各维相同.
    ///
    /// `radius` 必须不小于 1, 否则程序 panic (配置校验在引擎层提前完成).
    pub fn ball(radius: usize) -> Self {
        assert!(radius >= 1);
        let r = radius as i64;
        let r_sq = r * r;

        let offsets = iproduct!(-r..=r, -r..=r, -r..=r)
            .filter(|(dz, dh, dw)| dz * dz + dh * dh + dw * dw <= r_sq)
            .collect();

        Self { radius, offsets }
    }

    /// 生成时指定的半径.
    #[inline]
    pub fn radius(&self) -> usize {
        self.radius
    }

    /// 当前活跃偏移的个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// 结构元是否已经没有任何活跃偏移?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// 当前活跃偏移集合.
    #[inline]
    pub fn offsets(&self) -> &[Offset3d] {
        &self.offsets
    }

    /// 随机稀疏化: 每个活跃偏移独立地以 0.5 概率保留 (包括中心).
    ///
    /// 稀疏化可能清空结构元; 空结构元的膨胀产生空掩膜, 腐蚀是恒等,
    /// 二者都良定义.
    pub fn thin<R: Rng>(&mut self, rng: &mut R) {
        self.offsets.retain(|_| rng.gen_bool(0.5));
    }
}

/// 二值膨胀: `out = mask ⊕ se`, 即每个前景体素把结构元盖章到输出上.
/// 越界部分直接裁剪.
pub fn dilate(mask: &Array3<u8>, se: &StructuringElement) -> Array3<u8> {
    let (nz, nh, nw) = mask.dim();
    let mut out = Array3::<u8>::zeros(mask.dim());

    for ((z, h, w), _) in mask.indexed_iter().filter(|(_, p)| **p != 0) {
        for (dz, dh, dw) in se.offsets() {
            let tz = z as i64 + dz;
            let th = h as i64 + dh;
            let tw = w as i64 + dw;
            if tz < 0 || th < 0 || tw < 0 {
                continue;
            }
            let (tz, th, tw) = (tz as usize, th as usize, tw as usize);
            if tz < nz && th < nh && tw < nw {
                out[(tz, th, tw)] = 1;
            }
        }
    }
    out
}

/// 二值腐蚀: `out(x) = 1` 当且仅当结构元的每个偏移处都是前景.
/// 图像外按前景处理, 使边界处的区域不因出界而被腐蚀掉
/// (与 ITK 二值腐蚀的默认边界条件一致).
pub fn erode(mask: &Array3<u8>, se: &StructuringElement) -> Array3<u8> {
    // 空结构元下 all() 空洞为真, 会把全图判成前景; 按恒等处理.
    if se.is_empty() {
        return mask.clone();
    }

    let (nz, nh, nw) = mask.dim();
    let mut out = Array3::<u8>::zeros(mask.dim());

    for ((z, h, w), o) in out.indexed_iter_mut() {
        let all_fg = se.offsets().iter().all(|(dz, dh, dw)| {
            let tz = z as i64 + dz;
            let th = h as i64 + dh;
            let tw = w as i64 + dw;
            if tz < 0 || th < 0 || tw < 0 {
                return true; // 出界 == 前景
            }
            let (tz, th, tw) = (tz as usize, th as usize, tw as usize);
            if tz >= nz || th >= nh || tw >= nw {
                return true;
            }
            mask[(tz, th, tw)] != 0
        });
        *o = u8::from(all_fg);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    /// 半径 1 的球应当是 7 偏移的钻石邻域.
    #[test]
    fn test_ball_radius_one() {
        let se = StructuringElement::ball(1);
        assert_eq!(se.len(), 7);
        assert!(se.offsets().contains(&(0, 0, 0)));
        assert!(se.offsets().contains(&(1, 0, 0)));
        assert!(!se.offsets().contains(&(1, 1, 0)));
    }

    /// 半径为 0 的球是配置错误.
    #[test]
    #[should_panic]
    fn test_ball_radius_zero_panics() {
        let _ = StructuringElement::ball(0);
    }

    /// 稀疏化后结构元只会缩小, 且固定种子下结果可复现.
    #[test]
    fn test_thin_is_reproducible() {
        let mut a = StructuringElement::ball(2);
        let mut b = StructuringElement::ball(2);
        let before = a.len();

        a.thin(&mut StdRng::seed_from_u64(7));
        b.thin(&mut StdRng::seed_from_u64(7));

        assert!(a.len() <= before);
        assert_eq!(a.offsets(), b.offsets());
    }

    /// 单点膨胀产生整个球; 再腐蚀回来至少保留中心.
    #[test]
    fn test_dilate_erode_single_voxel() {
        let mut mask = Array3::<u8>::zeros((7, 7, 7));
        mask[(3, 3, 3)] = 1;

        let se = StructuringElement::ball(1);
        let dilated = dilate(&mask, &se);
        assert_eq!(dilated.iter().filter(|p| **p != 0).count(), 7);

        let eroded = erode(&dilated, &se);
        assert_eq!(eroded[(3, 3, 3)], 1);
        assert_eq!(eroded.iter().filter(|p| **p != 0).count(), 1);
    }

    /// 稀疏化清空后的结构元: 膨胀产生空掩膜, 腐蚀是恒等.
    #[test]
    fn test_empty_element_semantics() {
        let mut se = StructuringElement::ball(1);
        let mut rng = StdRng::seed_from_u64(0);
        while !se.is_empty() {
            se.thin(&mut rng);
        }

        let mut mask = Array3::<u8>::zeros((3, 3, 3));
        mask[(1, 1, 1)] = 1;
        mask[(0, 2, 2)] = 1;

        assert!(dilate(&mask, &se).iter().all(|p| *p == 0));
        assert_eq!(erode(&mask, &se), mask);
    }

    /// 贴边的前景在腐蚀下不因出界而消失 (出界按前景处理).
    #[test]
    fn test_erode_boundary_is_foreground() {
        let mask = Array3::<u8>::ones((3, 3, 3));
        let se = StructuringElement::ball(1);
        let eroded = erode(&mask, &se);
        assert!(eroded.iter().all(|p| *p == 1));
    }
}
