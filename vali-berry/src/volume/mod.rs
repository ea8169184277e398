//! 多 label 3D 标注的基础数据结构.

use std::ops::{Index, IndexMut};
use std::path::Path;

use ndarray::{Array3, ArrayView, ArrayViewMut, Ix3};
use nifti::writer::WriterOptions;
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::consts::is_foreground;
use crate::Idx3d;

pub mod dmap;
pub mod morph;

pub use dmap::DistanceMapSet;
pub use morph::StructuringElement;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// 将 (W, H, z) 转换成 (z, H, W). 以后均按照该模式访问.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    // [W, H, z]. 体素个数数组.
    let [_, w, h, z, ..] = h.dim;
    (z as usize, h as usize, w as usize)
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (z, h, w) = self.shape();
        z * h * w
    }

    /// 检查索引是否合法.
    #[inline]
    fn check(&self, (z0, h0, w0): &Idx3d) -> bool {
        let (z, h, w) = self.shape();
        *z0 < z && *h0 < h && *w0 < w
    }

    /// 获取单个体素分辨率. 该分辨率以毫米为单位, 分别代表空间 (相邻切片方向),
    /// 高 (自然图像的垂直方向), 宽 (自然图像的水平方向).
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, w, h, z, ..] = self.header().pixdim;
        [z as f64, h as f64, w as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }
}

/// nii 格式 3D 多 label 标注, 包括 header 和真值标签. label 值以 `u16` 保存,
/// 0 保留给背景.
#[derive(Debug, Clone)]
pub struct LabelVolume {
    header: BoxedHeader,
    data: Array3<u16>,
}

impl NiftiHeaderAttr for LabelVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }
}

impl Index<Idx3d> for LabelVolume {
    type Output = u16;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl IndexMut<Idx3d> for LabelVolume {
    #[inline]
    fn index_mut(&mut self, index: Idx3d) -> &mut Self::Output {
        &mut self.data[index]
    }
}

impl LabelVolume {
    /// 打开 nii 文件格式的 3D 标注. `path` 为 nii 文件的本地路径. 如果打开成功,
    /// 则返回 `Ok(Self)`, 否则返回 `Err`.
    pub fn open<P: AsRef<Path>>(path: P) -> nifti::Result<Self> {
        let obj = ReaderOptions::new().read_file(path.as_ref())?;
        let header = Box::new(obj.header().clone());

        // [W, H, z] -> [z, H, W]
        // hint: 原第一维向下增长, 原第二维向右增长.
        let data = obj
            .into_volume()
            .into_ndarray::<u16>()?
            .permuted_axes([2, 1, 0].as_slice());

        // The nature of nifti data field layout.
        debug_assert!(data.is_standard_layout());

        // 该操作不会生成 `Err`, 可直接 unwrap.
        let data =
            Array3::<u16>::from_shape_vec(get_shape_from_header(&header), data.into_raw_vec())
                .unwrap();

        Ok(Self { header, data })
    }

    /// 将标注写回 nii 文件. 携带的原 header 原样传递给 writer,
    /// 因此几何元信息 (origin, spacing, direction) 在读写往返中保持不变.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), nifti::NiftiError> {
        // [z, H, W] -> [W, H, z], 回到 nifti 惯用布局.
        let data = self.data.view().permuted_axes([2, 1, 0]);
        WriterOptions::new(path.as_ref())
            .reference_header(&self.header)
            .write_nifti(&data)
    }

    /// 根据裸标签数据和体素间距直接创建 `LabelVolume` 实体.
    ///
    /// # 参数
    ///
    /// 1. `data` 按照本 crate 的 `(z, h, w)` 约定组织.
    /// 2. `pix_dim` 同样按 `(z, h, w)` 顺序给出, 以毫米为单位.
    ///
    /// # 注意
    ///
    /// 该方法可能会创建不一致的实体, 因此你应仅将其用于实验目的.
    pub fn fake(data: Array3<u16>, pix_dim: [f32; 3]) -> Self {
        let (z, h, w) = data.dim();

        let mut header = Box::<NiftiHeader>::default();
        header.dim = [3, w as u16, h as u16, z as u16, 1, 1, 1, 1];
        let [pz, ph, pw] = pix_dim;
        header.pixdim = [1.0, pw, ph, pz, 1.0, 1.0, 1.0, 1.0];
        header.intent_name[..4].copy_from_slice(b"fake");

        Self { header, data }
    }

    /// 直接创建数据. 除手动指定 header 之外, 功能与 [`Self::fake`] 相同.
    /// `data` 的形状必须和 `header` 声明的一致, 否则程序 panic.
    pub fn fake_with_header(header: &NiftiHeader, data: Array3<u16>) -> Self {
        assert_eq!(get_shape_from_header(header), data.dim());

        let mut header = Box::new(header.clone());
        header.intent_name[..4].copy_from_slice(b"fake");
        Self { header, data }
    }

    /// 判断该结构是否是由 `fake*` 方法手动拼接的.
    pub fn is_faked(&self) -> bool {
        self.header.intent_name.starts_with(b"fake")
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView<'_, u16, Ix3> {
        self.data.view()
    }

    /// 获得数据的一份可变 shallow copy.
    #[inline]
    pub fn data_mut(&mut self) -> ArrayViewMut<'_, u16, Ix3> {
        self.data.view_mut()
    }

    /// 获取 3D 标注中值为 `label` 的体素个数.
    #[inline]
    pub fn count(&self, label: u16) -> usize {
        self.data.iter().filter(|p| **p == label).count()
    }

    /// 获取 3D 标注中的最大 label 值. 全背景时为 0.
    #[inline]
    pub fn max_label(&self) -> u16 {
        self.data.iter().copied().max().unwrap_or(0)
    }

    /// 统计每个 label 的体素个数, 返回长度为 `max_label + 1` 的数组,
    /// 下标即 label 值.
    pub fn label_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.max_label() as usize + 1];
        for p in self.data.iter() {
            counts[*p as usize] += 1;
        }
        counts
    }

    /// 获取 3D 标注中的前景 (非背景) 体素总数.
    #[inline]
    pub fn foreground_count(&self) -> usize {
        self.data.iter().copied().filter(|p| is_foreground(*p)).count()
    }

    /// 将 3D 标注中值为 `old` 的体素全部替换为 `new`.
    ///
    /// 返回总共成功替换的个数.
    pub fn replace(&mut self, old: u16, new: u16) -> usize {
        let mut cnt = 0usize;
        self.data_mut()
            .iter_mut()
            .filter(|pix| **pix == old)
            .for_each(|p| {
                cnt += 1;
                *p = new;
            });
        cnt
    }

    /// 收集满足谓词 `pred` 的所有体素对应的下标, 结果按行优先存储.
    pub fn filter_pos(&self, pred: impl Fn(u16) -> bool) -> Vec<Idx3d> {
        self.data
            .indexed_iter()
            .filter_map(|(ref pos, pixel)| pred(*pixel).then_some(*pos))
            .collect()
    }

    /// 计算值为 `label` 的二值掩膜, 命中为 1, 其余为 0.
    pub fn binary_mask(&self, label: u16) -> Array3<u8> {
        self.data.mapv(|p| u8::from(p == label))
    }

    /// 获取 `pos` 前后上下左右六个点的坐标.
    ///
    /// 在数据范围外的坐标会被过滤掉, 不会包含在返回值中.
    pub fn diamond_neighbours(&self, (z, h, w): Idx3d) -> Vec<Idx3d> {
        [
            (z.wrapping_sub(1), h, w),
            (z.saturating_add(1), h, w),
            (z, h.wrapping_sub(1), w),
            (z, h.saturating_add(1), w),
            (z, h, w.wrapping_sub(1)),
            (z, h, w.saturating_add(1)),
        ]
        .into_iter()
        .filter(|p| self.check(p))
        .collect()
    }
}
