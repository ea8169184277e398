//! 通用常量.

/// 多 label 标注中, 背景的体素值. 约定恒为 0, 不参与 label 挑选.
pub const BACKGROUND: u16 = 0;

/// 体素是否是背景?
#[inline]
pub const fn is_background(p: u16) -> bool {
    matches!(p, BACKGROUND)
}

/// 体素是否是前景 (任意非背景 label)?
#[inline]
pub const fn is_foreground(p: u16) -> bool {
    !is_background(p)
}
