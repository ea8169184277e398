//! 表面文件读写.
//!
//! 按扩展名分发, 支持 OFF / ASC / BYU / legacy VTK / PLY 五种容器.
//! 未知扩展名直接报错, 不做内容嗅探. OFF 与 ASC 是两种轻量文本方言:
//! 前者面片行以顶点个数开头, 后者固定三顶点且每行带一个尾随 0.

use std::error::Error;
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use nalgebra::Point3;
use ply_rs::parser::Parser;
use ply_rs::ply::{DefaultElement, Property};

use super::{Surface, SurfaceError};

/// 表面读写错误.
#[derive(Debug)]
pub enum SurfaceIoError {
    /// 扩展名不在支持列表中.
    UnknownExtension(String),

    /// 底层文件系统错误.
    Io(std::io::Error),

    /// 文件内容不符合对应格式.
    Malformed(String),

    /// 数据通过了格式解析, 但表面本身非法 (非三角形面片, 越界索引).
    Surface(SurfaceError),
}

impl fmt::Display for SurfaceIoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownExtension(ext) => write!(f, "unknown surface file extension: {ext:?}"),
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::Malformed(msg) => write!(f, "malformed surface file: {msg}"),
            Self::Surface(e) => write!(f, "invalid surface: {e}"),
        }
    }
}

impl Error for SurfaceIoError {}

impl From<std::io::Error> for SurfaceIoError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<SurfaceError> for SurfaceIoError {
    fn from(e: SurfaceError) -> Self {
        Self::Surface(e)
    }
}

fn malformed(msg: impl Into<String>) -> SurfaceIoError {
    SurfaceIoError::Malformed(msg.into())
}

/// 按扩展名读取表面文件.
pub fn read_surface<P: AsRef<Path>>(path: P) -> Result<Surface, SurfaceIoError> {
    let path = path.as_ref();
    match extension_of(path)?.as_str() {
        "off" => read_off(path),
        "asc" => read_asc(path),
        "byu" => read_byu(path),
        "vtk" => read_vtk(path),
        "ply" => read_ply(path),
        other => Err(SurfaceIoError::UnknownExtension(other.to_owned())),
    }
}

/// 按扩展名写出表面文件. 与原始工具一致, 只支持 VTK / BYU / PLY 三种.
pub fn write_surface<P: AsRef<Path>>(path: P, surf: &Surface) -> Result<(), SurfaceIoError> {
    let path = path.as_ref();
    match extension_of(path)?.as_str() {
        "vtk" => write_vtk(path, surf),
        "byu" => write_byu(path, surf),
        "ply" => write_ply(path, surf),
        other => Err(SurfaceIoError::UnknownExtension(other.to_owned())),
    }
}

fn extension_of(path: &Path) -> Result<String, SurfaceIoError> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .ok_or_else(|| SurfaceIoError::UnknownExtension(path.display().to_string()))
}

/// 非空行迭代器上的数值解析辅助.
fn parse_num<T: std::str::FromStr>(token: Option<&str>, what: &str) -> Result<T, SurfaceIoError> {
    token
        .ok_or_else(|| malformed(format!("unexpected end of data reading {what}")))?
        .parse::<T>()
        .map_err(|_| malformed(format!("bad token reading {what}")))
}

fn read_to_lines(path: &Path) -> Result<Vec<String>, SurfaceIoError> {
    let content = std::fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_owned)
        .collect())
}

/// OFF 方言: 首行注释, 其次 `n_pts n_polys`, 点坐标逐行,
/// 面片行以顶点个数开头 (必须为 3).
fn read_off(path: &Path) -> Result<Surface, SurfaceIoError> {
    let lines = read_to_lines(path)?;
    let mut it = lines.iter().map(String::as_str);

    it.next().ok_or_else(|| malformed("empty OFF file"))?;
    let mut header = it.next().unwrap_or("").split_whitespace();
    let n_pts: usize = parse_num(header.next(), "point count")?;
    let n_polys: usize = parse_num(header.next(), "polygon count")?;

    let mut points = Vec::with_capacity(n_pts);
    for i in 0..n_pts {
        let mut tok = it
            .next()
            .ok_or_else(|| malformed(format!("missing point {i}")))?
            .split_whitespace();
        let x: f64 = parse_num(tok.next(), "x coordinate")?;
        let y: f64 = parse_num(tok.next(), "y coordinate")?;
        let z: f64 = parse_num(tok.next(), "z coordinate")?;
        points.push(Point3::new(x, y, z));
    }

    let mut triangles = Vec::with_capacity(n_polys);
    for cell in 0..n_polys {
        let mut tok = it
            .next()
            .ok_or_else(|| malformed(format!("missing polygon {cell}")))?
            .split_whitespace();
        let n_vertices: usize = parse_num(tok.next(), "cell vertex count")?;
        if n_vertices != 3 {
            return Err(SurfaceError::NonTriangleCell(cell, n_vertices).into());
        }
        let a: usize = parse_num(tok.next(), "vertex index")?;
        let b: usize = parse_num(tok.next(), "vertex index")?;
        let c: usize = parse_num(tok.next(), "vertex index")?;
        triangles.push([a, b, c]);
    }

    Ok(Surface::new(points, triangles)?)
}

/// ASC 方言: 与 OFF 类似, 但面片固定为三角形 (无前导个数),
/// 点行与面片行末尾各带一个被忽略的 0.
fn read_asc(path: &Path) -> Result<Surface, SurfaceIoError> {
    let lines = read_to_lines(path)?;
    let mut it = lines.iter().map(String::as_str);

    it.next().ok_or_else(|| malformed("empty ASC file"))?;
    let mut header = it.next().unwrap_or("").split_whitespace();
    let n_pts: usize = parse_num(header.next(), "point count")?;
    let n_polys: usize = parse_num(header.next(), "polygon count")?;

    let mut points = Vec::with_capacity(n_pts);
    for i in 0..n_pts {
        let mut tok = it
            .next()
            .ok_or_else(|| malformed(format!("missing point {i}")))?
            .split_whitespace();
        let x: f64 = parse_num(tok.next(), "x coordinate")?;
        let y: f64 = parse_num(tok.next(), "y coordinate")?;
        let z: f64 = parse_num(tok.next(), "z coordinate")?;
        points.push(Point3::new(x, y, z));
        // 行尾的 0 直接忽略.
    }

    let mut triangles = Vec::with_capacity(n_polys);
    for cell in 0..n_polys {
        let mut tok = it
            .next()
            .ok_or_else(|| malformed(format!("missing polygon {cell}")))?
            .split_whitespace();
        let a: usize = parse_num(tok.next(), "vertex index")?;
        let b: usize = parse_num(tok.next(), "vertex index")?;
        let c: usize = parse_num(tok.next(), "vertex index")?;
        triangles.push([a, b, c]);
    }

    Ok(Surface::new(points, triangles)?)
}

/// BYU geometry 文件 (ASCII): 连接关系 1 基, 多边形最后一个索引取负.
fn read_byu(path: &Path) -> Result<Surface, SurfaceIoError> {
    let content = std::fs::read_to_string(path)?;
    let mut tok = content.split_whitespace();

    let n_parts: usize = parse_num(tok.next(), "part count")?;
    let n_verts: usize = parse_num(tok.next(), "vertex count")?;
    let n_polys: usize = parse_num(tok.next(), "polygon count")?;
    let _n_conn: usize = parse_num(tok.next(), "connectivity length")?;

    // 每个 part 的多边形起止范围, 读取时用不到.
    for _ in 0..2 * n_parts {
        let _: i64 = parse_num(tok.next(), "part range")?;
    }

    let mut points = Vec::with_capacity(n_verts);
    for _ in 0..n_verts {
        let x: f64 = parse_num(tok.next(), "x coordinate")?;
        let y: f64 = parse_num(tok.next(), "y coordinate")?;
        let z: f64 = parse_num(tok.next(), "z coordinate")?;
        points.push(Point3::new(x, y, z));
    }

    let mut triangles = Vec::with_capacity(n_polys);
    let mut current: Vec<usize> = Vec::with_capacity(4);
    for cell in 0..n_polys {
        loop {
            let v: i64 = parse_num(tok.next(), "connectivity index")?;
            let closing = v < 0;
            let idx = v.unsigned_abs() as usize;
            if idx == 0 {
                return Err(malformed("BYU connectivity index must be 1-based"));
            }
            current.push(idx - 1);
            if closing {
                break;
            }
        }
        if current.len() != 3 {
            return Err(SurfaceError::NonTriangleCell(cell, current.len()).into());
        }
        triangles.push([current[0], current[1], current[2]]);
        current.clear();
    }

    Ok(Surface::new(points, triangles)?)
}

fn write_byu(path: &Path, surf: &Surface) -> Result<(), SurfaceIoError> {
    let mut w = BufWriter::new(File::create(path)?);

    let (nv, nt) = (surf.n_points(), surf.n_triangles());
    writeln!(w, "{} {} {} {}", 1, nv, nt, 3 * nt)?;
    writeln!(w, "{} {}", 1, nt)?;
    for p in surf.points() {
        writeln!(w, "{:e} {:e} {:e}", p.x, p.y, p.z)?;
    }
    for &[a, b, c] in surf.triangles() {
        writeln!(w, "{} {} -{}", a + 1, b + 1, c + 1)?;
    }
    Ok(())
}

/// legacy VTK polydata (ASCII), 仅 `POINTS` / `POLYGONS` 两个段.
fn read_vtk(path: &Path) -> Result<Surface, SurfaceIoError> {
    let content = std::fs::read_to_string(path)?;
    let mut tok = content.split_whitespace().peekable();

    let mut points: Option<Vec<Point3<f64>>> = None;
    let mut triangles: Option<Vec<[usize; 3]>> = None;

    while let Some(t) = tok.next() {
        match t {
            "POINTS" => {
                let n: usize = parse_num(tok.next(), "point count")?;
                let _data_type = tok
                    .next()
                    .ok_or_else(|| malformed("missing POINTS data type"))?;
                let mut pts = Vec::with_capacity(n);
                for _ in 0..n {
                    let x: f64 = parse_num(tok.next(), "x coordinate")?;
                    let y: f64 = parse_num(tok.next(), "y coordinate")?;
                    let z: f64 = parse_num(tok.next(), "z coordinate")?;
                    pts.push(Point3::new(x, y, z));
                }
                points = Some(pts);
            }
            "POLYGONS" => {
                let n: usize = parse_num(tok.next(), "polygon count")?;
                let _total: usize = parse_num(tok.next(), "connectivity length")?;
                let mut tris = Vec::with_capacity(n);
                for cell in 0..n {
                    let n_vertices: usize = parse_num(tok.next(), "cell vertex count")?;
                    if n_vertices != 3 {
                        return Err(SurfaceError::NonTriangleCell(cell, n_vertices).into());
                    }
                    let a: usize = parse_num(tok.next(), "vertex index")?;
                    let b: usize = parse_num(tok.next(), "vertex index")?;
                    let c: usize = parse_num(tok.next(), "vertex index")?;
                    tris.push([a, b, c]);
                }
                triangles = Some(tris);
            }
            _ => {}
        }
    }

    let points = points.ok_or_else(|| malformed("VTK file has no POINTS section"))?;
    let triangles = triangles.unwrap_or_default();
    Ok(Surface::new(points, triangles)?)
}

fn write_vtk(path: &Path, surf: &Surface) -> Result<(), SurfaceIoError> {
    let mut w = BufWriter::new(File::create(path)?);

    writeln!(w, "# vtk DataFile Version 3.0")?;
    writeln!(w, "vali-berry surface")?;
    writeln!(w, "ASCII")?;
    writeln!(w, "DATASET POLYDATA")?;

    writeln!(w, "POINTS {} double", surf.n_points())?;
    for p in surf.points() {
        writeln!(w, "{:e} {:e} {:e}", p.x, p.y, p.z)?;
    }

    let nt = surf.n_triangles();
    writeln!(w, "POLYGONS {} {}", nt, 4 * nt)?;
    for &[a, b, c] in surf.triangles() {
        writeln!(w, "3 {a} {b} {c}")?;
    }
    Ok(())
}

/// PLY: 读取经 `ply-rs` 解析器, 接受 ASCII 与二进制; 写出为 ASCII.
fn read_ply(path: &Path) -> Result<Surface, SurfaceIoError> {
    let mut reader = BufReader::new(File::open(path)?);
    let parser = Parser::<DefaultElement>::new();

    let header = parser
        .read_header(&mut reader)
        .map_err(|e| malformed(format!("PLY header failure: {e}")))?;
    let payload = parser
        .read_payload(&mut reader, &header)
        .map_err(|e| malformed(format!("PLY payload failure: {e}")))?;

    let mut points = Vec::new();
    if let Some(vertices) = payload.get("vertex") {
        points.reserve(vertices.len());
        for v in vertices {
            let x = ply_float(v, "x")?;
            let y = ply_float(v, "y")?;
            let z = ply_float(v, "z")?;
            points.push(Point3::new(x, y, z));
        }
    }

    let mut triangles = Vec::new();
    if let Some(faces) = payload.get("face") {
        triangles.reserve(faces.len());
        for (cell, f) in faces.iter().enumerate() {
            let indices = ply_index_list(f);
            if indices.len() != 3 {
                return Err(SurfaceError::NonTriangleCell(cell, indices.len()).into());
            }
            triangles.push([indices[0], indices[1], indices[2]]);
        }
    }

    Ok(Surface::new(points, triangles)?)
}

fn ply_float(element: &DefaultElement, key: &str) -> Result<f64, SurfaceIoError> {
    match element.get(key) {
        Some(Property::Float(v)) => Ok(f64::from(*v)),
        Some(Property::Double(v)) => Ok(*v),
        _ => Err(malformed(format!("PLY vertex missing float property {key:?}"))),
    }
}

fn ply_index_list(element: &DefaultElement) -> Vec<usize> {
    for key in ["vertex_indices", "vertex_index"] {
        match element.get(key) {
            Some(Property::ListInt(v)) => return v.iter().map(|&i| i as usize).collect(),
            Some(Property::ListUInt(v)) => return v.iter().map(|&i| i as usize).collect(),
            Some(Property::ListUChar(v)) => return v.iter().map(|&i| usize::from(i)).collect(),
            Some(Property::ListUShort(v)) => return v.iter().map(|&i| usize::from(i)).collect(),
            _ => continue,
        }
    }
    Vec::new()
}

fn write_ply(path: &Path, surf: &Surface) -> Result<(), SurfaceIoError> {
    let mut w = BufWriter::new(File::create(path)?);

    writeln!(w, "ply")?;
    writeln!(w, "format ascii 1.0")?;
    writeln!(w, "element vertex {}", surf.n_points())?;
    writeln!(w, "property double x")?;
    writeln!(w, "property double y")?;
    writeln!(w, "property double z")?;
    writeln!(w, "element face {}", surf.n_triangles())?;
    writeln!(w, "property list uchar int vertex_indices")?;
    writeln!(w, "end_header")?;

    for p in surf.points() {
        writeln!(w, "{:e} {:e} {:e}", p.x, p.y, p.z)?;
    }
    for &[a, b, c] in surf.triangles() {
        writeln!(w, "3 {a} {b} {c}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn tmp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("vali-berry-{}-{}", std::process::id(), name))
    }

    fn tetrahedron() -> Surface {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ];
        let tris = vec![[0, 2, 1], [0, 1, 3], [0, 3, 2], [1, 2, 3]];
        Surface::new(points, tris).unwrap()
    }

    fn assert_same_surface(a: &Surface, b: &Surface) {
        assert_eq!(a.n_points(), b.n_points());
        assert_eq!(a.triangles(), b.triangles());
        for (p, q) in a.points().iter().zip(b.points()) {
            assert!((p - q).norm() < 1e-12);
        }
    }

    /// VTK / BYU / PLY 写出再读回, 表面不变.
    #[test]
    fn test_roundtrip_writers() {
        let surf = tetrahedron();
        for ext in ["vtk", "byu", "ply"] {
            let path = tmp_path(&format!("roundtrip.{ext}"));
            write_surface(&path, &surf).unwrap();
            let back = read_surface(&path).unwrap();
            assert_same_surface(&surf, &back);
            std::fs::remove_file(&path).ok();
        }
    }

    /// OFF 方言解析: 面片行带前导顶点个数.
    #[test]
    fn test_read_off_dialect() {
        let path = tmp_path("dialect.off");
        std::fs::write(
            &path,
            "OFF\n3 1 0\n0 0 0\n1 0 0\n0 1 0\n3 0 1 2\n",
        )
        .unwrap();
        let surf = read_surface(&path).unwrap();
        assert_eq!(surf.n_points(), 3);
        assert_eq!(surf.triangles(), &[[0, 1, 2]]);
        std::fs::remove_file(&path).ok();
    }

    /// ASC 方言解析: 无前导个数, 行尾带 0.
    #[test]
    fn test_read_asc_dialect() {
        let path = tmp_path("dialect.asc");
        std::fs::write(
            &path,
            "#!ascii\n3 1\n0 0 0 0\n1 0 0 0\n0 1 0 0\n0 1 2 0\n",
        )
        .unwrap();
        let surf = read_surface(&path).unwrap();
        assert_eq!(surf.n_points(), 3);
        assert_eq!(surf.triangles(), &[[0, 1, 2]]);
        std::fs::remove_file(&path).ok();
    }

    /// 非三角形面片是硬错误.
    #[test]
    fn test_non_triangle_rejected() {
        let path = tmp_path("quad.off");
        std::fs::write(
            &path,
            "OFF\n4 1 0\n0 0 0\n1 0 0\n1 1 0\n0 1 0\n4 0 1 2 3\n",
        )
        .unwrap();
        match read_surface(&path).unwrap_err() {
            SurfaceIoError::Surface(SurfaceError::NonTriangleCell(0, 4)) => {}
            other => panic!("unexpected error: {other:?}"),
        }
        std::fs::remove_file(&path).ok();
    }

    /// 未知扩展名既不读也不写.
    #[test]
    fn test_unknown_extension_rejected() {
        let surf = tetrahedron();
        assert!(matches!(
            read_surface("mesh.stl").unwrap_err(),
            SurfaceIoError::UnknownExtension(_)
        ));
        assert!(matches!(
            write_surface("mesh.obj", &surf).unwrap_err(),
            SurfaceIoError::UnknownExtension(_)
        ));
    }
}
