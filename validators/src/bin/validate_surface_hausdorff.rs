//! 计算两个三角网格顶点集的 (分位数) Hausdorff 距离, 结果写入文本文件.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vali_berry::prelude::*;

/// Hausdorff 表面距离验证工具.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 第一个表面 (A), 按扩展名识别格式.
    input_surface1: PathBuf,

    /// 第二个表面 (B), 按扩展名识别格式.
    input_surface2: PathBuf,

    /// 结果输出文件.
    output_file: PathBuf,

    /// 分位数, 落在 [0, 1]. 1.0 即经典 Hausdorff.
    #[arg(long, default_value_t = 1.0)]
    percentile: f64,
}

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    let args = Args::parse();

    let fixed = read_surface(&args.input_surface1)
        .with_context(|| format!("读取 {} 失败", args.input_surface1.display()))?;
    let moving = read_surface(&args.input_surface2)
        .with_context(|| format!("读取 {} 失败", args.input_surface2.display()))?;

    let metric = HausdorffDistanceSurfaceMetric::new(args.percentile)?;
    let value = metric.value(&fixed, &moving)?;
    log::info!("Hausdorff distance = {value}");

    let mut out = File::create(&args.output_file)
        .with_context(|| format!("创建 {} 失败", args.output_file.display()))?;
    writeln!(out, "Hausdorff(A,B) = {value}")?;
    Ok(())
}
