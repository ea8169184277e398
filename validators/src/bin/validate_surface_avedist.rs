//! 计算 moving 表面顶点到 fixed 表面顶点集的平均最近距离, 结果写入文本文件.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vali_berry::prelude::*;

/// 平均最近距离验证工具. 该度量非对称, 兼顾两个方向时请交换参数各跑一次.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 固定侧表面 (A), 按扩展名识别格式.
    input_surface1: PathBuf,

    /// 移动侧表面 (B), 按扩展名识别格式.
    input_surface2: PathBuf,

    /// 结果输出文件.
    output_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    let args = Args::parse();

    let fixed = read_surface(&args.input_surface1)
        .with_context(|| format!("读取 {} 失败", args.input_surface1.display()))?;
    let moving = read_surface(&args.input_surface2)
        .with_context(|| format!("读取 {} 失败", args.input_surface2.display()))?;

    let value = ClosestDistanceSurfaceMetric.value(&fixed, &moving)?;
    log::info!("Average closest distance = {value}");

    let mut out = File::create(&args.output_file)
        .with_context(|| format!("创建 {} 失败", args.output_file.display()))?;
    writeln!(out, "AveDist(A,B) = {value}")?;
    Ok(())
}
