//! 计算两个三角网格在 currents 表示下的距离, 结果写入文本文件.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vali_berry::prelude::*;

/// currents 表面距离验证工具.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 第一个表面 (A), 按扩展名识别格式.
    input_surface1: PathBuf,

    /// 第二个表面 (B), 按扩展名识别格式.
    input_surface2: PathBuf,

    /// Gaussian kernel 宽度 (毫米), 必须为正.
    kernel_width: f64,

    /// 结果输出文件.
    output_file: PathBuf,

    /// 截断求和时每个质心至少累加的配对数.
    #[arg(long, default_value_t = 1)]
    min_neighbors: usize,

    /// 使用全配对精确求和 (小网格校验用).
    #[arg(long)]
    exact: bool,
}

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    let args = Args::parse();

    let fixed = read_surface(&args.input_surface1)
        .with_context(|| format!("读取 {} 失败", args.input_surface1.display()))?;
    let moving = read_surface(&args.input_surface2)
        .with_context(|| format!("读取 {} 失败", args.input_surface2.display()))?;

    let mut metric = CurrentsMetric::new(args.kernel_width)?.with_min_neighbors(args.min_neighbors);
    if args.exact {
        metric = metric.with_evaluation(CurrentsEvaluation::Exact);
    }

    let value = metric.value(&fixed, &moving)?;
    log::info!("Currents distance = {value}");

    let mut out = File::create(&args.output_file)
        .with_context(|| format!("创建 {} 失败", args.output_file.display()))?;
    writeln!(out, "Currents(A,B|h = {}) = {value}", args.kernel_width)?;
    Ok(())
}
