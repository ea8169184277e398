//! 计算两幅标注图像完整标签字母表上的 Cohen Kappa, 结果写入文本文件.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vali_berry::prelude::*;

/// Cohen Kappa 一致性验证工具.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 第一幅标注图像 (A), nii 格式.
    input_volume1: PathBuf,

    /// 第二幅标注图像 (B), nii 格式.
    input_volume2: PathBuf,

    /// 结果输出文件.
    output_file: PathBuf,
}

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    let args = Args::parse();

    let fixed = LabelVolume::open(&args.input_volume1)
        .with_context(|| format!("打开 {} 失败", args.input_volume1.display()))?;
    let moving = LabelVolume::open(&args.input_volume2)
        .with_context(|| format!("打开 {} 失败", args.input_volume2.display()))?;

    let kappa = CohenKappa.value(&fixed.data(), &moving.data())?;
    log::info!("Kappa = {kappa}");

    let mut out = File::create(&args.output_file)
        .with_context(|| format!("创建 {} 失败", args.output_file.display()))?;
    writeln!(out, "Kappa(A,B) = {kappa}")?;
    Ok(())
}
