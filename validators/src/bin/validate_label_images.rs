//! 两幅多 label 标注图像的综合验证报告, 打印到标准输出.
//!
//! 对 `1..=max_label` 的每个 label 分别二值化并计算五种重叠度量,
//! 最后在完整标签字母表上给出 Cohen Kappa.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use vali_berry::prelude::*;

/// 多 label 标注综合验证工具.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 固定侧标注图像 (A), nii 格式.
    fixed: PathBuf,

    /// 移动侧标注图像 (B), nii 格式.
    moving: PathBuf,
}

fn report_batch<M: ImageMetric>(
    name: &str,
    metric: &M,
    fixed: &LabelVolume,
    moving: &LabelVolume,
) -> anyhow::Result<()> {
    println!("\n===");
    for (label, value) in BinaryMetricBatch::evaluate(metric, fixed, moving)? {
        println!("{name}(A_{label}, B_{label}) = {value}");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    let args = Args::parse();

    let fixed = LabelVolume::open(&args.fixed)
        .with_context(|| format!("打开 {} 失败", args.fixed.display()))?;
    let moving = LabelVolume::open(&args.moving)
        .with_context(|| format!("打开 {} 失败", args.moving.display()))?;

    report_batch("Dice", &DiceCoefficient, &fixed, &moving)?;
    report_batch("Jaccard", &JaccardCoefficient, &fixed, &moving)?;
    report_batch("Specificity", &Specificity, &fixed, &moving)?;
    report_batch("Sensitivity", &Sensitivity, &fixed, &moving)?;
    report_batch("PPV", &PositivePredictiveValue, &fixed, &moving)?;

    println!("\n===");
    let kappa = CohenKappa.value(&fixed.data(), &moving.data())?;
    println!("Kappa(A,B) = {kappa}");
    Ok(())
}
