//! 对多 label 标注图像施加随机形态学扰动, 生成"模拟评分者差异"数据.
//!
//! 每轮随机选取一个存在的 label, 用随机稀疏化的球形结构元膨胀或腐蚀
//! 其区域; 腐蚀去掉的体素回填到最近的幸存 label.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use vali_berry::prelude::*;

/// 形态学 label 扰动工具.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// 输入标注图像, nii 格式.
    input_volume: PathBuf,

    /// 扰动后的输出路径.
    output_volume: PathBuf,

    /// 扰动轮数, 不小于 1.
    #[arg(short = 'n', long, default_value_t = 1)]
    iterations: usize,

    /// 球形结构元半径 (体素), 不小于 1.
    #[arg(short, long, default_value_t = 1)]
    radius: usize,

    /// 随机种子. 不指定时从系统熵初始化, 每次运行结果不同.
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;
    let args = Args::parse();

    let config = PerturbConfig::new(args.iterations, args.radius)?;
    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let mut vol = LabelVolume::open(&args.input_volume)
        .with_context(|| format!("打开 {} 失败", args.input_volume.display()))?;

    let mut engine = LabelPerturbationEngine::new(config, rng);
    engine.run(&mut vol);

    vol.save(&args.output_volume)
        .with_context(|| format!("写出 {} 失败", args.output_volume.display()))?;
    log::info!("已写出 {}", args.output_volume.display());
    Ok(())
}
