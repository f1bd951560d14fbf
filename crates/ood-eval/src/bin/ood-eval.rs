use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use ood_eval::{
    append_results,
    backend::{create_device, get_backend_name, SelectedBackend},
    data::discover_images,
    load_config_file,
    metric::{DatasetKind, ScoringMethod},
    run_evaluation, run_iou, write_summary_json, EvalConfig, RecordedLogits,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "ood-eval")]
#[command(about = "Anomaly segmentation evaluation: AUPRC, FPR@95%TPR and per-class IoU")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate pixel-level anomaly detection on a benchmark
    Anomaly {
        #[command(flatten)]
        common: CommonArgs,

        /// Anomaly scoring method (msp, maxlogit, maxentropy, void)
        #[arg(long)]
        method: Option<String>,

        /// Softmax temperature for msp
        #[arg(long)]
        temperature: Option<f32>,

        /// Dataset name; recognized from the first input path when omitted
        #[arg(long)]
        dataset: Option<String>,

        /// Results log to append to
        #[arg(long)]
        results_log: Option<String>,

        /// Also write the run summary as JSON
        #[arg(long)]
        summary_json: Option<PathBuf>,
    },

    /// Evaluate per-class IoU on Cityscapes train-id labels
    Iou {
        #[command(flatten)]
        common: CommonArgs,

        /// Score the void class as well
        #[arg(long)]
        void: bool,
    },

    /// Show backend information
    Info,
}

#[derive(Args)]
struct CommonArgs {
    /// Input images or directories
    #[arg(short, long, required = true, num_args = 1..)]
    input: Vec<PathBuf>,

    /// Directory of recorded logits, one `<image stem>.mpk` per image
    #[arg(short, long)]
    logits_dir: PathBuf,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of semantic classes, void excluded
    #[arg(long)]
    num_classes: Option<usize>,

    /// Evaluation height
    #[arg(long)]
    height: Option<usize>,

    /// Evaluation width
    #[arg(long)]
    width: Option<usize>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Force the CPU device
    #[arg(long)]
    cpu: bool,
}

impl CommonArgs {
    fn load_config(&self) -> Result<EvalConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => EvalConfig::new(),
        };

        if let Some(num_classes) = self.num_classes {
            config.num_classes = num_classes;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        config.cpu |= self.cpu;

        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Anomaly {
            common,
            method,
            temperature,
            dataset,
            results_log,
            summary_json,
        } => {
            let mut config = common.load_config()?;
            if let Some(method) = method {
                config.method = method.parse::<ScoringMethod>()?;
            }
            if let Some(temperature) = temperature {
                config.temperature = temperature;
            }
            if let Some(dataset) = dataset {
                config.dataset = Some(dataset.parse::<DatasetKind>()?);
            }
            if let Some(results_log) = results_log {
                config.results_log = results_log;
            }

            let device = create_device(config.cpu);
            tracing::info!(backend = get_backend_name(), ?device, "starting evaluation");

            let images = discover_images(&common.input)?;
            let source = RecordedLogits::new(&common.logits_dir);
            let summary =
                run_evaluation::<SelectedBackend, _>(&config, &images, &source, &device)?;

            println!("\t\tAUPRC score: {:.3}", summary.auprc * 100.0);
            println!("\t\tFPR@TPR95: {:.3}", summary.fpr_at_95_tpr * 100.0);

            append_results(Path::new(&config.results_log), &summary)?;
            if let Some(path) = summary_json {
                write_summary_json(&path, &summary)?;
            }
            Ok(())
        }

        Commands::Iou { common, void } => {
            let mut config = common.load_config()?;
            if void {
                config.method = ScoringMethod::Void;
            }

            let device = create_device(config.cpu);
            tracing::info!(backend = get_backend_name(), ?device, "starting evaluation");

            let images = discover_images(&common.input)?;
            let source = RecordedLogits::new(&common.logits_dir);
            let report = run_iou::<SelectedBackend, _>(&config, &images, &source, &device)?;

            println!("Per-Class IoU:");
            for class in &report.classes {
                println!("{:6.2} {}", class.iou * 100.0, class.name);
            }
            println!("=======================================");
            println!("MEAN IoU: {:.2} %", report.mean * 100.0);
            Ok(())
        }

        Commands::Info => {
            let device = create_device(false);
            println!("OOD evaluation:");
            println!("  Backend: {}", get_backend_name());
            println!("  Device: {device:?}");
            Ok(())
        }
    }
}
