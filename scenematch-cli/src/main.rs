use clap::Parser;
use scenematch::{
    find_features, find_templates, FeatureConfig, FsImageStore, NmsConfig, RansacConfig,
    SurfConfig, TemplateConfig, TemplateReport,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const SCHEMA_JSON: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.schema.json"));
const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "SceneMatch CLI (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json")]
    config: PathBuf,
    /// Print the JSON schema and exit.
    #[arg(long)]
    print_schema: bool,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Enable tracing output for performance profiling.
    #[arg(long)]
    trace: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Mode {
    Features,
    #[default]
    Templates,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RansacConfigJson {
    max_iters: usize,
    reproj_threshold: f64,
    confidence: f64,
    seed: u64,
}

impl Default for RansacConfigJson {
    fn default() -> Self {
        let cfg = RansacConfig::default();
        Self {
            max_iters: cfg.max_iters,
            reproj_threshold: cfg.reproj_threshold,
            confidence: cfg.confidence,
            seed: cfg.seed,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FeatureConfigJson {
    hessian_threshold: f64,
    ratio_threshold: f32,
    octaves: usize,
    octave_layers: usize,
    extended: bool,
    upright: bool,
    parallel: bool,
    ransac: RansacConfigJson,
}

impl Default for FeatureConfigJson {
    fn default() -> Self {
        let cfg = FeatureConfig::default();
        Self {
            hessian_threshold: cfg.hessian_threshold,
            ratio_threshold: cfg.ratio_threshold,
            octaves: cfg.surf.octaves,
            octave_layers: cfg.surf.octave_layers,
            extended: cfg.surf.extended,
            upright: cfg.surf.upright,
            parallel: true,
            ransac: RansacConfigJson::default(),
        }
    }
}

impl From<FeatureConfigJson> for FeatureConfig {
    fn from(value: FeatureConfigJson) -> Self {
        Self {
            hessian_threshold: value.hessian_threshold,
            ratio_threshold: value.ratio_threshold,
            surf: SurfConfig {
                octaves: value.octaves,
                octave_layers: value.octave_layers,
                extended: value.extended,
                upright: value.upright,
            },
            ransac: RansacConfig {
                max_iters: value.ransac.max_iters,
                reproj_threshold: value.ransac.reproj_threshold,
                confidence: value.ransac.confidence,
                seed: value.ransac.seed,
            },
            parallel: value.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NmsConfigJson {
    iou_threshold: f64,
    cross_template_iou: f64,
    confidence_ratio: f64,
}

impl Default for NmsConfigJson {
    fn default() -> Self {
        let cfg = NmsConfig::default();
        Self {
            iou_threshold: cfg.iou_threshold,
            cross_template_iou: cfg.cross_template_iou,
            confidence_ratio: cfg.confidence_ratio,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TemplateConfigJson {
    method: i32,
    threshold: f64,
    parallel: bool,
    nms: Option<NmsConfigJson>,
}

impl Default for TemplateConfigJson {
    fn default() -> Self {
        let cfg = TemplateConfig::default();
        Self {
            method: cfg.metric.code(),
            threshold: cfg.threshold,
            parallel: true,
            nms: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    mode: Mode,
    scene_path: String,
    object_paths: Vec<String>,
    output_path: Option<String>,
    features: FeatureConfigJson,
    templates: TemplateConfigJson,
}

/// A box kept after cross-template suppression.
#[derive(Debug, Serialize)]
struct Detection<'a> {
    template: &'a str,
    x: usize,
    y: usize,
    width: usize,
    height: usize,
    confidence: f64,
}

#[derive(Debug, Serialize)]
struct TemplatesOutput<'a> {
    #[serde(flatten)]
    report: &'a TemplateReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    detections: Option<Vec<Detection<'a>>>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if cli.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive("scenematch=info".parse()?),
            )
            .with_target(false)
            .init();
    }

    if cli.print_schema {
        println!("{SCHEMA_JSON}");
        return Ok(());
    }
    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;
    if config.scene_path.is_empty() {
        return Err("scene_path must be set in the config".into());
    }

    let store = FsImageStore;
    let scene = Path::new(&config.scene_path);
    let json = match config.mode {
        Mode::Features => {
            let cfg = FeatureConfig::from(config.features);
            let report = find_features(&store, scene, &config.object_paths, &cfg)?;
            serde_json::to_string_pretty(&report)?
        }
        Mode::Templates => {
            let mut cfg =
                TemplateConfig::from_code(config.templates.method, config.templates.threshold)?;
            cfg.parallel = config.templates.parallel;
            let report = find_templates(&store, scene, &config.object_paths, &cfg)?;

            let detections = match config.templates.nms {
                Some(nms) => {
                    let nms = NmsConfig {
                        iou_threshold: nms.iou_threshold,
                        cross_template_iou: nms.cross_template_iou,
                        confidence_ratio: nms.confidence_ratio,
                    };
                    nms.validate()?;
                    let kept = report.suppressed(cfg.metric.polarity(), &nms);
                    tracing::info!(kept = kept.len(), "suppression done");
                    Some(
                        kept.iter()
                            .map(|b| Detection {
                                template: report.results[b.label].template(),
                                x: b.bbox.x,
                                y: b.bbox.y,
                                width: b.bbox.width,
                                height: b.bbox.height,
                                confidence: b.bbox.confidence,
                            })
                            .collect(),
                    )
                }
                None => None,
            };
            serde_json::to_string_pretty(&TemplatesOutput {
                report: &report,
                detections,
            })?
        }
    };

    match config.output_path {
        Some(path) => fs::write(path, json)?,
        None => println!("{json}"),
    }

    Ok(())
}
