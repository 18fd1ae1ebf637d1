use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::detect::{ClassList, DecoderConfig, ModelResolution};
use crate::focus::{AutofocusConfig, BLOCK_SIZE};
use crate::ingest::CameraConfig;

const DEFAULT_MODEL_SIZE: u32 = 160;
const DEFAULT_CLASS_COUNT: usize = 80;
const DEFAULT_OBJECTNESS_THRESHOLD: f32 = 0.45;
const DEFAULT_CLASS_SCORE_THRESHOLD: f32 = 0.5;
const DEFAULT_NMS_SCORE_THRESHOLD: f32 = 0.5;
const DEFAULT_NMS_OVERLAP_THRESHOLD: f32 = 0.45;
const DEFAULT_TRIGGER_CLASS: usize = 0;
const DEFAULT_CAMERA_URL: &str = "stub://camera";
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_LENS_INITIAL_POSITION: f32 = 0.0;
const DEFAULT_LENS_STEP: f32 = 0.1;

#[derive(Debug, Deserialize, Default)]
struct FocusdConfigFile {
    model: Option<ModelConfigFile>,
    camera: Option<CameraConfigFile>,
    autofocus: Option<AutofocusConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct ModelConfigFile {
    path: Option<PathBuf>,
    class_list: Option<PathBuf>,
    width: Option<u32>,
    height: Option<u32>,
    class_count: Option<usize>,
    objectness_threshold: Option<f32>,
    class_score_threshold: Option<f32>,
    nms_score_threshold: Option<f32>,
    nms_overlap_threshold: Option<f32>,
    trigger_classes: Option<Vec<usize>>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    url: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct AutofocusConfigFile {
    initial_position: Option<f32>,
    step: Option<f32>,
}

#[derive(Debug, Clone)]
pub struct FocusdConfig {
    pub model: ModelSettings,
    pub camera: CameraSettings,
    pub autofocus: AutofocusConfig,
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    /// ONNX model file; `None` selects the stub backend.
    pub path: Option<PathBuf>,
    pub class_list: Option<PathBuf>,
    pub classes: Option<ClassList>,
    pub width: u32,
    pub height: u32,
    pub class_count: usize,
    pub objectness_threshold: f32,
    pub class_score_threshold: f32,
    pub nms_score_threshold: f32,
    pub nms_overlap_threshold: f32,
    pub trigger_classes: Vec<usize>,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub url: String,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl FocusdConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("FOCUS_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: FocusdConfigFile) -> Self {
        let model = file.model.unwrap_or_default();
        let camera = file.camera.unwrap_or_default();
        let autofocus = file.autofocus.unwrap_or_default();
        Self {
            model: ModelSettings {
                path: model.path,
                class_list: model.class_list,
                classes: None,
                width: model.width.unwrap_or(DEFAULT_MODEL_SIZE),
                height: model.height.unwrap_or(DEFAULT_MODEL_SIZE),
                class_count: model.class_count.unwrap_or(DEFAULT_CLASS_COUNT),
                objectness_threshold: model
                    .objectness_threshold
                    .unwrap_or(DEFAULT_OBJECTNESS_THRESHOLD),
                class_score_threshold: model
                    .class_score_threshold
                    .unwrap_or(DEFAULT_CLASS_SCORE_THRESHOLD),
                nms_score_threshold: model
                    .nms_score_threshold
                    .unwrap_or(DEFAULT_NMS_SCORE_THRESHOLD),
                nms_overlap_threshold: model
                    .nms_overlap_threshold
                    .unwrap_or(DEFAULT_NMS_OVERLAP_THRESHOLD),
                trigger_classes: model
                    .trigger_classes
                    .unwrap_or_else(|| vec![DEFAULT_TRIGGER_CLASS]),
            },
            camera: CameraSettings {
                url: camera.url.unwrap_or_else(|| DEFAULT_CAMERA_URL.to_string()),
                width: camera.width.unwrap_or(DEFAULT_CAMERA_WIDTH),
                height: camera.height.unwrap_or(DEFAULT_CAMERA_HEIGHT),
                target_fps: camera.target_fps.unwrap_or(DEFAULT_CAMERA_FPS),
            },
            autofocus: AutofocusConfig {
                initial_position: autofocus
                    .initial_position
                    .unwrap_or(DEFAULT_LENS_INITIAL_POSITION),
                step: autofocus.step.unwrap_or(DEFAULT_LENS_STEP),
            },
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("FOCUS_CAMERA_URL") {
            if !url.trim().is_empty() {
                self.camera.url = url;
            }
        }
        if let Ok(path) = std::env::var("FOCUS_MODEL_PATH") {
            if !path.trim().is_empty() {
                self.model.path = Some(PathBuf::from(path));
            }
        }
        if let Ok(classes) = std::env::var("FOCUS_TRIGGER_CLASSES") {
            let parsed = split_csv(&classes)
                .into_iter()
                .map(|entry| {
                    entry.parse::<usize>().map_err(|_| {
                        anyhow!("FOCUS_TRIGGER_CLASSES must be a comma-separated list of class ids")
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            if !parsed.is_empty() {
                self.model.trigger_classes = parsed;
            }
        }
        if let Ok(step) = std::env::var("FOCUS_LENS_STEP") {
            self.autofocus.step = step
                .trim()
                .parse()
                .map_err(|_| anyhow!("FOCUS_LENS_STEP must be a number"))?;
        }
        Ok(())
    }

    fn validate(&mut self) -> Result<()> {
        ModelResolution::from_dims(self.model.width, self.model.height)?;

        if let Some(path) = &self.model.class_list {
            let classes = ClassList::load(path)?;
            self.model.class_count = classes.len();
            self.model.classes = Some(classes);
        }
        if self.model.class_count == 0 {
            return Err(anyhow!("model class_count must be at least 1"));
        }
        if self.model.trigger_classes.is_empty() {
            return Err(anyhow!("at least one trigger class is required"));
        }
        // Threshold and trigger-class ranges are checked by the decoder.
        crate::detect::DetectionDecoder::new(self.decoder_config())?;

        let block = BLOCK_SIZE as u32;
        if self.camera.width == 0
            || self.camera.height == 0
            || self.camera.width % block != 0
            || self.camera.height % block != 0
        {
            return Err(anyhow!(
                "camera size {}x{} must be a non-zero multiple of {}",
                self.camera.width,
                self.camera.height,
                BLOCK_SIZE
            ));
        }
        if self.camera.target_fps == 0 {
            return Err(anyhow!("camera target_fps must be greater than zero"));
        }
        if !self.autofocus.step.is_finite() || self.autofocus.step <= 0.0 {
            return Err(anyhow!("autofocus step must be a positive number"));
        }
        if !self.autofocus.initial_position.is_finite() {
            return Err(anyhow!("autofocus initial_position must be finite"));
        }
        Ok(())
    }

    pub fn decoder_config(&self) -> DecoderConfig {
        DecoderConfig {
            model_width: self.model.width,
            model_height: self.model.height,
            class_count: self.model.class_count,
            objectness_threshold: self.model.objectness_threshold,
            class_score_threshold: self.model.class_score_threshold,
            nms_score_threshold: self.model.nms_score_threshold,
            nms_overlap_threshold: self.model.nms_overlap_threshold,
            trigger_classes: self.model.trigger_classes.clone(),
        }
    }

    pub fn camera_config(&self) -> CameraConfig {
        CameraConfig {
            url: self.camera.url.clone(),
            width: self.camera.width,
            height: self.camera.height,
        }
    }
}

fn read_config_file(path: &Path) -> Result<FocusdConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(|entry| entry.to_string())
        .collect()
}
