//! Backends used by the integration tests
#![allow(dead_code)]

use nata::{ArrayData, DataType, DetectBackend, GridBackend, ParticleBackend, Result};
use ndarray::Array1;
use std::path::{Path, PathBuf};

/// Install a subscriber so `RUST_LOG=nata=debug cargo test` shows library logs
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory grid step with configurable shape and axis units
#[derive(Debug, Clone)]
pub struct CustomGrid {
    value: Option<u64>,
    shape: Vec<usize>,
    dtype: DataType,
    dataset_name: String,
    axis_unit: String,
    time_unit: String,
    location: Option<PathBuf>,
}

impl CustomGrid {
    pub fn new(value: Option<u64>) -> Self {
        Self {
            value,
            shape: vec![10],
            dtype: DataType::F64,
            dataset_name: "dataset short".to_string(),
            axis_unit: "x1 units".to_string(),
            time_unit: "time unit".to_string(),
            location: None,
        }
    }

    /// Store the data as `f32` instead of `f64`
    pub fn with_single_precision(mut self) -> Self {
        self.dtype = DataType::F32;
        self
    }

    pub fn with_dataset_name(mut self, name: &str) -> Self {
        self.dataset_name = name.to_string();
        self
    }

    pub fn with_time_unit(mut self, unit: &str) -> Self {
        self.time_unit = unit.to_string();
        self
    }

    pub fn with_shape(mut self, shape: &[usize]) -> Self {
        self.shape = shape.to_vec();
        self
    }

    pub fn with_axis_unit(mut self, unit: &str) -> Self {
        self.axis_unit = unit.to_string();
        self
    }
}

impl GridBackend for CustomGrid {
    fn name(&self) -> &str {
        "custom_grid"
    }

    fn iteration(&self) -> u64 {
        self.value.unwrap_or(0)
    }

    fn time_step(&self) -> f64 {
        self.value.map_or(0.0, |v| v as f64 * 10.0)
    }

    fn time_unit(&self) -> String {
        self.time_unit.clone()
    }

    fn axes_names(&self) -> Vec<String> {
        (1..=self.shape.len()).map(|i| format!("x{}", i)).collect()
    }

    fn axes_labels(&self) -> Vec<String> {
        (1..=self.shape.len()).map(|i| format!("x_{}", i)).collect()
    }

    fn axes_units(&self) -> Vec<String> {
        vec![self.axis_unit.clone(); self.shape.len()]
    }

    fn axes_min(&self) -> Vec<f64> {
        vec![-5.0; self.shape.len()]
    }

    fn axes_max(&self) -> Vec<f64> {
        vec![5.0; self.shape.len()]
    }

    fn dataset(&self) -> Result<ArrayData> {
        let len: usize = self.shape.iter().product();
        match self.dtype {
            DataType::F32 => {
                ArrayData::from_shape_vec(&self.shape, (0..len).map(|v| v as f32).collect())
            }
            _ => ArrayData::from_shape_vec(&self.shape, (0..len).map(|v| v as f64).collect()),
        }
    }

    fn dataset_name(&self) -> String {
        self.dataset_name.clone()
    }

    fn dataset_label(&self) -> String {
        "dataset long".to_string()
    }

    fn dataset_unit(&self) -> String {
        "dataset unit".to_string()
    }

    fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn shape(&self) -> Vec<usize> {
        self.shape.clone()
    }

    fn dtype(&self) -> DataType {
        self.dtype
    }
}

/// Grid files with a `.cgrid` extension whose content is the iteration number
impl DetectBackend for CustomGrid {
    const NAME: &'static str = "custom_grid";

    fn is_valid_backend(source: &Path) -> bool {
        source.is_file() && source.extension().is_some_and(|ext| ext == "cgrid")
    }

    fn open(source: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(source)?;
        let iteration = content
            .trim()
            .parse::<u64>()
            .map_err(|e| nata::NataError::Backend(e.to_string()))?;
        Ok(Self {
            location: Some(source.to_path_buf()),
            ..Self::new(Some(iteration))
        })
    }
}

/// Backend claiming a shape that its dataset does not have
#[derive(Debug)]
pub struct LyingGrid;

impl GridBackend for LyingGrid {
    fn name(&self) -> &str {
        "lying_grid"
    }
    fn iteration(&self) -> u64 {
        0
    }
    fn time_step(&self) -> f64 {
        0.0
    }
    fn time_unit(&self) -> String {
        String::new()
    }
    fn axes_names(&self) -> Vec<String> {
        vec!["x1".to_string()]
    }
    fn axes_labels(&self) -> Vec<String> {
        vec!["x_1".to_string()]
    }
    fn axes_units(&self) -> Vec<String> {
        vec![String::new()]
    }
    fn axes_min(&self) -> Vec<f64> {
        vec![0.0]
    }
    fn axes_max(&self) -> Vec<f64> {
        vec![1.0]
    }
    fn dataset(&self) -> Result<ArrayData> {
        Ok(Array1::<f64>::zeros(3).into())
    }
    fn dataset_name(&self) -> String {
        "e1".to_string()
    }
    fn dataset_label(&self) -> String {
        "E_1".to_string()
    }
    fn dataset_unit(&self) -> String {
        String::new()
    }
    fn location(&self) -> Option<&Path> {
        None
    }
    fn shape(&self) -> Vec<usize> {
        vec![4]
    }
    fn dtype(&self) -> DataType {
        DataType::F64
    }
}

/// In-memory particle step: `count` electrons with positions and charges
#[derive(Debug, Clone)]
pub struct CustomParticles {
    iteration: u64,
    count: usize,
    names: Vec<String>,
    location: Option<PathBuf>,
}

impl CustomParticles {
    pub fn new(iteration: u64, count: usize) -> Self {
        Self {
            iteration,
            count,
            names: vec!["x1".to_string(), "q".to_string()],
            location: None,
        }
    }

    pub fn with_quantity_names(mut self, first: &str, second: &str) -> Self {
        self.names = vec![first.to_string(), second.to_string()];
        self
    }
}

impl ParticleBackend for CustomParticles {
    fn name(&self) -> &str {
        "custom_particles"
    }

    fn iteration(&self) -> u64 {
        self.iteration
    }

    fn time_step(&self) -> f64 {
        self.iteration as f64 * 0.1
    }

    fn time_unit(&self) -> String {
        "1 / \\omega_p".to_string()
    }

    fn dataset_name(&self) -> String {
        "electrons".to_string()
    }

    fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    fn num_particles(&self) -> usize {
        self.count
    }

    fn quantity_names(&self) -> Vec<String> {
        self.names.clone()
    }

    fn quantity_labels(&self) -> Vec<String> {
        vec!["x_1".to_string(), "q".to_string()]
    }

    fn quantity_units(&self) -> Vec<String> {
        vec!["c / \\omega_p".to_string(), "e".to_string()]
    }

    fn dataset(&self) -> Result<Vec<ArrayData>> {
        Ok(vec![
            Array1::linspace(0.0, 1.0, self.count).into(),
            Array1::from_elem(self.count, -1.0f32).into(),
        ])
    }
}

/// Particle files with a `.cpart` extension holding "<iteration> <count>"
impl DetectBackend for CustomParticles {
    const NAME: &'static str = "custom_particles";

    fn is_valid_backend(source: &Path) -> bool {
        source.is_file() && source.extension().is_some_and(|ext| ext == "cpart")
    }

    fn open(source: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(source)?;
        let mut fields = content.split_whitespace().map(str::parse::<u64>);
        match (fields.next(), fields.next()) {
            (Some(Ok(iteration)), Some(Ok(count))) => Ok(Self {
                location: Some(source.to_path_buf()),
                ..Self::new(iteration, count as usize)
            }),
            _ => Err(nata::NataError::Backend(format!(
                "malformed particle file: {}",
                source.display()
            ))),
        }
    }
}
