//! Grid datasets
//!
//! A [`GridRecord`] is one validated backend step. A [`GridDataset`] holds
//! any number of steps of the same grid and keeps the iteration, time and
//! spatial axes in lockstep with the stored arrays.

use crate::axes::{AxisBounds, GridAxis, IterationAxis, TimeAxis};
use crate::backend::{GridBackend, GridBackendRegistry};
use crate::config::DatasetOptions;
use crate::error::{NataError, Result};
use crate::stock::{DataStock, OverlapPolicy};
use crate::types::{ArrayData, DataType};
use crate::utils::{anonymous_axis_label, anonymous_axis_name, format_bytes};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Metadata of one spatial axis of a single step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisRecord {
    pub name: String,
    pub label: String,
    pub unit: String,
    pub bounds: AxisBounds,
}

/// One step read from a grid backend, checked for internal consistency
#[derive(Debug, Clone, PartialEq)]
pub struct GridRecord {
    pub backend: String,
    pub location: Option<PathBuf>,
    pub name: String,
    pub label: String,
    pub unit: String,
    pub iteration: u64,
    pub time: f64,
    pub time_unit: String,
    pub axes: Vec<AxisRecord>,
    pub data: ArrayData,
}

impl GridRecord {
    /// Read and validate one backend step
    ///
    /// The axis sequences must all have one entry per dimension, the raw
    /// array must match the declared shape and dtype, and every axis must
    /// have finite bounds with `min <= max`.
    pub fn from_backend(backend: &dyn GridBackend) -> Result<Self> {
        let name = backend.name().to_string();
        let shape = backend.shape();
        let dim = backend.dim();

        if dim != shape.len() {
            return Err(NataError::invalid_backend(
                name,
                format!("dim {} does not match shape {:?}", dim, shape),
            ));
        }

        let names = backend.axes_names();
        let labels = backend.axes_labels();
        let units = backend.axes_units();
        let mins = backend.axes_min();
        let maxs = backend.axes_max();

        for (field, len) in [
            ("axes_names", names.len()),
            ("axes_labels", labels.len()),
            ("axes_units", units.len()),
            ("axes_min", mins.len()),
            ("axes_max", maxs.len()),
        ] {
            if len != dim {
                return Err(NataError::invalid_backend(
                    name,
                    format!("{} has {} entries for {} dimensions", field, len, dim),
                ));
            }
        }

        let time = backend.time_step();
        if !time.is_finite() {
            return Err(NataError::invalid_backend(name, "time step is not finite"));
        }

        let data = backend.dataset()?;
        if data.shape() != shape.as_slice() {
            return Err(NataError::invalid_backend(
                name,
                format!(
                    "dataset shape {:?} does not match declared shape {:?}",
                    data.shape(),
                    shape
                ),
            ));
        }
        if data.dtype() != backend.dtype() {
            return Err(NataError::invalid_backend(
                name,
                format!(
                    "dataset dtype {} does not match declared dtype {}",
                    data.dtype(),
                    backend.dtype()
                ),
            ));
        }

        let mut axes = Vec::with_capacity(dim);
        for ((name_, label), (unit, (min, max))) in names
            .into_iter()
            .zip(labels)
            .zip(units.into_iter().zip(mins.into_iter().zip(maxs)))
        {
            let bounds = AxisBounds::new(min, max);
            if !bounds.is_valid() {
                return Err(NataError::invalid_backend(
                    name,
                    format!("axis '{}' has invalid bounds [{}, {}]", name_, min, max),
                ));
            }
            axes.push(AxisRecord {
                name: name_,
                label,
                unit,
                bounds,
            });
        }

        Ok(Self {
            backend: name,
            location: backend.location().map(Path::to_path_buf),
            name: backend.dataset_name(),
            label: backend.dataset_label(),
            unit: backend.dataset_unit(),
            iteration: backend.iteration(),
            time,
            time_unit: backend.time_unit(),
            axes,
            data,
        })
    }

    /// Shape of the step array
    pub fn grid_shape(&self) -> &[usize] {
        self.data.shape()
    }

    /// Element type of the step array
    pub fn dtype(&self) -> DataType {
        self.data.dtype()
    }
}

/// A time series of grid steps sharing shape, dtype and axis metadata
///
/// The dataset carries an optional step selector. When a step is selected,
/// [`data`](Self::data) and the step-aware accessors expose only that step;
/// otherwise they expose every held step in iteration order.
#[derive(Debug)]
pub struct GridDataset {
    id: Uuid,
    backend: Option<String>,
    location: Option<PathBuf>,
    name: String,
    label: String,
    unit: String,
    iteration: IterationAxis,
    time: TimeAxis,
    grid_shape: Vec<usize>,
    grid_dtype: DataType,
    axes: Vec<GridAxis>,
    data: DataStock<ArrayData>,
    step: Option<u64>,
    options: DatasetOptions,
}

impl GridDataset {
    /// Wrap one backend step; the new dataset has that step selected
    pub fn from_backend(backend: &dyn GridBackend) -> Result<Self> {
        let record = GridRecord::from_backend(backend)?;
        Ok(Self::from_record(record))
    }

    /// Build a single-step dataset from a validated record
    pub fn from_record(record: GridRecord) -> Self {
        let iteration = record.iteration;
        let grid_shape = record.grid_shape().to_vec();
        let axes = record
            .axes
            .into_iter()
            .zip(&grid_shape)
            .map(|(axis, &length)| {
                GridAxis::new(axis.name, axis.label, axis.unit, iteration, axis.bounds, length)
            })
            .collect();

        tracing::debug!(
            backend = %record.backend,
            dataset = %record.name,
            iteration,
            "grid dataset created from backend"
        );

        Self {
            id: Uuid::new_v4(),
            backend: Some(record.backend),
            location: record.location,
            name: record.name,
            label: record.label,
            unit: record.unit,
            iteration: IterationAxis::from_iteration(iteration),
            time: TimeAxis::from_time(iteration, record.time, record.time_unit),
            grid_shape,
            grid_dtype: record.data.dtype(),
            axes,
            data: DataStock::single(iteration, record.data),
            step: Some(iteration),
            options: DatasetOptions::default(),
        }
    }

    /// Detect the backend for `source` and wrap the step it holds
    pub fn open(source: impl AsRef<Path>, registry: &GridBackendRegistry) -> Result<Self> {
        let backend = registry.open(source.as_ref())?;
        Self::from_backend(backend.as_ref())
    }

    /// Open every source and append them into one dataset
    pub fn open_many<P: AsRef<Path>>(
        sources: impl IntoIterator<Item = P>,
        registry: &GridBackendRegistry,
    ) -> Result<Self> {
        let mut sources = sources.into_iter();
        let first = sources
            .next()
            .ok_or_else(|| NataError::Configuration("no sources given".to_string()))?;
        let mut dataset = Self::open(first, registry)?;
        for source in sources {
            dataset.append(&Self::open(source, registry)?)?;
        }
        Ok(dataset)
    }

    /// Build a dataset from a raw array with default options
    ///
    /// See [`from_array_with`](Self::from_array_with).
    pub fn from_array(
        array: impl Into<ArrayData>,
        time: Option<&[f64]>,
        iteration: Option<&[u64]>,
    ) -> Result<Self> {
        Self::from_array_with(array, time, iteration, DatasetOptions::default())
    }

    /// Build a dataset from a raw array
    ///
    /// When `time` or `iteration` is given and its length equals the leading
    /// dimension, the leading dimension is the step axis. With no labels, or a
    /// single label on only one side, the whole array is one step. When both
    /// are given they must match the leading dimension. Missing iterations
    /// count up from 0; missing times are 0.0.
    pub fn from_array_with(
        array: impl Into<ArrayData>,
        time: Option<&[f64]>,
        iteration: Option<&[u64]>,
        options: DatasetOptions,
    ) -> Result<Self> {
        let array = array.into();

        if let (Some(time), Some(iteration)) = (time, iteration) {
            if time.len() != iteration.len() {
                return Err(NataError::ShapeMismatch(format!(
                    "{} time values given for {} iterations",
                    time.len(),
                    iteration.len()
                )));
            }
        }

        let leading = array.shape().first().copied();
        let labels = time.map(<[f64]>::len).or(iteration.map(<[u64]>::len));
        let both_given = time.is_some() && iteration.is_some();
        let multi_step = match labels {
            None => false,
            Some(0) => {
                return Err(NataError::ShapeMismatch(
                    "at least one step label is required".to_string(),
                ))
            }
            Some(n) if Some(n) == leading => true,
            Some(1) if !both_given => false,
            Some(n) => {
                return Err(NataError::ShapeMismatch(format!(
                    "{} step labels given for an array of shape {:?}",
                    n,
                    array.shape()
                )))
            }
        };

        let (steps, count) = if multi_step {
            let steps = array.split_leading()?;
            let count = steps.len();
            (steps, count)
        } else {
            (vec![array], 1)
        };

        let iterations: Vec<u64> = match iteration {
            Some(iteration) => iteration.to_vec(),
            None => (0..count as u64).collect(),
        };
        let times: Vec<f64> = match time {
            Some(time) => time.to_vec(),
            None => vec![0.0; count],
        };

        let grid_shape = steps[0].shape().to_vec();
        let grid_dtype = steps[0].dtype();

        let iteration = IterationAxis::from_iterations(&iterations)?;
        let time = TimeAxis::from_entries(
            "time",
            "time",
            options.default_time_unit.clone(),
            iterations.iter().copied().zip(times),
        )?;
        let axes = grid_shape
            .iter()
            .enumerate()
            .map(|(index, &length)| {
                GridAxis::with_iterations(
                    anonymous_axis_name(&options.axis_prefix, index),
                    anonymous_axis_label(&options.axis_prefix, index),
                    "",
                    &iterations,
                    AxisBounds::new(0.0, length as f64),
                    length,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        let data = DataStock::from_entries(iterations.iter().copied().zip(steps))?;

        tracing::debug!(steps = count, shape = ?grid_shape, "grid dataset created from array");

        Ok(Self {
            id: Uuid::new_v4(),
            backend: None,
            location: None,
            name: options.default_name.clone(),
            label: options.default_label.clone(),
            unit: options.default_unit.clone(),
            iteration,
            time,
            grid_shape,
            grid_dtype,
            axes,
            data,
            step: None,
            options,
        })
    }

    /// Replace the options of this dataset
    pub fn with_options(mut self, options: DatasetOptions) -> Self {
        self.options = options;
        self
    }

    /// Identity of this object; never shared by a copy
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Name of the backend the data was read with; `None` for in-memory arrays
    pub fn backend(&self) -> Option<&str> {
        self.backend.as_deref()
    }

    /// Source of the first step, if read from a file
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }

    /// Short dataset name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Long dataset label
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Physical unit of the data
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Iteration number of every held step
    pub fn iteration(&self) -> &IterationAxis {
        &self.iteration
    }

    /// Simulation time of every held step
    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    /// Shape shared by every step
    pub fn grid_shape(&self) -> &[usize] {
        &self.grid_shape
    }

    /// Number of spatial dimensions
    pub fn grid_dim(&self) -> usize {
        self.grid_shape.len()
    }

    /// Element type shared by every step
    pub fn grid_dtype(&self) -> DataType {
        self.grid_dtype
    }

    /// Spatial axes, one per grid dimension
    pub fn axes(&self) -> &[GridAxis] {
        &self.axes
    }

    /// Spatial axis called `name`
    pub fn axis(&self, name: &str) -> Option<&GridAxis> {
        self.axes.iter().find(|axis| axis.name() == name)
    }

    /// Options used by `append` and `from_array`
    pub fn options(&self) -> &DatasetOptions {
        &self.options
    }

    /// Number of steps held
    pub fn len(&self) -> usize {
        self.iteration.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iteration.is_empty()
    }

    /// Selected iteration, if any
    pub fn step(&self) -> Option<u64> {
        self.step
    }

    /// Select the step holding `iteration`
    pub fn select_step(&mut self, iteration: u64) -> Result<()> {
        if !self.data.contains_key(iteration) {
            return Err(NataError::KeyNotFound(iteration));
        }
        self.step = Some(iteration);
        Ok(())
    }

    /// Go back to exposing every held step
    pub fn clear_step(&mut self) {
        self.step = None;
    }

    /// Iterations of the selected step, or of every step
    pub fn iteration_values(&self) -> Vec<u64> {
        match self.step {
            Some(iteration) => vec![iteration],
            None => self.iteration.iterations().to_vec(),
        }
    }

    /// Times of the selected step, or of every step
    pub fn time_values(&self) -> Vec<f64> {
        match self.step {
            Some(iteration) => self.time.value_at(iteration).copied().into_iter().collect(),
            None => self.time.values().to_vec(),
        }
    }

    /// Array of the selected step, or every step stacked along a new leading axis
    pub fn data(&self) -> Result<ArrayData> {
        match self.step {
            Some(iteration) => Ok(self.data.get(iteration)?.clone()),
            None => {
                let arrays: Vec<&ArrayData> = self.data.values().collect();
                ArrayData::stack(&arrays)
            }
        }
    }

    /// Array stored for `iteration`
    pub fn step_data(&self, iteration: u64) -> Result<&ArrayData> {
        self.data.get(iteration)
    }

    /// Replace stored arrays
    ///
    /// With a step selected, only that step is replaced and `array` must have
    /// the grid shape and dtype. Otherwise `array` must be shaped
    /// `(len, *grid_shape)` and replaces every step.
    pub fn set_data(&mut self, array: impl Into<ArrayData>) -> Result<()> {
        let array = array.into();
        match self.step {
            Some(iteration) => {
                if array.shape() != self.grid_shape.as_slice() {
                    return Err(NataError::ShapeMismatch(format!(
                        "expected shape {:?}, got {:?}",
                        self.grid_shape,
                        array.shape()
                    )));
                }
                if array.dtype() != self.grid_dtype {
                    return Err(NataError::IncompatibleGrid(format!(
                        "expected dtype {}, got {}",
                        self.grid_dtype,
                        array.dtype()
                    )));
                }
                self.data.replace(iteration, array)?;
            }
            None => {
                let mut expected = Vec::with_capacity(self.grid_dim() + 1);
                expected.push(self.len());
                expected.extend_from_slice(&self.grid_shape);
                if array.shape() != expected.as_slice() {
                    return Err(NataError::ShapeMismatch(format!(
                        "expected shape {:?}, got {:?}",
                        expected,
                        array.shape()
                    )));
                }
                let dtype = array.dtype();
                let steps = array.split_leading()?;
                self.data = DataStock::from_entries(
                    self.iteration.iterations().iter().copied().zip(steps),
                )?;
                self.grid_dtype = dtype;
            }
        }
        Ok(())
    }

    /// Validate an append of `other` without modifying anything
    pub fn check_append(&self, other: &GridDataset, policy: OverlapPolicy) -> Result<()> {
        if self.name != other.name || self.unit != other.unit {
            return Err(NataError::IncompatibleGrid(format!(
                "cannot append '{}' [{}] to '{}' [{}]",
                other.name, other.unit, self.name, self.unit
            )));
        }
        if self.grid_dim() != other.grid_dim() {
            return Err(NataError::IncompatibleGrid(format!(
                "grid dimension differs ({} vs {})",
                self.grid_dim(),
                other.grid_dim()
            )));
        }
        if self.grid_shape != other.grid_shape {
            return Err(NataError::IncompatibleGrid(format!(
                "grid shape differs ({:?} vs {:?})",
                self.grid_shape, other.grid_shape
            )));
        }
        if self.grid_dtype != other.grid_dtype {
            return Err(NataError::IncompatibleGrid(format!(
                "grid dtype differs ({} vs {})",
                self.grid_dtype, other.grid_dtype
            )));
        }
        for (axis, other_axis) in self.axes.iter().zip(&other.axes) {
            axis.check_merge(other_axis, policy)?;
        }
        self.time.check_merge(&other.time, policy)?;
        self.iteration.check_merge(&other.iteration, policy)?;
        self.data.check_merge(&other.data, policy)
    }

    /// Append every step of `other` using the configured overlap policy
    pub fn append(&mut self, other: &GridDataset) -> Result<()> {
        self.append_with(other, self.options.overlap)
    }

    /// Append every step of `other`
    ///
    /// Either every axis and the stored arrays are extended, or nothing
    /// changes. Afterwards no step is selected.
    pub fn append_with(&mut self, other: &GridDataset, policy: OverlapPolicy) -> Result<()> {
        self.check_append(other, policy)?;

        let mut iteration = self.iteration.clone();
        iteration.merge(&other.iteration, policy)?;
        let mut time = self.time.clone();
        time.merge(&other.time, policy)?;
        let mut axes = self.axes.clone();
        for (axis, other_axis) in axes.iter_mut().zip(&other.axes) {
            axis.merge(other_axis, policy)?;
        }
        self.data.merge(other.data.clone(), policy)?;

        self.iteration = iteration;
        self.time = time;
        self.axes = axes;
        self.step = None;

        tracing::debug!(
            dataset = %self.name,
            appended = other.len(),
            steps = self.len(),
            "appended grid steps"
        );
        Ok(())
    }

    /// Append several datasets in order, stopping at the first failure
    pub fn extend<'a>(&mut self, others: impl IntoIterator<Item = &'a GridDataset>) -> Result<()> {
        for other in others {
            self.append(other)?;
        }
        Ok(())
    }

    /// Independent deep copy with a fresh identity
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// View of the step at position `index`
    pub fn get(&self, index: usize) -> Result<GridStep<'_>> {
        let iteration = self.iteration.iteration_at(index)?;
        Ok(GridStep {
            dataset: self,
            index,
            iteration,
            time: *self.time.get(index)?,
            data: self.data.get(iteration)?,
        })
    }

    /// View of the step holding `iteration`
    pub fn at(&self, iteration: u64) -> Result<GridStep<'_>> {
        let index = self
            .iteration
            .position(iteration)
            .ok_or(NataError::KeyNotFound(iteration))?;
        self.get(index)
    }

    /// View of the selected step
    pub fn current(&self) -> Option<GridStep<'_>> {
        self.step.and_then(|iteration| self.at(iteration).ok())
    }

    /// Step views in ascending iteration order
    pub fn steps(&self) -> GridSteps<'_> {
        GridSteps {
            dataset: self,
            index: 0,
        }
    }

    /// `(iteration, view)` pairs in ascending iteration order
    pub fn iter(&self) -> impl Iterator<Item = (u64, GridStep<'_>)> + '_ {
        self.steps().map(|step| (step.iteration(), step))
    }

    /// Total payload size in bytes
    pub fn nbytes(&self) -> usize {
        self.data.values().map(ArrayData::nbytes).sum()
    }

    /// Serializable description of the dataset, without the arrays
    pub fn metadata(&self) -> GridMetadata {
        GridMetadata {
            backend: self.backend.clone(),
            location: self.location.clone(),
            name: self.name.clone(),
            label: self.label.clone(),
            unit: self.unit.clone(),
            iterations: self.iteration.iterations().to_vec(),
            times: self.time.values().to_vec(),
            time_unit: self.time.unit().to_string(),
            grid_shape: self.grid_shape.clone(),
            grid_dtype: self.grid_dtype,
            axes: self.axes.clone(),
        }
    }

    /// [`metadata`](Self::metadata) as pretty-printed JSON
    pub fn metadata_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.metadata())?)
    }

    /// One-line description of the dataset
    pub fn summary(&self) -> String {
        let shape = self
            .grid_shape
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" x ");

        format!(
            "{} ({}D grid {}, {}): {} steps, {}",
            self.name,
            self.grid_dim(),
            shape,
            self.grid_dtype,
            self.len(),
            format_bytes(self.nbytes())
        )
    }
}

impl Clone for GridDataset {
    fn clone(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend: self.backend.clone(),
            location: self.location.clone(),
            name: self.name.clone(),
            label: self.label.clone(),
            unit: self.unit.clone(),
            iteration: self.iteration.clone(),
            time: self.time.clone(),
            grid_shape: self.grid_shape.clone(),
            grid_dtype: self.grid_dtype,
            axes: self.axes.clone(),
            data: self.data.clone(),
            step: self.step,
            options: self.options.clone(),
        }
    }
}

/// Structural equality; identity, step selection and options are ignored
impl PartialEq for GridDataset {
    fn eq(&self, other: &Self) -> bool {
        self.backend == other.backend
            && self.location == other.location
            && self.name == other.name
            && self.label == other.label
            && self.unit == other.unit
            && self.iteration == other.iteration
            && self.time == other.time
            && self.grid_shape == other.grid_shape
            && self.grid_dtype == other.grid_dtype
            && self.axes == other.axes
            && self.data == other.data
    }
}

/// Read-only view of one step of a [`GridDataset`]
#[derive(Debug, Clone, Copy)]
pub struct GridStep<'a> {
    dataset: &'a GridDataset,
    index: usize,
    iteration: u64,
    time: f64,
    data: &'a ArrayData,
}

impl<'a> GridStep<'a> {
    /// The dataset this view belongs to
    pub fn dataset(&self) -> &'a GridDataset {
        self.dataset
    }

    /// Position of the step within the dataset
    pub fn index(&self) -> usize {
        self.index
    }

    /// Iteration number of this step
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Simulation time of this step
    pub fn time(&self) -> f64 {
        self.time
    }

    /// Array stored for this step
    pub fn data(&self) -> &'a ArrayData {
        self.data
    }

    /// Name of the owning dataset
    pub fn name(&self) -> &'a str {
        self.dataset.name()
    }

    /// Shape of the step array
    pub fn grid_shape(&self) -> &'a [usize] {
        self.dataset.grid_shape()
    }

    /// Bounds of every spatial axis at this step
    pub fn axis_bounds(&self) -> Vec<AxisBounds> {
        self.dataset
            .axes
            .iter()
            .filter_map(|axis| axis.bounds_at(self.iteration))
            .collect()
    }

    /// Cell coordinates of spatial axis `axis` at this step
    pub fn coordinates(&self, axis: usize) -> Result<Array1<f64>> {
        let grid_axis = self.dataset.axes.get(axis).ok_or(NataError::IndexOutOfRange {
            index: axis,
            len: self.dataset.axes.len(),
        })?;
        grid_axis.coordinates(self.index)
    }
}

/// Iterator over the steps of a [`GridDataset`]
#[derive(Debug, Clone)]
pub struct GridSteps<'a> {
    dataset: &'a GridDataset,
    index: usize,
}

impl<'a> Iterator for GridSteps<'a> {
    type Item = GridStep<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.dataset.get(self.index).ok()?;
        self.index += 1;
        Some(step)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dataset.len().saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridSteps<'_> {}

impl<'a> IntoIterator for &'a GridDataset {
    type Item = GridStep<'a>;
    type IntoIter = GridSteps<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps()
    }
}

/// Serializable description of a [`GridDataset`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridMetadata {
    pub backend: Option<String>,
    pub location: Option<PathBuf>,
    pub name: String,
    pub label: String,
    pub unit: String,
    pub iterations: Vec<u64>,
    pub times: Vec<f64>,
    pub time_unit: String,
    pub grid_shape: Vec<usize>,
    pub grid_dtype: DataType,
    pub axes: Vec<GridAxis>,
}
