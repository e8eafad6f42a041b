//! Particle datasets
//!
//! Each step holds one 1-d array per particle quantity. The number of
//! particles may change from step to step, but every step carries the same
//! set of quantities with the same units and element types.

use crate::axes::{IterationAxis, TimeAxis};
use crate::backend::{ParticleBackend, ParticleBackendRegistry};
use crate::config::DatasetOptions;
use crate::error::{NataError, Result};
use crate::stock::{DataStock, OverlapPolicy};
use crate::types::{ArrayData, DataType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Name, label and unit of a particle quantity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityInfo {
    pub name: String,
    pub label: String,
    pub unit: String,
}

impl QuantityInfo {
    /// Describe a quantity by name, label and unit
    pub fn new(name: impl Into<String>, label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            unit: unit.into(),
        }
    }
}

/// The quantity arrays of one step, all of length `num_particles`
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleStep {
    num_particles: usize,
    columns: Vec<ArrayData>,
}

impl ParticleStep {
    /// Group per-quantity arrays; each must be 1-d and of equal length
    pub fn new(columns: Vec<ArrayData>) -> Result<Self> {
        let num_particles = columns.first().map_or(0, ArrayData::len);
        for column in &columns {
            if column.ndim() != 1 || column.len() != num_particles {
                return Err(NataError::ShapeMismatch(format!(
                    "expected a 1-d array of {} particles, got shape {:?}",
                    num_particles,
                    column.shape()
                )));
            }
        }
        Ok(Self {
            num_particles,
            columns,
        })
    }

    /// Number of particles in this step
    pub fn num_particles(&self) -> usize {
        self.num_particles
    }

    /// One array per quantity
    pub fn columns(&self) -> &[ArrayData] {
        &self.columns
    }

    /// Array of the quantity at position `index`
    pub fn column(&self, index: usize) -> Result<&ArrayData> {
        self.columns.get(index).ok_or(NataError::IndexOutOfRange {
            index,
            len: self.columns.len(),
        })
    }

    fn dtypes(&self) -> Vec<DataType> {
        self.columns.iter().map(ArrayData::dtype).collect()
    }

    fn reordered(&self, order: &[usize]) -> Self {
        Self {
            num_particles: self.num_particles,
            columns: order.iter().map(|&i| self.columns[i].clone()).collect(),
        }
    }
}

/// One step read from a particle backend, checked for internal consistency
#[derive(Debug, Clone, PartialEq)]
pub struct ParticleRecord {
    pub backend: String,
    pub location: Option<PathBuf>,
    pub name: String,
    pub iteration: u64,
    pub time: f64,
    pub time_unit: String,
    pub quantities: Vec<QuantityInfo>,
    pub data: ParticleStep,
}

impl ParticleRecord {
    /// Read and validate one backend step
    pub fn from_backend(backend: &dyn ParticleBackend) -> Result<Self> {
        let name = backend.name().to_string();
        let names = backend.quantity_names();
        let labels = backend.quantity_labels();
        let units = backend.quantity_units();

        if labels.len() != names.len() || units.len() != names.len() {
            return Err(NataError::invalid_backend(
                name,
                format!(
                    "{} names, {} labels and {} units given",
                    names.len(),
                    labels.len(),
                    units.len()
                ),
            ));
        }

        if let Some((index, duplicate)) = names
            .iter()
            .enumerate()
            .find(|(index, n)| names[..*index].contains(*n))
        {
            return Err(NataError::invalid_backend(
                name,
                format!("quantity '{}' given twice (position {})", duplicate, index),
            ));
        }

        let time = backend.time_step();
        if !time.is_finite() {
            return Err(NataError::invalid_backend(name, "time step is not finite"));
        }

        let columns = backend.dataset()?;
        if columns.len() != names.len() {
            return Err(NataError::invalid_backend(
                name,
                format!("{} arrays given for {} quantities", columns.len(), names.len()),
            ));
        }
        let num_particles = backend.num_particles();
        if let Some(column) = columns.iter().find(|c| c.shape() != &[num_particles][..]) {
            return Err(NataError::invalid_backend(
                name,
                format!(
                    "quantity array of shape {:?} does not hold {} particles",
                    column.shape(),
                    num_particles
                ),
            ));
        }

        let quantities = names
            .into_iter()
            .zip(labels)
            .zip(units)
            .map(|((name, label), unit)| QuantityInfo { name, label, unit })
            .collect();

        Ok(Self {
            location: backend.location().map(Path::to_path_buf),
            name: backend.dataset_name(),
            iteration: backend.iteration(),
            time,
            time_unit: backend.time_unit(),
            quantities,
            data: ParticleStep::new(columns)?,
            backend: name,
        })
    }
}

/// A time series of particle steps sharing the same quantities
#[derive(Debug)]
pub struct ParticleDataset {
    id: Uuid,
    backend: Option<String>,
    location: Option<PathBuf>,
    name: String,
    iteration: IterationAxis,
    time: TimeAxis,
    quantities: Vec<QuantityInfo>,
    dtypes: Vec<DataType>,
    data: DataStock<ParticleStep>,
    step: Option<u64>,
    options: DatasetOptions,
}

impl ParticleDataset {
    /// Wrap one backend step; the new dataset has that step selected
    pub fn from_backend(backend: &dyn ParticleBackend) -> Result<Self> {
        let record = ParticleRecord::from_backend(backend)?;
        Ok(Self::from_record(record))
    }

    /// Build a single-step dataset from a validated record
    pub fn from_record(record: ParticleRecord) -> Self {
        let iteration = record.iteration;
        tracing::debug!(
            backend = %record.backend,
            species = %record.name,
            iteration,
            particles = record.data.num_particles(),
            "particle dataset created from backend"
        );

        Self {
            id: Uuid::new_v4(),
            backend: Some(record.backend),
            location: record.location,
            name: record.name,
            iteration: IterationAxis::from_iteration(iteration),
            time: TimeAxis::from_time(iteration, record.time, record.time_unit),
            quantities: record.quantities,
            dtypes: record.data.dtypes(),
            data: DataStock::single(iteration, record.data),
            step: Some(iteration),
            options: DatasetOptions::default(),
        }
    }

    /// Detect the backend for `source` and wrap the step it holds
    pub fn open(source: impl AsRef<Path>, registry: &ParticleBackendRegistry) -> Result<Self> {
        let backend = registry.open(source.as_ref())?;
        Self::from_backend(backend.as_ref())
    }

    /// Open every source and append them into one dataset
    pub fn open_many<P: AsRef<Path>>(
        sources: impl IntoIterator<Item = P>,
        registry: &ParticleBackendRegistry,
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

    /// Build a single-step dataset from named quantity arrays
    pub fn from_quantities(
        name: impl Into<String>,
        quantities: Vec<(QuantityInfo, ArrayData)>,
        iteration: u64,
        time: f64,
    ) -> Result<Self> {
        let (infos, columns): (Vec<_>, Vec<_>) = quantities.into_iter().unzip();
        for (index, info) in infos.iter().enumerate() {
            if infos[..index].iter().any(|other| other.name == info.name) {
                return Err(NataError::IncompatibleQuantity(format!(
                    "quantity '{}' given twice",
                    info.name
                )));
            }
        }
        let step = ParticleStep::new(columns)?;
        let options = DatasetOptions::default();

        Ok(Self {
            id: Uuid::new_v4(),
            backend: None,
            location: None,
            name: name.into(),
            iteration: IterationAxis::from_iteration(iteration),
            time: TimeAxis::from_time(iteration, time, options.default_time_unit.clone()),
            quantities: infos,
            dtypes: step.dtypes(),
            data: DataStock::single(iteration, step),
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

    /// Species name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Iteration number of every held step
    pub fn iteration(&self) -> &IterationAxis {
        &self.iteration
    }

    /// Simulation time of every held step
    pub fn time(&self) -> &TimeAxis {
        &self.time
    }

    /// Name, label and unit of each quantity
    pub fn quantities(&self) -> &[QuantityInfo] {
        &self.quantities
    }

    /// Quantity names in column order
    pub fn quantity_names(&self) -> Vec<&str> {
        self.quantities.iter().map(|q| q.name.as_str()).collect()
    }

    /// Element type of each quantity
    pub fn dtypes(&self) -> &[DataType] {
        &self.dtypes
    }

    /// Options used by `append`
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

    /// Steps exposed by the current selection
    pub fn data(&self) -> Result<Vec<&ParticleStep>> {
        match self.step {
            Some(iteration) => Ok(vec![self.data.get(iteration)?]),
            None => Ok(self.data.values().collect()),
        }
    }

    /// Particle columns stored for `iteration`
    pub fn step_data(&self, iteration: u64) -> Result<&ParticleStep> {
        self.data.get(iteration)
    }

    /// Particle count of the selected step, or of every step
    pub fn num_particles(&self) -> Result<Vec<usize>> {
        Ok(self
            .data()?
            .into_iter()
            .map(ParticleStep::num_particles)
            .collect())
    }

    /// Arrays of quantity `name` for the selected step, or for every step
    pub fn quantity(&self, name: &str) -> Result<Vec<&ArrayData>> {
        let index = self.quantity_index(name)?;
        self.data()?
            .into_iter()
            .map(|step| step.column(index))
            .collect()
    }

    fn quantity_index(&self, name: &str) -> Result<usize> {
        self.quantities
            .iter()
            .position(|q| q.name == name)
            .ok_or_else(|| NataError::IncompatibleQuantity(format!("unknown quantity '{}'", name)))
    }

    /// Replace stored steps
    ///
    /// With a step selected, `steps` must hold exactly one entry replacing
    /// that step; otherwise one entry per held step.
    pub fn set_data(&mut self, steps: Vec<ParticleStep>) -> Result<()> {
        for step in &steps {
            if step.dtypes() != self.dtypes {
                return Err(NataError::IncompatibleQuantity(format!(
                    "expected quantity types {:?}, got {:?}",
                    self.dtypes,
                    step.dtypes()
                )));
            }
        }

        match self.step {
            Some(iteration) => {
                let [step]: [ParticleStep; 1] = steps.try_into().map_err(|steps: Vec<_>| {
                    NataError::ShapeMismatch(format!(
                        "expected 1 step for the selected iteration, got {}",
                        steps.len()
                    ))
                })?;
                self.data.replace(iteration, step)?;
            }
            None => {
                if steps.len() != self.len() {
                    return Err(NataError::ShapeMismatch(format!(
                        "expected {} steps, got {}",
                        self.len(),
                        steps.len()
                    )));
                }
                self.data =
                    DataStock::from_entries(self.iteration.iterations().iter().copied().zip(steps))?;
            }
        }
        Ok(())
    }

    /// Position in `other` of each of our quantities
    ///
    /// Succeeds only for a one-to-one mapping between the two quantity sets.
    fn column_order(&self, other: &ParticleDataset) -> Result<Vec<usize>> {
        if self.quantities.len() != other.quantities.len() {
            return Err(NataError::IncompatibleQuantity(format!(
                "quantity sets differ ({:?} vs {:?})",
                self.quantity_names(),
                other.quantity_names()
            )));
        }
        let mut order = Vec::with_capacity(self.quantities.len());
        for (quantity, dtype) in self.quantities.iter().zip(&self.dtypes) {
            let index = other
                .quantities
                .iter()
                .position(|q| q.name == quantity.name)
                .ok_or_else(|| {
                    NataError::IncompatibleQuantity(format!(
                        "quantity '{}' missing from appended dataset",
                        quantity.name
                    ))
                })?;
            if other.quantities[index].unit != quantity.unit {
                return Err(NataError::IncompatibleQuantity(format!(
                    "unit of '{}' differs ('{}' vs '{}')",
                    quantity.name, quantity.unit, other.quantities[index].unit
                )));
            }
            if other.dtypes[index] != *dtype {
                return Err(NataError::IncompatibleQuantity(format!(
                    "type of '{}' differs ({} vs {})",
                    quantity.name, dtype, other.dtypes[index]
                )));
            }
            if order.contains(&index) {
                return Err(NataError::IncompatibleQuantity(format!(
                    "quantity '{}' matched more than once",
                    quantity.name
                )));
            }
            order.push(index);
        }
        Ok(order)
    }

    /// Validate an append of `other` without modifying anything
    pub fn check_append(&self, other: &ParticleDataset, policy: OverlapPolicy) -> Result<()> {
        if self.name != other.name {
            return Err(NataError::IncompatibleQuantity(format!(
                "cannot append species '{}' to '{}'",
                other.name, self.name
            )));
        }
        self.column_order(other)?;
        self.time.check_merge(&other.time, policy)?;
        self.iteration.check_merge(&other.iteration, policy)?;
        self.data.check_merge(&other.data, policy)
    }

    /// Append every step of `other` using the configured overlap policy
    pub fn append(&mut self, other: &ParticleDataset) -> Result<()> {
        self.append_with(other, self.options.overlap)
    }

    /// Append every step of `other`; all-or-nothing, clears the step selection
    pub fn append_with(&mut self, other: &ParticleDataset, policy: OverlapPolicy) -> Result<()> {
        self.check_append(other, policy)?;
        let order = self.column_order(other)?;

        let mut iteration = self.iteration.clone();
        iteration.merge(&other.iteration, policy)?;
        let mut time = self.time.clone();
        time.merge(&other.time, policy)?;

        let mut incoming = DataStock::new();
        for (it, step) in other.data.iter() {
            incoming.insert(it, step.reordered(&order))?;
        }
        self.data.merge(incoming, policy)?;

        self.iteration = iteration;
        self.time = time;
        self.step = None;

        tracing::debug!(
            species = %self.name,
            appended = other.len(),
            steps = self.len(),
            "appended particle steps"
        );
        Ok(())
    }

    /// Append several datasets in order, stopping at the first failure
    pub fn extend<'a>(
        &mut self,
        others: impl IntoIterator<Item = &'a ParticleDataset>,
    ) -> Result<()> {
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
    pub fn get(&self, index: usize) -> Result<ParticleStepView<'_>> {
        let iteration = self.iteration.iteration_at(index)?;
        Ok(ParticleStepView {
            dataset: self,
            index,
            iteration,
            time: *self.time.get(index)?,
            data: self.data.get(iteration)?,
        })
    }

    /// View of the step holding `iteration`
    pub fn at(&self, iteration: u64) -> Result<ParticleStepView<'_>> {
        let index = self
            .iteration
            .position(iteration)
            .ok_or(NataError::KeyNotFound(iteration))?;
        self.get(index)
    }

    /// Step views in ascending iteration order
    pub fn steps(&self) -> ParticleSteps<'_> {
        ParticleSteps {
            dataset: self,
            index: 0,
        }
    }

    /// `(iteration, view)` pairs in ascending iteration order
    pub fn iter(&self) -> impl Iterator<Item = (u64, ParticleStepView<'_>)> + '_ {
        self.steps().map(|step| (step.iteration(), step))
    }
}

impl Clone for ParticleDataset {
    fn clone(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            backend: self.backend.clone(),
            location: self.location.clone(),
            name: self.name.clone(),
            iteration: self.iteration.clone(),
            time: self.time.clone(),
            quantities: self.quantities.clone(),
            dtypes: self.dtypes.clone(),
            data: self.data.clone(),
            step: self.step,
            options: self.options.clone(),
        }
    }
}

impl PartialEq for ParticleDataset {
    fn eq(&self, other: &Self) -> bool {
        self.backend == other.backend
            && self.location == other.location
            && self.name == other.name
            && self.iteration == other.iteration
            && self.time == other.time
            && self.quantities == other.quantities
            && self.dtypes == other.dtypes
            && self.data == other.data
    }
}

/// Read-only view of one step of a [`ParticleDataset`]
#[derive(Debug, Clone, Copy)]
pub struct ParticleStepView<'a> {
    dataset: &'a ParticleDataset,
    index: usize,
    iteration: u64,
    time: f64,
    data: &'a ParticleStep,
}

impl<'a> ParticleStepView<'a> {
    /// The dataset this view belongs to
    pub fn dataset(&self) -> &'a ParticleDataset {
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

    /// Particle columns of this step
    pub fn data(&self) -> &'a ParticleStep {
        self.data
    }

    /// Number of particles in this step
    pub fn num_particles(&self) -> usize {
        self.data.num_particles()
    }

    /// Array of quantity `name` at this step
    pub fn quantity(&self, name: &str) -> Result<&'a ArrayData> {
        let index = self.dataset.quantity_index(name)?;
        self.data.column(index)
    }
}

/// Iterator over the steps of a [`ParticleDataset`]
#[derive(Debug, Clone)]
pub struct ParticleSteps<'a> {
    dataset: &'a ParticleDataset,
    index: usize,
}

impl<'a> Iterator for ParticleSteps<'a> {
    type Item = ParticleStepView<'a>;

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

impl ExactSizeIterator for ParticleSteps<'_> {}

impl<'a> IntoIterator for &'a ParticleDataset {
    type Item = ParticleStepView<'a>;
    type IntoIter = ParticleSteps<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps()
    }
}
