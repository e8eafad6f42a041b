//! Labeled per-iteration series: iteration, time and spatial grid axes

use crate::error::{NataError, Result};
use crate::stock::OverlapPolicy;
use crate::utils::{linear_coordinates, log_coordinates};
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A named, unit-tagged series holding one value per iteration
///
/// Entries are kept sorted by iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis<V> {
    name: String,
    label: String,
    unit: String,
    iterations: Vec<u64>,
    values: Vec<V>,
}

/// Iteration numbers of each held step
pub type IterationAxis = Axis<u64>;

/// Simulation time of each held step
pub type TimeAxis = Axis<f64>;

impl<V: Clone> Axis<V> {
    /// Create an empty axis
    pub fn new(name: impl Into<String>, label: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            unit: unit.into(),
            iterations: Vec::new(),
            values: Vec::new(),
        }
    }

    /// Create an axis holding a single entry
    pub fn single(
        name: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        iteration: u64,
        value: V,
    ) -> Self {
        let mut axis = Self::new(name, label, unit);
        axis.iterations.push(iteration);
        axis.values.push(value);
        axis
    }

    /// Create an axis from `(iteration, value)` pairs in any order
    pub fn from_entries(
        name: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        entries: impl IntoIterator<Item = (u64, V)>,
    ) -> Result<Self> {
        let mut axis = Self::new(name, label, unit);
        for (iteration, value) in entries {
            match axis.iterations.binary_search(&iteration) {
                Ok(_) => return Err(NataError::DuplicateIteration(iteration)),
                Err(pos) => {
                    axis.iterations.insert(pos, iteration);
                    axis.values.insert(pos, value);
                }
            }
        }
        Ok(axis)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at position `index`
    pub fn get(&self, index: usize) -> Result<&V> {
        self.values.get(index).ok_or(NataError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// Iteration registered at position `index`
    pub fn iteration_at(&self, index: usize) -> Result<u64> {
        self.iterations
            .get(index)
            .copied()
            .ok_or(NataError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Position of `iteration`, if registered
    pub fn position(&self, iteration: u64) -> Option<usize> {
        self.iterations.binary_search(&iteration).ok()
    }

    /// Value registered for `iteration`
    pub fn value_at(&self, iteration: u64) -> Option<&V> {
        self.position(iteration).map(|pos| &self.values[pos])
    }

    pub fn iterations(&self) -> &[u64] {
        &self.iterations
    }

    pub fn values(&self) -> &[V] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> {
        self.iterations.iter().copied().zip(self.values.iter())
    }

    /// Check that `other` describes the same quantity
    pub fn check_compatible(&self, other: &Self) -> Result<()> {
        if self.name != other.name {
            return Err(NataError::incompatible_axis(
                &self.name,
                format!("name differs ('{}' vs '{}')", self.name, other.name),
            ));
        }
        if self.unit != other.unit {
            return Err(NataError::incompatible_axis(
                &self.name,
                format!("unit differs ('{}' vs '{}')", self.unit, other.unit),
            ));
        }
        Ok(())
    }

    /// Validate a merge of `other` into `self` without modifying anything
    pub fn check_merge(&self, other: &Self, policy: OverlapPolicy) -> Result<()> {
        self.check_compatible(other)?;
        if policy == OverlapPolicy::Reject {
            if let Some(&iteration) = other
                .iterations
                .iter()
                .find(|it| self.position(**it).is_some())
            {
                return Err(NataError::DuplicateIteration(iteration));
            }
        }
        Ok(())
    }

    /// Insert every entry of `other`; with [`OverlapPolicy::Override`] the
    /// incoming value replaces an existing one
    pub fn merge(&mut self, other: &Self, policy: OverlapPolicy) -> Result<()> {
        self.check_merge(other, policy)?;
        for (iteration, value) in other.iter() {
            match self.iterations.binary_search(&iteration) {
                Ok(pos) => self.values[pos] = value.clone(),
                Err(pos) => {
                    self.iterations.insert(pos, iteration);
                    self.values.insert(pos, value.clone());
                }
            }
        }
        Ok(())
    }

    /// Append the entries of `other`, rejecting repeated iterations
    pub fn append(&mut self, other: &Self) -> Result<()> {
        self.merge(other, OverlapPolicy::Reject)
    }
}

impl IterationAxis {
    /// Iteration axis holding one step
    pub fn from_iteration(iteration: u64) -> Self {
        Self::single("iteration", "iteration", "", iteration, iteration)
    }

    /// Iteration axis holding the given steps
    pub fn from_iterations(iterations: &[u64]) -> Result<Self> {
        Self::from_entries(
            "iteration",
            "iteration",
            "",
            iterations.iter().map(|&it| (it, it)),
        )
    }
}

impl TimeAxis {
    /// Time axis holding one step
    pub fn from_time(iteration: u64, time: f64, unit: impl Into<String>) -> Self {
        Self::single("time", "time", unit, iteration, time)
    }
}

/// Spacing of the cells along a grid axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisType {
    #[default]
    Linear,
    Logarithmic,
}

/// Extent of a spatial axis at one iteration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_valid(&self) -> bool {
        self.min.is_finite() && self.max.is_finite() && self.min <= self.max
    }
}

/// Spatial axis of a grid: per-iteration bounds over a fixed number of cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridAxis {
    bounds: Axis<AxisBounds>,
    length: usize,
    axis_type: AxisType,
}

impl GridAxis {
    /// Create a linear grid axis holding one step
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        iteration: u64,
        bounds: AxisBounds,
        length: usize,
    ) -> Self {
        Self {
            bounds: Axis::single(name, label, unit, iteration, bounds),
            length,
            axis_type: AxisType::Linear,
        }
    }

    /// Create a linear grid axis with the same bounds at every iteration
    pub fn with_iterations(
        name: impl Into<String>,
        label: impl Into<String>,
        unit: impl Into<String>,
        iterations: &[u64],
        bounds: AxisBounds,
        length: usize,
    ) -> Result<Self> {
        Ok(Self {
            bounds: Axis::from_entries(name, label, unit, iterations.iter().map(|&it| (it, bounds)))?,
            length,
            axis_type: AxisType::Linear,
        })
    }

    /// Set the cell spacing
    pub fn with_axis_type(mut self, axis_type: AxisType) -> Self {
        self.axis_type = axis_type;
        self
    }

    pub fn name(&self) -> &str {
        self.bounds.name()
    }

    pub fn label(&self) -> &str {
        self.bounds.label()
    }

    pub fn unit(&self) -> &str {
        self.bounds.unit()
    }

    /// Number of cells along the axis
    pub fn length(&self) -> usize {
        self.length
    }

    pub fn axis_type(&self) -> AxisType {
        self.axis_type
    }

    /// Number of iterations held
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    pub fn iterations(&self) -> &[u64] {
        self.bounds.iterations()
    }

    /// Bounds at position `index`
    pub fn get(&self, index: usize) -> Result<AxisBounds> {
        self.bounds.get(index).copied()
    }

    /// Bounds registered for `iteration`
    pub fn bounds_at(&self, iteration: u64) -> Option<AxisBounds> {
        self.bounds.value_at(iteration).copied()
    }

    /// Lower bound of every held iteration
    pub fn axis_min(&self) -> Vec<f64> {
        self.bounds.values().iter().map(|b| b.min).collect()
    }

    /// Upper bound of every held iteration
    pub fn axis_max(&self) -> Vec<f64> {
        self.bounds.values().iter().map(|b| b.max).collect()
    }

    /// Cell coordinates at position `index`
    pub fn coordinates(&self, index: usize) -> Result<Array1<f64>> {
        let bounds = self.get(index)?;
        Ok(self.coordinates_for(bounds))
    }

    pub(crate) fn coordinates_for(&self, bounds: AxisBounds) -> Array1<f64> {
        match self.axis_type {
            AxisType::Linear => linear_coordinates(bounds.min, bounds.max, self.length),
            AxisType::Logarithmic => log_coordinates(bounds.min, bounds.max, self.length),
        }
    }

    /// Check that `other` describes the same spatial dimension
    pub fn check_compatible(&self, other: &Self) -> Result<()> {
        self.bounds.check_compatible(&other.bounds)?;
        if self.length != other.length {
            return Err(NataError::incompatible_axis(
                self.name(),
                format!("length differs ({} vs {})", self.length, other.length),
            ));
        }
        if self.axis_type != other.axis_type {
            return Err(NataError::incompatible_axis(
                self.name(),
                format!(
                    "axis type differs ({:?} vs {:?})",
                    self.axis_type, other.axis_type
                ),
            ));
        }
        Ok(())
    }

    /// Validate a merge of `other` into `self` without modifying anything
    pub fn check_merge(&self, other: &Self, policy: OverlapPolicy) -> Result<()> {
        self.check_compatible(other)?;
        self.bounds.check_merge(&other.bounds, policy)
    }

    pub fn merge(&mut self, other: &Self, policy: OverlapPolicy) -> Result<()> {
        self.check_merge(other, policy)?;
        self.bounds.merge(&other.bounds, policy)
    }

    pub fn append(&mut self, other: &Self) -> Result<()> {
        self.merge(other, OverlapPolicy::Reject)
    }
}
