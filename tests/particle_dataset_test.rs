//! Integration tests for particle datasets built from backends

mod common;

use common::{init_tracing, CustomParticles};
use nata::{ArrayData, DataType, NataError, ParticleBackendRegistry, ParticleDataset};
use ndarray::Array1;
use std::fs;
use tempfile::TempDir;

fn electrons(iteration: u64, count: usize) -> ParticleDataset {
    ParticleDataset::from_backend(&CustomParticles::new(iteration, count)).unwrap()
}

/// A dataset built from a backend mirrors the backend's metadata
#[test]
fn test_particle_dataset_init() {
    init_tracing();
    let ds = electrons(5, 4);

    assert_eq!(ds.backend(), Some("custom_particles"));
    assert_eq!(ds.name(), "electrons");
    assert_eq!(ds.len(), 1);
    assert_eq!(ds.step(), Some(5));
    assert_eq!(ds.iteration().values(), &[5]);
    assert_eq!(ds.time().values(), &[0.5]);
    assert_eq!(ds.quantity_names(), vec!["x1", "q"]);
    assert_eq!(ds.dtypes(), &[DataType::F64, DataType::F32]);
    assert_eq!(ds.num_particles().unwrap(), vec![4]);
}

#[test]
fn test_duplicate_quantity_names_rejected() {
    let backend = CustomParticles::new(0, 3).with_quantity_names("x1", "x1");
    let err = ParticleDataset::from_backend(&backend).unwrap_err();
    assert!(matches!(err, NataError::InvalidBackend { .. }));
}

#[test]
fn test_append_requires_same_quantity_set() {
    let mut ds = electrons(0, 4);
    let before = ds.copy();
    let renamed =
        ParticleDataset::from_backend(&CustomParticles::new(1, 2).with_quantity_names("x1", "p1"))
            .unwrap();

    let err = ds.append(&renamed).unwrap_err();
    assert!(matches!(err, NataError::IncompatibleQuantity(_)));
    assert_eq!(ds, before);
}

#[test]
fn test_particle_count_varies_between_steps() {
    let mut ds = electrons(0, 4);
    ds.extend(&[electrons(20, 2), electrons(10, 7)]).unwrap();

    assert_eq!(ds.len(), 3);
    assert_eq!(ds.step(), None);
    assert_eq!(ds.iteration().values(), &[0, 10, 20]);
    assert_eq!(ds.num_particles().unwrap(), vec![4, 7, 2]);

    let charges = ds.quantity("q").unwrap();
    assert_eq!(charges.len(), 3);
    assert_eq!(charges[1], &ArrayData::from(Array1::from_elem(7, -1.0f32)));
}

#[test]
fn test_selected_step_restricts_access() {
    let mut ds = electrons(0, 4);
    ds.append(&electrons(1, 3)).unwrap();
    ds.select_step(1).unwrap();

    assert_eq!(ds.num_particles().unwrap(), vec![3]);
    assert_eq!(ds.quantity("x1").unwrap().len(), 1);
    assert!(matches!(
        ds.quantity("p1"),
        Err(NataError::IncompatibleQuantity(_))
    ));
}

#[test]
fn test_append_other_species_rejected() {
    let mut ds = electrons(0, 4);
    let before = ds.copy();
    let positrons = ParticleDataset::from_quantities(
        "positrons",
        vec![(
            nata::QuantityInfo::new("x1", "x_1", "c / \\omega_p"),
            Array1::<f64>::zeros(2).into(),
        )],
        1,
        0.1,
    )
    .unwrap();

    let err = ds.append(&positrons).unwrap_err();
    assert!(matches!(err, NataError::IncompatibleQuantity(_)));
    assert_eq!(ds, before);
}

#[test]
fn test_append_duplicate_iteration_rejected() {
    let mut ds = electrons(3, 4);
    let err = ds.append(&electrons(3, 2)).unwrap_err();
    assert!(matches!(err, NataError::DuplicateIteration(3)));
    assert_eq!(ds.num_particles().unwrap(), vec![4]);
}

#[test]
fn test_step_views() {
    let mut ds = electrons(0, 1);
    ds.extend(&[electrons(1, 2), electrons(2, 3)]).unwrap();

    let counts: Vec<(u64, usize)> = ds
        .iter()
        .map(|(iteration, view)| (iteration, view.num_particles()))
        .collect();
    assert_eq!(counts, vec![(0, 1), (1, 2), (2, 3)]);

    for view in &ds {
        assert!(std::ptr::eq(view.dataset(), &ds));
        assert_eq!(view.quantity("q").unwrap().len(), view.num_particles());
    }
    assert_eq!(ds.at(2).unwrap().index(), 2);
}

#[test]
fn test_open_detects_backend() {
    let temp_dir = TempDir::new().unwrap();
    let paths: Vec<_> = [(10u64, 5usize), (0, 3)]
        .iter()
        .map(|(iteration, count)| {
            let path = temp_dir.path().join(format!("RAW-electrons-{:06}.cpart", iteration));
            fs::write(&path, format!("{} {}", iteration, count)).unwrap();
            path
        })
        .collect();

    let mut registry = ParticleBackendRegistry::new();
    registry.register::<CustomParticles>();

    let single = ParticleDataset::open(&paths[0], &registry).unwrap();
    assert_eq!(single.location(), Some(paths[0].as_path()));
    assert_eq!(single.num_particles().unwrap(), vec![5]);

    let series = ParticleDataset::open_many(&paths, &registry).unwrap();
    assert_eq!(series.iteration().values(), &[0, 10]);
    assert_eq!(series.num_particles().unwrap(), vec![3, 5]);

    let broken = temp_dir.path().join("broken.cpart");
    fs::write(&broken, "ten").unwrap();
    assert!(matches!(
        ParticleDataset::open(&broken, &registry),
        Err(NataError::Backend(_))
    ));
    assert!(matches!(
        ParticleDataset::open(temp_dir.path(), &registry),
        Err(NataError::NoBackendFound(_))
    ));
}
