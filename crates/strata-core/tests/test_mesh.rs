use approx::assert_relative_eq;
use nalgebra::Point3;

use strata_core::mesh::Mesh;
use strata_core::sim::box_mesh;
use strata_core::volume::VolumeSize;

#[test]
fn test_empty_mesh_center_falls_back_to_half_volume() {
    let mesh = Mesh::default();
    let center = mesh.estimate_center(VolumeSize::new(1.0, 2.0, 3.0), 100);
    assert_eq!(center, Point3::new(0.5, 1.0, 1.5));
}

#[test]
fn test_box_mesh_center_is_volume_center() {
    let mesh = box_mesh(VolumeSize::cube(1.0));
    // All 8 corners are sampled, so the average is the exact center.
    let center = mesh.estimate_center(VolumeSize::cube(1.0), 100);
    assert_relative_eq!(center.x, 0.5, epsilon = 1.0e-6);
    assert_relative_eq!(center.y, 0.5, epsilon = 1.0e-6);
    assert_relative_eq!(center.z, 0.5, epsilon = 1.0e-6);
}

#[test]
fn test_center_sampling_with_fewer_samples_than_vertices() {
    let positions: Vec<Point3<f32>> = (0..1000)
        .map(|i| Point3::new(i as f32, 0.0, 0.0))
        .collect();
    let mesh = Mesh::new(positions, vec![]);
    let center = mesh.estimate_center(VolumeSize::cube(0.5), 10);
    // Every 100th vertex: 0, 100, ..., 900, averaging to 450.
    assert_relative_eq!(center.x, 450.0, epsilon = 1.0e-3);
}

#[test]
fn test_write_obj_plain_geometry() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mesh.obj");

    let mesh = box_mesh(VolumeSize::cube(1.0));
    mesh.write_obj(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 8);
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 12);
    // Faces use 1-based indices.
    assert!(text.lines().any(|l| l == "f 1 3 2"));
    assert!(!text.contains("f 0"));
}

#[test]
fn test_write_obj_embeds_vertex_colors() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("colored.obj");

    let mut mesh = box_mesh(VolumeSize::cube(1.0));
    mesh.set_per_vertex_colors(vec![[1.0, 0.0, 0.0]; mesh.num_vertices()]);
    mesh.write_obj(&path).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    let first_vertex = text
        .lines()
        .find(|l| l.starts_with("v "))
        .expect("obj should contain vertices");
    // Position followed by the RGB triple.
    assert_eq!(first_vertex.split_whitespace().count(), 7);
}

#[test]
fn test_colorization_replaces_appearance_not_geometry() {
    let mut mesh = box_mesh(VolumeSize::cube(1.0));
    let positions = mesh.positions().to_vec();
    assert!(!mesh.has_per_vertex_colors());

    mesh.set_per_vertex_colors(vec![[0.2, 0.4, 0.6]; mesh.num_vertices()]);
    assert!(mesh.has_per_vertex_colors());
    assert_eq!(mesh.positions(), positions.as_slice());
}
