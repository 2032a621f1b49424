//! End-to-end behaviour of the reprojection engine

mod common;

use approx::assert_relative_eq;
use common::{
    assert_images_close, random_image, tan_grid, CountingProjection, FIELD_DEC, FIELD_RA,
};
use ndarray::{Array1, Array2, Array3};
use reproject::{reproject, Parallelism, ReprojectConfig, ReprojectError, Reprojector};
use skyproj::{CarProjection, CelestialFrame, TanProjection};

#[test]
fn test_partition_invariance_across_worker_counts() {
    let shape = (24, 20);
    let image = random_image(shape, 11);
    let src = tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs);
    let dst = tan_grid(shape, 0.012, 0.0, CelestialFrame::Galactic);

    let serial = reproject(&image, &src, &dst, shape, 1).unwrap();
    assert!(serial.covered_count() > 0);

    for workers in [2i64, 3, shape.1 as i64] {
        let parallel = reproject(&image, &src, &dst, shape, workers).unwrap();
        assert_images_close(&parallel.footprint, &serial.footprint, 1e-9);
        assert_images_close(&parallel.image, &serial.image, 1e-9);
    }

    let auto = reproject(&image, &src, &dst, shape, true).unwrap();
    assert_images_close(&auto.image, &serial.image, 1e-9);
}

#[test]
fn test_flux_conserved_for_contained_source() {
    let src_shape = (30, 30);
    let dst_shape = (50, 50);
    let image = random_image(src_shape, 3);
    let src = tan_grid(src_shape, 0.01, 0.0, CelestialFrame::Icrs);
    let dst = tan_grid(dst_shape, 0.01, 30.0, CelestialFrame::Icrs);

    let result = reproject(&image, &src, &dst, dst_shape, 4).unwrap();

    assert_relative_eq!(result.total_flux(), image.sum(), max_relative = 1e-4);
}

#[test]
fn test_flux_dropped_outside_destination() {
    let shape = (20, 20);
    let image = Array2::<f64>::ones(shape);
    let src = tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs);
    // Destination covers the left half of the source
    let dst = TanProjection::from_scale(
        [19.5, 9.5],
        [FIELD_RA, FIELD_DEC],
        0.01,
        0.0,
        CelestialFrame::Icrs,
    )
    .unwrap();

    let result = reproject(&image, &src, &dst, shape, 2).unwrap();

    assert_relative_eq!(result.total_flux(), 200.0, max_relative = 1e-3);
}

#[test]
fn test_footprint_bounds() {
    let src_shape = (16, 18);
    let dst_shape = (20, 20);
    let image = random_image(src_shape, 5);
    let src = tan_grid(src_shape, 0.01, 0.0, CelestialFrame::Icrs);
    let dst = TanProjection::from_scale(
        [4.0, 12.0],
        [FIELD_RA, FIELD_DEC],
        0.008,
        17.0,
        CelestialFrame::Icrs,
    )
    .unwrap();

    let result = reproject(&image, &src, &dst, dst_shape, 3).unwrap();

    let mut uncovered = 0;
    for (&weight, &value) in result.footprint.iter().zip(result.image.iter()) {
        assert!(weight >= 0.0, "negative footprint {weight}");
        assert!(weight <= 1.0 + 1e-6, "footprint above one: {weight}");
        if weight == 0.0 {
            assert!(!value.is_finite());
            uncovered += 1;
        }
    }
    assert!(uncovered > 0, "shifted grid should leave pixels uncovered");
}

#[test]
fn test_half_pixel_shift_gives_half_coverage_on_edge() {
    let shape = (10, 10);
    let image = random_image(shape, 9);
    let src = TanProjection::from_scale(
        [4.5, 4.5],
        [FIELD_RA, FIELD_DEC],
        0.01,
        0.0,
        CelestialFrame::Icrs,
    )
    .unwrap();
    let dst = TanProjection::from_scale(
        [5.0, 4.5],
        [FIELD_RA, FIELD_DEC],
        0.01,
        0.0,
        CelestialFrame::Icrs,
    )
    .unwrap();

    let result = reproject(&image, &src, &dst, shape, false).unwrap();

    for row in 0..shape.0 {
        assert_relative_eq!(result.footprint[[row, 0]], 0.5, epsilon = 1e-6);
        assert_relative_eq!(result.image[[row, 0]], image[[row, 0]], epsilon = 1e-6);
        for col in 1..shape.1 {
            assert_relative_eq!(result.footprint[[row, col]], 1.0, epsilon = 1e-6);
        }
    }
}

#[test]
fn test_identity_reprojection() {
    let shape = (15, 12);
    let image = random_image(shape, 21);
    let proj = tan_grid(shape, 0.005, 12.0, CelestialFrame::Icrs);

    for parallelism in [Parallelism::Serial, Parallelism::Workers(3)] {
        let reprojector = Reprojector::new(ReprojectConfig::with_parallelism(parallelism));
        let result = reprojector.reproject(&image, &proj, &proj, shape).unwrap();

        for (&weight, (&value, &expected)) in result
            .footprint
            .iter()
            .zip(result.image.iter().zip(image.iter()))
        {
            assert_relative_eq!(weight, 1.0, epsilon = 1e-6);
            assert_relative_eq!(value, expected, epsilon = 1e-6, max_relative = 1e-6);
        }
    }
}

#[test]
fn test_destination_outside_source_sky() {
    let shape = (8, 8);
    let image = random_image(shape, 1);
    let src = tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs);

    // Twenty degrees away, and on the opposite side of the sky
    let nearby = TanProjection::from_scale(
        [3.5, 3.5],
        [FIELD_RA + 20.0, FIELD_DEC],
        0.01,
        0.0,
        CelestialFrame::Icrs,
    )
    .unwrap();
    let antipode = TanProjection::from_scale(
        [3.5, 3.5],
        [FIELD_RA + 180.0, -FIELD_DEC],
        0.01,
        0.0,
        CelestialFrame::Icrs,
    )
    .unwrap();

    for dst in [nearby, antipode] {
        let result = reproject(&image, &src, &dst, shape, 2).unwrap();
        assert!(result.footprint.iter().all(|&w| w == 0.0));
        assert!(result.image.iter().all(|v| !v.is_finite()));
    }
}

#[test]
fn test_non_positive_concurrency_rejected_before_work() {
    let shape = (6, 6);
    let image = random_image(shape, 2);

    for workers in [0i64, -1, -8] {
        let src = CountingProjection::new(tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs));
        let dst = CountingProjection::new(tan_grid(shape, 0.01, 5.0, CelestialFrame::Icrs));

        match reproject(&image, &src, &dst, shape, workers) {
            Err(ReprojectError::InvalidConcurrency(n)) => assert_eq!(n, workers),
            other => panic!("expected InvalidConcurrency, got {other:?}"),
        }
        assert_eq!(src.calls(), 0);
        assert_eq!(dst.calls(), 0);
    }
}

#[test]
fn test_non_two_dimensional_input_rejected() {
    let proj = tan_grid((4, 4), 0.01, 0.0, CelestialFrame::Icrs);

    let cube = Array3::<f64>::zeros((3, 4, 4));
    assert!(matches!(
        reproject(&cube, &proj, &proj, (4, 4), false),
        Err(ReprojectError::UnsupportedDimensionality(3))
    ));

    let line = Array1::<f64>::zeros(4);
    assert!(matches!(
        reproject(&line, &proj, &proj, (4, 4), false),
        Err(ReprojectError::UnsupportedDimensionality(1))
    ));
}

#[test]
fn test_integer_input_matches_float_input() {
    let shape = (10, 9);
    let counts = Array2::from_shape_fn(shape, |(r, c)| (r * 100 + c * 7) as u16);
    let floats = counts.mapv(f64::from);
    let src = tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs);
    let dst = tan_grid(shape, 0.01, 40.0, CelestialFrame::Icrs);

    let from_counts = reproject(&counts, &src, &dst, shape, 2).unwrap();
    let from_floats = reproject(&floats, &src, &dst, shape, 2).unwrap();

    assert_images_close(&from_counts.image, &from_floats.image, 1e-12);
    assert_images_close(&from_counts.footprint, &from_floats.footprint, 1e-12);
}

#[test]
fn test_tan_to_galactic_car() {
    let src_shape = (20, 20);
    let image = random_image(src_shape, 8);
    let src = tan_grid(src_shape, 0.01, 0.0, CelestialFrame::Icrs);

    let (l, b) = skyproj::convert(
        FIELD_RA,
        FIELD_DEC,
        CelestialFrame::Icrs,
        CelestialFrame::Galactic,
    );
    let dst = CarProjection::new([14.5, 14.5], [l, b], [-0.01, 0.01], CelestialFrame::Galactic)
        .unwrap();

    let serial = reproject(&image, &src, &dst, (30, 30), false).unwrap();
    let parallel = reproject(&image, &src, &dst, (30, 30), 4).unwrap();

    assert!(serial.covered_count() > 0);
    assert!(serial.footprint.iter().all(|&w| (0.0..=1.0 + 1e-6).contains(&w)));
    assert_images_close(&serial.image, &parallel.image, 1e-9);
}
