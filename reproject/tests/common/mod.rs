//! Shared fixtures for reprojection integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use approx::assert_relative_eq;
use ndarray::Array2;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use skyproj::{CelestialFrame, Projection, ProjectionError, TanProjection};

/// Field centre used by most fixtures (near the Orion nebula)
pub const FIELD_RA: f64 = 83.82;
pub const FIELD_DEC: f64 = -5.39;

/// TAN grid centred on the fixture field, `scale_deg` per pixel
pub fn tan_grid(
    shape: (usize, usize),
    scale_deg: f64,
    rotation_deg: f64,
    frame: CelestialFrame,
) -> TanProjection {
    let (rows, cols) = shape;
    let crpix = [(cols as f64 - 1.0) / 2.0, (rows as f64 - 1.0) / 2.0];
    let (lon, lat) = skyproj::convert(FIELD_RA, FIELD_DEC, CelestialFrame::Icrs, frame);
    TanProjection::from_scale(crpix, [lon, lat], scale_deg, rotation_deg, frame).unwrap()
}

/// Positive random image with a smooth gradient
pub fn random_image(shape: (usize, usize), seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn(shape, |(r, c)| {
        1.0 + 0.05 * r as f64 + 0.02 * c as f64 + rng.random_range(0.0..10.0)
    })
}

/// Compare two images, treating NaN in both as equal
pub fn assert_images_close(a: &Array2<f64>, b: &Array2<f64>, epsilon: f64) {
    assert_eq!(a.dim(), b.dim());
    for ((idx, &x), &y) in a.indexed_iter().zip(b.iter()) {
        if x.is_nan() || y.is_nan() {
            assert!(
                x.is_nan() && y.is_nan(),
                "NaN mismatch at {idx:?}: {x} vs {y}"
            );
        } else {
            assert_relative_eq!(x, y, epsilon = epsilon, max_relative = epsilon);
        }
    }
}

/// Projection wrapper that counts how often it is evaluated
#[derive(Debug)]
pub struct CountingProjection {
    pub inner: TanProjection,
    pub calls: Arc<AtomicUsize>,
}

impl CountingProjection {
    pub fn new(inner: TanProjection) -> Self {
        Self {
            inner,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Projection for CountingProjection {
    fn pix2world(&self, x: f64, y: f64) -> Result<(f64, f64), ProjectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.pix2world(x, y)
    }

    fn world2pix(&self, lon: f64, lat: f64) -> Result<(f64, f64), ProjectionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.world2pix(lon, lat)
    }

    fn frame(&self) -> CelestialFrame {
        self.inner.frame()
    }
}
