//! Parallel failures are logged and the request is re-run serially

mod common;

use std::sync::{Arc, Mutex};

use common::{assert_images_close, random_image, tan_grid};
use log::{Level, LevelFilter, Log, Metadata, Record};
use reproject::{
    reproject, PartitionEvent, ReprojectConfig, ReprojectError, Reprojector, WorkerHooks,
};
use sky_math::{spherical_quad_overlap, GeometryError, Overlap, OverlapArea};
use skyproj::CelestialFrame;

/// Logger that keeps every record for inspection
struct CaptureLogger {
    records: Mutex<Vec<(Level, String)>>,
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}

fn install_logger() {
    let _ = log::set_logger(&LOGGER);
    log::set_max_level(LevelFilter::Debug);
}

fn warnings_containing(needle: &str) -> usize {
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, msg)| *level == Level::Warn && msg.contains(needle))
        .count()
}

/// Overlap primitive that fails on threads whose name starts with `prefix`,
/// or everywhere when `prefix` is `None`
struct FailsOnWorkers {
    prefix: Option<&'static str>,
}

impl OverlapArea for FailsOnWorkers {
    fn overlap(
        &self,
        a_lon: &[f64; 4],
        a_lat: &[f64; 4],
        b_lon: &[f64; 4],
        b_lat: &[f64; 4],
    ) -> Result<Overlap, GeometryError> {
        let fails = match self.prefix {
            Some(prefix) => std::thread::current()
                .name()
                .is_some_and(|name| name.starts_with(prefix)),
            None => true,
        };
        if fails {
            return Err(GeometryError::NonFiniteVertex {
                lon: f64::NAN,
                lat: f64::NAN,
            });
        }
        spherical_quad_overlap(a_lon, a_lat, b_lon, b_lat)
    }
}

#[test]
fn test_worker_panic_falls_back_to_serial() {
    install_logger();
    let shape = (12, 16);
    let image = random_image(shape, 4);
    let src = tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs);
    let dst = tan_grid(shape, 0.01, 25.0, CelestialFrame::Galactic);

    let expected = reproject(&image, &src, &dst, shape, false).unwrap();

    let hooks = WorkerHooks::new().on_partition(|event| {
        if let PartitionEvent::Started { index: 1, .. } = event {
            panic!("simulated worker crash");
        }
    });
    let reprojector = Reprojector::new(ReprojectConfig::with_parallelism(4)).with_hooks(hooks);
    let result = reprojector.reproject(&image, &src, &dst, shape).unwrap();

    assert_images_close(&result.image, &expected.image, 1e-12);
    assert_images_close(&result.footprint, &expected.footprint, 1e-12);
    assert!(warnings_containing("simulated worker crash") >= 1);
    assert!(warnings_containing("Falling back to serial") >= 1);
}

#[test]
fn test_kernel_error_on_workers_falls_back_to_serial() {
    install_logger();
    let shape = (10, 10);
    let image = random_image(shape, 6);
    let src = tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs);
    let dst = tan_grid(shape, 0.01, 10.0, CelestialFrame::Icrs);

    let expected = reproject(&image, &src, &dst, shape, false).unwrap();

    let config = ReprojectConfig {
        thread_name_prefix: "flaky".to_string(),
        ..ReprojectConfig::with_parallelism(3)
    };
    let reprojector = Reprojector::new(config).with_overlap(Arc::new(FailsOnWorkers {
        prefix: Some("flaky"),
    }));
    let result = reprojector.reproject(&image, &src, &dst, shape).unwrap();

    assert_images_close(&result.image, &expected.image, 1e-12);
    assert_images_close(&result.footprint, &expected.footprint, 1e-12);
    assert!(warnings_containing("Non-finite vertex") >= 1);
}

#[test]
fn test_serial_failure_after_fallback_propagates() {
    install_logger();
    let shape = (6, 6);
    let image = random_image(shape, 8);
    let src = tan_grid(shape, 0.01, 0.0, CelestialFrame::Icrs);

    let reprojector = Reprojector::new(ReprojectConfig::with_parallelism(2))
        .with_overlap(Arc::new(FailsOnWorkers { prefix: None }));

    match reprojector.reproject(&image, &src, &src, shape) {
        Err(ReprojectError::Geometry(GeometryError::NonFiniteVertex { .. })) => {}
        other => panic!("expected the serial error to propagate, got {other:?}"),
    }
}
