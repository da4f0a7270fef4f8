#[cfg(feature = "perf")]
use std::time::Instant;

/// Lightweight timing for the receipt pipeline.
///
/// Each stage of a render call holds one span: `normalize` and `plan` in
/// the handler, `raster` and `png_encode` inside rendering. Build with
/// `--features perf` to emit a `tracing::info!` event (target="perf") with
/// the stage name and elapsed milliseconds when the span drops; without the
/// feature the guard is a zero-sized no-op.
#[cfg(feature = "perf")]
pub struct PerfSpan {
    name: &'static str,
    start: Instant,
}

#[cfg(feature = "perf")]
impl PerfSpan {
    #[inline]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

#[cfg(feature = "perf")]
impl Drop for PerfSpan {
    fn drop(&mut self) {
        let ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::info!(target: "perf", name = self.name, ms = ms);
    }
}

#[cfg(not(feature = "perf"))]
pub struct PerfSpan;

#[cfg(not(feature = "perf"))]
impl PerfSpan {
    #[inline]
    pub fn new(_name: &'static str) -> Self {
        PerfSpan
    }
}

#[macro_export]
macro_rules! perf_scope {
    ($name:expr) => {
        $crate::perf::PerfSpan::new($name)
    };
}
