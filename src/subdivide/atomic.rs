//! Atomic `f32` accumulation for the scatter kernels.
//!
//! Scatter kernels have many halfedges adding into the same vertex
//! point concurrently. There is no native atomic float on stable Rust,
//! so accumulation runs as a compare-exchange loop over the bit pattern
//! of the 32-bit float. Ordering is `Relaxed` throughout: float addition
//! commutes, no ordering between contributions is needed, and the kernel
//! boundary (rayon's join) publishes the results.

use std::sync::atomic::{AtomicU32, Ordering};

use nalgebra::Point3;

/// An `f32` with atomic add, stored as its bit pattern.
#[repr(transparent)]
pub struct AtomicF32(AtomicU32);

impl AtomicF32 {
    /// Add `value` atomically, returning the previous value.
    #[inline]
    pub fn fetch_add(&self, value: f32) -> f32 {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (f32::from_bits(current) + value).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(previous) => return f32::from_bits(previous),
                Err(actual) => current = actual,
            }
        }
    }

    /// Read the current value.
    #[inline]
    pub fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }
}

/// View a point slice as a flat slice of atomic floats for a scatter pass.
///
/// The mutable borrow guarantees exclusive access for the lifetime of the
/// view, so promoting the components to atomics cannot race with plain
/// accesses.
pub fn as_atomics(points: &mut [Point3<f32>]) -> &[AtomicF32] {
    // Safety: Point3<f32> is a repr(C) wrapper around three contiguous
    // f32 components, and AtomicF32 is repr(transparent) over AtomicU32,
    // which matches f32 in size and alignment.
    unsafe {
        std::slice::from_raw_parts(points.as_mut_ptr().cast::<AtomicF32>(), points.len() * 3)
    }
}

/// Atomically add `value` to vertex point `vertex` of an atomic view.
#[inline]
pub fn add_point(points: &[AtomicF32], vertex: i32, value: nalgebra::Vector3<f32>) {
    let base = vertex as usize * 3;
    points[base].fetch_add(value.x);
    points[base + 1].fetch_add(value.y);
    points[base + 2].fetch_add(value.z);
}
