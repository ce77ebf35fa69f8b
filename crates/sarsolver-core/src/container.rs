//! Data containers — geometry-bound complex buffers
//!
//! A [`DataContainer`] pairs an exclusively owned buffer with a shared,
//! read-only geometry. Every assignment is shape-checked against the geometry;
//! nothing is coerced.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use sarsolver_core::container::DataContainer;
//! use sarsolver_core::coordinates::Vec3;
//! use sarsolver_core::geometry::{Geometry, GridGeometry};
//! use sarsolver_core::types::{Complex, SarError};
//!
//! let grid = Arc::new(GridGeometry::new(Vec3::ZERO, [2, 3, 1], [1.0; 3]).unwrap());
//! let mut scene = grid.allocate();
//! assert_eq!(scene.shape(), vec![2, 3, 1]);
//!
//! let err = scene.set_array(&[3, 2, 1], vec![Complex::new(1.0, 0.0); 6]).unwrap_err();
//! assert!(matches!(err, SarError::ShapeMismatch { .. }));
//! ```

use std::sync::Arc;

use crate::geometry::{Geometry, GridGeometry, MeasurementGeometry};
use crate::types::{Complex, SarError, SarResult};

/// Scene-shaped container (voxel reflectivities).
pub type SceneContainer = DataContainer<GridGeometry>;

/// Measurement-shaped container (phase history).
pub type MeasurementContainer = DataContainer<MeasurementGeometry>;

/// Complex buffer bound to exactly one geometry.
#[derive(Debug, Clone)]
pub struct DataContainer<G: Geometry> {
    geometry: Arc<G>,
    values: Vec<Complex>,
}

impl<G: Geometry> DataContainer<G> {
    /// Zero-filled buffer matching the geometry's shape.
    pub fn zeros(geometry: Arc<G>) -> Self {
        let values = vec![Complex::new(0.0, 0.0); geometry.len()];
        Self { geometry, values }
    }

    /// Container filled from row-major `values` declared with `shape`.
    pub fn from_array(geometry: Arc<G>, shape: &[usize], values: Vec<Complex>) -> SarResult<Self> {
        let mut container = Self::zeros(geometry);
        container.set_array(shape, values)?;
        Ok(container)
    }

    /// Container whose value at each flat index is `f(index)`.
    pub fn from_fn(geometry: Arc<G>, f: impl FnMut(usize) -> Complex) -> Self {
        let values = (0..geometry.len()).map(f).collect();
        Self { geometry, values }
    }

    /// Replace the buffer, failing if `shape` or the value count differ from the geometry.
    pub fn set_array(&mut self, shape: &[usize], values: Vec<Complex>) -> SarResult<()> {
        let expected = self.geometry.shape();
        if shape != expected.as_slice() {
            return Err(SarError::shape_mismatch(&expected, shape));
        }
        if values.len() != self.values.len() {
            return Err(SarError::shape_mismatch(&[self.values.len()], &[values.len()]));
        }
        self.values = values;
        Ok(())
    }

    pub fn geometry(&self) -> &Arc<G> {
        &self.geometry
    }

    pub fn shape(&self) -> Vec<usize> {
        self.geometry.shape()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[Complex] {
        &self.values
    }

    pub fn as_mut_slice(&mut self) -> &mut [Complex] {
        &mut self.values
    }

    pub fn into_vec(self) -> Vec<Complex> {
        self.values
    }

    pub fn get(&self, index: usize) -> Option<Complex> {
        self.values.get(index).copied()
    }

    pub fn fill(&mut self, value: Complex) {
        self.values.fill(value);
    }

    pub fn map_inplace(&mut self, f: impl FnMut(&mut Complex)) {
        self.values.iter_mut().for_each(f);
    }

    /// Fail unless `other` is bound to the same geometry as `self`.
    pub fn check_compatible(&self, other: &Self) -> SarResult<()> {
        other.check_geometry(&self.geometry)
    }

    /// Fail unless this container is bound to `geometry`.
    ///
    /// Every binding failure is [`SarError::ShapeMismatch`], including two
    /// geometries that share a shape but differ in placement or spacing; the
    /// shapes reported are then equal.
    pub fn check_geometry(&self, geometry: &Arc<G>) -> SarResult<()> {
        if Arc::ptr_eq(&self.geometry, geometry) || *self.geometry == **geometry {
            return Ok(());
        }
        Err(SarError::ShapeMismatch {
            expected: geometry.shape(),
            actual: self.geometry.shape(),
        })
    }

    /// Overwrite the values with those of `other`, keeping this buffer.
    pub fn copy_from(&mut self, other: &Self) -> SarResult<()> {
        self.check_compatible(other)?;
        self.values.copy_from_slice(&other.values);
        Ok(())
    }

    pub fn add_assign(&mut self, other: &Self) -> SarResult<()> {
        self.check_compatible(other)?;
        self.values.iter_mut().zip(&other.values).for_each(|(a, b)| *a += *b);
        Ok(())
    }

    pub fn sub_assign(&mut self, other: &Self) -> SarResult<()> {
        self.check_compatible(other)?;
        self.values.iter_mut().zip(&other.values).for_each(|(a, b)| *a -= *b);
        Ok(())
    }

    /// `self += alpha · x`
    pub fn axpy(&mut self, alpha: impl Into<Complex>, x: &Self) -> SarResult<()> {
        self.check_compatible(x)?;
        let alpha = alpha.into();
        self.values.iter_mut().zip(&x.values).for_each(|(a, b)| *a += alpha * *b);
        Ok(())
    }

    pub fn scale(&mut self, factor: impl Into<Complex>) {
        let factor = factor.into();
        self.values.iter_mut().for_each(|v| *v *= factor);
    }

    /// Inner product ⟨self, other⟩ = Σ conj(selfᵢ)·otherᵢ.
    pub fn inner(&self, other: &Self) -> SarResult<Complex> {
        self.check_compatible(other)?;
        Ok(self
            .values
            .iter()
            .zip(&other.values)
            .map(|(a, b)| a.conj() * *b)
            .sum())
    }

    pub fn norm_squared(&self) -> f64 {
        self.values.iter().map(|v| v.norm_sqr()).sum()
    }

    /// Euclidean (ℓ2) norm.
    pub fn norm(&self) -> f64 {
        self.norm_squared().sqrt()
    }

    /// Flat index of the largest-magnitude sample.
    pub fn argmax_magnitude(&self) -> Option<usize> {
        self.values
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm_sqr().total_cmp(&b.1.norm_sqr()))
            .map(|(i, _)| i)
    }

    pub fn max_magnitude(&self) -> f64 {
        self.values.iter().map(|v| v.norm()).fold(0.0, f64::max)
    }
}

impl SceneContainer {
    pub fn voxel_index(&self, flat: usize) -> [usize; 3] {
        self.geometry.voxel_index(flat)
    }

    /// Value of voxel `(i, j, k)`.
    pub fn voxel(&self, index: [usize; 3]) -> Complex {
        self.values[self.geometry.flat_index(index)]
    }

    /// Indices of the `count` strongest voxels, strongest first.
    pub fn peak_voxels(&self, count: usize) -> Vec<[usize; 3]> {
        let mut order: Vec<usize> = (0..self.values.len()).collect();
        order.sort_by(|&a, &b| self.values[b].norm_sqr().total_cmp(&self.values[a].norm_sqr()));
        order
            .into_iter()
            .take(count)
            .map(|flat| self.geometry.voxel_index(flat))
            .collect()
    }
}

impl MeasurementContainer {
    /// Frequency samples of pulse `p`.
    pub fn pulse(&self, p: usize) -> &[Complex] {
        let nf = self.geometry.num_frequencies();
        &self.values[p * nf..(p + 1) * nf]
    }
}

impl<G: Geometry> PartialEq for DataContainer<G> {
    fn eq(&self, other: &Self) -> bool {
        *self.geometry == *other.geometry && self.values == other.values
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::Vec3;

    fn grid() -> Arc<GridGeometry> {
        Arc::new(GridGeometry::new(Vec3::ZERO, [2, 3, 4], [1.0; 3]).unwrap())
    }

    fn c(re: f64, im: f64) -> Complex {
        Complex::new(re, im)
    }

    #[test]
    fn test_allocate_is_zero() {
        let scene = grid().allocate();
        assert_eq!(scene.len(), 24);
        assert_eq!(scene.norm(), 0.0);
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut scene = grid().allocate();
        let err = scene.set_array(&[4, 3, 2], vec![c(1.0, 0.0); 24]).unwrap_err();
        match err {
            SarError::ShapeMismatch { expected, actual } => {
                assert_eq!(expected, vec![2, 3, 4]);
                assert_eq!(actual, vec![4, 3, 2]);
            }
            other => panic!("unexpected error: {other}"),
        }

        // Declared shape right, value count wrong.
        let err = scene.set_array(&[2, 3, 4], vec![c(1.0, 0.0); 23]).unwrap_err();
        assert!(matches!(err, SarError::ShapeMismatch { .. }));
        assert_eq!(scene.norm(), 0.0);

        assert!(DataContainer::from_array(grid(), &[24], vec![c(0.0, 0.0); 24]).is_err());
    }

    #[test]
    fn test_arithmetic() {
        let g = grid();
        let a = DataContainer::from_fn(g.clone(), |i| c(i as f64, 1.0));
        let b = DataContainer::from_fn(g.clone(), |_| c(0.0, 2.0));

        let mut sum = a.clone();
        sum.add_assign(&b).unwrap();
        assert_eq!(sum.get(5), Some(c(5.0, 3.0)));

        sum.sub_assign(&b).unwrap();
        assert_eq!(sum, a);

        let mut y = a.clone();
        y.axpy(2.0, &b).unwrap();
        assert_eq!(y.get(0), Some(c(0.0, 5.0)));

        y.scale(c(0.0, 1.0));
        assert_eq!(y.get(0), Some(c(-5.0, 0.0)));
    }

    #[test]
    fn test_inner_product_is_conjugate_linear_in_first_argument() {
        let g = grid();
        let a = DataContainer::from_fn(g.clone(), |i| c(1.0, i as f64));
        let b = DataContainer::from_fn(g.clone(), |i| c(i as f64, -1.0));
        let ab = a.inner(&b).unwrap();
        let ba = b.inner(&a).unwrap();
        assert!((ab - ba.conj()).norm() < 1e-9);

        let aa = a.inner(&a).unwrap();
        assert!(aa.im.abs() < 1e-12);
        assert!((aa.re - a.norm_squared()).abs() < 1e-9);
    }

    #[test]
    fn test_incompatible_geometries() {
        let a = grid().allocate();
        let other = Arc::new(GridGeometry::new(Vec3::ZERO, [4, 3, 2], [1.0; 3]).unwrap());
        let b = other.allocate();
        assert!(matches!(a.inner(&b), Err(SarError::ShapeMismatch { .. })));

        let shifted = Arc::new(GridGeometry::new(Vec3::new(1.0, 0.0, 0.0), [2, 3, 4], [1.0; 3]).unwrap());
        let mut shifted_scene = shifted.allocate();
        match shifted_scene.add_assign(&a) {
            Err(SarError::ShapeMismatch { expected, actual }) => assert_eq!(expected, actual),
            other => panic!("expected shape mismatch, got {other:?}"),
        }
        assert!(matches!(shifted_scene.copy_from(&a), Err(SarError::ShapeMismatch { .. })));

        // Equal geometries behind different Arcs are compatible.
        let twin = grid().allocate();
        assert!(twin.inner(&a).is_ok());
    }

    #[test]
    fn test_copy_from_keeps_buffer() {
        let g = grid();
        let source = DataContainer::from_fn(g.clone(), |i| c(i as f64, 1.0));
        let mut target = g.allocate();
        let buffer = target.as_slice().as_ptr();
        target.copy_from(&source).unwrap();
        assert_eq!(target, source);
        assert_eq!(target.as_slice().as_ptr(), buffer);
    }

    #[test]
    fn test_peaks() {
        let g = grid();
        let mut scene = g.allocate();
        scene.as_mut_slice()[g.flat_index([1, 2, 3])] = c(0.0, 5.0);
        scene.as_mut_slice()[g.flat_index([0, 1, 0])] = c(2.0, 0.0);
        assert_eq!(scene.argmax_magnitude(), Some(g.flat_index([1, 2, 3])));
        assert_eq!(scene.peak_voxels(2), vec![[1, 2, 3], [0, 1, 0]]);
        assert_eq!(scene.voxel([0, 1, 0]), c(2.0, 0.0));
        assert!((scene.max_magnitude() - 5.0).abs() < 1e-12);
    }
}
