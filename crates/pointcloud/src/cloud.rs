//! In-memory point cloud and its bounds

/// Axis-aligned bounds, tracked point by point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

impl Bounds {
    /// Empty bounds: min at +inf, max at -inf
    pub fn new() -> Self {
        Self {
            min: [f64::INFINITY; 3],
            max: [f64::NEG_INFINITY; 3],
        }
    }

    pub fn update(&mut self, p: [f64; 3]) {
        for axis in 0..3 {
            self.min[axis] = self.min[axis].min(p[axis]);
            self.max[axis] = self.max[axis].max(p[axis]);
        }
    }

    pub fn merge(&mut self, other: &Bounds) {
        if other.is_empty() {
            return;
        }
        self.update(other.min);
        self.update(other.max);
    }

    pub fn is_empty(&self) -> bool {
        self.min[0] > self.max[0]
    }
}

/// Positions plus optional per-point intensity
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PointCloud {
    pub positions: Vec<[f64; 3]>,
    pub intensity: Option<Vec<f64>>,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn bounds(&self) -> Bounds {
        let mut bounds = Bounds::new();
        for p in &self.positions {
            bounds.update(*p);
        }
        bounds
    }

    /// Keep only the points at `indices`, in that order
    pub fn select(&self, indices: &[usize]) -> Self {
        Self {
            positions: indices.iter().map(|&i| self.positions[i]).collect(),
            intensity: self
                .intensity
                .as_ref()
                .map(|values| indices.iter().map(|&i| values[i]).collect()),
        }
    }

    pub fn offset_z(&mut self, dz: f64) {
        for p in &mut self.positions {
            p[2] += dz;
        }
    }

    pub fn heights(&self) -> Vec<f64> {
        self.positions.iter().map(|p| p[2]).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        let cloud = PointCloud {
            positions: vec![[1.0, -2.0, 0.5], [-1.0, 4.0, 3.0]],
            intensity: None,
        };
        let b = cloud.bounds();
        assert_eq!(b.min, [-1.0, -2.0, 0.5]);
        assert_eq!(b.max, [1.0, 4.0, 3.0]);
        assert!(Bounds::new().is_empty());
    }

    #[test]
    fn test_select_keeps_intensity_aligned() {
        let cloud = PointCloud {
            positions: vec![[0.0; 3], [1.0; 3], [2.0; 3]],
            intensity: Some(vec![10.0, 11.0, 12.0]),
        };
        let picked = cloud.select(&[2, 0]);
        assert_eq!(picked.positions, vec![[2.0; 3], [0.0; 3]]);
        assert_eq!(picked.intensity, Some(vec![12.0, 10.0]));
    }
}
