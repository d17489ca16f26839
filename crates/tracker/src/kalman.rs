use nalgebra::{SMatrix, SVector};

type State = SVector<f32, 8>;
type StateCov = SMatrix<f32, 8, 8>;
type Measurement = SVector<f32, 4>;

const STD_WEIGHT_POSITION: f32 = 1.0 / 20.0;
const STD_WEIGHT_VELOCITY: f32 = 1.0 / 160.0;
const MIN_EXTENT: f32 = 1e-5;

/// Constant-velocity Kalman filter over a box state
/// `[cx, cy, w, h, vx, vy, vw, vh]`.
///
/// Process and measurement noise scale with the current box height, so large
/// boxes tolerate proportionally larger motion between frames.
#[derive(Debug, Clone)]
pub struct ConstantVelocityBoxFilter {
    mean: State,
    covariance: StateCov,
    motion: SMatrix<f32, 8, 8>,
    observation: SMatrix<f32, 4, 8>,
}

impl ConstantVelocityBoxFilter {
    /// Initializes the filter from a first measurement `[cx, cy, w, h]` with
    /// zero velocity. `dt` is the frame interval baked into the motion model.
    pub fn new(measurement: [f32; 4], dt: f32) -> Self {
        let mut motion = SMatrix::<f32, 8, 8>::identity();
        for i in 0..4 {
            motion[(i, i + 4)] = dt;
        }
        let mut observation = SMatrix::<f32, 4, 8>::zeros();
        for i in 0..4 {
            observation[(i, i)] = 1.0;
        }

        let mut mean = State::zeros();
        for i in 0..4 {
            mean[i] = measurement[i];
        }

        let h = measurement[3].max(MIN_EXTENT);
        let mut std = State::zeros();
        for i in 0..4 {
            std[i] = 2.0 * STD_WEIGHT_POSITION * h;
            std[i + 4] = 10.0 * STD_WEIGHT_VELOCITY * h;
        }
        let covariance = StateCov::from_diagonal(&std.component_mul(&std));

        Self {
            mean,
            covariance,
            motion,
            observation,
        }
    }

    /// Advances the state one frame interval.
    pub fn predict(&mut self) {
        let h = self.mean[3].max(MIN_EXTENT);
        let mut std = State::zeros();
        for i in 0..4 {
            std[i] = STD_WEIGHT_POSITION * h;
            std[i + 4] = STD_WEIGHT_VELOCITY * h;
        }
        let process_noise = StateCov::from_diagonal(&std.component_mul(&std));

        self.mean = self.motion * self.mean;
        self.covariance = self.motion * self.covariance * self.motion.transpose() + process_noise;
    }

    /// Corrects the state with a measurement `[cx, cy, w, h]`.
    pub fn update(&mut self, measurement: [f32; 4]) {
        let h = self.mean[3].max(MIN_EXTENT);
        let mut std = Measurement::zeros();
        for i in 0..4 {
            std[i] = STD_WEIGHT_POSITION * h;
        }
        let measurement_noise = SMatrix::<f32, 4, 4>::from_diagonal(&std.component_mul(&std));

        let projected = self.observation * self.covariance * self.observation.transpose()
            + measurement_noise;
        // projected is positive definite by construction; a singular matrix
        // here means the state already collapsed, so skip the correction.
        let Some(inverse) = projected.try_inverse() else {
            return;
        };
        let gain = self.covariance * self.observation.transpose() * inverse;

        let innovation = Measurement::from(measurement) - self.observation * self.mean;
        self.mean += gain * innovation;
        self.covariance -= gain * projected * gain.transpose();
    }

    /// Current estimate as `[cx, cy, w, h]` with extents clamped positive.
    pub fn state(&self) -> [f32; 4] {
        [
            self.mean[0],
            self.mean[1],
            self.mean[2].max(MIN_EXTENT),
            self.mean[3].max(MIN_EXTENT),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stationary_box_stays_put() {
        let mut filter = ConstantVelocityBoxFilter::new([0.5, 0.5, 0.2, 0.3], 1.0);
        for _ in 0..5 {
            filter.predict();
            filter.update([0.5, 0.5, 0.2, 0.3]);
        }
        let state = filter.state();
        assert!((state[0] - 0.5).abs() < 1e-3);
        assert!((state[1] - 0.5).abs() < 1e-3);
        assert!((state[2] - 0.2).abs() < 1e-3);
        assert!((state[3] - 0.3).abs() < 1e-3);
    }

    #[test]
    fn test_velocity_learned_from_motion() {
        let mut filter = ConstantVelocityBoxFilter::new([0.1, 0.5, 0.2, 0.2], 1.0);
        for step in 1..=10 {
            filter.predict();
            filter.update([0.1 + 0.05 * step as f32, 0.5, 0.2, 0.2]);
        }
        // Prediction without a correction should keep moving right.
        let before = filter.state()[0];
        filter.predict();
        let after = filter.state()[0];
        assert!(after > before + 0.02, "after={} before={}", after, before);
    }

    #[test]
    fn test_update_pulls_toward_measurement() {
        let mut filter = ConstantVelocityBoxFilter::new([0.2, 0.2, 0.1, 0.1], 1.0);
        filter.predict();
        filter.update([0.3, 0.2, 0.1, 0.1]);
        let state = filter.state();
        assert!(state[0] > 0.2 && state[0] < 0.3);
    }
}
