//! Constant-velocity Kalman filter over (cx, cy, aspect, h) box state.

use nalgebra::{SMatrix, SVector};

/// (cx, cy, a, h, vx, vy, va, vh)
pub type StateVector = SVector<f64, 8>;
pub type StateCovariance = SMatrix<f64, 8, 8>;
type Measurement = SVector<f64, 4>;
type MeasurementCovariance = SMatrix<f64, 4, 4>;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: StateCovariance,
    update_mat: SMatrix<f64, 4, 8>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = StateCovariance::identity();
        let mut update_mat = SMatrix::<f64, 4, 8>::zeros();
        for i in 0..4 {
            motion_mat[(i, 4 + i)] = 1.0;
            update_mat[(i, i)] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Start a track from an unassociated XYAH measurement with zero velocity.
    pub fn initiate(&self, measurement: [f64; 4]) -> (StateVector, StateCovariance) {
        let mut mean = StateVector::zeros();
        mean.fixed_rows_mut::<4>(0)
            .copy_from(&Measurement::from_column_slice(&measurement));

        let h = measurement[3];
        let pos = 2.0 * self.std_weight_position * h;
        let vel = 10.0 * self.std_weight_velocity * h;
        let std = StateVector::from_column_slice(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);

        (mean, StateCovariance::from_diagonal(&std.component_mul(&std)))
    }

    pub fn predict(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
    ) -> (StateVector, StateCovariance) {
        let h = mean[3];
        let pos = self.std_weight_position * h;
        let vel = self.std_weight_velocity * h;
        let std = StateVector::from_column_slice(&[pos, pos, 1e-2, pos, vel, vel, 1e-5, vel]);
        let motion_cov = StateCovariance::from_diagonal(&std.component_mul(&std));

        let mean = self.motion_mat * mean;
        let covariance = self.motion_mat * covariance * self.motion_mat.transpose() + motion_cov;
        (mean, covariance)
    }

    /// Project the state into measurement space.
    fn project(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
    ) -> (Measurement, MeasurementCovariance) {
        let h = mean[3];
        let pos = self.std_weight_position * h;
        let std = Measurement::from_column_slice(&[pos, pos, 1e-1, pos]);
        let innovation_cov = MeasurementCovariance::from_diagonal(&std.component_mul(&std));

        (
            self.update_mat * mean,
            self.update_mat * covariance * self.update_mat.transpose() + innovation_cov,
        )
    }

    /// Correct the state with an XYAH measurement.
    ///
    /// If the innovation covariance is singular the prior is returned unchanged.
    pub fn update(
        &self,
        mean: &StateVector,
        covariance: &StateCovariance,
        measurement: [f64; 4],
    ) -> (StateVector, StateCovariance) {
        let (projected_mean, projected_cov) = self.project(mean, covariance);
        let Some(projected_inv) = projected_cov.try_inverse() else {
            return (*mean, *covariance);
        };

        let innovation = Measurement::from_column_slice(&measurement) - projected_mean;
        let kalman_gain = covariance * self.update_mat.transpose() * projected_inv;

        (
            mean + kalman_gain * innovation,
            covariance - kalman_gain * projected_cov * kalman_gain.transpose(),
        )
    }
}
