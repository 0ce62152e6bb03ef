/// Camera for terminal frames
/// Yaw/pitch orientation with a projection that accounts for tall cells
use glam::{Mat4, Quat, Vec3};

/// Width of a terminal cell relative to its height.
pub const CELL_ASPECT: f32 = 0.5;

pub struct Camera {
    pub position: Vec3,
    pub yaw: f32,   // Rotation around Y axis (radians)
    pub pitch: f32, // Rotation around X axis (radians)
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    /// Columns divided by rows.
    pub aspect_ratio: f32,
}

impl Camera {
    pub fn new(position: Vec3, aspect_ratio: f32) -> Self {
        Self {
            position,
            yaw: 0.0,
            pitch: 0.0,
            fov: 70.0f32.to_radians(),
            near: 0.1,
            far: 1000.0,
            aspect_ratio,
        }
    }

    /// Camera sized for a `columns` x `rows` terminal frame.
    pub fn for_frame(position: Vec3, columns: usize, rows: usize) -> Self {
        let mut camera = Self::new(position, 1.0);
        camera.set_frame_size(columns, rows);
        camera
    }

    /// Turn to face `target`.
    pub fn look_at(&mut self, target: Vec3) {
        let dir = (target - self.position).normalize_or_zero();
        if dir == Vec3::ZERO {
            return;
        }
        self.yaw = (-dir.x).atan2(-dir.z);
        self.pitch = dir.y.clamp(-1.0, 1.0).asin();
    }

    /// Get view matrix
    pub fn view_matrix(&self) -> Mat4 {
        let rotation = self.rotation_quat();
        let forward = rotation * Vec3::NEG_Z;
        let target = self.position + forward;
        let up = rotation * Vec3::Y;

        Mat4::look_at_rh(self.position, target, up)
    }

    /// Perspective projection with NDC y pointing down the terminal rows.
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::from_scale(Vec3::new(1.0, -1.0, 1.0))
            * Mat4::perspective_rh(self.fov, self.aspect_ratio * CELL_ASPECT, self.near, self.far)
    }

    /// Get combined view-projection matrix
    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Get forward direction vector
    pub fn forward(&self) -> Vec3 {
        self.rotation_quat() * Vec3::NEG_Z
    }

    /// Get rotation quaternion
    fn rotation_quat(&self) -> Quat {
        Quat::from_rotation_y(self.yaw) * Quat::from_rotation_x(self.pitch)
    }

    /// Update aspect ratio (call when the terminal resizes)
    pub fn set_aspect_ratio(&mut self, aspect_ratio: f32) {
        self.aspect_ratio = aspect_ratio;
    }

    pub fn set_frame_size(&mut self, columns: usize, rows: usize) {
        self.set_aspect_ratio(columns.max(1) as f32 / rows.max(1) as f32);
    }
}
