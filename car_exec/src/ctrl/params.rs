//! Parameters structure for the control cascade

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use sense_if::tc::Scene;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Gains of one PID loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
}

/// One scene's whole gain/base-speed record. Loaded and saved as a unit.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Gains of both wheel speed loops.
    pub speed: PidGains,

    /// Gains of the steering loop.
    pub steer: PidGains,

    /// Base speed of the scene, in meters per second.
    pub base_speed_ms: f64,
}

/// Parameters for the control cascade.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Params {
    // ---- GEOMETRY ----
    /// Wheelbase of the vehicle, in meters.
    pub wheelbase_m: f64,

    /// Track width of the vehicle (wheel to wheel), in meters.
    pub track_width_m: f64,

    /// Encoder pulses per meter of travel.
    pub pulses_per_meter: f64,

    /// Control tick period, in seconds.
    pub tick_period_s: f64,

    // ---- CAPABILITIES ----
    /// Maximum magnitude of the drive duty output.
    pub max_duty: f64,

    /// Maximum magnitude of the steering angle output, in degrees.
    pub max_steer_angle_deg: f64,

    /// Steering angles whose tangent magnitude falls below this guard use a
    /// symmetric speed split.
    pub tan_guard: f64,

    // ---- OBSTACLE AVOIDANCE ----
    /// Steer angle magnitude while turning out and returning, in degrees.
    pub avoid_angle_deg: f64,

    /// Distance of the turn-out leg, in meters.
    pub avoid_distance_m: f64,

    /// Speed while avoiding, in meters per second.
    pub avoid_speed_ms: f64,

    // ---- SCENES ----
    pub scene_normal: SceneConfig,
    pub scene_straight: SceneConfig,
    pub scene_curve: SceneConfig,
    pub scene_circle: SceneConfig,
    pub scene_ramp: SceneConfig,
    pub scene_obstacle: SceneConfig,
    pub scene_parking: SceneConfig,
    pub scene_debug: SceneConfig,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            speed: PidGains {
                kp: 3000.0,
                ki: 50.0,
                kd: 100.0,
            },
            steer: PidGains {
                kp: 0.45,
                ki: 0.0,
                kd: 0.8,
            },
            base_speed_ms: 1.2,
        }
    }
}

impl Default for Params {
    fn default() -> Self {
        let normal = SceneConfig::default();

        Self {
            wheelbase_m: 0.2,
            track_width_m: 0.16,
            pulses_per_meter: 5000.0,
            tick_period_s: 0.01,
            max_duty: 8000.0,
            max_steer_angle_deg: 45.0,
            tan_guard: 0.001,
            avoid_angle_deg: 25.0,
            avoid_distance_m: 0.3,
            avoid_speed_ms: 0.5,
            scene_normal: normal,
            scene_straight: SceneConfig {
                base_speed_ms: normal.base_speed_ms * 1.2,
                ..normal
            },
            scene_curve: SceneConfig {
                steer: PidGains {
                    kp: 0.6,
                    ki: 0.01,
                    kd: 1.2,
                },
                base_speed_ms: normal.base_speed_ms * 0.8,
                ..normal
            },
            scene_circle: SceneConfig {
                base_speed_ms: normal.base_speed_ms * 0.7,
                ..normal
            },
            scene_ramp: SceneConfig {
                base_speed_ms: normal.base_speed_ms * 1.3,
                ..normal
            },
            scene_obstacle: SceneConfig {
                base_speed_ms: normal.base_speed_ms * 0.6,
                ..normal
            },
            scene_parking: SceneConfig {
                base_speed_ms: normal.base_speed_ms * 0.5,
                ..normal
            },
            scene_debug: normal,
        }
    }
}

impl Params {
    /// The whole record of a scene.
    pub fn scene_config(&self, scene: Scene) -> &SceneConfig {
        match scene {
            Scene::Normal => &self.scene_normal,
            Scene::Straight => &self.scene_straight,
            Scene::Curve => &self.scene_curve,
            Scene::Circle => &self.scene_circle,
            Scene::Ramp => &self.scene_ramp,
            Scene::Obstacle => &self.scene_obstacle,
            Scene::Parking => &self.scene_parking,
            Scene::Debug => &self.scene_debug,
        }
    }

    /// Overwrite the whole record of a scene.
    pub fn set_scene_config(&mut self, scene: Scene, config: SceneConfig) {
        let slot = match scene {
            Scene::Normal => &mut self.scene_normal,
            Scene::Straight => &mut self.scene_straight,
            Scene::Curve => &mut self.scene_curve,
            Scene::Circle => &mut self.scene_circle,
            Scene::Ramp => &mut self.scene_ramp,
            Scene::Obstacle => &mut self.scene_obstacle,
            Scene::Parking => &mut self.scene_parking,
            Scene::Debug => &mut self.scene_debug,
        };
        *slot = config;
    }
}
