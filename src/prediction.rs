//! Hook target prediction.
//!
//! Each non-attached hook searches its half of the screen for the best
//! grappleable surface. Samples are spread across the half with a bias set by
//! `side_bias_strictness`, cast as camera rays, and scored by distance, offset
//! from the half's centre, and closeness to the screen edge.

use bevy::prelude::*;

use crate::backend::GeometryProbe;
use crate::collision::ProbeHit;
use crate::config::GrappleConfig;
use crate::intent::HookSide;

/// The camera a prediction ray is cast from.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct AimView {
    /// Eye position.
    pub origin: Vec3,
    /// View rotation. Identity looks down -Z with +Y up.
    pub rotation: Quat,
    /// Vertical field of view in radians.
    pub vertical_fov: f32,
    /// Width over height.
    pub aspect: f32,
}

impl AimView {
    /// World-space direction through a normalized screen point.
    ///
    /// `(0, 0)` is the bottom-left corner and `(1, 1)` the top-right.
    pub fn ray_direction(&self, screen: Vec2) -> Vec3 {
        let half_height = (self.vertical_fov * 0.5).tan();
        let ndc = screen * 2.0 - Vec2::ONE;
        let local = Vec3::new(
            ndc.x * half_height * self.aspect,
            ndc.y * half_height,
            -1.0,
        );
        (self.rotation * local).normalize()
    }
}

/// Best hook target found for one side.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    /// Surface hit.
    pub hit: ProbeHit,
    /// Normalized horizontal screen position of the winning sample.
    pub screen_x: f32,
    /// Score of the winning sample (lower is better).
    pub score: f32,
}

impl Prediction {
    /// Anchor point a hook would attach to.
    pub fn point(&self) -> Vec3 {
        self.hit.point
    }
}

/// Screen range `(min, max)` and centre of a hook's half.
pub fn half_range(side: HookSide) -> (f32, f32, f32) {
    match side {
        HookSide::Left => (0.0, 0.5, 0.25),
        HookSide::Right => (0.5, 1.0, 0.75),
    }
}

/// Samples per side for the current body speed.
pub fn samples_per_side(config: &GrappleConfig, speed: f32) -> u32 {
    if speed > config.velocity_sample_threshold {
        config.min_samples_per_side
    } else {
        config.max_samples_per_side
    }
    .max(1)
}

/// Horizontal screen positions sampled for one side.
pub fn sample_positions(side: HookSide, count: u32, strictness: f32) -> Vec<f32> {
    let (min, max, _) = half_range(side);
    let count = count.max(1);
    (0..count)
        .map(|s| {
            let t = ((s as f32 + 0.5) / count as f32).powf(strictness);
            min.lerp(max, t)
        })
        .collect()
}

/// Score of a sample (lower is better).
pub fn score_sample(config: &GrappleConfig, side: HookSide, screen_x: f32, distance: f32) -> f32 {
    let (_, _, centre) = half_range(side);
    let half_bias = (screen_x - centre).abs() / 0.5;
    let edge_distance = screen_x.min(1.0 - screen_x) / 0.5;
    let edge_penalty = (1.0 - edge_distance).powi(3) * config.edge_penalty_weight;
    distance + half_bias * config.side_bias_strictness + edge_penalty
}

/// Search one side for the best target within `range`.
pub fn predict_side<P: GeometryProbe + ?Sized>(
    probe: &P,
    view: &AimView,
    config: &GrappleConfig,
    side: HookSide,
    range: f32,
    speed: f32,
) -> Option<Prediction> {
    let count = samples_per_side(config, speed);
    let mut best: Option<Prediction> = None;

    for screen_x in sample_positions(side, count, config.side_bias_strictness) {
        let direction = view.ray_direction(Vec2::new(screen_x, 0.5));
        let Some(hit) = probe.raycast(view.origin, direction, range, config.grappleable_layers)
        else {
            continue;
        };

        let score = score_sample(config, side, screen_x, hit.distance);
        if best.is_none_or(|b| score < b.score) {
            best = Some(Prediction {
                hit,
                screen_x,
                score,
            });
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::LayerMask;

    fn view() -> AimView {
        AimView {
            origin: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            vertical_fov: 60f32.to_radians(),
            aspect: 16.0 / 9.0,
        }
    }

    /// A plane at z = -10 that only exists for x < 0 (left of the view).
    struct LeftWall;

    impl GeometryProbe for LeftWall {
        fn raycast(
            &self,
            origin: Vec3,
            direction: Vec3,
            max_distance: f32,
            _mask: LayerMask,
        ) -> Option<ProbeHit> {
            if direction.z >= 0.0 {
                return None;
            }
            let distance = (-10.0 - origin.z) / direction.z;
            let point = origin + direction * distance;
            (point.x < 0.0 && distance <= max_distance)
                .then(|| ProbeHit::new(point, Vec3::Z, distance))
        }

        fn sphere_overlap(&self, _point: Vec3, _radius: f32, _mask: LayerMask) -> bool {
            false
        }
    }

    #[test]
    fn centre_ray_looks_forward() {
        let dir = view().ray_direction(Vec2::splat(0.5));
        assert!((dir - Vec3::NEG_Z).length() < 1e-5);
    }

    #[test]
    fn screen_edges_match_fov() {
        let dir = view().ray_direction(Vec2::new(0.5, 1.0));
        let angle = dir.angle_between(Vec3::NEG_Z);
        assert!((angle - 30f32.to_radians()).abs() < 1e-4);

        let left = view().ray_direction(Vec2::new(0.0, 0.5));
        assert!(left.x < 0.0);
    }

    #[test]
    fn rotated_view_turns_rays() {
        let view = AimView {
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            ..view()
        };
        let dir = view.ray_direction(Vec2::splat(0.5));
        assert!((dir - Vec3::NEG_X).length() < 1e-5);
    }

    #[test]
    fn samples_stay_in_their_half() {
        for x in sample_positions(HookSide::Left, 8, 2.0) {
            assert!((0.0..=0.5).contains(&x));
        }
        for x in sample_positions(HookSide::Right, 8, 2.0) {
            assert!((0.5..=1.0).contains(&x));
        }
    }

    #[test]
    fn strictness_biases_toward_half_start() {
        let positions = sample_positions(HookSide::Left, 4, 2.0);
        assert_eq!(positions.len(), 4);
        // ((0.5 / 4)^2) * 0.5
        assert!((positions[0] - 0.0078125).abs() < 1e-6);
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn fast_bodies_use_fewer_samples() {
        let config = GrappleConfig::default();
        assert_eq!(samples_per_side(&config, 0.0), config.max_samples_per_side);
        assert_eq!(samples_per_side(&config, 100.0), config.min_samples_per_side);
    }

    #[test]
    fn score_prefers_half_centre_over_edge() {
        let config = GrappleConfig::default();
        let centre = score_sample(&config, HookSide::Left, 0.25, 10.0);
        let edge = score_sample(&config, HookSide::Left, 0.01, 10.0);
        assert!(centre < edge);
        // Centre of the left half: no bias, edge penalty (1 - 0.5)^3 * weight
        assert!((centre - (10.0 + 0.125 * config.edge_penalty_weight)).abs() < 1e-4);
    }

    #[test]
    fn prediction_finds_surface_on_its_side_only() {
        let config = GrappleConfig::default();
        let left = predict_side(&LeftWall, &view(), &config, HookSide::Left, 50.0, 0.0);
        let right = predict_side(&LeftWall, &view(), &config, HookSide::Right, 50.0, 0.0);

        let left = left.unwrap();
        assert!(left.point().x < 0.0);
        assert!(left.screen_x < 0.5);
        assert!(right.is_none());
    }

    #[test]
    fn prediction_respects_range() {
        let config = GrappleConfig::default();
        let hit = predict_side(&LeftWall, &view(), &config, HookSide::Left, 5.0, 0.0);
        assert!(hit.is_none());
    }
}
