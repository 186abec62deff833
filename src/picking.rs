//! Ray picking against entity colliders.
//!
//! - [`Ray`]: origin plus direction, built from normalized device coordinates
//! - [`Collider`]: box or sphere shape in the entity's local space
//! - [`RayHit`]: the entity, world-space point, and distance of a hit
//!
//! Colliders are tested in object space: the ray is carried through the
//! inverse world matrix, so rotated and scaled objects (a spinning cube, a
//! hover-scaled window) pick exactly where they render. Distances are still
//! reported in world units.
//!
//! [`raycast_all`] only considers the entities it is handed. Nothing outside
//! the candidate list is ever tested.

use glam::{Mat4, Vec2, Vec3, Vec4};
use hecs::{Entity, World};

use crate::ecs::world_matrix;

/// A ray in 3D space, used for raycasting and picking.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    /// Create a ray. The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    /// Ray through a point in normalized device coordinates (-1..1, y up).
    pub fn from_ndc(ndc: Vec2, view: Mat4, projection: Mat4) -> Self {
        let inv_view_proj = (projection * view).inverse();

        // wgpu clip space: depth 0 is the near plane, 1 the far plane
        let near = inv_view_proj * Vec4::new(ndc.x, ndc.y, 0.0, 1.0);
        let far = inv_view_proj * Vec4::new(ndc.x, ndc.y, 1.0, 1.0);
        let near = near.truncate() / near.w;
        let far = far.truncate() / far.w;

        Self::new(near, far - near)
    }

    #[inline]
    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Same ray expressed in the space `inverse` maps into.
    ///
    /// The direction is left unnormalized so a parameter `t` names the same
    /// point in both spaces.
    fn transformed(&self, inverse: Mat4) -> Self {
        Self {
            origin: inverse.transform_point3(self.origin),
            direction: inverse.transform_vector3(self.direction),
        }
    }

    /// Nearest positive hit with an axis-aligned box, as a ray parameter.
    pub fn intersect_aabb(&self, min: Vec3, max: Vec3) -> Option<f32> {
        let mut t_min = f32::NEG_INFINITY;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let dir = self.direction[axis];

            if dir.abs() < f32::EPSILON {
                if origin < min[axis] || origin > max[axis] {
                    return None;
                }
                continue;
            }

            let inv = 1.0 / dir;
            let (t1, t2) = {
                let a = (min[axis] - origin) * inv;
                let b = (max[axis] - origin) * inv;
                if a <= b { (a, b) } else { (b, a) }
            };
            t_min = t_min.max(t1);
            t_max = t_max.min(t2);
            if t_min > t_max {
                return None;
            }
        }

        nearest_positive(t_min, t_max)
    }

    /// Nearest positive hit with a sphere, as a ray parameter.
    pub fn intersect_sphere(&self, center: Vec3, radius: f32) -> Option<f32> {
        let oc = self.origin - center;
        let a = self.direction.dot(self.direction);
        if a <= f32::EPSILON {
            return None;
        }
        let b = 2.0 * oc.dot(self.direction);
        let c = oc.dot(oc) - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrt_disc = discriminant.sqrt();
        nearest_positive((-b - sqrt_disc) / (2.0 * a), (-b + sqrt_disc) / (2.0 * a))
    }
}

fn nearest_positive(near: f32, far: f32) -> Option<f32> {
    if near > 0.0 {
        Some(near)
    } else if far > 0.0 {
        Some(far)
    } else {
        None
    }
}

/// A collision shape in the entity's local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Collider {
    /// Box centred on the local origin.
    Box { half_extents: Vec3 },
    /// Sphere centred on the local origin.
    Sphere { radius: f32 },
}

const MIN_HALF_EXTENT: f32 = 1e-3;

impl Collider {
    /// Box collider from full dimensions.
    pub fn box_collider(size: Vec3) -> Self {
        Self::Box {
            half_extents: size * 0.5,
        }
    }

    /// Box collider spanning `min..max`, which must contain the origin.
    ///
    /// Flat geometry gets a sliver of thickness so edge-on rays still resolve.
    pub fn from_bounds(min: Vec3, max: Vec3) -> Self {
        Self::Box {
            half_extents: min.abs().max(max.abs()).max(Vec3::splat(MIN_HALF_EXTENT)),
        }
    }

    pub fn sphere(radius: f32) -> Self {
        Self::Sphere { radius }
    }

    /// Distance along `ray` to the hit, for a collider placed by `world`.
    pub fn intersect(&self, ray: &Ray, world: Mat4) -> Option<f32> {
        let local = ray.transformed(world.inverse());
        match *self {
            Collider::Box { half_extents } => local.intersect_aabb(-half_extents, half_extents),
            Collider::Sphere { radius } => local.intersect_sphere(Vec3::ZERO, radius),
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::box_collider(Vec3::ONE)
    }
}

/// A ray-collider intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    pub entity: Entity,
    /// Distance from the ray origin, in world units.
    pub distance: f32,
    /// World-space hit position.
    pub point: Vec3,
}

/// Cast `ray` against `candidates` and return every hit, nearest first.
///
/// Candidates without a [`Collider`] or transform are skipped. Equal
/// distances keep candidate order.
pub fn raycast_all(world: &World, ray: &Ray, candidates: &[Entity]) -> Vec<RayHit> {
    let mut hits: Vec<RayHit> = candidates
        .iter()
        .filter_map(|&entity| {
            let collider = *world.get::<&Collider>(entity).ok()?;
            let matrix = world_matrix(world, entity)?;
            let distance = collider.intersect(ray, matrix)?;
            Some(RayHit {
                entity,
                distance,
                point: ray.point_at(distance),
            })
        })
        .collect();

    hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    hits
}

/// Closest hit among `candidates`.
pub fn raycast(world: &World, ray: &Ray, candidates: &[Entity]) -> Option<RayHit> {
    raycast_all(world, ray, candidates).into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::mesh::Transform;
    use glam::Quat;

    fn forward_ray(origin: Vec3) -> Ray {
        Ray::new(origin, Vec3::NEG_Z)
    }

    #[test]
    fn ndc_center_matches_camera_forward() {
        let camera = Camera::new();
        let ray = Ray::from_ndc(Vec2::ZERO, camera.view_matrix(), camera.projection_matrix());
        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!((ray.origin.z - (5.0 - camera.near)).abs() < 1e-3);
    }

    #[test]
    fn box_hit_reports_world_distance_under_scale() {
        let collider = Collider::box_collider(Vec3::ONE);
        let world = Transform::from_position(Vec3::new(0.0, 0.0, -5.0))
            .uniform_scale(2.0)
            .matrix();
        let d = collider.intersect(&forward_ray(Vec3::ZERO), world).unwrap();
        // Front face of a 2x2x2 box centred at z = -5.
        assert!((d - 4.0).abs() < 1e-5);
    }

    #[test]
    fn rotated_box_uses_local_space() {
        let collider = Collider::box_collider(Vec3::new(4.0, 0.2, 0.2));
        let ray = Ray::new(Vec3::new(0.0, 1.5, 0.0), Vec3::NEG_Z);
        let flat = Transform::from_position(Vec3::new(0.0, 0.0, -5.0)).matrix();
        assert!(collider.intersect(&ray, flat).is_none());

        let upright = Transform::from_position(Vec3::new(0.0, 0.0, -5.0))
            .rotation(Quat::from_rotation_z(std::f32::consts::FRAC_PI_2))
            .matrix();
        assert!(collider.intersect(&ray, upright).is_some());
    }

    #[test]
    fn sphere_miss_and_hit() {
        let collider = Collider::sphere(0.5);
        let at = Transform::from_position(Vec3::new(0.0, 0.0, -3.0)).matrix();
        let d = collider.intersect(&forward_ray(Vec3::ZERO), at).unwrap();
        assert!((d - 2.5).abs() < 1e-5);
        assert!(collider.intersect(&forward_ray(Vec3::new(1.0, 0.0, 0.0)), at).is_none());
    }

    #[test]
    fn raycast_sorts_nearest_first_and_ignores_non_candidates() {
        let mut world = World::new();
        let far = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, -10.0)),
            Collider::default(),
        ));
        let near = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, -3.0)),
            Collider::default(),
        ));
        let hidden = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, -1.0)),
            Collider::default(),
        ));
        let no_collider = world.spawn((Transform::from_position(Vec3::new(0.0, 0.0, -2.0)),));

        let ray = forward_ray(Vec3::ZERO);
        let hits = raycast_all(&world, &ray, &[far, near, no_collider]);
        let order: Vec<Entity> = hits.iter().map(|h| h.entity).collect();
        assert_eq!(order, vec![near, far]);
        assert!(!order.contains(&hidden));
        assert!((hits[0].point - Vec3::new(0.0, 0.0, -2.5)).length() < 1e-5);

        assert_eq!(raycast(&world, &ray, &[]).map(|h| h.entity), None);
    }

    #[test]
    fn flat_bounds_still_hit_face_on() {
        let collider = Collider::from_bounds(Vec3::new(-0.5, -0.5, 0.0), Vec3::new(0.5, 0.5, 0.0));
        let at = Transform::from_position(Vec3::new(0.0, 0.0, -3.0)).matrix();
        let hit = collider.intersect(&Ray::new(Vec3::ZERO, Vec3::NEG_Z), at).unwrap();
        assert!((hit - 3.0).abs() < 1e-2);
        assert!(collider.intersect(&Ray::new(Vec3::new(0.8, 0.0, 0.0), Vec3::NEG_Z), at).is_none());
    }
}
