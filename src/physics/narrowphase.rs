//! Narrowphase queries: GJK distance, EPA penetration, specialized tests and
//! GJK ray casting for shape sweeps.

use glam::{Quat, Vec3};

use crate::ecs::components::physics::ColliderShape;
use crate::ecs::components::transform::GlobalTransform;

use super::contact::{CastHit, ContactInfo};

const GJK_MAX_ITERATIONS: usize = 64;
/// Distance below which GJK treats the origin as reached.
const GJK_TOLERANCE: f32 = 1e-4;
/// Largest residual distance at which an unconverged cast still counts as a hit.
const CAST_ACCEPT_TOLERANCE: f32 = 1e-2;
const EPA_TOLERANCE: f32 = 1e-4;
const EPA_MAX_ITERATIONS: usize = 64;
const DUPLICATE_EPSILON_SQ: f32 = 1e-10;

/// A GJK simplex (up to 4 vertices in 3D), stored inline.
#[derive(Debug, Clone, Copy, Default)]
pub struct Simplex {
    points: [Vec3; 4],
    len: usize,
}

impl Simplex {
    pub fn points(&self) -> &[Vec3] {
        &self.points[..self.len]
    }

    fn push(&mut self, point: Vec3) {
        if self.len < 4 {
            self.points[self.len] = point;
            self.len += 1;
        }
    }

    fn contains(&self, point: Vec3) -> bool {
        self.points()
            .iter()
            .any(|p| p.distance_squared(point) < DUPLICATE_EPSILON_SQ)
    }

    fn retain(&mut self, keep: [bool; 4]) {
        let mut kept = 0;
        for i in 0..self.len {
            if keep[i] {
                self.points[kept] = self.points[i];
                kept += 1;
            }
        }
        self.len = kept;
    }
}

/// Support of the Minkowski difference A − B.
fn minkowski_support(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
    direction: Vec3,
) -> Vec3 {
    shape_a.support(direction, transform_a) - shape_b.support(-direction, transform_b)
}

/// GJK intersection test. Returns the terminal simplex if the shapes touch
/// or overlap, `None` when a separating plane exists.
pub fn gjk_intersection(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<Simplex> {
    let mut simplex = Simplex::default();
    let mut v = minkowski_support(shape_a, transform_a, shape_b, transform_b, Vec3::X);

    for _ in 0..GJK_MAX_ITERATIONS {
        if v.length_squared() <= GJK_TOLERANCE * GJK_TOLERANCE {
            return Some(simplex);
        }

        let w = minkowski_support(shape_a, transform_a, shape_b, transform_b, -v);
        if v.dot(w) > 0.0 || simplex.contains(w) {
            return None;
        }

        simplex.push(w);
        let (closest, keep) = closest_on_simplex(simplex.points());
        simplex.retain(keep);
        v = closest;
    }

    None
}

/// Closest point to the origin on the hull of `points`, with the vertices
/// that span it.
fn closest_on_simplex(points: &[Vec3]) -> (Vec3, [bool; 4]) {
    match *points {
        [a] => (a, [true, false, false, false]),
        [a, b] => {
            let (q, m) = closest_on_segment(a, b);
            (q, [m[0], m[1], false, false])
        }
        [a, b, c] => {
            let (q, m) = closest_on_triangle(a, b, c);
            (q, [m[0], m[1], m[2], false])
        }
        [a, b, c, d] => closest_on_tetrahedron([a, b, c, d]),
        _ => (Vec3::ZERO, [false; 4]),
    }
}

fn closest_on_segment(a: Vec3, b: Vec3) -> (Vec3, [bool; 2]) {
    let ab = b - a;
    let denom = ab.length_squared();
    if denom <= 1e-12 {
        return (a, [true, false]);
    }
    let t = (-a).dot(ab) / denom;
    if t <= 0.0 {
        (a, [true, false])
    } else if t >= 1.0 {
        (b, [false, true])
    } else {
        (a + ab * t, [true, true])
    }
}

/// Voronoi-region walk (Ericson, Real-Time Collision Detection 5.1.5) with
/// the query point fixed at the origin.
fn closest_on_triangle(a: Vec3, b: Vec3, c: Vec3) -> (Vec3, [bool; 3]) {
    let ab = b - a;
    let ac = c - a;

    if ab.cross(ac).length_squared() <= 1e-10 * ab.length_squared() * ac.length_squared() {
        // Collinear: best of the three edges.
        let candidates = [
            (closest_on_segment(a, b), [0, 1]),
            (closest_on_segment(a, c), [0, 2]),
            (closest_on_segment(b, c), [1, 2]),
        ];
        let mut best = (a, [true, false, false]);
        let mut best_dist = f32::MAX;
        for ((q, m), idx) in candidates {
            let d = q.length_squared();
            if d < best_dist {
                best_dist = d;
                let mut mask = [false; 3];
                mask[idx[0]] = m[0];
                mask[idx[1]] = m[1];
                best = (q, mask);
            }
        }
        return best;
    }

    let d1 = ab.dot(-a);
    let d2 = ac.dot(-a);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, [true, false, false]);
    }

    let d3 = ab.dot(-b);
    let d4 = ac.dot(-b);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, [false, true, false]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        return (a + ab * (d1 / (d1 - d3)), [true, true, false]);
    }

    let d5 = ab.dot(-c);
    let d6 = ac.dot(-c);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, [false, false, true]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        return (a + ac * (d2 / (d2 - d6)), [true, false, true]);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, [false, true, true]);
    }

    let denom = 1.0 / (va + vb + vc);
    (a + ab * (vb * denom) + ac * (vc * denom), [true, true, true])
}

fn closest_on_tetrahedron(p: [Vec3; 4]) -> (Vec3, [bool; 4]) {
    // Each face paired with the vertex opposite to it.
    const FACES: [([usize; 3], usize); 4] = [
        ([0, 1, 2], 3),
        ([0, 2, 3], 1),
        ([0, 3, 1], 2),
        ([1, 3, 2], 0),
    ];

    let mut best: Option<(f32, Vec3, [bool; 4])> = None;
    for ([i, j, k], opposite) in FACES {
        let n = (p[j] - p[i]).cross(p[k] - p[i]);
        let origin_side = n.dot(-p[i]);
        let opposite_side = n.dot(p[opposite] - p[i]);
        if opposite_side.abs() > 1e-9 && origin_side * opposite_side >= 0.0 {
            continue;
        }

        let (q, m) = closest_on_triangle(p[i], p[j], p[k]);
        let dist = q.length_squared();
        if best.map_or(true, |(d, _, _)| dist < d) {
            let mut mask = [false; 4];
            mask[i] = m[0];
            mask[j] = m[1];
            mask[k] = m[2];
            best = Some((dist, q, mask));
        }
    }

    // No face separates the origin: it lies inside.
    best.map(|(_, q, mask)| (q, mask))
        .unwrap_or((Vec3::ZERO, [true; 4]))
}

/// Grow a GJK terminal simplex into a non-degenerate tetrahedron.
fn complete_tetrahedron(points: &mut Vec<Vec3>, support: impl Fn(Vec3) -> Vec3) -> bool {
    const AXES: [Vec3; 6] = [
        Vec3::X,
        Vec3::NEG_X,
        Vec3::Y,
        Vec3::NEG_Y,
        Vec3::Z,
        Vec3::NEG_Z,
    ];

    if points.is_empty() {
        points.push(support(Vec3::X));
    }

    if points.len() == 1 {
        let origin = points[0];
        if let Some(p) = AXES
            .iter()
            .map(|d| support(*d))
            .find(|p| p.distance_squared(origin) > DUPLICATE_EPSILON_SQ)
        {
            points.push(p);
        }
    }

    if points.len() == 2 {
        let axis = (points[1] - points[0]).normalize_or_zero();
        if axis == Vec3::ZERO {
            return false;
        }
        let perp = axis.any_orthonormal_vector();
        let base = points[0];
        let found = (0..6)
            .map(|i| Quat::from_axis_angle(axis, i as f32 * std::f32::consts::FRAC_PI_3) * perp)
            .map(&support)
            .find(|p| (*p - base).cross(axis).length_squared() > DUPLICATE_EPSILON_SQ);
        match found {
            Some(p) => points.push(p),
            None => return false,
        }
    }

    if points.len() == 3 {
        let n = (points[1] - points[0]).cross(points[2] - points[0]);
        let base = points[0];
        let mut p = support(n);
        if (p - base).dot(n).abs() <= 1e-9 {
            p = support(-n);
        }
        if (p - base).dot(n).abs() <= 1e-9 {
            return false;
        }
        points.push(p);
    }

    points.len() == 4
}

/// EPA (Expanding Polytope Algorithm) to compute penetration depth and contact normal.
pub fn epa_penetration(
    simplex: &Simplex,
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let support = |d: Vec3| minkowski_support(shape_a, transform_a, shape_b, transform_b, d);

    let mut polytope: Vec<Vec3> = simplex.points().to_vec();
    if !complete_tetrahedron(&mut polytope, &support) {
        return epa_fallback(shape_a, transform_a, shape_b, transform_b);
    }

    // Wind every initial face so its normal points away from the centroid.
    let centroid = polytope.iter().copied().sum::<Vec3>() * 0.25;
    let mut faces: Vec<[usize; 3]> = [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]]
        .into_iter()
        .map(|[a, b, c]| {
            let n = (polytope[b] - polytope[a]).cross(polytope[c] - polytope[a]);
            if n.dot(polytope[a] - centroid) < 0.0 {
                [a, c, b]
            } else {
                [a, b, c]
            }
        })
        .collect();

    let mut edges: Vec<[usize; 2]> = Vec::new();
    for _ in 0..EPA_MAX_ITERATIONS {
        let mut closest: Option<(usize, Vec3, f32)> = None;
        for (i, face) in faces.iter().enumerate() {
            let Some(normal) = face_normal(&polytope, face) else {
                continue;
            };
            let dist = normal.dot(polytope[face[0]]);
            if closest.map_or(true, |(_, _, d)| dist < d) {
                closest = Some((i, normal, dist));
            }
        }
        let (min_face, normal, dist) = closest?;

        let new_point = support(normal);
        if new_point.dot(normal) - dist < EPA_TOLERANCE {
            let face = faces[min_face];
            let depth = dist.max(0.0);
            let on_face = closest_on_triangle(
                polytope[face[0]],
                polytope[face[1]],
                polytope[face[2]],
            )
            .0;
            let contact = shape_a.support(normal, transform_a);
            return Some(ContactInfo {
                normal,
                penetration: depth,
                point: contact - normal * (on_face.dot(normal) * 0.5),
            });
        }

        let new_idx = polytope.len();
        polytope.push(new_point);

        edges.clear();
        faces.retain(|face| match face_normal(&polytope, face) {
            Some(n) if n.dot(new_point - polytope[face[0]]) > 0.0 => {
                add_edge(&mut edges, face[0], face[1]);
                add_edge(&mut edges, face[1], face[2]);
                add_edge(&mut edges, face[2], face[0]);
                false
            }
            Some(_) => true,
            None => false,
        });
        faces.extend(edges.iter().map(|e| [e[0], e[1], new_idx]));

        if faces.is_empty() {
            return None;
        }
    }

    None
}

fn face_normal(polytope: &[Vec3], face: &[usize; 3]) -> Option<Vec3> {
    let a = polytope[face[0]];
    let n = (polytope[face[1]] - a).cross(polytope[face[2]] - a);
    let len = n.length();
    (len > 1e-10).then(|| n / len)
}

/// Add a horizon edge, cancelling it against its reverse if already present.
fn add_edge(edges: &mut Vec<[usize; 2]>, a: usize, b: usize) {
    if let Some(pos) = edges.iter().position(|e| e[0] == b && e[1] == a) {
        edges.swap_remove(pos);
    } else {
        edges.push([a, b]);
    }
}

/// Used when GJK's simplex cannot be grown into a tetrahedron.
fn epa_fallback(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    sphere_sphere(shape_a, transform_a, shape_b, transform_b)
}

/// Uniform scale approximation used for spheres.
#[inline]
fn sphere_scale(transform: &GlobalTransform) -> f32 {
    transform.0.x_axis.truncate().length()
}

/// Specialized sphere-sphere intersection test.
pub fn sphere_sphere(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    let (ColliderShape::Sphere { radius: ra }, ColliderShape::Sphere { radius: rb }) =
        (shape_a, shape_b)
    else {
        return None;
    };

    let center_a = transform_a.translation();
    let world_radius_a = ra * sphere_scale(transform_a);
    let min_dist = world_radius_a + rb * sphere_scale(transform_b);

    let diff = transform_b.translation() - center_a;
    let dist_sq = diff.length_squared();
    if dist_sq >= min_dist * min_dist {
        return None;
    }

    let dist = dist_sq.sqrt();
    let normal = if dist > 1e-6 { diff / dist } else { Vec3::Y };
    let penetration = min_dist - dist;

    Some(ContactInfo {
        normal,
        penetration,
        point: center_a + normal * (world_radius_a - penetration * 0.5),
    })
}

/// SAT (Separating Axis Theorem) test for box-box collision.
pub fn sat_box_box(
    half_a: Vec3,
    transform_a: glam::Mat4,
    half_b: Vec3,
    transform_b: glam::Mat4,
) -> Option<ContactInfo> {
    let center_a = transform_a.transform_point3(Vec3::ZERO);
    let t = transform_b.transform_point3(Vec3::ZERO) - center_a;

    let axes_a = [
        transform_a.x_axis.truncate().normalize_or_zero(),
        transform_a.y_axis.truncate().normalize_or_zero(),
        transform_a.z_axis.truncate().normalize_or_zero(),
    ];
    let axes_b = [
        transform_b.x_axis.truncate().normalize_or_zero(),
        transform_b.y_axis.truncate().normalize_or_zero(),
        transform_b.z_axis.truncate().normalize_or_zero(),
    ];

    let project = |axes: &[Vec3; 3], half: Vec3, axis: Vec3| {
        half.x * axes[0].dot(axis).abs()
            + half.y * axes[1].dot(axis).abs()
            + half.z * axes[2].dot(axis).abs()
    };

    // 3 face normals from each box, then the 9 edge-edge cross products.
    let candidates = axes_a.into_iter().chain(axes_b).chain(
        axes_a
            .into_iter()
            .flat_map(|a| axes_b.into_iter().map(move |b| a.cross(b))),
    );

    let mut min_overlap = f32::MAX;
    let mut best_axis = Vec3::ZERO;
    for axis in candidates {
        let len = axis.length();
        if len < 1e-6 {
            continue;
        }
        let axis = axis / len;
        let overlap =
            project(&axes_a, half_a, axis) + project(&axes_b, half_b, axis) - t.dot(axis).abs();
        if overlap <= 0.0 {
            return None;
        }
        if overlap < min_overlap {
            min_overlap = overlap;
            best_axis = axis;
        }
    }

    if best_axis.dot(t) < 0.0 {
        best_axis = -best_axis;
    }

    Some(ContactInfo {
        normal: best_axis,
        penetration: min_overlap,
        point: center_a + best_axis * (project(&axes_a, half_a, best_axis) - min_overlap * 0.5),
    })
}

/// Penetration between two shapes, dispatching to specialized tests where possible.
pub fn detect_collision(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<ContactInfo> {
    match (shape_a, shape_b) {
        (ColliderShape::Sphere { .. }, ColliderShape::Sphere { .. }) => {
            sphere_sphere(shape_a, transform_a, shape_b, transform_b)
        }
        (ColliderShape::Box { half_extents: a }, ColliderShape::Box { half_extents: b }) => {
            sat_box_box(*a, transform_a.0, *b, transform_b.0)
        }
        _ => {
            let simplex = gjk_intersection(shape_a, transform_a, shape_b, transform_b)?;
            epa_penetration(&simplex, shape_a, transform_a, shape_b, transform_b)
        }
    }
}

/// Boolean overlap test (no penetration depth).
pub fn intersects(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> bool {
    match (shape_a, shape_b) {
        (ColliderShape::Sphere { .. }, ColliderShape::Sphere { .. }) => {
            sphere_sphere(shape_a, transform_a, shape_b, transform_b).is_some()
        }
        (ColliderShape::Box { half_extents: a }, ColliderShape::Box { half_extents: b }) => {
            sat_box_box(*a, transform_a.0, *b, transform_b.0).is_some()
        }
        _ => gjk_intersection(shape_a, transform_a, shape_b, transform_b).is_some(),
    }
}

/// Sweep shape A along `translation` against a static shape B.
///
/// GJK ray cast (van den Bergen): a ray from the origin along `translation`
/// is cast against the Minkowski difference B − A. The returned normal is
/// the obstacle's surface normal, pointing back toward A.
pub fn shape_cast(
    shape_a: &ColliderShape,
    transform_a: &GlobalTransform,
    translation: Vec3,
    shape_b: &ColliderShape,
    transform_b: &GlobalTransform,
) -> Option<CastHit> {
    if let (ColliderShape::Sphere { radius: ra }, ColliderShape::Sphere { radius: rb }) =
        (shape_a, shape_b)
    {
        return sphere_cast(*ra, transform_a, translation, *rb, transform_b);
    }

    let support = |d: Vec3| shape_b.support(d, transform_b) - shape_a.support(-d, transform_a);

    let mut lambda = 0.0f32;
    let mut x = Vec3::ZERO;
    let mut normal = Vec3::ZERO;
    let mut simplex = Simplex::default();
    let mut v = transform_a.translation() - transform_b.translation();
    if v.length_squared() <= GJK_TOLERANCE * GJK_TOLERANCE {
        v = -translation;
    }

    for _ in 0..GJK_MAX_ITERATIONS {
        if v.length_squared() <= GJK_TOLERANCE * GJK_TOLERANCE {
            break;
        }

        let p = support(v);
        let w = x - p;
        let vw = v.dot(w);
        let advanced = vw > 0.0;
        if advanced {
            let vr = v.dot(translation);
            if vr >= 0.0 {
                return None;
            }
            lambda -= vw / vr;
            if lambda > 1.0 {
                return None;
            }
            x = translation * lambda;
            normal = v;
        }

        if !simplex.contains(p) {
            if simplex.len == 4 {
                break;
            }
            simplex.push(p);
        } else if !advanced {
            break;
        }

        let mut shifted = [Vec3::ZERO; 4];
        for (dst, src) in shifted.iter_mut().zip(simplex.points()) {
            *dst = x - *src;
        }
        let (closest, keep) = closest_on_simplex(&shifted[..simplex.len]);
        simplex.retain(keep);
        v = closest;
    }

    if v.length_squared() > CAST_ACCEPT_TOLERANCE * CAST_ACCEPT_TOLERANCE {
        // Did not converge onto the surface: treat as a grazing miss.
        return None;
    }

    let fallback = (-translation).normalize_or(Vec3::Y);
    if lambda <= 0.0 {
        // Already overlapping at the start of the sweep.
        let normal = detect_collision(shape_a, transform_a, shape_b, transform_b)
            .map(|c| -c.normal)
            .filter(|n| n.is_finite() && *n != Vec3::ZERO)
            .unwrap_or(fallback);
        return Some(CastHit {
            fraction: 0.0,
            normal,
            point: shape_a.support(-normal, transform_a),
        });
    }

    let normal = normal.normalize_or(fallback);
    Some(CastHit {
        fraction: lambda,
        normal,
        point: shape_a.support(-normal, transform_a) + x,
    })
}

/// Analytic sphere sweep: solves |Δc + t·r| = ra + rb for the first root.
fn sphere_cast(
    radius_a: f32,
    transform_a: &GlobalTransform,
    translation: Vec3,
    radius_b: f32,
    transform_b: &GlobalTransform,
) -> Option<CastHit> {
    let world_radius_a = radius_a * sphere_scale(transform_a);
    let reach = world_radius_a + radius_b * sphere_scale(transform_b);
    let center_a = transform_a.translation();
    let m = center_a - transform_b.translation();

    let c = m.length_squared() - reach * reach;
    if c <= 0.0 {
        let normal = m.normalize_or((-translation).normalize_or(Vec3::Y));
        return Some(CastHit {
            fraction: 0.0,
            normal,
            point: center_a - normal * world_radius_a,
        });
    }

    let a = translation.length_squared();
    let b = m.dot(translation);
    if a <= 1e-12 || b >= 0.0 {
        return None;
    }
    let disc = b * b - a * c;
    if disc < 0.0 {
        return None;
    }
    let t = ((-b - disc.sqrt()) / a).max(0.0);
    if t > 1.0 {
        return None;
    }

    let normal = (m + translation * t).normalize_or(Vec3::Y);
    Some(CastHit {
        fraction: t,
        normal,
        point: center_a + translation * t - normal * world_radius_a,
    })
}

/// Cast a ray against a shape. `direction` must be normalized; the hit
/// fraction is relative to `max_distance`.
pub fn ray_cast(
    origin: Vec3,
    direction: Vec3,
    max_distance: f32,
    shape: &ColliderShape,
    transform: &GlobalTransform,
) -> Option<CastHit> {
    const POINT: ColliderShape = ColliderShape::Sphere { radius: 0.0 };
    shape_cast(
        &POINT,
        &GlobalTransform(glam::Mat4::from_translation(origin)),
        direction * max_distance,
        shape,
        transform,
    )
}
