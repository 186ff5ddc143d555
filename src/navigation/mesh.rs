//! Path planning seam.

use glam::Vec3;
use tracing::debug;

/// A navigation-mesh query.
pub trait NavMesh {
    /// Write the waypoints from `from` to `to` into `out` (the start point
    /// excluded, the destination last). Returns false when no path exists.
    fn find_path(&self, from: Vec3, to: Vec3, out: &mut Vec<Vec3>) -> bool;
}

/// Straight line to the destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectPath;

impl NavMesh for DirectPath {
    fn find_path(&self, _from: Vec3, to: Vec3, out: &mut Vec<Vec3>) -> bool {
        out.clear();
        out.push(to);
        true
    }
}

/// Plan through `mesh`, degrading to a single waypoint at `to` when there is
/// no mesh or it finds nothing.
pub fn plan_path(mesh: Option<&dyn NavMesh>, from: Vec3, to: Vec3, out: &mut Vec<Vec3>) {
    out.clear();
    if let Some(mesh) = mesh {
        if mesh.find_path(from, to, out) && !out.is_empty() {
            return;
        }
        debug!(?from, ?to, "no mesh path, heading straight for the destination");
    }
    DirectPath.find_path(from, to, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Detour;

    impl NavMesh for Detour {
        fn find_path(&self, from: Vec3, to: Vec3, out: &mut Vec<Vec3>) -> bool {
            if to.y > 0.0 {
                return false;
            }
            out.push(Vec3::new(from.x, 0.0, to.z));
            out.push(to);
            true
        }
    }

    #[test]
    fn test_mesh_path_used() {
        let mut out = Vec::new();
        plan_path(Some(&Detour), Vec3::ZERO, Vec3::new(3.0, 0.0, 4.0), &mut out);
        assert_eq!(out, vec![Vec3::new(0.0, 0.0, 4.0), Vec3::new(3.0, 0.0, 4.0)]);
    }

    #[test]
    fn test_falls_back_to_direct_path() {
        let mut out = vec![Vec3::ONE];
        let to = Vec3::new(3.0, 1.0, 4.0);
        plan_path(Some(&Detour), Vec3::ZERO, to, &mut out);
        assert_eq!(out, vec![to]);

        plan_path(None, Vec3::ZERO, to, &mut out);
        assert_eq!(out, vec![to]);
    }
}
