//! Transform synchronisation: `Transform` → `GlobalTransform`.

use glam::{Mat4, Quat, Vec3};

use crate::ecs::components::transform::{Children, GlobalTransform, Parent, Transform};

/// Refresh every `GlobalTransform` from its `Transform`, roots first, then
/// down the Parent/Children hierarchy.
pub fn transform_system(world: &mut hecs::World) {
    let mut pending: Vec<(hecs::Entity, Mat4)> = Vec::new();

    for (entity, (transform, global, children)) in world
        .query_mut::<hecs::Without<(&Transform, &mut GlobalTransform, Option<&Children>), &Parent>>()
    {
        global.0 = transform.to_matrix();
        if children.is_some() {
            pending.push((entity, global.0));
        }
    }

    propagate(world, pending);
}

/// Write a new world pose for a root entity and carry it down to its children.
///
/// Works on a shared world borrow so that the motion pipeline can commit a
/// pose between collision queries. Returns `false` if the entity has no
/// `Transform`.
pub fn commit_pose(world: &hecs::World, entity: hecs::Entity, position: Vec3, rotation: Quat) -> bool {
    let matrix = match world.get::<&mut Transform>(entity) {
        Ok(mut transform) => {
            transform.position = position;
            transform.rotation = rotation;
            transform.to_matrix()
        }
        Err(_) => return false,
    };

    if let Ok(mut global) = world.get::<&mut GlobalTransform>(entity) {
        global.0 = matrix;
    }

    let mut stack = vec![(entity, matrix)];
    while let Some((parent, parent_global)) = stack.pop() {
        let Ok(children) = world.get::<&Children>(parent) else {
            continue;
        };
        for &child in &children.0 {
            let local = world
                .get::<&Transform>(child)
                .map(|t| t.to_matrix())
                .unwrap_or(Mat4::IDENTITY);
            let child_global = parent_global * local;
            if let Ok(mut global) = world.get::<&mut GlobalTransform>(child) {
                global.0 = child_global;
            }
            stack.push((child, child_global));
        }
    }
    true
}

fn propagate(world: &mut hecs::World, mut stack: Vec<(hecs::Entity, Mat4)>) {
    while let Some((parent, parent_global)) = stack.pop() {
        let children = match world.get::<&Children>(parent) {
            Ok(c) => c.0.clone(),
            Err(_) => continue,
        };

        for child in children {
            let child_global = match world.get::<&Transform>(child) {
                Ok(transform) => parent_global * transform.to_matrix(),
                Err(_) => parent_global,
            };
            if let Ok(mut global) = world.get::<&mut GlobalTransform>(child) {
                global.0 = child_global;
            }
            if world.satisfies::<&Children>(child).unwrap_or(false) {
                stack.push((child, child_global));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_entity_sync() {
        let mut world = hecs::World::new();
        let pos = Vec3::new(1.0, 2.0, 3.0);
        let entity = world.spawn((Transform::from_position(pos), GlobalTransform::default()));

        transform_system(&mut world);

        let global = world.get::<&GlobalTransform>(entity).unwrap();
        assert_eq!(global.0, Mat4::from_translation(pos));
    }

    #[test]
    fn test_two_level_hierarchy() {
        let mut world = hecs::World::new();
        let root = world.spawn((
            Transform::from_position(Vec3::new(1.0, 0.0, 0.0)),
            GlobalTransform::default(),
        ));
        let middle = world.spawn((
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            GlobalTransform::default(),
            Parent(root),
        ));
        let leaf = world.spawn((
            Transform::from_position(Vec3::new(0.0, 0.0, 1.0)),
            GlobalTransform::default(),
            Parent(middle),
        ));
        world.insert_one(root, Children(vec![middle])).unwrap();
        world.insert_one(middle, Children(vec![leaf])).unwrap();

        transform_system(&mut world);

        let actual = world.get::<&GlobalTransform>(leaf).unwrap().translation();
        assert!(
            (actual - Vec3::ONE).length() < 1e-5,
            "Expected (1, 1, 1), got {:?}",
            actual
        );
    }

    #[test]
    fn test_commit_pose_moves_children() {
        let mut world = hecs::World::new();
        let body = world.spawn((Transform::identity(), GlobalTransform::default()));
        let visual = world.spawn((
            Transform::from_position(Vec3::new(0.0, 1.0, 0.0)),
            GlobalTransform::default(),
            Parent(body),
        ));
        world.insert_one(body, Children(vec![visual])).unwrap();

        assert!(commit_pose(&world, body, Vec3::new(2.0, 0.0, 0.0), Quat::IDENTITY));

        let body_pos = world.get::<&Transform>(body).unwrap().position;
        let visual_pos = world.get::<&GlobalTransform>(visual).unwrap().translation();
        assert_eq!(body_pos, Vec3::new(2.0, 0.0, 0.0));
        assert!((visual_pos - Vec3::new(2.0, 1.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_commit_pose_without_transform() {
        let mut world = hecs::World::new();
        let entity = world.spawn((GlobalTransform::default(),));
        assert!(!commit_pose(&world, entity, Vec3::ONE, Quat::IDENTITY));
    }
}
