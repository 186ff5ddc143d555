//! Trigger overlap bookkeeping.

use hecs::Entity;

/// How a trigger is dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    Standard,
    /// The trigger entity carries [`LevelTrigger`](crate::ecs::components::physics::LevelTrigger).
    Level,
}

/// Sorted set of triggers a body currently overlaps.
#[derive(Debug, Clone, Default)]
pub struct TriggerTracker {
    current: Vec<Entity>,
    next: Vec<Entity>,
}

impl TriggerTracker {
    pub fn current(&self) -> &[Entity] {
        &self.current
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.current
            .binary_search_by_key(&entity.to_bits(), |e| e.to_bits())
            .is_ok()
    }

    /// Replace the tracked set with `overlaps`, writing the symmetric
    /// difference into `entered` and `exited`.
    pub fn update(&mut self, overlaps: &[Entity], entered: &mut Vec<Entity>, exited: &mut Vec<Entity>) {
        entered.clear();
        exited.clear();
        self.next.clear();
        self.next.extend_from_slice(overlaps);
        self.next.sort_unstable_by_key(|e| e.to_bits());
        self.next.dedup();

        let (mut i, mut j) = (0, 0);
        while i < self.current.len() || j < self.next.len() {
            match (self.current.get(i), self.next.get(j)) {
                (Some(old), Some(new)) if old == new => {
                    i += 1;
                    j += 1;
                }
                (Some(old), Some(new)) if old.to_bits() < new.to_bits() => {
                    exited.push(*old);
                    i += 1;
                }
                (Some(old), None) => {
                    exited.push(*old);
                    i += 1;
                }
                (_, Some(new)) => {
                    entered.push(*new);
                    j += 1;
                }
                (None, None) => break,
            }
        }
        std::mem::swap(&mut self.current, &mut self.next);
    }

    /// Forget every trigger, reporting all of them as exited.
    pub fn clear(&mut self, exited: &mut Vec<Entity>) {
        exited.clear();
        exited.append(&mut self.current);
    }
}
