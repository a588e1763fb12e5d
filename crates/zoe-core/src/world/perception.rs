//! What a bug can see and how far away it is.

use zoe_lang::Point;

use super::World;
use crate::organism::{Bug, Sensed, ZObject};
use crate::{BugId, JouleId};

/// Anything farther than this is never the closest object.
const FARTHEST: f64 = 100_000.0;

impl World {
    pub(crate) fn sensed_position(&self, target: Sensed) -> Option<Point> {
        match target {
            Sensed::Bug(id) => self.bugs.get(id).map(ZObject::position),
            Sensed::Joule(id) => self.joules.get(id).map(ZObject::position),
        }
    }

    fn sensed_radius(&self, target: Sensed) -> Option<f64> {
        match target {
            Sensed::Bug(id) => self.bugs.get(id).map(ZObject::radius),
            Sensed::Joule(id) => self.joules.get(id).map(ZObject::radius),
        }
    }

    fn sensed_mass(&self, target: Sensed) -> Option<f64> {
        match target {
            Sensed::Bug(id) => self.bugs.get(id).map(ZObject::mass),
            Sensed::Joule(id) => self.joules.get(id).map(ZObject::mass),
        }
    }

    /// Distance from `viewer`'s centre to the edge of `target`, or
    /// `f64::MAX` when there is nothing there.
    pub(crate) fn range_to(&self, viewer: &Bug, target: Option<Sensed>) -> f64 {
        let Some(target) = target else {
            return f64::MAX;
        };
        match (self.sensed_position(target), self.sensed_radius(target)) {
            (Some(position), Some(radius)) => {
                (self.config.torus().range(viewer.position, position) - radius).max(0.0)
            }
            _ => f64::MAX,
        }
    }

    /// Small objects vanish next to big viewers, and a freshly split mother
    /// and daughter ignore each other.
    pub(crate) fn can_see(&self, viewer_id: BugId, viewer: &Bug, target: Sensed) -> bool {
        let config = &self.config;
        let threshold = if viewer.diameter
            < config.bug_min_size * config.bigger_than_min_size_to_see_everything
        {
            0.0
        } else {
            config.invisibility_threshold
        };
        let Some(mass) = self.sensed_mass(target) else {
            return false;
        };
        if mass / viewer.mass() < threshold {
            return false;
        }
        let Sensed::Bug(other_id) = target else {
            return true;
        };
        let Some(other) = self.bugs.get(other_id) else {
            return false;
        };
        if other.mother != Some(viewer_id) && viewer.mother != Some(other_id) {
            return true;
        }
        if viewer.mass() / mass < config.invisibility_threshold {
            return true;
        }
        viewer.age >= config.split_invisibility_cycles
            && other.age >= config.split_invisibility_cycles
    }

    /// Nearest visible bug with `min < range <= max`.
    pub(crate) fn closest_bug(&self, viewer_id: BugId, max: f64, min: f64) -> Option<(BugId, f64)> {
        let viewer = self.bugs.get(viewer_id)?;
        let mut closest = FARTHEST;
        let mut found = None;
        for &id in &self.population {
            if id == viewer_id || self.bugs.get(id).is_none_or(|bug| !bug.in_world) {
                continue;
            }
            let range = self.range_to(viewer, Some(Sensed::Bug(id)));
            if range > max || range <= min || range >= closest {
                continue;
            }
            if !self.can_see(viewer_id, viewer, Sensed::Bug(id)) {
                continue;
            }
            closest = range;
            found = Some((id, range));
        }
        found
    }

    /// Nearest visible joule with `min < range <= max`.
    pub(crate) fn closest_joule(
        &self,
        viewer_id: BugId,
        max: f64,
        min: f64,
    ) -> Option<(JouleId, f64)> {
        let viewer = self.bugs.get(viewer_id)?;
        let mut closest = FARTHEST;
        let mut found = None;
        for &id in &self.joule_order {
            if self.joules.get(id).is_none_or(ZObject::is_gone) {
                continue;
            }
            let range = self.range_to(viewer, Some(Sensed::Joule(id)));
            if range > max || range <= min || range >= closest {
                continue;
            }
            if !self.can_see(viewer_id, viewer, Sensed::Joule(id)) {
                continue;
            }
            closest = range;
            found = Some((id, range));
        }
        found
    }

    /// Nearest bug or joule; a tie goes to the joule.
    pub(crate) fn closest_object(&self, viewer_id: BugId, max: f64, min: f64) -> Option<Sensed> {
        match (
            self.closest_bug(viewer_id, max, min),
            self.closest_joule(viewer_id, max, min),
        ) {
            (Some((bug, bug_range)), Some((_, joule_range))) if bug_range < joule_range => {
                Some(Sensed::Bug(bug))
            }
            (_, Some((joule, _))) => Some(Sensed::Joule(joule)),
            (Some((bug, _)), None) => Some(Sensed::Bug(bug)),
            (None, None) => None,
        }
    }

    /// Points the gaze at the nearest object in range and remembers it.
    pub(crate) fn look(&mut self, id: BugId, max: f64, min: f64) -> Option<Sensed> {
        let target = self.closest_object(id, max, min);
        let bearing = match (self.bugs.get(id), target) {
            (Some(bug), Some(target)) => self
                .sensed_position(target)
                .map(|position| self.config.torus().bearing(bug.position, position)),
            _ => None,
        };
        let cycle = self.cycle;
        if let Some(bug) = self.bugs.get_mut(id) {
            let gaze = bearing.map_or(0.0, |bearing| bearing - bug.heading);
            bug.set_gaze(gaze);
            bug.last_sensed = target;
            bug.last_looked = Some(cycle);
        }
        target
    }
}
