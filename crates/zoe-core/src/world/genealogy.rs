//! Family trees: lineage text, descendant trees, navigation between
//! relatives, and pruning of records nobody needs any more.

use std::collections::{HashSet, VecDeque};
use tracing::debug;

use super::World;
use crate::BugId;
use crate::organism::{Bug, ZObject};

impl World {
    fn mother_of(&self, bug: &Bug) -> Option<BugId> {
        bug.mother.filter(|mother| self.bugs.contains_key(*mother))
    }

    fn is_dead_record(&self, bug: &Bug) -> bool {
        bug.is_dead(self.config.bug_min_size)
    }

    /// Whether `ancestor` appears in the maternal line of `id`.
    pub(crate) fn is_descendant_of(&self, id: BugId, ancestor: BugId) -> bool {
        let mut current = self.bugs.get(id).and_then(|bug| bug.mother);
        while let Some(mother) = current {
            if mother == ancestor {
                return true;
            }
            current = self.bugs.get(mother).and_then(|bug| bug.mother);
        }
        false
    }

    /// Mother and daughter, or sisters by the same mother.
    pub(crate) fn is_family(&self, id: BugId, other: BugId) -> bool {
        let (Some(me), Some(them)) = (self.bugs.get(id), self.bugs.get(other)) else {
            return false;
        };
        me.mother == Some(other)
            || them.mother == Some(id)
            || (me.mother.is_some() && me.mother == them.mother)
    }

    /// Species name, or serial, at the root of the maternal line.
    fn ancestral_species(&self, id: BugId) -> String {
        let mut root = id;
        while let Some(mother) = self.bugs.get(root).and_then(|bug| self.mother_of(bug)) {
            root = mother;
        }
        let Some(bug) = self.bugs.get(root) else {
            return String::new();
        };
        self.genotypes
            .get(bug.genotype)
            .and_then(|genotype| genotype.name().map(str::to_owned))
            .unwrap_or_else(|| bug.species.to_string())
    }

    /// Maternal line of `id` as `mother < grandmother < ...`, tagging each
    /// ancestor whose species differs from its child's. `generations`
    /// limits the depth; the root species is then summarised after ` ... `.
    #[must_use]
    pub fn genealogy(&self, id: BugId, generations: Option<usize>, separator: &str) -> String {
        let Some(bug) = self.bugs.get(id) else {
            return String::new();
        };
        let mut out = String::new();
        let mut child_genotype = bug.genotype;
        let mut current = self.mother_of(bug);
        let mut remaining = generations;
        while let Some(ancestor_id) = current {
            if remaining == Some(0) {
                out.push_str(" ... ");
                out.push_str(&self.ancestral_species(ancestor_id));
                break;
            }
            let Some(ancestor) = self.bugs.get(ancestor_id) else {
                break;
            };
            out.push_str(&ancestor.serial.to_string());
            if ancestor.genotype != child_genotype {
                out.push_str(&format!(" [{}", ancestor.species));
                if let Some(name) = self.genotypes.get(ancestor.genotype).and_then(|g| g.name()) {
                    out.push('=');
                    out.push_str(name);
                }
                out.push(']');
            }
            current = self.mother_of(ancestor);
            if current.is_some() {
                out.push_str(separator);
                out.push_str("< ");
            }
            child_genotype = ancestor.genotype;
            remaining = remaining.map(|left| left - 1);
        }
        out
    }

    /// `living/total Kids:` followed by the descendant tree. Dead
    /// descendants are marked with `!`. A newline separator lays the tree
    /// out one descendant per line, indented by generation; any other
    /// separator nests generations in parentheses.
    #[must_use]
    pub fn descendants(&self, id: BugId, separator: &str) -> String {
        let mut counts = (0, 0);
        let tree = self.descendant_tree(id, separator, &mut counts);
        format!("{}/{} Kids:{tree}", counts.1, counts.0)
    }

    fn descendant_tree(&self, id: BugId, separator: &str, counts: &mut (usize, usize)) -> String {
        let Some(bug) = self.bugs.get(id) else {
            return String::new();
        };
        if bug.children.is_empty() {
            return String::new();
        }
        let vertical = separator.starts_with('\n');
        let mut tree = separator.to_owned();
        if !vertical {
            tree.push('(');
        }
        let nested = if vertical {
            format!("{separator}  ")
        } else {
            separator.to_owned()
        };
        for (i, &child_id) in bug.children.iter().enumerate() {
            let Some(child) = self.bugs.get(child_id) else {
                continue;
            };
            if i > 0 {
                tree.push_str(separator);
            }
            counts.0 += 1;
            if self.is_dead_record(child) {
                tree.push('!');
            } else {
                counts.1 += 1;
            }
            tree.push_str(&child.serial.to_string());
            tree.push_str(&self.descendant_tree(child_id, &nested, counts));
        }
        if !vertical {
            tree.push(')');
        }
        tree
    }

    /// `(living, total)` descendants of `id`.
    #[must_use]
    pub fn descendant_counts(&self, id: BugId) -> (usize, usize) {
        let mut living = 0;
        let mut total = 0;
        let mut pending: Vec<BugId> = self
            .bugs
            .get(id)
            .map(|bug| bug.children.clone())
            .unwrap_or_default();
        while let Some(child_id) = pending.pop() {
            let Some(child) = self.bugs.get(child_id) else {
                continue;
            };
            total += 1;
            if !self.is_dead_record(child) {
                living += 1;
            }
            pending.extend_from_slice(&child.children);
        }
        (living, total)
    }

    /// The living child after `current`, wrapping around to the first.
    #[must_use]
    pub fn next_child(&self, id: BugId, current: Option<BugId>) -> Option<BugId> {
        let bug = self.bugs.get(id)?;
        let living: Vec<BugId> = bug
            .children
            .iter()
            .copied()
            .filter(|&child| self.bugs.get(child).is_some_and(|c| !self.is_dead_record(c)))
            .collect();
        let Some(current) = current else {
            return living.first().copied();
        };
        living
            .iter()
            .position(|&child| child == current)
            .and_then(|i| living.get(i + 1))
            .or_else(|| living.first())
            .copied()
    }

    /// The living descendant after `current` in generation order.
    #[must_use]
    pub fn next_descendant(&self, id: BugId, current: Option<BugId>) -> Option<BugId> {
        let mut passed_current = current.is_none();
        let mut queue: VecDeque<BugId> = self.bugs.get(id)?.children.iter().copied().collect();
        while let Some(descendant_id) = queue.pop_front() {
            let Some(descendant) = self.bugs.get(descendant_id) else {
                continue;
            };
            queue.extend(descendant.children.iter().copied());
            if self.is_dead_record(descendant) {
                continue;
            }
            if passed_current {
                return Some(descendant_id);
            }
            passed_current = Some(descendant_id) == current;
        }
        None
    }

    /// The living sister after `id` among its mother's children.
    #[must_use]
    pub fn next_sibling(&self, id: BugId) -> Option<BugId> {
        let mother = self.mother_of(self.bugs.get(id)?)?;
        self.next_child(mother, Some(id))
    }

    /// One-line summary, or a multi-line one with the genome when the
    /// separator starts with a newline.
    #[must_use]
    pub fn describe_bug(&self, id: BugId, separator: &str, labels: bool) -> String {
        let Some(bug) = self.bugs.get(id) else {
            return String::new();
        };
        let mut out = format!("{} [", bug.serial);
        if labels {
            out.push_str("species ");
        }
        out.push_str(&bug.species.to_string());
        if let Some(name) = self.genotypes.get(bug.genotype).and_then(|g| g.name()) {
            out.push('=');
            out.push_str(name);
        }
        out.push_str("] ");
        out.push_str(separator);
        let label = |name: &str| if labels { format!(" {name}=") } else { String::new() };
        out.push_str(&format!("{}${:.2} ", label("strength"), bug.strength));
        out.push_str(&format!("{}{:.2}g ", label("mass"), bug.mass()));
        out.push_str(&format!("{}{:.1}px ", label("diam"), bug.diameter));
        out.push_str(&format!("{}{}s", label("age"), bug.age));
        if let Some(mate) = bug.last_mate.and_then(|mate| self.bugs.get(mate)) {
            out.push_str(&format!(" mate={}", mate.serial));
        }
        if separator.starts_with('\n') {
            out.push_str(separator);
            out.push_str(&bug.phenotype.render(separator));
        }
        out
    }

    /// Clears the children of dead bugs from `id` up the maternal line,
    /// stopping at the first bug with a living descendant.
    pub(crate) fn prune_dead_subtrees(&mut self, id: BugId) {
        let min_size = self.config.bug_min_size;
        let mut current = Some(id);
        while let Some(bug_id) = current {
            if self.descendant_counts(bug_id).0 > 0 {
                return;
            }
            let Some(bug) = self.bugs.get_mut(bug_id) else {
                return;
            };
            if bug.is_dead(min_size) {
                bug.children.clear();
            }
            current = bug.mother;
        }
    }

    /// Drops bugs that left the arena and have no living descendants,
    /// then species nobody belongs to.
    pub(crate) fn collect_garbage(&mut self) {
        let min_size = self.config.bug_min_size;
        let mut ancestors: HashSet<BugId> = HashSet::new();
        for bug in self.bugs.values() {
            if !bug.in_world || bug.is_dead(min_size) {
                continue;
            }
            let mut current = bug.mother;
            while let Some(mother) = current {
                if !ancestors.insert(mother) {
                    break;
                }
                current = self.bugs.get(mother).and_then(|m| m.mother);
            }
        }
        let before = self.bugs.len();
        self.bugs
            .retain(|id, bug| bug.in_world || ancestors.contains(&id));
        let bugs_removed = before - self.bugs.len();

        let remaining: HashSet<BugId> = self.bugs.keys().collect();
        for bug in self.bugs.values_mut() {
            bug.children.retain(|child| remaining.contains(child));
        }

        let referenced: HashSet<_> = self.bugs.values().map(|bug| bug.genotype).collect();
        let founders = &self.founders;
        let algae = self.algae;
        let before = self.genotypes.len();
        self.genotypes.retain(|id, genotype| {
            genotype.living() > 0
                || referenced.contains(&id)
                || founders.contains(&id)
                || algae == Some(id)
        });
        let species_removed = before - self.genotypes.len();
        debug!(
            cycle = self.cycle.0,
            bugs_removed,
            species_removed,
            "garbage collected"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ZoeConfig;
    use crate::world::Placement;
    use zoe_lang::Point;

    fn world() -> World {
        let config = ZoeConfig {
            seed: Some(0xABCD),
            world_width: 300,
            world_height: 300,
            mutant_children_freq: 0.0,
            ..ZoeConfig::default()
        };
        let mut world = World::new(config).expect("world");
        world.found_species("Eve", "Do { Split }").expect("species");
        world
    }

    fn eve(world: &mut World) -> BugId {
        let genotype = world.founders()[0];
        world
            .spawn_with(
                genotype,
                Placement {
                    position: Point::new(150.0, 150.0),
                    heading: Some(0.0),
                    diameter: 30.0,
                    strength: None,
                },
            )
            .expect("placed")
    }

    fn kill(world: &mut World, id: BugId) {
        if let Some(bug) = world.bugs.get_mut(id) {
            bug.diameter = 1.0;
        }
    }

    #[test]
    fn lineage_and_descendant_trees() {
        let mut world = world();
        let root = eve(&mut world);
        let a = world.split(root, 1.0).expect("a");
        let b = world.split(root, 1.0).expect("b");
        let a1 = world.split(a, 1.0).expect("a1");
        let serial = |id: BugId| world.bug(id).map(|bug| bug.serial).expect("bug");
        let (r, sa, sb, sa1) = (serial(root), serial(a), serial(b), serial(a1));

        assert_eq!(world.genealogy(a1, None, " "), format!("{sa} < {r}"));
        assert_eq!(world.genealogy(a1, Some(1), " "), format!("{sa} <  ... Eve"));
        assert_eq!(world.genealogy(root, None, " "), "");

        kill(&mut world, b);
        assert_eq!(
            world.descendants(root, " "),
            format!("2/3 Kids: ({sa} ({sa1}) !{sb})")
        );
        assert_eq!(
            world.descendants(root, "\n"),
            format!("2/3 Kids:\n{sa}\n  {sa1}\n!{sb}")
        );
        assert_eq!(world.descendant_counts(root), (2, 3));
        assert_eq!(world.descendants(a1, " "), "0/0 Kids:");
    }

    #[test]
    fn dead_lineages_are_pruned_as_they_die() {
        let mut world = world();
        let root = eve(&mut world);
        let a = world.split(root, 1.0).expect("a");
        let b = world.split(root, 1.0).expect("b");
        let a1 = world.split(a, 1.0).expect("a1");
        let serial = |id: BugId| world.bug(id).map(|bug| bug.serial).expect("bug");
        let (r, sa, sb, sa1) = (serial(root), serial(a), serial(b), serial(a1));

        kill(&mut world, a1);
        world.declare_death(a1);
        assert_eq!(
            world.descendants(root, " "),
            format!("2/3 Kids: ({sa} (!{sa1}) {sb})")
        );

        kill(&mut world, a);
        world.declare_death(a);
        assert_eq!(world.descendants(root, " "), format!("1/2 Kids: (!{sa} {sb})"));

        kill(&mut world, root);
        kill(&mut world, b);
        world.declare_death(b);
        assert_eq!(world.descendants(root, " "), "0/0 Kids:");
        assert_eq!(world.genealogy(a1, None, " "), format!("{sa} < {r}"));
    }

    #[test]
    fn navigation_skips_the_dead() {
        let mut world = world();
        let root = eve(&mut world);
        let a = world.split(root, 1.0).expect("a");
        let b = world.split(root, 1.0).expect("b");
        let c = world.split(root, 1.0).expect("c");
        let a1 = world.split(a, 1.0).expect("a1");
        kill(&mut world, b);

        assert_eq!(world.next_child(root, None), Some(a));
        assert_eq!(world.next_child(root, Some(a)), Some(c));
        assert_eq!(world.next_child(root, Some(c)), Some(a));
        assert_eq!(world.next_sibling(a), Some(c));
        assert_eq!(world.next_sibling(root), None);

        assert_eq!(world.next_descendant(root, None), Some(a));
        assert_eq!(world.next_descendant(root, Some(a)), Some(c));
        assert_eq!(world.next_descendant(root, Some(c)), Some(a1));
        assert_eq!(world.next_descendant(root, Some(a1)), None);

        assert!(world.is_descendant_of(a1, root));
        assert!(!world.is_descendant_of(root, a1));
        assert!(world.is_family(a, c));
        assert!(world.is_family(a, a1));
        assert!(!world.is_family(a1, c));
    }

    #[test]
    fn garbage_collection_keeps_ancestors_of_the_living() {
        let mut world = world();
        let root = eve(&mut world);
        let a = world.split(root, 1.0).expect("a");
        let b = world.split(root, 1.0).expect("b");
        let a1 = world.split(a, 1.0).expect("a1");
        for id in [root, a, b] {
            world.bugs.get_mut(id).expect("bug").diameter = 0.0;
            world.remove_from_world(id);
        }
        world.collect_garbage();

        assert!(world.bug(root).is_some());
        assert!(world.bug(a).is_some());
        assert!(world.bug(b).is_none());
        assert_eq!(world.bug(root).map(|bug| bug.children().to_vec()), Some(vec![a]));
        assert_eq!(world.genealogy(a1, None, " ").matches('<').count(), 1);
        assert!(world.genotype(world.founders()[0]).is_some());
    }

    #[test]
    fn describes_a_bug() {
        let mut world = world();
        let root = eve(&mut world);
        let text = world.describe_bug(root, " ", false);
        assert!(text.starts_with("1 [1=Eve]  $706.86 706.86g 30.0px 0s"), "{text}");
        let labelled = world.describe_bug(root, "\n", true);
        assert!(labelled.contains("[species 1=Eve]"));
        assert!(labelled.contains(" strength=$706.86"));
        assert!(labelled.ends_with("Do {\n    Split\n}"), "{labelled}");
    }
}
