//! Component install ordering (spec.md component C). Kahn's algorithm
//! over the `install_before`/`install_after` edges, with ties broken by
//! original input index so the same input always yields the same
//! output (spec.md §8 "ordering stability").

use std::collections::{BTreeMap, BTreeSet, BinaryHeap};
use std::cmp::Reverse;

use crate::models::component::Component;
use crate::models::error::InstallError;
use crate::models::ids::ComponentId;

/// `true` if `components` were already topologically sorted on input,
/// alongside the order the engine must actually use. Reporting whether
/// the input was already ordered lets a dry-run UI show "no reordering
/// needed" without a separate equality check by the caller.
pub fn confirm_components_install_order(
    components: &[Component],
) -> Result<(bool, Vec<Component>), InstallError> {
    let index_of: BTreeMap<ComponentId, usize> =
        components.iter().enumerate().map(|(i, c)| (c.id, i)).collect();

    // edge Y -> X means "Y must be installed before X".
    let mut successors: BTreeMap<ComponentId, BTreeSet<ComponentId>> = BTreeMap::new();
    let mut indegree: BTreeMap<ComponentId, usize> =
        components.iter().map(|c| (c.id, 0)).collect();

    let mut add_edge = |from: ComponentId, to: ComponentId| -> Result<(), InstallError> {
        if !index_of.contains_key(&from) {
            return Err(InstallError::UnsatisfiableOrder(format!(
                "ordering edge references unknown component {from}"
            )));
        }
        if !index_of.contains_key(&to) {
            return Err(InstallError::UnsatisfiableOrder(format!(
                "ordering edge references unknown component {to}"
            )));
        }
        if successors.entry(from).or_default().insert(to) {
            *indegree.entry(to).or_insert(0) += 1;
        }
        Ok(())
    };

    for component in components {
        for &after in &component.install_after {
            add_edge(after, component.id)?;
        }
        for &before in &component.install_before {
            add_edge(component.id, before)?;
        }
    }

    // A min-heap keyed by original input index gives the stable
    // tie-break: among all currently-ready components, always emit the
    // one that appeared first in the input.
    let mut ready: BinaryHeap<Reverse<(usize, ComponentId)>> = components
        .iter()
        .filter(|c| indegree.get(&c.id).copied().unwrap_or(0) == 0)
        .map(|c| Reverse((index_of[&c.id], c.id)))
        .collect();

    let mut ordered_ids = Vec::with_capacity(components.len());
    while let Some(Reverse((_, id))) = ready.pop() {
        ordered_ids.push(id);
        if let Some(succs) = successors.get(&id) {
            for &succ in succs {
                let entry = indegree.get_mut(&succ).expect("successor tracked in indegree");
                *entry -= 1;
                if *entry == 0 {
                    ready.push(Reverse((index_of[&succ], succ)));
                }
            }
        }
    }

    if ordered_ids.len() != components.len() {
        return Err(InstallError::UnsatisfiableOrder(
            "dependency graph contains a cycle".to_string(),
        ));
    }

    let by_id: BTreeMap<ComponentId, &Component> = components.iter().map(|c| (c.id, c)).collect();
    let ordered: Vec<Component> = ordered_ids.iter().map(|id| by_id[id].clone()).collect();
    let already_ordered = ordered_ids
        .iter()
        .enumerate()
        .all(|(pos, id)| index_of[id] == pos);

    Ok((already_ordered, ordered))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component_named(name: &str) -> Component {
        Component::new(name)
    }

    #[test]
    fn already_ordered_input_is_reported_and_unchanged() {
        let a = component_named("a");
        let b = component_named("b");
        let input = vec![a.clone(), b.clone()];

        let (already_ordered, ordered) = confirm_components_install_order(&input).unwrap();
        assert!(already_ordered);
        assert_eq!(ordered.iter().map(|c| c.id).collect::<Vec<_>>(), vec![a.id, b.id]);
    }

    #[test]
    fn install_after_forces_reordering() {
        let mut a = component_named("a");
        let b = component_named("b");
        a.install_after.insert(b.id);
        let input = vec![a.clone(), b.clone()];

        let (already_ordered, ordered) = confirm_components_install_order(&input).unwrap();
        assert!(!already_ordered);
        assert_eq!(ordered.iter().map(|c| c.id).collect::<Vec<_>>(), vec![b.id, a.id]);
    }

    #[test]
    fn ties_break_by_original_input_index() {
        let a = component_named("a");
        let b = component_named("b");
        let c = component_named("c");
        let input = vec![c.clone(), a.clone(), b.clone()];

        let (_, ordered) = confirm_components_install_order(&input).unwrap();
        assert_eq!(
            ordered.iter().map(|c| c.id).collect::<Vec<_>>(),
            vec![c.id, a.id, b.id]
        );
    }

    #[test]
    fn cycle_is_unsatisfiable_order() {
        let mut a = component_named("a");
        let mut b = component_named("b");
        a.install_after.insert(b.id);
        b.install_after.insert(a.id);

        let err = confirm_components_install_order(&[a, b]).unwrap_err();
        assert!(matches!(err, InstallError::UnsatisfiableOrder(_)));
    }

    #[test]
    fn dangling_edge_reference_is_unsatisfiable_order() {
        let mut a = component_named("a");
        a.install_after.insert(ComponentId::new());

        let err = confirm_components_install_order(&[a]).unwrap_err();
        assert!(matches!(err, InstallError::UnsatisfiableOrder(_)));
    }

    #[test]
    fn dangling_install_before_reference_is_unsatisfiable_order() {
        let mut a = component_named("a");
        let b = component_named("b");
        // `to` endpoint (a stray id, not `b`) is absent from the input set.
        a.install_before.insert(ComponentId::new());

        let err = confirm_components_install_order(&[a, b]).unwrap_err();
        assert!(matches!(err, InstallError::UnsatisfiableOrder(_)));
    }
}
