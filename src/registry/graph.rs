use super::ComponentDescriptor;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;

/// Find components that sit on a dependency cycle.
///
/// Edges run from a component to the registered providers of the interfaces
/// it references; references to unregistered interfaces are ignored here and
/// surface as resolution errors when the component is built.
/// Returns the names of every component Kahn's algorithm could not order.
pub(super) fn find_cycle(descriptors: &[Arc<ComponentDescriptor>]) -> Option<Vec<String>> {
    let provider: HashMap<_, _> = descriptors
        .iter()
        .map(|descriptor| (descriptor.interface().id(), descriptor.name()))
        .collect();

    let mut in_degree: HashMap<&str, usize> = descriptors
        .iter()
        .map(|descriptor| (descriptor.name(), 0))
        .collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();

    for descriptor in descriptors {
        for dependency in descriptor.dependencies() {
            let Some(&target) = provider.get(&dependency.id()) else {
                continue;
            };
            *in_degree.entry(descriptor.name()).or_default() += 1;
            dependents.entry(target).or_default().push(descriptor.name());
        }
    }

    let mut ready: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut ordered = 0;

    while let Some(name) = ready.pop_front() {
        ordered += 1;
        for &dependent in dependents.get(name).into_iter().flatten() {
            if let Some(degree) = in_degree.get_mut(dependent) {
                *degree -= 1;
                if *degree == 0 {
                    ready.push_back(dependent);
                }
            }
        }
    }

    if ordered == in_degree.len() {
        return None;
    }

    let stuck: BTreeSet<String> = in_degree
        .into_iter()
        .filter(|(_, degree)| *degree > 0)
        .map(|(name, _)| name.to_string())
        .collect();
    Some(stuck.into_iter().collect())
}
