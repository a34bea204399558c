use crate::types::{Index, Skeleton};

/// Pre-order walk of every root tree, children visited in declared left-to-right order.
///
/// Uses an explicit stack so deeply nested rigs don't recurse. Children are
/// pushed in reverse so they pop in document order.
pub fn preorder(skeleton: &Skeleton) -> Vec<Index> {
    let mut order = Vec::with_capacity(skeleton.joints.len());
    let mut stack: Vec<Index> = Vec::new();
    for &root in skeleton.roots.iter() {
        stack.push(root);
        while let Some(index) = stack.pop() {
            order.push(index);
            stack.extend(skeleton.joints[index].children.iter().rev());
        }
    }
    order
}

/// The joints a single motion line is sliced onto, in order.
///
/// This is [`preorder`] with the channel-less joints (End Sites) dropped: they
/// are visited but consume no values.
pub fn channel_order(skeleton: &Skeleton) -> Vec<Index> {
    preorder(skeleton)
        .into_iter()
        .filter(|&index| !skeleton.joints[index].channels.is_empty())
        .collect()
}

/// Returns the kinematic chains of a skeleton like \[\[0,1,2,3\],\[5,6,7\],\[9,10\]\]
/// Usually the chains are: spine+head, left leg, right leg, left arm and right arm.
/// End Sites are left out; a new chain starts wherever the walk doesn't step exactly one level deeper.
pub fn kinematic_chains(skeleton: &Skeleton) -> Vec<Vec<Index>> {
    let mut kinematic_chains: Vec<Vec<Index>> = Vec::new();
    let mut chain: Vec<Index> = Vec::new();
    let mut last_depth: Option<usize> = None;
    for index in preorder(skeleton) {
        let joint = &skeleton.joints[index];
        if joint.is_end_site() {
            continue;
        }
        if last_depth.map(|depth| depth + 1) != Some(joint.depth) && !chain.is_empty() {
            kinematic_chains.push(std::mem::take(&mut chain));
        }
        last_depth = Some(joint.depth);
        chain.push(index);
    }
    if !chain.is_empty() {
        kinematic_chains.push(chain);
    }
    kinematic_chains
}
