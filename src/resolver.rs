//! Login chain resolution.
//!
//! A node reaches its host through the node named by its `PREVIOUS_LOGIN`,
//! which may itself have a previous login, and so on. Resolution follows
//! these back-links from the target and returns the hops outermost first.
//!
//! # Example
//!
//! ```yaml
//! # bastion.yaml
//! PASSWORD_PROMPT: "Password:"
//!
//! # dc/db1.yaml
//! PREVIOUS_LOGIN: bastion
//! ```
//!
//! Resolving `dc.db1` gives `[bastion, dc.db1]`.

use crate::error::{JumplineError, Result};
use crate::settings::AmbiguityPolicy;
use crate::tree::{ConfigTree, NodeId};
use std::collections::HashSet;
use tracing::warn;

/// Upper bound on the number of hops in one chain.
pub const MAX_HOPS: usize = 16;

/// Hops from the outermost jump host to the target, in login order.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginChain {
    hops: Vec<NodeId>,
}

impl LoginChain {
    pub fn hops(&self) -> &[NodeId] {
        &self.hops
    }

    /// The node the chain was resolved for.
    pub fn target(&self) -> NodeId {
        // Never empty: the target is always part of the chain.
        self.hops[self.hops.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.hops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }
}

/// Follow `PREVIOUS_LOGIN` back-links from `target`.
///
/// A back-link naming the node itself (typically inherited from the
/// directory the jump host lives in) or an empty name ends the chain.
///
/// # Errors
///
/// - [`JumplineError::Config`] if a profile on the way is malformed
/// - [`JumplineError::PreviousLoginNotFound`] if a back-link names no node
/// - [`JumplineError::AmbiguousPreviousLogin`] under [`AmbiguityPolicy::Reject`]
/// - [`JumplineError::CircularLogin`] if back-links form a cycle
/// - [`JumplineError::ChainTooLong`] beyond [`MAX_HOPS`]
pub fn resolve_chain(tree: &ConfigTree, target: NodeId, policy: AmbiguityPolicy) -> Result<LoginChain> {
    let mut hops = vec![target];
    let mut visited = HashSet::from([target]);
    let mut current = target;

    loop {
        let profile = tree.profile(current)?;
        let name = match profile.previous_login.as_deref() {
            Some(name) if !name.trim().is_empty() => name.trim(),
            _ => break,
        };
        let previous = pick_previous(tree, current, name, policy)?;
        if previous == current {
            break;
        }
        if !visited.insert(previous) {
            return Err(JumplineError::CircularLogin(tree.node(previous).id().to_string()));
        }
        hops.push(previous);
        if hops.len() > MAX_HOPS {
            return Err(JumplineError::ChainTooLong(
                tree.node(target).id().to_string(),
                MAX_HOPS,
            ));
        }
        current = previous;
    }

    hops.reverse();
    Ok(LoginChain { hops })
}

fn pick_previous(tree: &ConfigTree, node: NodeId, name: &str, policy: AmbiguityPolicy) -> Result<NodeId> {
    let candidates = tree.by_name(name);
    match (candidates, policy) {
        ([], _) => Err(JumplineError::PreviousLoginNotFound {
            node: tree.node(node).id().to_string(),
            name: name.to_string(),
        }),
        ([only], _) => Ok(*only),
        ([first, ..], AmbiguityPolicy::First) => {
            warn!(
                name,
                picked = tree.node(*first).id(),
                candidates = candidates.len(),
                "ambiguous previous login, using the first match"
            );
            Ok(*first)
        }
        (_, AmbiguityPolicy::Reject) => Err(JumplineError::AmbiguousPreviousLogin {
            name: name.to_string(),
            candidates: candidates.iter().map(|&c| tree.node(c).id().to_string()).collect(),
        }),
    }
}
