//! Transitive group membership.
//!
//! Groups form a graph of `child -> parent` edges on top of direct
//! `user -> group` membership. Traversal is guarded by a visited set and
//! a depth limit, so malformed (cyclic) data still terminates.

use std::collections::HashSet;

use keel_core::error::KeelResult;
use keel_core::repository::GroupRepository;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::AuthzError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// Towards parent groups.
    Up,
    /// Towards nested child groups.
    Down,
}

/// Resolves transitive group membership for users and groups.
#[derive(Clone)]
pub struct GroupMembershipResolver<G: GroupRepository> {
    groups: G,
    max_depth: usize,
}

impl<G: GroupRepository> GroupMembershipResolver<G> {
    pub fn new(groups: G, max_depth: usize) -> Self {
        Self { groups, max_depth }
    }

    pub fn repository(&self) -> &G {
        &self.groups
    }

    /// Every group the user belongs to, directly or through nesting.
    pub async fn effective_group_ids(
        &self,
        tenant_id: Uuid,
        user_id: Uuid,
    ) -> KeelResult<HashSet<Uuid>> {
        let direct = self.groups.get_user_group_ids(tenant_id, user_id).await?;
        let resolved = self
            .walk(tenant_id, direct, Direction::Up, self.max_depth)
            .await?;

        debug!(
            %tenant_id,
            %user_id,
            groups = resolved.len(),
            "Resolved effective groups"
        );
        Ok(resolved)
    }

    /// Every user that is a member of `group_id`, directly or through a
    /// nested child group.
    pub async fn effective_user_ids(
        &self,
        tenant_id: Uuid,
        group_id: Uuid,
    ) -> KeelResult<HashSet<Uuid>> {
        let groups = self
            .walk(tenant_id, vec![group_id], Direction::Down, self.max_depth)
            .await?;

        let mut users = HashSet::new();
        for group in groups {
            users.extend(self.groups.get_member_user_ids(tenant_id, group).await?);
        }
        Ok(users)
    }

    /// Nest `child_id` inside `parent_id`, refusing edges that would make
    /// the group graph cyclic.
    pub async fn nest_group(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        child_id: Uuid,
    ) -> KeelResult<()> {
        if parent_id == child_id {
            return Err(AuthzError::SelfNesting(child_id).into());
        }

        // The new edge closes a cycle iff the parent already sits below
        // the child. The check is not depth-limited.
        let descendants = self
            .walk(tenant_id, vec![child_id], Direction::Down, usize::MAX)
            .await?;
        if descendants.contains(&parent_id) {
            warn!(%tenant_id, %parent_id, %child_id, "Rejected cyclic group nesting");
            return Err(AuthzError::GroupCycle {
                parent: parent_id,
                child: child_id,
            }
            .into());
        }

        self.groups
            .add_nested_group(tenant_id, parent_id, child_id)
            .await
    }

    /// Breadth-first traversal from `start`, returning every group
    /// reached including the starting ones.
    async fn walk(
        &self,
        tenant_id: Uuid,
        start: Vec<Uuid>,
        direction: Direction,
        max_depth: usize,
    ) -> KeelResult<HashSet<Uuid>> {
        let mut visited = HashSet::new();
        let mut frontier: Vec<Uuid> = start.into_iter().filter(|g| visited.insert(*g)).collect();
        let mut depth = 0;

        while !frontier.is_empty() {
            if depth >= max_depth {
                warn!(
                    %tenant_id,
                    depth,
                    pending = frontier.len(),
                    "Group traversal depth limit reached"
                );
                break;
            }
            depth += 1;

            let mut next = Vec::new();
            for group_id in frontier {
                let neighbours = match direction {
                    Direction::Up => self.groups.get_parent_group_ids(tenant_id, group_id).await?,
                    Direction::Down => self.groups.get_child_group_ids(tenant_id, group_id).await?,
                };
                for neighbour in neighbours {
                    if visited.insert(neighbour) {
                        next.push(neighbour);
                    } else {
                        warn!(
                            %tenant_id,
                            group_id = %neighbour,
                            "Group reached twice during traversal, possible cycle"
                        );
                    }
                }
            }
            frontier = next;
        }

        Ok(visited)
    }
}
