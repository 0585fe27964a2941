//! Attachable-Material Binding
//!
//! A material entity's parent may be an entity, an avatar or an overlay. Each
//! host system registers an attach/detach pair with the
//! [`MaterialBindingRegistry`]; the registry offers a parent id to each kind
//! in [`ParentKind`] order and stops at the first one that recognizes it.

use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;

use crate::material::{MaterialLayer, ProceduralMaterial};

/// Kinds of object a material can be attached to, in probing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ParentKind {
    Entity,
    Avatar,
    Overlay,
}

impl ParentKind {
    pub const ALL: [Self; 3] = [Self::Entity, Self::Avatar, Self::Overlay];
}

/// Adds a layer to the parent's named material slot. Returns `false` when
/// the id is not an object of this kind.
pub type AttachFn = Box<dyn Fn(&Uuid, &MaterialLayer, &str) -> bool + Send + Sync>;
/// Removes a material from the parent's named slot. Returns `false` when the
/// id is not an object of this kind.
pub type DetachFn = Box<dyn Fn(&Uuid, &Arc<ProceduralMaterial>, &str) -> bool + Send + Sync>;

struct Resolver {
    kind: ParentKind,
    attach: AttachFn,
    detach: DetachFn,
}

/// Process-wide table of attach/detach resolvers.
#[derive(Default)]
pub struct MaterialBindingRegistry {
    resolvers: RwLock<Vec<Resolver>>,
}

impl MaterialBindingRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs the resolver pair for `kind`, replacing any previous one.
    pub fn register(
        &self,
        kind: ParentKind,
        attach: impl Fn(&Uuid, &MaterialLayer, &str) -> bool + Send + Sync + 'static,
        detach: impl Fn(&Uuid, &Arc<ProceduralMaterial>, &str) -> bool + Send + Sync + 'static,
    ) {
        let mut resolvers = self.resolvers.write();
        resolvers.retain(|resolver| resolver.kind != kind);
        resolvers.push(Resolver {
            kind,
            attach: Box::new(attach),
            detach: Box::new(detach),
        });
        resolvers.sort_by_key(|resolver| resolver.kind);
    }

    pub fn unregister(&self, kind: ParentKind) {
        self.resolvers.write().retain(|resolver| resolver.kind != kind);
    }

    pub fn is_registered(&self, kind: ParentKind) -> bool {
        self.resolvers.read().iter().any(|resolver| resolver.kind == kind)
    }

    /// Attaches `layer` to whichever kind recognizes `parent`.
    ///
    /// `None` means no registered kind knows the id yet; the caller retries.
    pub fn attach(&self, parent: &Uuid, layer: &MaterialLayer, slot: &str) -> Option<ParentKind> {
        self.resolvers
            .read()
            .iter()
            .find(|resolver| (resolver.attach)(parent, layer, slot))
            .map(|resolver| resolver.kind)
    }

    /// Detaches from whichever kind recognizes `parent`. `None` means the
    /// parent no longer exists, so there is nothing to undo.
    pub fn detach(
        &self,
        parent: &Uuid,
        material: &Arc<ProceduralMaterial>,
        slot: &str,
    ) -> Option<ParentKind> {
        self.resolvers
            .read()
            .iter()
            .find(|resolver| (resolver.detach)(parent, material, slot))
            .map(|resolver| resolver.kind)
    }

    /// Detaches through the resolver of a known kind only.
    pub fn detach_from(
        &self,
        kind: ParentKind,
        parent: &Uuid,
        material: &Arc<ProceduralMaterial>,
        slot: &str,
    ) -> bool {
        self.resolvers
            .read()
            .iter()
            .find(|resolver| resolver.kind == kind)
            .is_some_and(|resolver| (resolver.detach)(parent, material, slot))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolvers_probe_in_kind_order() {
        let registry = MaterialBindingRegistry::new();
        registry.register(ParentKind::Overlay, |_, _, _| true, |_, _, _| true);
        registry.register(ParentKind::Entity, |_, _, _| true, |_, _, _| true);
        let kinds: Vec<_> = registry.resolvers.read().iter().map(|r| r.kind).collect();
        assert_eq!(kinds, [ParentKind::Entity, ParentKind::Overlay]);
    }

    #[test]
    fn register_replaces_same_kind() {
        let registry = MaterialBindingRegistry::new();
        registry.register(ParentKind::Avatar, |_, _, _| false, |_, _, _| false);
        registry.register(ParentKind::Avatar, |_, _, _| true, |_, _, _| true);
        assert_eq!(registry.resolvers.read().len(), 1);
        registry.unregister(ParentKind::Avatar);
        assert!(!registry.is_registered(ParentKind::Avatar));
    }
}
