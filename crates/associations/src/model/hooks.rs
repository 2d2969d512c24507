//! Association lifecycle hooks
//!
//! Typed replacement for dispatch-by-event-name: a model holds one callback
//! list per event and runs them synchronously, in registration order.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use crate::error::{AssociationError, AssociationResult};
use crate::relationships::association::{Association, AssociationType};
use crate::relationships::options::NormalizedAssociationOptions;

use super::definition::ModelRef;

/// Payload shared by `beforeAssociate` and `afterAssociate`
#[derive(Debug, Clone)]
pub struct AssociateContext {
    pub source: ModelRef,
    pub target: ModelRef,
    pub association_type: AssociationType,
}

pub type BeforeAssociateHook =
    Arc<dyn Fn(&AssociateContext, &mut NormalizedAssociationOptions) -> anyhow::Result<()> + Send + Sync>;

pub type AfterAssociateHook =
    Arc<dyn Fn(&AssociateContext, &Association) -> anyhow::Result<()> + Send + Sync>;

/// Hook lifecycle events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookEvent {
    BeforeAssociate,
    AfterAssociate,
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookEvent::BeforeAssociate => write!(f, "beforeAssociate"),
            HookEvent::AfterAssociate => write!(f, "afterAssociate"),
        }
    }
}

#[derive(Default)]
pub struct HookRegistry {
    before_associate: RwLock<Vec<BeforeAssociateHook>>,
    after_associate: RwLock<Vec<AfterAssociateHook>>,
}

impl HookRegistry {
    pub fn before_associate<F>(&self, hook: F)
    where
        F: Fn(&AssociateContext, &mut NormalizedAssociationOptions) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.before_associate
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    pub fn after_associate<F>(&self, hook: F)
    where
        F: Fn(&AssociateContext, &Association) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after_associate
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(hook));
    }

    pub fn count(&self, event: HookEvent) -> usize {
        match event {
            HookEvent::BeforeAssociate => self.before_associate.read().unwrap_or_else(PoisonError::into_inner).len(),
            HookEvent::AfterAssociate => self.after_associate.read().unwrap_or_else(PoisonError::into_inner).len(),
        }
    }

    /// Run `beforeAssociate` callbacks. Callbacks may rewrite the options.
    pub(crate) fn run_before_associate(
        &self,
        context: &AssociateContext,
        options: &mut NormalizedAssociationOptions,
    ) -> AssociationResult<()> {
        // Snapshot so callbacks can register further hooks without deadlocking
        let hooks = self.before_associate.read().unwrap_or_else(PoisonError::into_inner).clone();
        tracing::trace!("Running {} {} hooks on {}", hooks.len(), HookEvent::BeforeAssociate, context.source);
        for hook in hooks {
            hook(context, &mut *options).map_err(AssociationError::Hook)?;
        }
        Ok(())
    }

    pub(crate) fn run_after_associate(
        &self,
        context: &AssociateContext,
        association: &Association,
    ) -> AssociationResult<()> {
        let hooks = self.after_associate.read().unwrap_or_else(PoisonError::into_inner).clone();
        tracing::trace!("Running {} {} hooks on {}", hooks.len(), HookEvent::AfterAssociate, context.source);
        for hook in hooks {
            hook(context, association).map_err(AssociationError::Hook)?;
        }
        Ok(())
    }
}

impl fmt::Debug for HookRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookRegistry")
            .field("before_associate", &self.count(HookEvent::BeforeAssociate))
            .field("after_associate", &self.count(HookEvent::AfterAssociate))
            .finish()
    }
}
