//! User-defined components and the lifecycle state machine that drives them.
//!
//! A component is any type implementing [`Component`]. The engine wraps each
//! one in an instance that owns its props, state, anchor point and previous
//! rendering. The instance moves through
//!
//! ```text
//! Created -> Mounting -> Mounted <-> Updating
//!                           |
//!                           v
//!                       Unmounted
//! ```
//!
//! `set_state` is gated by `should_component_update`, deep-merges the
//! partial state, then re-renders and reconciles synchronously. Hooks take
//! `&self` and a [`Scope`], so they may call back into `set_state`. A nested
//! update of an instance that is not rendering runs to completion before the
//! outer call continues. One that reaches an instance in the middle of its
//! own render pass merges its state at once, and the running pass renders
//! again as soon as its reconcile is done, before the outer call returns.

use std::any::TypeId;
use std::cell::{Cell, Ref, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::attrs::{AttrValue, Attributes};
use crate::error::{Error, Result};
use crate::host::{InsertionPoint, SharedHost};
use crate::reconcile;
use crate::value::Value;
use crate::vnode::VNode;

/// Behaviour of a user-defined component.
///
/// Only [`render`](Component::render) is needed in practice; every hook has
/// a no-op default and `should_component_update` accepts every change. A
/// component that does not override `render` fails with
/// [`Error::MissingRender`] when it is mounted.
pub trait Component: 'static {
    /// Describe the UI for the current props and state.
    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        Err(Error::MissingRender {
            component: scope.name().to_string(),
        })
    }

    /// State the instance starts with. Called once, after props are set.
    fn initial_state(&self, _props: &Attributes) -> Value {
        Value::Null
    }

    fn component_will_mount(&self, _scope: &Scope<'_>) -> Result<()> {
        Ok(())
    }

    fn component_did_mount(&self, _scope: &Scope<'_>) -> Result<()> {
        Ok(())
    }

    /// Gate for `set_state`. Returning `false` drops the partial state
    /// without merging or rendering.
    fn should_component_update(
        &self,
        _scope: &Scope<'_>,
        _old_state: &Value,
        _partial: &Value,
    ) -> bool {
        true
    }

    fn component_will_receive_props(
        &self,
        _scope: &Scope<'_>,
        _old_state: &Value,
        _partial: &Value,
    ) -> Result<()> {
        Ok(())
    }

    fn component_will_update(&self, _scope: &Scope<'_>) -> Result<()> {
        Ok(())
    }

    fn component_did_update(&self, _scope: &Scope<'_>) -> Result<()> {
        Ok(())
    }

    /// Runs before any of the component's host content is removed.
    fn component_will_unmount(&self, _scope: &Scope<'_>) -> Result<()> {
        Ok(())
    }
}

/// Where an instance is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    /// Built by the factory, never mounted
    Created,
    /// `component_will_mount` and the first render are running
    Mounting,
    Mounted,
    /// A re-render is in progress
    Updating,
    /// Terminal; the instance will not render again
    Unmounted,
}

impl Lifecycle {
    /// Mounted or in the middle of an update.
    pub fn is_mounted(self) -> bool {
        matches!(self, Lifecycle::Mounted | Lifecycle::Updating)
    }
}

/// Reference to a component type, used by the factory to create instances.
#[derive(Clone, Copy)]
pub struct ComponentFactory {
    name: &'static str,
    type_id: TypeId,
    construct: fn() -> Box<dyn Component>,
}

fn construct<C: Component + Default>() -> Box<dyn Component> {
    Box::new(C::default())
}

impl ComponentFactory {
    pub fn of<C: Component + Default>() -> Self {
        ComponentFactory {
            name: std::any::type_name::<C>(),
            type_id: TypeId::of::<C>(),
            construct: construct::<C>,
        }
    }

    /// Type name of the component.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Two factories build the same component type.
    pub fn same_type(&self, other: &ComponentFactory) -> bool {
        self.type_id == other.type_id
    }

    /// Create an unmounted instance.
    pub fn instantiate(&self, props: Attributes, children: Vec<VNode>) -> ComponentNode {
        let component = (self.construct)();
        let state = component.initial_state(&props);
        let factory = *self;
        let instance = Rc::new_cyclic(|this| Instance {
            this: this.clone(),
            factory,
            component,
            props,
            children,
            state: RefCell::new(state),
            point: Cell::new(None),
            phase: Cell::new(Lifecycle::Created),
            rendered: RefCell::new(None),
            host: RefCell::new(None),
            rendering: Cell::new(false),
            dirty: Cell::new(false),
        });
        ComponentNode { instance }
    }
}

impl fmt::Debug for ComponentFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentFactory").field(&self.name).finish()
    }
}

struct Instance {
    this: Weak<Instance>,
    factory: ComponentFactory,
    component: Box<dyn Component>,
    props: Attributes,
    children: Vec<VNode>,
    state: RefCell<Value>,
    point: Cell<Option<InsertionPoint>>,
    phase: Cell<Lifecycle>,
    rendered: RefCell<Option<VNode>>,
    host: RefCell<Option<SharedHost>>,
    /// A render pass is reconciling `rendered`
    rendering: Cell<bool>,
    /// State changed while `rendering`; the pass must render again
    dirty: Cell<bool>,
}

impl Instance {
    fn scope(&self) -> Scope<'_> {
        Scope { instance: self }
    }

    fn mount(&self, host: &SharedHost, point: InsertionPoint) -> Result<()> {
        match self.phase.get() {
            Lifecycle::Created => {}
            Lifecycle::Unmounted => return Err(Error::Unmounted),
            _ => return Err(Error::AlreadyMounted),
        }
        debug!("mounting component {}", self.factory.name);
        self.phase.set(Lifecycle::Mounting);
        self.component.component_will_mount(&self.scope())?;

        self.point.set(Some(point));
        *self.host.borrow_mut() = Some(host.clone());
        self.update()?;

        self.phase.set(Lifecycle::Mounted);
        self.component.component_did_mount(&self.scope())
    }

    fn set_state(&self, partial: Value) -> Result<()> {
        if self.phase.get() == Lifecycle::Unmounted {
            return Err(Error::Unmounted);
        }
        let old_state = self.state.borrow().clone();
        let scope = self.scope();
        if !self
            .component
            .should_component_update(&scope, &old_state, &partial)
        {
            trace!("{} rejected state change", self.factory.name);
            return Ok(());
        }
        self.component
            .component_will_receive_props(&scope, &old_state, &partial)?;
        self.state.borrow_mut().merge(&partial);

        if self.host.borrow().is_none() {
            // Not bound to a host yet; mounting renders the merged state.
            return Ok(());
        }
        self.update()
    }

    fn update(&self) -> Result<()> {
        let phase = self.phase.get();
        if phase == Lifecycle::Unmounted {
            return Err(Error::Unmounted);
        }
        if self.rendering.get() {
            trace!("{} is rendering; re-render deferred", self.factory.name);
            self.dirty.set(true);
            return Ok(());
        }
        let host = self.host.borrow().clone().ok_or(Error::NotMounted)?;
        let point = self.point.get().ok_or(Error::NotMounted)?;
        let mounted = phase.is_mounted();

        if mounted {
            self.phase.set(Lifecycle::Updating);
        }
        self.rendering.set(true);
        let mut outcome = self.rerender(&host, point, mounted);
        while outcome.is_ok() && self.dirty.replace(false) {
            if self.phase.get() == Lifecycle::Unmounted {
                break;
            }
            trace!("{} changed while rendering; rendering again", self.factory.name);
            outcome = self.rerender(&host, point, mounted);
        }
        self.rendering.set(false);
        self.dirty.set(false);
        if mounted && self.phase.get() == Lifecycle::Updating {
            self.phase.set(phase);
        }
        outcome?;

        if mounted {
            self.component.component_did_update(&self.scope())?;
        }
        Ok(())
    }

    fn rerender(&self, host: &SharedHost, point: InsertionPoint, mounted: bool) -> Result<()> {
        let scope = self.scope();
        if mounted {
            self.component.component_will_update(&scope)?;
        }
        let mut next = self.component.render(&scope)?;

        // On error the previous rendering has been discarded; the next pass
        // mounts afresh at `point`, which still owns the content.
        let previous = self.rendered.borrow_mut().take();
        let mut current = match previous {
            Some(previous) => {
                trace!("reconciling rendering of {}", self.factory.name);
                reconcile::reconcile_pair(host, next, previous)?
            }
            None => {
                trace!("first rendering of {}", self.factory.name);
                next.mount_or_discard(host, point)?;
                next
            }
        };
        if self.phase.get() == Lifecycle::Unmounted {
            // Released by a hook while this pass ran.
            return current.discard(host);
        }
        *self.rendered.borrow_mut() = Some(current);
        Ok(())
    }

    /// Fire `component_will_unmount` here and below, without touching the
    /// host.
    fn release(&self) -> Result<()> {
        if self.phase.get() == Lifecycle::Unmounted {
            return Ok(());
        }
        debug!("unmounting component {}", self.factory.name);
        let was_mounted = self.phase.get() != Lifecycle::Created;
        self.phase.set(Lifecycle::Unmounted);
        if was_mounted {
            self.component.component_will_unmount(&self.scope())?;
        }
        let rendered = self.rendered.borrow_mut().take();
        if let Some(mut rendered) = rendered {
            rendered.release_components()?;
        }
        Ok(())
    }
}

/// A component instance placed in a virtual tree.
pub struct ComponentNode {
    instance: Rc<Instance>,
}

impl ComponentNode {
    pub fn name(&self) -> &'static str {
        self.instance.factory.name
    }

    pub fn factory(&self) -> &ComponentFactory {
        &self.instance.factory
    }

    pub fn props(&self) -> &Attributes {
        &self.instance.props
    }

    pub fn children(&self) -> &[VNode] {
        &self.instance.children
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> Value {
        self.instance.state.borrow().clone()
    }

    pub fn phase(&self) -> Lifecycle {
        self.instance.phase.get()
    }

    pub fn point(&self) -> Option<InsertionPoint> {
        self.instance.point.get()
    }

    pub fn handle(&self) -> ComponentHandle {
        ComponentHandle {
            instance: Rc::downgrade(&self.instance),
        }
    }

    /// Run `f` against the tree the component rendered last.
    ///
    /// The rendering stays borrowed while `f` runs, so `f` must not update
    /// or set the state of this component. Copy out what it needs instead.
    pub fn with_rendered<R>(&self, f: impl FnOnce(Option<&VNode>) -> R) -> R {
        f(self.instance.rendered.borrow().as_ref())
    }

    pub fn set_state(&self, partial: impl Into<Value>) -> Result<()> {
        self.instance.set_state(partial.into())
    }

    /// Re-render and reconcile against the previous rendering.
    pub fn update(&self) -> Result<()> {
        self.instance.update()
    }

    pub(crate) fn mount_to(&self, host: &SharedHost, point: InsertionPoint) -> Result<()> {
        self.instance.mount(host, point)
    }

    pub(crate) fn release(&self) -> Result<()> {
        self.instance.release()
    }

    pub(crate) fn collect_inner_points(&self, out: &mut Vec<InsertionPoint>) {
        if let Some(rendered) = self.instance.rendered.borrow().as_ref() {
            rendered.collect_inner_points(out);
        }
    }

    pub(crate) fn type_id(&self) -> TypeId {
        self.instance.factory.type_id
    }

    /// Whether both nodes are the very same instance.
    pub(crate) fn ptr_eq(&self, other: &ComponentNode) -> bool {
        Rc::ptr_eq(&self.instance, &other.instance)
    }

    pub(crate) fn fresh_copy(&self) -> ComponentNode {
        let children = self.instance.children.iter().map(VNode::fresh_copy).collect();
        self.instance
            .factory
            .instantiate(self.instance.props.clone(), children)
    }
}

impl fmt::Debug for ComponentNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name())
            .field("phase", &self.phase())
            .field("props", self.props())
            .field("state", &*self.instance.state.borrow())
            .finish()
    }
}

/// What a component sees while rendering or running a hook.
pub struct Scope<'a> {
    instance: &'a Instance,
}

impl<'a> Scope<'a> {
    /// Type name of the component.
    pub fn name(&self) -> &'static str {
        self.instance.factory.name
    }

    pub fn props(&self) -> &'a Attributes {
        &self.instance.props
    }

    pub fn prop(&self, name: &str) -> Option<&'a AttrValue> {
        self.instance.props.get(name)
    }

    /// Current state. Drop the guard before calling `set_state`.
    pub fn state(&self) -> Ref<'a, Value> {
        self.instance.state.borrow()
    }

    /// Children the component was created with.
    pub fn children(&self) -> &'a [VNode] {
        &self.instance.children
    }

    pub fn phase(&self) -> Lifecycle {
        self.instance.phase.get()
    }

    /// A handle that outlives the scope, for event handlers.
    pub fn handle(&self) -> ComponentHandle {
        ComponentHandle {
            instance: self.instance.this.clone(),
        }
    }
}

/// Weak reference to a component instance.
#[derive(Clone)]
pub struct ComponentHandle {
    instance: Weak<Instance>,
}

impl ComponentHandle {
    fn upgrade(&self) -> Result<Rc<Instance>> {
        self.instance.upgrade().ok_or(Error::Dropped)
    }

    pub fn set_state(&self, partial: impl Into<Value>) -> Result<()> {
        self.upgrade()?.set_state(partial.into())
    }

    pub fn update(&self) -> Result<()> {
        self.upgrade()?.update()
    }

    pub fn phase(&self) -> Result<Lifecycle> {
        Ok(self.upgrade()?.phase.get())
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> Result<Value> {
        Ok(self.upgrade()?.state.borrow().clone())
    }
}

impl fmt::Debug for ComponentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance.upgrade() {
            Some(instance) => write!(f, "ComponentHandle({})", instance.factory.name),
            None => f.write_str("ComponentHandle(<dropped>)"),
        }
    }
}
