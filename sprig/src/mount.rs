//! Projecting virtual nodes onto the host tree.

use crate::attrs::AttrValue;
use crate::error::Result;
use crate::host::{Host, HostNode, InsertionPoint, SharedHost};
use crate::vnode::{ElementNode, Mounted, TextNode, VNode};

/// Attribute name that is rewritten to the host's class attribute.
pub const CLASS_NAME_ALIAS: &str = "className";

impl VNode {
    /// Mount this subtree at `point`, replacing whatever the point holds.
    ///
    /// When this returns `Ok`, the subtree is reflected in the host and the
    /// node is bound to `point` for later updates.
    pub fn mount_to(&mut self, host: &SharedHost, point: InsertionPoint) -> Result<()> {
        match self {
            VNode::Text(text) => text.mount_to(host, point),
            VNode::Element(el) => el.mount_to(host, point),
            VNode::Component(component) => component.mount_to(host, point),
        }
    }

    /// Mount at `point`, or discard whatever got mounted before a failure.
    pub(crate) fn mount_or_discard(
        &mut self,
        host: &SharedHost,
        point: InsertionPoint,
    ) -> Result<()> {
        match self.mount_to(host, point) {
            Ok(()) => Ok(()),
            Err(err) => {
                trace!("mount at {:?} failed, discarding partial subtree", point);
                self.discard(host)?;
                Err(err)
            }
        }
    }

    /// Unmount this subtree: lifecycle hooks first, then host removal.
    ///
    /// The node's own point is released along with every point below it.
    pub fn unmount(&mut self, host: &SharedHost) -> Result<()> {
        let point = self.point();
        self.discard(host)?;
        if let Some(point) = point {
            let mut host = host.borrow_mut();
            host.clear(point)?;
            host.release(point)?;
        }
        Ok(())
    }

    /// Release every component and point below this node, leaving the
    /// host content and the node's own point in place.
    pub(crate) fn discard(&mut self, host: &SharedHost) -> Result<()> {
        let mut points = Vec::new();
        self.collect_inner_points(&mut points);
        self.release_components()?;
        let mut host = host.borrow_mut();
        points.into_iter().try_for_each(|point| host.release(point))
    }

    /// Points strictly below this node. A component's rendering shares the
    /// component's point, so only what lies under the rendering counts.
    pub(crate) fn collect_inner_points(&self, out: &mut Vec<InsertionPoint>) {
        match self {
            VNode::Text(_) => {}
            VNode::Element(el) => {
                for child in &el.children {
                    out.extend(child.point());
                    child.collect_inner_points(out);
                }
            }
            VNode::Component(component) => component.collect_inner_points(out),
        }
    }

    /// Run `component_will_unmount` for every component in this subtree,
    /// parents before the nodes they rendered, without touching the host.
    pub(crate) fn release_components(&mut self) -> Result<()> {
        match self {
            VNode::Text(_) => Ok(()),
            VNode::Element(el) => el
                .children
                .iter_mut()
                .try_for_each(VNode::release_components),
            VNode::Component(component) => component.release(),
        }
    }
}

impl TextNode {
    fn mount_to(&mut self, host: &SharedHost, point: InsertionPoint) -> Result<()> {
        trace!("mounting text {:?} at {:?}", self.content, point);
        let node = {
            let mut host = host.borrow_mut();
            host.clear(point)?;
            let node = host.create_text(&self.content)?;
            host.insert(point, node)?;
            node
        };
        self.mounted = Some(Mounted { node, point });
        Ok(())
    }
}

impl ElementNode {
    fn mount_to(&mut self, host: &SharedHost, point: InsertionPoint) -> Result<()> {
        trace!("mounting <{}> at {:?}", self.tag, point);
        let element = {
            let mut host = host.borrow_mut();
            host.clear(point)?;
            let element = host.create_element(&self.tag)?;
            for (name, value) in self.attributes.iter() {
                apply_attribute(&mut *host, element, name, value)?;
            }
            element
        };

        // Children go into the detached element, each after the last one
        // mounted so far.
        for child in &mut self.children {
            let child_point = host.borrow_mut().point_at_end(element)?;
            child.mount_to(host, child_point)?;
        }

        host.borrow_mut().insert(point, element)?;
        self.mounted = Some(Mounted {
            node: element,
            point,
        });
        Ok(())
    }
}

/// Event name for an `on<Event>` attribute, lower-cased.
pub fn event_name(attribute: &str) -> Option<String> {
    attribute
        .strip_prefix("on")
        .filter(|rest| !rest.is_empty())
        .map(str::to_lowercase)
}

fn apply_attribute(
    host: &mut dyn Host,
    element: HostNode,
    name: &str,
    value: &AttrValue,
) -> Result<()> {
    if let Some(event) = event_name(name) {
        return match value {
            AttrValue::Handler(handler) => {
                host.add_event_listener(element, &event, handler.clone())
            }
            AttrValue::Value(_) => {
                warn!("{} expects a handler; ignoring plain value", name);
                Ok(())
            }
        };
    }

    let value = match value {
        AttrValue::Value(value) => value,
        AttrValue::Handler(_) => {
            warn!("handler given for non-event attribute {}; ignoring", name);
            return Ok(());
        }
    };
    let name = if name == CLASS_NAME_ALIAS {
        host.class_attribute().to_string()
    } else {
        name.to_string()
    };
    if value.is_null() {
        host.remove_attribute(element, &name)
    } else {
        host.set_attribute(element, &name, &value.to_host_string())
    }
}
