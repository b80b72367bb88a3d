//! Component lifecycle, state updates and event-driven re-rendering.

use std::cell::RefCell;
use std::rc::Rc;

use facet_testhelpers::test;
use sprig::arena::ArenaHost;
use sprig::{
    Attributes, Component, ComponentFactory, ComponentHandle, ComponentNode, Error, Handler, Host,
    HostNode, Lifecycle, NodeType, Result, Root, Scope, SharedHost, VNode, Value, children,
    create_element, render,
};

thread_local! {
    static HOOKS: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
}

fn record(event: impl Into<String>) {
    HOOKS.with(|hooks| hooks.borrow_mut().push(event.into()));
}

fn take_hooks() -> Vec<String> {
    HOOKS.with(|hooks| std::mem::take(&mut *hooks.borrow_mut()))
}

fn setup() -> (Rc<RefCell<ArenaHost>>, SharedHost, HostNode) {
    take_hooks();
    let arena = ArenaHost::shared();
    let body = arena.borrow_mut().create_element("body").unwrap();
    let host: SharedHost = arena.clone();
    (arena, host, body)
}

fn component<C: Component + Default>(props: Attributes) -> VNode {
    create_element(NodeType::component::<C>(), props, children![]).unwrap()
}

fn root_component(root: &Root) -> &ComponentNode {
    root.tree()
        .and_then(VNode::as_component)
        .expect("root should hold a component")
}

fn paragraph(text: impl Into<Value>) -> Result<VNode> {
    create_element("p", Attributes::new(), children![text.into()])
        .ok_or_else(|| Error::handler("could not build <p>"))
}

/// Records every hook; `set_state` is only accepted when the partial
/// carries `allow: true`.
#[derive(Default)]
struct Gated;

impl Component for Gated {
    fn initial_state(&self, _props: &Attributes) -> Value {
        Value::object([("text", "initial")])
    }

    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        record("render");
        paragraph(scope.state().get("text").cloned().unwrap_or_default())
    }

    fn component_will_mount(&self, _scope: &Scope<'_>) -> Result<()> {
        record("will_mount");
        Ok(())
    }

    fn component_did_mount(&self, scope: &Scope<'_>) -> Result<()> {
        record(format!("did_mount:{:?}", scope.phase()));
        Ok(())
    }

    fn should_component_update(&self, _scope: &Scope<'_>, _old: &Value, partial: &Value) -> bool {
        record("should_update");
        partial.get("allow").is_some_and(Value::is_truthy)
    }

    fn component_will_receive_props(
        &self,
        _scope: &Scope<'_>,
        _old: &Value,
        _partial: &Value,
    ) -> Result<()> {
        record("will_receive_props");
        Ok(())
    }

    fn component_will_update(&self, scope: &Scope<'_>) -> Result<()> {
        record(format!("will_update:{:?}", scope.phase()));
        Ok(())
    }

    fn component_did_update(&self, scope: &Scope<'_>) -> Result<()> {
        record(format!("did_update:{:?}", scope.phase()));
        Ok(())
    }

    fn component_will_unmount(&self, _scope: &Scope<'_>) -> Result<()> {
        record("will_unmount");
        Ok(())
    }
}

#[test]
fn test_mount_hooks_run_in_order() {
    let (arena, host, body) = setup();
    let root = render(component::<Gated>(Attributes::new()), &host, body).unwrap();
    assert_eq!(take_hooks(), ["will_mount", "render", "did_mount:Mounted"]);
    assert_eq!(arena.borrow().to_html(body), "<p>initial</p>");
    assert_eq!(root_component(&root).phase(), Lifecycle::Mounted);
}

#[test]
fn test_rejected_update_changes_nothing() {
    let (arena, host, body) = setup();
    let root = render(component::<Gated>(Attributes::new()), &host, body).unwrap();
    let node = root_component(&root);
    let html = arena.borrow().to_html(body);
    take_hooks();
    arena.borrow_mut().take_mutations();

    node.set_state(Value::object([("text", "changed")])).unwrap();
    assert_eq!(take_hooks(), ["should_update"]);
    assert_eq!(arena.borrow().to_html(body), html);
    assert!(arena.borrow().mutations().is_empty());
    assert_eq!(node.state(), Value::object([("text", "initial")]));
}

#[test]
fn test_accepted_update_rerenders() {
    let (arena, host, body) = setup();
    let root = render(component::<Gated>(Attributes::new()), &host, body).unwrap();
    let node = root_component(&root);
    take_hooks();

    node.set_state(Value::object([
        ("allow", Value::from(true)),
        ("text", Value::from("changed")),
    ]))
    .unwrap();
    assert_eq!(
        take_hooks(),
        [
            "should_update",
            "will_receive_props",
            "will_update:Updating",
            "render",
            "did_update:Mounted",
        ]
    );
    assert_eq!(arena.borrow().to_html(body), "<p>changed</p>");
    assert_eq!(node.phase(), Lifecycle::Mounted);
}

#[test]
fn test_set_state_before_mount_renders_on_mount() {
    let (arena, host, body) = setup();
    let tree = component::<Gated>(Attributes::new());
    tree.as_component()
        .unwrap()
        .set_state(Value::object([
            ("allow", Value::from(true)),
            ("text", Value::from("early")),
        ]))
        .unwrap();
    assert_eq!(take_hooks(), ["should_update", "will_receive_props"]);

    render(tree, &host, body).unwrap();
    assert_eq!(arena.borrow().to_html(body), "<p>early</p>");
}

#[test]
fn test_unmount_runs_hook_and_blocks_updates() {
    let (arena, host, body) = setup();
    let mut tree = component::<Gated>(Attributes::new());
    let point = host.borrow_mut().point_at_end(body).unwrap();
    tree.mount_to(&host, point).unwrap();
    take_hooks();

    tree.unmount(&host).unwrap();
    assert_eq!(take_hooks(), ["will_unmount"]);
    assert_eq!(arena.borrow().to_html(body), "");

    let node = tree.as_component().unwrap();
    assert_eq!(node.phase(), Lifecycle::Unmounted);
    assert_eq!(
        node.set_state(Value::object([("allow", true)])),
        Err(Error::Unmounted)
    );
    assert_eq!(node.update(), Err(Error::Unmounted));
    assert!(take_hooks().is_empty());
}

#[test]
fn test_unmounted_root_drops_its_components() {
    let (_arena, host, body) = setup();
    let root = render(component::<Gated>(Attributes::new()), &host, body).unwrap();
    let handle = root_component(&root).handle();
    root.unmount().unwrap();
    assert_eq!(
        handle.set_state(Value::object([("allow", true)])),
        Err(Error::Dropped)
    );
}

#[test]
fn test_state_merges_deeply() {
    let (_arena, host, body) = setup();
    let root = render(component::<Gated>(Attributes::new()), &host, body).unwrap();
    let node = root_component(&root);
    node.set_state(Value::object([
        ("allow", Value::from(true)),
        (
            "board",
            Value::object([
                ("squares", Value::array(["X", "", "O"])),
                ("turn", Value::from("X")),
            ]),
        ),
    ]))
    .unwrap();

    node.set_state(Value::object([
        ("allow", Value::from(true)),
        ("board", Value::object([("turn", "O")])),
    ]))
    .unwrap();

    let state = node.state();
    assert_eq!(state.pointer(["board", "turn"]), Some(&Value::from("O")));
    assert_eq!(
        state.pointer(["board", "squares"]),
        Some(&Value::array(["X", "", "O"]))
    );
    assert_eq!(state.get("text"), Some(&Value::from("initial")));
}

#[derive(Default)]
struct Blank;

impl Component for Blank {}

#[test]
fn test_component_without_render_fails_to_mount() {
    let (_arena, host, body) = setup();
    let err = render(component::<Blank>(Attributes::new()), &host, body).unwrap_err();
    match err {
        Error::MissingRender { component } => assert!(component.ends_with("Blank"), "{component}"),
        other => panic!("unexpected error: {other:?}"),
    }
}

/// A button counting its clicks.
#[derive(Default)]
struct Counter;

impl Component for Counter {
    fn initial_state(&self, props: &Attributes) -> Value {
        let start = props.value("start").cloned().unwrap_or(Value::from(0));
        Value::object([("count", start)])
    }

    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let count = scope.state().get("count").cloned().unwrap_or_default();
        let handle = scope.handle();
        let on_click = Handler::new(move |_| {
            let count = handle
                .state()?
                .get("count")
                .and_then(Value::as_f64)
                .unwrap_or(0.0);
            handle.set_state(Value::object([("count", count + 1.0)]))
        });
        create_element(
            "button",
            Attributes::new().with("onClick", on_click),
            children![count],
        )
        .ok_or_else(|| Error::handler("could not build <button>"))
    }
}

#[test]
fn test_click_updates_state_and_host() {
    let (arena, host, body) = setup();
    let root = render(
        component::<Counter>(Attributes::new().with("start", 5)),
        &host,
        body,
    )
    .unwrap();
    let button = arena.borrow().children(body)[0];
    assert_eq!(arena.borrow().to_html(body), "<button>5</button>");

    ArenaHost::dispatch(&arena, button, "click").unwrap();
    ArenaHost::dispatch(&arena, button, "click").unwrap();
    assert_eq!(arena.borrow().to_html(body), "<button>7</button>");
    assert_eq!(
        root_component(&root).state().get("count"),
        Some(&Value::from(7))
    );

    // The button survived both updates with its single listener.
    assert_eq!(arena.borrow().children(body), [button]);
    assert_eq!(arena.borrow().listener_count(button), 1);
}

#[test]
fn test_update_with_same_output_touches_nothing() {
    let (arena, host, body) = setup();
    let root = render(component::<Counter>(Attributes::new()), &host, body).unwrap();
    arena.borrow_mut().take_mutations();

    root_component(&root).update().unwrap();
    assert!(arena.borrow().mutations().is_empty());
}

/// Renders a `Leaf` for each label in its state.
#[derive(Default)]
struct Tree;

impl Component for Tree {
    fn initial_state(&self, _props: &Attributes) -> Value {
        Value::object([("labels", Value::array(["a", "b"]))])
    }

    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let leaves: Vec<_> = match scope.state().get("labels") {
            Some(Value::Array(labels)) => labels
                .iter()
                .map(|label| {
                    create_element(
                        ComponentFactory::of::<Leaf>(),
                        Attributes::new().with("label", label.clone()),
                        children![],
                    )
                })
                .collect(),
            _ => Vec::new(),
        };
        create_element("div", Attributes::new(), children![leaves])
            .ok_or_else(|| Error::handler("could not build <div>"))
    }

    fn component_will_unmount(&self, _scope: &Scope<'_>) -> Result<()> {
        record("tree:will_unmount");
        Ok(())
    }
}

#[derive(Default)]
struct Leaf;

impl Component for Leaf {
    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let label = scope.props().value("label").cloned().unwrap_or_default();
        paragraph(label)
    }

    fn component_did_mount(&self, scope: &Scope<'_>) -> Result<()> {
        record(format!("leaf:did_mount:{}", label_of(scope)));
        Ok(())
    }

    fn component_will_unmount(&self, scope: &Scope<'_>) -> Result<()> {
        record(format!("leaf:will_unmount:{}", label_of(scope)));
        Ok(())
    }
}

fn label_of(scope: &Scope<'_>) -> String {
    scope
        .props()
        .value("label")
        .map(Value::to_host_string)
        .unwrap_or_default()
}

#[test]
fn test_nested_components_mount_and_unmount_parent_first() {
    let (arena, host, body) = setup();
    let root = render(component::<Tree>(Attributes::new()), &host, body).unwrap();
    assert_eq!(arena.borrow().to_html(body), "<div><p>a</p><p>b</p></div>");
    assert_eq!(take_hooks(), ["leaf:did_mount:a", "leaf:did_mount:b"]);

    root.unmount().unwrap();
    assert_eq!(
        take_hooks(),
        [
            "tree:will_unmount",
            "leaf:will_unmount:a",
            "leaf:will_unmount:b"
        ]
    );
    assert_eq!(arena.borrow().to_html(body), "");
}

#[test]
fn test_children_with_unchanged_props_are_kept() {
    let (arena, host, body) = setup();
    let root = render(component::<Tree>(Attributes::new()), &host, body).unwrap();
    let div = arena.borrow().children(body)[0];
    let leaves = arena.borrow().children(div);
    take_hooks();

    root_component(&root)
        .set_state(Value::object([("labels", Value::array(["a", "c", "d"]))]))
        .unwrap();

    assert_eq!(
        arena.borrow().to_html(body),
        "<div><p>a</p><p>c</p><p>d</p></div>"
    );
    let after = arena.borrow().children(div);
    assert_eq!(after[0], leaves[0]);
    assert_ne!(after[1], leaves[1]);
    assert_eq!(
        take_hooks(),
        ["leaf:will_unmount:b", "leaf:did_mount:c", "leaf:did_mount:d"]
    );
}

#[test]
fn test_handle_reports_dropped_instance() {
    let tree = component::<Gated>(Attributes::new());
    let handle = tree.as_component().unwrap().handle();
    assert_eq!(handle.phase(), Ok(Lifecycle::Created));
    drop(tree);
    assert_eq!(handle.phase(), Err(Error::Dropped));
}

/// Sets its own state from `component_did_mount`.
#[derive(Default)]
struct SelfStarting;

impl Component for SelfStarting {
    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let ready = scope.state().get("ready").is_some_and(Value::is_truthy);
        paragraph(if ready { "ready" } else { "loading" })
    }

    fn component_did_mount(&self, scope: &Scope<'_>) -> Result<()> {
        scope.handle().set_state(Value::object([("ready", true)]))
    }
}

#[test]
fn test_hooks_may_set_state() {
    let (arena, host, body) = setup();
    let root = render(component::<SelfStarting>(Attributes::new()), &host, body).unwrap();
    assert_eq!(arena.borrow().to_html(body), "<p>ready</p>");
    assert_eq!(root_component(&root).phase(), Lifecycle::Mounted);
}

#[test]
fn test_failing_handler_reports_error() {
    let (arena, host, body) = setup();
    let tree = create_element(
        "button",
        Attributes::new().with("onClick", Handler::new(|_| Err(Error::handler("boom")))),
        children![],
    )
    .unwrap();
    render(tree, &host, body).unwrap();
    let button = arena.borrow().children(body)[0];
    assert_eq!(
        ArenaHost::dispatch(&arena, button, "click"),
        Err(Error::handler("boom"))
    );
}

/// Wraps the children it was created with.
#[derive(Default)]
struct Panel;

impl Component for Panel {
    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let content: Vec<VNode> = scope.children().iter().map(VNode::fresh_copy).collect();
        create_element(
            "section",
            Attributes::new().with("className", "panel"),
            children![content],
        )
        .ok_or_else(|| Error::handler("could not build <section>"))
    }
}

#[test]
fn test_component_renders_its_children() {
    let (arena, host, body) = setup();
    let leaf = create_element(
        ComponentFactory::of::<Leaf>(),
        Attributes::new().with("label", "x"),
        children![],
    );
    let tree = create_element(
        NodeType::component::<Panel>(),
        Attributes::new(),
        children!["title", leaf],
    )
    .unwrap();
    let root = render(tree, &host, body).unwrap();
    assert_eq!(
        arena.borrow().to_html(body),
        r#"<section class="panel">title<p>x</p></section>"#
    );

    // The descriptions handed to the panel are never mounted themselves.
    let panel = root_component(&root);
    let given = panel.children()[1].as_component().unwrap();
    assert_eq!(given.phase(), Lifecycle::Created);

    arena.borrow_mut().take_mutations();
    panel.update().unwrap();
    assert!(arena.borrow().mutations().is_empty());
}

thread_local! {
    static ROSTER: RefCell<Option<ComponentHandle>> = const { RefCell::new(None) };
}

/// Renders `n` numbered `Kid`s followed by its `log` value.
#[derive(Default)]
struct Roster;

impl Component for Roster {
    fn initial_state(&self, _props: &Attributes) -> Value {
        Value::object([("n", 2), ("log", 0)])
    }

    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let state = scope.state();
        let n = state.get("n").and_then(Value::as_f64).unwrap_or(0.0) as usize;
        let kids: Vec<_> = (0..n)
            .map(|index| {
                create_element(
                    ComponentFactory::of::<Kid>(),
                    Attributes::new().with("index", index),
                    children![],
                )
            })
            .collect();
        let log = state.get("log").cloned().unwrap_or_default();
        create_element("div", Attributes::new(), children![kids, log])
            .ok_or_else(|| Error::handler("could not build <div>"))
    }

    fn component_will_mount(&self, scope: &Scope<'_>) -> Result<()> {
        ROSTER.with(|roster| *roster.borrow_mut() = Some(scope.handle()));
        Ok(())
    }
}

/// The second kid reports to the roster as soon as it is mounted.
#[derive(Default)]
struct Kid;

impl Component for Kid {
    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let index = scope.props().value("index").cloned().unwrap_or_default();
        create_element("i", Attributes::new(), children![index])
            .ok_or_else(|| Error::handler("could not build <i>"))
    }

    fn component_did_mount(&self, scope: &Scope<'_>) -> Result<()> {
        record(format!("kid:did_mount:{}", label_of_index(scope)));
        if scope.props().value("index") == Some(&Value::from(1)) {
            let roster = ROSTER
                .with(|roster| roster.borrow().clone())
                .ok_or_else(|| Error::handler("no roster"))?;
            roster.set_state(Value::object([("log", 1)]))?;
        }
        Ok(())
    }
}

fn label_of_index(scope: &Scope<'_>) -> String {
    scope
        .props()
        .value("index")
        .map(Value::to_host_string)
        .unwrap_or_default()
}

#[test]
fn test_state_set_by_a_child_during_the_parent_render() {
    let (arena, host, body) = setup();
    let root = render(component::<Roster>(Attributes::new()), &host, body).unwrap();
    assert_eq!(arena.borrow().to_html(body), "<div><i>0</i><i>1</i>1</div>");
    assert_eq!(take_hooks(), ["kid:did_mount:0", "kid:did_mount:1"]);

    let div = arena.borrow().children(body)[0];
    root_component(&root).set_state(Value::object([("n", 3)])).unwrap();
    assert_eq!(
        arena.borrow().to_html(body),
        "<div><i>0</i><i>1</i><i>2</i>1</div>"
    );
    assert_eq!(arena.borrow().children(body), [div]);
    assert_eq!(take_hooks(), ["kid:did_mount:2"]);
    assert_eq!(root_component(&root).phase(), Lifecycle::Mounted);
}

#[test]
fn test_failed_root_update_still_unmounts() {
    let (arena, host, body) = setup();
    let leaf = || {
        create_element(
            ComponentFactory::of::<Leaf>(),
            Attributes::new().with("label", "x"),
            children![],
        )
    };
    let before = create_element(
        "ul",
        Attributes::new(),
        children![create_element("li", Attributes::new(), children!["a"]), leaf()],
    )
    .unwrap();
    let mut root = render(before, &host, body).unwrap();
    assert_eq!(take_hooks(), ["leaf:did_mount:x"]);
    let point = root.point();
    assert_eq!(root.tree().and_then(VNode::point), Some(point));

    let broken = create_element(
        "ul",
        Attributes::new(),
        children![component::<Blank>(Attributes::new()), leaf()],
    )
    .unwrap();
    assert!(matches!(root.update(broken), Err(Error::MissingRender { .. })));
    assert!(root.tree().is_none());
    assert_eq!(root.point(), point);
    // The leaf the failed pass never reached is unmounted all the same.
    assert_eq!(take_hooks(), ["leaf:will_unmount:x"]);

    let after = create_element(
        "ul",
        Attributes::new(),
        children![create_element("li", Attributes::new(), children!["b"])],
    )
    .unwrap();
    root.update(after).unwrap();
    assert_eq!(arena.borrow().to_html(body), "<ul><li>b</li></ul>");

    root.unmount().unwrap();
    assert_eq!(arena.borrow().to_html(body), "");
    assert_eq!(arena.borrow().live_points(), 0);
}

#[test]
fn test_failed_root_update_then_unmount_clears_the_host() {
    let (arena, host, body) = setup();
    let list = create_element(
        "ul",
        Attributes::new(),
        children![create_element("li", Attributes::new(), children!["a"])],
    )
    .unwrap();
    let mut root = render(list, &host, body).unwrap();

    let broken = create_element(
        "ul",
        Attributes::new(),
        children![component::<Blank>(Attributes::new())],
    )
    .unwrap();
    assert!(root.update(broken).is_err());

    root.unmount().unwrap();
    assert_eq!(arena.borrow().to_html(body), "");
}

/// Renders a leaf inside a `<div>`, or a broken child once `fail` is set.
#[derive(Default)]
struct Flaky;

impl Component for Flaky {
    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let fail = scope.state().get("fail").is_some_and(Value::is_truthy);
        let child = if fail {
            component::<Blank>(Attributes::new())
        } else {
            component::<Leaf>(Attributes::new().with("label", "f"))
        };
        create_element("div", Attributes::new(), children![child])
            .ok_or_else(|| Error::handler("could not build <div>"))
    }
}

#[test]
fn test_failed_rerender_recovers_on_next_update() {
    let (arena, host, body) = setup();
    let root = render(component::<Flaky>(Attributes::new()), &host, body).unwrap();
    assert_eq!(arena.borrow().to_html(body), "<div><p>f</p></div>");
    take_hooks();

    let node = root_component(&root);
    assert!(matches!(
        node.set_state(Value::object([("fail", true)])),
        Err(Error::MissingRender { .. })
    ));
    assert_eq!(take_hooks(), ["leaf:will_unmount:f"]);
    assert_eq!(node.phase(), Lifecycle::Mounted);
    assert!(node.with_rendered(|rendered| rendered.is_none()));

    node.set_state(Value::object([("fail", false)])).unwrap();
    assert_eq!(arena.borrow().to_html(body), "<div><p>f</p></div>");
    assert_eq!(take_hooks(), ["leaf:did_mount:f"]);

    root.unmount().unwrap();
    assert_eq!(take_hooks(), ["leaf:will_unmount:f"]);
    assert_eq!(arena.borrow().to_html(body), "");
    assert_eq!(arena.borrow().live_points(), 0);
}

#[test]
fn test_rendered_tree_can_be_inspected() {
    let (_arena, host, body) = setup();
    let root = render(component::<Counter>(Attributes::new()), &host, body).unwrap();
    let node = root_component(&root);

    let tag = node.with_rendered(|rendered| {
        rendered
            .and_then(VNode::as_element)
            .map(|el| el.tag().to_string())
    });
    assert_eq!(tag.as_deref(), Some("button"));

    // Copied out, the rendering can be looked at across an update.
    let before = node.with_rendered(|rendered| rendered.and_then(VNode::point));
    node.update().unwrap();
    let after = node.with_rendered(|rendered| rendered.and_then(VNode::point));
    assert_eq!(before, after);
    assert_eq!(before, node.point());
}
