//! A tic-tac-toe board rendered into the arena host.
//!
//! Run with `cargo run --example tic_tac_toe --features tracing` to see the
//! engine's decisions logged as squares are clicked.

use sprig::arena::{ArenaHost, SerializeOptions};
use sprig::{
    Attributes, Component, ComponentFactory, Error, Handler, Host, Result, Scope, SharedHost,
    VNode, Value, children, create_element, render,
};

#[derive(Default)]
struct Square;

impl Component for Square {
    fn initial_state(&self, _props: &Attributes) -> Value {
        Value::object([("value", Value::Null)])
    }

    fn component_will_mount(&self, _scope: &Scope<'_>) -> Result<()> {
        println!("[Square]: component_will_mount");
        Ok(())
    }

    fn component_did_mount(&self, _scope: &Scope<'_>) -> Result<()> {
        println!("[Square]: component_did_mount");
        Ok(())
    }

    fn component_will_update(&self, _scope: &Scope<'_>) -> Result<()> {
        println!("[Square]: component_will_update");
        Ok(())
    }

    fn component_did_update(&self, _scope: &Scope<'_>) -> Result<()> {
        println!("[Square]: component_did_update");
        Ok(())
    }

    fn component_will_receive_props(
        &self,
        _scope: &Scope<'_>,
        old_state: &Value,
        partial: &Value,
    ) -> Result<()> {
        println!("[Square]: component_will_receive_props {old_state} {partial}");
        Ok(())
    }

    fn should_component_update(&self, _scope: &Scope<'_>, old_state: &Value, partial: &Value) -> bool {
        println!("[Square]: should_component_update {old_state} {partial}");
        old_state.get("value") != partial.get("value")
    }

    fn render(&self, scope: &Scope<'_>) -> Result<VNode> {
        let handle = scope.handle();
        let on_click = Handler::new(move |_| handle.set_state(Value::object([("value", "X")])));

        let label = match scope.state().get("value") {
            Some(value) if value.is_truthy() => value.clone(),
            _ => scope.props().value("value").cloned().unwrap_or_default(),
        };
        create_element(
            "button",
            Attributes::new()
                .with("className", "square")
                .with("onClick", on_click),
            children![label],
        )
        .ok_or_else(|| Error::handler("could not build a square"))
    }
}

#[derive(Default)]
struct Board;

impl Component for Board {
    fn render(&self, _scope: &Scope<'_>) -> Result<VNode> {
        let rows: Vec<_> = (0..3)
            .map(|row| {
                let squares: Vec<_> = (0..3)
                    .map(|col| {
                        create_element(
                            ComponentFactory::of::<Square>(),
                            Attributes::new().with("value", row * 3 + col),
                            children![],
                        )
                    })
                    .collect();
                create_element(
                    "div",
                    Attributes::new().with("className", "board-row"),
                    children![squares],
                )
            })
            .collect();
        create_element("div", Attributes::new(), children![rows])
            .ok_or_else(|| Error::handler("could not build the board"))
    }
}

fn main() -> Result<()> {
    let arena = ArenaHost::shared();
    let root = arena.borrow_mut().create_element("div")?;
    arena.borrow_mut().set_attribute(root, "id", "root")?;
    let host: SharedHost = arena.clone();

    let board = create_element(ComponentFactory::of::<Board>(), Attributes::new(), children![])
        .ok_or_else(|| Error::handler("could not build the board"))?;
    let _app = render(board, &host, root)?;

    let pretty = SerializeOptions::new().pretty();
    println!("{}", arena.borrow().to_html_with_options(root, &pretty));

    // Click the centre square twice; the second click is rejected by
    // `should_component_update`.
    let centre = {
        let arena = arena.borrow();
        let board = arena.children(root)[0];
        let middle_row = arena.children(board)[1];
        arena.children(middle_row)[1]
    };
    for _ in 0..2 {
        ArenaHost::dispatch(&arena, centre, "click")?;
    }
    println!("{}", arena.borrow().to_html_with_options(root, &pretty));
    Ok(())
}
