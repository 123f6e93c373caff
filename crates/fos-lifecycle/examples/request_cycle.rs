//! Example: two requests against a small login view

use fos_component::{
    BoxError, ComponentId, ComponentTree, RenderKit, Renderer, RequestContext,
};
use fos_lifecycle::{init_logging, Config, Lifecycle};

struct Form;

impl Renderer for Form {
    fn encode_begin(&self, tree: &mut ComponentTree, ctx: &mut RequestContext, id: ComponentId) -> Result<(), BoxError> {
        let client_id = tree.client_id(id, ctx)?;
        ctx.write(&format!("<form id=\"{client_id}\">\n"));
        Ok(())
    }

    fn encode_end(&self, _tree: &mut ComponentTree, ctx: &mut RequestContext, _id: ComponentId) -> Result<(), BoxError> {
        ctx.write("</form>\n");
        Ok(())
    }
}

struct Text;

impl Renderer for Text {
    fn decode(&self, tree: &mut ComponentTree, ctx: &mut RequestContext, id: ComponentId) -> Result<(), BoxError> {
        let client_id = tree.client_id(id, ctx)?;
        if let Some(value) = ctx.param(&client_id).map(str::to_string) {
            tree.set_attribute(id, "value", value)?;
        }
        Ok(())
    }

    fn encode_begin(&self, tree: &mut ComponentTree, ctx: &mut RequestContext, id: ComponentId) -> Result<(), BoxError> {
        let client_id = tree.client_id(id, ctx)?;
        let value = tree
            .attribute(id, "value", ctx)?
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        ctx.write(&format!("  <input name=\"{client_id}\" value=\"{value}\"/>\n"));
        Ok(())
    }
}

fn build_view() -> anyhow::Result<ComponentTree> {
    let mut tree = ComponentTree::new("/login");
    let form = tree.create_child(tree.root(), "form", Some("login"))?;
    tree.component_mut(form)?.set_naming_container(true);
    tree.component_mut(form)?.set_renderer_type(Some("form"));
    for name in ["user", "pass"] {
        let input = tree.create_child(form, "input", Some(name))?;
        tree.component_mut(input)?.set_renderer_type(Some("text"));
    }
    Ok(tree)
}

fn context() -> RequestContext {
    let mut kit = RenderKit::new("html");
    kit.add_renderer("form", "form", Form)
        .add_renderer("input", "text", Text);
    RequestContext::new(kit)
}

fn main() -> anyhow::Result<()> {
    let config = Config {
        log_filter: "debug".to_string(),
        pretty_state: true,
        ..Config::default()
    };
    init_logging(&config);

    let lifecycle = Lifecycle::new(config);

    // Initial request: render only
    let mut tree = build_view()?;
    let first = lifecycle.execute(&mut tree, &mut context(), None)?;
    println!("--- initial response ---\n{}", first.response);

    // Postback: the tree is rebuilt and its state restored
    let mut tree = build_view()?;
    let mut ctx = context();
    ctx.set_param("login:user", "ada");
    let second = lifecycle.execute(&mut tree, &mut ctx, first.state.as_deref())?;
    println!("--- postback response ---\n{}", second.response);

    if let Some(state) = &second.state {
        println!("--- saved state ---\n{}", String::from_utf8_lossy(state));
    }
    Ok(())
}
