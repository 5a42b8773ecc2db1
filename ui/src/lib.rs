use formloom::{Form, InputKind, SelectOption, Template};
use leptos::prelude::*;
use serde_json::{json, Value};

mod components;

use components::form_view::FormView;

/// Profile form used by the demo page
fn demo_template() -> Template {
    let city = Template::select("city", Vec::new())
        .with_name("City")
        .redraw_on(["country"])
        .with_redraw_handler(|deps, template| {
            let cities = match deps[0].as_ref().and_then(Value::as_str) {
                Some("no") => vec![SelectOption::new("osl", "Oslo"), SelectOption::new("brg", "Bergen")],
                Some("se") => vec![SelectOption::new("sto", "Stockholm"), SelectOption::new("got", "Gothenburg")],
                _ => Vec::new(),
            };
            template.clone().with_options(cities)
        });

    Template::group(vec![
        Template::header("Profile"),
        Template::string("name").with_name("Name").with_placeholder("Full name"),
        Template::number("age").with_name("Age"),
        Template::select(
            "country",
            vec![SelectOption::new("no", "Norway"), SelectOption::new("se", "Sweden")],
        )
        .with_name("Country"),
        city,
        Template::input("newsletter", InputKind::Toggle).with_name("Newsletter"),
        Template::string("email")
            .with_name("Email")
            .hidden_when(|form, _, _| form["newsletter"] != json!(true)),
        Template::array(
            "tags",
            vec![Template::string("value").with_name("Tag")],
        )
        .with_name("Tags")
        .sortable(true),
        Template::datetime("updated").with_name("Updated"),
    ])
}

#[component]
pub fn App() -> impl IntoView {
    let form = Form::new(demo_template());
    let value = RwSignal::new(Value::Null);
    let initial = json!({
        "name": "Al",
        "age": 40,
        "country": "no",
        "city": "osl",
        "newsletter": false,
        "tags": [{"value": "a"}, {"value": "b"}]
    });

    view! {
        <div class="fl-page">
            <h1 class="fl-title">"Formloom"</h1>
            <div class="fl-columns">
                <FormView form=form initial=initial value=value />
                <pre class="fl-json-preview">
                    {move || serde_json::to_string_pretty(&value.get()).unwrap_or_default()}
                </pre>
            </div>
        </div>
    }
}

#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Debug);
    leptos::mount::mount_to_body(App);
}
