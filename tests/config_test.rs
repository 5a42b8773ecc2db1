use formloom::config::{load_templates_from_dir, Settings};
use formloom::{Form, Template};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_load_templates_from_dir() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    let profile_json = r#"
[
    "name:string",
    {"key": "age", "type": "number", "default": 18},
    {"key": "tags", "type": "array", "config": {"sortable": true},
     "children": [{"key": "value"}]}
]
"#;
    fs::write(root.join("profile.json"), profile_json)?;

    let address_yaml = r#"
- key: street
- key: city
  type: select
  options:
    osl: Oslo
    brg: Bergen
- type: hr
"#;
    fs::write(root.join("address.yaml"), address_yaml)?;

    let settings_toml = r#"
[[fields]]
key = "enabled"
type = "toggle"

[[fields]]
key = "retries"
type = "number"
"#;
    fs::write(root.join("settings.toml"), settings_toml)?;

    // Not a template
    fs::write(root.join("README.md"), "# templates")?;

    let templates = load_templates_from_dir(root.to_str().unwrap(), "string")?;
    let names: Vec<String> = templates
        .iter()
        .filter_map(|(path, _)| path.file_name().map(|n| n.to_string_lossy().to_string()))
        .collect();
    assert_eq!(names, vec!["address.yaml", "profile.json", "settings.toml"]);

    for (_, template) in &templates {
        assert_eq!(template.type_name(), "group");
    }

    Ok(())
}

#[test]
fn test_load_templates_reports_broken_files() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();

    fs::write(root.join("good.json"), r#"["name:string"]"#)?;
    fs::write(root.join("bad.json"), "{ not json")?;
    fs::write(root.join("worse.yaml"), "42")?;

    let err = load_templates_from_dir(root.to_str().unwrap(), "string").unwrap_err();
    let message = err.to_string();
    assert!(message.contains("2 template(s)"));
    assert!(message.contains("bad.json"));
    assert!(message.contains("worse.yaml"));

    Ok(())
}

#[tokio::test]
async fn test_loaded_template_round_trips() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("profile.yaml");
    fs::write(
        &path,
        r#"
- key: name
- key: age
  type: number
- key: tags
  type: array
  children:
    - key: value
"#,
    )?;

    let settings = Settings::default();
    let template = settings.load_template(&path)?;
    let form = Form::new(template);

    let value = json!({"name": "Al", "age": 40, "tags": [{"value": "a"}, {"value": "b"}]});
    form.build(value.clone()).await?;
    assert_eq!(form.json(false).await, value);

    Ok(())
}

#[test]
fn test_default_type_from_settings() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let root = temp_dir.path();
    fs::write(
        root.join("formloom.toml"),
        "[form]\ndefault_type = \"text\"\n",
    )?;
    fs::write(root.join("notes.json"), r#"[{"key": "body"}]"#)?;

    let settings = Settings::from_root(root.to_str().unwrap())?;
    let template = settings.load_template(&root.join("notes.json"))?;
    let formloom::template::TemplateKind::Group(children) = &template.kind else {
        panic!("expected a group");
    };
    assert_eq!(children[0].type_name(), "text");

    let fallback = Template::from_value(&json!([{"key": "body"}]))?;
    let formloom::template::TemplateKind::Group(children) = &fallback.kind else {
        panic!("expected a group");
    };
    assert_eq!(children[0].type_name(), "string");

    Ok(())
}
