use anyhow::Context;
use clap::Parser;
use formloom::cli::{Cli, Command, FormInput};
use formloom::config::{load_templates_from_dir, watcher::TemplateWatcher, Settings};
use formloom::{ComponentRegistry, Form, ViewKind};
use serde_json::Value;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::new_with_cli(&cli)?;

    // Initialize tracing (stderr, stdout carries the JSON)
    let level: tracing::Level = settings
        .logging
        .level
        .parse()
        .context("Invalid logging level")?;
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Command::Render {
            input,
            include_hidden,
            watch,
        } => {
            render(&settings, input, *include_hidden).await?;
            if *watch {
                watch_template(settings.clone(), input.clone(), *include_hidden).await?;
            }
        }
        Command::Edit {
            input,
            set,
            add,
            remove,
            include_hidden,
        } => {
            let form = build_form(&settings, input).await?;
            for path in remove {
                let item = form
                    .find_item(path)
                    .await
                    .with_context(|| format!("No array item at '{}'", path))?;
                form.remove_item(item).await?;
            }
            for path in add {
                let array = form
                    .find_array(path)
                    .await
                    .with_context(|| format!("No array at '{}'", path))?;
                form.add_item(array).await?;
            }
            for (path, raw) in set {
                form.edit(path, raw.as_str())
                    .await
                    .with_context(|| format!("Failed to set '{}'", path))?;
            }
            info!(cycles = form.cycles().await, "Edits applied");
            print_json(&settings, &form.json(*include_hidden).await)?;
        }
        Command::Fields { input } => {
            let form = build_form(&settings, input).await?;
            let snapshot = form.snapshot().await;
            for view in snapshot.flatten() {
                let kind = match &view.content {
                    ViewKind::Input { kind, .. } => kind.type_name().to_string(),
                    ViewKind::Custom { type_name, .. } => type_name.clone(),
                    ViewKind::Array { sortable: true } => "array (sortable)".to_string(),
                    ViewKind::Array { sortable: false } => "array".to_string(),
                    _ => continue,
                };
                let path = view.resolved.clone().unwrap_or_default();
                let hidden = if view.hidden { " (hidden)" } else { "" };
                println!("{:<32} {}{}", path, kind, hidden);
            }
        }
        Command::Check { dir } => {
            let dir = dir.to_string_lossy();
            let templates = load_templates_from_dir(&dir, &settings.form.default_type)?;
            for (path, template) in &templates {
                println!("ok  {} ({})", path.display(), template.type_name());
            }
            info!("{} template(s) loaded from {}", templates.len(), dir);
        }
    }

    Ok(())
}

async fn build_form(settings: &Settings, input: &FormInput) -> anyhow::Result<Form> {
    let template = settings.load_template(&input.template)?;
    let value = load_value(input)?;

    let form = Form::with_settings(template, ComponentRegistry::with_builtins(), &settings.form);
    form.build(value)
        .await
        .with_context(|| format!("Failed to build form from {}", input.template.display()))?;
    Ok(form)
}

fn load_value(input: &FormInput) -> anyhow::Result<Value> {
    if let Some(json) = &input.value_json {
        return serde_json::from_str(json).context("Invalid --json value");
    }
    match &input.value {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid JSON in {}", path.display()))
        }
        None => Ok(Value::Null),
    }
}

async fn render(settings: &Settings, input: &FormInput, include_hidden: bool) -> anyhow::Result<()> {
    let form = build_form(settings, input).await?;
    print_json(settings, &form.json(include_hidden).await)
}

fn print_json(settings: &Settings, value: &Value) -> anyhow::Result<()> {
    let out = if settings.output.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", out);
    Ok(())
}

async fn watch_template(settings: Settings, input: FormInput, include_hidden: bool) -> anyhow::Result<()> {
    let handle = tokio::runtime::Handle::current();
    let paths = vec![input.template.clone()];
    let _watcher = TemplateWatcher::new(paths, move || {
        if let Err(e) = handle.block_on(render(&settings, &input, include_hidden)) {
            error!("Failed to re-render: {:#}", e);
        }
    })?;

    tokio::signal::ctrl_c().await?;
    info!("Stopped watching");
    Ok(())
}
