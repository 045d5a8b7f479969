//! Template system for the built-in generator

// Internal imports (std, crate)
use std::{
    fmt,
    path::{Path, PathBuf},
    sync::Arc,
};

use crate::{
    builders::{builder_for, builtin_generators, ContextBuilder, RenderJob},
    error::{Error, Result},
    generator::GenerationTask,
    openapi::OpenApiContext,
};

// External imports (alphabetized)
use serde_json::Value as JsonValue;
use tera::{Context, Tera};

/// Loads the templates of one generator target and renders contracts with them.
///
/// Templates found in the override directory replace built-in templates of the
/// same name; any other templates there are available to `include`/`import`.
#[derive(Clone)]
pub struct TemplateManager {
    /// Cached Tera template engine instance
    tera: Arc<Tera>,
    /// Builds render jobs for the generator target
    builder: Arc<dyn ContextBuilder + Send + Sync>,
    /// Override directory, if one is configured
    template_dir: Option<PathBuf>,
    /// Built-in template names replaced by the override directory
    overridden: Vec<String>,
}

impl fmt::Debug for TemplateManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateManager")
            .field("generator", &self.builder.generator_name())
            .field("template_dir", &self.template_dir)
            .field("overridden", &self.overridden)
            .finish()
    }
}

impl TemplateManager {
    /// Create a TemplateManager for a generator target
    ///
    /// # Arguments
    /// * `generator_name` - Generator with built-in templates (e.g. `kotlin-spring`)
    /// * `template_dir` - Optional directory of `*.tera` files overriding the built-ins
    ///
    /// # Returns
    /// A new `TemplateManager`, or an error if the generator has no built-in
    /// templates or the override directory is missing or fails to parse.
    pub async fn new(generator_name: &str, template_dir: Option<PathBuf>) -> Result<Self> {
        let builder = builder_for(generator_name).ok_or_else(|| {
            Error::config(format!(
                "no built-in templates for generator '{}' (available: {}); configure generator.command to use an external generator",
                generator_name,
                builtin_generators().join(", ")
            ))
        })?;

        let mut builtin = Tera::default();
        builtin.add_raw_templates(builder.builtin_templates())?;

        let (tera, overridden) = match &template_dir {
            Some(dir) => {
                if !tokio::fs::try_exists(dir).await.unwrap_or(false) {
                    return Err(Error::template(format!(
                        "Template directory not found: {}",
                        dir.display()
                    )));
                }
                let dir_str = dir.to_str().ok_or_else(|| {
                    Error::template(format!(
                        "Template path contains invalid UTF-8: {}",
                        dir.display()
                    ))
                })?;
                let mut custom = Tera::new(&format!("{}/**/*.tera", dir_str))?;
                let mut overridden: Vec<String> = custom
                    .get_template_names()
                    .filter(|name| builtin.get_template(name).is_ok())
                    .map(String::from)
                    .collect();
                overridden.sort();
                // Templates already present in `custom` win over the built-ins
                custom.extend(&builtin)?;
                (custom, overridden)
            }
            None => (builtin, Vec::new()),
        };

        if !overridden.is_empty() {
            log::info!("Using template overrides: {}", overridden.join(", "));
        }

        Ok(Self {
            tera: Arc::new(tera),
            builder: Arc::from(builder),
            template_dir,
            overridden,
        })
    }

    /// Generator target these templates belong to
    pub fn generator_name(&self) -> &'static str {
        self.builder.generator_name()
    }

    /// Override directory, if configured
    pub fn template_dir(&self) -> Option<&Path> {
        self.template_dir.as_deref()
    }

    /// Built-in templates replaced by the override directory
    pub fn overridden_templates(&self) -> &[String] {
        &self.overridden
    }

    /// Get a reference to the Tera template engine
    pub fn tera(&self) -> &Tera {
        &self.tera
    }

    /// Check if a template exists
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template(name).is_ok()
    }

    /// List all available templates
    pub fn list_templates(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(String::from).collect();
        names.sort();
        names
    }

    /// Render every file for one contract into the task's output directory.
    ///
    /// Returns the written paths relative to the output directory.
    pub async fn generate(
        &self,
        contract: &OpenApiContext,
        task: &GenerationTask,
    ) -> Result<Vec<PathBuf>> {
        let jobs = self.builder.build(contract, task)?;
        let mut written = Vec::with_capacity(jobs.len());
        for job in jobs {
            let RenderJob {
                template,
                destination,
                context,
            } = job;
            self.render_to_file(template, &context, &task.output_dir.join(&destination))
                .await?;
            written.push(destination);
        }
        Ok(written)
    }

    /// Render one template with a JSON object context and write the result
    pub async fn render_to_file(
        &self,
        template_name: &str,
        context: &JsonValue,
        output_path: &Path,
    ) -> Result<()> {
        let content = self.render(template_name, context)?;

        let parent = output_path.parent().ok_or_else(|| {
            Error::template(format!("Invalid output path: {}", output_path.display()))
        })?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::at_path(parent, e))?;

        log::debug!(
            "Writing {} ({} bytes) from {}",
            output_path.display(),
            content.len(),
            template_name
        );
        tokio::fs::write(output_path, &content)
            .await
            .map_err(|e| Error::at_path(output_path, e))?;
        Ok(())
    }

    /// Render one template to a string
    pub fn render(&self, template_name: &str, context: &JsonValue) -> Result<String> {
        let context_map = context
            .as_object()
            .ok_or_else(|| Error::template("Context must be a JSON object"))?;

        let mut tera_context = Context::new();
        for (k, v) in context_map {
            tera_context.insert(k, v);
        }

        self.tera.render(template_name, &tera_context).map_err(|e| {
            log::error!("Template rendering failed for '{}': {:?}", template_name, e);
            log::error!(
                "Available context keys: {:?}",
                context_map.keys().collect::<Vec<_>>()
            );
            Error::template(format!(
                "Failed to render template '{}': {}",
                template_name,
                error_chain(&e)
            ))
        })
    }
}

/// Tera wraps the interesting cause several levels deep
fn error_chain(err: &tera::Error) -> String {
    use std::error::Error as StdError;

    let mut message = err.to_string();
    let mut source = StdError::source(err);
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, GeneratorOptions};
    use crate::contract::ContractFile;
    use serde_json::json;
    use tempfile::tempdir;

    const CONTRACT: &str = r#"
openapi: 3.0.0
info:
  title: Widget API
  version: 1.0.0
paths:
  /widgets/{id}:
    get:
      operationId: getWidget
      summary: Fetch one widget
      tags: [Widget]
      parameters:
        - name: id
          in: path
          schema:
            type: string
      responses:
        '200':
          description: ok
          content:
            application/json:
              schema:
                $ref: '#/components/schemas/Widget'
components:
  schemas:
    Widget:
      type: object
      required: [id]
      properties:
        id:
          type: string
        label:
          type: string
          description: Display label
    Color:
      type: string
      enum: [red, green]
"#;

    fn task(output_dir: &Path, options: GeneratorOptions) -> GenerationTask {
        let mut config = Config::new("com.example");
        config.project_root = output_dir.to_path_buf();
        config.scratch_dir = PathBuf::from("scratch");
        config.generator.options = options;
        GenerationTask::new(
            &config,
            ContractFile {
                path: output_dir.join("widgets.yaml"),
                name: "widgets.yaml".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_unknown_generator_is_rejected() {
        let result = TemplateManager::new("cobol-cics", None).await;
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_missing_template_dir_is_rejected() {
        let result =
            TemplateManager::new("kotlin-spring", Some(PathBuf::from("/nonexistent/tpl"))).await;
        assert!(matches!(result, Err(Error::Template(_))));
    }

    #[tokio::test]
    async fn test_generate_builtin_kotlin() -> Result<()> {
        let dir = tempdir()?;
        let manager = TemplateManager::new("kotlin-spring", None).await?;
        assert!(manager.has_template("api.kt.tera"));
        assert_eq!(manager.generator_name(), "kotlin-spring");

        let contract = OpenApiContext::parse_content(CONTRACT).map_err(Error::openapi)?;
        let task = task(dir.path(), GeneratorOptions::default());
        let written = manager.generate(&contract, &task).await?;
        assert_eq!(written.len(), 3);

        let api_dir = task.output_dir.join("src/main/kotlin/com/example/api");
        let api = tokio::fs::read_to_string(api_dir.join("WidgetApi.kt")).await?;
        assert!(api.contains("package com.example.api"));
        assert!(api.contains("interface WidgetApi {"));
        assert!(api.contains("* Fetch one widget"));
        assert!(api.contains("value = [\"/widgets/{id}\"]"));
        assert!(api.contains(
            "fun getWidget(@PathVariable(\"id\") id: kotlin.String): ResponseEntity<Widget> {"
        ));
        assert!(api.contains("import jakarta.validation.Valid"));

        let model_dir = task.output_dir.join("src/main/kotlin/com/example/model");
        let widget = tokio::fs::read_to_string(model_dir.join("Widget.kt")).await?;
        assert!(widget.contains("data class Widget("));
        assert!(widget.contains(
            "@get:JsonProperty(\"id\", required = true) val id: kotlin.String,"
        ));
        assert!(widget.contains("/** Display label */"));
        assert!(widget.contains("val label: kotlin.String? = null"));

        let color = tokio::fs::read_to_string(model_dir.join("Color.kt")).await?;
        assert!(color.contains("enum class Color(@get:JsonValue val value: kotlin.String) {"));
        assert!(color.contains("RED(\"red\"),"));
        assert!(color.contains("GREEN(\"green\");"));

        assert!(!task
            .output_dir
            .join("src/main/kotlin/com/example/invoker")
            .exists());
        Ok(())
    }

    #[tokio::test]
    async fn test_bootstrap_rendered_when_not_interface_only() -> Result<()> {
        let dir = tempdir()?;
        let manager = TemplateManager::new("kotlin-spring", None).await?;
        let contract = OpenApiContext::parse_content(CONTRACT).map_err(Error::openapi)?;
        let options = GeneratorOptions {
            interface_only: false,
            use_spring_boot3: false,
            ..Default::default()
        };
        let task = task(dir.path(), options);
        manager.generate(&contract, &task).await?;

        let app = tokio::fs::read_to_string(
            task.output_dir
                .join("src/main/kotlin/com/example/invoker/Application.kt"),
        )
        .await?;
        assert!(app.contains("@SpringBootApplication"));
        assert!(app.contains("runApplication<Application>(*args)"));

        let api = tokio::fs::read_to_string(
            task.output_dir
                .join("src/main/kotlin/com/example/api/WidgetApi.kt"),
        )
        .await?;
        assert!(api.contains("import javax.validation.Valid"));
        Ok(())
    }

    #[tokio::test]
    async fn test_template_dir_overrides_builtin() -> Result<()> {
        let dir = tempdir()?;
        let templates = dir.path().join("template");
        tokio::fs::create_dir_all(&templates).await?;
        tokio::fs::write(
            templates.join("model.kt.tera"),
            "package {{ package }}\n\n// custom {{ model.class_name }}\n",
        )
        .await?;

        let manager = TemplateManager::new("kotlin-spring", Some(templates.clone())).await?;
        assert_eq!(manager.overridden_templates(), ["model.kt.tera".to_string()]);
        assert_eq!(manager.template_dir(), Some(templates.as_path()));
        assert!(manager.has_template("api.kt.tera"));

        let rendered = manager.render(
            "model.kt.tera",
            &json!({"package": "com.example.model", "model": {"class_name": "Widget"}}),
        )?;
        assert_eq!(rendered, "package com.example.model\n\n// custom Widget\n");
        Ok(())
    }

    #[tokio::test]
    async fn test_render_requires_object_context() -> Result<()> {
        let manager = TemplateManager::new("kotlin-spring", None).await?;
        assert!(manager.render("api.kt.tera", &json!([1, 2])).is_err());
        assert!(manager.render("missing.tera", &json!({})).is_err());
        assert!(manager.list_templates().contains(&"model.kt.tera".to_string()));
        Ok(())
    }
}
