use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tera::{Context, Error as TeraError, Tera};

/// Get the path to the prompts directory
fn prompts_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("src").join("prompts")
}

pub fn load_prompt<T: Serialize>(template: &str, context_data: &T) -> Result<String, TeraError> {
    let mut tera = Tera::default();
    tera.add_raw_template("inline_template", template)?;
    let context = Context::from_serialize(context_data)?;
    let rendered = tera.render("inline_template", &context)?;
    Ok(rendered)
}

pub fn load_prompt_file<T: Serialize>(
    template_file: impl Into<PathBuf>,
    context_data: &T,
) -> Result<String, TeraError> {
    let template_path = template_file.into();
    // if the template_file doesn't exist, try to load it from the prompts directory
    let file_path = if !template_path.exists() {
        prompts_dir().join(template_path)
    } else {
        template_path
    };

    let template_content = fs::read_to_string(file_path)
        .map_err(|e| TeraError::chain("Failed to read template file", e))?;
    load_prompt(&template_content, context_data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    #[test]
    fn test_load_prompt() {
        let template = "Never forget you are the {{ assistant_role }} and I am the {{ user_role }}.";
        let mut context = HashMap::new();
        context.insert("assistant_role".to_string(), "assistant".to_string());
        context.insert("user_role".to_string(), "user".to_string());

        let result = load_prompt(template, &context).unwrap();
        assert_eq!(
            result,
            "Never forget you are the assistant and I am the user."
        );
    }

    #[test]
    fn test_load_prompt_missing_variable() {
        let template = "Our overall task is: {{ task }}.";
        let context: HashMap<String, String> = HashMap::new();
        let result = load_prompt(template, &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_load_prompt_file() {
        let template_content = "Task: {{ task }}";
        let temp_dir = tempfile::tempdir().unwrap();
        let file_path = temp_dir.path().join("test_template.md");
        fs::write(&file_path, template_content).unwrap();

        let mut context = HashMap::new();
        context.insert("task".to_string(), "find the answer".to_string());

        let result = load_prompt_file(file_path, &context).unwrap();
        assert_eq!(result, "Task: find the answer");

        temp_dir.close().unwrap();
    }

    #[test]
    fn test_load_prompt_file_missing_file() {
        let file_path = PathBuf::from("non_existent_template.md");
        let context: HashMap<String, String> = HashMap::new();

        let result = load_prompt_file(file_path, &context);
        assert!(result.is_err());
    }

    #[test]
    fn test_shipped_templates_render() {
        #[derive(Serialize)]
        struct ToolkitInfo {
            name: String,
            description: String,
            instructions: String,
        }

        #[derive(Serialize)]
        struct PromptContext {
            assistant_role: String,
            user_role: String,
            task: String,
            toolkits: Vec<ToolkitInfo>,
        }

        let context = PromptContext {
            assistant_role: "assistant".to_string(),
            user_role: "user".to_string(),
            task: "find the cheapest laptop".to_string(),
            toolkits: vec![ToolkitInfo {
                name: "search".to_string(),
                description: "Search the web".to_string(),
                instructions: "Prefer exact queries.".to_string(),
            }],
        };

        for template in ["assistant.md", "user.md"] {
            let rendered = load_prompt_file(template, &context).unwrap();
            assert!(rendered.contains("find the cheapest laptop"), "{template}");
        }
    }
}
