use anyhow::Result;
use serde::Serialize;

use super::RecipeOptions;
use crate::recipe::{CopyRule, Recipe, RecipeMetadata};

/// Everything the orchestrator may want to know before running the recipe
#[derive(Serialize, Debug)]
struct RecipeInfo<'a> {
    #[serde(flatten)]
    metadata: &'a RecipeMetadata,
    archive_url: String,
    source_dir: String,
    copy_rules: Vec<CopyRule>,
}

impl<'a> RecipeInfo<'a> {
    fn new(recipe: &'a Recipe) -> Self {
        Self {
            metadata: recipe.metadata(),
            archive_url: recipe.archive_url(),
            source_dir: recipe.source_dir_name(),
            copy_rules: recipe.copy_rules(),
        }
    }
}

/// Render recipe identity as human-readable text or JSON.
pub fn render_info(recipe: &Recipe, json: bool) -> Result<String> {
    let info = RecipeInfo::new(recipe);
    if json {
        return Ok(serde_json::to_string_pretty(&info)?);
    }

    let meta = info.metadata;
    let mut out = String::new();
    out.push_str(&format!("{} {}\n", meta.name, meta.version));
    out.push_str(&format!("  License:    {}\n", meta.license));
    out.push_str(&format!("  Homepage:   {}\n", meta.url));
    out.push_str(&format!("  Archive:    {}\n", info.archive_url));
    out.push_str(&format!("  Source dir: {}\n", info.source_dir));
    out.push_str(&format!("  Generators: {}\n", meta.generators.join(", ")));
    out.push_str("  Requires:\n");
    for dep in &meta.dependencies {
        out.push_str(&format!("    {:<24}{}\n", dep.name(), dep));
    }
    out.push_str("  Copy rules:\n");
    for rule in &info.copy_rules {
        let dest = if rule.destination_dir.is_empty() {
            "."
        } else {
            rule.destination_dir.as_str()
        };
        out.push_str(&format!(
            "    {} -> {}{}\n",
            rule.pattern,
            dest,
            if rule.preserve_path_structure {
                " (keep path)"
            } else {
                ""
            }
        ));
    }
    Ok(out)
}

pub fn info(options: RecipeOptions, json: bool) -> Result<()> {
    print!("{}", render_info(&options.recipe(), json)?);
    Ok(())
}
