//! Categories command handler.

use clap::Args;
use codelogic_core::{config::AppConfig, AppResult};
use codelogic_grounding::CategoryMap;
use serde_json::{Map, Value};

/// List category codes and the documents they select
#[derive(Args, Debug)]
pub struct CategoriesCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl CategoriesCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let map = CategoryMap::from_config(config.corpus.categories.as_ref());

        if self.json {
            println!("{}", serde_json::to_string_pretty(&to_json(&map, &config.corpus.root))?);
            return Ok(());
        }

        for code in map.codes() {
            println!("{}", code);
            for doc in map.documents(code).unwrap_or_default() {
                println!("  {}{}", config.corpus.root, doc);
            }
        }

        Ok(())
    }
}

fn to_json(map: &CategoryMap, corpus_root: &str) -> Value {
    let mut out = Map::new();
    for code in map.codes() {
        let locators = map
            .documents(code)
            .unwrap_or_default()
            .iter()
            .map(|doc| Value::String(format!("{}{}", corpus_root, doc)))
            .collect();
        out.insert(code.to_string(), Value::Array(locators));
    }
    Value::Object(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_json_prefixes_root() {
        let value = to_json(&CategoryMap::builtin(), "docs/");
        assert_eq!(
            value["IRC"],
            json!(["docs/International_Residential_Code_2018.pdf"])
        );
        assert_eq!(value["ADA"].as_array().unwrap().len(), 2);
    }
}
