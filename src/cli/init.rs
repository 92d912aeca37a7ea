//! Project initialization command

use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use crate::config::CONFIG_FILE;

const GRAPH_FILE: &str = "module-graph.json";

/// Initialize a new configuration
#[derive(Args, Debug)]
pub struct InitCommand {
    /// Project directory
    #[arg(default_value = ".")]
    pub dir: String,

    /// Project name written to the config
    #[arg(short, long, default_value = "parking")]
    pub name: String,

    /// Overwrite existing files
    #[arg(short, long)]
    pub force: bool,
}

impl InitCommand {
    pub async fn execute(&self) -> Result<()> {
        let project_dir = Path::new(&self.dir);

        eprintln!("{} Initializing {}...\n", "→".blue(), self.name.cyan());

        if self.dir != "." {
            tokio::fs::create_dir_all(project_dir)
                .await
                .context("Failed to create project directory")?;
        }

        self.write_file(project_dir, CONFIG_FILE, &self.generate_config()).await?;
        self.write_file(project_dir, GRAPH_FILE, generate_graph()).await?;

        eprintln!("\n{} Project initialized successfully!\n", "✓".green().bold());

        eprintln!("  Next steps:");
        if self.dir != "." {
            eprintln!("    {} cd {}", "→".dimmed(), self.dir.cyan());
        }
        eprintln!("    {} replace {} with your bundler's graph dump", "→".dimmed(), GRAPH_FILE.cyan());
        eprintln!("    {} pagesplit build", "→".dimmed());
        eprintln!();

        Ok(())
    }

    async fn write_file(&self, dir: &Path, name: &str, content: &str) -> Result<()> {
        let path = dir.join(name);
        if !self.force && tokio::fs::try_exists(&path).await.unwrap_or(false) {
            anyhow::bail!("{} already exists (use --force to overwrite)", path.display());
        }

        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", name))?;
        eprintln!("  {} Created {}", "✓".green(), name.cyan());
        Ok(())
    }

    fn generate_config(&self) -> String {
        format!(
            r#"[project]
name = "{name}"

[graph]
path = "{graph}"

[entries]
home = ["babel-polyfill", "./src/pages/home/main.js"]
map = ["babel-polyfill", "./src/pages/map/main.js"]
sharedparkinglot-map = ["babel-polyfill", "./src/pages/sharedparkinglot-map/main.js"]

[output]
filename = "[name]/[contenthash].[ext]"
hash_length = 8

[split_chunks]
min_size = 20000
min_chunks = 1
max_async_requests = 30
max_initial_requests = 30

[[split_chunks.cache_groups]]
name = "mapStyles"
chunk_name = "map"
kind = "style"
page = "map"
enforce = true

[[split_chunks.cache_groups]]
name = "sharedparkinglotMapStyles"
chunk_name = "sharedparkinglot-map"
kind = "style"
page = "sharedparkinglot-map"
enforce = true

[[split_chunks.cache_groups]]
name = "defaultVendors"
test = '[\\/]node_modules[\\/]'
priority = -10

[[split_chunks.cache_groups]]
name = "default"
priority = -20
min_chunks = 2
reuse_existing_chunk = true
"#,
            name = self.name,
            graph = GRAPH_FILE,
        )
    }
}

/// Sample graph matching the starter config
fn generate_graph() -> &'static str {
    r#"{
  "modules": [
    {
      "id": "babel-polyfill",
      "size": 90000,
      "fingerprint": "babel-polyfill@6.26.0",
      "dependencies": ["./node_modules/core-js/index.js"],
      "issuers": [{"entry": "home"}, {"entry": "map"}, {"entry": "sharedparkinglot-map"}]
    },
    {
      "id": "./node_modules/core-js/index.js",
      "size": 60000,
      "fingerprint": "core-js@2.6.12",
      "issuers": [{"module": "babel-polyfill"}]
    },
    {
      "id": "./src/pages/home/main.js",
      "size": 12000,
      "dependencies": ["./src/common/api.js"],
      "issuers": [{"entry": "home"}]
    },
    {
      "id": "./src/pages/map/main.js",
      "size": 18000,
      "dependencies": ["./src/common/api.js", "./src/pages/map/map.css"],
      "issuers": [{"entry": "map"}]
    },
    {
      "id": "./src/pages/sharedparkinglot-map/main.js",
      "size": 15000,
      "dependencies": ["./src/common/api.js", "./src/pages/sharedparkinglot-map/map.css"],
      "issuers": [{"entry": "sharedparkinglot-map"}]
    },
    {
      "id": "./src/common/api.js",
      "size": 25000,
      "issuers": [{"module": "./src/pages/home/main.js"}]
    },
    {
      "id": "./src/pages/map/map.css",
      "size": 4000,
      "issuers": [{"module": "./src/pages/map/main.js"}]
    },
    {
      "id": "./src/pages/sharedparkinglot-map/map.css",
      "size": 4000,
      "issuers": [{"module": "./src/pages/sharedparkinglot-map/main.js"}]
    }
  ]
}
"#
}
