//! Build automation tasks for invflow
//!
//! - `generate-cli-docs`: render the `invflow` CLI reference from the clap definitions

use clap::Parser;
use std::fs;
use std::path::{Path, PathBuf};

const REFERENCE_FILE: &str = "cli-reference.md";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Build automation tasks for invflow", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Parser)]
enum Command {
    /// Generate the CLI reference in Markdown
    GenerateCliDocs {
        /// Output directory for generated documentation
        #[arg(short, long, default_value = "docs")]
        output_dir: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::GenerateCliDocs { output_dir } => {
            let file_path = write_cli_docs(&output_dir)?;
            println!("Generated CLI documentation at: {}", file_path.display());
        },
    }

    Ok(())
}

/// Write the reference into `output_dir`, creating it if needed.
fn write_cli_docs(output_dir: &Path) -> anyhow::Result<PathBuf> {
    fs::create_dir_all(output_dir)?;
    let file_path = output_dir.join(REFERENCE_FILE);
    fs::write(&file_path, render_cli_docs())?;
    Ok(file_path)
}

fn render_cli_docs() -> String {
    let markdown = clap_markdown::help_markdown::<invflow_ingest::Cli>();

    format!(
        r#"# invflow CLI Reference

`invflow` downloads a tab-separated inventory, converts it to a JSON dataset
and writes the maximum, minimum and median of one numeric column.

## Installation

```bash
cargo install --path crates/invflow-ingest
```

## Quick Start

```bash
# Defaults: public inventory URL, column "Volume 2015", artifacts in ./
invflow

# Another source and column, artifacts under ./run
invflow --url https://example.org/inventory.tsv --column Qty --data-dir run

# Steps described in a workflow file
invflow --config workflow.json
```

## Workflow File

```json
{{
  "workflow": [
    {{ "name": "fetch", "input": "https://example.org/data/", "filename": "inventory.tsv" }},
    {{ "name": "convert", "input": "fetch", "filename": "data.json" }},
    {{ "name": "stats", "input": "data.json", "filename": "stats.json",
      "extra": [{{ "column_name": "Volume 2015" }}] }}
  ]
}}
```

## Exit Codes

| Code | Meaning |
|------|---------|
| 0 | Both artifacts written |
| 1 | A stage failed (bad status, malformed data, missing column, ...) |
| 2 | The source could not be reached within the retry budget |

## Commands

{}

## Environment Variables

Every flag with an `INVFLOW_*` name can be set from the environment or a
`.env` file. Logging is controlled separately:

- `LOG_LEVEL` - `trace`, `debug`, `info`, `warn`, `error`
- `LOG_OUTPUT` - `console`, `file`, `both`
- `LOG_FORMAT` - `text`, `json`
- `LOG_DIR`, `LOG_FILE_PREFIX`, `LOG_FILTER`

---

*Generated from the CLI source code. To update, run `cargo xtask generate-cli-docs`.*
"#,
        markdown
    )
}
