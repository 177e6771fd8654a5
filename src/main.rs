mod cli;

use std::error::Error;

use clap::Parser;
use thiserror::Error;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dt_form_parser as parser;
use parser::{CompilerConfig, DefaultChoice, Placeholder};

#[derive(Debug, Error)]
enum InputError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to fetch {url}: {source}")]
    Fetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// Reads a local file, or fetches `input` when it is an HTTP(S) URL.
fn load(input: &str) -> Result<String, InputError> {
    if input.starts_with("http://") || input.starts_with("https://") {
        debug!(url = input, "fetching schema");
        let fetch = |source| InputError::Fetch {
            url: input.to_string(),
            source,
        };
        reqwest::blocking::get(input)
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.text())
            .map_err(fetch)
    } else {
        std::fs::read_to_string(input).map_err(|source| InputError::Read {
            path: input.to_string(),
            source,
        })
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = cli::Cli::parse();
    let options = roxmltree::ParsingOptions {
        allow_dtd: cli.allow_dtd,
        ..roxmltree::ParsingOptions::default()
    };

    let xsd = load(&cli.input)?;
    let schema = parser::parse_document(&xsd, "schema", options)?;

    let instance = cli.instance.as_ref().map(std::fs::read_to_string).transpose()?;
    let instance = instance
        .as_deref()
        .map(|xml| parser::parse_document(xml, "instance", options))
        .transpose()?;

    let config = CompilerConfig {
        placeholder: match cli.placeholder {
            cli::Placeholder::None => Placeholder::None,
            cli::Placeholder::Template => Placeholder::Template,
        },
        default_choice: match cli.default_choice {
            cli::DefaultChoice::None => DefaultChoice::None,
            cli::DefaultChoice::First => DefaultChoice::First,
        },
        max_depth: cli.max_depth,
        module_tag_name: cli.module_tag_name,
    };

    let (tree, root) =
        parser::compile_schema(&schema, config, cli.element.as_deref(), instance.as_ref())?;
    info!(nodes = tree.len(), "compiled form");

    match cli.format {
        cli::Format::Json => {
            let json = serde_json::to_string_pretty(&tree.view(root))?;
            println!("{json}");
        }
        cli::Format::Xml => println!("{}", tree.to_xml(root)?),
    }
    Ok(())
}
