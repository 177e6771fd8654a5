use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Format {
    Json,
    Xml,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum Placeholder {
    None,
    Template,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum DefaultChoice {
    None,
    First,
}

#[derive(Parser)]
#[command(version, about)]
pub struct Cli {
    #[arg(help = "The schema file or URL")]
    pub input: String,

    #[arg(long, help = "An existing XML document to reconcile the form with")]
    pub instance: Option<PathBuf>,

    #[arg(long, help = "The global element to compile (defaults to the first one)")]
    pub element: Option<String>,

    #[arg(long, value_enum, default_value = "json")]
    pub format: Format,

    #[arg(
        long,
        value_enum,
        default_value = "none",
        help = "Nodes emitted for optional repeatable elements without occurrences"
    )]
    pub placeholder: Placeholder,

    #[arg(
        long,
        value_enum,
        default_value = "none",
        help = "Choice alternative selected in a fresh form"
    )]
    pub default_choice: DefaultChoice,

    #[arg(long, default_value_t = dt_form_parser::config::DEFAULT_MAX_DEPTH)]
    pub max_depth: usize,

    #[arg(
        long,
        default_value = dt_form_parser::config::DEFAULT_MODULE_TAG_NAME,
        help = "Element under <xs:appinfo> that holds an element's module key"
    )]
    pub module_tag_name: String,

    #[arg(long, help = "Allow a XML Document Type Definition (DTD) to occur")]
    pub allow_dtd: bool,
}
