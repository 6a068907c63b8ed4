//! sectiondom - inspect and transform DTBook-style documents from the shell

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use sectiondom::section::ROOT_SECTION;
use sectiondom::{
    FileResource, SectionRef, SectionTree, ServiceConfig, TransformParameters,
    TransformedResult, XmlService,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Name the command line registers its stylesheet under
const STYLESHEET: &str = "stylesheet";

#[derive(Parser)]
#[command(name = "sectiondom")]
#[command(version)]
#[command(about = "Section trees and transforms for DTBook-style XML", long_about = None)]
struct Cli {
    /// Service configuration (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the section tree
    Outline {
        file: PathBuf,
    },

    /// Print the nodes an XPath selects within a section
    Filter {
        file: PathBuf,
        section: String,
        xpath: String,
    },

    /// Run a stylesheet over a section
    Transform {
        file: PathBuf,
        section: String,
        stylesheet: PathBuf,

        /// Stylesheet parameter, repeatable
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .filter(|(k, _)| !k.is_empty())
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", raw))
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:?}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let config = match &cli.config {
        Some(path) => ServiceConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ServiceConfig::default(),
    };
    let service = XmlService::new(config)?;

    match cli.command {
        Commands::Outline { file } => {
            let name = load(&service, &file)?;
            let tree = service
                .document(&name)
                .ok_or_else(|| anyhow!("document {} vanished", name))?
                .tree();
            print_outline(&tree, ROOT_SECTION, 0);
            for warning in tree.warnings() {
                eprintln!("warning: {}", warning);
            }
        }

        Commands::Filter {
            file,
            section,
            xpath,
        } => {
            let name = load(&service, &file)?;
            print_result(service.filter(&name, &section, &xpath)?);
        }

        Commands::Transform {
            file,
            section,
            stylesheet,
            params,
        } => {
            let name = load(&service, &file)?;
            let stylesheet = stylesheet
                .canonicalize()
                .with_context(|| format!("Cannot find stylesheet {}", stylesheet.display()))?;
            service.load_stylesheet(STYLESHEET, &stylesheet.to_string_lossy(), &[])?;

            let mut parameters = TransformParameters::new();
            for (key, value) in params {
                parameters.set(&key, value);
            }
            print_result(service.get_transformed(&name, &section, STYLESHEET, Some(&parameters))?);
        }
    }
    Ok(())
}

/// Load `file` under its file stem
fn load(service: &XmlService, file: &Path) -> Result<String> {
    let name = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    service
        .load_document(
            &name,
            Arc::new(FileResource::new(file)),
            Arc::new(service.config().element_rules()),
        )
        .with_context(|| format!("Failed to load {}", file.display()))?;
    Ok(name)
}

fn print_outline(tree: &SectionTree, section: SectionRef, depth: usize) {
    let node = tree.node(section);
    println!(
        "{:indent$}{} [{}] {}",
        "",
        node.id,
        node.element_type,
        node.title,
        indent = depth * 2
    );
    for &child in tree.children(section) {
        print_outline(tree, child, depth + 1);
    }
}

fn print_result(result: Option<TransformedResult>) {
    match result {
        Some(result) => println!("{}", result.to_xml()),
        None => eprintln!("(no result)"),
    }
}
