//! # docform CLI
//!
//! Usage:
//!   docform record.json --kind invoice -o invoice.pdf
//!   cat po.json | docform --kind purchase-order --settings settings.json --images ./images
//!   docform --example report > report.json

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use docform::{DocformError, DocumentKind, DocumentRenderer, ImageStore, JsonFileStore};
use tracing::error;

const USAGE: &str = "usage: docform [record.json] [--kind invoice|purchase-order|report] \
[--settings <file>] [--images <dir>] [-o <out.pdf>] | --example <kind>";

struct Args {
    input: Option<String>,
    kind: DocumentKind,
    settings: String,
    images: String,
    output: String,
    example: Option<DocumentKind>,
}

fn parse_args(args: &[String]) -> Result<Args, String> {
    let mut parsed = Args {
        input: None,
        kind: DocumentKind::Invoice,
        settings: "docform-settings.json".to_string(),
        images: "images".to_string(),
        output: "output.pdf".to_string(),
        example: None,
    };

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| {
            iter.next()
                .cloned()
                .ok_or_else(|| format!("{} needs a value\n{}", flag, USAGE))
        };
        match arg.as_str() {
            "--kind" => {
                let v = value("--kind")?;
                parsed.kind = DocumentKind::parse(&v).ok_or_else(|| format!("unknown kind '{}'", v))?;
            }
            "--example" => {
                let v = value("--example")?;
                parsed.example =
                    Some(DocumentKind::parse(&v).ok_or_else(|| format!("unknown kind '{}'", v))?);
            }
            "--settings" => parsed.settings = value("--settings")?,
            "--images" => parsed.images = value("--images")?,
            "-o" | "--output" => parsed.output = value("-o")?,
            "-h" | "--help" => return Err(USAGE.to_string()),
            other if other.starts_with('-') => {
                return Err(format!("unknown flag '{}'\n{}", other, USAGE));
            }
            other => parsed.input = Some(other.to_string()),
        }
    }
    Ok(parsed)
}

fn run(args: Args) -> Result<(), DocformError> {
    if let Some(kind) = args.example {
        println!("{}", kind.example_json()?);
        return Ok(());
    }

    let input = match &args.input {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let store = JsonFileStore::open(&args.settings)?;
    let images = ImageStore::open(&args.images)?;
    let mut renderer = DocumentRenderer::new(store, images);

    let output = docform::render_json(&mut renderer, args.kind, &input)?;
    fs::write(&args.output, &output.bytes)?;
    eprintln!(
        "✓ Written {} ({} page(s), {}) to {}",
        output.size, output.page_count, output.elapsed, args.output
    );
    Ok(())
}

fn main() -> ExitCode {
    docform::init_logging();

    let args: Vec<String> = env::args().collect();
    let args = match parse_args(&args) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("✗ {}", e);
            ExitCode::FAILURE
        }
    }
}
