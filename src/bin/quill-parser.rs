use anyhow::{bail, Context, Result};
use clap::Parser;
use quill_html5::{parse_document_reader, parse_fragment, FragmentContext, Html5ParserOptions};
use quill_testing::tree_construction::generator::TreeOutputGenerator;
use std::fs::File;
use std::io::{BufReader, Read};

#[derive(Debug, Parser)]
#[clap(name = "Quill-Parser", version = "0.1.0", author = "Quill")]
struct Cli {
    /// File to parse, or "-" to read from stdin
    #[clap(required = true)]
    file: String,

    /// Base url of the document. Relative `<base href>` values are resolved against it.
    #[clap(short = 'b', long = "base")]
    base: Option<String>,

    /// Character encoding label of the input (defaults to UTF-8 with BOM sniffing)
    #[clap(short = 'e', long = "encoding")]
    encoding: Option<String>,

    /// Parse the input as a fragment in the given context element ("td", "svg path", ...)
    #[clap(short = 'f', long = "fragment")]
    fragment: Option<String>,

    /// Parse as if scripting is disabled
    #[clap(long = "no-scripting")]
    no_scripting: bool,

    /// Maximum number of parse errors to report
    #[clap(long = "errors", default_value_t = 100)]
    errors: usize,

    /// Print the parse errors as JSON
    #[clap(long = "json")]
    json: bool,

    /// Record the source position of every element
    #[clap(long = "positions")]
    positions: bool,

    /// Keep the source spelling of tag and attribute names
    #[clap(long = "preserve-case")]
    preserve_case: bool,

    /// Increase log verbosity (-v for debug, -vv for trace)
    #[clap(short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn open_input(file: &str) -> Result<Box<dyn Read>> {
    if file == "-" {
        return Ok(Box::new(std::io::stdin().lock()));
    }

    let file = File::open(file).with_context(|| format!("cannot open {file}"))?;
    Ok(Box::new(BufReader::new(file)))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    simple_logger::SimpleLogger::new().with_level(level).init()?;

    let mut input = open_input(&cli.file)?;
    let options = Html5ParserOptions::new()
        .scripting_enabled(!cli.no_scripting)
        .track_errors(cli.errors)
        .track_source_positions(cli.positions)
        .preserve_tag_case(cli.preserve_case)
        .preserve_attribute_case(cli.preserve_case);

    let (lines, errors) = match &cli.fragment {
        Some(context) => {
            if cli.encoding.is_some() {
                bail!("an encoding can only be given when parsing a document");
            }

            let mut bytes = Vec::new();
            input
                .read_to_end(&mut bytes)
                .with_context(|| format!("cannot read {}", cli.file))?;

            let html = String::from_utf8_lossy(&bytes);
            let context = FragmentContext::from_qualified_name(context);
            let fragment = parse_fragment(&html, Some(&context), cli.base.as_deref(), Some(options));

            let generator = TreeOutputGenerator::new(&fragment.document);
            let lines = match fragment.document.document_element() {
                Some(root) => generator.generate_from(root),
                None => vec![],
            };
            (lines, fragment.document.errors().to_vec())
        }
        None => {
            let document = parse_document_reader(input, cli.encoding.as_deref(), cli.base.as_deref(), Some(options))
                .with_context(|| format!("cannot parse {}", cli.file))?;

            if let Some(base_url) = document.base_url() {
                log::info!("document base url: {base_url}");
            }

            let lines = TreeOutputGenerator::new(&document).generate();
            (lines, document.errors().to_vec())
        }
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&errors)?);
        return Ok(());
    }

    println!("Generated tree:\n");
    for line in lines {
        println!("{line}");
    }

    if !errors.is_empty() {
        println!();
    }
    for e in errors {
        println!("Parse Error: {e}");
    }

    Ok(())
}
