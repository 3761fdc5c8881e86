//! Decode an administrative XML message against a schema catalog.
//!
//! Usage:
//!   decode_msg --schema catalog.msgs [--schema more.msgs] [--root Name] [--ns urn] [FILE.xml]
//!
//! Reads the message from FILE.xml or stdin. Without --root, the document
//! element's name is used to pick the schema. `--batch` decodes a
//! BatchRequest envelope instead. Exit code 1 on decode failure.

use adminmsg::{batch, dump, parse_schemas, Codec, SchemaRegistry};
use anyhow::{bail, Context};
use std::io::Read;

struct Options {
    schema_paths: Vec<String>,
    root: Option<String>,
    namespace: Option<String>,
    batch: bool,
    input: Option<String>,
}

fn parse_args() -> anyhow::Result<Options> {
    let mut opts = Options {
        schema_paths: Vec::new(),
        root: None,
        namespace: None,
        batch: false,
        input: None,
    };
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--schema" | "-s" => {
                opts.schema_paths
                    .push(args.next().context("--schema needs a path")?);
            }
            "--root" | "-r" => opts.root = Some(args.next().context("--root needs a name")?),
            "--ns" | "-n" => opts.namespace = Some(args.next().context("--ns needs a value")?),
            "--batch" | "-b" => opts.batch = true,
            other if other.starts_with('-') => bail!("unknown option {}", other),
            other => opts.input = Some(other.to_string()),
        }
    }
    if opts.schema_paths.is_empty() {
        bail!("at least one --schema catalog is required");
    }
    Ok(opts)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opts = parse_args()?;

    let mut registry = SchemaRegistry::new();
    for path in &opts.schema_paths {
        let src = std::fs::read_to_string(path).with_context(|| format!("read {}", path))?;
        let schemas = parse_schemas(&src).map_err(|e| anyhow::anyhow!("{}: {}", path, e))?;
        registry
            .register_all(schemas)
            .with_context(|| format!("register schemas from {}", path))?;
    }
    let codec = Codec::new(registry).context("schema catalog")?;

    let bytes = match &opts.input {
        Some(path) => std::fs::read(path).with_context(|| format!("read {}", path))?,
        None => {
            let mut buf = Vec::new();
            std::io::stdin().read_to_end(&mut buf)?;
            buf
        }
    };

    if opts.batch {
        let result = batch::decode_batch(&codec, &bytes)?;
        for msg in &result.messages {
            println!("{} {}", msg.root, dump::summary_line(&msg.value));
        }
        for failed in &result.failed {
            eprintln!("[{}] <{}> failed: {}", failed.index, failed.root, failed.reason);
        }
        if result.skipped > 0 {
            eprintln!("{} member(s) skipped after failure", result.skipped);
        }
        if !result.failed.is_empty() {
            std::process::exit(1);
        }
        return Ok(());
    }

    // Without --root, sniff the document element name.
    let root = match &opts.root {
        Some(r) => r.clone(),
        None => {
            let text = std::str::from_utf8(&bytes).context("input is not UTF-8")?;
            adminmsg::xml::XmlElement::parse(text)
                .map_err(|e| anyhow::anyhow!("malformed input: {}", e))?
                .name
        }
    };

    let value = codec.decode(&root, opts.namespace.as_deref(), &bytes)?;
    println!("{}", root);
    println!("{}", dump::message_to_dump(&value, 0));
    Ok(())
}
