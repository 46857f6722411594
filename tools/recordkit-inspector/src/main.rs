//! Record Inspector CLI
//!
//! Parses hex-encoded messages against a set of demo schemas and prints the
//! resulting field trees.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use recordkit::fields::{Integer, RawBytes, Text, VarUInt};
use recordkit::registry::{self, RegistryBuilder};
use recordkit::{
    ActionArg, ActionDescriptor, DefaultValue, Endian, FieldOptions, ParseOptions, Registry, Schema, SchemaBuilder,
    Value,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "recordkit-inspector")]
#[command(about = "Inspect binary records against the demo schemas")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered schemas and their derivations
    Schemas,

    /// Build a default record and print its encoding
    Build {
        /// Schema name
        schema: String,
    },

    /// Parse a hex-encoded message
    Parse {
        /// Schema name
        schema: String,
        /// Message bytes as hex
        input: String,
        /// Maximum section depth
        #[arg(long, default_value_t = recordkit::tree::MAX_NESTING_DEPTH)]
        max_depth: usize,
        /// Allow sized sections with unparsed bytes
        #[arg(long)]
        lenient: bool,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let registry = registry::global_or_init(define_demo_schemas)?;

    match cli.command {
        Commands::Schemas => {
            for name in registry.names() {
                let schema = lookup(registry, name)?;
                match schema.base() {
                    Some(base) => println!("{} < {}", name, base),
                    None => println!("{}", name),
                }
                for descriptor in schema.fields() {
                    println!("    {}", descriptor);
                }
                let derived = registry.derived_types(name);
                if !derived.is_empty() {
                    println!("    derived: {}", derived.join(", "));
                }
            }
        }

        Commands::Build { schema } => {
            let record = lookup(registry, &schema)?.instantiate()?;
            println!("{}", record);
            println!("0x{}", hex::encode(record.serialize()?));
        }

        Commands::Parse {
            schema,
            input,
            max_depth,
            lenient,
        } => {
            let options = ParseOptions {
                max_depth,
                strict_sections: !lenient,
            };
            let raw = hex::decode(input.trim_start_matches("0x"))?;
            let total = raw.len();
            let mut cursor = Bytes::from(raw);

            let mut record = lookup(registry, &schema)?.instantiate()?;
            record.parse_with(&mut cursor, &options)?;
            info!(schema = %schema, consumed = total - cursor.len(), "parsed message");

            println!("{}", record);
            if !cursor.is_empty() {
                println!("unconsumed: 0x{}", hex::encode(&cursor));
            }
        }
    }

    Ok(())
}

fn lookup<'r>(registry: &'r Registry, name: &str) -> Result<&'r std::sync::Arc<Schema>, String> {
    registry.get(name).ok_or_else(|| format!("unknown schema '{}'", name))
}

fn define_demo_schemas(registry: &mut RegistryBuilder) -> recordkit::Result<()> {
    let mut message = Schema::builder("Message");
    message.field("kind", Integer::u8(), 0u8, FieldOptions::new());
    message.field(
        "seq",
        Integer::u16(Endian::Big),
        SchemaBuilder::counter("seq", 1, 1, true),
        FieldOptions::new(),
    );
    registry.define(message)?;

    let mut ping = registry.derive("Message", "Ping")?;
    if let Some(kind) = ping.descriptor_mut("kind") {
        kind.set_default(1u8);
    }
    ping.field("nonce", Integer::u32(Endian::Big), DefaultValue::None, FieldOptions::new());
    registry.define(ping)?;

    let mut data = registry.derive("Message", "Data")?;
    if let Some(kind) = data.descriptor_mut("kind") {
        kind.set_default(2u8);
    }
    data.field(
        "len",
        VarUInt,
        SchemaBuilder::bind(|scope| Ok(Value::U64(scope.encoded_len("body")? as u64))),
        FieldOptions::new(),
    );
    data.field("body", RawBytes, DefaultValue::None, FieldOptions::new().length_field("len"));
    data.field("note", Text, DefaultValue::None, FieldOptions::new().remaining().optional());
    registry.define(data)?;

    let audit = ActionDescriptor::custom(
        "audit",
        |ctx| {
            info!(parent = ?ctx.parent.map(ToString::to_string), args = ctx.args.len(), "audit section");
            Ok(())
        },
        vec![ActionArg::from("header")],
    );
    let mut frame = Schema::builder("Frame");
    frame.section("header", Some(audit), FieldOptions::new(), |header| {
        header.field("version", Integer::u8(), 1u8, FieldOptions::new());
        header.field("size", Integer::u16(Endian::Little), DefaultValue::None, FieldOptions::new());
        Ok(())
    })?;
    frame.field(
        "payload",
        RawBytes,
        DefaultValue::None,
        FieldOptions::new().length_field("header.size"),
    );
    registry.define(frame)?;

    Ok(())
}
