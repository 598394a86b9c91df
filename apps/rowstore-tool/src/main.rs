//! CLI tool for table streams.
//!
//! Generates sample streams, inspects and dumps existing ones, and runs scan
//! plans over them.

mod cli;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;

use cli::{Cli, Commands};
use rowstore_core::context::ExecutorContext;
use rowstore_core::factory::TableFactory;
use rowstore_core::index::{IndexType, TableIndexScheme};
use rowstore_core::schema::TupleSchema;
use rowstore_core::serialize::{
    deserialize_table, read_schema_header, BufferInput, FileOutput, SerializeInput,
};
use rowstore_core::table::Table;
use rowstore_core::types::{Value, ValueType};
use rowstore_exec::executor::AnyScanExecutor;
use rowstore_exec::expression::BasicExpressionLoader;
use rowstore_exec::plan::ScanPlanNode;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt::init();

    match cli.command {
        Commands::Generate {
            file,
            rows,
            null_strings,
        } => generate(&file, rows, null_strings),
        Commands::Inspect { file } => inspect(&file),
        Commands::Dump { file, limit } => dump(&file, limit),
        Commands::Scan {
            file,
            plan,
            params,
        } => scan(&file, &plan, &params),
    }
}

fn sample_table(rows: usize, null_strings: bool) -> anyhow::Result<Table> {
    let schema = TupleSchema::build(
        &[ValueType::BigInt, ValueType::Varchar, ValueType::Double, ValueType::Integer],
        &[8, 32, 8, 4],
        &[false, true, true, true],
    )?;
    let mut table = TableFactory::get_persistent_table(
        0,
        &ExecutorContext::default(),
        "sample",
        schema,
        vec!["id".into(), "name".into(), "score".into(), "bucket".into()],
        Some(TableIndexScheme::new("pk_sample", IndexType::BalancedTree, vec![0], true)),
        Vec::new(),
        None,
        false,
        false,
    );
    for i in 0..rows as i64 {
        let name = if null_strings && i % 3 == 0 {
            Value::Null(ValueType::Varchar)
        } else {
            Value::varchar(&format!("row-{:06}", i))
        };
        table.insert_values(&[
            Value::BigInt(i),
            name,
            Value::Double(i as f64 * 0.25),
            Value::Integer((i % 16) as i32),
        ])?;
    }
    Ok(table)
}

fn generate(path: &Path, rows: usize, null_strings: bool) -> anyhow::Result<()> {
    let table = sample_table(rows, null_strings)?;
    let mut out = FileOutput::create(path)?;
    table.serialize_to(&mut out)?;
    let written = out.finish()?;
    info!("Wrote {} rows ({} bytes) to {}", rows, written, path.display());
    println!("{} rows, {} bytes", rows, written);
    Ok(())
}

/// Schema and row count from the head of a stream.
fn read_header(bytes: &[u8]) -> anyhow::Result<(TupleSchema, i32)> {
    let mut input = BufferInput::new(bytes);
    let declared = input.read_i32()?;
    if declared < 0 || declared as usize != input.remaining() {
        bail!(
            "length prefix {} does not match the {} bytes that follow",
            declared,
            input.remaining()
        );
    }
    let schema = read_schema_header(&mut input)?;
    let rows = input.read_i32()?;
    Ok((schema, rows))
}

/// Loads a stream into a temp table named `name`, with generated column names.
fn load_table(bytes: &[u8], name: &str) -> anyhow::Result<Table> {
    let (schema, _) = read_header(bytes)?;
    let names = (0..schema.column_count()).map(|i| format!("C{}", i)).collect();
    let mut table = TableFactory::get_temp_table(0, name, schema, names, None);
    deserialize_table(&mut table, &mut BufferInput::new(bytes))?;
    Ok(table)
}

/// Runs `f` over the file contents, mapped when `persist` is enabled.
#[cfg(feature = "persist")]
fn with_file<T>(path: &Path, f: impl FnOnce(&[u8]) -> anyhow::Result<T>) -> anyhow::Result<T> {
    let mapped = rowstore_core::serialize::MappedFile::open(path)?;
    f(mapped.as_bytes())
}

#[cfg(not(feature = "persist"))]
fn with_file<T>(path: &Path, f: impl FnOnce(&[u8]) -> anyhow::Result<T>) -> anyhow::Result<T> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    f(&bytes)
}

fn inspect(path: &Path) -> anyhow::Result<()> {
    let (schema, rows, len, crc) = with_file(path, |bytes| {
        let (schema, rows) = read_header(bytes)?;
        Ok((schema, rows, bytes.len(), crc32fast::hash(bytes)))
    })?;
    println!("file:     {}", path.display());
    println!("bytes:    {}", len);
    println!("crc32:    {:08x}", crc);
    println!("rows:     {}", rows);
    println!("columns:  {}", schema.column_count());
    for (i, column) in schema.columns().iter().enumerate() {
        let d = column.descriptor();
        println!(
            "  C{:<3} {:<10} size {:<6} {}{}",
            i,
            d.value_type,
            d.declared_size,
            if d.allow_null { "nullable" } else { "not null" },
            if d.inlined { "" } else { ", out of line" }
        );
    }
    Ok(())
}

fn format_row(row: &[Value]) -> String {
    row.iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("\t")
}

fn dump(path: &Path, limit: Option<usize>) -> anyhow::Result<()> {
    let table = with_file(path, |bytes| load_table(bytes, "dump"))?;
    println!("{}", table.column_names().join("\t"));
    for tuple in table.iter().take(limit.unwrap_or(usize::MAX)) {
        println!("{}", format_row(&tuple.values()));
    }
    Ok(())
}

/// Integer, then float, otherwise the text itself.
fn parse_param(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<i64>() {
        Value::BigInt(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        Value::Double(f)
    } else {
        Value::varchar(raw)
    }
}

fn scan(path: &Path, plan: &str, params: &[String]) -> anyhow::Result<()> {
    let plan_text = match plan.strip_prefix('@') {
        Some(plan_path) => std::fs::read_to_string(plan_path)
            .with_context(|| format!("failed to read plan {}", plan_path))?,
        None => plan.to_string(),
    };
    let json: serde_json::Value = serde_json::from_str(&plan_text).context("plan is not valid JSON")?;
    let node = ScanPlanNode::load(&json, &BasicExpressionLoader)?;

    let mut tables = HashMap::new();
    let table_name = node.target_table_name.clone();
    tables.insert(
        table_name.clone(),
        with_file(path, |bytes| load_table(bytes, &table_name))?,
    );

    let params: Vec<Value> = params.iter().map(|p| parse_param(p)).collect();
    let mut executor = AnyScanExecutor::from_plan(node)?;
    executor.init(&tables, None)?;
    println!("{}", executor.output_column_names().join("\t"));
    let rows = executor.collect_rows(&tables, &params)?;
    for row in &rows {
        println!("{}", format_row(row));
    }
    info!("Scan of '{}' returned {} rows", table_name, rows.len());
    Ok(())
}
