//! Punto de entrada ("driver").
//!
//! Este módulo orquesta la compilación completa de un archivo fuente
//! y expone una CLI. Los artefactos intermedios (tokens, tabla de
//! símbolos, IR) se vuelcan únicamente si se pide de forma explícita.

use std::{
    fs::{self, File},
    io::{self, Write},
};

use anyhow::Context;
use clap::{crate_version, Arg, Command};
use minic::Artifacts;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    // Parsing de CLI
    let args = Command::new("minic")
        .version(crate_version!())
        .arg(
            Arg::new("input")
                .value_name("FILE")
                .required(true)
                .help("Source file to compile"),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .takes_value(true)
                .value_name("FILE")
                .default_value("-")
                .help("Assembly output file ('-' for stdout)"),
        )
        .arg(
            Arg::new("emit-tokens")
                .long("emit-tokens")
                .takes_value(true)
                .value_name("FILE")
                .help("Also dump the token stream"),
        )
        .arg(
            Arg::new("emit-ir")
                .long("emit-ir")
                .takes_value(true)
                .value_name("FILE")
                .help("Also dump the intermediate representation"),
        )
        .arg(
            Arg::new("emit-symbols")
                .long("emit-symbols")
                .takes_value(true)
                .value_name("FILE")
                .help("Also dump the symbol table"),
        )
        .get_matches();

    let input = args.value_of("input").unwrap();
    let source = fs::read_to_string(input)
        .with_context(|| format!("Failed to read source file: {}", input))?;

    let artifacts = minic::compile(&source)
        .with_context(|| format!("Failed to compile: {}", input))?;

    dump_artifacts(&args, &artifacts)?;

    match args.value_of("output").unwrap() {
        "-" => {
            io::stdout()
                .write_all(artifacts.asm.as_bytes())
                .context("Failed to write assembly to stdout")?;
        }

        path => {
            fs::write(path, &artifacts.asm)
                .with_context(|| format!("Failed to write assembly: {}", path))?;
        }
    }

    Ok(())
}

/// Vuelca los artefactos intermedios que la CLI haya solicitado.
fn dump_artifacts(args: &clap::ArgMatches, artifacts: &Artifacts) -> anyhow::Result<()> {
    if let Some(path) = args.value_of("emit-tokens") {
        let lines = artifacts.tokens.iter().map(ToString::to_string);
        dump_lines(path, lines).with_context(|| format!("Failed to dump tokens: {}", path))?;
    }

    if let Some(path) = args.value_of("emit-ir") {
        let lines = artifacts.ir.dump_lines();
        dump_lines(path, lines.into_iter())
            .with_context(|| format!("Failed to dump IR: {}", path))?;
    }

    if let Some(path) = args.value_of("emit-symbols") {
        let lines = artifacts.symbols.dump_lines();
        dump_lines(path, lines.into_iter())
            .with_context(|| format!("Failed to dump symbols: {}", path))?;
    }

    Ok(())
}

fn dump_lines(path: &str, lines: impl Iterator<Item = String>) -> anyhow::Result<()> {
    let mut file = io::BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(file, "{}", line)?;
    }

    file.flush()?;
    Ok(())
}
