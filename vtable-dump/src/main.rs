use std::path::PathBuf;
use std::process::ExitCode;

use clap::{value_parser, Arg, ArgAction, Command};
use tracing_subscriber::{fmt, EnvFilter};
use vtable_extract::model::{Typeinfo, TypeinfoKind, VtableRecord};
use vtable_extract::macho::MachOImage;

fn print_error(mut error: &dyn std::error::Error) {
    println!("Error: {error}");
    while let Some(source) = error.source() {
        println!("   caused by {source}");
        error = source;
    }
}

fn typeinfo_kind_name(typeinfo: &Typeinfo) -> &'static str {
    match typeinfo.kind {
        TypeinfoKind::Class => "CLASS_TYPE_INFO",
        TypeinfoKind::Si { .. } => "SI_CLASS_TYPE_INFO",
        TypeinfoKind::Vmi { .. } => "VMI_CLASS_TYPE_INFO",
    }
}

fn print_typeinfo(typeinfo: &Typeinfo, depth: usize) {
    let indent = "\t".repeat(depth);
    println!("{indent}type: {}", typeinfo_kind_name(typeinfo));
    println!("{indent}name: _Z{}", typeinfo.name);

    match &typeinfo.kind {
        TypeinfoKind::Class => {}
        TypeinfoKind::Si { base: Some(base) } => print_typeinfo(base, depth + 1),
        TypeinfoKind::Si { base: None } => println!("{indent}\tbase: <cross-image, absent>"),
        TypeinfoKind::Vmi { bases, .. } => {
            for (i, vmi_base) in bases.iter().enumerate() {
                println!(
                    "{indent}\tbase #{i}: flags={:#x} offset={}",
                    vmi_base.flags, vmi_base.offset
                );
                match &vmi_base.base {
                    Some(base) => print_typeinfo(base, depth + 2),
                    None => println!("{indent}\t\t<cross-image, absent>"),
                }
            }
        }
    }
}

fn print_text(records: &[VtableRecord]) {
    for record in records {
        println!("_Z{}", record.typeinfo.name);
        println!("    typeinfo:");
        print_typeinfo(&record.typeinfo, 2);
        println!("    number of vftables: {}", record.vftables.len());

        for (i, vftable) in record.vftables.iter().enumerate() {
            if i == 0 {
                println!("----- VFTABLE");
            } else {
                println!("----- NEXT VTABLE");
            }

            for (index, member) in vftable.iter().enumerate() {
                let offset = index * usize::from(record.pointer_size);
                println!("    {} is at offset {offset:#x} (member# {index})", member.name);
            }
        }
    }
}

fn run(path: PathBuf, as_json: bool, best_effort: bool) -> ExitCode {
    let data = match std::fs::read(&path) {
        Ok(data) => data,
        Err(err) => {
            println!("Error: could not read {}: {err}", path.display());
            return ExitCode::from(2);
        }
    };

    let image = match MachOImage::parse(&data) {
        Ok(image) => image,
        Err(err) => {
            print_error(&err);
            return ExitCode::from(2);
        }
    };

    let records = match vtable_extract::extract_all(&image, best_effort) {
        Ok(records) => records,
        Err(err) => {
            print_error(&err);
            return ExitCode::from(2);
        }
    };

    if as_json {
        match serde_json::to_string_pretty(&records) {
            Ok(json) => println!("{json}"),
            Err(err) => {
                println!("Error: failed to serialize result: {err}");
                return ExitCode::from(2);
            }
        }
    } else {
        print_text(&records);
    }

    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .without_time()
        .init();

    let command = Command::new("vtable-dump")
        .about("Dumps C++ vtables and typeinfo graphs out of a Mach-O image")
        .arg(
            Arg::new("path")
                .required(true)
                .value_name("BINARY-PATH")
                .value_parser(value_parser!(PathBuf))
                .index(1),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit the result as JSON instead of the text report"),
        )
        .arg(
            Arg::new("best-effort")
                .long("best-effort")
                .action(ArgAction::SetTrue)
                .help("Skip vtables that fail to parse instead of aborting"),
        );

    let matches = match command.try_get_matches() {
        Ok(matches) => matches,
        Err(err) => {
            println!("{err}");
            return ExitCode::from(1);
        }
    };

    let path = matches.get_one::<PathBuf>("path").unwrap().clone();
    let as_json = matches.get_flag("json");
    let best_effort = matches.get_flag("best-effort");

    run(path, as_json, best_effort)
}
