use std::fs;
use std::io::{stdout, Write};
use std::process::exit;

use clap::{App, Arg};

use class_format::display::{disassemble, dump_class, dump_constant_pool};
use class_format::ClassFile;

fn main() {
    let app = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about("Print the contents of a compiled class file")
        .arg(
            Arg::with_name("class")
                .takes_value(true)
                .required(true)
                .help("Path to the .class file to read"),
        )
        .arg(
            Arg::with_name("constants")
                .short("c")
                .long("constants")
                .help("Print only the constant pool"),
        )
        .arg(
            Arg::with_name("methods")
                .short("m")
                .long("methods")
                .help("Print only the method bodies as bytecode listings"),
        )
        .get_matches();

    let path = app.value_of("class").unwrap();

    let data = match fs::read(path) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("unable to read {}: {}", path, e);
            exit(1);
        }
    };

    let class = match ClassFile::parse(&data) {
        Ok(v) => v,
        Err(e) => {
            eprintln!("unable to parse {}: {}", path, e);
            exit(1);
        }
    };

    let out = stdout();
    let mut out = out.lock();

    let result = if app.is_present("constants") {
        dump_constant_pool(&class.constants, &mut out)
    } else if app.is_present("methods") {
        dump_methods(&class, &mut out)
    } else {
        dump_class(&class, &mut out)
    };

    if let Err(e) = result {
        eprintln!("write failed: {}", e);
        exit(1);
    }
}

fn dump_methods(class: &ClassFile, out: &mut dyn Write) -> std::io::Result<()> {
    for method in &class.methods {
        writeln!(
            out,
            "{}{}",
            method.name(&class.constants).unwrap_or("<unresolved>"),
            method.descriptor(&class.constants).unwrap_or("?")
        )?;

        match method.code(&class.constants) {
            Ok(Some(code)) => disassemble(&code.code, out)?,
            Ok(None) => writeln!(out, "      <no code>")?,
            Err(e) => writeln!(out, "      <bad Code attribute: {}>", e)?,
        }
    }

    Ok(())
}
