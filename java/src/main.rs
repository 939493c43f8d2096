use std::io::{self, BufRead, Write};
use std::process::exit;

use log::LevelFilter;
use pretty_env_logger::env_logger::Target;
use pretty_env_logger::formatted_builder;

use jvm::{DebugFlags, JavaEnv};

mod args;
use args::{ArgHandler, ArgType, ManualOpts};

fn prompt_yes_no(question: &str) -> bool {
    print!("{} [N/y]: ", question);
    io::stdout().flush().ok();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return false;
    }

    matches!(line.trim(), "y" | "Y")
}

fn main() {
    let opts = ManualOpts::default()
        .arg(ArgHandler {
            name: "verbose",
            aliases: vec!["-v", "-verbose"],
            arg_type: ArgType::Flag,
        })
        .arg(ArgHandler {
            name: "dump",
            aliases: vec!["-dump"],
            arg_type: ArgType::Flag,
        })
        .arg(ArgHandler {
            name: "debug",
            aliases: vec!["-debug"],
            arg_type: ArgType::Flag,
        })
        .parse();

    let log_level = if opts.has_flag("verbose") {
        LevelFilter::Debug
    } else {
        LevelFilter::Error
    };

    formatted_builder()
        .target(Target::Stderr)
        .filter_level(log_level)
        .init();

    let (main_class, program_args) = match opts.program_args.split_first() {
        Some((class, rest)) => (class.clone(), rest.to_vec()),
        None => {
            eprintln!("usage: java [-verbose] [-dump] [-debug] <main-class> [args...]");
            exit(2);
        }
    };

    // Flags preset the diagnostics; with neither given, ask the two
    // questions the original machine asks before running anything.
    let mut flags = DebugFlags::empty();
    if opts.has_flag("dump") || opts.has_flag("debug") {
        if opts.has_flag("dump") {
            flags |= DebugFlags::SHOW_CLASS_FILES;
        }
        if opts.has_flag("debug") {
            flags |= DebugFlags::STEP;
        }
    } else {
        if prompt_yes_no("Enable class-file dump?") {
            flags |= DebugFlags::SHOW_CLASS_FILES;
        }
        if prompt_yes_no("Enable debug mode?") {
            flags |= DebugFlags::STEP;
        }
    }

    let mut env = JavaEnv::new(".");
    env.flags = flags;

    match jvm::run(&mut env, &main_class, &program_args) {
        Ok(()) => {
            println!();
            exit(0);
        }
        Err(error) => {
            println!();
            eprintln!("{}", env.error_banner(&error));
            exit(1);
        }
    }
}
