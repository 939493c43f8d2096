use std::env;

use hashbrown::{HashMap, HashSet};

#[derive(Debug)]
pub enum ArgType {
    Flag,
    Valued,
}

#[derive(Debug)]
pub struct ArgHandler {
    pub name: &'static str,
    pub aliases: Vec<&'static str>,
    pub arg_type: ArgType,
}

/// Minimal java-style argument parsing: recognized flags may appear in any
/// order before the main class; the first unrecognized token is the main
/// class and everything after it belongs to the program.
#[derive(Debug, Default)]
pub struct ManualOpts {
    schemas: Vec<ArgHandler>,
    flags: HashSet<&'static str>,
    args: HashMap<&'static str, Vec<String>>,
    pub program_args: Vec<String>,
}

impl ManualOpts {
    pub fn arg(mut self, arg: ArgHandler) -> Self {
        self.schemas.push(arg);
        self
    }

    pub fn parse(mut self) -> Self {
        let mut args = env::args();
        let _executable = args.next();

        'parser: while let Some(arg) = args.next() {
            for schema in &self.schemas {
                for alias in &schema.aliases {
                    match schema.arg_type {
                        ArgType::Flag => {
                            if arg == *alias {
                                self.flags.insert(schema.name);
                                continue 'parser;
                            }
                        }
                        ArgType::Valued => {
                            if arg == *alias {
                                let value = match args.next() {
                                    Some(v) => v,
                                    None => {
                                        eprintln!("expected a value after {}", alias);
                                        std::process::exit(2);
                                    }
                                };
                                self.args
                                    .entry(schema.name)
                                    .or_insert_with(Vec::new)
                                    .push(value);
                                continue 'parser;
                            }
                        }
                    }
                }
            }

            self.program_args.push(arg);
            self.program_args.extend(&mut args);
        }

        self
    }

    pub fn has_flag(&self, key: &'static str) -> bool {
        self.flags.contains(key)
    }

    pub fn get_args(&self, key: &'static str) -> Option<&[String]> {
        self.args.get(key).map(|x| &x[..])
    }
}
