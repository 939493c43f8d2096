//! Human-readable rendering of a parsed class, used by the launcher's dump
//! mode and the `class_inspect` binary.

use std::io::{self, Write};

use crate::attribute::{find_attribute, AttributeInfo, CodeAttribute, Exceptions, SourceFile};
use crate::class_file::{ClassFile, FieldInfo, MethodInfo};
use crate::constant::{Constant, ConstantPool};
use crate::opcode::{operand_len, Opcode};

pub fn dump_class(class: &ClassFile, out: &mut dyn Write) -> io::Result<()> {
    let pool = &class.constants;

    writeln!(out, "class {}", class.name().unwrap_or("<unresolved>"))?;
    writeln!(out, "  version: {}", class.version)?;
    writeln!(out, "  access: {:?}", class.access_flags)?;
    match class.super_name() {
        Ok(Some(name)) => writeln!(out, "  extends: {}", name)?,
        Ok(None) => writeln!(out, "  extends: <none>")?,
        Err(_) => writeln!(out, "  extends: <unresolved>")?,
    }

    if !class.interfaces.is_empty() {
        write!(out, "  implements:")?;
        for index in &class.interfaces {
            write!(out, " {}", pool.class_name(*index).unwrap_or("<unresolved>"))?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    dump_constant_pool(pool, out)?;

    if !class.fields.is_empty() {
        writeln!(out, "\nfields:")?;
        for field in &class.fields {
            dump_field(field, pool, out)?;
        }
    }

    writeln!(out, "\nmethods:")?;
    for method in &class.methods {
        dump_method(method, pool, out)?;
    }

    if !class.attributes.is_empty() {
        writeln!(out, "\nclass attributes:")?;
        for attribute in &class.attributes {
            dump_attribute_name(attribute, pool, out)?;
        }
    }

    Ok(())
}

pub fn dump_constant_pool(pool: &ConstantPool, out: &mut dyn Write) -> io::Result<()> {
    writeln!(out, "constant pool ({} entries):", pool.len())?;

    for (slot, constant) in pool.iter().enumerate() {
        let index = slot as u16 + 1;
        match constant {
            Constant::Placeholder => continue,
            Constant::Utf8(text) => writeln!(out, "  #{:<4} Utf8 {:?}", index, text)?,
            Constant::Int(value) => writeln!(out, "  #{:<4} Integer {}", index, value)?,
            Constant::Float(value) => writeln!(out, "  #{:<4} Float {}", index, value)?,
            Constant::Long(value) => writeln!(out, "  #{:<4} Long {}", index, value)?,
            Constant::Double(value) => writeln!(out, "  #{:<4} Double {}", index, value)?,
            Constant::Class { name_index } => writeln!(
                out,
                "  #{:<4} Class #{} ({})",
                index,
                name_index,
                pool.text(*name_index).unwrap_or("<unresolved>")
            )?,
            Constant::String { string_index } => writeln!(
                out,
                "  #{:<4} String #{} ({:?})",
                index,
                string_index,
                pool.text(*string_index).unwrap_or("<unresolved>")
            )?,
            Constant::FieldRef { .. }
            | Constant::MethodRef { .. }
            | Constant::InterfaceMethodRef { .. } => {
                let kind = match constant {
                    Constant::FieldRef { .. } => "Fieldref",
                    Constant::MethodRef { .. } => "Methodref",
                    _ => "InterfaceMethodref",
                };
                match pool.element_ref(index) {
                    Ok((class, name, descriptor)) => writeln!(
                        out,
                        "  #{:<4} {} {}.{} {}",
                        index, kind, class, name, descriptor
                    )?,
                    Err(_) => writeln!(out, "  #{:<4} {} <unresolved>", index, kind)?,
                }
            }
            Constant::NameAndType { name_index, descriptor_index } => writeln!(
                out,
                "  #{:<4} NameAndType {} {}",
                index,
                pool.text(*name_index).unwrap_or("<unresolved>"),
                pool.text(*descriptor_index).unwrap_or("<unresolved>")
            )?,
        }
    }

    Ok(())
}

fn dump_field(field: &FieldInfo, pool: &ConstantPool, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "  {} {} [{:?}]",
        field.name(pool).unwrap_or("<unresolved>"),
        field.descriptor(pool).unwrap_or("?"),
        field.access
    )?;

    if let Ok(Some(index)) = field.constant_value(pool) {
        if let Some(constant) = pool.get(index) {
            writeln!(out, "    ConstantValue: {:?}", constant)?;
        }
    }

    Ok(())
}

fn dump_method(method: &MethodInfo, pool: &ConstantPool, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "  {}{} [{:?}]",
        method.name(pool).unwrap_or("<unresolved>"),
        method.descriptor(pool).unwrap_or("?"),
        method.access
    )?;

    if let Ok(Some(exceptions)) = find_attribute::<Exceptions>(&method.attributes, pool, "Exceptions")
    {
        write!(out, "    throws:")?;
        for index in &exceptions.index_table {
            write!(out, " {}", pool.class_name(*index).unwrap_or("<unresolved>"))?;
        }
        writeln!(out)?;
    }

    match method.code(pool) {
        Ok(Some(code)) => dump_code(&code, pool, out)?,
        Ok(None) => writeln!(out, "    <no code>")?,
        Err(e) => writeln!(out, "    <bad Code attribute: {}>", e)?,
    }

    Ok(())
}

fn dump_code(code: &CodeAttribute, pool: &ConstantPool, out: &mut dyn Write) -> io::Result<()> {
    writeln!(
        out,
        "    Code (stack={}, locals={}, {} bytes):",
        code.max_stack,
        code.max_locals,
        code.code.len()
    )?;

    disassemble(&code.code, out)?;

    if !code.exception_table.is_empty() {
        writeln!(out, "    exception table:")?;
        for range in &code.exception_table {
            let catch_type = if range.catch_type == 0 {
                "<any>"
            } else {
                pool.class_name(range.catch_type).unwrap_or("<unresolved>")
            };
            writeln!(
                out,
                "      [{}, {}] -> {} ({})",
                range.try_start, range.try_end, range.catch_start, catch_type
            )?;
        }
    }

    for attribute in &code.attributes {
        write!(out, "    code attribute: ")?;
        dump_attribute_name(attribute, pool, out)?;
    }

    Ok(())
}

/// One line per instruction: offset, mnemonic, raw operand bytes. Decoding
/// stops at the first unknown or truncated instruction.
pub fn disassemble(code: &[u8], out: &mut dyn Write) -> io::Result<()> {
    let mut pc = 0;

    while pc < code.len() {
        let opcode = match Opcode::from_byte(code[pc]) {
            Some(v) => v,
            None => {
                writeln!(out, "      {:>5}: <unknown 0x{:02x}>", pc, code[pc])?;
                return Ok(());
            }
        };

        let operands = match operand_len(code, pc) {
            Some(v) => v,
            None => {
                writeln!(out, "      {:>5}: {} <truncated>", pc, opcode.mnemonic())?;
                return Ok(());
            }
        };

        write!(out, "      {:>5}: {}", pc, opcode.mnemonic())?;
        if operands > 0 && operands <= 8 {
            for byte in &code[pc + 1..pc + 1 + operands] {
                write!(out, " {:02x}", byte)?;
            }
        } else if operands > 8 {
            write!(out, " <{} operand bytes>", operands)?;
        }
        writeln!(out)?;

        pc += 1 + operands;
    }

    Ok(())
}

fn dump_attribute_name(
    attribute: &AttributeInfo,
    pool: &ConstantPool,
    out: &mut dyn Write,
) -> io::Result<()> {
    let name = attribute.name(pool).unwrap_or("<unresolved>");

    if name == "SourceFile" {
        if let Ok(source) = attribute.parse_as::<SourceFile>() {
            return writeln!(
                out,
                "  SourceFile: {}",
                pool.text(source.index).unwrap_or("<unresolved>")
            );
        }
    }

    writeln!(out, "  {} ({} bytes)", name, attribute.info.len())
}
