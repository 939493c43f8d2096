//! A tiny class-file assembler for the interpreter tests: builds real
//! `.class` bytes through the `class_format` write side and drops them in
//! a scratch directory for the loader to pick up.

use std::path::Path;

use class_format::attribute::{pack_attribute, CodeAttribute};
use class_format::{
    AccessFlags, BufferedRead, ClassFile, ClassVersion, Constant, ConstantPool, FieldInfo,
    MethodInfo, Opcode,
};

use jvm::mem::SlotValue;
use jvm::{Console, JavaEnv, VmError};

pub struct ClassAssembler {
    constants: Vec<Constant>,
    access: AccessFlags,
    version: ClassVersion,
    this_class: u16,
    super_class: u16,
    fields: Vec<FieldInfo>,
    methods: Vec<MethodInfo>,
}

#[allow(dead_code)]
impl ClassAssembler {
    pub fn new(name: &str, super_name: &str) -> Self {
        let mut assembler = ClassAssembler {
            constants: Vec::new(),
            access: AccessFlags::PUBLIC | AccessFlags::SUPER,
            version: ClassVersion::new(48, 0),
            this_class: 0,
            super_class: 0,
            fields: Vec::new(),
            methods: Vec::new(),
        };

        assembler.this_class = assembler.class(name);
        assembler.super_class = assembler.class(super_name);
        assembler
    }

    pub fn version(mut self, version: ClassVersion) -> Self {
        self.version = version;
        self
    }

    pub fn access(mut self, access: AccessFlags) -> Self {
        self.access = access;
        self
    }

    fn push_constant(&mut self, constant: Constant) -> u16 {
        if let Some(index) = self.constants.iter().position(|c| c == &constant) {
            return index as u16 + 1;
        }

        let wide = constant.is_wide();
        self.constants.push(constant);
        let index = self.constants.len() as u16;

        if wide {
            self.constants.push(Constant::Placeholder);
        }

        index
    }

    pub fn utf8(&mut self, text: &str) -> u16 {
        self.push_constant(Constant::Utf8(text.to_string()))
    }

    pub fn class(&mut self, name: &str) -> u16 {
        let name_index = self.utf8(name);
        self.push_constant(Constant::Class { name_index })
    }

    pub fn string(&mut self, text: &str) -> u16 {
        let string_index = self.utf8(text);
        self.push_constant(Constant::String { string_index })
    }

    pub fn int(&mut self, value: i32) -> u16 {
        self.push_constant(Constant::Int(value))
    }

    pub fn long(&mut self, value: i64) -> u16 {
        self.push_constant(Constant::Long(value))
    }

    pub fn float(&mut self, value: f32) -> u16 {
        self.push_constant(Constant::Float(value))
    }

    pub fn double(&mut self, value: f64) -> u16 {
        self.push_constant(Constant::Double(value))
    }

    pub fn name_and_type(&mut self, name: &str, descriptor: &str) -> u16 {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.push_constant(Constant::NameAndType { name_index, descriptor_index })
    }

    pub fn field_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.push_constant(Constant::FieldRef { class_index, name_and_type_index })
    }

    pub fn method_ref(&mut self, class: &str, name: &str, descriptor: &str) -> u16 {
        let class_index = self.class(class);
        let name_and_type_index = self.name_and_type(name, descriptor);
        self.push_constant(Constant::MethodRef { class_index, name_and_type_index })
    }

    pub fn add_field(&mut self, access: AccessFlags, name: &str, descriptor: &str) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.fields.push(FieldInfo {
            access,
            name_index,
            descriptor_index,
            attributes: Vec::new(),
        });
    }

    /// A `static final` field whose value lives in a ConstantValue
    /// attribute.
    pub fn add_const_field(
        &mut self,
        name: &str,
        descriptor: &str,
        value: Constant,
    ) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let value_index = self.push_constant(value);
        let attr_name = self.utf8("ConstantValue");

        let attribute = pack_attribute(
            attr_name,
            &class_format::attribute::ConstantValue { index: value_index },
        )
        .unwrap();

        self.fields.push(FieldInfo {
            access: AccessFlags::PUBLIC | AccessFlags::STATIC | AccessFlags::FINAL,
            name_index,
            descriptor_index,
            attributes: vec![attribute],
        });
    }

    pub fn add_method(
        &mut self,
        access: AccessFlags,
        name: &str,
        descriptor: &str,
        max_stack: u16,
        max_locals: u16,
        code: Vec<u8>,
    ) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        let attr_name = self.utf8("Code");

        let body = CodeAttribute {
            max_stack,
            max_locals,
            code,
            exception_table: Vec::new(),
            attributes: Vec::new(),
        };

        self.methods.push(MethodInfo {
            access,
            name_index,
            descriptor_index,
            attributes: vec![pack_attribute(attr_name, &body).unwrap()],
        });
    }

    /// A method without a Code attribute (`abstract`).
    pub fn add_abstract_method(&mut self, name: &str, descriptor: &str) {
        let name_index = self.utf8(name);
        let descriptor_index = self.utf8(descriptor);
        self.methods.push(MethodInfo {
            access: AccessFlags::PUBLIC | AccessFlags::ABSTRACT,
            name_index,
            descriptor_index,
            attributes: Vec::new(),
        });
    }

    pub fn finish(self) -> Vec<u8> {
        let class = ClassFile {
            version: self.version,
            constants: ConstantPool::from(self.constants),
            access_flags: self.access,
            this_class: self.this_class,
            super_class: self.super_class,
            interfaces: Vec::new(),
            fields: self.fields,
            methods: self.methods,
            attributes: Vec::new(),
        };

        class.to_bytes().unwrap()
    }

    /// Write `<name>.class` into `dir`.
    pub fn write_to(self, dir: &Path, name: &str) {
        let bytes = self.finish();
        std::fs::write(dir.join(format!("{}.class", name)), bytes).unwrap();
    }
}

pub fn op(opcode: Opcode) -> u8 {
    opcode as u8
}

/// Run `main_class` from `dir` with a capturing console.
#[allow(dead_code)]
pub fn run_class(dir: &Path, main_class: &str, args: &[&str]) -> (JavaEnv, Result<(), VmError>) {
    let mut env = JavaEnv::with_console(dir, Console::Capture(Vec::new()));
    let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
    let result = jvm::run(&mut env, main_class, &args);
    (env, result)
}

#[allow(dead_code)]
pub fn console_output(env: &JavaEnv) -> String {
    String::from_utf8_lossy(env.console.captured().unwrap_or(&[])).into_owned()
}

/// Read a static int field back out of the method area.
#[allow(dead_code)]
pub fn static_int(env: &JavaEnv, class: &str, field: &str) -> i32 {
    let id = env.method_area.find(class).expect("class not loaded");
    let cell = env
        .method_area
        .get(id)
        .statics
        .get(field)
        .expect("field not prepared");

    match cell.load() {
        SlotValue::Word(slot) => slot as i32,
        SlotValue::Pair { .. } => panic!("expected a single-slot field"),
    }
}

/// Read a static long field back out of the method area.
#[allow(dead_code)]
pub fn static_long(env: &JavaEnv, class: &str, field: &str) -> i64 {
    let id = env.method_area.find(class).expect("class not loaded");
    let cell = env
        .method_area
        .get(id)
        .statics
        .get(field)
        .expect("field not prepared");

    match cell.load() {
        SlotValue::Pair { high, low } => (((high as u64) << 32) | low as u64) as i64,
        SlotValue::Word(_) => panic!("expected a category-2 field"),
    }
}
