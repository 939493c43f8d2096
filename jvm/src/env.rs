//! The execution environment: method area, heap, the single thread, the
//! console sink and the debug switches, wired together the way the driver
//! builds them in `main`.

use std::io::{self, Write};
use std::path::PathBuf;

use hashbrown::HashMap;

use class_format::display::dump_class;
use class_format::MethodDescriptor;

use crate::error::{bad_constant, VmError};
use crate::mem::frame::{Frame, OperandStack};
use crate::mem::heap::{Heap, HeapEntry, Instance, Ref};
use crate::mem::method_area::{gather_instance_fields, ClassId, MethodArea};
use crate::thread::Thread;

bitflags! {
    /// User-facing diagnostics toggled from the launcher prompts.
    pub struct DebugFlags: u8 {
        /// Dump each class file as it is loaded.
        const SHOW_CLASS_FILES = 0b01;
        /// Print the frame before every instruction and wait for Enter.
        const STEP = 0b10;
    }
}

/// Where bridge output goes. The launcher uses the process stdout; tests
/// capture into a buffer.
pub enum Console {
    Stdout,
    Capture(Vec<u8>),
}

impl Console {
    pub fn captured(&self) -> Option<&[u8]> {
        match self {
            Console::Capture(buffer) => Some(buffer),
            Console::Stdout => None,
        }
    }
}

impl Write for Console {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Console::Stdout => io::stdout().write(buf),
            Console::Capture(buffer) => buffer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Console::Stdout => io::stdout().flush(),
            Console::Capture(_) => Ok(()),
        }
    }
}

/// Outcome of resolving a class from an instruction. `Staged` means the
/// load queued one or more `<clinit>` frames and adjusted the pc so the
/// triggering instruction re-executes once they finish; the handler must
/// return without touching the operand stack.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ClassResolution {
    Ready(ClassId),
    Staged,
}

pub struct JavaEnv {
    pub method_area: MethodArea,
    pub heap: Heap,
    pub thread: Thread,
    pub console: Console,
    pub flags: DebugFlags,
    interned: HashMap<String, Ref>,
}

impl JavaEnv {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        JavaEnv::with_console(base_dir, Console::Stdout)
    }

    pub fn with_console<P: Into<PathBuf>>(base_dir: P, console: Console) -> Self {
        JavaEnv {
            method_area: MethodArea::new(base_dir),
            heap: Heap::new(),
            thread: Thread::new(),
            console,
            flags: DebugFlags::empty(),
            interned: HashMap::new(),
        }
    }

    /// String handle for a constant, shared across uses of the same text.
    pub fn intern_string(&mut self, text: &str) -> Ref {
        if let Some(&reference) = self.interned.get(text) {
            return reference;
        }

        let reference = self.heap.alloc(HeapEntry::Text(text.to_string()));
        self.interned.insert(text.to_string(), reference);
        reference
    }

    /// Resolve a class by name, loading it (and its supers) on first use.
    /// Handlers must call this before popping anything: when `<clinit>`
    /// frames get staged the current instruction is rolled back by one pc
    /// step and will run again after they complete.
    pub fn resolve_class(&mut self, name: &str) -> Result<ClassResolution, VmError> {
        if let Some(id) = self.method_area.find(name) {
            return Ok(ClassResolution::Ready(id));
        }

        // Rolled forward again if the load stages nothing.
        self.thread.pc -= 1;
        let (id, registered) = match self.method_area.load(name) {
            Ok(v) => v,
            Err(e) => {
                self.thread.pc += 1;
                return Err(e);
            }
        };

        if self.flags.contains(DebugFlags::SHOW_CLASS_FILES) {
            for &class_id in &registered {
                let image = self.method_area.get(class_id).image.clone();
                let _ = dump_class(&image, &mut self.console);
            }
        }

        let mut staged = false;
        for &class_id in &registered {
            if self
                .method_area
                .get(class_id)
                .image
                .get_method("<clinit>", "()V")
                .is_some()
            {
                debug!(
                    "staging <clinit> of {}",
                    self.method_area.get(class_id).name
                );
                self.push_frame(class_id, "<clinit>", "()V")?;
                staged = true;
            }
        }

        if staged {
            Ok(ClassResolution::Staged)
        } else {
            self.thread.pc += 1;
            Ok(ClassResolution::Ready(id))
        }
    }

    /// Build and link a frame for `class.name descriptor`. The method must
    /// be declared by exactly that class and carry code.
    pub fn push_frame(
        &mut self,
        class: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Result<(), VmError> {
        let runtime = self.method_area.get(class);

        let method = runtime
            .image
            .get_method(name, descriptor)
            .ok_or_else(|| VmError::NoSuchMethod {
                class: runtime.name.clone(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })?;

        let code = method
            .code(&runtime.image.constants)
            .map_err(bad_constant)?
            .ok_or_else(|| VmError::MissingCode {
                class: runtime.name.clone(),
                name: name.to_string(),
                descriptor: descriptor.to_string(),
            })?;

        let frame = Frame {
            class,
            method_name: name.to_string(),
            method_descriptor: descriptor.to_string(),
            return_pc: 0,
            locals: vec![0; code.max_locals as usize],
            stack: OperandStack::new(code.max_stack as usize),
            pool: runtime.image.constants.clone(),
            code,
        };

        self.thread.push_frame(frame);
        Ok(())
    }

    /// Allocate an object of an already-resolved class with every declared
    /// and inherited instance field zeroed. The class keeps a reference to
    /// the instance.
    pub fn new_object(&mut self, class: ClassId) -> Result<Ref, VmError> {
        let fields = gather_instance_fields(&self.method_area, class)?;
        let reference = self.heap.alloc(HeapEntry::Instance(Instance { class, fields }));
        self.method_area.get_mut(class).instances.push(reference);
        Ok(reference)
    }

    /// Class and method names of the active frame, for diagnostics.
    pub fn current_location(&self) -> (String, String) {
        match self.thread.frames.last() {
            Some(frame) => (
                self.method_area.get(frame.class).name.clone(),
                frame.method_name.clone(),
            ),
            None => ("<no class>".to_string(), "<no method>".to_string()),
        }
    }

    /// The abort banner printed by the driver on any [`VmError`].
    pub fn error_banner(&self, error: &VmError) -> String {
        let (class, method) = self.current_location();
        format!(
            "!!!! ERROR: {} / Class: {} / Method: {}\n{}",
            error.kind(),
            class,
            method,
            error
        )
    }

    /// Parse a method descriptor out of the constant pool.
    pub fn method_descriptor(&self, descriptor: &str) -> Result<MethodDescriptor, VmError> {
        MethodDescriptor::parse(descriptor).map_err(bad_constant)
    }
}

/// Set up the entry point: load the main class, push its
/// `main([Ljava/lang/String;)V` frame with the argument array in local 0,
/// then stage any `<clinit>` frames on top so static initialization runs
/// before the first instruction of `main`.
pub fn launch(env: &mut JavaEnv, main_class: &str, args: &[String]) -> Result<(), VmError> {
    let (id, registered) = env.method_area.load(main_class)?;

    if env.flags.contains(DebugFlags::SHOW_CLASS_FILES) {
        for &class_id in &registered {
            let image = env.method_area.get(class_id).image.clone();
            let _ = dump_class(&image, &mut env.console);
        }
    }

    env.push_frame(id, "main", "([Ljava/lang/String;)V")?;

    let elements: Vec<Ref> = args.iter().map(|arg| env.intern_string(arg)).collect();
    let array = env
        .heap
        .alloc(HeapEntry::Array(crate::mem::heap::JavaArray::reference(elements)));
    env.thread.top_mut()?.set_local(0, array)?;

    for &class_id in &registered {
        if env
            .method_area
            .get(class_id)
            .image
            .get_method("<clinit>", "()V")
            .is_some()
        {
            env.push_frame(class_id, "<clinit>", "()V")?;
        }
    }

    Ok(())
}
