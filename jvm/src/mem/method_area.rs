//! The method area: every loaded class, keyed by qualified name. Classes
//! are created on first reference and live for the rest of the process.

use std::fs;
use std::path::PathBuf;

use class_format::version::MAX_SUPPORTED_VERSION;
use class_format::{AccessFlags, ClassFile, FieldDescriptor, MethodInfo};

use crate::error::VmError;
use crate::hooks;
use crate::mem::fields::FieldTable;
use crate::mem::heap::Ref;

/// Index of a class record in the method area. Instances carry this back
/// to their class, which keeps the class/object graph cycle-free.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct ClassId(usize);

#[cfg(test)]
impl ClassId {
    pub(crate) fn default_for_tests() -> Self {
        ClassId(0)
    }
}

#[derive(Debug)]
pub struct RuntimeClass {
    pub name: String,
    pub image: ClassFile,
    pub statics: FieldTable,
    /// Live instances, newest last.
    pub instances: Vec<Ref>,
}

#[derive(Debug)]
pub struct MethodArea {
    classes: Vec<RuntimeClass>,
    base_dir: PathBuf,
}

impl MethodArea {
    pub fn new<P: Into<PathBuf>>(base_dir: P) -> Self {
        MethodArea {
            classes: Vec::new(),
            base_dir: base_dir.into(),
        }
    }

    /// Look up a loaded class by qualified name. The registry stays small
    /// enough that a linear scan is the whole index.
    pub fn find(&self, name: &str) -> Option<ClassId> {
        self.classes
            .iter()
            .position(|class| class.name == name)
            .map(ClassId)
    }

    pub fn get(&self, id: ClassId) -> &RuntimeClass {
        &self.classes[id.0]
    }

    pub fn get_mut(&mut self, id: ClassId) -> &mut RuntimeClass {
        &mut self.classes[id.0]
    }

    pub fn loaded(&self) -> impl Iterator<Item = &RuntimeClass> {
        self.classes.iter()
    }

    /// Load a class and, transitively, its super classes. Returns the id
    /// plus every class registered by this call in registration order; the
    /// caller stages `<clinit>` frames for those. Nothing is loaded twice.
    pub fn load(&mut self, name: &str) -> Result<(ClassId, Vec<ClassId>), VmError> {
        if let Some(id) = self.find(name) {
            return Ok((id, Vec::new()));
        }

        let mut registered = Vec::new();
        let id = self.load_new(name, &mut registered)?;
        Ok((id, registered))
    }

    fn class_path(&self, name: &str) -> PathBuf {
        let mut path = self.base_dir.clone();
        let mut parts = name.split('/').peekable();

        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                path.push(format!("{}.class", part));
            } else {
                path.push(part);
            }
        }

        path
    }

    fn load_new(&mut self, name: &str, registered: &mut Vec<ClassId>) -> Result<ClassId, VmError> {
        // Load
        let path = self.class_path(name);
        debug!("loading class {} from {}", name, path.display());

        let data = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => VmError::NoClassDef(name.to_string()),
            _ => VmError::ClassFormat {
                file: name.to_string(),
                detail: e.to_string(),
            },
        })?;

        let image = ClassFile::parse(&data).map_err(|e| VmError::ClassFormat {
            file: name.to_string(),
            detail: e.to_string(),
        })?;

        // Verify
        verify(name, &image)?;

        // Prepare
        let statics = prepare_statics(&image).map_err(|e| VmError::ClassFormat {
            file: name.to_string(),
            detail: e.to_string(),
        })?;

        // Register before touching the super chain so cyclic references
        // find the record instead of recursing forever.
        let declared_name = image
            .name()
            .map_err(crate::error::bad_constant)?
            .to_string();
        if declared_name != name {
            return Err(VmError::NoClassDef(format!(
                "{} (file declares {})",
                name, declared_name
            )));
        }

        let super_name = image
            .super_name()
            .map_err(crate::error::bad_constant)?
            .map(str::to_string);

        let id = ClassId(self.classes.len());
        self.classes.push(RuntimeClass {
            name: declared_name,
            image,
            statics,
            instances: Vec::new(),
        });
        registered.push(id);

        // Initialize: pull in the super chain. The subclass was pushed to
        // `registered` first, so when the caller stages `<clinit>` frames
        // in order, the super-most initializer ends up on top of the frame
        // stack and runs first.
        if let Some(super_name) = super_name {
            if !hooks::is_external(&super_name) && self.find(&super_name).is_none() {
                self.load_new(&super_name, registered)?;
            }
        }

        info!("registered class {}", name);
        Ok(id)
    }

    /// Walk a class and its supers, most derived first.
    pub fn super_chain(&self, id: ClassId) -> Vec<ClassId> {
        let mut chain = vec![id];
        let mut current = id;

        loop {
            let super_name = match self.get(current).image.super_name() {
                Ok(Some(name)) => name,
                _ => break,
            };

            match self.find(super_name) {
                Some(super_id) => {
                    chain.push(super_id);
                    current = super_id;
                }
                None => break,
            }
        }

        chain
    }

    /// True when `ancestor` appears in `class`'s super chain (not counting
    /// `class` itself).
    pub fn is_super_of(&self, ancestor: ClassId, class: ClassId) -> bool {
        self.super_chain(class).iter().skip(1).any(|&id| id == ancestor)
    }

    /// Virtual-style lookup: the closest class in the chain declaring a
    /// matching `(name, descriptor)` pair.
    pub fn find_method(
        &self,
        from: ClassId,
        name: &str,
        descriptor: &str,
    ) -> Option<(ClassId, &MethodInfo)> {
        for id in self.super_chain(from) {
            if let Some(method) = self.get(id).image.get_method(name, descriptor) {
                return Some((id, method));
            }
        }

        None
    }
}

fn verify(name: &str, image: &ClassFile) -> Result<(), VmError> {
    if image.version > MAX_SUPPORTED_VERSION {
        return Err(VmError::UnsupportedVersion {
            file: name.to_string(),
            major: image.version.major,
            minor: image.version.minor,
        });
    }

    // A class naming itself as its super is the one structural cycle the
    // loader can detect without walking anything.
    if let (Ok(this), Ok(Some(superclass))) = (image.name(), image.super_name()) {
        if this == superclass {
            return Err(VmError::Circularity(name.to_string()));
        }
    }

    Ok(())
}

/// Allocate zeroed cells for every non-final static field. Final statics
/// carry `ConstantValue` attributes and materialize on first use instead.
fn prepare_statics(image: &ClassFile) -> std::io::Result<FieldTable> {
    let mut statics = FieldTable::new();

    for field in &image.fields {
        if !field.is_static() || field.access.contains(AccessFlags::FINAL) {
            continue;
        }

        let name = field.name(&image.constants)?;
        let descriptor = field.field_type(&image.constants)?;
        statics.declare(name, descriptor);
    }

    Ok(statics)
}

/// Instance fields of a class, gathered across the whole super chain with
/// the most derived declaration winning.
pub fn gather_instance_fields(
    area: &MethodArea,
    id: ClassId,
) -> Result<FieldTable, VmError> {
    let mut table = FieldTable::new();

    for class_id in area.super_chain(id) {
        let image = &area.get(class_id).image;
        for field in &image.fields {
            if field.is_static() {
                continue;
            }

            let name = field.name(&image.constants).map_err(crate::error::bad_constant)?;
            let descriptor = field
                .field_type(&image.constants)
                .map_err(crate::error::bad_constant)?;
            table.declare(name, descriptor);
        }
    }

    Ok(table)
}

/// Descriptor parse helper used wherever a field reference resolves.
pub fn parse_field_descriptor(text: &str) -> Result<FieldDescriptor, VmError> {
    FieldDescriptor::parse(text).map_err(crate::error::bad_constant)
}
