use std::any::TypeId;
use std::fmt;
use std::hash::{Hash, Hasher};

const PRIMITIVES: &[&str] = &[
    "bool", "char", "str", "u8", "u16", "u32", "u64", "u128", "usize", "i8", "i16", "i32", "i64",
    "i128", "isize", "f32", "f64", "!",
];

/// Coarse classification of a Rust type, derived from its type name
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum TypeShape {
    /// A trait object (`dyn Trait`)
    Interface,
    /// A nominal sized type (struct or enum)
    Struct,
    /// Tuples, arrays, slices, references, pointers, function pointers, primitives
    Other,
}

impl TypeShape {
    fn classify(name: &str) -> Self {
        let name = name.trim();
        if name.starts_with("dyn ") {
            return Self::Interface;
        }
        let structural = ['(', '[', '&', '*']
            .iter()
            .any(|prefix| name.starts_with(*prefix))
            || ["fn(", "unsafe ", "extern ", "impl "]
                .iter()
                .any(|prefix| name.starts_with(prefix));
        if structural || PRIMITIVES.contains(&name) {
            Self::Other
        } else {
            Self::Struct
        }
    }
}

/// Identity of a type used as a registry key
#[derive(Debug, Clone, Copy)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
    shape: TypeShape,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        let name = std::any::type_name::<T>();
        Self {
            id: TypeId::of::<T>(),
            name,
            shape: TypeShape::classify(name),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn shape(&self) -> TypeShape {
        self.shape
    }
}

impl PartialEq for TypeKey {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeKey {}

impl Hash for TypeKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}
