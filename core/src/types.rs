//! Types of IR values.

use crate::{
    mod_arith::ModArithType,
    rlwe::{CiphertextType, PlaintextType},
};
use internment::Intern;
use std::fmt;

/// Width in bits of the `index` type.
pub const INDEX_WIDTH: u32 = 64;

/// Interned type of an IR value.
///
/// Structurally equal types share the same allocation, so comparing and copying is cheap.
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Type(Intern<TypeKind>);

/// The shape of a [`Type`].
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum TypeKind {
    /// Signless integer of the given width.
    Integer(u32),
    /// Target index type.
    Index,
    /// IEEE floating point.
    Float(FloatKind),
    /// Modular integer.
    ModArith(ModArithType),
    /// Tensor of another type.
    Tensor(TensorType),
    /// RLWE plaintext.
    Plaintext(PlaintextType),
    /// RLWE ciphertext.
    Ciphertext(CiphertextType),
}

/// Supported floating point formats.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum FloatKind {
    /// Half precision.
    F16,
    /// Single precision.
    F32,
    /// Double precision.
    F64,
}

impl FloatKind {
    /// Returns the width in bits.
    pub fn width(self) -> u32 {
        match self {
            FloatKind::F16 => 16,
            FloatKind::F32 => 32,
            FloatKind::F64 => 64,
        }
    }
}

impl Type {
    /// Interns a type.
    pub fn new(kind: TypeKind) -> Self {
        Self(Intern::new(kind))
    }

    /// Creates an integer type.
    pub fn integer(width: u32) -> Self {
        Self::new(TypeKind::Integer(width))
    }

    /// Creates the index type.
    pub fn index() -> Self {
        Self::new(TypeKind::Index)
    }

    /// Creates a floating point type.
    pub fn float(kind: FloatKind) -> Self {
        Self::new(TypeKind::Float(kind))
    }

    /// Creates a modular integer type.
    pub fn mod_arith(ty: ModArithType) -> Self {
        Self::new(TypeKind::ModArith(ty))
    }

    /// Creates a tensor type.
    pub fn tensor(shape: impl IntoIterator<Item = Dim>, element: Type) -> Self {
        Self::new(TypeKind::Tensor(TensorType::new(shape, element)))
    }

    /// Creates a tensor type with a static shape.
    pub fn ranked(shape: &[u64], element: Type) -> Self {
        Self::tensor(shape.iter().copied().map(Dim::Static), element)
    }

    /// Creates a plaintext type.
    pub fn plaintext(ty: PlaintextType) -> Self {
        Self::new(TypeKind::Plaintext(ty))
    }

    /// Creates a ciphertext type.
    pub fn ciphertext(ty: CiphertextType) -> Self {
        Self::new(TypeKind::Ciphertext(ty))
    }

    /// Returns the kind of type.
    pub fn kind(&self) -> &TypeKind {
        self.0.as_ref()
    }

    /// Returns the modular type if this is one.
    pub fn as_mod_arith(&self) -> Option<ModArithType> {
        match self.kind() {
            TypeKind::ModArith(ty) => Some(*ty),
            _ => None,
        }
    }

    /// Returns the tensor type if this is one.
    pub fn as_tensor(&self) -> Option<&TensorType> {
        match self.kind() {
            TypeKind::Tensor(ty) => Some(ty),
            _ => None,
        }
    }

    /// Returns the plaintext type if this is one.
    pub fn as_plaintext(&self) -> Option<&PlaintextType> {
        match self.kind() {
            TypeKind::Plaintext(ty) => Some(ty),
            _ => None,
        }
    }

    /// Returns the ciphertext type if this is one.
    pub fn as_ciphertext(&self) -> Option<&CiphertextType> {
        match self.kind() {
            TypeKind::Ciphertext(ty) => Some(ty),
            _ => None,
        }
    }

    /// Returns the width if this is an integer type. The index type is not an integer type.
    pub fn integer_width(&self) -> Option<u32> {
        match self.kind() {
            TypeKind::Integer(width) => Some(*width),
            _ => None,
        }
    }

    /// Returns true for tensors.
    pub fn is_shaped(&self) -> bool {
        matches!(self.kind(), TypeKind::Tensor(_))
    }

    /// Returns true for integers and index.
    pub fn is_int_or_index(&self) -> bool {
        matches!(self.kind(), TypeKind::Integer(_) | TypeKind::Index)
    }

    /// Returns true for scalar integers, index and floats.
    pub fn is_int_or_float(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::Integer(_) | TypeKind::Index | TypeKind::Float(_)
        )
    }

    /// Returns the width of integer, index and float types.
    pub fn int_or_float_width(&self) -> Option<u32> {
        match self.kind() {
            TypeKind::Integer(width) => Some(*width),
            TypeKind::Index => Some(INDEX_WIDTH),
            TypeKind::Float(kind) => Some(kind.width()),
            _ => None,
        }
    }

    /// Returns the element type of a tensor or the type itself.
    pub fn element_type_or_self(&self) -> Type {
        match self.kind() {
            TypeKind::Tensor(ty) => ty.element(),
            _ => *self,
        }
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TypeKind::Integer(width) => write!(f, "i{width}"),
            TypeKind::Index => write!(f, "index"),
            TypeKind::Float(kind) => write!(f, "f{}", kind.width()),
            TypeKind::ModArith(ty) => write!(f, "{ty}"),
            TypeKind::Tensor(ty) => write!(f, "{ty}"),
            TypeKind::Plaintext(ty) => write!(f, "{ty}"),
            TypeKind::Ciphertext(ty) => write!(f, "{ty}"),
        }
    }
}

impl From<ModArithType> for Type {
    fn from(value: ModArithType) -> Self {
        Self::mod_arith(value)
    }
}

impl From<CiphertextType> for Type {
    fn from(value: CiphertextType) -> Self {
        Self::ciphertext(value)
    }
}

impl From<PlaintextType> for Type {
    fn from(value: PlaintextType) -> Self {
        Self::plaintext(value)
    }
}

/// A tensor dimension.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub enum Dim {
    /// Size known at compile time.
    Static(u64),
    /// Size only known at runtime.
    Dynamic,
}

impl fmt::Display for Dim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dim::Static(size) => write!(f, "{size}"),
            Dim::Dynamic => write!(f, "?"),
        }
    }
}

/// Ranked tensor type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct TensorType {
    shape: Vec<Dim>,
    element: Type,
}

impl TensorType {
    /// Creates a new tensor type.
    pub fn new(shape: impl IntoIterator<Item = Dim>, element: Type) -> Self {
        Self {
            shape: shape.into_iter().collect(),
            element,
        }
    }

    /// Returns the dimensions.
    pub fn shape(&self) -> &[Dim] {
        &self.shape
    }

    /// Returns the element type.
    pub fn element(&self) -> Type {
        self.element
    }

    /// Returns true if no dimension is dynamic.
    pub fn has_static_shape(&self) -> bool {
        self.static_shape().is_some()
    }

    /// Returns the sizes of every dimension if all are static.
    pub fn static_shape(&self) -> Option<Vec<u64>> {
        self.shape
            .iter()
            .map(|dim| match dim {
                Dim::Static(size) => Some(*size),
                Dim::Dynamic => None,
            })
            .collect()
    }

    /// Returns the number of elements if the shape is static.
    pub fn num_elements(&self) -> Option<u64> {
        self.static_shape()?
            .into_iter()
            .try_fold(1u64, |acc, size| acc.checked_mul(size))
    }
}

impl fmt::Display for TensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tensor<")?;
        for dim in &self.shape {
            write!(f, "{dim}x")?;
        }
        write!(f, "{}>", self.element)
    }
}
