//! Dense ids handed out by the interner.

/// Conversion between a typed id and its dense `u32` representation.
///
/// Implemented by every id the interner hands out so the symbol table can
/// stay generic over the id flavour.
pub trait SymbolId: Copy {
    /// Build the typed id from its dense representation.
    fn from_u32(value: u32) -> Self;

    /// The dense representation of this id.
    fn as_u32(self) -> u32;
}

macro_rules! typed_id {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(u32);

        impl $name {
            /// Construct the id from a raw value.
            pub fn new(value: u32) -> Self {
                Self(value)
            }

            /// The raw value of the id.
            pub fn get(&self) -> u32 {
                self.0
            }
        }

        impl SymbolId for $name {
            fn from_u32(value: u32) -> Self {
                Self(value)
            }

            fn as_u32(self) -> u32 {
                self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

typed_id!(
    /// Id of a column name, unique per name and stable for the process
    /// lifetime.
    ColumnId
);

typed_id!(
    /// Id of a column value, unique per value string across all columns and
    /// stable for the process lifetime.
    ValueId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let c = ColumnId::new(42);
        assert_eq!(c.get(), 42);
        assert_eq!(ColumnId::from_u32(c.as_u32()), c);

        let v = ValueId::new(7);
        assert_eq!(v.to_string(), "7");
    }
}
