//! Parser for constant literals and the types they are declared with.
//!
//! Grammar:
//!
//! ```text
//! constant := literal ':' type | 'dense' '<' '[' literal (',' literal)* ']' '>' ':' type
//! type     := '!mod_arith.int' '<' digits ':' 'i' digits '>' | 'i' digits | 'index'
//!           | 'f16' | 'f32' | 'f64' | 'tensor' '<' (dim 'x')* type '>'
//! dim      := digits | '?'
//! ```

use ciphir_core::{
    apint::{ApInt, IntError},
    mod_arith::ModArithType,
    types::{Dim, FloatKind, Type},
};
use num_bigint::BigUint;
use num_traits::Zero;
use thiserror::Error;

use crate::attr::{AttrError, Attribute, DenseIntElements};

/// Width given to a zero literal.
///
/// A zero has no active bits, so it gets the width of the smallest literal the parser would
/// produce for `1` instead of a library default.
pub const ZERO_LITERAL_WIDTH: u32 = 4;

/// Parse errors. Offsets are in bytes from the start of the input.
#[derive(Error, Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    /// Something else than expected was found.
    #[error("expected {expected} at offset {offset}")]
    Expected {
        /// What the parser was looking for.
        expected: &'static str,
        /// Where it was looking.
        offset: usize,
    },
    /// Literals of modular constants are non-negative.
    #[error("negative literal at offset {offset}")]
    NegativeLiteral {
        /// Offset of the minus sign.
        offset: usize,
    },
    /// A dense list needs at least one element.
    #[error("expected at least one integer in dense list at offset {offset}")]
    EmptyDenseList {
        /// Offset of the closing bracket.
        offset: usize,
    },
    /// Input continues after a complete constant or type.
    #[error("unexpected trailing input at offset {offset}")]
    TrailingInput {
        /// Offset of the first unparsed byte.
        offset: usize,
    },
    /// A number does not fit the field it is used in.
    #[error("number out of range at offset {offset}")]
    OutOfRange {
        /// Offset of the number.
        offset: usize,
    },
    /// Integer construction error.
    #[error(transparent)]
    Int(#[from] IntError),
    /// Attribute construction error.
    #[error(transparent)]
    Attr(#[from] AttrError),
}

/// Parses a constant, returning its value attribute and declared type.
///
/// Each literal keeps its natural width, with zero widened to [`ZERO_LITERAL_WIDTH`]. The
/// elements of a dense list are then extended or truncated to the widest element. The declared
/// type is not checked against the value, that is left to the verifier.
pub fn parse_constant(src: &str) -> Result<(Attribute, Type), ParseError> {
    let mut parser = Parser::new(src);
    let value = if parser.eat_keyword("dense") {
        parser.dense()?
    } else {
        Attribute::Integer(parser.literal()?)
    };
    parser.expect(":", "':'")?;
    let ty = parser.ty()?;
    parser.finish()?;
    log::trace!("[parse_constant] {src:?} -> {value} : {ty}");
    Ok((value, ty))
}

/// Parses a type.
pub fn parse_type(src: &str) -> Result<Type, ParseError> {
    let mut parser = Parser::new(src);
    let ty = parser.ty()?;
    parser.finish()?;
    Ok(ty)
}

/// Prints a constant in the syntax accepted by [`parse_constant`].
pub fn print_constant(value: &Attribute, ty: Type) -> String {
    format!("{value} : {ty}")
}

struct Parser<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Parser<'s> {
    fn new(src: &'s str) -> Self {
        Self { src, pos: 0 }
    }

    fn rest(&self) -> &'s str {
        &self.src[self.pos..]
    }

    fn skip_ws(&mut self) {
        let rest = self.rest();
        self.pos += rest.len() - rest.trim_start().len();
    }

    fn eat(&mut self, token: &str) -> bool {
        self.skip_ws();
        if self.rest().starts_with(token) {
            self.pos += token.len();
            return true;
        }
        false
    }

    /// Like [`Parser::eat`] but the keyword must not run into an identifier character.
    fn eat_keyword(&mut self, keyword: &str) -> bool {
        self.skip_ws();
        let Some(after) = self.rest().strip_prefix(keyword) else {
            return false;
        };
        if after
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return false;
        }
        self.pos += keyword.len();
        true
    }

    fn expect(&mut self, token: &str, expected: &'static str) -> Result<(), ParseError> {
        if self.eat(token) {
            return Ok(());
        }
        Err(ParseError::Expected {
            expected,
            offset: self.pos,
        })
    }

    fn finish(&mut self) -> Result<(), ParseError> {
        self.skip_ws();
        if self.pos < self.src.len() {
            return Err(ParseError::TrailingInput { offset: self.pos });
        }
        Ok(())
    }

    fn digits(&mut self, expected: &'static str) -> Result<(&'s str, usize), ParseError> {
        let offset = self.pos;
        let len = self
            .rest()
            .bytes()
            .take_while(u8::is_ascii_digit)
            .count();
        if len == 0 {
            return Err(ParseError::Expected { expected, offset });
        }
        self.pos += len;
        Ok((&self.src[offset..self.pos], offset))
    }

    fn unsigned(&mut self) -> Result<(BigUint, usize), ParseError> {
        self.skip_ws();
        if self.rest().starts_with('-') {
            return Err(ParseError::NegativeLiteral { offset: self.pos });
        }
        let (digits, offset) = self.digits("integer literal")?;
        let value = BigUint::parse_bytes(digits.as_bytes(), 10)
            .ok_or(ParseError::OutOfRange { offset })?;
        Ok((value, offset))
    }

    fn small<T: TryFrom<u64>>(&mut self, expected: &'static str) -> Result<T, ParseError> {
        let (digits, offset) = self.digits(expected)?;
        digits
            .parse::<u64>()
            .ok()
            .and_then(|v| T::try_from(v).ok())
            .ok_or(ParseError::OutOfRange { offset })
    }

    fn literal(&mut self) -> Result<ApInt, ParseError> {
        let (value, _) = self.unsigned()?;
        if value.is_zero() {
            return Ok(ApInt::zero(ZERO_LITERAL_WIDTH)?);
        }
        Ok(ApInt::natural(value))
    }

    fn dense(&mut self) -> Result<Attribute, ParseError> {
        self.expect("<", "'<'")?;
        self.expect("[", "'['")?;
        let mut values = vec![];
        if !self.eat("]") {
            loop {
                values.push(self.literal()?);
                if self.eat("]") {
                    break;
                }
                self.expect(",", "',' or ']'")?;
            }
        }
        if values.is_empty() {
            return Err(ParseError::EmptyDenseList { offset: self.pos });
        }
        self.expect(">", "'>'")?;

        let width = values.iter().map(ApInt::width).max().unwrap_or(ZERO_LITERAL_WIDTH);
        let values = values
            .into_iter()
            .map(|v| v.zext(width))
            .collect::<Result<Vec<_>, _>>()?;
        let shape = vec![values.len() as u64];
        Ok(DenseIntElements::new(shape, width, values)?.into())
    }

    fn int_width(&mut self) -> Result<u32, ParseError> {
        self.expect("i", "integer type")?;
        self.small("integer width")
    }

    fn ty(&mut self) -> Result<Type, ParseError> {
        if self.eat("!mod_arith.int") {
            self.expect("<", "'<'")?;
            let (modulus, _) = self.unsigned()?;
            self.expect(":", "':'")?;
            let width = self.int_width()?;
            self.expect(">", "'>'")?;
            return Ok(ModArithType::from_apint(ApInt::new(modulus, width)?).into());
        }
        if self.eat_keyword("tensor") {
            self.expect("<", "'<'")?;
            let mut shape = vec![];
            loop {
                if self.eat("?") {
                    shape.push(Dim::Dynamic);
                } else if self.rest().starts_with(|c: char| c.is_ascii_digit()) {
                    shape.push(Dim::Static(self.small("dimension")?));
                } else {
                    break;
                }
                self.expect("x", "'x'")?;
            }
            let element = self.ty()?;
            self.expect(">", "'>'")?;
            return Ok(Type::tensor(shape, element));
        }
        if self.eat_keyword("index") {
            return Ok(Type::index());
        }
        for (name, kind) in [
            ("f16", FloatKind::F16),
            ("f32", FloatKind::F32),
            ("f64", FloatKind::F64),
        ] {
            if self.eat_keyword(name) {
                return Ok(Type::float(kind));
            }
        }
        if self.rest().starts_with('i') {
            let width = self.int_width()?;
            if width == 0 {
                return Err(IntError::ZeroWidth.into());
            }
            return Ok(Type::integer(width));
        }
        Err(ParseError::Expected {
            expected: "type",
            offset: self.pos,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use similar_asserts::assert_eq;

    fn dense_widths(attr: &Attribute) -> Vec<u32> {
        attr.as_dense_int()
            .unwrap()
            .values()
            .iter()
            .map(ApInt::width)
            .collect()
    }

    #[test]
    fn zero_literal_gets_minimum_width() {
        let (value, ty) = parse_constant("0 : !mod_arith.int<17 : i8>").unwrap();
        assert_eq!(value.as_integer().map(|v| v.width()), Some(ZERO_LITERAL_WIDTH));
        assert_eq!(ty.as_mod_arith().map(|t| t.storage_width()), Some(8));
    }

    #[rstest]
    #[case("1", 1)]
    #[case("3", 2)]
    #[case("100", 7)]
    #[case("18446744073709551616", 65)]
    fn scalar_literals_keep_natural_width(#[case] literal: &str, #[case] width: u32) {
        let (value, _) = parse_constant(&format!("{literal} : i128")).unwrap();
        assert_eq!(value.as_integer().map(|v| v.width()), Some(width));
    }

    #[test]
    fn dense_widths_are_unified() {
        let (value, ty) = parse_constant("dense<[0, 3, 100]> : tensor<3x!mod_arith.int<257 : i16>>").unwrap();
        assert_eq!(dense_widths(&value), vec![7, 7, 7]);
        let dense = value.as_dense_int().unwrap();
        assert_eq!(dense.shape(), &[3]);
        assert_eq!(dense.element_width(), 7);
        let values: Vec<_> = dense.values().iter().map(|v| v.to_string()).collect();
        assert_eq!(values, vec!["0", "3", "100"]);
        assert_eq!(ty.to_string(), "tensor<3x!mod_arith.int<257 : i16>>");
    }

    #[test]
    fn dense_of_small_values_is_at_least_zero_width() {
        let (value, _) = parse_constant("dense<[1, 0]> : tensor<2xi8>").unwrap();
        assert_eq!(dense_widths(&value), vec![4, 4]);
    }

    #[rstest]
    #[case("-1 : i8", ParseError::NegativeLiteral { offset: 0 })]
    #[case("dense<[]> : tensor<0xi8>", ParseError::EmptyDenseList { offset: 8 })]
    #[case("dense<[1, -2]> : tensor<2xi8>", ParseError::NegativeLiteral { offset: 10 })]
    #[case("3 i8", ParseError::Expected { expected: "':'", offset: 2 })]
    #[case("3 : i8 extra", ParseError::TrailingInput { offset: 7 })]
    #[case("3 : bogus", ParseError::Expected { expected: "type", offset: 4 })]
    fn rejects_malformed_constants(#[case] src: &str, #[case] expected: ParseError) {
        assert_eq!(parse_constant(src), Err(expected));
    }

    #[rstest]
    #[case("i1")]
    #[case("index")]
    #[case("f16")]
    #[case("f64")]
    #[case("!mod_arith.int<65537 : i32>")]
    #[case("tensor<8xi16>")]
    #[case("tensor<2x?x4xf32>")]
    #[case("tensor<3x!mod_arith.int<17 : i8>>")]
    fn types_print_back(#[case] src: &str) {
        assert_eq!(parse_type(src).unwrap().to_string(), src);
    }

    #[test]
    fn mod_arith_type_is_not_checked() {
        let ty = parse_type("!mod_arith.int<17 : i5>").unwrap();
        assert!(!ty.as_mod_arith().unwrap().has_spare_bit());
        assert!(matches!(
            parse_type("!mod_arith.int<17 : i4>"),
            Err(ParseError::Int(IntError::ValueTooWide { .. }))
        ));
        assert_eq!(parse_type("i0"), Err(ParseError::Int(IntError::ZeroWidth)));
    }

    #[rstest]
    #[case("5 : !mod_arith.int<17 : i8>")]
    #[case("dense<[0, 3, 100]> : tensor<3x!mod_arith.int<257 : i16>>")]
    fn print_is_inverse_of_parse(#[case] src: &str) {
        let (value, ty) = parse_constant(src).unwrap();
        assert_eq!(print_constant(&value, ty), src);
        assert_eq!(parse_constant(&print_constant(&value, ty)).unwrap(), (value, ty));
    }
}
