//! Types and traits for human-friendly printing of the IR.

use std::fmt::{Formatter, Write};

use crate::{
    module::{Module, OpRef},
    ops::ValueId,
    parser::print_constant,
};

/// Prints a human-friendly representation of the IR meant for debugging.
///
/// The structure of the output emitted by the printer is never considered stable and shouldn't be
/// relied upon as it may change unexpectedly. The purpose of the printer is to be a debugging aid
/// for inspecting the shape of the IR and not a serialization/deserialization format.
#[derive(Copy, Clone)]
pub struct IRPrinter<'ir> {
    ir: &'ir dyn IRPrintable,
}

impl std::fmt::Display for IRPrinter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut ctx = IRPrinterCtx::new(f);
        self.ir.fmt(&mut ctx)
    }
}

impl std::fmt::Debug for IRPrinter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IRPrinter").finish()
    }
}

impl<'ir, T: IRPrintable> From<&'ir T> for IRPrinter<'ir> {
    fn from(ir: &'ir T) -> Self {
        Self { ir }
    }
}

/// Alias type to a formatting result.
pub type Result = std::fmt::Result;

/// Trait defining the common behavior of printable IR objects.
pub trait IRPrintable {
    /// Format the IR object using the given context.
    fn fmt(&self, ctx: &mut IRPrinterCtx<'_, '_>) -> Result;
}

/// Printing context.
///
/// Implements [`std::fmt::Write`] and it's meant to be used as the first argument of [`write!`].
pub struct IRPrinterCtx<'a, 'f> {
    f: &'a mut Formatter<'f>,
    indent: Vec<usize>,
    indent_pending: bool,
}

impl<'a, 'f> IRPrinterCtx<'a, 'f> {
    fn new(f: &'a mut Formatter<'f>) -> Self {
        Self {
            f,
            indent: vec![],
            indent_pending: true,
        }
    }

    /// Adds a new line to the output.
    pub fn nl(&mut self) -> Result {
        if !self.indent_pending {
            self.indent_pending = true;
            writeln!(self.f)?;
        }
        Ok(())
    }

    fn push_indent(&mut self, value: usize) {
        self.indent.push(value);
    }

    fn pop_indent(&mut self) {
        self.indent.pop();
    }

    fn do_indent(&mut self) -> Result {
        if !self.indent_pending {
            return Ok(());
        }

        write!(self.f, "{}", " ".repeat(self.indent.iter().sum()))?;
        self.indent_pending = false;
        Ok(())
    }

    /// Adds a list to the output.
    pub fn list(&mut self, atom: &str, body: impl FnOnce(&mut IRPrinterCtx) -> Result) -> Result {
        write!(self, "(")?;
        if !atom.is_empty() {
            write!(self, "{atom} ")?;
        }
        body(self)?;
        write!(self, ")")
    }

    /// Adds a list to the output indenting the output inside it.
    pub fn block(&mut self, atom: &str, body: impl FnOnce(&mut IRPrinterCtx) -> Result) -> Result {
        self.list(atom, |ctx| {
            ctx.push_indent(2 + atom.len());
            body(ctx)?;
            ctx.pop_indent();
            Ok(())
        })
    }
}

impl Write for IRPrinterCtx<'_, '_> {
    fn write_str(&mut self, s: &str) -> Result {
        let ends_with_nl = s.ends_with('\n');
        let mut lines = s.lines().peekable();
        loop {
            let Some(line) = lines.next() else {
                self.indent_pending = ends_with_nl;
                return Ok(());
            };
            let not_done = lines.peek().is_some();
            self.do_indent()?;

            write!(self.f, "{}", line)?;
            if not_done || ends_with_nl {
                writeln!(self.f)?;
            }
        }
    }
}

impl std::fmt::Debug for IRPrinterCtx<'_, '_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IRPrinterCtx")
            .field("indent", &self.indent)
            .field("indent_pending", &self.indent_pending)
            .finish()
    }
}

impl IRPrintable for OpRef<'_> {
    fn fmt(&self, ctx: &mut IRPrinterCtx<'_, '_>) -> Result {
        let module = self.module();
        if !self.results().is_empty() {
            let results: Vec<_> = self.results().iter().map(ToString::to_string).collect();
            write!(ctx, "{} = ", results.join(", "))?;
        }
        write!(ctx, "{}", self.kind())?;
        if self.kind().is_constant() {
            if let (Some(value), Some(ty)) = (self.attr("value"), self.result_type(0)) {
                return write!(ctx, " {}", print_constant(value, ty));
            }
        }
        let operands: Vec<_> = self.operands().iter().map(ToString::to_string).collect();
        write!(ctx, "({})", operands.join(", "))?;
        let attrs = self.operation().attributes();
        if !attrs.is_empty() {
            let attrs: Vec<_> = attrs
                .iter()
                .map(|(name, value)| format!("{name} = {value}"))
                .collect();
            write!(ctx, " {{{}}}", attrs.join(", "))?;
        }
        let types = |values: &[ValueId]| {
            values
                .iter()
                .map(|v| match module.value_type(*v) {
                    Some(ty) => ty.to_string(),
                    None => "<unknown>".to_owned(),
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            ctx,
            " : ({}) -> {}",
            types(self.operands()),
            types(self.results())
        )
    }
}

impl IRPrintable for Module {
    fn fmt(&self, ctx: &mut IRPrinterCtx<'_, '_>) -> Result {
        ctx.block("module", |ctx| {
            ctx.list("arguments", |ctx| {
                let args: Vec<_> = self
                    .arguments()
                    .iter()
                    .map(|arg| match self.value_type(*arg) {
                        Some(ty) => format!("{arg} : {ty}"),
                        None => arg.to_string(),
                    })
                    .collect();
                write!(ctx, "{}", args.join(", "))
            })?;
            for op in self.ops() {
                ctx.nl()?;
                op.fmt(ctx)?;
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dialect::{arith, mod_arith},
        registry::Registry,
    };
    use ciphir_core::{apint::ApInt, mod_arith::ModArithType, types::Type};
    use similar_asserts::assert_eq;

    #[test]
    fn prints_module() {
        let registry = Registry::with_dialects();
        let ty: Type = ModArithType::new(17u32, 8).unwrap().into();
        let mut module = Module::new();
        let a = module.add_argument(ty);
        let b = module.add_argument(Type::integer(64));
        module
            .create(&registry, mod_arith::constant(ApInt::new(5u32, 3).unwrap(), ty))
            .unwrap();
        module.create(&registry, arith::index_constant(2)).unwrap();
        module
            .create(&registry, mod_arith::barrett_reduce(b, ApInt::new(17u32, 64).unwrap(), Type::integer(8)))
            .unwrap_err();
        module
            .create(&registry, mod_arith::binary(mod_arith::ModArithOp::Add, a, a, ty))
            .unwrap();

        let printed = IRPrinter::from(&module).to_string();
        assert_eq!(
            printed,
            "(module (arguments %0 : !mod_arith.int<17 : i8>, %1 : i64)
        %2 = mod_arith.constant 5 : !mod_arith.int<17 : i8>
        %3 = arith.constant 2 : index
        %4 = mod_arith.add(%0, %0) : (!mod_arith.int<17 : i8>, !mod_arith.int<17 : i8>) -> !mod_arith.int<17 : i8>)"
        );
    }

    #[test]
    fn prints_attributes() {
        let registry = Registry::with_dialects();
        let mut module = Module::new();
        let b = module.add_argument(Type::integer(8));
        let id = module
            .create(&registry, mod_arith::barrett_reduce(b, ApInt::new(17u32, 64).unwrap(), Type::integer(8)))
            .unwrap();
        let op = module.op(id).unwrap();
        assert_eq!(
            IRPrinter::from(&op).to_string(),
            "%1 = mod_arith.barrett_reduce(%0) {modulus = 17} : (i8) -> i8"
        );
    }
}
