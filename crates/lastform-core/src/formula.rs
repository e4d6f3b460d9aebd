//! The formula compilation seam.
//!
//! The recompute engine treats the expression language as an opaque
//! collaborator: a compiled formula exposes the ordered list of variable
//! names it reads and can be executed once every read has been bound to a
//! concrete value. Embedders supply their own language through
//! [`FormulaCompiler`]; [`crate::expr`] ships a minimal arithmetic one.

/// A formula source could not be compiled.
#[derive(Debug, thiserror::Error)]
#[error("compile error: {message}")]
pub struct CompileError {
    /// Human-readable description, including the offending fragment.
    pub message: String,
}

impl CompileError {
    /// Creates a compile error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A compiled formula failed to execute.
#[derive(Debug, thiserror::Error)]
#[error("eval error: {message}")]
pub struct EvalError {
    /// Human-readable description of the failure.
    pub message: String,
}

impl EvalError {
    /// Creates an eval error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A compiled formula: an ordered list of variable reads plus an
/// executable body.
///
/// The slice returned by [`reads`](CompiledFormula::reads) defines the
/// binding slots. `eval` receives one input per slot, in the same order.
pub trait CompiledFormula {
    /// The variable names this formula reads, in reference order,
    /// deduplicated.
    fn reads(&self) -> &[String];

    /// Executes the formula. `inputs` is parallel to
    /// [`reads`](CompiledFormula::reads).
    fn eval(&self, inputs: &[f64]) -> Result<f64, EvalError>;
}

/// Compiles formula source text into an executable form.
pub trait FormulaCompiler {
    /// Compiles `source`, reporting every referenced variable name.
    fn compile(&self, source: &str) -> Result<Box<dyn CompiledFormula>, CompileError>;
}
