use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::calculator::{CalculatorInput, CalculatorInputError, CalculatorOutput, Operation};
use crate::utils::{format_number, round_to};

/// Errors produced while evaluating a calculation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CalculatorError {
    #[error(transparent)]
    InvalidInput(#[from] CalculatorInputError),

    #[error("Result is undefined for {operation} with operands {a} and {b}")]
    Domain { operation: Operation, a: f64, b: f64 },

    #[error("Result of {operation} is too large to represent")]
    Overflow { operation: Operation },
}

impl CalculatorError {
    /// Whether the caller supplied bad input, as opposed to the evaluation failing
    #[inline]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::Domain { .. })
    }
}

/// Arithmetic service behind the `calculate` tool
#[derive(Debug, Clone, Default)]
pub struct CalculatorService;

impl CalculatorService {
    #[inline]
    pub fn new() -> Self {
        debug!("CalculatorService initialized");
        Self
    }

    /// Validate, evaluate and round a calculation
    #[inline]
    pub fn calculate(&self, input: &CalculatorInput) -> Result<CalculatorOutput, CalculatorError> {
        let precision = input.validate()?;
        let CalculatorInput {
            operation, a, b, ..
        } = *input;

        let raw = Self::evaluate(operation, a, b);

        if raw.is_nan() {
            error!("Calculation {} {} {} is undefined", a, operation.symbol(), b);
            return Err(CalculatorError::Domain { operation, a, b });
        }
        if raw.is_infinite() {
            error!("Calculation {} {} {} overflowed", a, operation.symbol(), b);
            return Err(CalculatorError::Overflow { operation });
        }

        let result = round_to(raw, precision);
        let expression = format!(
            "{} {} {}",
            format_number(a),
            operation.symbol(),
            format_number(b)
        );
        let formatted_result = format!("{} = {}", expression, format_number(result));

        info!("Calculated: {}", formatted_result);

        Ok(CalculatorOutput {
            operation: operation.as_str().to_string(),
            operand_a: a,
            operand_b: b,
            result,
            formatted_result,
            expression,
        })
    }

    fn evaluate(operation: Operation, a: f64, b: f64) -> f64 {
        match operation {
            Operation::Add => a + b,
            Operation::Subtract => a - b,
            Operation::Multiply => a * b,
            Operation::Divide => a / b,
            Operation::Power => a.powf(b),
            Operation::Modulo => floored_modulo(a, b),
        }
    }
}

/// Remainder whose sign follows the divisor
fn floored_modulo(a: f64, b: f64) -> f64 {
    let remainder = a % b;
    if remainder != 0.0 && (remainder < 0.0) != (b < 0.0) {
        remainder + b
    } else {
        remainder
    }
}
