use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;

use crate::utils::lenient_f64;

pub const DEFAULT_PRECISION: u8 = 2;
pub const MAX_PRECISION: u8 = 10;
pub const POWER_OPERAND_LIMIT: f64 = 1000.0;

/// Supported arithmetic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Modulo,
}

impl Operation {
    pub const ALL: [Self; 6] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Power,
        Self::Modulo,
    ];

    #[inline]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Power => "power",
            Self::Modulo => "modulo",
        }
    }

    /// Mathematical symbol used when rendering an expression
    #[inline]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
            Self::Power => "^",
            Self::Modulo => "%",
        }
    }
}

impl fmt::Display for Operation {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for the `calculate` tool
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CalculatorInput {
    pub operation: Operation,
    #[serde(deserialize_with = "lenient_f64")]
    pub a: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub b: f64,
    /// Decimal places to round to. Absent means [`DEFAULT_PRECISION`]; an
    /// explicit `null` rounds to a whole number.
    #[serde(
        default = "default_precision",
        deserialize_with = "crate::utils::lenient_opt_i64"
    )]
    pub precision: Option<i64>,
}

fn default_precision() -> Option<i64> {
    Some(i64::from(DEFAULT_PRECISION))
}

/// Result of a calculation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatorOutput {
    pub operation: String,
    pub operand_a: f64,
    pub operand_b: f64,
    pub result: f64,
    pub formatted_result: String,
    pub expression: String,
}

impl CalculatorInput {
    #[inline]
    pub fn new(operation: Operation, a: f64, b: f64) -> Self {
        Self {
            operation,
            a,
            b,
            precision: default_precision(),
        }
    }

    #[inline]
    pub fn with_precision(mut self, precision: u8) -> Self {
        self.precision = Some(i64::from(precision));
        self
    }

    /// Parse tool arguments into a calculator input
    #[inline]
    pub fn from_arguments(arguments: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(arguments)
    }

    /// Check the input against the rules the service relies on, returning the
    /// effective precision.
    #[inline]
    pub fn validate(&self) -> Result<u8, CalculatorInputError> {
        let precision = match self.precision {
            None => 0,
            Some(p) if (0..=i64::from(MAX_PRECISION)).contains(&p) => p as u8,
            Some(p) => return Err(CalculatorInputError::InvalidPrecision(p)),
        };

        match self.operation {
            Operation::Divide if self.b == 0.0 => Err(CalculatorInputError::DivisionByZero),
            Operation::Modulo if self.b == 0.0 => Err(CalculatorInputError::ModuloByZero),
            Operation::Power
                if self.a.abs() > POWER_OPERAND_LIMIT || self.b.abs() > POWER_OPERAND_LIMIT =>
            {
                Err(CalculatorInputError::PowerOutOfRange)
            }
            _ => Ok(precision),
        }
    }

    /// JSON schema advertised in the tool definition
    #[inline]
    pub fn input_schema() -> Value {
        let operations: Vec<&str> = Operation::ALL.iter().map(|op| op.as_str()).collect();

        json!({
            "type": "object",
            "title": "CalculatorInput",
            "properties": {
                "operation": {
                    "type": "string",
                    "enum": operations,
                    "description": "The arithmetic operation to perform"
                },
                "a": {
                    "type": "number",
                    "description": "First operand (number)",
                    "examples": [10.5, 5, -3.14]
                },
                "b": {
                    "type": "number",
                    "description": "Second operand (number)",
                    "examples": [2.5, 3, 7]
                },
                "precision": {
                    "type": "integer",
                    "description": "Number of decimal places in result (0-10)",
                    "minimum": 0,
                    "maximum": MAX_PRECISION,
                    "default": DEFAULT_PRECISION
                }
            },
            "required": ["operation", "a", "b"],
            "examples": [
                {"operation": "add", "a": 10.5, "b": 5.3, "precision": 2},
                {"operation": "multiply", "a": 7, "b": 8, "precision": 0},
                {"operation": "divide", "a": 100, "b": 3, "precision": 4}
            ]
        })
    }
}

/// Input rule violations
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalculatorInputError {
    #[error("Cannot divide by zero")]
    DivisionByZero,
    #[error("Cannot perform modulo with zero divisor")]
    ModuloByZero,
    #[error("Power operation limited to bases and exponents within ±1000")]
    PowerOutOfRange,
    #[error("precision must be between 0 and 10, got {0}")]
    InvalidPrecision(i64),
}
