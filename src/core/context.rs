//! Parameter access for filter implementations.
//!
//! A [`ParameterContext`] wraps a filter's parameter bag together with the
//! filter's name, so every typed getter can produce an error that names both
//! the filter and the offending key.

use crate::core::error::{FilterError, FilterResult};
use crate::core::types::{ParamValue, Parameters};

/// Typed, defaulting view over a parameter bag.
#[derive(Debug, Clone, Copy)]
pub struct ParameterContext<'a> {
    filter: &'a str,
    parameters: &'a Parameters,
}

impl<'a> ParameterContext<'a> {
    /// Create a context for the named filter.
    pub fn new(filter: &'a str, parameters: &'a Parameters) -> Self {
        Self { filter, parameters }
    }

    /// Name of the filter reading the parameters.
    pub fn filter(&self) -> &str {
        self.filter
    }

    /// The raw parameter bag.
    pub fn parameters(&self) -> &Parameters {
        self.parameters
    }

    /// Build an `InvalidParameter` error for this filter.
    pub fn invalid(&self, parameter: &str, reason: impl Into<String>) -> FilterError {
        FilterError::InvalidParameter {
            filter: self.filter.to_string(),
            parameter: parameter.to_string(),
            reason: reason.into(),
        }
    }

    /// Build a `Processing` error for this filter.
    pub fn failed(&self, reason: impl Into<String>) -> FilterError {
        FilterError::Processing {
            filter: self.filter.to_string(),
            reason: reason.into(),
        }
    }

    // ========================================================================
    // Getters
    // ========================================================================

    /// Get a parameter as a float. Integers and numeric strings are accepted.
    pub fn get_float(&self, name: &str, default: f64) -> FilterResult<f64> {
        let value = match self.parameters.get(name) {
            None => return Ok(default),
            Some(ParamValue::Float(x)) => *x,
            Some(ParamValue::Integer(i)) => *i as f64,
            Some(ParamValue::String(s)) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(name, format!("expected a number, got '{}'", s)))?,
            Some(other) => {
                return Err(self.invalid(name, format!("expected a number, got {}", other.type_name())))
            }
        };

        if !value.is_finite() {
            return Err(self.invalid(name, "value is not finite"));
        }
        Ok(value)
    }

    /// Get a parameter as an integer. Floats are truncated toward zero.
    pub fn get_integer(&self, name: &str, default: i64) -> FilterResult<i64> {
        match self.parameters.get(name) {
            None => Ok(default),
            Some(ParamValue::Integer(i)) => Ok(*i),
            Some(ParamValue::Float(_)) | Some(ParamValue::String(_)) => {
                Ok(self.get_float(name, default as f64)?.trunc() as i64)
            }
            Some(other) => Err(self.invalid(name, format!("expected an integer, got {}", other.type_name()))),
        }
    }

    /// Get a parameter as a string.
    pub fn get_string(&self, name: &str, default: &'a str) -> FilterResult<&'a str> {
        match self.parameters.get(name) {
            None => Ok(default),
            Some(ParamValue::String(s)) => Ok(s.as_str()),
            Some(other) => Err(self.invalid(name, format!("expected a string, got {}", other.type_name()))),
        }
    }

    /// Get a parameter as a boolean. Integers 0 and 1 are accepted.
    pub fn get_bool(&self, name: &str, default: bool) -> FilterResult<bool> {
        match self.parameters.get(name) {
            None => Ok(default),
            Some(ParamValue::Boolean(b)) => Ok(*b),
            Some(ParamValue::Integer(0)) => Ok(false),
            Some(ParamValue::Integer(1)) => Ok(true),
            Some(other) => Err(self.invalid(name, format!("expected a boolean, got {}", other))),
        }
    }

    // ========================================================================
    // Checked getters
    // ========================================================================

    /// Get a float that must be strictly positive.
    pub fn get_positive_float(&self, name: &str, default: f64) -> FilterResult<f64> {
        let value = self.get_float(name, default)?;
        if value <= 0.0 {
            return Err(self.invalid(name, format!("must be positive, got {}", value)));
        }
        Ok(value)
    }

    /// Get an integer within `[min, max]`.
    pub fn get_integer_in(&self, name: &str, default: i64, min: i64, max: i64) -> FilterResult<i64> {
        let value = self.get_integer(name, default)?;
        if value < min || value > max {
            return Err(self.invalid(name, format!("must be within {}..={}, got {}", min, max, value)));
        }
        Ok(value)
    }

    /// Get an odd, positive kernel size (OpenCV convention).
    pub fn get_odd_kernel(&self, name: &str, default: i64) -> FilterResult<u32> {
        let value = self.get_integer_in(name, default, 1, 255)?;
        if value % 2 == 0 {
            return Err(self.invalid(name, format!("kernel size must be odd, got {}", value)));
        }
        Ok(value as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Parameters {
        Parameters::new()
            .with("sigma", 1.5)
            .with("size", 3)
            .with("method", "otsu")
            .with("numeric", "2.5")
            .with("flag", true)
    }

    #[test]
    fn test_missing_parameters_default() {
        let bag = Parameters::new();
        let ctx = ParameterContext::new("gaussian", &bag);
        assert_eq!(ctx.get_float("sigma", 1.0).unwrap(), 1.0);
        assert_eq!(ctx.get_integer("size", 3).unwrap(), 3);
        assert_eq!(ctx.get_string("method", "binary").unwrap(), "binary");
        assert!(!ctx.get_bool("flag", false).unwrap());
    }

    #[test]
    fn test_numeric_coercion() {
        let bag = params();
        let ctx = ParameterContext::new("gaussian", &bag);
        assert_eq!(ctx.get_float("size", 0.0).unwrap(), 3.0);
        assert_eq!(ctx.get_integer("sigma", 0).unwrap(), 1);
        assert_eq!(ctx.get_float("numeric", 0.0).unwrap(), 2.5);
    }

    #[test]
    fn test_unusable_values_fail_loudly() {
        let bag = params();
        let ctx = ParameterContext::new("gaussian", &bag);

        let error = ctx.get_float("method", 1.0).unwrap_err();
        assert_eq!(
            error,
            FilterError::InvalidParameter {
                filter: "gaussian".to_string(),
                parameter: "method".to_string(),
                reason: "expected a number, got 'otsu'".to_string(),
            }
        );
        assert!(ctx.get_float("flag", 1.0).is_err());
        assert!(ctx.get_string("size", "x").is_err());
        assert!(ctx.get_bool("sigma", false).is_err());
    }

    #[test]
    fn test_checked_getters() {
        let bag = Parameters::new().with("sigma", 0.0).with("even", 4).with("odd", 5);
        let ctx = ParameterContext::new("median", &bag);

        assert!(ctx.get_positive_float("sigma", 1.0).is_err());
        assert!(ctx.get_odd_kernel("even", 3).is_err());
        assert_eq!(ctx.get_odd_kernel("odd", 3).unwrap(), 5);
        assert_eq!(ctx.get_odd_kernel("missing", 3).unwrap(), 3);
        assert!(ctx.get_integer_in("odd", 1, 1, 3).is_err());
    }
}
