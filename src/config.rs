//! Pool sizing

use crate::error::{PoolError, Result};

/// Sizing parameters shared by construction and reset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connections created up front
    pub initial_size: usize,
    /// Upper bound on idle connections held by the pool
    pub max_capacity: usize,
}

impl PoolConfig {
    pub fn new(initial_size: usize, max_capacity: usize) -> Self {
        PoolConfig {
            initial_size,
            max_capacity,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_capacity == 0 {
            return Err(PoolError::InvalidParameters(
                "max capacity must be greater than zero",
            ));
        }
        if self.initial_size > self.max_capacity {
            return Err(PoolError::InvalidParameters(
                "initial size exceeds max capacity",
            ));
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        PoolConfig::new(0, 16)
    }
}

#[cfg(test)]
mod test {
    use super::PoolConfig;
    use crate::error::PoolError;

    #[test]
    fn bounds() {
        assert!(PoolConfig::new(0, 1).validate().is_ok());
        assert!(PoolConfig::new(4, 4).validate().is_ok());
        assert!(PoolConfig::default().validate().is_ok());
        assert!(matches!(
            PoolConfig::new(0, 0).validate(),
            Err(PoolError::InvalidParameters(_))
        ));
        assert!(matches!(
            PoolConfig::new(5, 4).validate(),
            Err(PoolError::InvalidParameters(_))
        ));
    }
}
