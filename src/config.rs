//! LSU construction configuration.
//!
//! Groups the handful of construction-time knobs (explicit LQ and SQ size
//! overrides, the `assume_no_alias` boolean) into one documented value
//! instead of loose constructor parameters, the way
//! `cranelift-codegen`'s `isa::TargetIsa` groups its settings behind a single
//! `Flags` object that's read from, never written to, after construction.

use crate::metadata::ProcessorModel;

/// Construction-time configuration for an [`crate::policy::Lsu`].
#[derive(Debug, Clone, Copy)]
pub struct LsuConfig {
    /// Load-queue depth. `0` means "ask the processor model".
    pub lq_size: u32,
    /// Store-queue depth. `0` means "ask the processor model".
    pub sq_size: u32,
    /// Consulted only when a group being tested for aliasing has no bundled
    /// memory accesses at all (i.e. the metadata registry had nothing for
    /// every instruction in it). Has no effect when precise access metadata
    /// is available; the interval test is then authoritative.
    pub assume_no_alias: bool,
}

impl LsuConfig {
    /// Resolves zero-valued queue size overrides against `model`'s defaults.
    /// This happens once, at construction, not on every `is_lq_full`/
    /// `is_sq_full` call.
    pub fn resolve(self, model: &dyn ProcessorModel) -> ResolvedLsuConfig {
        ResolvedLsuConfig {
            lq_size: if self.lq_size == 0 {
                model.default_lq_size()
            } else {
                self.lq_size
            },
            sq_size: if self.sq_size == 0 {
                model.default_sq_size()
            } else {
                self.sq_size
            },
            assume_no_alias: self.assume_no_alias,
        }
    }
}

impl Default for LsuConfig {
    /// Ask the processor model for both queue depths and assume aliasing
    /// unless proven otherwise (the conservative default).
    fn default() -> Self {
        LsuConfig {
            lq_size: 0,
            sq_size: 0,
            assume_no_alias: false,
        }
    }
}

/// `LsuConfig` with its queue-size overrides resolved against a processor
/// model; what the base LSU actually stores.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ResolvedLsuConfig {
    pub(crate) lq_size: u32,
    pub(crate) sq_size: u32,
    pub(crate) assume_no_alias: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Model(u32, u32);
    impl ProcessorModel for Model {
        fn default_lq_size(&self) -> u32 {
            self.0
        }
        fn default_sq_size(&self) -> u32 {
            self.1
        }
    }

    #[test]
    fn zero_override_falls_back_to_model() {
        let cfg = LsuConfig {
            lq_size: 0,
            sq_size: 0,
            assume_no_alias: false,
        };
        let resolved = cfg.resolve(&Model(16, 12));
        assert_eq!(resolved.lq_size, 16);
        assert_eq!(resolved.sq_size, 12);
    }

    #[test]
    fn explicit_override_wins() {
        let cfg = LsuConfig {
            lq_size: 4,
            sq_size: 0,
            assume_no_alias: false,
        };
        let resolved = cfg.resolve(&Model(16, 12));
        assert_eq!(resolved.lq_size, 4);
        assert_eq!(resolved.sq_size, 12);
    }
}
